//! Streaming heart-rate-variability analytics for pulse-to-pulse intervals.
//!
//! [`HrvContext`] folds one interval at a time into a sliding-window
//! time-domain model and a Burg autoregressive spectrum, and exposes the
//! result as an [`HrvSnapshot`]. The remaining modules connect it to a live
//! BLE sensor or a recording through a bounded queue.

pub mod config;
pub mod consumer;
pub mod context;
pub mod heart_rate;
pub mod histogram;
pub mod moments;
pub mod pmd;
pub mod record;
pub mod report;
pub mod source;
pub mod spectral;
pub mod stats;
pub mod window;

pub use config::{Band, ConfigError, HrvConfig};
pub use context::{HrvContext, HrvSnapshot, Readiness};
pub use record::{GateDecision, InputGate, PpiRecord};
