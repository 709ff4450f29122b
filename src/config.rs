//! Session sizing constants.
//!
//! Every buffer in the engine is sized from an [`HrvConfig`] once, when the
//! context is built. Changing any of these values means building a new
//! session through [`crate::HrvContext::reconfigure`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Upper bound on any buffer length or bin count derived from the config.
pub const MAX_BUFFER_LEN: usize = 1 << 16;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// A frequency interval in cycles per beat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HrvConfig {
    /// Number of intervals kept for the time-domain statistics.
    pub window_capacity: usize,
    /// Lower edge of the first histogram bin (ms).
    pub hist_start_ms: f64,
    /// Upper edge of the histogram range (ms).
    pub hist_end_ms: f64,
    /// Width of one histogram bin (ms).
    pub bin_width_ms: f64,
    /// Length N of the raw buffer fed to the autoregressive estimator.
    pub ar_samples: usize,
    /// Model order M. Derived from `ar_samples` when absent.
    pub ar_order: Option<usize>,
    /// Remove the buffer mean before running Burg's recursion.
    pub center_ar_input: bool,
    pub freq_start: f64,
    pub freq_end: f64,
    /// Number of PSD points F, spread evenly over `[freq_start, freq_end]`.
    pub freq_bins: usize,
    pub total_band: Band,
    pub lf_band: Band,
    pub hf_band: Band,
    /// Successive differences strictly above this count towards pNN50 (ms).
    pub diff_threshold_ms: f64,
    /// Smallest power treated as meaningful; also the "not ready" sentinel for LF/HF.
    pub power_floor: f64,
    /// Guard added to every denominator that can approach zero.
    pub epsilon: f64,
}

impl Default for HrvConfig {
    fn default() -> Self {
        Self {
            window_capacity: 30,
            hist_start_ms: 300.0,
            hist_end_ms: 2000.0,
            bin_width_ms: 7.815,
            ar_samples: 30,
            ar_order: None,
            center_ar_input: true,
            freq_start: 0.04,
            freq_end: 0.4,
            freq_bins: 50,
            total_band: Band::new(0.003, 0.4),
            lf_band: Band::new(0.04, 0.15),
            hf_band: Band::new(0.15, 0.4),
            diff_threshold_ms: 50.0,
            power_floor: 1e-8,
            epsilon: 1e-9,
        }
    }
}

impl HrvConfig {
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: HrvConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Number of histogram bins covering `[hist_start_ms, hist_end_ms)`.
    pub fn bin_count(&self) -> usize {
        ((self.hist_end_ms - self.hist_start_ms) / self.bin_width_ms).ceil() as usize
    }

    /// Autoregressive model order, `round(N / ln(2N))` unless set explicitly.
    pub fn model_order(&self) -> usize {
        match self.ar_order {
            Some(order) => order,
            None => {
                let n = self.ar_samples as f64;
                (n / (2.0 * n).ln()).round() as usize
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: String| Err(ConfigError::Validation(msg));

        if self.window_capacity < 2 {
            return fail(format!("window_capacity must be at least 2, got {}", self.window_capacity));
        }
        for (name, len) in [
            ("window_capacity", self.window_capacity),
            ("ar_samples", self.ar_samples),
            ("freq_bins", self.freq_bins),
        ] {
            if len > MAX_BUFFER_LEN {
                return fail(format!("{name} must not exceed {MAX_BUFFER_LEN}, got {len}"));
            }
        }
        if !(self.bin_width_ms > 0.0) {
            return fail(format!("bin_width_ms must be positive, got {}", self.bin_width_ms));
        }
        if !(self.hist_end_ms > self.hist_start_ms) {
            return fail(format!(
                "histogram range [{}, {}) is empty",
                self.hist_start_ms, self.hist_end_ms
            ));
        }
        let bins = ((self.hist_end_ms - self.hist_start_ms) / self.bin_width_ms).ceil();
        if bins > MAX_BUFFER_LEN as f64 {
            return fail(format!(
                "histogram range needs {bins} bins of {} ms, more than {MAX_BUFFER_LEN}",
                self.bin_width_ms
            ));
        }
        let order = self.model_order();
        if order == 0 {
            return fail("ar_order must be at least 1".to_string());
        }
        if self.ar_samples <= order {
            return fail(format!(
                "ar_samples ({}) must exceed the model order ({})",
                self.ar_samples, order
            ));
        }
        if order.saturating_mul(self.freq_bins) > MAX_BUFFER_LEN * 64 {
            return fail(format!(
                "trig table of {order} x {} entries is too large",
                self.freq_bins
            ));
        }
        if self.freq_bins < 2 {
            return fail(format!("freq_bins must be at least 2, got {}", self.freq_bins));
        }
        if !(self.freq_end > self.freq_start) || self.freq_start < 0.0 {
            return fail(format!(
                "frequency range [{}, {}] is invalid",
                self.freq_start, self.freq_end
            ));
        }
        for (name, band) in [
            ("total_band", self.total_band),
            ("lf_band", self.lf_band),
            ("hf_band", self.hf_band),
        ] {
            if !(band.high > band.low) {
                return fail(format!("{name} [{}, {}) is empty", band.low, band.high));
            }
        }
        if !(self.power_floor > 0.0) || !(self.epsilon > 0.0) {
            return fail("power_floor and epsilon must be positive".to_string());
        }
        Ok(())
    }
}
