//! Measurement records at the queue boundary and the plausibility gate the
//! consumer applies before anything reaches the HRV engine.

use serde::{Deserialize, Serialize};

/// One pulse interval as delivered by a measurement source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PpiRecord {
    pub value: u16,
    pub valid: bool,
}

impl PpiRecord {
    pub fn valid(value: u16) -> Self {
        Self { value, valid: true }
    }
}

/// Outcome of passing one record through the [`InputGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Record accepted; feed it to the engine.
    Accept(u16),
    /// Record dropped; the last accepted value still stands (0 before the first).
    Reject { held: u16 },
}

impl GateDecision {
    /// Interval to drive outputs with after this record.
    pub fn effective(&self) -> u16 {
        match *self {
            GateDecision::Accept(v) => v,
            GateDecision::Reject { held } => held,
        }
    }
}

/// Rejects records flagged invalid and jumps larger than `max_diff_ms` from the
/// previously accepted interval.
///
/// The jump check only applies once an interval at or above `floor_ms` has
/// been accepted, so the first plausible beat is never rejected.
#[derive(Debug, Clone)]
pub struct InputGate {
    max_diff_ms: u16,
    floor_ms: u16,
    previous: u16,
}

impl InputGate {
    pub fn new(max_diff_ms: u16, floor_ms: u16) -> Self {
        Self {
            max_diff_ms,
            floor_ms,
            previous: 0,
        }
    }

    pub fn check(&mut self, record: PpiRecord) -> GateDecision {
        let close = record.value.abs_diff(self.previous) < self.max_diff_ms;
        if record.valid && (close || self.previous < self.floor_ms) {
            self.previous = record.value;
            GateDecision::Accept(record.value)
        } else {
            GateDecision::Reject {
                held: self.previous,
            }
        }
    }

    pub fn reset(&mut self) {
        self.previous = 0;
    }
}
