//! Polar Measurement Data (PMD) frames carrying pulse-to-pulse intervals.
//!
//! An optical sensor such as the Verity Sense does not put intervals in the
//! standard heart rate characteristic. It streams them on the PMD data
//! characteristic once the PPI measurement is started on the control point.

use thiserror::Error;

use crate::record::PpiRecord;

/// Measurement type carried in the low six bits of the first byte.
pub const MEASUREMENT_PPI: u8 = 0x03;

/// Control point command starting the PPI stream.
pub const START_PPI: [u8; 2] = [0x02, MEASUREMENT_PPI];
/// Control point command reading the PPI stream settings.
pub const GET_PPI_SETTINGS: [u8; 2] = [0x01, MEASUREMENT_PPI];

const HEADER_LEN: usize = 10;
const SAMPLE_LEN: usize = 6;
const MEASUREMENT_MASK: u8 = 0x3f;
const FLAG_BLOCKER: u8 = 0b0000_0001;
/// Error estimates at or above this are treated as unreliable (ms).
const MAX_PP_ERROR: u16 = 30;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PmdError {
    #[error("PMD frame expects at least {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("PMD frame carries measurement type {0:#04x}, not PPI")]
    UnexpectedMeasurement(u8),
}

/// One interval from a PPI frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpiSample {
    pub heart_rate: u8,
    /// Pulse-to-pulse interval (ms).
    pub ppi: u16,
    /// Error estimate of `ppi` (ms).
    pub error_estimate: u16,
    pub flags: u8,
}

impl PpiSample {
    fn from_bytes(b: &[u8]) -> Self {
        Self {
            heart_rate: b[0],
            ppi: u16::from_le_bytes([b[1], b[2]]),
            error_estimate: u16::from_le_bytes([b[3], b[4]]),
            flags: b[5],
        }
    }

    /// Usable when no blocker was detected and the error estimate is small but nonzero.
    pub fn is_valid(&self) -> bool {
        self.flags & FLAG_BLOCKER == 0 && self.error_estimate > 0 && self.error_estimate < MAX_PP_ERROR
    }

    pub fn record(&self) -> PpiRecord {
        PpiRecord {
            value: self.ppi,
            valid: self.is_valid(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpiFrame {
    timestamp: u64,
    samples: Vec<PpiSample>,
}

impl PpiFrame {
    /// Decode a notification from the PMD data characteristic.
    ///
    /// A trailing partial sample is dropped.
    pub fn new(data: &[u8]) -> Result<PpiFrame, PmdError> {
        if data.len() < HEADER_LEN {
            return Err(PmdError::InvalidLength {
                expected: HEADER_LEN,
                actual: data.len(),
            });
        }
        let measurement = data[0] & MEASUREMENT_MASK;
        if measurement != MEASUREMENT_PPI {
            return Err(PmdError::UnexpectedMeasurement(measurement));
        }

        let mut ts = [0u8; 8];
        ts.copy_from_slice(&data[1..9]);
        let samples = data[HEADER_LEN..]
            .chunks_exact(SAMPLE_LEN)
            .map(PpiSample::from_bytes)
            .collect();

        Ok(PpiFrame {
            timestamp: u64::from_le_bytes(ts),
            samples,
        })
    }

    /// Sensor timestamp of the frame (ns).
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn samples(&self) -> &[PpiSample] {
        &self.samples
    }

    pub fn records(&self) -> impl Iterator<Item = PpiRecord> + '_ {
        self.samples.iter().map(PpiSample::record)
    }
}
