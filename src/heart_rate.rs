use thiserror::Error;

use crate::record::PpiRecord;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HeartRateError {
    #[error("Heart rate measurement expects at least {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

const FLAG_BPM_U16: u8 = 0b0000_0001;
const FLAG_CONTACT: u8 = 0b0000_0110;
const CONTACT_LOST: u8 = 0b0000_0100;
const FLAG_ENERGY: u8 = 0b0000_1000;
const FLAG_RR: u8 = 0b0001_0000;

/// One decoded Heart Rate Measurement (GATT characteristic 0x2A37).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartRate {
    bpm: u16,
    contact_lost: bool,
    rr: Vec<u16>,
}

impl HeartRate {
    pub fn new(data: &[u8]) -> Result<HeartRate, HeartRateError> {
        let too_short = |expected: usize| HeartRateError::InvalidLength {
            expected,
            actual: data.len(),
        };

        let flags = *data.first().ok_or_else(|| too_short(2))?;
        let mut offset = 1;

        let bpm = if flags & FLAG_BPM_U16 != 0 {
            let bytes = data.get(offset..offset + 2).ok_or_else(|| too_short(offset + 2))?;
            offset += 2;
            u16::from_le_bytes([bytes[0], bytes[1]])
        } else {
            let byte = *data.get(offset).ok_or_else(|| too_short(offset + 1))?;
            offset += 1;
            u16::from(byte)
        };

        if flags & FLAG_ENERGY != 0 {
            if data.len() < offset + 2 {
                return Err(too_short(offset + 2));
            }
            offset += 2;
        }

        let rr = if flags & FLAG_RR != 0 {
            data[offset..]
                .chunks_exact(2)
                // rr values are stored as 1024ths of a second, convert to ms
                .map(|c| ((u32::from(u16::from_le_bytes([c[0], c[1]])) * 1000) / 1024) as u16)
                .collect()
        } else {
            Vec::new()
        };

        Ok(HeartRate {
            bpm,
            contact_lost: flags & FLAG_CONTACT == CONTACT_LOST,
            rr,
        })
    }

    pub fn bpm(&self) -> u16 {
        self.bpm
    }

    /// RR intervals carried by this notification, in ms.
    pub fn rr(&self) -> &[u16] {
        &self.rr
    }

    pub fn contact_lost(&self) -> bool {
        self.contact_lost
    }

    /// One record per RR interval; all flagged invalid when the sensor reports lost contact.
    pub fn records(&self) -> impl Iterator<Item = PpiRecord> + '_ {
        let valid = !self.contact_lost;
        self.rr.iter().map(move |&value| PpiRecord { value, valid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_u8_bpm_with_rr() {
        // flags: rr present, contact detected; bpm 72; rr 1024 and 512
        let hr = HeartRate::new(&[0x16, 72, 0x00, 0x04, 0x00, 0x02]).unwrap();
        assert_eq!(hr.bpm(), 72);
        assert_eq!(hr.rr(), &[1000, 500]);
        assert!(!hr.contact_lost());
    }

    #[test]
    fn decodes_u16_bpm_and_skips_energy() {
        let hr = HeartRate::new(&[0x19, 0x2c, 0x01, 0xff, 0xff, 0x33, 0x03]).unwrap();
        assert_eq!(hr.bpm(), 300);
        // 0x0333 = 819 / 1024 s
        assert_eq!(hr.rr(), &[799]);
    }

    #[test]
    fn no_rr_flag_means_no_intervals() {
        let hr = HeartRate::new(&[0x00, 60]).unwrap();
        assert!(hr.rr().is_empty());
        assert_eq!(hr.records().count(), 0);
    }

    #[test]
    fn lost_contact_marks_records_invalid() {
        let hr = HeartRate::new(&[0x14, 60, 0x00, 0x04]).unwrap();
        assert!(hr.contact_lost());
        let records: Vec<_> = hr.records().collect();
        assert_eq!(records, vec![PpiRecord { value: 1000, valid: false }]);
    }

    #[test]
    fn rejects_truncated_payloads() {
        assert_eq!(
            HeartRate::new(&[]),
            Err(HeartRateError::InvalidLength { expected: 2, actual: 0 })
        );
        assert_eq!(
            HeartRate::new(&[0x01, 0x2c]),
            Err(HeartRateError::InvalidLength { expected: 3, actual: 2 })
        );
        assert!(HeartRate::new(&[0x08, 60, 0x01]).is_err());
    }
}
