//! The Storage Unit Label.
//!
//! The first 80 bytes of the file are ASCII: sequence number, format
//! version, structure code, maximum visible record length, and the storage
//! set identifier. The SUL is not wrapped in a visible record.

use crate::config::{MAX_VISIBLE_RECORD_LENGTH, MIN_VISIBLE_RECORD_LENGTH};
use crate::error::DlisError;
use crate::kernels::ascii::{fixed_width, zero_padded, Justify};

pub const SUL_LENGTH: usize = 80;

const DLIS_VERSION: &str = "V1.00";
const STORAGE_UNIT_STRUCTURE: &str = "RECORD";

#[derive(Debug, Clone)]
pub struct StorageUnitLabel {
    /// Order of this storage unit within its storage set.
    pub sequence_number: u32,
    /// Identifier of the storage set, at most 60 characters.
    pub set_identifier: String,
    /// Maximum visible record length, repeated here in ASCII.
    pub max_record_length: u32,
}

impl StorageUnitLabel {
    pub fn new(
        sequence_number: u32,
        set_identifier: impl Into<String>,
        max_record_length: u32,
    ) -> Result<Self, DlisError> {
        let set_identifier = set_identifier.into();
        if set_identifier.len() > 60 || !set_identifier.is_ascii() {
            return Err(DlisError::Config(format!(
                "storage set identifier must be at most 60 ASCII characters; got {set_identifier:?}"
            )));
        }
        if !(MIN_VISIBLE_RECORD_LENGTH..=MAX_VISIBLE_RECORD_LENGTH).contains(&max_record_length) {
            return Err(DlisError::Config(format!(
                "maximum record length {max_record_length} outside {MIN_VISIBLE_RECORD_LENGTH}..={MAX_VISIBLE_RECORD_LENGTH}"
            )));
        }
        Ok(Self {
            sequence_number,
            set_identifier,
            max_record_length,
        })
    }

    /// The 80 label bytes.
    pub fn bytes(&self) -> Result<Vec<u8>, DlisError> {
        let mut out = Vec::with_capacity(SUL_LENGTH);
        out.extend(fixed_width(
            &self.sequence_number.to_string(),
            4,
            Justify::Right,
        )?);
        out.extend(fixed_width(DLIS_VERSION, 5, Justify::Left)?);
        out.extend(fixed_width(STORAGE_UNIT_STRUCTURE, 6, Justify::Right)?);
        out.extend(zero_padded(self.max_record_length, 5)?);
        out.extend(fixed_width(&self.set_identifier, 60, Justify::Left)?);
        debug_assert_eq!(out.len(), SUL_LENGTH);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_layout() {
        let sul = StorageUnitLabel::new(1, "MAIN STORAGE UNIT", 8192).unwrap();
        let bytes = sul.bytes().unwrap();
        assert_eq!(bytes.len(), 80);
        assert_eq!(&bytes[0..4], b"   1");
        assert_eq!(&bytes[4..9], b"V1.00");
        assert_eq!(&bytes[9..15], b"RECORD");
        assert_eq!(&bytes[15..20], b"08192");
        assert_eq!(&bytes[20..37], b"MAIN STORAGE UNIT");
        assert!(bytes[37..].iter().all(|&b| b == b' '));
    }

    #[test]
    fn identifier_length_is_bounded() {
        assert!(StorageUnitLabel::new(1, "x".repeat(61), 8192).is_err());
    }

    #[test]
    fn record_length_bounds() {
        assert!(StorageUnitLabel::new(1, "ID", 19).is_err());
        assert!(StorageUnitLabel::new(1, "ID", 16385).is_err());
        assert!(StorageUnitLabel::new(1, "ID", 16384).is_ok());
    }
}
