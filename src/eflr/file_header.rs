//! The File Header logical record.
//!
//! Unlike the other EFLRs, the File Header has a fixed layout: a set with
//! one object whose two attributes occupy fixed-width ASCII slots, so that
//! the whole record, segment header included, is exactly 124 bytes long.

use crate::error::DlisError;
use crate::kernels::ascii::{fixed_width, Justify};
use crate::kernels::{self, RepCode};
use crate::types::ObjName;

/// Fixed widths of the two attribute value slots.
const SEQUENCE_NUMBER_WIDTH: usize = 10;
const IDENTIFIER_WIDTH: usize = 65;

/// Total record length (body plus the 4-byte segment header).
pub const FILE_HEADER_RECORD_LENGTH: usize = 124;

/// Parameters of the File Header record.
#[derive(Debug, Clone)]
pub struct FileHeader {
    /// Position of this logical file in the storage set, written as ASCII.
    pub sequence_number: u32,
    /// Descriptive identification of the logical file, at most 65 chars.
    pub identifier: String,
    /// Name of the single object in the set, conventionally "0".
    pub name: String,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            sequence_number: 1,
            identifier: "DEFAULT FHLR".to_string(),
            name: "0".to_string(),
        }
    }
}

impl FileHeader {
    pub fn new(sequence_number: u32, identifier: impl Into<String>) -> Result<Self, DlisError> {
        let identifier = identifier.into();
        if identifier.len() > IDENTIFIER_WIDTH {
            return Err(DlisError::Config(format!(
                "file header identifier must be at most {IDENTIFIER_WIDTH} characters; got {}",
                identifier.len()
            )));
        }
        if sequence_number.to_string().len() > SEQUENCE_NUMBER_WIDTH {
            return Err(DlisError::Config(format!(
                "file header sequence number must fit {SEQUENCE_NUMBER_WIDTH} digits"
            )));
        }
        Ok(Self {
            sequence_number,
            identifier,
            name: "0".to_string(),
        })
    }

    /// Emit the record body (120 bytes for the conventional object name and
    /// a one-byte origin reference).
    pub fn body_bytes(&self, origin_reference: u32) -> Result<Vec<u8>, DlisError> {
        let mut out = Vec::with_capacity(FILE_HEADER_RECORD_LENGTH - 4);

        // Set component.
        out.push(0xF0);
        kernels::encode_ident("FILE-HEADER", &mut out)?;

        // Template: both attributes declare label and ASCII code.
        for label in ["SEQUENCE-NUMBER", "ID"] {
            out.push(0x34);
            kernels::encode_ident(label, &mut out)?;
            out.push(RepCode::Ascii.value());
        }

        // The single object.
        out.push(0x70);
        let obname = ObjName::new(origin_reference, 0, self.name.clone());
        kernels::encode_obname(&obname, &mut out)?;

        // Values occupy fixed-width slots; the length prefix is therefore
        // constant as well.
        out.push(0x21);
        out.push(SEQUENCE_NUMBER_WIDTH as u8);
        out.extend(fixed_width(
            &self.sequence_number.to_string(),
            SEQUENCE_NUMBER_WIDTH,
            Justify::Right,
        )?);

        out.push(0x21);
        out.push(IDENTIFIER_WIDTH as u8);
        out.extend(fixed_width(&self.identifier, IDENTIFIER_WIDTH, Justify::Left)?);

        Ok(out)
    }
}
