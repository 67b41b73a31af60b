//! Indirectly formatted logical record bodies.
//!
//! Frame data: one record per source row, carrying the frame's OBNAME, the
//! 1-based frame number as UVARI, and the row's channel samples byte-swapped
//! to big-endian in frame-declared channel order. No-format records carry an
//! OBNAME plus opaque bytes.

use crate::error::DlisError;
use crate::frame_pipeline::source::{ColumnChunk, ColumnDtype};
use crate::kernels;
use crate::types::ObjName;

/// Indirectly formatted logical record type codes.
pub const IFLR_TYPE_FRAME_DATA: u8 = 0;
pub const IFLR_TYPE_NO_FORMAT: u8 = 1;

/// One channel's slot in a frame row: where its samples come from and what
/// they must look like.
#[derive(Debug, Clone)]
pub struct ChannelBinding {
    pub dataset_key: String,
    pub dtype: ColumnDtype,
    pub width: usize,
}

impl ChannelBinding {
    /// Per-row byte contribution of this channel.
    pub fn row_byte_width(&self) -> usize {
        self.width * self.dtype.element_size()
    }
}

/// Produces the frame-data bodies of one frame, in row order, with strictly
/// increasing frame numbers starting from one.
#[derive(Debug)]
pub struct FrameRowEmitter {
    obname: Vec<u8>,
    bindings: Vec<ChannelBinding>,
    row_width: usize,
    next_frame_number: u32,
}

impl FrameRowEmitter {
    pub fn new(frame: &ObjName, bindings: Vec<ChannelBinding>) -> Result<Self, DlisError> {
        let mut obname = Vec::new();
        kernels::encode_obname(frame, &mut obname)?;
        let row_width = bindings.iter().map(|b| b.row_byte_width()).sum();
        Ok(Self {
            obname,
            bindings,
            row_width,
            next_frame_number: 1,
        })
    }

    /// Summed byte width of one row body, excluding the OBNAME and frame
    /// number prefix.
    pub fn row_byte_width(&self) -> usize {
        self.row_width
    }

    pub fn rows_emitted(&self) -> u32 {
        self.next_frame_number - 1
    }

    /// Emit one body per row of the chunk, passing each to `consume`.
    ///
    /// Every bound dataset must be present in the chunk with the declared
    /// element type and width; a divergence means the source changed shape
    /// mid-stream and is fatal.
    pub fn emit_rows(
        &mut self,
        chunk: &ColumnChunk,
        mut consume: impl FnMut(Vec<u8>) -> Result<(), DlisError>,
    ) -> Result<(), DlisError> {
        for binding in &self.bindings {
            let col = chunk.column(&binding.dataset_key)?;
            if col.dtype() != binding.dtype || col.width() != binding.width {
                return Err(DlisError::Data(format!(
                    "dataset '{}' changed shape mid-stream: expected {:?} x{}, got {:?} x{}",
                    binding.dataset_key,
                    binding.dtype,
                    binding.width,
                    col.dtype(),
                    col.width()
                )));
            }
        }

        for row in 0..chunk.n_rows {
            let frame_number = self.next_frame_number;
            let mut body =
                Vec::with_capacity(self.obname.len() + kernels::uvari_size(frame_number) + self.row_width);
            body.extend_from_slice(&self.obname);
            kernels::encode_uvari(frame_number, &mut body)?;
            for binding in &self.bindings {
                chunk.column(&binding.dataset_key)?.extend_row_be(row, &mut body);
            }
            self.next_frame_number += 1;
            consume(body)?;
        }
        Ok(())
    }
}

/// Payload of a no-format record. Text is encoded as an ASCII value; raw
/// bytes pass through untouched.
#[derive(Debug, Clone)]
pub enum NoFormatPayload {
    Text(String),
    Bytes(Vec<u8>),
}

/// Body of one no-format record: OBNAME of the No-Format object followed by
/// the opaque payload.
pub fn no_format_body(target: &ObjName, payload: &NoFormatPayload) -> Result<Vec<u8>, DlisError> {
    let mut body = Vec::new();
    kernels::encode_obname(target, &mut body)?;
    match payload {
        NoFormatPayload::Text(t) => kernels::encode_ascii(t, &mut body)?,
        NoFormatPayload::Bytes(b) => body.extend_from_slice(b),
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_pipeline::source::InMemorySource;
    use crate::traits::FrameSource;
    use ndarray::Array2;

    fn bindings() -> Vec<ChannelBinding> {
        vec![
            ChannelBinding {
                dataset_key: "DEPTH".into(),
                dtype: ColumnDtype::Float64,
                width: 1,
            },
            ChannelBinding {
                dataset_key: "RPM".into(),
                dtype: ColumnDtype::Float64,
                width: 1,
            },
        ]
    }

    fn source() -> InMemorySource {
        let mut src = InMemorySource::new();
        src.insert("DEPTH", vec![0.0f64]);
        src.insert("RPM", vec![7.5f64]);
        src
    }

    #[test]
    fn single_row_body_layout() {
        let mut emitter =
            FrameRowEmitter::new(&ObjName::new(1, 0, "MAIN"), bindings()).unwrap();
        let keys = vec!["DEPTH".to_string(), "RPM".to_string()];
        let src = source();
        let mut cursor = src.open_cursor(&keys, 16).unwrap();
        let chunk = cursor.next_chunk().unwrap().unwrap();

        let mut bodies = Vec::new();
        emitter
            .emit_rows(&chunk, |b| {
                bodies.push(b);
                Ok(())
            })
            .unwrap();

        assert_eq!(bodies.len(), 1);
        let body = &bodies[0];
        // OBNAME(1, 0, "MAIN") + UVARI(1) + two big-endian doubles.
        assert_eq!(&body[..7], b"\x01\x00\x04MAIN");
        assert_eq!(body[7], 1);
        assert_eq!(&body[8..16], &0.0f64.to_be_bytes());
        assert_eq!(&body[16..24], &7.5f64.to_be_bytes());
        assert_eq!(body.len(), 7 + 1 + emitter.row_byte_width());
    }

    #[test]
    fn frame_numbers_increase_across_chunks() {
        let mut src = InMemorySource::new();
        src.insert("DEPTH", (0..7).map(|v| v as f64).collect::<Vec<_>>());
        let keys = vec!["DEPTH".to_string()];
        let mut emitter = FrameRowEmitter::new(
            &ObjName::new(1, 0, "F"),
            vec![ChannelBinding {
                dataset_key: "DEPTH".into(),
                dtype: ColumnDtype::Float64,
                width: 1,
            }],
        )
        .unwrap();

        let mut numbers = Vec::new();
        let mut cursor = src.open_cursor(&keys, 3).unwrap();
        while let Some(chunk) = cursor.next_chunk().unwrap() {
            emitter
                .emit_rows(&chunk, |b| {
                    numbers.push(b[4]); // UVARI after the 4-byte OBNAME, single byte here
                    Ok(())
                })
                .unwrap();
        }
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(emitter.rows_emitted(), 7);
    }

    #[test]
    fn image_channel_rows_carry_width_times_element_size() {
        let mut src = InMemorySource::new();
        src.insert("AMPLITUDE", Array2::<f64>::zeros((100, 5)));
        let keys = vec!["AMPLITUDE".to_string()];
        let mut emitter = FrameRowEmitter::new(
            &ObjName::new(1, 0, "IMG"),
            vec![ChannelBinding {
                dataset_key: "AMPLITUDE".into(),
                dtype: ColumnDtype::Float64,
                width: 5,
            }],
        )
        .unwrap();
        assert_eq!(emitter.row_byte_width(), 40);

        let mut n = 0;
        let mut cursor = src.open_cursor(&keys, 32).unwrap();
        while let Some(chunk) = cursor.next_chunk().unwrap() {
            emitter
                .emit_rows(&chunk, |b| {
                    let row = &b[b.len() - 40..];
                    assert!(row.iter().all(|&x| x == 0));
                    n += 1;
                    Ok(())
                })
                .unwrap();
        }
        assert_eq!(n, 100);
    }

    #[test]
    fn shape_drift_is_fatal() {
        let mut src = InMemorySource::new();
        src.insert("DEPTH", vec![1.0f32, 2.0]); // f32, binding says f64
        let keys = vec!["DEPTH".to_string()];
        let mut emitter = FrameRowEmitter::new(
            &ObjName::new(1, 0, "F"),
            vec![ChannelBinding {
                dataset_key: "DEPTH".into(),
                dtype: ColumnDtype::Float64,
                width: 1,
            }],
        )
        .unwrap();
        let mut cursor = src.open_cursor(&keys, 8).unwrap();
        let chunk = cursor.next_chunk().unwrap().unwrap();
        assert!(emitter.emit_rows(&chunk, |_| Ok(())).is_err());
    }

    #[test]
    fn no_format_text_is_ascii_encoded() {
        let body = no_format_body(
            &ObjName::new(1, 0, "NF"),
            &NoFormatPayload::Text("hello".into()),
        )
        .unwrap();
        assert_eq!(&body[..5], b"\x01\x00\x02NF");
        assert_eq!(&body[5..], b"\x05hello");
    }

    #[test]
    fn no_format_bytes_pass_through() {
        let body = no_format_body(
            &ObjName::new(1, 0, "NF"),
            &NoFormatPayload::Bytes(vec![0xDE, 0xAD]),
        )
        .unwrap();
        assert_eq!(&body[5..], &[0xDE, 0xAD]);
    }
}
