//! Logical-record segmentation.
//!
//! Logical records of arbitrary length are carried in segments, each with a
//! 4-byte header: big-endian length, the record type code, and a flag byte.
//! Segment lengths are even and at least 16 bytes including the header; an
//! odd payload gets one pad byte whose value is the pad length.

use crate::error::DlisError;

/// Header size of a logical record segment.
pub const SEGMENT_HEADER_SIZE: usize = 4;

/// Minimum total segment length, header included.
pub const MIN_SEGMENT_SIZE: usize = 16;

/// Minimum payload a segment may carry.
pub const MIN_SEGMENT_BODY: usize = MIN_SEGMENT_SIZE - SEGMENT_HEADER_SIZE;

/// Type of a logical record: explicitly or indirectly formatted, with the
/// standard type code in either space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LrType {
    Eflr(u8),
    Iflr(u8),
}

impl LrType {
    pub fn code(self) -> u8 {
        match self {
            LrType::Eflr(c) | LrType::Iflr(c) => c,
        }
    }

    pub fn is_eflr(self) -> bool {
        matches!(self, LrType::Eflr(_))
    }
}

/// Flags carried in byte 3 of the segment header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentFlags {
    pub is_eflr: bool,
    pub has_predecessor: bool,
    pub has_successor: bool,
    pub has_padding: bool,
    // Encryption, checksum, and trailing length are never produced by this
    // writer; their bits stay clear and the fields are not emitted.
}

impl SegmentFlags {
    pub fn to_byte(self) -> u8 {
        let mut b = 0u8;
        if self.is_eflr {
            b |= 0x80;
        }
        if self.has_predecessor {
            b |= 0x40;
        }
        if self.has_successor {
            b |= 0x20;
        }
        if self.has_padding {
            b |= 0x01;
        }
        b
    }
}

/// A complete logical record body awaiting segmentation.
#[derive(Debug, Clone)]
pub struct LogicalRecordBytes {
    pub lr_type: LrType,
    pub body: Vec<u8>,
}

impl LogicalRecordBytes {
    pub fn new(lr_type: LrType, body: Vec<u8>) -> Self {
        Self { lr_type, body }
    }

    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Split the record into segments whose payloads are at most
    /// `max_body` bytes, and whose concatenation is exactly the body.
    ///
    /// Split points are chosen so that neither the current segment nor the
    /// one after it falls under the minimum: when the remainder would be
    /// too short, the current segment cedes the difference.
    pub fn make_segments(&self, max_body: usize) -> Result<Vec<Vec<u8>>, DlisError> {
        if self.body.len() > max_body && max_body < 2 * MIN_SEGMENT_BODY {
            return Err(DlisError::Config(format!(
                "record of {} bytes cannot be split into segments of at most {max_body} bytes",
                self.body.len()
            )));
        }

        let mut segments = Vec::new();
        let mut start = 0usize;
        let total = self.body.len();

        loop {
            let remaining = total - start;
            let mut n = remaining.min(max_body);
            let after = remaining - n;
            if after > 0 && after < MIN_SEGMENT_BODY {
                // Leave enough for a valid successor segment.
                n -= MIN_SEGMENT_BODY - after;
            }
            let is_first = start == 0;
            let is_last = start + n == total;
            segments.push(self.make_segment(start, n, is_first, is_last)?);
            start += n;
            if is_last {
                break;
            }
        }
        Ok(segments)
    }

    fn make_segment(
        &self,
        start: usize,
        n: usize,
        is_first: bool,
        is_last: bool,
    ) -> Result<Vec<u8>, DlisError> {
        let mut flags = SegmentFlags {
            is_eflr: self.lr_type.is_eflr(),
            has_predecessor: !is_first,
            has_successor: !is_last,
            has_padding: false,
        };

        let mut size = n + SEGMENT_HEADER_SIZE;
        if size % 2 != 0 {
            size += 1;
            flags.has_padding = true;
        }
        // Short records are padded up to the minimum so every segment on
        // the wire is at least 16 bytes.
        let extra_pad = MIN_SEGMENT_SIZE.saturating_sub(size);
        if extra_pad > 0 {
            size = MIN_SEGMENT_SIZE;
            flags.has_padding = true;
        }

        if size > u16::MAX as usize {
            return Err(DlisError::Config(format!(
                "segment length {size} exceeds the 16-bit header field"
            )));
        }

        let mut out = Vec::with_capacity(size);
        out.extend_from_slice(&(size as u16).to_be_bytes());
        out.push(self.lr_type.code());
        out.push(flags.to_byte());
        out.extend_from_slice(&self.body[start..start + n]);
        let pad = size - (n + SEGMENT_HEADER_SIZE);
        for _ in 0..pad {
            out.push(pad as u8);
        }
        Ok(out)
    }
}

/// Strip the header and padding from one encoded segment, returning the
/// payload and the parsed flags. Used by tests and downstream checks.
pub fn parse_segment(segment: &[u8]) -> Result<(&[u8], u8, SegmentFlags), DlisError> {
    if segment.len() < SEGMENT_HEADER_SIZE {
        return Err(DlisError::Data("segment shorter than its header".into()));
    }
    let size = u16::from_be_bytes([segment[0], segment[1]]) as usize;
    if size != segment.len() {
        return Err(DlisError::Data(format!(
            "segment header declares {size} bytes, buffer has {}",
            segment.len()
        )));
    }
    let lr_type = segment[2];
    let flag_byte = segment[3];
    let flags = SegmentFlags {
        is_eflr: flag_byte & 0x80 != 0,
        has_predecessor: flag_byte & 0x40 != 0,
        has_successor: flag_byte & 0x20 != 0,
        has_padding: flag_byte & 0x01 != 0,
    };
    let mut end = size;
    if flags.has_padding {
        let pad = segment[size - 1] as usize;
        if pad == 0 || pad > size - SEGMENT_HEADER_SIZE {
            return Err(DlisError::Data(format!("invalid pad length {pad}")));
        }
        end -= pad;
    }
    Ok((&segment[SEGMENT_HEADER_SIZE..end], lr_type, flags))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: usize) -> LogicalRecordBytes {
        LogicalRecordBytes::new(LrType::Eflr(5), (0..n).map(|i| i as u8).collect())
    }

    #[test]
    fn single_segment_record_has_no_order_flags() {
        let segments = record(20).make_segments(1000).unwrap();
        assert_eq!(segments.len(), 1);
        let (payload, lr_type, flags) = parse_segment(&segments[0]).unwrap();
        assert_eq!(payload.len(), 20);
        assert_eq!(lr_type, 5);
        assert!(flags.is_eflr);
        assert!(!flags.has_predecessor);
        assert!(!flags.has_successor);
    }

    #[test]
    fn every_segment_is_even_and_at_least_minimum() {
        for body_len in [1, 11, 12, 13, 100, 1001] {
            for max_body in [12, 13, 64, 4096] {
                let rec = record(body_len);
                let Ok(segments) = rec.make_segments(max_body) else {
                    continue;
                };
                for seg in &segments {
                    assert!(seg.len() >= MIN_SEGMENT_SIZE, "len {} body {body_len}", seg.len());
                    assert_eq!(seg.len() % 2, 0);
                }
            }
        }
    }

    #[test]
    fn concatenated_payloads_reconstruct_the_body() {
        let rec = record(10_000);
        let segments = rec.make_segments(2040).unwrap();
        assert!(segments.len() >= 5);
        let mut rebuilt = Vec::new();
        for (i, seg) in segments.iter().enumerate() {
            let (payload, _, flags) = parse_segment(seg).unwrap();
            assert_eq!(flags.has_predecessor, i > 0);
            assert_eq!(flags.has_successor, i < segments.len() - 1);
            rebuilt.extend_from_slice(payload);
        }
        assert_eq!(rebuilt, rec.body);
    }

    #[test]
    fn split_never_leaves_an_undersized_tail() {
        // 101 bytes with a 96-byte cap: a naive split leaves 5 bytes.
        let rec = record(101);
        let segments = rec.make_segments(96).unwrap();
        assert_eq!(segments.len(), 2);
        let (first, ..) = parse_segment(&segments[0]).unwrap();
        let (second, ..) = parse_segment(&segments[1]).unwrap();
        assert_eq!(first.len() + second.len(), 101);
        assert!(second.len() >= MIN_SEGMENT_BODY);
    }

    #[test]
    fn odd_payload_gets_one_pad_byte_of_value_one() {
        let segments = record(15).make_segments(1000).unwrap();
        let seg = &segments[0];
        assert_eq!(seg.len(), 20);
        assert_eq!(seg[3] & 0x01, 0x01);
        assert_eq!(*seg.last().unwrap(), 1);
    }

    #[test]
    fn iflr_flag_bit_is_clear() {
        let rec = LogicalRecordBytes::new(LrType::Iflr(0), vec![0; 16]);
        let seg = &rec.make_segments(1000).unwrap()[0];
        assert_eq!(seg[3] & 0x80, 0);
    }

    #[test]
    fn unsplittable_record_is_a_config_error() {
        let rec = record(100);
        assert!(matches!(
            rec.make_segments(13),
            Err(DlisError::Config(_))
        ));
    }
}
