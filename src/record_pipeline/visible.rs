//! Visible-record packing and buffered output.
//!
//! Segments are packed into visible records no longer than the configured
//! maximum; whole visible records are then accumulated in an output buffer
//! that is handed to the sink in large chunks. A visible record header is
//! never split across two sink writes.

use crate::config::WriterConfig;
use crate::error::DlisError;
use crate::record_pipeline::segment::SEGMENT_HEADER_SIZE;
use crate::traits::ByteSink;

/// Header size of a visible record.
pub const VR_HEADER_SIZE: usize = 4;

/// Format-version bytes every visible record carries after its length.
const FORMAT_VERSION: [u8; 2] = [0xFF, 0x01];

/// Packs segments into visible records and streams them through a buffer
/// into the sink.
pub struct VisibleRecordWriter<'a> {
    sink: &'a mut dyn ByteSink,
    max_record_length: usize,
    /// Segment bytes of the visible record being assembled.
    current: Vec<u8>,
    /// Whole visible records waiting for the next sink write.
    buffer: Vec<u8>,
    buffer_capacity: usize,
}

impl<'a> VisibleRecordWriter<'a> {
    pub fn new(config: &WriterConfig, sink: &'a mut dyn ByteSink) -> Self {
        let max_record_length = config.max_record_length as usize;
        Self {
            sink,
            max_record_length,
            current: Vec::with_capacity(max_record_length),
            buffer: Vec::with_capacity(config.output_chunk_size),
            buffer_capacity: config.output_chunk_size,
        }
    }

    /// Largest segment payload that can ever fit a visible record.
    pub fn max_segment_body(&self) -> usize {
        self.max_record_length - VR_HEADER_SIZE - SEGMENT_HEADER_SIZE
    }

    /// Write bytes that bypass visible-record framing (the Storage Unit
    /// Label). Only valid while no record is in flight.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), DlisError> {
        debug_assert!(self.current.is_empty());
        self.buffer_bytes_whole(bytes)
    }

    /// Add one complete segment. If it does not fit the visible record
    /// being assembled, that record is finished first.
    pub fn add_segment(&mut self, segment: &[u8]) -> Result<(), DlisError> {
        let projected = VR_HEADER_SIZE + self.current.len() + segment.len();
        if !self.current.is_empty() && projected > self.max_record_length {
            self.flush_current_record()?;
        }
        if VR_HEADER_SIZE + segment.len() > self.max_record_length {
            return Err(DlisError::Config(format!(
                "segment of {} bytes exceeds the visible record length {}",
                segment.len(),
                self.max_record_length
            )));
        }
        self.current.extend_from_slice(segment);
        Ok(())
    }

    /// Finish the in-flight visible record, flush the buffer and the sink.
    pub fn finish(&mut self) -> Result<(), DlisError> {
        self.flush_current_record()?;
        if !self.buffer.is_empty() {
            self.sink.append(&self.buffer)?;
            self.buffer.clear();
        }
        self.sink.flush()
    }

    fn flush_current_record(&mut self) -> Result<(), DlisError> {
        if self.current.is_empty() {
            return Ok(());
        }
        let total = VR_HEADER_SIZE + self.current.len();
        debug_assert!(total <= self.max_record_length);
        let mut header = [0u8; VR_HEADER_SIZE];
        header[..2].copy_from_slice(&(total as u16).to_be_bytes());
        header[2..].copy_from_slice(&FORMAT_VERSION);

        // The header and its body enter the buffer together, so a partial
        // flush can never split a visible record header from its body.
        if self.buffer.len() + total > self.buffer_capacity && !self.buffer.is_empty() {
            self.sink.append(&self.buffer)?;
            self.buffer.clear();
        }
        if total > self.buffer_capacity {
            self.sink.append(&header)?;
            self.sink.append(&self.current)?;
        } else {
            self.buffer.extend_from_slice(&header);
            self.buffer.extend_from_slice(&self.current);
        }
        self.current.clear();
        Ok(())
    }

    fn buffer_bytes_whole(&mut self, bytes: &[u8]) -> Result<(), DlisError> {
        if self.buffer.len() + bytes.len() > self.buffer_capacity && !self.buffer.is_empty() {
            self.sink.append(&self.buffer)?;
            self.buffer.clear();
        }
        if bytes.len() > self.buffer_capacity {
            self.sink.append(bytes)?;
        } else {
            self.buffer.extend_from_slice(bytes);
        }
        Ok(())
    }
}

/// Walk a produced byte stream, yielding each visible record's body.
/// Shared by tests and validation tooling.
pub fn iter_visible_records(stream: &[u8]) -> impl Iterator<Item = &[u8]> + '_ {
    let mut pos = 0usize;
    std::iter::from_fn(move || {
        if pos + VR_HEADER_SIZE > stream.len() {
            return None;
        }
        let len = u16::from_be_bytes([stream[pos], stream[pos + 1]]) as usize;
        if len < VR_HEADER_SIZE || pos + len > stream.len() {
            return None;
        }
        let body = &stream[pos + VR_HEADER_SIZE..pos + len];
        pos += len;
        Some(body)
    })
}
