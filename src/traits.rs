//! This module defines the seams between the writer and its collaborators:
//! the byte sink the file is written to, the columnar source frame data is
//! pulled from, and the cancellation token checked between pipeline steps.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::DlisError;
use crate::frame_pipeline::source::{ColumnChunk, ColumnShape};

//==================================================================================
// 1. Byte Sink
//==================================================================================

/// Destination of the produced byte stream.
///
/// The writer owns the sink exclusively from the first appended byte until
/// finalization; it appends whole output chunks and keeps a running total.
pub trait ByteSink {
    fn append(&mut self, bytes: &[u8]) -> Result<(), DlisError>;

    /// Number of bytes appended so far.
    fn total_written(&self) -> u64;

    /// Flush any buffering the sink itself performs. Called at finalization.
    fn flush(&mut self) -> Result<(), DlisError> {
        Ok(())
    }
}

/// An in-memory sink, mainly for tests and for callers that post-process
/// the stream themselves.
impl ByteSink for Vec<u8> {
    fn append(&mut self, bytes: &[u8]) -> Result<(), DlisError> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn total_written(&self) -> u64 {
        self.len() as u64
    }
}

/// A sink writing straight to a file on disk.
pub struct FileSink {
    file: File,
    written: u64,
}

impl FileSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, DlisError> {
        Ok(Self {
            file: File::create(path)?,
            written: 0,
        })
    }
}

impl ByteSink for FileSink {
    fn append(&mut self, bytes: &[u8]) -> Result<(), DlisError> {
        self.file.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn total_written(&self) -> u64 {
        self.written
    }

    fn flush(&mut self) -> Result<(), DlisError> {
        self.file.flush()?;
        Ok(())
    }
}

//==================================================================================
// 2. Columnar Frame Source
//==================================================================================

/// A columnar data source channels read their samples from.
///
/// Implementations present named datasets as rectangular row-major columns
/// and hand out pull-based cursors over them. The crate ships in-memory and
/// Arrow record-batch implementations; adapters for on-disk formats live
/// outside this crate and plug in through this trait.
pub trait FrameSource {
    /// Shape and element type of a dataset, or `None` if it is absent.
    fn dataset_shape(&self, key: &str) -> Option<ColumnShape>;

    /// Open a cursor yielding the named datasets in chunks of at most
    /// `chunk_rows` rows. All named datasets must exist and agree on the
    /// row count.
    fn open_cursor(
        &self,
        keys: &[String],
        chunk_rows: usize,
    ) -> Result<Box<dyn RowCursor + '_>, DlisError>;
}

/// Pull-based iterator over row chunks. The next chunk is not materialized
/// until the caller asks for it, which bounds peak memory to one chunk.
pub trait RowCursor {
    fn next_chunk(&mut self) -> Result<Option<ColumnChunk>, DlisError>;
}

//==================================================================================
// 3. Cancellation
//==================================================================================

/// Cooperative cancellation flag, checked between input chunks and output
/// flushes. Cancelling mid-write leaves a truncated sink; durability is the
/// caller's concern (write to a temporary path, rename on success).
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
