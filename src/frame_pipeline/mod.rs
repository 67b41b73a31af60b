//! This module defines the data half of the pipeline: pulling channel
//! samples out of columnar sources in bounded chunks, and turning each row
//! into an indirectly formatted logical record body.

//==================================================================================
// 1. Module Declarations
//==================================================================================

pub mod iflr;
pub mod source;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================
pub use self::iflr::{
    no_format_body, ChannelBinding, FrameRowEmitter, NoFormatPayload, IFLR_TYPE_FRAME_DATA,
    IFLR_TYPE_NO_FORMAT,
};
pub use self::source::{
    ChainedSource, ColumnArray, ColumnChunk, ColumnDtype, ColumnShape, InMemorySource,
    RecordBatchSource,
};
