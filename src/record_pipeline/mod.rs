//! This module defines the physical framing half of the pipeline: splitting
//! logical records into segments, packing segments into visible records,
//! and the fixed file prelude.

//==================================================================================
// 1. Module Declarations
//==================================================================================

pub mod segment;
pub mod sul;
pub mod visible;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================
pub use self::segment::{LogicalRecordBytes, LrType, SegmentFlags, MIN_SEGMENT_SIZE};
pub use self::sul::{StorageUnitLabel, SUL_LENGTH};
pub use self::visible::{iter_visible_records, VisibleRecordWriter, VR_HEADER_SIZE};
