//! This file is the root of the `dlis_writer` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring the top-level modules of the library (`kernels`,
//!     `record_pipeline`, etc.) so the Rust compiler knows they exist.
//! 2.  Re-exporting the public API surface: the `LogicalFile` builder, the
//!     source and sink seams, and the value types users touch directly.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================

pub mod config;
pub mod eflr;
pub mod frame_pipeline;
pub mod kernels;
pub mod record_pipeline;
pub mod traits;
pub mod types;

mod error;
mod file;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================

pub use config::{CompatLevel, WriterConfig};
pub use eflr::EflrClass;
pub use error::DlisError;
pub use file::{CompatGuard, LogicalFile};
pub use frame_pipeline::{
    ColumnArray, InMemorySource, NoFormatPayload, RecordBatchSource,
};
pub use kernels::{NarrowingPolicy, RepCode};
pub use traits::{ByteSink, CancelToken, FileSink, FrameSource, RowCursor};
pub use types::{AttrValue, ObjKey, ObjName, Scalar};
