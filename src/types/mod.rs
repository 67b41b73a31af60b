//! This module defines the core, strongly-typed data representations used
//! throughout the writer pipeline.
//!
//! It currently includes the canonical `Scalar`/`AttrValue` tagged unions,
//! which keep the attribute value domain closed and dispatchable at compile
//! time, and the object identity types (`ObjKey`, `ObjName`).

pub mod value;

// Re-export the main types for easier access.
pub use value::{AttrValue, ObjKey, ObjName, Scalar, TypedObjName};
