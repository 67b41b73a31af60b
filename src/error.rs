// In: src/error.rs

//! This module defines the single, unified error type for the entire writer.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DlisError {
    // =========================================================================
    // === Setup / Graph Errors (raised before any byte is written)
    // =========================================================================
    /// Storage Unit Label, File Header, or writer setup is impossible,
    /// e.g. a maximum visible record length outside 20..=16384.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Attribute template mismatch across items of a set, or an unknown
    /// attribute label for a set type.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Attribute value outside its domain: wrong type, bad charset, bad
    /// enum member, bad count.
    #[error("Value error: {0}")]
    Value(String),

    /// Reference to an object that is not part of this logical file, a
    /// reference cycle, or a dangling origin.
    #[error("Reference error: {0}")]
    Reference(String),

    /// A referent would be emitted after its referrer.
    #[error("Ordering error: {0}")]
    Order(String),

    // =========================================================================
    // === Runtime Errors (may leave a partially written sink)
    // =========================================================================
    /// The source cursor is missing a dataset required by a frame, or a
    /// dataset's shape disagrees with the declaring channel.
    #[error("Data error: {0}")]
    Data(String),

    /// A value does not fit the representation code chosen for it.
    #[error("Cannot encode {value} as {code}: {reason}")]
    Encode {
        code: String,
        value: String,
        reason: String,
    },

    /// The write was cancelled through the cancellation token.
    #[error("Write cancelled")]
    Cancelled,

    /// An error originating from the byte sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
