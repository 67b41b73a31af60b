//! Explicitly formatted logical records: attribute model, class registry,
//! and set assembly.

pub mod attribute;
pub mod classes;
pub mod file_header;
pub mod set;
pub mod standards;

pub use attribute::{Attribute, RefResolver};
pub use classes::{AttrSpec, Constraint, EflrClass, EMISSION_ORDER};
pub use file_header::FileHeader;
pub use set::{EflrItem, EflrSet};
