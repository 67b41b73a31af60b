//! Pure, stateless byte-encoding kernels.
//!
//! Everything here is free of pipeline state: given a value and a target
//! layout, produce bytes. The higher layers (attributes, sets, frame rows)
//! compose these kernels and never touch byte order themselves.

pub mod ascii;
pub mod repcode;

pub use repcode::{
    encode_ascii, encode_dtime, encode_ident, encode_obname, encode_objref, encode_scalar,
    encode_units, encode_uvari, infer_code, obname_size, scalar_size, uvari_size,
    NarrowingPolicy, RepCode,
};
