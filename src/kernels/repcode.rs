//! This module contains the pure, stateless kernels for encoding primitive
//! values into RP66 v1 representation-code byte layouts.
//!
//! All multi-byte integers and floats are emitted big-endian regardless of
//! the host byte order. Encoding is total over the allowed value domain of
//! each code; out-of-range values produce an `Encode` error and are never
//! silently truncated.

use chrono::{DateTime, Datelike, Timelike, Utc};
use num_traits::cast;

use crate::error::DlisError;
use crate::types::{ObjName, Scalar, TypedObjName};

//==================================================================================
// 1. The Representation Code Enum
//==================================================================================

/// RP66 v1 representation codes (Appendix B), with their standard numeric
/// identifiers as discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RepCode {
    FShort = 1,
    FSingl = 2,
    FSing1 = 3,
    FSing2 = 4,
    ISingl = 5,
    VSingl = 6,
    FDoubl = 7,
    FDoub1 = 8,
    FDoub2 = 9,
    CSingl = 10,
    CDoubl = 11,
    SShort = 12,
    SNorm = 13,
    SLong = 14,
    UShort = 15,
    UNorm = 16,
    ULong = 17,
    Uvari = 18,
    Ident = 19,
    Ascii = 20,
    Dtime = 21,
    Origin = 22,
    Obname = 23,
    Objref = 24,
    Attref = 25,
    Status = 26,
    Units = 27,
}

impl RepCode {
    /// Standard numeric identifier of the code.
    pub fn value(self) -> u8 {
        self as u8
    }

    /// The fixed on-wire size of a value of this code, or `None` for codes
    /// whose size depends on the value (variable-length integers, strings,
    /// object references).
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            RepCode::FShort => Some(2),
            RepCode::FSingl | RepCode::ISingl | RepCode::VSingl => Some(4),
            RepCode::FSing1 | RepCode::CSingl | RepCode::FDoubl => Some(8),
            RepCode::FSing2 => Some(12),
            RepCode::FDoub1 | RepCode::CDoubl => Some(16),
            RepCode::FDoub2 => Some(24),
            RepCode::SShort | RepCode::UShort | RepCode::Status => Some(1),
            RepCode::SNorm | RepCode::UNorm => Some(2),
            RepCode::SLong | RepCode::ULong => Some(4),
            RepCode::Dtime => Some(8),
            RepCode::Uvari
            | RepCode::Ident
            | RepCode::Ascii
            | RepCode::Units
            | RepCode::Origin
            | RepCode::Obname
            | RepCode::Objref
            | RepCode::Attref => None,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            RepCode::SShort
                | RepCode::SNorm
                | RepCode::SLong
                | RepCode::UShort
                | RepCode::UNorm
                | RepCode::ULong
                | RepCode::Uvari
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, RepCode::FShort | RepCode::FSingl | RepCode::FDoubl)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_reference(self) -> bool {
        matches!(self, RepCode::Obname | RepCode::Objref)
    }

    /// Look a code up by its standard numeric identifier.
    pub fn from_value(v: u8) -> Option<Self> {
        use RepCode::*;
        let all = [
            FShort, FSingl, FSing1, FSing2, ISingl, VSingl, FDoubl, FDoub1, FDoub2, CSingl,
            CDoubl, SShort, SNorm, SLong, UShort, UNorm, ULong, Uvari, Ident, Ascii, Dtime,
            Origin, Obname, Objref, Attref, Status, Units,
        ];
        all.into_iter().find(|c| c.value() == v)
    }
}

impl std::fmt::Display for RepCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RepCode::FShort => "FSHORT",
            RepCode::FSingl => "FSINGL",
            RepCode::FSing1 => "FSING1",
            RepCode::FSing2 => "FSING2",
            RepCode::ISingl => "ISINGL",
            RepCode::VSingl => "VSINGL",
            RepCode::FDoubl => "FDOUBL",
            RepCode::FDoub1 => "FDOUB1",
            RepCode::FDoub2 => "FDOUB2",
            RepCode::CSingl => "CSINGL",
            RepCode::CDoubl => "CDOUBL",
            RepCode::SShort => "SSHORT",
            RepCode::SNorm => "SNORM",
            RepCode::SLong => "SLONG",
            RepCode::UShort => "USHORT",
            RepCode::UNorm => "UNORM",
            RepCode::ULong => "ULONG",
            RepCode::Uvari => "UVARI",
            RepCode::Ident => "IDENT",
            RepCode::Ascii => "ASCII",
            RepCode::Dtime => "DTIME",
            RepCode::Origin => "ORIGIN",
            RepCode::Obname => "OBNAME",
            RepCode::Objref => "OBJREF",
            RepCode::Attref => "ATTREF",
            RepCode::Status => "STATUS",
            RepCode::Units => "UNITS",
        };
        f.write_str(name)
    }
}

//==================================================================================
// 2. Variable-Length and String Primitives
//==================================================================================

/// Offset prefixes marking the 2- and 4-byte UVARI forms. The top two bits
/// of the first byte select the length: 0x (1 byte), 10 (2 bytes),
/// 11 (4 bytes).
const UVARI_UNORM_OFFSET: u32 = 0x8000;
const UVARI_ULONG_OFFSET: u32 = 0xC000_0000;

/// Largest value expressible as UVARI (30 value bits in the 4-byte form).
pub const UVARI_MAX: u32 = (1 << 30) - 1;

/// Encode a variable-length unsigned integer. The shortest form that holds
/// the value is chosen.
pub fn encode_uvari(value: u32, out: &mut Vec<u8>) -> Result<(), DlisError> {
    if value < 128 {
        out.push(value as u8);
    } else if value < 16384 {
        out.extend_from_slice(&((value + UVARI_UNORM_OFFSET) as u16).to_be_bytes());
    } else if value <= UVARI_MAX {
        out.extend_from_slice(&(value + UVARI_ULONG_OFFSET).to_be_bytes());
    } else {
        return Err(encode_err(RepCode::Uvari, value, "exceeds 30 value bits"));
    }
    Ok(())
}

/// On-wire size of a UVARI value, without encoding it.
pub fn uvari_size(value: u32) -> usize {
    if value < 128 {
        1
    } else if value < 16384 {
        2
    } else {
        4
    }
}

fn check_ascii(code: RepCode, s: &str) -> Result<(), DlisError> {
    if !s.is_ascii() {
        return Err(encode_err(code, s, "contains non-ASCII bytes"));
    }
    Ok(())
}

/// Encode an IDENT: one length byte (up to 255) followed by ASCII bytes.
pub fn encode_ident(s: &str, out: &mut Vec<u8>) -> Result<(), DlisError> {
    check_ascii(RepCode::Ident, s)?;
    if s.len() > 255 {
        return Err(encode_err(RepCode::Ident, s, "longer than 255 characters"));
    }
    out.push(s.len() as u8);
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

/// Encode an ASCII string: UVARI length followed by the bytes.
pub fn encode_ascii(s: &str, out: &mut Vec<u8>) -> Result<(), DlisError> {
    check_ascii(RepCode::Ascii, s)?;
    encode_uvari(s.len() as u32, out)?;
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

/// Encode a UNITS string. The layout is that of IDENT; the charset is
/// restricted to the characters RP66 allows in unit expressions.
pub fn encode_units(s: &str, out: &mut Vec<u8>) -> Result<(), DlisError> {
    let ok = s.bytes().all(|b| {
        b.is_ascii_alphanumeric() || matches!(b, b' ' | b'-' | b'.' | b'/' | b'(' | b')' | b'*')
    });
    if !ok {
        return Err(encode_err(RepCode::Units, s, "invalid unit character"));
    }
    if s.len() > 255 {
        return Err(encode_err(RepCode::Units, s, "longer than 255 characters"));
    }
    out.push(s.len() as u8);
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

//==================================================================================
// 3. Date-Time, Object Names, Status
//==================================================================================

/// Encode a calendar instant in the fixed 8-byte DTIME layout: year offset
/// from 1900, time-zone nibble packed with the month, day, hour, minute,
/// second, and big-endian milliseconds. The time-zone nibble is written as
/// 0 and the instant itself is taken as UTC.
pub fn encode_dtime(t: &DateTime<Utc>, out: &mut Vec<u8>) -> Result<(), DlisError> {
    let year = t.year();
    if !(1900..=2155).contains(&year) {
        return Err(encode_err(RepCode::Dtime, t, "year outside 1900..=2155"));
    }
    out.push((year - 1900) as u8);
    out.push(t.month() as u8); // time zone nibble 0, month in the low nibble
    out.push(t.day() as u8);
    out.push(t.hour() as u8);
    out.push(t.minute() as u8);
    out.push(t.second() as u8);
    let millis = (t.nanosecond() / 1_000_000).min(999) as u16;
    out.extend_from_slice(&millis.to_be_bytes());
    Ok(())
}

/// Encode an OBNAME: UVARI origin reference, one-byte copy number, IDENT name.
pub fn encode_obname(n: &ObjName, out: &mut Vec<u8>) -> Result<(), DlisError> {
    encode_uvari(n.origin, out)?;
    out.push(n.copy);
    encode_ident(&n.name, out)
}

/// On-wire size of an OBNAME.
pub fn obname_size(n: &ObjName) -> usize {
    uvari_size(n.origin) + 1 + 1 + n.name.len()
}

/// Encode an OBJREF: IDENT set type followed by the OBNAME.
pub fn encode_objref(r: &TypedObjName, out: &mut Vec<u8>) -> Result<(), DlisError> {
    encode_ident(&r.set_type, out)?;
    encode_obname(&r.name, out)
}

//==================================================================================
// 4. Floats and Fixed-Width Integers
//==================================================================================

/// Convert a double to IEEE 754 binary16 bits, rounding to nearest-even.
/// Out-of-range magnitudes are rejected rather than flushed to infinity.
fn f64_to_half_bits(v: f64) -> Result<u16, DlisError> {
    const HALF_MAX: f64 = 65504.0;
    if v.is_finite() && v.abs() > HALF_MAX {
        return Err(encode_err(RepCode::FShort, v, "magnitude exceeds binary16"));
    }
    let bits = (v as f32).to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exp = ((bits >> 23) & 0xFF) as i32;
    let frac = bits & 0x007F_FFFF;

    if exp == 0xFF {
        // Infinity or NaN.
        let h_frac = if frac != 0 { 0x0200 } else { 0 };
        return Ok(sign | 0x7C00 | h_frac);
    }

    let unbiased = exp - 127;
    if unbiased > 15 {
        return Err(encode_err(RepCode::FShort, v, "magnitude exceeds binary16"));
    }
    if unbiased >= -14 {
        // Normal half. Round the 23-bit fraction to 10 bits, nearest-even.
        let h_exp = (unbiased + 15) as u32;
        let mut mantissa = (h_exp << 10) | (frac >> 13);
        let round_bits = frac & 0x1FFF;
        if round_bits > 0x1000 || (round_bits == 0x1000 && (mantissa & 1) == 1) {
            mantissa += 1; // may carry into the exponent, which is still valid
        }
        return Ok(sign | mantissa as u16);
    }
    if unbiased >= -24 {
        // Subnormal half.
        let shift = (-14 - unbiased) as u32;
        let full = (frac | 0x0080_0000) >> 13;
        return Ok(sign | (full >> shift) as u16);
    }
    // Underflows to signed zero.
    Ok(sign)
}

fn encode_f32(code: RepCode, v: f64, out: &mut Vec<u8>) -> Result<(), DlisError> {
    if v.is_finite() && v.abs() > f32::MAX as f64 {
        return Err(encode_err(code, v, "magnitude exceeds binary32"));
    }
    out.extend_from_slice(&(v as f32).to_be_bytes());
    Ok(())
}

fn int_of(code: RepCode, s: &Scalar) -> Result<i64, DlisError> {
    match s {
        Scalar::Int(i) => Ok(*i),
        Scalar::Double(d) if d.fract() == 0.0 && d.abs() < 9.0e18 => Ok(*d as i64),
        other => Err(encode_err(code, other.kind(), "not an integer")),
    }
}

fn float_of(code: RepCode, s: &Scalar) -> Result<f64, DlisError> {
    match s {
        Scalar::Double(d) => Ok(*d),
        Scalar::Int(i) => Ok(*i as f64),
        other => Err(encode_err(code, other.kind(), "not numeric")),
    }
}

fn encode_int<T>(code: RepCode, v: i64, out: &mut Vec<u8>) -> Result<(), DlisError>
where
    T: num_traits::PrimInt + IntoBeBytes,
{
    let narrowed: T = cast(v).ok_or_else(|| encode_err(code, v, "out of range"))?;
    narrowed.write_be(out);
    Ok(())
}

/// Helper trait so the integer encoder can stay generic over the width.
trait IntoBeBytes {
    fn write_be(self, out: &mut Vec<u8>);
}

macro_rules! impl_into_be_bytes {
    ($($t:ty),*) => {$(
        impl IntoBeBytes for $t {
            fn write_be(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_be_bytes());
            }
        }
    )*};
}

impl_into_be_bytes!(i8, i16, i32, u8, u16, u32);

//==================================================================================
// 5. The Scalar Encoder and Size Function
//==================================================================================

/// Encode one scalar under the given representation code, appending the
/// bytes to `out`.
pub fn encode_scalar(code: RepCode, s: &Scalar, out: &mut Vec<u8>) -> Result<(), DlisError> {
    match code {
        RepCode::FShort => {
            let bits = f64_to_half_bits(float_of(code, s)?)?;
            out.extend_from_slice(&bits.to_be_bytes());
            Ok(())
        }
        RepCode::FSingl => encode_f32(code, float_of(code, s)?, out),
        RepCode::FDoubl => {
            out.extend_from_slice(&float_of(code, s)?.to_be_bytes());
            Ok(())
        }
        RepCode::SShort => encode_int::<i8>(code, int_of(code, s)?, out),
        RepCode::SNorm => encode_int::<i16>(code, int_of(code, s)?, out),
        RepCode::SLong => encode_int::<i32>(code, int_of(code, s)?, out),
        RepCode::UShort => encode_int::<u8>(code, int_of(code, s)?, out),
        RepCode::UNorm => encode_int::<u16>(code, int_of(code, s)?, out),
        RepCode::ULong => encode_int::<u32>(code, int_of(code, s)?, out),
        RepCode::Uvari | RepCode::Origin => {
            let v = int_of(code, s)?;
            let v: u32 = cast(v).ok_or_else(|| encode_err(code, v, "out of range"))?;
            encode_uvari(v, out)
        }
        RepCode::Ident => match s {
            Scalar::Text(t) => encode_ident(t, out),
            other => Err(encode_err(code, other.kind(), "not text")),
        },
        RepCode::Ascii => match s {
            Scalar::Text(t) => encode_ascii(t, out),
            Scalar::Int(i) => encode_ascii(&i.to_string(), out),
            Scalar::Double(d) => encode_ascii(&d.to_string(), out),
            other => Err(encode_err(code, other.kind(), "not text")),
        },
        RepCode::Units => match s {
            Scalar::Text(t) => encode_units(t, out),
            other => Err(encode_err(code, other.kind(), "not text")),
        },
        RepCode::Dtime => match s {
            Scalar::DateTime(t) => encode_dtime(t, out),
            other => Err(encode_err(code, other.kind(), "not a date-time")),
        },
        RepCode::Obname => match s {
            Scalar::ObjectName(n) => encode_obname(n, out),
            Scalar::Reference(_) => Err(encode_err(code, s.kind(), "unresolved reference")),
            other => Err(encode_err(code, other.kind(), "not an object name")),
        },
        RepCode::Objref => match s {
            Scalar::ObjectRef(r) => encode_objref(r, out),
            Scalar::Reference(_) => Err(encode_err(code, s.kind(), "unresolved reference")),
            other => Err(encode_err(code, other.kind(), "not an object reference")),
        },
        RepCode::Status => {
            let v = int_of(code, s)?;
            if v != 0 && v != 1 {
                return Err(encode_err(code, v, "status must be 0 or 1"));
            }
            out.push(v as u8);
            Ok(())
        }
        RepCode::FSing1
        | RepCode::FSing2
        | RepCode::FDoub1
        | RepCode::FDoub2
        | RepCode::CSingl
        | RepCode::CDoubl
        | RepCode::ISingl
        | RepCode::VSingl
        | RepCode::Attref => Err(encode_err(
            code,
            s.kind(),
            "code has no defined conversion in this writer",
        )),
    }
}

/// On-wire size of a scalar under the given code, without encoding it.
/// Deterministic on `(code, value)`.
pub fn scalar_size(code: RepCode, s: &Scalar) -> Result<usize, DlisError> {
    if let Some(n) = code.fixed_size() {
        return Ok(n);
    }
    match (code, s) {
        (RepCode::Uvari | RepCode::Origin, _) => {
            let v = int_of(code, s)?;
            let v: u32 = cast(v).ok_or_else(|| encode_err(code, v, "out of range"))?;
            Ok(uvari_size(v))
        }
        (RepCode::Ident | RepCode::Units, Scalar::Text(t)) => Ok(1 + t.len()),
        (RepCode::Ascii, Scalar::Text(t)) => Ok(uvari_size(t.len() as u32) + t.len()),
        (RepCode::Obname, Scalar::ObjectName(n)) => Ok(obname_size(n)),
        (RepCode::Objref, Scalar::ObjectRef(r)) => {
            Ok(1 + r.set_type.len() + obname_size(&r.name))
        }
        (code, s) => Err(encode_err(code, s.kind(), "size undefined for value kind")),
    }
}

//==================================================================================
// 6. Code Inference
//==================================================================================

/// How `infer_code` picks integer and float widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NarrowingPolicy {
    /// Integers map to SLONG, floats to FDOUBL. This is the conventional
    /// choice for attribute values and matches what most producers emit.
    #[default]
    Standard,
    /// Pick the narrowest code that holds every element exactly.
    Narrowest,
}

/// Infer a representation code shared by all given scalars. Side-effect
/// free; mixed value kinds are an error rather than a silent promotion,
/// except for the conventional int-to-float widening.
pub fn infer_code<'a>(
    values: impl IntoIterator<Item = &'a Scalar>,
    policy: NarrowingPolicy,
) -> Result<RepCode, DlisError> {
    let mut ints: Option<(i64, i64)> = None;
    let mut has_float = false;
    let mut float_fits_single = true;
    let mut kind: Option<&'static str> = None;
    let mut n = 0usize;

    for s in values {
        n += 1;
        let k = match s {
            Scalar::Int(_) | Scalar::Double(_) => "numeric",
            other => other.kind(),
        };
        match kind {
            None => kind = Some(k),
            Some(prev) if prev == k => {}
            Some(prev) => {
                return Err(DlisError::Value(format!(
                    "cannot determine a common representation code for {prev} and {k} values"
                )))
            }
        }
        match s {
            Scalar::Int(i) => {
                let (lo, hi) = ints.unwrap_or((*i, *i));
                ints = Some((lo.min(*i), hi.max(*i)));
            }
            Scalar::Double(d) => {
                has_float = true;
                if (*d as f32) as f64 != *d {
                    float_fits_single = false;
                }
            }
            _ => {}
        }
    }

    if n == 0 {
        return Err(DlisError::Value(
            "cannot infer a representation code for an empty value list".into(),
        ));
    }

    match kind.unwrap() {
        "numeric" if has_float => Ok(match policy {
            NarrowingPolicy::Standard => RepCode::FDoubl,
            NarrowingPolicy::Narrowest if float_fits_single => RepCode::FSingl,
            NarrowingPolicy::Narrowest => RepCode::FDoubl,
        }),
        "numeric" => {
            let (lo, hi) = ints.unwrap();
            Ok(match policy {
                NarrowingPolicy::Standard => RepCode::SLong,
                NarrowingPolicy::Narrowest => narrowest_int_code(lo, hi)?,
            })
        }
        "text" => Ok(RepCode::Ascii),
        "date-time" => Ok(RepCode::Dtime),
        "object name" | "reference" => Ok(RepCode::Obname),
        "object reference" => Ok(RepCode::Objref),
        other => Err(DlisError::Value(format!(
            "cannot infer a representation code for {other} values"
        ))),
    }
}

fn narrowest_int_code(lo: i64, hi: i64) -> Result<RepCode, DlisError> {
    let code = if lo >= 0 {
        match hi {
            h if h <= u8::MAX as i64 => RepCode::UShort,
            h if h <= u16::MAX as i64 => RepCode::UNorm,
            h if h <= u32::MAX as i64 => RepCode::ULong,
            _ => {
                return Err(DlisError::Value(format!(
                    "integer {hi} does not fit any representation code"
                )))
            }
        }
    } else {
        match (lo, hi) {
            (l, h) if l >= i8::MIN as i64 && h <= i8::MAX as i64 => RepCode::SShort,
            (l, h) if l >= i16::MIN as i64 && h <= i16::MAX as i64 => RepCode::SNorm,
            (l, h) if l >= i32::MIN as i64 && h <= i32::MAX as i64 => RepCode::SLong,
            _ => {
                return Err(DlisError::Value(format!(
                    "integer range {lo}..{hi} does not fit any representation code"
                )))
            }
        }
    };
    Ok(code)
}

fn encode_err(code: RepCode, value: impl std::fmt::Debug, reason: &str) -> DlisError {
    DlisError::Encode {
        code: code.to_string(),
        value: format!("{value:?}"),
        reason: reason.to_string(),
    }
}
