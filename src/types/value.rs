//! Canonical, type-safe representation of attribute values.
//!
//! Everything a DLIS attribute can carry is expressed as a `Scalar` variant;
//! cardinality (single value, vector, matrix) is layered on top by
//! `AttrValue`. Keeping the value domain closed lets the encoding kernels
//! dispatch on the discriminant instead of downcasting at runtime.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::eflr::classes::EflrClass;

/// Identity of an object as it appears on the wire: origin reference,
/// copy number, and name. This is the resolved form of an `ObjKey`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjName {
    pub origin: u32,
    pub copy: u8,
    pub name: String,
}

impl ObjName {
    pub fn new(origin: u32, copy: u8, name: impl Into<String>) -> Self {
        Self {
            origin,
            copy,
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.origin, self.copy, self.name)
    }
}

/// A typed object reference: the set type of the referent plus its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedObjName {
    pub set_type: String,
    pub name: ObjName,
}

/// Stable handle into the object arena owned by a `LogicalFile`.
///
/// Cross-references between objects (Frame to Channel, Calibration to
/// Coefficient, ...) are stored as keys and only resolved to `ObjName`
/// bytes at emission time, once origin references and copy numbers are
/// final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjKey {
    pub class: EflrClass,
    pub index: usize,
}

/// A single attribute value.
///
/// Integer and floating values are widened to 64 bits here; the chosen
/// representation code narrows them again at encoding time, with range
/// checks.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Double(f64),
    Text(String),
    DateTime(DateTime<Utc>),
    /// Unresolved reference to another object in the same logical file.
    Reference(ObjKey),
    /// Resolved object name, ready for OBNAME encoding.
    ObjectName(ObjName),
    /// Resolved typed object name, ready for OBJREF encoding.
    ObjectRef(TypedObjName),
}

impl Scalar {
    /// Short kind label used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Int(_) => "integer",
            Scalar::Double(_) => "float",
            Scalar::Text(_) => "text",
            Scalar::DateTime(_) => "date-time",
            Scalar::Reference(_) => "reference",
            Scalar::ObjectName(_) => "object name",
            Scalar::ObjectRef(_) => "object reference",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Scalar::Int(_) | Scalar::Double(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Scalar::Reference(_) | Scalar::ObjectName(_) | Scalar::ObjectRef(_)
        )
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Double(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(v: DateTime<Utc>) -> Self {
        Scalar::DateTime(v)
    }
}

impl From<ObjKey> for Scalar {
    fn from(v: ObjKey) -> Self {
        Scalar::Reference(v)
    }
}

/// Value of an attribute together with its cardinality.
///
/// A `Matrix` is a list of rows flattened in row major order; `rows` is the
/// declared row count. Readers only see the flat element stream plus the
/// element count, so the row structure matters for validation, not for the
/// wire form.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Single(Scalar),
    Vector(Vec<Scalar>),
    Matrix { rows: usize, values: Vec<Scalar> },
}

impl AttrValue {
    /// Number of scalar elements carried by this value.
    pub fn count(&self) -> usize {
        match self {
            AttrValue::Single(_) => 1,
            AttrValue::Vector(v) => v.len(),
            AttrValue::Matrix { values, .. } => values.len(),
        }
    }

    /// Iterate over all scalar elements in emission order.
    pub fn iter_flat(&self) -> impl Iterator<Item = &Scalar> {
        match self {
            AttrValue::Single(s) => std::slice::from_ref(s).iter(),
            AttrValue::Vector(v) => v.iter(),
            AttrValue::Matrix { values, .. } => values.iter(),
        }
    }

    pub fn is_multivalued(&self) -> bool {
        !matches!(self, AttrValue::Single(_))
    }

    /// Build a vector value from anything convertible to scalars.
    pub fn vector<T: Into<Scalar>>(items: impl IntoIterator<Item = T>) -> Self {
        AttrValue::Vector(items.into_iter().map(Into::into).collect())
    }

    /// Apply a fallible transformation to every scalar element in place.
    pub fn try_map_in_place<E>(
        &mut self,
        mut f: impl FnMut(&mut Scalar) -> Result<(), E>,
    ) -> Result<(), E> {
        match self {
            AttrValue::Single(s) => f(s),
            AttrValue::Vector(v) => v.iter_mut().try_for_each(f),
            AttrValue::Matrix { values, .. } => values.iter_mut().try_for_each(f),
        }
    }
}

impl From<Scalar> for AttrValue {
    fn from(v: Scalar) -> Self {
        AttrValue::Single(v)
    }
}

// A generic `From<T: Into<Scalar>>` would collide with the reflexive
// `From<AttrValue>`, so the scalar conversions are spelled out.
macro_rules! impl_attr_value_from {
    ($($t:ty),*) => {$(
        impl From<$t> for AttrValue {
            fn from(v: $t) -> Self {
                AttrValue::Single(Scalar::from(v))
            }
        }
    )*};
}

impl_attr_value_from!(i64, i32, u32, f64, &str, String, DateTime<Utc>, ObjKey);
