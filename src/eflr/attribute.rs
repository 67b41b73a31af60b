//! The attribute value model.
//!
//! An `Attribute` is one labeled, typed slot of an EFLR object: value(s),
//! optional units, the representation code in force, and the validation
//! constraint inherited from the class template. It also owns the two
//! component serializations: the template form (label only) and the
//! per-item form (count, code, units, value as present).

use log::warn;

use crate::config::CompatLevel;
use crate::eflr::classes::{AttrSpec, Constraint};
use crate::error::DlisError;
use crate::kernels::{self, NarrowingPolicy, RepCode};
use crate::types::{AttrValue, ObjKey, ObjName, Scalar, TypedObjName};

/// Resolves arena keys to on-wire object identities at emission time.
pub trait RefResolver {
    /// Returns the referent's resolved name and the set type it belongs to.
    fn resolve(&self, key: ObjKey) -> Result<(ObjName, &'static str), DlisError>;
}

// Component descriptor bits for the attribute role.
const ROLE_ATTRIBUTE: u8 = 0b0010_0000;
const BIT_LABEL: u8 = 0b0001_0000;
const BIT_COUNT: u8 = 0b0000_1000;
const BIT_CODE: u8 = 0b0000_0100;
const BIT_UNITS: u8 = 0b0000_0010;
const BIT_VALUE: u8 = 0b0000_0001;

/// Descriptor byte of an absent attribute component.
pub const ABSENT_ATTRIBUTE: u8 = 0x00;

#[derive(Debug, Clone)]
pub struct Attribute {
    spec: &'static AttrSpec,
    value: Option<AttrValue>,
    units: Option<String>,
    code: Option<RepCode>,
}

impl Attribute {
    pub fn from_spec(spec: &'static AttrSpec) -> Self {
        Self {
            spec,
            value: None,
            units: None,
            code: None,
        }
    }

    pub fn label(&self) -> &'static str {
        self.spec.label
    }

    pub fn spec(&self) -> &'static AttrSpec {
        self.spec
    }

    pub fn value(&self) -> Option<&AttrValue> {
        self.value.as_ref()
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    /// Number of scalar elements, 1 when single-valued and unset.
    pub fn count(&self) -> usize {
        self.value.as_ref().map_or(1, |v| v.count())
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    //==============================================================================
    // Setters (the converter path)
    //==============================================================================

    /// Set the attribute value. The constraint's converter runs on every
    /// element; cardinality is checked against the template flags.
    pub fn set_value(&mut self, mut value: AttrValue, compat: CompatLevel) -> Result<(), DlisError> {
        match &value {
            AttrValue::Single(_) => {}
            AttrValue::Vector(_) if self.spec.multivalued => {}
            AttrValue::Matrix { .. } if self.spec.multidimensional => {}
            AttrValue::Matrix { .. } => {
                return Err(DlisError::Value(format!(
                    "attribute {} does not accept multidimensional values",
                    self.spec.label
                )))
            }
            AttrValue::Vector(_) => {
                return Err(DlisError::Value(format!(
                    "attribute {} is single-valued",
                    self.spec.label
                )))
            }
        }
        if let AttrValue::Matrix { rows, values } = &value {
            if *rows == 0 || values.len() % rows != 0 {
                return Err(DlisError::Value(format!(
                    "attribute {}: {} values do not form {} equal rows",
                    self.spec.label,
                    values.len(),
                    rows
                )));
            }
        }
        value.try_map_in_place(|s| self.convert_element(s, compat))?;
        self.value = Some(value);
        Ok(())
    }

    /// Set the measurement units. Reference-typed and flag-like attributes
    /// take no units.
    pub fn set_units(&mut self, units: &str, compat: CompatLevel) -> Result<(), DlisError> {
        match self.spec.constraint {
            Constraint::Reference { .. }
            | Constraint::ReferenceOrText
            | Constraint::Status
            | Constraint::Dimension => {
                return Err(DlisError::Value(format!(
                    "attribute {} does not take units",
                    self.spec.label
                )))
            }
            _ => {}
        }
        check_unit_symbol(self.spec.label, units, compat)?;
        self.units = Some(units.to_string());
        Ok(())
    }

    /// Pin the representation code, which must belong to the constraint's
    /// allowed set.
    pub fn set_code(&mut self, code: RepCode) -> Result<(), DlisError> {
        if !self.code_allowed(code) {
            return Err(DlisError::Value(format!(
                "representation code {code} is not allowed for attribute {}",
                self.spec.label
            )));
        }
        self.code = Some(code);
        Ok(())
    }

    fn code_allowed(&self, code: RepCode) -> bool {
        match self.spec.constraint {
            Constraint::Any => true,
            Constraint::Text => code == RepCode::Ascii,
            Constraint::Ident => code == RepCode::Ident,
            Constraint::Numeric {
                int_only,
                float_only,
            } => {
                if int_only {
                    code.is_integer()
                } else if float_only {
                    code.is_float()
                } else {
                    code.is_numeric()
                }
            }
            Constraint::Dimension => code == RepCode::Uvari,
            Constraint::Status => code == RepCode::Status,
            Constraint::DTime { allow_numeric } => {
                code == RepCode::Dtime || (allow_numeric && code.is_numeric())
            }
            Constraint::Reference { .. } => code.is_reference(),
            Constraint::ReferenceOrText => code.is_reference() || code == RepCode::Ascii,
        }
    }

    fn convert_element(&self, s: &mut Scalar, compat: CompatLevel) -> Result<(), DlisError> {
        let label = self.spec.label;
        let mismatch = |got: &Scalar, want: &str| {
            DlisError::Value(format!(
                "attribute {label}: expected {want}, got a {} value",
                got.kind()
            ))
        };
        match self.spec.constraint {
            Constraint::Any => {
                if s.is_reference() {
                    return Err(mismatch(s, "a plain value"));
                }
            }
            Constraint::Text => {
                let Scalar::Text(t) = &*s else {
                    return Err(mismatch(s, "text"));
                };
                if !t.is_ascii() {
                    return Err(DlisError::Value(format!(
                        "attribute {label}: text is not ASCII: {t:?}"
                    )));
                }
            }
            Constraint::Ident => {
                let Scalar::Text(t) = &*s else {
                    return Err(mismatch(s, "an identifier"));
                };
                self.check_enum_member(t, compat)?;
            }
            Constraint::Numeric {
                int_only,
                float_only,
            } => {
                let replacement = match (&*s, int_only, float_only) {
                    (Scalar::Int(_), _, false) => None,
                    (Scalar::Int(i), _, true) => Some(Scalar::Double(*i as f64)),
                    (Scalar::Double(_), false, _) => None,
                    (Scalar::Double(d), true, _) if d.fract() == 0.0 => {
                        Some(Scalar::Int(*d as i64))
                    }
                    (Scalar::Double(d), true, _) => {
                        return Err(DlisError::Value(format!(
                            "attribute {label}: {d} cannot be represented as an integer"
                        )))
                    }
                    (other, ..) => return Err(mismatch(other, "a number")),
                };
                if let Some(r) = replacement {
                    *s = r;
                }
            }
            Constraint::Dimension => match &*s {
                Scalar::Int(i) if *i >= 1 => {}
                Scalar::Int(i) => {
                    return Err(DlisError::Value(format!(
                        "attribute {label}: dimension entries must be positive; got {i}"
                    )))
                }
                other => return Err(mismatch(other, "a positive integer")),
            },
            Constraint::Status => match &*s {
                Scalar::Int(0) | Scalar::Int(1) => {}
                Scalar::Int(i) => {
                    return Err(DlisError::Value(format!(
                        "attribute {label}: status must be 0 or 1; got {i}"
                    )))
                }
                other => return Err(mismatch(other, "a 0/1 flag")),
            },
            Constraint::DTime { allow_numeric } => match &*s {
                Scalar::DateTime(_) => {}
                Scalar::Int(_) | Scalar::Double(_) if allow_numeric => {}
                other => return Err(mismatch(other, "a date-time")),
            },
            Constraint::Reference { class } => match &*s {
                Scalar::Reference(key) => {
                    if let Some(want) = class {
                        if key.class != want {
                            return Err(DlisError::Value(format!(
                                "attribute {label}: expected a {want} reference, got {}",
                                key.class
                            )));
                        }
                    }
                }
                other => return Err(mismatch(other, "an object reference")),
            },
            Constraint::ReferenceOrText => match &*s {
                Scalar::Reference(_) | Scalar::Text(_) => {}
                other => return Err(mismatch(other, "a reference or text")),
            },
        }
        Ok(())
    }

    fn check_enum_member(&self, member: &str, compat: CompatLevel) -> Result<(), DlisError> {
        let Some(allowed) = self.spec.enum_values else {
            return Ok(());
        };
        if allowed.contains(&member) {
            return Ok(());
        }
        let msg = format!(
            "'{member}' is not one of the values the standard declares for {}",
            self.spec.label
        );
        if self.spec.enum_is_soft && compat != CompatLevel::High {
            warn!("{msg}");
            Ok(())
        } else {
            Err(DlisError::Value(msg))
        }
    }

    //==============================================================================
    // Code Resolution and Emission
    //==============================================================================

    /// The representation code in force: explicitly set, the template
    /// default, or inferred from the value.
    pub fn effective_code(&self) -> Result<Option<RepCode>, DlisError> {
        if let Some(c) = self.code.or(self.spec.code) {
            return Ok(Some(c));
        }
        let Some(value) = &self.value else {
            return Ok(None);
        };
        let code = kernels::infer_code(value.iter_flat(), NarrowingPolicy::Standard)?;
        Ok(Some(code))
    }

    /// One attribute component for the set template: descriptor plus label.
    pub fn emit_template(&self, out: &mut Vec<u8>) -> Result<(), DlisError> {
        out.push(ROLE_ATTRIBUTE | BIT_LABEL);
        kernels::encode_ident(self.spec.label, out)
    }

    /// One attribute component describing this item's slot. Emits exactly
    /// the parts that are set: count when it differs from one, the code in
    /// force, units when present, then the encoded values.
    pub fn emit_item(&self, resolver: &dyn RefResolver, out: &mut Vec<u8>) -> Result<(), DlisError> {
        if self.value.is_none() && self.units.is_none() {
            out.push(ABSENT_ATTRIBUTE);
            return Ok(());
        }

        let code = self.effective_code()?;
        let count = self.count();

        let mut descriptor = ROLE_ATTRIBUTE;
        if count != 1 {
            descriptor |= BIT_COUNT;
        }
        if code.is_some() {
            descriptor |= BIT_CODE;
        }
        if self.units.is_some() {
            descriptor |= BIT_UNITS;
        }
        if self.value.is_some() {
            descriptor |= BIT_VALUE;
        }
        out.push(descriptor);

        if count != 1 {
            kernels::encode_uvari(count as u32, out)?;
        }
        if let Some(code) = code {
            out.push(code.value());
        }
        if let Some(units) = &self.units {
            kernels::encode_units(units, out)?;
        }
        if let Some(value) = &self.value {
            let code = code.ok_or_else(|| {
                DlisError::Value(format!(
                    "attribute {} has a value but no representation code",
                    self.spec.label
                ))
            })?;
            for scalar in value.iter_flat() {
                let resolved;
                let scalar = match scalar {
                    Scalar::Reference(key) => {
                        let (name, set_type) = resolver.resolve(*key)?;
                        resolved = match code {
                            RepCode::Objref => Scalar::ObjectRef(TypedObjName {
                                set_type: set_type.to_string(),
                                name,
                            }),
                            _ => Scalar::ObjectName(name),
                        };
                        &resolved
                    }
                    other => other,
                };
                kernels::encode_scalar(code, scalar, out)?;
            }
        }
        Ok(())
    }
}

fn check_unit_symbol(label: &str, units: &str, compat: CompatLevel) -> Result<(), DlisError> {
    if crate::eflr::standards::UNITS.contains(&units) {
        return Ok(());
    }
    let msg = format!("'{units}' (units of {label}) is not one of the standard unit symbols");
    if compat == CompatLevel::High {
        return Err(DlisError::Value(msg));
    }
    warn!("{msg}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eflr::classes::{EflrClass, EMISSION_ORDER};

    struct NoRefs;
    impl RefResolver for NoRefs {
        fn resolve(&self, _: ObjKey) -> Result<(ObjName, &'static str), DlisError> {
            panic!("no references expected in this test")
        }
    }

    fn spec_of(class: EflrClass, label: &str) -> &'static AttrSpec {
        class
            .template()
            .iter()
            .find(|s| s.label == label)
            .unwrap_or_else(|| panic!("no {label} in {class}"))
    }

    #[test]
    fn template_component_is_label_only() {
        let attr = Attribute::from_spec(spec_of(EflrClass::Frame, "SPACING"));
        let mut out = Vec::new();
        attr.emit_template(&mut out).unwrap();
        assert_eq!(out, b"\x30\x07SPACING".to_vec());
    }

    #[test]
    fn unset_attribute_emits_absent_component() {
        let attr = Attribute::from_spec(spec_of(EflrClass::Frame, "SPACING"));
        let mut out = Vec::new();
        attr.emit_item(&NoRefs, &mut out).unwrap();
        assert_eq!(out, vec![0x00]);
    }

    #[test]
    fn single_value_emits_code_and_value() {
        let mut attr = Attribute::from_spec(spec_of(EflrClass::Frame, "ENCRYPTED"));
        attr.set_value(AttrValue::from(0), CompatLevel::Standard)
            .unwrap();
        let mut out = Vec::new();
        attr.emit_item(&NoRefs, &mut out).unwrap();
        // descriptor: code + value present; USHORT code 15; value 0
        assert_eq!(out, vec![0x25, 15, 0]);
    }

    #[test]
    fn multivalued_attribute_carries_its_count() {
        let mut attr = Attribute::from_spec(spec_of(EflrClass::Channel, "DIMENSION"));
        attr.set_value(AttrValue::vector([5, 2]), CompatLevel::Standard)
            .unwrap();
        let mut out = Vec::new();
        attr.emit_item(&NoRefs, &mut out).unwrap();
        // descriptor: count + code + value; count 2; UVARI code 18; values
        assert_eq!(out, vec![0x2D, 2, 18, 5, 2]);
    }

    #[test]
    fn units_are_emitted_when_set() {
        let mut attr = Attribute::from_spec(spec_of(EflrClass::Frame, "SPACING"));
        attr.set_value(AttrValue::from(0.25), CompatLevel::Standard)
            .unwrap();
        attr.set_units("m", CompatLevel::Standard).unwrap();
        let mut out = Vec::new();
        attr.emit_item(&NoRefs, &mut out).unwrap();
        assert_eq!(out[0], 0x27); // code + units + value
        assert_eq!(out[1], RepCode::FDoubl.value());
        assert_eq!(&out[2..4], b"\x01m");
        assert_eq!(&out[4..], &0.25f64.to_be_bytes());
    }

    #[test]
    fn scalar_slot_rejects_vectors() {
        let mut attr = Attribute::from_spec(spec_of(EflrClass::Frame, "SPACING"));
        let err = attr.set_value(AttrValue::vector([1, 2]), CompatLevel::Standard);
        assert!(matches!(err, Err(DlisError::Value(_))));
    }

    #[test]
    fn dimension_rejects_non_positive_entries() {
        let mut attr = Attribute::from_spec(spec_of(EflrClass::Channel, "DIMENSION"));
        assert!(attr
            .set_value(AttrValue::vector([0]), CompatLevel::Standard)
            .is_err());
    }

    #[test]
    fn reference_attributes_take_no_units() {
        let mut attr = Attribute::from_spec(spec_of(EflrClass::Frame, "CHANNELS"));
        assert!(attr.set_units("m", CompatLevel::Standard).is_err());
    }

    #[test]
    fn reference_class_is_checked() {
        let mut attr = Attribute::from_spec(spec_of(EflrClass::Frame, "CHANNELS"));
        let wrong = ObjKey {
            class: EflrClass::Zone,
            index: 0,
        };
        assert!(attr
            .set_value(AttrValue::vector([Scalar::Reference(wrong)]), CompatLevel::Standard)
            .is_err());
        let right = ObjKey {
            class: EflrClass::Channel,
            index: 0,
        };
        assert!(attr
            .set_value(AttrValue::vector([Scalar::Reference(right)]), CompatLevel::Standard)
            .is_ok());
    }

    #[test]
    fn hard_enum_membership_is_enforced() {
        let mut attr = Attribute::from_spec(spec_of(EflrClass::Zone, "DOMAIN"));
        assert!(attr
            .set_value(AttrValue::from("SIDEWAYS"), CompatLevel::Standard)
            .is_err());
        assert!(attr
            .set_value(AttrValue::from("TIME"), CompatLevel::Standard)
            .is_ok());
    }

    #[test]
    fn soft_enum_only_fails_in_high_compat() {
        let mut attr = Attribute::from_spec(spec_of(EflrClass::Frame, "INDEX-TYPE"));
        assert!(attr
            .set_value(AttrValue::from("MY-INDEX"), CompatLevel::Standard)
            .is_ok());
        assert!(attr
            .set_value(AttrValue::from("MY-INDEX"), CompatLevel::High)
            .is_err());
    }

    #[test]
    fn unknown_units_fail_only_in_high_compat() {
        let mut attr = Attribute::from_spec(spec_of(EflrClass::Frame, "SPACING"));
        assert!(attr.set_units("furlong", CompatLevel::Standard).is_ok());
        assert!(attr.set_units("furlong", CompatLevel::High).is_err());
        assert!(attr.set_units("m", CompatLevel::High).is_ok());
    }

    #[test]
    fn code_restriction_follows_the_constraint() {
        let mut attr = Attribute::from_spec(spec_of(EflrClass::Frame, "SPACING"));
        assert!(attr.set_code(RepCode::FSingl).is_ok());
        assert!(attr.set_code(RepCode::Ascii).is_err());
        let mut status = Attribute::from_spec(spec_of(EflrClass::Tool, "STATUS"));
        assert!(status.set_code(RepCode::Status).is_ok());
        assert!(status.set_code(RepCode::UShort).is_err());
    }

    #[test]
    fn every_template_slot_builds_a_default_attribute() {
        for class in EMISSION_ORDER {
            for spec in class.template() {
                let attr = Attribute::from_spec(spec);
                let mut out = Vec::new();
                attr.emit_template(&mut out).unwrap();
                assert!(out.len() >= 2);
            }
        }
    }
}
