//! Assembly of explicitly formatted logical records.
//!
//! An `EflrSet` is a table of objects of one class sharing one attribute
//! template. Its body is emitted in three parts: the set component, the
//! template (one component per attribute label), and then each object as a
//! name component followed by its attribute columns.

use crate::eflr::attribute::{Attribute, RefResolver};
use crate::eflr::classes::EflrClass;
use crate::error::DlisError;
use crate::kernels;
use crate::types::ObjName;

// Component descriptor bytes for the set and object roles.
const SET_WITH_TYPE: u8 = 0xF0;
const SET_WITH_TYPE_AND_NAME: u8 = 0xF8;
const OBJECT_WITH_NAME: u8 = 0x70;

/// One object of a set: a named row of the attribute table.
#[derive(Debug, Clone)]
pub struct EflrItem {
    pub name: String,
    /// Stamped by the orchestrator before emission.
    pub origin_reference: Option<u32>,
    pub copy_number: u8,
    attrs: Vec<Attribute>,
}

impl EflrItem {
    /// Create an item with every slot of the class template unset.
    pub fn new(class: EflrClass, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin_reference: None,
            copy_number: 0,
            attrs: class.template().iter().map(Attribute::from_spec).collect(),
        }
    }

    pub fn attr(&self, label: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.label() == label)
    }

    pub fn attr_mut(&mut self, label: &str) -> Result<&mut Attribute, DlisError> {
        self.attrs
            .iter_mut()
            .find(|a| a.label() == label)
            .ok_or_else(|| DlisError::Schema(format!("unknown attribute label '{label}'")))
    }

    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }

    /// The item's on-wire identity. The origin reference must have been
    /// stamped first.
    pub fn obname(&self) -> Result<ObjName, DlisError> {
        let origin = self.origin_reference.ok_or_else(|| {
            DlisError::Reference(format!(
                "origin reference of '{}' has not been assigned",
                self.name
            ))
        })?;
        Ok(ObjName::new(origin, self.copy_number, self.name.clone()))
    }

    fn emit(&self, resolver: &dyn RefResolver, out: &mut Vec<u8>) -> Result<(), DlisError> {
        out.push(OBJECT_WITH_NAME);
        kernels::encode_obname(&self.obname()?, out)?;
        for attr in &self.attrs {
            attr.emit_item(resolver, out)?;
        }
        Ok(())
    }
}

/// A set of objects of one class, emitted as a single logical record.
#[derive(Debug, Clone)]
pub struct EflrSet {
    pub class: EflrClass,
    pub set_name: Option<String>,
    pub items: Vec<EflrItem>,
}

impl EflrSet {
    pub fn new(class: EflrClass, set_name: Option<String>) -> Self {
        Self {
            class,
            set_name,
            items: Vec::new(),
        }
    }

    /// Emit the full record body, or `None` when the set has no items.
    pub fn body_bytes(&self, resolver: &dyn RefResolver) -> Result<Option<Vec<u8>>, DlisError> {
        if self.items.is_empty() {
            return Ok(None);
        }
        self.check_template_agreement()?;

        let mut out = Vec::new();

        // Set component.
        if let Some(name) = &self.set_name {
            out.push(SET_WITH_TYPE_AND_NAME);
            kernels::encode_ident(self.class.set_type(), &mut out)?;
            kernels::encode_ident(name, &mut out)?;
        } else {
            out.push(SET_WITH_TYPE);
            kernels::encode_ident(self.class.set_type(), &mut out)?;
        }

        // Template: the attribute labels, in class order.
        for attr in self.items[0].attrs() {
            attr.emit_template(&mut out)?;
        }

        // One row per object.
        for item in &self.items {
            item.emit(resolver, &mut out)?;
        }

        Ok(Some(out))
    }

    /// Every item's attribute labels must match the class template slot by
    /// slot. Items are only constructible from the template, so a mismatch
    /// is a logic error rather than a user mistake.
    fn check_template_agreement(&self) -> Result<(), DlisError> {
        let template = self.class.template();
        for item in &self.items {
            if item.attrs().len() != template.len()
                || item
                    .attrs()
                    .iter()
                    .zip(template)
                    .any(|(a, t)| a.label() != t.label)
            {
                return Err(DlisError::Schema(format!(
                    "item '{}' does not match the {} template",
                    item.name, self.class
                )));
            }
        }
        Ok(())
    }
}
