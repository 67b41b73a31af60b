//! The user-facing model of one DLIS logical file.
//!
//! A `LogicalFile` owns every object that will be written: the arena. All
//! cross-references between objects are arena keys, resolved to on-wire
//! names only at emission time, once origin references and copy numbers
//! are final. Construction is cheap and incremental; all heavy work
//! happens in `write`.

use std::collections::HashMap;

use log::warn;

use crate::config::{CompatLevel, WriterConfig};
use crate::eflr::attribute::RefResolver;
use crate::eflr::{EflrClass, EflrItem, EflrSet, FileHeader};
use crate::error::DlisError;
use crate::frame_pipeline::source::{ColumnArray, InMemorySource};
use crate::frame_pipeline::NoFormatPayload;
use crate::kernels::RepCode;
use crate::traits::{ByteSink, CancelToken, FrameSource};
use crate::types::{AttrValue, ObjKey, ObjName, Scalar};

pub mod validate;
pub mod writer;

#[cfg(test)]
mod writer_tests;

/// Extra bookkeeping a Channel needs beyond its attributes.
#[derive(Debug, Default, Clone)]
struct ChannelInfo {
    /// Key of the backing dataset; defaults to the channel name.
    dataset_key: Option<String>,
}

/// One DLIS logical file under construction.
pub struct LogicalFile {
    pub(crate) config: WriterConfig,
    pub(crate) sul_sequence_number: u32,
    pub(crate) storage_set_identifier: String,
    pub(crate) file_header: FileHeader,

    /// Every set, in creation order.
    pub(crate) sets: Vec<EflrSet>,
    /// Per class: arena index -> (set position, item position).
    locators: HashMap<EflrClass, Vec<(usize, usize)>>,

    channel_info: HashMap<ObjKey, ChannelInfo>,
    pub(crate) inline_data: InMemorySource,
    pub(crate) no_format_payloads: Vec<(ObjKey, NoFormatPayload)>,
}

impl LogicalFile {
    /// Create a logical file with default Storage Unit Label and File
    /// Header options.
    pub fn new(config: WriterConfig) -> Self {
        Self {
            config,
            sul_sequence_number: 1,
            storage_set_identifier: "MAIN STORAGE UNIT".to_string(),
            file_header: FileHeader::default(),
            sets: Vec::new(),
            locators: HashMap::new(),
            channel_info: HashMap::new(),
            inline_data: InMemorySource::new(),
            no_format_payloads: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(WriterConfig::default())
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Configure the Storage Unit Label slots.
    pub fn set_storage_unit_label(
        &mut self,
        sequence_number: u32,
        set_identifier: impl Into<String>,
    ) {
        self.sul_sequence_number = sequence_number;
        self.storage_set_identifier = set_identifier.into();
    }

    /// Configure the File Header record.
    pub fn set_file_header(
        &mut self,
        sequence_number: u32,
        identifier: impl Into<String>,
    ) -> Result<(), DlisError> {
        self.file_header = FileHeader::new(sequence_number, identifier)?;
        Ok(())
    }

    /// Switch this file into high-compatibility validation for the
    /// lifetime of the returned guard. The previous level is restored when
    /// the guard drops, including on early returns and panics.
    pub fn high_compatibility_mode(&mut self) -> CompatGuard<'_> {
        let prev = self.config.compat;
        self.config.compat = CompatLevel::High;
        CompatGuard { file: self, prev }
    }

    //==============================================================================
    // Object Construction
    //==============================================================================

    /// Add an object of the given class to its unnamed set.
    pub fn add_object(&mut self, class: EflrClass, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object_to_set(class, None, name)
    }

    /// Add an object of the given class to a named set.
    pub fn add_object_to_set(
        &mut self,
        class: EflrClass,
        set_name: Option<&str>,
        name: &str,
    ) -> Result<ObjKey, DlisError> {
        if class == EflrClass::FileHeader {
            return Err(DlisError::Schema(
                "the file header is configured through set_file_header, not as an object".into(),
            ));
        }
        check_object_name(name, self.config.compat)?;

        let set_pos = self.get_or_make_set(class, set_name);
        let item_pos = self.sets[set_pos].items.len();
        self.sets[set_pos].items.push(EflrItem::new(class, name));

        let per_class = self.locators.entry(class).or_default();
        per_class.push((set_pos, item_pos));
        Ok(ObjKey {
            class,
            index: per_class.len() - 1,
        })
    }

    fn get_or_make_set(&mut self, class: EflrClass, set_name: Option<&str>) -> usize {
        let found = self
            .sets
            .iter()
            .position(|s| s.class == class && s.set_name.as_deref() == set_name);
        match found {
            Some(pos) => pos,
            None => {
                self.sets
                    .push(EflrSet::new(class, set_name.map(str::to_string)));
                self.sets.len() - 1
            }
        }
    }

    pub fn item(&self, key: ObjKey) -> Result<&EflrItem, DlisError> {
        let (set_pos, item_pos) = self.locate(key)?;
        Ok(&self.sets[set_pos].items[item_pos])
    }

    pub fn item_mut(&mut self, key: ObjKey) -> Result<&mut EflrItem, DlisError> {
        let (set_pos, item_pos) = self.locate(key)?;
        Ok(&mut self.sets[set_pos].items[item_pos])
    }

    fn locate(&self, key: ObjKey) -> Result<(usize, usize), DlisError> {
        self.locators
            .get(&key.class)
            .and_then(|v| v.get(key.index))
            .copied()
            .ok_or_else(|| {
                DlisError::Reference(format!(
                    "object key {}[{}] does not belong to this logical file",
                    key.class, key.index
                ))
            })
    }

    /// Keys of every object of a class, in insertion order.
    pub fn keys_of_class(&self, class: EflrClass) -> Vec<ObjKey> {
        let n = self.locators.get(&class).map_or(0, Vec::len);
        (0..n).map(|index| ObjKey { class, index }).collect()
    }

    //==============================================================================
    // Attribute Setters
    //==============================================================================

    /// Set an attribute value on an object.
    pub fn set_attr(
        &mut self,
        key: ObjKey,
        label: &str,
        value: impl Into<AttrValue>,
    ) -> Result<(), DlisError> {
        let compat = self.config.compat;
        self.item_mut(key)?
            .attr_mut(label)?
            .set_value(value.into(), compat)
    }

    /// Set the units of an attribute.
    pub fn set_attr_units(
        &mut self,
        key: ObjKey,
        label: &str,
        units: &str,
    ) -> Result<(), DlisError> {
        let compat = self.config.compat;
        self.item_mut(key)?.attr_mut(label)?.set_units(units, compat)
    }

    /// Pin the representation code of an attribute.
    pub fn set_attr_code(
        &mut self,
        key: ObjKey,
        label: &str,
        code: RepCode,
    ) -> Result<(), DlisError> {
        self.item_mut(key)?.attr_mut(label)?.set_code(code)
    }

    /// Explicitly tie an object to an alternative origin reference instead
    /// of the defining origin's file set number.
    pub fn set_object_origin_reference(
        &mut self,
        key: ObjKey,
        origin_reference: u32,
    ) -> Result<(), DlisError> {
        self.item_mut(key)?.origin_reference = Some(origin_reference);
        Ok(())
    }

    //==============================================================================
    // Class Shortcuts
    //==============================================================================

    /// Add an Origin. The first Origin added is the defining origin; its
    /// file set number becomes the origin reference stamped on every
    /// object that does not name another one.
    pub fn add_origin(
        &mut self,
        name: &str,
        file_set_number: Option<u32>,
    ) -> Result<ObjKey, DlisError> {
        let key = self.add_object(EflrClass::Origin, name)?;
        if let Some(n) = file_set_number {
            self.set_attr(key, "FILE-SET-NUMBER", i64::from(n))?;
        }
        Ok(key)
    }

    /// Add a Channel. Shape and representation code are taken from the
    /// backing dataset at write time unless set explicitly.
    pub fn add_channel(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        let key = self.add_object(EflrClass::Channel, name)?;
        self.channel_info.insert(key, ChannelInfo::default());
        Ok(key)
    }

    /// Attach in-memory data to a channel, stored under its dataset key.
    pub fn set_channel_data(
        &mut self,
        channel: ObjKey,
        data: impl Into<ColumnArray>,
    ) -> Result<(), DlisError> {
        let key = self.dataset_key_of(channel)?;
        self.inline_data.insert(key, data.into());
        Ok(())
    }

    /// Point a channel at a dataset of the external source given to
    /// `write`. Keys must be unique across channels.
    pub fn set_channel_dataset(
        &mut self,
        channel: ObjKey,
        dataset_key: &str,
    ) -> Result<(), DlisError> {
        let taken = self.channel_info.iter().any(|(k, info)| {
            *k != channel && info.dataset_key.as_deref() == Some(dataset_key)
        });
        if taken {
            return Err(DlisError::Value(format!(
                "a data set with name '{dataset_key}' already exists"
            )));
        }
        let info = self.channel_info.get_mut(&channel).ok_or_else(|| {
            DlisError::Reference(format!("{} is not a channel of this file", channel.class))
        })?;
        info.dataset_key = Some(dataset_key.to_string());
        Ok(())
    }

    /// The dataset key a channel reads from (explicit or the channel name).
    pub fn dataset_key_of(&self, channel: ObjKey) -> Result<String, DlisError> {
        let info = self.channel_info.get(&channel).ok_or_else(|| {
            DlisError::Reference(format!("{} is not a channel of this file", channel.class))
        })?;
        match &info.dataset_key {
            Some(k) => Ok(k.clone()),
            None => Ok(self.item(channel)?.name.clone()),
        }
    }

    /// Add a Frame over the given channels, in the order given. The first
    /// channel serves as the index channel when an index type is set.
    pub fn add_frame(&mut self, name: &str, channels: &[ObjKey]) -> Result<ObjKey, DlisError> {
        if channels.is_empty() {
            return Err(DlisError::Value(
                "at least one channel must be specified for a frame".into(),
            ));
        }
        let key = self.add_object(EflrClass::Frame, name)?;
        let refs = AttrValue::Vector(channels.iter().map(|c| Scalar::Reference(*c)).collect());
        self.set_attr(key, "CHANNELS", refs)?;
        Ok(key)
    }

    pub fn add_axis(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::Axis, name)
    }

    pub fn add_long_name(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::LongName, name)
    }

    pub fn add_well_reference_point(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::WellReferencePoint, name)
    }

    pub fn add_zone(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::Zone, name)
    }

    pub fn add_parameter(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::Parameter, name)
    }

    pub fn add_equipment(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::Equipment, name)
    }

    pub fn add_tool(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::Tool, name)
    }

    pub fn add_calibration_coefficient(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::CalibrationCoefficient, name)
    }

    pub fn add_calibration_measurement(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::CalibrationMeasurement, name)
    }

    pub fn add_calibration(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::Calibration, name)
    }

    pub fn add_computation(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::Computation, name)
    }

    pub fn add_process(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::Process, name)
    }

    pub fn add_splice(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::Splice, name)
    }

    pub fn add_path(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::Path, name)
    }

    pub fn add_group(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::Group, name)
    }

    pub fn add_message(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::Message, name)
    }

    pub fn add_comment(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::Comment, name)
    }

    pub fn add_no_format(&mut self, name: &str) -> Result<ObjKey, DlisError> {
        self.add_object(EflrClass::NoFormat, name)
    }

    /// Queue an opaque payload to be written as a no-format record after
    /// the frame data.
    pub fn add_no_format_data(
        &mut self,
        target: ObjKey,
        payload: NoFormatPayload,
    ) -> Result<(), DlisError> {
        if target.class != EflrClass::NoFormat {
            return Err(DlisError::Value(format!(
                "no-format data must target a NO-FORMAT object, not {}",
                target.class
            )));
        }
        self.locate(target)?;
        self.no_format_payloads.push((target, payload));
        Ok(())
    }

    //==============================================================================
    // Writing
    //==============================================================================

    /// Validate the object graph and stream the file into the sink.
    pub fn write(
        &mut self,
        sink: &mut dyn ByteSink,
        source: Option<&dyn FrameSource>,
    ) -> Result<(), DlisError> {
        self.write_with(sink, source, None)
    }

    /// As `write`, with a cancellation token checked between chunks.
    pub fn write_with(
        &mut self,
        sink: &mut dyn ByteSink,
        source: Option<&dyn FrameSource>,
        cancel: Option<&CancelToken>,
    ) -> Result<(), DlisError> {
        writer::write_logical_file(self, sink, source, cancel)
    }

    /// Convenience wrapper writing to a file on disk.
    pub fn write_to_path(
        &mut self,
        path: impl AsRef<std::path::Path>,
        source: Option<&dyn FrameSource>,
    ) -> Result<(), DlisError> {
        let mut sink = crate::traits::FileSink::create(path)?;
        self.write(&mut sink, source)
    }
}

impl RefResolver for LogicalFile {
    fn resolve(&self, key: ObjKey) -> Result<(ObjName, &'static str), DlisError> {
        let item = self.item(key)?;
        Ok((item.obname()?, key.class.set_type()))
    }
}

/// Restores the previous compatibility level when dropped.
pub struct CompatGuard<'a> {
    file: &'a mut LogicalFile,
    prev: CompatLevel,
}

impl std::ops::Deref for CompatGuard<'_> {
    type Target = LogicalFile;
    fn deref(&self) -> &LogicalFile {
        self.file
    }
}

impl std::ops::DerefMut for CompatGuard<'_> {
    fn deref_mut(&mut self) -> &mut LogicalFile {
        self.file
    }
}

impl Drop for CompatGuard<'_> {
    fn drop(&mut self) {
        self.file.config.compat = self.prev;
    }
}

/// Check an object name against the allowed character sets: a warning for
/// unusual characters or lowercase, an error in high-compatibility mode.
fn check_object_name(name: &str, compat: CompatLevel) -> Result<(), DlisError> {
    if name.is_empty() {
        return Err(DlisError::Value("object names cannot be empty".into()));
    }
    let plain = name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    match compat {
        CompatLevel::High => {
            let upper = plain && !name.bytes().any(|b| b.is_ascii_lowercase());
            if !upper {
                return Err(DlisError::Value(format!(
                    "in high-compatibility mode, object names may contain only uppercase \
                     letters, digits, dashes, and underscores; got {name:?}"
                )));
            }
        }
        CompatLevel::Standard => {
            if !plain {
                warn!("object name {name:?} contains characters some DLIS viewers reject");
            } else if name.bytes().any(|b| b.is_ascii_lowercase()) {
                warn!("object name {name:?} is not uppercase, which some DLIS viewers reject");
            }
        }
    }
    Ok(())
}
