//! Pre-write validation and graph preparation.
//!
//! Everything here runs before the first byte is produced, so a rejected
//! graph never leaves a partial file behind. Besides the hard checks, this
//! pass fills in the derivable attributes: channel shapes and codes from
//! the source data, frame index statistics, defaulted long names and
//! creation times.

use std::collections::HashMap;

use chrono::Utc;
use log::{info, warn};

use crate::config::CompatLevel;
use crate::eflr::{EflrClass, EflrItem};
use crate::error::DlisError;
use crate::file::LogicalFile;
use crate::frame_pipeline::iflr::ChannelBinding;
use crate::frame_pipeline::source::ColumnDtype;
use crate::kernels::RepCode;
use crate::traits::FrameSource;
use crate::types::{AttrValue, ObjKey, Scalar};

/// Everything the orchestrator needs to stream one frame's data.
#[derive(Debug)]
pub(crate) struct FramePlan {
    pub frame: ObjKey,
    pub dataset_keys: Vec<String>,
    pub bindings: Vec<ChannelBinding>,
    pub n_rows: usize,
}

/// Run all pre-write checks, fill in derivable attributes, and build one
/// plan per frame. Returns the plans and the defining origin reference.
pub(crate) fn prepare(
    file: &mut LogicalFile,
    source: &dyn FrameSource,
) -> Result<(Vec<FramePlan>, u32), DlisError> {
    let default_origin_reference = prepare_origins(file)?;
    let channel_frames = map_channels_to_frames(file)?;
    warn_freelance_channels(file, &channel_frames);

    let mut plans = Vec::new();
    for frame in file.keys_of_class(EflrClass::Frame) {
        plans.push(prepare_frame(file, frame, source)?);
    }

    check_computations(file)?;
    check_zones(file)?;
    check_elapsed_time_units(file);

    Ok((plans, default_origin_reference))
}

//==================================================================================
// I. Origins
//==================================================================================

fn prepare_origins(file: &mut LogicalFile) -> Result<u32, DlisError> {
    let origins = file.keys_of_class(EflrClass::Origin);
    if origins.is_empty() {
        return Err(DlisError::Config(
            "a logical file requires at least one Origin".into(),
        ));
    }

    for (i, key) in origins.iter().enumerate() {
        let compat = file.config.compat;
        let item = file.item_mut(*key)?;
        if attr_int(item, "FILE-SET-NUMBER").is_none() {
            match compat {
                CompatLevel::High => {
                    // Consecutive file set numbers keep the pickiest
                    // viewers happy.
                    item.attr_mut("FILE-SET-NUMBER")?
                        .set_value(AttrValue::from(i as i64 + 1), compat)?;
                }
                CompatLevel::Standard if i == 0 => {
                    return Err(DlisError::Config(
                        "the defining Origin must have a FILE-SET-NUMBER".into(),
                    ))
                }
                CompatLevel::Standard => {}
            }
        }
        if item.attr("CREATION-TIME").map_or(false, |a| !a.is_set()) {
            info!("creation time of Origin not specified; using the current date and time");
            item.attr_mut("CREATION-TIME")?
                .set_value(AttrValue::from(Utc::now()), compat)?;
        }
    }

    let defining = file.item(origins[0])?;
    let fsn = attr_int(defining, "FILE-SET-NUMBER")
        .ok_or_else(|| DlisError::Config("the defining Origin must have a FILE-SET-NUMBER".into()))?;
    u32::try_from(fsn)
        .map_err(|_| DlisError::Value(format!("FILE-SET-NUMBER {fsn} is out of range")))
}

//==================================================================================
// II. Channel/Frame Topology
//==================================================================================

fn map_channels_to_frames(
    file: &LogicalFile,
) -> Result<HashMap<ObjKey, ObjKey>, DlisError> {
    let mut owner: HashMap<ObjKey, ObjKey> = HashMap::new();
    for frame in file.keys_of_class(EflrClass::Frame) {
        for channel in attr_refs(file.item(frame)?, "CHANNELS") {
            if let Some(previous) = owner.insert(channel, frame) {
                let ch_name = file.item(channel)?.name.clone();
                let a = file.item(previous)?.name.clone();
                let b = file.item(frame)?.name.clone();
                return Err(DlisError::Value(format!(
                    "channel '{ch_name}' is referenced by frames '{a}' and '{b}'; \
                     a channel may belong to at most one frame"
                )));
            }
        }
    }
    Ok(owner)
}

fn warn_freelance_channels(file: &LogicalFile, owner: &HashMap<ObjKey, ObjKey>) {
    for channel in file.keys_of_class(EflrClass::Channel) {
        if !owner.contains_key(&channel) {
            if let Ok(item) = file.item(channel) {
                warn!(
                    "channel '{}' is not referenced by any frame; it will carry no data",
                    item.name
                );
            }
        }
    }
}

//==================================================================================
// III. Per-Frame Preparation
//==================================================================================

fn prepare_frame(
    file: &mut LogicalFile,
    frame: ObjKey,
    source: &dyn FrameSource,
) -> Result<FramePlan, DlisError> {
    let channels = attr_refs(file.item(frame)?, "CHANNELS");
    if channels.is_empty() {
        return Err(DlisError::Value(format!(
            "frame '{}' references no channels",
            file.item(frame)?.name
        )));
    }

    let mut dataset_keys = Vec::with_capacity(channels.len());
    let mut bindings = Vec::with_capacity(channels.len());
    let mut n_rows: Option<usize> = None;

    for channel in &channels {
        let (binding, rows) = prepare_channel(file, *channel, source)?;
        match n_rows {
            None => n_rows = Some(rows),
            Some(n) if n != rows => {
                return Err(DlisError::Data(format!(
                    "channels of frame '{}' disagree on the row count ({n} vs {rows})",
                    file.item(frame)?.name,
                )))
            }
            Some(_) => {}
        }
        dataset_keys.push(binding.dataset_key.clone());
        bindings.push(binding);
    }

    let n_rows = n_rows.unwrap_or(0);
    prepare_frame_index(file, frame, channels[0], &bindings[0], source, n_rows)?;

    Ok(FramePlan {
        frame,
        dataset_keys,
        bindings,
        n_rows,
    })
}

/// Fill in a channel's shape-derived attributes; returns the channel's
/// binding and the dataset's row count.
fn prepare_channel(
    file: &mut LogicalFile,
    channel: ObjKey,
    source: &dyn FrameSource,
) -> Result<(ChannelBinding, usize), DlisError> {
    let dataset_key = file.dataset_key_of(channel)?;
    let compat = file.config.compat;
    let name = file.item(channel)?.name.clone();

    let shape = source.dataset_shape(&dataset_key).ok_or_else(|| {
        DlisError::Data(format!(
            "no dataset '{dataset_key}' (declared by channel '{name}') found in the source data"
        ))
    })?;

    let item = file.item_mut(channel)?;

    // Dimension and element limit: derive from the data or verify.
    let declared_width = match attr_int_vec(item, "DIMENSION") {
        Some(dims) if dims.len() == 1 => Some(dims[0] as usize),
        Some(dims) => {
            return Err(DlisError::Value(format!(
                "channel '{name}': only scalar or single-dimension samples are supported; \
                 got dimension {dims:?}"
            )))
        }
        None => None,
    };
    match declared_width {
        Some(w) if w != shape.width => {
            return Err(DlisError::Data(format!(
                "channel '{name}': declared dimension [{w}] does not match the dataset width {}",
                shape.width
            )))
        }
        Some(_) => {}
        None => {
            item.attr_mut("DIMENSION")?
                .set_value(AttrValue::vector([shape.width as i64]), compat)?;
        }
    }
    match attr_int_vec(item, "ELEMENT-LIMIT") {
        Some(lim) if lim.len() == 1 && lim[0] as usize == shape.width => {}
        Some(lim) => warn!(
            "channel '{name}': element limit {lim:?} differs from dimension [{}]",
            shape.width
        ),
        None => {
            item.attr_mut("ELEMENT-LIMIT")?
                .set_value(AttrValue::vector([shape.width as i64]), compat)?;
        }
    }

    // Representation code: derive from the element type or verify.
    let dtype = match attr_int(item, "REPRESENTATION-CODE") {
        Some(v) => {
            let code = u8::try_from(v)
                .ok()
                .and_then(RepCode::from_value)
                .ok_or_else(|| {
                    DlisError::Value(format!("channel '{name}': {v} is not a representation code"))
                })?;
            let declared = ColumnDtype::from_rep_code(code).ok_or_else(|| {
                DlisError::Value(format!(
                    "channel '{name}': code {code} cannot carry frame data"
                ))
            })?;
            if declared != shape.dtype {
                return Err(DlisError::Data(format!(
                    "channel '{name}': declared representation code {code} does not match \
                     the dataset element type {:?}",
                    shape.dtype
                )));
            }
            declared
        }
        None => {
            let code = shape.dtype.rep_code();
            item.attr_mut("REPRESENTATION-CODE")?
                .set_value(AttrValue::from(i64::from(code.value())), compat)?;
            shape.dtype
        }
    };

    // A channel without a long name gets its own name as one.
    if item.attr("LONG-NAME").map_or(false, |a| !a.is_set()) {
        item.attr_mut("LONG-NAME")?
            .set_value(AttrValue::from(name.as_str()), compat)?;
    }

    Ok((
        ChannelBinding {
            dataset_key,
            dtype,
            width: shape.width,
        },
        shape.rows,
    ))
}

//==================================================================================
// IV. Frame Index Setup
//==================================================================================

#[derive(Debug, Default)]
struct IndexStats {
    n_rows: usize,
    min: f64,
    max: f64,
    monotonic: bool,
    increasing: Option<bool>,
    spacing: Option<f64>,
}

fn prepare_frame_index(
    file: &mut LogicalFile,
    frame: ObjKey,
    index_channel: ObjKey,
    index_binding: &ChannelBinding,
    source: &dyn FrameSource,
    n_rows: usize,
) -> Result<(), DlisError> {
    let compat = file.config.compat;
    let frame_name = file.item(frame)?.name.clone();
    let has_index_type = file
        .item(frame)?
        .attr("INDEX-TYPE")
        .map_or(false, |a| a.is_set());

    if !has_index_type {
        // No index channel: frames are indexed by row number.
        let item = file.item_mut(frame)?;
        set_if_unset(item, "SPACING", AttrValue::from(1i64), compat)?;
        set_if_unset(item, "INDEX-MIN", AttrValue::from(1i64), compat)?;
        set_if_unset(item, "INDEX-MAX", AttrValue::from(n_rows as i64), compat)?;
        return Ok(());
    }

    let index_key = &index_binding.dataset_key;
    if index_binding.width != 1 {
        return Err(DlisError::Value(format!(
            "the index channel of frame '{frame_name}' must be scalar; its rows carry {} samples",
            index_binding.width
        )));
    }
    if n_rows == 0 {
        return Ok(());
    }

    let stats = scan_index(source, index_key, file.config.input_chunk_size)?;
    if !stats.monotonic {
        warn!(
            "the index channel of frame '{frame_name}' is not monotonic; \
             some viewers will not read past it"
        );
    }

    let index_units = file
        .item(index_channel)?
        .attr("UNITS")
        .and_then(|a| a.value())
        .and_then(|v| match v {
            AttrValue::Single(Scalar::Text(t)) => Some(t.clone()),
            _ => None,
        });

    let item = file.item_mut(frame)?;
    set_if_unset(item, "INDEX-MIN", AttrValue::from(stats.min), compat)?;
    set_if_unset(item, "INDEX-MAX", AttrValue::from(stats.max), compat)?;

    match stats.spacing {
        Some(spacing) => {
            set_if_unset(item, "SPACING", AttrValue::from(spacing), compat)?;
        }
        // A single row has no spacing to speak of; leave it unset.
        None if stats.n_rows < 2 => {}
        None => {
            let msg = format!(
                "the index spacing of frame '{frame_name}' is not uniform; this can cause \
                 issues in some viewer software"
            );
            if compat == CompatLevel::High {
                return Err(DlisError::Value(msg));
            }
            warn!("{msg}");
            if let Some(increasing) = stats.increasing {
                let dir = if increasing { "INCREASING" } else { "DECREASING" };
                set_if_unset(item, "DIRECTION", AttrValue::from(dir), compat)?;
            }
        }
    }

    if let Some(units) = index_units {
        for label in ["INDEX-MIN", "INDEX-MAX", "SPACING"] {
            let attr = item.attr_mut(label)?;
            if attr.is_set() && attr.units().is_none() {
                attr.set_units(&units, compat)?;
            }
        }
    }
    Ok(())
}

/// Stream over the index dataset once, collecting range, monotonicity, and
/// spacing uniformity. Spacing counts as uniform when every step deviates
/// from the first step by less than 0.1%.
fn scan_index(
    source: &dyn FrameSource,
    key: &str,
    chunk_rows: usize,
) -> Result<IndexStats, DlisError> {
    let keys = [key.to_string()];
    let mut cursor = source.open_cursor(&keys, chunk_rows)?;

    let mut prev: Option<f64> = None;
    let mut first_diff: Option<f64> = None;
    let mut uniform = true;
    let mut rising = false;
    let mut falling = false;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut n_rows = 0usize;

    while let Some(chunk) = cursor.next_chunk()? {
        let col = chunk.column(key)?;
        n_rows += chunk.n_rows;
        for row in 0..chunk.n_rows {
            let v = col.get_f64(row, 0);
            min = min.min(v);
            max = max.max(v);
            if let Some(p) = prev {
                let diff = v - p;
                if diff > 0.0 {
                    rising = true;
                } else if diff < 0.0 {
                    falling = true;
                }
                match first_diff {
                    None => first_diff = Some(diff),
                    Some(d0) => {
                        let scale = d0.abs().max(f64::MIN_POSITIVE);
                        if (diff - d0).abs() / scale > 1e-3 {
                            uniform = false;
                        }
                    }
                }
            }
            prev = Some(v);
        }
    }

    let spacing = match first_diff {
        Some(d0) if uniform && d0 != 0.0 => Some(d0),
        _ => None,
    };
    Ok(IndexStats {
        n_rows,
        min,
        max,
        monotonic: !(rising && falling),
        increasing: match (rising, falling) {
            (true, false) => Some(true),
            (false, true) => Some(false),
            _ => None,
        },
        spacing,
    })
}

//==================================================================================
// V. Cross-Object Checks
//==================================================================================

fn check_computations(file: &LogicalFile) -> Result<(), DlisError> {
    for key in file.keys_of_class(EflrClass::Computation) {
        let item = file.item(key)?;
        let zones = attr_refs(item, "ZONES");
        let values = item.attr("VALUES").and_then(|a| a.value()).map(AttrValue::count);
        if let (false, Some(n_values)) = (zones.is_empty(), values) {
            if zones.len() != n_values {
                return Err(DlisError::Value(format!(
                    "computation '{}': {} values for {} zones; the counts must match",
                    item.name,
                    n_values,
                    zones.len()
                )));
            }
        }
    }
    Ok(())
}

fn check_zones(file: &LogicalFile) -> Result<(), DlisError> {
    for key in file.keys_of_class(EflrClass::Zone) {
        let item = file.item(key)?;
        let domain = match item.attr("DOMAIN").and_then(|a| a.value()) {
            Some(AttrValue::Single(Scalar::Text(d))) => Some(d.clone()),
            _ => None,
        };
        let minimum = zone_bound(item, "MINIMUM");
        let maximum = zone_bound(item, "MAXIMUM");

        if let (Some(domain), Some(mn), Some(mx)) = (&domain, &minimum, &maximum) {
            match (mn, mx) {
                (ZoneBound::Time(a), ZoneBound::Time(b)) => {
                    if domain != "TIME" {
                        return Err(DlisError::Value(format!(
                            "zone '{}': domain is '{domain}', so only numeric bounds are allowed",
                            item.name
                        )));
                    }
                    if a > b {
                        return Err(DlisError::Value(format!(
                            "zone '{}': minimum is later than maximum",
                            item.name
                        )));
                    }
                }
                (ZoneBound::Number(a), ZoneBound::Number(b)) => {
                    if a > b {
                        return Err(DlisError::Value(format!(
                            "zone '{}': minimum {a} exceeds maximum {b}",
                            item.name
                        )));
                    }
                }
                _ => {
                    return Err(DlisError::Value(format!(
                        "zone '{}': minimum and maximum must both be times or both numbers",
                        item.name
                    )))
                }
            }
        } else if let (Some(mn), Some(mx)) = (&minimum, &maximum) {
            if matches!(mn, ZoneBound::Time(_)) != matches!(mx, ZoneBound::Time(_)) {
                return Err(DlisError::Value(format!(
                    "zone '{}': minimum and maximum must both be times or both numbers",
                    item.name
                )));
            }
        }
    }
    Ok(())
}

enum ZoneBound {
    Time(chrono::DateTime<Utc>),
    Number(f64),
}

fn zone_bound(item: &EflrItem, label: &str) -> Option<ZoneBound> {
    match item.attr(label)?.value()? {
        AttrValue::Single(Scalar::DateTime(t)) => Some(ZoneBound::Time(*t)),
        AttrValue::Single(Scalar::Double(d)) => Some(ZoneBound::Number(*d)),
        AttrValue::Single(Scalar::Int(i)) => Some(ZoneBound::Number(*i as f64)),
        _ => None,
    }
}

/// Elapsed-time attributes (a date-time slot holding a number) need units
/// to be interpretable.
fn check_elapsed_time_units(file: &LogicalFile) {
    for set in &file.sets {
        for item in &set.items {
            for attr in item.attrs() {
                let is_dtime_slot = matches!(
                    attr.spec().constraint,
                    crate::eflr::Constraint::DTime { allow_numeric: true }
                );
                if !is_dtime_slot || attr.units().is_some() {
                    continue;
                }
                let numeric = matches!(
                    attr.value(),
                    Some(AttrValue::Single(Scalar::Int(_) | Scalar::Double(_)))
                );
                if numeric {
                    warn!(
                        "attribute {} of '{}' holds an elapsed time without units",
                        attr.label(),
                        item.name
                    );
                }
            }
        }
    }
}

//==================================================================================
// VI. Attribute Accessors
//==================================================================================

fn set_if_unset(
    item: &mut EflrItem,
    label: &str,
    value: AttrValue,
    compat: CompatLevel,
) -> Result<(), DlisError> {
    let attr = item.attr_mut(label)?;
    if !attr.is_set() {
        attr.set_value(value, compat)?;
    }
    Ok(())
}

pub(crate) fn attr_int(item: &EflrItem, label: &str) -> Option<i64> {
    match item.attr(label)?.value()? {
        AttrValue::Single(Scalar::Int(i)) => Some(*i),
        _ => None,
    }
}

fn attr_int_vec(item: &EflrItem, label: &str) -> Option<Vec<i64>> {
    let value = item.attr(label)?.value()?;
    let mut out = Vec::with_capacity(value.count());
    for s in value.iter_flat() {
        match s {
            Scalar::Int(i) => out.push(*i),
            _ => return None,
        }
    }
    Some(out)
}

pub(crate) fn attr_refs(item: &EflrItem, label: &str) -> Vec<ObjKey> {
    match item.attr(label).and_then(|a| a.value()) {
        Some(v) => v
            .iter_flat()
            .filter_map(|s| match s {
                Scalar::Reference(k) => Some(*k),
                _ => None,
            })
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_pipeline::source::InMemorySource;

    fn file_with_origin() -> LogicalFile {
        let mut f = LogicalFile::with_defaults();
        f.add_origin("ORIGIN", Some(1)).unwrap();
        f
    }

    #[test]
    fn missing_origin_is_fatal() {
        let mut f = LogicalFile::with_defaults();
        let src = InMemorySource::new();
        assert!(matches!(
            prepare(&mut f, &src),
            Err(DlisError::Config(_))
        ));
    }

    #[test]
    fn defining_origin_needs_a_file_set_number() {
        let mut f = LogicalFile::with_defaults();
        f.add_origin("ORIGIN", None).unwrap();
        let src = InMemorySource::new();
        assert!(matches!(prepare(&mut f, &src), Err(DlisError::Config(_))));
    }

    #[test]
    fn high_compat_auto_assigns_file_set_numbers() {
        let mut f = LogicalFile::new(crate::config::WriterConfig::high_compatibility());
        f.add_origin("FIRST", None).unwrap();
        f.add_origin("SECOND", None).unwrap();
        let src = InMemorySource::new();
        let (_, fsn) = prepare(&mut f, &src).unwrap();
        assert_eq!(fsn, 1);
        let second = f.keys_of_class(EflrClass::Origin)[1];
        assert_eq!(attr_int(f.item(second).unwrap(), "FILE-SET-NUMBER"), Some(2));
    }

    #[test]
    fn creation_time_is_defaulted() {
        let mut f = file_with_origin();
        let src = InMemorySource::new();
        prepare(&mut f, &src).unwrap();
        let origin = f.keys_of_class(EflrClass::Origin)[0];
        assert!(f
            .item(origin)
            .unwrap()
            .attr("CREATION-TIME")
            .unwrap()
            .is_set());
    }

    #[test]
    fn shared_channel_across_frames_is_rejected() {
        let mut f = file_with_origin();
        let ch = f.add_channel("DEPTH").unwrap();
        f.set_channel_data(ch, vec![0.0f64, 1.0]).unwrap();
        f.add_frame("A", &[ch]).unwrap();
        f.add_frame("B", &[ch]).unwrap();
        let src = InMemorySource::new();
        let err = prepare(&mut f, &src);
        assert!(matches!(err, Err(DlisError::Value(_))));
    }

    #[test]
    fn channel_shape_and_code_come_from_the_data() {
        let mut f = file_with_origin();
        let ch = f.add_channel("GAMMA").unwrap();
        f.add_frame("MAIN", &[ch]).unwrap();
        let mut src = InMemorySource::new();
        src.insert("GAMMA", vec![1i32, 2, 3]);
        let (plans, _) = prepare(&mut f, &src).unwrap();

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].n_rows, 3);
        assert_eq!(plans[0].bindings[0].dtype, ColumnDtype::Int32);
        let item = f.item(ch).unwrap();
        assert_eq!(attr_int_vec(item, "DIMENSION"), Some(vec![1]));
        assert_eq!(attr_int_vec(item, "ELEMENT-LIMIT"), Some(vec![1]));
        assert_eq!(
            attr_int(item, "REPRESENTATION-CODE"),
            Some(i64::from(RepCode::SLong.value()))
        );
    }

    #[test]
    fn declared_code_must_match_the_data() {
        let mut f = file_with_origin();
        let ch = f.add_channel("GAMMA").unwrap();
        f.set_attr(ch, "REPRESENTATION-CODE", i64::from(RepCode::FDoubl.value()))
            .unwrap();
        f.add_frame("MAIN", &[ch]).unwrap();
        let mut src = InMemorySource::new();
        src.insert("GAMMA", vec![1i32, 2, 3]);
        assert!(matches!(prepare(&mut f, &src), Err(DlisError::Data(_))));
    }

    #[test]
    fn missing_dataset_is_fatal() {
        let mut f = file_with_origin();
        let ch = f.add_channel("GAMMA").unwrap();
        f.add_frame("MAIN", &[ch]).unwrap();
        let src = InMemorySource::new();
        assert!(matches!(prepare(&mut f, &src), Err(DlisError::Data(_))));
    }

    #[test]
    fn unindexed_frame_is_numbered_by_row() {
        let mut f = file_with_origin();
        let ch = f.add_channel("GAMMA").unwrap();
        f.set_channel_data(ch, vec![5i32, 6, 7, 8]).unwrap();
        let frame = f.add_frame("MAIN", &[ch]).unwrap();
        let inline = std::mem::take(&mut f.inline_data);
        prepare(&mut f, &inline).unwrap();
        let item = f.item(frame).unwrap();
        assert_eq!(attr_int(item, "INDEX-MIN"), Some(1));
        assert_eq!(attr_int(item, "INDEX-MAX"), Some(4));
        assert_eq!(attr_int(item, "SPACING"), Some(1));
    }

    #[test]
    fn indexed_frame_gets_min_max_and_spacing() {
        let mut f = file_with_origin();
        let depth = f.add_channel("DEPTH").unwrap();
        f.set_attr(depth, "UNITS", "m").unwrap();
        let frame = f.add_frame("MAIN", &[depth]).unwrap();
        f.set_attr(frame, "INDEX-TYPE", "BOREHOLE-DEPTH").unwrap();
        let mut src = InMemorySource::new();
        src.insert("DEPTH", vec![100.0f64, 100.5, 101.0, 101.5]);
        prepare(&mut f, &src).unwrap();

        let item = f.item(frame).unwrap();
        let min = item.attr("INDEX-MIN").unwrap();
        assert_eq!(min.value(), Some(&AttrValue::from(100.0)));
        assert_eq!(min.units(), Some("m"));
        assert_eq!(
            item.attr("SPACING").unwrap().value(),
            Some(&AttrValue::from(0.5))
        );
    }

    #[test]
    fn non_uniform_index_fails_only_in_high_compat() {
        let data = vec![0.0f64, 1.0, 2.0, 10.0];
        for (compat, ok) in [(CompatLevel::Standard, true), (CompatLevel::High, false)] {
            let mut cfg = crate::config::WriterConfig::default();
            cfg.compat = compat;
            let mut f = LogicalFile::new(cfg);
            f.add_origin("ORIGIN", Some(1)).unwrap();
            let depth = f.add_channel("DEPTH").unwrap();
            let frame = f.add_frame("MAIN", &[depth]).unwrap();
            f.set_attr(frame, "INDEX-TYPE", "BOREHOLE-DEPTH").unwrap();
            let mut src = InMemorySource::new();
            src.insert("DEPTH", data.clone());
            assert_eq!(prepare(&mut f, &src).is_ok(), ok, "{compat:?}");
        }
    }

    #[test]
    fn wide_index_channel_is_rejected() {
        let mut f = file_with_origin();
        let depth = f.add_channel("DEPTH").unwrap();
        let frame = f.add_frame("MAIN", &[depth]).unwrap();
        f.set_attr(frame, "INDEX-TYPE", "BOREHOLE-DEPTH").unwrap();
        let mut src = InMemorySource::new();
        src.insert(
            "DEPTH",
            ndarray::Array2::<f64>::zeros((4, 2)),
        );
        assert!(matches!(prepare(&mut f, &src), Err(DlisError::Value(_))));
    }

    #[test]
    fn computation_values_must_match_zones() {
        let mut f = file_with_origin();
        let z1 = f.add_zone("Z1").unwrap();
        let z2 = f.add_zone("Z2").unwrap();
        let c = f.add_computation("C").unwrap();
        f.set_attr(
            c,
            "ZONES",
            AttrValue::Vector(vec![Scalar::Reference(z1), Scalar::Reference(z2)]),
        )
        .unwrap();
        f.set_attr(c, "VALUES", AttrValue::vector([1.0f64])).unwrap();
        let src = InMemorySource::new();
        assert!(matches!(prepare(&mut f, &src), Err(DlisError::Value(_))));
    }

    #[test]
    fn zone_bounds_must_be_ordered_and_match_the_domain() {
        let mut f = file_with_origin();
        let z = f.add_zone("Z").unwrap();
        f.set_attr(z, "DOMAIN", "BOREHOLE-DEPTH").unwrap();
        f.set_attr(z, "MINIMUM", 10.0).unwrap();
        f.set_attr(z, "MAXIMUM", 5.0).unwrap();
        let src = InMemorySource::new();
        assert!(matches!(prepare(&mut f, &src), Err(DlisError::Value(_))));

        let mut f = file_with_origin();
        let z = f.add_zone("Z").unwrap();
        f.set_attr(z, "DOMAIN", "VERTICAL-DEPTH").unwrap();
        f.set_attr(z, "MINIMUM", Utc::now()).unwrap();
        f.set_attr(z, "MAXIMUM", Utc::now()).unwrap();
        let src = InMemorySource::new();
        assert!(matches!(prepare(&mut f, &src), Err(DlisError::Value(_))));
    }
}
