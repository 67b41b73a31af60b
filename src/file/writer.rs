//! The write orchestrator.
//!
//! A single pass drives the whole pipeline: validate and prepare the
//! graph, stamp origin references and copy numbers, then stream the
//! Storage Unit Label, the File Header, every EFLR set in dependency
//! order, the frame data of each frame, and finally any no-format
//! payloads. Every record body funnels through segmentation and
//! visible-record packing into the sink.

use std::collections::HashMap;

use log::info;

use crate::eflr::{EflrClass, EMISSION_ORDER};
use crate::error::DlisError;
use crate::file::{validate, LogicalFile};
use crate::frame_pipeline::iflr::{
    no_format_body, FrameRowEmitter, IFLR_TYPE_FRAME_DATA, IFLR_TYPE_NO_FORMAT,
};
use crate::frame_pipeline::source::ChainedSource;
use crate::record_pipeline::segment::{LogicalRecordBytes, LrType};
use crate::record_pipeline::sul::StorageUnitLabel;
use crate::record_pipeline::visible::VisibleRecordWriter;
use crate::traits::{ByteSink, CancelToken, FrameSource};

pub(crate) fn write_logical_file(
    file: &mut LogicalFile,
    sink: &mut dyn ByteSink,
    source: Option<&dyn FrameSource>,
    cancel: Option<&CancelToken>,
) -> Result<(), DlisError> {
    file.config.validate()?;

    // Channel data attached to the file acts as a fallback behind the
    // external source. It is moved out for the duration of the write so
    // the file itself can stay mutably borrowed.
    let inline = std::mem::take(&mut file.inline_data);
    let result = (|| {
        let chained = ChainedSource::new(source, &inline);
        write_prepared(file, sink, &chained, cancel)
    })();
    file.inline_data = inline;
    result
}

fn write_prepared(
    file: &mut LogicalFile,
    sink: &mut dyn ByteSink,
    source: &dyn FrameSource,
    cancel: Option<&CancelToken>,
) -> Result<(), DlisError> {
    // 1. Validation, attribute derivation, frame plans. Errors here leave
    //    the sink untouched.
    let (plans, default_origin_reference) = validate::prepare(file, source)?;
    stamp_origin_references(file, default_origin_reference)?;
    assign_copy_numbers(file)?;

    let sul = StorageUnitLabel::new(
        file.sul_sequence_number,
        file.storage_set_identifier.clone(),
        file.config.max_record_length,
    )?;

    // 2. From here on, bytes flow.
    let mut vr = VisibleRecordWriter::new(&file.config, &mut *sink);
    let max_body = vr.max_segment_body();
    vr.write_raw(&sul.bytes()?)?;

    let fh_body = file.file_header.body_bytes(default_origin_reference)?;
    emit_record(&mut vr, LrType::Eflr(0), fh_body, max_body)?;

    // 3. EFLR sets, referents before referrers.
    let resolver = &*file;
    for class in EMISSION_ORDER {
        if class == EflrClass::FileHeader {
            continue;
        }
        for set in resolver.sets.iter().filter(|s| s.class == class) {
            if let Some(body) = set.body_bytes(resolver)? {
                emit_record(&mut vr, LrType::Eflr(class.record_type()), body, max_body)?;
            }
        }
    }

    // 4. Frame data, one frame at a time, one chunk at a time.
    for plan in &plans {
        let frame_name = file.item(plan.frame)?.obname()?;
        let mut emitter = FrameRowEmitter::new(&frame_name, plan.bindings.clone())?;
        let mut cursor = source.open_cursor(&plan.dataset_keys, file.config.input_chunk_size)?;
        while let Some(chunk) = cursor.next_chunk()? {
            check_cancelled(cancel)?;
            emitter.emit_rows(&chunk, |body| {
                emit_record(&mut vr, LrType::Iflr(IFLR_TYPE_FRAME_DATA), body, max_body)
            })?;
        }
        if emitter.rows_emitted() as usize != plan.n_rows {
            return Err(DlisError::Data(format!(
                "frame '{}': source yielded {} rows, {} were declared",
                frame_name.name,
                emitter.rows_emitted(),
                plan.n_rows
            )));
        }
    }

    // 5. No-format payloads follow the frame groups.
    for (target, payload) in &file.no_format_payloads {
        let obname = file.item(*target)?.obname()?;
        let body = no_format_body(&obname, payload)?;
        emit_record(&mut vr, LrType::Iflr(IFLR_TYPE_NO_FORMAT), body, max_body)?;
    }

    check_cancelled(cancel)?;
    vr.finish()?;
    drop(vr);
    info!("wrote {} bytes", sink.total_written());
    Ok(())
}

fn emit_record(
    vr: &mut VisibleRecordWriter<'_>,
    lr_type: LrType,
    body: Vec<u8>,
    max_body: usize,
) -> Result<(), DlisError> {
    let record = LogicalRecordBytes::new(lr_type, body);
    for segment in record.make_segments(max_body)? {
        vr.add_segment(&segment)?;
    }
    Ok(())
}

fn check_cancelled(cancel: Option<&CancelToken>) -> Result<(), DlisError> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(DlisError::Cancelled),
        _ => Ok(()),
    }
}

/// Give every object an origin reference: the explicitly assigned one if
/// any, an Origin's own file set number for Origin items, and the defining
/// origin's file set number for everything else.
fn stamp_origin_references(file: &mut LogicalFile, default_ref: u32) -> Result<(), DlisError> {
    for key in file.keys_of_class(EflrClass::Origin) {
        let own = validate::attr_int(file.item(key)?, "FILE-SET-NUMBER");
        let item = file.item_mut(key)?;
        if item.origin_reference.is_none() {
            item.origin_reference = match own {
                Some(n) => Some(u32::try_from(n).map_err(|_| {
                    DlisError::Value(format!("FILE-SET-NUMBER {n} is out of range"))
                })?),
                None => Some(default_ref),
            };
        }
    }
    for set in &mut file.sets {
        for item in &mut set.items {
            if item.origin_reference.is_none() {
                item.origin_reference = Some(default_ref);
            }
        }
    }
    Ok(())
}

/// Copy numbers disambiguate objects sharing an origin, a name, and a set
/// type: the first keeps 0, later ones count up in insertion order.
fn assign_copy_numbers(file: &mut LogicalFile) -> Result<(), DlisError> {
    for class in EMISSION_ORDER {
        let keys = file.keys_of_class(class);
        let mut seen: HashMap<(u32, String), u8> = HashMap::new();
        for key in keys {
            let item = file.item_mut(key)?;
            let origin = item.origin_reference.unwrap_or(0);
            let counter = seen.entry((origin, item.name.clone())).or_insert(0);
            item.copy_number = *counter;
            *counter = counter.checked_add(1).ok_or_else(|| {
                DlisError::Value(format!(
                    "more than 256 objects named '{}' in one set type",
                    item.name
                ))
            })?;
        }
    }
    Ok(())
}
