//! End-to-end tests: build a logical file, write it into a memory sink,
//! and walk the produced byte stream record by record.

use chrono::TimeZone;
use ndarray::Array2;

use crate::config::WriterConfig;
use crate::error::DlisError;
use crate::file::LogicalFile;
use crate::frame_pipeline::source::InMemorySource;
use crate::frame_pipeline::NoFormatPayload;
use crate::record_pipeline::segment::parse_segment;
use crate::record_pipeline::visible::iter_visible_records;
use crate::record_pipeline::sul::SUL_LENGTH;
use crate::traits::CancelToken;
use crate::types::AttrValue;

/// A logical record reassembled from the stream.
#[derive(Debug)]
struct ParsedRecord {
    lr_type: u8,
    is_eflr: bool,
    body: Vec<u8>,
}

/// Walk the stream after the SUL, splitting visible records into segments
/// and stitching split records back together.
fn parse_stream(stream: &[u8]) -> Vec<ParsedRecord> {
    let mut records: Vec<ParsedRecord> = Vec::new();
    let mut open: Option<ParsedRecord> = None;

    for vr_body in iter_visible_records(&stream[SUL_LENGTH..]) {
        let mut pos = 0;
        while pos + 4 <= vr_body.len() {
            let size = u16::from_be_bytes([vr_body[pos], vr_body[pos + 1]]) as usize;
            let segment = &vr_body[pos..pos + size];
            let (payload, lr_type, flags) = parse_segment(segment).expect("valid segment");
            let record = match open.take() {
                Some(mut r) => {
                    assert!(flags.has_predecessor, "continuation without predecessor bit");
                    r.body.extend_from_slice(payload);
                    r
                }
                None => {
                    assert!(!flags.has_predecessor, "first segment with predecessor bit");
                    ParsedRecord {
                        lr_type,
                        is_eflr: flags.is_eflr,
                        body: payload.to_vec(),
                    }
                }
            };
            if flags.has_successor {
                open = Some(record);
            } else {
                records.push(record);
            }
            pos += size;
        }
    }
    assert!(open.is_none(), "stream ended inside a split record");
    records
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// The minimal-frame fixture: one origin, DEPTH and RPM doubles, one row.
fn minimal_file() -> LogicalFile {
    let mut f = LogicalFile::with_defaults();
    f.add_origin("MY-ORIGIN", Some(1)).unwrap();
    let depth = f.add_channel("DEPTH").unwrap();
    f.set_channel_data(depth, vec![0.0f64]).unwrap();
    let rpm = f.add_channel("RPM").unwrap();
    f.set_channel_data(rpm, vec![7.5f64]).unwrap();
    let frame = f.add_frame("MAIN", &[depth, rpm]).unwrap();
    f.set_attr(frame, "INDEX-TYPE", "BOREHOLE-DEPTH").unwrap();
    f
}

#[test]
fn minimal_frame_single_row() {
    let mut f = minimal_file();
    let mut sink: Vec<u8> = Vec::new();
    f.write(&mut sink, None).unwrap();

    // The SUL leads, with the record length in its fourth slot.
    assert_eq!(&sink[15..20], b"08192");
    assert_eq!(&sink[4..9], b"V1.00");

    let records = parse_stream(&sink);

    // File header first: a 120-byte EFLR of type 0.
    assert_eq!(records[0].lr_type, 0);
    assert!(records[0].is_eflr);
    assert_eq!(records[0].body.len(), 120);

    // Then the Origin set.
    assert_eq!(records[1].lr_type, 1);
    assert!(find_subslice(&records[1].body, b"\x06ORIGIN").is_some());
    assert!(find_subslice(&records[1].body, b"\x09MY-ORIGIN").is_some());

    // The Channel set's template lists DEPTH before RPM.
    let channel_set = records
        .iter()
        .find(|r| r.is_eflr && r.lr_type == 3)
        .expect("channel set present");
    let depth_pos = find_subslice(&channel_set.body, b"\x05DEPTH").unwrap();
    let rpm_pos = find_subslice(&channel_set.body, b"\x03RPM").unwrap();
    assert!(depth_pos < rpm_pos);

    // One Frame set with one item.
    let frame_set = records
        .iter()
        .find(|r| r.is_eflr && r.lr_type == 4)
        .expect("frame set present");
    assert!(find_subslice(&frame_set.body, b"\x04MAIN").is_some());

    // Exactly one frame-data IFLR: OBNAME + frame number 1 + two doubles.
    let iflrs: Vec<&ParsedRecord> = records.iter().filter(|r| !r.is_eflr).collect();
    assert_eq!(iflrs.len(), 1);
    let body = &iflrs[0].body;
    assert_eq!(iflrs[0].lr_type, 0);
    assert_eq!(&body[..7], b"\x01\x00\x04MAIN");
    assert_eq!(body[7], 1);
    assert_eq!(&body[8..16], &0.0f64.to_be_bytes());
    assert_eq!(&body[16..24], &7.5f64.to_be_bytes());
    assert_eq!(body.len(), 24);
}

#[test]
fn image_channel_writes_one_iflr_per_row() {
    let mut f = LogicalFile::with_defaults();
    f.add_origin("ORIGIN", Some(1)).unwrap();
    let amp = f.add_channel("AMPLITUDE").unwrap();
    f.set_channel_data(amp, Array2::<f64>::zeros((100, 5))).unwrap();
    f.add_frame("IMG", &[amp]).unwrap();

    let mut sink: Vec<u8> = Vec::new();
    f.write(&mut sink, None).unwrap();

    let iflrs: Vec<ParsedRecord> = parse_stream(&sink)
        .into_iter()
        .filter(|r| !r.is_eflr)
        .collect();
    assert_eq!(iflrs.len(), 100);
    for (i, r) in iflrs.iter().enumerate() {
        let row = &r.body[r.body.len() - 40..];
        assert!(row.iter().all(|&b| b == 0), "row {i} not zero");
    }
    // Frame numbers 1..=100 with no gaps.
    let numbers: Vec<u8> = iflrs.iter().map(|r| r.body[6]).collect();
    let expected: Vec<u8> = (1..=100).collect();
    assert_eq!(numbers, expected);
}

#[test]
fn oversized_record_is_split_across_visible_records() {
    let mut f = LogicalFile::with_defaults();
    f.config.max_record_length = 2048;
    f.add_origin("ORIGIN", Some(1)).unwrap();
    let c = f.add_comment("BIG").unwrap();
    let text: String = "ABCDEFGH".repeat(1250); // 10000 characters
    f.set_attr(c, "TEXT", AttrValue::vector([text.as_str()]))
        .unwrap();

    let mut sink: Vec<u8> = Vec::new();
    f.write(&mut sink, None).unwrap();

    assert_eq!(&sink[15..20], b"02048");

    // Every visible record respects the ceiling and is even.
    for vr_body in iter_visible_records(&sink[SUL_LENGTH..]) {
        assert!(vr_body.len() + 4 <= 2048);
        assert_eq!((vr_body.len() + 4) % 2, 0);
    }

    // Count the segments of the comment record and verify reassembly.
    let mut comment_segments = 0;
    for vr_body in iter_visible_records(&sink[SUL_LENGTH..]) {
        let mut pos = 0;
        while pos + 4 <= vr_body.len() {
            let size = u16::from_be_bytes([vr_body[pos], vr_body[pos + 1]]) as usize;
            let (_, lr_type, flags) = parse_segment(&vr_body[pos..pos + size]).unwrap();
            if flags.is_eflr && lr_type == 6 {
                comment_segments += 1;
            }
            pos += size;
        }
    }
    assert!(comment_segments >= 5, "got {comment_segments} segments");

    let records = parse_stream(&sink);
    let comment = records
        .iter()
        .find(|r| r.is_eflr && r.lr_type == 6)
        .expect("comment record");
    assert!(find_subslice(&comment.body, text.as_bytes()).is_some());
}

#[test]
fn byte_stream_is_identical_across_chunk_sizes() {
    let creation = chrono::Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    let build = |input_chunk: usize, output_chunk: usize| -> Vec<u8> {
        let mut cfg = WriterConfig::default();
        cfg.input_chunk_size = input_chunk;
        cfg.output_chunk_size = output_chunk;
        let mut f = LogicalFile::new(cfg);
        let origin = f.add_origin("ORIGIN", Some(1)).unwrap();
        f.set_attr(origin, "CREATION-TIME", creation).unwrap();
        let depth = f.add_channel("DEPTH").unwrap();
        f.set_channel_data(depth, (0..500).map(f64::from).collect::<Vec<_>>())
            .unwrap();
        let gamma = f.add_channel("GAMMA").unwrap();
        f.set_channel_data(gamma, (0..500).map(|v| v * 3).collect::<Vec<i32>>())
            .unwrap();
        let frame = f.add_frame("MAIN", &[depth, gamma]).unwrap();
        f.set_attr(frame, "INDEX-TYPE", "BOREHOLE-DEPTH").unwrap();
        let mut sink: Vec<u8> = Vec::new();
        f.write(&mut sink, None).unwrap();
        sink
    };

    let reference = build(64, 1 << 20);
    for (ic, oc) in [(1, 1 << 20), (7, 4096), (500, 20), (499, 64)] {
        assert_eq!(build(ic, oc), reference, "chunks ({ic}, {oc})");
    }
}

#[test]
fn origin_reference_is_stamped_on_every_object() {
    let mut f = LogicalFile::with_defaults();
    f.add_origin("ORIGIN", Some(42)).unwrap();
    let z = f.add_zone("ZONE-A").unwrap();
    f.set_attr(z, "DOMAIN", "TIME").unwrap();
    let mut sink: Vec<u8> = Vec::new();
    f.write(&mut sink, None).unwrap();

    let records = parse_stream(&sink);
    let zone_set = records
        .iter()
        .find(|r| r.is_eflr && r.lr_type == 5)
        .expect("zone set");
    // Object component: 0x70, UVARI(42), copy 0, IDENT name.
    let pos = find_subslice(&zone_set.body, b"\x70\x2A\x00\x06ZONE-A");
    assert!(pos.is_some(), "object component carries origin 42");
}

#[test]
fn external_source_and_dataset_keys() {
    let mut f = LogicalFile::with_defaults();
    f.add_origin("ORIGIN", Some(1)).unwrap();
    let ch = f.add_channel("GAMMA").unwrap();
    f.set_channel_dataset(ch, "logs/gamma").unwrap();
    f.add_frame("MAIN", &[ch]).unwrap();

    let mut src = InMemorySource::new();
    src.insert("logs/gamma", vec![1.0f32, 2.0, 3.0]);

    let mut sink: Vec<u8> = Vec::new();
    f.write(&mut sink, Some(&src)).unwrap();

    let iflrs: Vec<ParsedRecord> = parse_stream(&sink)
        .into_iter()
        .filter(|r| !r.is_eflr)
        .collect();
    assert_eq!(iflrs.len(), 3);
    let tail = &iflrs[2].body;
    assert_eq!(&tail[tail.len() - 4..], &3.0f32.to_be_bytes());
}

#[test]
fn no_format_records_follow_frame_data() {
    let mut f = minimal_file();
    let nf = f.add_no_format("NOTES").unwrap();
    f.add_no_format_data(nf, NoFormatPayload::Text("free text".into()))
        .unwrap();
    f.add_no_format_data(nf, NoFormatPayload::Bytes(vec![1, 2, 3]))
        .unwrap();

    let mut sink: Vec<u8> = Vec::new();
    f.write(&mut sink, None).unwrap();

    let records = parse_stream(&sink);
    let iflrs: Vec<&ParsedRecord> = records.iter().filter(|r| !r.is_eflr).collect();
    assert_eq!(iflrs.len(), 3);
    assert_eq!(iflrs[0].lr_type, 0);
    assert_eq!(iflrs[1].lr_type, 1);
    assert_eq!(iflrs[2].lr_type, 1);
    assert!(find_subslice(&iflrs[1].body, b"\x09free text").is_some());
    assert_eq!(&iflrs[2].body[iflrs[2].body.len() - 3..], &[1, 2, 3]);
}

#[test]
fn cancelled_token_aborts_the_write() {
    let mut f = minimal_file();
    let token = CancelToken::new();
    token.cancel();
    let mut sink: Vec<u8> = Vec::new();
    let err = f.write_with(&mut sink, None, Some(&token));
    assert!(matches!(err, Err(DlisError::Cancelled)));
}

#[test]
fn high_compat_guard_rejects_before_any_byte_is_written() {
    let mut f = LogicalFile::with_defaults();
    f.add_origin("ORIGIN", Some(1)).unwrap();
    let err = {
        let mut guard = f.high_compatibility_mode();
        guard.add_channel("Depth")
    };
    assert!(matches!(err, Err(DlisError::Value(_))));
}

#[test]
fn every_emitted_class_lands_in_dependency_order() {
    let mut f = minimal_file();
    let axis = f.add_axis("AX1").unwrap();
    f.set_attr(axis, "AXIS-ID", "A").unwrap();
    let z = f.add_zone("Z1").unwrap();
    f.set_attr(z, "DOMAIN", "TIME").unwrap();
    let p = f.add_parameter("P1").unwrap();
    f.set_attr(p, "VALUES", AttrValue::vector([1.5f64])).unwrap();

    let mut sink: Vec<u8> = Vec::new();
    f.write(&mut sink, None).unwrap();

    let records = parse_stream(&sink);
    let type_order: Vec<u8> = records
        .iter()
        .filter(|r| r.is_eflr)
        .map(|r| r.lr_type)
        .collect();
    // File header, origin, axis, channel, frame, then static sets.
    assert_eq!(type_order[0], 0);
    assert_eq!(type_order[1], 1);
    let axis_pos = type_order.iter().position(|&t| t == 2).unwrap();
    let channel_pos = type_order.iter().position(|&t| t == 3).unwrap();
    let frame_pos = type_order.iter().position(|&t| t == 4).unwrap();
    let static_pos = type_order.iter().position(|&t| t == 5).unwrap();
    assert!(axis_pos < channel_pos);
    assert!(channel_pos < frame_pos);
    assert!(frame_pos < static_pos);
}

#[test]
fn write_fails_cleanly_when_data_is_missing() {
    let mut f = LogicalFile::with_defaults();
    f.add_origin("ORIGIN", Some(1)).unwrap();
    let ch = f.add_channel("GHOST").unwrap();
    f.add_frame("MAIN", &[ch]).unwrap();
    let mut sink: Vec<u8> = Vec::new();
    let err = f.write(&mut sink, None);
    assert!(matches!(err, Err(DlisError::Data(_))));
    // Validation failed before emission: nothing was written.
    assert!(sink.is_empty());
}
