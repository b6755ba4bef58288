// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use cucumber_rs::{
    deserialize_ir,
    error::{CorruptIr, DeserializationError},
    ir::{
        codec::{self, HEADER_LEN, MAGIC, VERSION},
        node::IrNode,
    },
};

fn sample_ir() -> IrNode {
    IrNode::Map {
        id: 0,
        entries: vec![
            (IrNode::Str("xs".into()), IrNode::Seq {
                id: 1,
                items: vec![IrNode::Int(1), IrNode::Int(-2), IrNode::Float(0.5)],
            }),
            (IrNode::Str("blob".into()), IrNode::Bytes(vec![0, 127, 255])),
            (IrNode::Str("obj".into()), IrNode::Record {
                cucumber_type: "app.Worker".into(),
                handler: "instance".into(),
                object_id: 2,
                state: Box::new(IrNode::Map {
                    id: 3,
                    entries: vec![(IrNode::Str("self".into()), IrNode::Ref(2))],
                }),
            }),
        ],
    }
}

#[test]
fn test_structural_round_trip() -> Result<()> {
    let ir = sample_ir();
    let bytes = codec::encode(&ir);
    let decoded = codec::decode(&bytes)?;
    assert_eq!(decoded, ir);
    Ok(())
}

#[test]
fn test_round_trip_without_digest() -> Result<()> {
    let ir = sample_ir();
    let bytes = codec::encode_with(&ir, false);
    assert_eq!(codec::decode(&bytes)?, ir);
    // the digestless frame is exactly four bytes shorter
    assert_eq!(codec::encode(&ir).len(), bytes.len() + 4);
    Ok(())
}

#[test]
fn test_truncated_frame_rejected() {
    let bytes = codec::encode(&sample_ir());
    for cut in [0, 1, HEADER_LEN - 1, HEADER_LEN + 2, bytes.len() - 1] {
        let err = codec::decode(&bytes[..cut]).expect_err("must reject");
        assert!(
            matches!(
                err,
                CorruptIr::Truncated { .. } | CorruptIr::LengthMismatch { .. }
            ),
            "cut at {cut} produced {err:?}"
        );
    }
}

#[test]
fn test_trailing_garbage_rejected() {
    let mut bytes = codec::encode(&sample_ir());
    bytes.push(0);
    assert!(matches!(
        codec::decode(&bytes),
        Err(CorruptIr::LengthMismatch { .. })
    ));
}

#[test]
fn test_digest_flip_rejected() {
    let mut bytes = codec::encode(&sample_ir());
    let mid = HEADER_LEN + 5;
    bytes[mid] ^= 0x40;
    assert!(matches!(
        codec::decode(&bytes),
        Err(CorruptIr::DigestMismatch { .. })
    ));
}

#[test]
fn test_bad_version_rejected() {
    let mut bytes = codec::encode(&IrNode::Unit);
    bytes[4] = VERSION + 1;
    assert!(matches!(codec::decode(&bytes), Err(CorruptIr::BadVersion(_))));
}

// Hand-built digestless frame with an undefined node tag.
#[test]
fn test_unknown_tag_rejected() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&MAGIC);
    bytes.push(VERSION);
    bytes.push(0); // no digest
    bytes.extend_from_slice(&[0, 0]); // reserved
    bytes.extend_from_slice(&1u32.to_be_bytes());
    bytes.push(0x7f);
    assert!(matches!(codec::decode(&bytes), Err(CorruptIr::UnknownTag(0x7f))));
}

// Hand-built frame whose varint never terminates within 64 bits.
#[test]
fn test_varint_overflow_rejected() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&MAGIC);
    bytes.push(VERSION);
    bytes.push(0);
    bytes.extend_from_slice(&[0, 0]);
    let body: Vec<u8> =
        std::iter::once(0x03).chain(std::iter::repeat_n(0xff, 11)).collect();
    bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(&body);
    assert!(matches!(codec::decode(&bytes), Err(CorruptIr::VarintOverflow)));
}

#[test]
fn test_invalid_utf8_rejected() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&MAGIC);
    bytes.push(VERSION);
    bytes.push(0);
    bytes.extend_from_slice(&[0, 0]);
    // str node, length 2, invalid utf-8 payload
    let body = [0x05u8, 0x02, 0xc3, 0x28];
    bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(&body);
    assert!(matches!(codec::decode(&bytes), Err(CorruptIr::InvalidUtf8)));
}

// An otherwise well-formed frame (magic, length and digest all valid)
// carrying a huge object id must fail cleanly instead of driving an
// id-sized allocation during shell registration.
#[test]
fn test_out_of_range_object_id_rejected() {
    let seq = IrNode::Seq { id: 10_000_000_000, items: vec![] };
    assert!(matches!(
        codec::decode(&codec::encode(&seq)),
        Err(CorruptIr::IdOutOfRange { id: 10_000_000_000, .. })
    ));

    let record = IrNode::Record {
        cucumber_type: "app.Worker".into(),
        handler: "instance".into(),
        object_id: u64::MAX,
        state: Box::new(IrNode::Unit),
    };
    assert!(matches!(
        codec::decode(&codec::encode(&record)),
        Err(CorruptIr::IdOutOfRange { .. })
    ));

    let reference = IrNode::Ref(u64::MAX);
    assert!(matches!(
        codec::decode(&codec::encode(&reference)),
        Err(CorruptIr::IdOutOfRange { .. })
    ));
}

// Ids in hand-built IR never went through the codec and are the caller's
// own; the arena must still not allocate proportionally to their value.
#[test]
fn test_handcrafted_large_ids_stay_cheap() -> Result<()> {
    let ir = IrNode::Seq { id: 1 << 40, items: vec![IrNode::Ref(1 << 40)] };
    let restored = deserialize_ir(&ir)?;

    let r = restored.as_obj().expect("list");
    match &*r.borrow() {
        cucumber_rs::value::object::Obj::List(items) => {
            let inner = items[0].as_obj().expect("self entry");
            assert!(inner.same(r));
        },
        other => panic!("expected a list, got {}", other.kind()),
    }
    Ok(())
}

// Dispatch-level rejections on well-formed frames.
#[test]
fn test_unknown_handler_rejected() {
    let ir = IrNode::Record {
        cucumber_type: "ghost.Type".into(),
        handler: "no_such_handler".into(),
        object_id: 0,
        state: Box::new(IrNode::Unit),
    };
    let err = deserialize_ir(&ir).expect_err("must reject");
    assert!(matches!(err, DeserializationError::UnknownHandler { .. }));
}

#[test]
fn test_dangling_ref_rejected() {
    let ir = IrNode::Seq { id: 0, items: vec![IrNode::Ref(42)] };
    let err = deserialize_ir(&ir).expect_err("must reject");
    assert!(matches!(err, DeserializationError::DanglingRef { id: 42 }));
}

#[test]
fn test_duplicate_id_rejected() {
    let ir = IrNode::Seq {
        id: 0,
        items: vec![IrNode::Seq { id: 0, items: vec![] }],
    };
    let err = deserialize_ir(&ir).expect_err("must reject");
    assert!(matches!(
        err,
        DeserializationError::Corrupt(CorruptIr::DuplicateId(0))
    ));
}

#[test]
fn test_float_bit_patterns_survive() -> Result<()> {
    for v in [0.0f64, -0.0, f64::INFINITY, f64::NEG_INFINITY, f64::NAN, 1.5e300] {
        let bytes = codec::encode(&IrNode::Float(v));
        let decoded = codec::decode(&bytes)?;
        assert_eq!(decoded, IrNode::Float(v), "bits changed for {v}");
    }
    Ok(())
}
