// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use cucumber_rs::{
    deserialize, deserialize_ir, serialize, serialize_ir,
    value::Value,
};

use super::round_trip;

#[test]
fn test_primitive_round_trip() -> Result<()> {
    let samples = vec![
        Value::Bool(true),
        Value::Bool(false),
        Value::Int(0),
        Value::Int(42),
        Value::Int(-1),
        Value::Float(3.14),
        Value::str(""),
        Value::str("hello"),
        Value::bytes(Vec::new()),
        Value::bytes(b"bytes".to_vec()),
        Value::Unit,
        Value::Ellipsis,
        Value::NotImplemented,
        Value::Empty,
    ];
    for sample in samples {
        let restored = round_trip(&sample)?;
        assert_eq!(restored, sample, "round trip changed {sample:?}");
    }
    Ok(())
}

#[test]
fn test_container_round_trip() -> Result<()> {
    let samples = vec![
        Value::list(vec![]),
        Value::list(vec![Value::Int(1), Value::Int(2)]),
        Value::map(vec![]),
        Value::map(vec![(Value::Int(1), Value::Int(2))]),
        Value::set(vec![]),
        Value::set(vec![Value::Int(1), Value::Int(2)]),
    ];
    for sample in samples {
        let restored = round_trip(&sample)?;
        assert_eq!(restored, sample, "round trip changed {sample:?}");
    }
    Ok(())
}

#[test]
fn test_nested_containers() -> Result<()> {
    let inner = Value::map(vec![
        (Value::str("xs"), Value::list(vec![Value::Int(1), Value::Int(2)])),
        (Value::str("tag"), Value::str("inner")),
    ]);
    let outer = Value::list(vec![
        inner,
        Value::set(vec![Value::str("a"), Value::str("b")]),
        Value::bytes(vec![0, 1, 2, 255]),
    ]);

    let restored = round_trip(&outer)?;
    assert_eq!(restored, outer);
    Ok(())
}

#[test]
fn test_int_extremes() -> Result<()> {
    for v in [i64::MIN, i64::MAX, -1, 0, 1] {
        assert_eq!(round_trip(&Value::Int(v))?, Value::Int(v));
    }
    Ok(())
}

#[test]
fn test_serialize_is_deterministic() -> Result<()> {
    let value = Value::map(vec![
        (Value::str("a"), Value::list(vec![Value::Int(1)])),
        (Value::str("b"), Value::set(vec![Value::str("x")])),
    ]);
    let first = serialize(&value)?;
    let second = serialize(&value)?;
    assert_eq!(first, second, "same input must produce the same bytes");
    Ok(())
}

// IR-level and byte-level deserialization must agree.
#[test]
fn test_ir_vs_bytes_consistency() -> Result<()> {
    let value = Value::map(vec![
        (Value::str("xs"), Value::list(vec![Value::Int(1), Value::Int(2)])),
        (Value::str("flag"), Value::Bool(true)),
    ]);

    let via_ir = deserialize_ir(&serialize_ir(&value)?)?;
    let via_bytes = deserialize(&serialize(&value)?)?;
    assert_eq!(via_ir, via_bytes);
    assert_eq!(via_ir, value);
    Ok(())
}
