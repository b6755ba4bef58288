// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Result, anyhow};
use cucumber_rs::{
    deserialize, serialize, serialize_ir,
    error::DeserializationError,
    ir::node::IrNode,
    registry,
    value::{Value, class::ClassDef, object::{Instance, Obj}},
};

fn point_class() -> ClassDef {
    ClassDef::new("app", "Point")
}

fn secret_box_class() -> ClassDef {
    ClassDef::new("app", "SecretBox").with_hooks("app.box_out", "app.box_in")
}

fn pair_class() -> ClassDef {
    ClassDef::new("app", "Pair").with_mapping("app.pair_to_map", "app.pair_from_map")
}

fn both_class() -> ClassDef {
    ClassDef::new("app", "Both")
        .with_hooks("app.box_out", "app.box_in")
        .with_mapping("app.pair_to_map", "app.pair_from_map")
}

fn color_class() -> ClassDef {
    ClassDef::new("app", "Color").data_fields(&["r", "g", "b"])
}

fn field_of(instance: &Value, name: &str) -> Option<Value> {
    let r = instance.as_obj()?;
    let out = match &*r.borrow() {
        Obj::Instance(inst) => inst.field(name).cloned(),
        _ => None,
    };
    out
}

fn box_out(args: &[Value]) -> Result<Value> {
    field_of(&args[0], "word").ok_or_else(|| anyhow!("missing `word` field"))
}

fn box_in(args: &[Value]) -> Result<Value> {
    Ok(Value::object(Obj::Instance(
        Instance::new(Value::str("app.SecretBox"))
            .with_field("word", args[0].clone()),
    )))
}

fn pair_to_map(args: &[Value]) -> Result<Value> {
    let first = field_of(&args[0], "first").unwrap_or(Value::Unit);
    let second = field_of(&args[0], "second").unwrap_or(Value::Unit);
    Ok(Value::map(vec![
        (Value::str("first"), first),
        (Value::str("second"), second),
    ]))
}

fn pair_from_map(args: &[Value]) -> Result<Value> {
    let r = args[0].as_obj().ok_or_else(|| anyhow!("expected a map"))?;
    let mut inst = Instance::new(Value::str("app.Pair"));
    if let Obj::Map(entries) = &*r.borrow() {
        for (k, v) in entries {
            if let Some(name) = k.as_str() {
                inst.set_field(name, v.clone());
            }
        }
    }
    Ok(Value::object(Obj::Instance(inst)))
}

fn register_all() {
    registry::register_class(point_class);
    registry::register_class(secret_box_class);
    registry::register_class(pair_class);
    registry::register_class(both_class);
    registry::register_class(color_class);
    registry::register_fn("app.box_out", box_out);
    registry::register_fn("app.box_in", box_in);
    registry::register_fn("app.pair_to_map", pair_to_map);
    registry::register_fn("app.pair_from_map", pair_from_map);
}

fn record_handler(ir: &IrNode) -> &str {
    match ir {
        IrNode::Record { handler, .. } => handler,
        other => panic!("expected a record, got {}", other.kind()),
    }
}

#[test]
fn test_fallback_attribute_bag_round_trip() -> Result<()> {
    register_all();
    let point = Value::object(Obj::Instance(
        Instance::new(Value::str("app.Point"))
            .with_field("x", Value::Int(3))
            .with_field("y", Value::Int(-4))
            .with_field("tags", Value::list(vec![Value::str("origin")])),
    ));

    let ir = serialize_ir(&point)?;
    assert_eq!(record_handler(&ir), "instance");

    let restored = deserialize(&serialize(&point)?)?;
    assert_eq!(field_of(&restored, "x"), Some(Value::Int(3)));
    assert_eq!(field_of(&restored, "y"), Some(Value::Int(-4)));
    assert_eq!(
        field_of(&restored, "tags"),
        Some(Value::list(vec![Value::str("origin")]))
    );
    Ok(())
}

#[test]
fn test_hook_pair_round_trip() -> Result<()> {
    register_all();
    let boxed = Value::object(Obj::Instance(
        Instance::new(Value::str("app.SecretBox"))
            .with_field("word", Value::str("sesame")),
    ));

    let ir = serialize_ir(&boxed)?;
    assert_eq!(record_handler(&ir), "hooks");

    let restored = deserialize(&serialize(&boxed)?)?;
    assert_eq!(field_of(&restored, "word"), Some(Value::str("sesame")));
    Ok(())
}

#[test]
fn test_mapping_pair_round_trip() -> Result<()> {
    register_all();
    let pair = Value::object(Obj::Instance(
        Instance::new(Value::str("app.Pair"))
            .with_field("first", Value::Int(1))
            .with_field("second", Value::str("two")),
    ));

    let ir = serialize_ir(&pair)?;
    assert_eq!(record_handler(&ir), "mapping");

    let restored = deserialize(&serialize(&pair)?)?;
    assert_eq!(field_of(&restored, "first"), Some(Value::Int(1)));
    assert_eq!(field_of(&restored, "second"), Some(Value::str("two")));
    Ok(())
}

// The documented ladder: hooks beat the mapping pair.
#[test]
fn test_hooks_win_over_mapping() -> Result<()> {
    register_all();
    let v = Value::object(Obj::Instance(
        Instance::new(Value::str("app.Both"))
            .with_field("word", Value::str("priority")),
    ));
    assert_eq!(record_handler(&serialize_ir(&v)?), "hooks");
    Ok(())
}

#[test]
fn test_dataclass_round_trip() -> Result<()> {
    register_all();
    let color = Value::object(Obj::Instance(
        Instance::new(Value::str("app.Color"))
            .with_field("r", Value::Int(255))
            .with_field("g", Value::Int(128))
            .with_field("b", Value::Int(0)),
    ));

    let ir = serialize_ir(&color)?;
    assert_eq!(record_handler(&ir), "dataclass");

    let restored = deserialize(&serialize(&color)?)?;
    assert_eq!(field_of(&restored, "r"), Some(Value::Int(255)));
    assert_eq!(field_of(&restored, "g"), Some(Value::Int(128)));
    assert_eq!(field_of(&restored, "b"), Some(Value::Int(0)));
    Ok(())
}

#[test]
fn test_unregistered_class_fails_on_decode() -> Result<()> {
    let ghost = Value::object(Obj::Instance(
        Instance::new(Value::str("ghost.Class")).with_field("x", Value::Int(1)),
    ));
    let bytes = serialize(&ghost)?;
    let err = deserialize(&bytes).expect_err("ghost class must not decode");
    assert!(
        matches!(err, DeserializationError::Populate { .. }),
        "got {err:?}"
    );
    Ok(())
}

// Instance state keeps shared sub-objects shared across fields.
#[test]
fn test_instance_fields_share_objects() -> Result<()> {
    register_all();
    let shared = Value::list(vec![Value::Int(9)]);
    let inst = Value::object(Obj::Instance(
        Instance::new(Value::str("app.Point"))
            .with_field("a", shared.clone())
            .with_field("b", shared),
    ));

    let restored = deserialize(&serialize(&inst)?)?;
    let a = field_of(&restored, "a").expect("field a");
    let b = field_of(&restored, "b").expect("field b");
    assert!(a.as_obj().expect("a").same(b.as_obj().expect("b")));
    Ok(())
}
