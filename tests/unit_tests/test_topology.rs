// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use cucumber_rs::{
    deserialize_ir,
    ir::node::IrNode,
    value::{Value, object::Obj, object::WeakRef},
};

use super::round_trip;

// S6: two paths to the same list come back as one shared list.
#[test]
fn test_shared_sub_object() -> Result<()> {
    let a = Value::list(vec![Value::Int(1), Value::Int(2)]);
    let root = Value::map(vec![
        (Value::str("x"), a.clone()),
        (Value::str("y"), a),
    ]);

    let restored = round_trip(&root)?;
    let r = restored.as_obj().expect("map expected");
    let (x, y) = match &*r.borrow() {
        Obj::Map(entries) => {
            let x = entries[0].1.clone();
            let y = entries[1].1.clone();
            (x, y)
        },
        other => panic!("expected a map, got {}", other.kind()),
    };

    let (rx, ry) = (x.as_obj().expect("list"), y.as_obj().expect("list"));
    assert!(rx.same(ry), "restored references must share identity");
    assert_eq!(x, Value::list(vec![Value::Int(1), Value::Int(2)]));
    Ok(())
}

// S2: a mapping that contains itself.
#[test]
fn test_circular_map() -> Result<()> {
    let d = Value::map(vec![(Value::str("name"), Value::str("circular"))]);
    {
        let r = d.as_obj().expect("map");
        let self_ref = d.clone();
        match &mut *r.borrow_mut() {
            Obj::Map(entries) => entries.push((Value::str("self"), self_ref)),
            _ => unreachable!(),
        }
    }

    let restored = round_trip(&d)?;
    let r = restored.as_obj().expect("map");
    match &*r.borrow() {
        Obj::Map(entries) => {
            assert_eq!(entries[0].1, Value::str("circular"));
            let inner = entries[1].1.as_obj().expect("self entry");
            assert!(inner.same(r), "d[\"self\"] must be d itself");
        },
        other => panic!("expected a map, got {}", other.kind()),
    }
    Ok(())
}

#[test]
fn test_self_referential_list() -> Result<()> {
    let xs = Value::list(vec![Value::Int(7)]);
    {
        let r = xs.as_obj().expect("list");
        let self_ref = xs.clone();
        match &mut *r.borrow_mut() {
            Obj::List(items) => items.push(self_ref),
            _ => unreachable!(),
        }
    }

    let restored = round_trip(&xs)?;
    let r = restored.as_obj().expect("list");
    match &*r.borrow() {
        Obj::List(items) => {
            assert_eq!(items[0], Value::Int(7));
            let inner = items[1].as_obj().expect("self entry");
            assert!(inner.same(r));
        },
        other => panic!("expected a list, got {}", other.kind()),
    }
    Ok(())
}

// Diamond sharing: one leaf reachable through two intermediate lists.
#[test]
fn test_diamond_topology() -> Result<()> {
    let leaf = Value::list(vec![Value::str("leaf")]);
    let left = Value::list(vec![leaf.clone()]);
    let right = Value::list(vec![leaf]);
    let root = Value::list(vec![left, right]);

    let restored = round_trip(&root)?;
    let r = restored.as_obj().expect("list");
    let (left, right) = match &*r.borrow() {
        Obj::List(items) => (items[0].clone(), items[1].clone()),
        _ => panic!("expected a list"),
    };
    let leaf_of = |v: &Value| -> Value {
        let r = v.as_obj().expect("list");
        let out = match &*r.borrow() {
            Obj::List(items) => items[0].clone(),
            _ => panic!("expected a list"),
        };
        out
    };
    let (la, lb) = (leaf_of(&left), leaf_of(&right));
    assert!(
        la.as_obj().expect("leaf").same(lb.as_obj().expect("leaf")),
        "diamond leaves must stay shared"
    );
    Ok(())
}

// A back-reference that textually precedes its target still resolves:
// pass 1 allocates every shell before pass 2 reads any reference.
#[test]
fn test_forward_back_reference() -> Result<()> {
    let ir = IrNode::Seq {
        id: 0,
        items: vec![
            IrNode::Ref(1),
            IrNode::Seq { id: 1, items: vec![IrNode::Int(9)] },
        ],
    };

    let restored = deserialize_ir(&ir)?;
    let r = restored.as_obj().expect("list");
    match &*r.borrow() {
        Obj::List(items) => {
            let first = items[0].as_obj().expect("forward ref");
            let second = items[1].as_obj().expect("target");
            assert!(first.same(second));
            assert_eq!(items[1], Value::list(vec![Value::Int(9)]));
        },
        other => panic!("expected a list, got {}", other.kind()),
    }
    Ok(())
}

// A weak reference whose target is also strongly held elsewhere in the
// graph restores pointing at the restored target.
#[test]
fn test_weak_reference_restored_to_shared_target() -> Result<()> {
    let target = Value::list(vec![Value::Int(5)]);
    let weak = {
        let r = target.as_obj().expect("list");
        Value::object(Obj::Weak(WeakRef { target: r.downgrade() }))
    };
    let root = Value::map(vec![
        (Value::str("strong"), target),
        (Value::str("weak"), weak),
    ]);

    let restored = round_trip(&root)?;
    let r = restored.as_obj().expect("map");
    let (strong, weak) = match &*r.borrow() {
        Obj::Map(entries) => (entries[0].1.clone(), entries[1].1.clone()),
        _ => panic!("expected a map"),
    };

    let weak_target = match &*weak.as_obj().expect("weak").borrow() {
        Obj::Weak(w) => w.upgrade().expect("weak target must be alive"),
        other => panic!("expected a weakref, got {}", other.kind()),
    };
    assert!(
        weak_target.same(strong.as_obj().expect("strong")),
        "weak reference must point at the restored shared target"
    );
    Ok(())
}
