// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use cucumber_rs::{
    AuthMap, ReconnectOptions, deserialize, reconnect_all, serialize,
    value::{
        Value,
        object::Obj,
        resource::{ChildRes, Resource},
    },
};

use super::map_field;

// The spawn recipe travels; reconnection launches a fresh child.
#[test]
fn test_child_process_respawns() -> Result<()> {
    let root = Value::map(vec![(
        Value::str("child"),
        Value::resource(Resource::Child(ChildRes::new("true", &[]))),
    )]);

    let restored = deserialize(&serialize(&root)?)?;
    let outcome =
        reconnect_all(&restored, &AuthMap::new(), &ReconnectOptions::new())?;
    assert!(outcome.is_clean(), "failures: {:?}", outcome.failures);

    let child_v = map_field(&restored, 0);
    let r = child_v.as_obj().expect("child");
    match &mut *r.borrow_mut() {
        Obj::Resource(res) => match &mut **res {
            Resource::Child(c) => {
                assert_eq!(c.program, "true");
                let mut child = c.child.take().expect("live child process");
                let status = child.wait()?;
                assert!(status.success());
            },
            _ => panic!("expected a child resource"),
        },
        other => panic!("expected a resource, got {}", other.kind()),
    }
    Ok(())
}

// The pid is never part of the payload, only the recipe is.
#[test]
fn test_child_metadata_only() -> Result<()> {
    let child = ChildRes::new("echo", &["hello"]);
    let root = Value::map(vec![(
        Value::str("child"),
        Value::resource(Resource::Child(child)),
    )]);

    let restored = deserialize(&serialize(&root)?)?;
    let child_v = map_field(&restored, 0);
    match &*child_v.as_obj().expect("child").borrow() {
        Obj::Reconnector(rc) => {
            assert_eq!(rc.type_key, "process.Child");
            assert_eq!(
                rc.meta_value("program").and_then(|v| v.as_str().map(String::from)),
                Some("echo".to_string())
            );
        },
        other => panic!("expected a reconnector, got {}", other.kind()),
    }
    Ok(())
}
