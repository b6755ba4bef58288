// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use cucumber_rs::{
    AuthMap, ReconnectOptions, deserialize, reconnect_all, serialize,
    registry,
    value::{
        Value,
        func::FunctionVal,
        object::Obj,
        resource::{Resource, ThreadRes},
    },
};

use super::{init_test_logging, map_field};

fn touch_marker(args: &[Value]) -> Result<Value> {
    let Some(Value::Str(path)) = args.first() else {
        anyhow::bail!("expected a marker path argument");
    };
    std::fs::write(path, b"ran")?;
    Ok(Value::Unit)
}

// With start_threads set, the rebuilt thread is spawned and actually runs
// its registered target.
#[test]
fn test_start_threads_runs_target() -> Result<()> {
    init_test_logging();
    registry::register_fn("it.touch_marker", touch_marker);

    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("marker.txt");
    let marker_str = marker.to_str().expect("utf-8 temp path").to_string();

    let target =
        Value::object(Obj::Function(FunctionVal::new("it", "touch_marker")));
    let thread = ThreadRes::new(target, vec![Value::Str(marker_str)])
        .named("restored-worker");
    let root = Value::map(vec![(
        Value::str("worker"),
        Value::resource(Resource::Thread(thread)),
    )]);

    let restored = deserialize(&serialize(&root)?)?;
    let outcome = reconnect_all(
        &restored,
        &AuthMap::new(),
        &ReconnectOptions::new().start_threads(),
    )?;
    assert!(outcome.is_clean(), "failures: {:?}", outcome.failures);

    // join the spawned thread, then observe its side effect
    let worker = map_field(&restored, 0);
    let r = worker.as_obj().expect("thread");
    match &mut *r.borrow_mut() {
        Obj::Resource(res) => match &mut **res {
            Resource::Thread(t) => {
                assert!(t.started, "start_threads must start the thread");
                t.join()?;
            },
            _ => panic!("expected a thread resource"),
        },
        other => panic!("expected a resource, got {}", other.kind()),
    }
    assert_eq!(std::fs::read(&marker)?, b"ran");
    Ok(())
}

// Without the flag the thread stays unstarted.
#[test]
fn test_threads_stay_unstarted_by_default() -> Result<()> {
    registry::register_fn("it.touch_marker", touch_marker);

    let target =
        Value::object(Obj::Function(FunctionVal::new("it", "touch_marker")));
    let root = Value::map(vec![(
        Value::str("worker"),
        Value::resource(Resource::Thread(ThreadRes::new(target, vec![]))),
    )]);

    let restored = deserialize(&serialize(&root)?)?;
    reconnect_all(&restored, &AuthMap::new(), &ReconnectOptions::new())?;

    let worker = map_field(&restored, 0);
    match &*worker.as_obj().expect("thread").borrow() {
        Obj::Resource(res) => match &**res {
            Resource::Thread(t) => {
                assert!(!t.started);
                assert!(t.handle.is_none());
            },
            _ => panic!("expected a thread resource"),
        },
        other => panic!("expected a resource, got {}", other.kind()),
    }
    Ok(())
}
