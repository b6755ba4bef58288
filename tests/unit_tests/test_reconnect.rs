// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use cucumber_rs::{
    AuthMap, ReconnectOptions, ReconnectionError, deserialize, reconnect_all,
    serialize,
    value::{
        Value,
        object::{Obj, Reconnector},
        resource::{DbConnRes, LockRes, Resource},
    },
};

use super::expect_reconnector;

fn forged_reconnector() -> Value {
    Value::object(Obj::Reconnector(Reconnector {
        type_key: "ghost.Resource".to_string(),
        handler: "no_such_handler".to_string(),
        meta: vec![("x".to_string(), Value::Int(1))],
    }))
}

// Default mode collects failures and keeps going; the broken entry stays
// an inert reconnector while its sibling reconnects.
#[test]
fn test_failures_are_collected_not_raised() -> Result<()> {
    let root = Value::map(vec![
        (Value::str("bad"), forged_reconnector()),
        (
            Value::str("good"),
            Value::resource(Resource::Lock(LockRes::mutex())),
        ),
    ]);
    let restored = deserialize(&serialize(&root)?)?;

    let outcome =
        reconnect_all(&restored, &AuthMap::new(), &ReconnectOptions::new())?;
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].type_key, "ghost.Resource");

    let (bad, good) = {
        let r = restored.as_obj().expect("map");
        let out = match &*r.borrow() {
            Obj::Map(entries) => (entries[0].1.clone(), entries[1].1.clone()),
            _ => panic!("expected a map"),
        };
        out
    };
    expect_reconnector(&bad, "ghost.Resource");
    match &*good.as_obj().expect("good").borrow() {
        Obj::Resource(res) => {
            assert!(matches!(&**res, Resource::Lock(_)))
        },
        other => panic!("sibling must still reconnect, got {}", other.kind()),
    }
    Ok(())
}

#[test]
fn test_strict_mode_raises_first_failure() -> Result<()> {
    let root = Value::list(vec![forged_reconnector()]);
    let restored = deserialize(&serialize(&root)?)?;

    let err = reconnect_all(
        &restored,
        &AuthMap::new(),
        &ReconnectOptions::new().strict(),
    )
    .expect_err("strict mode must raise");
    let ReconnectionError::Failed(failure) = err;
    assert_eq!(failure.type_key, "ghost.Resource");
    Ok(())
}

// A reconnector shared through two fields is rebuilt once; both aliases
// see the same live resource.
#[test]
fn test_shared_reconnector_rebuilt_once() -> Result<()> {
    let lock = Value::resource(Resource::Lock(LockRes::mutex()));
    let root = Value::map(vec![
        (Value::str("a"), lock.clone()),
        (Value::str("b"), lock),
    ]);
    let restored = deserialize(&serialize(&root)?)?;

    reconnect_all(&restored, &AuthMap::new(), &ReconnectOptions::new())?;

    let (a, b) = {
        let r = restored.as_obj().expect("map");
        let out = match &*r.borrow() {
            Obj::Map(entries) => (entries[0].1.clone(), entries[1].1.clone()),
            _ => panic!("expected a map"),
        };
        out
    };
    assert!(a.as_obj().expect("a").same(b.as_obj().expect("b")));
    assert!(matches!(&*a.as_obj().expect("a").borrow(), Obj::Resource(_)));
    Ok(())
}

// Without any auth entry the db handler still rebuilds an unauthenticated
// connection (the no-auth rung of the ladder).
#[test]
fn test_no_auth_fallback() -> Result<()> {
    let conn = DbConnRes::new("localhost", 5432, "mydb", "alice");
    let root = Value::map(vec![(
        Value::str("conn"),
        Value::resource(Resource::DbConn(conn)),
    )]);
    let restored = deserialize(&serialize(&root)?)?;

    let outcome =
        reconnect_all(&restored, &AuthMap::new(), &ReconnectOptions::new())?;
    assert!(outcome.is_clean());

    let conn_v = {
        let r = restored.as_obj().expect("map");
        let out = match &*r.borrow() {
            Obj::Map(entries) => entries[0].1.clone(),
            _ => panic!("expected a map"),
        };
        out
    };
    match &*conn_v.as_obj().expect("conn").borrow() {
        Obj::Resource(res) => match &**res {
            Resource::DbConn(db) => {
                assert!(db.secret.is_none());
                assert!(db.connected);
            },
            _ => panic!("expected a db connection"),
        },
        other => panic!("expected a resource, got {}", other.kind()),
    }
    Ok(())
}

// Reconnectors buried inside a cyclic graph are still found exactly once.
#[test]
fn test_cyclic_graph_traversal() -> Result<()> {
    let d = Value::map(vec![(
        Value::str("lock"),
        Value::resource(Resource::Lock(LockRes::mutex())),
    )]);
    {
        let r = d.as_obj().expect("map");
        let self_ref = d.clone();
        match &mut *r.borrow_mut() {
            Obj::Map(entries) => entries.push((Value::str("self"), self_ref)),
            _ => unreachable!(),
        }
    }
    let restored = deserialize(&serialize(&d)?)?;

    let outcome =
        reconnect_all(&restored, &AuthMap::new(), &ReconnectOptions::new())?;
    assert!(outcome.is_clean());

    let lock = {
        let r = restored.as_obj().expect("map");
        let out = match &*r.borrow() {
            Obj::Map(entries) => entries[0].1.clone(),
            _ => panic!("expected a map"),
        };
        out
    };
    assert!(matches!(&*lock.as_obj().expect("lock").borrow(), Obj::Resource(_)));
    Ok(())
}
