// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use cucumber_rs::{
    AuthMap, ReconnectOptions, deserialize, reconnect_all, serialize,
    value::{
        Value,
        object::Obj,
        resource::{DbConnRes, RegexFlags, RegexRes, Resource},
    },
};

use super::{contains_subslice, expect_reconnector};

// S5: a compiled pattern plus a match snapshot over "abc123def".
#[test]
fn test_regex_pattern_and_match() -> Result<()> {
    let pattern = RegexRes::compile(r"(\d+)", RegexFlags::empty())?;
    let matched = pattern.find("abc123def").expect("pattern must match");
    assert_eq!(matched.matched(), "123");

    let root = Value::map(vec![
        (
            Value::str("pattern"),
            Value::resource(Resource::RegexPattern(pattern)),
        ),
        (
            Value::str("match"),
            Value::resource(Resource::RegexMatch(matched)),
        ),
    ]);

    let restored = deserialize(&serialize(&root)?)?;
    let (pattern_v, match_v) = {
        let r = restored.as_obj().expect("map");
        let out = match &*r.borrow() {
            Obj::Map(entries) => (entries[0].1.clone(), entries[1].1.clone()),
            _ => panic!("expected a map"),
        };
        out
    };

    // the pattern comes back live with the same source and flags
    match &*pattern_v.as_obj().expect("pattern").borrow() {
        Obj::Resource(res) => match &**res {
            Resource::RegexPattern(rx) => {
                assert_eq!(rx.source, r"(\d+)");
                assert_eq!(rx.flags, RegexFlags::empty());
                assert!(rx.compiled.is_match("999"));
            },
            _ => panic!("expected a pattern resource"),
        },
        other => panic!("expected a resource, got {}", other.kind()),
    }

    // the match is inert until reconnected
    expect_reconnector(&match_v, "regex.Match");
    let outcome =
        reconnect_all(&restored, &AuthMap::new(), &ReconnectOptions::new())?;
    assert!(outcome.is_clean(), "failures: {:?}", outcome.failures);

    match &*match_v.as_obj().expect("match").borrow() {
        Obj::Resource(res) => match &**res {
            Resource::RegexMatch(m) => {
                assert_eq!(m.haystack, "abc123def");
                assert_eq!(m.matched(), "123");
                assert_eq!(m.group(1), Some("123"));
            },
            _ => panic!("expected a match resource"),
        },
        other => panic!("expected a resource, got {}", other.kind()),
    }
    Ok(())
}

#[test]
fn test_case_insensitive_flag_survives() -> Result<()> {
    let pattern = RegexRes::compile("hello", RegexFlags::CASE_INSENSITIVE)?;
    let value = Value::resource(Resource::RegexPattern(pattern));

    let restored = deserialize(&serialize(&value)?)?;
    match &*restored.as_obj().expect("pattern").borrow() {
        Obj::Resource(res) => match &**res {
            Resource::RegexPattern(rx) => {
                assert_eq!(rx.flags, RegexFlags::CASE_INSENSITIVE);
                assert!(rx.compiled.is_match("HELLO"));
            },
            _ => panic!("expected a pattern resource"),
        },
        other => panic!("expected a resource, got {}", other.kind()),
    }
    Ok(())
}

// S4: connection topology travels, the password does not.
#[test]
fn test_db_secret_never_serialized() -> Result<()> {
    let conn = DbConnRes::new("localhost", 5432, "mydb", "alice")
        .with_secret("secret-password-42");
    let root = Value::map(vec![(
        Value::str("conn"),
        Value::resource(Resource::DbConn(conn)),
    )]);

    let bytes = serialize(&root)?;
    assert!(contains_subslice(&bytes, b"localhost"));
    assert!(contains_subslice(&bytes, b"mydb"));
    assert!(contains_subslice(&bytes, b"alice"));
    assert!(
        !contains_subslice(&bytes, b"secret-password-42"),
        "the secret must never reach the wire"
    );

    let restored = deserialize(&bytes)?;
    let conn_v = {
        let r = restored.as_obj().expect("map");
        let out = match &*r.borrow() {
            Obj::Map(entries) => entries[0].1.clone(),
            _ => panic!("expected a map"),
        };
        out
    };
    expect_reconnector(&conn_v, "db.Connection");

    let auth = AuthMap::new().with("db.Connection", "*", "secret-password-42");
    let outcome = reconnect_all(&restored, &auth, &ReconnectOptions::new())?;
    assert!(outcome.is_clean(), "failures: {:?}", outcome.failures);

    match &*conn_v.as_obj().expect("conn").borrow() {
        Obj::Resource(res) => match &**res {
            Resource::DbConn(db) => {
                assert_eq!(db.host, "localhost");
                assert_eq!(db.port, 5432);
                assert_eq!(db.database, "mydb");
                assert_eq!(db.user, "alice");
                assert_eq!(db.secret.as_deref(), Some("secret-password-42"));
                assert!(db.connected, "reconnected handle must be live");
            },
            _ => panic!("expected a db connection"),
        },
        other => panic!("expected a resource, got {}", other.kind()),
    }
    Ok(())
}

// The attribute-specific auth entry beats the wildcard.
#[test]
fn test_auth_ladder_prefers_exact_attribute() -> Result<()> {
    let conn = DbConnRes::new("db1", 5432, "one", "alice");
    let root = Value::map(vec![(
        Value::str("primary"),
        Value::resource(Resource::DbConn(conn)),
    )]);

    let restored = deserialize(&serialize(&root)?)?;
    let auth = AuthMap::new()
        .with("db.Connection", "*", "wildcard-secret")
        .with("db.Connection", "primary", "exact-secret");
    let outcome = reconnect_all(&restored, &auth, &ReconnectOptions::new())?;
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
                assert_eq!(db.secret.as_deref(), Some("exact-secret"));
            },
            _ => panic!("expected a db connection"),
        },
        other => panic!("expected a resource, got {}", other.kind()),
    }
    Ok(())
}

// SQLite handles keep their path, including the in-memory sentinel.
#[test]
fn test_sqlite_path_metadata() -> Result<()> {
    let db = Value::resource(Resource::Sqlite(
        cucumber_rs::value::resource::SqliteRes::detached(":memory:"),
    ));
    let restored = deserialize(&serialize(&db)?)?;
    expect_reconnector(&restored, "rusqlite.Connection");

    let r = restored.as_obj().expect("reconnector");
    match &*r.borrow() {
        Obj::Reconnector(rc) => {
            assert_eq!(
                rc.meta_value("path").and_then(|v| v.as_str().map(str::to_string)),
                Some(":memory:".to_string())
            );
        },
        other => panic!("expected a reconnector, got {}", other.kind()),
    }
    Ok(())
}
