// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use cucumber_rs::{
    AuthMap, ReconnectOptions, deserialize, reconnect_all, serialize,
    value::{
        Value,
        resource::{Resource, SqliteRes},
    },
};
use serial_test::serial;

use super::{init_test_logging, map_field, with_resource};

// A file-backed handle reopens against the same database and sees the
// rows written before serialization.
#[test]
#[serial]
fn test_sqlite_reopens_file_database() -> Result<()> {
    init_test_logging();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("state.db");
    let path_str = path.to_str().expect("utf-8 temp path");

    let db = SqliteRes::open(path_str)?;
    {
        let conn = db.conn.as_ref().expect("live connection");
        conn.execute_batch(
            "CREATE TABLE jobs (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO jobs (name) VALUES ('alpha'), ('beta');",
        )?;
    }
    let root = Value::map(vec![(
        Value::str("db"),
        Value::resource(Resource::Sqlite(db)),
    )]);

    let restored = deserialize(&serialize(&root)?)?;
    let outcome =
        reconnect_all(&restored, &AuthMap::new(), &ReconnectOptions::new())?;
    assert!(outcome.is_clean(), "failures: {:?}", outcome.failures);

    with_resource(&map_field(&restored, 0), |res| match res {
        Resource::Sqlite(s) => {
            assert_eq!(s.path, path_str);
            let conn = s.conn.as_ref().expect("reconnected connection");
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))
                .expect("count query");
            assert_eq!(count, 2, "rows written before the round trip survive");
        },
        _ => panic!("expected a sqlite resource"),
    });
    Ok(())
}

// The in-memory sentinel reopens as a fresh empty database.
#[test]
#[serial]
fn test_sqlite_memory_sentinel() -> Result<()> {
    let db = SqliteRes::open(":memory:")?;
    let root = Value::map(vec![(
        Value::str("db"),
        Value::resource(Resource::Sqlite(db)),
    )]);

    let restored = deserialize(&serialize(&root)?)?;
    let outcome =
        reconnect_all(&restored, &AuthMap::new(), &ReconnectOptions::new())?;
    assert!(outcome.is_clean(), "failures: {:?}", outcome.failures);

    with_resource(&map_field(&restored, 0), |res| match res {
        Resource::Sqlite(s) => {
            assert_eq!(s.path, ":memory:");
            let conn = s.conn.as_ref().expect("reconnected connection");
            conn.execute_batch("CREATE TABLE t (x INTEGER)")
                .expect("fresh database accepts DDL");
        },
        _ => panic!("expected a sqlite resource"),
    });
    Ok(())
}
