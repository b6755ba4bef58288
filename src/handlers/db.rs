// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Database handlers.
//!
//! SQLite handles travel as their database path (with the `":memory:"`
//! sentinel preserved) and reopen on reconnect. Generic network
//! connections store topology — host, port, database, user — and never the
//! password; the caller re-supplies it via the auth map.

use anyhow::{Result, bail};

use crate::{
    handlers::{
        Handler, State, meta_view, populate_reconnector, reconnector_shell,
    },
    value::{
        ObjRef, Value,
        object::{Obj, Reconnector},
        resource::{DbConnRes, Resource, ResourceSpec, SqliteRes},
    },
};

fn resource_type_key(obj: &Obj) -> String {
    match obj {
        Obj::Resource(res) => res.type_key().to_string(),
        other => format!("unexpected.{}", other.kind()),
    }
}

pub struct SqliteHandler;

impl Handler for SqliteHandler {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::Sqlite(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("sqlite handler got a {}", borrowed.kind());
        };
        let Resource::Sqlite(db) = &**res else {
            bail!("sqlite handler got a {}", res.type_key());
        };
        Ok(State::fields(vec![("path", State::str(db.path.clone()))]))
    }

    fn shell(&self, type_key: &str) -> Result<ObjRef> {
        Ok(reconnector_shell(self.name(), type_key))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        populate_reconnector(shell, &state)
    }

    fn reconnect(&self, rc: &Reconnector, _auth: Option<&Value>) -> Result<Value> {
        let view = meta_view(rc);
        let path = view.str_field("path")?;
        Ok(Value::resource(Resource::Sqlite(SqliteRes::open(&path)?)))
    }
}

pub struct DbConnHandler;

impl Handler for DbConnHandler {
    fn name(&self) -> &'static str {
        "db_conn"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::DbConn(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("db handler got a {}", borrowed.kind());
        };
        let Resource::DbConn(conn) = &**res else {
            bail!("db handler got a {}", res.type_key());
        };
        // topology only; the secret never reaches the wire
        Ok(State::fields(vec![
            ("host", State::str(conn.host.clone())),
            ("port", State::Int(i64::from(conn.port))),
            ("database", State::str(conn.database.clone())),
            ("user", State::str(conn.user.clone())),
        ]))
    }

    fn shell(&self, type_key: &str) -> Result<ObjRef> {
        Ok(reconnector_shell(self.name(), type_key))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        populate_reconnector(shell, &state)
    }

    fn reconnect(&self, rc: &Reconnector, auth: Option<&Value>) -> Result<Value> {
        let view = meta_view(rc);
        let host = view.str_field("host")?;
        let port = u16::try_from(view.int_field("port")?)
            .map_err(|_| anyhow::anyhow!("port out of range"))?;
        let database = view.str_field("database")?;
        let user = view.str_field("user")?;

        let mut conn = DbConnRes::new(&host, port, &database, &user);
        match auth {
            Some(Value::Str(secret)) => conn = conn.with_secret(secret),
            Some(other) => {
                bail!("db auth must be a password string, got {}", other.kind())
            },
            None => conn.connected = true,
        }
        Ok(Value::resource(Resource::DbConn(conn)))
    }
}
