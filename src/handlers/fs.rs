// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! File-like handlers.
//!
//! Path-backed files travel as path + mode + position and reopen on
//! reconnect. In-memory buffers are fully serializable and come back live
//! without a reconnection step. Temp files and mapped regions capture their
//! bytes at extraction time.

use anyhow::{Context, Result, bail};

use crate::{
    handlers::{
        Handler, State, meta_view, populate_reconnector, reconnector_shell,
    },
    value::{
        ObjRef, Value,
        object::{Obj, Reconnector},
        resource::{
            FileMode, FileRes, MappedRes, MemBufRes, Resource, ResourceSpec,
            TempFileRes,
        },
    },
};

fn resource_type_key(obj: &Obj) -> String {
    match obj {
        Obj::Resource(res) => res.type_key().to_string(),
        other => format!("unexpected.{}", other.kind()),
    }
}

pub struct FileHandler;

impl Handler for FileHandler {
    fn name(&self) -> &'static str {
        "file"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::File(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        // position() consults the live handle, so this borrow is mutable
        let mut borrowed = obj.borrow_mut();
        let Obj::Resource(res) = &mut *borrowed else {
            bail!("file handler got a {}", borrowed.kind());
        };
        let Resource::File(file) = &mut **res else {
            bail!("file handler got a {}", res.type_key());
        };
        let pos = file.position();
        let path = file
            .path
            .to_str()
            .context("file path is not valid utf-8")?
            .to_string();
        Ok(State::fields(vec![
            ("path", State::Str(path)),
            ("mode", State::Int(i64::from(file.mode.bits()))),
            ("pos", State::Int(pos as i64)),
            ("encoding", State::opt_str(&file.encoding)),
        ]))
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
        let mode = FileMode::from_bits(view.uint_field("mode")? as u8)
            .context("unknown file-mode bits")?;
        let pos = view.uint_field("pos")?;
        let encoding = view.opt_str_field("encoding")?;

        let mut file = FileRes::new(path, mode);
        file.pos = pos;
        file.encoding = encoding;
        file.reopen()?;
        Ok(Value::resource(Resource::File(file)))
    }
}

pub struct MemBufHandler;

impl Handler for MemBufHandler {
    fn name(&self) -> &'static str {
        "membuf"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::MemBuf(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("membuf handler got a {}", borrowed.kind());
        };
        let Resource::MemBuf(buf) = &**res else {
            bail!("membuf handler got a {}", res.type_key());
        };
        Ok(State::fields(vec![
            ("data", State::Bytes(buf.inner.get_ref().clone())),
            ("pos", State::Int(buf.inner.position() as i64)),
        ]))
    }

    fn shell(&self, _type_key: &str) -> Result<ObjRef> {
        Ok(ObjRef::new(Obj::Resource(Box::new(Resource::MemBuf(
            MemBufRes::new(Vec::new()),
        )))))
    }

    // in-memory buffers have no external half: rebuilt live directly
    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        let view = crate::handlers::StateView::new(&state)?;
        let data = view.bytes_field("data")?;
        let pos = view.uint_field("pos")?;
        match &mut *shell.borrow_mut() {
            Obj::Resource(res) => {
                **res = Resource::MemBuf(MemBufRes::with_pos(data, pos));
                Ok(())
            },
            other => bail!("shell is a {}, expected a resource", other.kind()),
        }
    }
}

pub struct TempFileHandler;

impl Handler for TempFileHandler {
    fn name(&self) -> &'static str {
        "tempfile"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::TempFile(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("tempfile handler got a {}", borrowed.kind());
        };
        let Resource::TempFile(tmp) = &**res else {
            bail!("tempfile handler got a {}", res.type_key());
        };
        Ok(State::fields(vec![
            ("suffix", State::opt_str(&tmp.suffix)),
            ("contents", State::Bytes(tmp.contents()?)),
        ]))
    }

    fn shell(&self, type_key: &str) -> Result<ObjRef> {
        Ok(reconnector_shell(self.name(), type_key))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        populate_reconnector(shell, &state)
    }

    fn reconnect(&self, rc: &Reconnector, _auth: Option<&Value>) -> Result<Value> {
        let view = meta_view(rc);
        let suffix = view.opt_str_field("suffix")?;
        let contents = view.bytes_field("contents")?;

        let tmp = TempFileRes::create(suffix.as_deref())?;
        if let Some(handle) = &tmp.handle {
            overwrite(handle.as_file(), &contents)
                .context("failed to restore temp file contents")?;
        }
        Ok(Value::resource(Resource::TempFile(tmp)))
    }
}

fn overwrite(file: &std::fs::File, data: &[u8]) -> std::io::Result<()> {
    use std::io::{Seek, SeekFrom, Write};
    let mut f = file;
    f.seek(SeekFrom::Start(0))?;
    f.write_all(data)?;
    f.flush()
}

pub struct MappedHandler;

impl Handler for MappedHandler {
    fn name(&self) -> &'static str {
        "mapped"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::Mapped(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("mapped handler got a {}", borrowed.kind());
        };
        let Resource::Mapped(m) = &**res else {
            bail!("mapped handler got a {}", res.type_key());
        };
        let path = m
            .path
            .to_str()
            .context("mapped path is not valid utf-8")?
            .to_string();
        Ok(State::fields(vec![
            ("path", State::Str(path)),
            ("len", State::Int(m.len as i64)),
            ("snapshot", State::Bytes(m.snapshot.clone())),
        ]))
    }

    fn shell(&self, type_key: &str) -> Result<ObjRef> {
        Ok(reconnector_shell(self.name(), type_key))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        populate_reconnector(shell, &state)
    }

    fn reconnect(&self, rc: &Reconnector, _auth: Option<&Value>) -> Result<Value> {
        let view = meta_view(rc);
        let path: std::path::PathBuf = view.str_field("path")?.into();
        let len = view.uint_field("len")? as usize;
        let stored = view.bytes_field("snapshot")?;

        // prefer the file on disk; fall back to the stored snapshot
        let snapshot = std::fs::read(&path).unwrap_or(stored);
        Ok(Value::resource(Resource::Mapped(MappedRes {
            path,
            len,
            snapshot,
        })))
    }
}
