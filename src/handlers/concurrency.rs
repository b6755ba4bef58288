// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Concurrency-primitive handlers.
//!
//! Type and configuration travel; the primitive itself does not. A lock
//! that is held, a queue that is being drained by another thread — the
//! extracted state is a best-effort instantaneous snapshot, and the rebuilt
//! primitive is a fresh one in an equivalent configuration. Locks
//! reconstruct unlocked; events reconstruct matching their signaled state.

use anyhow::{Result, bail};

use crate::{
    handlers::{
        Handler, State, meta_view, populate_reconnector, reconnector_shell,
    },
    value::{
        ObjRef, Value,
        object::{Obj, Reconnector},
        resource::{
            BarrierRes, EventRes, LockKind, LockRes, QueueKind, QueueRes, Resource,
            ResourceSpec, SemaphoreRes, ThreadRes,
        },
    },
};

fn resource_type_key(obj: &Obj) -> String {
    match obj {
        Obj::Resource(res) => res.type_key().to_string(),
        other => format!("unexpected.{}", other.kind()),
    }
}

pub struct LockHandler;

impl Handler for LockHandler {
    fn name(&self) -> &'static str {
        "lock"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::Lock(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("lock handler got a {}", borrowed.kind());
        };
        let Resource::Lock(lock) = &**res else {
            bail!("lock handler got a {}", res.type_key());
        };
        Ok(State::fields(vec![
            (
                "kind",
                State::str(match lock.kind {
                    LockKind::Mutex => "mutex",
                    LockKind::RwLock => "rwlock",
                }),
            ),
            ("locked", State::Bool(lock.locked)),
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
        let lock = match view.str_field("kind")?.as_str() {
            "mutex" => LockRes::mutex(),
            "rwlock" => LockRes::rwlock(),
            other => bail!("unknown lock kind `{other}`"),
        };
        // reconstructs unlocked regardless of the snapshotted state
        Ok(Value::resource(Resource::Lock(lock)))
    }
}

pub struct SemaphoreHandler;

impl Handler for SemaphoreHandler {
    fn name(&self) -> &'static str {
        "semaphore"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::Semaphore(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("semaphore handler got a {}", borrowed.kind());
        };
        let Resource::Semaphore(sem) = &**res else {
            bail!("semaphore handler got a {}", res.type_key());
        };
        Ok(State::fields(vec![
            ("max", State::Int(sem.max as i64)),
            ("available", State::Int(sem.available() as i64)),
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
        let max = view.uint_field("max")? as usize;
        let available = view.uint_field("available")? as usize;
        Ok(Value::resource(Resource::Semaphore(SemaphoreRes::with_available(
            max, available,
        ))))
    }
}

pub struct BarrierHandler;

impl Handler for BarrierHandler {
    fn name(&self) -> &'static str {
        "barrier"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::Barrier(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("barrier handler got a {}", borrowed.kind());
        };
        let Resource::Barrier(b) = &**res else {
            bail!("barrier handler got a {}", res.type_key());
        };
        Ok(State::fields(vec![("parties", State::Int(b.parties as i64))]))
    }

    fn shell(&self, type_key: &str) -> Result<ObjRef> {
        Ok(reconnector_shell(self.name(), type_key))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        populate_reconnector(shell, &state)
    }

    fn reconnect(&self, rc: &Reconnector, _auth: Option<&Value>) -> Result<Value> {
        let view = meta_view(rc);
        let parties = view.uint_field("parties")? as usize;
        Ok(Value::resource(Resource::Barrier(BarrierRes::new(parties))))
    }
}

pub struct EventHandler;

impl Handler for EventHandler {
    fn name(&self) -> &'static str {
        "event"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::Event(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("event handler got a {}", borrowed.kind());
        };
        let Resource::Event(e) = &**res else {
            bail!("event handler got a {}", res.type_key());
        };
        Ok(State::fields(vec![("set", State::Bool(e.is_set()))]))
    }

    fn shell(&self, type_key: &str) -> Result<ObjRef> {
        Ok(reconnector_shell(self.name(), type_key))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        populate_reconnector(shell, &state)
    }

    fn reconnect(&self, rc: &Reconnector, _auth: Option<&Value>) -> Result<Value> {
        let view = meta_view(rc);
        let set = view.bool_field("set")?;
        Ok(Value::resource(Resource::Event(EventRes::new(set))))
    }
}

pub struct QueueHandler;

impl Handler for QueueHandler {
    fn name(&self) -> &'static str {
        "queue"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::Queue(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("queue handler got a {}", borrowed.kind());
        };
        let Resource::Queue(q) = &**res else {
            bail!("queue handler got a {}", res.type_key());
        };
        Ok(State::fields(vec![
            (
                "kind",
                State::str(match q.kind {
                    QueueKind::Fifo => "fifo",
                    QueueKind::Lifo => "lifo",
                    QueueKind::Priority => "priority",
                }),
            ),
            (
                "maxsize",
                match q.maxsize {
                    Some(n) => State::Int(n as i64),
                    None => State::Unit,
                },
            ),
            ("items", State::subs(&q.snapshot())),
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
        let kind = match view.str_field("kind")?.as_str() {
            "fifo" => QueueKind::Fifo,
            "lifo" => QueueKind::Lifo,
            "priority" => QueueKind::Priority,
            other => bail!("unknown queue kind `{other}`"),
        };
        let maxsize = view.opt_uint_field("maxsize")?.map(|n| n as usize);
        let items = view.seq_field("items")?;

        let mut queue = QueueRes::new(kind, maxsize);
        queue.restore(items);
        Ok(Value::resource(Resource::Queue(queue)))
    }
}

pub struct ThreadHandler;

impl Handler for ThreadHandler {
    fn name(&self) -> &'static str {
        "thread"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::Thread(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("thread handler got a {}", borrowed.kind());
        };
        let Resource::Thread(t) = &**res else {
            bail!("thread handler got a {}", res.type_key());
        };
        Ok(State::fields(vec![
            ("name", State::opt_str(&t.name)),
            ("target", State::Sub(t.target.clone())),
            ("args", State::subs(&t.args)),
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
        let name = view.opt_str_field("name")?;
        let target = view.require("target")?;
        let args = view.seq_field("args")?;

        let mut thread = ThreadRes::new(target, args);
        if let Some(n) = name {
            thread = thread.named(n);
        }
        // rebuilt unstarted; reconnect_all starts it when asked to
        Ok(Value::resource(Resource::Thread(thread)))
    }
}
