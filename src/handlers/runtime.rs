// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Runtime-object handlers: generators, tasks, pools, child processes,
//! context variables, and re-serialization of inert reconnectors.
//!
//! Generators and tasks cannot snapshot a suspended activation; they store
//! the function identity and construction arguments, and reconnection
//! yields a fresh, unstarted instance.

use anyhow::{Result, bail};

use crate::{
    handlers::{
        Handler, State, StateView, meta_view, populate_reconnector,
        reconnector_shell,
    },
    value::{
        ObjRef, Value,
        object::{Obj, Reconnector},
        resource::{
            ChildRes, ContextVarRes, GeneratorRes, PoolKind, PoolRes, Resource,
            ResourceSpec, TaskRes,
        },
    },
};

fn resource_type_key(obj: &Obj) -> String {
    match obj {
        Obj::Resource(res) => res.type_key().to_string(),
        other => format!("unexpected.{}", other.kind()),
    }
}

pub struct GeneratorHandler;

impl Handler for GeneratorHandler {
    fn name(&self) -> &'static str {
        "generator"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::Generator(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("generator handler got a {}", borrowed.kind());
        };
        let Resource::Generator(g) = &**res else {
            bail!("generator handler got a {}", res.type_key());
        };
        Ok(State::fields(vec![
            ("factory", State::Sub(g.factory.clone())),
            ("args", State::subs(&g.args)),
            ("emitted", State::Int(g.emitted as i64)),
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
        let factory = view.require("factory")?;
        let args = view.seq_field("args")?;
        // fresh and unstarted: the emission counter deliberately resets
        Ok(Value::resource(Resource::Generator(GeneratorRes::new(factory, args))))
    }
}

pub struct TaskHandler;

impl Handler for TaskHandler {
    fn name(&self) -> &'static str {
        "task"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::Task(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("task handler got a {}", borrowed.kind());
        };
        let Resource::Task(t) = &**res else {
            bail!("task handler got a {}", res.type_key());
        };
        Ok(State::fields(vec![
            ("func", State::Sub(t.func.clone())),
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
        let func = view.require("func")?;
        let args = view.seq_field("args")?;
        Ok(Value::resource(Resource::Task(TaskRes::new(func, args))))
    }
}

pub struct PoolHandler;

impl Handler for PoolHandler {
    fn name(&self) -> &'static str {
        "pool"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::Pool(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("pool handler got a {}", borrowed.kind());
        };
        let Resource::Pool(p) = &**res else {
            bail!("pool handler got a {}", res.type_key());
        };
        Ok(State::fields(vec![
            (
                "kind",
                State::str(match p.kind {
                    PoolKind::Thread => "thread",
                    PoolKind::Process => "process",
                }),
            ),
            ("size", State::Int(p.size as i64)),
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
            "thread" => PoolKind::Thread,
            "process" => PoolKind::Process,
            other => bail!("unknown pool kind `{other}`"),
        };
        let size = view.uint_field("size")? as usize;
        Ok(Value::resource(Resource::Pool(PoolRes { kind, size })))
    }
}

pub struct ChildHandler;

impl Handler for ChildHandler {
    fn name(&self) -> &'static str {
        "child"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::Child(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("child handler got a {}", borrowed.kind());
        };
        let Resource::Child(c) = &**res else {
            bail!("child handler got a {}", res.type_key());
        };
        let cwd = c.cwd.as_ref().and_then(|p| p.to_str()).map(str::to_string);
        Ok(State::fields(vec![
            ("program", State::str(c.program.clone())),
            (
                "args",
                State::Seq(c.args.iter().map(|a| State::str(a.clone())).collect()),
            ),
            ("cwd", State::opt_str(&cwd)),
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
        let program = view.str_field("program")?;
        let args = view
            .seq_field("args")?
            .into_iter()
            .map(|v| match v {
                Value::Str(s) => Ok(s),
                other => bail!("child argument is a {}", other.kind()),
            })
            .collect::<Result<Vec<_>>>()?;

        let mut child = ChildRes::new(
            &program,
            &args.iter().map(String::as_str).collect::<Vec<_>>(),
        );
        child.cwd = view.opt_str_field("cwd")?.map(Into::into);
        child.respawn()?;
        Ok(Value::resource(Resource::Child(child)))
    }
}

pub struct ContextVarHandler;

impl Handler for ContextVarHandler {
    fn name(&self) -> &'static str {
        "context_var"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::ContextVar(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("context-var handler got a {}", borrowed.kind());
        };
        let Resource::ContextVar(cv) = &**res else {
            bail!("context-var handler got a {}", res.type_key());
        };
        Ok(State::fields(vec![
            ("name", State::str(cv.name.clone())),
            (
                "value",
                match &cv.value {
                    Some(v) => State::Sub(v.clone()),
                    None => State::Unit,
                },
            ),
        ]))
    }

    fn shell(&self, _type_key: &str) -> Result<ObjRef> {
        Ok(ObjRef::new(Obj::Resource(Box::new(Resource::ContextVar(
            ContextVarRes { name: String::new(), value: None },
        )))))
    }

    // no external half: rebuilt live directly
    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        let view = StateView::new(&state)?;
        let name = view.str_field("name")?;
        let value = match view.require("value")? {
            Value::Unit => None,
            other => Some(other),
        };
        match &mut *shell.borrow_mut() {
            Obj::Resource(res) => {
                **res = Resource::ContextVar(ContextVarRes { name, value });
                Ok(())
            },
            other => bail!("shell is a {}, expected a resource", other.kind()),
        }
    }
}

/// Re-serializing a graph that still holds inert reconnectors must work;
/// this handler round-trips them unchanged.
pub struct ReconnectorHandler;

impl Handler for ReconnectorHandler {
    fn name(&self) -> &'static str {
        "reconnector"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Reconnector(_))
    }

    fn type_key(&self, obj: &Obj) -> String {
        match obj {
            Obj::Reconnector(rc) => rc.type_key.clone(),
            other => format!("unexpected.{}", other.kind()),
        }
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Reconnector(rc) = &*borrowed else {
            bail!("reconnector handler got a {}", borrowed.kind());
        };
        let meta = rc
            .meta
            .iter()
            .map(|(name, v)| (name.clone(), State::Sub(v.clone())))
            .collect();
        Ok(State::fields(vec![
            ("type_key", State::str(rc.type_key.clone())),
            ("target_handler", State::str(rc.handler.clone())),
            ("meta", State::Fields(meta)),
        ]))
    }

    fn shell(&self, type_key: &str) -> Result<ObjRef> {
        Ok(reconnector_shell(self.name(), type_key))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        let view = StateView::new(&state)?;
        let type_key = view.str_field("type_key")?;
        let target_handler = view.str_field("target_handler")?;
        let meta = view.fields_field("meta")?;
        match &mut *shell.borrow_mut() {
            Obj::Reconnector(rc) => {
                rc.type_key = type_key;
                rc.handler = target_handler;
                rc.meta = meta;
                Ok(())
            },
            other => bail!("shell is a {}, expected a reconnector", other.kind()),
        }
    }
}
