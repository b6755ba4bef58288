// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The dispatcher: drives the serialize walk and the two-pass rebuild.
//!
//! Serialize: fast-path leaves go straight to IR; identity-bearing values
//! are tracked, repeat encounters become back-references, containers become
//! id-carrying container nodes, and everything else is routed through the
//! handler registry into a tagged record. Handlers extract flat state; the
//! dispatcher alone recurses into the `Sub` holes.
//!
//! Deserialize: pass 1 allocates shells for every container node and tagged
//! record into the shell arena; pass 2 materializes values post-order,
//! resolving back-references through the arena. By the time a reference
//! must be written into a field, the referenced shell already exists —
//! which is what makes cycles safe.

pub mod path;
pub mod trace;

use std::sync::Arc;

use crate::{
    cfg::options::EngineOptions,
    error::{CorruptIr, DeserializationError, SerializationError},
    handlers::{Handler, State, registry::HandlerRegistry},
    ir::node::IrNode,
    track::{arena::ShellArena, identity::IdentityTracker},
    value::{ObjRef, Value, object::Obj},
};

use self::{
    path::{Segment, WalkPath},
    trace::{DepthTrace, TraceSink},
};

pub struct Dispatcher<'a> {
    registry: &'a HandlerRegistry,
    opts: EngineOptions,
    tracker: IdentityTracker,
    arena: ShellArena,
    path: WalkPath,
    trace: Option<Box<dyn TraceSink>>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a HandlerRegistry, opts: EngineOptions) -> Self {
        let trace: Option<Box<dyn TraceSink>> =
            if opts.verbose { Some(Box::new(DepthTrace)) } else { None };
        Self {
            registry,
            opts,
            tracker: IdentityTracker::new(),
            arena: ShellArena::new(),
            path: WalkPath::new(),
            trace,
        }
    }

    fn trace_event(&self, step: &str, type_key: &str, handler: &str) {
        if let Some(sink) = &self.trace {
            sink.event(self.path.depth(), step, type_key, handler);
        }
    }

    // -----------------------------------------------------------------
    // serialize walk
    // -----------------------------------------------------------------

    pub fn walk_serialize(
        &mut self,
        value: &Value,
    ) -> Result<IrNode, SerializationError> {
        match value {
            Value::Unit => Ok(IrNode::Unit),
            Value::Bool(v) => Ok(IrNode::Bool(*v)),
            Value::Int(v) => Ok(IrNode::Int(*v)),
            Value::Float(v) => Ok(IrNode::Float(*v)),
            Value::Str(v) => Ok(IrNode::Str(v.clone())),
            Value::Bytes(v) => Ok(IrNode::Bytes(v.clone())),
            Value::Ellipsis => Ok(IrNode::Ellipsis),
            Value::NotImplemented => Ok(IrNode::NotImplemented),
            Value::Empty => Ok(IrNode::Empty),
            Value::Ref(r) => self.walk_object(r),
        }
    }

    fn walk_object(&mut self, r: &ObjRef) -> Result<IrNode, SerializationError> {
        let (id, is_new) = self.tracker.assign_or_lookup(r);
        if !is_new {
            self.trace_event("backref", r.borrow().kind(), "");
            return Ok(IrNode::Ref(id));
        }

        let is_container =
            matches!(&*r.borrow(), Obj::List(_) | Obj::Set(_) | Obj::Map(_));
        if is_container {
            return self.walk_container(r, id);
        }

        let (handler, type_key) = {
            let obj = r.borrow();
            let Some(handler) = self.registry.resolve(&obj) else {
                return Err(SerializationError::Unsupported {
                    type_key: obj.kind().to_string(),
                    path: self.path.to_string(),
                });
            };
            let type_key = handler.type_key(&obj);
            (handler, type_key)
        };
        self.trace_event("extract", &type_key, handler.name());

        let state = handler
            .extract(r)
            .map_err(|e| self.extract_error(handler.name(), &type_key, e))?;
        let state_ir = self.walk_state(state)?;

        Ok(IrNode::Record {
            cucumber_type: type_key,
            handler: handler.name().to_string(),
            object_id: id,
            state: Box::new(state_ir),
        })
    }

    fn walk_container(
        &mut self,
        r: &ObjRef,
        id: u64,
    ) -> Result<IrNode, SerializationError> {
        let obj = r.borrow();
        self.trace_event("container", obj.kind(), "");
        match &*obj {
            Obj::List(items) | Obj::Set(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    self.path.push(Segment::Index(i));
                    let node = self.walk_serialize(item);
                    self.path.pop();
                    out.push(node?);
                }
                if matches!(&*obj, Obj::List(_)) {
                    Ok(IrNode::Seq { id, items: out })
                } else {
                    Ok(IrNode::Set { id, items: out })
                }
            },
            Obj::Map(entries) => {
                let mut out = Vec::with_capacity(entries.len());
                for (key, val) in entries {
                    self.path.push(Segment::Key(key_label(key)));
                    let pair = self.walk_serialize(key).and_then(|key_node| {
                        Ok((key_node, self.walk_serialize(val)?))
                    });
                    self.path.pop();
                    out.push(pair?);
                }
                Ok(IrNode::Map { id, entries: out })
            },
            _ => unreachable!("walk_container called on a non-container"),
        }
    }

    fn walk_state(&mut self, state: State) -> Result<IrNode, SerializationError> {
        Ok(match state {
            State::Unit => IrNode::Unit,
            State::Bool(v) => IrNode::Bool(v),
            State::Int(v) => IrNode::Int(v),
            State::Float(v) => IrNode::Float(v),
            State::Str(v) => IrNode::Str(v),
            State::Bytes(v) => IrNode::Bytes(v),
            State::Seq(items) => {
                let id = self.tracker.fresh_id();
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    self.path.push(Segment::Index(i));
                    let node = self.walk_state(item);
                    self.path.pop();
                    out.push(node?);
                }
                IrNode::Seq { id, items: out }
            },
            State::Fields(fields) => {
                let id = self.tracker.fresh_id();
                let mut entries = Vec::with_capacity(fields.len());
                for (name, item) in fields {
                    self.path.push(Segment::Attr(name.clone()));
                    let node = self.walk_state(item);
                    self.path.pop();
                    entries.push((IrNode::Str(name), node?));
                }
                IrNode::Map { id, entries }
            },
            State::Sub(value) => self.walk_serialize(&value)?,
        })
    }

    fn extract_error(
        &self,
        handler: &'static str,
        type_key: &str,
        source: anyhow::Error,
    ) -> SerializationError {
        let path = self.path.to_string();
        if self.opts.debug {
            tracing::error!(
                target: "cucumber::debug",
                "serialization failed\n  path:    {path}\n  handler: {handler}\n  type:    {type_key}\n  cause:   {source:#}"
            );
        }
        SerializationError::Extract {
            handler,
            type_key: type_key.to_string(),
            path,
            source,
        }
    }

    // -----------------------------------------------------------------
    // deserialize: pass 1 — allocate shells
    // -----------------------------------------------------------------

    pub fn allocate(&mut self, ir: &IrNode) -> Result<(), DeserializationError> {
        match ir {
            IrNode::Seq { id, items } => {
                self.register_shell(*id, ObjRef::new(Obj::List(Vec::new())))?;
                items.iter().try_for_each(|item| self.allocate(item))
            },
            IrNode::Set { id, items } => {
                self.register_shell(*id, ObjRef::new(Obj::Set(Vec::new())))?;
                items.iter().try_for_each(|item| self.allocate(item))
            },
            IrNode::Map { id, entries } => {
                self.register_shell(*id, ObjRef::new(Obj::Map(Vec::new())))?;
                entries.iter().try_for_each(|(k, v)| {
                    self.allocate(k)?;
                    self.allocate(v)
                })
            },
            IrNode::Record { cucumber_type, handler, object_id, state } => {
                let h = self.handler_by_name(handler)?;
                self.trace_event("shell", cucumber_type, h.name());
                let shell = h.shell(cucumber_type).map_err(|source| {
                    DeserializationError::Shell {
                        handler: handler.clone(),
                        type_key: cucumber_type.clone(),
                        source,
                    }
                })?;
                self.register_shell(*object_id, shell)?;
                self.allocate(state)
            },
            _ => Ok(()),
        }
    }

    fn register_shell(
        &mut self,
        id: u64,
        shell: ObjRef,
    ) -> Result<(), DeserializationError> {
        if self.arena.contains(id) {
            return Err(CorruptIr::DuplicateId(id).into());
        }
        self.arena.register(id, shell);
        Ok(())
    }

    fn handler_by_name(
        &self,
        name: &str,
    ) -> Result<Arc<dyn Handler>, DeserializationError> {
        self.registry.by_name(name).ok_or_else(|| {
            DeserializationError::UnknownHandler { name: name.to_string() }
        })
    }

    // -----------------------------------------------------------------
    // deserialize: pass 2 — materialize post-order
    // -----------------------------------------------------------------

    pub fn materialize(
        &mut self,
        ir: &IrNode,
    ) -> Result<Value, DeserializationError> {
        match ir {
            IrNode::Unit => Ok(Value::Unit),
            IrNode::Bool(v) => Ok(Value::Bool(*v)),
            IrNode::Int(v) => Ok(Value::Int(*v)),
            IrNode::Float(v) => Ok(Value::Float(*v)),
            IrNode::Str(v) => Ok(Value::Str(v.clone())),
            IrNode::Bytes(v) => Ok(Value::Bytes(v.clone())),
            IrNode::Ellipsis => Ok(Value::Ellipsis),
            IrNode::NotImplemented => Ok(Value::NotImplemented),
            IrNode::Empty => Ok(Value::Empty),
            IrNode::Ref(id) => Ok(Value::Ref(self.arena.resolve(*id)?)),
            IrNode::Seq { id, items } | IrNode::Set { id, items } => {
                let shell = self.arena.resolve(*id)?;
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    self.path.push(Segment::Index(i));
                    let value = self.materialize(item);
                    self.path.pop();
                    out.push(value?);
                }
                match &mut *shell.borrow_mut() {
                    Obj::List(slot) | Obj::Set(slot) => *slot = out,
                    other => {
                        return Err(DeserializationError::BrokenShape {
                            detail: format!(
                                "shell for id {id} is a {}, expected a sequence",
                                other.kind()
                            ),
                            path: self.path.to_string(),
                        });
                    },
                }
                Ok(Value::Ref(shell))
            },
            IrNode::Map { id, entries } => {
                let shell = self.arena.resolve(*id)?;
                let mut out = Vec::with_capacity(entries.len());
                for (key_node, val_node) in entries {
                    let key = self.materialize(key_node)?;
                    self.path.push(Segment::Key(key_label(&key)));
                    let val = self.materialize(val_node);
                    self.path.pop();
                    out.push((key, val?));
                }
                match &mut *shell.borrow_mut() {
                    Obj::Map(slot) => *slot = out,
                    other => {
                        return Err(DeserializationError::BrokenShape {
                            detail: format!(
                                "shell for id {id} is a {}, expected a map",
                                other.kind()
                            ),
                            path: self.path.to_string(),
                        });
                    },
                }
                Ok(Value::Ref(shell))
            },
            IrNode::Record { cucumber_type, handler, object_id, state } => {
                let shell = self.arena.resolve(*object_id)?;
                let h = self.handler_by_name(handler)?;

                self.path.push(Segment::Attr(format!("<{cucumber_type}>")));
                let state_value = self.materialize(state);
                self.path.pop();
                let state_value = state_value?;

                self.trace_event("populate", cucumber_type, h.name());
                h.populate(&shell, state_value).map_err(|source| {
                    self.populate_error(handler, cucumber_type, source)
                })?;
                Ok(Value::Ref(shell))
            },
        }
    }

    fn populate_error(
        &self,
        handler: &str,
        type_key: &str,
        source: anyhow::Error,
    ) -> DeserializationError {
        let path = self.path.to_string();
        if self.opts.debug {
            tracing::error!(
                target: "cucumber::debug",
                "reconstruction failed\n  path:    {path}\n  handler: {handler}\n  type:    {type_key}\n  cause:   {source:#}"
            );
        }
        DeserializationError::Populate {
            handler: handler.to_string(),
            type_key: type_key.to_string(),
            path,
            source,
        }
    }
}

/// Short human label for a mapping key, used in walk paths.
fn key_label(key: &Value) -> String {
    match key {
        Value::Str(s) => s.clone(),
        Value::Int(v) => v.to_string(),
        Value::Bool(v) => v.to_string(),
        other => other.kind().to_string(),
    }
}
