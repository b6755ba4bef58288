// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Post-deserialization reconnection.
//!
//! `reconnect_all` traverses the graph reachable from a root, finds inert
//! [`Reconnector`]s and asks their handler to rebuild the live resource,
//! combining stored metadata with caller-supplied authentication. The
//! rebuilt object is swapped into the reconnector's own cell, so every
//! alias in the graph — shared or cyclic — observes the live resource.
//!
//! Auth lookup ladder per reconnector: `auth[type_key][attribute]`, then
//! `auth[type_key]["*"]`, then no auth. Failures are collected by default
//! so a partial environment does not block all restoration; strict mode
//! raises the first one.

use std::collections::{HashMap, HashSet};

use crate::{
    cfg::options::ReconnectOptions,
    dispatch::path::{Segment, WalkPath},
    error::{ReconnectFailure, ReconnectionError},
    handlers::registry::HandlerRegistry,
    value::{
        ObjRef, Value,
        object::{Obj, Reconnector},
        resource::Resource,
    },
};

/// Caller-supplied authentication: `type_key -> attribute -> secret`.
/// `"*"` is the per-type wildcard attribute.
#[derive(Default)]
pub struct AuthMap {
    entries: HashMap<String, HashMap<String, Value>>,
}

impl AuthMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        type_key: impl Into<String>,
        attr: impl Into<String>,
        secret: impl Into<Value>,
    ) -> Self {
        self.insert(type_key, attr, secret);
        self
    }

    pub fn insert(
        &mut self,
        type_key: impl Into<String>,
        attr: impl Into<String>,
        secret: impl Into<Value>,
    ) {
        self.entries
            .entry(type_key.into())
            .or_default()
            .insert(attr.into(), secret.into());
    }

    fn lookup(&self, type_key: &str, attr: &str) -> Option<&Value> {
        let per_type = self.entries.get(type_key)?;
        per_type.get(attr).or_else(|| per_type.get("*"))
    }
}

/// Result of a collect-and-continue reconnection walk.
#[derive(Debug)]
pub struct ReconnectOutcome {
    pub root: Value,
    pub failures: Vec<ReconnectFailure>,
}

impl ReconnectOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub fn reconnect_all(
    root: &Value,
    auth: &AuthMap,
    opts: &ReconnectOptions,
    registry: &HandlerRegistry,
) -> Result<ReconnectOutcome, ReconnectionError> {
    let mut walker = ReconnectWalker {
        auth,
        opts,
        registry,
        visited: HashSet::new(),
        path: WalkPath::new(),
        failures: Vec::new(),
    };
    walker.visit(root, None)?;
    Ok(ReconnectOutcome { root: root.clone(), failures: walker.failures })
}

struct ReconnectWalker<'a> {
    auth: &'a AuthMap,
    opts: &'a ReconnectOptions,
    registry: &'a HandlerRegistry,
    visited: HashSet<usize>,
    path: WalkPath,
    failures: Vec<ReconnectFailure>,
}

impl<'a> ReconnectWalker<'a> {
    fn visit(
        &mut self,
        value: &Value,
        attr: Option<&str>,
    ) -> Result<(), ReconnectionError> {
        let Some(r) = value.as_obj() else {
            return Ok(());
        };
        if !self.visited.insert(r.addr()) {
            return Ok(());
        }

        let is_reconnector = matches!(&*r.borrow(), Obj::Reconnector(_));
        if is_reconnector {
            return self.reconnect_in_place(r, attr);
        }
        self.visit_children(r)
    }

    fn visit_children(&mut self, r: &ObjRef) -> Result<(), ReconnectionError> {
        // collect (label, child) pairs first so no borrow is held while
        // children reconnect
        let children: Vec<(Option<String>, Value)> = {
            let obj = r.borrow();
            match &*obj {
                Obj::List(items) | Obj::Set(items) => {
                    items.iter().map(|v| (None, v.clone())).collect()
                },
                Obj::Map(entries) => entries
                    .iter()
                    .flat_map(|(k, v)| {
                        let label = k.as_str().map(str::to_string);
                        [(None, k.clone()), (label, v.clone())]
                    })
                    .collect(),
                Obj::Instance(inst) => inst
                    .fields
                    .iter()
                    .map(|(name, v)| (Some(name.clone()), v.clone()))
                    .chain(std::iter::once((None, inst.class.clone())))
                    .collect(),
                Obj::Class(def) => def
                    .attrs
                    .iter()
                    .map(|(name, v)| (Some(name.clone()), v.clone()))
                    .chain(def.nested.iter().map(|v| (None, v.clone())))
                    .collect(),
                Obj::Partial(p) => std::iter::once((None, p.callable.clone()))
                    .chain(p.args.iter().map(|v| (None, v.clone())))
                    .chain(
                        p.kwargs
                            .iter()
                            .map(|(name, v)| (Some(name.clone()), v.clone())),
                    )
                    .collect(),
                Obj::Bound(b) => {
                    vec![(None, b.receiver.clone()), (None, b.func.clone())]
                },
                Obj::Function(f) => f
                    .defaults
                    .iter()
                    .map(|(name, v)| (Some(name.clone()), v.clone()))
                    .collect(),
                Obj::Reconnector(rc) => rc
                    .meta
                    .iter()
                    .map(|(name, v)| (Some(name.clone()), v.clone()))
                    .collect(),
                Obj::Resource(res) => match &**res {
                    Resource::Queue(q) => {
                        q.snapshot().into_iter().map(|v| (None, v)).collect()
                    },
                    Resource::Thread(t) => {
                        std::iter::once((None, t.target.clone()))
                            .chain(t.args.iter().map(|v| (None, v.clone())))
                            .collect()
                    },
                    Resource::Generator(g) => {
                        std::iter::once((None, g.factory.clone()))
                            .chain(g.args.iter().map(|v| (None, v.clone())))
                            .collect()
                    },
                    Resource::Task(t) => std::iter::once((None, t.func.clone()))
                        .chain(t.args.iter().map(|v| (None, v.clone())))
                        .collect(),
                    Resource::ContextVar(cv) => {
                        cv.value.iter().map(|v| (None, v.clone())).collect()
                    },
                    _ => Vec::new(),
                },
                Obj::Enum(_) | Obj::Module(_) | Obj::Weak(_) => Vec::new(),
            }
        };

        for (i, (label, child)) in children.iter().enumerate() {
            match label {
                Some(name) => self.path.push(Segment::Attr(name.clone())),
                None => self.path.push(Segment::Index(i)),
            }
            let res = self.visit(child, label.as_deref());
            self.path.pop();
            res?;
        }
        Ok(())
    }

    fn reconnect_in_place(
        &mut self,
        r: &ObjRef,
        attr: Option<&str>,
    ) -> Result<(), ReconnectionError> {
        let rc: Reconnector = match &*r.borrow() {
            Obj::Reconnector(rc) => rc.clone(),
            _ => return Ok(()),
        };

        let outcome = self.rebuild(&rc, attr);
        match outcome {
            Ok(obj) => {
                r.replace(obj);
                if self.opts.start_threads
                    && let Err(source) = self.start_if_thread(r)
                {
                    self.record(&rc.type_key, source)?;
                }
                // a rebuilt resource can itself hold restored values
                // (queue items, thread args); give nested reconnectors
                // their turn
                self.visit_children(r)
            },
            Err(source) => {
                self.record(&rc.type_key, source)?;
                // left in place; still descend into the metadata so a
                // partial environment restores what it can
                self.visit_children(r)
            },
        }
    }

    fn rebuild(
        &self,
        rc: &Reconnector,
        attr: Option<&str>,
    ) -> Result<Obj, anyhow::Error> {
        let Some(handler) = self.registry.by_name(&rc.handler) else {
            anyhow::bail!("no handler named `{}` is registered", rc.handler);
        };
        let auth = self.auth.lookup(&rc.type_key, attr.unwrap_or("*"));
        let live = handler.reconnect(rc, auth)?;
        let Some(handle) = live.into_obj() else {
            anyhow::bail!("handler returned a primitive for `{}`", rc.type_key);
        };
        handle.try_take().map_err(|_| {
            anyhow::anyhow!("handler returned an aliased object for `{}`", rc.type_key)
        })
    }

    fn start_if_thread(&self, r: &ObjRef) -> Result<(), anyhow::Error> {
        match &mut *r.borrow_mut() {
            Obj::Resource(res) => match &mut **res {
                Resource::Thread(t) => t.start(),
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }

    fn record(
        &mut self,
        type_key: &str,
        source: anyhow::Error,
    ) -> Result<(), ReconnectionError> {
        let failure = ReconnectFailure {
            type_key: type_key.to_string(),
            path: self.path.to_string(),
            source,
        };
        if self.opts.strict {
            return Err(ReconnectionError::Failed(failure));
        }
        tracing::warn!(
            target: "cucumber::reconnect",
            "reconnect of `{}` at {} failed: {:#}",
            failure.type_key,
            failure.path,
            failure.source
        );
        self.failures.push(failure);
        Ok(())
    }
}
