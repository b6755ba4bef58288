// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Handler contract and the per-type handler set.
//!
//! A handler owns everything the engine knows about one type family:
//! extracting reconstruction state, allocating an empty shell, populating
//! the shell from resolved state, and (for live resources) reconnecting.
//!
//! Handlers never recurse and never see the walker. `extract` returns a
//! [`State`] template whose [`State::Sub`] holes hold still-live
//! sub-objects untouched; the dispatcher alone walks into them. The same
//! separation holds on the way back: `populate` receives fully-resolved
//! values and only assigns them.

pub mod class;
pub mod concurrency;
pub mod db;
pub mod enums;
pub mod fs;
pub mod func;
pub mod instance;
pub mod logger;
pub mod net;
pub mod registry;
pub mod rgx;
pub mod runtime;
pub mod weak;

use anyhow::{Context, Result, bail};

use crate::value::{
    ObjRef, Value,
    object::{Obj, Reconnector},
};

/// State template produced by `extract`. Primitives and structure are
/// spelled out; anything still live stays behind [`State::Sub`].
pub enum State {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Seq(Vec<State>),
    /// String-keyed field map; the dominant shape for handler states.
    Fields(Vec<(String, State)>),
    /// A live sub-object the dispatcher will recurse into.
    Sub(Value),
}

impl State {
    pub fn fields(entries: Vec<(&str, State)>) -> Self {
        Self::Fields(
            entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        )
    }

    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    pub fn opt_str(s: &Option<String>) -> Self {
        match s {
            Some(v) => Self::Str(v.clone()),
            None => Self::Unit,
        }
    }

    pub fn sub(v: Value) -> Self {
        Self::Sub(v)
    }

    pub fn subs(values: &[Value]) -> Self {
        Self::Seq(values.iter().cloned().map(Self::Sub).collect())
    }
}

/// The per-type unit of knowledge.
pub trait Handler: Send + Sync {
    /// Registry name; also recorded in every tagged record this handler
    /// emits.
    fn name(&self) -> &'static str;

    fn can_handle(&self, obj: &Obj) -> bool;

    /// `"<module>.<qualified-name>"` identity recorded on the wire.
    fn type_key(&self, obj: &Obj) -> String;

    /// Extract reconstruction state. Must not recurse into sub-objects;
    /// the handle is provided (rather than a plain borrow) so user hooks
    /// can be handed the object itself.
    fn extract(&self, obj: &ObjRef) -> Result<State>;

    /// Allocate an empty shell for pass 1. No user initializers run here.
    fn shell(&self, type_key: &str) -> Result<ObjRef>;

    /// Fill the shell from fully-resolved state during pass 2.
    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()>;

    /// Rebuild the live resource a reconnector stands in for. Only
    /// resource handlers override this.
    fn reconnect(&self, rc: &Reconnector, auth: Option<&Value>) -> Result<Value> {
        let _ = auth;
        bail!("`{}` values are not reconnectable", rc.type_key);
    }
}

/// Read-only view over a resolved state value, with the field accessors
/// `populate` implementations lean on. Values come out cloned; clones are
/// handle-shallow.
pub struct StateView {
    map: ObjRef,
}

impl StateView {
    pub fn new(state: &Value) -> Result<Self> {
        let Some(r) = state.as_obj() else {
            bail!("state is a {}, expected a field map", state.kind());
        };
        if !matches!(&*r.borrow(), Obj::Map(_)) {
            bail!("state is a {}, expected a field map", r.borrow().kind());
        }
        Ok(Self { map: r.clone() })
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        match &*self.map.borrow() {
            Obj::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(name))
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    pub fn require(&self, name: &str) -> Result<Value> {
        self.get(name)
            .with_context(|| format!("state field `{name}` is missing"))
    }

    pub fn str_field(&self, name: &str) -> Result<String> {
        match self.require(name)? {
            Value::Str(s) => Ok(s),
            other => bail!("state field `{name}` is a {}, expected str", other.kind()),
        }
    }

    pub fn opt_str_field(&self, name: &str) -> Result<Option<String>> {
        match self.get(name) {
            None | Some(Value::Unit) => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s)),
            Some(other) => {
                bail!("state field `{name}` is a {}, expected str", other.kind())
            },
        }
    }

    pub fn int_field(&self, name: &str) -> Result<i64> {
        match self.require(name)? {
            Value::Int(v) => Ok(v),
            other => bail!("state field `{name}` is a {}, expected int", other.kind()),
        }
    }

    pub fn uint_field(&self, name: &str) -> Result<u64> {
        let v = self.int_field(name)?;
        u64::try_from(v)
            .with_context(|| format!("state field `{name}` is negative: {v}"))
    }

    pub fn opt_uint_field(&self, name: &str) -> Result<Option<u64>> {
        match self.get(name) {
            None | Some(Value::Unit) => Ok(None),
            Some(Value::Int(v)) => Ok(Some(u64::try_from(v).with_context(
                || format!("state field `{name}` is negative: {v}"),
            )?)),
            Some(other) => {
                bail!("state field `{name}` is a {}, expected int", other.kind())
            },
        }
    }

    pub fn bool_field(&self, name: &str) -> Result<bool> {
        match self.require(name)? {
            Value::Bool(v) => Ok(v),
            other => {
                bail!("state field `{name}` is a {}, expected bool", other.kind())
            },
        }
    }

    pub fn bytes_field(&self, name: &str) -> Result<Vec<u8>> {
        match self.require(name)? {
            Value::Bytes(v) => Ok(v),
            other => {
                bail!("state field `{name}` is a {}, expected bytes", other.kind())
            },
        }
    }

    pub fn seq_field(&self, name: &str) -> Result<Vec<Value>> {
        let v = self.require(name)?;
        let Some(r) = v.as_obj() else {
            bail!("state field `{name}` is a {}, expected seq", v.kind());
        };
        match &*r.borrow() {
            Obj::List(items) => Ok(items.clone()),
            other => bail!("state field `{name}` is a {}, expected seq", other.kind()),
        }
    }

    /// A nested field map: string keys, arbitrary values.
    pub fn fields_field(&self, name: &str) -> Result<Vec<(String, Value)>> {
        let v = self.require(name)?;
        let Some(r) = v.as_obj() else {
            bail!("state field `{name}` is a {}, expected map", v.kind());
        };
        match &*r.borrow() {
            Obj::Map(entries) => entries
                .iter()
                .map(|(k, v)| match k.as_str() {
                    Some(key) => Ok((key.to_string(), v.clone())),
                    None => bail!("non-string key in `{name}` field map"),
                })
                .collect(),
            other => bail!("state field `{name}` is a {}, expected map", other.kind()),
        }
    }
}

/// Build reconnector metadata from a resource record's resolved state map.
pub(crate) fn meta_from_state(state: &Value) -> Result<Vec<(String, Value)>> {
    let view = StateView::new(state)?;
    match &*view.map.borrow() {
        Obj::Map(entries) => entries
            .iter()
            .map(|(k, v)| match k.as_str() {
                Some(key) => Ok((key.to_string(), v.clone())),
                None => bail!("non-string key in resource state"),
            })
            .collect(),
        _ => bail!("resource state is not a field map"),
    }
}

/// Allocate the blank reconnector shell every resource handler shares.
pub(crate) fn reconnector_shell(handler: &'static str, type_key: &str) -> ObjRef {
    ObjRef::new(Obj::Reconnector(Reconnector {
        type_key: type_key.to_string(),
        handler: handler.to_string(),
        meta: Vec::new(),
    }))
}

/// Fill a reconnector shell in place.
pub(crate) fn populate_reconnector(shell: &ObjRef, state: &Value) -> Result<()> {
    let meta = meta_from_state(state)?;
    match &mut *shell.borrow_mut() {
        Obj::Reconnector(rc) => {
            rc.meta = meta;
            Ok(())
        },
        other => bail!("shell is a {}, expected a reconnector", other.kind()),
    }
}

/// View over reconnector metadata, sharing the field accessors of
/// [`StateView`] by materializing the meta pairs as a map value.
pub(crate) fn meta_view(rc: &Reconnector) -> StateView {
    let entries = rc
        .meta
        .iter()
        .map(|(k, v)| (Value::str(k.clone()), v.clone()))
        .collect();
    StateView { map: ObjRef::new(Obj::Map(entries)) }
}
