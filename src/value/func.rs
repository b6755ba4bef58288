// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Callable values.
//!
//! Functions are registry-resident: user code registers native function
//! pointers under `"<module>.<qualname>"` keys at startup, and serialized
//! functions carry only that key. Captured environments are expressed as
//! partial applications wrapping a registered callable.

use anyhow::{Result, bail};

use crate::{registry, value::Value};

/// Signature every registered native function satisfies. Plain `fn`
/// pointers keep the registry `Send + Sync` without locking gymnastics.
pub type NativeFn = fn(&[Value]) -> Result<Value>;

/// A module-resident function, identified by its registry key.
#[derive(Clone)]
pub struct FunctionVal {
    pub module: String,
    pub qualname: String,
    /// Default arguments, applied for trailing parameters the caller omits.
    pub defaults: Vec<(String, Value)>,
}

impl FunctionVal {
    pub fn new(module: impl Into<String>, qualname: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            qualname: qualname.into(),
            defaults: Vec::new(),
        }
    }

    pub fn with_default(mut self, name: impl Into<String>, value: Value) -> Self {
        self.defaults.push((name.into(), value));
        self
    }

    #[inline]
    pub fn key(&self) -> String {
        format!("{}.{}", self.module, self.qualname)
    }

    /// Resolve against the function registry and invoke.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        let key = self.key();
        let Some(f) = registry::lookup_fn(&key) else {
            bail!("function `{key}` is not registered");
        };
        f(args)
    }
}

/// `receiver.method` pair.
pub struct BoundMethod {
    pub receiver: Value,
    pub func: Value,
}

impl BoundMethod {
    /// Invoke with the receiver prepended to the argument list.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        let Some(r) = self.func.as_obj() else {
            bail!("bound method target is not callable");
        };
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(self.receiver.clone());
        full.extend_from_slice(args);
        match &*r.borrow() {
            crate::value::object::Obj::Function(f) => f.call(&full),
            other => bail!("bound method target is a {}", other.kind()),
        }
    }
}

/// Partial application: wrapped callable plus bound positional and keyword
/// arguments.
pub struct PartialVal {
    pub callable: Value,
    pub args: Vec<Value>,
    pub kwargs: Vec<(String, Value)>,
}

impl PartialVal {
    pub fn call(&self, extra: &[Value]) -> Result<Value> {
        let Some(r) = self.callable.as_obj() else {
            bail!("partial wraps a non-callable");
        };
        let mut full = self.args.clone();
        full.extend_from_slice(extra);
        match &*r.borrow() {
            crate::value::object::Obj::Function(f) => f.call(&full),
            crate::value::object::Obj::Partial(p) => p.call(&full),
            other => bail!("partial wraps a {}", other.kind()),
        }
    }
}

/// A module value; reconstruction resolves the name against the module
/// registry, the moral equivalent of a re-import.
#[derive(Clone)]
pub struct ModuleVal {
    pub name: String,
}

impl ModuleVal {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
