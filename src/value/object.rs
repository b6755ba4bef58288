// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::HashSet;

use crate::value::{
    Value,
    class::{ClassDef, EnumMember},
    deep_eq_entries, deep_eq_fields, deep_eq_slices,
    func::{BoundMethod, FunctionVal, ModuleVal, PartialVal},
    resource::{Resource, ResourceSpec},
};

/// Everything identity-bearing. Containers, class machinery, callables,
/// live resources and the inert reconnection placeholders all live here so
/// one `ObjRef` type covers the whole graph.
pub enum Obj {
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Instance(Instance),
    Class(Box<ClassDef>),
    Enum(EnumMember),
    Function(FunctionVal),
    Bound(BoundMethod),
    Partial(PartialVal),
    Module(ModuleVal),
    Weak(WeakRef),
    Resource(Box<Resource>),
    Reconnector(Reconnector),
}

/// A user-class instance: class identity plus an ordered attribute bag.
///
/// `class` is either a `Value::Ref` to an in-graph [`ClassDef`] or a
/// `Value::Str` type key resolved through the process-wide class registry.
pub struct Instance {
    pub class: Value,
    pub fields: Vec<(String, Value)>,
}

impl Instance {
    pub fn new(class: Value) -> Self {
        Self { class, fields: Vec::new() }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn set_field(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name.to_string(), value));
        }
    }

    /// Type key of the instance's class.
    pub fn class_key(&self) -> Option<String> {
        match &self.class {
            Value::Str(key) => Some(key.clone()),
            Value::Ref(r) => match &*r.borrow() {
                Obj::Class(def) => Some(def.type_key()),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Weak handle into the graph. Serialized as a back-reference to its
/// referent; a dead referent serializes (and restores) as a dead weak ref.
pub struct WeakRef {
    pub target: std::rc::Weak<std::cell::RefCell<Obj>>,
}

impl WeakRef {
    pub fn upgrade(&self) -> Option<crate::value::ObjRef> {
        self.target.upgrade().map(crate::value::ObjRef::from_rc)
    }
}

/// Inert placeholder for a live resource, produced during deserialization.
/// Carries reconstruction metadata only; it never dials out by itself.
#[derive(Debug, Clone)]
pub struct Reconnector {
    pub type_key: String,
    pub handler: String,
    pub meta: Vec<(String, Value)>,
}

impl Reconnector {
    pub fn meta_value(&self, name: &str) -> Option<&Value> {
        self.meta.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl Obj {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Instance(_) => "instance",
            Self::Class(_) => "class",
            Self::Enum(_) => "enum",
            Self::Function(_) => "function",
            Self::Bound(_) => "bound_method",
            Self::Partial(_) => "partial",
            Self::Module(_) => "module",
            Self::Weak(_) => "weakref",
            Self::Resource(_) => "resource",
            Self::Reconnector(_) => "reconnector",
        }
    }

    pub(crate) fn deep_eq(
        a: &Obj,
        b: &Obj,
        visited: &mut HashSet<(usize, usize)>,
    ) -> bool {
        match (a, b) {
            (Obj::List(x), Obj::List(y)) | (Obj::Set(x), Obj::Set(y)) => {
                deep_eq_slices(x, y, visited)
            },
            (Obj::Map(x), Obj::Map(y)) => deep_eq_entries(x, y, visited),
            (Obj::Instance(x), Obj::Instance(y)) => {
                super::deep_eq_inner(&x.class, &y.class, visited)
                    && deep_eq_fields(&x.fields, &y.fields, visited)
            },
            (Obj::Class(x), Obj::Class(y)) => x.structural_eq(y, visited),
            (Obj::Enum(x), Obj::Enum(y)) => {
                x.class_key == y.class_key && x.member == y.member
            },
            (Obj::Function(x), Obj::Function(y)) => x.key() == y.key(),
            (Obj::Bound(x), Obj::Bound(y)) => {
                super::deep_eq_inner(&x.receiver, &y.receiver, visited)
                    && super::deep_eq_inner(&x.func, &y.func, visited)
            },
            (Obj::Partial(x), Obj::Partial(y)) => {
                super::deep_eq_inner(&x.callable, &y.callable, visited)
                    && deep_eq_slices(&x.args, &y.args, visited)
                    && deep_eq_fields(&x.kwargs, &y.kwargs, visited)
            },
            (Obj::Module(x), Obj::Module(y)) => x.name == y.name,
            (Obj::Weak(x), Obj::Weak(y)) => match (x.upgrade(), y.upgrade()) {
                (None, None) => true,
                (Some(rx), Some(ry)) => super::deep_eq_inner(
                    &Value::Ref(rx),
                    &Value::Ref(ry),
                    visited,
                ),
                _ => false,
            },
            // Live resources compare by family; configuration equality is
            // checked through accessors in tests, not here.
            (Obj::Resource(x), Obj::Resource(y)) => x.type_key() == y.type_key(),
            (Obj::Reconnector(x), Obj::Reconnector(y)) => {
                x.type_key == y.type_key
                    && x.handler == y.handler
                    && deep_eq_fields(&x.meta, &y.meta, visited)
            },
            _ => false,
        }
    }
}
