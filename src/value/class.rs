// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Runtime class definitions.
//!
//! Rust has no reflective class objects, so classes are explicit values:
//! module + qualified name, a kind (plain, data-class, enumeration), class
//! attributes (methods are function values), nested class definitions, and
//! optional hook/mapping specs that drive tier-1/tier-2 handler selection.

use std::collections::HashSet;

use crate::value::{Value, deep_eq_fields, deep_eq_slices};

#[derive(Clone)]
pub enum ClassKind {
    Plain,
    /// Data class: field values are extracted in declared order.
    Data { fields: Vec<String> },
    /// Enumeration: named members with payload values.
    Enum { members: Vec<(String, Value)> },
}

/// Explicit `serialize_hook` / `deserialize_hook` pair, by registered
/// function key. Highest-priority user override.
#[derive(Clone)]
pub struct HookSpec {
    pub serialize_hook: String,
    pub deserialize_hook: String,
}

/// Symmetric `to_mapping` / `from_mapping` pair, by registered function key.
#[derive(Clone)]
pub struct MappingSpec {
    pub to_mapping: String,
    pub from_mapping: String,
}

pub struct ClassDef {
    pub module: String,
    pub qualname: String,
    pub kind: ClassKind,
    pub attrs: Vec<(String, Value)>,
    /// Nested class definitions, inner-before-outer on the wire.
    pub nested: Vec<Value>,
    pub hooks: Option<HookSpec>,
    pub mapping: Option<MappingSpec>,
}

impl ClassDef {
    pub fn new(module: impl Into<String>, qualname: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            qualname: qualname.into(),
            kind: ClassKind::Plain,
            attrs: Vec::new(),
            nested: Vec::new(),
            hooks: None,
            mapping: None,
        }
    }

    /// `"<module>.<qualname>"`, the registry and wire identity of the class.
    pub fn type_key(&self) -> String {
        format!("{}.{}", self.module, self.qualname)
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attrs.push((name.into(), value));
        self
    }

    pub fn with_nested(mut self, class: Value) -> Self {
        self.nested.push(class);
        self
    }

    pub fn with_hooks(mut self, serialize_hook: &str, deserialize_hook: &str) -> Self {
        self.hooks = Some(HookSpec {
            serialize_hook: serialize_hook.to_string(),
            deserialize_hook: deserialize_hook.to_string(),
        });
        self
    }

    pub fn with_mapping(mut self, to_mapping: &str, from_mapping: &str) -> Self {
        self.mapping = Some(MappingSpec {
            to_mapping: to_mapping.to_string(),
            from_mapping: from_mapping.to_string(),
        });
        self
    }

    pub fn data_fields(mut self, fields: &[&str]) -> Self {
        self.kind = ClassKind::Data {
            fields: fields.iter().map(|s| (*s).to_string()).collect(),
        };
        self
    }

    pub fn enum_members(mut self, members: Vec<(String, Value)>) -> Self {
        self.kind = ClassKind::Enum { members };
        self
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn nested_class(&self, qualname: &str) -> Option<&Value> {
        self.nested.iter().find(|v| {
            v.as_obj().is_some_and(|r| match &*r.borrow() {
                crate::value::object::Obj::Class(def) => def.qualname == qualname,
                _ => false,
            })
        })
    }

    pub(crate) fn structural_eq(
        &self,
        other: &ClassDef,
        visited: &mut HashSet<(usize, usize)>,
    ) -> bool {
        if self.module != other.module || self.qualname != other.qualname {
            return false;
        }
        let kinds = match (&self.kind, &other.kind) {
            (ClassKind::Plain, ClassKind::Plain) => true,
            (ClassKind::Data { fields: a }, ClassKind::Data { fields: b }) => a == b,
            (ClassKind::Enum { members: a }, ClassKind::Enum { members: b }) => {
                deep_eq_fields(a, b, visited)
            },
            _ => false,
        };
        kinds
            && deep_eq_fields(&self.attrs, &other.attrs, visited)
            && deep_eq_slices(&self.nested, &other.nested, visited)
    }
}

/// One enumeration value: class key plus member name. The payload value is
/// looked up on the class definition.
pub struct EnumMember {
    pub class_key: String,
    pub member: String,
}

impl EnumMember {
    pub fn new(class_key: impl Into<String>, member: impl Into<String>) -> Self {
        Self { class_key: class_key.into(), member: member.into() }
    }
}
