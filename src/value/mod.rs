// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The dynamic object space the engine serializes.
//!
//! `Value` splits the world in two: primitive leaves are inline and carry no
//! identity; everything that can be shared, mutated or cycled lives behind
//! an [`ObjRef`] (`Rc<RefCell<Obj>>`). Cloning a `Value::Ref` clones the
//! handle, not the object, so two clones observe each other's mutations —
//! which is exactly the aliasing the identity tracker preserves across a
//! round-trip.

pub mod class;
pub mod func;
pub mod object;
pub mod plain;
pub mod resource;

use std::{
    cell::{Ref, RefCell, RefMut},
    collections::HashSet,
    fmt,
    rc::{Rc, Weak},
};

use crate::value::object::Obj;

/// One value in the object space.
#[derive(Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Ellipsis,
    NotImplemented,
    Empty,
    Ref(ObjRef),
}

/// Shared handle to an identity-bearing object.
#[derive(Clone)]
pub struct ObjRef(Rc<RefCell<Obj>>);

impl ObjRef {
    pub fn new(obj: Obj) -> Self {
        Self(Rc::new(RefCell::new(obj)))
    }

    /// Raw identity used by the per-call identity tracker.
    #[inline]
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    #[inline]
    pub fn borrow(&self) -> Ref<'_, Obj> {
        self.0.borrow()
    }

    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, Obj> {
        self.0.borrow_mut()
    }

    /// Replace the contained object in place, keeping every alias pointed at
    /// the new contents. Shell population relies on this.
    pub fn replace(&self, obj: Obj) {
        *self.0.borrow_mut() = obj;
    }

    #[inline]
    pub fn downgrade(&self) -> Weak<RefCell<Obj>> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn from_rc(rc: Rc<RefCell<Obj>>) -> Self {
        Self(rc)
    }

    #[inline]
    pub fn same(&self, other: &ObjRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Take sole ownership of the contained object. Fails (returning the
    /// handle) when aliases exist.
    pub fn try_take(self) -> Result<Obj, ObjRef> {
        Rc::try_unwrap(self.0)
            .map(RefCell::into_inner)
            .map_err(Self)
    }
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(b.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Self::Ref(ObjRef::new(Obj::List(items)))
    }

    pub fn set(items: Vec<Value>) -> Self {
        let mut out: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            if !out.iter().any(|v| deep_eq(v, &item)) {
                out.push(item);
            }
        }
        Self::Ref(ObjRef::new(Obj::Set(out)))
    }

    pub fn map(entries: Vec<(Value, Value)>) -> Self {
        Self::Ref(ObjRef::new(Obj::Map(entries)))
    }

    pub fn object(obj: Obj) -> Self {
        Self::Ref(ObjRef::new(obj))
    }

    pub fn resource(res: crate::value::resource::Resource) -> Self {
        Self::Ref(ObjRef::new(Obj::Resource(Box::new(res))))
    }

    /// Consume the value, keeping only its object handle.
    pub fn into_obj(self) -> Option<ObjRef> {
        match self {
            Self::Ref(r) => Some(r),
            _ => None,
        }
    }

    #[inline]
    pub fn as_obj(&self) -> Option<&ObjRef> {
        match self {
            Self::Ref(r) => Some(r),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn is_identity_bearing(&self) -> bool {
        matches!(self, Self::Ref(_))
    }

    /// Short kind name used by traces and error paths.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::Ellipsis => "ellipsis",
            Self::NotImplemented => "not_implemented",
            Self::Empty => "empty",
            Self::Ref(r) => r.borrow().kind(),
        }
    }
}

/// Mapping lookup by structural key equality, preserving insertion order
/// semantics of the entry list.
pub fn map_get<'a>(entries: &'a [(Value, Value)], key: &Value) -> Option<&'a Value> {
    entries.iter().find(|(k, _)| deep_eq(k, key)).map(|(_, v)| v)
}

/// Structural graph equality, tolerant of cycles.
///
/// Two references that are mid-comparison are assumed equal; this makes the
/// relation a bisimulation, which is what "the same topology" means for
/// cyclic graphs.
pub fn deep_eq(a: &Value, b: &Value) -> bool {
    let mut visited = HashSet::new();
    deep_eq_inner(a, b, &mut visited)
}

pub(crate) fn deep_eq_inner(
    a: &Value,
    b: &Value,
    visited: &mut HashSet<(usize, usize)>,
) -> bool {
    match (a, b) {
        (Value::Unit, Value::Unit)
        | (Value::Ellipsis, Value::Ellipsis)
        | (Value::NotImplemented, Value::NotImplemented)
        | (Value::Empty, Value::Empty) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Bytes(x), Value::Bytes(y)) => x == y,
        (Value::Ref(x), Value::Ref(y)) => {
            if x.same(y) {
                return true;
            }
            if !visited.insert((x.addr(), y.addr())) {
                return true;
            }
            let res = Obj::deep_eq(&x.borrow(), &y.borrow(), visited);
            visited.remove(&(x.addr(), y.addr()));
            res
        },
        _ => false,
    }
}

pub(crate) fn deep_eq_slices(
    a: &[Value],
    b: &[Value],
    visited: &mut HashSet<(usize, usize)>,
) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| deep_eq_inner(x, y, visited))
}

pub(crate) fn deep_eq_entries(
    a: &[(Value, Value)],
    b: &[(Value, Value)],
    visited: &mut HashSet<(usize, usize)>,
) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|((ka, va), (kb, vb))| {
            deep_eq_inner(ka, kb, visited) && deep_eq_inner(va, vb, visited)
        })
}

pub(crate) fn deep_eq_fields(
    a: &[(String, Value)],
    b: &[(String, Value)],
    visited: &mut HashSet<(usize, usize)>,
) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|((ka, va), (kb, vb))| {
            ka == kb && deep_eq_inner(va, vb, visited)
        })
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        deep_eq(self, other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "Unit"),
            Self::Bool(v) => write!(f, "Bool({v})"),
            Self::Int(v) => write!(f, "Int({v})"),
            Self::Float(v) => write!(f, "Float({v})"),
            Self::Str(v) => write!(f, "Str({v:?})"),
            Self::Bytes(v) => write!(f, "Bytes({} byte(s))", v.len()),
            Self::Ellipsis => write!(f, "Ellipsis"),
            Self::NotImplemented => write!(f, "NotImplemented"),
            Self::Empty => write!(f, "Empty"),
            Self::Ref(r) => write!(f, "Ref@{:x}({})", r.addr(), r.borrow().kind()),
        }
    }
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjRef@{:x}({})", self.addr(), self.borrow().kind())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}
