// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! `Send`-able subset of the value space.
//!
//! `Value` is deliberately `!Send` (Rc-based identity). Thread resources
//! still need to move their target arguments across the spawn boundary, so
//! arguments are lowered into this owned, identity-free mirror on the
//! calling side and lifted back into fresh `Value`s inside the new thread.

use anyhow::{Result, bail};

use crate::value::{Value, object::Obj};

#[derive(Debug, Clone, PartialEq)]
pub enum PlainValue {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<PlainValue>),
    Map(Vec<(PlainValue, PlainValue)>),
}

impl PlainValue {
    /// Lower a value, rejecting anything that cannot cross threads.
    /// Sharing is not preserved; the lift produces fresh containers.
    pub fn lower(value: &Value) -> Result<Self> {
        Ok(match value {
            Value::Unit => Self::Unit,
            Value::Bool(v) => Self::Bool(*v),
            Value::Int(v) => Self::Int(*v),
            Value::Float(v) => Self::Float(*v),
            Value::Str(v) => Self::Str(v.clone()),
            Value::Bytes(v) => Self::Bytes(v.clone()),
            Value::Ellipsis | Value::NotImplemented | Value::Empty => Self::Unit,
            Value::Ref(r) => match &*r.borrow() {
                Obj::List(items) | Obj::Set(items) => Self::List(
                    items.iter().map(Self::lower).collect::<Result<_>>()?,
                ),
                Obj::Map(entries) => Self::Map(
                    entries
                        .iter()
                        .map(|(k, v)| Ok((Self::lower(k)?, Self::lower(v)?)))
                        .collect::<Result<_>>()?,
                ),
                other => bail!(
                    "{} cannot be passed to a thread target",
                    other.kind()
                ),
            },
        })
    }

    pub fn lift(self) -> Value {
        match self {
            Self::Unit => Value::Unit,
            Self::Bool(v) => Value::Bool(v),
            Self::Int(v) => Value::Int(v),
            Self::Float(v) => Value::Float(v),
            Self::Str(v) => Value::Str(v),
            Self::Bytes(v) => Value::Bytes(v),
            Self::List(items) => {
                Value::list(items.into_iter().map(Self::lift).collect())
            },
            Self::Map(entries) => Value::map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.lift(), v.lift()))
                    .collect(),
            ),
        }
    }
}
