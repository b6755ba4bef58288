// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The structured intermediate representation the codec encodes.
//!
//! An IR tree mirrors one object graph. Primitives are plain leaves.
//! Containers keep their `object_id` so that shared and cyclic containers
//! can be targeted by back-references without paying the tagged-record
//! overhead of `cucumber_type`/`handler` strings. Every non-trivial object
//! becomes a [`IrNode::Record`]; repeated encounters become [`IrNode::Ref`].

/// One serialized graph node.
#[derive(Debug, Clone)]
pub enum IrNode {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Ellipsis,
    NotImplemented,
    Empty,

    /// Ordered sequence. Carries the id assigned by the identity tracker.
    Seq { id: u64, items: Vec<IrNode> },
    /// Insertion-ordered set.
    Set { id: u64, items: Vec<IrNode> },
    /// Insertion-ordered mapping.
    Map { id: u64, entries: Vec<(IrNode, IrNode)> },

    /// One non-trivial object: type key, handler name, payload-unique id and
    /// the handler-extracted state.
    Record {
        cucumber_type: String,
        handler: String,
        object_id: u64,
        state: Box<IrNode>,
    },

    /// Back-reference to a previously emitted id.
    Ref(u64),
}

impl IrNode {
    /// Short variant name used by traces and error messages.
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
            Self::Seq { .. } => "seq",
            Self::Set { .. } => "set",
            Self::Map { .. } => "map",
            Self::Record { .. } => "record",
            Self::Ref(_) => "ref",
        }
    }

    /// The id this node can be back-referenced by, if any.
    #[inline]
    pub fn object_id(&self) -> Option<u64> {
        match self {
            Self::Seq { id, .. } | Self::Set { id, .. } | Self::Map { id, .. } => {
                Some(*id)
            },
            Self::Record { object_id, .. } => Some(*object_id),
            _ => None,
        }
    }
}

// Structural equality; floats compare by bit pattern so NaN payloads
// round-trip the codec as equal.
impl PartialEq for IrNode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unit, Self::Unit)
            | (Self::Ellipsis, Self::Ellipsis)
            | (Self::NotImplemented, Self::NotImplemented)
            | (Self::Empty, Self::Empty) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (
                Self::Seq { id: ia, items: a },
                Self::Seq { id: ib, items: b },
            )
            | (
                Self::Set { id: ia, items: a },
                Self::Set { id: ib, items: b },
            ) => ia == ib && a == b,
            (
                Self::Map { id: ia, entries: a },
                Self::Map { id: ib, entries: b },
            ) => ia == ib && a == b,
            (
                Self::Record {
                    cucumber_type: ta,
                    handler: ha,
                    object_id: ia,
                    state: sa,
                },
                Self::Record {
                    cucumber_type: tb,
                    handler: hb,
                    object_id: ib,
                    state: sb,
                },
            ) => ta == tb && ha == hb && ia == ib && sa == sb,
            (Self::Ref(a), Self::Ref(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for IrNode {}
