// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Public error taxonomy of the engine.
//!
//! Handlers themselves report failures through `anyhow`; the dispatcher
//! wraps each failing handler call exactly once with the dotted path that
//! reached the offending value. Selection is final: there is no silent
//! fallback to a weaker handler.

use thiserror::Error;

/// Codec-level rejections. `decode` never allocates shells or consults the
/// handler registry, so every malformed payload surfaces as one of these.
#[derive(Debug, Error)]
pub enum CorruptIr {
    #[error("bad magic: expected {expected:02x?}, got {got:02x?}")]
    BadMagic { expected: [u8; 4], got: [u8; 4] },

    #[error("unsupported payload version {0}")]
    BadVersion(u8),

    #[error("payload truncated: needed {needed} more byte(s) at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("payload length mismatch: header says {declared}, frame has {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("{0} trailing byte(s) after root node")]
    TrailingBytes(usize),

    #[error("unknown node tag 0x{0:02x}")]
    UnknownTag(u8),

    #[error("invalid utf-8 in text node")]
    InvalidUtf8,

    #[error("varint overflows 64 bits")]
    VarintOverflow,

    #[error("digest mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    DigestMismatch { stored: u32, computed: u32 },

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("object id {0} assigned to more than one node")]
    DuplicateId(u64),

    #[error("object id {id} out of range for a {limit}-byte body")]
    IdOutOfRange { id: u64, limit: u64 },
}

/// Raised while walking a live graph into IR or bytes.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("no handler registered for `{type_key}` at {path}")]
    Unsupported { type_key: String, path: String },

    #[error("handler `{handler}` failed to extract `{type_key}` at {path}: {source}")]
    Extract {
        handler: &'static str,
        type_key: String,
        path: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Raised while rebuilding a graph from bytes or IR.
#[derive(Debug, Error)]
pub enum DeserializationError {
    #[error(transparent)]
    Corrupt(#[from] CorruptIr),

    #[error("no handler named `{name}` is registered")]
    UnknownHandler { name: String },

    #[error("`{type_key}` is not registered with the engine")]
    UnknownType { type_key: String },

    #[error("broken record shape at {path}: {detail}")]
    BrokenShape { detail: String, path: String },

    #[error("handler `{handler}` failed to allocate a shell for `{type_key}`: {source}")]
    Shell {
        handler: String,
        type_key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("handler `{handler}` failed to populate `{type_key}` at {path}: {source}")]
    Populate {
        handler: String,
        type_key: String,
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("back-reference to unknown object id {id}")]
    DanglingRef { id: u64 },
}

/// A single collected reconnection failure. The default walk keeps going on
/// failure so a partial environment does not block all restoration.
#[derive(Debug, Error)]
#[error("reconnect of `{type_key}` at {path} failed: {source}")]
pub struct ReconnectFailure {
    pub type_key: String,
    pub path: String,
    #[source]
    pub source: anyhow::Error,
}

/// Raised only when the caller opted into strict reconnection.
#[derive(Debug, Error)]
pub enum ReconnectionError {
    #[error(transparent)]
    Failed(#[from] ReconnectFailure),
}
