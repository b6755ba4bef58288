// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Public façade over the dispatcher, codec and reconnect walker.
//!
//! Every call gets fresh per-call state (identity tracker, shell arena,
//! walk path); the handler registry is process-wide, built once, and
//! consulted read-only, so concurrent calls on different threads are
//! independent.

use crate::{
    cfg::options::{EngineOptions, JsonOptions, ReconnectOptions},
    dispatch::Dispatcher,
    error::{DeserializationError, ReconnectionError, SerializationError},
    handlers::registry,
    ir::{codec, json, node::IrNode},
    reconnect::{AuthMap, ReconnectOutcome},
    value::Value,
};

/// Serialize a value graph into a self-delimited byte payload.
pub fn serialize(value: &Value) -> Result<Vec<u8>, SerializationError> {
    serialize_with(value, &EngineOptions::default())
}

pub fn serialize_with(
    value: &Value,
    opts: &EngineOptions,
) -> Result<Vec<u8>, SerializationError> {
    let ir = serialize_ir_with(value, opts)?;
    Ok(codec::encode(&ir))
}

/// Serialize to the IR tree, skipping the final byte encoding.
pub fn serialize_ir(value: &Value) -> Result<IrNode, SerializationError> {
    serialize_ir_with(value, &EngineOptions::default())
}

pub fn serialize_ir_with(
    value: &Value,
    opts: &EngineOptions,
) -> Result<IrNode, SerializationError> {
    Dispatcher::new(registry::global(), *opts).walk_serialize(value)
}

/// Rebuild a value graph from a byte payload. Pure with respect to the
/// environment: no I/O happens here, live resources come back as inert
/// reconnectors.
pub fn deserialize(bytes: &[u8]) -> Result<Value, DeserializationError> {
    deserialize_with(bytes, &EngineOptions::default())
}

pub fn deserialize_with(
    bytes: &[u8],
    opts: &EngineOptions,
) -> Result<Value, DeserializationError> {
    let ir = codec::decode(bytes)?;
    deserialize_ir_with(&ir, opts)
}

/// Rebuild a value graph straight from IR.
pub fn deserialize_ir(ir: &IrNode) -> Result<Value, DeserializationError> {
    deserialize_ir_with(ir, &EngineOptions::default())
}

pub fn deserialize_ir_with(
    ir: &IrNode,
    opts: &EngineOptions,
) -> Result<Value, DeserializationError> {
    let mut dispatcher = Dispatcher::new(registry::global(), *opts);
    dispatcher.allocate(ir)?;
    dispatcher.materialize(ir)
}

/// Project a value graph into a JSON-safe tree.
pub fn to_jsonable(value: &Value) -> Result<serde_json::Value, SerializationError> {
    Ok(json::ir_to_jsonable(&serialize_ir(value)?))
}

/// Render a value graph as JSON text.
pub fn to_json(
    value: &Value,
    opts: &JsonOptions,
) -> Result<String, SerializationError> {
    Ok(json::ir_to_json(&serialize_ir(value)?, opts))
}

/// Walk the graph under `root`, rebuilding every reconnector it can with
/// the supplied authentication. See [`crate::reconnect`] for semantics.
pub fn reconnect_all(
    root: &Value,
    auth: &AuthMap,
    opts: &ReconnectOptions,
) -> Result<ReconnectOutcome, ReconnectionError> {
    crate::reconnect::reconnect_all(root, auth, opts, registry::global())
}
