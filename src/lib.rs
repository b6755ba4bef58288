// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod cfg;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod ir;
pub mod reconnect;
pub mod registry;
pub mod track;
pub mod value;

pub use crate::{
    cfg::options::{EngineOptions, JsonOptions, ReconnectOptions},
    engine::{
        deserialize, deserialize_ir, deserialize_ir_with, deserialize_with,
        reconnect_all, serialize, serialize_ir, serialize_ir_with, serialize_with,
        to_json, to_jsonable,
    },
    error::{
        CorruptIr, DeserializationError, ReconnectFailure, ReconnectionError,
        SerializationError,
    },
    reconnect::{AuthMap, ReconnectOutcome},
    value::{ObjRef, Value},
};
