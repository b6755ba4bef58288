// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Lossless-within-JSON projection of the IR.
//!
//! Tagged records become `{cucumber_type, handler, object_id, state}`
//! objects and back-references become `{"ref": id}`. Everything JSON cannot
//! say natively is wrapped in a `"$"`-keyed object: container ids, byte
//! strings (hex), the three singletons, integers outside the JSON-safe
//! range, and non-finite floats.

use serde_json::{Map, Value as Json, json};

use crate::{cfg::options::JsonOptions, ir::node::IrNode};

/// Largest integer JSON consumers can hold exactly in a double.
const JSON_SAFE_MAX: i64 = (1 << 53) - 1;

pub fn ir_to_jsonable(ir: &IrNode) -> Json {
    match ir {
        IrNode::Unit => Json::Null,
        IrNode::Bool(v) => json!(v),
        IrNode::Int(v) => {
            if v.unsigned_abs() <= JSON_SAFE_MAX as u64 {
                json!(v)
            } else {
                json!({ "$int": v.to_string() })
            }
        },
        IrNode::Float(v) => {
            if v.is_finite() {
                json!(v)
            } else if v.is_nan() {
                json!({ "$float": "nan" })
            } else if *v > 0.0 {
                json!({ "$float": "inf" })
            } else {
                json!({ "$float": "-inf" })
            }
        },
        IrNode::Str(s) => json!(s),
        IrNode::Bytes(b) => json!({ "$bytes": hex::encode(b) }),
        IrNode::Ellipsis => json!({ "$singleton": "ellipsis" }),
        IrNode::NotImplemented => json!({ "$singleton": "not_implemented" }),
        IrNode::Empty => json!({ "$singleton": "empty" }),
        IrNode::Seq { id, items } => json!({
            "$id": id,
            "$list": items.iter().map(ir_to_jsonable).collect::<Vec<_>>(),
        }),
        IrNode::Set { id, items } => json!({
            "$id": id,
            "$set": items.iter().map(ir_to_jsonable).collect::<Vec<_>>(),
        }),
        IrNode::Map { id, entries } => json!({
            "$id": id,
            "$map": entries
                .iter()
                .map(|(k, v)| vec![ir_to_jsonable(k), ir_to_jsonable(v)])
                .collect::<Vec<_>>(),
        }),
        IrNode::Record { cucumber_type, handler, object_id, state } => json!({
            "cucumber_type": cucumber_type,
            "handler": handler,
            "object_id": object_id,
            "state": ir_to_jsonable(state),
        }),
        IrNode::Ref(id) => json!({ "ref": id }),
    }
}

pub fn ir_to_json(ir: &IrNode, opts: &JsonOptions) -> String {
    let mut tree = ir_to_jsonable(ir);
    if opts.sort_keys {
        sort_keys(&mut tree);
    }
    if opts.indent {
        serde_json::to_string_pretty(&tree).unwrap_or_else(|_| "null".to_string())
    } else {
        serde_json::to_string(&tree).unwrap_or_else(|_| "null".to_string())
    }
}

fn sort_keys(value: &mut Json) {
    match value {
        Json::Object(map) => {
            let mut sorted: Vec<(String, Json)> = std::mem::take(map)
                .into_iter()
                .collect();
            sorted.sort_by(|(a, _), (b, _)| a.cmp(b));
            let mut out = Map::new();
            for (k, mut v) in sorted {
                sort_keys(&mut v);
                out.insert(k, v);
            }
            *map = out;
        },
        Json::Array(items) => items.iter_mut().for_each(sort_keys),
        _ => {},
    }
}
