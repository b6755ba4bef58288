// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Shell arena for the two-pass rebuild.
//!
//! Shells registered during pass 1 are keyed by `object_id` so pass 2
//! resolves back-references with a single lookup. Ids come straight out
//! of the payload, so storage scales with the number of shells actually
//! registered, never with the id values themselves. Fresh per
//! `deserialize` call.

use std::collections::HashMap;

use crate::{error::DeserializationError, value::ObjRef};

#[derive(Default)]
pub struct ShellArena {
    shells: HashMap<u64, ObjRef>,
}

impl ShellArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the shell allocated for `id` during pass 1.
    pub fn register(&mut self, id: u64, shell: ObjRef) {
        self.shells.insert(id, shell);
    }

    /// Resolve a back-reference during pass 2.
    pub fn resolve(&self, id: u64) -> Result<ObjRef, DeserializationError> {
        self.shells
            .get(&id)
            .cloned()
            .ok_or(DeserializationError::DanglingRef { id })
    }

    pub fn contains(&self, id: u64) -> bool {
        self.shells.contains_key(&id)
    }
}
