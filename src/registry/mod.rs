// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Process-wide registries.
//!
//! There is no runtime reflection to look a type up by name, so user code
//! registers the pieces the engine must be able to rebuild: native
//! functions, class constructors and module names. Registration is additive
//! and happens at startup; lookups during a call never mutate.
//!
//! Entries are plain `fn` pointers so the tables stay `Send + Sync` even
//! though the values they construct are not.

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::value::{class::ClassDef, func::NativeFn};

/// Builds a fresh class definition; the registry key is the definition's
/// type key.
pub type ClassFactory = fn() -> ClassDef;

static FUNCTIONS: Lazy<DashMap<String, NativeFn>> = Lazy::new(DashMap::new);
static CLASSES: Lazy<DashMap<String, ClassFactory>> = Lazy::new(DashMap::new);
static MODULES: Lazy<DashMap<String, ()>> = Lazy::new(DashMap::new);

/// Register a native function under `"<module>.<qualname>"`.
pub fn register_fn(key: impl Into<String>, f: NativeFn) {
    FUNCTIONS.insert(key.into(), f);
}

pub fn lookup_fn(key: &str) -> Option<NativeFn> {
    FUNCTIONS.get(key).map(|entry| *entry.value())
}

/// Register a class constructor. The factory is invoked once to learn the
/// type key it answers to.
pub fn register_class(factory: ClassFactory) -> String {
    let key = factory().type_key();
    CLASSES.insert(key.clone(), factory);
    key
}

pub fn has_class(key: &str) -> bool {
    CLASSES.contains_key(key)
}

/// Instantiate a fresh definition of a registered class.
pub fn instantiate_class(key: &str) -> Option<ClassDef> {
    CLASSES.get(key).map(|factory| factory.value()())
}

/// Register a module name so serialized module values can be re-resolved.
pub fn register_module(name: impl Into<String>) {
    MODULES.insert(name.into(), ());
}

pub fn has_module(name: &str) -> bool {
    MODULES.contains_key(name)
}
