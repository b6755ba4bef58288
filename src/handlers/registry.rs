// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Priority-ordered handler registry.
//!
//! Resolution consults handlers in ascending priority and takes the first
//! `can_handle` hit, so selection is deterministic given the registry
//! state. The documented ladder: user hooks, then the mapping pair, then
//! specialized type handlers, then the reflective instance fallback. The
//! registry is built once at startup and read-only afterwards.

use std::{collections::HashMap, sync::Arc};

use once_cell::sync::Lazy;

use crate::{handlers::Handler, value::object::Obj};

/// Tier bases. Individual handlers register at `tier + offset`.
pub const TIER_HOOKS: i32 = 100;
pub const TIER_MAPPING: i32 = 200;
pub const TIER_SPECIALIZED: i32 = 300;
pub const TIER_FALLBACK: i32 = 1000;

pub struct HandlerRegistry {
    ordered: Vec<(i32, Arc<dyn Handler>)>,
    by_name: HashMap<&'static str, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self { ordered: Vec::new(), by_name: HashMap::new() }
    }

    /// Register `handler` at `priority`; lower runs earlier. Ties keep
    /// registration order.
    pub fn register(&mut self, handler: Arc<dyn Handler>, priority: i32) {
        self.by_name.insert(handler.name(), Arc::clone(&handler));
        let at = self
            .ordered
            .partition_point(|(p, _)| *p <= priority);
        self.ordered.insert(at, (priority, handler));
    }

    /// First handler accepting `obj`, in priority order.
    pub fn resolve(&self, obj: &Obj) -> Option<Arc<dyn Handler>> {
        self.ordered
            .iter()
            .find(|(_, h)| h.can_handle(obj))
            .map(|(_, h)| Arc::clone(h))
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.by_name.get(name).map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// The full default handler set.
    pub fn with_defaults() -> Self {
        use crate::handlers::{
            class, concurrency, db, enums, fs, func, instance, logger, net, rgx,
            runtime, weak,
        };

        let mut reg = Self::new();

        reg.register(Arc::new(instance::HookHandler), TIER_HOOKS);
        reg.register(Arc::new(instance::MappingHandler), TIER_MAPPING);

        reg.register(Arc::new(func::FunctionHandler), TIER_SPECIALIZED);
        reg.register(Arc::new(func::BoundMethodHandler), TIER_SPECIALIZED + 1);
        reg.register(Arc::new(func::PartialHandler), TIER_SPECIALIZED + 2);
        reg.register(Arc::new(class::ClassHandler), TIER_SPECIALIZED + 3);
        reg.register(Arc::new(class::ModuleHandler), TIER_SPECIALIZED + 4);
        reg.register(Arc::new(enums::EnumHandler), TIER_SPECIALIZED + 5);
        reg.register(Arc::new(enums::DataClassHandler), TIER_SPECIALIZED + 6);
        reg.register(Arc::new(weak::WeakHandler), TIER_SPECIALIZED + 7);

        reg.register(Arc::new(logger::LoggerHandler), TIER_SPECIALIZED + 10);
        reg.register(Arc::new(rgx::RegexHandler), TIER_SPECIALIZED + 11);
        reg.register(Arc::new(rgx::RegexMatchHandler), TIER_SPECIALIZED + 12);

        reg.register(Arc::new(concurrency::LockHandler), TIER_SPECIALIZED + 20);
        reg.register(Arc::new(concurrency::SemaphoreHandler), TIER_SPECIALIZED + 21);
        reg.register(Arc::new(concurrency::BarrierHandler), TIER_SPECIALIZED + 22);
        reg.register(Arc::new(concurrency::EventHandler), TIER_SPECIALIZED + 23);
        reg.register(Arc::new(concurrency::QueueHandler), TIER_SPECIALIZED + 24);
        reg.register(Arc::new(concurrency::ThreadHandler), TIER_SPECIALIZED + 25);

        reg.register(Arc::new(fs::FileHandler), TIER_SPECIALIZED + 30);
        reg.register(Arc::new(fs::MemBufHandler), TIER_SPECIALIZED + 31);
        reg.register(Arc::new(fs::TempFileHandler), TIER_SPECIALIZED + 32);
        reg.register(Arc::new(fs::MappedHandler), TIER_SPECIALIZED + 33);

        reg.register(Arc::new(net::SocketHandler), TIER_SPECIALIZED + 40);
        reg.register(Arc::new(net::HttpSessionHandler), TIER_SPECIALIZED + 41);

        reg.register(Arc::new(db::SqliteHandler), TIER_SPECIALIZED + 50);
        reg.register(Arc::new(db::DbConnHandler), TIER_SPECIALIZED + 51);

        reg.register(Arc::new(runtime::GeneratorHandler), TIER_SPECIALIZED + 60);
        reg.register(Arc::new(runtime::TaskHandler), TIER_SPECIALIZED + 61);
        reg.register(Arc::new(runtime::PoolHandler), TIER_SPECIALIZED + 62);
        reg.register(Arc::new(runtime::ChildHandler), TIER_SPECIALIZED + 63);
        reg.register(Arc::new(runtime::ContextVarHandler), TIER_SPECIALIZED + 64);
        reg.register(Arc::new(runtime::ReconnectorHandler), TIER_SPECIALIZED + 65);

        reg.register(Arc::new(instance::InstanceHandler), TIER_FALLBACK);

        reg
    }
}

static GLOBAL: Lazy<HandlerRegistry> = Lazy::new(HandlerRegistry::with_defaults);

/// The process-wide registry the public façade dispatches through.
pub fn global() -> &'static HandlerRegistry {
    &GLOBAL
}
