// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Verbose walk tracing.
//!
//! The core emits trace events through a sink interface so it does not
//! depend on any particular output mechanism. The default sink routes to
//! `tracing` with a color name cycling by depth; the palette is purely
//! presentational.

/// Color names cycled by walk depth.
const DEPTH_COLORS: [&str; 6] = ["red", "orange", "yellow", "green", "blue", "purple"];

pub trait TraceSink {
    fn event(&self, depth: usize, step: &str, type_key: &str, handler: &str);
}

/// Default sink: one `tracing` debug event per step.
pub struct DepthTrace;

impl TraceSink for DepthTrace {
    fn event(&self, depth: usize, step: &str, type_key: &str, handler: &str) {
        let color = DEPTH_COLORS[depth % DEPTH_COLORS.len()];
        let message = format!("{:indent$}{step} {type_key}", "", indent = depth * 2);
        tracing::debug!(
            target: "cucumber::walk",
            depth,
            color,
            handler,
            "{message}"
        );
    }
}
