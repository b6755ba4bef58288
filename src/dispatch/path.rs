// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Dotted walk paths for error annotation.
//!
//! The dispatcher extends the path as it descends and pops on return, so a
//! failing handler call can be wrapped with `root.worker.jobs[3]["retry"]`
//! instead of a bare cause.

use std::fmt;

#[derive(Debug, Clone)]
pub enum Segment {
    Attr(String),
    Key(String),
    Index(usize),
}

#[derive(Debug, Default)]
pub struct WalkPath {
    segments: Vec<Segment>,
}

impl WalkPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) {
        self.segments.pop();
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for WalkPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root")?;
        for segment in &self.segments {
            match segment {
                Segment::Attr(name) => write!(f, ".{name}")?,
                Segment::Key(key) => write!(f, "[{key:?}]")?,
                Segment::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}
