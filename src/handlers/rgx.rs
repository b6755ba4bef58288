// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Regex handlers.
//!
//! Patterns travel as source text + flags and come back live directly:
//! compilation is pure, so populate rebuilds the compiled pattern without a
//! reconnection step. Match snapshots become reconnectors that re-run the
//! pattern against the stored haystack, so captured groups are recomputed
//! from a live match rather than trusted from the wire.

use anyhow::{Context, Result, bail};

use crate::{
    handlers::{
        Handler, State, meta_view, populate_reconnector, reconnector_shell,
    },
    value::{
        ObjRef, Value,
        object::{Obj, Reconnector},
        resource::{RegexFlags, RegexRes, Resource, ResourceSpec},
    },
};

fn resource_type_key(obj: &Obj) -> String {
    match obj {
        Obj::Resource(res) => res.type_key().to_string(),
        other => format!("unexpected.{}", other.kind()),
    }
}

pub struct RegexHandler;

impl Handler for RegexHandler {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::RegexPattern(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("regex handler got a {}", borrowed.kind());
        };
        let Resource::RegexPattern(rx) = &**res else {
            bail!("regex handler got a {}", res.type_key());
        };
        Ok(State::fields(vec![
            ("source", State::str(rx.source.clone())),
            ("flags", State::Int(i64::from(rx.flags.bits()))),
        ]))
    }

    fn shell(&self, _type_key: &str) -> Result<ObjRef> {
        // placeholder pattern; populate replaces it with the real one
        let empty = RegexRes::compile("", RegexFlags::empty())
            .context("failed to compile placeholder pattern")?;
        Ok(ObjRef::new(Obj::Resource(Box::new(Resource::RegexPattern(empty)))))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        let view = crate::handlers::StateView::new(&state)?;
        let source = view.str_field("source")?;
        let flags = RegexFlags::from_bits(view.uint_field("flags")? as u8)
            .context("unknown regex flag bits")?;
        let compiled = RegexRes::compile(&source, flags)?;
        match &mut *shell.borrow_mut() {
            Obj::Resource(res) => {
                **res = Resource::RegexPattern(compiled);
                Ok(())
            },
            other => bail!("shell is a {}, expected a resource", other.kind()),
        }
    }
}

pub struct RegexMatchHandler;

impl Handler for RegexMatchHandler {
    fn name(&self) -> &'static str {
        "regex_match"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::RegexMatch(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("regex-match handler got a {}", borrowed.kind());
        };
        let Resource::RegexMatch(m) = &**res else {
            bail!("regex-match handler got a {}", res.type_key());
        };
        // groups are recomputed on reconnect; the span is kept for reference
        Ok(State::fields(vec![
            ("pattern", State::str(m.pattern_source.clone())),
            ("flags", State::Int(i64::from(m.flags.bits()))),
            ("haystack", State::str(m.haystack.clone())),
            ("start", State::Int(m.start as i64)),
            ("end", State::Int(m.end as i64)),
        ]))
    }

    fn shell(&self, type_key: &str) -> Result<ObjRef> {
        Ok(reconnector_shell(self.name(), type_key))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        populate_reconnector(shell, &state)
    }

    fn reconnect(&self, rc: &Reconnector, _auth: Option<&Value>) -> Result<Value> {
        let view = meta_view(rc);
        let pattern = view.str_field("pattern")?;
        let flags = RegexFlags::from_bits(view.uint_field("flags")? as u8)
            .context("unknown regex flag bits")?;
        let haystack = view.str_field("haystack")?;

        let rx = RegexRes::compile(&pattern, flags)?;
        let m = rx
            .find(&haystack)
            .with_context(|| format!("`{pattern}` no longer matches the stored input"))?;
        Ok(Value::resource(Resource::RegexMatch(m)))
    }
}
