// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Weak references.
//!
//! The referent is emitted as an ordinary sub-object, so a referent shared
//! with the rest of the graph becomes a back-reference on the wire. A dead
//! weak reference round-trips dead.

use anyhow::{Result, bail};

use crate::{
    handlers::{Handler, State, StateView},
    value::{
        ObjRef, Value,
        object::{Obj, WeakRef},
    },
};

pub struct WeakHandler;

impl Handler for WeakHandler {
    fn name(&self) -> &'static str {
        "weakref"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Weak(_))
    }

    fn type_key(&self, _obj: &Obj) -> String {
        "std.rc.Weak".to_string()
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Weak(w) = &*borrowed else {
            bail!("weakref handler got a {}", borrowed.kind());
        };
        let target = match w.upgrade() {
            Some(r) => State::Sub(Value::Ref(r)),
            None => State::Unit,
        };
        Ok(State::fields(vec![("target", target)]))
    }

    fn shell(&self, _type_key: &str) -> Result<ObjRef> {
        Ok(ObjRef::new(Obj::Weak(WeakRef { target: std::rc::Weak::new() })))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        let view = StateView::new(&state)?;
        let target = match view.require("target")? {
            Value::Unit => std::rc::Weak::new(),
            Value::Ref(r) => r.downgrade(),
            other => bail!("weakref target is a {}", other.kind()),
        };
        match &mut *shell.borrow_mut() {
            Obj::Weak(w) => {
                w.target = target;
                Ok(())
            },
            other => bail!("shell is a {}, expected a weakref", other.kind()),
        }
    }
}
