// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Callable handlers: functions, bound methods, partial applications.

use anyhow::{Result, bail};

use crate::{
    handlers::{Handler, State, StateView},
    registry,
    value::{
        ObjRef, Value,
        func::{BoundMethod, FunctionVal, PartialVal},
        object::Obj,
    },
};

pub struct FunctionHandler;

impl Handler for FunctionHandler {
    fn name(&self) -> &'static str {
        "function"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Function(_))
    }

    fn type_key(&self, obj: &Obj) -> String {
        match obj {
            Obj::Function(f) => f.key(),
            other => format!("unexpected.{}", other.kind()),
        }
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Function(f) = &*borrowed else {
            bail!("function handler got a {}", borrowed.kind());
        };
        let defaults = f
            .defaults
            .iter()
            .map(|(name, v)| (name.clone(), State::Sub(v.clone())))
            .collect();
        Ok(State::fields(vec![
            ("module", State::str(f.module.clone())),
            ("qualname", State::str(f.qualname.clone())),
            ("defaults", State::Fields(defaults)),
        ]))
    }

    fn shell(&self, _type_key: &str) -> Result<ObjRef> {
        Ok(ObjRef::new(Obj::Function(FunctionVal::new("", ""))))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        let view = StateView::new(&state)?;
        let module = view.str_field("module")?;
        let qualname = view.str_field("qualname")?;
        let defaults = view.fields_field("defaults")?;

        let key = format!("{module}.{qualname}");
        if registry::lookup_fn(&key).is_none() {
            bail!("function `{key}` is not registered with the engine");
        }

        match &mut *shell.borrow_mut() {
            Obj::Function(f) => {
                f.module = module;
                f.qualname = qualname;
                f.defaults = defaults;
                Ok(())
            },
            other => bail!("shell is a {}, expected a function", other.kind()),
        }
    }
}

pub struct BoundMethodHandler;

impl Handler for BoundMethodHandler {
    fn name(&self) -> &'static str {
        "bound_method"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Bound(_))
    }

    fn type_key(&self, _obj: &Obj) -> String {
        "runtime.BoundMethod".to_string()
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Bound(b) = &*borrowed else {
            bail!("bound-method handler got a {}", borrowed.kind());
        };
        Ok(State::fields(vec![
            ("receiver", State::Sub(b.receiver.clone())),
            ("func", State::Sub(b.func.clone())),
        ]))
    }

    fn shell(&self, _type_key: &str) -> Result<ObjRef> {
        Ok(ObjRef::new(Obj::Bound(BoundMethod {
            receiver: Value::Unit,
            func: Value::Unit,
        })))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        let view = StateView::new(&state)?;
        let receiver = view.require("receiver")?;
        let func = view.require("func")?;
        match &mut *shell.borrow_mut() {
            Obj::Bound(b) => {
                b.receiver = receiver;
                b.func = func;
                Ok(())
            },
            other => bail!("shell is a {}, expected a bound method", other.kind()),
        }
    }
}

pub struct PartialHandler;

impl Handler for PartialHandler {
    fn name(&self) -> &'static str {
        "partial"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Partial(_))
    }

    fn type_key(&self, _obj: &Obj) -> String {
        "runtime.Partial".to_string()
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Partial(p) = &*borrowed else {
            bail!("partial handler got a {}", borrowed.kind());
        };
        let kwargs = p
            .kwargs
            .iter()
            .map(|(name, v)| (name.clone(), State::Sub(v.clone())))
            .collect();
        Ok(State::fields(vec![
            ("callable", State::Sub(p.callable.clone())),
            ("args", State::subs(&p.args)),
            ("kwargs", State::Fields(kwargs)),
        ]))
    }

    fn shell(&self, _type_key: &str) -> Result<ObjRef> {
        Ok(ObjRef::new(Obj::Partial(PartialVal {
            callable: Value::Unit,
            args: Vec::new(),
            kwargs: Vec::new(),
        })))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        let view = StateView::new(&state)?;
        let callable = view.require("callable")?;
        let args = view.seq_field("args")?;
        let kwargs = view.fields_field("kwargs")?;
        match &mut *shell.borrow_mut() {
            Obj::Partial(p) => {
                p.callable = callable;
                p.args = args;
                p.kwargs = kwargs;
                Ok(())
            },
            other => bail!("shell is a {}, expected a partial", other.kind()),
        }
    }
}
