// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Instance handlers: the three rungs of the user-class ladder.
//!
//! 1. [`HookHandler`] — explicit `serialize_hook` / `deserialize_hook` pair
//!    declared on the class. Highest priority.
//! 2. [`MappingHandler`] — symmetric `to_mapping` / `from_mapping` pair.
//! 3. [`InstanceHandler`] — reflective fallback: class identity plus the
//!    raw attribute bag, rebuilt without running user initialization.

use anyhow::{Context, Result, bail};

use crate::{
    handlers::{Handler, State, StateView},
    registry,
    value::{
        ObjRef, Value,
        class::{HookSpec, MappingSpec},
        object::{Instance, Obj},
    },
};

/// Hook/mapping specs of an instance's class, wherever the class lives
/// (in-graph definition or registry key).
fn class_specs(inst: &Instance) -> (Option<HookSpec>, Option<MappingSpec>) {
    match &inst.class {
        Value::Ref(r) => match &*r.borrow() {
            Obj::Class(def) => (def.hooks.clone(), def.mapping.clone()),
            _ => (None, None),
        },
        Value::Str(key) => match registry::instantiate_class(key) {
            Some(def) => (def.hooks, def.mapping),
            None => (None, None),
        },
        _ => (None, None),
    }
}

fn instance_type_key(obj: &Obj) -> String {
    match obj {
        Obj::Instance(inst) => {
            inst.class_key().unwrap_or_else(|| "anonymous.object".to_string())
        },
        other => format!("unexpected.{}", other.kind()),
    }
}

fn call_registered(key: &str, args: &[Value]) -> Result<Value> {
    let Some(f) = registry::lookup_fn(key) else {
        bail!("hook function `{key}` is not registered");
    };
    f(args)
}

/// Replace the shell contents with the object a user hook rebuilt, then
/// restore the resolved class so in-payload class sharing survives.
fn graft(shell: &ObjRef, rebuilt: Value, class: Value) -> Result<()> {
    let Some(handle) = rebuilt.into_obj() else {
        bail!("hook returned a primitive, expected an instance");
    };
    let obj = match handle.try_take() {
        Ok(obj) => obj,
        Err(_) => bail!("hook must return a freshly built, unaliased object"),
    };
    if !matches!(obj, Obj::Instance(_)) {
        bail!("hook returned a {}, expected an instance", obj.kind());
    }
    shell.replace(obj);
    if let Obj::Instance(inst) = &mut *shell.borrow_mut() {
        inst.class = class;
    }
    Ok(())
}

fn blank_instance_shell() -> ObjRef {
    ObjRef::new(Obj::Instance(Instance::new(Value::Unit)))
}

pub struct HookHandler;

impl Handler for HookHandler {
    fn name(&self) -> &'static str {
        "hooks"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        match obj {
            Obj::Instance(inst) => class_specs(inst).0.is_some(),
            _ => false,
        }
    }

    fn type_key(&self, obj: &Obj) -> String {
        instance_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let (hooks, class) = {
            let borrowed = obj.borrow();
            let Obj::Instance(inst) = &*borrowed else {
                bail!("hook handler got a {}", borrowed.kind());
            };
            (class_specs(inst).0, inst.class.clone())
        };
        let hooks = hooks.context("class lost its hook spec mid-walk")?;
        let payload =
            call_registered(&hooks.serialize_hook, &[Value::Ref(obj.clone())])
                .context("serialize hook failed")?;
        Ok(State::fields(vec![
            ("class", State::Sub(class)),
            ("payload", State::Sub(payload)),
        ]))
    }

    fn shell(&self, _type_key: &str) -> Result<ObjRef> {
        Ok(blank_instance_shell())
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        let view = StateView::new(&state)?;
        let class = view.require("class")?;
        let payload = view.require("payload")?;

        let key = match &class {
            Value::Str(key) => key.clone(),
            Value::Ref(r) => match &*r.borrow() {
                Obj::Class(def) => def.type_key(),
                other => bail!("class field is a {}", other.kind()),
            },
            other => bail!("class field is a {}", other.kind()),
        };
        let hooks = match &class {
            Value::Ref(r) => match &*r.borrow() {
                Obj::Class(def) => def.hooks.clone(),
                _ => None,
            },
            _ => registry::instantiate_class(&key).and_then(|d| d.hooks),
        };
        let hooks = hooks
            .with_context(|| format!("`{key}` no longer declares hooks"))?;

        let rebuilt = call_registered(&hooks.deserialize_hook, &[payload])
            .context("deserialize hook failed")?;
        graft(shell, rebuilt, class)
    }
}

pub struct MappingHandler;

impl Handler for MappingHandler {
    fn name(&self) -> &'static str {
        "mapping"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        match obj {
            Obj::Instance(inst) => class_specs(inst).1.is_some(),
            _ => false,
        }
    }

    fn type_key(&self, obj: &Obj) -> String {
        instance_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let (mapping, class) = {
            let borrowed = obj.borrow();
            let Obj::Instance(inst) = &*borrowed else {
                bail!("mapping handler got a {}", borrowed.kind());
            };
            (class_specs(inst).1, inst.class.clone())
        };
        let mapping = mapping.context("class lost its mapping spec mid-walk")?;
        let as_map =
            call_registered(&mapping.to_mapping, &[Value::Ref(obj.clone())])
                .context("to_mapping failed")?;
        Ok(State::fields(vec![
            ("class", State::Sub(class)),
            ("mapping", State::Sub(as_map)),
        ]))
    }

    fn shell(&self, _type_key: &str) -> Result<ObjRef> {
        Ok(blank_instance_shell())
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        let view = StateView::new(&state)?;
        let class = view.require("class")?;
        let as_map = view.require("mapping")?;

        let key = match &class {
            Value::Str(key) => key.clone(),
            Value::Ref(r) => match &*r.borrow() {
                Obj::Class(def) => def.type_key(),
                other => bail!("class field is a {}", other.kind()),
            },
            other => bail!("class field is a {}", other.kind()),
        };
        let mapping = match &class {
            Value::Ref(r) => match &*r.borrow() {
                Obj::Class(def) => def.mapping.clone(),
                _ => None,
            },
            _ => registry::instantiate_class(&key).and_then(|d| d.mapping),
        };
        let mapping = mapping
            .with_context(|| format!("`{key}` no longer declares a mapping pair"))?;

        let rebuilt = call_registered(&mapping.from_mapping, &[as_map])
            .context("from_mapping failed")?;
        graft(shell, rebuilt, class)
    }
}

/// Tier-4 reflective fallback. Accepts any instance.
pub struct InstanceHandler;

impl Handler for InstanceHandler {
    fn name(&self) -> &'static str {
        "instance"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Instance(_))
    }

    fn type_key(&self, obj: &Obj) -> String {
        instance_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Instance(inst) = &*borrowed else {
            bail!("instance handler got a {}", borrowed.kind());
        };
        let fields = inst
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), State::Sub(value.clone())))
            .collect();
        Ok(State::Fields(vec![
            ("class".to_string(), State::Sub(inst.class.clone())),
            ("fields".to_string(), State::Fields(fields)),
        ]))
    }

    fn shell(&self, _type_key: &str) -> Result<ObjRef> {
        Ok(blank_instance_shell())
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        let view = StateView::new(&state)?;
        let class = view.require("class")?;
        if let Value::Str(key) = &class
            && !registry::has_class(key)
        {
            bail!("`{key}` is not registered with the engine");
        }
        let fields = view.fields_field("fields")?;

        match &mut *shell.borrow_mut() {
            Obj::Instance(inst) => {
                inst.class = class;
                inst.fields = fields;
                Ok(())
            },
            other => bail!("shell is a {}, expected an instance", other.kind()),
        }
    }
}
