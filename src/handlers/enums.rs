// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Enumeration members and data-class instances.

use anyhow::{Result, bail};

use crate::{
    handlers::{Handler, State, StateView},
    registry,
    value::{
        ObjRef, Value,
        class::{ClassKind, EnumMember},
        object::{Instance, Obj},
    },
};

/// Enum values serialize as class identity plus member name; the payload
/// value is re-resolved from the class definition on rebuild.
pub struct EnumHandler;

impl Handler for EnumHandler {
    fn name(&self) -> &'static str {
        "enum"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Enum(_))
    }

    fn type_key(&self, obj: &Obj) -> String {
        match obj {
            Obj::Enum(e) => e.class_key.clone(),
            other => format!("unexpected.{}", other.kind()),
        }
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Enum(e) = &*borrowed else {
            bail!("enum handler got a {}", borrowed.kind());
        };
        Ok(State::fields(vec![
            ("class", State::str(e.class_key.clone())),
            ("member", State::str(e.member.clone())),
        ]))
    }

    fn shell(&self, _type_key: &str) -> Result<ObjRef> {
        Ok(ObjRef::new(Obj::Enum(EnumMember::new("", ""))))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        let view = StateView::new(&state)?;
        let class_key = view.str_field("class")?;
        let member = view.str_field("member")?;

        let Some(def) = registry::instantiate_class(&class_key) else {
            bail!("enum class `{class_key}` is not registered with the engine");
        };
        match &def.kind {
            ClassKind::Enum { members } => {
                if !members.iter().any(|(name, _)| *name == member) {
                    bail!("`{class_key}` has no member `{member}`");
                }
            },
            _ => bail!("`{class_key}` is not an enumeration"),
        }

        match &mut *shell.borrow_mut() {
            Obj::Enum(e) => {
                e.class_key = class_key;
                e.member = member;
                Ok(())
            },
            other => bail!("shell is a {}, expected an enum member", other.kind()),
        }
    }
}

/// Data-class instances: field values in declared order, rebuilt without
/// user initialization.
pub struct DataClassHandler;

fn data_fields_of(inst: &Instance) -> Option<Vec<String>> {
    match &inst.class {
        Value::Ref(r) => match &*r.borrow() {
            Obj::Class(def) => match &def.kind {
                ClassKind::Data { fields } => Some(fields.clone()),
                _ => None,
            },
            _ => None,
        },
        Value::Str(key) => match registry::instantiate_class(key)?.kind {
            ClassKind::Data { fields } => Some(fields),
            _ => None,
        },
        _ => None,
    }
}

impl Handler for DataClassHandler {
    fn name(&self) -> &'static str {
        "dataclass"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        match obj {
            Obj::Instance(inst) => data_fields_of(inst).is_some(),
            _ => false,
        }
    }

    fn type_key(&self, obj: &Obj) -> String {
        match obj {
            Obj::Instance(inst) => {
                inst.class_key().unwrap_or_else(|| "anonymous.object".to_string())
            },
            other => format!("unexpected.{}", other.kind()),
        }
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Instance(inst) = &*borrowed else {
            bail!("dataclass handler got a {}", borrowed.kind());
        };
        let declared = data_fields_of(inst)
            .ok_or_else(|| anyhow::anyhow!("class lost its data fields mid-walk"))?;

        let mut values = Vec::with_capacity(declared.len());
        for name in &declared {
            match inst.field(name) {
                Some(v) => values.push(State::Sub(v.clone())),
                None => values.push(State::Unit),
            }
        }
        Ok(State::fields(vec![
            ("class", State::Sub(inst.class.clone())),
            ("values", State::Seq(values)),
        ]))
    }

    fn shell(&self, _type_key: &str) -> Result<ObjRef> {
        Ok(ObjRef::new(Obj::Instance(Instance::new(Value::Unit))))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        let view = StateView::new(&state)?;
        let class = view.require("class")?;
        let values = view.seq_field("values")?;

        let declared = match &class {
            Value::Ref(r) => match &*r.borrow() {
                Obj::Class(def) => match &def.kind {
                    ClassKind::Data { fields } => fields.clone(),
                    _ => bail!("class is not a data class"),
                },
                other => bail!("class field is a {}", other.kind()),
            },
            Value::Str(key) => match registry::instantiate_class(key) {
                Some(def) => match def.kind {
                    ClassKind::Data { fields } => fields,
                    _ => bail!("`{key}` is not a data class"),
                },
                None => bail!("`{key}` is not registered with the engine"),
            },
            other => bail!("class field is a {}", other.kind()),
        };
        if declared.len() != values.len() {
            bail!(
                "data class declares {} field(s), state carries {}",
                declared.len(),
                values.len()
            );
        }

        match &mut *shell.borrow_mut() {
            Obj::Instance(inst) => {
                inst.class = class;
                inst.fields = declared.into_iter().zip(values).collect();
                Ok(())
            },
            other => bail!("shell is a {}, expected an instance", other.kind()),
        }
    }
}
