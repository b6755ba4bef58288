// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Class and module handlers.
//!
//! A class record carries module + qualified name, the class kind, nested
//! class definitions and the class attribute bag. Nested definitions are
//! listed before attributes, so inner classes hit the wire (and the shell
//! arena) before their outers and the rebuild proceeds bottom-up.

use anyhow::{Result, bail};

use crate::{
    handlers::{Handler, State, StateView},
    registry,
    value::{
        ObjRef, Value,
        class::{ClassDef, ClassKind, HookSpec, MappingSpec},
        func::ModuleVal,
        object::Obj,
    },
};

pub struct ClassHandler;

fn kind_state(kind: &ClassKind) -> State {
    match kind {
        ClassKind::Plain => State::fields(vec![("kind", State::str("plain"))]),
        ClassKind::Data { fields } => State::fields(vec![
            ("kind", State::str("data")),
            (
                "fields",
                State::Seq(fields.iter().map(|f| State::str(f.clone())).collect()),
            ),
        ]),
        ClassKind::Enum { members } => State::fields(vec![
            ("kind", State::str("enum")),
            (
                "members",
                State::Fields(
                    members
                        .iter()
                        .map(|(name, v)| (name.clone(), State::Sub(v.clone())))
                        .collect(),
                ),
            ),
        ]),
    }
}

fn kind_from_state(view: &StateView) -> Result<ClassKind> {
    let kind_view = StateView::new(&view.require("kind")?)?;
    Ok(match kind_view.str_field("kind")?.as_str() {
        "plain" => ClassKind::Plain,
        "data" => {
            let fields = kind_view
                .seq_field("fields")?
                .into_iter()
                .map(|v| match v {
                    Value::Str(s) => Ok(s),
                    other => bail!("data-class field name is a {}", other.kind()),
                })
                .collect::<Result<_>>()?;
            ClassKind::Data { fields }
        },
        "enum" => ClassKind::Enum { members: kind_view.fields_field("members")? },
        other => bail!("unknown class kind `{other}`"),
    })
}

fn pair_state(a: &str, b: &str, first: &str, second: &str) -> State {
    State::fields(vec![
        (first, State::str(a)),
        (second, State::str(b)),
    ])
}

impl Handler for ClassHandler {
    fn name(&self) -> &'static str {
        "class"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Class(_))
    }

    fn type_key(&self, obj: &Obj) -> String {
        match obj {
            Obj::Class(def) => def.type_key(),
            other => format!("unexpected.{}", other.kind()),
        }
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Class(def) = &*borrowed else {
            bail!("class handler got a {}", borrowed.kind());
        };

        let attrs = def
            .attrs
            .iter()
            .map(|(name, v)| (name.clone(), State::Sub(v.clone())))
            .collect();
        let hooks = match &def.hooks {
            Some(h) => pair_state(
                &h.serialize_hook,
                &h.deserialize_hook,
                "serialize_hook",
                "deserialize_hook",
            ),
            None => State::Unit,
        };
        let mapping = match &def.mapping {
            Some(m) => pair_state(
                &m.to_mapping,
                &m.from_mapping,
                "to_mapping",
                "from_mapping",
            ),
            None => State::Unit,
        };

        Ok(State::fields(vec![
            ("module", State::str(def.module.clone())),
            ("qualname", State::str(def.qualname.clone())),
            ("kind", kind_state(&def.kind)),
            // nested first: inner classes are rebuilt before their outers
            ("nested", State::subs(&def.nested)),
            ("attrs", State::Fields(attrs)),
            ("hooks", hooks),
            ("mapping", mapping),
        ]))
    }

    fn shell(&self, _type_key: &str) -> Result<ObjRef> {
        Ok(ObjRef::new(Obj::Class(Box::new(ClassDef::new("", "")))))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        let view = StateView::new(&state)?;
        let module = view.str_field("module")?;
        let qualname = view.str_field("qualname")?;
        let kind = kind_from_state(&view)?;
        let nested = view.seq_field("nested")?;
        let attrs = view.fields_field("attrs")?;

        let hooks = match view.get("hooks") {
            None | Some(Value::Unit) => None,
            Some(v) => {
                let pair = StateView::new(&v)?;
                Some(HookSpec {
                    serialize_hook: pair.str_field("serialize_hook")?,
                    deserialize_hook: pair.str_field("deserialize_hook")?,
                })
            },
        };
        let mapping = match view.get("mapping") {
            None | Some(Value::Unit) => None,
            Some(v) => {
                let pair = StateView::new(&v)?;
                Some(MappingSpec {
                    to_mapping: pair.str_field("to_mapping")?,
                    from_mapping: pair.str_field("from_mapping")?,
                })
            },
        };

        match &mut *shell.borrow_mut() {
            Obj::Class(def) => {
                def.module = module;
                def.qualname = qualname;
                def.kind = kind;
                def.nested = nested;
                def.attrs = attrs;
                def.hooks = hooks;
                def.mapping = mapping;
                Ok(())
            },
            other => bail!("shell is a {}, expected a class", other.kind()),
        }
    }
}

/// Modules serialize as their import name; reconstruction resolves the
/// name against the module registry.
pub struct ModuleHandler;

impl Handler for ModuleHandler {
    fn name(&self) -> &'static str {
        "module"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Module(_))
    }

    fn type_key(&self, obj: &Obj) -> String {
        match obj {
            Obj::Module(m) => format!("module.{}", m.name),
            other => format!("unexpected.{}", other.kind()),
        }
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Module(m) = &*borrowed else {
            bail!("module handler got a {}", borrowed.kind());
        };
        Ok(State::fields(vec![("name", State::str(m.name.clone()))]))
    }

    fn shell(&self, _type_key: &str) -> Result<ObjRef> {
        Ok(ObjRef::new(Obj::Module(ModuleVal::new(""))))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        let view = StateView::new(&state)?;
        let name = view.str_field("name")?;
        if !registry::has_module(&name) {
            bail!("module `{name}` is not registered with the engine");
        }
        match &mut *shell.borrow_mut() {
            Obj::Module(m) => {
                m.name = name;
                Ok(())
            },
            other => bail!("shell is a {}, expected a module", other.kind()),
        }
    }
}
