// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Logger handler: name, level and attached sinks. Loggers have no
//! external half to reconnect; populate rebuilds them live.

use anyhow::{Result, bail};

use crate::{
    handlers::{Handler, State, StateView},
    value::{
        ObjRef, Value,
        object::Obj,
        resource::{LogLevel, LoggerRes, Resource, ResourceSpec, SinkKind, SinkSpec},
    },
};

pub struct LoggerHandler;

fn sink_state(sink: &SinkSpec) -> State {
    State::fields(vec![
        (
            "kind",
            State::str(match sink.kind {
                SinkKind::Stdout => "stdout",
                SinkKind::Stderr => "stderr",
                SinkKind::File => "file",
            }),
        ),
        ("path", State::opt_str(&sink.path)),
        ("pattern", State::opt_str(&sink.pattern)),
    ])
}

fn sink_from_state(value: &Value) -> Result<SinkSpec> {
    let view = StateView::new(value)?;
    let kind = match view.str_field("kind")?.as_str() {
        "stdout" => SinkKind::Stdout,
        "stderr" => SinkKind::Stderr,
        "file" => SinkKind::File,
        other => bail!("unknown sink kind `{other}`"),
    };
    Ok(SinkSpec {
        kind,
        path: view.opt_str_field("path")?,
        pattern: view.opt_str_field("pattern")?,
    })
}

impl Handler for LoggerHandler {
    fn name(&self) -> &'static str {
        "logger"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::Logger(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        match obj {
            Obj::Resource(res) => res.type_key().to_string(),
            other => format!("unexpected.{}", other.kind()),
        }
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("logger handler got a {}", borrowed.kind());
        };
        let Resource::Logger(lg) = &**res else {
            bail!("logger handler got a {}", res.type_key());
        };
        Ok(State::fields(vec![
            ("name", State::str(lg.name.clone())),
            ("level", State::str(lg.level.as_str())),
            ("sinks", State::Seq(lg.sinks.iter().map(sink_state).collect())),
        ]))
    }

    fn shell(&self, _type_key: &str) -> Result<ObjRef> {
        Ok(ObjRef::new(Obj::Resource(Box::new(Resource::Logger(LoggerRes {
            name: String::new(),
            level: LogLevel::Info,
            sinks: Vec::new(),
        })))))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        let view = StateView::new(&state)?;
        let name = view.str_field("name")?;
        let level = LogLevel::parse(&view.str_field("level")?)?;
        let sinks = view
            .seq_field("sinks")?
            .iter()
            .map(sink_from_state)
            .collect::<Result<_>>()?;

        match &mut *shell.borrow_mut() {
            Obj::Resource(res) => {
                **res = Resource::Logger(LoggerRes { name, level, sinks });
                Ok(())
            },
            other => bail!("shell is a {}, expected a resource", other.kind()),
        }
    }
}
