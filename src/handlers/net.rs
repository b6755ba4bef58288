// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Socket and HTTP-session handlers.
//!
//! Sockets travel as family + addresses. HTTP sessions keep base URL and
//! default headers; the authorization token is a secret and never reaches
//! the wire — callers re-supply it through the reconnection auth map.

use std::net::SocketAddr;

use anyhow::{Context, Result, bail};

use crate::{
    handlers::{
        Handler, State, meta_view, populate_reconnector, reconnector_shell,
    },
    value::{
        ObjRef, Value,
        object::{Obj, Reconnector},
        resource::{
            HttpSessionRes, Resource, ResourceSpec, SocketKind, SocketRes,
        },
    },
};

fn resource_type_key(obj: &Obj) -> String {
    match obj {
        Obj::Resource(res) => res.type_key().to_string(),
        other => format!("unexpected.{}", other.kind()),
    }
}

fn addr_state(addr: &Option<SocketAddr>) -> State {
    match addr {
        Some(a) => State::Str(a.to_string()),
        None => State::Unit,
    }
}

fn parse_addr(raw: Option<String>) -> Result<Option<SocketAddr>> {
    match raw {
        None => Ok(None),
        Some(s) => Ok(Some(
            s.parse()
                .with_context(|| format!("invalid socket address `{s}`"))?,
        )),
    }
}

pub struct SocketHandler;

impl Handler for SocketHandler {
    fn name(&self) -> &'static str {
        "socket"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::Socket(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("socket handler got a {}", borrowed.kind());
        };
        let Resource::Socket(sock) = &**res else {
            bail!("socket handler got a {}", res.type_key());
        };
        Ok(State::fields(vec![
            (
                "kind",
                State::str(match sock.kind {
                    SocketKind::Stream => "stream",
                    SocketKind::Listener => "listener",
                    SocketKind::Datagram => "datagram",
                }),
            ),
            ("local", addr_state(&sock.local)),
            ("peer", addr_state(&sock.peer)),
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
        let kind = match view.str_field("kind")?.as_str() {
            "stream" => SocketKind::Stream,
            "listener" => SocketKind::Listener,
            "datagram" => SocketKind::Datagram,
            other => bail!("unknown socket kind `{other}`"),
        };
        let local = parse_addr(view.opt_str_field("local")?)?;
        let peer = parse_addr(view.opt_str_field("peer")?)?;

        let mut sock = SocketRes { kind, local, peer, handle: None };
        sock.reconnect()?;
        Ok(Value::resource(Resource::Socket(sock)))
    }
}

pub struct HttpSessionHandler;

impl Handler for HttpSessionHandler {
    fn name(&self) -> &'static str {
        "http_session"
    }

    fn can_handle(&self, obj: &Obj) -> bool {
        matches!(obj, Obj::Resource(res) if matches!(**res, Resource::HttpSession(_)))
    }

    fn type_key(&self, obj: &Obj) -> String {
        resource_type_key(obj)
    }

    fn extract(&self, obj: &ObjRef) -> Result<State> {
        let borrowed = obj.borrow();
        let Obj::Resource(res) = &*borrowed else {
            bail!("http-session handler got a {}", borrowed.kind());
        };
        let Resource::HttpSession(session) = &**res else {
            bail!("http-session handler got a {}", res.type_key());
        };
        // the auth token is a secret and is deliberately left out
        let headers = session
            .headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("authorization"))
            .map(|(name, v)| (name.clone(), State::str(v.clone())))
            .collect();
        Ok(State::fields(vec![
            ("base_url", State::str(session.base_url.clone())),
            ("headers", State::Fields(headers)),
        ]))
    }

    fn shell(&self, type_key: &str) -> Result<ObjRef> {
        Ok(reconnector_shell(self.name(), type_key))
    }

    fn populate(&self, shell: &ObjRef, state: Value) -> Result<()> {
        populate_reconnector(shell, &state)
    }

    fn reconnect(&self, rc: &Reconnector, auth: Option<&Value>) -> Result<Value> {
        let view = meta_view(rc);
        let base_url = view.str_field("base_url")?;
        let headers = view
            .fields_field("headers")?
            .into_iter()
            .map(|(name, v)| match v {
                Value::Str(s) => Ok((name, s)),
                other => bail!("header `{name}` is a {}", other.kind()),
            })
            .collect::<Result<_>>()?;

        let mut session = HttpSessionRes::new(base_url);
        session.headers = headers;
        session.auth_token = match auth {
            Some(Value::Str(token)) => Some(token.clone()),
            Some(other) => bail!("http auth must be a token string, got {}", other.kind()),
            None => None,
        };
        Ok(Value::resource(Resource::HttpSession(session)))
    }
}
