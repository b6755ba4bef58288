// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::net::{TcpListener, UdpSocket};

use anyhow::Result;
use cucumber_rs::{
    AuthMap, ReconnectOptions, deserialize, reconnect_all, serialize,
    value::{
        Value,
        resource::{Resource, SocketRes},
    },
};
use serial_test::serial;

use super::{map_field, with_resource};

// A listener rebinds the address it was bound to. The original handle is
// dropped with the source graph, so the port is free again.
#[test]
#[serial]
fn test_listener_rebinds_local_address() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    let root = Value::map(vec![(
        Value::str("listener"),
        Value::resource(Resource::Socket(SocketRes::from_listener(listener))),
    )]);
    let bytes = serialize(&root)?;
    drop(root); // release the port before reconnecting

    let restored = deserialize(&bytes)?;
    let outcome =
        reconnect_all(&restored, &AuthMap::new(), &ReconnectOptions::new())?;
    assert!(outcome.is_clean(), "failures: {:?}", outcome.failures);

    with_resource(&map_field(&restored, 0), |res| match res {
        Resource::Socket(s) => {
            assert_eq!(s.local, Some(addr), "must rebind the remembered address");
            assert!(s.handle.is_some());
        },
        _ => panic!("expected a socket resource"),
    });
    Ok(())
}

#[test]
#[serial]
fn test_udp_socket_rebinds() -> Result<()> {
    let socket = UdpSocket::bind("127.0.0.1:0")?;
    let addr = socket.local_addr()?;

    let root = Value::map(vec![(
        Value::str("udp"),
        Value::resource(Resource::Socket(SocketRes::from_udp(socket))),
    )]);
    let bytes = serialize(&root)?;
    drop(root);

    let restored = deserialize(&bytes)?;
    let outcome =
        reconnect_all(&restored, &AuthMap::new(), &ReconnectOptions::new())?;
    assert!(outcome.is_clean(), "failures: {:?}", outcome.failures);

    with_resource(&map_field(&restored, 0), |res| match res {
        Resource::Socket(s) => {
            assert_eq!(s.local, Some(addr));
            assert!(s.handle.is_some());
        },
        _ => panic!("expected a socket resource"),
    });
    Ok(())
}

// A stream socket dials the remembered peer.
#[test]
#[serial]
fn test_stream_reconnects_to_peer() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let peer = listener.local_addr()?;

    // background acceptor keeps the listener serving both connects
    let acceptor = std::thread::spawn(move || {
        for stream in listener.incoming().take(2) {
            drop(stream);
        }
    });

    let stream = std::net::TcpStream::connect(peer)?;
    let root = Value::map(vec![(
        Value::str("conn"),
        Value::resource(Resource::Socket(SocketRes::from_stream(stream))),
    )]);
    let bytes = serialize(&root)?;
    drop(root);

    let restored = deserialize(&bytes)?;
    let outcome =
        reconnect_all(&restored, &AuthMap::new(), &ReconnectOptions::new())?;
    assert!(outcome.is_clean(), "failures: {:?}", outcome.failures);

    with_resource(&map_field(&restored, 0), |res| match res {
        Resource::Socket(s) => {
            assert_eq!(s.peer, Some(peer));
            assert!(s.handle.is_some());
        },
        _ => panic!("expected a socket resource"),
    });

    acceptor.join().expect("acceptor thread");
    Ok(())
}
