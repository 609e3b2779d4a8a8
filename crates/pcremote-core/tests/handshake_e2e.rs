//! Socket-level handshake tests against in-process fake servers.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use pcremote_core::responder::generate_challenge;
use pcremote_core::{
    CommandRecord, DeviceRecord, Dispatcher, HandshakeSession, NullObserver, RemoteConfig,
    Responder, TcpConnector, digest,
};

const GREETING: &str = "pcremote-hello";

/// Bind an ephemeral loopback port and run `serve` on the first client.
fn fake_server<T, F>(serve: F) -> (u16, JoinHandle<T>)
where
    T: Send + 'static,
    F: FnOnce(TcpStream) -> T + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        serve(stream)
    });
    (port, handle)
}

/// Read one newline-terminated line.
fn read_line(stream: &mut TcpStream) -> String {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    while stream.read(&mut byte).unwrap() == 1 {
        if byte[0] == b'\n' {
            break;
        }
        line.push(byte[0]);
    }
    String::from_utf8(line).unwrap()
}

fn dispatcher(
    port: u16,
    device_alias: &str,
    command_alias: &str,
) -> Dispatcher<TcpConnector, NullObserver> {
    let mut config = RemoteConfig::new(GREETING);
    config.add_device(DeviceRecord::new(device_alias, "127.0.0.1", port, "secretkey").unwrap());
    config.add_command(CommandRecord::new(command_alias, "cmd1"));
    Dispatcher::with_session(
        config,
        HandshakeSession::with_parts(TcpConnector, Arc::new(NullObserver)),
    )
}

/// Fake server: send `abc123`, reply `status` when the response is right.
fn scripted_server(status: Option<&'static str>) -> (u16, JoinHandle<(String, String)>) {
    fake_server(move |mut stream| {
        let hello = read_line(&mut stream);
        stream.write_all(b"abc123\n").unwrap();
        let response = read_line(&mut stream);
        if let Some(status) = status {
            let reply = if response == digest("abc123", "secretkey", "cmd1") {
                status
            } else {
                "BAD"
            };
            stream.write_all(reply.as_bytes()).unwrap();
        }
        (hello, response)
    })
}

#[test]
fn test_send_acknowledged() {
    let (port, server) = scripted_server(Some("OK"));
    let dispatcher = dispatcher(port, "mypc", "poweron");

    assert!(dispatcher.send("mypc", "poweron"));

    let (hello, response) = server.join().unwrap();
    assert_eq!(hello, GREETING);
    assert_eq!(response, digest("abc123", "secretkey", "cmd1"));
}

#[test]
fn test_send_rejected() {
    let (port, server) = scripted_server(Some("FAIL"));
    let dispatcher = dispatcher(port, "mypc", "poweron");

    assert!(!dispatcher.send("mypc", "poweron"));
    server.join().unwrap();
}

#[test]
fn test_server_closes_without_status() {
    let (port, server) = scripted_server(None);
    let dispatcher = dispatcher(port, "mypc", "poweron");

    assert!(!dispatcher.send("mypc", "poweron"));
    server.join().unwrap();
}

#[test]
fn test_silent_server_times_out() {
    let (port, server) = fake_server(|mut stream| {
        // Hold the connection open without ever sending a challenge.
        let mut buf = [0u8; 64];
        let _ = stream.read(&mut buf);
        thread::sleep(Duration::from_secs(3));
    });
    let dispatcher = dispatcher(port, "mypc", "poweron");

    let start = Instant::now();
    assert!(!dispatcher.send_with_timeout("mypc", "poweron", 1));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(900), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(2500), "{elapsed:?}");
    server.join().unwrap();
}

#[test]
fn test_silent_server_after_response_times_out() {
    let (port, server) = fake_server(|mut stream| {
        let _ = read_line(&mut stream);
        stream.write_all(b"abc123\n").unwrap();
        let response = read_line(&mut stream);
        // Never send a status.
        thread::sleep(Duration::from_secs(3));
        response
    });
    let dispatcher = dispatcher(port, "mypc", "poweron");

    let start = Instant::now();
    assert!(!dispatcher.send_with_timeout("mypc", "poweron", 1));
    assert!(start.elapsed() < Duration::from_millis(2500));
    assert_eq!(server.join().unwrap(), digest("abc123", "secretkey", "cmd1"));
}

#[test]
fn test_mixed_case_aliases_over_tcp() {
    for (device, command) in [("mypc", "poweron"), ("MYPC", "POWERON")] {
        let (port, server) = scripted_server(Some("OK"));
        let dispatcher = dispatcher(port, "MyPC", "PowerOn");
        assert!(dispatcher.send(device, command));
        server.join().unwrap();
    }
}

#[test]
fn test_against_responder() {
    let responder = Responder::new(GREETING)
        .allow_key("laptop", "k".repeat(64))
        .unwrap()
        .allow_command("lock");
    let (port, server) = fake_server(move |stream| responder.serve_one(stream).unwrap());

    let mut config = RemoteConfig::new(GREETING);
    config.add_device(DeviceRecord::new("desk", "127.0.0.1", port, "k".repeat(64)).unwrap());
    config.add_command(CommandRecord::new("Lock", "lock"));
    let dispatcher = Dispatcher::with_session(
        config,
        HandshakeSession::with_parts(TcpConnector, Arc::new(NullObserver)),
    );

    assert!(dispatcher.send("desk", "lock"));
    let authorization = server.join().unwrap().unwrap();
    assert_eq!(authorization.client, "laptop");
    assert_eq!(authorization.command, "lock");
}

#[test]
fn test_responder_rejects_wrong_key() {
    let responder = Responder::new(GREETING)
        .allow_key("laptop", "k".repeat(64))
        .unwrap()
        .allow_command("lock");
    let challenge = generate_challenge();
    let (port, server) =
        fake_server(move |stream| responder.serve_with_challenge(stream, &challenge).unwrap());

    let mut config = RemoteConfig::new(GREETING);
    config.add_device(DeviceRecord::new("desk", "127.0.0.1", port, "wrong").unwrap());
    config.add_command(CommandRecord::new("lock", "lock"));
    let dispatcher = Dispatcher::with_session(
        config,
        HandshakeSession::with_parts(TcpConnector, Arc::new(NullObserver)),
    );

    assert!(!dispatcher.send("desk", "lock"));
    assert_eq!(server.join().unwrap(), None);
}

#[test]
fn test_responder_drops_wrong_greeting() {
    let responder = Responder::new("expected-hello").allow_command("lock");
    let (port, server) = fake_server(move |stream| responder.serve_one(stream).unwrap());
    let dispatcher = dispatcher(port, "mypc", "poweron");

    assert!(!dispatcher.send("mypc", "poweron"));
    assert_eq!(server.join().unwrap(), None);
}
