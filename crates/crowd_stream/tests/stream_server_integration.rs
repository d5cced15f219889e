#![cfg(feature = "stream_server_integration")]

use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use crowd_stream::{
    CloseKind, GeometryMessage, ServerMessage, SessionExit, SimScenario, SnapshotMessage,
    StreamServer, StreamServerConfig,
};
use tungstenite::protocol::Message;
use tungstenite::{Error as WsError, WebSocket};

fn find_free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("free port")
}

fn connect_with_retry(addr: &str, timeout: Duration) -> TcpStream {
    let start = Instant::now();
    loop {
        if let Ok(stream) = TcpStream::connect(addr) {
            return stream;
        }
        if start.elapsed() > timeout {
            panic!("connect timeout");
        }
        thread::sleep(Duration::from_millis(20));
    }
}

fn open_client(addr: &str) -> WebSocket<TcpStream> {
    let stream = connect_with_retry(addr, Duration::from_secs(2));
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("client read timeout");
    match tungstenite::client(format!("ws://{addr}/ws"), stream) {
        Ok((socket, _)) => socket,
        Err(err) => panic!("client handshake failed: {err}"),
    }
}

fn read_server_message(socket: &mut WebSocket<TcpStream>) -> ServerMessage {
    loop {
        match socket.read().expect("read server message") {
            Message::Text(text) => return ServerMessage::parse(&text).expect("decode message"),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

fn expect_snapshot(socket: &mut WebSocket<TcpStream>) -> SnapshotMessage {
    match read_server_message(socket) {
        ServerMessage::Snapshot(snapshot) => snapshot,
        other => panic!("expected snapshot, got {other:?}"),
    }
}

fn close_client(mut socket: WebSocket<TcpStream>) {
    socket.close(None).expect("send close");
    loop {
        match socket.read() {
            Ok(_) => continue,
            Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => break,
            Err(err) => panic!("unexpected close error: {err}"),
        }
    }
}

fn spawn_server(config: StreamServerConfig) -> thread::JoinHandle<crowd_stream::SessionReport> {
    thread::spawn(move || StreamServer::new(config).run_once().expect("serve one session"))
}

#[test]
fn orbit_session_streams_geometry_then_capped_snapshots() {
    let port = find_free_port();
    let addr = format!("127.0.0.1:{port}");
    let config = StreamServerConfig::new(SimScenario::Orbit)
        .with_bind_addr(addr.clone())
        .with_tick_interval(Duration::from_millis(5))
        .with_poll_window(Duration::from_millis(5));
    let server = spawn_server(config);

    let mut socket = open_client(&addr);
    socket
        .send(Message::Text(
            r#"{"reset":true,"isRunning":true,"target":3}"#.to_string(),
        ))
        .expect("send start");

    match read_server_message(&mut socket) {
        ServerMessage::Geometry(GeometryMessage::Geometry { geometry }) => {
            assert_eq!(geometry.boundary.points.len(), 4);
        }
        other => panic!("expected geometry first, got {other:?}"),
    }

    let counts: Vec<u64> = (0..3)
        .map(|_| expect_snapshot(&mut socket).iteration_count)
        .collect();
    assert_eq!(counts, vec![1, 2, 3]);

    // Target reached: the server keeps polling but sends nothing more.
    socket
        .get_mut()
        .set_read_timeout(Some(Duration::from_millis(100)))
        .expect("short read timeout");
    match socket.read() {
        Err(WsError::Io(err))
            if matches!(
                err.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ) => {}
        other => panic!("expected silence after target, got {other:?}"),
    }
    socket
        .get_mut()
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("restore read timeout");

    close_client(socket);
    let report = server.join().expect("server thread");
    assert!(matches!(
        report.exit,
        SessionExit::Disconnected(CloseKind::Graceful)
    ));
    assert_eq!(report.steps, 3);
    assert_eq!(report.builds, 1);
}

#[test]
fn evacuation_session_skips_invalid_commands() {
    let port = find_free_port();
    let addr = format!("127.0.0.1:{port}");
    let config = StreamServerConfig::new(SimScenario::Evacuation)
        .with_bind_addr(addr.clone())
        .with_tick_interval(Duration::from_millis(5))
        .with_poll_window(Duration::from_millis(5))
        .with_agent_count(6);
    let server = spawn_server(config);

    let mut socket = open_client(&addr);
    for invalid in ["not json", r#"{"reset":true}"#, r#"{"isRunning":"yes","target":2}"#] {
        socket
            .send(Message::Text(invalid.to_string()))
            .expect("send invalid");
    }
    socket
        .send(Message::Text(r#"{"isRunning":true,"target":2}"#.to_string()))
        .expect("send start");

    match read_server_message(&mut socket) {
        ServerMessage::Geometry(GeometryMessage::Geometry { geometry }) => {
            assert!(!geometry.exits.is_empty());
            assert!(!geometry.spawn_area.is_empty());
        }
        other => panic!("expected geometry first, got {other:?}"),
    }
    let first = expect_snapshot(&mut socket);
    assert_eq!(first.iteration_count, 1);
    assert_eq!(first.target, 2);
    assert_eq!(first.positions.len(), first.remaining_agents);
    let second = expect_snapshot(&mut socket);
    assert_eq!(second.iteration_count, 2);

    close_client(socket);
    let report = server.join().expect("server thread");
    assert_eq!(report.rejected_commands, 3);
    assert_eq!(report.steps, 2);
}
