use std::io;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use tracing::debug;
use tungstenite::error::ProtocolError;
use tungstenite::handshake::HandshakeError;
use tungstenite::protocol::Message;
use tungstenite::{accept, Error as WsError, WebSocket};

use crate::session::{CloseKind, PollOutcome, SessionError, SessionTransport};

use super::StreamServerError;

const MIN_POLL_WINDOW: Duration = Duration::from_millis(1);
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Server side of one accepted WebSocket connection, read with a bounded timeout.
pub struct WebSocketTransport {
    socket: WebSocket<TcpStream>,
    peer: Option<SocketAddr>,
}

impl WebSocketTransport {
    pub fn accept(stream: TcpStream) -> Result<Self, StreamServerError> {
        Self::accept_with_timeout(stream, HANDSHAKE_TIMEOUT)
    }

    /// Gives up if the upgrade request has not arrived within `timeout`.
    pub fn accept_with_timeout(
        stream: TcpStream,
        timeout: Duration,
    ) -> Result<Self, StreamServerError> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(timeout.max(MIN_POLL_WINDOW)))?;
        let peer = stream.peer_addr().ok();
        let socket = accept(stream).map_err(map_handshake_error)?;
        debug!(?peer, "websocket handshake complete");
        Ok(Self { socket, peer })
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl SessionTransport for WebSocketTransport {
    fn poll(&mut self, window: Duration) -> Result<PollOutcome, SessionError> {
        self.socket
            .get_mut()
            .set_read_timeout(Some(window.max(MIN_POLL_WINDOW)))
            .map_err(|err| SessionError::Transport(err.to_string()))?;

        match self.socket.read() {
            Ok(Message::Text(text)) => Ok(PollOutcome::Message(text)),
            Ok(Message::Binary(binary)) => match String::from_utf8(binary) {
                Ok(text) => Ok(PollOutcome::Message(text)),
                Err(_) => {
                    debug!("ignoring non-utf8 binary frame");
                    Ok(PollOutcome::NoMessage)
                }
            },
            Ok(Message::Close(frame)) => {
                debug!(?frame, "close frame received");
                Ok(PollOutcome::Closed(CloseKind::Graceful))
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {
                Ok(PollOutcome::NoMessage)
            }
            Err(err) => classify_read_error(err),
        }
    }

    fn send(&mut self, text: String) -> Result<(), SessionError> {
        self.socket
            .send(Message::Text(text))
            .map_err(classify_write_error)
    }

    fn close(&mut self) -> Result<(), SessionError> {
        match self.socket.close(None) {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(err) => Err(SessionError::Transport(err.to_string())),
        }
    }
}

fn classify_read_error(err: WsError) -> Result<PollOutcome, SessionError> {
    match err {
        WsError::Io(err) if is_timeout(&err) => Ok(PollOutcome::NoMessage),
        WsError::Io(err) if is_abrupt_disconnect(&err) => {
            Ok(PollOutcome::Closed(CloseKind::Error))
        }
        WsError::ConnectionClosed | WsError::AlreadyClosed => {
            Ok(PollOutcome::Closed(CloseKind::Graceful))
        }
        WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            Ok(PollOutcome::Closed(CloseKind::Error))
        }
        other => Err(SessionError::Transport(other.to_string())),
    }
}

fn classify_write_error(err: WsError) -> SessionError {
    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => {
            SessionError::ConnectionClosed(CloseKind::Graceful)
        }
        WsError::Io(err) if is_abrupt_disconnect(&err) => {
            SessionError::ConnectionClosed(CloseKind::Error)
        }
        WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            SessionError::ConnectionClosed(CloseKind::Error)
        }
        other => SessionError::Transport(other.to_string()),
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn is_abrupt_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

fn map_handshake_error(
    err: HandshakeError<
        tungstenite::ServerHandshake<TcpStream, tungstenite::handshake::server::NoCallback>,
    >,
) -> StreamServerError {
    match err {
        HandshakeError::Failure(error) => StreamServerError::Handshake(error.to_string()),
        HandshakeError::Interrupted(_) => StreamServerError::Io(io::Error::new(
            io::ErrorKind::TimedOut,
            "websocket handshake timed out",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_error(kind: io::ErrorKind) -> WsError {
        WsError::Io(io::Error::new(kind, "test"))
    }

    #[test]
    fn silent_peer_fails_the_handshake() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let _client = TcpStream::connect(addr).expect("connect");
        let (stream, _) = listener.accept().expect("accept");

        let result = WebSocketTransport::accept_with_timeout(stream, Duration::from_millis(50));
        assert!(matches!(
            result,
            Err(StreamServerError::Io(_)) | Err(StreamServerError::Handshake(_))
        ));
    }

    #[test]
    fn read_timeouts_are_silence() {
        assert_eq!(
            classify_read_error(io_error(io::ErrorKind::WouldBlock)).expect("outcome"),
            PollOutcome::NoMessage
        );
        assert_eq!(
            classify_read_error(io_error(io::ErrorKind::TimedOut)).expect("outcome"),
            PollOutcome::NoMessage
        );
    }

    #[test]
    fn read_disconnects_are_classified() {
        assert_eq!(
            classify_read_error(WsError::ConnectionClosed).expect("outcome"),
            PollOutcome::Closed(CloseKind::Graceful)
        );
        assert_eq!(
            classify_read_error(io_error(io::ErrorKind::ConnectionReset)).expect("outcome"),
            PollOutcome::Closed(CloseKind::Error)
        );
        assert_eq!(
            classify_read_error(WsError::Protocol(
                ProtocolError::ResetWithoutClosingHandshake
            ))
            .expect("outcome"),
            PollOutcome::Closed(CloseKind::Error)
        );
    }

    #[test]
    fn other_read_failures_are_transport_errors() {
        let err = classify_read_error(io_error(io::ErrorKind::PermissionDenied))
            .expect_err("transport error");
        assert!(matches!(err, SessionError::Transport(_)));
    }

    #[test]
    fn write_failures_after_disconnect_end_the_session() {
        assert!(matches!(
            classify_write_error(WsError::AlreadyClosed),
            SessionError::ConnectionClosed(CloseKind::Graceful)
        ));
        assert!(matches!(
            classify_write_error(io_error(io::ErrorKind::BrokenPipe)),
            SessionError::ConnectionClosed(CloseKind::Error)
        ));
    }
}
