use std::io::{self, Write};
use std::net::TcpStream;

use protocol::{FrameError, Framer};
use storage::Storage;

use crate::dispatch;
use crate::session::Session;

/// Services one connection until the client disconnects or a transport
/// error occurs.
///
/// Runs on its own OS thread, one per connection; nothing here is shared
/// with any other worker except `storage`, which serializes its own
/// access internally.
pub fn serve_connection(mut stream: TcpStream, storage: Storage) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let span = tracing::info_span!("connection", peer = %peer);
    let _guard = span.enter();

    tracing::info!("connection opened");

    let mut framer = Framer::new();
    let mut session = Session::new();
    let mut reader = stream.try_clone().expect("clone tcp stream for reading");

    loop {
        match framer.next_message(&mut reader) {
            Ok(message) => {
                tracing::debug!(bytes = message.len(), "received message");
                let outcome = dispatch::dispatch(&storage, &mut session, &message);
                match outcome {
                    Ok(response) => {
                        if write_framed(&mut stream, &response.into_bytes()).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "command rejected");
                        if write_framed(&mut stream, format!("error {err}").as_bytes()).is_err() {
                            break;
                        }
                    }
                }
            }
            Err(FrameError::ConnectionClosed) => break,
            Err(err) if err.is_wire_error() => {
                if write_framed(&mut stream, format!("error {err}").as_bytes()).is_err() {
                    break;
                }
            }
            Err(FrameError::Io(io_err)) if is_benign_disconnect(&io_err) => break,
            Err(err) => {
                tracing::warn!(error = %err, "connection ended abnormally");
                break;
            }
        }
    }

    tracing::info!("connection closed");
}

fn write_framed(stream: &mut TcpStream, body: &[u8]) -> io::Result<()> {
    stream.write_all(body)?;
    stream.write_all(b"\r\n")?;
    stream.flush()
}

fn is_benign_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof
    )
}
