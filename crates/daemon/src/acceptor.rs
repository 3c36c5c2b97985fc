use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use storage::Storage;

use crate::error::DaemonError;
use crate::worker;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Binds `localhost:<port>` and spawns one worker thread per accepted
/// connection until interrupted.
pub fn run(listener: TcpListener, storage: Storage) -> Result<(), DaemonError> {
    listener.set_nonblocking(true)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let ctrlc_shutdown = Arc::clone(&shutdown);
    if ctrlc::set_handler(move || ctrlc_shutdown.store(true, Ordering::SeqCst)).is_err() {
        tracing::warn!("failed to install Ctrl-C handler; relying on process signals to exit");
    }

    while !shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, addr)) => {
                tracing::debug!(%addr, "accepted connection");
                let storage = storage.clone();
                thread::spawn(move || worker::serve_connection(stream, storage));
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to accept connection");
            }
        }
    }

    tracing::info!("shutting down");
    Ok(())
}
