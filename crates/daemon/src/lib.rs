//! CLI, dispatch, and connection handling for the chat daemon.
//!
//! # Overview
//! [`run`] is the library's single entry point: it parses arguments,
//! opens [`storage::Storage`], binds a [`std::net::TcpListener`], and
//! hands connections off to [`acceptor::run`], which spawns one thread
//! per connection. Each thread loops over [`protocol::Framer`] and
//! [`dispatch::dispatch`] until the client disconnects.
//!
//! # Design
//! Mirrors `bin/oc-rsyncd`'s shape: a library `run` that takes argument
//! and writer parameters and returns a process exit code, so the binary
//! crate is a two-line shim.
//!
//! # Errors
//! Fatal startup errors ([`DaemonError`]) are logged and turned into a
//! non-zero exit code; they are never reported to a client. Per-command
//! errors ([`HandlerError`]) go the other way: they are always reported
//! to the client and never end the process.

#![deny(unsafe_code)]

mod acceptor;
pub mod cli;
mod dispatch;
mod error;
mod logging;
mod response;
mod session;
mod worker;

use std::ffi::OsString;
use std::io::{self, Write};
use std::net::TcpListener;

use clap::Parser;
use clap::error::ErrorKind;

pub use cli::Config;
pub use error::{DaemonError, HandlerError};

const EXIT_OK: i32 = 0;
const EXIT_FAILURE: i32 = 2;

/// Parses `args`, runs the daemon to completion (or until interrupted),
/// and returns the process exit code. Help/version output and usage
/// errors from argument parsing are written to `stdout`/`stderr`
/// respectively rather than directly to the process streams, so this is
/// testable without a real process.
pub fn run<I, T>(args: I, stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let config = match Config::try_parse_from(args) {
        Ok(config) => config,
        Err(err) => {
            let help_or_version =
                matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion);
            let target: &mut dyn Write = if help_or_version { stdout } else { stderr };
            let _ = write!(target, "{err}");
            return if help_or_version { EXIT_OK } else { EXIT_FAILURE };
        }
    };

    logging::init(config.quiet);

    if let Err(err) = std::fs::create_dir_all(&config.files) {
        tracing::error!(
            path = %config.files.display(),
            error = %err,
            "files directory does not exist and could not be created"
        );
        return EXIT_FAILURE;
    }

    let storage = match storage::Storage::open(&config.database, &config.files) {
        Ok(storage) => storage,
        Err(err) => {
            tracing::error!(error = %err, "failed to open storage");
            return EXIT_FAILURE;
        }
    };

    let listener = match TcpListener::bind(("127.0.0.1", config.port)) {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %bind_error(err, config.port), "failed to bind");
            return EXIT_FAILURE;
        }
    };

    tracing::info!(port = config.port, "listening");

    match acceptor::run(listener, storage) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            tracing::error!(error = %err, "daemon exited with an error");
            EXIT_FAILURE
        }
    }
}

/// Serves connections on an already-bound listener until interrupted.
///
/// Exposed alongside [`run`] for integration tests and embedders that
/// want to manage their own listener — for instance binding to an
/// OS-assigned port (`0`) and reading back the real port with
/// `TcpListener::local_addr`, which `run`'s argument-parsing entry point
/// has no way to report.
pub fn serve(listener: TcpListener, storage: storage::Storage) -> Result<(), DaemonError> {
    acceptor::run(listener, storage)
}

fn bind_error(err: io::Error, port: u16) -> DaemonError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        DaemonError::BindPermissionDenied { port }
    } else {
        DaemonError::BindInUse { port }
    }
}
