use std::io;

use storage::StorageError;

/// Errors that can terminate the daemon before or while it is running.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("could not bind to port {port} (permission denied)")]
    BindPermissionDenied { port: u16 },

    #[error("could not bind to port {port}. Is it already in use?")]
    BindInUse { port: u16 },

    #[error("file folder {path} does not exist and could not be created")]
    FilesDirUnavailable { path: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid arguments: {0}")]
    Cli(String),
}

/// The message text sent back to a client as `error <msg>\r\n`.
///
/// Unlike [`DaemonError`], which ends the process, this only ends one
/// request; the connection stays open.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<StorageError> for HandlerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UserAlreadyExists => {
                HandlerError::new("username is already registered")
            }
            StorageError::FileNotFound => HandlerError::new("could not read from file"),
            StorageError::FileAlreadyExists => HandlerError::new("file already exists"),
            other => {
                tracing::error!(error = %other, "storage operation failed");
                HandlerError::new("internal server error")
            }
        }
    }
}
