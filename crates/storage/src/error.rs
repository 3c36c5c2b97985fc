use std::io;

/// Errors returned by every [`crate::Storage`] operation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("file not found")]
    FileNotFound,

    #[error("file already exists")]
    FileAlreadyExists,
}
