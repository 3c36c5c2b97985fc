//! SQLite-backed persistence for accounts, the store-and-forward message
//! inbox, and uploaded files.
//!
//! # Overview
//! [`Storage`] is the single entry point; every public method takes the
//! connection mutex for the duration of one self-contained statement or
//! transaction, so callers never observe partial writes from another
//! thread.
//!
//! # Design
//! The schema mirrors the original `users`/`messages` tables exactly,
//! including the `logged_in` column, which nothing in this crate reads or
//! writes. Username/password
//! uniqueness is enforced in application code rather than a `UNIQUE`
//! constraint, matching the original schema.
//!
//! # Errors
//! All fallible operations return [`StorageError`].

#![deny(unsafe_code)]

mod error;
mod files;
mod schema;
mod timestamp;
mod users;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

pub use error::StorageError;

/// A message delivered to a user's inbox, resolved with the sender's
/// username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxMessage {
    pub message_id: i64,
    pub timestamp: String,
    pub source_username: String,
    pub destination: String,
    pub body: String,
}

/// Facade over the SQLite-backed account, message, and file stores.
///
/// Cloning shares the same underlying connection and files directory;
/// every connection worker holds one clone.
#[derive(Clone)]
pub struct Storage {
    conn: Arc<Mutex<Connection>>,
    files_dir: PathBuf,
}

impl Storage {
    /// Opens (creating if necessary) the database at `db_path`, bootstraps
    /// the schema, and ensures `files_dir` exists.
    pub fn open(db_path: &Path, files_dir: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        schema::bootstrap(&conn)?;
        std::fs::create_dir_all(files_dir)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            files_dir: files_dir.to_path_buf(),
        })
    }
}
