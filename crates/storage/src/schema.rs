use rusqlite::Connection;

use crate::error::StorageError;

/// Creates the `users` and `messages` tables if they are not already
/// present.
///
/// The `logged_in` column on `users` is carried over from the original
/// schema for fidelity but is otherwise dead: nothing in this crate reads
/// or writes it. Username uniqueness is deliberately not a `UNIQUE`
/// constraint here either, matching the original schema; [`crate::users`]
/// enforces it at the application layer instead.
pub(crate) fn bootstrap(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            user_id INTEGER PRIMARY KEY,
            username VARCHAR(30) NOT NULL,
            password VARCHAR(50) NOT NULL,
            logged_in BOOLEAN NOT NULL CHECK (logged_in IN (0, 1)) DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS messages (
            message_id INTEGER PRIMARY KEY,
            timestamp VARCHAR(32) NOT NULL,
            source_id INTEGER NOT NULL,
            destination VARCHAR(30) NOT NULL,
            inbox_id INTEGER NOT NULL,
            body VARCHAR(256) NOT NULL,
            FOREIGN KEY (source_id) REFERENCES users (user_id)
                ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY (inbox_id) REFERENCES users (user_id)
                ON UPDATE CASCADE ON DELETE CASCADE
        );
        ",
    )?;
    Ok(())
}
