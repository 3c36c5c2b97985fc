use rusqlite::{OptionalExtension, params};

use crate::{InboxMessage, Storage, StorageError};

impl Storage {
    /// Looks up a user's id by username, ignoring password.
    pub fn find_user_by_name(&self, username: &str) -> Result<Option<i64>, StorageError> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        conn.query_row(
            "SELECT user_id FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )
        .optional()
        .map_err(StorageError::from)
    }

    /// Looks up a user's id by username and password together, for login.
    pub fn find_user_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<i64>, StorageError> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        conn.query_row(
            "SELECT user_id FROM users WHERE username = ?1 AND password = ?2",
            params![username, password],
            |row| row.get(0),
        )
        .optional()
        .map_err(StorageError::from)
    }

    /// Creates a new account, returning the new user id.
    ///
    /// Fails with [`StorageError::UserAlreadyExists`] if the username is
    /// already taken. The schema has no `UNIQUE` constraint on `username`
    /// (matching the original), so uniqueness is enforced here, under the
    /// same mutex guard as the existence check, rather than at the
    /// database level.
    pub fn create_user(&self, username: &str, password: &str) -> Result<i64, StorageError> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let exists: Option<i64> = conn
            .query_row(
                "SELECT user_id FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StorageError::UserAlreadyExists);
        }

        conn.execute(
            "INSERT INTO users (username, password, logged_in) VALUES (?1, ?2, 0)",
            params![username, password],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Returns the ids of every registered user, in insertion order.
    pub fn list_user_ids(&self) -> Result<Vec<i64>, StorageError> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let mut stmt = conn.prepare("SELECT user_id FROM users ORDER BY user_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// Stores one message addressed to `inbox_id`.
    ///
    /// `destination` is the raw destination token from the wire message
    /// (a username, or the broadcast keyword) and is stored verbatim, same
    /// as the original schema; `inbox_id` is the resolved recipient.
    /// Broadcast delivery calls this once per recipient, including the
    /// sender.
    pub fn insert_message(
        &self,
        source_id: i64,
        destination: &str,
        inbox_id: i64,
        body: &str,
    ) -> Result<(), StorageError> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        conn.execute(
            "INSERT INTO messages (timestamp, source_id, destination, inbox_id, body)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![crate::timestamp::now(), source_id, destination, inbox_id, body],
        )?;
        Ok(())
    }

    /// Atomically reads and clears every message queued for `inbox_id`,
    /// oldest first, resolving each sender's username.
    pub fn drain_inbox(&self, inbox_id: i64) -> Result<Vec<InboxMessage>, StorageError> {
        let mut conn = self.conn.lock().expect("storage mutex poisoned");
        let tx = conn.transaction()?;

        let messages = {
            let mut stmt = tx.prepare(
                "SELECT messages.message_id, messages.timestamp, users.username,
                        messages.destination, messages.body
                 FROM messages
                 INNER JOIN users ON messages.source_id = users.user_id
                 WHERE messages.inbox_id = ?1
                 ORDER BY messages.message_id",
            )?;
            stmt.query_map(params![inbox_id], |row| {
                Ok(InboxMessage {
                    message_id: row.get(0)?,
                    timestamp: row.get(1)?,
                    source_username: row.get(2)?,
                    destination: row.get(3)?,
                    body: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?
        };

        tx.execute(
            "DELETE FROM messages WHERE inbox_id = ?1",
            params![inbox_id],
        )?;
        tx.commit()?;

        Ok(messages)
    }
}
