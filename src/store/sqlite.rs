use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, params};

use super::UserStore;
use super::schema::SCHEMA;
use crate::auth::CredentialHasher;
use crate::error::{Error, Result};
use crate::types::User;

pub struct SqliteUserStore {
    conn: Mutex<Connection>,
    hasher: CredentialHasher,
}

impl SqliteUserStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        // Credential writes must be durable before the call returns.
        conn.pragma_update(None, "synchronous", "FULL")?;

        Ok(Self {
            conn: Mutex::new(conn),
            hasher: CredentialHasher::new(),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn validated_username(username: &str) -> Result<&str> {
    let username = username.trim();
    if username.is_empty() {
        return Err(Error::InvalidUsername("username cannot be empty".into()));
    }
    Ok(username)
}

impl UserStore for SqliteUserStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn create_user(&self, username: &str, password: &str) -> Result<User> {
        let username = validated_username(username)?;
        if password.is_empty() {
            return Err(Error::InvalidUsername("password cannot be empty".into()));
        }

        let password_hash = self.hasher.hash(password)?;

        let conn = self.conn();
        let result = conn.execute(
            "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
            params![username, password_hash],
        );

        match result {
            Ok(_) => Ok(User {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                password_hash,
            }),
            Err(e) if is_unique_violation(&e) => Err(Error::DuplicateUser(username.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn verify_credentials(&self, username: &str, password: &str) -> Result<bool> {
        let Ok(username) = validated_username(username) else {
            self.hasher.verify_decoy();
            return Ok(false);
        };

        match self.get_user(username)? {
            Some(user) => self.hasher.verify(password, &user.password_hash),
            None => {
                self.hasher.verify_decoy();
                Ok(false)
            }
        }
    }

    fn reset_password(&self, username: &str, new_password: &str) -> Result<()> {
        let username = validated_username(username)?;
        if new_password.is_empty() {
            return Err(Error::InvalidUsername("password cannot be empty".into()));
        }

        let password_hash = self.hasher.hash(new_password)?;

        // Single UPDATE statement, so the hash is replaced atomically.
        let rows = self.conn().execute(
            "UPDATE users SET password_hash = ?1 WHERE username = ?2",
            params![password_hash, username],
        )?;

        if rows == 0 {
            return Err(Error::NoSuchUser(username.to_string()));
        }
        Ok(())
    }

    fn get_user(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, password_hash FROM users WHERE username = ?1",
            params![username.trim()],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    password_hash: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, username, password_hash FROM users ORDER BY username")?;

        let rows = stmt.query_map([], |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}
