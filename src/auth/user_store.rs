//! User Storage
//! Mission: Persist user accounts, keyed by id and by unique email

use crate::auth::models::{NewUser, User};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Store failures. Handlers map `DuplicateEmail` to 409 and `NotFound` to 404.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("user {0} not found")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Persistence contract consumed by the request handlers
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, StoreError>;

    /// Insert a new record. Email uniqueness is enforced atomically here.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Overwrite the mutable fields of an existing record
    async fn save(&self, user: &User) -> Result<(), StoreError>;

    async fn delete_by_id(&self, id: &Uuid) -> Result<(), StoreError>;
}

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, is_admin, created_at";

/// User storage with SQLite backend
pub struct SqliteAccountStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAccountStore {
    /// Open the store named by a connection string.
    ///
    /// Accepts `sqlite://<path>`, `sqlite:<path>`, a bare path, or `:memory:`.
    pub fn open(database_url: &str) -> Result<Self, StoreError> {
        let path = database_url
            .strip_prefix("sqlite://")
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .unwrap_or(database_url);

        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };

        Self::with_connection(conn)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        Self::init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Initialize database schema
    fn init_db(conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                is_admin INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        info!("User store schema ready");
        Ok(())
    }

    fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
        let id: String = row.get(0)?;
        let id = Uuid::parse_str(&id).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(User {
            id,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            email: row.get(3)?,
            password_hash: row.get(4)?,
            is_admin: row.get::<_, i64>(5)? != 0,
            created_at: row.get(6)?,
        })
    }
}

/// Only UNIQUE failures count; NOT NULL and primary-key violations stay database errors
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock().await;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                Self::user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock().await;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                Self::user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let user = User {
            id: Uuid::new_v4(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            is_admin: new_user.is_admin,
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = self.conn.lock().await;
        conn.execute(
            &format!("INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                user.id.to_string(),
                user.first_name,
                user.last_name,
                user.email,
                user.password_hash,
                user.is_admin as i64,
                user.created_at,
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateEmail
            } else {
                StoreError::Database(e)
            }
        })?;

        info!(user_id = %user.id, is_admin = user.is_admin, "Created user");
        Ok(user)
    }

    async fn save(&self, user: &User) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        let rows_affected = conn
            .execute(
                "UPDATE users
                 SET first_name = ?2, last_name = ?3, email = ?4, password_hash = ?5, is_admin = ?6
                 WHERE id = ?1",
                params![
                    user.id.to_string(),
                    user.first_name,
                    user.last_name,
                    user.email,
                    user.password_hash,
                    user.is_admin as i64,
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateEmail
                } else {
                    StoreError::Database(e)
                }
            })?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound(user.id));
        }

        debug!(user_id = %user.id, "Saved user");
        Ok(())
    }

    async fn delete_by_id(&self, id: &Uuid) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        let rows_affected = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;

        info!(user_id = %id, rows_affected, "Deleted user");
        Ok(())
    }
}
