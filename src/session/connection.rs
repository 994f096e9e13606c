//! Pinned-connection plumbing.
//!
//! Diesel connections are synchronous, so every statement runs on the
//! blocking thread pool. [`SessionConn`] owns the one pinned r2d2
//! connection for a session and moves it in and out of
//! [`tokio::task::spawn_blocking`] closures, guaranteeing that no other
//! task can touch the connection mid-operation.

use super::{SessionError, SessionResult};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};

/// `PostgreSQL` connection pool type used throughout the engine.
pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Pooled connection type pinned by a session.
pub type PooledConn = PooledConnection<ConnectionManager<PgConnection>>;

/// Exclusive owner of the session's pinned connection.
pub struct SessionConn {
    conn: Option<PooledConn>,
}

impl std::fmt::Debug for SessionConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConn")
            .field("released", &self.conn.is_none())
            .finish()
    }
}

impl SessionConn {
    /// Pins a pooled connection.
    #[must_use]
    pub fn new(conn: PooledConn) -> Self {
        Self { conn: Some(conn) }
    }

    /// Runs a blocking database operation on the pinned connection.
    ///
    /// The connection is moved into the blocking task and restored
    /// afterwards, even when the operation fails.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Released`] after [`SessionConn::release`],
    /// [`SessionError::Runtime`] when the blocking task is lost, or the
    /// operation's own error.
    pub async fn run<F, T>(&mut self, f: F) -> SessionResult<T>
    where
        F: FnOnce(&mut PgConnection) -> SessionResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut pinned = self.conn.take().ok_or(SessionError::Released)?;
        let (returned, result) = tokio::task::spawn_blocking(move || {
            let result = f(&mut pinned);
            (pinned, result)
        })
        .await
        .map_err(|err| SessionError::Runtime(err.to_string()))?;
        self.conn = Some(returned);
        result
    }

    /// Returns the connection to its pool; later operations fail with
    /// [`SessionError::Released`]. Safe to call repeatedly.
    pub fn release(&mut self) {
        self.conn = None;
    }

    /// Whether the connection has been released.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.conn.is_none()
    }
}

/// Quotes an SQL identifier, doubling embedded quotes.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes an SQL string literal, doubling embedded quotes.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
