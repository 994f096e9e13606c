//! Maintenance database port.
//!
//! Create/drop operations cannot run on the target database itself; they
//! go through a short-lived connection to a maintenance database. The
//! factory is a shared collaborator; each run connects its own handle and
//! drops it before session assembly begins.

use crate::session::{ConnectionConfig, SessionResult};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Produces maintenance-database handles.
#[async_trait]
pub trait DatabaseManager: Send + Sync {
    /// Connects to the maintenance database.
    ///
    /// # Errors
    ///
    /// Returns [`crate::session::SessionError::Pool`] when unreachable and
    /// [`crate::session::SessionError::Cancelled`] when the token fires.
    async fn connect(
        &self,
        config: &ConnectionConfig,
        maintenance_db: &str,
        cancel: &CancellationToken,
    ) -> SessionResult<Box<dyn MaintenanceDatabase>>;
}

/// Operations against a maintenance-database-bound connection.
///
/// Dropping the handle closes its pool.
#[async_trait]
pub trait MaintenanceDatabase: Send + Sync {
    /// Whether the target database exists.
    ///
    /// # Errors
    ///
    /// Returns [`crate::session::SessionError::Database`] on failure.
    async fn exists(&self, database: &str) -> SessionResult<bool>;

    /// Creates the target database.
    ///
    /// # Errors
    ///
    /// Returns [`crate::session::SessionError::Database`] on failure.
    async fn create(&self, database: &str) -> SessionResult<()>;

    /// Drops the target database if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`crate::session::SessionError::Database`] on failure.
    async fn drop_database(&self, database: &str) -> SessionResult<()>;

    /// Terminates every other connection to the target database.
    ///
    /// # Errors
    ///
    /// Returns [`crate::session::SessionError::Database`] on failure.
    async fn terminate_connections(&self, database: &str) -> SessionResult<()>;
}
