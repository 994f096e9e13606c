//! Session assembly.
//!
//! A pgmi session is one pinned database connection plus everything
//! installed on it: internal catalog tables in the connection's temporary
//! namespace, the loaded file and parameter catalogs, and the versioned
//! public API that `deploy.sql` binds to. All of it vanishes when the
//! connection is released, so every component of a run must use the one
//! pinned connection; a second connection would see an empty namespace.

pub mod adapters;
pub mod connection;
pub mod contract;
mod error;
mod loader;
mod manager;
pub mod ports;
pub mod retry;
pub mod schema;

pub use connection::{PgPool, PooledConn, SessionConn, quote_ident, quote_literal};
pub use error::{SessionError, SessionResult};
pub use loader::{DieselSessionLoader, SessionLoader};
pub use manager::{PrepareSession, Session, SessionManager};
pub use ports::{AuthMethod, ConnectionConfig, ConnectorFactory};

/// Namespace used for internal tables, routines, and runtime settings.
pub const NAMESPACE: &str = "pgmi";

#[cfg(test)]
mod tests;
