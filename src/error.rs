//! Crate-level error taxonomy.
//!
//! Every public entry point returns [`EngineError`]. The sentinel variants
//! (`InvalidConfig`, `ApprovalDenied`, `DeploySqlNotFound`,
//! `ExecutionFailed`, `InvalidPattern`, `UnsupportedApiVersion`,
//! `InvalidParameterKey`, `InvalidCallbackName`, `Cancelled`) are stable
//! identities that callers may test with `matches!`. Context-local errors
//! convert into the taxonomy while preserving sentinel identity: a
//! [`crate::catalog::CatalogError::InvalidParameterKey`] surfaces as
//! [`EngineError::InvalidParameterKey`], never as an opaque wrapper.

use crate::catalog::CatalogError;
use crate::session::SessionError;
use thiserror::Error;

/// Result type for engine entry points.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the deployment and test entry points.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request configuration is incomplete or contradictory.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The approver declined to overwrite an existing database.
    #[error("approval denied: database {database} was not overwritten")]
    ApprovalDenied {
        /// Target database that was left untouched.
        database: String,
    },

    /// The source directory does not contain a `deploy.sql` root script.
    #[error("deploy.sql not found under {path}")]
    DeploySqlNotFound {
        /// Source directory that was inspected.
        path: String,
    },

    /// A planned command failed during the execution phase.
    #[error("command {ordinal} failed{}: {preview}", .server_line.map(|l| format!(" (line {l})")).unwrap_or_default())]
    ExecutionFailed {
        /// Ordinal of the failing command in the plan queue.
        ordinal: i64,
        /// Bounded preview of the command text.
        preview: String,
        /// 1-based line within the command, when the server reported one.
        server_line: Option<u32>,
        /// Original file and line, when a source map covered the region.
        origin: Option<String>,
        /// Underlying server error.
        #[source]
        source: SessionError,
    },

    /// A test filter was not a valid POSIX regular expression.
    #[error("invalid regex pattern: {pattern}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Server-provided hint, when available.
        hint: String,
    },

    /// The requested public API version is not built into this binary.
    #[error("unsupported API version {requested}; available: {available}")]
    UnsupportedApiVersion {
        /// The version that was requested.
        requested: String,
        /// Comma-separated list of available versions.
        available: String,
    },

    /// A parameter key violates `^[A-Za-z0-9_]{1,63}$`.
    #[error("invalid parameter key: {key}")]
    InvalidParameterKey {
        /// The rejected key.
        key: String,
    },

    /// A test callback name is not `ident` or `ident.ident`.
    #[error("invalid callback: {name}")]
    InvalidCallbackName {
        /// The rejected callback name.
        name: String,
    },

    /// The caller's cancellation signal fired between units of work.
    #[error("cancelled {during}")]
    Cancelled {
        /// What the engine was about to do when the signal was observed.
        during: String,
    },

    /// A test script raised an error; execution stopped at this script.
    #[error("test {path} failed")]
    TestFailed {
        /// Path of the failing script.
        path: String,
        /// Underlying server error.
        #[source]
        source: SessionError,
    },

    /// The planning phase (`deploy.sql` itself) failed on the server.
    #[error("deploy.sql failed{}", .origin.as_deref().map(|o| format!(" ({o})")).unwrap_or_default())]
    PlanningFailed {
        /// Original file and line, when the source map covered the region.
        origin: Option<String>,
        /// Underlying server error.
        #[source]
        source: SessionError,
    },

    /// A macro invocation could not be spliced back into `deploy.sql`.
    #[error("macro expansion failed: {message}")]
    MacroExpansion {
        /// Description of the splice failure.
        message: String,
    },

    /// Source scanning or parameter-file loading failed.
    #[error(transparent)]
    Catalog(CatalogError),

    /// Session assembly or database access failed.
    #[error(transparent)]
    Session(SessionError),

    /// A maintenance-database operation failed.
    #[error("maintenance database operation failed: {context}")]
    Maintenance {
        /// Operation that failed (`exists`, `create`, `drop`, ...).
        context: String,
        /// Underlying error.
        #[source]
        source: SessionError,
    },

    /// The approver collaborator itself failed.
    #[error("approval request failed")]
    Approval {
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl From<CatalogError> for EngineError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::InvalidParameterKey { key } => Self::InvalidParameterKey { key },
            CatalogError::MissingDeploySql { path } => Self::DeploySqlNotFound { path },
            other => Self::Catalog(other),
        }
    }
}

impl From<SessionError> for EngineError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::UnsupportedApiVersion {
                requested,
                available,
            } => Self::UnsupportedApiVersion {
                requested,
                available,
            },
            SessionError::Catalog(inner) => inner.into(),
            SessionError::Cancelled { during } => Self::Cancelled { during },
            other => Self::Session(other),
        }
    }
}
