//! Error types for session assembly.

use crate::catalog::CatalogError;
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised while assembling or using a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Pool construction or connection acquisition failed.
    #[error("connection pool failure while {context}: {message}")]
    Pool {
        /// Operation in progress.
        context: String,
        /// Underlying pool error text.
        message: String,
    },

    /// A statement on the pinned connection failed.
    #[error("database error while {context}")]
    Database {
        /// Operation in progress.
        context: String,
        /// Underlying driver error.
        #[source]
        source: diesel::result::Error,
    },

    /// Loading a specific catalog item failed.
    #[error("failed to load {item} into the session")]
    Load {
        /// Offending file path or parameter key.
        item: String,
        /// Underlying driver error.
        #[source]
        source: diesel::result::Error,
    },

    /// The requested public API version is not built into this binary.
    #[error("unsupported API version {requested}; available: {available}")]
    UnsupportedApiVersion {
        /// The version that was requested.
        requested: String,
        /// Comma-separated list of available versions.
        available: String,
    },

    /// The pinned connection was already released by `close`.
    #[error("the session connection has been released")]
    Released,

    /// The caller's cancellation signal fired.
    #[error("cancelled {during}")]
    Cancelled {
        /// What the session was about to do.
        during: String,
    },

    /// Rendering embedded DDL failed.
    #[error("failed to render session DDL")]
    Template {
        /// Underlying template error.
        #[source]
        source: minijinja::Error,
    },

    /// The async runtime failed to run a blocking database task.
    #[error("runtime failure: {0}")]
    Runtime(String),

    /// Scanning or validation failed before any database work.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl SessionError {
    /// Wraps a driver error with operation context.
    pub fn database(context: impl Into<String>, source: diesel::result::Error) -> Self {
        Self::Database {
            context: context.into(),
            source,
        }
    }

    /// Wraps a driver error with the offending catalog item.
    pub fn load(item: impl Into<String>, source: diesel::result::Error) -> Self {
        Self::Load {
            item: item.into(),
            source,
        }
    }

    /// Wraps a pool error with operation context.
    pub fn pool(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Pool {
            context: context.into(),
            message: message.to_string(),
        }
    }
}
