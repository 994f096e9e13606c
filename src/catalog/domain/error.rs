//! Error types for the source catalog.

use thiserror::Error;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors raised while scanning sources or parsing parameters.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A path could not be brought into canonical form.
    #[error("invalid path {path}: {reason}")]
    InvalidPath {
        /// The offending path as supplied.
        path: String,
        /// Why canonicalization rejected it.
        reason: String,
    },

    /// A path nests deeper than the supported limit.
    #[error("path {path} exceeds the maximum depth of {limit}")]
    PathTooDeep {
        /// The offending path.
        path: String,
        /// The depth limit.
        limit: u32,
    },

    /// The source directory has no `deploy.sql` root script.
    #[error("deploy.sql not found under {path}")]
    MissingDeploySql {
        /// Source directory that was inspected.
        path: String,
    },

    /// A parameter key violates `^[A-Za-z0-9_]{1,63}$`.
    #[error("invalid parameter key: {key}")]
    InvalidParameterKey {
        /// The rejected key.
        key: String,
    },

    /// A parameter value exceeds the size limit.
    #[error("parameter {key} value is {actual} bytes; the limit is {limit}")]
    ParameterValueTooLong {
        /// Key whose value is oversized.
        key: String,
        /// Actual size in bytes.
        actual: usize,
        /// Permitted maximum.
        limit: usize,
    },

    /// A `pgmi-meta` header block failed to parse.
    #[error("invalid metadata block in {path}: {reason}")]
    InvalidMetadataBlock {
        /// File carrying the block.
        path: String,
        /// Parse failure description.
        reason: String,
    },

    /// A parameter file line could not be parsed.
    #[error("invalid parameter file: line {line}: {reason}")]
    InvalidParameterFile {
        /// 1-based line number.
        line: usize,
        /// Parse failure description.
        reason: String,
    },

    /// A source file is not valid UTF-8.
    #[error("file {path} is not valid UTF-8")]
    NonUtf8 {
        /// The offending file.
        path: String,
    },

    /// Filesystem access failed.
    #[error("io error on {path}")]
    Io {
        /// Path being accessed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}
