//! Source scanner port.

use crate::catalog::domain::{CatalogError, ScanResult};
use async_trait::async_trait;
use camino::Utf8Path;

/// Result type for scanner operations.
pub type SourceScannerResult<T> = Result<T, CatalogError>;

/// Filesystem contract consumed by session assembly and deployment.
///
/// Implementations must be safe for concurrent use; the deployment
/// orchestrator and test runner share a single scanner across runs.
#[async_trait]
pub trait SourceScanner: Send + Sync {
    /// Checks that `deploy.sql` exists directly under the source directory.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MissingDeploySql`] when absent.
    async fn validate_deploy_sql(&self, source_path: &Utf8Path) -> SourceScannerResult<()>;

    /// Walks the source directory into a catalog of scanned files.
    ///
    /// The walk is deterministic (lexicographic order), canonicalizes every
    /// path relative to the root, computes both checksums, and parses
    /// structured metadata blocks.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on unreadable entries, non-UTF-8 content,
    /// paths beyond the depth limit, or malformed metadata blocks.
    async fn scan_directory(&self, source_path: &Utf8Path) -> SourceScannerResult<ScanResult>;

    /// Reads the `deploy.sql` root script.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MissingDeploySql`] when absent and
    /// [`CatalogError::Io`] on read failures.
    async fn read_deploy_sql(&self, source_path: &Utf8Path) -> SourceScannerResult<String>;
}
