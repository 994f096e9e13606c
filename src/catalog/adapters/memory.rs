//! In-memory scanner for tests.

use crate::catalog::domain::{CatalogError, FileMetadata, ScanResult, ScannedFile};
use crate::catalog::ports::{SourceScanner, SourceScannerResult};
use async_trait::async_trait;
use camino::Utf8Path;
use std::collections::BTreeMap;

/// Scanner double serving sources from memory.
///
/// Paths are given relative to the virtual root; the root script is set
/// separately and never appears in the scan result, mirroring the
/// production scanner.
#[derive(Debug, Clone, Default)]
pub struct InMemorySourceScanner {
    deploy_sql: Option<String>,
    files: BTreeMap<String, String>,
}

impl InMemorySourceScanner {
    /// Creates an empty scanner with no root script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `deploy.sql` root script.
    #[must_use]
    pub fn with_deploy_sql(mut self, content: impl Into<String>) -> Self {
        self.deploy_sql = Some(content.into());
        self
    }

    /// Adds a source file at a root-relative path.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }
}

#[async_trait]
impl SourceScanner for InMemorySourceScanner {
    async fn validate_deploy_sql(&self, source_path: &Utf8Path) -> SourceScannerResult<()> {
        if self.deploy_sql.is_some() {
            Ok(())
        } else {
            Err(CatalogError::MissingDeploySql {
                path: source_path.to_string(),
            })
        }
    }

    async fn scan_directory(&self, source_path: &Utf8Path) -> SourceScannerResult<ScanResult> {
        let mut files = Vec::with_capacity(self.files.len());
        for (path, content) in &self.files {
            let metadata = FileMetadata::parse(path, content)?;
            let mut file = ScannedFile::new(path, content.clone())?;
            if let Some(block) = metadata {
                file = file.with_metadata(block);
            }
            files.push(file);
        }
        files.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(ScanResult::new(source_path.to_owned(), files))
    }

    async fn read_deploy_sql(&self, source_path: &Utf8Path) -> SourceScannerResult<String> {
        self.deploy_sql
            .clone()
            .ok_or_else(|| CatalogError::MissingDeploySql {
                path: source_path.to_string(),
            })
    }
}
