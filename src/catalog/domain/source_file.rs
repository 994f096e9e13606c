//! Scanned source files and their classification.

use super::metadata::FileMetadata;
use super::{CatalogResult, checksum, path};
use camino::Utf8PathBuf;

/// Extensions recognized as SQL content, compared case-insensitively.
pub const SQL_EXTENSIONS: &[&str] = &[
    "sql", "ddl", "dml", "dql", "dcl", "psql", "pgsql", "plpgsql",
];

/// A source file read from disk, keyed by its canonical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    path: String,
    content: String,
    checksum_raw: String,
    checksum_normalized: String,
    metadata: Option<FileMetadata>,
}

impl ScannedFile {
    /// Builds a scanned file, normalizing the path and computing both
    /// checksums from the content.
    ///
    /// # Errors
    ///
    /// Returns [`super::CatalogError::InvalidPath`] or
    /// [`super::CatalogError::PathTooDeep`] when the path cannot be
    /// canonicalized.
    pub fn new(raw_path: &str, content: String) -> CatalogResult<Self> {
        let canonical = path::normalize(raw_path)?;
        let checksum_raw = checksum::raw_digest(content.as_bytes());
        let checksum_normalized = checksum::normalized_digest(&content);
        Ok(Self {
            path: canonical,
            content,
            checksum_raw,
            checksum_normalized,
            metadata: None,
        })
    }

    /// Attaches a structured metadata block.
    #[must_use]
    pub fn with_metadata(mut self, metadata: FileMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Canonical path (`./`-rooted, `/`-separated).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full file content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Content length in bytes.
    #[must_use]
    pub fn byte_length(&self) -> usize {
        self.content.len()
    }

    /// Digest of the exact file bytes.
    #[must_use]
    pub fn checksum_raw(&self) -> &str {
        &self.checksum_raw
    }

    /// Digest of the line-ending-normalized content.
    #[must_use]
    pub fn checksum_normalized(&self) -> &str {
        &self.checksum_normalized
    }

    /// Structured metadata block, when the file carries one.
    #[must_use]
    pub fn metadata(&self) -> Option<&FileMetadata> {
        self.metadata.as_ref()
    }

    /// Filename component of the path.
    #[must_use]
    pub fn file_name(&self) -> &str {
        path::file_name(&self.path)
    }

    /// Directory component of the path, with trailing `/`.
    #[must_use]
    pub fn directory(&self) -> &str {
        path::directory(&self.path)
    }

    /// True when the path lies under a `__test__`/`__tests__` directory.
    #[must_use]
    pub fn is_test(&self) -> bool {
        is_test_path(&self.path)
    }

    /// True when the extension marks SQL content.
    #[must_use]
    pub fn is_sql(&self) -> bool {
        is_sql_extension(path::extension(&self.path))
    }

    /// True when this file is a test fixture (`_setup.sql`/`_setup.psql`).
    #[must_use]
    pub fn is_fixture(&self) -> bool {
        self.is_test() && is_fixture_name(self.file_name())
    }
}

/// The outcome of scanning a source directory.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    root: Utf8PathBuf,
    files: Vec<ScannedFile>,
}

impl ScanResult {
    /// Creates a scan result for a root directory.
    #[must_use]
    pub fn new(root: Utf8PathBuf, files: Vec<ScannedFile>) -> Self {
        Self { root, files }
    }

    /// The scanned root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8PathBuf {
        &self.root
    }

    /// All scanned files, in deterministic (path-sorted) order.
    #[must_use]
    pub fn files(&self) -> &[ScannedFile] {
        &self.files
    }

    /// Files outside any test directory.
    pub fn source_files(&self) -> impl Iterator<Item = &ScannedFile> {
        self.files.iter().filter(|f| !f.is_test())
    }

    /// Files inside test directories.
    pub fn test_files(&self) -> impl Iterator<Item = &ScannedFile> {
        self.files.iter().filter(|f| f.is_test())
    }
}

/// True when a canonical path contains a `/__test__/` or `/__tests__/`
/// segment.
#[must_use]
pub fn is_test_path(canonical: &str) -> bool {
    canonical
        .split('/')
        .any(|segment| segment == "__test__" || segment == "__tests__")
}

/// True when the extension (with or without leading `.`) marks SQL content.
#[must_use]
pub fn is_sql_extension(extension: &str) -> bool {
    let bare = extension.strip_prefix('.').unwrap_or(extension);
    SQL_EXTENSIONS
        .iter()
        .any(|known| bare.eq_ignore_ascii_case(known))
}

/// True when a filename marks a fixture, compared case-insensitively.
#[must_use]
pub fn is_fixture_name(name: &str) -> bool {
    name.eq_ignore_ascii_case("_setup.sql") || name.eq_ignore_ascii_case("_setup.psql")
}
