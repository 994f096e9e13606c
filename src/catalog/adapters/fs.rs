//! Capability-based filesystem scanner.

use crate::catalog::domain::{CatalogError, FileMetadata, ScanResult, ScannedFile};
use crate::catalog::ports::{SourceScanner, SourceScannerResult};
use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;

/// Name of the required root script.
pub const DEPLOY_SQL: &str = "deploy.sql";

/// Production scanner walking the source tree through `cap-std`.
///
/// The walk is rooted at the source directory and cannot escape it; entries
/// are visited in lexicographic order so repeated scans of the same tree
/// produce identical catalogs. The top-level `deploy.sql` is the engine's
/// root script and is not part of the catalog itself.
#[derive(Debug, Clone, Default)]
pub struct FsSourceScanner;

impl FsSourceScanner {
    /// Creates a scanner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceScanner for FsSourceScanner {
    async fn validate_deploy_sql(&self, source_path: &Utf8Path) -> SourceScannerResult<()> {
        let root = source_path.to_owned();
        tokio::task::spawn_blocking(move || {
            let dir = open_root(&root)?;
            let present = dir.try_exists(DEPLOY_SQL).map_err(|source| CatalogError::Io {
                path: root.join(DEPLOY_SQL).into_string(),
                source,
            })?;
            if present {
                Ok(())
            } else {
                Err(CatalogError::MissingDeploySql {
                    path: root.into_string(),
                })
            }
        })
        .await
        .map_err(join_error)?
    }

    async fn scan_directory(&self, source_path: &Utf8Path) -> SourceScannerResult<ScanResult> {
        let root = source_path.to_owned();
        tokio::task::spawn_blocking(move || {
            let dir = open_root(&root)?;
            let mut files = Vec::new();
            walk(&dir, "", &mut files)?;
            files.sort_by(|a, b| a.path().cmp(b.path()));
            Ok(ScanResult::new(root, files))
        })
        .await
        .map_err(join_error)?
    }

    async fn read_deploy_sql(&self, source_path: &Utf8Path) -> SourceScannerResult<String> {
        let root = source_path.to_owned();
        tokio::task::spawn_blocking(move || {
            let dir = open_root(&root)?;
            read_file(&dir, &root, DEPLOY_SQL)
        })
        .await
        .map_err(join_error)?
    }
}

fn open_root(root: &Utf8Path) -> SourceScannerResult<Dir> {
    Dir::open_ambient_dir(root, ambient_authority()).map_err(|source| CatalogError::Io {
        path: root.to_string(),
        source,
    })
}

fn read_file(dir: &Dir, context: &Utf8Path, name: &str) -> SourceScannerResult<String> {
    dir.read_to_string(name).map_err(|source| {
        let path = context.join(name).into_string();
        if source.kind() == std::io::ErrorKind::InvalidData {
            CatalogError::NonUtf8 { path }
        } else if source.kind() == std::io::ErrorKind::NotFound && name == DEPLOY_SQL {
            CatalogError::MissingDeploySql {
                path: context.to_string(),
            }
        } else {
            CatalogError::Io { path, source }
        }
    })
}

fn walk(dir: &Dir, prefix: &str, files: &mut Vec<ScannedFile>) -> SourceScannerResult<()> {
    let mut names: Vec<(String, bool)> = Vec::new();
    let entries = dir.entries().map_err(|source| CatalogError::Io {
        path: prefix.to_owned(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| CatalogError::Io {
            path: prefix.to_owned(),
            source,
        })?;
        let name = entry.file_name().map_err(|source| CatalogError::Io {
            path: prefix.to_owned(),
            source,
        })?;
        let file_type = entry.file_type().map_err(|source| CatalogError::Io {
            path: format!("{prefix}{name}"),
            source,
        })?;
        names.push((name, file_type.is_dir()));
    }
    names.sort();

    for (name, is_dir) in names {
        let relative = format!("{prefix}{name}");
        if is_dir {
            let child = dir.open_dir(&name).map_err(|source| CatalogError::Io {
                path: relative.clone(),
                source,
            })?;
            walk(&child, &format!("{relative}/"), files)?;
        } else {
            if prefix.is_empty() && name == DEPLOY_SQL {
                continue;
            }
            let content = read_file(dir, Utf8Path::new(prefix), &name)?;
            let metadata = FileMetadata::parse(&relative, &content)?;
            let mut file = ScannedFile::new(&relative, content)?;
            if let Some(block) = metadata {
                file = file.with_metadata(block);
            }
            files.push(file);
        }
    }
    Ok(())
}

fn join_error(err: tokio::task::JoinError) -> CatalogError {
    CatalogError::Io {
        path: String::new(),
        source: std::io::Error::other(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[tokio::test(flavor = "multi_thread")]
    async fn scan_orders_files_and_skips_the_root_script() {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 temp dir");
        std::fs::write(root.join("deploy.sql"), "SELECT 1;").expect("write deploy.sql");
        std::fs::create_dir_all(root.join("b")).expect("mkdir b");
        std::fs::write(root.join("b/one.sql"), "SELECT 1;").expect("write b/one.sql");
        std::fs::write(root.join("a.sql"), "SELECT 2;").expect("write a.sql");

        let scanner = FsSourceScanner::new();
        scanner
            .validate_deploy_sql(&root)
            .await
            .expect("deploy.sql present");
        let scan = scanner.scan_directory(&root).await.expect("scan succeeds");

        let paths: Vec<&str> = scan.files().iter().map(ScannedFile::path).collect();
        assert_eq!(paths, vec!["./a.sql", "./b/one.sql"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_root_script_is_a_distinct_error() {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 temp dir");

        let scanner = FsSourceScanner::new();
        let err = scanner
            .validate_deploy_sql(&root)
            .await
            .expect_err("must fail");
        assert!(matches!(err, CatalogError::MissingDeploySql { .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn metadata_blocks_are_attached_to_their_files() {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 temp dir");
        std::fs::write(root.join("deploy.sql"), "SELECT 1;").expect("write deploy.sql");
        std::fs::write(
            root.join("users.sql"),
            "-- pgmi-meta: {\"sort_keys\": [\"010\"], \"idempotent\": true}\nCREATE TABLE users();",
        )
        .expect("write users.sql");

        let scanner = FsSourceScanner::new();
        let scan = scanner.scan_directory(&root).await.expect("scan succeeds");
        let file = scan.files().first().expect("one file");
        let metadata = file.metadata().expect("metadata attached");
        assert!(metadata.idempotent);
        assert_eq!(metadata.sort_keys, vec!["010".to_owned()]);
    }
}
