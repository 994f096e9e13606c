//! Structured file metadata blocks.
//!
//! A source file may open with a single-line header comment of the form
//!
//! ```sql
//! -- pgmi-meta: {"id": "6f9…", "idempotent": true, "sort_keys": ["010"], "description": "users"}
//! ```
//!
//! whose JSON payload becomes a `(id, idempotent, sort_keys, description)`
//! row attached to the file in the session catalog. A file with several
//! sort keys appears once per key in the deployment plan, which permits
//! multi-phase scheduling of a single file.

use super::{CatalogError, CatalogResult, path};
use serde::Deserialize;
use uuid::Uuid;

/// Comment prefix introducing a metadata block.
pub const METADATA_PREFIX: &str = "-- pgmi-meta:";

/// Structured metadata attached to a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Stable identifier for the file across deployments.
    ///
    /// When the block omits `id`, it is derived from the file's canonical
    /// path (a name-based UUID), so repeated scans of the same file agree.
    pub id: Uuid,
    /// Whether re-running the file is safe.
    pub idempotent: bool,
    /// Ordered sort keys scheduling the file in the deployment plan.
    pub sort_keys: Vec<String>,
    /// Human description.
    pub description: Option<String>,
}

/// Raw shape of the JSON payload; every field is optional in the block.
#[derive(Deserialize)]
struct MetadataBlock {
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(default)]
    idempotent: bool,
    #[serde(default)]
    sort_keys: Vec<String>,
    #[serde(default)]
    description: Option<String>,
}

impl FileMetadata {
    /// Parses the metadata block from a file's content, when present.
    ///
    /// Only the first non-empty line is considered; metadata anywhere else
    /// in the file is treated as an ordinary comment.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidMetadataBlock`] when the header is
    /// present but its payload is not valid JSON or a sort key is empty.
    pub fn parse(path: &str, content: &str) -> CatalogResult<Option<Self>> {
        let Some(first_line) = content.lines().find(|line| !line.trim().is_empty()) else {
            return Ok(None);
        };
        let Some(payload) = first_line.trim().strip_prefix(METADATA_PREFIX) else {
            return Ok(None);
        };
        let block: MetadataBlock = serde_json::from_str(payload.trim()).map_err(|err| {
            CatalogError::InvalidMetadataBlock {
                path: path.to_owned(),
                reason: err.to_string(),
            }
        })?;
        if block.sort_keys.iter().any(|key| key.trim().is_empty()) {
            return Err(CatalogError::InvalidMetadataBlock {
                path: path.to_owned(),
                reason: "sort keys must be non-empty".to_owned(),
            });
        }
        Ok(Some(Self {
            id: block.id.unwrap_or_else(|| path_derived_id(path)),
            idempotent: block.idempotent,
            sort_keys: block.sort_keys,
            description: block.description,
        }))
    }
}

/// Name-based UUID over the canonical path.
fn path_derived_id(raw_path: &str) -> Uuid {
    let canonical = path::normalize(raw_path).unwrap_or_else(|_| raw_path.to_owned());
    Uuid::new_v5(&Uuid::NAMESPACE_OID, canonical.as_bytes())
}
