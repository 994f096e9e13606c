//! Canonical path form and derived path attributes.
//!
//! Every path stored in the session catalog begins with `./`, uses `/`
//! separators, contains no empty or `..` segments, and nests at most
//! [`MAX_DEPTH`] directories deep. Normalization is a fixed point:
//! `normalize(normalize(p)) == normalize(p)`.

use super::{CatalogError, CatalogResult};

/// Maximum directory depth of a canonical path.
pub const MAX_DEPTH: u32 = 100;

/// Brings a path into canonical form.
///
/// Trims surrounding whitespace, converts `\` to `/`, collapses runs of
/// `/` into one, and prepends `./` when missing.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidPath`] for empty paths, directory paths
/// (trailing `/`), and paths containing `..` segments, and
/// [`CatalogError::PathTooDeep`] past [`MAX_DEPTH`].
pub fn normalize(path: &str) -> CatalogResult<String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::InvalidPath {
            path: path.to_owned(),
            reason: "empty path".to_owned(),
        });
    }

    let mut collapsed = String::with_capacity(trimmed.len() + 2);
    let mut last_was_separator = false;
    for ch in trimmed.chars() {
        let normalized = if ch == '\\' { '/' } else { ch };
        if normalized == '/' {
            if !last_was_separator {
                collapsed.push('/');
            }
            last_was_separator = true;
        } else {
            collapsed.push(normalized);
            last_was_separator = false;
        }
    }

    let rooted = if collapsed.starts_with("./") {
        collapsed
    } else if collapsed.starts_with('/') {
        format!(".{collapsed}")
    } else {
        format!("./{collapsed}")
    };

    if rooted.ends_with('/') {
        return Err(CatalogError::InvalidPath {
            path: path.to_owned(),
            reason: "path names a directory, not a file".to_owned(),
        });
    }
    if rooted.split('/').any(|segment| segment == "..") {
        return Err(CatalogError::InvalidPath {
            path: path.to_owned(),
            reason: "parent-directory segments are not allowed".to_owned(),
        });
    }
    if depth_of(&rooted) > MAX_DEPTH {
        return Err(CatalogError::PathTooDeep {
            path: path.to_owned(),
            limit: MAX_DEPTH,
        });
    }

    Ok(rooted)
}

/// Splits a canonical path into its parts; the first is always `.` and the
/// last is the filename.
#[must_use]
pub fn parts(canonical: &str) -> Vec<&str> {
    canonical.split('/').collect()
}

/// Directory depth of a canonical path: `./a.sql` is 0, `./x/a.sql` is 1.
#[must_use]
pub fn depth_of(canonical: &str) -> u32 {
    let separators = canonical.matches('/').count();
    u32::try_from(separators.saturating_sub(1)).unwrap_or(u32::MAX)
}

/// Filename component of a canonical path.
#[must_use]
pub fn file_name(canonical: &str) -> &str {
    canonical.rsplit('/').next().unwrap_or(canonical)
}

/// Directory component of a canonical path, including the trailing `/`.
#[must_use]
pub fn directory(canonical: &str) -> &str {
    let name_len = file_name(canonical).len();
    canonical
        .get(..canonical.len().saturating_sub(name_len))
        .unwrap_or("./")
}

/// Extension of a canonical path: empty, or `.` followed by alphanumerics.
#[must_use]
pub fn extension(canonical: &str) -> &str {
    let name = file_name(canonical);
    let Some(dot) = name.rfind('.') else {
        return "";
    };
    let candidate = name.get(dot..).unwrap_or("");
    let tail = candidate.get(1..).unwrap_or("");
    if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_alphanumeric()) {
        candidate
    } else {
        ""
    }
}

/// Name of the folder immediately containing the file; `None` at depth 0.
#[must_use]
pub fn parent_folder(canonical: &str) -> Option<&str> {
    let mut segments = canonical.rsplit('/');
    let _file = segments.next();
    segments.next().filter(|segment| *segment != ".")
}
