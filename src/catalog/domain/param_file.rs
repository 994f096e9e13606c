//! Parameter-file parsing.
//!
//! One `KEY=VALUE` per line. `#`-prefixed and blank lines are ignored,
//! whitespace around key and value is trimmed, a fully quoted value has its
//! outer quotes stripped, and `=` inside the value is preserved (the line
//! splits on the first `=` only).

use super::{CatalogError, CatalogResult};

/// Parses parameter-file content into ordered `(key, value)` pairs.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidParameterFile`] for a line without `=` or
/// with an empty key, citing the 1-based line number.
pub fn parse(content: &str) -> CatalogResult<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((raw_key, raw_value)) = line.split_once('=') else {
            return Err(CatalogError::InvalidParameterFile {
                line: index + 1,
                reason: "expected KEY=VALUE".to_owned(),
            });
        };
        let key = raw_key.trim();
        if key.is_empty() {
            return Err(CatalogError::InvalidParameterFile {
                line: index + 1,
                reason: "empty key".to_owned(),
            });
        }
        pairs.push((key.to_owned(), unquote(raw_value.trim()).to_owned()));
    }
    Ok(pairs)
}

fn unquote(value: &str) -> &str {
    let stripped_double = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'));
    let stripped_single = value
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''));
    stripped_double.or(stripped_single).unwrap_or(value)
}
