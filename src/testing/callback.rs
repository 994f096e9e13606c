//! Callback-name validation.
//!
//! A callback is invoked by interpolating its name into generated SQL, so
//! the name is restricted to `identifier` or `identifier.identifier`
//! before it ever reaches the generator.

use crate::error::{EngineError, EngineResult};

const MAX_IDENTIFIER_CHARS: usize = 63;

/// Validates a test callback name.
///
/// # Errors
///
/// Returns [`EngineError::InvalidCallbackName`] unless the name is one or
/// two dot-separated identifiers matching `^[A-Za-z_][A-Za-z0-9_]*$`,
/// each at most 63 characters.
pub fn validate_callback_name(name: &str) -> EngineResult<()> {
    let mut parts = name.split('.');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(first), None, None) => is_identifier(first),
        (Some(first), Some(second), None) => is_identifier(first) && is_identifier(second),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(EngineError::InvalidCallbackName {
            name: name.to_owned(),
        })
    }
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && part.chars().count() <= MAX_IDENTIFIER_CHARS
}
