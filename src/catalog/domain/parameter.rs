//! Deployment parameters.
//!
//! Parameters are key/value pairs surfaced to `deploy.sql` both as rows in
//! the session catalog and as `pgmi.<key>` runtime settings. Keys are
//! validated before any database write and lowercased on load.

use super::{CatalogError, CatalogResult};
use std::fmt;

/// Maximum size of a parameter value in bytes.
pub const MAX_PARAMETER_VALUE_BYTES: usize = 8192;

/// Maximum length of a parameter key in characters.
pub const MAX_PARAMETER_KEY_CHARS: usize = 63;

/// Closed set of parameter type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterType {
    /// Free-form text (the default).
    #[default]
    Text,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    Bigint,
    /// Arbitrary-precision numeric.
    Numeric,
    /// Boolean.
    Boolean,
    /// UUID.
    Uuid,
    /// Timestamp without time zone.
    Timestamp,
    /// Timestamp with time zone.
    Timestamptz,
    /// SQL identifier (`name`).
    Name,
}

impl ParameterType {
    /// The tag stored in the session catalog.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Int => "int",
            Self::Bigint => "bigint",
            Self::Numeric => "numeric",
            Self::Boolean => "boolean",
            Self::Uuid => "uuid",
            Self::Timestamp => "timestamp",
            Self::Timestamptz => "timestamptz",
            Self::Name => "name",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated deployment parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    key: String,
    value: String,
    type_tag: ParameterType,
    required: bool,
    default: Option<String>,
    description: Option<String>,
}

impl Parameter {
    /// Creates a parameter, validating the key and value size.
    ///
    /// The key keeps its original case here; it is lowercased when loaded
    /// into the session.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidParameterKey`] or
    /// [`CatalogError::ParameterValueTooLong`].
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> CatalogResult<Self> {
        let key = key.into();
        let value = value.into();
        validate_parameter_key(&key)?;
        if value.len() > MAX_PARAMETER_VALUE_BYTES {
            return Err(CatalogError::ParameterValueTooLong {
                key,
                actual: value.len(),
                limit: MAX_PARAMETER_VALUE_BYTES,
            });
        }
        Ok(Self {
            key,
            value,
            type_tag: ParameterType::default(),
            required: false,
            default: None,
            description: None,
        })
    }

    /// Sets the type tag.
    #[must_use]
    pub const fn with_type(mut self, type_tag: ParameterType) -> Self {
        self.type_tag = type_tag;
        self
    }

    /// Marks the parameter required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Sets the human description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The key as supplied.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The key lowercased, as stored in the session.
    #[must_use]
    pub fn key_lower(&self) -> String {
        self.key.to_ascii_lowercase()
    }

    /// The value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The type tag.
    #[must_use]
    pub const fn type_tag(&self) -> ParameterType {
        self.type_tag
    }

    /// Whether the parameter is required.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// The default value, when declared.
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// The description, when declared.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Validates a parameter key against `^[A-Za-z0-9_]{1,63}$`.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidParameterKey`] on mismatch.
pub fn validate_parameter_key(key: &str) -> CatalogResult<()> {
    let valid = !key.is_empty()
        && key.chars().count() <= MAX_PARAMETER_KEY_CHARS
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CatalogError::InvalidParameterKey {
            key: key.to_owned(),
        })
    }
}
