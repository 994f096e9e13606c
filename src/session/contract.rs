//! Versioned public API contract.
//!
//! The contract DDL is embedded in the binary; exactly one version is the
//! latest and an empty version argument selects it. Unknown versions fail
//! predictably, listing what this binary was built with.

use super::schema::render_ddl;
use super::{SessionError, SessionResult};
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;

const CONTRACT_V1: &str = include_str!("sql/contract_v1.sql");

/// The version selected by an empty version argument.
pub const LATEST_VERSION: &str = "1";

/// Versions built into this binary.
#[must_use]
pub const fn available_versions() -> &'static [&'static str] {
    &["1"]
}

/// Resolves an empty version to the latest.
fn resolve(version: &str) -> &str {
    if version.is_empty() {
        LATEST_VERSION
    } else {
        version
    }
}

/// Returns the rendered DDL for a contract version.
///
/// # Errors
///
/// Returns [`SessionError::UnsupportedApiVersion`] for versions this
/// binary was not built with.
pub fn load(version: &str) -> SessionResult<String> {
    match resolve(version) {
        "1" => render_ddl(CONTRACT_V1),
        other => Err(SessionError::UnsupportedApiVersion {
            requested: other.to_owned(),
            available: available_versions().join(", "),
        }),
    }
}

/// Applies a contract version to the session; returns the applied version.
///
/// Must run after the file catalog is loaded: the deployment-plan view and
/// the test-SQL generator read catalog data.
///
/// # Errors
///
/// Returns [`SessionError::UnsupportedApiVersion`] or
/// [`SessionError::Database`].
pub fn apply(conn: &mut PgConnection, version: &str) -> SessionResult<String> {
    let resolved = resolve(version);
    let rendered = load(resolved)?;
    conn.batch_execute(&rendered)
        .map_err(|source| SessionError::database("applying the API contract", source))?;
    Ok(resolved.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_version_selects_the_latest() {
        let latest = load("").expect("latest loads");
        let explicit = load(LATEST_VERSION).expect("v1 loads");
        assert_eq!(latest, explicit);
    }

    #[test]
    fn unknown_versions_list_the_available_ones() {
        let err = load("99").expect_err("must fail");
        match err {
            SessionError::UnsupportedApiVersion {
                requested,
                available,
            } => {
                assert_eq!(requested, "99");
                assert_eq!(available, "1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn v1_installs_views_and_the_generator() {
        let rendered = load("1").expect("v1 loads");
        for object in [
            "pgmi_source_file",
            "pgmi_parameter",
            "pgmi_test_source",
            "pgmi_test_directory",
            "pgmi_file_metadata",
            "pgmi_deployment_plan",
            "pg_temp.pgmi_generate_test_sql",
            "pg_temp.pgmi_test_event",
        ] {
            assert!(rendered.contains(object), "missing object {object}");
        }
    }
}
