//! Internal session schema installation.

use super::{NAMESPACE, SessionError, SessionResult};
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;

const SCHEMA_TEMPLATE: &str = include_str!("sql/schema.sql");

/// Renders an embedded DDL template with the engine namespace.
pub(crate) fn render_ddl(template: &str) -> SessionResult<String> {
    let env = minijinja::Environment::new();
    env.render_str(template, minijinja::context! { ns => NAMESPACE })
        .map_err(|source| SessionError::Template { source })
}

/// The rendered internal schema DDL.
///
/// # Errors
///
/// Returns [`SessionError::Template`] when rendering fails.
pub fn ddl() -> SessionResult<String> {
    render_ddl(SCHEMA_TEMPLATE)
}

/// Installs the internal tables, constraints, and helper routines.
///
/// Must run once per connection, before any catalog load; the register
/// and plan routines live here and the loader depends on them.
///
/// # Errors
///
/// Returns [`SessionError::Database`] when any statement fails.
pub fn install(conn: &mut PgConnection) -> SessionResult<()> {
    let rendered = ddl()?;
    conn.batch_execute(&rendered)
        .map_err(|source| SessionError::database("installing the session schema", source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_schema_carries_the_namespace_everywhere() {
        let rendered = ddl().expect("template renders");
        assert!(rendered.contains("__pgmi_source_file"));
        assert!(rendered.contains("pg_temp.pgmi_register_file"));
        assert!(rendered.contains("pg_temp.pgmi_test_plan"));
        assert!(!rendered.contains("{{"), "unrendered placeholder left behind");
    }

    #[test]
    fn plan_helpers_are_all_present() {
        let rendered = ddl().expect("template renders");
        for routine in [
            "pgmi_plan_command",
            "pgmi_plan_do",
            "pgmi_plan_file",
            "pgmi_plan_notice",
            "pgmi_declare_param",
            "pgmi_get_param",
            "pgmi_validate_pattern",
            "pgmi_has_tests",
        ] {
            assert!(rendered.contains(routine), "missing routine {routine}");
        }
    }
}
