//! Test plan step model and the server-side plan query.

use crate::error::EngineError;
use crate::session::{SessionError, SessionResult};
use diesel::RunQueryDsl;
use diesel::pg::PgConnection;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Integer, Nullable, Text};
use std::fmt;

/// Kind of a test plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStepKind {
    /// Directory fixture (`_setup.sql`/`_setup.psql`), run before siblings.
    Fixture,
    /// A test script.
    Test,
    /// Directory teardown: roll back and release the directory savepoint.
    Teardown,
}

impl TestStepKind {
    /// The tag used by the server-side planner.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fixture => "fixture",
            Self::Test => "test",
            Self::Teardown => "teardown",
        }
    }

    fn parse(tag: &str) -> Option<Self> {
        match tag {
            "fixture" => Some(Self::Fixture),
            "test" => Some(Self::Test),
            "teardown" => Some(Self::Teardown),
            _ => None,
        }
    }
}

impl fmt::Display for TestStepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of the pre-order depth-first execution plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPlanStep {
    /// Monotone position in the plan, starting at 1.
    pub ordinal: i64,
    /// Step kind.
    pub kind: TestStepKind,
    /// Script to execute; `None` for teardown steps.
    pub script_path: Option<String>,
    /// Owning test directory.
    pub directory: String,
    /// Depth within the test subtree; the subtree root is 0.
    pub depth: i32,
}

#[derive(diesel::QueryableByName)]
struct TestPlanRow {
    #[diesel(sql_type = BigInt)]
    ordinal: i64,
    #[diesel(sql_type = Text)]
    step_type: String,
    #[diesel(sql_type = Nullable<Text>)]
    script_path: Option<String>,
    #[diesel(sql_type = Text)]
    directory: String,
    #[diesel(sql_type = Integer)]
    depth: i32,
}

/// Queries the filtered test plan on the pinned connection.
///
/// # Errors
///
/// Returns [`SessionError::Database`] on server errors (including invalid
/// filter patterns; see [`classify_plan_error`]) and
/// [`SessionError::Runtime`] if the server emits an unknown step kind.
pub fn query_plan(
    conn: &mut PgConnection,
    pattern: Option<&str>,
) -> SessionResult<Vec<TestPlanStep>> {
    let rows: Vec<TestPlanRow> = sql_query(
        "SELECT ordinal, step_type, script_path, directory, depth \
         FROM pg_temp.pgmi_test_plan($1) ORDER BY ordinal",
    )
    .bind::<Nullable<Text>, _>(pattern)
    .load(conn)
    .map_err(|source| SessionError::database("querying the test plan", source))?;

    rows.into_iter()
        .map(|row| {
            let kind = TestStepKind::parse(&row.step_type).ok_or_else(|| {
                SessionError::Runtime(format!("unknown test step kind: {}", row.step_type))
            })?;
            Ok(TestPlanStep {
                ordinal: row.ordinal,
                kind,
                script_path: row.script_path,
                directory: row.directory,
                depth: row.depth,
            })
        })
        .collect()
}

/// Maps a plan-query failure to the engine taxonomy, turning the server's
/// invalid-pattern raise into the [`EngineError::InvalidPattern`] sentinel.
#[must_use]
pub fn classify_plan_error(err: SessionError, pattern: Option<&str>) -> EngineError {
    if let SessionError::Database {
        source: diesel::result::Error::DatabaseError(_, info),
        ..
    } = &err
    {
        if info.message().contains("Invalid regex pattern") {
            return EngineError::InvalidPattern {
                pattern: pattern.unwrap_or_default().to_owned(),
                hint: info.hint().unwrap_or_default().to_owned(),
            };
        }
    }
    err.into()
}
