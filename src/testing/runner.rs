//! Test runner.
//!
//! Reuses session assembly, queries the filtered plan, and drives it step
//! by step inside one transaction on the pinned connection. The
//! transaction is always rolled back, so a test run leaves no trace in
//! the target database; savepoints give each directory and test the same
//! isolation the generated macro SQL provides. Execution is fail-fast:
//! the first failing script aborts the run with its path.

use crate::deploy::TestConfig;
use crate::deploy::ports::Logger;
use crate::error::{EngineError, EngineResult};
use crate::session::ports::ConnectorFactory;
use crate::session::{PrepareSession, SessionError, SessionManager, SessionResult};
use crate::catalog::ports::SourceScanner;
use crate::testing::plan::{TestPlanStep, TestStepKind, classify_plan_error, query_plan};
use chrono::{DateTime, Utc};
use diesel::RunQueryDsl;
use diesel::connection::{AnsiTransactionManager, SimpleConnection, TransactionManager};
use diesel::pg::PgConnection;
use diesel::sql_query;
use diesel::sql_types::Text;
use mockable::{Clock, DefaultClock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Outcome of a test run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRunReport {
    /// Target database.
    pub database: String,
    /// Steps executed (or listed, in list mode).
    pub steps_executed: usize,
    /// Test steps that completed.
    pub tests_passed: usize,
    /// Whether this was a list-only run.
    pub listed: bool,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

/// Test entry point wired from injected collaborators.
pub struct TestRunner<S, C, K = DefaultClock> {
    sessions: SessionManager<S, C>,
    logger: Arc<dyn Logger>,
    clock: Arc<K>,
}

impl<S, C, K> TestRunner<S, C, K>
where
    S: SourceScanner,
    C: ConnectorFactory,
    K: Clock + Send + Sync,
{
    /// Wires a test runner.
    #[must_use]
    pub fn new(
        scanner: Arc<S>,
        connector: Arc<C>,
        logger: Arc<dyn Logger>,
        clock: Arc<K>,
    ) -> Self {
        Self {
            sessions: SessionManager::new(scanner, connector),
            logger,
            clock,
        }
    }

    /// Runs (or lists) the filtered test plan.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidPattern`] for a bad filter,
    /// [`EngineError::TestFailed`] naming the first failing script, and
    /// [`EngineError::Cancelled`] when the token fires between steps.
    pub async fn execute(
        &self,
        config: TestConfig,
        cancel: &CancellationToken,
    ) -> EngineResult<TestRunReport> {
        let started_at = self.clock.utc();
        config.validate()?;
        let parameters = config.validated_parameters()?;

        let request = PrepareSession::new(
            config.connection().clone(),
            config.database(),
            config.source_path().clone(),
        )
        .with_parameters(parameters)
        .verbose(config.is_verbose());
        let mut session = self.sessions.prepare(request, cancel).await?;

        let pattern = config.filter().map(str::to_owned);
        let pattern_for_query = pattern.clone();
        let plan_result = session
            .conn_mut()
            .run(move |conn| query_plan(conn, pattern_for_query.as_deref()))
            .await
            .map_err(|err| classify_plan_error(err, pattern.as_deref()));
        let plan = match plan_result {
            Ok(steps) => steps,
            Err(err) => {
                session.close();
                return Err(err);
            }
        };

        let outcome = if config.is_list_only() {
            Ok(self.list(&plan))
        } else {
            self.run_plan(&mut session, plan, cancel).await
        };
        session.close();
        let (steps_executed, tests_passed, listed) = outcome?;

        Ok(TestRunReport {
            database: config.database().to_owned(),
            steps_executed,
            tests_passed,
            listed,
            started_at,
            finished_at: self.clock.utc(),
        })
    }

    /// List mode: print `ordinal | kind | path` rows, run nothing.
    fn list(&self, plan: &[TestPlanStep]) -> (usize, usize, bool) {
        for step in plan {
            let path = step.script_path.as_deref().unwrap_or(&step.directory);
            self.logger
                .info(&format!("{:>4} | {:<8} | {}", step.ordinal, step.kind, path));
        }
        (plan.len(), 0, true)
    }

    /// Execute mode: drive the plan inside an always-rolled-back
    /// transaction.
    async fn run_plan(
        &self,
        session: &mut crate::session::Session,
        plan: Vec<TestPlanStep>,
        cancel: &CancellationToken,
    ) -> EngineResult<(usize, usize, bool)> {
        let step_cancel = cancel.clone();
        let outcome = session
            .conn_mut()
            .run(move |conn| {
                AnsiTransactionManager::begin_transaction(conn).map_err(|source| {
                    SessionError::database("opening the test transaction", source)
                })?;
                let drove = drive_steps(conn, &plan, &step_cancel);
                let rolled_back =
                    AnsiTransactionManager::rollback_transaction(conn).map_err(|source| {
                        SessionError::database("rolling back the test transaction", source)
                    });
                match (drove, rolled_back) {
                    (Ok(outcome), Ok(())) => Ok(outcome),
                    (Ok(_), Err(err)) | (Err(err), _) => Err(err),
                }
            })
            .await;

        match outcome {
            Ok(RunOutcome::Completed { steps, tests }) => {
                self.logger
                    .info(&format!("{tests} test(s) passed, all effects rolled back"));
                Ok((steps, tests, false))
            }
            Ok(RunOutcome::Failed { path, source }) => {
                self.logger.error(&format!("test {path} failed"));
                Err(EngineError::TestFailed {
                    path,
                    source: SessionError::database("executing a test script", source),
                })
            }
            Ok(RunOutcome::Cancelled { during }) => Err(EngineError::Cancelled { during }),
            Err(err) => Err(err.into()),
        }
    }
}

/// What happened inside the test transaction.
enum RunOutcome {
    Completed { steps: usize, tests: usize },
    Failed {
        path: String,
        source: diesel::result::Error,
    },
    Cancelled { during: String },
}

#[derive(diesel::QueryableByName)]
struct ContentRow {
    #[diesel(sql_type = Text)]
    content: String,
}

/// Drives plan steps with per-directory and per-test savepoints.
///
/// Step failures become a [`RunOutcome::Failed`] carrying the script path
/// (or the directory for teardown steps); only infrastructure failures of
/// the transaction itself surface as `Err`.
fn drive_steps(
    conn: &mut PgConnection,
    plan: &[TestPlanStep],
    cancel: &CancellationToken,
) -> SessionResult<RunOutcome> {
    let mut directory_savepoints: HashMap<String, String> = HashMap::new();
    let mut test_savepoints: HashMap<String, String> = HashMap::new();
    let mut counter = 0_usize;
    let mut steps = 0_usize;
    let mut tests = 0_usize;

    for step in plan {
        if cancel.is_cancelled() {
            return Ok(RunOutcome::Cancelled {
                during: format!("before test step {}", step.ordinal),
            });
        }

        let attribution = step
            .script_path
            .clone()
            .unwrap_or_else(|| step.directory.clone());
        let result = run_step(
            conn,
            step,
            &mut directory_savepoints,
            &mut test_savepoints,
            &mut counter,
        );
        if let Err(source) = result {
            return Ok(RunOutcome::Failed {
                path: attribution,
                source,
            });
        }
        steps += 1;
        if step.kind == TestStepKind::Test {
            tests += 1;
        }
    }

    Ok(RunOutcome::Completed { steps, tests })
}

fn run_step(
    conn: &mut PgConnection,
    step: &TestPlanStep,
    directory_savepoints: &mut HashMap<String, String>,
    test_savepoints: &mut HashMap<String, String>,
    counter: &mut usize,
) -> Result<(), diesel::result::Error> {
    match step.kind {
        TestStepKind::Fixture => {
            let savepoint = next_savepoint(counter);
            conn.batch_execute(&format!("SAVEPOINT {savepoint}"))?;
            directory_savepoints.insert(step.directory.clone(), savepoint);
            execute_script(conn, step)?;
        }
        TestStepKind::Test => {
            if !directory_savepoints.contains_key(&step.directory) {
                let savepoint = next_savepoint(counter);
                conn.batch_execute(&format!("SAVEPOINT {savepoint}"))?;
                directory_savepoints.insert(step.directory.clone(), savepoint);
            }
            if !test_savepoints.contains_key(&step.directory) {
                let savepoint = next_savepoint(counter);
                conn.batch_execute(&format!("SAVEPOINT {savepoint}"))?;
                test_savepoints.insert(step.directory.clone(), savepoint);
            }
            let result = execute_script(conn, step);
            // Roll back to the test savepoint whether the script passed
            // or not; a failed savepoint rollback masks nothing because
            // the original error is returned first below.
            if let Some(savepoint) = test_savepoints.get(&step.directory) {
                let rollback = conn.batch_execute(&format!("ROLLBACK TO SAVEPOINT {savepoint}"));
                result?;
                rollback?;
            } else {
                result?;
            }
        }
        TestStepKind::Teardown => {
            if let Some(savepoint) = directory_savepoints.remove(&step.directory) {
                conn.batch_execute(&format!(
                    "ROLLBACK TO SAVEPOINT {savepoint}; RELEASE SAVEPOINT {savepoint}"
                ))?;
            }
            test_savepoints.remove(&step.directory);
        }
    }
    Ok(())
}

fn execute_script(
    conn: &mut PgConnection,
    step: &TestPlanStep,
) -> Result<(), diesel::result::Error> {
    let Some(path) = step.script_path.as_deref() else {
        return Ok(());
    };
    let row: ContentRow = sql_query("SELECT content FROM __pgmi_test_source WHERE path = $1")
        .bind::<Text, _>(path)
        .get_result(conn)?;
    conn.batch_execute(&row.content)
}

fn next_savepoint(counter: &mut usize) -> String {
    *counter += 1;
    format!("pgmi_sp_{counter}")
}
