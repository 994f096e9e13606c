//! Deployment orchestrator.

use super::config::DeploymentConfig;
use super::ports::{Approver, DatabaseManager, Logger};
use super::preprocess::{self, ExpandedScript};
use crate::catalog::ports::SourceScanner;
use crate::error::{EngineError, EngineResult};
use crate::script::SourceMap;
use crate::session::ports::ConnectorFactory;
use crate::session::{PrepareSession, Session, SessionError, SessionManager};
use chrono::{DateTime, Utc};
use diesel::RunQueryDsl;
use diesel::connection::SimpleConnection;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use mockable::{Clock, DefaultClock};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tokio_util::sync::CancellationToken;

/// Commands longer than this are previewed truncated with a `...` suffix.
const COMMAND_PREVIEW_LIMIT: usize = 256;

/// Canonical path of the root script in attribution output.
const DEPLOY_SQL_PATH: &str = "./deploy.sql";

static LINE_IN_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    #[expect(clippy::unwrap_used, reason = "the pattern is a tested compile-time constant")]
    Regex::new(r"(?i)\bline\s+(\d+)").unwrap()
});

/// Outcome of a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReport {
    /// Target database.
    pub database: String,
    /// Number of planned commands executed.
    pub commands_executed: usize,
    /// Public API version the session was prepared with.
    pub api_version: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

/// Deployment entry point wired from injected collaborators.
///
/// Safe for concurrent use across independent configurations; one run at
/// a time per target database, because a session holds exclusive state.
pub struct DeploymentService<S, C, M, A, K = DefaultClock> {
    scanner: Arc<S>,
    sessions: SessionManager<S, C>,
    manager: Arc<M>,
    approver: Arc<A>,
    logger: Arc<dyn Logger>,
    clock: Arc<K>,
}

impl<S, C, M, A, K> DeploymentService<S, C, M, A, K>
where
    S: SourceScanner,
    C: ConnectorFactory,
    M: DatabaseManager,
    A: Approver,
    K: Clock + Send + Sync,
{
    /// Wires a deployment service.
    #[must_use]
    pub fn new(
        scanner: Arc<S>,
        connector: Arc<C>,
        manager: Arc<M>,
        approver: Arc<A>,
        logger: Arc<dyn Logger>,
        clock: Arc<K>,
    ) -> Self {
        Self {
            sessions: SessionManager::new(Arc::clone(&scanner), connector),
            scanner,
            manager,
            approver,
            logger,
            clock,
        }
    }

    /// Runs a deployment.
    ///
    /// # Errors
    ///
    /// Returns the sentinel errors of [`EngineError`]; see the crate
    /// documentation for the taxonomy. No further command is attempted
    /// after the first failure.
    pub async fn deploy(
        &self,
        config: DeploymentConfig,
        cancel: &CancellationToken,
    ) -> EngineResult<DeploymentReport> {
        let started_at = self.clock.utc();
        config.validate()?;
        let parameters = config.validated_parameters()?;
        self.scanner.validate_deploy_sql(config.source_path()).await?;

        self.precondition(&config, cancel).await?;

        check(cancel, "preparing the session")?;
        let request = PrepareSession::new(
            config.connection().clone(),
            config.database(),
            config.source_path().clone(),
        )
        .with_parameters(parameters)
        .verbose(config.is_verbose());
        let mut session = self.sessions.prepare(request, cancel).await?;

        let outcome = self.run_deployment(&mut session, &config, cancel).await;
        let api_version = session.api_version().to_owned();
        session.close();
        let commands_executed = outcome?;

        let finished_at = self.clock.utc();
        self.logger.info(&format!(
            "deployed {} command(s) to {}",
            commands_executed,
            config.database()
        ));
        Ok(DeploymentReport {
            database: config.database().to_owned(),
            commands_executed,
            api_version,
            started_at,
            finished_at,
        })
    }

    /// Precondition workflow against the maintenance database.
    async fn precondition(
        &self,
        config: &DeploymentConfig,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        check(cancel, "connecting to the maintenance database")?;
        let maintenance = self
            .manager
            .connect(config.connection(), config.maintenance_database(), cancel)
            .await
            .map_err(|source| maintenance_error("connecting", source))?;

        let database = config.database();
        let exists = maintenance
            .exists(database)
            .await
            .map_err(|source| maintenance_error("exists check", source))?;

        if config.is_overwrite() && exists {
            let approved = if config.is_force() {
                true
            } else {
                self.approver
                    .request_approval(database)
                    .await
                    .map_err(|source| EngineError::Approval { source })?
            };
            if !approved {
                self.logger
                    .info(&format!("overwrite of {database} was not approved"));
                return Err(EngineError::ApprovalDenied {
                    database: database.to_owned(),
                });
            }
            self.logger.verbose(&format!("dropping database {database}"));
            maintenance
                .terminate_connections(database)
                .await
                .map_err(|source| maintenance_error("terminating connections", source))?;
            maintenance
                .drop_database(database)
                .await
                .map_err(|source| maintenance_error("drop", source))?;
            maintenance
                .create(database)
                .await
                .map_err(|source| maintenance_error("create", source))?;
            self.logger.info(&format!("recreated database {database}"));
        } else if !exists {
            maintenance
                .create(database)
                .await
                .map_err(|source| maintenance_error("create", source))?;
            self.logger.info(&format!("created database {database}"));
        }

        // The handle drops here, closing the maintenance pool before
        // session assembly begins.
        Ok(())
    }

    /// Planning phase followed by the ordered drain of the command queue.
    async fn run_deployment(
        &self,
        session: &mut Session,
        config: &DeploymentConfig,
        cancel: &CancellationToken,
    ) -> EngineResult<usize> {
        let deploy_sql = self.scanner.read_deploy_sql(config.source_path()).await?;

        let ExpandedScript {
            sql: script,
            map,
            expansions,
        } = preprocess::expand_macros(session, &deploy_sql, DEPLOY_SQL_PATH).await?;
        if expansions > 0 {
            self.logger
                .verbose(&format!("expanded {expansions} pgmi_test macro(s)"));
        }

        check(cancel, "executing deploy.sql")?;
        let planning_script = script.clone();
        session
            .conn_mut()
            .run(move |conn| {
                conn.batch_execute(&planning_script)
                    .map_err(|source| SessionError::database("executing deploy.sql", source))
            })
            .await
            .map_err(|err| planning_failure(err, &script, &map))?;

        let rows: Vec<PlanRow> = session
            .conn_mut()
            .run(|conn| {
                sql_query("SELECT ordinal, command FROM __pgmi_plan ORDER BY ordinal")
                    .load(conn)
                    .map_err(|source| SessionError::database("reading the command queue", source))
            })
            .await?;
        self.logger
            .verbose(&format!("{} command(s) planned", rows.len()));

        let mut executed = 0_usize;
        for row in rows {
            check(cancel, &format!("before command {}", row.ordinal))?;
            let command = row.command.clone();
            session
                .conn_mut()
                .run(move |conn| {
                    conn.batch_execute(&command)
                        .map_err(|source| SessionError::database("executing a command", source))
                })
                .await
                .map_err(|err| execution_failure(row.ordinal, &row.command, err))?;
            executed += 1;
        }
        Ok(executed)
    }
}

#[derive(diesel::QueryableByName)]
struct PlanRow {
    #[diesel(sql_type = BigInt)]
    ordinal: i64,
    #[diesel(sql_type = Text)]
    command: String,
}

fn check(cancel: &CancellationToken, during: &str) -> EngineResult<()> {
    if cancel.is_cancelled() {
        Err(EngineError::Cancelled {
            during: during.to_owned(),
        })
    } else {
        Ok(())
    }
}

fn maintenance_error(context: &str, source: SessionError) -> EngineError {
    match source {
        SessionError::Cancelled { during } => EngineError::Cancelled { during },
        other => EngineError::Maintenance {
            context: context.to_owned(),
            source: other,
        },
    }
}

fn planning_failure(err: SessionError, script: &str, map: &SourceMap) -> EngineError {
    let origin = server_line(&err, script).and_then(|line| {
        map.resolve(line)
            .map(|(file, original, description)| format!("{file}:{original} ({description})"))
    });
    EngineError::PlanningFailed {
        origin,
        source: err,
    }
}

fn execution_failure(ordinal: i64, command: &str, err: SessionError) -> EngineError {
    EngineError::ExecutionFailed {
        ordinal,
        preview: preview(command),
        server_line: server_line(&err, command),
        origin: None,
        source: err,
    }
}

/// 1-based line of a server error within the executed SQL, from the
/// reported statement position or a `line N` fragment in the message.
fn server_line(err: &SessionError, sql: &str) -> Option<u32> {
    let SessionError::Database {
        source: diesel::result::Error::DatabaseError(_, info),
        ..
    } = err
    else {
        return None;
    };

    if let Some(position) = info.statement_position() {
        let chars_before = usize::try_from(position).unwrap_or(0).saturating_sub(1);
        let newlines = sql
            .chars()
            .take(chars_before)
            .filter(|c| *c == '\n')
            .count();
        return u32::try_from(newlines).ok().map(|n| n + 1);
    }

    LINE_IN_MESSAGE
        .captures(info.message())
        .and_then(|captures| captures.get(1))
        .and_then(|group| group.as_str().parse().ok())
}

/// Bounded preview of a command, truncated on a character boundary.
fn preview(command: &str) -> String {
    let trimmed = command.trim();
    match trimmed.char_indices().nth(COMMAND_PREVIEW_LIMIT) {
        Some((byte_offset, _)) => {
            let mut cut = trimmed.get(..byte_offset).unwrap_or_default().to_owned();
            cut.push_str("...");
            cut
        }
        None => trimmed.to_owned(),
    }
}
