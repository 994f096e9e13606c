//! Macro expansion in `deploy.sql`.
//!
//! Comments are stripped for detection only; expansions are spliced into
//! the original text by locating each invocation's exact byte range. The
//! output is rebuilt in one forward pass with a moving cursor, which is
//! offset-safe for the same reason reverse-offset patching is: no splice
//! ever shifts a range that is still to be located.

use crate::error::{EngineError, EngineResult};
use crate::script::{MacroInvocation, SourceMap, find_invocations, lexer};
use crate::session::{Session, SessionError};
use crate::testing::callback::validate_callback_name;
use crate::testing::classify_plan_error;
use diesel::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::{Nullable, Text};

/// `deploy.sql` after macro expansion.
#[derive(Debug)]
pub(crate) struct ExpandedScript {
    /// The script to execute.
    pub sql: String,
    /// Attribution from expanded lines back to macro invocation sites.
    pub map: SourceMap,
    /// Number of expansions performed.
    pub expansions: usize,
}

#[derive(diesel::QueryableByName)]
struct GeneratedSqlRow {
    #[diesel(sql_type = Text)]
    generated: String,
}

/// Expands every `pgmi_test` macro through the server-side generator.
///
/// Callback names are validated before any generation; the server is then
/// the single source of truth for the emitted test SQL.
pub(crate) async fn expand_macros(
    session: &mut Session,
    deploy_sql: &str,
    deploy_path: &str,
) -> EngineResult<ExpandedScript> {
    let stripped = lexer::strip(deploy_sql);
    let invocations = find_invocations(&stripped);
    if invocations.is_empty() {
        return Ok(ExpandedScript {
            sql: deploy_sql.to_owned(),
            map: SourceMap::new(),
            expansions: 0,
        });
    }

    for invocation in &invocations {
        if !invocation.callback.is_empty() {
            validate_callback_name(&invocation.callback)?;
        }
    }

    let mut expansions = Vec::with_capacity(invocations.len());
    for invocation in &invocations {
        let pattern = (!invocation.pattern.is_empty()).then(|| invocation.pattern.clone());
        let callback = (!invocation.callback.is_empty()).then(|| invocation.callback.clone());
        let pattern_for_error = pattern.clone();

        let generated = session
            .conn_mut()
            .run(move |conn| {
                let row: GeneratedSqlRow =
                    sql_query("SELECT pg_temp.pgmi_generate_test_sql($1, $2) AS generated")
                        .bind::<Nullable<Text>, _>(pattern)
                        .bind::<Nullable<Text>, _>(callback)
                        .get_result(conn)
                        .map_err(|source| {
                            SessionError::database("generating test SQL", source)
                        })?;
                Ok(row.generated)
            })
            .await
            .map_err(|err| classify_plan_error(err, pattern_for_error.as_deref()))?;
        expansions.push(generated);
    }

    splice_expansions(deploy_sql, &invocations, &expansions, deploy_path)
}

/// Splices generated SQL over each invocation in the original script.
pub(crate) fn splice_expansions(
    original: &str,
    invocations: &[MacroInvocation],
    expansions: &[String],
    deploy_path: &str,
) -> EngineResult<ExpandedScript> {
    let mut out = String::with_capacity(original.len());
    let mut map = SourceMap::new();
    let mut cursor = 0_usize;
    let mut lines_emitted = 0_usize;

    for (invocation, expansion) in invocations.iter().zip(expansions) {
        let tail = original.get(cursor..).unwrap_or_default();
        let Some(relative) = tail.find(&invocation.text) else {
            return Err(EngineError::MacroExpansion {
                message: format!(
                    "could not locate the invocation from line {} of {deploy_path} \
                     in the original script",
                    invocation.line
                ),
            });
        };

        let prefix = tail.get(..relative).unwrap_or_default();
        lines_emitted += prefix.matches('\n').count();
        out.push_str(prefix);

        let start_line = line_number(lines_emitted);
        let expansion_newlines = expansion.matches('\n').count();
        lines_emitted += expansion_newlines;
        out.push_str(expansion);
        map.add(
            start_line,
            line_number(lines_emitted),
            deploy_path,
            invocation.line,
            describe(invocation),
        );

        cursor += relative + invocation.text.len();
    }

    out.push_str(original.get(cursor..).unwrap_or_default());
    Ok(ExpandedScript {
        sql: out,
        map,
        expansions: invocations.len(),
    })
}

fn line_number(newlines_before: usize) -> u32 {
    u32::try_from(newlines_before).unwrap_or(u32::MAX - 1) + 1
}

fn describe(invocation: &MacroInvocation) -> String {
    if invocation.pattern.is_empty() {
        "pgmi_test() expansion".to_owned()
    } else {
        format!("pgmi_test('{}') expansion", invocation.pattern)
    }
}
