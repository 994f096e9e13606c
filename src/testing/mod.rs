//! Test planning and execution.
//!
//! The plan itself is computed server-side by `pg_temp.pgmi_test_plan`
//! against the session's test catalog; this module carries the client
//! surface: the step model, callback-name validation, and the runner that
//! drives a plan step by step inside a rolled-back transaction.

pub mod callback;
pub mod plan;
mod runner;

pub use plan::{TestPlanStep, TestStepKind, classify_plan_error, query_plan};
pub use runner::{TestRunReport, TestRunner};

#[cfg(test)]
mod tests;
