//! Logger adapters.

use crate::deploy::ports::Logger;
use std::sync::Mutex;

/// Production logger emitting `tracing` events under the `pgmi` target.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    verbose_enabled: bool,
}

impl TracingLogger {
    /// Creates a logger; verbose output is emitted only when enabled.
    #[must_use]
    pub const fn new(verbose_enabled: bool) -> Self {
        Self { verbose_enabled }
    }
}

impl Logger for TracingLogger {
    fn verbose(&self, message: &str) {
        if self.verbose_enabled {
            tracing::debug!(target: "pgmi", "{message}");
        }
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "pgmi", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "pgmi", "{message}");
    }
}

/// Logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn verbose(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Logger double recording every line for assertions.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

/// Level of a recorded line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Verbose detail.
    Verbose,
    /// Normal progress.
    Info,
    /// Failure output.
    Error,
}

impl RecordingLogger {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded lines, in order.
    #[must_use]
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Recorded messages at one level.
    #[must_use]
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    fn record(&self, level: LogLevel, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_owned()));
        }
    }
}

impl Logger for RecordingLogger {
    fn verbose(&self, message: &str) {
        self.record(LogLevel::Verbose, message);
    }

    fn info(&self, message: &str) {
        self.record(LogLevel::Info, message);
    }

    fn error(&self, message: &str) {
        self.record(LogLevel::Error, message);
    }
}
