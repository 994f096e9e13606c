//! Unit tests for test planning and execution.
