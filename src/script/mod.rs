//! Lexical analysis of SQL scripts.
//!
//! pgmi does not parse SQL. The only lexical knowledge it carries is what
//! this module implements: recognizing comments, string literals,
//! dollar-quoted bodies, and `pgmi_test` macro invocations, plus mapping
//! lines of an expanded script back to their original sources.

pub mod lexer;
pub mod macros;
mod source_map;

pub use macros::{MACRO_NAME, MacroInvocation, find_invocations};
pub use source_map::{SourceMap, SourceMapEntry};

#[cfg(test)]
mod tests;
