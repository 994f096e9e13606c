//! `pgmi_test` macro detection.
//!
//! Detects invocations syntactically equivalent to
//! `CALL [schema.]pgmi_test([NULL | 'pattern' [, 'callback']])[;]` in
//! comment-stripped SQL. Keywords are case-insensitive and arbitrary
//! whitespace, including newlines, may separate tokens.

use regex::Regex;
use std::sync::LazyLock;

/// The macro name recognized in `deploy.sql`.
pub const MACRO_NAME: &str = "pgmi_test";

static INVOCATION_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    #[expect(clippy::unwrap_used, reason = "the pattern is a tested compile-time constant")]
    Regex::new(r"(?i)\bcall\s+(?:[a-z_][a-z0-9_]*\s*\.\s*)?pgmi_test\s*\(").unwrap()
});

/// A located macro invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroInvocation {
    /// Test filter pattern; empty when omitted or given as `NULL`.
    pub pattern: String,
    /// Callback function name; empty when omitted.
    pub callback: String,
    /// Byte offset of the first character of the invocation.
    pub start: usize,
    /// Byte offset one past the last character (the `)` or trailing `;`).
    pub end: usize,
    /// 1-based line of the start offset.
    pub line: u32,
    /// 1-based byte column of the start offset.
    pub column: u32,
    /// The exact invocation text, as it appears in the scanned input.
    pub text: String,
}

/// Finds every macro invocation, in ascending start-offset order.
///
/// The input must already be comment-stripped; candidates whose argument
/// list does not take one of the recognized shapes are skipped.
#[must_use]
pub fn find_invocations(sql: &str) -> Vec<MacroInvocation> {
    let mut found = Vec::new();
    for head in INVOCATION_HEAD.find_iter(sql) {
        let Some(args) = parse_arguments(sql, head.end()) else {
            continue;
        };
        let end = consume_terminator(sql, args.close_paren_end);
        let (line, column) = line_and_column(sql, head.start());
        found.push(MacroInvocation {
            pattern: args.pattern,
            callback: args.callback,
            start: head.start(),
            end,
            line,
            column,
            text: sql.get(head.start()..end).unwrap_or_default().to_owned(),
        });
    }
    found
}

struct ParsedArguments {
    pattern: String,
    callback: String,
    close_paren_end: usize,
}

/// Parses the argument list starting just past the opening parenthesis.
fn parse_arguments(sql: &str, mut i: usize) -> Option<ParsedArguments> {
    let bytes = sql.as_bytes();
    i = skip_whitespace(bytes, i);

    if byte_at(bytes, i) == b')' {
        return Some(ParsedArguments {
            pattern: String::new(),
            callback: String::new(),
            close_paren_end: i + 1,
        });
    }

    let (pattern, after_first) = if is_null_keyword(bytes, i) {
        (String::new(), i + 4)
    } else {
        parse_quoted(sql, i)?
    };

    i = skip_whitespace(bytes, after_first);
    if byte_at(bytes, i) == b')' {
        return Some(ParsedArguments {
            pattern,
            callback: String::new(),
            close_paren_end: i + 1,
        });
    }
    if byte_at(bytes, i) != b',' {
        return None;
    }

    i = skip_whitespace(bytes, i + 1);
    let (callback, after_second) = parse_quoted(sql, i)?;
    i = skip_whitespace(bytes, after_second);
    if byte_at(bytes, i) != b')' {
        return None;
    }

    Some(ParsedArguments {
        pattern,
        callback,
        close_paren_end: i + 1,
    })
}

/// Parses a single-quoted string at `i`, unescaping `''`.
///
/// Returns the content and the offset one past the closing quote.
fn parse_quoted(sql: &str, i: usize) -> Option<(String, usize)> {
    let bytes = sql.as_bytes();
    if byte_at(bytes, i) != b'\'' {
        return None;
    }
    let mut content = String::new();
    let mut j = i + 1;
    while j < bytes.len() {
        if byte_at(bytes, j) == b'\'' {
            if byte_at(bytes, j + 1) == b'\'' {
                content.push('\'');
                j += 2;
            } else {
                return Some((content, j + 1));
            }
        } else {
            let rest = sql.get(j..)?;
            let ch = rest.chars().next()?;
            content.push(ch);
            j += ch.len_utf8();
        }
    }
    None
}

/// Includes a trailing `;` in the invocation, when one follows.
fn consume_terminator(sql: &str, close_paren_end: usize) -> usize {
    let bytes = sql.as_bytes();
    let i = skip_whitespace(bytes, close_paren_end);
    if byte_at(bytes, i) == b';' {
        i + 1
    } else {
        close_paren_end
    }
}

fn is_null_keyword(bytes: &[u8], i: usize) -> bool {
    let matches_null = bytes
        .get(i..i + 4)
        .is_some_and(|word| word.eq_ignore_ascii_case(b"null"));
    let next = byte_at(bytes, i + 4);
    matches_null && !(next.is_ascii_alphanumeric() || next == b'_')
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while byte_at(bytes, i).is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn byte_at(bytes: &[u8], index: usize) -> u8 {
    bytes.get(index).copied().unwrap_or(0)
}

fn line_and_column(sql: &str, offset: usize) -> (u32, u32) {
    let prefix = sql.get(..offset).unwrap_or_default();
    let line = u32::try_from(prefix.matches('\n').count()).unwrap_or(u32::MAX - 1) + 1;
    let line_start = prefix.rfind('\n').map_or(0, |pos| pos + 1);
    let column = u32::try_from(offset - line_start).unwrap_or(u32::MAX - 1) + 1;
    (line, column)
}
