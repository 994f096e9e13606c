//! Comment-aware SQL stripper.
//!
//! [`strip`] removes `--` line comments and nested `/* */` block comments
//! while passing string literals and dollar-quoted bodies through
//! byte-exact. Every newline of the input survives, so the stripped text
//! has exactly the original line structure and stripping is idempotent.

/// Strips comments from SQL.
///
/// A block comment is replaced by a single space (plus its newlines), so
/// adjacent tokens stay separated and re-stripping cannot uncover new
/// comment starts. Line comments are removed up to, not including, their
/// terminating newline.
#[must_use]
pub fn strip(sql: &str) -> String {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut run_start = 0_usize;
    let mut i = 0_usize;

    while i < bytes.len() {
        match byte_at(bytes, i) {
            b'-' if byte_at(bytes, i + 1) == b'-' => {
                push_range(sql, run_start, i, &mut out);
                i = line_comment_end(bytes, i + 2);
                run_start = i;
            }
            b'/' if byte_at(bytes, i + 1) == b'*' => {
                push_range(sql, run_start, i, &mut out);
                out.push(' ');
                i = block_comment_end(bytes, i + 2, &mut out);
                run_start = i;
            }
            b'\'' => {
                i = single_quote_end(bytes, i + 1);
            }
            b'$' => {
                i = match dollar_tag_len(bytes, i) {
                    Some(tag_len) => dollar_quote_end(bytes, i, tag_len),
                    None => i + 1,
                };
            }
            _ => i += 1,
        }
    }

    push_range(sql, run_start, bytes.len(), &mut out);
    out
}

fn byte_at(bytes: &[u8], index: usize) -> u8 {
    bytes.get(index).copied().unwrap_or(0)
}

fn push_range(sql: &str, start: usize, end: usize, out: &mut String) {
    if let Some(chunk) = sql.get(start..end) {
        out.push_str(chunk);
    }
}

/// Scans past a line comment; returns the index of the terminating newline
/// (`\n` or the `\r` of `\r\n`) so the newline itself is preserved.
fn line_comment_end(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() {
        match byte_at(bytes, i) {
            b'\n' => return i,
            b'\r' if byte_at(bytes, i + 1) == b'\n' => return i,
            _ => i += 1,
        }
    }
    i
}

/// Scans past a block comment with nesting; emits newlines encountered
/// inside so the line structure survives.
fn block_comment_end(bytes: &[u8], mut i: usize, out: &mut String) -> usize {
    let mut depth = 1_usize;
    while i < bytes.len() {
        match byte_at(bytes, i) {
            b'*' if byte_at(bytes, i + 1) == b'/' => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            b'/' if byte_at(bytes, i + 1) == b'*' => {
                depth += 1;
                i += 2;
            }
            b'\n' => {
                out.push('\n');
                i += 1;
            }
            _ => i += 1,
        }
    }
    i
}

/// Scans past a single-quoted literal, honouring the `''` escape.
fn single_quote_end(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() {
        if byte_at(bytes, i) == b'\'' {
            if byte_at(bytes, i + 1) == b'\'' {
                i += 2;
            } else {
                return i + 1;
            }
        } else {
            i += 1;
        }
    }
    i
}

/// Length of a dollar-quote opener at `i`, including both `$` delimiters.
///
/// The tag between the delimiters is empty (`$$`) or an identifier: a
/// letter or underscore followed by alphanumerics or underscores.
fn dollar_tag_len(bytes: &[u8], i: usize) -> Option<usize> {
    let first = byte_at(bytes, i + 1);
    if first == b'$' {
        return Some(2);
    }
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return None;
    }
    let mut j = i + 2;
    while j < bytes.len() {
        let b = byte_at(bytes, j);
        if b == b'$' {
            return Some(j - i + 1);
        }
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        j += 1;
    }
    None
}

/// Scans past a dollar-quoted body, up to and including the closing tag.
fn dollar_quote_end(bytes: &[u8], i: usize, tag_len: usize) -> usize {
    let tag = bytes.get(i..i + tag_len).unwrap_or_default();
    let mut j = i + tag_len;
    while j + tag_len <= bytes.len() {
        if bytes.get(j..j + tag_len) == Some(tag) {
            return j + tag_len;
        }
        j += 1;
    }
    bytes.len()
}
