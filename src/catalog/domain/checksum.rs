//! Content checksums for the source catalog.
//!
//! Two digests are recorded per file: one over the exact bytes and one over
//! the content after line-ending normalization, so a file that only changed
//! its line endings still matches its normalized digest. SHA-256 keeps the
//! output inside the 32–64 lowercase-hex-character catalog contract.

use sha2::{Digest, Sha256};

/// Hex digest of the exact file bytes.
#[must_use]
pub fn raw_digest(bytes: &[u8]) -> String {
    to_hex(&Sha256::digest(bytes))
}

/// Hex digest of the content with `\r\n` and bare `\r` folded to `\n`.
#[must_use]
pub fn normalized_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    let mut chars = content.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' {
            if chars.peek() == Some(&'\n') {
                let _lf = chars.next();
            }
            hasher.update([b'\n']);
        } else {
            let mut buf = [0_u8; 4];
            hasher.update(ch.encode_utf8(&mut buf).as_bytes());
        }
    }
    to_hex(&hasher.finalize())
}

/// Checks the catalog digest format: 32–64 lowercase hex characters.
#[must_use]
pub fn is_valid_digest(digest: &str) -> bool {
    (32..=64).contains(&digest.len())
        && digest
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    bytes.iter().fold(String::with_capacity(64), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
