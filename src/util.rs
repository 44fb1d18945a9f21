// src/util.rs

use anyhow::{Context, Result};
use std::path::Path;

/// Decode child output permissively.
///
/// Invalid UTF-8 sequences are dropped (never replaced, never fatal) and
/// carriage returns are removed so `\r\n` and `\n` outputs compare equal
/// byte-for-byte.
pub fn decode_text(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.extend(chunk.valid().chars().filter(|&c| c != '\r'));
    }
    out
}

/// Ensure a directory exists (create it if missing).
///
/// This is used when:
/// - allocating the artifact directory
/// - writing the JSON report
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carriage_returns_are_stripped() {
        assert_eq!(decode_text(b"1 2\r\n3\r\n"), "1 2\n3\n");
    }

    #[test]
    fn invalid_sequences_are_dropped() {
        assert_eq!(decode_text(b"ok\xff\xfe!"), "ok!");
        assert_eq!(decode_text("héllo".as_bytes()), "héllo");
    }
}
