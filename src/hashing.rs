//! Hashing - SHA-256 Template Fingerprints
//!
//! Cache keys for compiled templates. The delimiter syntax is part of the
//! key since the same source parses differently under other delimiters.

use sha2::{Digest, Sha256};

use crate::config::Syntax;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// fingerprint = sha256(len(open) ":" open len(close) ":" close source)
pub fn template_fingerprint(source: &str, syntax: &Syntax) -> String {
    let mut keyed = Vec::with_capacity(source.len() + 16);
    for delimiter in [syntax.open(), syntax.close()] {
        keyed.extend_from_slice(delimiter.len().to_string().as_bytes());
        keyed.push(b':');
        keyed.extend_from_slice(delimiter.as_bytes());
    }
    keyed.extend_from_slice(source.as_bytes());
    sha256_hex(&keyed)
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}
