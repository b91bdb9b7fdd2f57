//! SHA-256 content digests, computed with a streaming read.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::core::errors::{Result, SweepError};

/// Hex characters kept in the `.hash-<short>` backup tag.
pub const SHORT_HASH_LEN: usize = 8;

/// Compute the SHA-256 hex digest of the file at `path`.
pub fn sha256_file(path: &Path) -> Result<String> {
    let to_err = |source| SweepError::Hash {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(to_err)?;
    let mut reader = BufReader::with_capacity(64 * 1024, file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(to_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex_encode(&hasher.finalize()))
}

/// Leading characters of a hex digest used in backup names.
#[must_use]
pub fn short_hash(hex: &str) -> &str {
    hex.get(..SHORT_HASH_LEN).unwrap_or(hex)
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        })
}
