//! SHA-256 helpers for verifying downloads against published checksum lists.

use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

use tooldeck_core::{Error, Result};

/// Hex-encoded SHA-256 of a file.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub async fn sha256_file(path: &Path) -> Result<String> {
    let io_err = |e| Error::io(e, Some(path.to_path_buf()), "hash file");
    let mut file = tokio::fs::File::open(path).await.map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let n = file.read(&mut buffer).await.map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Find the digest for `file_name` in a `sha256sum`-style list.
///
/// Lines look like `<hex>  <name>` or `<hex> *<name>`; anything else is
/// ignored.
#[must_use]
pub fn find_checksum(list: &str, file_name: &str) -> Option<String> {
    list.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let digest = parts.next()?;
        let name = parts.next()?.trim_start_matches('*');
        (name == file_name && digest.len() == 64 && digest.bytes().all(|b| b.is_ascii_hexdigit()))
            .then(|| digest.to_ascii_lowercase())
    })
}

/// Check a file against an expected hex digest.
///
/// # Errors
///
/// [`Error::ChecksumMismatch`] when the digests differ.
pub async fn verify_sha256(path: &Path, expected: &str) -> Result<()> {
    let actual = sha256_file(path).await?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(Error::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}
