//! Content hashing for change detection
//!
//! Asset hashes are short, fixed-width digests: the first
//! [`HASH_WIDTH`] hex characters of a SHA-256 over the primary file's bytes.
//! Directory digests are used to tell whether a projected copy still matches
//! its canonical source.

use sha2::{Digest, Sha256};
use std::path::Path;
use walkdir::WalkDir;

/// Number of hex characters kept from the SHA-256 digest.
pub const HASH_WIDTH: usize = 16;

fn short_hex(hasher: Sha256) -> String {
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(HASH_WIDTH);
    hex
}

/// Compute the short checksum of in-memory content.
pub fn compute_content_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    short_hex(hasher)
}

/// Compute the short checksum of a file's bytes.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn compute_file_checksum(path: &Path) -> std::io::Result<String> {
    let content = std::fs::read(path)?;
    Ok(compute_content_checksum(&content))
}

/// Compute a digest over every regular file below `dir`.
///
/// Files are visited in sorted order and both the relative path and the
/// contents feed the hash, so renames and edits both change the digest.
/// Symlinks inside the tree are not followed.
pub fn compute_dir_checksum(dir: &Path) -> std::io::Result<String> {
    let mut hasher = Sha256::new();

    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        hasher.update(relative.to_string_lossy().replace('\\', "/").as_bytes());
        hasher.update([0u8]);
        hasher.update(std::fs::read(entry.path())?);
        hasher.update([0u8]);
    }

    Ok(short_hex(hasher))
}
