//! Cache path derivation: URI -> deterministic on-disk location.
//!
//! The filename is the SHA-256 of the URI (lowercase hex) plus the URI's
//! file extension when it has a usable one. Identical URIs always map to
//! identical paths, so the path doubles as a cache key.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Longest extension carried over from the URI. Anything longer is treated
/// as not-an-extension (e.g. a trailing domain label with a long path).
const MAX_EXTENSION_LEN: usize = 8;

/// Derives the cache filename for `uri`: hex digest plus extension, if any.
/// Pure; repeated calls return byte-identical names.
pub fn cache_file_name(uri: &str) -> String {
    let digest = Sha256::digest(uri.as_bytes());
    let mut name = hex::encode(digest);
    if let Some(ext) = uri_extension(uri) {
        name.push('.');
        name.push_str(ext);
    }
    name
}

/// Extension from the last `.` in the URI, when the remainder looks like a
/// real extension (short, alphanumeric, no path separators).
fn uri_extension(uri: &str) -> Option<&str> {
    let (_, ext) = uri.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}

/// Joins the cache root, optional subfolder, and derived filename. Ensures
/// the directory exists (mode 0700 on Unix) as a side effect; creation
/// failures are logged and the path is still returned.
pub fn cached_path(root: &Path, uri: &str, subfolder: Option<&str>) -> PathBuf {
    let dir = match subfolder {
        Some(sub) => root.join(sub),
        None => root.to_path_buf(),
    };
    if let Err(e) = create_private_dir(&dir) {
        tracing::warn!(dir = %dir.display(), error = %e, "cache dir creation failed");
    }
    dir.join(cache_file_name(uri))
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}
