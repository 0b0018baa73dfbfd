//! File metadata probing - existence, size, mtime and SHA-256 digest

use crate::error::ProbeError;
use filetime::FileTime;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Read size used for hashing and copying.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Observable state of one file under one root.
///
/// When `exists` is false every other field except `relative_path` keeps its
/// default value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub relative_path: String,
    pub exists: bool,
    pub size_bytes: u64,
    /// Unix seconds
    pub modified_time: i64,
    /// Lowercase hex SHA-256, filled only when both sides exist and were read
    pub content_hash: Option<String>,
}

impl FileMetadata {
    pub fn absent(relative_path: &str) -> Self {
        Self {
            relative_path: relative_path.to_string(),
            ..Default::default()
        }
    }

    pub fn present(relative_path: &str, size_bytes: u64, modified_time: i64) -> Self {
        Self {
            relative_path: relative_path.to_string(),
            exists: true,
            size_bytes,
            modified_time,
            content_hash: None,
        }
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        if self.exists {
            self.content_hash = Some(hash.into());
        }
        self
    }
}

/// Joins a forward-slash relative path onto a root.
pub fn resolve_path(root: &Path, relative_path: &str) -> PathBuf {
    relative_path
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .fold(root.to_path_buf(), |acc, seg| acc.join(seg))
}

/// Forward-slash form of a root-relative path.
pub fn normalize_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Stats `relative_path` under `root`. Not-found is `exists = false`, not an error.
///
/// The final component is not followed: a symlink, like a directory, is not a
/// regular file.
pub fn probe(root: &Path, relative_path: &str) -> Result<FileMetadata, ProbeError> {
    let full_path = resolve_path(root, relative_path);

    match fs::symlink_metadata(&full_path) {
        Ok(metadata) => {
            if !metadata.file_type().is_file() {
                return Err(ProbeError::NotAFile { path: full_path });
            }
            let modified = FileTime::from_last_modification_time(&metadata).unix_seconds();
            Ok(FileMetadata::present(relative_path, metadata.len(), modified))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(FileMetadata::absent(relative_path)),
        Err(e) => Err(ProbeError::Stat {
            path: full_path,
            source: e,
        }),
    }
}

/// SHA-256 of a file, streamed in `CHUNK_SIZE` reads.
pub fn calculate_file_hash(path: &Path) -> Result<String, ProbeError> {
    let read_err = |e| ProbeError::Read {
        path: path.to_path_buf(),
        source: e,
    };

    let mut file = File::open(path).map_err(read_err)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_err(e)),
        };
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 of an in-memory buffer, same format as `calculate_file_hash`.
pub fn calculate_hash(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Probes the same relative path under both roots.
///
/// Hashes are computed whenever both sides exist. With `quick_check`, a pair
/// whose size and mtime already match is returned unhashed; the comparator
/// treats it as identical under the same setting.
pub fn probe_pair(
    local_root: &Path,
    remote_root: &Path,
    relative_path: &str,
    quick_check: bool,
) -> Result<(FileMetadata, FileMetadata), ProbeError> {
    let mut local = probe(local_root, relative_path)?;
    let mut remote = probe(remote_root, relative_path)?;

    if !(local.exists && remote.exists) {
        return Ok((local, remote));
    }

    if quick_check
        && local.size_bytes == remote.size_bytes
        && local.modified_time == remote.modified_time
    {
        debug!("quick check: {} unchanged by size and mtime", relative_path);
        return Ok((local, remote));
    }

    local.content_hash = Some(calculate_file_hash(&resolve_path(local_root, relative_path))?);
    remote.content_hash = Some(calculate_file_hash(&resolve_path(remote_root, relative_path))?);

    Ok((local, remote))
}
