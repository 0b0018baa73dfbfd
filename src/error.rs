//! Error types for the synchronizer

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to observe a file, other than "not found".
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("cannot stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read {path} for hashing: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The path exists but is not a regular file: a directory or a symlink.
    #[error("{path} exists but is not a regular file")]
    NotAFile { path: PathBuf },
}

/// Failure of a single atomic copy. The destination is left as it was.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("cannot open source {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot create temp file in {dir}: {source}")]
    TempFile {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("write to {path} failed: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot set modification time on {path}: {source}")]
    Timestamp {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot rename {from} onto {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("destination {path} has no parent directory")]
    NoParent { path: PathBuf },
}

/// A directory or entry the walk had to leave out. Reported as a run warning.
#[derive(Debug, Error)]
pub enum TraversalError {
    #[error("cannot list {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("root {path} does not exist, treated as empty")]
    MissingRoot { path: PathBuf },

    #[error("skipped {path}: file name is not valid UTF-8")]
    NonUtf8Name { path: PathBuf },
}

/// Run-level errors that stop a run before any file is touched.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("unknown sync mode '{0}' (expected bidirectional, download-only, upload-only or incremental-both)")]
    InvalidMode(String),
}
