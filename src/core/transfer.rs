//! Atomic file transfer - temp file in the destination directory, then rename

use crate::core::file_state::CHUNK_SIZE;
use crate::error::CopyError;
use filetime::FileTime;
use scopeguard::ScopeGuard;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const TEMP_PREFIX: &str = ".dualsync-";
pub const TEMP_SUFFIX: &str = ".tmp";

/// Whether a file name looks like one of our in-flight temp files.
pub fn is_temp_artifact(file_name: &str) -> bool {
    file_name.starts_with(TEMP_PREFIX) && file_name.ends_with(TEMP_SUFFIX)
}

fn destination_dir(dst: &Path) -> Result<&Path, CopyError> {
    match dst.parent() {
        Some(p) if p.as_os_str().is_empty() => Ok(Path::new(".")),
        Some(p) => Ok(p),
        None => Err(CopyError::NoParent {
            path: dst.to_path_buf(),
        }),
    }
}

/// Copies `src` onto `dst` atomically, preserving the source mtime.
///
/// Returns the number of bytes written.
pub fn copy_atomic(src: &Path, dst: &Path) -> Result<u64, CopyError> {
    let source_err = |e| CopyError::Source {
        path: src.to_path_buf(),
        source: e,
    };

    let file = File::open(src).map_err(source_err)?;
    let metadata = file.metadata().map_err(source_err)?;
    let mtime = FileTime::from_last_modification_time(&metadata);

    debug!("copy {} -> {} ({} bytes)", src.display(), dst.display(), metadata.len());
    write_atomic(file, dst, Some(mtime))
}

/// Streams `reader` into a temp file next to `dst` and renames it into place.
///
/// The temp file is removed on every exit path, unwinding included, unless the
/// rename succeeded. `dst` is never visible half-written.
pub fn write_atomic<R: Read>(
    reader: R,
    dst: &Path,
    mtime: Option<FileTime>,
) -> Result<u64, CopyError> {
    let dir = destination_dir(dst)?;
    fs::create_dir_all(dir).map_err(|e| CopyError::CreateDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let temp_path = dir.join(format!(
        "{}{}{}",
        TEMP_PREFIX,
        uuid::Uuid::new_v4().simple(),
        TEMP_SUFFIX
    ));

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(|e| CopyError::TempFile {
            dir: dir.to_path_buf(),
            source: e,
        })?;

    let temp_path = scopeguard::guard(temp_path, |path: PathBuf| {
        match fs::remove_file(&path) {
            Ok(()) => debug!("removed temp file {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("cannot remove temp file {}: {}", path.display(), e),
        }
    });

    let write_err = |e| CopyError::Write {
        path: (*temp_path).clone(),
        source: e,
    };

    let mut reader = BufReader::with_capacity(CHUNK_SIZE, reader);
    let bytes = io::copy(&mut reader, &mut temp_file).map_err(write_err)?;

    if let Some(mtime) = mtime {
        filetime::set_file_handle_times(&temp_file, None, Some(mtime)).map_err(|e| {
            CopyError::Timestamp {
                path: (*temp_path).clone(),
                source: e,
            }
        })?;
    }

    temp_file.sync_all().map_err(write_err)?;
    drop(temp_file);

    // std::fs::rename replaces atomically on Unix and uses MOVEFILE_REPLACE_EXISTING on Windows
    fs::rename(&*temp_path, dst).map_err(|e| CopyError::Rename {
        from: (*temp_path).clone(),
        to: dst.to_path_buf(),
        source: e,
    })?;

    // Committed: disarm cleanup
    let _ = ScopeGuard::into_inner(temp_path);
    sync_dir(dir);

    Ok(bytes)
}

/// Persists the rename itself. Best effort.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        debug!("cannot fsync directory {}: {}", dir.display(), e);
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
