use crate::core::file_state::normalize_path;
use crate::core::transfer::is_temp_artifact;
use crate::error::{SyncError, TraversalError};
use crate::models::SyncMode;
use glob::{MatchOptions, Pattern};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Tree walk configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Glob matched against the file name, or the whole relative path if it contains '/'
    pub pattern: String,
    /// Descend into subdirectories
    pub recursive: bool,
    /// Path segments that exclude anything beneath or named by them
    pub exclude_dirs: Vec<String>,
    /// Denied file extensions, without the dot, case-insensitive
    pub exclude_extensions: Vec<String>,
}

pub fn default_exclude_dirs() -> Vec<String> {
    [
        ".git",
        ".svn",
        ".hg",
        "__pycache__",
        "node_modules",
        ".idea",
        ".vscode",
        ".venv",
        ".mypy_cache",
        ".pytest_cache",
        ".DS_Store",
        "Thumbs.db",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn default_exclude_extensions() -> Vec<String> {
    ["pyc", "pyo", "o", "obj", "so", "dll", "exe", "class"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            pattern: "*".to_string(),
            recursive: true,
            exclude_dirs: default_exclude_dirs(),
            exclude_extensions: default_exclude_extensions(),
        }
    }
}

/// Union of both trees plus whatever went wrong while walking them.
#[derive(Debug, Default)]
pub struct DiffResult {
    /// Sorted, deduplicated relative paths
    pub paths: Vec<String>,
    pub local_count: usize,
    pub remote_count: usize,
    pub warnings: Vec<TraversalError>,
}

/// `*` and `?` stay within one path segment
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Tree differ
#[derive(Debug, Clone)]
pub struct FileScanner {
    config: ScanConfig,
    matcher: Pattern,
    match_full_path: bool,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl FileScanner {
    pub fn new(config: ScanConfig) -> Result<Self, SyncError> {
        let pattern = if config.pattern.trim().is_empty() {
            "*"
        } else {
            config.pattern.trim()
        };
        let matcher = Pattern::new(pattern).map_err(|source| SyncError::InvalidPattern {
            pattern: config.pattern.clone(),
            source,
        })?;
        let match_full_path = pattern.contains('/');

        Ok(Self {
            config,
            matcher,
            match_full_path,
            cancel_flag: None,
        })
    }

    /// Stop walking as soon as the flag is raised
    pub fn with_cancel(mut self, cancel_flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(cancel_flag);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .map(|f| f.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    fn is_excluded_segment(&self, segment: &str) -> bool {
        self.config.exclude_dirs.iter().any(|d| d == segment)
    }

    fn is_excluded_extension(&self, relative_path: &str) -> bool {
        let ext = match Path::new(relative_path).extension().and_then(|e| e.to_str()) {
            Some(ext) => ext.to_lowercase(),
            None => return false,
        };
        self.config
            .exclude_extensions
            .iter()
            .any(|e| e.trim_start_matches('.').to_lowercase() == ext)
    }

    /// Whether an exclusion rule drops this relative path
    pub fn should_exclude(&self, relative_path: &str) -> bool {
        let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
        if is_temp_artifact(file_name) {
            return true;
        }

        relative_path.split('/').any(|seg| self.is_excluded_segment(seg))
            || self.is_excluded_extension(relative_path)
    }

    /// Whether the file pattern selects this relative path
    pub fn matches_pattern(&self, relative_path: &str) -> bool {
        if self.match_full_path {
            return self.matcher.matches_with(relative_path, MATCH_OPTIONS);
        }
        let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
        self.matcher.matches_with(file_name, MATCH_OPTIONS)
    }

    fn keep_entry(&self, entry: &DirEntry) -> bool {
        entry.depth() == 0
            || entry
                .file_name()
                .to_str()
                .map(|name| !self.is_excluded_segment(name))
                .unwrap_or(true)
    }

    /// Walks one root, returning matching relative paths and traversal problems.
    pub fn scan_root(&self, root: &Path) -> (BTreeSet<String>, Vec<TraversalError>) {
        let mut files = BTreeSet::new();
        let mut warnings = Vec::new();

        if !root.exists() {
            warn!("root {} does not exist", root.display());
            warnings.push(TraversalError::MissingRoot {
                path: root.to_path_buf(),
            });
            return (files, warnings);
        }

        // Symlinks are neither followed nor listed
        let mut walker = WalkDir::new(root).min_depth(1);
        if !self.config.recursive {
            walker = walker.max_depth(1);
        }

        let mut excluded = 0usize;
        let mut visited = 0usize;

        for entry in walker.into_iter().filter_entry(|e| self.keep_entry(e)) {
            visited += 1;
            if visited % 256 == 0 && self.is_cancelled() {
                debug!("scan of {} cancelled", root.display());
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    warn!("cannot list {}: {}", path.display(), e);
                    warnings.push(TraversalError::Unreadable {
                        path,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = match entry.path().strip_prefix(root) {
                Ok(rel) if rel.to_str().is_some() => normalize_path(rel),
                Ok(_) => {
                    warn!("skipping non-UTF-8 path {}", entry.path().display());
                    warnings.push(TraversalError::NonUtf8Name {
                        path: entry.path().to_path_buf(),
                    });
                    continue;
                }
                Err(_) => continue,
            };

            if !self.matches_pattern(&relative) {
                continue;
            }
            if self.should_exclude(&relative) {
                debug!("excluded: {}", relative);
                excluded += 1;
                continue;
            }

            files.insert(relative);
        }

        debug!(
            "scanned {}: {} files, {} excluded, {} warnings",
            root.display(),
            files.len(),
            excluded,
            warnings.len()
        );

        (files, warnings)
    }

    /// Union of the relative paths under both roots.
    ///
    /// One-way modes only walk the side that can be copied from.
    pub fn diff(&self, local_root: &Path, remote_root: &Path, mode: SyncMode) -> DiffResult {
        let mut result = DiffResult::default();
        let mut union = BTreeSet::new();

        if mode.scans_remote() {
            let (remote, warnings) = self.scan_root(remote_root);
            result.remote_count = remote.len();
            result.warnings.extend(warnings);
            union.extend(remote);
        }

        if mode.scans_local() {
            let (local, warnings) = self.scan_root(local_root);
            result.local_count = local.len();
            result.warnings.extend(warnings);
            union.extend(local);
        }

        info!(
            "diff ({}): local {}, remote {}, union {}",
            mode,
            result.local_count,
            result.remote_count,
            union.len()
        );

        result.paths = union.into_iter().collect();
        result
    }
}
