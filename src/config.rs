//! Persisted settings in `<config dir>/config.json`
//!
//! Each section (`sync`, `log`) is read on its own and falls back to its
//! defaults when missing or malformed. Saving a section keeps the others.

use crate::core::scanner::{default_exclude_dirs, default_exclude_extensions};
use crate::core::{CompareConfig, ScanConfig, SyncConfig};
use crate::models::SyncMode;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";
pub const CONFIG_DIR_ENV: &str = "DUALSYNC_CONFIG_DIR";
pub const REMOTE_BASE_ENV: &str = "DUALSYNC_REMOTE_BASE";

/// Config directory: `$DUALSYNC_CONFIG_DIR`, else the platform config dir.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .map(|p| p.join("dualsync"))
        .unwrap_or_else(|| PathBuf::from(".dualsync"))
}

fn parse_config(config_dir: &Path) -> Result<Option<serde_json::Value>> {
    let Ok(content) = fs::read_to_string(config_dir.join(CONFIG_FILE)) else {
        return Ok(None);
    };
    let value = serde_json::from_str(&content)
        .with_context(|| format!("malformed {}", config_dir.join(CONFIG_FILE).display()))?;
    Ok(Some(value))
}

fn read_config(config_dir: &Path) -> Option<serde_json::Value> {
    match parse_config(config_dir) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("ignoring {:#}", e);
            None
        }
    }
}

/// Reads one top-level section of config.json. `Ok(None)` when the file or
/// the section is missing.
pub(crate) fn try_load_section<T: DeserializeOwned>(
    config_dir: &Path,
    key: &str,
) -> Result<Option<T>> {
    let Some(section) = parse_config(config_dir)?.and_then(|c| c.get(key).cloned()) else {
        return Ok(None);
    };
    let value = serde_json::from_value(section)
        .with_context(|| format!("invalid '{}' section in {}", key, CONFIG_FILE))?;
    Ok(Some(value))
}

/// `try_load_section` that logs problems and falls back to `None`.
pub(crate) fn load_section<T: DeserializeOwned>(config_dir: &Path, key: &str) -> Option<T> {
    match try_load_section(config_dir, key) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("ignoring {:#}", e);
            None
        }
    }
}

/// Replaces one top-level section of config.json, keeping the rest.
pub(crate) fn save_section<T: Serialize>(config_dir: &Path, key: &str, value: &T) -> Result<()> {
    fs::create_dir_all(config_dir)
        .with_context(|| format!("cannot create {}", config_dir.display()))?;

    let mut config = read_config(config_dir)
        .filter(|v| v.is_object())
        .unwrap_or_else(|| serde_json::json!({}));
    config[key] = serde_json::to_value(value)?;

    let path = config_dir.join(CONFIG_FILE);
    fs::write(&path, serde_json::to_string_pretty(&config)?)
        .with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}

/// The `sync` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    #[serde(default)]
    pub default_mode: SyncMode,
    /// Cloud-mount base under which category folders live
    #[serde(default)]
    pub remote_base: Option<PathBuf>,
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
    #[serde(default = "default_exclude_extensions")]
    pub exclude_extensions: Vec<String>,
    #[serde(default)]
    pub quick_check: bool,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_transfers: usize,
}

fn default_max_concurrent() -> usize {
    1
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            default_mode: SyncMode::default(),
            remote_base: None,
            exclude_dirs: default_exclude_dirs(),
            exclude_extensions: default_exclude_extensions(),
            quick_check: false,
            max_concurrent_transfers: default_max_concurrent(),
        }
    }
}

impl SyncSettings {
    pub fn load(config_dir: &Path) -> Self {
        load_section(config_dir, "sync").unwrap_or_default()
    }

    pub fn save(&self, config_dir: &Path) -> Result<()> {
        save_section(config_dir, "sync", self)
    }

    /// `$DUALSYNC_REMOTE_BASE` wins over the configured base.
    pub fn effective_remote_base(&self) -> Option<PathBuf> {
        std::env::var_os(REMOTE_BASE_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.remote_base.clone())
    }

    /// Remote root: the explicit path if given, else `<remote base>/<category>`.
    ///
    /// The category defaults to the local directory's name.
    pub fn resolve_remote_root(
        &self,
        explicit: Option<&Path>,
        category: Option<&str>,
        local_root: &Path,
    ) -> Result<PathBuf> {
        resolve_remote_root_with(
            self.effective_remote_base().as_deref(),
            explicit,
            category,
            local_root,
        )
    }

    /// Builds the orchestrator configuration from these settings.
    pub fn to_sync_config(&self, pattern: &str, recursive: bool, dry_run: bool) -> SyncConfig {
        SyncConfig {
            max_concurrent_transfers: self.max_concurrent_transfers.max(1),
            dry_run,
            scan_config: ScanConfig {
                pattern: pattern.to_string(),
                recursive,
                exclude_dirs: self.exclude_dirs.clone(),
                exclude_extensions: self.exclude_extensions.clone(),
            },
            compare_config: CompareConfig {
                quick_check: self.quick_check,
                mtime_tolerance_seconds: 0,
            },
        }
    }
}

fn resolve_remote_root_with(
    base: Option<&Path>,
    explicit: Option<&Path>,
    category: Option<&str>,
    local_root: &Path,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let Some(base) = base else {
        bail!("no remote directory given and no remote base configured (set --remote-dir, {} or sync.remoteBase)", REMOTE_BASE_ENV);
    };

    let category = match category.filter(|c| !c.trim().is_empty()) {
        Some(c) => c.trim().to_string(),
        None => local_root
            .canonicalize()
            .ok()
            .as_deref()
            .unwrap_or(local_root)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| {
                format!("cannot derive a category from {}", local_root.display())
            })?,
    };

    Ok(base.join(category))
}
