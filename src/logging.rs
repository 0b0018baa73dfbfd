//! Logging - config section and a size-capped log file writer

use crate::config::{load_section, save_section, try_load_section};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_subscriber::fmt::MakeWriter;

pub const LOG_FILE: &str = "dualsync.log";

/// The `log` section of config.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    /// Write a log file next to config.json
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Rotate once the file grows past this many MB
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u32,
    /// "error", "warn", "info", "debug" or "trace"
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_enabled() -> bool {
    false
}

fn default_max_size_mb() -> u32 {
    5
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_size_mb: default_max_size_mb(),
            level: default_level(),
        }
    }
}

impl LogConfig {
    pub fn load(config_dir: &Path) -> Self {
        load_section(config_dir, "log").unwrap_or_default()
    }

    /// Like `load`, but hands a malformed file back to the caller. Used before
    /// a subscriber exists to log the problem.
    pub fn try_load(config_dir: &Path) -> anyhow::Result<Self> {
        Ok(try_load_section(config_dir, "log")?.unwrap_or_default())
    }

    pub fn save(&self, config_dir: &Path) -> anyhow::Result<()> {
        save_section(config_dir, "log", self)
    }

    pub fn tracing_level(&self) -> tracing::Level {
        match self.level.to_lowercase().as_str() {
            "error" => tracing::Level::ERROR,
            "warn" => tracing::Level::WARN,
            "debug" => tracing::Level::DEBUG,
            "trace" => tracing::Level::TRACE,
            _ => tracing::Level::INFO,
        }
    }
}

type SharedWriter = Arc<Mutex<Option<BufWriter<File>>>>;

/// Log file writer that moves the file to `<name>.old` once it exceeds `max_size`
#[derive(Clone)]
pub struct SizeRotatingWriter {
    file_path: PathBuf,
    max_size: u64,
    writer: SharedWriter,
}

impl SizeRotatingWriter {
    pub fn new(log_dir: &Path, max_size_mb: u32) -> io::Result<Self> {
        fs::create_dir_all(log_dir)?;

        let file_path = log_dir.join(LOG_FILE);
        let max_size = u64::from(max_size_mb.max(1)) * 1024 * 1024;
        let writer = Self::open_file(&file_path, max_size)?;

        Ok(Self {
            file_path,
            max_size,
            writer: Arc::new(Mutex::new(Some(writer))),
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn open_file(file_path: &Path, max_size: u64) -> io::Result<BufWriter<File>> {
        if Self::is_oversized(file_path, max_size) {
            Self::rotate(file_path)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(file_path)?;
        Ok(BufWriter::new(file))
    }

    fn is_oversized(file_path: &Path, max_size: u64) -> bool {
        fs::metadata(file_path)
            .map(|m| m.len() > max_size)
            .unwrap_or(false)
    }

    fn rotate(file_path: &Path) -> io::Result<()> {
        let backup = file_path.with_extension("log.old");
        if backup.exists() {
            fs::remove_file(&backup)?;
        }
        fs::rename(file_path, &backup)
    }

    fn lock(writer: &SharedWriter) -> MutexGuard<'_, Option<BufWriter<File>>> {
        writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn rotate_if_needed(writer: &SharedWriter, file_path: &Path, max_size: u64) -> io::Result<()> {
        if !Self::is_oversized(file_path, max_size) {
            return Ok(());
        }
        let mut guard = Self::lock(writer);
        if let Some(mut w) = guard.take() {
            let _ = w.flush();
        }
        *guard = Some(Self::open_file(file_path, max_size)?);
        Ok(())
    }
}

/// Handle returned by `make_writer`
pub struct LogWriter {
    inner: SharedWriter,
    file_path: PathBuf,
    max_size: u64,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = {
            let mut guard = SizeRotatingWriter::lock(&self.inner);
            let writer = guard
                .as_mut()
                .ok_or_else(|| io::Error::other("log writer not available"))?;
            let n = writer.write(buf)?;
            writer.flush()?;
            n
        };
        let _ = SizeRotatingWriter::rotate_if_needed(&self.inner, &self.file_path, self.max_size);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        match SizeRotatingWriter::lock(&self.inner).as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for SizeRotatingWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            inner: self.writer.clone(),
            file_path: self.file_path.clone(),
            max_size: self.max_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn log_config_round_trips_through_config_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(LogConfig::load(dir.path()), LogConfig::default());

        let config = LogConfig {
            enabled: true,
            max_size_mb: 2,
            level: "debug".to_string(),
        };
        config.save(dir.path()).unwrap();
        assert_eq!(LogConfig::load(dir.path()), config);
        assert_eq!(config.tracing_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn try_load_surfaces_malformed_config() {
        let dir = TempDir::new().unwrap();
        assert_eq!(LogConfig::try_load(dir.path()).unwrap(), LogConfig::default());

        fs::write(dir.path().join(crate::config::CONFIG_FILE), "{not json").unwrap();
        let err = LogConfig::try_load(dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("malformed"));
        assert_eq!(LogConfig::load(dir.path()), LogConfig::default());

        fs::write(
            dir.path().join(crate::config::CONFIG_FILE),
            r#"{"log": {"maxSizeMb": "big"}}"#,
        )
        .unwrap();
        let err = LogConfig::try_load(dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid 'log' section"));
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        let config = LogConfig {
            level: "chatty".to_string(),
            ..Default::default()
        };
        assert_eq!(config.tracing_level(), tracing::Level::INFO);
    }

    #[test]
    fn writer_rotates_past_the_limit() {
        let dir = TempDir::new().unwrap();
        let rotating = SizeRotatingWriter::new(dir.path(), 1).unwrap();

        let chunk = vec![b'x'; 256 * 1024];
        let mut writer = rotating.make_writer();
        for _ in 0..5 {
            writer.write_all(&chunk).unwrap();
        }

        assert!(dir.path().join("dualsync.log.old").exists());
        let current = fs::metadata(rotating.file_path()).unwrap().len();
        assert!(current <= 1024 * 1024);
    }
}
