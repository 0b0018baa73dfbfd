use crate::core::comparator::{CompareConfig, FileComparator};
use crate::core::file_state::{probe_pair, resolve_path};
use crate::core::report::{FileOutcome, OutcomeStatus, ReportBuilder, RunReport};
use crate::core::scanner::{DiffResult, FileScanner, ScanConfig};
use crate::core::transfer::copy_atomic;
use crate::error::SyncError;
use crate::models::{SyncDecision, SyncMode};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Paths processed at once (1 = strictly sequential)
    pub max_concurrent_transfers: usize,
    /// Probe and decide only, never copy
    pub dry_run: bool,
    pub scan_config: ScanConfig,
    pub compare_config: CompareConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent_transfers: 1,
            dry_run: false,
            scan_config: ScanConfig::default(),
            compare_config: CompareConfig::default(),
        }
    }
}

/// Everything a worker needs to handle one path on its own
#[derive(Debug, Clone)]
struct PathTask {
    local_root: PathBuf,
    remote_root: PathBuf,
    mode: SyncMode,
    comparator: FileComparator,
    dry_run: bool,
}

impl PathTask {
    fn outcome(path: &str, decision: Option<SyncDecision>, bytes: u64) -> FileOutcome {
        FileOutcome {
            path: path.to_string(),
            decision,
            status: OutcomeStatus::Success,
            bytes,
        }
    }

    fn failure(path: &str, decision: Option<SyncDecision>, error: String) -> FileOutcome {
        FileOutcome {
            path: path.to_string(),
            decision,
            status: OutcomeStatus::Failed { error },
            bytes: 0,
        }
    }

    /// Probe, decide, copy. Blocking; runs on a worker thread.
    fn sync_path(&self, relative_path: &str) -> FileOutcome {
        let (local, remote) = match probe_pair(
            &self.local_root,
            &self.remote_root,
            relative_path,
            self.comparator.config().quick_check,
        ) {
            Ok(pair) => pair,
            Err(e) => {
                warn!("probe failed: {}", e);
                return Self::failure(relative_path, None, e.to_string());
            }
        };

        let decision = self.comparator.decide(&local, &remote, self.mode);
        debug!("{}: {}", relative_path, decision);

        if !self.mode.allows(decision) {
            return Self::failure(
                relative_path,
                Some(decision),
                format!("{} is not permitted in {} mode", decision, self.mode),
            );
        }

        let (from_root, to_root) = match decision {
            SyncDecision::Skip => return Self::outcome(relative_path, Some(decision), 0),
            SyncDecision::CopyToRemote => (&self.local_root, &self.remote_root),
            SyncDecision::CopyToLocal => (&self.remote_root, &self.local_root),
        };

        if self.dry_run {
            return Self::outcome(relative_path, Some(decision), 0);
        }

        let src = resolve_path(from_root, relative_path);
        let dst = resolve_path(to_root, relative_path);
        match copy_atomic(&src, &dst) {
            Ok(bytes) => Self::outcome(relative_path, Some(decision), bytes),
            Err(e) => {
                warn!("copy failed for {}: {}", relative_path, e);
                Self::failure(relative_path, Some(decision), e.to_string())
            }
        }
    }
}

/// Called on the worker thread as each file finishes, in completion order
pub type ProgressCallback = Arc<dyn Fn(&FileOutcome) + Send + Sync>;

/// Sync orchestrator
pub struct SyncEngine {
    config: SyncConfig,
    cancelled: Arc<AtomicBool>,
    progress: Option<ProgressCallback>,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Stop starting new files. In-flight files finish or clean up after themselves.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Shared flag, e.g. for a Ctrl-C handler
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Reconciles `local_root` and `remote_root` under `mode`.
    ///
    /// Per-file problems end up in the report; only a bad configuration
    /// (such as an invalid pattern) is returned as an error.
    pub async fn run(
        &self,
        local_root: &Path,
        remote_root: &Path,
        mode: SyncMode,
    ) -> Result<RunReport, SyncError> {
        let scanner =
            FileScanner::new(self.config.scan_config.clone())?.with_cancel(self.cancelled.clone());
        let mut report = ReportBuilder::new(local_root, remote_root, mode, self.config.dry_run);

        info!(
            "starting {} sync{}: {} <-> {}",
            mode,
            if self.config.dry_run { " (dry run)" } else { "" },
            local_root.display(),
            remote_root.display()
        );

        let diff = {
            let local = local_root.to_path_buf();
            let remote = remote_root.to_path_buf();
            match tokio::task::spawn_blocking(move || scanner.diff(&local, &remote, mode)).await {
                Ok(diff) => diff,
                Err(e) => {
                    warn!("traversal task failed: {}", e);
                    report.warn(format!("traversal aborted: {}", e));
                    DiffResult::default()
                }
            }
        };

        for warning in &diff.warnings {
            report.warn(warning.to_string());
        }

        let task = PathTask {
            local_root: local_root.to_path_buf(),
            remote_root: remote_root.to_path_buf(),
            mode,
            comparator: FileComparator::with_config(self.config.compare_config.clone()),
            dry_run: self.config.dry_run,
        };

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_transfers.max(1)));
        let mut in_flight: VecDeque<(String, JoinHandle<FileOutcome>)> = VecDeque::new();

        for path in diff.paths {
            if self.is_cancelled() {
                break;
            }

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            if self.is_cancelled() {
                break;
            }

            let task = task.clone();
            let task_path = path.clone();
            let progress = self.progress.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let outcome = task.sync_path(&task_path);
                if let Some(progress) = &progress {
                    progress(&outcome);
                }
                // Released last so a cancel raised from `progress` is seen before the next file
                drop(permit);
                outcome
            });
            in_flight.push_back((path, handle));

            // Aggregate finished work in traversal order
            while in_flight
                .front()
                .map(|(_, h)| h.is_finished())
                .unwrap_or(false)
            {
                if let Some((path, handle)) = in_flight.pop_front() {
                    report.push(Self::join(path, handle).await);
                }
            }
        }

        while let Some((path, handle)) = in_flight.pop_front() {
            report.push(Self::join(path, handle).await);
        }

        let cancelled = self.is_cancelled();
        let report = report.finish(cancelled);

        info!(
            "sync finished: to remote {}, to local {}, skipped {}, failed {}{}",
            report.summary.copied_to_remote,
            report.summary.copied_to_local,
            report.summary.skipped,
            report.summary.failed,
            if cancelled { " (cancelled)" } else { "" }
        );

        Ok(report)
    }

    async fn join(path: String, handle: JoinHandle<FileOutcome>) -> FileOutcome {
        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("worker for {} failed: {}", path, e);
                PathTask::failure(&path, None, format!("worker failed: {}", e))
            }
        }
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}
