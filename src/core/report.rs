//! Run report - per-file outcomes and summary counters

use crate::models::{SyncDecision, SyncMode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Result of handling one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum OutcomeStatus {
    Success,
    Failed { error: String },
}

/// One line of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutcome {
    pub path: String,
    /// None when probing failed before a decision was reached
    pub decision: Option<SyncDecision>,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    /// Bytes written (0 for skips, failures and dry runs)
    pub bytes: u64,
}

impl FileOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Failed { error } => Some(error),
            OutcomeStatus::Success => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub copied_to_remote: usize,
    pub copied_to_local: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes_transferred: u64,
}

impl RunSummary {
    pub fn copied(&self) -> usize {
        self.copied_to_remote + self.copied_to_local
    }

    pub fn total_files(&self) -> usize {
        self.copied() + self.skipped + self.failed
    }
}

/// Aggregated outcome of one run, handed to the caller when the run ends
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub local_root: PathBuf,
    pub remote_root: PathBuf,
    pub mode: SyncMode,
    pub dry_run: bool,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: RunSummary,
    pub outcomes: Vec<FileOutcome>,
    /// Run-level traversal problems
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }

    /// 0 on success, 1 if any file failed. Dry runs always succeed.
    pub fn exit_code(&self) -> i32 {
        if self.dry_run || !self.has_failures() {
            0
        } else {
            1
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Outcomes in path order, for callers that need stable output
    pub fn sort_by_path(&mut self) {
        self.outcomes.sort_by(|a, b| a.path.cmp(&b.path));
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    fn successes_with(&self, decision: SyncDecision) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes
            .iter()
            .filter(move |o| !o.is_failed() && o.decision == Some(decision))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable report grouped by category.
    pub fn render_text(&self, verbose: bool) -> String {
        let mut out = String::new();
        let prefix = if self.dry_run { "[dry run] " } else { "" };

        let _ = writeln!(
            out,
            "{}{} sync: {} <-> {}",
            prefix,
            self.mode,
            self.local_root.display(),
            self.remote_root.display()
        );

        let sections: [(&str, SyncDecision); 2] = [
            (
                if self.dry_run { "Would copy to remote" } else { "Copied to remote" },
                SyncDecision::CopyToRemote,
            ),
            (
                if self.dry_run { "Would copy to local" } else { "Copied to local" },
                SyncDecision::CopyToLocal,
            ),
        ];

        for (title, decision) in sections {
            let items: Vec<_> = self.successes_with(decision).collect();
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n{} ({}):", title, items.len());
            for item in items {
                let _ = writeln!(out, "  {}", item.path);
            }
        }

        // Names only with -v
        let skipped: Vec<_> = self.successes_with(SyncDecision::Skip).collect();
        if !skipped.is_empty() {
            let _ = writeln!(out, "\nSkipped ({}):", skipped.len());
            if verbose {
                for item in skipped {
                    let _ = writeln!(out, "  {}", item.path);
                }
            } else {
                let _ = writeln!(out, "  (use -v to list)");
            }
        }

        let failures: Vec<_> = self.failures().collect();
        if !failures.is_empty() {
            let _ = writeln!(out, "\nFailed ({}):", failures.len());
            for item in failures {
                let _ = writeln!(
                    out,
                    "  {}: {}",
                    item.path,
                    item.error().unwrap_or_default()
                );
            }
        }

        if !self.warnings.is_empty() {
            let _ = writeln!(out, "\nWarnings ({}):", self.warnings.len());
            for w in &self.warnings {
                let _ = writeln!(out, "  {}", w);
            }
        }

        let s = &self.summary;
        let _ = writeln!(
            out,
            "\n{}to remote: {}, to local: {}, skipped: {}, failed: {}, {} bytes in {} ms{}",
            prefix,
            s.copied_to_remote,
            s.copied_to_local,
            s.skipped,
            s.failed,
            s.bytes_transferred,
            self.duration_ms(),
            if self.cancelled { " (cancelled)" } else { "" }
        );

        out
    }
}

/// Accumulates outcomes while a run is in progress
#[derive(Debug)]
pub(crate) struct ReportBuilder {
    run_id: String,
    local_root: PathBuf,
    remote_root: PathBuf,
    mode: SyncMode,
    dry_run: bool,
    started_at: DateTime<Utc>,
    summary: RunSummary,
    outcomes: Vec<FileOutcome>,
    warnings: Vec<String>,
}

impl ReportBuilder {
    pub(crate) fn new(local_root: &Path, remote_root: &Path, mode: SyncMode, dry_run: bool) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            local_root: local_root.to_path_buf(),
            remote_root: remote_root.to_path_buf(),
            mode,
            dry_run,
            started_at: Utc::now(),
            summary: RunSummary::default(),
            outcomes: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub(crate) fn push(&mut self, outcome: FileOutcome) {
        let s = &mut self.summary;
        match (&outcome.status, outcome.decision) {
            (OutcomeStatus::Failed { .. }, _) => s.failed += 1,
            (OutcomeStatus::Success, Some(SyncDecision::CopyToRemote)) => s.copied_to_remote += 1,
            (OutcomeStatus::Success, Some(SyncDecision::CopyToLocal)) => s.copied_to_local += 1,
            (OutcomeStatus::Success, _) => s.skipped += 1,
        }
        s.bytes_transferred += outcome.bytes;
        self.outcomes.push(outcome);
    }

    pub(crate) fn finish(self, cancelled: bool) -> RunReport {
        RunReport {
            run_id: self.run_id,
            local_root: self.local_root,
            remote_root: self.remote_root,
            mode: self.mode,
            dry_run: self.dry_run,
            cancelled,
            started_at: self.started_at,
            finished_at: Utc::now(),
            summary: self.summary,
            outcomes: self.outcomes,
            warnings: self.warnings,
        }
    }
}
