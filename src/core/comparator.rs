use crate::core::file_state::FileMetadata;
use crate::models::{SyncDecision, SyncMode};
use tracing::trace;

/// Which side holds the better version of a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRelation {
    /// Identical content, or absent on both sides
    Equal,
    LocalBetter,
    RemoteBetter,
}

/// Comparison settings
#[derive(Debug, Clone, Default)]
pub struct CompareConfig {
    /// Treat matching size + mtime as identical without hashing
    pub quick_check: bool,
    /// Mtime differences up to this many seconds count as equal (0 = exact)
    pub mtime_tolerance_seconds: i64,
}

/// Decision engine: one ordering routine, four gating policies on top.
#[derive(Debug, Clone, Default)]
pub struct FileComparator {
    config: CompareConfig,
}

impl FileComparator {
    pub fn new(quick_check: bool) -> Self {
        Self {
            config: CompareConfig {
                quick_check,
                ..Default::default()
            },
        }
    }

    pub fn with_config(config: CompareConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// `a` is strictly newer than `b`
    fn newer(&self, a: &FileMetadata, b: &FileMetadata) -> bool {
        a.modified_time.saturating_sub(b.modified_time) > self.config.mtime_tolerance_seconds
    }

    /// Mode-independent judgement of which side is more current.
    pub fn compare_files(&self, local: &FileMetadata, remote: &FileMetadata) -> FileRelation {
        match (local.exists, remote.exists) {
            (false, false) => return FileRelation::Equal,
            (true, false) => return FileRelation::LocalBetter,
            (false, true) => return FileRelation::RemoteBetter,
            (true, true) => {}
        }

        if let (Some(l), Some(r)) = (&local.content_hash, &remote.content_hash) {
            if l == r {
                return FileRelation::Equal;
            }
        } else if self.config.quick_check
            && local.size_bytes == remote.size_bytes
            && local.modified_time == remote.modified_time
        {
            return FileRelation::Equal;
        }

        if self.newer(local, remote) {
            return FileRelation::LocalBetter;
        }
        if self.newer(remote, local) {
            return FileRelation::RemoteBetter;
        }

        trace!(
            "{}: same mtime, falling back to size ({} vs {})",
            local.relative_path,
            local.size_bytes,
            remote.size_bytes
        );
        if remote.size_bytes > local.size_bytes {
            return FileRelation::RemoteBetter;
        }

        // Equal mtime and size with differing content: local wins.
        FileRelation::LocalBetter
    }

    /// Picks the action for one path under `mode`.
    pub fn decide(
        &self,
        local: &FileMetadata,
        remote: &FileMetadata,
        mode: SyncMode,
    ) -> SyncDecision {
        let relation = self.compare_files(local, remote);

        match (mode, relation) {
            (_, FileRelation::Equal) => SyncDecision::Skip,

            (SyncMode::Bidirectional, FileRelation::LocalBetter) => SyncDecision::CopyToRemote,
            (SyncMode::Bidirectional, FileRelation::RemoteBetter) => SyncDecision::CopyToLocal,

            (SyncMode::DownloadOnly, FileRelation::RemoteBetter) => SyncDecision::CopyToLocal,
            (SyncMode::DownloadOnly, FileRelation::LocalBetter) => SyncDecision::Skip,

            (SyncMode::UploadOnly, FileRelation::LocalBetter) => SyncDecision::CopyToRemote,
            (SyncMode::UploadOnly, FileRelation::RemoteBetter) => SyncDecision::Skip,

            (SyncMode::IncrementalBoth, FileRelation::RemoteBetter) => {
                if !local.exists || !self.newer(local, remote) {
                    SyncDecision::CopyToLocal
                } else {
                    SyncDecision::Skip
                }
            }
            (SyncMode::IncrementalBoth, FileRelation::LocalBetter) => {
                if !remote.exists || !self.newer(remote, local) {
                    SyncDecision::CopyToRemote
                } else {
                    SyncDecision::Skip
                }
            }
        }
    }
}

/// `decide` with default settings.
pub fn decide(local: &FileMetadata, remote: &FileMetadata, mode: SyncMode) -> SyncDecision {
    FileComparator::default().decide(local, remote, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    const T1: i64 = 1_700_000_000;
    const T2: i64 = 1_700_000_600;

    fn file(size: u64, mtime: i64, hash: &str) -> FileMetadata {
        FileMetadata::present("f.txt", size, mtime).with_hash(hash)
    }

    fn absent() -> FileMetadata {
        FileMetadata::absent("f.txt")
    }

    #[test]
    fn equal_hash_always_skips() {
        let local = file(10, T1, "aaaa");
        let remote = file(99, T2, "aaaa");
        for mode in SyncMode::ALL {
            assert_eq!(decide(&local, &remote, mode), SyncDecision::Skip, "{mode}");
            assert_eq!(decide(&remote, &local, mode), SyncDecision::Skip, "{mode}");
        }
    }

    #[test]
    fn both_absent_skips() {
        for mode in SyncMode::ALL {
            assert_eq!(decide(&absent(), &absent(), mode), SyncDecision::Skip);
        }
    }

    #[test]
    fn remote_newer_scenario() {
        // local "X" at T1, remote "Y" at T2 > T1
        let local = file(1, T1, "x");
        let remote = file(1, T2, "y");
        assert_eq!(decide(&local, &remote, SyncMode::Bidirectional), SyncDecision::CopyToLocal);
        assert_eq!(decide(&local, &remote, SyncMode::DownloadOnly), SyncDecision::CopyToLocal);
        assert_eq!(decide(&local, &remote, SyncMode::UploadOnly), SyncDecision::Skip);
        assert_eq!(
            decide(&local, &remote, SyncMode::IncrementalBoth),
            SyncDecision::CopyToLocal
        );
    }

    #[test]
    fn local_only_scenario() {
        let local = FileMetadata::present("b.txt", 3, T1);
        let remote = FileMetadata::absent("b.txt");
        assert_eq!(decide(&local, &remote, SyncMode::Bidirectional), SyncDecision::CopyToRemote);
        assert_eq!(decide(&local, &remote, SyncMode::UploadOnly), SyncDecision::CopyToRemote);
        assert_eq!(decide(&local, &remote, SyncMode::DownloadOnly), SyncDecision::Skip);
        assert_eq!(
            decide(&local, &remote, SyncMode::IncrementalBoth),
            SyncDecision::CopyToRemote
        );
    }

    #[test]
    fn remote_only_skipped_by_upload_only() {
        let remote = FileMetadata::present("c.txt", 3, T1);
        let local = FileMetadata::absent("c.txt");
        assert_eq!(decide(&local, &remote, SyncMode::UploadOnly), SyncDecision::Skip);
        assert_eq!(decide(&local, &remote, SyncMode::DownloadOnly), SyncDecision::CopyToLocal);
        assert_eq!(decide(&local, &remote, SyncMode::Bidirectional), SyncDecision::CopyToLocal);
        assert_eq!(
            decide(&local, &remote, SyncMode::IncrementalBoth),
            SyncDecision::CopyToLocal
        );
    }

    #[test]
    fn equal_mtime_larger_file_wins() {
        let local = file(10, T1, "a");
        let remote = file(20, T1, "b");
        assert_eq!(decide(&local, &remote, SyncMode::Bidirectional), SyncDecision::CopyToLocal);
        assert_eq!(decide(&remote, &local, SyncMode::Bidirectional), SyncDecision::CopyToRemote);
    }

    #[test]
    fn full_tie_prefers_local() {
        let local = file(10, T1, "a");
        let remote = file(10, T1, "b");
        assert_eq!(
            FileComparator::default().compare_files(&local, &remote),
            FileRelation::LocalBetter
        );
        assert_eq!(decide(&local, &remote, SyncMode::Bidirectional), SyncDecision::CopyToRemote);
        assert_eq!(decide(&local, &remote, SyncMode::DownloadOnly), SyncDecision::Skip);
        assert_eq!(decide(&local, &remote, SyncMode::UploadOnly), SyncDecision::CopyToRemote);
    }

    #[test]
    fn local_newer_blocked_in_download_only() {
        let local = file(5, T2, "new");
        let remote = file(5, T1, "old");
        assert_eq!(decide(&local, &remote, SyncMode::DownloadOnly), SyncDecision::Skip);
        assert_eq!(
            decide(&local, &remote, SyncMode::IncrementalBoth),
            SyncDecision::CopyToRemote
        );
    }

    #[test]
    fn tolerance_turns_small_skew_into_size_tiebreak() {
        let cmp = FileComparator::with_config(CompareConfig {
            quick_check: false,
            mtime_tolerance_seconds: 2,
        });
        let local = file(50, T1 + 1, "a");
        let remote = file(60, T1, "b");
        assert_eq!(cmp.decide(&local, &remote, SyncMode::Bidirectional), SyncDecision::CopyToLocal);
    }

    #[test]
    fn quick_check_without_hashes_skips_matching_metadata() {
        let cmp = FileComparator::new(true);
        let local = FileMetadata::present("f.txt", 7, T1);
        let remote = FileMetadata::present("f.txt", 7, T1);
        for mode in SyncMode::ALL {
            assert_eq!(cmp.decide(&local, &remote, mode), SyncDecision::Skip);
        }
    }

    #[test]
    fn extreme_timestamps_do_not_overflow() {
        let local = file(1, i64::MAX, "a");
        let remote = file(1, i64::MIN, "b");
        assert_eq!(decide(&local, &remote, SyncMode::Bidirectional), SyncDecision::CopyToRemote);
        assert_eq!(decide(&remote, &local, SyncMode::Bidirectional), SyncDecision::CopyToLocal);
    }
}
