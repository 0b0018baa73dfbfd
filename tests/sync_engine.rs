use std::fs;
use std::path::Path;

use dualsync_lib::config::SyncSettings;
use dualsync_lib::core::probe_pair;
use dualsync_lib::{SyncDecision, SyncEngine, SyncMode};
use filetime::FileTime;
use tempfile::TempDir;

const T1: i64 = 1_690_000_000;
const T2: i64 = 1_690_000_100;

fn put(root: &Path, rel: &str, content: &str, mtime: i64) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
}

fn engine(pattern: &str, recursive: bool, dry_run: bool) -> SyncEngine {
    SyncEngine::with_config(SyncSettings::default().to_sync_config(pattern, recursive, dry_run))
}

#[tokio::test]
async fn remote_newer_file_wins_per_mode() {
    let expectations = [
        (SyncMode::Bidirectional, SyncDecision::CopyToLocal, "Y"),
        (SyncMode::DownloadOnly, SyncDecision::CopyToLocal, "Y"),
        (SyncMode::UploadOnly, SyncDecision::Skip, "X"),
        (SyncMode::IncrementalBoth, SyncDecision::CopyToLocal, "Y"),
    ];

    for (mode, expected, local_after) in expectations {
        let local = TempDir::new().unwrap();
        let remote = TempDir::new().unwrap();
        put(local.path(), "a.txt", "X", T1);
        put(remote.path(), "a.txt", "Y", T2);

        let report = engine("*", true, false)
            .run(local.path(), remote.path(), mode)
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 1, "{mode}");
        assert_eq!(report.outcomes[0].decision, Some(expected), "{mode}");
        assert_eq!(
            fs::read_to_string(local.path().join("a.txt")).unwrap(),
            local_after,
            "{mode}"
        );
        assert_eq!(fs::read_to_string(remote.path().join("a.txt")).unwrap(), "Y");
    }
}

#[tokio::test]
async fn excluded_files_never_reach_the_report() {
    let local = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    put(local.path(), "app/main.py", "print()", T1);
    put(local.path(), "app/main.pyc", "bytecode", T1);
    put(local.path(), ".git/config", "[core]", T1);
    put(remote.path(), "node_modules/left-pad/index.js", "x", T1);

    let report = engine("*", true, false)
        .run(local.path(), remote.path(), SyncMode::Bidirectional)
        .await
        .unwrap();

    let paths: Vec<_> = report.outcomes.iter().map(|o| o.path.as_str()).collect();
    assert_eq!(paths, vec!["app/main.py"]);
    assert!(!remote.path().join("app/main.pyc").exists());
    assert!(!local.path().join("node_modules").exists());
}

#[tokio::test]
async fn non_recursive_pattern_run_only_touches_top_level_matches() {
    let local = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    put(local.path(), "notes.md", "top", T1);
    put(local.path(), "todo.txt", "other", T1);
    put(local.path(), "sub/deep.md", "nested", T1);

    let report = engine("*.md", false, false)
        .run(local.path(), remote.path(), SyncMode::UploadOnly)
        .await
        .unwrap();

    assert_eq!(report.summary.copied_to_remote, 1);
    assert!(remote.path().join("notes.md").exists());
    assert!(!remote.path().join("todo.txt").exists());
    assert!(!remote.path().join("sub").exists());
}

#[tokio::test]
async fn upload_then_probe_gives_identical_hashes_and_idempotent_rerun() {
    let local = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    put(local.path(), "photos/2024/img.raw", &"p".repeat(200_000), T1);

    let first = engine("*", true, false)
        .run(local.path(), remote.path(), SyncMode::UploadOnly)
        .await
        .unwrap();
    assert_eq!(first.summary.copied_to_remote, 1);
    assert_eq!(first.summary.bytes_transferred, 200_000);

    let (l, r) = probe_pair(local.path(), remote.path(), "photos/2024/img.raw", false).unwrap();
    assert!(l.content_hash.is_some());
    assert_eq!(l.content_hash, r.content_hash);

    let second = engine("*", true, false)
        .run(local.path(), remote.path(), SyncMode::Bidirectional)
        .await
        .unwrap();
    assert_eq!(second.summary.copied(), 0);
    assert_eq!(second.summary.skipped, 1);
}

#[tokio::test]
async fn missing_remote_mount_is_reported_as_warning() {
    let local = TempDir::new().unwrap();
    put(local.path(), "a.txt", "data", T1);
    let remote = local.path().join("..").join("definitely-not-mounted-dualsync");

    let report = engine("*", true, true)
        .run(local.path(), &remote, SyncMode::Bidirectional)
        .await
        .unwrap();

    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.outcomes[0].decision, Some(SyncDecision::CopyToRemote));
    assert_eq!(report.exit_code(), 0);
    assert!(!remote.exists());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn non_utf8_name_is_warned_not_silently_skipped() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let local = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    put(local.path(), "plain.txt", "ok", T1);
    fs::write(local.path().join(OsStr::from_bytes(b"caf\xe9.txt")), "x").unwrap();

    let report = engine("*", true, false)
        .run(local.path(), remote.path(), SyncMode::Bidirectional)
        .await
        .unwrap();

    let paths: Vec<_> = report.outcomes.iter().map(|o| o.path.as_str()).collect();
    assert_eq!(paths, vec!["plain.txt"]);
    assert_eq!(report.summary.skipped, 0);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("not valid UTF-8"));
    assert!(remote.path().join("plain.txt").exists());
}
