//! End-to-end tests driving the compiled `sprig` binary.

mod common;

use common::{files_on_disk, fixture_repo, sprig, sprig_with_stdin};

#[test]
fn init_keeps_root_files_only() {
    let dir = tempfile::tempdir().unwrap();
    fixture_repo(dir.path(), &["a", "folder1/a", "folder2/a"]);

    let result = sprig(dir.path(), &["init"]);
    assert_eq!(result.exit_code, 0, "stderr: {}", result.stderr);

    assert_eq!(
        std::fs::read_to_string(dir.path().join(".git/info/sparse-checkout")).unwrap(),
        "/*\n!/*/\n"
    );
    assert_eq!(files_on_disk(dir.path()), ["a"]);
}

#[test]
fn list_prints_the_pattern_file() {
    let dir = tempfile::tempdir().unwrap();
    fixture_repo(dir.path(), &["a", "folder1/a"]);

    sprig(dir.path(), &["init"]);
    let result = sprig(dir.path(), &["list"]);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout, "/*\n!/*/\n");
}

#[test]
fn list_warns_when_not_sparse() {
    let dir = tempfile::tempdir().unwrap();
    fixture_repo(dir.path(), &["a"]);

    let result = sprig(dir.path(), &["list"]);
    assert_eq!(result.exit_code, 0);
    assert!(result.stdout.is_empty());
    assert!(result.stderr.contains("not sparse"));
}

#[test]
fn set_general_patterns() {
    let dir = tempfile::tempdir().unwrap();
    fixture_repo(dir.path(), &["a", "folder1/a", "folder2/a"]);

    sprig(dir.path(), &["init"]);
    let result = sprig(dir.path(), &["set", "/*", "!/*/", "*folder*"]);
    assert_eq!(result.exit_code, 0, "stderr: {}", result.stderr);

    assert_eq!(
        std::fs::read_to_string(dir.path().join(".git/info/sparse-checkout")).unwrap(),
        "/*\n!/*/\n*folder*\n"
    );
    assert_eq!(files_on_disk(dir.path()), ["a", "folder1/a", "folder2/a"]);
}

#[test]
fn set_cone_directories() {
    let dir = tempfile::tempdir().unwrap();
    fixture_repo(
        dir.path(),
        &[
            "a",
            "folder1/a",
            "deep/a",
            "deep/deeper1/a",
            "deep/deeper1/deepest/a",
            "deep/deeper2/a",
        ],
    );

    sprig(dir.path(), &["init", "--cone"]);
    let result = sprig(dir.path(), &["set", "deep/deeper1/deepest"]);
    assert_eq!(result.exit_code, 0, "stderr: {}", result.stderr);

    assert_eq!(
        std::fs::read_to_string(dir.path().join(".git/info/sparse-checkout")).unwrap(),
        "/*\n!/*/\n/deep/\n!/deep/*/\n/deep/deeper1/\n!/deep/deeper1/*/\n/deep/deeper1/deepest/\n"
    );
    assert_eq!(
        files_on_disk(dir.path()),
        ["a", "deep/a", "deep/deeper1/a", "deep/deeper1/deepest/a"]
    );
}

#[test]
fn set_reads_patterns_from_stdin() {
    let dir = tempfile::tempdir().unwrap();
    fixture_repo(dir.path(), &["a", "deep/a", "deep/deeper1/a", "folder1/a"]);

    sprig(dir.path(), &["init", "--cone"]);
    let result = sprig_with_stdin(dir.path(), &["set", "--stdin"], "deep/deeper1\n\n");
    assert_eq!(result.exit_code, 0, "stderr: {}", result.stderr);

    assert_eq!(
        files_on_disk(dir.path()),
        ["a", "deep/a", "deep/deeper1/a"]
    );
}

#[test]
fn set_without_patterns_fails() {
    let dir = tempfile::tempdir().unwrap();
    fixture_repo(dir.path(), &["a"]);

    let result = sprig(dir.path(), &["set"]);
    assert_ne!(result.exit_code, 0);
    assert!(result.stderr.contains("no patterns specified"));
}

#[test]
fn set_that_empties_the_checkout_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    fixture_repo(dir.path(), &["file"]);

    let result = sprig(dir.path(), &["set", "nothing"]);
    assert_ne!(result.exit_code, 0);
    assert!(result.stderr.contains("leaves no entry"));

    assert!(!dir.path().join(".git/info/sparse-checkout").exists());
    assert!(!dir.path().join(".git/index.lock").exists());
    assert_eq!(files_on_disk(dir.path()), ["file"]);
}

#[test]
fn set_refuses_to_lose_local_changes() {
    let dir = tempfile::tempdir().unwrap();
    fixture_repo(dir.path(), &["a", "deep/deeper1/a", "deep/deeper2/a"]);

    sprig(dir.path(), &["init", "--cone"]);
    std::fs::create_dir_all(dir.path().join("deep/deeper2")).unwrap();
    std::fs::write(dir.path().join("deep/deeper2/a"), "edited\n").unwrap();

    // deeper2 was dematerialized by init; recreate-and-edit makes it dirty.
    let result = sprig(dir.path(), &["set", "deep/deeper1"]);
    assert_ne!(result.exit_code, 0);
    assert!(result.stderr.contains("local modifications"));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("deep/deeper2/a")).unwrap(),
        "edited\n"
    );
}

#[test]
fn add_extends_the_cone() {
    let dir = tempfile::tempdir().unwrap();
    fixture_repo(dir.path(), &["a", "deep/deeper1/a", "deep/deeper2/a"]);

    sprig(dir.path(), &["init", "--cone"]);
    sprig(dir.path(), &["set", "deep/deeper1"]);
    let result = sprig(dir.path(), &["add", "deep/deeper2"]);
    assert_eq!(result.exit_code, 0, "stderr: {}", result.stderr);

    assert_eq!(
        files_on_disk(dir.path()),
        ["a", "deep/deeper1/a", "deep/deeper2/a"]
    );
}

#[test]
fn reapply_restores_a_deleted_file() {
    let dir = tempfile::tempdir().unwrap();
    fixture_repo(dir.path(), &["a", "folder1/a"]);

    sprig(dir.path(), &["init"]);
    std::fs::remove_file(dir.path().join("a")).unwrap();

    let result = sprig(dir.path(), &["reapply"]);
    assert_eq!(result.exit_code, 0);
    assert_eq!(files_on_disk(dir.path()), ["a"]);
}

#[test]
fn disable_restores_the_full_tree() {
    let dir = tempfile::tempdir().unwrap();
    fixture_repo(dir.path(), &["a", "folder1/a", "folder2/a"]);

    sprig(dir.path(), &["init"]);
    assert_eq!(files_on_disk(dir.path()), ["a"]);

    let result = sprig(dir.path(), &["disable"]);
    assert_eq!(result.exit_code, 0, "stderr: {}", result.stderr);
    assert_eq!(files_on_disk(dir.path()), ["a", "folder1/a", "folder2/a"]);
    assert!(!dir.path().join(".git/info/sparse-checkout").exists());
}

#[test]
fn config_flags_follow_the_mode() {
    let dir = tempfile::tempdir().unwrap();
    fixture_repo(dir.path(), &["a"]);

    sprig(dir.path(), &["init", "--cone"]);
    let worktree = std::fs::read_to_string(dir.path().join(".git/config.worktree")).unwrap();
    assert!(worktree.contains("sparsecheckout = true"));
    assert!(worktree.contains("sparsecheckoutcone = true"));
    let local = std::fs::read_to_string(dir.path().join(".git/config")).unwrap();
    assert!(local.contains("worktreeconfig = true"));

    sprig(dir.path(), &["disable"]);
    let worktree = std::fs::read_to_string(dir.path().join(".git/config.worktree")).unwrap();
    assert!(worktree.contains("sparsecheckout = false"));
    assert!(worktree.contains("sparsecheckoutcone = false"));
}

#[test]
fn outside_a_repository_fails_with_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = sprig(dir.path(), &["list"]);
    assert_eq!(result.exit_code, 128);
    assert!(result.stderr.starts_with("fatal:"));
}

#[test]
fn unrecognized_cone_file_warns_on_set() {
    let dir = tempfile::tempdir().unwrap();
    fixture_repo(dir.path(), &["a", "deep/a"]);

    sprig(dir.path(), &["init", "--cone"]);
    std::fs::write(
        dir.path().join(".git/info/sparse-checkout"),
        "/*\n!/*/\n!/deep/foo\n",
    )
    .unwrap();

    let result = sprig(dir.path(), &["reapply"]);
    assert_eq!(result.exit_code, 0, "stderr: {}", result.stderr);
    assert!(result.stderr.contains("unrecognized negative pattern"));
}
