//! Shared fixtures: build a committed repository with a fully materialized
//! working tree, entirely through the library crates.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use bstr::BString;
use sprig_hash::ObjectId;
use sprig_index::{Index, IndexEntry, StatData};
use sprig_object::{Commit, FileMode, Object, Tree, TreeEntry};
use sprig_odb::ObjectStore;
use sprig_repository::Repository;

pub struct TestRepo {
    /// Keeps the directory alive for the duration of the test.
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    pub fn work_tree(&self) -> &Path {
        self.repo.work_tree()
    }

    pub fn git_dir(&self) -> &Path {
        self.repo.git_dir()
    }

    /// The file's conventional fixture content.
    pub fn content_of(path: &str) -> String {
        format!("content of {path}\n")
    }

    /// Repository-relative paths of all files on disk, sorted, `.git` aside.
    pub fn files_on_disk(&self) -> Vec<String> {
        let mut found = Vec::new();
        collect_files(self.work_tree(), self.work_tree(), &mut found);
        found.sort();
        found
    }

    /// Paths of index entries with the skip-worktree bit set, sorted.
    pub fn skipped_paths(&self) -> Vec<String> {
        let index = self.repo.read_index().unwrap();
        let mut paths: Vec<String> = index
            .entries()
            .iter()
            .filter(|e| e.is_skipped())
            .map(|e| e.path.to_string())
            .collect();
        paths.sort();
        paths
    }

    pub fn pattern_file(&self) -> Option<Vec<u8>> {
        std::fs::read(self.git_dir().join("info/sparse-checkout")).ok()
    }

    pub fn config_files(&self) -> (Vec<u8>, Vec<u8>) {
        let local = std::fs::read(self.git_dir().join("config")).unwrap_or_default();
        let worktree = std::fs::read(self.git_dir().join("config.worktree")).unwrap_or_default();
        (local, worktree)
    }

    pub fn index_bytes(&self) -> Vec<u8> {
        std::fs::read(self.git_dir().join("index")).unwrap_or_default()
    }

    pub fn assert_no_stale_locks(&self) {
        assert!(
            !self.git_dir().join("index.lock").exists(),
            "index.lock left behind"
        );
        assert!(
            !self.git_dir().join("info/sparse-checkout.lock").exists(),
            "sparse-checkout.lock left behind"
        );
    }

    /// Reload configuration after an engine call mutated it on disk.
    pub fn reload(&mut self) {
        self.repo.reload_config().unwrap();
    }
}

/// A repository with one commit containing `paths`, all materialized.
pub fn repo_with_files(paths: &[&str]) -> TestRepo {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();

    let blobs: Vec<(String, ObjectId)> = paths
        .iter()
        .map(|path| {
            let oid = repo
                .odb()
                .write_raw(
                    sprig_object::ObjectType::Blob,
                    TestRepo::content_of(path).as_bytes(),
                )
                .unwrap();
            (path.to_string(), oid)
        })
        .collect();

    let tree_oid = write_tree(repo.odb(), &blobs, "");
    let commit = Commit {
        tree: tree_oid,
        parents: Vec::new(),
        rest: BString::from(
            "author Test <test@example.com> 1234567890 +0000\ncommitter Test <test@example.com> 1234567890 +0000\n\nfixture\n",
        ),
    };
    let commit_oid = repo.odb().write(&Object::Commit(commit)).unwrap();
    std::fs::write(
        repo.git_dir().join("refs/heads/main"),
        format!("{}\n", commit_oid.to_hex()),
    )
    .unwrap();

    // Materialize the full working tree and a matching index.
    let mut index = Index::new();
    for (path, oid) in &blobs {
        let file_path = repo.work_tree().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&file_path, TestRepo::content_of(path)).unwrap();

        let mut entry = IndexEntry::new(BString::from(path.as_str()), *oid, FileMode::Regular);
        entry.stat = StatData::from_metadata(&std::fs::metadata(&file_path).unwrap());
        index.add(entry);
    }
    index.write_to(repo.git_dir().join("index")).unwrap();

    TestRepo { dir, repo }
}

/// Recursively write tree objects for the given `(path, blob)` pairs.
fn write_tree(odb: &ObjectStore, files: &[(String, ObjectId)], prefix: &str) -> ObjectId {
    let mut entries = Vec::new();
    let mut subdirs: BTreeMap<&str, Vec<(String, ObjectId)>> = BTreeMap::new();

    for (path, oid) in files {
        let rel = &path[prefix.len()..];
        match rel.split_once('/') {
            Some((dir, _)) => subdirs.entry(dir).or_default().push((path.clone(), *oid)),
            None => entries.push(TreeEntry {
                mode: FileMode::Regular,
                name: BString::from(rel),
                oid: *oid,
            }),
        }
    }

    for (dir, sub) in subdirs {
        let sub_prefix = format!("{prefix}{dir}/");
        let oid = write_tree(odb, &sub, &sub_prefix);
        entries.push(TreeEntry {
            mode: FileMode::Tree,
            name: BString::from(dir),
            oid,
        });
    }

    odb.write(&Object::Tree(Tree { entries })).unwrap()
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(read) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in read.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        if name == ".git" {
            continue;
        }
        if path.is_dir() {
            collect_files(root, &path, out);
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
}
