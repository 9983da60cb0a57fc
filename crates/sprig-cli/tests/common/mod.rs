//! Shared test harness: binary discovery, a process runner with captured
//! output, and committed-repository fixtures.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use bstr::BString;
use sprig_hash::ObjectId;
use sprig_index::{Index, IndexEntry, StatData};
use sprig_object::{Commit, FileMode, Object, ObjectType, Tree, TreeEntry};
use sprig_odb::ObjectStore;
use sprig_repository::Repository;

/// Captured output from running the binary.
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Path of the compiled `sprig` binary next to the test executable.
pub fn sprig_bin() -> PathBuf {
    let mut path = std::env::current_exe()
        .unwrap()
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf();
    path.push("sprig");
    path
}

/// Run `sprig` in `dir` with the given arguments.
pub fn sprig(dir: &Path, args: &[&str]) -> CommandResult {
    let output = Command::new(sprig_bin())
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run sprig");
    CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(128),
    }
}

/// Run `sprig` with the given string piped to stdin.
pub fn sprig_with_stdin(dir: &Path, args: &[&str], input: &str) -> CommandResult {
    use std::io::Write;
    use std::process::Stdio;

    let mut child = Command::new(sprig_bin())
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn sprig");
    child
        .stdin
        .take()
        .expect("stdin piped")
        .write_all(input.as_bytes())
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait for sprig");
    CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(128),
    }
}

/// Create a repository with one commit containing `paths`, fully checked out.
pub fn fixture_repo(dir: &Path, paths: &[&str]) {
    let repo = Repository::init(dir).unwrap();

    let blobs: Vec<(String, ObjectId)> = paths
        .iter()
        .map(|path| {
            let content = format!("content of {path}\n");
            let oid = repo
                .odb()
                .write_raw(ObjectType::Blob, content.as_bytes())
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

    let mut index = Index::new();
    for (path, oid) in &blobs {
        let file_path = dir.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&file_path, format!("content of {path}\n")).unwrap();

        let mut entry = IndexEntry::new(BString::from(path.as_str()), *oid, FileMode::Regular);
        entry.stat = StatData::from_metadata(&std::fs::metadata(&file_path).unwrap());
        index.add(entry);
    }
    index.write_to(repo.git_dir().join("index")).unwrap();
}

fn write_tree(odb: &ObjectStore, files: &[(String, ObjectId)], prefix: &str) -> ObjectId {
    let mut entries = Vec::new();
    let mut subdirs: BTreeMap<&str, Vec<(String, ObjectId)>> = BTreeMap::new();

    for (path, oid) in files {
        let rel = &path[prefix.len()..];
        match rel.split_once('/') {
            Some((sub, _)) => subdirs.entry(sub).or_default().push((path.clone(), *oid)),
            None => entries.push(TreeEntry {
                mode: FileMode::Regular,
                name: BString::from(rel),
                oid: *oid,
            }),
        }
    }

    for (sub, files) in subdirs {
        let oid = write_tree(odb, &files, &format!("{prefix}{sub}/"));
        entries.push(TreeEntry {
            mode: FileMode::Tree,
            name: BString::from(sub),
            oid,
        });
    }

    odb.write(&Object::Tree(Tree { entries })).unwrap()
}

/// Repository-relative paths of all files on disk, sorted, `.git` aside.
pub fn files_on_disk(root: &Path) -> Vec<String> {
    let mut found = Vec::new();
    collect_files(root, root, &mut found);
    found.sort();
    found
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(read) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in read.flatten() {
        let path = entry.path();
        if entry.file_name() == ".git" {
            continue;
        }
        if path.is_dir() {
            collect_files(root, &path, out);
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
}
