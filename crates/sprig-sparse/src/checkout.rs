//! Working-tree reconciliation: a one-way merge of the HEAD tree into the
//! index, with skip-worktree bits assigned from a pattern list.
//!
//! The merge is two-pass: the first pass computes every entry's verdict and
//! refuses destructive outcomes before anything is touched; the second pass
//! materializes and removes files. A failure before the index lock commits
//! leaves every on-disk artifact exactly as it was.

use std::path::{Path, PathBuf};

use bstr::{BString, ByteSlice};
use sprig_hash::{Hasher, ObjectId};
use sprig_index::{CacheTree, CacheTreeNode, Index, IndexEntry, StatData};
use sprig_object::FileMode;
use sprig_odb::ObjectStore;
use sprig_repository::Repository;
use sprig_utils::LockFile;

use crate::matcher::Verdict;
use crate::pattern::PatternList;
use crate::{persist, SparseError};

/// One file reachable from the HEAD tree.
struct TreeFile {
    path: BString,
    oid: ObjectId,
    mode: FileMode,
}

/// What pass 2 will do for one entry.
enum Action {
    /// Matched and already on disk.
    Keep,
    /// Matched but absent: write this blob content.
    Materialize(Vec<u8>),
    /// Unmatched: drop from the working tree.
    Remove,
    /// Unmatched and already absent.
    Skip,
}

struct Plan {
    entry: IndexEntry,
    action: Action,
}

/// Make the working tree reflect HEAD restricted to `patterns`.
///
/// `None` means "read the on-disk pattern file" (a missing file includes
/// everything). A repository without a HEAD commit is a no-op.
pub fn update_working_directory(
    repo: &Repository,
    patterns: Option<&PatternList>,
) -> Result<(), SparseError> {
    let mut index = repo.read_index()?;
    if index.has_conflicts() {
        return Err(SparseError::UnmergedIndex);
    }

    let Some(tree_oid) = repo.head_tree()? else {
        return Ok(());
    };

    let stored;
    let pl = match patterns {
        Some(pl) => pl,
        None => {
            stored = persist::read_patterns(repo)?.unwrap_or_else(PatternList::everything);
            &stored
        }
    };

    let mut files = Vec::new();
    let cache_root = flatten_tree(repo.odb(), &tree_oid, b"", b"", &mut files)?;

    index.clear_resolve_undo();
    index.set_cache_tree(None);

    let mut lock = LockFile::hold(repo.index_path())?;

    // Pass 1: plan and verify. No filesystem writes happen here.
    let plans = plan_merge(repo, &index, &files, pl)?;

    // Pass 2: apply.
    let mut new_entries = Vec::with_capacity(plans.len());
    for plan in plans {
        let mut entry = plan.entry;
        match plan.action {
            Action::Keep | Action::Skip => {}
            Action::Materialize(content) => {
                let path = worktree_path(repo.work_tree(), entry.path.as_ref());
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                write_file(&path, &content, entry.mode)?;
                entry.stat = StatData::from_metadata(&std::fs::symlink_metadata(&path)?);
            }
            Action::Remove => {
                let path = worktree_path(repo.work_tree(), entry.path.as_ref());
                match std::fs::remove_file(&path) {
                    Ok(()) => prune_empty_dirs(repo.work_tree(), &path),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(SparseError::Io(e)),
                }
            }
        }
        new_entries.push(entry);
    }

    index.set_entries(new_entries);
    index.set_cache_tree(Some(CacheTree { root: cache_root }));

    lock.stage(&index.serialize());
    lock.commit()?;
    Ok(())
}

/// Pass 1: compute the new entry set and the action per entry, refusing
/// destructive results up front.
fn plan_merge(
    repo: &Repository,
    old_index: &Index,
    files: &[TreeFile],
    pl: &PatternList,
) -> Result<Vec<Plan>, SparseError> {
    let mut plans = Vec::with_capacity(files.len());
    let mut included = 0usize;

    for file in files {
        let is_dir = matches!(file.mode, FileMode::Gitlink);
        let matched = pl.matches(file.path.as_bstr(), is_dir) == Verdict::Include;
        let old = old_index.get(file.path.as_bstr());
        let wt_path = worktree_path(repo.work_tree(), file.path.as_ref());
        let meta = std::fs::symlink_metadata(&wt_path).ok();

        let mut entry = IndexEntry::new(file.path.clone(), file.oid, file.mode);
        if let Some(old) = old {
            entry.flags = old.flags;
        }
        entry.set_skip_worktree(!matched);

        let action = if matched {
            included += 1;
            match &meta {
                Some(_) => {
                    // Keep whatever is on disk. The old entry's cached stat
                    // is carried forward wholesale when it still names the
                    // same blob, so a no-op reconcile rewrites the index
                    // byte-identically.
                    if let Some(old) = old {
                        if old.oid == file.oid {
                            entry.stat = old.stat;
                        }
                    }
                    Action::Keep
                }
                None => {
                    let blob = repo.odb().read_blob(&file.oid)?;
                    Action::Materialize(blob.data.to_vec())
                }
            }
        } else {
            match &meta {
                Some(meta) => {
                    // Anything on disk at this path whose content is not the
                    // committed blob would be lost by the removal, whether it
                    // is a tracked edit or a recreation over a skipped entry.
                    if file_differs(meta, &wt_path, &file.oid, old)? {
                        return Err(SparseError::WouldLoseChanges {
                            path: file.path.clone(),
                        });
                    }
                    Action::Remove
                }
                None => Action::Skip,
            }
        };

        plans.push(Plan { entry, action });
    }

    if included == 0 {
        return Err(SparseError::EmptyCheckout);
    }

    Ok(plans)
}

/// Whether the on-disk file's content no longer matches the blob recorded
/// for it.
fn file_differs(
    meta: &std::fs::Metadata,
    path: &Path,
    head_oid: &ObjectId,
    old: Option<&IndexEntry>,
) -> Result<bool, SparseError> {
    if !meta.is_file() {
        // A directory or symlink where a regular file was tracked.
        return Ok(true);
    }
    if let Some(old) = old {
        if old.oid == *head_oid && stat_is_fresh(&old.stat, meta) {
            return Ok(false);
        }
    }
    let content = std::fs::read(path)?;
    Ok(Hasher::hash_object("blob", &content) != *head_oid)
}

/// The freshness gate the removal check needs: size and the mtime pair
/// against the snapshot taken when the blob was materialized. A stale or
/// zeroed snapshot only costs a content hash, never a wrong verdict, so
/// nothing finer than size+mtime is consulted.
fn stat_is_fresh(stat: &StatData, meta: &std::fs::Metadata) -> bool {
    let now = StatData::from_metadata(meta);
    stat.size == now.size
        && stat.mtime_secs == now.mtime_secs
        && stat.mtime_nsecs == now.mtime_nsecs
}

/// Recursively flatten a tree into `(path, oid, mode)` records, building the
/// cache-tree node for re-priming along the way.
fn flatten_tree(
    odb: &ObjectStore,
    tree_oid: &ObjectId,
    prefix: &[u8],
    name: &[u8],
    out: &mut Vec<TreeFile>,
) -> Result<CacheTreeNode, SparseError> {
    let tree = odb.read_tree(tree_oid)?;
    let mut children = Vec::new();
    let mut count: i32 = 0;

    for entry in tree.iter() {
        let mut full = BString::from(prefix);
        full.extend_from_slice(&entry.name);

        if entry.mode.is_tree() {
            full.push(b'/');
            let child = flatten_tree(odb, &entry.oid, &full, &entry.name, out)?;
            count += child.entry_count;
            children.push(child);
        } else {
            out.push(TreeFile {
                path: full,
                oid: entry.oid,
                mode: entry.mode,
            });
            count += 1;
        }
    }

    Ok(CacheTreeNode {
        name: BString::from(name),
        entry_count: count,
        oid: Some(*tree_oid),
        children,
    })
}

fn worktree_path(work_tree: &Path, rel: &[u8]) -> PathBuf {
    work_tree.join(rel.to_path_lossy())
}

#[cfg(unix)]
fn write_file(path: &Path, content: &[u8], mode: FileMode) -> Result<(), SparseError> {
    use std::os::unix::fs::PermissionsExt;

    if mode.is_symlink() {
        let raw = BString::from(content);
        let target = raw.to_path_lossy().into_owned();
        match std::os::unix::fs::symlink(&target, path) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                std::fs::remove_file(path)?;
                std::os::unix::fs::symlink(&target, path)?;
                return Ok(());
            }
            Err(e) => return Err(SparseError::Io(e)),
        }
    }

    std::fs::write(path, content)?;
    if mode.is_executable() {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn write_file(path: &Path, content: &[u8], _mode: FileMode) -> Result<(), SparseError> {
    std::fs::write(path, content)?;
    Ok(())
}

/// Remove now-empty directories between a deleted file and the worktree root.
fn prune_empty_dirs(work_tree: &Path, removed: &Path) {
    let mut dir = removed.parent();
    while let Some(current) = dir {
        if current == work_tree {
            break;
        }
        let empty = std::fs::read_dir(current)
            .map(|mut it| it.next().is_none())
            .unwrap_or(false);
        if !empty || std::fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
}
