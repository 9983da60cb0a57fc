//! The pattern file, the two config flags, and the transactions that move
//! them together.
//!
//! On-disk artifacts advance in a fixed order: config flips forward, the
//! index updates under its lock, the pattern file is written under its own
//! lock, and both commit. Any failure rolls back in reverse and
//! re-materializes the previous pattern set, leaving every artifact
//! byte-identical to its pre-call state.

use std::path::PathBuf;

use bstr::{BString, ByteSlice};
use sprig_config::{Config, ConfigScope};
use sprig_repository::Repository;
use sprig_utils::LockFile;

use crate::checkout;
use crate::pattern::PatternList;
use crate::SparseError;

const SPARSE_CHECKOUT_KEY: &str = "core.sparseCheckout";
const CONE_KEY: &str = "core.sparseCheckoutCone";

/// The sparse-checkout mode, derived from the two config flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `core.sparseCheckout` unset or false: the feature is off.
    NoPatterns,
    /// Sparse checkout with general patterns.
    AllPatterns,
    /// Sparse checkout with cone patterns.
    ConePatterns,
}

impl Mode {
    pub fn from_config(config: &Config) -> Result<Self, SparseError> {
        if !config.get_bool_or(SPARSE_CHECKOUT_KEY, false)? {
            return Ok(Mode::NoPatterns);
        }
        if config.get_bool_or(CONE_KEY, false)? {
            Ok(Mode::ConePatterns)
        } else {
            Ok(Mode::AllPatterns)
        }
    }
}

/// Current mode of a repository.
pub fn mode(repo: &Repository) -> Result<Mode, SparseError> {
    Mode::from_config(repo.config())
}

/// Path of the pattern file.
pub fn sparse_file_path(repo: &Repository) -> PathBuf {
    repo.git_dir().join("info").join("sparse-checkout")
}

/// Write both config flags for `mode` to the worktree scope (enabling the
/// worktreeConfig extension on first use).
pub fn set_mode(repo: &mut Repository, mode: Mode) -> Result<(), SparseError> {
    let sparse = if mode == Mode::NoPatterns {
        "false"
    } else {
        "true"
    };
    let cone = if mode == Mode::ConePatterns {
        "true"
    } else {
        "false"
    };

    let config = repo.config_mut();
    config
        .set(SPARSE_CHECKOUT_KEY, sparse, ConfigScope::Worktree)
        .map_err(SparseError::ConfigWriteFailed)?;
    config
        .set(CONE_KEY, cone, ConfigScope::Worktree)
        .map_err(SparseError::ConfigWriteFailed)?;
    Ok(())
}

/// Read and parse the pattern file. `Ok(None)` when it does not exist.
pub fn read_patterns(repo: &Repository) -> Result<Option<PatternList>, SparseError> {
    let content = match std::fs::read(sparse_file_path(repo)) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SparseError::Io(e)),
    };
    let cone = mode(repo)? == Mode::ConePatterns;
    Ok(Some(PatternList::from_bytes(&content, cone)?))
}

/// Raw pattern-file content, for `list`. `Ok(None)` when absent.
pub fn read_raw(repo: &Repository) -> Result<Option<Vec<u8>>, SparseError> {
    match std::fs::read(sparse_file_path(repo)) {
        Ok(c) => Ok(Some(c)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SparseError::Io(e)),
    }
}

/// Serialize a pattern list the way the pattern file stores it: canonical
/// layout for cone lists, declared order for general ones.
pub fn serialize_patterns(pl: &PatternList) -> Vec<u8> {
    if pl.use_cone() {
        serialize_cone(pl)
    } else {
        serialize_general(pl)
    }
}

fn serialize_general(pl: &PatternList) -> Vec<u8> {
    let mut out = Vec::new();
    for pattern in pl.patterns() {
        if pattern.flags.negative {
            out.push(b'!');
        }
        out.extend_from_slice(&pattern.text);
        if pattern.flags.mustbedir {
            out.push(b'/');
        }
        out.push(b'\n');
    }
    out
}

/// The canonical cone layout: the root pair, then each surviving parent as
/// `p/` + `!p/*/`, then each surviving recursive key as `r/`, both groups
/// sorted. Keys covered by an ancestor recursive key are pruned.
fn serialize_cone(pl: &PatternList) -> Vec<u8> {
    let cone = pl.cone();
    let mut out = b"/*\n!/*/\n".to_vec();

    let mut parents: Vec<&BString> = cone
        .parent_keys()
        .filter(|k| {
            !cone.contains_recursive(k.as_bstr()) && !cone.contains_ancestor_recursive(k.as_bstr())
        })
        .collect();
    parents.sort();

    for parent in parents {
        push_line(&mut out, parent, true);
    }

    let mut recursive: Vec<&BString> = cone
        .recursive_keys()
        .filter(|k| !cone.contains_ancestor_recursive(k.as_bstr()))
        .collect();
    recursive.sort();

    for key in recursive {
        push_line(&mut out, key, false);
    }

    out
}

fn push_line(out: &mut Vec<u8>, key: &BString, parent: bool) {
    out.extend_from_slice(key);
    out.extend_from_slice(b"/\n");
    if parent {
        out.push(b'!');
        out.extend_from_slice(key);
        out.extend_from_slice(b"/*/\n");
    }
}

/// Replace the pattern set: reconcile the working tree inside the held
/// pattern-file lock, then commit the new file.
pub fn set(repo: &mut Repository, pl: &PatternList) -> Result<(), SparseError> {
    let prev_mode = mode(repo)?;
    let target_mode = if pl.use_cone() {
        Mode::ConePatterns
    } else {
        Mode::AllPatterns
    };
    let flipped = prev_mode != target_mode;
    if flipped {
        set_mode(repo, target_mode)?;
    }

    match reconcile_and_commit(repo, pl) {
        Ok(()) => Ok(()),
        Err(e) => {
            if flipped {
                let _ = set_mode(repo, prev_mode);
            }
            // Re-materialize whatever the (unchanged) pattern file says.
            let _ = checkout::update_working_directory(repo, None);
            Err(e)
        }
    }
}

/// The inner half of `set`: reconcile once inside the held pattern-file
/// lock, then write the new file through it. On any error the lock guard
/// rolls back on drop.
fn reconcile_and_commit(repo: &Repository, pl: &PatternList) -> Result<(), SparseError> {
    let path = sparse_file_path(repo);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut lock = LockFile::hold(&path)?;

    checkout::update_working_directory(repo, Some(pl))?;
    lock.stage(&serialize_patterns(pl));
    lock.commit()?;
    Ok(())
}

/// Merge additional patterns into the current set and run the same
/// transaction as `set`.
pub fn add(repo: &mut Repository, inputs: &[BString]) -> Result<(), SparseError> {
    let cone = mode(repo)? == Mode::ConePatterns;
    let mut pl = match read_patterns(repo)? {
        Some(pl) => pl,
        None => PatternList::new(cone),
    };
    for input in inputs {
        if pl.use_cone() {
            pl.cone_insert(input.as_bstr())?;
        } else {
            pl.add_pattern(input.as_bstr(), 0)?;
        }
    }
    set(repo, &pl)
}

/// Enable sparse checkout. Reuses an existing pattern file; otherwise seeds
/// "everything at the root, no subdirectories".
pub fn init(repo: &mut Repository, cone: bool) -> Result<(), SparseError> {
    let target = if cone {
        Mode::ConePatterns
    } else {
        Mode::AllPatterns
    };
    set_mode(repo, target)?;

    let path = sparse_file_path(repo);
    if path.is_file() {
        // A pattern file is already there: reconcile to it.
        return checkout::update_working_directory(repo, None);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut lock = LockFile::hold(&path)?;
    lock.stage(b"/*\n!/*/\n");
    lock.commit()?;

    if repo.head_commit()?.is_none() {
        // Fresh repository: nothing to reconcile yet.
        return Ok(());
    }
    checkout::update_working_directory(repo, None)
}

/// Re-run the reconciler against the on-disk pattern file.
pub fn reapply(repo: &Repository) -> Result<(), SparseError> {
    checkout::update_working_directory(repo, None)
}

/// Turn sparse checkout off: restore every file, drop the pattern file, then
/// clear the flags. Passing through AllPatterns keeps the working tree full
/// before the feature flag goes false.
pub fn disable(repo: &mut Repository) -> Result<(), SparseError> {
    set_mode(repo, Mode::AllPatterns)?;

    let everything = PatternList::everything();
    checkout::update_working_directory(repo, Some(&everything))?;

    match std::fs::remove_file(sparse_file_path(repo)) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(SparseError::Io(e)),
    }

    set_mode(repo, Mode::NoPatterns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bstr::BStr;

    fn cone_list(paths: &[&str]) -> PatternList {
        let mut pl = PatternList::new(true);
        for path in paths {
            pl.cone_insert(BStr::new(*path)).unwrap();
        }
        pl
    }

    #[test]
    fn cone_canonical_layout() {
        let pl = cone_list(&["deep/deeper1/deepest"]);
        assert_eq!(
            serialize_patterns(&pl),
            b"/*\n!/*/\n/deep/\n!/deep/*/\n/deep/deeper1/\n!/deep/deeper1/*/\n/deep/deeper1/deepest/\n"
        );
    }

    #[test]
    fn cone_prunes_keys_under_recursive_ancestor() {
        let pl = cone_list(&["deep", "deep/deeper1/deepest"]);
        assert_eq!(serialize_patterns(&pl), b"/*\n!/*/\n/deep/\n");
    }

    #[test]
    fn cone_sorted_output() {
        let pl = cone_list(&["zeta", "alpha", "midway/sub"]);
        assert_eq!(
            serialize_patterns(&pl),
            b"/*\n!/*/\n/midway/\n!/midway/*/\n/alpha/\n/midway/sub/\n/zeta/\n"
        );
    }

    #[test]
    fn general_verbatim_layout() {
        let mut pl = PatternList::new(false);
        pl.add_pattern(BStr::new("/*"), 0).unwrap();
        pl.add_pattern(BStr::new("!/*/"), 0).unwrap();
        pl.add_pattern(BStr::new("*folder*"), 0).unwrap();
        assert_eq!(serialize_patterns(&pl), b"/*\n!/*/\n*folder*\n");
    }

    #[test]
    fn canonical_serialization_is_a_fixed_point() {
        let pl = cone_list(&["deep/deeper1/deepest", "folder1"]);
        let first = serialize_patterns(&pl);
        let reparsed = PatternList::from_bytes(&first, true).unwrap();
        assert!(reparsed.use_cone());
        assert_eq!(serialize_patterns(&reparsed), first);
    }
}
