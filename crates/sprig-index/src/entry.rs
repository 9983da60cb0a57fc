//! Index entry types.

use bstr::BString;
use sprig_hash::ObjectId;
use sprig_object::FileMode;

use crate::Stage;

/// A single index entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Path relative to the repository root, `/`-separated.
    pub path: BString,
    /// Blob OID.
    pub oid: ObjectId,
    /// File mode.
    pub mode: FileMode,
    /// Merge stage.
    pub stage: Stage,
    /// Filesystem snapshot from when the entry was last materialized.
    pub stat: StatData,
    /// Entry flags.
    pub flags: EntryFlags,
}

impl IndexEntry {
    /// A stage-0 entry with an empty snapshot and no flags.
    pub fn new(path: BString, oid: ObjectId, mode: FileMode) -> Self {
        Self {
            path,
            oid,
            mode,
            stage: Stage::Normal,
            stat: StatData::default(),
            flags: EntryFlags::empty(),
        }
    }

    /// Whether the entry is excluded from the working tree.
    pub fn is_skipped(&self) -> bool {
        self.flags.contains(EntryFlags::SKIP_WORKTREE)
    }

    /// Flip the skip-worktree bit.
    pub fn set_skip_worktree(&mut self, skip: bool) {
        self.flags.set(EntryFlags::SKIP_WORKTREE, skip);
    }
}

bitflags::bitflags! {
    /// Per-entry flags. `ASSUME_VALID` travels in the base flag word of the
    /// on-disk entry; the other two live in the v3 extended word and force
    /// version 3 when set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EntryFlags: u8 {
        /// Assume the entry is unchanged (`--assume-unchanged`).
        const ASSUME_VALID = 1 << 0;
        /// Placeholder from `add -N`.
        const INTENT_TO_ADD = 1 << 1;
        /// Do not materialize this entry in the working tree.
        const SKIP_WORKTREE = 1 << 2;
    }
}

impl EntryFlags {
    /// True when serializing this entry requires the v3 extended word.
    pub fn needs_extended(&self) -> bool {
        self.intersects(Self::INTENT_TO_ADD | Self::SKIP_WORKTREE)
    }
}

/// The stat fields of an on-disk index entry.
///
/// All ten words are carried so a rewritten index preserves whatever a
/// previous writer recorded. The engine itself consults only `size` and the
/// mtime pair: its freshness gate (in the reconciler) falls back to hashing
/// the file against the object store whenever those disagree, so the rest of
/// the fields are round-trip freight here, not inputs to any decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatData {
    pub ctime_secs: u32,
    pub ctime_nsecs: u32,
    pub mtime_secs: u32,
    pub mtime_nsecs: u32,
    pub dev: u32,
    pub ino: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
}

impl StatData {
    /// Snapshot filesystem metadata. Fields the platform cannot provide are
    /// left zero, which every reader treats as "unknown".
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        let mut stat = Self {
            size: meta.len() as u32,
            ..Self::default()
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            stat.ctime_secs = meta.ctime() as u32;
            stat.ctime_nsecs = meta.ctime_nsec() as u32;
            stat.mtime_secs = meta.mtime() as u32;
            stat.mtime_nsecs = meta.mtime_nsec() as u32;
            stat.dev = meta.dev() as u32;
            stat.ino = meta.ino() as u32;
            stat.uid = meta.uid();
            stat.gid = meta.gid();
        }

        #[cfg(not(unix))]
        if let Ok(modified) = meta.modified() {
            if let Ok(since_epoch) = modified.duration_since(std::time::UNIX_EPOCH) {
                stat.mtime_secs = since_epoch.as_secs() as u32;
                stat.mtime_nsecs = since_epoch.subsec_nanos();
            }
        }

        stat
    }
}
