//! The index: an ordered set of entries between the working tree and the
//! object database, with a per-entry skip-worktree bit.
//!
//! On disk this is the binary `DIRC` format, version 2 or — whenever any
//! entry carries an extended flag such as skip-worktree — version 3.

pub mod entry;
pub mod extensions;
mod read;
mod write;

use std::path::Path;

use bstr::{BStr, ByteSlice};

pub use entry::{EntryFlags, IndexEntry, StatData};
pub use extensions::{CacheTree, CacheTreeNode, RawExtension, ResolveUndo};

/// Errors from index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("invalid index header: {0}")]
    InvalidHeader(String),

    #[error("unsupported index version: {0}")]
    UnsupportedVersion(u32),

    #[error("index checksum mismatch")]
    ChecksumMismatch,

    #[error("invalid index entry at offset {offset}: {reason}")]
    InvalidEntry { offset: usize, reason: String },

    #[error("invalid extension '{sig}': {reason}")]
    InvalidExtension { sig: String, reason: String },

    #[error(transparent)]
    Lock(#[from] sprig_utils::LockError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Merge stage of an entry; anything above [`Stage::Normal`] marks a
/// conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Normal,
    Base,
    Ours,
    Theirs,
}

impl Stage {
    pub fn as_u8(&self) -> u8 {
        match self {
            Stage::Normal => 0,
            Stage::Base => 1,
            Stage::Ours => 2,
            Stage::Theirs => 3,
        }
    }

    pub fn from_u8(n: u8) -> Result<Self, IndexError> {
        match n {
            0 => Ok(Stage::Normal),
            1 => Ok(Stage::Base),
            2 => Ok(Stage::Ours),
            3 => Ok(Stage::Theirs),
            _ => Err(IndexError::InvalidEntry {
                offset: 0,
                reason: format!("invalid stage: {n}"),
            }),
        }
    }
}

/// The in-memory index.
pub struct Index {
    /// Entries sorted by (path, stage).
    entries: Vec<IndexEntry>,
    /// TREE extension, when present and valid.
    cache_tree: Option<CacheTree>,
    /// REUC extension.
    resolve_undo: Option<ResolveUndo>,
    /// Extensions we do not interpret, preserved for round-trip.
    unknown_extensions: Vec<RawExtension>,
}

impl Index {
    /// A fresh, empty index.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            cache_tree: None,
            resolve_undo: None,
            unknown_extensions: Vec::new(),
        }
    }

    /// Read from disk. A missing file yields an empty index.
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let file = match std::fs::File::open(path.as_ref()) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(IndexError::Io(e)),
        };
        let data = unsafe { memmap2::Mmap::map(&file) }?;
        read::parse_index(&data)
    }

    /// Parse the on-disk format from a byte buffer.
    pub fn parse(data: &[u8]) -> Result<Self, IndexError> {
        read::parse_index(data)
    }

    /// Serialize to the on-disk format (v3 when any entry needs it).
    pub fn serialize(&self) -> Vec<u8> {
        write::serialize_index(self)
    }

    /// Write atomically through a lock file at `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        let mut lock = sprig_utils::LockFile::hold(path.as_ref())?;
        lock.stage(&self.serialize());
        lock.commit()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in index order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Mutable view of all entries. Callers must keep paths unchanged.
    pub fn entries_mut(&mut self) -> &mut [IndexEntry] {
        &mut self.entries
    }

    /// Look up a stage-0 entry by path.
    pub fn get(&self, path: &BStr) -> Option<&IndexEntry> {
        self.entries
            .iter()
            .find(|e| e.path.as_bstr() == path && e.stage == Stage::Normal)
    }

    /// Add or replace an entry, keeping sort order.
    pub fn add(&mut self, entry: IndexEntry) {
        self.entries
            .retain(|e| !(e.path == entry.path && e.stage == entry.stage));
        if let Some(tree) = &mut self.cache_tree {
            tree.invalidate(entry.path.as_ref());
        }
        let pos = self
            .entries
            .binary_search_by(|e| {
                e.path
                    .cmp(&entry.path)
                    .then(e.stage.as_u8().cmp(&entry.stage.as_u8()))
            })
            .unwrap_or_else(|pos| pos);
        self.entries.insert(pos, entry);
    }

    /// Replace the whole entry set. Entries are re-sorted.
    pub fn set_entries(&mut self, mut entries: Vec<IndexEntry>) {
        entries.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then(a.stage.as_u8().cmp(&b.stage.as_u8()))
        });
        self.entries = entries;
    }

    /// Whether any entry is in an unmerged (conflicted) state.
    pub fn has_conflicts(&self) -> bool {
        self.entries.iter().any(|e| e.stage != Stage::Normal)
    }

    pub fn cache_tree(&self) -> Option<&CacheTree> {
        self.cache_tree.as_ref()
    }

    pub fn set_cache_tree(&mut self, tree: Option<CacheTree>) {
        self.cache_tree = tree;
    }

    pub fn resolve_undo(&self) -> Option<&ResolveUndo> {
        self.resolve_undo.as_ref()
    }

    /// Drop any recorded resolve-undo state.
    pub fn clear_resolve_undo(&mut self) {
        self.resolve_undo = None;
    }

    pub fn set_resolve_undo(&mut self, reuc: Option<ResolveUndo>) {
        self.resolve_undo = reuc;
    }

    pub(crate) fn unknown_extensions(&self) -> &[RawExtension] {
        &self.unknown_extensions
    }

    pub(crate) fn from_parts(
        entries: Vec<IndexEntry>,
        cache_tree: Option<CacheTree>,
        resolve_undo: Option<ResolveUndo>,
        unknown_extensions: Vec<RawExtension>,
    ) -> Self {
        Self {
            entries,
            cache_tree,
            resolve_undo,
            unknown_extensions,
        }
    }
}

impl Default for Index {
    fn default() -> Self {
        Self::new()
    }
}
