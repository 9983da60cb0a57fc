//! Binary index serialization.
//!
//! Version 2 is written unless some entry carries an extended flag
//! (skip-worktree, intent-to-add), which forces version 3.

use sprig_hash::Hasher;

use crate::entry::{EntryFlags, IndexEntry};
use crate::extensions::{CacheTree, ResolveUndo};
use crate::Index;

const SIGNATURE: &[u8; 4] = b"DIRC";

/// Serialize the index to the on-disk byte format.
pub fn serialize_index(index: &Index) -> Vec<u8> {
    let version: u32 = if index
        .entries()
        .iter()
        .any(|e| e.flags.needs_extended())
    {
        3
    } else {
        2
    };

    let mut buf = Vec::new();
    buf.extend_from_slice(SIGNATURE);
    buf.extend_from_slice(&version.to_be_bytes());
    buf.extend_from_slice(&(index.len() as u32).to_be_bytes());

    for entry in index.entries() {
        write_entry(&mut buf, entry);
    }

    if let Some(tree) = index.cache_tree() {
        write_extension(&mut buf, CacheTree::SIGNATURE, &tree.serialize());
    }
    if let Some(reuc) = index.resolve_undo() {
        write_extension(&mut buf, ResolveUndo::SIGNATURE, &reuc.serialize());
    }
    for ext in index.unknown_extensions() {
        write_extension(&mut buf, &ext.signature, &ext.data);
    }

    let checksum = Hasher::digest(&buf);
    buf.extend_from_slice(checksum.as_bytes());
    buf
}

fn write_extension(buf: &mut Vec<u8>, signature: &[u8; 4], payload: &[u8]) {
    buf.extend_from_slice(signature);
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
}

fn write_entry(buf: &mut Vec<u8>, entry: &IndexEntry) {
    let start = buf.len();

    buf.extend_from_slice(&entry.stat.ctime_secs.to_be_bytes());
    buf.extend_from_slice(&entry.stat.ctime_nsecs.to_be_bytes());
    buf.extend_from_slice(&entry.stat.mtime_secs.to_be_bytes());
    buf.extend_from_slice(&entry.stat.mtime_nsecs.to_be_bytes());
    buf.extend_from_slice(&entry.stat.dev.to_be_bytes());
    buf.extend_from_slice(&entry.stat.ino.to_be_bytes());
    buf.extend_from_slice(&entry.mode.raw().to_be_bytes());
    buf.extend_from_slice(&entry.stat.uid.to_be_bytes());
    buf.extend_from_slice(&entry.stat.gid.to_be_bytes());
    buf.extend_from_slice(&entry.stat.size.to_be_bytes());
    buf.extend_from_slice(entry.oid.as_bytes());

    let extended = entry.flags.needs_extended();
    let name_len = entry.path.len().min(0x0FFF) as u16;
    let mut flag_word: u16 = name_len;
    flag_word |= (entry.stage.as_u8() as u16) << 12;
    if entry.flags.contains(EntryFlags::ASSUME_VALID) {
        flag_word |= 0x8000;
    }
    if extended {
        flag_word |= 0x4000;
    }
    buf.extend_from_slice(&flag_word.to_be_bytes());

    let mut fixed = 62;
    if extended {
        let mut extended_word: u16 = 0;
        if entry.flags.contains(EntryFlags::SKIP_WORKTREE) {
            extended_word |= 0x4000;
        }
        if entry.flags.contains(EntryFlags::INTENT_TO_ADD) {
            extended_word |= 0x2000;
        }
        buf.extend_from_slice(&extended_word.to_be_bytes());
        fixed += 2;
    }

    buf.extend_from_slice(&entry.path);

    // NUL-pad to a multiple of 8, at least one byte.
    let entry_size = (fixed + entry.path.len() + 8) & !7;
    buf.resize(start + entry_size, 0);
}
