//! Binary index parsing (v2/v3).

use bstr::BString;
use sprig_hash::{Hasher, ObjectId};
use sprig_object::FileMode;

use crate::entry::{EntryFlags, IndexEntry, StatData};
use crate::extensions::{CacheTree, RawExtension, ResolveUndo};
use crate::{Index, IndexError, Stage};

const SIGNATURE: &[u8; 4] = b"DIRC";

/// Fixed prefix of an on-disk entry: stat (40) + oid (20) + flags (2).
const ENTRY_FIXED: usize = 62;

/// Parse an index file from raw bytes.
pub fn parse_index(data: &[u8]) -> Result<Index, IndexError> {
    if data.len() < 12 + 20 {
        return Err(IndexError::InvalidHeader("index file too short".into()));
    }

    let content_end = data.len() - 20;
    let expected = ObjectId::from_bytes(&data[content_end..])
        .map_err(|_| IndexError::InvalidHeader("invalid checksum".into()))?;
    if Hasher::digest(&data[..content_end]) != expected {
        return Err(IndexError::ChecksumMismatch);
    }

    if &data[..4] != SIGNATURE {
        return Err(IndexError::InvalidHeader(format!(
            "bad signature: {:?}",
            &data[..4]
        )));
    }
    let version = read_u32(&data[4..8]);
    if !(2..=3).contains(&version) {
        return Err(IndexError::UnsupportedVersion(version));
    }
    let entry_count = read_u32(&data[8..12]) as usize;

    let mut cursor = 12;
    let mut entries = Vec::with_capacity(entry_count);
    for _ in 0..entry_count {
        let entry = parse_entry(data, &mut cursor, content_end)?;
        entries.push(entry);
    }

    let mut cache_tree = None;
    let mut resolve_undo = None;
    let mut unknown_extensions = Vec::new();

    while cursor + 8 <= content_end {
        let sig = &data[cursor..cursor + 4];
        let size = read_u32(&data[cursor + 4..cursor + 8]) as usize;
        cursor += 8;
        if cursor + size > content_end {
            return Err(IndexError::InvalidExtension {
                sig: String::from_utf8_lossy(sig).into(),
                reason: "extension data exceeds index bounds".into(),
            });
        }
        let payload = &data[cursor..cursor + size];
        cursor += size;

        match sig {
            sig if sig == CacheTree::SIGNATURE => cache_tree = Some(CacheTree::parse(payload)?),
            sig if sig == ResolveUndo::SIGNATURE => {
                resolve_undo = Some(ResolveUndo::parse(payload)?)
            }
            _ => {
                let mut signature = [0u8; 4];
                signature.copy_from_slice(sig);
                unknown_extensions.push(RawExtension {
                    signature,
                    data: payload.to_vec(),
                });
            }
        }
    }

    Ok(Index::from_parts(
        entries,
        cache_tree,
        resolve_undo,
        unknown_extensions,
    ))
}

fn parse_entry(
    data: &[u8],
    cursor: &mut usize,
    content_end: usize,
) -> Result<IndexEntry, IndexError> {
    let start = *cursor;
    if start + ENTRY_FIXED > content_end {
        return Err(IndexError::InvalidEntry {
            offset: start,
            reason: "entry too short".into(),
        });
    }

    let f = &data[start..];
    let stat = StatData {
        ctime_secs: read_u32(&f[0..4]),
        ctime_nsecs: read_u32(&f[4..8]),
        mtime_secs: read_u32(&f[8..12]),
        mtime_nsecs: read_u32(&f[12..16]),
        dev: read_u32(&f[16..20]),
        ino: read_u32(&f[20..24]),
        uid: read_u32(&f[28..32]),
        gid: read_u32(&f[32..36]),
        size: read_u32(&f[36..40]),
    };
    let mode = FileMode::from_raw(read_u32(&f[24..28]));
    let oid = ObjectId::from_bytes(&f[40..60]).map_err(|_| IndexError::InvalidEntry {
        offset: start,
        reason: "invalid OID".into(),
    })?;

    let flag_word = u16::from_be_bytes([f[60], f[61]]);
    let extended = flag_word & 0x4000 != 0;
    let stage = Stage::from_u8(((flag_word >> 12) & 0x3) as u8)?;
    let name_len = (flag_word & 0x0FFF) as usize;

    let mut flags = EntryFlags::empty();
    flags.set(EntryFlags::ASSUME_VALID, flag_word & 0x8000 != 0);

    let mut fixed = ENTRY_FIXED;
    if extended {
        if start + fixed + 2 > content_end {
            return Err(IndexError::InvalidEntry {
                offset: start,
                reason: "truncated extended flags".into(),
            });
        }
        let extended_word = u16::from_be_bytes([f[62], f[63]]);
        flags.set(EntryFlags::SKIP_WORKTREE, extended_word & 0x4000 != 0);
        flags.set(EntryFlags::INTENT_TO_ADD, extended_word & 0x2000 != 0);
        fixed += 2;
    }

    let name_start = start + fixed;
    let name_end = if name_len < 0x0FFF {
        name_start + name_len
    } else {
        // Overlong path: stored NUL-terminated.
        data[name_start..content_end]
            .iter()
            .position(|&b| b == 0)
            .map(|i| name_start + i)
            .ok_or_else(|| IndexError::InvalidEntry {
                offset: start,
                reason: "unterminated path".into(),
            })?
    };
    if name_end > content_end {
        return Err(IndexError::InvalidEntry {
            offset: start,
            reason: "truncated path".into(),
        });
    }
    let path = BString::from(&data[name_start..name_end]);

    // Entries are NUL-padded to a multiple of 8 bytes.
    let entry_size = (fixed + (name_end - name_start) + 8) & !7;
    *cursor = start + entry_size;
    if *cursor > content_end {
        return Err(IndexError::InvalidEntry {
            offset: start,
            reason: "entry padding exceeds index bounds".into(),
        });
    }

    Ok(IndexEntry {
        path,
        oid,
        mode,
        stage,
        stat,
        flags,
    })
}

fn read_u32(data: &[u8]) -> u32 {
    u32::from_be_bytes([data[0], data[1], data[2], data[3]])
}
