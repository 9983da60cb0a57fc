//! Index extensions: TREE (cache tree) and REUC (resolve-undo).
//!
//! Unrecognized extensions are carried as [`RawExtension`] so a rewrite never
//! drops data another tool put there.

use bstr::{BString, ByteSlice};
use sprig_hash::ObjectId;
use sprig_object::FileMode;

use crate::IndexError;

/// An extension we do not interpret.
#[derive(Debug, Clone)]
pub struct RawExtension {
    pub signature: [u8; 4],
    pub data: Vec<u8>,
}

/// TREE extension: cached tree OIDs keyed by directory, for fast commit.
#[derive(Debug, Clone)]
pub struct CacheTree {
    pub root: CacheTreeNode,
}

/// One node of the cache tree.
#[derive(Debug, Clone)]
pub struct CacheTreeNode {
    /// Subtree name (empty for the root).
    pub name: BString,
    /// Entries covered by this subtree; -1 marks the node invalid.
    pub entry_count: i32,
    /// Tree OID, meaningful only when `entry_count >= 0`.
    pub oid: Option<ObjectId>,
    /// Child subtrees.
    pub children: Vec<CacheTreeNode>,
}

impl CacheTree {
    pub const SIGNATURE: &'static [u8; 4] = b"TREE";

    /// Parse the extension payload.
    pub fn parse(data: &[u8]) -> Result<Self, IndexError> {
        let mut cursor = 0;
        // Root node carries an empty NUL-terminated name.
        if data.first() == Some(&0) {
            cursor = 1;
        }
        let root = parse_node(data, &mut cursor, b"")?;
        Ok(Self { root })
    }

    /// Serialize the extension payload.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        serialize_node(&self.root, &mut buf, true);
        buf
    }

    /// Invalidate the node covering `path` and every ancestor.
    pub fn invalidate(&mut self, path: &[u8]) {
        invalidate_node(&mut self.root, path);
    }

    /// The root tree OID, when still valid.
    pub fn root_oid(&self) -> Option<&ObjectId> {
        if self.root.entry_count >= 0 {
            self.root.oid.as_ref()
        } else {
            None
        }
    }
}

fn parse_node(data: &[u8], cursor: &mut usize, name: &[u8]) -> Result<CacheTreeNode, IndexError> {
    let bad = |reason: String| IndexError::InvalidExtension {
        sig: "TREE".into(),
        reason,
    };

    let space = data[*cursor..]
        .find_byte(b' ')
        .ok_or_else(|| bad("missing entry count".into()))?
        + *cursor;
    let entry_count: i32 = std::str::from_utf8(&data[*cursor..space])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| bad("invalid entry count".into()))?;
    *cursor = space + 1;

    let newline = data[*cursor..]
        .find_byte(b'\n')
        .ok_or_else(|| bad("missing subtree count".into()))?
        + *cursor;
    let subtree_count: usize = std::str::from_utf8(&data[*cursor..newline])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| bad("invalid subtree count".into()))?;
    *cursor = newline + 1;

    let oid = if entry_count >= 0 {
        if *cursor + 20 > data.len() {
            return Err(bad("truncated OID".into()));
        }
        let oid = ObjectId::from_bytes(&data[*cursor..*cursor + 20])
            .map_err(|e| bad(e.to_string()))?;
        *cursor += 20;
        Some(oid)
    } else {
        None
    };

    let mut children = Vec::with_capacity(subtree_count);
    for _ in 0..subtree_count {
        let nul = data[*cursor..]
            .find_byte(0)
            .ok_or_else(|| bad("missing child name".into()))?
            + *cursor;
        let child_name = data[*cursor..nul].to_vec();
        *cursor = nul + 1;
        children.push(parse_node(data, cursor, &child_name)?);
    }

    Ok(CacheTreeNode {
        name: BString::from(name),
        entry_count,
        oid,
        children,
    })
}

fn serialize_node(node: &CacheTreeNode, buf: &mut Vec<u8>, is_root: bool) {
    if !is_root {
        buf.extend_from_slice(&node.name);
        buf.push(0);
    }
    buf.extend_from_slice(node.entry_count.to_string().as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(node.children.len().to_string().as_bytes());
    buf.push(b'\n');
    if node.entry_count >= 0 {
        if let Some(oid) = &node.oid {
            buf.extend_from_slice(oid.as_bytes());
        }
    }
    for child in &node.children {
        serialize_node(child, buf, false);
    }
}

fn invalidate_node(node: &mut CacheTreeNode, path: &[u8]) -> bool {
    match path.find_byte(b'/') {
        Some(pos) => {
            let (component, rest) = (&path[..pos], &path[pos + 1..]);
            for child in &mut node.children {
                if child.name.as_bytes() == component && invalidate_node(child, rest) {
                    node.entry_count = -1;
                    node.oid = None;
                    return true;
                }
            }
            false
        }
        None => {
            node.entry_count = -1;
            node.oid = None;
            true
        }
    }
}

/// REUC extension: pre-conflict stage entries kept so a resolution can be
/// undone.
#[derive(Debug, Clone, Default)]
pub struct ResolveUndo {
    pub entries: Vec<ResolveUndoEntry>,
}

/// One resolve-undo record: the three conflict stages of a path.
#[derive(Debug, Clone)]
pub struct ResolveUndoEntry {
    pub path: BString,
    /// Mode per stage (base, ours, theirs); `None` for an absent stage.
    pub modes: [Option<FileMode>; 3],
    /// OID per stage, present where the mode is.
    pub oids: [Option<ObjectId>; 3],
}

impl ResolveUndo {
    pub const SIGNATURE: &'static [u8; 4] = b"REUC";

    /// Parse the extension payload.
    pub fn parse(data: &[u8]) -> Result<Self, IndexError> {
        let bad = |reason: String| IndexError::InvalidExtension {
            sig: "REUC".into(),
            reason,
        };
        let mut entries = Vec::new();
        let mut cursor = 0;

        while cursor < data.len() {
            let nul = data[cursor..]
                .find_byte(0)
                .ok_or_else(|| bad("missing NUL in path".into()))?
                + cursor;
            let path = BString::from(&data[cursor..nul]);
            cursor = nul + 1;

            let mut modes = [None; 3];
            for slot in &mut modes {
                let nul = data[cursor..]
                    .find_byte(0)
                    .ok_or_else(|| bad("missing NUL in mode".into()))?
                    + cursor;
                let raw = std::str::from_utf8(&data[cursor..nul])
                    .ok()
                    .and_then(|s| u32::from_str_radix(s, 8).ok())
                    .ok_or_else(|| bad("invalid mode".into()))?;
                if raw != 0 {
                    *slot = Some(FileMode::from_raw(raw));
                }
                cursor = nul + 1;
            }

            let mut oids = [None; 3];
            for (i, slot) in oids.iter_mut().enumerate() {
                if modes[i].is_some() {
                    if cursor + 20 > data.len() {
                        return Err(bad("truncated OID".into()));
                    }
                    *slot = Some(
                        ObjectId::from_bytes(&data[cursor..cursor + 20])
                            .map_err(|e| bad(e.to_string()))?,
                    );
                    cursor += 20;
                }
            }

            entries.push(ResolveUndoEntry { path, modes, oids });
        }

        Ok(Self { entries })
    }

    /// Serialize the extension payload.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for entry in &self.entries {
            buf.extend_from_slice(&entry.path);
            buf.push(0);
            for mode in &entry.modes {
                let raw = mode.map(|m| m.raw()).unwrap_or(0);
                buf.extend_from_slice(format!("{raw:o}").as_bytes());
                buf.push(0);
            }
            for (i, oid) in entry.oids.iter().enumerate() {
                if entry.modes[i].is_some() {
                    if let Some(oid) = oid {
                        buf.extend_from_slice(oid.as_bytes());
                    }
                }
            }
        }
        buf
    }
}
