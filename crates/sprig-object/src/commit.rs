use bstr::{BString, ByteSlice};
use sprig_hash::ObjectId;

use crate::ObjectError;

/// A commit object.
///
/// Only the tree pointer and parent list are interpreted; identities and the
/// message are carried verbatim so serialization round-trips byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// The root tree of the snapshot.
    pub tree: ObjectId,
    /// Parent commits, in declared order.
    pub parents: Vec<ObjectId>,
    /// Remaining headers and message, unparsed.
    pub rest: BString,
}

impl Commit {
    /// Parse commit content.
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut tree = None;
        let mut parents = Vec::new();
        let mut pos = 0;

        while pos < content.len() {
            let line_end = content[pos..]
                .find_byte(b'\n')
                .map(|i| pos + i)
                .unwrap_or(content.len());
            let line = &content[pos..line_end];

            if let Some(hex) = line.strip_prefix(b"tree ") {
                tree = Some(parse_oid_line(hex)?);
            } else if let Some(hex) = line.strip_prefix(b"parent ") {
                parents.push(parse_oid_line(hex)?);
            } else {
                // First non-tree/parent header; everything from here on is
                // opaque (author, committer, optional headers, message).
                let rest = BString::from(&content[pos..]);
                let tree = tree.ok_or(ObjectError::MissingCommitField { field: "tree" })?;
                return Ok(Self {
                    tree,
                    parents,
                    rest,
                });
            }
            pos = line_end + 1;
        }

        let tree = tree.ok_or(ObjectError::MissingCommitField { field: "tree" })?;
        Ok(Self {
            tree,
            parents,
            rest: BString::default(),
        })
    }

    /// Serialize commit content.
    pub fn serialize_content(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"tree ");
        out.extend_from_slice(self.tree.to_hex().as_bytes());
        out.push(b'\n');
        for parent in &self.parents {
            out.extend_from_slice(b"parent ");
            out.extend_from_slice(parent.to_hex().as_bytes());
            out.push(b'\n');
        }
        out.extend_from_slice(&self.rest);
        out
    }
}

fn parse_oid_line(hex: &[u8]) -> Result<ObjectId, ObjectError> {
    let hex = std::str::from_utf8(hex)
        .map_err(|_| ObjectError::InvalidHeader("non-ASCII object id".into()))?;
    Ok(ObjectId::from_hex(hex.trim_end())?)
}
