//! Object identifiers and content hashing.
//!
//! Repositories handled by sprig are SHA-1 addressed; an [`ObjectId`] is the
//! 20-byte digest of `"<type> <len>\0<content>"`.

mod oid;

pub use oid::ObjectId;

use sha1::{Digest, Sha1};

/// Errors from hash parsing and computation.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("invalid hash length: expected {expected} bytes, got {actual}")]
    InvalidHashLength { expected: usize, actual: usize },

    #[error("invalid hex digest length: {0}")]
    InvalidHexLength(usize),

    #[error("invalid hex character {byte:#04x} at offset {offset}")]
    InvalidHex { byte: u8, offset: usize },
}

/// Streaming SHA-1 computation.
pub struct Hasher {
    inner: Sha1,
}

impl Hasher {
    pub fn new() -> Self {
        Self { inner: Sha1::new() }
    }

    /// Feed data into the hasher.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalize and return the digest.
    pub fn finalize(self) -> ObjectId {
        let digest = self.inner.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest);
        ObjectId::from_raw(bytes)
    }

    /// Hash a buffer in one call.
    pub fn digest(data: &[u8]) -> ObjectId {
        let mut h = Self::new();
        h.update(data);
        h.finalize()
    }

    /// Hash an object: `"<type> <len>\0<content>"`.
    pub fn hash_object(obj_type: &str, content: &[u8]) -> ObjectId {
        let mut h = Self::new();
        h.update(obj_type.as_bytes());
        h.update(b" ");
        h.update(content.len().to_string().as_bytes());
        h.update(b"\0");
        h.update(content);
        h.finalize()
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::io::Write for Hasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_blob_oid() {
        // git hash-object -t blob /dev/null
        let oid = Hasher::hash_object("blob", b"");
        assert_eq!(oid.to_hex(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }

    #[test]
    fn known_blob_oid() {
        // printf 'hello\n' | git hash-object --stdin
        let oid = Hasher::hash_object("blob", b"hello\n");
        assert_eq!(oid.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");
    }

    #[test]
    fn empty_tree_oid() {
        let oid = Hasher::hash_object("tree", b"");
        assert_eq!(oid.to_hex(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }
}
