//! Loose object storage.
//!
//! Each object lives at `objects/xx/yyyy…` (first hex byte, then the rest),
//! zlib-compressed, with a `"<type> <size>\0"` header ahead of the content.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use sprig_hash::{Hasher, ObjectId};
use sprig_object::{write_header, Blob, Commit, Object, ObjectType, Tree};

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum OdbError {
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    #[error("corrupt object {oid}: {reason}")]
    Corrupt { oid: String, reason: String },

    #[error("object {oid} is a {actual}, expected {expected}")]
    WrongType {
        oid: ObjectId,
        expected: ObjectType,
        actual: ObjectType,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Object(#[from] sprig_object::ObjectError),
}

/// The loose object directory (`<gitdir>/objects/`).
pub struct ObjectStore {
    objects_dir: PathBuf,
    compression: Compression,
}

impl ObjectStore {
    /// Open the store rooted at an `objects/` directory.
    pub fn open(objects_dir: impl AsRef<Path>) -> Self {
        Self {
            objects_dir: objects_dir.as_ref().to_path_buf(),
            compression: Compression::default(),
        }
    }

    /// File path for the given OID.
    pub fn object_path(&self, oid: &ObjectId) -> PathBuf {
        self.objects_dir.join(oid.loose_path())
    }

    /// Whether the object exists.
    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.object_path(oid).is_file()
    }

    /// Read an object. `Ok(None)` when absent, `Err` when present but corrupt.
    pub fn read(&self, oid: &ObjectId) -> Result<Option<Object>, OdbError> {
        let compressed = match fs::read(self.object_path(oid)) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(OdbError::Io(e)),
        };

        let mut decoder = ZlibDecoder::new(&compressed[..]);
        let mut raw = Vec::new();
        decoder
            .read_to_end(&mut raw)
            .map_err(|e| OdbError::Corrupt {
                oid: oid.to_hex(),
                reason: format!("zlib: {e}"),
            })?;

        Ok(Some(Object::parse(&raw)?))
    }

    /// Read an object that must exist and be a tree.
    pub fn read_tree(&self, oid: &ObjectId) -> Result<Tree, OdbError> {
        match self.read(oid)?.ok_or(OdbError::NotFound(*oid))? {
            Object::Tree(tree) => Ok(tree),
            other => Err(OdbError::WrongType {
                oid: *oid,
                expected: ObjectType::Tree,
                actual: other.object_type(),
            }),
        }
    }

    /// Read an object that must exist and be a commit.
    pub fn read_commit(&self, oid: &ObjectId) -> Result<Commit, OdbError> {
        match self.read(oid)?.ok_or(OdbError::NotFound(*oid))? {
            Object::Commit(commit) => Ok(commit),
            other => Err(OdbError::WrongType {
                oid: *oid,
                expected: ObjectType::Commit,
                actual: other.object_type(),
            }),
        }
    }

    /// Read an object that must exist and be a blob.
    pub fn read_blob(&self, oid: &ObjectId) -> Result<Blob, OdbError> {
        match self.read(oid)?.ok_or(OdbError::NotFound(*oid))? {
            Object::Blob(blob) => Ok(blob),
            other => Err(OdbError::WrongType {
                oid: *oid,
                expected: ObjectType::Blob,
                actual: other.object_type(),
            }),
        }
    }

    /// Write an object, returning its OID. Idempotent: an existing object is
    /// left untouched.
    pub fn write(&self, obj: &Object) -> Result<ObjectId, OdbError> {
        self.write_raw(obj.object_type(), &obj.serialize_content())
    }

    /// Write raw content with a known type.
    pub fn write_raw(&self, obj_type: ObjectType, content: &[u8]) -> Result<ObjectId, OdbError> {
        let header = write_header(obj_type, content.len());

        let mut hasher = Hasher::new();
        hasher.update(&header);
        hasher.update(content);
        let oid = hasher.finalize();

        if self.contains(&oid) {
            return Ok(oid);
        }

        let final_path = self.object_path(&oid);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Stage next to the final location so the rename stays on one
        // filesystem.
        let tmp_path = self
            .objects_dir
            .join(format!("tmp_obj_{}", oid.to_hex()));
        {
            let file = fs::File::create(&tmp_path)?;
            let mut encoder = ZlibEncoder::new(file, self.compression);
            encoder.write_all(&header)?;
            encoder.write_all(content)?;
            encoder.finish()?.sync_all()?;
        }
        fs::rename(&tmp_path, &final_path)?;

        Ok(oid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bstr::BString;
    use sprig_object::{FileMode, TreeEntry};

    fn store() -> (tempfile::TempDir, ObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::open(dir.path().join("objects"));
        (dir, store)
    }

    #[test]
    fn blob_store_and_load() {
        let (_dir, store) = store();
        let oid = store.write_raw(ObjectType::Blob, b"hello\n").unwrap();
        assert_eq!(oid.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");
        assert!(store.contains(&oid));

        let blob = store.read_blob(&oid).unwrap();
        assert_eq!(blob.data, "hello\n");
    }

    #[test]
    fn tree_store_and_load() {
        let (_dir, store) = store();
        let blob_oid = store.write_raw(ObjectType::Blob, b"x").unwrap();
        let tree = Tree {
            entries: vec![TreeEntry {
                mode: FileMode::Regular,
                name: BString::from("file"),
                oid: blob_oid,
            }],
        };
        let tree_oid = store.write(&Object::Tree(tree.clone())).unwrap();

        let loaded = store.read_tree(&tree_oid).unwrap();
        assert_eq!(loaded, tree);
    }

    #[test]
    fn missing_object_is_none() {
        let (_dir, store) = store();
        let oid = ObjectId::from_hex("da39a3ee5e6b4b0d3255bfef95601890afd80709").unwrap();
        assert!(store.read(&oid).unwrap().is_none());
        assert!(matches!(
            store.read_tree(&oid),
            Err(OdbError::NotFound(_))
        ));
    }

    #[test]
    fn type_mismatch_reported() {
        let (_dir, store) = store();
        let oid = store.write_raw(ObjectType::Blob, b"data").unwrap();
        assert!(matches!(
            store.read_tree(&oid),
            Err(OdbError::WrongType { .. })
        ));
    }
}
