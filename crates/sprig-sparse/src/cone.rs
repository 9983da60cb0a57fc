//! The cone lookup structure: two hash sets classifying directories.
//!
//! `recursive` holds directories whose whole subtree is included; `parent`
//! holds every directory that must stay visible on the way down to one, the
//! recursive keys themselves included. Keys are canonical: `/`-prefixed, no
//! trailing slash, byte-exact. Classifying a path costs one hash probe per
//! component, never a scan of the pattern list.

use std::collections::HashSet;

use bstr::{BStr, BString, ByteSlice};

/// The two cone hash sets.
#[derive(Debug, Clone, Default)]
pub struct ConeIndex {
    recursive: HashSet<BString>,
    parent: HashSet<BString>,
}

impl ConeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a canonical key as a recursive (whole-subtree) inclusion, and
    /// register every strict ancestor as a parent. The root is implicit and
    /// never stored.
    pub fn insert_recursive(&mut self, key: &BStr) {
        self.recursive.insert(BString::from(key.as_bytes()));
        self.parent.insert(BString::from(key.as_bytes()));

        let mut prefix: &[u8] = key.as_ref();
        while let Some(slash) = prefix.rfind_byte(b'/') {
            if slash == 0 {
                break;
            }
            prefix = &prefix[..slash];
            if !self.parent.contains(BStr::new(prefix)) {
                self.parent.insert(BString::from(prefix));
            }
        }
    }

    /// Demote a key from recursive to parent-only. Returns whether the key
    /// was known at all.
    pub fn demote_to_parent(&mut self, key: &BStr) -> bool {
        let known = self.parent.contains(key);
        self.recursive.remove(key);
        known
    }

    pub fn contains_recursive(&self, key: &BStr) -> bool {
        self.recursive.contains(key)
    }

    pub fn contains_parent(&self, key: &BStr) -> bool {
        self.parent.contains(key)
    }

    /// Whether some strict prefix of `key` is a recursive inclusion. Walks by
    /// trailing-slash truncation: one probe per path component.
    pub fn contains_ancestor_recursive(&self, key: &BStr) -> bool {
        let mut prefix: &[u8] = key.as_ref();
        while let Some(slash) = prefix.rfind_byte(b'/') {
            if slash == 0 {
                return false;
            }
            prefix = &prefix[..slash];
            if self.recursive.contains(BStr::new(prefix)) {
                return true;
            }
        }
        false
    }

    /// Recursive keys, unordered.
    pub fn recursive_keys(&self) -> impl Iterator<Item = &BString> {
        self.recursive.iter()
    }

    /// Parent keys, unordered.
    pub fn parent_keys(&self) -> impl Iterator<Item = &BString> {
        self.parent.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.recursive.is_empty() && self.parent.is_empty()
    }

    pub fn clear(&mut self) {
        self.recursive.clear();
        self.parent.clear();
    }
}
