//! Include/exclude decisions for repository paths.
//!
//! Cone lists answer in O(depth) from the hash sets; general lists evaluate
//! every pattern in declared order with the last match winning, the way
//! gitignore files are read.

use bstr::{BStr, BString, ByteSlice};
use sprig_utils::wildmatch::{wildmatch, WildmatchFlags};

use crate::pattern::{Pattern, PatternList};

/// The matcher's verdict for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Include,
    Exclude,
}

impl PatternList {
    /// Decide whether `path` (repository-relative, `/`-separated, no leading
    /// slash) is part of the sparse checkout.
    pub fn matches(&self, path: &BStr, is_dir: bool) -> Verdict {
        if self.use_cone() {
            self.matches_cone(path, is_dir)
        } else {
            self.matches_general(path, is_dir)
        }
    }

    fn matches_cone(&self, path: &BStr, is_dir: bool) -> Verdict {
        if self.full_cone() {
            return Verdict::Include;
        }

        let mut key = BString::from("/");
        key.extend_from_slice(path);
        let key = key.as_bstr();
        let cone = self.cone();

        // Anything at or below a recursive key is in.
        if cone.contains_recursive(key) || cone.contains_ancestor_recursive(key) {
            return Verdict::Include;
        }

        if is_dir {
            // Directories stay visible on the way down to a recursive key.
            if cone.contains_parent(key) {
                return Verdict::Include;
            }
        } else {
            match key.rfind_byte(b'/') {
                // Files at the repository root are always in.
                Some(0) => return Verdict::Include,
                // Files directly inside a visible directory are in; that is
                // what the `p/` + `!p/*/` pair in the pattern file means.
                Some(slash) => {
                    if cone.contains_parent(BStr::new(&key[..slash])) {
                        return Verdict::Include;
                    }
                }
                None => {}
            }
        }

        Verdict::Exclude
    }

    fn matches_general(&self, path: &BStr, is_dir: bool) -> Verdict {
        let mut verdict = Verdict::Exclude;

        for pattern in self.patterns() {
            if pattern_hits(pattern, path, is_dir) {
                verdict = if pattern.flags.negative {
                    Verdict::Exclude
                } else {
                    Verdict::Include
                };
            }
        }

        verdict
    }
}

/// Whether a pattern applies to `path`, either directly or through one of the
/// path's ancestor directories (a matched directory covers its subtree).
fn pattern_hits(pattern: &Pattern, path: &BStr, is_dir: bool) -> bool {
    if (is_dir || !pattern.flags.mustbedir) && pattern_matches_path(pattern, path) {
        return true;
    }

    let path: &[u8] = path.as_ref();
    let mut prefix = path;
    while let Some(slash) = prefix.rfind_byte(b'/') {
        prefix = &prefix[..slash];
        if pattern_matches_path(pattern, BStr::new(prefix)) {
            return true;
        }
    }
    false
}

/// Match one pattern against one candidate path.
///
/// Anchored patterns are rooted at the repository root and their wildcards do
/// not cross `/`. Unanchored patterns treat `/` as an ordinary byte and also
/// try the basename alone.
fn pattern_matches_path(pattern: &Pattern, candidate: &BStr) -> bool {
    if pattern.flags.anchored {
        let text = BStr::new(&pattern.text[1..]);
        if pattern.is_literal() {
            return text == candidate;
        }
        return wildmatch(text, candidate, WildmatchFlags::PATHNAME);
    }

    let text = pattern.text.as_bstr();
    if pattern.is_literal() {
        if text == candidate {
            return true;
        }
    } else if wildmatch(text, candidate, WildmatchFlags::empty()) {
        return true;
    }

    // Basename match for patterns without an anchor.
    if let Some(slash) = candidate.rfind_byte(b'/') {
        let basename = BStr::new(&candidate[slash + 1..]);
        if pattern.is_literal() {
            return text == basename;
        }
        return wildmatch(text, basename, WildmatchFlags::empty());
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternList;

    fn cone_list(paths: &[&str]) -> PatternList {
        let mut pl = PatternList::new(true);
        for path in paths {
            pl.cone_insert(BStr::new(*path)).unwrap();
        }
        pl
    }

    fn general_list(patterns: &[&str]) -> PatternList {
        let mut pl = PatternList::new(false);
        for pattern in patterns {
            pl.add_pattern(BStr::new(*pattern), 0).unwrap();
        }
        pl
    }

    fn include(pl: &PatternList, path: &str, is_dir: bool) -> bool {
        pl.matches(BStr::new(path), is_dir) == Verdict::Include
    }

    #[test]
    fn cone_recursive_subtree_included() {
        let pl = cone_list(&["deep/deeper1/deepest"]);
        assert!(include(&pl, "deep/deeper1/deepest/a", false));
        assert!(include(&pl, "deep/deeper1/deepest/sub/b", false));
        assert!(include(&pl, "deep/deeper1/deepest", true));
    }

    #[test]
    fn cone_parent_dirs_visible_files_within_included() {
        let pl = cone_list(&["deep/deeper1/deepest"]);
        assert!(include(&pl, "deep", true));
        assert!(include(&pl, "deep/deeper1", true));
        assert!(include(&pl, "deep/a", false));
        assert!(include(&pl, "deep/deeper1/a", false));
    }

    #[test]
    fn cone_excludes_siblings() {
        let pl = cone_list(&["deep/deeper1/deepest"]);
        assert!(!include(&pl, "deep/deeper2", true));
        assert!(!include(&pl, "deep/deeper2/a", false));
        assert!(!include(&pl, "deep/deeper1/other/a", false));
        assert!(!include(&pl, "folder1/a", false));
        assert!(!include(&pl, "folder1", true));
    }

    #[test]
    fn cone_root_files_always_included() {
        let pl = cone_list(&["deep/deeper1"]);
        assert!(include(&pl, "a", false));
        assert!(include(&pl, "README.md", false));
    }

    #[test]
    fn cone_match_is_deterministic() {
        let pl = cone_list(&["deep"]);
        for _ in 0..3 {
            assert!(include(&pl, "deep/x", false));
            assert!(!include(&pl, "other/x", false));
        }
    }

    #[test]
    fn full_cone_includes_everything() {
        let pl = PatternList::from_bytes(b"/*\n", true).unwrap();
        assert!(include(&pl, "anything/at/all", false));
        assert!(include(&pl, "dir", true));
    }

    #[test]
    fn general_root_only_seed() {
        // The `init` seed: everything at the root, no subdirectories.
        let pl = general_list(&["/*", "!/*/"]);
        assert!(include(&pl, "a", false));
        assert!(!include(&pl, "folder1/a", false));
        assert!(!include(&pl, "deep/deeper1/a", false));
    }

    #[test]
    fn general_last_match_wins() {
        let pl = general_list(&["/*", "!/*/", "*folder*"]);
        assert!(include(&pl, "a", false));
        assert!(include(&pl, "folder1/a", false));
        assert!(include(&pl, "folder2/a", false));
        assert!(!include(&pl, "deep/deeper1/a", false));
    }

    #[test]
    fn general_mustbedir_skips_files() {
        let pl = general_list(&["build/"]);
        assert!(include(&pl, "build", true));
        assert!(!include(&pl, "build", false));
        // Files under a matched directory are covered by it.
        assert!(include(&pl, "build/out.o", false));
    }

    #[test]
    fn general_basename_matching_when_unanchored() {
        let pl = general_list(&["*.rs"]);
        assert!(include(&pl, "src/lib.rs", false));
        assert!(include(&pl, "lib.rs", false));
        assert!(!include(&pl, "lib.c", false));
    }

    #[test]
    fn general_anchored_literal() {
        let pl = general_list(&["/folder1"]);
        assert!(include(&pl, "folder1", false));
        assert!(include(&pl, "folder1/a", false));
        assert!(!include(&pl, "folder2/a", false));
        assert!(!include(&pl, "x/folder1", false));
    }

    #[test]
    fn general_negative_reexcludes() {
        let pl = general_list(&["*.o", "!keep.o"]);
        assert!(include(&pl, "main.o", false));
        assert!(!include(&pl, "keep.o", false));
    }

    #[test]
    fn unsupported_cone_file_falls_back_to_general_semantics() {
        let content = b"/*\n!/*/\n*folder*\n";
        let pl = PatternList::from_bytes(content, true).unwrap();
        assert!(!pl.use_cone());
        assert!(include(&pl, "folder1/a", false));
        assert!(!include(&pl, "deep/a", false));
    }
}
