//! The pattern model: parsing, normalization and storage for both the
//! general gitignore-style dialect and the cone dialect.

use bstr::{BStr, BString, ByteSlice};

use crate::cone::ConeIndex;
use crate::SparseError;

/// Parsed flags of one pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternFlags {
    /// Leading `!`: the pattern re-excludes what it matches.
    pub negative: bool,
    /// Trailing `/`: matches directories only.
    pub mustbedir: bool,
    /// Length of the longest prefix free of `*`, `?`, `[`.
    pub nowildcard_len: usize,
    /// Leading `/`: rooted at the repository root.
    pub anchored: bool,
}

/// One pattern. `text` is stored with the `!` and trailing `/` stripped;
/// the flags remember both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub text: BString,
    /// Depth at which the pattern is anchored (0 for the pattern file).
    pub base_len: usize,
    pub flags: PatternFlags,
}

impl Pattern {
    /// True when the pattern contains no glob metacharacters at all.
    pub fn is_literal(&self) -> bool {
        self.flags.nowildcard_len == self.text.len()
    }
}

/// An ordered pattern list, with the cone lookup structure alongside when the
/// cone dialect is in effect.
#[derive(Debug, Clone, Default)]
pub struct PatternList {
    patterns: Vec<Pattern>,
    use_cone: bool,
    /// Set by a bare `/*`: everything is included.
    full_cone: bool,
    cone: ConeIndex,
    warnings: Vec<String>,
}

impl PatternList {
    pub fn new(use_cone: bool) -> Self {
        Self {
            use_cone,
            ..Default::default()
        }
    }

    /// A list that includes every path (the `disable` transition state).
    pub fn everything() -> Self {
        let mut pl = Self::new(false);
        // Cannot fail: the pattern is well formed.
        let _ = pl.add_pattern(BStr::new("/*"), 0);
        pl
    }

    /// Parse pattern-file content. `#` lines are comments; in cone mode each
    /// pattern is additionally classified into the hash sets, falling back to
    /// general matching (with a warning) on the first line the cone dialect
    /// cannot express.
    pub fn from_bytes(content: &[u8], use_cone: bool) -> Result<Self, SparseError> {
        let mut pl = Self::new(use_cone);
        for line in content.lines() {
            if line.is_empty() || line[0] == b'#' {
                continue;
            }
            pl.add_pattern(BStr::new(line), 0)?;
        }
        Ok(pl)
    }

    /// Store a general-dialect pattern, classifying it for the cone sets when
    /// the cone dialect is active.
    pub fn add_pattern(&mut self, raw: &BStr, base_len: usize) -> Result<(), SparseError> {
        if raw.contains(&b'\n') || raw.contains(&0) {
            return Err(SparseError::InvalidPattern(BString::from(raw.as_bytes())));
        }

        let mut text: &[u8] = raw.as_ref();
        let negative = text.first() == Some(&b'!');
        if negative {
            text = &text[1..];
        }
        let mustbedir = text.last() == Some(&b'/');
        if mustbedir {
            text = &text[..text.len() - 1];
        }

        let nowildcard_len = text
            .iter()
            .position(|&b| matches!(b, b'*' | b'?' | b'['))
            .unwrap_or(text.len());
        let anchored = text.first() == Some(&b'/');

        let pattern = Pattern {
            text: BString::from(text),
            base_len,
            flags: PatternFlags {
                negative,
                mustbedir,
                nowildcard_len,
                anchored,
            },
        };

        if self.use_cone {
            self.classify_cone(&pattern, raw);
        }
        self.patterns.push(pattern);
        Ok(())
    }

    /// Insert a cone inclusion from a raw user path: trim whitespace and
    /// trailing slashes, prepend `/`, discard if empty.
    pub fn cone_insert(&mut self, raw: &BStr) -> Result<(), SparseError> {
        if raw.contains(&b'\n') || raw.contains(&0) {
            return Err(SparseError::InvalidPattern(BString::from(raw.as_bytes())));
        }

        let mut trimmed = raw.trim();
        while let Some(stripped) = trimmed.strip_suffix(b"/") {
            trimmed = stripped;
        }
        if trimmed.is_empty() {
            return Ok(());
        }

        let mut key = BString::default();
        if trimmed[0] != b'/' {
            key.push(b'/');
        }
        key.extend_from_slice(trimmed);

        if key.iter().any(|&b| matches!(b, b'*' | b'?' | b'[')) {
            // Accepted as a literal directory name, but worth flagging.
            self.warnings.push(format!(
                "pattern '{}' contains glob characters, matching it literally",
                key
            ));
        }

        self.use_cone = true;
        self.cone.insert_recursive(key.as_bstr());
        Ok(())
    }

    /// Classify a parsed pattern into the cone sets, or fall back to general
    /// matching when it does not fit the dialect.
    fn classify_cone(&mut self, pattern: &Pattern, raw: &BStr) {
        if !self.use_cone {
            return;
        }
        let text: &[u8] = pattern.text.as_ref();

        if pattern.flags.negative {
            // "!/*/": the root marker excluding top-level directories.
            if pattern.flags.mustbedir && text == b"/*" {
                self.full_cone = false;
                return;
            }
            // "!<dir>/*/": demotes <dir> from recursive to parent.
            if pattern.flags.mustbedir && text.ends_with(b"/*") {
                let parent = BStr::new(&text[..text.len() - 2]);
                if parent.len() > 1
                    && parent.iter().all(|&b| !matches!(b, b'*' | b'?' | b'['))
                    && self.cone.demote_to_parent(parent)
                {
                    return;
                }
            }
            self.warnings
                .push(format!("unrecognized negative pattern: '{raw}'"));
            self.abandon_cone();
            return;
        }

        // "/*": everything included, until a later "!/*/" narrows it.
        if text == b"/*" && !pattern.flags.mustbedir {
            self.full_cone = true;
            return;
        }

        // "<dir>/": a literal, anchored directory inclusion.
        if pattern.flags.mustbedir
            && pattern.flags.anchored
            && pattern.is_literal()
            && text.len() > 1
            && text.find(b"//").is_none()
        {
            let key = BString::from(text);
            self.cone.insert_recursive(key.as_bstr());
            return;
        }

        self.warnings.push(format!("unrecognized pattern: '{raw}'"));
        self.abandon_cone();
    }

    /// Drop to general matching: clear the hash sets, keep the patterns.
    fn abandon_cone(&mut self) {
        self.use_cone = false;
        self.full_cone = false;
        self.cone.clear();
    }

    /// Release all patterns and sets.
    pub fn clear(&mut self) {
        self.patterns.clear();
        self.cone.clear();
        self.full_cone = false;
        self.warnings.clear();
    }

    pub fn use_cone(&self) -> bool {
        self.use_cone
    }

    pub fn full_cone(&self) -> bool {
        self.full_cone
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn cone(&self) -> &ConeIndex {
        &self.cone
    }

    /// Diagnostics accumulated while building the list.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.cone.is_empty() && !self.full_cone
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_pattern_flags() {
        let mut pl = PatternList::new(false);
        pl.add_pattern(BStr::new("!/build/"), 0).unwrap();
        let p = &pl.patterns()[0];
        assert!(p.flags.negative);
        assert!(p.flags.mustbedir);
        assert!(p.flags.anchored);
        assert_eq!(p.text, "/build");
        assert_eq!(p.flags.nowildcard_len, 6);
        assert!(p.is_literal());
    }

    #[test]
    fn nowildcard_prefix_length() {
        let mut pl = PatternList::new(false);
        pl.add_pattern(BStr::new("src/*.rs"), 0).unwrap();
        assert_eq!(pl.patterns()[0].flags.nowildcard_len, 4);
        pl.add_pattern(BStr::new("a?c"), 0).unwrap();
        assert_eq!(pl.patterns()[1].flags.nowildcard_len, 1);
    }

    #[test]
    fn embedded_newline_rejected() {
        let mut pl = PatternList::new(false);
        assert!(matches!(
            pl.add_pattern(BStr::new("bad\npattern"), 0),
            Err(SparseError::InvalidPattern(_))
        ));
        assert!(matches!(
            pl.cone_insert(BStr::new("bad\nname")),
            Err(SparseError::InvalidPattern(_))
        ));
    }

    #[test]
    fn cone_insert_canonicalizes() {
        let mut pl = PatternList::new(true);
        pl.cone_insert(BStr::new("  deep/deeper1/ ")).unwrap();
        assert!(pl.cone().contains_recursive(BStr::new("/deep/deeper1")));
        assert!(pl.cone().contains_parent(BStr::new("/deep")));

        // Empty after trimming: discarded.
        pl.cone_insert(BStr::new("   ")).unwrap();
        pl.cone_insert(BStr::new("/")).unwrap();
        assert!(pl.cone().contains_recursive(BStr::new("/deep/deeper1")));
    }

    #[test]
    fn cone_insert_glob_chars_taken_literally() {
        let mut pl = PatternList::new(true);
        pl.cone_insert(BStr::new("deep/*")).unwrap();
        assert!(pl.cone().contains_recursive(BStr::new("/deep/*")));
        assert_eq!(pl.warnings().len(), 1);
        assert!(pl.use_cone());
    }

    #[test]
    fn canonical_cone_file_parses() {
        let content = b"/*\n!/*/\n/deep/\n!/deep/*/\n/deep/deeper1/\n!/deep/deeper1/*/\n/deep/deeper1/deepest/\n";
        let pl = PatternList::from_bytes(content, true).unwrap();
        assert!(pl.use_cone());
        assert!(!pl.full_cone());
        assert!(pl.warnings().is_empty());
        assert!(pl
            .cone()
            .contains_recursive(BStr::new("/deep/deeper1/deepest")));
        assert!(!pl.cone().contains_recursive(BStr::new("/deep")));
        assert!(pl.cone().contains_parent(BStr::new("/deep")));
        assert!(pl.cone().contains_parent(BStr::new("/deep/deeper1")));
    }

    #[test]
    fn bare_include_all_is_full_cone() {
        let pl = PatternList::from_bytes(b"/*\n", true).unwrap();
        assert!(pl.full_cone());
        assert!(pl.use_cone());
    }

    #[test]
    fn unsupported_negative_falls_back_to_general() {
        let content = b"/*\n!/*/\n/deep/\n!/deep/foo\n";
        let pl = PatternList::from_bytes(content, true).unwrap();
        assert!(!pl.use_cone());
        assert_eq!(pl.warnings().len(), 1);
        assert!(pl.warnings()[0].contains("unrecognized negative pattern"));
        // The patterns themselves are retained for general matching.
        assert_eq!(pl.patterns().len(), 4);
    }

    #[test]
    fn wildcard_pattern_falls_back_to_general() {
        let pl = PatternList::from_bytes(b"/*\n!/*/\n*folder*\n", true).unwrap();
        assert!(!pl.use_cone());
        assert_eq!(pl.warnings().len(), 1);
    }

    #[test]
    fn comments_and_blank_lines_ignored() {
        let pl = PatternList::from_bytes(b"# comment\n\n/*\n!/*/\n", true).unwrap();
        assert!(pl.use_cone());
        assert_eq!(pl.patterns().len(), 2);
    }
}
