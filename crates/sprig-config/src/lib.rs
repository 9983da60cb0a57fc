//! Repository configuration.
//!
//! Git-syntax config files with two scopes: the repository-local `config`
//! and the per-worktree `config.worktree`, the latter gated on the
//! `extensions.worktreeConfig` flag. Worktree values override local ones.

mod file;
mod store;

pub use file::ConfigFile;
pub use store::Config;

use bstr::{BStr, BString, ByteSlice};

/// Errors from config operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config key: {0}")]
    InvalidKey(String),

    #[error("parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("invalid boolean value: {0}")]
    InvalidBool(BString),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Configuration file scope, lowest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigScope {
    /// `<gitdir>/config`
    Local,
    /// `<gitdir>/config.worktree`
    Worktree,
}

/// A normalized configuration key: `section[.subsection].name`.
///
/// Section and variable names are case-insensitive and stored lowercased;
/// the subsection preserves case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigKey {
    pub section: BString,
    pub subsection: Option<BString>,
    pub name: BString,
}

impl ConfigKey {
    /// Parse `"section.name"` or `"section.subsection.name"`.
    pub fn parse(key: &str) -> Result<Self, ConfigError> {
        let key = key.trim();
        let first = key
            .find('.')
            .ok_or_else(|| ConfigError::InvalidKey(key.into()))?;
        let section = &key[..first];
        let rest = &key[first + 1..];
        if section.is_empty() || rest.is_empty() {
            return Err(ConfigError::InvalidKey(key.into()));
        }

        let (subsection, name) = match rest.rfind('.') {
            Some(last) => (Some(&rest[..last]), &rest[last + 1..]),
            None => (None, rest),
        };
        if name.is_empty() {
            return Err(ConfigError::InvalidKey(key.into()));
        }

        Ok(Self {
            section: section.to_ascii_lowercase().into(),
            subsection: subsection.map(|s| BString::from(s.as_bytes())),
            name: name.to_ascii_lowercase().into(),
        })
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.subsection {
            Some(sub) => write!(
                f,
                "{}.{}.{}",
                self.section.to_str_lossy(),
                sub.to_str_lossy(),
                self.name.to_str_lossy()
            ),
            None => write!(
                f,
                "{}.{}",
                self.section.to_str_lossy(),
                self.name.to_str_lossy()
            ),
        }
    }
}

/// Interpret a config value as a boolean, git-style.
///
/// A key with no value at all (`[core]\n\tbare`) counts as true.
pub fn parse_bool(value: Option<&BStr>) -> Result<bool, ConfigError> {
    let Some(value) = value else { return Ok(true) };
    let lower = value.to_lowercase();
    match lower.as_slice() {
        b"true" | b"yes" | b"on" | b"1" => Ok(true),
        b"false" | b"no" | b"off" | b"0" | b"" => Ok(false),
        _ => Err(ConfigError::InvalidBool(BString::from(value.as_bytes()))),
    }
}
