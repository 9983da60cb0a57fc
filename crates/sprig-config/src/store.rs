//! Merged two-scope configuration view over a repository's git dir.

use std::path::{Path, PathBuf};

use bstr::BStr;

use crate::{parse_bool, ConfigError, ConfigFile, ConfigKey, ConfigScope};

const WORKTREE_EXTENSION: &str = "extensions.worktreeConfig";

/// The repository configuration: `config` plus, when the worktreeConfig
/// extension is enabled, `config.worktree` layered on top.
#[derive(Debug)]
pub struct Config {
    git_dir: PathBuf,
    local: ConfigFile,
    worktree: Option<ConfigFile>,
}

impl Config {
    /// Load the configuration for a git dir.
    pub fn load(git_dir: &Path) -> Result<Self, ConfigError> {
        let local = ConfigFile::load(&git_dir.join("config"), ConfigScope::Local)?;

        let worktree_enabled = match local.get(&ConfigKey::parse(WORKTREE_EXTENSION)?) {
            Some(value) => parse_bool(value).unwrap_or(false),
            None => false,
        };
        let worktree = if worktree_enabled {
            Some(ConfigFile::load(
                &git_dir.join("config.worktree"),
                ConfigScope::Worktree,
            )?)
        } else {
            None
        };

        Ok(Self {
            git_dir: git_dir.to_path_buf(),
            local,
            worktree,
        })
    }

    /// Highest-scope raw value for a key.
    pub fn get(&self, key: &str) -> Result<Option<Option<&BStr>>, ConfigError> {
        let key = ConfigKey::parse(key)?;
        if let Some(worktree) = &self.worktree {
            if let Some(value) = worktree.get(&key) {
                return Ok(Some(value));
            }
        }
        Ok(self.local.get(&key))
    }

    /// Boolean view of a key; `default` when absent.
    pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key)? {
            Some(value) => parse_bool(value),
            None => Ok(default),
        }
    }

    /// Set a key in the given scope and write the file through.
    ///
    /// Writing to the worktree scope enables `extensions.worktreeConfig` in
    /// the local scope first, creating `config.worktree` on demand.
    pub fn set(&mut self, key: &str, value: &str, scope: ConfigScope) -> Result<(), ConfigError> {
        let key = ConfigKey::parse(key)?;
        match scope {
            ConfigScope::Local => {
                self.local.set(&key, BStr::new(value));
                self.local.write_to(&self.git_dir.join("config"))?;
            }
            ConfigScope::Worktree => {
                self.ensure_worktree_scope()?;
                if let Some(worktree) = self.worktree.as_mut() {
                    worktree.set(&key, BStr::new(value));
                    worktree.write_to(&self.git_dir.join("config.worktree"))?;
                }
            }
        }
        Ok(())
    }

    /// Enable the worktreeConfig extension and load/create the worktree file.
    fn ensure_worktree_scope(&mut self) -> Result<(), ConfigError> {
        if self.worktree.is_some() {
            return Ok(());
        }
        let ext_key = ConfigKey::parse(WORKTREE_EXTENSION)?;
        let enabled = match self.local.get(&ext_key) {
            Some(value) => parse_bool(value).unwrap_or(false),
            None => false,
        };
        if !enabled {
            self.local.set(&ext_key, BStr::new("true"));
            self.local.write_to(&self.git_dir.join("config"))?;
        }
        self.worktree = Some(ConfigFile::load(
            &self.git_dir.join("config.worktree"),
            ConfigScope::Worktree,
        )?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_dir() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path().join(".git");
        std::fs::create_dir_all(&git_dir).unwrap();
        (dir, git_dir)
    }

    #[test]
    fn missing_files_read_as_empty() {
        let (_dir, git_dir) = git_dir();
        let config = Config::load(&git_dir).unwrap();
        assert!(!config.get_bool_or("core.sparseCheckout", false).unwrap());
        assert!(config.get_bool_or("core.sparseCheckout", true).unwrap());
    }

    #[test]
    fn worktree_set_enables_extension() {
        let (_dir, git_dir) = git_dir();
        let mut config = Config::load(&git_dir).unwrap();
        config
            .set("core.sparseCheckout", "true", ConfigScope::Worktree)
            .unwrap();

        let content = std::fs::read_to_string(git_dir.join("config")).unwrap();
        assert!(content.contains("worktreeconfig = true"));
        let wt = std::fs::read_to_string(git_dir.join("config.worktree")).unwrap();
        assert!(wt.contains("sparsecheckout = true"));
    }

    #[test]
    fn worktree_overrides_local() {
        let (_dir, git_dir) = git_dir();
        let mut config = Config::load(&git_dir).unwrap();
        config
            .set("core.sparseCheckout", "false", ConfigScope::Local)
            .unwrap();
        config
            .set("core.sparseCheckout", "true", ConfigScope::Worktree)
            .unwrap();

        let reloaded = Config::load(&git_dir).unwrap();
        assert!(reloaded.get_bool_or("core.sparseCheckout", false).unwrap());
    }

    #[test]
    fn worktree_scope_ignored_until_extension_enabled() {
        let (_dir, git_dir) = git_dir();
        std::fs::write(
            git_dir.join("config.worktree"),
            b"[core]\n\tsparsecheckout = true\n",
        )
        .unwrap();

        let config = Config::load(&git_dir).unwrap();
        assert!(!config.get_bool_or("core.sparseCheckout", false).unwrap());
    }
}
