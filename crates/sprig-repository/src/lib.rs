//! Repository discovery, initialization and the central handle tying the
//! object store, config and index together.

mod discover;
mod head;
mod init;

use std::path::{Path, PathBuf};

use sprig_config::Config;
use sprig_hash::ObjectId;
use sprig_index::Index;
use sprig_odb::ObjectStore;

/// Errors from repository-level operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not a sprig repository (or any parent): {0}")]
    NotFound(PathBuf),

    #[error("invalid ref '{name}': {reason}")]
    InvalidRef { name: String, reason: String },

    #[error(transparent)]
    Config(#[from] sprig_config::ConfigError),

    #[error(transparent)]
    Odb(#[from] sprig_odb::OdbError),

    #[error(transparent)]
    Index(#[from] sprig_index::IndexError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An opened repository.
pub struct Repository {
    git_dir: PathBuf,
    work_tree: PathBuf,
    odb: ObjectStore,
    config: Config,
}

impl Repository {
    /// Open a repository given its working-tree root or `.git` directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let path = path.as_ref();
        let (git_dir, work_tree) = if path.join("HEAD").is_file() && path.join("objects").is_dir()
        {
            let work_tree = path
                .parent()
                .ok_or_else(|| RepoError::NotFound(path.to_path_buf()))?
                .to_path_buf();
            (path.to_path_buf(), work_tree)
        } else if path.join(".git").is_dir() {
            (path.join(".git"), path.to_path_buf())
        } else {
            return Err(RepoError::NotFound(path.to_path_buf()));
        };
        Self::from_dirs(git_dir, work_tree)
    }

    /// Walk upward from `start` looking for a `.git` directory.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self, RepoError> {
        let (git_dir, work_tree) = discover::discover_git_dir(start.as_ref())?;
        Self::from_dirs(git_dir, work_tree)
    }

    /// Create a fresh repository at `path` (working tree root).
    pub fn init(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let git_dir = init::init_repository(path.as_ref())?;
        Self::from_dirs(git_dir, path.as_ref().to_path_buf())
    }

    fn from_dirs(git_dir: PathBuf, work_tree: PathBuf) -> Result<Self, RepoError> {
        let odb = ObjectStore::open(git_dir.join("objects"));
        let config = Config::load(&git_dir)?;
        Ok(Self {
            git_dir,
            work_tree,
            odb,
            config,
        })
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    pub fn odb(&self) -> &ObjectStore {
        &self.odb
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Drop and re-read the configuration from disk.
    pub fn reload_config(&mut self) -> Result<(), RepoError> {
        self.config = Config::load(&self.git_dir)?;
        Ok(())
    }

    /// Path of the binary index file.
    pub fn index_path(&self) -> PathBuf {
        self.git_dir.join("index")
    }

    /// Read the index (empty when the file is missing).
    pub fn read_index(&self) -> Result<Index, RepoError> {
        Ok(Index::read_from(self.index_path())?)
    }

    /// The commit `HEAD` points at, or `None` on an unborn branch.
    pub fn head_commit(&self) -> Result<Option<ObjectId>, RepoError> {
        head::resolve_head(&self.git_dir)
    }

    /// The root tree of the `HEAD` commit, or `None` on an unborn branch.
    pub fn head_tree(&self) -> Result<Option<ObjectId>, RepoError> {
        match self.head_commit()? {
            Some(commit_oid) => Ok(Some(self.odb.read_commit(&commit_oid)?.tree)),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("git_dir", &self.git_dir)
            .field("work_tree", &self.work_tree)
            .finish_non_exhaustive()
    }
}
