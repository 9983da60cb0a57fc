//! Repository skeleton creation.

use std::path::{Path, PathBuf};

use crate::RepoError;

const DEFAULT_BRANCH: &str = "main";

/// Create the `.git` skeleton under `path`. Re-running on an existing
/// repository is harmless.
pub fn init_repository(path: &Path) -> Result<PathBuf, RepoError> {
    let git_dir = path.join(".git");

    for sub in ["objects", "refs/heads", "refs/tags", "info"] {
        std::fs::create_dir_all(git_dir.join(sub))?;
    }

    let head = git_dir.join("HEAD");
    if !head.exists() {
        std::fs::write(&head, format!("ref: refs/heads/{DEFAULT_BRANCH}\n"))?;
    }

    let config = git_dir.join("config");
    if !config.exists() {
        std::fs::write(
            &config,
            b"[core]\n\trepositoryformatversion = 0\n\tbare = false\n",
        )?;
    }

    Ok(git_dir)
}
