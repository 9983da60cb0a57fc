//! The sparse-checkout engine.
//!
//! Restricts which tracked files are materialized in the working tree. The
//! pattern file at `<gitdir>/info/sparse-checkout` holds either general
//! gitignore-style patterns or the restricted cone dialect, in which every
//! included region is a full subtree and matching runs in O(depth) via two
//! hash sets.
//!
//! Layering: [`pattern`] parses and holds patterns, [`cone`] is the fast
//! lookup structure, [`matcher`] decides include/exclude, [`checkout`]
//! reconciles the working tree against HEAD under the index lock, and
//! [`persist`] owns the pattern file, the two config flags and the
//! transactional `set`/`init`/`add`/`reapply`/`disable` operations.

pub mod checkout;
pub mod cone;
pub mod matcher;
pub mod pattern;
pub mod persist;

use std::path::PathBuf;

use bstr::BString;

pub use cone::ConeIndex;
pub use pattern::{Pattern, PatternFlags, PatternList};
pub use persist::Mode;

/// Errors surfaced by the engine.
#[derive(Debug, thiserror::Error)]
pub enum SparseError {
    #[error("invalid pattern: {0:?}")]
    InvalidPattern(BString),

    #[error("you need to resolve your current index first")]
    UnmergedIndex,

    #[error("unable to create lock file '{path}': File exists")]
    LockHeld { path: PathBuf },

    #[error("sparse checkout leaves no entry on working directory")]
    EmptyCheckout,

    #[error("cannot remove '{path}': local modifications would be lost")]
    WouldLoseChanges { path: BString },

    #[error("failed to update configuration")]
    ConfigWriteFailed(#[source] sprig_config::ConfigError),

    #[error(transparent)]
    Lock(sprig_utils::LockError),

    #[error(transparent)]
    Config(#[from] sprig_config::ConfigError),

    #[error(transparent)]
    Repository(#[from] sprig_repository::RepoError),

    #[error(transparent)]
    Index(#[from] sprig_index::IndexError),

    #[error(transparent)]
    Odb(#[from] sprig_odb::OdbError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<sprig_utils::LockError> for SparseError {
    fn from(e: sprig_utils::LockError) -> Self {
        match e {
            sprig_utils::LockError::Held { path } => SparseError::LockHeld { path },
            other => SparseError::Lock(other),
        }
    }
}
