//! Shared low-level utilities for the sprig crates.

pub mod lockfile;
pub mod wildmatch;

pub use lockfile::{LockError, LockFile};
