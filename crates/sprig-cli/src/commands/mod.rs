pub mod add;
pub mod disable;
pub mod init;
pub mod list;
pub mod reapply;
pub mod set;

use std::io::BufRead;

use anyhow::Result;
use clap::Subcommand;
use sprig_repository::Repository;
use sprig_sparse::PatternList;

use crate::Cli;

#[derive(Subcommand)]
pub enum Commands {
    /// List the current sparse-checkout patterns
    List(list::ListArgs),
    /// Enable sparse checkout, keeping only root files by default
    Init(init::InitArgs),
    /// Replace the sparse-checkout patterns and update the working tree
    Set(set::SetArgs),
    /// Add patterns to the current sparse checkout
    Add(add::AddArgs),
    /// Reapply the on-disk patterns to the working tree
    Reapply(reapply::ReapplyArgs),
    /// Disable sparse checkout and restore the full working tree
    Disable(disable::DisableArgs),
}

pub fn run(cli: Cli) -> Result<i32> {
    match &cli.command {
        Commands::List(args) => list::run(args, &cli),
        Commands::Init(args) => init::run(args, &cli),
        Commands::Set(args) => set::run(args, &cli),
        Commands::Add(args) => add::run(args, &cli),
        Commands::Reapply(args) => reapply::run(args, &cli),
        Commands::Disable(args) => disable::run(args, &cli),
    }
}

/// Open a repository, respecting a --git-dir override.
pub fn open_repo(cli: &Cli) -> Result<Repository> {
    let repo = if let Some(git_dir) = &cli.git_dir {
        Repository::open(git_dir)?
    } else {
        Repository::discover(".")?
    };
    Ok(repo)
}

/// Surface the diagnostics a pattern list accumulated.
pub fn print_warnings(pl: &PatternList) {
    for warning in pl.warnings() {
        eprintln!("warning: {warning}");
    }
}

/// Read newline-delimited patterns from stdin, skipping blank lines.
pub fn patterns_from_stdin() -> Result<Vec<String>> {
    let stdin = std::io::stdin();
    let mut patterns = Vec::new();
    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            patterns.push(trimmed.to_string());
        }
    }
    Ok(patterns)
}
