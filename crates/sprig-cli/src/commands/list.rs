use std::io::Write;

use anyhow::Result;
use clap::Args;
use sprig_sparse::persist;

use super::open_repo;
use crate::Cli;

#[derive(Args)]
pub struct ListArgs {}

pub fn run(_args: &ListArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;

    match persist::read_raw(&repo)? {
        Some(content) => {
            let stdout = std::io::stdout();
            stdout.lock().write_all(&content)?;
        }
        None => {
            eprintln!("warning: this worktree is not sparse (sparse-checkout file may not exist)");
        }
    }

    Ok(0)
}
