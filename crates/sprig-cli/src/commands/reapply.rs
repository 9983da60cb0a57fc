use anyhow::Result;
use clap::Args;
use sprig_sparse::persist::{self, Mode};

use super::{open_repo, print_warnings};
use crate::Cli;

#[derive(Args)]
pub struct ReapplyArgs {}

pub fn run(_args: &ReapplyArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;

    if persist::mode(&repo)? == Mode::NoPatterns {
        eprintln!("warning: sparse checkout is not enabled");
        return Ok(0);
    }

    let pl = persist::read_patterns(&repo)?;
    if let Some(pl) = &pl {
        print_warnings(pl);
    }
    sprig_sparse::checkout::update_working_directory(&repo, pl.as_ref())?;
    Ok(0)
}
