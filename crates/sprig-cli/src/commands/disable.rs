use anyhow::Result;
use clap::Args;
use sprig_sparse::persist;

use super::open_repo;
use crate::Cli;

#[derive(Args)]
pub struct DisableArgs {}

pub fn run(_args: &DisableArgs, cli: &Cli) -> Result<i32> {
    let mut repo = open_repo(cli)?;
    persist::disable(&mut repo)?;
    Ok(0)
}
