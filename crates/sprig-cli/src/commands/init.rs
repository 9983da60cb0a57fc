use anyhow::Result;
use clap::Args;
use sprig_sparse::persist;

use super::open_repo;
use crate::Cli;

#[derive(Args)]
pub struct InitArgs {
    /// Use the cone dialect (fast directory matching)
    #[arg(long)]
    cone: bool,

    /// Use general gitignore-style patterns
    #[arg(long, conflicts_with = "cone")]
    no_cone: bool,
}

pub fn run(args: &InitArgs, cli: &Cli) -> Result<i32> {
    let mut repo = open_repo(cli)?;
    let cone = args.cone && !args.no_cone;
    persist::init(&mut repo, cone)?;
    Ok(0)
}
