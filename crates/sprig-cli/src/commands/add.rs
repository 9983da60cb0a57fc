use anyhow::{bail, Result};
use bstr::BString;
use clap::Args;
use sprig_sparse::persist;

use super::{open_repo, patterns_from_stdin};
use crate::Cli;

#[derive(Args)]
pub struct AddArgs {
    /// Patterns (cone mode: directories) to add
    patterns: Vec<String>,

    /// Read patterns from standard input
    #[arg(long)]
    stdin: bool,
}

pub fn run(args: &AddArgs, cli: &Cli) -> Result<i32> {
    let mut repo = open_repo(cli)?;

    let mut inputs = args.patterns.clone();
    if args.stdin {
        inputs.extend(patterns_from_stdin()?);
    }
    if inputs.is_empty() {
        bail!("error: no patterns specified");
    }

    let inputs: Vec<BString> = inputs.into_iter().map(BString::from).collect();
    persist::add(&mut repo, &inputs)?;
    Ok(0)
}
