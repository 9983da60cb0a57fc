use anyhow::{bail, Result};
use bstr::BStr;
use clap::Args;
use sprig_sparse::persist::{self, Mode};
use sprig_sparse::PatternList;

use super::{open_repo, patterns_from_stdin, print_warnings};
use crate::Cli;

#[derive(Args)]
pub struct SetArgs {
    /// Patterns (cone mode: directories) to include
    patterns: Vec<String>,

    /// Read patterns from standard input
    #[arg(long)]
    stdin: bool,

    /// Use the cone dialect regardless of the current configuration
    #[arg(long)]
    cone: bool,

    /// Use general patterns regardless of the current configuration
    #[arg(long, conflicts_with = "cone")]
    no_cone: bool,
}

pub fn run(args: &SetArgs, cli: &Cli) -> Result<i32> {
    let mut repo = open_repo(cli)?;

    let mut inputs = args.patterns.clone();
    if args.stdin {
        inputs.extend(patterns_from_stdin()?);
    }
    if inputs.is_empty() {
        bail!("error: no patterns specified");
    }

    let cone = if args.cone {
        true
    } else if args.no_cone {
        false
    } else {
        persist::mode(&repo)? == Mode::ConePatterns
    };

    let mut pl = PatternList::new(cone);
    for input in &inputs {
        if cone {
            pl.cone_insert(BStr::new(input.as_str()))?;
        } else {
            pl.add_pattern(BStr::new(input.as_str()), 0)?;
        }
    }
    print_warnings(&pl);

    persist::set(&mut repo, &pl)?;
    Ok(0)
}
