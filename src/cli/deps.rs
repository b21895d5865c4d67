use anyhow::Result;
use clap::Args;
use hashpack::graph::{enumerate_dependencies, render_tree};

use super::Session;

#[derive(Args)]
pub struct DepsArgs {
    /// Print the dependency tree instead of the flat closure
    #[arg(long)]
    pub tree: bool,
    /// Print hashes only
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn cmd_deps(session: &Session, args: DepsArgs) -> Result<()> {
    let root = session.load_root()?;
    let packages = session.packages();

    if args.tree {
        print!("{}", render_tree(&packages, &root, args.quiet)?);
        return Ok(());
    }
    for (hash, name) in enumerate_dependencies(&packages, &root)? {
        if args.quiet {
            println!("{}", hash);
        } else {
            println!("{} {}", hash, name);
        }
    }
    Ok(())
}
