use anyhow::Result;
use clap::Args;
use hashpack::{check, CheckOptions};

use super::Session;

#[derive(Args)]
pub struct CheckArgs {
    /// Verify name and version agreement on every edge, not just the
    /// root's
    #[arg(long)]
    pub deep: bool,
}

/// Returns whether the graph is consistent.
pub fn cmd_check(session: &Session, args: CheckArgs) -> Result<bool> {
    let root = session.load_root()?;
    let report = check(&session.packages(), &root, CheckOptions { deep: args.deep })?;
    print!("{}", report);
    if report.is_ok() {
        eprintln!("{}: dependency graph is consistent", root.name);
    }
    Ok(report.is_ok())
}
