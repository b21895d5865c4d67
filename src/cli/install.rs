use anyhow::Result;
use clap::Args;
use hashpack::package::manifest::{load_lockfile, LOCK_FILE_NAME};
use hashpack::Installer;

use super::Session;

#[derive(Args)]
pub struct InstallArgs {
    /// Install into the global root instead of the package's vendor dir
    #[arg(long)]
    pub global: bool,
    /// Install exactly what hashpack-lock.json lists
    #[arg(long)]
    pub lock: bool,
}

pub fn cmd_install(session: &Session, args: InstallArgs) -> Result<()> {
    let packages = session.packages();
    let hooks = session.hooks();
    let installer = Installer::new(&packages, &hooks)
        .with_max_parallel(session.config.max_parallel)
        .global(args.global);

    if args.lock {
        let lock = load_lockfile(&session.root_dir.join(LOCK_FILE_NAME))?;
        installer.install_lock(&lock, &session.root_dir)?;
        let counts = packages.progress().snapshot();
        eprintln!(
            "Linked {} lock entries ({} fetched)",
            lock.entry_count(),
            counts.fetched
        );
        return Ok(());
    }

    let root = session.load_root()?;
    let report = installer.install_deps(&root)?;
    let counts = packages.progress().snapshot();
    eprintln!(
        "Installed {} packages ({} fetched, {} hooks run)",
        report.completed, counts.fetched, counts.hooks_run
    );
    Ok(())
}
