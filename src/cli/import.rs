use anyhow::Result;
use clap::Args;
use hashpack::package::manifest::save_package_file;
use hashpack::{ContentHash, Installer};
use tracing::warn;

use super::Session;

#[derive(Args)]
pub struct ImportArgs {
    /// Content hash of the package to import
    pub hash: ContentHash,
    /// Install into the global root
    #[arg(long)]
    pub global: bool,
}

pub fn cmd_import(session: &Session, args: ImportArgs) -> Result<()> {
    let mut root = session.load_root()?;
    if root.depends_on(&args.hash) {
        warn!(hash = %args.hash, "package already imported");
        return Ok(());
    }

    let packages = session.packages();
    let hooks = session.hooks();
    let dep = Installer::new(&packages, &hooks)
        .with_max_parallel(session.config.max_parallel)
        .global(args.global)
        .author(&session.config.user.name)
        .import(&args.hash)?;

    eprintln!("Imported {} {} ({})", dep.name, dep.version, dep.hash.to_short());
    root.dependencies.push(dep);
    save_package_file(&root, &session.manifest_path())?;
    Ok(())
}
