use anyhow::Result;
use clap::Args;
use hashpack::package::manifest::save_package_file;
use hashpack::{update_direct, Cascade, ContentHash, Error};

use super::Session;

#[derive(Args)]
pub struct UpdateArgs {
    /// Dependency to replace, by name or hash
    pub old: String,
    /// Hash of the replacement package
    pub new: ContentHash,
    /// Replace the hash throughout the graph, republishing every
    /// package that depends on it
    #[arg(long)]
    pub recursive: bool,
}

pub fn cmd_update(session: &Session, args: UpdateArgs) -> Result<()> {
    let mut root = session.load_root()?;
    let packages = session.packages();

    if !args.recursive {
        let old = update_direct(&packages, &mut root, &args.old, &args.new)?;
        save_package_file(&root, &session.manifest_path())?;
        eprintln!(
            "Updated {} {} -> {}",
            old.name,
            old.hash.to_short(),
            args.new.to_short()
        );
        return Ok(());
    }

    // A name only identifies direct dependencies; deeper ones need a hash.
    let old = match root.find_dep(&args.old) {
        Some(dep) => dep.hash,
        None => args
            .old
            .parse::<ContentHash>()
            .map_err(|_| Error::UnknownDependency(args.old.clone()))?,
    };
    let report =
        Cascade::new(&packages, &session.config.local_root)?.run(&mut root, &old, &args.new)?;
    for rep in &report.republished {
        eprintln!(
            "Republished {} {} -> {}",
            rep.name,
            rep.old.to_short(),
            rep.new.to_short()
        );
    }
    if report.changed {
        save_package_file(&root, &session.manifest_path())?;
    } else {
        eprintln!("No package depends on {}", old.to_short());
    }
    Ok(())
}
