use anyhow::Result;
use hashpack::package::publish::publish_package;

use super::Session;

pub fn cmd_publish(session: &Session) -> Result<()> {
    let hash = publish_package(
        &session.store,
        &session.root_dir,
        &session.config.local_root,
    )?;
    println!("{}", hash);
    Ok(())
}
