use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::check::{cmd_check, CheckArgs};
use cli::deps::{cmd_deps, DepsArgs};
use cli::import::{cmd_import, ImportArgs};
use cli::install::{cmd_install, InstallArgs};
use cli::publish::cmd_publish;
use cli::update::{cmd_update, UpdateArgs};
use cli::Session;

#[derive(Parser)]
#[command(
    name = "hashpack",
    version,
    about = "Content-addressed package manager"
)]
struct Cli {
    /// Log per-package progress
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Object store directory (overrides config and HASHPACK_STORE_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    store: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every dependency and run install hooks
    Install(InstallArgs),
    /// Add a package to this package's dependencies
    Import(ImportArgs),
    /// Point a dependency at a new hash
    Update(UpdateArgs),
    /// List the transitive dependencies
    Deps(DepsArgs),
    /// Look for version splits and stale dependency metadata
    Check(CheckArgs),
    /// Add this package to the store and print its hash
    Publish,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let session = Session::open(cli.store)?;
    match cli.command {
        Command::Install(args) => cmd_install(&session, args)?,
        Command::Import(args) => cmd_import(&session, args)?,
        Command::Update(args) => cmd_update(&session, args)?,
        Command::Deps(args) => cmd_deps(&session, args)?,
        Command::Check(args) => return cmd_check(&session, args),
        Command::Publish => cmd_publish(&session)?,
    }
    Ok(true)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            process::exit(1);
        }
    }
}
