#![warn(missing_docs)]

//! Entry point for the `autoclick` binary.

mod cli;
mod configure;
mod console;
mod error;

use std::{io, process, sync::Arc};

use clap::Parser;
use config::FileStore;
use tokio::runtime::Runtime;
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, registry};

use crate::{
    cli::{Cli, Commands},
    error::Result,
};

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, and dispatch to the chosen subcommand.
fn run() -> Result<()> {
    let Cli {
        log,
        config_path,
        command,
    } = Cli::parse();
    let env_filter = logging::env_filter_from_spec(&log.spec());
    registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr).without_time())
        .try_init()
        .ok();

    let path = config::resolve_config_path(config_path.as_deref());
    debug!(path = %path.display(), "config_path");
    let store = FileStore::new(path);

    match command {
        Commands::Run(args) => Runtime::new()?.block_on(console::run(Arc::new(store), &args)),
        Commands::Config(cmd) => {
            println!("{}", configure::run(&cmd, &store)?);
            Ok(())
        }
        Commands::Resolve(args) => {
            println!("{}", configure::resolve(&args));
            Ok(())
        }
    }
}
