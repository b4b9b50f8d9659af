//! Command-line entry points
//!
//! `yamlparser` loads and merges configuration sources, applies any
//! generated `--dotted.path` overrides and prints the result as YAML.
//! `yamlparser-registry` manages the key registry (see [`registry`]).

use anyhow::Result;
use clap::Command;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::parser::ConfigParser;

pub mod registry;

/// Install the stderr subscriber filtered by [`env_filter`].
pub fn init_tracing(verbose: bool) {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter(verbose))
        .try_init();
}

/// RUST_LOG directives when set; otherwise DEBUG with `verbose`, WARN without.
fn env_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    EnvFilter::builder().with_default_directive(level.into()).from_env_lossy()
}

fn base_command() -> Command {
    Command::new("yamlparser")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Load configuration sources, apply command-line overrides and print the result")
        .after_help(
            "Every leaf of the loaded configuration becomes a --dotted.path flag. \
             Configuration sources must come before any flag.",
        )
}

pub fn run() -> Result<()> {
    // The generated flags mirror configuration keys, so the config binary
    // has no --verbose of its own.
    init_tracing(false);

    let config = ConfigParser::new().command(base_command()).store_config(true).parse()?;
    print!("{config}");
    Ok(())
}
