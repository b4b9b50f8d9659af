//! `yamlparser-registry`: inspect and edit the key registry

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::loader::Loader;
use crate::registry::{required_registrations, set_registry_file, Provenance, Registry};

/// Manage registered variables referenced by `registry:` configuration nodes
#[derive(Parser, Debug)]
#[command(name = "yamlparser-registry")]
#[command(version, about, long_about = None)]
pub struct RegistryArgs {
    /// Registry file (default: $YAMLPARSER_REGISTRY, then the user config dir)
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Store ENTRY as the current value of KEY
    #[arg(short, long, requires_all = ["key", "entry"], conflicts_with = "delete")]
    pub add: bool,

    /// Remove KEY and all of its stored values
    #[arg(short, long, requires = "key")]
    pub delete: bool,

    /// Registry key to add, delete or print
    #[arg(short, long, value_name = "KEY")]
    pub key: Option<String>,

    /// Value to store with --add
    #[arg(short, long, value_name = "VALUE")]
    pub entry: Option<String>,

    /// Print the whole registry
    #[arg(short, long)]
    pub list: bool,

    /// Report which keys the given sources reference and whether each is set
    #[arg(short, long, num_args = 1.., value_name = "SOURCE")]
    pub required: Vec<String>,

    /// Print --list and --required output as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn run() -> Result<()> {
    let args = RegistryArgs::parse();
    super::init_tracing(args.verbose);
    execute(args, &mut io::stdout().lock())
}

/// Run the registry command line `args` (program name first). `file` is used
/// when `args` has no `--file`; either way it becomes the process-wide
/// registry file.
pub fn registry_parser<I, T>(file: Option<PathBuf>, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut args = RegistryArgs::try_parse_from(args)?;
    if args.file.is_none() {
        args.file = file;
    }
    execute(args, &mut io::stdout().lock())
}

pub fn execute(args: RegistryArgs, out: &mut impl Write) -> Result<()> {
    if let Some(file) = &args.file {
        set_registry_file(file);
    }
    let registry = Registry::global();
    tracing::debug!("Using registry file {}", registry.path().display());

    if args.add {
        if let (Some(key), Some(entry)) = (&args.key, &args.entry) {
            registry.set(key, entry).with_context(|| {
                format!("failed to register '{key}' in {}", registry.path().display())
            })?;
        }
    } else if args.delete {
        if let Some(key) = &args.key {
            registry.delete(key)?;
        }
    } else if let Some(key) = &args.key {
        writeln!(out, "{}", registry.get(key)?)?;
    }

    if args.list {
        list(&registry, args.json, out)?;
    }
    if !args.required.is_empty() {
        audit(&registry, &args.required, args.json, out)?;
    }
    Ok(())
}

fn list(registry: &Registry, json: bool, out: &mut impl Write) -> Result<()> {
    let content = registry.content()?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&content)?)?;
    } else if content.is_empty() {
        writeln!(out, "Registry {} is empty", registry.path().display())?;
    } else {
        write!(out, "{}", serde_yaml::to_string(&content)?)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct Requirement {
    populated: bool,
    references: Vec<Provenance>,
}

/// Fails after printing the report when any referenced key is unset.
fn audit(registry: &Registry, sources: &[String], json: bool, out: &mut impl Write) -> Result<()> {
    let loader = Loader::new().with_registry(registry.clone());
    let mut report = BTreeMap::new();
    let registrations = required_registrations(&loader, sources)
        .context("failed to scan sources for registry references")?;
    for (key, references) in registrations {
        let populated = registry.lookup(&key)?.is_some();
        report.insert(key, Requirement { populated, references });
    }

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        for (key, requirement) in &report {
            let state = if requirement.populated { "set" } else { "missing" };
            writeln!(out, "{key} [{state}]")?;
            for reference in &requirement.references {
                let source = reference
                    .source
                    .as_ref()
                    .map_or_else(|| "<mapping>".to_string(), |p| p.display().to_string());
                writeln!(out, "  {source}: {}", reference.path)?;
            }
        }
    }

    let missing = report.values().filter(|r| !r.populated).count();
    if missing > 0 {
        anyhow::bail!("{missing} required registry key(s) not set");
    }
    Ok(())
}
