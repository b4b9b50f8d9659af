//! Command-line parser synthesized from the configuration itself
//!
//! Parsing happens in two passes. The first pass only collects the leading
//! configuration sources (everything before the first flag) and builds the
//! consolidated namespace from them. The second pass parses the complete
//! command line against a `clap::Command` that has one generated flag per
//! namespace leaf, so `--nested.name value` overrides `nested.name`.

use clap::error::ErrorKind;
use clap::{value_parser, Arg, ArgAction, Command};
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::loader::Loader;
use crate::merge::merge_sources;
use crate::namespace::Namespace;

mod context;
mod flags;

pub use context::{get_config, reset_config, ConfigContext};
use flags::FlagSpec;

/// Id of the positional argument carrying the configuration sources.
pub const SOURCES_ID: &str = "configuration_files";

/// Ids clap reserves for itself; never generated as flags.
const RESERVED_IDS: [&str; 3] = [SOURCES_ID, "help", "version"];

/// Builder for the two-pass configuration parser.
///
/// ```no_run
/// use yamlparser::ConfigParser;
///
/// let config = ConfigParser::new()
///     .default_source("config.yaml")
///     .skip_keys(["secrets"])
///     .parse_from(["app", "config.yaml", "--nested.name", "override"])?;
/// # Ok::<(), yamlparser::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigParser {
    command: Option<Command>,
    default_source: Option<String>,
    skip_keys: Vec<String>,
    infer_types: bool,
    store_config: bool,
    loader: Loader,
}

impl Default for ConfigParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigParser {
    pub fn new() -> Self {
        Self {
            command: None,
            default_source: None,
            skip_keys: Vec::new(),
            infer_types: true,
            store_config: false,
            loader: Loader::new(),
        }
    }

    /// Base command whose own arguments are kept. Their values are written
    /// into the namespace under their ids.
    pub fn command(mut self, command: Command) -> Self {
        self.command = Some(command);
        self
    }

    /// Source loaded when the command line names none.
    pub fn default_source(mut self, source: impl Into<String>) -> Self {
        self.default_source = Some(source.into());
        self
    }

    /// No flags are generated for paths starting with any of these prefixes.
    pub fn skip_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// When disabled, every generated flag takes and stores raw strings.
    pub fn infer_types(mut self, infer: bool) -> Self {
        self.infer_types = infer;
        self
    }

    /// Also install the result as the process-wide configuration returned by
    /// [`get_config`].
    pub fn store_config(mut self, store: bool) -> Self {
        self.store_config = store;
        self
    }

    pub fn loader(mut self, loader: Loader) -> Self {
        self.loader = loader;
        self
    }

    /// Parse `std::env::args_os()`, exiting with a usage message on error.
    pub fn parse(&self) -> Result<Namespace> {
        self.parse_from(std::env::args_os())
    }

    /// Like [`try_parse_from`](Self::try_parse_from), but help requests and
    /// malformed command lines print their message and exit the process.
    pub fn parse_from<I, T>(&self, args: I) -> Result<Namespace>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match self.try_parse_from(args) {
            Err(Error::Usage(e)) => e.exit(),
            other => other,
        }
    }

    /// Parse and install the result into `context`.
    pub fn parse_into<I, T>(&self, context: &mut ConfigContext, args: I) -> Result<Arc<Namespace>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let namespace = self.try_parse_from(args)?;
        Ok(context.install(namespace))
    }

    /// Run both passes over `args` (the first element is the program name).
    pub fn try_parse_from<I, T>(&self, args: I) -> Result<Namespace>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let program = self.program_name(&args);

        let sources = preliminary_sources(&program, &args)?;
        let mut namespace = self.consolidate(&sources, &args)?;

        let mut command = self.command.clone().unwrap_or_else(|| Command::new(program));
        let declared: Vec<String> = command
            .get_arguments()
            .map(|arg| arg.get_id().as_str().to_string())
            .filter(|id| !RESERVED_IDS.contains(&id.as_str()))
            .collect();
        let taken = declared_names(&command);

        let required = sources.is_empty() && self.default_source.is_none();
        command = command.arg(sources_arg(required));

        let specs: Vec<FlagSpec> = namespace
            .attributes()
            .iter()
            .filter(|(path, _)| self.generates_flag(path, &taken))
            .map(|(path, value)| FlagSpec::infer(path, value, self.infer_types))
            .collect();
        for spec in &specs {
            command = command.arg(spec.to_arg());
        }
        tracing::debug!("Generated {} configuration flags", specs.len());

        let matches = command.try_get_matches_from_mut(args)?;

        let positionals: Vec<&String> =
            matches.get_many::<String>(SOURCES_ID).map(Iterator::collect).unwrap_or_default();
        let late: Vec<&str> =
            positionals.iter().skip(sources.len()).map(|s| s.as_str()).collect();
        if !late.is_empty() {
            return Err(command
                .error(
                    ErrorKind::ArgumentConflict,
                    format!(
                        "configuration sources must come before any flag, found '{}' after one",
                        late.join("', '")
                    ),
                )
                .into());
        }

        for spec in &specs {
            if let Some(value) = spec.supplied(&matches) {
                tracing::debug!("Command line sets '{}' to {}", spec.path, value.render());
                namespace.set(&spec.path, value)?;
            }
        }
        for id in &declared {
            if let Some(value) = flags::declared_value(&matches, id) {
                namespace.set(id, value)?;
            }
        }

        if self.store_config {
            context::store_config(namespace.clone());
        }
        Ok(namespace)
    }

    fn program_name(&self, args: &[OsString]) -> String {
        if let Some(command) = &self.command {
            return command.get_name().to_string();
        }
        args.first()
            .and_then(|arg| Path::new(arg).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
    }

    fn consolidate(&self, sources: &[String], args: &[OsString]) -> Result<Namespace> {
        if let Some((primary, secondaries)) = sources.split_first() {
            return merge_sources(&self.loader, primary, secondaries);
        }
        let Some(default) = &self.default_source else {
            return Ok(Namespace::new());
        };
        match self.loader.load(default.as_str()) {
            Err(e) if is_bare_help(args) => {
                tracing::warn!("Showing help without configuration flags: {}", e);
                Ok(Namespace::new())
            }
            other => other,
        }
    }

    fn generates_flag(&self, path: &str, taken: &[String]) -> bool {
        !RESERVED_IDS.contains(&path)
            && !taken.iter().any(|name| name == path)
            && !self.skip_keys.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Ids, long names and long aliases the base command already uses.
fn declared_names(command: &Command) -> Vec<String> {
    let mut names = Vec::new();
    for arg in command.get_arguments() {
        names.push(arg.get_id().as_str().to_string());
        names.extend(arg.get_long().map(str::to_string));
        names.extend(arg.get_all_aliases().unwrap_or_default().into_iter().map(str::to_string));
    }
    names
}

/// First pass: the configuration sources before the first flag.
fn preliminary_sources(program: &str, args: &[OsString]) -> Result<Vec<String>> {
    let leading = args
        .iter()
        .take(1)
        .chain(args.iter().skip(1).take_while(|arg| !is_flag(arg)))
        .cloned();
    let matches = Command::new(program.to_string())
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new(SOURCES_ID)
                .num_args(0..)
                .action(ArgAction::Append)
                .value_parser(value_parser!(String)),
        )
        .try_get_matches_from(leading)?;
    Ok(matches.get_many::<String>(SOURCES_ID).map(|v| v.cloned().collect()).unwrap_or_default())
}

fn sources_arg(required: bool) -> Arg {
    Arg::new(SOURCES_ID)
        .value_name("SOURCE")
        .num_args(1..)
        .action(ArgAction::Append)
        .required(required)
        .value_parser(value_parser!(String))
        .help(
            "Configuration file or package specifier, followed by merge tokens \
             (SOURCE or PATH=SOURCE[=OVERRIDE...])",
        )
}

fn is_flag(arg: &OsString) -> bool {
    arg.to_string_lossy().starts_with('-')
}

fn is_bare_help(args: &[OsString]) -> bool {
    match args.get(1..) {
        Some([]) | None => true,
        Some([only]) => only == "-h" || only == "--help",
        Some(_) => false,
    }
}

/// Parse the process command line, storing the result as the global
/// configuration. Usage errors print a message and exit.
pub fn config_parser(command: Option<Command>, default_source: Option<&str>) -> Result<Namespace> {
    let mut parser = ConfigParser::new().store_config(true);
    if let Some(command) = command {
        parser = parser.command(command);
    }
    if let Some(source) = default_source {
        parser = parser.default_source(source);
    }
    parser.parse()
}
