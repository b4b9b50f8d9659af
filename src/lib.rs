//! yamlparser: hierarchical configuration namespaces
//!
//! Configuration is loaded from YAML (or JSON/TOML) sources into a
//! [`Namespace`] tree. Two reserved keys are expanded while loading:
//! `yaml` pulls another source in at that node, and `registry` replaces the
//! node with a value from the key [`registry`]. A [`ConfigParser`] then turns
//! every leaf into a `--dotted.path` command-line flag so any value can be
//! overridden without hand-written argument declarations.

pub mod cli;
pub mod error;
pub mod loader;
pub mod merge;
pub mod namespace;
pub mod parser;
pub mod registry;

pub use error::{Error, Result};
pub use loader::{Loader, PackageResolver, Source};
pub use merge::{merge_sources, MergeToken};
pub use namespace::{Namespace, Value};
pub use parser::{config_parser, get_config, reset_config, ConfigContext, ConfigParser};
pub use registry::{
    delete_registered_variable, get_registered_variable, get_registered_variable_or,
    get_required_registration, registry_content, set_registered_variable, set_registry_file,
    Registry,
};
