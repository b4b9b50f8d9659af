//! Building namespaces from sources
//!
//! The loader turns a [`Source`] into a [`Namespace`], expanding the
//! reserved `yaml` (load-indirection) and `registry` (registry-indirection)
//! keys at construction time so callers only ever see plain nodes.

use serde_yaml::{Mapping, Value as Yaml};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::namespace::{join_path, Namespace, Value};
use crate::registry::{provenance, Registrations, Registry};

mod reserved;
mod source;

use reserved::Node;
pub use reserved::{LOAD_KEY, REGISTRY_KEY};
pub use source::{PackageResolver, Source, PACKAGE_PATH_ENV};

#[derive(Debug, Clone)]
pub struct Loader {
    packages: PackageResolver,
    registry: Registry,
    resolve_registry: bool,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    /// Package roots from the environment, the process-wide registry, and
    /// registry indirections resolved.
    pub fn new() -> Self {
        Self {
            packages: PackageResolver::from_env(),
            registry: Registry::global(),
            resolve_registry: true,
        }
    }

    pub fn with_packages(mut self, packages: PackageResolver) -> Self {
        self.packages = packages;
        self
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// When disabled, `registry` nodes are kept as `{registry: KEY}`.
    pub fn resolve_registry(mut self, resolve: bool) -> Self {
        self.resolve_registry = resolve;
        self
    }

    pub fn packages(&self) -> &PackageResolver {
        &self.packages
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolve a file or package specifier to an existing path.
    ///
    /// Relative paths are tried against the working directory first and then
    /// against `base` (the directory of the including file, if any).
    pub fn resolve_path(&self, source: &Source, base: Option<&Path>) -> Result<PathBuf> {
        match source {
            Source::Path(path) => {
                if path.exists() {
                    return Ok(path.clone());
                }
                if path.is_relative() {
                    if let Some(candidate) = base.map(|b| b.join(path)).filter(|c| c.exists()) {
                        return Ok(candidate);
                    }
                }
                Err(Error::resolution(path.display().to_string(), "no such file or directory"))
            }
            Source::Package { name, relative } => self.packages.resolve(name, relative),
            Source::Mapping(_) | Source::Namespace(_) => {
                Err(Error::resolution(source.to_string(), "in-memory sources have no path"))
            }
        }
    }

    /// Whether `spec` names an existing configuration file.
    pub fn is_loadable(&self, spec: &str) -> bool {
        self.resolve_path(&Source::parse(spec), None).is_ok_and(|path| path.is_file())
    }

    pub fn load(&self, source: impl Into<Source>) -> Result<Namespace> {
        Expansion::new(self, None).load(source.into(), None)
    }

    /// Expand an in-memory mapping, applying reserved-key handling.
    pub fn expand(&self, mapping: Mapping) -> Result<Namespace> {
        self.load(Source::Mapping(Yaml::Mapping(mapping)))
    }

    pub(crate) fn scan_registrations(
        &self,
        file: &Path,
        registrations: &mut Registrations,
    ) -> Result<()> {
        Expansion::new(self, Some(registrations)).load_file(file.to_path_buf()).map(|_| ())
    }
}

/// Parse a configuration file, choosing the format from its extension.
pub fn read_source_file(path: &Path) -> Result<Yaml> {
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    if text.trim().is_empty() {
        return Ok(Yaml::Null);
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    let parsed = match ext.as_str() {
        "json" => serde_json::from_str::<Yaml>(&text).map_err(|e| e.to_string()),
        "toml" => toml::from_str::<Yaml>(&text).map_err(|e| e.to_string()),
        _ => serde_yaml::from_str::<Yaml>(&text).map_err(|e| e.to_string()),
    };
    parsed.map_err(|reason| Error::Parse { path: path.to_path_buf(), reason })
}

/// State for one top-level load: the include stack for cycle detection and
/// an optional collector of registry references.
struct Expansion<'a> {
    loader: &'a Loader,
    stack: Vec<PathBuf>,
    registrations: Option<&'a mut Registrations>,
}

impl<'a> Expansion<'a> {
    fn new(loader: &'a Loader, registrations: Option<&'a mut Registrations>) -> Self {
        Self { loader, stack: Vec::new(), registrations }
    }

    fn load(&mut self, source: Source, base: Option<&Path>) -> Result<Namespace> {
        match source {
            Source::Namespace(ns) => Ok(ns),
            Source::Mapping(yaml) => self.namespace_from(yaml, None),
            file => {
                let path = self.loader.resolve_path(&file, base)?;
                self.load_file(path)
            }
        }
    }

    fn load_file(&mut self, path: PathBuf) -> Result<Namespace> {
        let identity = path.canonicalize().unwrap_or_else(|_| path.clone());
        if self.stack.contains(&identity) {
            return Err(Error::resolution(path.display().to_string(), "circular include"));
        }
        tracing::debug!("Loading configuration from {}", path.display());
        let yaml = read_source_file(&path)?;

        self.stack.push(identity);
        let result = self.namespace_from(yaml, Some(&path));
        self.stack.pop();
        result
    }

    fn namespace_from(&mut self, yaml: Yaml, origin: Option<&Path>) -> Result<Namespace> {
        let value = match yaml {
            Yaml::Null => return Ok(Namespace::new()),
            Yaml::Tagged(tagged) => return self.namespace_from(tagged.value, origin),
            Yaml::Mapping(mapping) => self.expand_mapping(mapping, origin, "")?,
            other => Value::from_yaml(other).unwrap_or(Value::Null),
        };
        match value {
            Value::Namespace(ns) => Ok(ns),
            other => Err(Error::Parse {
                path: describe_origin(origin),
                reason: format!("top level must be a mapping, found {}", other.type_name()),
            }),
        }
    }

    fn expand_value(&mut self, yaml: Yaml, origin: Option<&Path>, path: &str) -> Result<Value> {
        match yaml {
            Yaml::Mapping(mapping) => self.expand_mapping(mapping, origin, path),
            Yaml::Tagged(tagged) => self.expand_value(tagged.value, origin, path),
            other => Ok(Value::from_yaml(other).unwrap_or(Value::Null)),
        }
    }

    fn expand_mapping(&mut self, mapping: Mapping, origin: Option<&Path>, path: &str) -> Result<Value> {
        let node = Node::classify(mapping)
            .map_err(|reason| Error::Parse { path: describe_origin(origin), reason })?;

        match node {
            Node::Plain(entries) => {
                let mut ns = Namespace::new();
                for (key, value) in entries {
                    let value = self.expand_value(value, origin, &join_path(path, &key))?;
                    ns.update(&key, value)?;
                }
                Ok(Value::Namespace(ns))
            }
            Node::Load { source, overrides } => {
                let base = origin.and_then(Path::parent);
                let mut ns = self.load(Source::parse(&source), base)?;
                for (key, value) in overrides {
                    let value = self.expand_value(value, origin, &join_path(path, &key))?;
                    ns.update(&key, value)?;
                }
                Ok(Value::Namespace(ns))
            }
            Node::Registry { key } => {
                if let Some(registrations) = self.registrations.as_deref_mut() {
                    provenance::record(registrations, &key, origin, path);
                }
                if self.loader.resolve_registry {
                    Ok(Value::String(self.loader.registry.get(&key)?))
                } else {
                    let mut ns = Namespace::new();
                    ns.set(REGISTRY_KEY, key)?;
                    Ok(Value::Namespace(ns))
                }
            }
        }
    }
}

fn describe_origin(origin: Option<&Path>) -> PathBuf {
    origin.map_or_else(|| PathBuf::from("<mapping>"), Path::to_path_buf)
}
