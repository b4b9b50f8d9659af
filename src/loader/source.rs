//! Source specifiers and package-relative path resolution

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::namespace::Namespace;

/// Environment variable listing extra package roots (platform path list).
pub const PACKAGE_PATH_ENV: &str = "YAMLPARSER_PATH";

/// Where a namespace comes from.
#[derive(Debug, Clone)]
pub enum Source {
    /// A file or directory, absolute or relative to the working directory.
    Path(PathBuf),
    /// `name @ relative` inside a package root. An empty `relative` denotes
    /// the package root itself.
    Package { name: String, relative: PathBuf },
    /// An in-memory YAML document.
    Mapping(serde_yaml::Value),
    Namespace(Namespace),
}

impl Source {
    /// Parse `path`, `name @ relative`, `name@relative` or `@name`.
    pub fn parse(spec: &str) -> Self {
        match spec.split_once('@') {
            Some((name, relative)) => {
                let (name, relative) = (name.trim(), relative.trim());
                if name.is_empty() {
                    Source::Package { name: relative.to_string(), relative: PathBuf::new() }
                } else {
                    Source::Package { name: name.to_string(), relative: PathBuf::from(relative) }
                }
            }
            None => Source::Path(PathBuf::from(spec.trim())),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(path) => write!(f, "{}", path.display()),
            Source::Package { name, relative } if relative.as_os_str().is_empty() => {
                write!(f, "@{name}")
            }
            Source::Package { name, relative } => write!(f, "{name} @ {}", relative.display()),
            Source::Mapping(_) => f.write_str("<mapping>"),
            Source::Namespace(_) => f.write_str("<namespace>"),
        }
    }
}

impl From<&str> for Source {
    fn from(spec: &str) -> Self {
        Source::parse(spec)
    }
}

impl From<String> for Source {
    fn from(spec: String) -> Self {
        Source::parse(&spec)
    }
}

impl From<&String> for Source {
    fn from(spec: &String) -> Self {
        Source::parse(spec)
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Source::Path(path.to_path_buf())
    }
}

impl From<serde_yaml::Value> for Source {
    fn from(value: serde_yaml::Value) -> Self {
        Source::Mapping(value)
    }
}

impl From<serde_yaml::Mapping> for Source {
    fn from(mapping: serde_yaml::Mapping) -> Self {
        Source::Mapping(serde_yaml::Value::Mapping(mapping))
    }
}

impl From<Namespace> for Source {
    fn from(namespace: Namespace) -> Self {
        Source::Namespace(namespace)
    }
}

/// Locates package roots for `name @ relative` specifiers.
///
/// A package named `pkg` is the directory `<root>/pkg` under the first
/// search root that has one, or a search root whose own name is `pkg`.
#[derive(Debug, Clone, Default)]
pub struct PackageResolver {
    roots: Vec<PathBuf>,
}

impl PackageResolver {
    /// Roots from `YAMLPARSER_PATH`, then the working directory.
    pub fn from_env() -> Self {
        let mut roots: Vec<PathBuf> = env::var_os(PACKAGE_PATH_ENV)
            .map(|paths| env::split_paths(&paths).collect())
            .unwrap_or_default();
        if let Ok(cwd) = env::current_dir() {
            roots.push(cwd);
        }
        Self { roots }
    }

    pub fn with_roots<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self { roots: roots.into_iter().map(Into::into).collect() }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn package_root(&self, name: &str) -> Result<PathBuf> {
        let alt = name.replace('-', "_");
        for root in &self.roots {
            for candidate in [name, alt.as_str()] {
                let dir = root.join(candidate);
                if dir.is_dir() {
                    return Ok(dir);
                }
                if root.is_dir() && root.file_name().and_then(|n| n.to_str()) == Some(candidate) {
                    return Ok(root.clone());
                }
            }
        }
        Err(Error::resolution(
            format!("@{name}"),
            format!("package '{name}' not found under {}", self.describe_roots()),
        ))
    }

    /// Join `relative` onto the package root. When that path does not exist
    /// the package tree is searched for the first file (sorted walk) whose
    /// path ends with `relative`.
    pub fn resolve(&self, name: &str, relative: &Path) -> Result<PathBuf> {
        let root = self.package_root(name)?;
        if relative.as_os_str().is_empty() {
            return Ok(root);
        }
        let direct = root.join(relative);
        if direct.exists() {
            return Ok(direct);
        }
        WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .find(|entry| entry.path().ends_with(relative))
            .map(|entry| entry.into_path())
            .ok_or_else(|| {
                Error::resolution(
                    format!("{name} @ {}", relative.display()),
                    format!("no such file in package root {}", root.display()),
                )
            })
    }

    fn describe_roots(&self) -> String {
        if self.roots.is_empty() {
            return "<no search roots>".to_string();
        }
        self.roots.iter().map(|r| r.display().to_string()).collect::<Vec<_>>().join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn parse_specifiers() {
        assert!(matches!(Source::parse("conf/app.yaml"), Source::Path(p) if p == Path::new("conf/app.yaml")));
        for spec in ["mypkg @ test/app.yaml", "mypkg@test/app.yaml"] {
            match Source::parse(spec) {
                Source::Package { name, relative } => {
                    assert_eq!(name, "mypkg");
                    assert_eq!(relative, Path::new("test/app.yaml"));
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        match Source::parse("@mypkg") {
            Source::Package { name, relative } => {
                assert_eq!(name, "mypkg");
                assert!(relative.as_os_str().is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn resolve_full_and_short_paths() {
        let tmp = TempDir::new().expect("tmp");
        let nested = tmp.path().join("my_pkg").join("test");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::write(nested.join("app.yaml"), "name: x\n").expect("write");

        let resolver = PackageResolver::with_roots([tmp.path()]);
        let full = resolver.resolve("my-pkg", Path::new("test/app.yaml")).expect("full");
        let short = resolver.resolve("my_pkg", Path::new("app.yaml")).expect("short");
        assert_eq!(full, short);
        assert_eq!(resolver.resolve("my_pkg", Path::new("")).expect("root"), tmp.path().join("my_pkg"));
    }

    #[test]
    fn resolve_failures() {
        let tmp = TempDir::new().expect("tmp");
        fs::create_dir_all(tmp.path().join("pkg")).expect("mkdir");
        let resolver = PackageResolver::with_roots([tmp.path()]);
        assert!(matches!(
            resolver.resolve("missing", Path::new("a.yaml")),
            Err(Error::SourceResolution { .. })
        ));
        assert!(matches!(
            resolver.resolve("pkg", Path::new("a.yaml")),
            Err(Error::SourceResolution { .. })
        ));
    }
}
