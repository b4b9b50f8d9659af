//! Audit of which registry keys a set of configuration sources needs

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::Result;
use crate::loader::{Loader, Source};

/// One place that refers to a registry key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    /// File containing the reference; `None` for in-memory mappings.
    pub source: Option<PathBuf>,
    /// Dotted path of the node whose value comes from the registry.
    pub path: String,
}

/// Registry key to every place referencing it, in discovery order.
pub type Registrations = BTreeMap<String, Vec<Provenance>>;

/// Scan `sources` with the default loader. See [`required_registrations`].
pub fn get_required_registration<S: AsRef<str>>(sources: &[S]) -> Result<Registrations> {
    required_registrations(&Loader::new(), sources)
}

/// Load every source without resolving registry indirections and collect
/// the keys they reference.
///
/// Each source is a file, a directory, `package @ path` or `@package`.
/// Directories are scanned for `.yaml`/`.yml` files in sorted order.
pub fn required_registrations<S: AsRef<str>>(
    loader: &Loader,
    sources: &[S],
) -> Result<Registrations> {
    let scanner = loader.clone().resolve_registry(false);
    let mut registrations = Registrations::new();
    for spec in sources {
        let spec = spec.as_ref();
        let root = scanner.resolve_path(&Source::parse(spec), None)?;
        for file in config_files(&root) {
            tracing::debug!("Scanning {} for registry references", file.display());
            scanner.scan_registrations(&file, &mut registrations)?;
        }
    }
    Ok(registrations)
}

fn config_files(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        return vec![root.to_path_buf()];
    }
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref(),
                Some("yaml" | "yml")
            )
        })
        .collect()
}

pub(crate) fn record(
    registrations: &mut Registrations,
    key: &str,
    source: Option<&Path>,
    path: &str,
) {
    let entry = Provenance { source: source.map(Path::to_path_buf), path: path.to_string() };
    let records = registrations.entry(key.to_string()).or_default();
    if !records.contains(&entry) {
        records.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::PackageResolver;
    use std::fs;
    use tempfile::TempDir;

    fn package_with_configs() -> TempDir {
        let tmp = TempDir::new().expect("tmp");
        let test_dir = tmp.path().join("mypkg").join("test");
        fs::create_dir_all(&test_dir).expect("mkdir");
        fs::write(
            test_dir.join("registry_config.yaml"),
            "name: Registry\ndata:\n  registry: AUDIT_KEY\n",
        )
        .expect("write");
        fs::write(test_dir.join("plain.yaml"), "name: plain\n").expect("write");
        fs::write(test_dir.join("notes.txt"), "data: {registry: IGNORED}\n").expect("write");
        tmp
    }

    #[test]
    fn finds_single_reference_in_package_dir_and_file() {
        let tmp = package_with_configs();
        let loader = Loader::new().with_packages(PackageResolver::with_roots([tmp.path()]));
        let dir = tmp.path().join("mypkg").join("test");
        let file = dir.join("registry_config.yaml");
        let dir = dir.to_string_lossy().to_string();
        let file = file.to_string_lossy().to_string();

        for trial in ["@mypkg", "mypkg @ test", dir.as_str(), file.as_str()] {
            let found = required_registrations(&loader, &[trial]).expect("scan");
            assert_eq!(found.len(), 1, "trial {trial}");
            let records = &found["AUDIT_KEY"];
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].path, "data");
            assert!(records[0]
                .source
                .as_deref()
                .is_some_and(|p| p.ends_with("registry_config.yaml")));
        }
    }

    #[test]
    fn record_deduplicates() {
        let mut registrations = Registrations::new();
        record(&mut registrations, "K", Some(Path::new("a.yaml")), "x");
        record(&mut registrations, "K", Some(Path::new("a.yaml")), "x");
        record(&mut registrations, "K", None, "y");
        assert_eq!(registrations["K"].len(), 2);
    }
}
