//! Serialization of a namespace back to plain YAML structures and files

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Serialize, Serializer};
use serde_yaml::{Mapping, Value as Yaml};

use super::Namespace;
use crate::error::{Error, Result};

impl Namespace {
    /// Plain nested mapping with scalar types preserved. Keys are written as
    /// stored, so a key named `yaml` or `registry` that was set directly or
    /// loaded with registry resolution disabled is emitted and will be
    /// treated as an indirection when the dump is loaded again.
    pub fn dump(&self) -> Yaml {
        let mut mapping = Mapping::new();
        for (key, value) in &self.entries {
            mapping.insert(Yaml::String(key.clone()), value.to_yaml());
        }
        Yaml::Mapping(mapping)
    }

    /// Write the dump to `path`. `.json` and `.toml` extensions select those
    /// formats, anything else is written as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dumped = self.dump();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
        let text = match ext.as_str() {
            "json" => serde_json::to_string_pretty(&dumped).map_err(|e| e.to_string()),
            "toml" => toml::to_string_pretty(&dumped).map_err(|e| e.to_string()),
            _ => serde_yaml::to_string(&dumped).map_err(|e| e.to_string()),
        }
        .map_err(|reason| Error::Serialize { path: path.to_path_buf(), reason })?;

        fs::write(path, text).map_err(|e| Error::io(path, e))?;
        tracing::debug!("Saved namespace to {}", path.display());
        Ok(())
    }
}

impl Serialize for Namespace {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.dump().serialize(serializer)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_yaml::to_string(&self.dump()).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::Value;
    use tempfile::TempDir;

    fn sample() -> Namespace {
        let mut ns = Namespace::new();
        ns.set("name", "Name").expect("set");
        ns.set("nested.email", "name@host.domain").expect("set");
        ns.set("count", 3).expect("set");
        ns.set("ratio", 0.5).expect("set");
        ns.set("flag", true).expect("set");
        ns.set("tags", vec!["a", "b"]).expect("set");
        ns
    }

    #[test]
    fn dump_preserves_types() {
        let dumped = sample().dump();
        assert_eq!(dumped["name"], Yaml::from("Name"));
        assert_eq!(dumped["nested"]["email"], Yaml::from("name@host.domain"));
        assert_eq!(dumped["count"].as_i64(), Some(3));
        assert_eq!(dumped["ratio"].as_f64(), Some(0.5));
        assert_eq!(dumped["flag"], Yaml::Bool(true));
        assert!(dumped["tags"].is_sequence());
    }

    #[test]
    fn dump_keeps_reserved_key_names() {
        let mut ns = Namespace::new();
        ns.set("data.registry", "SOME_KEY").expect("set");
        let dumped = ns.dump();
        assert_eq!(dumped["data"]["registry"], Yaml::from("SOME_KEY"));
    }

    #[test]
    fn save_writes_yaml_and_json() {
        let tmp = TempDir::new().expect("tmp");
        let ns = sample();

        let yaml_path = tmp.path().join("out.yaml");
        ns.save(&yaml_path).expect("save yaml");
        let text = fs::read_to_string(&yaml_path).expect("read");
        assert!(text.contains("email: name@host.domain"));

        let json_path = tmp.path().join("out.json");
        ns.save(&json_path).expect("save json");
        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json_path).expect("read")).expect("json");
        assert_eq!(parsed["count"], 3);
    }

    #[test]
    fn display_is_yaml() {
        let mut ns = Namespace::new();
        ns.set("name", Value::from("Name")).expect("set");
        assert_eq!(ns.to_string(), "name: Name\n");
    }
}
