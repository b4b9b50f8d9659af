//! Reserved-key classification of YAML mappings

use serde_yaml::{Mapping, Value as Yaml};

/// Value is a source specifier; sibling keys become overrides on the loaded
/// namespace.
pub const LOAD_KEY: &str = "yaml";

/// Value is a registry key; the node's value becomes the registered string.
pub const REGISTRY_KEY: &str = "registry";

/// A mapping, classified once before it is turned into a namespace node.
#[derive(Debug, PartialEq)]
pub(crate) enum Node {
    Plain(Vec<(String, Yaml)>),
    Load { source: String, overrides: Vec<(String, Yaml)> },
    Registry { key: String },
}

impl Node {
    pub(crate) fn classify(mapping: Mapping) -> Result<Node, String> {
        let mut entries = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            entries.push((key_text(&key)?, value));
        }

        let load = entries.iter().position(|(k, _)| k == LOAD_KEY);
        let registry = entries.iter().position(|(k, _)| k == REGISTRY_KEY);
        match (load, registry) {
            (None, None) => Ok(Node::Plain(entries)),
            (Some(_), Some(_)) => {
                Err(format!("a mapping cannot use both '{LOAD_KEY}' and '{REGISTRY_KEY}'"))
            }
            (Some(i), None) => {
                let (_, value) = entries.remove(i);
                let source = scalar_text(&value)
                    .ok_or_else(|| format!("'{LOAD_KEY}' must name a source, got {value:?}"))?;
                Ok(Node::Load { source, overrides: entries })
            }
            (None, Some(i)) => {
                let (_, value) = entries.remove(i);
                let key = scalar_text(&value)
                    .ok_or_else(|| format!("'{REGISTRY_KEY}' must name a key, got {value:?}"))?;
                if !entries.is_empty() {
                    tracing::warn!(
                        "Ignoring {} key(s) next to '{}: {}'",
                        entries.len(),
                        REGISTRY_KEY,
                        key
                    );
                }
                Ok(Node::Registry { key })
            }
        }
    }
}

fn key_text(key: &Yaml) -> Result<String, String> {
    match scalar_text(key) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(format!("unsupported mapping key {key:?}")),
    }
}

fn scalar_text(value: &Yaml) -> Option<String> {
    match value {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(text: &str) -> Mapping {
        serde_yaml::from_str(text).expect("mapping")
    }

    #[test]
    fn plain_mapping() {
        let node = Node::classify(mapping("a: 1\nb: x\n")).expect("classify");
        assert!(matches!(node, Node::Plain(entries) if entries.len() == 2));
    }

    #[test]
    fn load_with_overrides() {
        let node = Node::classify(mapping("yaml: pkg @ a.yaml\nname: new\nnested.name: deep\n"))
            .expect("classify");
        match node {
            Node::Load { source, overrides } => {
                assert_eq!(source, "pkg @ a.yaml");
                let keys: Vec<&str> = overrides.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["name", "nested.name"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn registry_reference() {
        let node = Node::classify(mapping("registry: TEST_KEY\n")).expect("classify");
        assert_eq!(node, Node::Registry { key: "TEST_KEY".into() });
    }

    #[test]
    fn conflicting_or_malformed_reserved_keys() {
        assert!(Node::classify(mapping("yaml: a.yaml\nregistry: K\n")).is_err());
        assert!(Node::classify(mapping("yaml: [a, b]\n")).is_err());
        assert!(Node::classify(mapping("registry: {k: v}\n")).is_err());
    }
}
