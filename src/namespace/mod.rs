//! The recursive configuration namespace
//!
//! A [`Namespace`] is an ordered mapping from key to [`Value`]. Nested
//! namespaces are owned by their parent, so the tree has no sharing and no
//! cycles. Every accessor (dotted paths, `ns["a.b"]` indexing, and
//! `child`/`child_mut` chaining) goes through the same lookup and assign
//! primitives below.

use std::ops::Index;

use crate::error::{Error, Result};
use crate::loader::{Loader, Source};

mod format;
mod io;
mod value;

pub use value::Value;

#[derive(Debug, Clone, Default)]
pub struct Namespace {
    entries: Vec<(String, Value)>,
    frozen: bool,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a namespace from a file, `package @ path` specifier, YAML
    /// mapping or another namespace, using the default [`Loader`].
    pub fn load(source: impl Into<Source>) -> Result<Self> {
        Loader::new().load(source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    /// Look up a dotted path, returning `None` when any segment is missing.
    pub fn find(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.entry(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Namespace(ns) => ns.entry(segment)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn get(&self, path: &str) -> Result<&Value> {
        self.find(path).ok_or_else(|| Error::missing(path))
    }

    /// Like [`get`](Self::get), falling back to `default` for missing paths.
    pub fn get_or<'a>(&'a self, path: &str, default: &'a Value) -> &'a Value {
        self.find(path).unwrap_or(default)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.find(path).and_then(Value::as_str)
    }

    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.find(path).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.find(path).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.find(path).and_then(Value::as_bool)
    }

    pub fn get_list(&self, path: &str) -> Option<&[serde_yaml::Value]> {
        self.find(path).and_then(Value::as_list)
    }

    /// The child namespace at `path`.
    pub fn child(&self, path: &str) -> Result<&Namespace> {
        match self.get(path)? {
            Value::Namespace(ns) => Ok(ns),
            _ => Err(Error::conflict(path)),
        }
    }

    /// Ensure-child: return the child namespace under `key`, attaching a
    /// fresh empty one when the key does not exist yet.
    ///
    /// This is the explicit form of auto-vivification, so
    /// `ns.child_mut("new_child")?.set("name", "x")` creates `new_child`.
    pub fn child_mut(&mut self, key: &str) -> Result<&mut Namespace> {
        self.ensure_child(key, key)
    }

    /// Assign `value` at a dotted path, creating intermediate namespaces.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let (parent, leaf) = self.parent_mut(path)?;
        parent.assign(leaf, value.into(), path)
    }

    /// Attach a namespace loaded from a secondary source at `path`.
    ///
    /// A namespace already living at `path` receives the new top-level keys
    /// (new values win); any other value there is a merge conflict.
    pub fn add(&mut self, path: &str, namespace: Namespace) -> Result<()> {
        let (parent, leaf) = self.parent_mut(path)?;
        match parent.position(leaf) {
            None => parent.assign(leaf, Value::Namespace(namespace), path),
            Some(i) => match &mut parent.entries[i].1 {
                Value::Namespace(existing) => existing.merge_from(namespace),
                _ => Err(Error::conflict(path)),
            },
        }
    }

    /// Apply an override at `path`: namespaces merge into an existing child
    /// namespace, everything else replaces the current value.
    pub fn update(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        match value.into() {
            Value::Namespace(ns) if matches!(self.find(path), Some(Value::Namespace(_))) => {
                self.add(path, ns)
            }
            other => self.set(path, other),
        }
    }

    /// Copy every top-level key of `other` into this namespace, overwriting
    /// colliding keys.
    pub fn merge_from(&mut self, other: Namespace) -> Result<()> {
        for (key, value) in other.entries {
            self.assign(&key, value, &key)?;
        }
        Ok(())
    }

    /// Flattened view: dotted path to leaf value, in depth-first order.
    /// Namespaces themselves are not leaves, so empty ones do not appear.
    pub fn attributes(&self) -> Vec<(String, Value)> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<(String, Value)>) {
        for (key, value) in &self.entries {
            let path = join_path(prefix, key);
            match value {
                Value::Namespace(ns) => ns.flatten_into(&path, out),
                leaf => out.push((path, leaf.clone())),
            }
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Make this node and every existing descendant immutable.
    pub fn freeze(&mut self) {
        self.set_frozen(true);
    }

    pub fn unfreeze(&mut self) {
        self.set_frozen(false);
    }

    fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
        for (_, value) in &mut self.entries {
            if let Value::Namespace(ns) = value {
                ns.set_frozen(frozen);
            }
        }
    }

    fn entry(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    fn ensure_child(&mut self, key: &str, path: &str) -> Result<&mut Namespace> {
        let index = match self.position(key) {
            Some(i) => i,
            None => {
                if self.frozen {
                    return Err(Error::frozen(path));
                }
                self.entries.push((key.to_string(), Value::Namespace(Namespace::new())));
                self.entries.len() - 1
            }
        };
        match &mut self.entries[index].1 {
            Value::Namespace(ns) => Ok(ns),
            _ => Err(Error::conflict(path)),
        }
    }

    /// Walk to the namespace owning the last segment of `path`.
    fn parent_mut<'p>(&mut self, path: &'p str) -> Result<(&mut Namespace, &'p str)> {
        if path.is_empty() || path.split('.').any(str::is_empty) {
            return Err(Error::missing(path));
        }
        let (parents, leaf) = match path.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, path),
        };
        let mut node = self;
        if let Some(parents) = parents {
            let mut walked = 0;
            for segment in parents.split('.') {
                walked += segment.len();
                node = node.ensure_child(segment, &path[..walked])?;
                walked += 1;
            }
        }
        Ok((node, leaf))
    }

    fn assign(&mut self, key: &str, value: Value, path: &str) -> Result<()> {
        if self.frozen {
            return Err(Error::frozen(path));
        }
        match self.position(key) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
        Ok(())
    }
}

pub(crate) fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

impl PartialEq for Namespace {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Index<&str> for Namespace {
    type Output = Value;

    /// Panics when `path` does not exist; use [`Namespace::get`] to handle that.
    fn index(&self, path: &str) -> &Value {
        match self.find(path) {
            Some(value) => value,
            None => panic!("key '{path}' not found in namespace"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Namespace {
        let mut ns = Namespace::new();
        ns.set("name", "Name").expect("set");
        ns.set("nested.email", "name@host.domain").expect("set");
        ns.set("value", 1.0).expect("set");
        ns
    }

    #[test]
    fn set_then_get_same_path() {
        let mut ns = sample();
        ns.set("nested.email", "other@host").expect("overwrite");
        ns.set("deep.a.b.c", 3).expect("create");
        assert_eq!(ns.get_str("nested.email"), Some("other@host"));
        assert_eq!(ns.get_i64("deep.a.b.c"), Some(3));
    }

    #[test]
    fn views_share_one_store() {
        let mut ns = sample();
        ns.child_mut("nested").expect("child").set("email", "x@y").expect("set");
        assert_eq!(ns["nested.email"], Value::from("x@y"));
        assert_eq!(ns.child("nested").expect("child").get_str("email"), Some("x@y"));
        assert_eq!(ns.get("nested.email").expect("get").as_str(), Some("x@y"));
    }

    #[test]
    fn child_mut_auto_vivifies() {
        let mut ns = sample();
        assert!(!ns.contains("new_child"));
        ns.child_mut("new_child").expect("vivify").set("name", "New Name").expect("set");
        assert!(ns.get("new_child").expect("exists").is_namespace());
        assert_eq!(ns.get_str("new_child.name"), Some("New Name"));
    }

    #[test]
    fn missing_key_errors() {
        let ns = sample();
        assert!(matches!(ns.get("nested.phone"), Err(Error::MissingKey { .. })));
        assert!(matches!(ns.get("name.first"), Err(Error::MissingKey { .. })));
        let fallback = Value::from("none");
        assert_eq!(ns.get_or("nested.phone", &fallback), &fallback);
    }

    #[test]
    fn set_through_scalar_is_conflict() {
        let mut ns = sample();
        let err = ns.set("name.first", "x").expect_err("name is a string");
        assert!(matches!(err, Error::MergeConflict { ref path } if path == "name"));
    }

    #[test]
    fn invalid_paths_are_rejected() {
        let mut ns = sample();
        assert!(ns.set("", 1).is_err());
        assert!(ns.set("a..b", 1).is_err());
    }

    #[test]
    fn freeze_blocks_every_mutation_and_cascades() {
        let mut ns = sample();
        ns.freeze();

        assert_eq!(ns.get_str("name"), Some("Name"));
        assert_eq!(ns.get_str("nested.email"), Some("name@host.domain"));

        assert!(matches!(ns.set("new_name", "x"), Err(Error::ImmutableModification { .. })));
        assert!(matches!(ns.set("name", "x"), Err(Error::ImmutableModification { .. })));
        assert!(matches!(ns.set("nested.email", "x"), Err(Error::ImmutableModification { .. })));
        assert!(matches!(ns.child_mut("fresh"), Err(Error::ImmutableModification { .. })));
        assert!(matches!(ns.set("fresh.name", "x"), Err(Error::ImmutableModification { .. })));
        assert!(ns.child("nested").expect("child").is_frozen());

        let mut patch = Namespace::new();
        patch.set("email", "other@host.domain").expect("set");
        assert!(matches!(ns.add("minor", patch.clone()), Err(Error::ImmutableModification { .. })));
        assert!(matches!(ns.add("nested", patch.clone()), Err(Error::ImmutableModification { .. })));
        assert!(matches!(ns.update("name", "x"), Err(Error::ImmutableModification { .. })));
        assert!(matches!(
            ns.update("nested", patch.clone()),
            Err(Error::ImmutableModification { .. })
        ));
        assert!(matches!(ns.merge_from(patch), Err(Error::ImmutableModification { .. })));
        assert_eq!(ns.get_str("nested.email"), Some("name@host.domain"));
        assert!(!ns.contains("minor"));

        ns.unfreeze();
        ns.set("new_name", "New Name").expect("mutable again");
        ns.set("nested.phone", "123").expect("child unfrozen too");
    }

    #[test]
    fn add_attaches_and_merges() {
        let mut ns = sample();
        let mut sub = Namespace::new();
        sub.set("item", "sub").expect("set");
        ns.add("minor.part", sub.clone()).expect("attach");
        assert_eq!(ns.get_str("minor.part.item"), Some("sub"));

        let mut more = Namespace::new();
        more.set("extra", 1).expect("set");
        ns.add("minor.part", more).expect("merge into namespace");
        assert_eq!(ns.get_str("minor.part.item"), Some("sub"));
        assert_eq!(ns.get_i64("minor.part.extra"), Some(1));

        assert!(matches!(ns.add("name", sub), Err(Error::MergeConflict { .. })));
    }

    #[test]
    fn update_replaces_scalars_and_merges_namespaces() {
        let mut ns = sample();
        ns.update("name", "OVERRIDE").expect("scalar");
        assert_eq!(ns.get_str("name"), Some("OVERRIDE"));

        let mut patch = Namespace::new();
        patch.set("phone", "123").expect("set");
        ns.update("nested", patch).expect("merge");
        assert_eq!(ns.get_str("nested.email"), Some("name@host.domain"));
        assert_eq!(ns.get_str("nested.phone"), Some("123"));
    }

    #[test]
    fn attributes_flatten_depth_first() {
        let mut ns = sample();
        ns.set("tags", vec!["a", "b"]).expect("set");
        let paths: Vec<String> = ns.attributes().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["name", "nested.email", "value", "tags"]);
    }

    #[test]
    #[should_panic(expected = "not found")]
    fn index_panics_on_missing_path() {
        let ns = sample();
        let _ = &ns["missing"];
    }
}
