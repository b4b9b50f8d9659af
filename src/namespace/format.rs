//! `{dotted.path}` template substitution

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{join_path, Namespace, Value};
use crate::error::{Error, Result};

/// `{{` and `}}` are literal braces; `{path}` is a placeholder. A `:spec`
/// suffix inside a placeholder is accepted and ignored.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{|\}\}|\{([^{}]*)\}").expect("valid placeholder regex"));

impl Namespace {
    /// Substitute every `{dotted.path}` in `template` with this namespace's
    /// value at that path. Nothing is mutated.
    pub fn format(&self, template: &str) -> Result<String> {
        substitute(template, |path| self.find(path))
    }

    pub fn format_all<S: AsRef<str>>(&self, templates: &[S]) -> Result<Vec<String>> {
        templates.iter().map(|t| self.format(t.as_ref())).collect()
    }

    /// Replace every string leaf (including strings inside lists) by its
    /// formatted text, resolving placeholders against the root of the tree.
    /// A path missing at the root is looked up relative to the namespace
    /// holding the string.
    ///
    /// Single pass: all lookups see the tree as it was before the call, so
    /// placeholders produced by a substitution stay in the output.
    pub fn format_self(&mut self) -> Result<()> {
        if let Some(path) = self.first_frozen("") {
            return Err(Error::frozen(path));
        }
        let root = self.clone();
        self.format_strings(&root, "")
    }

    fn format_strings(&mut self, root: &Namespace, scope: &str) -> Result<()> {
        let lookup = |path: &str| {
            root.find(path).or_else(|| {
                if scope.is_empty() {
                    None
                } else {
                    root.find(&join_path(scope, path))
                }
            })
        };
        for (key, value) in &mut self.entries {
            match value {
                Value::String(s) => *s = substitute(s, lookup)?,
                Value::List(items) => {
                    for item in items.iter_mut() {
                        if let serde_yaml::Value::String(s) = item {
                            *s = substitute(s, lookup)?;
                        }
                    }
                }
                Value::Namespace(child) => child.format_strings(root, &join_path(scope, key))?,
                _ => {}
            }
        }
        Ok(())
    }

    fn first_frozen(&self, scope: &str) -> Option<String> {
        if self.frozen {
            return Some(if scope.is_empty() { "<root>".to_string() } else { scope.to_string() });
        }
        self.entries.iter().find_map(|(key, value)| match value {
            Value::Namespace(ns) => ns.first_frozen(&join_path(scope, key)),
            _ => None,
        })
    }
}

fn substitute<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a Value>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&template[last..whole.start()]);
        match whole.as_str() {
            "{{" => out.push('{'),
            "}}" => out.push('}'),
            _ => out.push_str(&resolve(template, &caps, &lookup)?),
        }
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

fn resolve<'a>(
    template: &str,
    caps: &Captures<'_>,
    lookup: &impl Fn(&str) -> Option<&'a Value>,
) -> Result<String> {
    let inner = caps.get(1).map_or("", |m| m.as_str());
    let path = inner.split(':').next().unwrap_or("").trim();
    if path.is_empty() {
        return Err(Error::Format {
            template: template.to_string(),
            reason: "empty placeholder".to_string(),
        });
    }
    lookup(path).map(Value::render).ok_or_else(|| Error::missing(path))
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
    fn format_single_and_many() {
        let ns = sample();
        assert_eq!(
            ns.format("{name}, {nested.email}, {value}").expect("format"),
            "Name, name@host.domain, 1.0"
        );
        assert_eq!(
            ns.format_all(&["{name}", "{nested.email}", "{value}"]).expect("format"),
            vec!["Name", "name@host.domain", "1.0"]
        );
    }

    #[test]
    fn format_escapes_and_errors() {
        let ns = sample();
        assert_eq!(ns.format("{{literal}} {name}").expect("format"), "{literal} Name");
        assert!(matches!(ns.format("{nope}"), Err(Error::MissingKey { .. })));
        assert!(matches!(ns.format("{}"), Err(Error::Format { .. })));
    }

    #[test]
    fn format_self_resolves_root_then_local() {
        let mut ns = sample();
        ns.set("my_name", "{name}").expect("set");
        ns.set("nested.my_email", "{nested.email}").expect("set");
        ns.set("nested.new_email", vec!["{email}"]).expect("set");

        assert_eq!(ns.format("{my_name}").expect("format"), "{name}");
        assert_eq!(ns.get_str("my_name"), Some("{name}"));

        ns.format_self().expect("format_self");
        assert_eq!(ns.get_str("my_name"), Some("Name"));
        assert_eq!(ns.get_str("nested.my_email"), Some("name@host.domain"));
        assert_eq!(
            ns.get_list("nested.new_email"),
            Some(&[serde_yaml::Value::from("name@host.domain")][..])
        );
    }

    #[test]
    fn format_self_is_single_pass() {
        let mut ns = Namespace::new();
        ns.set("a", "{b}").expect("set");
        ns.set("b", "{c}").expect("set");
        ns.set("c", "end").expect("set");
        ns.format_self().expect("first pass");
        assert_eq!(ns.get_str("a"), Some("{c}"));
        assert_eq!(ns.get_str("b"), Some("end"));
        ns.format_self().expect("second pass");
        assert_eq!(ns.get_str("a"), Some("end"));
    }

    #[test]
    fn format_self_refuses_frozen_tree() {
        let mut ns = sample();
        ns.set("my_name", "{name}").expect("set");
        ns.freeze();
        assert!(matches!(ns.format_self(), Err(Error::ImmutableModification { .. })));
        assert_eq!(ns.get_str("my_name"), Some("{name}"));
    }
}
