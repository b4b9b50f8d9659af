//! Composition of a primary source with secondary merge tokens
//!
//! Token grammar (split on `=`):
//! - `source`: load and copy its top-level keys over the result
//! - `path=source`: load and attach at `path`
//! - `path=source=extra...`: attach, then apply each extra at `path`
//!
//! Tokens apply left to right; later tokens win over earlier ones and over
//! the primary source.

use crate::error::Result;
use crate::loader::Loader;
use crate::namespace::{Namespace, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeToken {
    Whole(String),
    Attach { path: String, source: String, overrides: Vec<String> },
}

impl MergeToken {
    pub fn parse(token: &str) -> Self {
        let mut parts = token.split('=');
        let first = parts.next().unwrap_or_default().to_string();
        match parts.next() {
            None => MergeToken::Whole(first),
            Some(source) => MergeToken::Attach {
                path: first,
                source: source.to_string(),
                overrides: parts.map(str::to_string).collect(),
            },
        }
    }
}

/// Load `primary` and apply every secondary token in order.
pub fn merge_sources<S: AsRef<str>>(
    loader: &Loader,
    primary: &str,
    secondaries: &[S],
) -> Result<Namespace> {
    let mut namespace = loader.load(primary)?;
    for token in secondaries {
        apply_token(loader, &mut namespace, &MergeToken::parse(token.as_ref()))?;
    }
    Ok(namespace)
}

/// Apply one token to `namespace`.
///
/// The right-hand side of `path=...` is loaded and attached. It is read as a
/// scalar override only when it does not resolve to a file and `path`
/// already holds a plain value; text replacing a string stays a string,
/// otherwise it is read as a YAML scalar. Extra `=` segments follow the
/// same rule but merge into `path` instead of attaching.
pub fn apply_token(loader: &Loader, namespace: &mut Namespace, token: &MergeToken) -> Result<()> {
    match token {
        MergeToken::Whole(source) => {
            tracing::debug!("Merging {} into the top level", source);
            let loaded = loader.load(source.as_str())?;
            namespace.merge_from(loaded)
        }
        MergeToken::Attach { path, source, overrides } => {
            apply_segment(loader, namespace, path, source, Segment::Attach)?;
            for extra in overrides {
                apply_segment(loader, namespace, path, extra, Segment::Update)?;
            }
            Ok(())
        }
    }
}

#[derive(Clone, Copy)]
enum Segment {
    Attach,
    Update,
}

fn apply_segment(
    loader: &Loader,
    namespace: &mut Namespace,
    path: &str,
    rhs: &str,
    segment: Segment,
) -> Result<()> {
    let holds_leaf = namespace.find(path).is_some_and(|value| !value.is_namespace());
    if holds_leaf && !loader.is_loadable(rhs) {
        return override_at(namespace, path, rhs);
    }
    let loaded = loader.load(rhs)?;
    match segment {
        Segment::Attach => {
            tracing::debug!("Attaching {} at '{}'", rhs, path);
            namespace.add(path, loaded)
        }
        Segment::Update => {
            tracing::debug!("Updating '{}' from {}", path, rhs);
            namespace.update(path, loaded)
        }
    }
}

fn override_at(namespace: &mut Namespace, path: &str, text: &str) -> Result<()> {
    tracing::debug!("Overriding '{}' with {:?}", path, text);
    let value = match namespace.find(path) {
        Some(Value::String(_)) => Value::String(text.to_string()),
        _ => Value::parse_scalar(text),
    };
    namespace.update(path, value)
}
