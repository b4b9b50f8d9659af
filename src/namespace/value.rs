//! Leaf and node values stored in a namespace

use super::Namespace;
use serde_yaml::{Number, Value as Yaml};

/// A value held under one key of a [`Namespace`].
///
/// Lists keep their raw YAML elements: sequences are never promoted into
/// namespaces, even when they contain mappings.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Yaml>),
    Namespace(Namespace),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, and integers widened to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Yaml]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_namespace(&self) -> Option<&Namespace> {
        match self {
            Value::Namespace(ns) => Some(ns),
            _ => None,
        }
    }

    pub fn is_namespace(&self) -> bool {
        matches!(self, Value::Namespace(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "str",
            Value::List(_) => "list",
            Value::Namespace(_) => "namespace",
        }
    }

    /// Convert a YAML scalar or sequence. Mappings return `None`; they only
    /// become namespaces through the loader, which handles reserved keys.
    pub fn from_yaml(yaml: Yaml) -> Option<Value> {
        match yaml {
            Yaml::Null => Some(Value::Null),
            Yaml::Bool(b) => Some(Value::Bool(b)),
            Yaml::Number(n) => Some(number_to_value(&n)),
            Yaml::String(s) => Some(Value::String(s)),
            Yaml::Sequence(items) => Some(Value::List(items)),
            Yaml::Tagged(tagged) => Value::from_yaml(tagged.value),
            Yaml::Mapping(_) => None,
        }
    }

    /// Interpret command-line text as a YAML scalar (`7` is an integer,
    /// `true` a bool). Anything that is not a plain scalar stays a string.
    pub fn parse_scalar(text: &str) -> Value {
        match serde_yaml::from_str::<Yaml>(text) {
            Ok(Yaml::Bool(b)) => Value::Bool(b),
            Ok(Yaml::Number(n)) => number_to_value(&n),
            _ => Value::String(text.to_string()),
        }
    }

    pub fn to_yaml(&self) -> Yaml {
        match self {
            Value::Null => Yaml::Null,
            Value::Bool(b) => Yaml::Bool(*b),
            Value::Integer(i) => Yaml::Number(Number::from(*i)),
            Value::Float(f) => Yaml::Number(Number::from(*f)),
            Value::String(s) => Yaml::String(s.clone()),
            Value::List(items) => Yaml::Sequence(items.clone()),
            Value::Namespace(ns) => ns.dump(),
        }
    }

    /// Text substituted for a `{placeholder}` referring to this value.
    pub(crate) fn render(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => render_float(*f),
            Value::String(s) => s.clone(),
            Value::List(_) | Value::Namespace(_) => {
                serde_json::to_string(&self.to_yaml()).unwrap_or_default()
            }
        }
    }
}

fn number_to_value(n: &Number) -> Value {
    match n.as_i64() {
        Some(i) => Value::Integer(i),
        None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
    }
}

/// Whole floats keep a trailing `.0` so `1.0` does not read back as an int.
pub(crate) fn render_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Namespace> for Value {
    fn from(value: Namespace) -> Self {
        Value::Namespace(value)
    }
}

impl From<Vec<Yaml>> for Value {
    fn from(value: Vec<Yaml>) -> Self {
        Value::List(value)
    }
}

impl From<Vec<&str>> for Value {
    fn from(value: Vec<&str>) -> Self {
        Value::List(value.into_iter().map(Yaml::from).collect())
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Value::List(value.into_iter().map(Yaml::String).collect())
    }
}
