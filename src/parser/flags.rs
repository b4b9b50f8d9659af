//! One generated `--dotted.path` flag per namespace leaf

use clap::builder::BoolishValueParser;
use clap::{value_parser, Arg, ArgMatches};
use serde_yaml::Value as Yaml;

use crate::namespace::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlagKind {
    Integer,
    Float,
    Bool,
    Text,
}

impl FlagKind {
    fn of_value(value: &Value) -> Self {
        match value {
            Value::Integer(_) => FlagKind::Integer,
            Value::Float(_) => FlagKind::Float,
            Value::Bool(_) => FlagKind::Bool,
            _ => FlagKind::Text,
        }
    }

    fn of_element(element: &Yaml) -> Self {
        match element {
            Yaml::Number(n) if n.is_i64() || n.is_u64() => FlagKind::Integer,
            Yaml::Number(_) => FlagKind::Float,
            Yaml::Bool(_) => FlagKind::Bool,
            _ => FlagKind::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FlagSpec {
    pub path: String,
    pub kind: FlagKind,
    pub multiple: bool,
    default: String,
}

impl FlagSpec {
    /// Lists take their element type from the first element; without type
    /// inference every flag takes raw strings.
    pub fn infer(path: &str, value: &Value, infer_types: bool) -> Self {
        let (kind, multiple) = match value {
            Value::List(items) => (items.first().map_or(FlagKind::Text, FlagKind::of_element), true),
            other => (FlagKind::of_value(other), false),
        };
        Self {
            path: path.to_string(),
            kind: if infer_types { kind } else { FlagKind::Text },
            multiple,
            default: value.render(),
        }
    }

    pub fn to_arg(&self) -> Arg {
        let help = if self.multiple {
            format!("Overwrite list of values for {}, default={}", self.path, self.default)
        } else {
            format!("Overwrite value for {}, default={}", self.path, self.default)
        };
        let arg = Arg::new(self.path.clone())
            .long(self.path.clone())
            .value_name(self.path.to_uppercase())
            .help(help);
        let arg = match self.kind {
            FlagKind::Integer => arg.value_parser(value_parser!(i64)).allow_negative_numbers(true),
            FlagKind::Float => arg.value_parser(value_parser!(f64)).allow_negative_numbers(true),
            FlagKind::Bool => arg.value_parser(BoolishValueParser::new()),
            FlagKind::Text => arg.value_parser(value_parser!(String)),
        };
        if self.multiple {
            arg.num_args(1..)
        } else {
            arg.num_args(1)
        }
    }

    /// The value supplied on the command line, typed like the flag.
    pub fn supplied(&self, matches: &ArgMatches) -> Option<Value> {
        let id = self.path.as_str();
        if !matches.contains_id(id) {
            return None;
        }
        let values: Vec<Value> = match self.kind {
            FlagKind::Integer => collect::<i64>(matches, id),
            FlagKind::Float => collect::<f64>(matches, id),
            FlagKind::Bool => collect::<bool>(matches, id),
            FlagKind::Text => collect::<String>(matches, id),
        };
        if self.multiple {
            Some(Value::List(values.iter().map(Value::to_yaml).collect()))
        } else {
            values.into_iter().next()
        }
    }
}

fn collect<T>(matches: &ArgMatches, id: &str) -> Vec<Value>
where
    T: Clone + Send + Sync + 'static + Into<Value>,
{
    matches
        .get_many::<T>(id)
        .map(|values| values.cloned().map(Into::into).collect())
        .unwrap_or_default()
}

/// Value of an argument the caller declared on the base command.
///
/// The typed parsers tried are `i64`, `f64`, `bool` and `String`; other
/// parsers fall back to the raw text. A single value becomes a scalar,
/// several become a list.
pub(crate) fn declared_value(matches: &ArgMatches, id: &str) -> Option<Value> {
    typed::<i64>(matches, id)
        .or_else(|| typed::<f64>(matches, id))
        .or_else(|| typed::<bool>(matches, id))
        .or_else(|| typed::<String>(matches, id))
        .or_else(|| raw(matches, id))
}

fn typed<T>(matches: &ArgMatches, id: &str) -> Option<Value>
where
    T: Clone + Send + Sync + 'static + Into<Value>,
{
    let values = matches.try_get_many::<T>(id).ok().flatten()?;
    collapse(values.cloned().map(Into::into).collect())
}

fn raw(matches: &ArgMatches, id: &str) -> Option<Value> {
    let values = matches.try_get_raw(id).ok().flatten()?;
    collapse(values.map(|v| Value::String(v.to_string_lossy().into_owned())).collect())
}

fn collapse(mut values: Vec<Value>) -> Option<Value> {
    match values.len() {
        0 => None,
        1 => values.pop(),
        _ => Some(Value::List(values.iter().map(Value::to_yaml).collect())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Command;

    fn list(items: &[Yaml]) -> Value {
        Value::List(items.to_vec())
    }

    #[test]
    fn kinds_follow_current_values() {
        assert_eq!(FlagSpec::infer("a", &Value::Integer(1), true).kind, FlagKind::Integer);
        assert_eq!(FlagSpec::infer("a", &Value::Float(1.5), true).kind, FlagKind::Float);
        assert_eq!(FlagSpec::infer("a", &Value::Bool(true), true).kind, FlagKind::Bool);
        assert_eq!(FlagSpec::infer("a", &Value::Null, true).kind, FlagKind::Text);

        let mixed = list(&[Value::Integer(1).to_yaml(), Value::from("x").to_yaml()]);
        let sizes = FlagSpec::infer("sizes", &mixed, true);
        assert_eq!((sizes.kind, sizes.multiple), (FlagKind::Integer, true));

        let raw = FlagSpec::infer("a", &Value::Integer(1), false);
        assert_eq!(raw.kind, FlagKind::Text);
    }

    #[test]
    fn help_mentions_default() {
        let arg = FlagSpec::infer("nested.name", &Value::from("inner"), true).to_arg();
        let help = arg.get_help().map(ToString::to_string).unwrap_or_default();
        assert_eq!(help, "Overwrite value for nested.name, default=inner");
    }

    #[test]
    fn supplied_values_are_typed() {
        let specs = [
            FlagSpec::infer("count", &Value::Integer(1), true),
            FlagSpec::infer("ratio", &Value::Float(0.5), true),
            FlagSpec::infer("flag", &Value::Bool(false), true),
            FlagSpec::infer("sizes", &list(&[Value::Integer(1).to_yaml()]), true),
            FlagSpec::infer("name", &Value::from("x"), true),
        ];
        let cmd = specs.iter().fold(Command::new("t"), |cmd, s| cmd.arg(s.to_arg()));
        let matches = cmd
            .try_get_matches_from([
                "t", "--count", "-3", "--ratio", "2.5", "--flag", "yes", "--sizes", "4", "5",
            ])
            .expect("parse");

        assert_eq!(specs[0].supplied(&matches), Some(Value::Integer(-3)));
        assert_eq!(specs[1].supplied(&matches), Some(Value::Float(2.5)));
        assert_eq!(specs[2].supplied(&matches), Some(Value::Bool(true)));
        let sizes = list(&[Value::Integer(4).to_yaml(), Value::Integer(5).to_yaml()]);
        assert_eq!(specs[3].supplied(&matches), Some(sizes));
        assert_eq!(specs[4].supplied(&matches), None);
    }

    #[test]
    fn declared_arguments_keep_their_type() {
        let cmd = Command::new("t")
            .arg(Arg::new("haircolor").long("haircolor").default_value("brown"))
            .arg(Arg::new("dob.year").long("dob.year").value_parser(value_parser!(i64)))
            .arg(Arg::new("port").long("port").value_parser(value_parser!(u16)));
        let matches =
            cmd.try_get_matches_from(["t", "--dob.year", "1999", "--port", "80"]).expect("parse");

        assert_eq!(declared_value(&matches, "haircolor"), Some(Value::from("brown")));
        assert_eq!(declared_value(&matches, "dob.year"), Some(Value::Integer(1999)));
        assert_eq!(declared_value(&matches, "port"), Some(Value::from("80")));
    }
}
