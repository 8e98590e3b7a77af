use std::collections::BTreeMap;

use contrail_protocol::Value;

/// The normalized calling convention handed to a table operation.
///
/// The dispatcher collapses a command's argument lists into one of four
/// shapes, reproducing the wire-compatible convention of the protocol:
/// no arguments at all invoke the bare form; exactly one positional
/// argument is passed as that single value; two or more positionals are
/// collapsed into a single list value; keyword arguments ride alongside
/// as a mapping when present.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Nullary,
    Positional(Value),
    Keyword(BTreeMap<String, Value>),
    Mixed(Value, BTreeMap<String, Value>),
}

impl Invocation {
    pub fn from_parts(args: Vec<Value>, kwargs: BTreeMap<String, Value>) -> Self {
        let positional = collapse(args);
        match (positional, kwargs.is_empty()) {
            (None, true) => Invocation::Nullary,
            (Some(value), true) => Invocation::Positional(value),
            (None, false) => Invocation::Keyword(kwargs),
            (Some(value), false) => Invocation::Mixed(value, kwargs),
        }
    }

    /// The collapsed positional value, if any.
    pub fn positional(&self) -> Option<&Value> {
        match self {
            Invocation::Positional(value) | Invocation::Mixed(value, _) => Some(value),
            _ => None,
        }
    }

    /// The keyword mapping, if any.
    pub fn keywords(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Invocation::Keyword(kwargs) | Invocation::Mixed(_, kwargs) => Some(kwargs),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Invocation::Nullary => "nullary",
            Invocation::Positional(_) => "positional",
            Invocation::Keyword(_) => "keyword",
            Invocation::Mixed(..) => "mixed",
        }
    }
}

fn collapse(mut args: Vec<Value>) -> Option<Value> {
    match args.len() {
        0 => None,
        1 => args.pop(),
        _ => Some(Value::List(args)),
    }
}
