//! Parsed instructions and their raw arguments.

use std::rc::Rc;

use crate::value::Value;

/// A transformed nested instruction list (a block body).
pub type Body = Rc<[Instruction]>;

/// One parsed command.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    /// Lower-cased head word (or an internal key for synthesized instructions).
    pub token: String,
    pub args: Vec<Arg>,
    /// 1-based source line.
    pub line: usize,
}

impl Instruction {
    pub fn new(token: impl Into<String>, args: Vec<Arg>, line: usize) -> Self {
        Instruction {
            token: token.into(),
            args,
            line,
        }
    }
}

/// A raw instruction argument.
///
/// Text comes from the tokenizer and is resolved against the current scope at
/// run time. Payloads are produced by parse-time resolvers and handed to the
/// run-time resolver untouched.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    Text(String),
    Payload(Payload),
}

impl Arg {
    pub fn text(text: impl Into<String>) -> Self {
        Arg::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Arg::Text(text) => Some(text),
            Arg::Payload(_) => None,
        }
    }
}

impl From<&str> for Arg {
    fn from(text: &str) -> Self {
        Arg::Text(text.to_string())
    }
}

impl From<Payload> for Arg {
    fn from(payload: Payload) -> Self {
        Arg::Payload(payload)
    }
}

/// An already-resolved argument carried by a synthesized instruction.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// A nested, already transformed instruction list.
    Body(Body),
    /// Raw arguments kept for deferred resolution (e.g. a loop condition).
    Group(Vec<Arg>),
    Explicit(Explicit),
    Value(Value),
}

/// A value that must be taken as-is rather than re-read as a dotted path.
#[derive(Clone, Debug, PartialEq)]
pub struct Explicit {
    /// Display name used as the argument's text.
    pub name: Option<String>,
    pub value: Value,
}

impl Explicit {
    pub fn new(value: Value) -> Self {
        Explicit { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: Value) -> Self {
        Explicit {
            name: Some(name.into()),
            value,
        }
    }

    /// The name if present, otherwise the value's display form.
    pub fn text(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.value.to_string(),
        }
    }
}
