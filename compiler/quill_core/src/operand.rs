//! Resolved arguments handed to run-time resolvers.

use crate::environment::Slot;
use crate::instruction::Payload;
use crate::value::Value;

/// The text/value/slot triple produced by resolving one raw argument.
///
/// Built fresh on every resolution; never cached.
#[derive(Clone, Debug)]
pub struct Operand {
    /// Decoded literal text, or the last path segment for a resolved name
    /// (re-prefixed with the spread marker when present).
    pub text: String,
    pub value: Value,
    /// The slot the value was read from; `None` for literals.
    pub slot: Option<Slot>,
}

impl Operand {
    pub fn literal(text: impl Into<String>, value: Value) -> Self {
        Operand {
            text: text.into(),
            value,
            slot: None,
        }
    }

    pub fn bound(text: impl Into<String>, slot: Slot) -> Self {
        Operand {
            text: text.into(),
            value: slot.get(),
            slot: Some(slot),
        }
    }

    pub fn is_literal(&self) -> bool {
        self.slot.is_none()
    }
}

/// One resolved instruction argument.
#[derive(Clone, Debug)]
pub enum Argument {
    Operand(Operand),
    /// A parse-time payload, passed through unchanged.
    Payload(Payload),
}

impl Argument {
    /// Text form: operand text or an explicit value's name.
    pub fn text(&self) -> Option<String> {
        match self {
            Argument::Operand(operand) => Some(operand.text.clone()),
            Argument::Payload(Payload::Explicit(explicit)) => Some(explicit.text()),
            Argument::Payload(Payload::Value(value)) => Some(value.to_string()),
            Argument::Payload(_) => None,
        }
    }

    /// Interpreted value: operand value or the wrapped value of a payload.
    pub fn value(&self) -> Option<Value> {
        match self {
            Argument::Operand(operand) => Some(operand.value.clone()),
            Argument::Payload(Payload::Explicit(explicit)) => Some(explicit.value.clone()),
            Argument::Payload(Payload::Value(value)) => Some(value.clone()),
            Argument::Payload(_) => None,
        }
    }

    pub fn operand(&self) -> Option<&Operand> {
        match self {
            Argument::Operand(operand) => Some(operand),
            Argument::Payload(_) => None,
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Argument::Operand(_) => None,
            Argument::Payload(payload) => Some(payload),
        }
    }
}
