//! Type casts applied by `set, name, <type>, value`.
//!
//! A [`CastTable`] maps type names to conversions. The standard table knows
//! `int`, `float`, `str`, `bool` and `error`; hosts add or remove entries at
//! any time, including while a program runs. `list` and `obj` are not casts
//! and cannot be overridden: `list` collects every remaining value and `obj`
//! keeps the value, which is how parameters are bound. Type names missing
//! from the table also keep the value as it is.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use quill_core::Value;
use rustc_hash::FxHashMap;

use crate::objects::ErrorValue;

/// Converts a value to a type, or `None` when the value has no such form.
pub type TypeCast = Rc<dyn Fn(&Value) -> Option<Value>>;

/// Registered type casts, shared by every `set` of an interpreter.
#[derive(Default)]
pub struct CastTable {
    casts: RefCell<FxHashMap<String, TypeCast>>,
}

impl CastTable {
    /// A table without any casts.
    pub fn new() -> Self {
        Self::default()
    }

    /// The casts of the standard language.
    pub fn standard() -> Self {
        let table = Self::new();
        table.add("int", to_int);
        table.add("float", |value| value.to_f64().map(Value::Float));
        table.add("str", |value| Some(Value::str(value.to_string())));
        table.add("bool", |value| Some(Value::Bool(value.is_truthy())));
        table.add("error", |value| Some(ErrorValue::new(value.to_string()).into_value()));
        table
    }

    /// Register `cast` for `kind`, replacing any previous cast.
    pub fn add<F>(&self, kind: impl Into<String>, cast: F)
    where
        F: Fn(&Value) -> Option<Value> + 'static,
    {
        self.casts.borrow_mut().insert(kind.into(), Rc::new(cast));
    }

    /// Remove the cast for `kind`; returns whether one was registered.
    pub fn remove(&self, kind: &str) -> bool {
        self.casts.borrow_mut().remove(kind).is_some()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.casts.borrow().contains_key(kind)
    }

    pub fn get(&self, kind: &str) -> Option<TypeCast> {
        self.casts.borrow().get(kind).cloned()
    }

    /// Apply the cast for `kind`. Unknown kinds keep the value.
    ///
    /// The table is not borrowed while the cast runs, so a cast may itself
    /// change the table.
    pub fn apply(&self, kind: &str, value: &Value) -> Option<Value> {
        match self.get(kind) {
            Some(cast) => cast(value),
            None => Some(value.clone()),
        }
    }
}

impl fmt::Debug for CastTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let casts = self.casts.borrow();
        let mut kinds: Vec<&str> = casts.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("CastTable").field("kinds", &kinds).finish()
    }
}

fn to_int(value: &Value) -> Option<Value> {
    match value {
        Value::Int(_) => Some(value.clone()),
        Value::Bool(b) => Some(Value::Int(i64::from(*b))),
        Value::Float(f) if f.is_finite() => Some(Value::Int(truncate(*f))),
        Value::Str(s) => s.trim().parse().ok().map(Value::Int),
        _ => None,
    }
}

#[expect(clippy::cast_possible_truncation, reason = "float to int truncates toward zero")]
fn truncate(f: f64) -> i64 {
    f.trunc() as i64
}
