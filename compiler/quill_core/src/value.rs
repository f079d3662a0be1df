//! Runtime values.
//!
//! Scalars are stored inline. Lists, environments, functions and host values
//! are shared handles: cloning a `Value` aliases them, it never copies.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::environment::{EnvRef, WeakEnv};
use crate::instruction::Body;

/// A runtime value stored in a slot or carried by an operand.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(ListRef),
    Env(EnvRef),
    Function(Rc<Function>),
    Host(HostValue),
}

impl Value {
    /// Create a string value.
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    /// Create a list value from owned items.
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(ListRef::new(items))
    }

    /// Short name of the value's kind, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Env(env) if env.is_object() => "object",
            Value::Env(_) => "environment",
            Value::Function(_) => "function",
            Value::Host(host) => host.label(),
        }
    }

    pub fn as_env(&self) -> Option<&EnvRef> {
        match self {
            Value::Env(env) => Some(env),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<Function>> {
        match self {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value. Text is parsed; booleans count as 0/1.
    #[expect(clippy::cast_precision_loss, reason = "integers are widened to floats for comparison")]
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(f64::from(u8::from(*b))),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Truthiness: none, false, zero, empty text and empty lists are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(list) => !list.borrow().is_empty(),
            Value::Env(_) | Value::Function(_) | Value::Host(_) => true,
        }
    }

    /// Identity comparison: shared handles must point at the same allocation,
    /// scalars compare by value.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Env(a), Value::Env(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Host(a), Value::Host(b)) => a.ptr_eq(b),
            _ => self == other,
        }
    }
}

impl PartialEq for Value {
    #[expect(clippy::cast_precision_loss, reason = "mixed int/float equality compares as floats")]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.ptr_eq(b) || *a.borrow() == *b.borrow(),
            (Value::Env(a), Value::Env(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Host(a), Value::Host(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(list) => write_list(f, list, &mut Vec::new()),
            Value::Env(env) if env.is_object() => write!(f, "<object>"),
            Value::Env(_) => write!(f, "<environment>"),
            Value::Function(function) => write!(f, "<function {}>", function.name),
            Value::Host(host) => write!(f, "{host}"),
        }
    }
}

/// Write `list`, eliding any list that is already being written further up.
fn write_list(f: &mut fmt::Formatter<'_>, list: &ListRef, open: &mut Vec<*const RefCell<Vec<Value>>>) -> fmt::Result {
    let ptr = Rc::as_ptr(&list.0);
    if open.contains(&ptr) {
        return write!(f, "[...]");
    }
    open.push(ptr);
    write!(f, "[")?;
    for (i, item) in list.borrow().iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        match item {
            Value::List(nested) => write_list(f, nested, open)?,
            other => write!(f, "{other}")?,
        }
    }
    open.pop();
    write!(f, "]")
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x:?})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(list) => write!(f, "List(len={})", list.borrow().len()),
            Value::Env(env) => write!(f, "Env({env:?})"),
            Value::Function(function) => write!(f, "Function({function:?})"),
            Value::Host(host) => write!(f, "Host({})", host.label()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<EnvRef> for Value {
    fn from(env: EnvRef) -> Self {
        Value::Env(env)
    }
}

/// Shared, mutable list.
#[derive(Clone, Default)]
pub struct ListRef(Rc<RefCell<Vec<Value>>>);

impl ListRef {
    pub fn new(items: Vec<Value>) -> Self {
        ListRef(Rc::new(RefCell::new(items)))
    }

    pub fn borrow(&self) -> Ref<'_, Vec<Value>> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Vec<Value>> {
        self.0.borrow_mut()
    }

    /// Snapshot of the current items.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &ListRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A callable defined by a language package.
///
/// The core never calls functions itself; it only stores them so extension
/// resolvers can share them through slots.
pub struct Function {
    pub name: String,
    /// Parameter names; the last may carry the spread marker.
    pub params: Vec<String>,
    pub body: Body,
    /// Environment the function was defined in, used as the parent of each
    /// call scope. Non-owning: a function stored in its own scope must not
    /// keep that scope alive.
    pub owner: Option<WeakEnv>,
    /// Source identifier the body came from.
    pub source: Rc<str>,
}

impl Function {
    /// Copy of this function owned by `owner` (method binding).
    #[must_use]
    pub fn bound_to(&self, owner: &EnvRef) -> Function {
        Function {
            name: self.name.clone(),
            params: self.params.clone(),
            body: Rc::clone(&self.body),
            owner: Some(owner.downgrade()),
            source: Rc::clone(&self.source),
        }
    }

    /// The owning environment, if the function has one and it is still alive.
    pub fn owner(&self) -> Option<EnvRef> {
        self.owner.as_ref().and_then(WeakEnv::upgrade)
    }

    /// Line of the first body instruction, or 0 for an empty body.
    pub fn first_line(&self) -> usize {
        self.body.first().map_or(0, |instruction| instruction.line)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("body_len", &self.body.len())
            .finish_non_exhaustive()
    }
}

/// Payload of a [`HostValue`]: any displayable type.
pub trait HostData: Any + fmt::Display {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Display> HostData for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Opaque value owned by an extension, labelled for diagnostics.
#[derive(Clone)]
pub struct HostValue {
    label: &'static str,
    inner: Rc<dyn HostData>,
}

impl HostValue {
    pub fn new<T: HostData>(label: &'static str, value: T) -> Self {
        HostValue {
            label,
            inner: Rc::new(value),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        // Deref first: `Rc<dyn HostData>` is itself `HostData`.
        (*self.inner).as_any().downcast_ref()
    }

    pub fn ptr_eq(&self, other: &HostValue) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.inner), Rc::as_ptr(&other.inner))
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}
