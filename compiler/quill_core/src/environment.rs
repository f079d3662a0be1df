//! Hierarchical scopes.
//!
//! An [`Environment`] maps names to [`Slot`]s and optionally points at a
//! parent. Lookup walks the parent chain; assignment and deletion are always
//! local. A slot is created on first assignment and mutated in place on
//! every later one, so everything that resolved it observes the new value.
//!
//! Ownership only ever points downwards: a scope owns its slots and the
//! values in them, but neither its parent link nor a binding of the scope to
//! itself keeps anything alive. A scope is freed as soon as the last frame,
//! value or handle referring to it is dropped.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::errors::{ErrorKind, InterpretError};
use crate::value::Value;

/// A single scope: global, block, call, class or object instance.
#[derive(Default)]
pub struct Environment {
    slots: FxHashMap<String, Slot>,
    parent: Option<WeakEnv>,
    is_object: bool,
}

/// Shared handle to an [`Environment`].
///
/// Cloning the handle aliases the scope. The parent link is non-owning: a
/// scope whose parent was dropped resolves as if it were a root.
#[repr(transparent)]
#[derive(Clone, Default)]
pub struct EnvRef(Rc<RefCell<Environment>>);

/// Non-owning handle to an [`Environment`].
#[derive(Clone, Default)]
pub struct WeakEnv(Weak<RefCell<Environment>>);

impl WeakEnv {
    /// The scope, if it is still alive.
    pub fn upgrade(&self) -> Option<EnvRef> {
        self.0.upgrade().map(EnvRef)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for WeakEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakEnv").field(&self.is_alive()).finish()
    }
}

impl EnvRef {
    /// Create a scope with an optional parent.
    pub fn new(parent: Option<EnvRef>) -> Self {
        EnvRef(Rc::new(RefCell::new(Environment {
            slots: FxHashMap::default(),
            parent: parent.as_ref().map(EnvRef::downgrade),
            is_object: false,
        })))
    }

    /// Create a root scope.
    pub fn root() -> Self {
        Self::new(None)
    }

    /// Create an object-instance scope.
    pub fn object(parent: Option<EnvRef>) -> Self {
        let env = Self::new(parent);
        env.0.borrow_mut().is_object = true;
        env
    }

    /// Create a child scope of this one.
    #[must_use]
    pub fn child(&self) -> Self {
        Self::new(Some(self.clone()))
    }

    /// The parent scope, if there is one and it is still alive.
    pub fn parent(&self) -> Option<EnvRef> {
        self.0.borrow().parent.as_ref().and_then(WeakEnv::upgrade)
    }

    /// Re-parent this scope. Callers must not introduce a cycle.
    pub fn set_parent(&self, parent: Option<&EnvRef>) {
        self.0.borrow_mut().parent = parent.map(EnvRef::downgrade);
    }

    /// A non-owning handle to this scope.
    pub fn downgrade(&self) -> WeakEnv {
        WeakEnv(Rc::downgrade(&self.0))
    }

    pub fn is_object(&self) -> bool {
        self.0.borrow().is_object
    }

    /// Look `name` up locally, then along the parent chain.
    pub fn resolve(&self, name: &str) -> Option<Slot> {
        let mut current = self.clone();
        loop {
            let parent = {
                let env = current.0.borrow();
                if let Some(slot) = env.slots.get(name) {
                    return Some(slot.clone());
                }
                env.parent.as_ref().and_then(WeakEnv::upgrade)
            };
            current = parent?;
        }
    }

    /// Value of the nearest binding of `name`.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.resolve(name).map(|slot| slot.get())
    }

    /// Value of the nearest binding of `name`, or `default` when unbound.
    pub fn resolve_or(&self, name: &str, default: Value) -> Value {
        self.get(name).unwrap_or(default)
    }

    /// The local slot for `name`, ignoring parents.
    pub fn local(&self, name: &str) -> Option<Slot> {
        self.0.borrow().slots.get(name).cloned()
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.0.borrow().slots.contains_key(name)
    }

    /// Bind `name` locally. An existing local slot is updated in place.
    ///
    /// Binding a scope to a name inside itself (`this`) does not keep the
    /// scope alive.
    pub fn set(&self, name: &str, value: Value) -> Slot {
        let stored = match value {
            Value::Env(env) if env.ptr_eq(self) => Stored::Weak(env.downgrade()),
            value => Stored::Value(value),
        };
        self.store(name, stored)
    }

    /// Bind `name` locally to a non-owning reference to `env`.
    ///
    /// The binding reads as `env` while it is alive and as none afterwards.
    pub fn set_weak(&self, name: &str, env: &EnvRef) -> Slot {
        self.store(name, Stored::Weak(env.downgrade()))
    }

    fn store(&self, name: &str, stored: Stored) -> Slot {
        if let Some(slot) = self.local(name) {
            slot.0.value.replace(stored);
            return slot;
        }
        let slot = Slot(Rc::new(SlotData {
            name: name.to_string(),
            owner: Rc::downgrade(&self.0),
            value: RefCell::new(stored),
        }));
        self.0
            .borrow_mut()
            .slots
            .insert(name.to_string(), slot.clone());
        slot
    }

    /// Remove the local binding of `name`.
    pub fn delete(&self, name: &str) -> Result<Slot, InterpretError> {
        self.0
            .borrow_mut()
            .slots
            .remove(name)
            .ok_or_else(|| ErrorKind::MissingLocal { name: name.to_string() }.into())
    }

    /// Local names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.borrow().slots.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Local slots, sorted by name.
    pub fn slots(&self) -> Vec<Slot> {
        let mut slots: Vec<Slot> = self.0.borrow().slots.values().cloned().collect();
        slots.sort_unstable_by(|a, b| a.name().cmp(b.name()));
        slots
    }

    /// Copy the current values of `other`'s local bindings into fresh local
    /// slots of this scope (overwriting same-named bindings).
    ///
    /// Non-owning bindings stay non-owning.
    pub fn absorb(&self, other: &EnvRef) {
        if self.ptr_eq(other) {
            return;
        }
        for slot in other.slots() {
            let stored = slot.0.value.borrow().clone();
            match stored {
                Stored::Value(value) => self.set(slot.name(), value),
                weak @ Stored::Weak(_) => self.store(slot.name(), weak),
            };
        }
    }

    /// Number of local bindings.
    pub fn len(&self) -> usize {
        self.0.borrow().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().slots.is_empty()
    }

    pub fn ptr_eq(&self, other: &EnvRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EnvRef {
    // Names only: values may refer back to this scope.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvRef")
            .field("names", &self.names())
            .field("is_object", &self.is_object())
            .field("has_parent", &self.parent().is_some())
            .finish()
    }
}

/// What a slot holds: an owned value or a non-owning scope reference.
#[derive(Clone)]
enum Stored {
    Value(Value),
    Weak(WeakEnv),
}

struct SlotData {
    name: String,
    owner: Weak<RefCell<Environment>>,
    value: RefCell<Stored>,
}

impl SlotData {
    /// Whether `value` is the scope owning this slot.
    fn is_owner(&self, value: &Value) -> bool {
        matches!(value, Value::Env(env) if std::ptr::eq(self.owner.as_ptr(), Rc::as_ptr(&env.0)))
    }

    fn stored(&self, value: Value) -> Stored {
        if self.is_owner(&value) {
            Stored::Weak(WeakEnv(self.owner.clone()))
        } else {
            Stored::Value(value)
        }
    }
}

/// A named, mutable, identity-stable binding.
#[derive(Clone)]
pub struct Slot(Rc<SlotData>);

impl Slot {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Current value.
    pub fn get(&self) -> Value {
        match &*self.0.value.borrow() {
            Stored::Value(value) => value.clone(),
            Stored::Weak(env) => env.upgrade().map_or(Value::None, Value::Env),
        }
    }

    /// Store a new value, returning the previous one.
    pub fn replace(&self, value: Value) -> Value {
        let previous = self.get();
        let stored = self.0.stored(value);
        self.0.value.replace(stored);
        previous
    }

    /// Whether the slot holds a non-owning scope reference.
    pub fn is_weak(&self) -> bool {
        matches!(&*self.0.value.borrow(), Stored::Weak(_))
    }

    /// The scope that owns this slot, if it is still alive.
    pub fn owner(&self) -> Option<EnvRef> {
        self.0.owner.upgrade().map(EnvRef)
    }

    pub fn ptr_eq(&self, other: &Slot) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("name", &self.0.name)
            .field("value", &self.get())
            .finish()
    }
}
