//! Syntax bindings and the lookup tables built from them.
//!
//! A [`Syntax`] binds a token to an optional parse-time resolver and an
//! optional run-time resolver. A [`SyntaxSet`] composes bindings (later ones
//! replace earlier ones of the same name) and produces the two immutable
//! tables the parser and interpreter consume.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::errors::{InterpretResult, ParseErrorKind};
use crate::instruction::Instruction;
use crate::interpreter::{Frame, Interpreter, InterpreterBuilder};
use crate::operand::Argument;
use crate::parser::{ParseResolver, Parser};

/// Run-time resolver: performs the effect of one instruction.
pub type RunResolver = Rc<dyn Fn(&mut Interpreter, &Frame, Vec<Argument>) -> InterpretResult>;

/// The run-table key of an internal token.
///
/// Internal tokens are only reachable through synthesized instructions: the
/// wrapped form cannot be produced by the tokenizer as a head word a user
/// would type for the same construct.
pub fn internal_name(token: &str) -> String {
    format!("__{token}__")
}

/// Registration of one token's behavior.
#[derive(Clone)]
pub struct Syntax {
    name: String,
    internal: bool,
    parse: Option<ParseResolver>,
    run: Option<RunResolver>,
}

impl Syntax {
    pub fn new(name: impl Into<String>) -> Self {
        Syntax {
            name: name.into(),
            internal: false,
            parse: None,
            run: None,
        }
    }

    /// Register the run-time resolver under the internal-wrapped key.
    #[must_use]
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    #[must_use]
    pub fn on_parse<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&mut Parser, &mut Vec<Instruction>, usize) -> Result<usize, ParseErrorKind> + 'static,
    {
        self.parse = Some(Rc::new(resolver));
        self
    }

    #[must_use]
    pub fn on_run<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&mut Interpreter, &Frame, Vec<Argument>) -> InterpretResult + 'static,
    {
        self.run = Some(Rc::new(resolver));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    /// Key of this binding in the run table.
    pub fn run_key(&self) -> String {
        if self.internal {
            internal_name(&self.name)
        } else {
            self.name.clone()
        }
    }
}

impl fmt::Debug for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Syntax")
            .field("name", &self.name)
            .field("internal", &self.internal)
            .field("parse", &self.parse.is_some())
            .field("run", &self.run.is_some())
            .finish()
    }
}

/// An ordered, composable collection of bindings.
#[derive(Clone, Debug, Default)]
pub struct SyntaxSet {
    bindings: Vec<Syntax>,
    index: FxHashMap<String, usize>,
}

impl SyntaxSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`add`](Self::add).
    #[must_use]
    pub fn with(mut self, syntax: Syntax) -> Self {
        self.add(syntax);
        self
    }

    /// Add a binding, replacing any earlier binding of the same name in place.
    pub fn add(&mut self, syntax: Syntax) {
        if let Some(&position) = self.index.get(syntax.name()) {
            self.bindings[position] = syntax;
        } else {
            self.index.insert(syntax.name().to_string(), self.bindings.len());
            self.bindings.push(syntax);
        }
    }

    /// Add every binding of `other`, in order.
    pub fn extend(&mut self, other: SyntaxSet) {
        for syntax in other.bindings {
            self.add(syntax);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Syntax> {
        self.index.get(name).map(|&position| &self.bindings[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Syntax> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Token → parse-time resolver, for bindings that define one.
    pub fn parse_table(&self) -> ParseTable {
        let table = self
            .bindings
            .iter()
            .filter_map(|syntax| {
                let resolver = syntax.parse.clone()?;
                Some((syntax.name.clone(), resolver))
            })
            .collect();
        ParseTable(Rc::new(table))
    }

    /// Token (or internal-wrapped token) → run-time resolver.
    pub fn run_table(&self) -> RunTable {
        let table = self
            .bindings
            .iter()
            .filter_map(|syntax| {
                let resolver = syntax.run.clone()?;
                Some((syntax.run_key(), resolver))
            })
            .collect();
        RunTable(Rc::new(table))
    }

    /// Start building an interpreter for this language.
    pub fn builder(&self) -> InterpreterBuilder {
        InterpreterBuilder::new(self.parse_table(), self.run_table())
    }

    /// An interpreter for this language with default configuration and no hooks.
    pub fn interpreter(&self) -> Interpreter {
        self.builder().build()
    }
}

impl FromIterator<Syntax> for SyntaxSet {
    fn from_iter<I: IntoIterator<Item = Syntax>>(iter: I) -> Self {
        let mut set = SyntaxSet::new();
        for syntax in iter {
            set.add(syntax);
        }
        set
    }
}

/// Immutable token → parse-time resolver table.
#[derive(Clone, Default)]
pub struct ParseTable(Rc<FxHashMap<String, ParseResolver>>);

impl ParseTable {
    pub fn get(&self, token: &str) -> Option<ParseResolver> {
        self.0.get(token).cloned()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ParseTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.0.keys().collect();
        keys.sort_unstable();
        write!(f, "ParseTable({keys:?})")
    }
}

/// Immutable token → run-time resolver table.
#[derive(Clone, Default)]
pub struct RunTable(Rc<FxHashMap<String, RunResolver>>);

impl RunTable {
    pub fn get(&self, token: &str) -> Option<RunResolver> {
        self.0.get(token).cloned()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for RunTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.0.keys().collect();
        keys.sort_unstable();
        write!(f, "RunTable({keys:?})")
    }
}
