//! `InterpreterBuilder` for assembling an interpreter from its tables and hooks.

use std::rc::Rc;

use super::{CallStack, EnvironmentLoader, Interpreter, DEFAULT_MAX_DEPTH};
use crate::environment::EnvRef;
use crate::errors::InterpretResult;
use crate::lexical::LexicalConfig;
use crate::parser::{Parser, TokenizeObserver};
use crate::registry::{ParseTable, RunTable};

/// Builder for [`Interpreter`].
///
/// Usually obtained from [`SyntaxSet::builder`](crate::SyntaxSet::builder).
pub struct InterpreterBuilder {
    parse: ParseTable,
    run: RunTable,
    config: LexicalConfig,
    loader: Option<EnvironmentLoader>,
    observer: Option<TokenizeObserver>,
    max_depth: Option<usize>,
}

impl InterpreterBuilder {
    pub fn new(parse: ParseTable, run: RunTable) -> Self {
        InterpreterBuilder {
            parse,
            run,
            config: LexicalConfig::default(),
            loader: None,
            observer: None,
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }

    /// Set the lexical configuration.
    #[must_use]
    pub fn config(mut self, config: LexicalConfig) -> Self {
        self.config = config;
        self
    }

    /// Hook run once per new frame, before its first instruction.
    #[must_use]
    pub fn environment_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn(&EnvRef, Option<&str>) -> InterpretResult + 'static,
    {
        self.loader = Some(Rc::new(loader));
        self
    }

    /// Hook invoked with `(line, statement)` before each statement is tokenized.
    #[must_use]
    pub fn on_tokenize<F>(mut self, observer: F) -> Self
    where
        F: Fn(usize, &str) + 'static,
    {
        self.observer = Some(Rc::new(observer));
        self
    }

    /// Limit the call-stack depth. `None` removes the limit.
    #[must_use]
    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn build(self) -> Interpreter {
        Interpreter {
            parser: Parser::new(self.config.clone(), self.parse).with_observer(self.observer),
            config: self.config,
            runtime: self.run,
            loader: self.loader,
            call_stack: CallStack::new(self.max_depth),
            halted: false,
        }
    }
}
