//! The execution engine.
//!
//! [`Interpreter::execute_in`] is the one dispatch loop every execution goes
//! through: it pushes a [`Frame`], seeds the environment through the loader
//! hook, then resolves and dispatches instructions until the cursor leaves
//! the list or a halt flag is raised. Blocks, function bodies and loaded files
//! are all nested calls into it.
//!
//! # Argument resolution
//!
//! Raw text arguments are resolved against the frame's environment on every
//! dispatch: a quoted literal is decoded and cast, anything else is walked as
//! a dotted path. A path with any unbound segment degrades to a literal of the
//! whole text; a path that tries to step through a non-environment value is a
//! navigation error.
//!
//! # Errors
//!
//! Each dispatch site appends its frame's location to a failing
//! [`InterpretError`], so an error crossing nested executions carries one
//! location per level.

mod builder;
mod frame;
mod frame_guard;

use std::rc::Rc;

use crate::environment::EnvRef;
use crate::errors::{ErrorKind, InterpretError, InterpretResult, ParseError};
use crate::instruction::{Arg, Instruction};
use crate::lexical::LexicalConfig;
use crate::operand::{Argument, Operand};
use crate::parser::Parser;
use crate::registry::RunTable;
use crate::stack::ensure_sufficient_stack;

pub use builder::InterpreterBuilder;
pub use frame::{CallStack, Frame, FrameKind};

/// Hook seeding a fresh frame's environment: `(environment, source identifier)`.
pub type EnvironmentLoader = Rc<dyn Fn(&EnvRef, Option<&str>) -> InterpretResult>;

/// Default call-stack depth limit.
pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// Source identifier used by [`Interpreter::execute`].
pub const MAIN_SOURCE: &str = "<main>";

/// The execution engine: run table, parser, call stack and halt flag.
pub struct Interpreter {
    config: LexicalConfig,
    parser: Parser,
    runtime: RunTable,
    loader: Option<EnvironmentLoader>,
    call_stack: CallStack,
    halted: bool,
}

impl Interpreter {
    pub fn config(&self) -> &LexicalConfig {
        &self.config
    }

    /// Parse `code` with this interpreter's parse table.
    pub fn parse(&mut self, code: &str) -> Result<Vec<Instruction>, ParseError> {
        self.parser.parse(code)
    }

    /// Parse and run `code` as a program in a fresh root environment.
    pub fn execute(&mut self, code: &str) -> InterpretResult<Rc<Frame>> {
        self.execute_source(code, MAIN_SOURCE)
    }

    /// Parse and run `code` in a fresh root environment, attributing it to `source`.
    ///
    /// A top-level call clears an earlier interpreter-wide halt.
    pub fn execute_source(&mut self, code: &str, source: &str) -> InterpretResult<Rc<Frame>> {
        if self.call_stack.is_empty() {
            self.halted = false;
        }
        let instructions = self.parse(code)?;
        self.execute_in(&instructions, EnvRef::root(), Rc::from(source), FrameKind::Program)
    }

    /// Run `instructions` in a fresh child environment of `parent`.
    ///
    /// The source identifier is inherited from the current frame.
    pub fn execute_instructions(
        &mut self,
        instructions: &[Instruction],
        parent: &EnvRef,
    ) -> InterpretResult<Rc<Frame>> {
        let source = self.current_source();
        self.execute_in(instructions, parent.child(), source, FrameKind::Block)
    }

    /// Run a block body in a new frame sharing `frame`'s environment.
    pub fn run_block(&mut self, instructions: &[Instruction], frame: &Frame) -> InterpretResult<Rc<Frame>> {
        self.execute_in(
            instructions,
            frame.env().clone(),
            Rc::clone(frame.source()),
            FrameKind::Block,
        )
    }

    /// Run a block body; on failure, hand the error to `handler` instead of propagating.
    ///
    /// This is the engine's only recovery point. The failed block's frames
    /// are already popped when `handler` runs.
    pub fn execute_guarded<H>(&mut self, instructions: &[Instruction], frame: &Frame, handler: H) -> InterpretResult
    where
        H: FnOnce(&mut Interpreter, InterpretError) -> InterpretResult,
    {
        match self.run_block(instructions, frame) {
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::debug!(error = %err, "guarded block failed");
                handler(self, err)
            }
        }
    }

    /// Execute `instructions` in a new frame wrapping `env`.
    ///
    /// Returns the terminated frame. The frame is popped on every exit path.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(source = %source, kind = ?kind, len = instructions.len())
    )]
    pub fn execute_in(
        &mut self,
        instructions: &[Instruction],
        env: EnvRef,
        source: Rc<str>,
        kind: FrameKind,
    ) -> InterpretResult<Rc<Frame>> {
        let frame = Rc::new(Frame::new(env, source, kind));
        ensure_sufficient_stack(|| {
            let mut scoped = self.enter(Rc::clone(&frame))?;
            scoped.seed(&frame)?;
            scoped.dispatch(instructions, &frame)
        })?;
        Ok(frame)
    }

    /// Run the loader hook over a new frame's environment.
    fn seed(&self, frame: &Frame) -> InterpretResult {
        self.load_environment(frame.env(), Some(frame.source().as_ref()))
            .map_err(|err| {
                InterpretError::new(ErrorKind::Setup {
                    message: err.to_string(),
                })
            })
    }

    fn dispatch(&mut self, instructions: &[Instruction], frame: &Frame) -> InterpretResult {
        let mut cursor: isize = 0;
        while let Some(instruction) = usize::try_from(cursor).ok().and_then(|i| instructions.get(i)) {
            if frame.is_halted() || self.halted {
                break;
            }
            frame.set_line(instruction.line);
            tracing::trace!(line = instruction.line, token = %instruction.token, "dispatch");

            self.step(instruction, frame).map_err(|err| match err.kind() {
                ErrorKind::Setup { .. } => err,
                _ => err.located(frame.location()),
            })?;
            // A jump past the representable range ends the frame like any
            // other jump out of the list.
            let Some(next) = cursor.checked_add(frame.take_jump()) else {
                break;
            };
            cursor = next;
        }
        Ok(())
    }

    fn step(&mut self, instruction: &Instruction, frame: &Frame) -> InterpretResult {
        let Some(resolver) = self.runtime.get(&instruction.token) else {
            return Err(InterpretError::new(ErrorKind::UnknownToken {
                token: instruction.token.clone(),
            }));
        };
        let args = instruction
            .args
            .iter()
            .map(|arg| self.resolve_in(frame.env(), frame.source(), arg))
            .collect::<InterpretResult<Vec<_>>>()?;
        resolver(self, frame, args)
    }

    /// Resolve a raw argument against `env`, attributing navigation errors to
    /// the current frame's source.
    pub fn resolve_argument(&self, env: &EnvRef, arg: &Arg) -> InterpretResult<Argument> {
        self.resolve_in(env, &self.current_source(), arg)
    }

    /// Resolve a raw argument against `env`.
    pub fn resolve_in(&self, env: &EnvRef, source: &str, arg: &Arg) -> InterpretResult<Argument> {
        let text = match arg {
            Arg::Payload(payload) => return Ok(Argument::Payload(payload.clone())),
            Arg::Text(text) => text,
        };
        if self.config.is_string(text) {
            return Ok(Argument::Operand(self.literal(text)));
        }

        let parts = self.config.parts(text);
        let spread = self.config.spread.as_str();
        let mut current = env.clone();
        // A spread marker on any segment marks the whole path.
        let mut spread_prefix = false;
        for (index, part) in parts.iter().enumerate() {
            let name = match part.strip_prefix(spread) {
                Some(name) if !spread.is_empty() => {
                    spread_prefix = true;
                    name
                }
                _ => *part,
            };
            let Some(slot) = current.resolve(name) else {
                return Ok(Argument::Operand(self.literal(text)));
            };

            let Some(next) = parts.get(index + 1) else {
                let text = if spread_prefix {
                    format!("{spread}{name}")
                } else {
                    name.to_string()
                };
                return Ok(Argument::Operand(Operand::bound(text, slot)));
            };
            let value = slot.get();
            let Some(env) = value.as_env() else {
                return Err(InterpretError::new(ErrorKind::Navigation {
                    segment: (*next).to_string(),
                    through: name.to_string(),
                    source_id: source.to_string(),
                }));
            };
            current = env.clone();
        }

        // An empty path has no segments to bind.
        Ok(Argument::Operand(self.literal(text)))
    }

    fn literal(&self, text: &str) -> Operand {
        let decoded = self.config.extract_str(text);
        Operand::literal(decoded, self.config.cast(decoded))
    }

    /// Run the environment loader hook, if any, over `env`.
    pub fn load_environment(&self, env: &EnvRef, source: Option<&str>) -> InterpretResult {
        match &self.loader {
            Some(loader) => loader(env, source),
            None => Ok(()),
        }
    }

    /// Stop every frame before its next instruction.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    /// The innermost active frame.
    pub fn current_frame(&self) -> Option<Rc<Frame>> {
        self.call_stack.top().cloned()
    }

    /// Innermost active frame of the given kind.
    pub fn nearest_frame(&self, kind: FrameKind) -> Option<Rc<Frame>> {
        self.call_stack.nearest(kind).cloned()
    }

    /// The frame directly below `frame` on the call stack.
    pub fn caller_of(&self, frame: &Frame) -> Option<Rc<Frame>> {
        self.call_stack.caller_of(frame).cloned()
    }

    /// Halt every frame from the top of the stack down to and including `frame`.
    ///
    /// Does nothing if `frame` is not on the stack.
    pub fn unwind_to(&self, frame: &Frame) {
        let Some(position) = self.call_stack.position(frame) else {
            return;
        };
        for active in &self.call_stack.frames()[position..] {
            active.halt();
        }
    }

    fn current_source(&self) -> Rc<str> {
        self.call_stack
            .top()
            .map_or_else(|| Rc::from(MAIN_SOURCE), |frame| Rc::clone(frame.source()))
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
