//! Quill Core - Lexer, resolver pipeline and scope model for line-oriented
//! instruction languages.
//!
//! The core knows no keywords. A host language is assembled by registering
//! [`Syntax`] bindings: parse-time resolvers rewrite the instruction stream
//! (typically capturing nested blocks with [`capture_block`]), run-time
//! resolvers perform the effect of one instruction against the current
//! [`Frame`].
//!
//! # Architecture
//!
//! - `LexicalConfig`: terminator, delimiter, quote markers, comment marker,
//!   navigation separator, spread marker and the literal caster
//! - `Parser`: statement splitting, quote-aware tokenization, parse-time
//!   transform
//! - `Interpreter`: call stack, dotted-path argument resolution, dispatch loop
//!   and error wrapping
//! - `EnvRef` / `Slot`: hierarchical scopes with identity-stable bindings
//! - `SyntaxSet`: composes bindings into the parse and run tables
//!
//! # Example
//!
//! ```
//! use quill_core::{Syntax, SyntaxSet, Value};
//!
//! let syntax = SyntaxSet::new().with(Syntax::new("put").on_run(|_, frame, args| {
//!     if let (Some(name), Some(value)) = (args[0].text(), args[1].value()) {
//!         frame.env().set(&name, value);
//!     }
//!     Ok(())
//! }));
//! let mut interpreter = syntax.builder().build();
//! let frame = interpreter.execute("put, answer, 42;").unwrap();
//! assert_eq!(frame.env().get("answer"), Some(Value::Int(42)));
//! ```

mod block;
mod environment;
pub mod errors;
mod instruction;
pub mod interpreter;
mod lexical;
mod operand;
pub mod parser;
mod registry;
mod stack;
mod value;

pub use block::{capture_block, replace_block, take_block, Capture};
pub use environment::{EnvRef, Environment, Slot, WeakEnv};
pub use errors::{ErrorKind, InterpretError, InterpretResult, Location, ParseError, ParseErrorKind};
pub use instruction::{Arg, Body, Explicit, Instruction, Payload};
pub use interpreter::{
    CallStack, EnvironmentLoader, Frame, FrameKind, Interpreter, InterpreterBuilder,
};
pub use lexical::{default_cast, Caster, LexicalConfig};
pub use operand::{Argument, Operand};
pub use parser::{ParseResolver, Parser, TokenizeObserver};
pub use registry::{internal_name, ParseTable, RunResolver, RunTable, Syntax, SyntaxSet};
pub use stack::ensure_sufficient_stack;
pub use value::{Function, HostData, HostValue, ListRef, Value};
