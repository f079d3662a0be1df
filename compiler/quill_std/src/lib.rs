//! Quill Std - the standard instruction language.
//!
//! Built entirely on the public resolver surface of [`quill_core`]:
//!
//! | Token | Effect |
//! |---|---|
//! | `set`, `del` | bind (with an optional [`CastTable`] type) and remove names |
//! | `print`, `input` | console I/O through [`StdIo`] |
//! | `math` | arithmetic folds and the binary `left, op…, right` form |
//! | `if`, `while`, `try` … `end, <token>` | blocks over the condition mini-language |
//! | `raise`, `jump`, `stop` | control flow |
//! | `func` … `end, func`, `call`, `return` | functions |
//! | `class` … `end, class`, `init` | classes, inheritance and objects |
//! | `import` | load another file |
//!
//! ```
//! use quill_std::{standard_interpreter, StdIo};
//!
//! let io = StdIo::captured(Vec::<String>::new());
//! let mut interpreter = standard_interpreter(io.clone());
//! interpreter
//!     .execute("set, x, int, 2;\nmath, y, x, times, 21;\nprint, y;")
//!     .unwrap();
//! assert_eq!(io.output(), "42\n");
//! ```

mod args;
mod casts;
mod compare;
mod control;
mod io;
mod loader;
mod math;
mod objects;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::rc::Rc;

use quill_core::{EnvRef, Frame, InterpretResult, Interpreter, SyntaxSet, Value};

pub use casts::{CastTable, TypeCast};
pub use compare::evaluate_condition;
pub use io::{InputSource, PrintHandler, SharedInput, SharedPrintHandler, StdIo};
pub use loader::{load_file, LoadContext};
pub use math::evaluate_math;
pub use objects::{invoke, ErrorValue};

/// Names seeded into every frame's environment by [`standard_environment_loader`].
pub const SEEDED_NAMES: [&str; 3] = ["this", "this_parent", "this_path"];

/// Seed `this`, `this_parent` and, when known, `this_path`.
///
/// `this` and `this_parent` are non-owning, so seeding never keeps a scope
/// alive.
pub fn standard_environment_loader(env: &EnvRef, source: Option<&str>) -> InterpretResult {
    env.set_weak("this", env);
    match env.parent() {
        Some(parent) => env.set_weak("this_parent", &parent),
        None => env.set("this_parent", Value::None),
    };
    if let Some(source) = source {
        env.set("this_path", Value::str(source));
    }
    Ok(())
}

/// Every standard binding, with `set` using `casts` and `import` sharing
/// `context`.
pub fn standard_syntax(io: &StdIo, casts: Rc<CastTable>, context: Rc<LoadContext>) -> SyntaxSet {
    let mut syntax = objects::syntax(casts);
    syntax.extend(control::syntax());
    syntax.extend(math::syntax());
    syntax.extend(io::syntax(io));
    syntax.extend(loader::syntax(context));
    syntax
}

/// An interpreter for the standard language with its own load context.
pub fn standard_interpreter(io: StdIo) -> Interpreter {
    standard_interpreter_with_casts(io, Rc::new(CastTable::standard()))
}

/// Like [`standard_interpreter`], with `set` types from `casts`.
///
/// The table stays shared, so casts added or removed later apply to the
/// running interpreter.
pub fn standard_interpreter_with_casts(io: StdIo, casts: Rc<CastTable>) -> Interpreter {
    standard_interpreter_with(&io, casts, Rc::new(LoadContext::new()))
}

fn standard_interpreter_with(io: &StdIo, casts: Rc<CastTable>, context: Rc<LoadContext>) -> Interpreter {
    standard_syntax(io, casts, context)
        .builder()
        .environment_loader(standard_environment_loader)
        .build()
}

/// Interpret the file at `path` with a fresh interpreter and load context.
pub fn interpret_file(path: &Path, io: StdIo) -> InterpretResult<(Interpreter, Rc<Frame>)> {
    let context = Rc::new(LoadContext::new());
    let casts = Rc::new(CastTable::standard());
    let mut interpreter = standard_interpreter_with(&io, casts, Rc::clone(&context));
    let frame = load_file(&mut interpreter, &context, path)?;
    Ok((interpreter, frame))
}
