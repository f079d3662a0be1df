//! Loading programs from files, and the `import` instruction.
//!
//! A [`LoadContext`] is created once per top-level load and shared by every
//! nested `import` it triggers. It tracks the files currently being loaded
//! (a file re-entering its own load is an error) and caches the environment
//! of every file that finished loading.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use quill_core::{
    Argument, EnvRef, ErrorKind, Frame, InterpretError, InterpretResult, Interpreter, Syntax, SyntaxSet, Value,
};
use rustc_hash::FxHashMap;

use crate::args::{require, text, value};
use crate::SEEDED_NAMES;

/// Load state for one top-level load.
#[derive(Debug, Default)]
pub struct LoadContext {
    loading: RefCell<Vec<PathBuf>>,
    loaded: RefCell<FxHashMap<PathBuf, EnvRef>>,
}

impl LoadContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `path` (canonical) is currently being loaded.
    pub fn is_loading(&self, path: &Path) -> bool {
        self.loading.borrow().iter().any(|loading| loading == path)
    }

    /// Environment of an already loaded file.
    pub fn loaded(&self, path: &Path) -> Option<EnvRef> {
        self.loaded.borrow().get(path).cloned()
    }

    /// Directory of the innermost file being loaded, if any.
    fn current_dir(&self) -> Option<PathBuf> {
        self.loading
            .borrow()
            .last()
            .and_then(|path| path.parent())
            .map(Path::to_path_buf)
    }
}

/// Pops the loading entry even when the load fails.
struct Loading<'a> {
    context: &'a LoadContext,
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.context.loading.borrow_mut().pop();
    }
}

/// Read and execute the file at `path` as a top-level program.
///
/// Relative paths are taken relative to the file currently being loaded, or
/// to the working directory at the top level.
#[tracing::instrument(level = "debug", skip(interpreter, context))]
pub fn load_file(interpreter: &mut Interpreter, context: &LoadContext, path: &Path) -> InterpretResult<Rc<Frame>> {
    let path = match (path.is_relative(), context.current_dir()) {
        (true, Some(dir)) => dir.join(path),
        _ => path.to_path_buf(),
    };
    let path = fs::canonicalize(&path).map_err(InterpretError::foreign)?;
    if context.is_loading(&path) {
        return Err(InterpretError::new(ErrorKind::ReentrantLoad {
            path: path.display().to_string(),
        }));
    }
    let code = fs::read_to_string(&path).map_err(InterpretError::foreign)?;

    context.loading.borrow_mut().push(path.clone());
    let _loading = Loading { context };
    let frame = interpreter.execute_source(&code, &path.to_string_lossy())?;
    context
        .loaded
        .borrow_mut()
        .insert(path, frame.env().clone());
    Ok(frame)
}

pub(crate) fn syntax(context: Rc<LoadContext>) -> SyntaxSet {
    SyntaxSet::new().with(
        Syntax::new("import").on_run(move |interpreter, frame, args| run_import(interpreter, &context, frame, &args)),
    )
}

/// `import, path[, name]`: bind the loaded file's environment to `name`, or
/// copy its bindings into the current environment.
fn run_import(
    interpreter: &mut Interpreter,
    context: &LoadContext,
    frame: &Frame,
    args: &[Argument],
) -> InterpretResult {
    require(args, 1, "'import' requires a path and optionally a name")?;
    let path = PathBuf::from(value(&args[0])?.to_string());

    let resolved = match (path.is_relative(), context.current_dir()) {
        (true, Some(dir)) => dir.join(&path),
        _ => path.clone(),
    };
    let cached = fs::canonicalize(&resolved)
        .ok()
        .and_then(|canonical| context.loaded(&canonical));
    let env = match cached {
        Some(env) => env,
        None => load_file(interpreter, context, &path)?.env().clone(),
    };

    match args.get(1) {
        Some(name) => {
            frame.env().set(&text(name)?, Value::Env(env));
        }
        None => {
            for slot in env.slots() {
                if !SEEDED_NAMES.contains(&slot.name()) {
                    frame.env().set(slot.name(), slot.get());
                }
            }
        }
    }
    Ok(())
}
