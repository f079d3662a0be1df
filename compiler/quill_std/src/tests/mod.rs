//! End-to-end programs in the standard language.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

mod loading;

use std::rc::Rc;

use quill_core::{Frame, InterpretError};

use crate::{standard_interpreter, StdIo};

/// Run `code` with captured I/O, returning the output and the program frame.
fn run(code: &str) -> (String, Rc<Frame>) {
    run_with_input(code, Vec::<String>::new())
}

fn run_with_input(code: &str, input: Vec<impl Into<String>>) -> (String, Rc<Frame>) {
    let io = StdIo::captured(input);
    let mut interpreter = standard_interpreter(io.clone());
    let frame = interpreter.execute(code).unwrap();
    (io.output(), frame)
}

/// Run `code`, expecting it to fail.
fn fail(code: &str) -> (String, InterpretError) {
    let io = StdIo::captured(Vec::<String>::new());
    let mut interpreter = standard_interpreter(io.clone());
    let err = interpreter.execute(code).unwrap_err();
    assert!(interpreter.call_stack().is_empty());
    (io.output(), err)
}
