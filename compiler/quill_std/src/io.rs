//! Console I/O for `print` and `input`.
//!
//! Output goes through a [`PrintHandler`] so hosts and tests can capture it;
//! input comes from an [`InputSource`] that is either stdin or a scripted
//! queue of lines.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use quill_core::{Argument, Frame, InterpretError, InterpretResult, Interpreter, Syntax, SyntaxSet, Value};

use crate::args::{expand, require, text, value};

/// Where `print` output goes.
pub enum PrintHandler {
    Stdout,
    /// Captures output, e.g. for tests or an embedding host.
    Buffer(Mutex<String>),
    /// Discards output.
    Silent,
}

impl PrintHandler {
    pub fn buffer() -> Self {
        PrintHandler::Buffer(Mutex::new(String::new()))
    }

    /// Print a line (with newline).
    pub fn println(&self, msg: &str) {
        match self {
            PrintHandler::Stdout => println!("{msg}"),
            PrintHandler::Buffer(buf) => {
                let mut buf = buf.lock();
                buf.push_str(msg);
                buf.push('\n');
            }
            PrintHandler::Silent => {}
        }
    }

    /// Print without newline.
    pub fn print(&self, msg: &str) {
        match self {
            PrintHandler::Stdout => {
                print!("{msg}");
                // A prompt must be visible before input is read.
                let _ = io::stdout().flush();
            }
            PrintHandler::Buffer(buf) => buf.lock().push_str(msg),
            PrintHandler::Silent => {}
        }
    }

    /// Captured output; empty for handlers that don't capture.
    pub fn output(&self) -> String {
        match self {
            PrintHandler::Buffer(buf) => buf.lock().clone(),
            PrintHandler::Stdout | PrintHandler::Silent => String::new(),
        }
    }

    pub fn clear(&self) {
        if let PrintHandler::Buffer(buf) = self {
            buf.lock().clear();
        }
    }
}

pub type SharedPrintHandler = Arc<PrintHandler>;

/// Where `input` reads lines from.
pub enum InputSource {
    Stdin,
    /// Pre-recorded lines, consumed front to back.
    Scripted(Mutex<VecDeque<String>>),
}

impl InputSource {
    pub fn scripted<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        InputSource::Scripted(Mutex::new(lines.into_iter().map(Into::into).collect()))
    }

    /// Read one line without its line ending. End of input is an error.
    pub fn read_line(&self) -> io::Result<String> {
        match self {
            InputSource::Stdin => {
                let mut line = String::new();
                if io::stdin().lock().read_line(&mut line)? == 0 {
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "end of input"));
                }
                let trimmed = line.trim_end_matches(['\n', '\r']).len();
                line.truncate(trimmed);
                Ok(line)
            }
            InputSource::Scripted(lines) => lines
                .lock()
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "end of input")),
        }
    }
}

pub type SharedInput = Arc<InputSource>;

/// The I/O endpoints of the standard language.
#[derive(Clone)]
pub struct StdIo {
    pub print: SharedPrintHandler,
    pub input: SharedInput,
}

impl StdIo {
    pub fn new(print: PrintHandler, input: InputSource) -> Self {
        StdIo {
            print: Arc::new(print),
            input: Arc::new(input),
        }
    }

    /// Buffered output and the given scripted input.
    pub fn captured<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StdIo::new(PrintHandler::buffer(), InputSource::scripted(lines))
    }

    pub fn output(&self) -> String {
        self.print.output()
    }
}

impl Default for StdIo {
    fn default() -> Self {
        StdIo::new(PrintHandler::Stdout, InputSource::Stdin)
    }
}

pub(crate) fn syntax(io: &StdIo) -> SyntaxSet {
    let print = Arc::clone(&io.print);
    let prompt = Arc::clone(&io.print);
    let input = Arc::clone(&io.input);

    SyntaxSet::new()
        .with(Syntax::new("print").on_run(move |interpreter, _, args| run_print(&print, interpreter, &args)))
        .with(Syntax::new("input").on_run(move |_, frame, args| run_input(&prompt, &input, frame, &args)))
}

fn run_print(handler: &PrintHandler, interpreter: &Interpreter, args: &[Argument]) -> InterpretResult {
    require(args, 1, "'print' requires at least one argument")?;
    if let Some(Value::Env(env)) = args[0].value() {
        let fields: Vec<String> = env
            .slots()
            .iter()
            .filter(|slot| !slot.name().starts_with("__"))
            .map(|slot| format!("{}: {}", slot.name(), slot.get()))
            .collect();
        handler.println(&format!("{{{}}}", fields.join(", ")));
    }

    let values = expand(&interpreter.config().spread, args)?;
    let line: Vec<String> = values.iter().map(ToString::to_string).collect();
    handler.println(&line.join(" "));
    Ok(())
}

fn run_input(handler: &PrintHandler, input: &InputSource, frame: &Frame, args: &[Argument]) -> InterpretResult {
    require(args, 2, "'input' requires a destination name and a prompt")?;
    let name = text(&args[0])?;
    handler.print(&value(&args[1])?.to_string());
    let line = input.read_line().map_err(InterpretError::foreign)?;
    frame.env().set(&name, Value::str(line));
    Ok(())
}
