//! Conditionals, loops, error recovery and cursor control.

use quill_core::{Argument, Frame, FrameKind, InterpretError, InterpretResult, Interpreter, Syntax, SyntaxSet, Value};

use crate::args::{body, capture, group, require, resolve_group, value};
use crate::compare::evaluate_condition;
use crate::objects::{invoke, ErrorValue};

pub(crate) fn syntax() -> SyntaxSet {
    SyntaxSet::new()
        .with(
            Syntax::new("if")
                .internal()
                .on_parse(|parser, instructions, cursor| capture(parser, instructions, cursor, "if", false))
                .on_run(run_if),
        )
        .with(
            Syntax::new("while")
                .internal()
                .on_parse(|parser, instructions, cursor| capture(parser, instructions, cursor, "while", false))
                .on_run(run_while),
        )
        .with(
            Syntax::new("try")
                .internal()
                .on_parse(|parser, instructions, cursor| capture(parser, instructions, cursor, "try", false))
                .on_run(run_try),
        )
        .with(Syntax::new("raise").on_run(run_raise))
        .with(Syntax::new("jump").on_run(run_jump))
        .with(Syntax::new("stop").on_run(run_stop))
}

/// Re-resolve a stored condition against the frame's current bindings.
fn condition(interpreter: &Interpreter, frame: &Frame, args: &[Argument]) -> InterpretResult<bool> {
    let raw = group(args.first())?;
    Ok(evaluate_condition(&resolve_group(interpreter, frame, raw)?))
}

/// `__if__, (condition), body`
fn run_if(interpreter: &mut Interpreter, frame: &Frame, args: Vec<Argument>) -> InterpretResult {
    let body = body(args.get(1))?;
    if condition(interpreter, frame, &args)? {
        interpreter.run_block(body, frame)?;
    }
    Ok(())
}

/// `__while__, (condition), body`
fn run_while(interpreter: &mut Interpreter, frame: &Frame, args: Vec<Argument>) -> InterpretResult {
    let body = body(args.get(1))?;
    while condition(interpreter, frame, &args)? {
        interpreter.run_block(body, frame)?;
        if frame.is_halted() || interpreter.is_halted() {
            break;
        }
    }
    Ok(())
}

/// `__try__, (handler), body`: on failure, call the handler with the raised
/// value, or with an [`ErrorValue`] describing any other failure.
fn run_try(interpreter: &mut Interpreter, frame: &Frame, args: Vec<Argument>) -> InterpretResult {
    let body = body(args.get(1))?;
    let handler = resolve_group(interpreter, frame, group(args.first())?)?;
    let Some(Value::Function(handler)) = handler.first().and_then(Argument::value) else {
        return Err(InterpretError::resolution("'try' requires a handler function"));
    };

    interpreter.execute_guarded(body, frame, |interpreter, err| {
        let failure = match err.raised_value() {
            Some(value) => value.clone(),
            None => ErrorValue::new(err.to_string()).into_value(),
        };
        invoke(interpreter, frame, &handler, vec![failure]).map(drop)
    })
}

/// `raise, value`
fn run_raise(_: &mut Interpreter, _: &Frame, args: Vec<Argument>) -> InterpretResult {
    require(&args, 1, "'raise' requires a value to raise")?;
    Err(InterpretError::raised(value(&args[0])?))
}

/// `jump, offset`: move the cursor relative to this instruction.
fn run_jump(_: &mut Interpreter, frame: &Frame, args: Vec<Argument>) -> InterpretResult {
    require(&args, 1, "'jump' requires an offset")?;
    let offset = value(&args[0])?;
    let Some(delta) = offset.as_int().and_then(|delta| isize::try_from(delta).ok()) else {
        return Err(InterpretError::resolution(format!(
            "'jump' requires an integer offset, found {}",
            offset.type_name()
        )));
    };
    frame.jump(delta);
    Ok(())
}

/// `stop`: end the enclosing function or program. `stop, all` ends every frame.
fn run_stop(interpreter: &mut Interpreter, frame: &Frame, args: Vec<Argument>) -> InterpretResult {
    if args.first().and_then(Argument::text).as_deref() == Some("all") {
        interpreter.halt();
        return Ok(());
    }
    let target = interpreter
        .call_stack()
        .frames()
        .iter()
        .rev()
        .find(|active| active.kind() != FrameKind::Block)
        .cloned();
    match target {
        Some(target) => interpreter.unwind_to(&target),
        None => frame.halt(),
    }
    Ok(())
}
