//! Argument helpers shared by the standard resolvers.

use quill_core::{
    internal_name, take_block, Arg, Argument, Body, EnvRef, Frame, Instruction, InterpretError,
    InterpretResult, Interpreter, ParseErrorKind, Parser, Payload, Value,
};

/// Fail with `message` unless at least `count` arguments were given.
pub(crate) fn require(args: &[Argument], count: usize, message: &str) -> InterpretResult {
    if args.len() < count {
        return Err(InterpretError::resolution(message));
    }
    Ok(())
}

pub(crate) fn text(arg: &Argument) -> InterpretResult<String> {
    arg.text()
        .ok_or_else(|| InterpretError::resolution("expected a name, found a block"))
}

pub(crate) fn value(arg: &Argument) -> InterpretResult<Value> {
    arg.value()
        .ok_or_else(|| InterpretError::resolution("expected a value, found a block"))
}

pub(crate) fn body(arg: Option<&Argument>) -> InterpretResult<&Body> {
    match arg.and_then(Argument::payload) {
        Some(Payload::Body(body)) => Ok(body),
        _ => Err(InterpretError::resolution("the block body was corrupted")),
    }
}

pub(crate) fn group(arg: Option<&Argument>) -> InterpretResult<&[Arg]> {
    match arg.and_then(Argument::payload) {
        Some(Payload::Group(args)) => Ok(args),
        _ => Err(InterpretError::resolution("the block arguments were corrupted")),
    }
}

/// An optional leading environment argument: the target and the index of
/// the first argument after it.
pub(crate) fn env_target(frame: &Frame, args: &[Argument]) -> (EnvRef, usize) {
    match args.first().and_then(Argument::value) {
        Some(Value::Env(env)) => (env, 1),
        _ => (frame.env().clone(), 0),
    }
}

/// Argument values with spread operands expanded in place.
///
/// Only a bound operand whose text carries the spread marker is expanded; a
/// literal that happens to start with the marker is kept as is.
pub(crate) fn expand(spread: &str, args: &[Argument]) -> InterpretResult<Vec<Value>> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        if let Some(operand) = arg.operand() {
            if !spread.is_empty() && !operand.is_literal() && operand.text.starts_with(spread) {
                let Some(list) = operand.value.as_list() else {
                    return Err(InterpretError::resolution(format!(
                        "spread argument '{}' must be a list, found {}",
                        operand.text,
                        operand.value.type_name()
                    )));
                };
                values.extend(list.to_vec());
                continue;
            }
        }
        values.push(value(arg)?);
    }
    Ok(values)
}

/// Resolve raw block arguments against the frame's environment.
pub(crate) fn resolve_group(
    interpreter: &Interpreter,
    frame: &Frame,
    args: &[Arg],
) -> InterpretResult<Vec<Argument>> {
    args.iter()
        .map(|arg| interpreter.resolve_in(frame.env(), frame.source(), arg))
        .collect()
}

/// Parse-time resolver body for `token … end, token` blocks.
///
/// The opener is replaced by the internal token carrying its arguments as a
/// group followed by the transformed body. With `named`, the first argument
/// is kept as plain text in front of the group and must be present.
pub(crate) fn capture(
    parser: &mut Parser,
    instructions: &mut Vec<Instruction>,
    cursor: usize,
    token: &str,
    named: bool,
) -> Result<usize, ParseErrorKind> {
    let (lead, body) = take_block(parser, instructions, cursor, token)?;
    let mut rest = lead.args.into_iter();
    let mut args = Vec::with_capacity(3);
    if named {
        let Some(name) = rest.next() else {
            return Err(ParseErrorKind::invalid(format!("'{token}' requires at least a name")));
        };
        args.push(name);
    }
    args.push(Arg::Payload(Payload::Group(rest.collect())));
    args.push(Arg::Payload(Payload::Body(body)));
    instructions[cursor] = Instruction::new(internal_name(token), args, lead.line);
    Ok(cursor)
}
