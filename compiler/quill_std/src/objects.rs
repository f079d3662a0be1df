//! Bindings, functions and classes.
//!
//! Functions are called by synthesizing one `set, param, obj, <value>`
//! instruction per parameter in front of the body and executing the result
//! in a [`FrameKind::Function`] frame whose environment is a child of the
//! function's owner. A function owned by an object receives that object as
//! its first argument.

use std::fmt;
use std::rc::Rc;

use quill_core::{
    Arg, Argument, EnvRef, Explicit, Frame, FrameKind, Function, HostValue, Instruction,
    InterpretError, InterpretResult, Interpreter, Payload, Syntax, SyntaxSet, Value,
};

use crate::args::{body, capture, env_target, expand, group, require, resolve_group, text, value};
use crate::casts::CastTable;

/// A failure value handed to `try` handlers, or created with the `error` type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorValue {
    pub message: String,
}

impl ErrorValue {
    pub const LABEL: &'static str = "error";

    pub fn new(message: impl Into<String>) -> Self {
        ErrorValue {
            message: message.into(),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Host(HostValue::new(Self::LABEL, self))
    }

    pub fn from_value(value: &Value) -> Option<&ErrorValue> {
        match value {
            Value::Host(host) => host.downcast_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub(crate) fn syntax(casts: Rc<CastTable>) -> SyntaxSet {
    SyntaxSet::new()
        .with(Syntax::new("set").on_run(move |interpreter, frame, args| run_set(&casts, interpreter, frame, args)))
        .with(Syntax::new("del").on_run(run_del))
        .with(
            Syntax::new("func")
                .internal()
                .on_parse(|parser, instructions, cursor| capture(parser, instructions, cursor, "func", true))
                .on_run(run_func),
        )
        .with(
            Syntax::new("class")
                .internal()
                .on_parse(|parser, instructions, cursor| capture(parser, instructions, cursor, "class", true))
                .on_run(run_class),
        )
        .with(Syntax::new("call").on_run(run_call))
        .with(Syntax::new("return").on_run(run_return))
        .with(Syntax::new("init").on_run(run_init))
}

// === Bindings ===

/// `set, [env,] name, [type,] value…`
fn run_set(casts: &CastTable, interpreter: &mut Interpreter, frame: &Frame, args: Vec<Argument>) -> InterpretResult {
    const USAGE: &str = "'set' requires at least a name and a value";
    require(&args, 2, USAGE)?;
    let (env, offset) = env_target(frame, &args);
    require(&args, offset + 2, USAGE)?;

    let name = text(&args[offset])?;
    let value = if args.len() - offset == 2 {
        value(&args[offset + 1])?
    } else {
        let kind = text(&args[offset + 1])?;
        cast(interpreter, casts, &kind, &args[offset + 2..])?
    };

    env.set(&name, value);
    Ok(())
}

/// Apply a `set` type to its value arguments.
///
/// `list` collects every remaining value and `obj` keeps the value as it is;
/// other types go through `casts`.
fn cast(interpreter: &Interpreter, casts: &CastTable, kind: &str, args: &[Argument]) -> InterpretResult<Value> {
    match kind {
        "list" => return Ok(Value::list(expand(&interpreter.config().spread, args)?)),
        "obj" => return value(&args[0]),
        _ => {}
    }
    casts
        .apply(kind, &value(&args[0])?)
        .ok_or_else(|| InterpretError::resolution(format!("invalid value for type '{kind}'")))
}

/// `del, [env,] name`
fn run_del(_: &mut Interpreter, frame: &Frame, args: Vec<Argument>) -> InterpretResult {
    const USAGE: &str = "'del' requires a name to remove";
    require(&args, 1, USAGE)?;
    let (env, offset) = env_target(frame, &args);
    require(&args, offset + 1, USAGE)?;
    env.delete(&text(&args[offset])?)?;
    Ok(())
}

// === Functions ===

/// `__func__, name, (params), body`
fn run_func(_: &mut Interpreter, frame: &Frame, args: Vec<Argument>) -> InterpretResult {
    require(&args, 3, "the function could not be defined: its arguments were corrupted")?;
    let name = text(&args[0])?;
    let params = group(args.get(1))?
        .iter()
        .filter_map(Arg::as_text)
        .map(str::to_string)
        .collect();
    let function = Function {
        name: name.clone(),
        params,
        body: Rc::clone(body(args.get(2))?),
        owner: Some(frame.env().downgrade()),
        source: Rc::clone(frame.source()),
    };
    frame.env().set(&name, Value::Function(Rc::new(function)));
    Ok(())
}

/// `call, function, args…`
fn run_call(interpreter: &mut Interpreter, frame: &Frame, args: Vec<Argument>) -> InterpretResult {
    require(&args, 1, "'call' requires the function to call")?;
    let callee = value(&args[0])?;
    let Some(function) = callee.as_function() else {
        return Err(InterpretError::resolution(format!(
            "'{}' is not a function (found {})",
            text(&args[0])?,
            callee.type_name()
        )));
    };
    let values = expand(&interpreter.config().spread, &args[1..])?;
    invoke(interpreter, frame, function, values)?;
    Ok(())
}

/// Call `function` with `values`, prepending its owner when the owner is an object.
pub fn invoke(
    interpreter: &mut Interpreter,
    frame: &Frame,
    function: &Function,
    mut values: Vec<Value>,
) -> InterpretResult<Rc<Frame>> {
    let owner = match &function.owner {
        Some(owner) => owner.upgrade().ok_or_else(|| {
            InterpretError::resolution(format!(
                "the scope that defined '{}' no longer exists",
                function.name
            ))
        })?,
        None => frame.env().clone(),
    };
    if owner.is_object() {
        values.insert(0, Value::Env(owner.clone()));
    }

    let bindings = bind(interpreter, function, values)?;
    let line = function.first_line();
    let mut instructions: Vec<Instruction> = bindings
        .into_iter()
        .map(|(name, value)| {
            let target = Explicit::named(name.clone(), Value::str(&name));
            Instruction::new(
                "set",
                vec![
                    Arg::Payload(Payload::Explicit(target)),
                    Arg::text("obj"),
                    Arg::Payload(Payload::Explicit(Explicit::named(name, value))),
                ],
                line,
            )
        })
        .collect();
    instructions.extend(function.body.iter().cloned());

    tracing::debug!(function = %function.name, "call");
    interpreter.execute_in(
        &instructions,
        owner.child(),
        Rc::clone(&function.source),
        FrameKind::Function,
    )
}

/// Pair parameters with values. A spread-marked last parameter collects the
/// remaining values into a list; surplus values are otherwise ignored.
fn bind(
    interpreter: &Interpreter,
    function: &Function,
    mut values: Vec<Value>,
) -> InterpretResult<Vec<(String, Value)>> {
    let spread = interpreter.config().spread.as_str();
    let mut params = function.params.clone();

    let variadic = params
        .last()
        .and_then(|last| last.strip_prefix(spread).filter(|_| !spread.is_empty()))
        .map(str::to_string);
    if let Some(name) = variadic {
        let fixed = params.len() - 1;
        if values.len() < fixed {
            return Err(InterpretError::resolution(format!(
                "'{}' expects at least {fixed} arguments, got {}",
                function.name,
                values.len()
            )));
        }
        let rest = values.split_off(fixed);
        values.push(Value::list(rest));
        params[fixed] = name;
    }

    if values.len() < params.len() {
        return Err(InterpretError::resolution(format!(
            "'{}' expects {} arguments, got {}",
            function.name,
            params.len(),
            values.len()
        )));
    }
    Ok(params.into_iter().zip(values).collect())
}

/// `return, name, value`: bind `name` in the caller of the nearest function
/// frame and stop that function.
fn run_return(interpreter: &mut Interpreter, _: &Frame, args: Vec<Argument>) -> InterpretResult {
    require(&args, 2, "'return' requires a name and a value")?;
    let name = text(&args[0])?;
    let value = value(&args[1])?;

    let Some(function) = interpreter.nearest_frame(FrameKind::Function) else {
        return Err(InterpretError::resolution("'return' outside of a function"));
    };
    let Some(caller) = interpreter.caller_of(&function) else {
        return Err(InterpretError::resolution("'return' found no caller to return into"));
    };
    caller.env().set(&name, value);
    interpreter.unwind_to(&function);
    Ok(())
}

// === Classes ===

/// `__class__, name, (parents), body`
fn run_class(interpreter: &mut Interpreter, frame: &Frame, args: Vec<Argument>) -> InterpretResult {
    require(&args, 3, "the class could not be defined: its arguments were corrupted")?;
    let name = text(&args[0])?;
    let parents = resolve_group(interpreter, frame, group(args.get(1))?)?;
    let body = Rc::clone(body(args.get(2))?);

    let class = EnvRef::new(Some(frame.env().clone()));
    let mut inheritance = Vec::with_capacity(parents.len());
    for parent in &parents {
        let Some(Value::Env(parent_env)) = parent.value() else {
            return Err(InterpretError::resolution(format!(
                "class '{name}' cannot inherit from '{}'",
                parent.text().unwrap_or_default()
            )));
        };
        class.absorb(&parent_env);
        inheritance.push(Value::Env(parent_env));
    }
    class.set("__inheritance__", Value::list(inheritance));
    class.set("__name__", Value::str(&name));

    tracing::debug!(class = %name, "define class");
    interpreter.execute_in(&body, class.clone(), Rc::clone(frame.source()), FrameKind::Class)?;
    frame.env().set(&name, Value::Env(class));
    Ok(())
}

/// `init, class, name, args…`
fn run_init(interpreter: &mut Interpreter, frame: &Frame, args: Vec<Argument>) -> InterpretResult {
    require(&args, 2, "'init' requires a class, a name and optional arguments")?;
    let Some(Value::Env(class)) = args[0].value() else {
        return Err(InterpretError::resolution("only a class can be initialized"));
    };
    if class.is_object() {
        return Err(InterpretError::resolution("an object cannot be initialized again"));
    }
    let name = text(&args[1])?;
    let Some(Value::Function(init)) = class.get("init") else {
        return Err(InterpretError::resolution(format!(
            "class '{}' has no 'init' function",
            class.get("__name__").unwrap_or_default()
        )));
    };

    let object = EnvRef::object(class.parent());
    object.absorb(&class);
    interpreter.load_environment(&object, Some(frame.source().as_ref()))?;
    object.set("__class__", Value::Env(class.clone()));
    object.set("__name__", Value::str(&name));
    for slot in object.slots() {
        if let Value::Function(function) = slot.get() {
            slot.replace(Value::Function(Rc::new(function.bound_to(&object))));
        }
    }

    let values = expand(&interpreter.config().spread, &args[2..])?;
    invoke(interpreter, frame, &init.bound_to(&object), values)?;
    frame.env().set(&name, Value::Env(object));
    Ok(())
}
