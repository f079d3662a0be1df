use std::cell::{Cell, RefCell};
use std::io;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::*;
use crate::block::take_block;
use crate::instruction::{Explicit, Payload};
use crate::registry::{internal_name, Syntax, SyntaxSet};
use crate::value::Value;

/// `set, name, type, value` with `int` and `any` types.
fn set_syntax() -> Syntax {
    Syntax::new("set").on_run(|_, frame, args| {
        let [name, kind, value] = args.as_slice() else {
            return Err(InterpretError::resolution("set expects 3 arguments"));
        };
        let name = name.text().unwrap_or_default();
        let value = value.value().unwrap_or_default();
        let value = match kind.text().as_deref() {
            Some("int") => match value {
                Value::Int(_) => value,
                other => {
                    return Err(InterpretError::resolution(format!("cannot cast {other} to int")))
                }
            },
            _ => value,
        };
        frame.env().set(&name, value);
        Ok(())
    })
}

/// `echo, args...` records argument display forms.
fn echo_syntax(log: &Rc<RefCell<Vec<String>>>) -> Syntax {
    let log = Rc::clone(log);
    Syntax::new("echo").on_run(move |_, _, args| {
        let line: Vec<String> = args
            .iter()
            .filter_map(Argument::value)
            .map(|value| value.to_string())
            .collect();
        log.borrow_mut().push(line.join(" "));
        Ok(())
    })
}

fn boom_syntax() -> Syntax {
    Syntax::new("boom").on_run(|_, _, _| Err(InterpretError::foreign(io::Error::other("boom"))))
}

/// `repeat, name ... end, repeat`: runs its body while `name` is truthy.
fn repeat_syntax() -> Syntax {
    Syntax::new("repeat")
        .internal()
        .on_parse(|parser, instructions, cursor| {
            let (lead, body) = take_block(parser, instructions, cursor, "repeat")?;
            let mut args = lead.args;
            args.push(Arg::Payload(Payload::Body(body)));
            instructions[cursor] = Instruction::new(internal_name("repeat"), args, lead.line);
            Ok(cursor)
        })
        .on_run(|interpreter, frame, args| {
            let Some(Argument::Payload(Payload::Body(body))) = args.last() else {
                return Err(InterpretError::resolution("missing body"));
            };
            let name = args[0].text().unwrap_or_default();
            while frame.env().get(&name).is_some_and(|v| v.is_truthy()) && !frame.is_halted() {
                let block = interpreter.run_block(body, frame)?;
                if block.is_halted() || interpreter.is_halted() {
                    break;
                }
            }
            Ok(())
        })
}

fn language(log: &Rc<RefCell<Vec<String>>>) -> SyntaxSet {
    SyntaxSet::new()
        .with(set_syntax())
        .with(echo_syntax(log))
        .with(boom_syntax())
        .with(repeat_syntax())
        .with(Syntax::new("dec").on_run(|_, _, args| {
            if let Some(slot) = args[0].operand().and_then(|operand| operand.slot.clone()) {
                let next = slot.get().as_int().unwrap_or(0) - 1;
                slot.replace(Value::Int(next));
            }
            Ok(())
        }))
        .with(Syntax::new("back").on_run(|_, frame, args| {
            let delta = args[0].value().and_then(|v| v.as_int()).unwrap_or(1);
            frame.jump(isize::try_from(delta).unwrap_or(1));
            Ok(())
        }))
        .with(Syntax::new("halt").on_run(|_, frame, _| {
            frame.halt();
            Ok(())
        }))
        .with(Syntax::new("halt_all").on_run(|interpreter, _, _| {
            interpreter.halt();
            Ok(())
        }))
}

fn setup() -> (Interpreter, Rc<RefCell<Vec<String>>>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    (language(&log).interpreter(), log)
}

// === End-to-end ===

#[test]
fn set_binds_integers() {
    let (mut interpreter, _) = setup();
    let frame = interpreter.execute("set, x, int, 5;\nset, y, int, 10;").unwrap();
    assert_eq!(frame.env().get("x"), Some(Value::Int(5)));
    assert_eq!(frame.env().get("y"), Some(Value::Int(10)));
    assert_eq!(frame.kind(), FrameKind::Program);
    assert!(interpreter.call_stack().is_empty());
}

#[test]
fn navigation_through_non_environment_names_segment() {
    let (mut interpreter, _) = setup();
    let err = interpreter
        .execute("set, x, int, 5;\necho, x.y;")
        .unwrap_err();
    match err.kind() {
        ErrorKind::Navigation {
            segment, through, ..
        } => {
            assert_eq!(segment, "y");
            assert_eq!(through, "x");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("'y'"));
    assert_eq!(err.trail()[0].line, 2);
}

#[test]
fn foreign_failure_carries_source_line_and_details() {
    let (mut interpreter, _) = setup();
    let err = interpreter
        .execute_source("set, a, int, 1;\nset, b, int, 2;\nboom;", "<test>")
        .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("<test>"), "{text}");
    assert!(text.contains('3'), "{text}");
    assert!(text.contains("boom"), "{text}");
    assert!(matches!(err.kind(), ErrorKind::Foreign { .. }));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn unknown_token_is_located() {
    let (mut interpreter, _) = setup();
    let err = interpreter.execute("set, a, int, 1;\nfrobnicate, a;").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnknownToken { token } if token == "frobnicate"));
    assert_eq!(
        err.to_string(),
        "File '<main>', line 2 -> unknown token 'frobnicate'"
    );
}

#[test]
fn effects_before_failure_are_kept() {
    let (mut interpreter, log) = setup();
    let err = interpreter.execute("echo, 1;\nboom;\necho, 2;");
    assert!(err.is_err());
    assert_eq!(*log.borrow(), vec!["1".to_string()]);
}

#[test]
fn parse_errors_surface_unlocated() {
    let (mut interpreter, _) = setup();
    let err = interpreter.execute("echo, 1;\necho, 'open;").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Parse(parse) if parse.line == 2));
    assert!(err.trail().is_empty());
}

// === Argument resolution ===

#[test]
fn unbound_words_degrade_to_literals() {
    let (interpreter, _) = setup();
    let env = EnvRef::root();
    let arg = interpreter.resolve_argument(&env, &Arg::text("hello")).unwrap();
    let operand = arg.operand().unwrap();
    assert_eq!(operand.text, "hello");
    assert_eq!(operand.value, Value::str("hello"));
    assert!(operand.is_literal());
}

#[test]
fn partially_bound_path_degrades_whole_text() {
    let (interpreter, _) = setup();
    let env = EnvRef::root();
    env.set("obj", Value::Env(EnvRef::object(None)));
    let arg = interpreter.resolve_argument(&env, &Arg::text("obj.missing")).unwrap();
    let operand = arg.operand().unwrap();
    assert_eq!(operand.text, "obj.missing");
    assert!(operand.is_literal());
}

#[test]
fn quoted_literals_are_decoded_and_cast() {
    let (interpreter, _) = setup();
    let env = EnvRef::root();
    env.set("x", Value::Int(1));
    let quoted = interpreter.resolve_argument(&env, &Arg::text("'x'")).unwrap();
    assert_eq!(quoted.value(), Some(Value::str("x")));
    let number = interpreter.resolve_argument(&env, &Arg::text("'12'")).unwrap();
    assert_eq!(number.value(), Some(Value::Int(12)));
    assert_eq!(number.text().as_deref(), Some("12"));
}

#[test]
fn dotted_path_walks_environments() {
    let (interpreter, _) = setup();
    let env = EnvRef::root();
    let obj = EnvRef::object(None);
    obj.set("field", Value::Int(7));
    env.set("obj", Value::Env(obj.clone()));
    let arg = interpreter.resolve_argument(&env, &Arg::text("obj.field")).unwrap();
    let operand = arg.operand().unwrap();
    assert_eq!(operand.text, "field");
    assert_eq!(operand.value, Value::Int(7));
    assert!(operand.slot.as_ref().unwrap().owner().unwrap().ptr_eq(&obj));
}

#[test]
fn spread_marker_is_kept_in_text() {
    let (interpreter, _) = setup();
    let env = EnvRef::root();
    env.set("items", Value::list(vec![Value::Int(1)]));
    let arg = interpreter.resolve_argument(&env, &Arg::text("*items")).unwrap();
    let operand = arg.operand().unwrap();
    assert_eq!(operand.text, "*items");
    assert_eq!(operand.value, Value::list(vec![Value::Int(1)]));
}

#[test]
fn spread_marker_on_path_head_carries_to_last_segment() {
    let (interpreter, _) = setup();
    let env = EnvRef::root();
    let obj = EnvRef::object(None);
    obj.set("items", Value::list(vec![Value::Int(1), Value::Int(2)]));
    env.set("o", Value::Env(obj.clone()));

    let arg = interpreter.resolve_argument(&env, &Arg::text("*o.items")).unwrap();
    let operand = arg.operand().unwrap();
    assert_eq!(operand.text, "*items");
    assert!(operand.slot.as_ref().unwrap().owner().unwrap().ptr_eq(&obj));

    let arg = interpreter.resolve_argument(&env, &Arg::text("o.*items")).unwrap();
    assert_eq!(arg.operand().unwrap().text, "*items");
}

#[test]
fn payloads_pass_through() {
    let (interpreter, _) = setup();
    let payload = Payload::Explicit(Explicit::named("x.y", Value::Int(3)));
    let arg = interpreter
        .resolve_argument(&EnvRef::root(), &Arg::Payload(payload.clone()))
        .unwrap();
    assert_eq!(arg.payload(), Some(&payload));
    assert_eq!(arg.text().as_deref(), Some("x.y"));
}

#[test]
fn operands_alias_slots_across_reassignment() {
    let (interpreter, _) = setup();
    let env = EnvRef::root();
    env.set("x", Value::Int(1));
    let before = interpreter.resolve_argument(&env, &Arg::text("x")).unwrap();
    env.set("x", Value::Int(2));
    let after = interpreter.resolve_argument(&env, &Arg::text("x")).unwrap();
    let before = before.operand().unwrap().slot.clone().unwrap();
    let after = after.operand().unwrap().slot.clone().unwrap();
    assert!(before.ptr_eq(&after));
    assert_eq!(before.get(), Value::Int(2));
}

// === Control ===

#[test]
fn block_resolver_loops_until_condition_fails() {
    let (mut interpreter, log) = setup();
    let frame = interpreter
        .execute("set, n, int, 3;\nrepeat, n;\ndec, n;\necho, n;\nend, repeat;")
        .unwrap();
    assert_eq!(frame.env().get("n"), Some(Value::Int(0)));
    assert_eq!(*log.borrow(), vec!["2", "1", "0"]);
}

#[test]
fn jump_minus_one_reexecutes_previous_instruction() {
    let count = Rc::new(Cell::new(0));
    let counter = Rc::clone(&count);
    let syntax = SyntaxSet::new()
        .with(Syntax::new("tick").on_run(move |_, _, _| {
            counter.set(counter.get() + 1);
            Ok(())
        }))
        .with(Syntax::new("again").on_run(|_, frame, _| {
            // Back to `tick` twice, then fall through.
            let passes = frame.env().resolve_or("passes", Value::Int(0)).as_int().unwrap_or(0);
            if passes < 2 {
                frame.env().set("passes", Value::Int(passes + 1));
                frame.jump(-1);
            }
            Ok(())
        }));
    let mut interpreter = syntax.interpreter();
    interpreter.execute("tick;\nagain;").unwrap();
    assert_eq!(count.get(), 3);
}

#[test]
fn jump_before_start_ends_execution() {
    let (mut interpreter, log) = setup();
    interpreter.execute("echo, a;\nback, -5;\necho, b;").unwrap();
    assert_eq!(*log.borrow(), vec!["a"]);
}

#[test]
fn jump_past_the_cursor_range_ends_execution() {
    let (mut interpreter, log) = setup();
    let code = format!("echo, a;\necho, b;\nback, {};\necho, c;", isize::MAX);
    let frame = interpreter.execute(&code).unwrap();
    assert_eq!(*log.borrow(), vec!["a", "b"]);
    assert!(!frame.is_halted());
    assert!(interpreter.call_stack().is_empty());
}

#[test]
fn frame_halt_stops_before_next_instruction() {
    let (mut interpreter, log) = setup();
    let frame = interpreter.execute("echo, a;\nhalt;\necho, b;").unwrap();
    assert!(frame.is_halted());
    assert_eq!(*log.borrow(), vec!["a"]);
}

#[test]
fn interpreter_halt_stops_nested_frames() {
    let (mut interpreter, log) = setup();
    interpreter
        .execute("set, go, int, 1;\nrepeat, go;\necho, in;\nhalt_all;\necho, skipped;\nend, repeat;\necho, after;")
        .unwrap();
    assert_eq!(*log.borrow(), vec!["in"]);
    assert!(interpreter.is_halted());

    // A new top-level execution clears the halt.
    interpreter.execute("echo, again;").unwrap();
    assert_eq!(log.borrow().last().map(String::as_str), Some("again"));
}

// === Nesting and errors ===

#[test]
fn nested_failures_carry_one_location_per_level() {
    let (mut interpreter, _) = setup();
    let err = interpreter
        .execute_source("set, go, int, 1;\nrepeat, go;\nrepeat, go;\n\nboom;\nend, repeat;\nend, repeat;", "<nested>")
        .unwrap_err();
    let lines: Vec<usize> = err.trail().iter().map(|location| location.line).collect();
    assert_eq!(lines, vec![5, 3, 2]);
    let text = err.to_string();
    assert!(
        text.starts_with("File '<nested>', line 2 -> File '<nested>', line 3 -> File '<nested>', line 5 -> "),
        "{text}"
    );
    assert!(interpreter.call_stack().is_empty());
}

#[test]
fn call_stack_popped_after_failure() {
    let (mut interpreter, _) = setup();
    assert!(interpreter.execute("set, go, int, 1;\nrepeat, go;\nboom;\nend, repeat;").is_err());
    assert_eq!(interpreter.call_stack().depth(), 0);
    assert!(interpreter.current_frame().is_none());
}

#[test]
fn loader_runs_per_frame_and_failure_is_setup() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let record = Rc::clone(&seen);
    let mut interpreter = SyntaxSet::new()
        .with(set_syntax())
        .builder()
        .environment_loader(move |env, source| {
            record.borrow_mut().push(source.unwrap_or_default().to_string());
            env.set("this", Value::Env(env.clone()));
            Ok(())
        })
        .build();
    let frame = interpreter.execute_source("set, x, int, 1;", "<seeded>").unwrap();
    assert!(frame.env().get("this").is_some());
    assert_eq!(*seen.borrow(), vec!["<seeded>".to_string()]);

    let mut failing = SyntaxSet::new()
        .with(set_syntax())
        .builder()
        .environment_loader(|_, _| Err(InterpretError::resolution("no seed")))
        .build();
    let err = failing.execute("set, x, int, 1;").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Setup { message } if message == "no seed"));
    assert!(err.trail().is_empty());
    assert!(failing.call_stack().is_empty());
}

#[test]
fn execute_guarded_hands_failure_to_handler() {
    let caught = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&caught);
    let log = Rc::new(RefCell::new(Vec::new()));
    let syntax = language(&log).with(Syntax::new("guard").on_run(move |interpreter, frame, _| {
        let body = [Instruction::new("boom", Vec::new(), frame.line())];
        let sink = Rc::clone(&sink);
        interpreter.execute_guarded(&body, frame, move |interpreter, err| {
            *sink.borrow_mut() = Some((err.to_string(), interpreter.call_stack().depth()));
            Ok(())
        })
    }));
    let mut interpreter = syntax.interpreter();
    interpreter.execute("guard;\necho, after;").unwrap();

    let (message, depth) = caught.borrow().clone().unwrap();
    assert!(message.contains("boom"));
    assert_eq!(depth, 1);
    assert_eq!(*log.borrow(), vec!["after"]);
}

#[test]
fn frame_queries_see_the_stack() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let record = Rc::clone(&seen);
    let log = Rc::new(RefCell::new(Vec::new()));
    let syntax = language(&log).with(Syntax::new("inspect").on_run(move |interpreter, frame, _| {
        let program = interpreter.nearest_frame(FrameKind::Program).unwrap();
        let caller = interpreter.caller_of(frame).map(|caller| caller.kind());
        record.borrow_mut().push((
            interpreter.call_stack().depth(),
            frame.kind(),
            caller,
            Rc::ptr_eq(&interpreter.current_frame().unwrap(), &program),
        ));
        Ok(())
    }));
    let mut interpreter = syntax.interpreter();
    interpreter
        .execute("inspect;\nset, go, int, 1;\nrepeat, go;\ninspect;\nset, go, int, 0;\nend, repeat;")
        .unwrap();
    assert_eq!(
        *seen.borrow(),
        vec![
            (1, FrameKind::Program, None, true),
            (2, FrameKind::Block, Some(FrameKind::Program), false),
        ]
    );
}

#[test]
fn unwind_to_halts_frames_above_target() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let syntax = language(&log).with(Syntax::new("leave").on_run(|interpreter, _, _| {
        if let Some(program) = interpreter.nearest_frame(FrameKind::Program) {
            interpreter.unwind_to(&program);
        }
        Ok(())
    }));
    let mut interpreter = syntax.interpreter();
    let frame = interpreter
        .execute("set, go, int, 1;\nrepeat, go;\nleave;\necho, inner;\nend, repeat;\necho, outer;")
        .unwrap();
    assert!(frame.is_halted());
    assert!(!interpreter.is_halted());
    assert!(log.borrow().is_empty());
}

#[test]
fn recursion_limit_is_reported() {
    let syntax = SyntaxSet::new().with(Syntax::new("recurse").on_run(|interpreter, frame, _| {
        let body = [Instruction::new("recurse", Vec::new(), frame.line())];
        interpreter.run_block(&body, frame).map(drop)
    }));
    let mut interpreter = syntax.builder().max_depth(Some(16)).build();
    let err = interpreter.execute("recurse;").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::RecursionLimit { depth: 16 }));
    assert_eq!(err.trail().len(), 16);
    assert!(interpreter.call_stack().is_empty());
}

#[test]
fn execute_instructions_uses_child_scope() {
    let (mut interpreter, _) = setup();
    let parent = EnvRef::root();
    parent.set("outer", Value::Int(1));
    let instructions = interpreter.parse("set, inner, int, 2;").unwrap();
    let frame = interpreter.execute_instructions(&instructions, &parent).unwrap();
    assert_eq!(frame.env().get("outer"), Some(Value::Int(1)));
    assert_eq!(frame.env().get("inner"), Some(Value::Int(2)));
    assert!(!parent.contains_local("inner"));
    assert_eq!(&**frame.source(), MAIN_SOURCE);
}

#[test]
fn tokenize_observer_sees_statements() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let record = Rc::clone(&seen);
    let mut interpreter = SyntaxSet::new()
        .with(set_syntax())
        .builder()
        .on_tokenize(move |line, statement| record.borrow_mut().push((line, statement.to_string())))
        .build();
    interpreter.execute("set, a, int, 1;\n\nset, b, int, 2;").unwrap();
    assert_eq!(
        *seen.borrow(),
        vec![(1, "set, a, int, 1".to_string()), (3, "set, b, int, 2".to_string())]
    );
}
