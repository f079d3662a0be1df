//! Depth-counted block capture for parse-time resolvers.

use crate::errors::ParseErrorKind;
use crate::instruction::{Arg, Body, Instruction};
use crate::parser::Parser;

/// Result of scanning for the end of a block.
#[derive(Clone, Debug, PartialEq)]
pub struct Capture {
    /// Index of the opening instruction.
    pub start: usize,
    /// Index of the matching end instruction, or the sequence length when none was found.
    pub end: usize,
    /// Instructions strictly between `start` and `end`.
    pub body: Vec<Instruction>,
    /// Final depth; negative exactly when the matching end was found.
    pub depth: isize,
}

impl Capture {
    /// Whether the matching end instruction was found.
    pub fn is_closed(&self) -> bool {
        self.depth < 0
    }
}

/// Scan forward from `start + 1` for the end instruction matching the opener at `start`.
///
/// Every `body_token` deepens the nesting; every `end_token` whose arguments
/// equal `end_args` exactly closes one level. Scanning stops when the depth
/// goes negative. An unclosed block is reported through [`Capture::depth`],
/// not as an error: the caller decides.
pub fn capture_block(
    instructions: &[Instruction],
    start: usize,
    body_token: &str,
    end_token: &str,
    end_args: &[Arg],
) -> Capture {
    let mut body = Vec::new();
    let mut depth: isize = 0;
    let mut index = start + 1;

    while let Some(instruction) = instructions.get(index) {
        if instruction.token == body_token {
            depth += 1;
        } else if instruction.token == end_token && instruction.args == end_args {
            depth -= 1;
            if depth < 0 {
                break;
            }
        }
        body.push(instruction.clone());
        index += 1;
    }

    Capture {
        start,
        end: index,
        body,
        depth,
    }
}

/// Capture the `token … end;token` block opened at `cursor`, transform its
/// body, and remove everything after the opener up to and including the end.
///
/// Returns the original opening instruction and the transformed body; the
/// caller replaces `instructions[cursor]` with its synthesized instruction.
pub fn take_block(
    parser: &mut Parser,
    instructions: &mut Vec<Instruction>,
    cursor: usize,
    token: &str,
) -> Result<(Instruction, Body), ParseErrorKind> {
    let capture = capture_block(instructions, cursor, token, "end", &[Arg::text(token)]);
    if !capture.is_closed() {
        return Err(ParseErrorKind::UnterminatedBlock {
            token: token.to_string(),
        });
    }
    let lead = instructions[cursor].clone();
    let end = capture.end;
    let body = parser.transform(capture.body)?;
    instructions.drain(cursor + 1..=end);
    Ok((lead, body.into()))
}

/// Replace the opener of a closed capture with `synthesized` and remove the
/// captured body together with its end instruction.
///
/// Does nothing for an unclosed capture.
pub fn replace_block(instructions: &mut Vec<Instruction>, capture: &Capture, synthesized: Instruction) {
    if !capture.is_closed() {
        return;
    }
    instructions[capture.start] = synthesized;
    instructions.drain(capture.start + 1..=capture.end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn inst(token: &str, args: &[&str]) -> Instruction {
        Instruction::new(token, args.iter().map(|a| Arg::text(*a)).collect(), 0)
    }

    fn tokens(instructions: &[Instruction]) -> Vec<&str> {
        instructions.iter().map(|i| i.token.as_str()).collect()
    }

    #[test]
    fn captures_flat_body() {
        let program = vec![
            inst("if", &["x"]),
            inst("print", &["a"]),
            inst("end", &["if"]),
            inst("print", &["b"]),
        ];
        let capture = capture_block(&program, 0, "if", "end", &[Arg::text("if")]);
        assert!(capture.is_closed());
        assert_eq!(capture.end, 2);
        assert_eq!(tokens(&capture.body), vec!["print"]);
    }

    #[test]
    fn nested_same_kind_blocks_match_outer_end() {
        let program = vec![
            inst("if", &["x"]),
            inst("if", &["y"]),
            inst("print", &["a"]),
            inst("end", &["if"]),
            inst("print", &["b"]),
            inst("end", &["if"]),
            inst("print", &["c"]),
        ];
        let capture = capture_block(&program, 0, "if", "end", &[Arg::text("if")]);
        assert_eq!(capture.depth, -1);
        assert_eq!(capture.end, 5);
        assert_eq!(tokens(&capture.body), vec!["if", "print", "end", "print"]);
    }

    #[test]
    fn ends_with_other_arguments_are_ignored() {
        let program = vec![
            inst("while", &[]),
            inst("end", &["if"]),
            inst("end", &["while"]),
        ];
        let capture = capture_block(&program, 0, "while", "end", &[Arg::text("while")]);
        assert!(capture.is_closed());
        assert_eq!(capture.end, 2);
        assert_eq!(capture.body.len(), 1);
    }

    #[test]
    fn replace_block_swaps_lead_and_drops_range() {
        let mut program = vec![
            inst("print", &["before"]),
            inst("if", &["x"]),
            inst("print", &["a"]),
            inst("end", &["if"]),
            inst("print", &["after"]),
        ];
        let capture = capture_block(&program, 1, "if", "end", &[Arg::text("if")]);
        replace_block(&mut program, &capture, inst("__if__", &[]));
        assert_eq!(tokens(&program), vec!["print", "__if__", "print"]);
        assert_eq!(program[2].args, vec![Arg::text("after")]);
    }

    #[test]
    fn unterminated_block_reports_non_negative_depth() {
        let program = vec![inst("if", &[]), inst("if", &[]), inst("end", &["if"])];
        let capture = capture_block(&program, 0, "if", "end", &[Arg::text("if")]);
        assert_eq!(capture.depth, 0);
        assert!(!capture.is_closed());
        assert_eq!(capture.end, program.len());
    }

    fn nested(levels: usize, closes: usize) -> Vec<Instruction> {
        let mut program = Vec::new();
        for _ in 0..=levels {
            program.push(inst("loop", &[]));
            program.push(inst("print", &["x"]));
        }
        for _ in 0..closes {
            program.push(inst("end", &["loop"]));
        }
        program
    }

    proptest! {
        #[test]
        fn closed_exactly_when_balanced(levels in 0usize..8, closes in 0usize..10) {
            let program = nested(levels, closes);
            let capture = capture_block(&program, 0, "loop", "end", &[Arg::text("loop")]);
            prop_assert_eq!(capture.is_closed(), closes > levels);
            if capture.is_closed() {
                prop_assert_eq!(&program[capture.end].token, "end");
                prop_assert!(capture.body.len() == capture.end - capture.start - 1);
                let ends_in_body = capture.body.iter().filter(|i| i.token == "end").count();
                prop_assert_eq!(ends_in_body, levels);
            }
        }
    }
}
