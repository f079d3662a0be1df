//! The condition mini-language used by `if` and `while`.
//!
//! `left, op…, right`: the first and last arguments are the operands, the
//! words in between select the comparison. Without an operator the operands
//! are compared for equality. `not` inverts the final result and may appear
//! anywhere among the operators.

use quill_core::{Argument, Value};

/// Evaluate a condition over resolved arguments. Fewer than two arguments is false.
pub fn evaluate_condition(args: &[Argument]) -> bool {
    let [first, ops @ .., last] = args else {
        return false;
    };
    let left = operand_value(first);
    let right = operand_value(last);

    let mut result = left == right;
    let mut inverted = false;
    for op in ops {
        match op.text().as_deref() {
            Some("not") => inverted = !inverted,
            Some("is") => result = left.same(&right),
            Some("equal") => result = left == right,
            Some("greater") => result = compare(&left, &right).is_some_and(|(l, r)| l > r),
            Some("lesser") => result = compare(&left, &right).is_some_and(|(l, r)| l < r),
            _ => {}
        }
    }

    result != inverted
}

fn operand_value(arg: &Argument) -> Value {
    arg.value().unwrap_or_default()
}

/// Both operands as floats, parsing numeric strings.
fn compare(left: &Value, right: &Value) -> Option<(f64, f64)> {
    Some((left.to_f64()?, right.to_f64()?))
}
