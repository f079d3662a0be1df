//! `math, [env,] dest, op, args…`
//!
//! `sum`, `abs`, `min` and `max` fold the remaining arguments. Any other
//! second argument starts the binary form `left, op…, right`, where the last
//! operator word wins and `invert` negates the result. Without an operator
//! the result is the absolute difference.

use quill_core::{Argument, Frame, InterpretError, InterpretResult, Interpreter, Syntax, SyntaxSet, Value};

use crate::args::{env_target, require, text, value};

pub(crate) fn syntax() -> SyntaxSet {
    SyntaxSet::new().with(Syntax::new("math").on_run(run_math))
}

fn run_math(_: &mut Interpreter, frame: &Frame, args: Vec<Argument>) -> InterpretResult {
    const USAGE: &str = "'math' requires a destination, an operation and its operands";
    require(&args, 2, USAGE)?;
    let (env, offset) = env_target(frame, &args);
    require(&args, offset + 2, USAGE)?;

    let dest = text(&args[offset])?;
    let op = text(&args[offset + 1])?;
    let operands = args[offset + 2..]
        .iter()
        .map(|arg| value(arg).and_then(|v| Num::from_value(&v)))
        .collect::<InterpretResult<Vec<_>>>();

    let result: Value = match op.as_str() {
        "sum" => operands?.into_iter().try_fold(Num::Int(0), Num::plus)?.into(),
        "abs" => operands?.into_iter().try_fold(Num::Int(0), Num::plus)?.abs()?.into(),
        "min" => extreme(operands?, |candidate, best| candidate < best)?,
        "max" => extreme(operands?, |candidate, best| candidate > best)?,
        _ => evaluate_math(&args[offset + 1..])?,
    };

    env.set(&dest, result);
    Ok(())
}

fn extreme(operands: Vec<Num>, better: impl Fn(f64, f64) -> bool) -> InterpretResult<Value> {
    let mut operands = operands.into_iter();
    let Some(mut best) = operands.next() else {
        return Err(InterpretError::resolution("'min' and 'max' require at least one operand"));
    };
    for candidate in operands {
        if better(candidate.as_f64(), best.as_f64()) {
            best = candidate;
        }
    }
    Ok(best.into())
}

/// Evaluate the binary form. Fewer than two arguments yields `false`.
pub fn evaluate_math(args: &[Argument]) -> InterpretResult<Value> {
    let [first, ops @ .., last] = args else {
        return Ok(Value::Bool(false));
    };
    let left = Num::from_value(&value(first)?)?;
    let right = Num::from_value(&value(last)?)?;

    let mut operation = None;
    let mut inverted = false;
    for op in ops {
        let word = text(op)?;
        match word.as_str() {
            "invert" => inverted = !inverted,
            "plus" | "minus" | "times" | "power" | "modulo" | "divide" | "divide_int" | "difference" => {
                operation = Some(word);
            }
            _ => {}
        }
    }

    // Only the winning operator is evaluated.
    let mut result = match operation.as_deref() {
        Some("plus") => left.plus(right)?,
        Some("minus") => left.minus(right)?,
        Some("times") => left.times(right)?,
        Some("power") => left.power(right)?,
        Some("modulo") => left.modulo(right)?,
        Some("divide") => left.divide(right)?,
        Some("divide_int") => left.divide_int(right)?,
        _ => left.minus(right)?.abs()?,
    };

    if inverted {
        result = result.negate()?;
    }
    Ok(result.into())
}

/// A numeric operand. Integer arithmetic is checked; mixed operands widen to float.
#[derive(Copy, Clone, Debug, PartialEq)]
enum Num {
    Int(i64),
    Float(f64),
}

fn overflow() -> InterpretError {
    InterpretError::resolution("integer overflow")
}

fn division_by_zero() -> InterpretError {
    InterpretError::resolution("division by zero")
}

impl Num {
    fn from_value(value: &Value) -> InterpretResult<Self> {
        match value {
            Value::Int(i) => Ok(Num::Int(*i)),
            Value::Float(f) => Ok(Num::Float(*f)),
            Value::Bool(b) => Ok(Num::Int(i64::from(*b))),
            Value::Str(s) => {
                let text = s.trim();
                text.parse::<i64>()
                    .map(Num::Int)
                    .or_else(|_| text.parse::<f64>().map(Num::Float))
                    .map_err(|_| InterpretError::resolution(format!("'{s}' is not a number")))
            }
            other => Err(InterpretError::resolution(format!(
                "expected a number, found {}",
                other.type_name()
            ))),
        }
    }

    #[expect(clippy::cast_precision_loss, reason = "mixed arithmetic widens to float")]
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    fn ints(self, other: Num) -> Option<(i64, i64)> {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => Some((a, b)),
            _ => None,
        }
    }

    fn plus(self, other: Num) -> InterpretResult<Num> {
        match self.ints(other) {
            Some((a, b)) => a.checked_add(b).map(Num::Int).ok_or_else(overflow),
            None => Ok(Num::Float(self.as_f64() + other.as_f64())),
        }
    }

    fn minus(self, other: Num) -> InterpretResult<Num> {
        match self.ints(other) {
            Some((a, b)) => a.checked_sub(b).map(Num::Int).ok_or_else(overflow),
            None => Ok(Num::Float(self.as_f64() - other.as_f64())),
        }
    }

    fn times(self, other: Num) -> InterpretResult<Num> {
        match self.ints(other) {
            Some((a, b)) => a.checked_mul(b).map(Num::Int).ok_or_else(overflow),
            None => Ok(Num::Float(self.as_f64() * other.as_f64())),
        }
    }

    fn divide(self, other: Num) -> InterpretResult<Num> {
        let divisor = other.as_f64();
        if divisor == 0.0 {
            return Err(division_by_zero());
        }
        Ok(Num::Float(self.as_f64() / divisor))
    }

    /// Floor division.
    fn divide_int(self, other: Num) -> InterpretResult<Num> {
        match self.ints(other) {
            Some((_, 0)) => Err(division_by_zero()),
            Some((a, b)) => {
                let quotient = a.checked_div(b).ok_or_else(overflow)?;
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    Ok(Num::Int(quotient - 1))
                } else {
                    Ok(Num::Int(quotient))
                }
            }
            None => Ok(Num::Float(self.divide(other)?.as_f64().floor())),
        }
    }

    /// Modulo taking the sign of the divisor.
    fn modulo(self, other: Num) -> InterpretResult<Num> {
        match self.ints(other) {
            Some((_, 0)) => Err(division_by_zero()),
            Some((a, b)) => {
                let rem = a.checked_rem(b).ok_or_else(overflow)?;
                if rem != 0 && ((rem < 0) != (b < 0)) {
                    Ok(Num::Int(rem + b))
                } else {
                    Ok(Num::Int(rem))
                }
            }
            None => {
                let (a, b) = (self.as_f64(), other.as_f64());
                if b == 0.0 {
                    return Err(division_by_zero());
                }
                Ok(Num::Float(a - b * (a / b).floor()))
            }
        }
    }

    fn power(self, other: Num) -> InterpretResult<Num> {
        if let Some((base, exponent)) = self.ints(other) {
            if let Ok(exponent) = u32::try_from(exponent) {
                return base.checked_pow(exponent).map(Num::Int).ok_or_else(overflow);
            }
        }
        Ok(Num::Float(self.as_f64().powf(other.as_f64())))
    }

    fn abs(self) -> InterpretResult<Num> {
        match self {
            Num::Int(i) => i.checked_abs().map(Num::Int).ok_or_else(overflow),
            Num::Float(f) => Ok(Num::Float(f.abs())),
        }
    }

    fn negate(self) -> InterpretResult<Num> {
        match self {
            Num::Int(i) => i.checked_neg().map(Num::Int).ok_or_else(overflow),
            Num::Float(f) => Ok(Num::Float(-f)),
        }
    }
}

impl From<Num> for Value {
    fn from(num: Num) -> Self {
        match num {
            Num::Int(i) => Value::Int(i),
            Num::Float(f) => Value::Float(f),
        }
    }
}
