//! Arithmetic expressions on the right-hand side of `#n=`
//!
//! Minimal Pratt parser working directly on the statement reader so the
//! caller can check what follows the expression. Grouping uses `[ ]`
//! because `( )` starts a comment. Trigonometry works in degrees.

use millforge_core::GcodeError;
use thiserror::Error;

use crate::gcode::stream::StreamReader;

/// Evaluation failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("'{0}' expected")]
    Expected(char),

    #[error("unknown function {0}")]
    UnknownFunction(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a number")]
    NotANumber,
}

impl From<ExpressionError> for GcodeError {
    fn from(err: ExpressionError) -> Self {
        GcodeError::Expression {
            reason: err.to_string(),
        }
    }
}

/// Binding power of a unary sign; binds looser than `**`
const UNARY_BP: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    fn binding_power(self) -> (u8, u8) {
        match self {
            BinaryOp::Add | BinaryOp::Sub => (1, 2),
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => (3, 4),
            // right associative
            BinaryOp::Pow => (7, 6),
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> Result<f64, ExpressionError> {
        match self {
            BinaryOp::Add => Ok(lhs + rhs),
            BinaryOp::Sub => Ok(lhs - rhs),
            BinaryOp::Mul => Ok(lhs * rhs),
            BinaryOp::Div if rhs == 0.0 => Err(ExpressionError::DivisionByZero),
            BinaryOp::Div => Ok(lhs / rhs),
            BinaryOp::Mod if rhs == 0.0 => Err(ExpressionError::DivisionByZero),
            BinaryOp::Mod => Ok(lhs.rem_euclid(rhs)),
            BinaryOp::Pow => Ok(lhs.powf(rhs)),
        }
    }
}

/// Evaluate a full expression
///
/// `resolve` is called with the reader positioned just after a `#` and
/// must consume the parameter reference and return its value.
pub fn evaluate<'a, F>(rd: &mut StreamReader<'a>, resolve: &mut F) -> Result<f64, GcodeError>
where
    F: FnMut(&mut StreamReader<'a>) -> Result<f64, GcodeError>,
{
    finite(expr_bp(rd, resolve, 0)?)
}

/// Evaluate a single operand: number, `#` reference, bracketed group,
/// signed operand or function call
///
/// Used where a word value may be a parameter, e.g. `X#1` or `Z[#2/2]`.
pub fn evaluate_operand<'a, F>(
    rd: &mut StreamReader<'a>,
    resolve: &mut F,
) -> Result<f64, GcodeError>
where
    F: FnMut(&mut StreamReader<'a>) -> Result<f64, GcodeError>,
{
    finite(primary(rd, resolve)?)
}

fn finite(value: f64) -> Result<f64, GcodeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ExpressionError::NotANumber.into())
    }
}

fn expr_bp<'a, F>(rd: &mut StreamReader<'a>, resolve: &mut F, min_bp: u8) -> Result<f64, GcodeError>
where
    F: FnMut(&mut StreamReader<'a>) -> Result<f64, GcodeError>,
{
    let mut lhs = primary(rd, resolve)?;
    loop {
        rd.skip_spaces();
        let save = rd.position();
        let Some(op) = read_operator(rd) else {
            break;
        };
        let (l_bp, r_bp) = op.binding_power();
        if l_bp < min_bp {
            rd.reset_to(save);
            break;
        }
        let rhs = expr_bp(rd, resolve, r_bp)?;
        lhs = op.apply(lhs, rhs)?;
    }
    Ok(lhs)
}

fn read_operator(rd: &mut StreamReader<'_>) -> Option<BinaryOp> {
    let rest = rd.remaining();
    let (op, len) = match rest.chars().next()? {
        '+' => (BinaryOp::Add, 1),
        '-' => (BinaryOp::Sub, 1),
        '*' if rest.starts_with("**") => (BinaryOp::Pow, 2),
        '*' => (BinaryOp::Mul, 1),
        '/' => (BinaryOp::Div, 1),
        '^' => (BinaryOp::Pow, 1),
        'M' | 'm' if rest.get(..3).is_some_and(|word| word.eq_ignore_ascii_case("MOD")) => {
            (BinaryOp::Mod, 3)
        }
        _ => return None,
    };
    for _ in 0..len {
        rd.next_char();
    }
    Some(op)
}

fn primary<'a, F>(rd: &mut StreamReader<'a>, resolve: &mut F) -> Result<f64, GcodeError>
where
    F: FnMut(&mut StreamReader<'a>) -> Result<f64, GcodeError>,
{
    rd.skip_spaces();
    let ch = rd.peek().ok_or(ExpressionError::UnexpectedEnd)?;
    match ch {
        '[' => bracketed(rd, resolve),
        '#' => {
            rd.next_char();
            resolve(rd)
        }
        '-' => {
            rd.next_char();
            Ok(-expr_bp(rd, resolve, UNARY_BP)?)
        }
        '+' => {
            rd.next_char();
            expr_bp(rd, resolve, UNARY_BP)
        }
        c if c.is_ascii_digit() || c == '.' => rd
            .read_decimal()
            .ok_or_else(|| ExpressionError::UnexpectedChar(c).into()),
        c if c.is_ascii_alphabetic() => {
            let name = rd.read_word().to_ascii_uppercase();
            rd.skip_spaces();
            let arg = bracketed(rd, resolve)?;
            if name == "ATAN" {
                if let Some(x) = atan_divisor(rd, resolve)? {
                    return Ok(arg.atan2(x).to_degrees());
                }
            }
            Ok(call(&name, arg)?)
        }
        c => Err(ExpressionError::UnexpectedChar(c).into()),
    }
}

fn bracketed<'a, F>(rd: &mut StreamReader<'a>, resolve: &mut F) -> Result<f64, GcodeError>
where
    F: FnMut(&mut StreamReader<'a>) -> Result<f64, GcodeError>,
{
    if rd.next_char() != Some('[') {
        return Err(ExpressionError::Expected('[').into());
    }
    let value = expr_bp(rd, resolve, 0)?;
    rd.skip_spaces();
    if rd.next_char() != Some(']') {
        return Err(ExpressionError::Expected(']').into());
    }
    Ok(value)
}

/// Second argument of the two-argument form `ATAN[y]/[x]`
fn atan_divisor<'a, F>(rd: &mut StreamReader<'a>, resolve: &mut F) -> Result<Option<f64>, GcodeError>
where
    F: FnMut(&mut StreamReader<'a>) -> Result<f64, GcodeError>,
{
    let save = rd.position();
    rd.skip_spaces();
    if rd.next_char() == Some('/') {
        rd.skip_spaces();
        if rd.peek() == Some('[') {
            return bracketed(rd, resolve).map(Some);
        }
    }
    rd.reset_to(save);
    Ok(None)
}

fn call(name: &str, arg: f64) -> Result<f64, ExpressionError> {
    let value = match name {
        "ABS" => arg.abs(),
        "ACOS" => arg.acos().to_degrees(),
        "ASIN" => arg.asin().to_degrees(),
        "ATAN" => arg.atan().to_degrees(),
        "COS" => arg.to_radians().cos(),
        "EXP" => arg.exp(),
        "FIX" => arg.floor(),
        "FUP" => arg.ceil(),
        "LN" => arg.ln(),
        "ROUND" => arg.round(),
        "SIN" => arg.to_radians().sin(),
        "SQRT" => arg.sqrt(),
        "TAN" => arg.to_radians().tan(),
        _ => return Err(ExpressionError::UnknownFunction(name.to_string())),
    };
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ExpressionError::NotANumber)
    }
}
