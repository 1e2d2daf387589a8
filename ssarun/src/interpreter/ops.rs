//! Evaluation of unary and binary operators.
//!
//! Integer and float arithmetic is written once, generically over the
//! `num-traits` capability sets, and instantiated per width by matching the
//! operand variants. Both operands of a binary operator must have the same
//! variant and width.

use crate::error::ErrorKind;
use crate::ir::{BinOp, UnOp};
use crate::memory;
use crate::value::{Float, Int, Value};
use num_traits::{CheckedRem, PrimInt, WrappingAdd, WrappingMul, WrappingSub};

/// Trait for evaluating binary operations on values.
pub trait BinaryEval {
    /// Evaluates a binary operation on two values of the same type.
    ///
    /// # Returns
    /// * `Ok(Value)` - Result of the operation
    /// * `Err(ErrorKind)` - If the operands differ in type, the operator is not
    ///   defined for them, or an integer division by zero occurs
    fn eval(&self, left: Value, right: Value) -> Result<Value, ErrorKind>;
}

/// Trait for evaluating unary operations on values.
pub trait UnaryEval {
    /// Evaluates a unary operation on a value.
    fn eval(&self, operand: Value) -> Result<Value, ErrorKind>;
}

/// Dispatches a pair of integers of the same width to `$body`, binding the raw
/// operands and the constructor that wraps a result of that width.
macro_rules! with_same_int {
    ($left:expr, $right:expr, $mismatch:expr, |$a:ident, $b:ident, $wrap:ident| $body:expr) => {
        match ($left, $right) {
            (Int::I8($a), Int::I8($b)) => { let $wrap = Int::I8; $body }
            (Int::I16($a), Int::I16($b)) => { let $wrap = Int::I16; $body }
            (Int::I32($a), Int::I32($b)) => { let $wrap = Int::I32; $body }
            (Int::I64($a), Int::I64($b)) => { let $wrap = Int::I64; $body }
            (Int::Int($a), Int::Int($b)) => { let $wrap = Int::Int; $body }
            (Int::U8($a), Int::U8($b)) => { let $wrap = Int::U8; $body }
            (Int::U16($a), Int::U16($b)) => { let $wrap = Int::U16; $body }
            (Int::U32($a), Int::U32($b)) => { let $wrap = Int::U32; $body }
            (Int::U64($a), Int::U64($b)) => { let $wrap = Int::U64; $body }
            (Int::Uint($a), Int::Uint($b)) => { let $wrap = Int::Uint; $body }
            (Int::Uintptr($a), Int::Uintptr($b)) => { let $wrap = Int::Uintptr; $body }
            _ => $mismatch,
        }
    };
}

/// Applies `$body` to the raw integer and re-wraps it at the same width.
macro_rules! map_int {
    ($value:expr, |$a:ident| $body:expr) => {
        match $value {
            Int::I8($a) => Int::I8($body),
            Int::I16($a) => Int::I16($body),
            Int::I32($a) => Int::I32($body),
            Int::I64($a) => Int::I64($body),
            Int::Int($a) => Int::Int($body),
            Int::U8($a) => Int::U8($body),
            Int::U16($a) => Int::U16($body),
            Int::U32($a) => Int::U32($body),
            Int::U64($a) => Int::U64($body),
            Int::Uint($a) => Int::Uint($body),
            Int::Uintptr($a) => Int::Uintptr($body),
        }
    };
}

impl BinaryEval for BinOp {
    fn eval(&self, left: Value, right: Value) -> Result<Value, ErrorKind> {
        let mismatch = |left: &Value, right: &Value| ErrorKind::TypeMismatch {
            op: self.to_string(),
            left: left.type_name(),
            right: right.type_name(),
        };
        match (&left, &right) {
            (Value::Int(l), Value::Int(r)) => with_same_int!(
                *l,
                *r,
                Err(mismatch(&left, &right)),
                |a, b, wrap| eval_int_binop(*self, a, b, wrap)
            ),
            (Value::Float(Float::F32(l)), Value::Float(Float::F32(r))) => {
                eval_float_binop(*self, *l, *r, Float::F32)
            }
            (Value::Float(Float::F64(l)), Value::Float(Float::F64(r))) => {
                eval_float_binop(*self, *l, *r, Float::F64)
            }
            (Value::Str(l), Value::Str(r)) => eval_str_binop(*self, l, r),
            (Value::Bool(l), Value::Bool(r)) => {
                eval_equality(*self, l, r).ok_or_else(|| invalid_binop(*self, &left))
            }
            (Value::Addr(l), Value::Addr(r)) => {
                eval_equality(*self, l, r).ok_or_else(|| invalid_binop(*self, &left))
            }
            _ => Err(mismatch(&left, &right)),
        }
    }
}

impl UnaryEval for UnOp {
    fn eval(&self, operand: Value) -> Result<Value, ErrorKind> {
        match (self, operand) {
            (UnOp::Deref, Value::Addr(addr)) => memory::read_addr(&addr),
            (UnOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (UnOp::Neg, Value::Int(i)) => Ok(Value::Int(map_int!(i, |v| v.wrapping_neg()))),
            (UnOp::Neg, Value::Float(Float::F32(v))) => Ok(Value::Float(Float::F32(-v))),
            (UnOp::Neg, Value::Float(Float::F64(v))) => Ok(Value::Float(Float::F64(-v))),
            (UnOp::Complement, Value::Int(i)) => Ok(Value::Int(map_int!(i, |v| !v))),
            (op, operand) => Err(ErrorKind::InvalidUnaryOp {
                op: op.to_string(),
                operand: operand.type_name(),
            }),
        }
    }
}

fn invalid_binop(op: BinOp, operand: &Value) -> ErrorKind {
    ErrorKind::InvalidBinaryOp {
        op: op.to_string(),
        operand: operand.type_name(),
    }
}

/// Evaluates `==`/`!=`/ordering operators; `None` for any other operator.
fn eval_comparison<T: PartialOrd + ?Sized>(op: BinOp, left: &T, right: &T) -> Option<Value> {
    let result = match op {
        BinOp::Eql => left == right,
        BinOp::Neq => left != right,
        BinOp::Lss => left < right,
        BinOp::Leq => left <= right,
        BinOp::Gtr => left > right,
        BinOp::Geq => left >= right,
        _ => return None,
    };
    Some(Value::Bool(result))
}

/// Evaluates `==`/`!=` only.
fn eval_equality<T: PartialEq>(op: BinOp, left: &T, right: &T) -> Option<Value> {
    match op {
        BinOp::Eql => Some(Value::Bool(left == right)),
        BinOp::Neq => Some(Value::Bool(left != right)),
        _ => None,
    }
}

/// Evaluates a binary operation on two integers of one width.
///
/// Arithmetic wraps around at the operand width. For signed types,
/// `MIN / -1` yields `MIN` and `MIN % -1` yields `0`.
fn eval_int_binop<T>(op: BinOp, left: T, right: T, wrap: fn(T) -> Int) -> Result<Value, ErrorKind>
where
    T: PrimInt + WrappingAdd + WrappingSub + WrappingMul + CheckedRem,
{
    let int = |v: T| Ok(Value::Int(wrap(v)));
    match op {
        BinOp::Add => int(left.wrapping_add(&right)),
        BinOp::Sub => int(left.wrapping_sub(&right)),
        BinOp::Mul => int(left.wrapping_mul(&right)),
        BinOp::Quo => {
            if right.is_zero() {
                return Err(ErrorKind::DivisionByZero);
            }
            // Only MIN / -1 overflows, and it wraps back to MIN.
            int(left.checked_div(&right).unwrap_or(left))
        }
        BinOp::Rem => {
            if right.is_zero() {
                return Err(ErrorKind::DivisionByZero);
            }
            int(left.checked_rem(&right).unwrap_or_else(T::zero))
        }
        BinOp::And => int(left & right),
        BinOp::Or => int(left | right),
        BinOp::Xor => int(left ^ right),
        BinOp::AndNot => int(left & !right),
        _ => eval_comparison(op, &left, &right).ok_or_else(|| ErrorKind::InvalidBinaryOp {
            op: op.to_string(),
            operand: wrap(left).ty().name().to_string(),
        }),
    }
}

/// Evaluates a binary operation on two floats of one width, with IEEE-754
/// semantics for division by zero.
fn eval_float_binop<T>(op: BinOp, left: T, right: T, wrap: fn(T) -> Float) -> Result<Value, ErrorKind>
where
    T: num_traits::Float,
{
    let float = |v: T| Ok(Value::Float(wrap(v)));
    match op {
        BinOp::Add => float(left + right),
        BinOp::Sub => float(left - right),
        BinOp::Mul => float(left * right),
        BinOp::Quo => float(left / right),
        _ => eval_comparison(op, &left, &right).ok_or_else(|| ErrorKind::InvalidBinaryOp {
            op: op.to_string(),
            operand: wrap(left).ty().name().to_string(),
        }),
    }
}

fn eval_str_binop(op: BinOp, left: &str, right: &str) -> Result<Value, ErrorKind> {
    match op {
        BinOp::Add => Ok(Value::Str(format!("{left}{right}").into())),
        _ => eval_comparison(op, left, right).ok_or_else(|| ErrorKind::InvalidBinaryOp {
            op: op.to_string(),
            operand: "string".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Addr;

    fn int(v: i64) -> Value {
        Value::Int(Int::Int(v))
    }

    #[test]
    fn test_int_binary_operations() {
        assert_eq!(BinOp::Add.eval(int(5), int(3)).unwrap(), int(8));
        assert_eq!(BinOp::Sub.eval(int(5), int(3)).unwrap(), int(2));
        assert_eq!(BinOp::Mul.eval(int(5), int(3)).unwrap(), int(15));
        assert_eq!(BinOp::Quo.eval(int(-7), int(2)).unwrap(), int(-3));
        assert_eq!(BinOp::Rem.eval(int(-7), int(2)).unwrap(), int(-1));
    }

    #[test]
    fn test_uint32_division() {
        let seven = Value::Int(Int::U32(7));
        assert_eq!(
            BinOp::Quo.eval(seven.clone(), Value::Int(Int::U32(2))).unwrap(),
            Value::Int(Int::U32(3))
        );
        assert_eq!(
            BinOp::Quo.eval(seven, Value::Int(Int::U32(0))),
            Err(ErrorKind::DivisionByZero)
        );
    }

    #[test]
    fn test_remainder_by_zero() {
        assert_eq!(
            BinOp::Rem.eval(Value::Int(Int::I8(1)), Value::Int(Int::I8(0))),
            Err(ErrorKind::DivisionByZero)
        );
    }

    #[test]
    fn test_int_wraparound() {
        assert_eq!(
            BinOp::Add
                .eval(Value::Int(Int::U8(250)), Value::Int(Int::U8(10)))
                .unwrap(),
            Value::Int(Int::U8(4))
        );
        assert_eq!(
            BinOp::Sub
                .eval(Value::Int(Int::U32(0)), Value::Int(Int::U32(1)))
                .unwrap(),
            Value::Int(Int::U32(u32::MAX))
        );
        assert_eq!(
            BinOp::Quo
                .eval(Value::Int(Int::I32(i32::MIN)), Value::Int(Int::I32(-1)))
                .unwrap(),
            Value::Int(Int::I32(i32::MIN))
        );
        assert_eq!(
            BinOp::Rem
                .eval(Value::Int(Int::I32(i32::MIN)), Value::Int(Int::I32(-1)))
                .unwrap(),
            Value::Int(Int::I32(0))
        );
    }

    #[test]
    fn test_bitwise_operations() {
        let a = Value::Int(Int::U8(0b1100));
        let b = Value::Int(Int::U8(0b1010));
        assert_eq!(BinOp::And.eval(a.clone(), b.clone()).unwrap(), Value::Int(Int::U8(0b1000)));
        assert_eq!(BinOp::Or.eval(a.clone(), b.clone()).unwrap(), Value::Int(Int::U8(0b1110)));
        assert_eq!(BinOp::Xor.eval(a.clone(), b.clone()).unwrap(), Value::Int(Int::U8(0b0110)));
        assert_eq!(BinOp::AndNot.eval(a, b).unwrap(), Value::Int(Int::U8(0b0100)));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(BinOp::Lss.eval(int(1), int(2)).unwrap(), Value::Bool(true));
        assert_eq!(BinOp::Geq.eval(int(1), int(2)).unwrap(), Value::Bool(false));
        assert_eq!(BinOp::Eql.eval(int(2), int(2)).unwrap(), Value::Bool(true));
        assert_eq!(
            BinOp::Gtr
                .eval(Value::Str("b".into()), Value::Str("a".into()))
                .unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_type_mismatch() {
        let result = BinOp::Add.eval(Value::Int(Int::I32(1)), Value::Int(Int::I64(1)));
        assert_eq!(
            result,
            Err(ErrorKind::TypeMismatch {
                op: "+".to_string(),
                left: "int32".to_string(),
                right: "int64".to_string(),
            })
        );
        assert!(matches!(
            BinOp::Eql.eval(Value::Bool(true), int(1)),
            Err(ErrorKind::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_float_operations() {
        let x = Value::Float(Float::F64(1.5));
        let y = Value::Float(Float::F64(0.5));
        assert_eq!(
            BinOp::Add.eval(x.clone(), y.clone()).unwrap(),
            Value::Float(Float::F64(2.0))
        );
        assert_eq!(BinOp::Lss.eval(y.clone(), x.clone()).unwrap(), Value::Bool(true));
        assert_eq!(
            BinOp::Quo.eval(x.clone(), Value::Float(Float::F64(0.0))).unwrap(),
            Value::Float(Float::F64(f64::INFINITY))
        );
        assert!(matches!(
            BinOp::Rem.eval(x.clone(), y.clone()),
            Err(ErrorKind::InvalidBinaryOp { .. })
        ));
        assert!(matches!(
            BinOp::And.eval(x, y),
            Err(ErrorKind::InvalidBinaryOp { .. })
        ));
    }

    #[test]
    fn test_string_operations() {
        assert_eq!(
            BinOp::Add
                .eval(Value::Str("answer".into()), Value::Str(":".into()))
                .unwrap(),
            Value::Str("answer:".into())
        );
        assert!(matches!(
            BinOp::Sub.eval(Value::Str("a".into()), Value::Str("b".into())),
            Err(ErrorKind::InvalidBinaryOp { .. })
        ));
    }

    #[test]
    fn test_bool_supports_only_equality() {
        assert_eq!(
            BinOp::Neq.eval(Value::Bool(true), Value::Bool(false)).unwrap(),
            Value::Bool(true)
        );
        assert!(matches!(
            BinOp::Lss.eval(Value::Bool(true), Value::Bool(false)),
            Err(ErrorKind::InvalidBinaryOp { .. })
        ));
        assert!(BinOp::And.eval(Value::Bool(true), Value::Bool(false)).is_err());
    }

    #[test]
    fn test_addr_equality() {
        let a = Addr::new(int(1));
        assert_eq!(
            BinOp::Eql
                .eval(Value::Addr(a.clone()), Value::Addr(a.clone()))
                .unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            BinOp::Eql
                .eval(Value::Addr(a), Value::Addr(Addr::null()))
                .unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_unary_operations() {
        assert_eq!(UnOp::Neg.eval(int(5)).unwrap(), int(-5));
        assert_eq!(
            UnOp::Neg.eval(Value::Int(Int::U8(1))).unwrap(),
            Value::Int(Int::U8(255))
        );
        assert_eq!(
            UnOp::Neg.eval(Value::Float(Float::F32(2.5))).unwrap(),
            Value::Float(Float::F32(-2.5))
        );
        assert_eq!(UnOp::Not.eval(Value::Bool(true)).unwrap(), Value::Bool(false));
        assert_eq!(
            UnOp::Complement.eval(Value::Int(Int::U8(0b1111_0000))).unwrap(),
            Value::Int(Int::U8(0b0000_1111))
        );
    }

    #[test]
    fn test_invalid_unary_operations() {
        assert!(matches!(
            UnOp::Complement.eval(Value::Float(Float::F64(1.0))),
            Err(ErrorKind::InvalidUnaryOp { .. })
        ));
        assert!(matches!(
            UnOp::Not.eval(int(1)),
            Err(ErrorKind::InvalidUnaryOp { .. })
        ));
        assert!(matches!(
            UnOp::Deref.eval(int(1)),
            Err(ErrorKind::InvalidUnaryOp { .. })
        ));
    }

    #[test]
    fn test_deref() {
        let addr = Addr::new(Value::Str("cell".into()));
        assert_eq!(
            UnOp::Deref.eval(Value::Addr(addr)).unwrap(),
            Value::Str("cell".into())
        );
        assert_eq!(
            UnOp::Deref.eval(Value::Addr(Addr::null())),
            Err(ErrorKind::NilDereference)
        );
    }
}
