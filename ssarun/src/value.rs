use crate::memory::Cell;
use crate::ty::{FloatTy, IntTy};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Runtime values that can be stored and manipulated by the interpreter.
///
/// Every variant corresponds to one family of declared types. The interpreter
/// never converts between variants implicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(Int),
    Float(Float),
    Str(Rc<str>),
    Addr(Addr),
    /// Result of a function that returns nothing.
    Unit,
}

/// Integer value tagged with its width and signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Int {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Int(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Uint(u64),
    Uintptr(u64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Float {
    F32(f32),
    F64(f64),
}

/// Reference to a mutable cell, or null.
///
/// Two addresses are equal when they refer to the same cell.
#[derive(Debug, Clone, Default)]
pub struct Addr(Option<Cell>);

impl Value {
    /// Name of the value's type, used in diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            Value::Bool(_) => "bool".to_string(),
            Value::Int(i) => i.ty().name().to_string(),
            Value::Float(f) => f.ty().name().to_string(),
            Value::Str(_) => "string".to_string(),
            Value::Addr(_) => "pointer".to_string(),
            Value::Unit => "()".to_string(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<Int> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_addr(&self) -> Option<&Addr> {
        match self {
            Value::Addr(addr) => Some(addr),
            _ => None,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    /// Whether both values have the same variant and, for numbers, width.
    pub fn same_type(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.ty() == b.ty(),
            (Value::Float(a), Value::Float(b)) => a.ty() == b.ty(),
            (Value::Bool(_), Value::Bool(_))
            | (Value::Str(_), Value::Str(_))
            | (Value::Addr(_), Value::Addr(_))
            | (Value::Unit, Value::Unit) => true,
            _ => false,
        }
    }
}

impl Int {
    pub fn ty(&self) -> IntTy {
        match self {
            Int::I8(_) => IntTy::I8,
            Int::I16(_) => IntTy::I16,
            Int::I32(_) => IntTy::I32,
            Int::I64(_) => IntTy::I64,
            Int::Int(_) => IntTy::Int,
            Int::U8(_) => IntTy::U8,
            Int::U16(_) => IntTy::U16,
            Int::U32(_) => IntTy::U32,
            Int::U64(_) => IntTy::U64,
            Int::Uint(_) => IntTy::Uint,
            Int::Uintptr(_) => IntTy::Uintptr,
        }
    }

    /// Widens to `i128`, which holds every supported width losslessly.
    pub fn to_i128(&self) -> i128 {
        match *self {
            Int::I8(v) => v.into(),
            Int::I16(v) => v.into(),
            Int::I32(v) => v.into(),
            Int::I64(v) | Int::Int(v) => v.into(),
            Int::U8(v) => v.into(),
            Int::U16(v) => v.into(),
            Int::U32(v) => v.into(),
            Int::U64(v) | Int::Uint(v) | Int::Uintptr(v) => v.into(),
        }
    }
}

impl Float {
    pub fn ty(&self) -> FloatTy {
        match self {
            Float::F32(_) => FloatTy::F32,
            Float::F64(_) => FloatTy::F64,
        }
    }
}

impl Addr {
    pub fn null() -> Self {
        Self(None)
    }

    /// Allocates a fresh cell holding `value`.
    pub fn new(value: Value) -> Self {
        Self(Some(Rc::new(RefCell::new(value))))
    }

    pub fn from_cell(cell: Cell) -> Self {
        Self(Some(cell))
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn cell(&self) -> Option<&Cell> {
        self.0.as_ref()
    }
}

impl PartialEq for Addr {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::Addr(addr) => write!(f, "{addr}"),
            Value::Unit => f.write_str("()"),
        }
    }
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_i128())
    }
}

impl fmt::Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (scientific, plain) = match *self {
            Float::F32(v) if v.is_infinite() => return f.write_str(inf_text(v > 0.0)),
            Float::F64(v) if v.is_infinite() => return f.write_str(inf_text(v > 0.0)),
            Float::F32(v) => (format!("{v:e}"), v.to_string()),
            Float::F64(v) => (format!("{v:e}"), v.to_string()),
        };
        // Shortest digits; exponent form once the decimal exponent leaves [-4, 6).
        let split = scientific
            .split_once('e')
            .and_then(|(mantissa, exp)| Some((mantissa, exp.parse::<i32>().ok()?)));
        match split {
            Some((mantissa, exp)) if !(-4..6).contains(&exp) => {
                let sign = if exp < 0 { '-' } else { '+' };
                write!(f, "{mantissa}e{sign}{:02}", exp.unsigned_abs())
            }
            _ => f.write_str(&plain),
        }
    }
}

fn inf_text(positive: bool) -> &'static str {
    if positive { "+Inf" } else { "-Inf" }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(cell) => write!(f, "{:#x}", Rc::as_ptr(cell) as usize),
            None => f.write_str("<nil>"),
        }
    }
}
