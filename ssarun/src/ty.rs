//! Declared IR types and their zero values.
use crate::error::ErrorKind;
use crate::value::{Addr, Float, Int, Value};
use std::fmt;

/// Integer widths and signedness.
///
/// The native `int`/`uint`/`uintptr` types are 64 bits wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntTy {
    I8,
    I16,
    I32,
    I64,
    Int,
    U8,
    U16,
    U32,
    U64,
    Uint,
    Uintptr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatTy {
    F32,
    F64,
}

/// Kinds of untyped constants, resolved to a default type before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UntypedKind {
    Bool,
    Int,
    Rune,
    Float,
    String,
    Nil,
}

/// A declared type as produced by the front-end.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Int(IntTy),
    Float(FloatTy),
    /// Complex numbers are declarable but have no runtime representation.
    Complex(FloatTy),
    Str,
    Pointer(Box<Type>),
    Untyped(UntypedKind),
}

impl IntTy {
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            IntTy::I8 | IntTy::I16 | IntTy::I32 | IntTy::I64 | IntTy::Int
        )
    }

    /// Width in bits.
    pub fn bits(self) -> u32 {
        match self {
            IntTy::I8 | IntTy::U8 => 8,
            IntTy::I16 | IntTy::U16 => 16,
            IntTy::I32 | IntTy::U32 => 32,
            IntTy::I64 | IntTy::Int | IntTy::U64 | IntTy::Uint | IntTy::Uintptr => 64,
        }
    }

    /// Wraps `raw` to this width with two's-complement truncation.
    pub fn truncate(self, raw: i128) -> Int {
        match self {
            IntTy::I8 => Int::I8(raw as i8),
            IntTy::I16 => Int::I16(raw as i16),
            IntTy::I32 => Int::I32(raw as i32),
            IntTy::I64 => Int::I64(raw as i64),
            IntTy::Int => Int::Int(raw as i64),
            IntTy::U8 => Int::U8(raw as u8),
            IntTy::U16 => Int::U16(raw as u16),
            IntTy::U32 => Int::U32(raw as u32),
            IntTy::U64 => Int::U64(raw as u64),
            IntTy::Uint => Int::Uint(raw as u64),
            IntTy::Uintptr => Int::Uintptr(raw as u64),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntTy::I8 => "int8",
            IntTy::I16 => "int16",
            IntTy::I32 => "int32",
            IntTy::I64 => "int64",
            IntTy::Int => "int",
            IntTy::U8 => "uint8",
            IntTy::U16 => "uint16",
            IntTy::U32 => "uint32",
            IntTy::U64 => "uint64",
            IntTy::Uint => "uint",
            IntTy::Uintptr => "uintptr",
        }
    }
}

impl FloatTy {
    pub fn name(self) -> &'static str {
        match self {
            FloatTy::F32 => "float32",
            FloatTy::F64 => "float64",
        }
    }

    pub fn from_f64(self, raw: f64) -> Float {
        match self {
            FloatTy::F32 => Float::F32(raw as f32),
            FloatTy::F64 => Float::F64(raw),
        }
    }
}

impl Type {
    pub fn pointer_to(elem: Type) -> Type {
        Type::Pointer(Box::new(elem))
    }

    /// Resolves untyped kinds to their default type. Untyped nil has none and
    /// stays as it is.
    pub fn defaulted(&self) -> Type {
        match self {
            Type::Untyped(UntypedKind::Bool) => Type::Bool,
            Type::Untyped(UntypedKind::Int) => Type::Int(IntTy::Int),
            Type::Untyped(UntypedKind::Rune) => Type::Int(IntTy::I32),
            Type::Untyped(UntypedKind::Float) => Type::Float(FloatTy::F64),
            Type::Untyped(UntypedKind::String) => Type::Str,
            other => other.clone(),
        }
    }

    /// Produces the canonical zero for this type.
    pub fn zero_value(&self) -> Result<Value, ErrorKind> {
        match self.defaulted() {
            Type::Bool => Ok(Value::Bool(false)),
            Type::Int(ity) => Ok(Value::Int(ity.truncate(0))),
            Type::Float(fty) => Ok(Value::Float(fty.from_f64(0.0))),
            Type::Str => Ok(Value::Str("".into())),
            Type::Pointer(_) => Ok(Value::Addr(Addr::null())),
            ty @ (Type::Complex(_) | Type::Untyped(_)) => {
                Err(ErrorKind::NoZeroValue(ty.to_string()))
            }
        }
    }

    /// Whether a runtime value may occupy a slot of this type.
    pub fn admits(&self, value: &Value) -> bool {
        match (self.defaulted(), value) {
            (Type::Bool, Value::Bool(_)) => true,
            (Type::Int(ity), Value::Int(i)) => ity == i.ty(),
            (Type::Float(fty), Value::Float(f)) => fty == f.ty(),
            (Type::Str, Value::Str(_)) => true,
            (Type::Pointer(_), Value::Addr(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Int(ity) => f.write_str(ity.name()),
            Type::Float(fty) => f.write_str(fty.name()),
            Type::Complex(FloatTy::F32) => f.write_str("complex64"),
            Type::Complex(FloatTy::F64) => f.write_str("complex128"),
            Type::Str => f.write_str("string"),
            Type::Pointer(elem) => write!(f, "*{elem}"),
            Type::Untyped(kind) => {
                let name = match kind {
                    UntypedKind::Bool => "bool",
                    UntypedKind::Int => "int",
                    UntypedKind::Rune => "rune",
                    UntypedKind::Float => "float",
                    UntypedKind::String => "string",
                    UntypedKind::Nil => "nil",
                };
                write!(f, "untyped {name}")
            }
        }
    }
}
