//! The SSA program model consumed by the interpreter.
//!
//! A [`Program`] is produced by an external front-end and is never mutated
//! during execution. Functions own an arena of [`BasicBlock`]s addressed by
//! [`BlockId`]; control-flow edges are stored as ID lists. Every SSA value of a
//! function is numbered by a [`ValueId`]: parameters take the first IDs in
//! declaration order, followed by instruction results.

pub mod builder;
pub mod verify;

use crate::error::ErrorKind;
use crate::ty::Type;
use crate::value::{Addr, Value};
use std::collections::HashMap;
use std::fmt;

/// Identifies a function within a [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FuncId(pub u32);

/// Identifies a basic block within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub usize);

/// Identifies an SSA value within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueId(pub usize);

/// Identifies a global variable within a [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlobalId(pub usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
    function_ids: HashMap<String, FuncId>,
}

/// A package-level variable. `ty` is the type of the stored value; the
/// global itself evaluates to the address of its cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    /// Empty for external declarations, which the host implements.
    pub blocks: Vec<BasicBlock>,
    pub entry: BlockId,
    /// Number of SSA values, parameters included.
    pub value_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub id: BlockId,
    pub instrs: Vec<Instruction>,
    pub preds: Vec<BlockId>,
    pub succs: Vec<BlockId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The SSA value this instruction defines, if any.
    pub dest: Option<ValueId>,
    pub kind: InstrKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstrKind {
    Store {
        addr: Operand,
        value: Operand,
    },
    UnaryOp {
        op: UnOp,
        x: Operand,
    },
    BinaryOp {
        op: BinOp,
        x: Operand,
        y: Operand,
    },
    Call {
        callee: Callee,
        args: Vec<Operand>,
    },
    /// Type conversion. Not executable; the interpreter rejects it.
    Convert {
        ty: Type,
        x: Operand,
    },
    Phi {
        edges: Vec<PhiEdge>,
    },
    Return {
        results: Vec<Operand>,
    },
    Branch {
        cond: Operand,
        then_block: BlockId,
        else_block: BlockId,
    },
    Jump {
        target: BlockId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhiEdge {
    pub pred: BlockId,
    pub value: Operand,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(ValueId),
    Const(Constant),
    Global(GlobalId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Callee {
    Function(FuncId),
    Builtin(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    /// Logical not.
    Not,
    /// Arithmetic negation.
    Neg,
    /// Bitwise complement.
    Complement,
    /// Load through an address.
    Deref,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    AndNot,
    Eql,
    Neq,
    Lss,
    Leq,
    Gtr,
    Geq,
}

/// A typed literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub ty: Type,
    pub lit: Literal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
    Nil,
    Complex(f64, f64),
}

impl Program {
    pub fn new(globals: Vec<Global>, functions: Vec<Function>) -> Self {
        let function_ids = functions
            .iter()
            .enumerate()
            .map(|(idx, func)| (func.name.clone(), FuncId(idx as u32)))
            .collect();
        Self {
            globals,
            functions,
            function_ids,
        }
    }

    pub fn function(&self, id: FuncId) -> Option<&Function> {
        self.functions.get(id.0 as usize)
    }

    pub fn function_id(&self, name: &str) -> Option<FuncId> {
        self.function_ids.get(name).copied()
    }

    pub fn global(&self, id: GlobalId) -> Option<&Global> {
        self.globals.get(id.0)
    }
}

impl Global {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl Function {
    pub fn is_external(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.0)
    }

    /// SSA value bound to the `idx`-th parameter.
    pub fn param_value(&self, idx: usize) -> ValueId {
        ValueId(idx)
    }
}

impl InstrKind {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstrKind::Return { .. } | InstrKind::Branch { .. } | InstrKind::Jump { .. }
        )
    }

    /// Blocks this instruction may transfer control to.
    pub fn targets(&self) -> Vec<BlockId> {
        match self {
            InstrKind::Branch {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            InstrKind::Jump { target } => vec![*target],
            _ => Vec::new(),
        }
    }

    /// Operands read by this instruction.
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            InstrKind::Store { addr, value } => vec![addr, value],
            InstrKind::UnaryOp { x, .. } | InstrKind::Convert { x, .. } => vec![x],
            InstrKind::BinaryOp { x, y, .. } => vec![x, y],
            InstrKind::Call { args, .. } => args.iter().collect(),
            InstrKind::Phi { edges } => edges.iter().map(|edge| &edge.value).collect(),
            InstrKind::Return { results } => results.iter().collect(),
            InstrKind::Branch { cond, .. } => vec![cond],
            InstrKind::Jump { .. } => Vec::new(),
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            InstrKind::Store { .. } => "store",
            InstrKind::UnaryOp { .. } => "unop",
            InstrKind::BinaryOp { .. } => "binop",
            InstrKind::Call { .. } => "call",
            InstrKind::Convert { .. } => "convert",
            InstrKind::Phi { .. } => "phi",
            InstrKind::Return { .. } => "return",
            InstrKind::Branch { .. } => "if",
            InstrKind::Jump { .. } => "jump",
        }
    }
}

impl Operand {
    pub fn bool(value: bool) -> Self {
        Operand::Const(Constant::new(Type::Bool, Literal::Bool(value)))
    }

    pub fn int(ty: crate::ty::IntTy, value: i128) -> Self {
        Operand::Const(Constant::new(Type::Int(ty), Literal::Int(value)))
    }

    pub fn float(ty: crate::ty::FloatTy, value: f64) -> Self {
        Operand::Const(Constant::new(Type::Float(ty), Literal::Float(value)))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Operand::Const(Constant::new(Type::Str, Literal::Str(value.into())))
    }
}

impl From<ValueId> for Operand {
    fn from(id: ValueId) -> Self {
        Operand::Value(id)
    }
}

impl From<GlobalId> for Operand {
    fn from(id: GlobalId) -> Self {
        Operand::Global(id)
    }
}

impl From<Constant> for Operand {
    fn from(constant: Constant) -> Self {
        Operand::Const(constant)
    }
}

impl Callee {
    pub fn builtin(name: impl Into<String>) -> Self {
        Callee::Builtin(name.into())
    }
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            UnOp::Not => "!",
            UnOp::Neg => "-",
            UnOp::Complement => "^",
            UnOp::Deref => "*",
        };
        f.write_str(token)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Quo => "/",
            BinOp::Rem => "%",
            BinOp::And => "&",
            BinOp::Or => "|",
            BinOp::Xor => "^",
            BinOp::AndNot => "&^",
            BinOp::Eql => "==",
            BinOp::Neq => "!=",
            BinOp::Lss => "<",
            BinOp::Leq => "<=",
            BinOp::Gtr => ">",
            BinOp::Geq => ">=",
        };
        f.write_str(token)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Float(x) => write!(f, "{x}"),
            Literal::Str(s) => write!(f, "{s:?}"),
            Literal::Nil => f.write_str("nil"),
            Literal::Complex(re, im) => write!(f, "({re}+{im}i)"),
        }
    }
}

impl Constant {
    pub fn new(ty: Type, lit: Literal) -> Self {
        Self { ty, lit }
    }

    /// Builds a constant of type `ty` from its literal text.
    pub fn parse(ty: Type, text: &str) -> Result<Self, ErrorKind> {
        let unsupported = || ErrorKind::UnsupportedConstantKind(format!("{text:?} as {ty}"));
        let lit = match ty.defaulted() {
            Type::Bool => Literal::Bool(text.parse().map_err(|_| unsupported())?),
            Type::Int(_) => Literal::Int(text.parse().map_err(|_| unsupported())?),
            Type::Float(_) => Literal::Float(text.parse().map_err(|_| unsupported())?),
            Type::Str => Literal::Str(text.to_string()),
            Type::Pointer(_) if text == "nil" => Literal::Nil,
            _ => return Err(unsupported()),
        };
        Ok(Self { ty, lit })
    }

    /// Converts the literal into a runtime value of its declared type,
    /// wrapping integers to the declared width.
    pub fn materialize(&self) -> Result<Value, ErrorKind> {
        let value = match (&self.lit, self.ty.defaulted()) {
            (Literal::Bool(b), Type::Bool) => Value::Bool(*b),
            (Literal::Int(n), Type::Int(ity)) => Value::Int(ity.truncate(*n)),
            (Literal::Int(n), Type::Float(fty)) => Value::Float(fty.from_f64(*n as f64)),
            (Literal::Int(n), Type::Str) => {
                // A rune converted to a one-character string.
                let ch = u32::try_from(*n)
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                Value::Str(ch.to_string().into())
            }
            (Literal::Float(x), Type::Float(fty)) => Value::Float(fty.from_f64(*x)),
            (Literal::Float(x), Type::Int(ity)) if x.is_finite() && x.fract() == 0.0 => {
                Value::Int(ity.truncate(*x as i128))
            }
            (Literal::Str(s), Type::Str) => Value::Str(s.as_str().into()),
            (Literal::Nil, Type::Pointer(_)) => Value::Addr(Addr::null()),
            (lit, ty) => {
                return Err(ErrorKind::UnsupportedConstantKind(format!("{lit} as {ty}")));
            }
        };
        Ok(value)
    }
}
