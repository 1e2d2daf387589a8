//! Interpreter failure kinds.
//!
//! Every failure is fatal for the current call chain. Helpers that do not know
//! which instruction they serve return a bare [`ErrorKind`]; the engine attaches
//! the instruction location before the error leaves it.

use crate::ir::BlockId;
use std::fmt;
use thiserror::Error;

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    #[error("nil pointer dereference")]
    NilDereference,
    #[error("type mismatch in {op}: {left} and {right}")]
    TypeMismatch {
        op: String,
        left: String,
        right: String,
    },
    #[error("integer division by zero")]
    DivisionByZero,
    #[error("no value bound for %{0}")]
    UnboundValue(usize),
    #[error("unknown global `{0}`")]
    UnknownGlobal(String),
    #[error("unknown builtin `{0}`")]
    UnknownBuiltin(String),
    #[error("no phi edge for predecessor {0}")]
    PhiResolutionFailure(String),
    #[error("function `{function}` expects {expected} arguments, got {got}")]
    ArityError {
        function: String,
        expected: usize,
        got: usize,
    },
    #[error("argument `{param}` of `{function}` expects {expected}, got {got}")]
    ArgumentType {
        function: String,
        param: String,
        expected: String,
        got: String,
    },
    #[error("multi-value return is not supported ({0} results)")]
    MultiReturnUnsupported(usize),
    #[error("unsupported constant: {0}")]
    UnsupportedConstantKind(String),
    #[error("type `{0}` has no zero value")]
    NoZeroValue(String),
    #[error("invalid unary operation {op} on {operand}")]
    InvalidUnaryOp { op: String, operand: String },
    #[error("invalid binary operation {op} on {operand}")]
    InvalidBinaryOp { op: String, operand: String },
    #[error("unknown function #{0}")]
    UnknownFunction(u32),
    #[error("unknown block {0}")]
    UnknownBlock(BlockId),
    #[error("block {0} ends without a terminator")]
    MissingTerminator(BlockId),
    #[error("unsupported instruction: {0}")]
    UnsupportedInstruction(String),
    #[error("native `{name}` failed: {message}")]
    NativeFailure { name: String, message: String },
    #[error("output error: {0}")]
    Output(String),
}

/// Identifies the instruction that raised an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrLoc {
    pub function: String,
    pub block: BlockId,
    pub index: usize,
}

impl fmt::Display for InstrLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}[{}]", self.function, self.block, self.index)
    }
}

/// An interpreter error: the failure kind plus where it happened, when known.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct InterpError {
    kind: ErrorKind,
    location: Option<InstrLoc>,
}

impl fmt::Display for InterpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{} (at {loc})", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl InterpError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    pub fn at(kind: ErrorKind, location: InstrLoc) -> Self {
        Self {
            kind,
            location: Some(location),
        }
    }

    /// Attaches `location` unless the error already carries one, which is the
    /// case for errors raised inside a nested call.
    pub fn located(mut self, location: impl FnOnce() -> InstrLoc) -> Self {
        if self.location.is_none() {
            self.location = Some(location());
        }
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn location(&self) -> Option<&InstrLoc> {
        self.location.as_ref()
    }
}

impl From<ErrorKind> for InterpError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_location() {
        let err = InterpError::at(
            ErrorKind::DivisionByZero,
            InstrLoc {
                function: "main".to_string(),
                block: BlockId(2),
                index: 3,
            },
        );
        assert_eq!(err.to_string(), "integer division by zero (at main:b2[3])");
    }

    #[test]
    fn test_display_without_location() {
        let err = InterpError::from(ErrorKind::UnknownGlobal("main.i".to_string()));
        assert_eq!(err.to_string(), "unknown global `main.i`");
        assert!(err.location().is_none());
    }

    #[test]
    fn test_located_keeps_innermost_location() {
        let inner = InstrLoc {
            function: "fib".to_string(),
            block: BlockId(1),
            index: 0,
        };
        let outer = InstrLoc {
            function: "main".to_string(),
            block: BlockId(0),
            index: 4,
        };
        let err = InterpError::new(ErrorKind::DivisionByZero).located(|| inner.clone());
        let err = err.located(|| outer);
        assert_eq!(err.location(), Some(&inner));
    }
}
