//! Structural checks on a [`Program`] before execution.
//!
//! The interpreter trusts its input to be well formed. Verification rejects
//! programs that would otherwise fail in the middle of a run because of a
//! malformed control-flow graph or SSA numbering, rather than because of the
//! values they compute.

use super::{BlockId, Callee, Function, InstrKind, Operand, Program, ValueId};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("function `{0}` is declared but never defined")]
    Undefined(String),
    #[error("{function}: entry block {entry} does not exist")]
    MissingEntry { function: String, entry: BlockId },
    #[error("{function}: block at index {index} is numbered {block}")]
    Misnumbered {
        function: String,
        index: usize,
        block: BlockId,
    },
    #[error("{function}: block {block} does not end with a terminator")]
    MissingTerminator { function: String, block: BlockId },
    #[error("{function}: block {block} has a terminator at position {index}")]
    EarlyTerminator {
        function: String,
        block: BlockId,
        index: usize,
    },
    #[error("{function}: block {block} targets unknown block {target}")]
    UnknownBlock {
        function: String,
        block: BlockId,
        target: BlockId,
    },
    #[error("{function}: control-flow edges of block {block} do not match its terminator")]
    EdgeMismatch { function: String, block: BlockId },
    #[error("{function}: phi in block {block} has an edge from non-predecessor {pred}")]
    PhiEdge {
        function: String,
        block: BlockId,
        pred: BlockId,
    },
    #[error("{function}: value {value} is defined more than once")]
    Redefined { function: String, value: ValueId },
    #[error("{function}: value {value} is outside the function's {count} values")]
    ValueOutOfRange {
        function: String,
        value: ValueId,
        count: usize,
    },
    #[error("{function}: reference to unknown global #{global}")]
    UnknownGlobal { function: String, global: usize },
    #[error("{function}: call to unknown function #{callee}")]
    UnknownFunction { function: String, callee: u32 },
    #[error("{function}: call to `{callee}` passes {got} arguments, expected {expected}")]
    Arity {
        function: String,
        callee: String,
        expected: usize,
        got: usize,
    },
    #[error("global `{0}` is declared more than once")]
    DuplicateGlobal(String),
    #[error("function `{0}` is declared more than once")]
    DuplicateFunction(String),
}

impl Program {
    /// Checks name uniqueness and every function body of the program.
    pub fn verify(&self) -> Result<(), VerifyError> {
        let mut globals = HashSet::new();
        if let Some(dup) = self.globals.iter().find(|g| !globals.insert(g.name.as_str())) {
            return Err(VerifyError::DuplicateGlobal(dup.name.clone()));
        }
        let mut functions = HashSet::new();
        if let Some(dup) = self.functions.iter().find(|f| !functions.insert(f.name.as_str())) {
            return Err(VerifyError::DuplicateFunction(dup.name.clone()));
        }

        for func in self.functions.iter().filter(|func| !func.is_external()) {
            FunctionVerifier { program: self, func }.verify()?;
        }
        Ok(())
    }
}

struct FunctionVerifier<'a> {
    program: &'a Program,
    func: &'a Function,
}

impl FunctionVerifier<'_> {
    fn name(&self) -> String {
        self.func.name.clone()
    }

    fn verify(&self) -> Result<(), VerifyError> {
        if self.func.block(self.func.entry).is_none() {
            return Err(VerifyError::MissingEntry {
                function: self.name(),
                entry: self.func.entry,
            });
        }
        self.verify_blocks()?;
        self.verify_edges()?;
        self.verify_values()
    }

    fn verify_blocks(&self) -> Result<(), VerifyError> {
        for (index, block) in self.func.blocks.iter().enumerate() {
            if block.id != BlockId(index) {
                return Err(VerifyError::Misnumbered {
                    function: self.name(),
                    index,
                    block: block.id,
                });
            }
            match block.instrs.last() {
                Some(last) if last.kind.is_terminator() => {}
                _ => {
                    return Err(VerifyError::MissingTerminator {
                        function: self.name(),
                        block: block.id,
                    });
                }
            }
            let body = &block.instrs[..block.instrs.len() - 1];
            if let Some(index) = body.iter().position(|instr| instr.kind.is_terminator()) {
                return Err(VerifyError::EarlyTerminator {
                    function: self.name(),
                    block: block.id,
                    index,
                });
            }
        }
        Ok(())
    }

    fn verify_edges(&self) -> Result<(), VerifyError> {
        for block in &self.func.blocks {
            let targets = block
                .instrs
                .last()
                .map(|instr| instr.kind.targets())
                .unwrap_or_default();
            for target in &targets {
                if self.func.block(*target).is_none() {
                    return Err(VerifyError::UnknownBlock {
                        function: self.name(),
                        block: block.id,
                        target: *target,
                    });
                }
            }
            if targets != block.succs {
                return Err(VerifyError::EdgeMismatch {
                    function: self.name(),
                    block: block.id,
                });
            }
            // Predecessors must be the inverse of successors.
            for pred in &block.preds {
                let linked = self
                    .func
                    .block(*pred)
                    .is_some_and(|p| p.succs.contains(&block.id));
                if !linked {
                    return Err(VerifyError::EdgeMismatch {
                        function: self.name(),
                        block: block.id,
                    });
                }
            }
            for succ in &block.succs {
                let linked = self
                    .func
                    .block(*succ)
                    .is_some_and(|s| s.preds.contains(&block.id));
                if !linked {
                    return Err(VerifyError::EdgeMismatch {
                        function: self.name(),
                        block: block.id,
                    });
                }
            }
        }
        Ok(())
    }

    fn verify_values(&self) -> Result<(), VerifyError> {
        let count = self.func.value_count;
        let mut defined: HashSet<ValueId> = (0..self.func.params.len()).map(ValueId).collect();
        if defined.len() > count {
            return Err(VerifyError::ValueOutOfRange {
                function: self.name(),
                value: ValueId(defined.len() - 1),
                count,
            });
        }

        for block in &self.func.blocks {
            for instr in &block.instrs {
                if let Some(dest) = instr.dest {
                    if dest.0 >= count {
                        return Err(VerifyError::ValueOutOfRange {
                            function: self.name(),
                            value: dest,
                            count,
                        });
                    }
                    if !defined.insert(dest) {
                        return Err(VerifyError::Redefined {
                            function: self.name(),
                            value: dest,
                        });
                    }
                }
                for operand in instr.kind.operands() {
                    self.verify_operand(operand)?;
                }
                match &instr.kind {
                    InstrKind::Phi { edges } => {
                        if let Some(edge) = edges.iter().find(|e| !block.preds.contains(&e.pred)) {
                            return Err(VerifyError::PhiEdge {
                                function: self.name(),
                                block: block.id,
                                pred: edge.pred,
                            });
                        }
                    }
                    InstrKind::Call {
                        callee: Callee::Function(id),
                        args,
                    } => {
                        let callee = self.program.function(*id).ok_or_else(|| {
                            VerifyError::UnknownFunction {
                                function: self.name(),
                                callee: id.0,
                            }
                        })?;
                        if !callee.is_external() && callee.params.len() != args.len() {
                            return Err(VerifyError::Arity {
                                function: self.name(),
                                callee: callee.name.clone(),
                                expected: callee.params.len(),
                                got: args.len(),
                            });
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn verify_operand(&self, operand: &Operand) -> Result<(), VerifyError> {
        match operand {
            Operand::Value(id) if id.0 >= self.func.value_count => {
                Err(VerifyError::ValueOutOfRange {
                    function: self.name(),
                    value: *id,
                    count: self.func.value_count,
                })
            }
            Operand::Global(id) if self.program.global(*id).is_none() => {
                Err(VerifyError::UnknownGlobal {
                    function: self.name(),
                    global: id.0,
                })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::ProgramBuilder;
    use crate::ir::{BasicBlock, GlobalId, Instruction, Param};
    use crate::ty::{IntTy, Type};

    fn single_block(instrs: Vec<Instruction>, value_count: usize) -> Program {
        let func = Function {
            name: "main".to_string(),
            params: Vec::new(),
            blocks: vec![BasicBlock {
                id: BlockId(0),
                instrs,
                preds: Vec::new(),
                succs: Vec::new(),
            }],
            entry: BlockId(0),
            value_count,
        };
        Program::new(Vec::new(), vec![func])
    }

    fn ret() -> Instruction {
        Instruction {
            dest: None,
            kind: InstrKind::Return {
                results: Vec::new(),
            },
        }
    }

    #[test]
    fn test_missing_terminator() {
        let program = single_block(Vec::new(), 0);
        assert!(matches!(
            program.verify(),
            Err(VerifyError::MissingTerminator { .. })
        ));
    }

    #[test]
    fn test_early_terminator() {
        let program = single_block(vec![ret(), ret()], 0);
        assert!(matches!(
            program.verify(),
            Err(VerifyError::EarlyTerminator { index: 0, .. })
        ));
    }

    #[test]
    fn test_redefined_value() {
        let neg = |x: i128| Instruction {
            dest: Some(ValueId(0)),
            kind: InstrKind::UnaryOp {
                op: crate::ir::UnOp::Neg,
                x: Operand::int(IntTy::Int, x),
            },
        };
        let program = single_block(vec![neg(1), neg(2), ret()], 1);
        assert!(matches!(
            program.verify(),
            Err(VerifyError::Redefined { value: ValueId(0), .. })
        ));
    }

    #[test]
    fn test_unknown_global() {
        let store = Instruction {
            dest: None,
            kind: InstrKind::Store {
                addr: Operand::Global(GlobalId(3)),
                value: Operand::bool(true),
            },
        };
        let program = single_block(vec![store, ret()], 0);
        assert!(matches!(
            program.verify(),
            Err(VerifyError::UnknownGlobal { global: 3, .. })
        ));
    }

    #[test]
    fn test_phi_from_non_predecessor() {
        let mut program = ProgramBuilder::new();
        let id = program.declare("main", Vec::new());
        let mut f = program.body(id);
        let next = f.new_block();
        f.jump(next);
        f.switch_to(next);
        let phi = f.phi(vec![(BlockId(0), Operand::bool(true))]);
        f.add_phi_edge(phi, BlockId(7), Operand::bool(false));
        f.ret(Vec::new());
        program.define(f);
        assert!(matches!(
            program.finish(),
            Err(VerifyError::PhiEdge { pred: BlockId(7), .. })
        ));
    }

    #[test]
    fn test_call_arity() {
        let mut program = ProgramBuilder::new();
        let add = program.declare(
            "add",
            vec![
                Param::new("i", Type::Int(IntTy::Int)),
                Param::new("j", Type::Int(IntTy::Int)),
            ],
        );
        let main = program.declare("main", Vec::new());

        let mut f = program.body(add);
        let sum = f.binop(crate::ir::BinOp::Add, f.param(0), f.param(1));
        f.ret(vec![sum.into()]);
        program.define(f);

        let mut f = program.body(main);
        f.call(Callee::Function(add), vec![Operand::int(IntTy::Int, 1)]);
        f.ret(Vec::new());
        program.define(f);

        assert!(matches!(
            program.finish(),
            Err(VerifyError::Arity { expected: 2, got: 1, .. })
        ));
    }

    #[test]
    fn test_duplicate_global() {
        let mut program = ProgramBuilder::new();
        program.global("x", Type::Int(IntTy::Int));
        program.global("x", Type::Str);
        assert_eq!(
            program.finish().unwrap_err(),
            VerifyError::DuplicateGlobal("x".to_string())
        );
    }

    #[test]
    fn test_duplicate_function() {
        let mut program = ProgramBuilder::new();
        for _ in 0..2 {
            let id = program.declare("main", Vec::new());
            let mut f = program.body(id);
            f.ret(Vec::new());
            program.define(f);
        }
        assert_eq!(
            program.finish().unwrap_err(),
            VerifyError::DuplicateFunction("main".to_string())
        );
    }

    #[test]
    fn test_unknown_jump_target() {
        let jump = Instruction {
            dest: None,
            kind: InstrKind::Jump { target: BlockId(4) },
        };
        let program = single_block(vec![jump], 0);
        assert!(matches!(
            program.verify(),
            Err(VerifyError::UnknownBlock { target: BlockId(4), .. })
        ));
    }
}
