//! Incremental construction of [`Program`]s.
//!
//! Functions are declared first so that bodies may call each other (or
//! themselves) before being defined. A [`FunctionBuilder`] appends
//! instructions to its current block and numbers SSA values as it goes.
//! Successor and predecessor lists are derived from terminators when the
//! function is finished.

use super::verify::VerifyError;
use super::{
    BasicBlock, BinOp, BlockId, Callee, FuncId, Function, Global, GlobalId, InstrKind,
    Instruction, Operand, Param, PhiEdge, Program, UnOp, ValueId,
};
use crate::ty::Type;

#[derive(Debug, Default)]
pub struct ProgramBuilder {
    globals: Vec<Global>,
    functions: Vec<Slot>,
}

#[derive(Debug)]
enum Slot {
    Declared { name: String, params: Vec<Param> },
    Defined(Function),
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&mut self, name: impl Into<String>, ty: Type) -> GlobalId {
        self.globals.push(Global::new(name, ty));
        GlobalId(self.globals.len() - 1)
    }

    /// Declares a function whose body will be supplied through [`Self::define`].
    pub fn declare(&mut self, name: impl Into<String>, params: Vec<Param>) -> FuncId {
        self.functions.push(Slot::Declared {
            name: name.into(),
            params,
        });
        FuncId((self.functions.len() - 1) as u32)
    }

    /// Declares a function without a body, implemented by the host.
    pub fn external(&mut self, name: impl Into<String>, params: Vec<Param>) -> FuncId {
        self.functions.push(Slot::Defined(Function {
            name: name.into(),
            params,
            blocks: Vec::new(),
            entry: BlockId(0),
            value_count: 0,
        }));
        FuncId((self.functions.len() - 1) as u32)
    }

    /// Starts the body of a declared function.
    pub fn body(&self, id: FuncId) -> FunctionBuilder {
        let (name, params) = match self.functions.get(id.0 as usize) {
            Some(Slot::Declared { name, params }) => (name.clone(), params.clone()),
            Some(Slot::Defined(func)) => (func.name.clone(), func.params.clone()),
            None => (format!("#{}", id.0), Vec::new()),
        };
        FunctionBuilder::new(id, name, params)
    }

    pub fn define(&mut self, body: FunctionBuilder) {
        let id = body.id;
        let func = body.finish();
        if let Some(slot) = self.functions.get_mut(id.0 as usize) {
            *slot = Slot::Defined(func);
        }
    }

    /// Assembles and verifies the program.
    pub fn finish(self) -> Result<Program, VerifyError> {
        let mut functions = Vec::with_capacity(self.functions.len());
        for slot in self.functions {
            match slot {
                Slot::Defined(func) => functions.push(func),
                Slot::Declared { name, .. } => return Err(VerifyError::Undefined(name)),
            }
        }
        let program = Program::new(self.globals, functions);
        program.verify()?;
        Ok(program)
    }
}

#[derive(Debug)]
pub struct FunctionBuilder {
    id: FuncId,
    name: String,
    params: Vec<Param>,
    blocks: Vec<BasicBlock>,
    current: BlockId,
    next_value: usize,
}

impl FunctionBuilder {
    fn new(id: FuncId, name: String, params: Vec<Param>) -> Self {
        let next_value = params.len();
        let mut builder = Self {
            id,
            name,
            params,
            blocks: Vec::new(),
            current: BlockId(0),
            next_value,
        };
        builder.new_block();
        builder
    }

    /// The SSA value of the `idx`-th parameter.
    pub fn param(&self, idx: usize) -> ValueId {
        ValueId(idx)
    }

    /// The block every call starts in.
    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    /// Appends an empty block. The insertion point is left unchanged.
    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock {
            id,
            instrs: Vec::new(),
            preds: Vec::new(),
            succs: Vec::new(),
        });
        id
    }

    pub fn switch_to(&mut self, block: BlockId) {
        self.current = block;
    }

    pub fn store(&mut self, addr: impl Into<Operand>, value: impl Into<Operand>) {
        self.push(
            None,
            InstrKind::Store {
                addr: addr.into(),
                value: value.into(),
            },
        );
    }

    pub fn unop(&mut self, op: UnOp, x: impl Into<Operand>) -> ValueId {
        self.push_value(InstrKind::UnaryOp { op, x: x.into() })
    }

    pub fn binop(&mut self, op: BinOp, x: impl Into<Operand>, y: impl Into<Operand>) -> ValueId {
        self.push_value(InstrKind::BinaryOp {
            op,
            x: x.into(),
            y: y.into(),
        })
    }

    pub fn call(&mut self, callee: Callee, args: Vec<Operand>) -> ValueId {
        self.push_value(InstrKind::Call { callee, args })
    }

    pub fn convert(&mut self, ty: Type, x: impl Into<Operand>) -> ValueId {
        self.push_value(InstrKind::Convert { ty, x: x.into() })
    }

    /// Emits a phi. Edges from blocks not yet built can be added later with
    /// [`Self::add_phi_edge`].
    pub fn phi(&mut self, edges: Vec<(BlockId, Operand)>) -> ValueId {
        let edges = edges
            .into_iter()
            .map(|(pred, value)| PhiEdge { pred, value })
            .collect();
        self.push_value(InstrKind::Phi { edges })
    }

    pub fn add_phi_edge(&mut self, phi: ValueId, pred: BlockId, value: impl Into<Operand>) {
        let instr = self
            .blocks
            .iter_mut()
            .flat_map(|block| block.instrs.iter_mut())
            .find(|instr| instr.dest == Some(phi));
        if let Some(Instruction {
            kind: InstrKind::Phi { edges },
            ..
        }) = instr
        {
            edges.push(PhiEdge {
                pred,
                value: value.into(),
            });
        }
    }

    pub fn ret(&mut self, results: Vec<Operand>) {
        self.push(None, InstrKind::Return { results });
    }

    pub fn branch(&mut self, cond: impl Into<Operand>, then_block: BlockId, else_block: BlockId) {
        self.push(
            None,
            InstrKind::Branch {
                cond: cond.into(),
                then_block,
                else_block,
            },
        );
    }

    pub fn jump(&mut self, target: BlockId) {
        self.push(None, InstrKind::Jump { target });
    }

    fn push_value(&mut self, kind: InstrKind) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        self.push(Some(id), kind);
        id
    }

    fn push(&mut self, dest: Option<ValueId>, kind: InstrKind) {
        if let Some(block) = self.blocks.get_mut(self.current.0) {
            block.instrs.push(Instruction { dest, kind });
        }
    }

    /// Derives the control-flow edges and produces the function.
    pub fn finish(mut self) -> Function {
        for idx in 0..self.blocks.len() {
            let succs = self.blocks[idx]
                .instrs
                .last()
                .map(|instr| instr.kind.targets())
                .unwrap_or_default();
            for succ in &succs {
                if let Some(target) = self.blocks.get_mut(succ.0) {
                    target.preds.push(BlockId(idx));
                }
            }
            self.blocks[idx].succs = succs;
        }
        Function {
            name: self.name,
            params: self.params,
            blocks: self.blocks,
            entry: BlockId(0),
            value_count: self.next_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::IntTy;

    #[test]
    fn test_values_follow_params() {
        let mut program = ProgramBuilder::new();
        let id = program.declare(
            "add",
            vec![
                Param::new("i", Type::Int(IntTy::Int)),
                Param::new("j", Type::Int(IntTy::Int)),
            ],
        );
        let mut f = program.body(id);
        let sum = f.binop(BinOp::Add, f.param(0), f.param(1));
        assert_eq!(sum, ValueId(2));
        f.ret(vec![sum.into()]);
        let func = f.finish();
        assert_eq!(func.value_count, 3);
        assert_eq!(func.blocks.len(), 1);
    }

    #[test]
    fn test_edges_derived_from_terminators() {
        let mut program = ProgramBuilder::new();
        let id = program.declare("main", Vec::new());
        let mut f = program.body(id);
        let then_block = f.new_block();
        let else_block = f.new_block();
        let done = f.new_block();
        f.branch(Operand::bool(true), then_block, else_block);
        f.switch_to(then_block);
        f.jump(done);
        f.switch_to(else_block);
        f.jump(done);
        f.switch_to(done);
        f.ret(Vec::new());
        let func = f.finish();

        assert_eq!(func.blocks[0].succs, vec![then_block, else_block]);
        assert_eq!(func.blocks[then_block.0].preds, vec![BlockId(0)]);
        assert_eq!(func.blocks[done.0].preds, vec![then_block, else_block]);
        assert!(func.blocks[done.0].succs.is_empty());
    }

    #[test]
    fn test_add_phi_edge() {
        let mut program = ProgramBuilder::new();
        let id = program.declare("main", Vec::new());
        let mut f = program.body(id);
        let phi = f.phi(vec![(BlockId(0), Operand::int(IntTy::Int, 0))]);
        f.add_phi_edge(phi, BlockId(1), Operand::int(IntTy::Int, 1));
        let func = f.finish();
        match &func.blocks[0].instrs[0].kind {
            InstrKind::Phi { edges } => assert_eq!(edges.len(), 2),
            other => panic!("expected phi, found {other:?}"),
        }
    }

    #[test]
    fn test_finish_rejects_undefined() {
        let mut program = ProgramBuilder::new();
        program.declare("main", Vec::new());
        assert!(matches!(
            program.finish(),
            Err(VerifyError::Undefined(name)) if name == "main"
        ));
    }
}
