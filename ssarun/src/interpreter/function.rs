use super::ops::{BinaryEval, UnaryEval};
use crate::builtins::BuiltinRegistry;
use crate::error::{ErrorKind, InstrLoc, InterpError};
use crate::ir::{BasicBlock, BlockId, Callee, Function, InstrKind, Instruction, PhiEdge, Program, ValueId};
use crate::memory::{self, frame::Frame, globals::GlobalStore};
use crate::value::Value;
use smallvec::SmallVec;
use std::io::{self, Write};
use tracing::{debug, trace};

/// Executes functions of one [`Program`].
///
/// [`Engine::initialize_globals`] must be called before the first
/// [`Engine::run_function`]; globals read earlier are reported as unknown.
#[derive(Debug)]
pub struct Engine<'p> {
    pub(super) program: &'p Program,
    pub(super) globals: GlobalStore,
    builtins: BuiltinRegistry,
    /// Number of user function calls in flight.
    depth: usize,
}

/// What to do after an instruction.
#[derive(Debug)]
enum ControlFlow {
    Continue,
    Jump(BlockId),
    Return(Value),
}

impl<'p> Engine<'p> {
    /// Creates an engine whose builtins print to standard output.
    pub fn new(program: &'p Program) -> Self {
        Self::with_output(program, io::stdout())
    }

    /// Creates an engine whose builtins print to `output`.
    pub fn with_output(program: &'p Program, output: impl Write + 'static) -> Self {
        Self {
            program,
            globals: GlobalStore::new(),
            builtins: BuiltinRegistry::new(Box::new(output)),
            depth: 0,
        }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    /// Makes a host function callable by name, either as a builtin callee or
    /// as the implementation of a body-less function declaration.
    pub fn register_builtin<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut dyn Write, &[Value]) -> Result<Value, ErrorKind> + 'static,
    {
        self.builtins.register(name, f);
    }

    /// Zero-initializes every global of the program. Repeated calls are no-ops.
    pub fn initialize_globals(&mut self) -> Result<(), InterpError> {
        Ok(self.globals.initialize(self.program)?)
    }

    /// Reads the current value of a global variable.
    pub fn global(&self, name: &str) -> Result<Value, InterpError> {
        Ok(self.globals.read(name)?)
    }

    /// Overwrites the value of a global variable.
    pub fn set_global(&self, name: &str, value: Value) -> Result<(), InterpError> {
        Ok(self.globals.write(name, value)?)
    }

    /// Runs the function with the given name, or the builtin with that name
    /// when the program defines no such function.
    pub fn run_named(&mut self, name: &str, args: &[Value]) -> Result<Value, InterpError> {
        let callee = match self.program.function_id(name) {
            Some(id) => Callee::Function(id),
            None => Callee::Builtin(name.to_string()),
        };
        self.run_function(&callee, args)
    }

    /// Calls `callee` with already evaluated arguments and returns its result.
    ///
    /// Functions without a return value yield [`Value::Unit`].
    pub fn run_function(&mut self, callee: &Callee, args: &[Value]) -> Result<Value, InterpError> {
        match callee {
            Callee::Builtin(name) => self.call_native(name, args),
            Callee::Function(id) => {
                let program = self.program;
                let func = program
                    .function(*id)
                    .ok_or(ErrorKind::UnknownFunction(id.0))?;
                if func.is_external() {
                    self.call_native(&func.name, args)
                } else {
                    self.depth += 1;
                    let result = self.invoke(func, args);
                    self.depth -= 1;
                    result
                }
            }
        }
    }

    fn call_native(&mut self, name: &str, args: &[Value]) -> Result<Value, InterpError> {
        trace!("Calling native {name} with {} arguments", args.len());
        Ok(self.builtins.call(name, args)?)
    }

    fn invoke(&mut self, func: &'p Function, args: &[Value]) -> Result<Value, InterpError> {
        debug!(depth = self.depth, "Calling {}", func.name);
        if func.params.len() != args.len() {
            return Err(ErrorKind::ArityError {
                function: func.name.clone(),
                expected: func.params.len(),
                got: args.len(),
            }
            .into());
        }

        let mut frame = Frame::new(func.value_count, func.entry);
        for (idx, (param, arg)) in func.params.iter().zip(args).enumerate() {
            if !param.ty.admits(arg) {
                return Err(ErrorKind::ArgumentType {
                    function: func.name.clone(),
                    param: param.name.clone(),
                    expected: param.ty.to_string(),
                    got: arg.type_name(),
                }
                .into());
            }
            frame.bind(func.param_value(idx), arg.clone())?;
        }

        while let Some(block) = frame.current_block() {
            self.execute_block(func, &mut frame, block)?;
        }

        let result = frame.into_result();
        debug!(depth = self.depth, "{} returned {}", func.name, result);
        Ok(result)
    }

    /// Executes one block and leaves the frame pointing at the next one, or
    /// finished when the block returned.
    fn execute_block(&mut self, func: &'p Function, frame: &mut Frame, id: BlockId) -> Result<(), InterpError> {
        let block = func.block(id).ok_or(ErrorKind::UnknownBlock(id))?;
        debug!("Executing {} of {}", id, func.name);

        let phi_count = self.resolve_phis(func, frame, block)?;
        for (index, instr) in block.instrs.iter().enumerate().skip(phi_count) {
            let flow = self
                .execute_instruction(frame, instr)
                .map_err(|e| e.located(|| location(func, id, index)))?;
            match flow {
                ControlFlow::Continue => {}
                ControlFlow::Jump(target) => {
                    trace!("Transfer {} -> {}", id, target);
                    frame.transfer(target);
                    return Ok(());
                }
                ControlFlow::Return(value) => {
                    frame.finish(value);
                    return Ok(());
                }
            }
        }

        Err(InterpError::at(
            ErrorKind::MissingTerminator(id),
            location(func, id, block.instrs.len()),
        ))
    }

    /// Binds the phis at the head of `block` from the edge of the previous
    /// block. All incoming values are read before any phi is bound, so phis of
    /// one block may refer to each other.
    fn resolve_phis(&self, func: &Function, frame: &mut Frame, block: &BasicBlock) -> Result<usize, InterpError> {
        let mut resolved: SmallVec<[(Option<ValueId>, Value); 4]> = SmallVec::new();
        for (index, instr) in block.instrs.iter().enumerate() {
            let InstrKind::Phi { edges } = &instr.kind else {
                break;
            };
            let value = self
                .resolve_phi(frame, edges)
                .map_err(|kind| InterpError::at(kind, location(func, block.id, index)))?;
            resolved.push((instr.dest, value));
        }

        let count = resolved.len();
        for (dest, value) in resolved {
            if let Some(dest) = dest {
                frame.bind(dest, value)?;
            }
        }
        Ok(count)
    }

    fn resolve_phi(&self, frame: &Frame, edges: &[PhiEdge]) -> Result<Value, ErrorKind> {
        let prev = frame.previous_block();
        let edge = edges
            .iter()
            .find(|edge| Some(edge.pred) == prev)
            .ok_or_else(|| {
                ErrorKind::PhiResolutionFailure(
                    prev.map_or_else(|| "<entry>".to_string(), |b| b.to_string()),
                )
            })?;
        self.evaluate_operand(frame, &edge.value)
    }

    fn execute_instruction(&mut self, frame: &mut Frame, instr: &Instruction) -> Result<ControlFlow, InterpError> {
        trace!("Executing {}", instr.kind.mnemonic());

        match &instr.kind {
            InstrKind::Store { addr, value } => {
                let addr = self.evaluate_address(frame, addr)?;
                let value = self.evaluate_operand(frame, value)?;
                memory::write_addr(&addr, value)?;
            }
            InstrKind::UnaryOp { op, x } => {
                let value = op.eval(self.evaluate_operand(frame, x)?)?;
                define(frame, instr, value)?;
            }
            InstrKind::BinaryOp { op, x, y } => {
                let left = self.evaluate_operand(frame, x)?;
                let right = self.evaluate_operand(frame, y)?;
                define(frame, instr, op.eval(left, right)?)?;
            }
            InstrKind::Call { callee, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.evaluate_operand(frame, arg))
                    .collect::<Result<SmallVec<[Value; 4]>, _>>()?;
                let result = self.run_function(callee, &args)?;
                define(frame, instr, result)?;
            }
            InstrKind::Convert { ty, .. } => {
                return Err(ErrorKind::UnsupportedInstruction(format!("conversion to {ty}")).into());
            }
            InstrKind::Phi { edges } => {
                let value = self.resolve_phi(frame, edges)?;
                define(frame, instr, value)?;
            }
            InstrKind::Return { results } => {
                let value = match results.as_slice() {
                    [] => Value::Unit,
                    [result] => self.evaluate_operand(frame, result)?,
                    _ => return Err(ErrorKind::MultiReturnUnsupported(results.len()).into()),
                };
                return Ok(ControlFlow::Return(value));
            }
            InstrKind::Branch {
                cond,
                then_block,
                else_block,
            } => {
                let cond = self.evaluate_operand(frame, cond)?;
                let taken = cond.as_bool().ok_or_else(|| ErrorKind::TypeMismatch {
                    op: "if".to_string(),
                    left: "bool".to_string(),
                    right: cond.type_name(),
                })?;
                let target = if taken { *then_block } else { *else_block };
                return Ok(ControlFlow::Jump(target));
            }
            InstrKind::Jump { target } => return Ok(ControlFlow::Jump(*target)),
        }
        Ok(ControlFlow::Continue)
    }
}

/// Binds the value an instruction produced, if it defines one.
fn define(frame: &mut Frame, instr: &Instruction, value: Value) -> Result<(), ErrorKind> {
    match instr.dest {
        Some(dest) => frame.bind(dest, value),
        None => Ok(()),
    }
}

fn location(func: &Function, block: BlockId, index: usize) -> InstrLoc {
    InstrLoc {
        function: func.name.clone(),
        block,
        index,
    }
}
