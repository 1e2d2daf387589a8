//! ssarun: an interpreter for programs in SSA form.
//!
//! A front-end hands over a [`ir::Program`]: global variables plus functions
//! made of basic blocks whose instructions define single-assignment values.
//! The [`Engine`] executes them directly, keeping one frame per call and
//! dispatching console output and host functions through a builtin registry.
//!
//! # Example
//! ```
//! use ssarun::ir::builder::ProgramBuilder;
//! use ssarun::ir::{Callee, Operand};
//! use ssarun::{Engine, OutputBuffer};
//!
//! let mut program = ProgramBuilder::new();
//! let main = program.declare("main", Vec::new());
//! let mut f = program.body(main);
//! f.call(Callee::builtin("println"), vec![Operand::str("hi")]);
//! f.ret(Vec::new());
//! program.define(f);
//! let program = program.finish().unwrap();
//!
//! let out = OutputBuffer::new();
//! let mut engine = Engine::with_output(&program, out.clone());
//! ssarun::run_main(&mut engine).unwrap();
//! assert_eq!(out.contents(), "hi\n");
//! ```

pub mod builtins;
pub mod demos;
pub mod error;
pub mod interpreter;
pub mod ir;
pub mod memory;
pub mod ty;
pub mod value;

pub use crate::builtins::OutputBuffer;
pub use crate::error::{ErrorKind, InterpError};
pub use crate::interpreter::Engine;

use crate::ir::Callee;
use crate::value::Value;
use anyhow::{Result, anyhow, bail};
use std::process::ExitCode;
use tracing::info;

/// Execute a specific function by name.
///
/// The program is verified and its globals initialized first. The function
/// must take no arguments.
///
/// # Returns
/// * `Ok(Value)` - Function executed successfully, returns the result value
/// * `Err(anyhow::Error)` - Function not found, has arguments, or execution failed
pub fn run_function(engine: &mut Engine<'_>, fn_name: &str) -> Result<Value> {
    let program = engine.program();
    program.verify()?;

    let id = program
        .function_id(fn_name)
        .ok_or_else(|| anyhow!("Function '{}' not found", fn_name))?;
    let func = program
        .function(id)
        .ok_or_else(|| anyhow!("Function '{}' not found", fn_name))?;
    info!("Found function: {}", func.name);

    if !func.params.is_empty() {
        bail!(
            "Function '{}' takes {} arguments, only zero-argument functions are supported",
            fn_name,
            func.params.len()
        );
    }

    engine.initialize_globals()?;
    let result = engine.run_function(&Callee::Function(id), &[])?;
    info!("Function '{}' returned: {}", fn_name, result);
    Ok(result)
}

/// Runs `main` and maps its result to a process exit code.
pub fn run_main(engine: &mut Engine<'_>) -> Result<ExitCode> {
    run_entry(engine, "main")
}

/// Runs `fn_name` and maps its result to a process exit code.
///
/// Success is a void return, `true`, or an integer zero.
pub fn run_entry(engine: &mut Engine<'_>, fn_name: &str) -> Result<ExitCode> {
    let result = run_function(engine, fn_name)?;
    Ok(exit_code(&result))
}

fn exit_code(result: &Value) -> ExitCode {
    match result {
        Value::Unit | Value::Bool(true) => ExitCode::SUCCESS,
        Value::Int(n) if n.to_i128() == 0 => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::IntTy;
    use crate::value::Int;

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(&Value::Unit), ExitCode::SUCCESS);
        assert_eq!(exit_code(&Value::Bool(true)), ExitCode::SUCCESS);
        assert_eq!(exit_code(&Value::Int(IntTy::U8.truncate(0))), ExitCode::SUCCESS);
        assert_eq!(exit_code(&Value::Int(Int::Int(3))), ExitCode::FAILURE);
        assert_eq!(exit_code(&Value::Bool(false)), ExitCode::FAILURE);
    }
}
