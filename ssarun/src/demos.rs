//! Sample programs runnable from the command line.
//!
//! Each demo assembles its IR with [`ProgramBuilder`], the way a front-end
//! would hand it to the engine, and may install host natives the program
//! imports.

use crate::builtins::format_values;
use crate::error::ErrorKind;
use crate::interpreter::Engine;
use crate::ir::builder::ProgramBuilder;
use crate::ir::verify::VerifyError;
use crate::ir::{BinOp, Callee, Operand, Param, Program, UnOp};
use crate::ty::{IntTy, Type};
use crate::value::Value;
use std::io::Write;

pub struct Demo {
    pub name: &'static str,
    pub summary: &'static str,
    pub build: fn() -> Result<Program, VerifyError>,
    /// Registers the host natives the program imports.
    pub install: fn(&mut Engine<'_>),
}

pub static DEMOS: &[Demo] = &[
    Demo {
        name: "hello",
        summary: "print a greeting and a constant",
        build: hello,
        install: no_natives,
    },
    Demo {
        name: "global-var",
        summary: "store to a global and print it",
        build: global_var,
        install: no_natives,
    },
    Demo {
        name: "binary-ops",
        summary: "arithmetic on a global and a call result",
        build: binary_ops,
        install: no_natives,
    },
    Demo {
        name: "branch",
        summary: "if/else merged by a phi, then a fibonacci loop",
        build: branch,
        install: no_natives,
    },
    Demo {
        name: "recursion",
        summary: "recursive fibonacci",
        build: recursion,
        install: no_natives,
    },
    Demo {
        name: "import-func",
        summary: "call a body-less function implemented by the host",
        build: import_func,
        install: install_my_print,
    },
];

/// Looks a demo up by name.
pub fn find(name: &str) -> Option<&'static Demo> {
    DEMOS.iter().find(|demo| demo.name == name)
}

fn int(value: i128) -> Operand {
    Operand::int(IntTy::Int, value)
}

fn int_param(name: &str) -> Param {
    Param::new(name, Type::Int(IntTy::Int))
}

fn println() -> Callee {
    Callee::builtin("println")
}

fn no_natives(_: &mut Engine<'_>) {}

fn hello() -> Result<Program, VerifyError> {
    let mut program = ProgramBuilder::new();
    let main = program.declare("main", Vec::new());
    let mut f = program.body(main);
    f.call(println(), vec![Operand::str("Hello，凹语言！")]);
    f.call(println(), vec![Operand::str("The answer is:"), int(42)]);
    f.ret(Vec::new());
    program.define(f);
    program.finish()
}

fn global_var() -> Result<Program, VerifyError> {
    let mut program = ProgramBuilder::new();
    let i = program.global("main.i", Type::Int(IntTy::Int));
    let main = program.declare("main", Vec::new());
    let mut f = program.body(main);
    f.store(i, int(42));
    let value = f.unop(UnOp::Deref, i);
    f.call(println(), vec![Operand::str("The answer is:"), value.into()]);
    f.ret(Vec::new());
    program.define(f);
    program.finish()
}

/// Emits `func add(i, j int) int { return i + j }`.
fn define_add(program: &mut ProgramBuilder) -> crate::ir::FuncId {
    let add = program.declare("add", vec![int_param("i"), int_param("j")]);
    let mut f = program.body(add);
    let sum = f.binop(BinOp::Add, f.param(0), f.param(1));
    f.ret(vec![sum.into()]);
    program.define(f);
    add
}

fn binary_ops() -> Result<Program, VerifyError> {
    let mut program = ProgramBuilder::new();
    let i = program.global("main.i", Type::Int(IntTy::Int));
    let add = define_add(&mut program);
    let main = program.declare("main", Vec::new());

    let mut f = program.body(main);
    f.store(i, int(24));
    let base = f.unop(UnOp::Deref, i);
    let sum = f.call(Callee::Function(add), vec![int(2), int(4)]);
    let scaled = f.binop(BinOp::Mul, int(3), sum);
    let answer = f.binop(BinOp::Add, base, scaled);
    f.call(println(), vec![Operand::str("The answer is:"), answer.into()]);
    f.ret(Vec::new());
    program.define(f);
    program.finish()
}

/// Emits a function printing the first `n` fibonacci numbers, each followed
/// by a space. The loop header carries the state in three phis.
fn define_fib_loop(program: &mut ProgramBuilder) -> crate::ir::FuncId {
    let fib = program.declare("fib", vec![int_param("n")]);
    let mut f = program.body(fib);
    let entry = f.entry();
    let header = f.new_block();
    let body = f.new_block();
    let done = f.new_block();
    f.jump(header);

    f.switch_to(header);
    let t1 = f.phi(vec![(entry, int(0))]);
    let t2 = f.phi(vec![(entry, int(1))]);
    let k = f.phi(vec![(entry, int(0))]);
    let more = f.binop(BinOp::Lss, k, f.param(0));
    f.branch(more, body, done);

    f.switch_to(body);
    f.call(Callee::builtin("print"), vec![t2.into(), Operand::str(" ")]);
    let next = f.binop(BinOp::Add, t1, t2);
    let k_next = f.binop(BinOp::Add, k, int(1));
    f.jump(header);
    f.add_phi_edge(t1, body, t2);
    f.add_phi_edge(t2, body, next);
    f.add_phi_edge(k, body, k_next);

    f.switch_to(done);
    f.ret(Vec::new());
    program.define(f);
    fib
}

fn branch() -> Result<Program, VerifyError> {
    let mut program = ProgramBuilder::new();
    let add = define_add(&mut program);
    let fib = define_fib_loop(&mut program);
    let main = program.declare("main", Vec::new());

    let mut f = program.body(main);
    let then_block = f.new_block();
    let merge = f.new_block();
    let else_block = f.new_block();
    let sum = f.call(Callee::Function(add), vec![int(3), int(5)]);
    let small = f.binop(BinOp::Lss, sum, int(9));
    f.branch(small, then_block, else_block);

    f.switch_to(then_block);
    f.call(println(), vec![Operand::str("branch 0")]);
    f.jump(merge);

    f.switch_to(else_block);
    f.call(println(), vec![Operand::str("branch 1")]);
    f.jump(merge);

    f.switch_to(merge);
    let i = f.phi(vec![(then_block, int(13)), (else_block, int(42))]);
    f.call(Callee::Function(fib), vec![i.into()]);
    f.ret(Vec::new());
    program.define(f);
    program.finish()
}

fn recursion() -> Result<Program, VerifyError> {
    let mut program = ProgramBuilder::new();
    let fib = program.declare("fib", vec![int_param("n")]);
    let main = program.declare("main", Vec::new());

    let mut f = program.body(fib);
    let base = f.new_block();
    let step = f.new_block();
    let small = f.binop(BinOp::Lss, f.param(0), int(2));
    f.branch(small, base, step);
    f.switch_to(base);
    f.ret(vec![f.param(0).into()]);
    f.switch_to(step);
    let n1 = f.binop(BinOp::Sub, f.param(0), int(1));
    let n2 = f.binop(BinOp::Sub, f.param(0), int(2));
    let a = f.call(Callee::Function(fib), vec![n1.into()]);
    let b = f.call(Callee::Function(fib), vec![n2.into()]);
    let sum = f.binop(BinOp::Add, a, b);
    f.ret(vec![sum.into()]);
    program.define(f);

    let mut f = program.body(main);
    let result = f.call(Callee::Function(fib), vec![int(10)]);
    f.call(println(), vec![Operand::str("fib(10) ="), result.into()]);
    f.ret(Vec::new());
    program.define(f);
    program.finish()
}

fn import_func() -> Result<Program, VerifyError> {
    let mut program = ProgramBuilder::new();
    let my_print = program.external("my_print", vec![Param::new("s", Type::Str)]);
    let main = program.declare("main", Vec::new());
    let mut f = program.body(main);
    f.call(Callee::Function(my_print), vec![Operand::str("Hello, wa!")]);
    f.ret(Vec::new());
    program.define(f);
    program.finish()
}

fn install_my_print(engine: &mut Engine<'_>) {
    engine.register_builtin("my_print", |out: &mut dyn Write, args: &[Value]| {
        writeln!(out, "my_print: {}", format_values(args, ""))
            .map_err(|e| ErrorKind::Output(e.to_string()))?;
        Ok(Value::Unit)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::OutputBuffer;

    fn run_demo(name: &str) -> String {
        let demo = find(name).unwrap();
        let program = (demo.build)().unwrap();
        let out = OutputBuffer::new();
        let mut engine = Engine::with_output(&program, out.clone());
        (demo.install)(&mut engine);
        engine.initialize_globals().unwrap();
        let result = engine.run_named("main", &[]).unwrap();
        assert!(result.is_unit());
        out.contents()
    }

    #[test]
    fn test_demo_names_unique() {
        for demo in DEMOS {
            assert_eq!(DEMOS.iter().filter(|d| d.name == demo.name).count(), 1);
        }
    }

    #[test]
    fn test_hello() {
        assert_eq!(run_demo("hello"), "Hello，凹语言！\nThe answer is: 42\n");
    }

    #[test]
    fn test_global_var() {
        assert_eq!(run_demo("global-var"), "The answer is: 42\n");
    }

    #[test]
    fn test_binary_ops() {
        assert_eq!(run_demo("binary-ops"), "The answer is: 42\n");
    }

    #[test]
    fn test_branch() {
        assert_eq!(
            run_demo("branch"),
            "branch 0\n1 1 2 3 5 8 13 21 34 55 89 144 233 "
        );
    }

    #[test]
    fn test_recursion() {
        assert_eq!(run_demo("recursion"), "fib(10) = 55\n");
    }

    #[test]
    fn test_import_func() {
        assert_eq!(run_demo("import-func"), "my_print: Hello, wa!\n");
    }

    #[test]
    fn test_import_func_without_native() {
        let program = import_func().unwrap();
        let mut engine = Engine::with_output(&program, OutputBuffer::new());
        let err = engine.run_named("main", &[]).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::UnknownBuiltin("my_print".to_string())
        );
    }
}
