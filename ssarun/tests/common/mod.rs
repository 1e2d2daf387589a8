//! Common test utilities and macros

use ssarun::ir::Program;
use ssarun::value::Value;
use ssarun::{Engine, OutputBuffer};

#[derive(Debug)]
pub enum TestResult {
    Success,
    SuccessWithValue(Value),
    Error(String),
    ErrorRegex(String),
}

impl PartialEq for TestResult {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TestResult::Success, TestResult::Success) => true,
            (TestResult::SuccessWithValue(a), TestResult::SuccessWithValue(b)) => a == b,
            (TestResult::Error(a), TestResult::Error(b)) => a == b,
            (TestResult::ErrorRegex(pattern), TestResult::Error(msg)) => {
                regex::Regex::new(pattern).unwrap().is_match(msg)
            }
            (TestResult::Error(msg), TestResult::ErrorRegex(pattern)) => {
                regex::Regex::new(pattern).unwrap().is_match(msg)
            }
            _ => false,
        }
    }
}

/// Runs `start_fn` of `program` and returns the outcome plus everything the
/// program printed.
pub fn run_program_test(program: &Program, start_fn: &str) -> (TestResult, String) {
    let out = OutputBuffer::new();
    let mut engine = Engine::with_output(program, out.clone());
    let result = match ssarun::run_function(&mut engine, start_fn) {
        Ok(Value::Unit) => TestResult::Success,
        Ok(value) => TestResult::SuccessWithValue(value),
        Err(e) => TestResult::Error(e.to_string()),
    };
    (result, out.contents())
}

/// Runs `main` of a program and checks its result and console output.
#[macro_export]
macro_rules! check_program {
    ($test_name:ident, program=$program:expr, output=$output:expr, result=$expected:expr) => {
        check_program!($test_name, program=$program, start_fn="main", output=$output, result=$expected);
    };
    ($test_name:ident, program=$program:expr, start_fn=$start_fn:expr, output=$output:expr, result=$expected:expr) => {
        #[test]
        fn $test_name() {
            let program = $program;
            let (result, output) = crate::common::run_program_test(&program, $start_fn);
            assert_eq!(result, $expected);
            assert_eq!(output, $output);
        }
    };
}

/// Runs `main` of a program that must fail, matching the error message.
#[macro_export]
macro_rules! check_error {
    ($test_name:ident, program=$program:expr, error=$pattern:expr) => {
        check_error!($test_name, program=$program, start_fn="main", error=$pattern);
    };
    ($test_name:ident, program=$program:expr, start_fn=$start_fn:expr, error=$pattern:expr) => {
        #[test]
        fn $test_name() {
            let program = $program;
            let (result, _) = crate::common::run_program_test(&program, $start_fn);
            assert_eq!(result, crate::common::TestResult::ErrorRegex($pattern.to_string()));
        }
    };
}
