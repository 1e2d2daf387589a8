//! Native functions callable from IR.
//!
//! The registry always provides `print` and `println`. Hosts may add their own
//! natives before execution; they receive the interpreter's output stream and
//! the evaluated arguments.

use crate::error::ErrorKind;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

/// Implementation of a native function.
pub type NativeFn = Rc<dyn Fn(&mut dyn Write, &[Value]) -> Result<Value, ErrorKind>>;

pub struct BuiltinRegistry {
    natives: HashMap<String, NativeFn>,
    output: Box<dyn Write>,
}

impl fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.natives.keys().collect();
        names.sort();
        f.debug_struct("BuiltinRegistry")
            .field("natives", &names)
            .finish_non_exhaustive()
    }
}

impl BuiltinRegistry {
    /// Creates a registry holding the standard natives, writing to `output`.
    pub fn new(output: Box<dyn Write>) -> Self {
        let mut registry = Self {
            natives: HashMap::new(),
            output,
        };
        registry.register("print", print);
        registry.register("println", println);
        registry
    }

    /// Adds or replaces a native function.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut dyn Write, &[Value]) -> Result<Value, ErrorKind> + 'static,
    {
        self.natives.insert(name.into(), Rc::new(f));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.natives.contains_key(name)
    }

    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, ErrorKind> {
        let native = self
            .natives
            .get(name)
            .cloned()
            .ok_or_else(|| ErrorKind::UnknownBuiltin(name.to_string()))?;
        native(self.output.as_mut(), args)
    }
}

/// Joins the canonical text of every argument with `sep`.
pub fn format_values(args: &[Value], sep: &str) -> String {
    args.iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(sep)
}

fn print(out: &mut dyn Write, args: &[Value]) -> Result<Value, ErrorKind> {
    write_text(out, &format_values(args, ""))?;
    Ok(Value::Unit)
}

fn println(out: &mut dyn Write, args: &[Value]) -> Result<Value, ErrorKind> {
    let mut text = format_values(args, " ");
    text.push('\n');
    write_text(out, &text)?;
    Ok(Value::Unit)
}

fn write_text(out: &mut dyn Write, text: &str) -> Result<(), ErrorKind> {
    out.write_all(text.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|e| ErrorKind::Output(e.to_string()))
}

/// In-memory output sink. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer(Rc<RefCell<Vec<u8>>>);

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Float, Int};

    fn registry() -> (BuiltinRegistry, OutputBuffer) {
        let out = OutputBuffer::new();
        (BuiltinRegistry::new(Box::new(out.clone())), out)
    }

    #[test]
    fn test_println_separates_and_terminates() {
        let (mut builtins, out) = registry();
        let result = builtins
            .call(
                "println",
                &[Value::Str("answer:".into()), Value::Int(Int::Int(42))],
            )
            .unwrap();
        assert!(result.is_unit());
        assert_eq!(out.contents(), "answer: 42\n");
    }

    #[test]
    fn test_print_concatenates() {
        let (mut builtins, out) = registry();
        builtins
            .call(
                "print",
                &[
                    Value::Int(Int::U8(1)),
                    Value::Str(" ".into()),
                    Value::Float(Float::F64(2.5)),
                    Value::Bool(false),
                ],
            )
            .unwrap();
        assert_eq!(out.contents(), "1 2.5false");
    }

    #[test]
    fn test_println_without_arguments() {
        let (mut builtins, out) = registry();
        builtins.call("println", &[]).unwrap();
        assert_eq!(out.contents(), "\n");
    }

    #[test]
    fn test_unknown_builtin() {
        let (mut builtins, _) = registry();
        assert_eq!(
            builtins.call("my_print", &[]),
            Err(ErrorKind::UnknownBuiltin("my_print".to_string()))
        );
    }

    #[test]
    fn test_register_host_native() {
        let (mut builtins, out) = registry();
        builtins.register("my_print", |out: &mut dyn Write, args: &[Value]| {
            write!(out, "my_print: {}", format_values(args, ""))
                .map_err(|e| ErrorKind::Output(e.to_string()))?;
            Ok(Value::Unit)
        });
        assert!(builtins.contains("my_print"));
        builtins
            .call("my_print", &[Value::Str("Hello, wa!".into())])
            .unwrap();
        assert_eq!(out.contents(), "my_print: Hello, wa!");
    }
}
