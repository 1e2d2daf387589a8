//! Operand evaluation.
//!
//! Operands are resolved against the current frame: SSA values are looked up,
//! constants are materialized and globals evaluate to the address of their cell.

use crate::error::ErrorKind;
use crate::ir::{GlobalId, Operand};
use crate::memory::frame::Frame;
use crate::value::{Addr, Value};

impl super::function::Engine<'_> {
    /// Produces the runtime value of an operand.
    pub(super) fn evaluate_operand(&self, frame: &Frame, operand: &Operand) -> Result<Value, ErrorKind> {
        match operand {
            Operand::Value(id) => frame.lookup(*id),
            Operand::Const(constant) => constant.materialize(),
            Operand::Global(id) => Ok(Value::Addr(self.global_address(*id)?)),
        }
    }

    /// Evaluates an operand that must produce an address.
    pub(super) fn evaluate_address(&self, frame: &Frame, operand: &Operand) -> Result<Addr, ErrorKind> {
        match self.evaluate_operand(frame, operand)? {
            Value::Addr(addr) => Ok(addr),
            other => Err(ErrorKind::TypeMismatch {
                op: "store".to_string(),
                left: "pointer".to_string(),
                right: other.type_name(),
            }),
        }
    }

    pub(super) fn global_address(&self, id: GlobalId) -> Result<Addr, ErrorKind> {
        let global = self
            .program
            .global(id)
            .ok_or_else(|| ErrorKind::UnknownGlobal(format!("#{}", id.0)))?;
        self.globals.address(&global.name)
    }
}
