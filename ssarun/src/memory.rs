//! Interpreter memory.
//!
//! Memory is made of cells, each holding exactly one [`Value`]. Cells are only
//! reachable through [`Addr`] values. Global variables own one cell each in the
//! [`globals::GlobalStore`]; SSA values of an in-flight call live in its
//! [`frame::Frame`].

pub mod frame;
pub mod globals;

use crate::error::ErrorKind;
use crate::value::{Addr, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// A mutable storage cell shared by every address that refers to it.
pub type Cell = Rc<RefCell<Value>>;

/// Loads the value stored at `addr`.
pub fn read_addr(addr: &Addr) -> Result<Value, ErrorKind> {
    let cell = addr.cell().ok_or(ErrorKind::NilDereference)?;
    Ok(cell.borrow().clone())
}

/// Stores `value` into the cell `addr` refers to. The cell keeps the type of
/// the value it was created with.
pub fn write_addr(addr: &Addr, value: Value) -> Result<(), ErrorKind> {
    let cell = addr.cell().ok_or(ErrorKind::NilDereference)?;
    let mut slot = cell.borrow_mut();
    if !slot.same_type(&value) {
        return Err(ErrorKind::TypeMismatch {
            op: "store".to_string(),
            left: slot.type_name(),
            right: value.type_name(),
        });
    }
    *slot = value;
    Ok(())
}
