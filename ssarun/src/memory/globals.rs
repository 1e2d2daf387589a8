//! Global variable storage.
//!
//! Each global declared by the program owns one cell, created by
//! [`GlobalStore::initialize`] and alive for as long as the store. Cells are
//! keyed by the global's qualified name.

use crate::error::ErrorKind;
use crate::ir::Program;
use crate::memory::{self, Cell};
use crate::value::{Addr, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Default)]
pub struct GlobalStore {
    cells: HashMap<String, Cell>,
    initialized: bool,
}

impl GlobalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a zero-valued cell for every global of `program`.
    ///
    /// Only the first call has an effect.
    pub fn initialize(&mut self, program: &Program) -> Result<(), ErrorKind> {
        if self.initialized {
            return Ok(());
        }
        let mut cells = HashMap::with_capacity(program.globals.len());
        for global in &program.globals {
            let zero = global.ty.zero_value()?;
            debug!("Initializing global {}: {} = {}", global.name, global.ty, zero);
            cells.insert(global.name.clone(), Rc::new(RefCell::new(zero)));
        }
        self.cells = cells;
        self.initialized = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the address of the global's cell.
    pub fn address(&self, name: &str) -> Result<Addr, ErrorKind> {
        self.cells
            .get(name)
            .map(|cell| Addr::from_cell(Rc::clone(cell)))
            .ok_or_else(|| ErrorKind::UnknownGlobal(name.to_string()))
    }

    /// Reads the current value of a global.
    pub fn read(&self, name: &str) -> Result<Value, ErrorKind> {
        memory::read_addr(&self.address(name)?)
    }

    /// Overwrites the value of a global.
    pub fn write(&self, name: &str, value: Value) -> Result<(), ErrorKind> {
        memory::write_addr(&self.address(name)?, value)
    }
}
