//! Activation record of a user function call.
//!
//! A frame maps every SSA value of the running function to its computed
//! [`Value`]. Values are indexed by [`ValueId`], so the environment is a flat
//! vector sized from the function's value count. The frame also remembers the
//! block being executed and the block executed before it; phi instructions
//! select their incoming value from the latter.

use crate::error::ErrorKind;
use crate::ir::{BlockId, ValueId};
use crate::value::Value;

#[derive(Debug)]
pub struct Frame {
    env: Vec<Option<Value>>,
    /// `None` once the function returned.
    block: Option<BlockId>,
    prev_block: Option<BlockId>,
    result: Value,
}

impl Frame {
    pub fn new(value_count: usize, entry: BlockId) -> Self {
        Self {
            env: vec![None; value_count],
            block: Some(entry),
            prev_block: None,
            result: Value::Unit,
        }
    }

    /// Binds an SSA value. Loops re-execute their body, so a binding may be
    /// replaced by the next dynamic instance of the same instruction.
    pub fn bind(&mut self, id: ValueId, value: Value) -> Result<(), ErrorKind> {
        let slot = self
            .env
            .get_mut(id.0)
            .ok_or(ErrorKind::UnboundValue(id.0))?;
        *slot = Some(value);
        Ok(())
    }

    pub fn lookup(&self, id: ValueId) -> Result<Value, ErrorKind> {
        self.env
            .get(id.0)
            .and_then(Option::clone)
            .ok_or(ErrorKind::UnboundValue(id.0))
    }

    pub fn current_block(&self) -> Option<BlockId> {
        self.block
    }

    pub fn previous_block(&self) -> Option<BlockId> {
        self.prev_block
    }

    /// Moves control from the current block to `target`.
    pub fn transfer(&mut self, target: BlockId) {
        self.prev_block = self.block;
        self.block = Some(target);
    }

    /// Records the return value and leaves the function.
    pub fn finish(&mut self, result: Value) {
        self.result = result;
        self.block = None;
    }

    pub fn into_result(self) -> Value {
        self.result
    }
}
