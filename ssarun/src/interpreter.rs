//! This module provides the core interpretation logic for the interpreter.
//!
//! It executes SSA programs one basic block at a time. The [`Engine`] owns
//! the global store and the builtin registry; each user function call gets its
//! own [`crate::memory::frame::Frame`], nested on the Rust call stack.

pub mod function;
mod operand;
pub mod ops;

pub use function::Engine;
