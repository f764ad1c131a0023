//! Reference evaluator for programs of the reference language.
//!
//! This walks the published operation tree directly. It exists to check
//! lowering results end to end, not to be fast.
//!
//! # Module Structure
//!
//! - `value` - Runtime value representation
//! - `interpreter` - Tree-walking evaluation, builtins and calls
//! - `stack` - Stack growth for deep recursion

mod interpreter;
mod stack;
mod value;

pub use interpreter::{Builtin, Interpreter, MAX_CALL_DEPTH};
pub use value::{ObjectRef, Value};
