//! Evaluation of parsed scripts.
//!
//! - [`value`] — runtime values, shared arrays/objects, callables.
//! - [`interpreter`] — the async tree-walking interpreter.
//! - [`host`] — the [`HostFunction`] seam for capabilities.
//! - [`intrinsics`] — `Math`, `Error` and friends.
//! - [`operators`] / [`type_coercion`] — operator and conversion semantics.

pub mod host;
pub mod interpreter;
pub mod intrinsics;
pub mod members;
pub mod operators;
pub mod scope;
pub mod type_coercion;
pub mod value;

pub use host::{host_fn, sync_fn, HostError, HostFunction, HostResult};
pub use interpreter::{EvalResult, Interpreter, Interrupt, Limits};
pub use intrinsics::{Intrinsic, MathFn};
pub use scope::Scope;
pub use value::{Callable, Closure, ErrorKind, ErrorObject, PropertyMap, Value};
