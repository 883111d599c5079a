//! Host capabilities exposed to executed code.
//!
//! Everything here is an ordinary [`HostFunction`](crate::evaluator::HostFunction)
//! or value. Capabilities with effects are wrapped in [`Guarded`] so that an
//! abandoned attempt cannot change anything after its generation moves on.

pub mod guard;
pub mod rope;
pub mod standard;

pub use guard::{guard, Guarded};
pub use rope::{RopeBoard, RopeEvent};
pub use standard::{console, sleep, StandardCapabilities};
