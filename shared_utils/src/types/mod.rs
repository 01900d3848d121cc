//! Type-Safe Wrappers Module
//!
//! - `iteration`: iteration-count guard for open-ended search loops

pub mod iteration;

pub use iteration::{IterationError, IterationGuard, DEFAULT_MAX_ITERATIONS};
