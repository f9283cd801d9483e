//! Dependency graph executor

pub(crate) mod executor;
pub mod graph;
pub(crate) mod validate;

pub use graph::{Builder, Results, TaskDescriptor, TaskGraph};
