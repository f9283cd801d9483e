//! Small task orchestration primitives.
//!
//! Three entry points share one unit-of-work contract ([`Task`]):
//!
//! - [`parallel`] starts every task at once and collects results in input order.
//! - [`series`] starts each task after the previous one succeeded.
//! - [`auto`] runs a named [`TaskGraph`], starting each task once its
//!   dependencies succeeded and handing it their [`Results`].
//!
//! Each resolves with all results, or with the first failure observed.
//! Tasks already running when a failure is observed are not cancelled.
//!
//! ```no_run
//! use tandem::{auto, Task, TaskGraph};
//!
//! # async fn demo() -> Result<(), tandem::FlowError<String>> {
//! let graph: TaskGraph<i64, String> = TaskGraph::new()
//!     .task("a", Task::ok(10))
//!     .task("b", Task::ok(3))
//!     .dependent("c", ["a", "b"], |results| {
//!         let sum = results["a"] + results["b"];
//!         Task::ok(sum)
//!     });
//!
//! let results = auto(graph).await?;
//! assert_eq!(results["c"], 13);
//! # Ok(())
//! # }
//! ```

// Core infrastructure modules
pub mod core;

pub mod auto;
pub mod events;
mod flow;
mod runner;
pub mod task;

// Re-exports for convenience
pub use crate::core::{ConfigError, FlowConfig, FlowError, FlowResult, MissingDependency, TaskLabel};
pub use auto::{Results, TaskDescriptor, TaskGraph};
pub use events::{
    BufferingEventSink, ChannelEventSink, EventSink, FlowEvent, FlowEventEnvelope,
    LoggingEventSink, RunMode,
};
pub use flow::{auto, parallel, series, Flow};
pub use task::{Failure, Pending, Settler, Task};
