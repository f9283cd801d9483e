use std::fmt;
use thiserror::Error;

use crate::task::Failure;

/// Identifies the unit of work a failure came from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskLabel {
    /// Position in a parallel or series group
    Index(usize),
    /// Task name in a dependency graph
    Name(String),
}

impl fmt::Display for TaskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "task #{}", index),
            Self::Name(name) => write!(f, "task '{}'", name),
        }
    }
}

/// Error returned by the governing future of `parallel`, `series` and `auto`
///
/// `E` is the caller's failure value. Only [`FlowError::Task`] carries one.
/// [`FlowError::Panicked`] is a unit that panicked instead of settling; the
/// graph variants describe a malformed graph and are raised before any unit
/// is started.
#[derive(Debug, Error)]
pub enum FlowError<E> {
    /// A unit of work settled with failure
    #[error("{task} failed: {error}")]
    Task { task: TaskLabel, error: E },

    /// A unit of work panicked before settling
    #[error("{task} panicked: {message}")]
    Panicked { task: TaskLabel, message: String },

    /// A task lists a dependency that is not declared in the graph
    #[error("Task '{task}' depends on undeclared task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    /// Tasks wait on each other (only reported when cycle detection is on)
    #[error("Dependency cycle between tasks: {}", .tasks.join(", "))]
    DependencyCycle { tasks: Vec<String> },
}

impl<E> FlowError<E> {
    pub(crate) fn task(task: TaskLabel, error: E) -> Self {
        Self::Task { task, error }
    }

    pub(crate) fn from_failure(task: TaskLabel, failure: Failure<E>) -> Self {
        match failure {
            Failure::Rejected(error) => Self::task(task, error),
            Failure::Panicked(message) => Self::Panicked { task, message },
        }
    }

    /// The failure value supplied by the unit of work, if any
    pub fn task_error(&self) -> Option<&E> {
        match self {
            Self::Task { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Consume the error and return the unit's failure value, if any
    pub fn into_task_error(self) -> Option<E> {
        match self {
            Self::Task { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Which unit failed or panicked
    pub fn failed_task(&self) -> Option<&TaskLabel> {
        match self {
            Self::Task { task, .. } | Self::Panicked { task, .. } => Some(task),
            _ => None,
        }
    }

    /// True when a unit of work failed or panicked, false for a rejected graph
    pub fn is_task_failure(&self) -> bool {
        matches!(self, Self::Task { .. } | Self::Panicked { .. })
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Task { .. } => "task",
            Self::Panicked { .. } => "panic",
            Self::UnknownDependency { .. } | Self::DependencyCycle { .. } => "graph",
        }
    }
}

/// Result type alias for the governing future's output
pub type FlowResult<T, E> = std::result::Result<T, FlowError<E>>;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration invalid: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_error_display() {
        let err: FlowError<&str> = FlowError::task(TaskLabel::Name("fetch".into()), "boom");
        assert_eq!(err.to_string(), "task 'fetch' failed: boom");
        assert_eq!(err.category(), "task");

        let err: FlowError<&str> = FlowError::task(TaskLabel::Index(3), "boom");
        assert_eq!(err.to_string(), "task #3 failed: boom");
    }

    #[test]
    fn test_task_error_accessors() {
        let err: FlowError<u32> = FlowError::task(TaskLabel::Index(0), 7);
        assert!(err.is_task_failure());
        assert_eq!(err.task_error(), Some(&7));
        assert_eq!(err.failed_task(), Some(&TaskLabel::Index(0)));
        assert_eq!(err.into_task_error(), Some(7));
    }

    #[test]
    fn test_failure_conversion() {
        let err: FlowError<&str> =
            FlowError::from_failure(TaskLabel::Index(2), Failure::Rejected("nope"));
        assert_eq!(err.task_error(), Some(&"nope"));

        let err: FlowError<&str> = FlowError::from_failure(
            TaskLabel::Name("p".into()),
            Failure::Panicked("unit threw".into()),
        );
        assert!(err.is_task_failure());
        assert_eq!(err.task_error(), None);
        assert_eq!(err.failed_task(), Some(&TaskLabel::Name("p".into())));
        assert_eq!(err.category(), "panic");
        assert_eq!(err.to_string(), "task 'p' panicked: unit threw");
    }

    #[test]
    fn test_graph_errors() {
        let err: FlowError<u32> = FlowError::UnknownDependency {
            task: "c".into(),
            dependency: "z".into(),
        };
        assert!(!err.is_task_failure());
        assert_eq!(err.category(), "graph");
        assert_eq!(err.task_error(), None);
        assert_eq!(err.to_string(), "Task 'c' depends on undeclared task 'z'");

        let err: FlowError<u32> = FlowError::DependencyCycle {
            tasks: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "Dependency cycle between tasks: a, b");
    }
}
