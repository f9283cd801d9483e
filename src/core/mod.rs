// Core infrastructure shared by every runner

pub mod config;
pub mod errors;

// Re-export commonly used types
pub use config::{FlowConfig, MissingDependency};
pub use errors::{ConfigError, FlowError, FlowResult, TaskLabel};
