use serde::{Deserialize, Serialize};

use super::errors::ConfigError;

/// What `auto` does with a dependency name that is not a task in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDependency {
    /// Fail the run with `FlowError::UnknownDependency` before anything starts
    #[default]
    Reject,
    /// Treat the name as already satisfied; it will be absent from `Results`
    Ignore,
}

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Run id attached to tracing spans and emitted events
    pub name: String,
    /// Handling of undeclared dependency names in `auto`
    pub on_missing_dependency: MissingDependency,
    /// Reject cyclic graphs up front instead of leaving them pending forever
    pub detect_cycles: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            name: "flow".to_string(),
            on_missing_dependency: MissingDependency::Reject,
            detect_cycles: false,
        }
    }
}

impl FlowConfig {
    /// Parse a configuration from YAML; absent fields take their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("name must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_missing_dependency(mut self, policy: MissingDependency) -> Self {
        self.on_missing_dependency = policy;
        self
    }

    pub fn with_cycle_detection(mut self, enabled: bool) -> Self {
        self.detect_cycles = enabled;
        self
    }
}
