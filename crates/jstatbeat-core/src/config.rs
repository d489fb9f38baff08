//! Target and tool settings supplied once at startup.

use crate::collector::ToolCommand;

/// Sampling interval used when none is configured, in milliseconds.
pub const DEFAULT_INTERVAL: &str = "5000";

/// Default program used to list running JVMs.
pub const DEFAULT_LISTING_TOOL: &str = "jps";

/// Default program used to sample GC statistics.
pub const DEFAULT_SAMPLING_TOOL: &str = "jstat";

/// Error type for invalid settings.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Target name is empty.
    EmptyName,
    /// Target name contains whitespace and can never match a `jps` line.
    NameHasWhitespace(String),
    /// Interval is not a positive integer number of milliseconds.
    InvalidInterval(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EmptyName => write!(f, "target process name is empty"),
            ConfigError::NameHasWhitespace(name) => {
                write!(f, "target process name '{}' contains whitespace", name)
            }
            ConfigError::InvalidInterval(value) => write!(
                f,
                "invalid interval '{}': expected a positive number of milliseconds",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// The process to sample and how often.
///
/// Immutable for the lifetime of a run. The interval is kept as the string
/// handed to `jstat`, but it is validated as a positive integer.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSpec {
    name: String,
    interval: String,
}

impl TargetSpec {
    /// Validates and builds a target spec.
    pub fn new(name: impl Into<String>, interval: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        let interval = interval.into().trim().to_string();

        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if name.chars().any(char::is_whitespace) {
            return Err(ConfigError::NameHasWhitespace(name));
        }
        match interval.parse::<u64>() {
            Ok(ms) if ms > 0 => {}
            _ => return Err(ConfigError::InvalidInterval(interval)),
        }

        Ok(Self { name, interval })
    }

    /// Name of the main class or jar as printed by `jps`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sampling interval in milliseconds, as passed to `jstat`.
    pub fn interval(&self) -> &str {
        &self.interval
    }
}

/// Commands used to launch the external JDK tools.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub listing: ToolCommand,
    pub sampling: ToolCommand,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            listing: ToolCommand::new(DEFAULT_LISTING_TOOL),
            sampling: ToolCommand::new(DEFAULT_SAMPLING_TOOL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_spec_valid() {
        let spec = TargetSpec::new("MyApp", "1000").unwrap();
        assert_eq!(spec.name(), "MyApp");
        assert_eq!(spec.interval(), "1000");
    }

    #[test]
    fn test_target_spec_default_interval() {
        let spec = TargetSpec::new("MyApp", DEFAULT_INTERVAL).unwrap();
        assert_eq!(spec.interval(), "5000");
    }

    #[test]
    fn test_target_spec_trims_interval() {
        let spec = TargetSpec::new("MyApp", " 250 ").unwrap();
        assert_eq!(spec.interval(), "250");
    }

    #[test]
    fn test_target_spec_rejects_bad_name() {
        assert_eq!(TargetSpec::new("", "1000"), Err(ConfigError::EmptyName));
        assert_eq!(
            TargetSpec::new("My App", "1000"),
            Err(ConfigError::NameHasWhitespace("My App".to_string()))
        );
    }

    #[test]
    fn test_target_spec_rejects_bad_interval() {
        for bad in ["", "0", "-5", "1.5", "5s"] {
            assert!(
                matches!(
                    TargetSpec::new("MyApp", bad),
                    Err(ConfigError::InvalidInterval(_))
                ),
                "interval {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_tool_settings_default_programs() {
        let tools = ToolSettings::default();
        assert_eq!(tools.listing.program(), "jps");
        assert_eq!(tools.sampling.program(), "jstat");
    }
}
