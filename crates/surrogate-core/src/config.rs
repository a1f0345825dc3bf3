//! Mock configuration parsing and management.
//!
//! Options can be built in code or loaded from a TOML file shared by a test
//! suite:
//!
//! ```toml
//! track_mocks = true
//!
//! [mocks]
//! behavior = "strict"
//! default_value = "mock"
//! call_base = false
//! stub_properties = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::defaults::DefaultValue;

/// How a mock answers calls that no setup governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MockBehavior {
    /// Unmatched calls fail with [`MockError::UnmatchedCall`](crate::MockError::UnmatchedCall).
    Strict,
    /// Unmatched calls return a default value.
    #[default]
    Loose,
}

/// Per-mock options, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct MockOptions {
    /// Strict or loose handling of unmatched calls.
    pub behavior: MockBehavior,

    /// Default-value synthesis mode for unmatched calls.
    pub default_value: DefaultValue,

    /// Delegate unmatched calls to the base implementation when one exists.
    pub call_base: bool,

    /// Stub every property at creation (stateful getters/setters). Nested
    /// mocks inherit this.
    pub stub_properties: bool,
}

impl MockOptions {
    /// Loose options with every other setting at its default.
    #[must_use]
    pub const fn loose() -> Self {
        Self {
            behavior: MockBehavior::Loose,
            default_value: DefaultValue::Empty,
            call_base: false,
            stub_properties: false,
        }
    }

    /// Strict options with every other setting at its default.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            behavior: MockBehavior::Strict,
            ..Self::loose()
        }
    }

    /// Sets the default-value mode.
    #[must_use]
    pub const fn with_default_value(mut self, default_value: DefaultValue) -> Self {
        self.default_value = default_value;
        self
    }

    /// Sets whether unmatched calls delegate to the base implementation.
    #[must_use]
    pub const fn with_call_base(mut self, call_base: bool) -> Self {
        self.call_base = call_base;
        self
    }

    /// Sets whether properties are stubbed at creation.
    #[must_use]
    pub const fn with_stub_properties(mut self, stub_properties: bool) -> Self {
        self.stub_properties = stub_properties;
        self
    }

    /// Returns `true` for strict mocks.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        matches!(self.behavior, MockBehavior::Strict)
    }
}

/// Configuration for a [`MockFactory`](crate::factory::MockFactory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FactoryConfig {
    /// Keep handles to created mocks for bulk verification.
    pub track_mocks: bool,

    /// Options applied to every mock the factory creates.
    pub mocks: MockOptions,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            track_mocks: true,
            mocks: MockOptions::default(),
        }
    }
}

impl FactoryConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or contains unknown keys.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = FactoryConfig::from_toml("").unwrap();
        assert_eq!(config, FactoryConfig::default());
        assert_eq!(config.mocks.behavior, MockBehavior::Loose);
        assert!(config.track_mocks);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            track_mocks = false

            [mocks]
            behavior = "strict"
            default_value = "mock"
            call_base = true
            stub_properties = true
        "#;

        let config = FactoryConfig::from_toml(toml).unwrap();
        assert!(!config.track_mocks);
        assert!(config.mocks.is_strict());
        assert_eq!(config.mocks.default_value, DefaultValue::Mock);
        assert!(config.mocks.call_base);
        assert!(config.mocks.stub_properties);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = FactoryConfig::from_toml("[mocks]\nbehaviour = \"strict\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_roundtrip_through_file() {
        let config = FactoryConfig {
            track_mocks: true,
            mocks: MockOptions::strict().with_default_value(DefaultValue::Mock),
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml().unwrap().as_bytes()).unwrap();

        let loaded = FactoryConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FactoryConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
