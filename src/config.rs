//! Aggregate agent configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fusion::engine::FusionConfig;
use crate::memory::core::config::MemoryConfig;
use crate::pipeline::orchestrator::PipelineConfig;
use crate::retrieval::config::RetrievalConfig;

/// Environment variable naming a JSON configuration file.
pub const CONFIG_ENV: &str = "COMMUNITY_AGENT_CONFIG";

/// Environment variable overriding the listen port.
pub const PORT_ENV: &str = "COMMUNITY_AGENT_PORT";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The JSON could not be parsed.
    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid {section} configuration: {message}")]
    Invalid {
        /// Offending section.
        section: &'static str,
        /// What is wrong.
        message: String,
    },
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Full agent configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Memory tiers.
    pub memory: MemoryConfig,
    /// Retrieval retry policy.
    pub retrieval: RetrievalConfig,
    /// Fusion settings.
    pub fusion: FusionConfig,
    /// Pipeline settings.
    pub pipeline: PipelineConfig,
    /// HTTP listen port.
    pub port: u16,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            memory: MemoryConfig::default(),
            retrieval: RetrievalConfig::default(),
            fusion: FusionConfig::default(),
            pipeline: PipelineConfig::default(),
            port: DEFAULT_PORT,
        }
    }
}

impl AgentConfig {
    /// Parse and validate a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or a value is invalid.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Load from [`CONFIG_ENV`] when set, then apply [`PORT_ENV`].
    ///
    /// # Errors
    /// Returns an error if the file or the port override is invalid.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_json_file(path.trim())?,
            _ => Self::default(),
        };
        config.apply_port_override(std::env::var(PORT_ENV).ok().as_deref())?;
        config.validate()?;
        Ok(config)
    }

    /// Override the port from a raw string.
    ///
    /// # Errors
    /// Returns an error if the value is not a valid port.
    pub fn apply_port_override(&mut self, raw: Option<&str>) -> ConfigResult<()> {
        let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Ok(());
        };
        self.port = raw.parse().map_err(|_| ConfigError::Invalid {
            section: "server",
            message: format!("{PORT_ENV} must be a port number, got {raw:?}"),
        })?;
        Ok(())
    }

    /// Validate every section.
    ///
    /// # Errors
    /// Returns the first invalid section.
    pub fn validate(&self) -> ConfigResult<()> {
        self.memory.validate().map_err(|e| invalid("memory", e))?;
        self.retrieval.validate().map_err(|e| invalid("retrieval", e))?;
        self.fusion.validate().map_err(|e| invalid("fusion", e))?;
        self.pipeline.validate().map_err(|e| invalid("pipeline", e))?;
        Ok(())
    }
}

fn invalid(section: &'static str, err: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        section,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AgentConfig::from_json_str(
            r#"{
                "port": 8080,
                "memory": {"working_memory_max_items": 20},
                "retrieval": {"max_retries": 1, "retry_delay": 200},
                "pipeline": {"documentation_endpoints": ["https://docs.example/search?q={query}"]}
            }"#,
        );
        let config = config.unwrap_or_default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.memory.working_memory_max_items, 20);
        assert_eq!(config.memory.short_term_memory_slots, 10);
        assert_eq!(config.retrieval.retry_delay, Duration::from_millis(200));
        assert_eq!(config.pipeline.documentation_endpoints.len(), 1);
        assert_eq!(config.fusion.max_sources, 5);
    }

    #[test]
    fn test_invalid_section_is_reported() {
        let err = AgentConfig::from_json_str(r#"{"fusion": {"max_sources": 0}}"#);
        assert!(matches!(err, Err(ConfigError::Invalid { section: "fusion", .. })));

        let err = AgentConfig::from_json_str(r#"{"memory": {"cleanup_interval": 0}}"#);
        assert!(matches!(err, Err(ConfigError::Invalid { section: "memory", .. })));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            AgentConfig::from_json_str("{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            AgentConfig::from_json_file("/nonexistent/community-agent.json"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_port_override() {
        let mut config = AgentConfig::default();
        assert!(config.apply_port_override(Some(" 4000 ")).is_ok());
        assert_eq!(config.port, 4000);
        assert!(config.apply_port_override(None).is_ok());
        assert_eq!(config.port, 4000);
        assert!(config.apply_port_override(Some("http")).is_err());
    }
}
