//! Engine configuration: parsing and loading from TOML or JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::orchestrator::OrchestratorConfig;
use crate::sandbox::RunnerConfig;

/// Supported config file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format (`.toml`).
    Toml,
    /// JSON format (`.json`).
    Json,
}

impl ConfigFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub runner: RunnerConfig,
    pub orchestrator: OrchestratorConfig,
}

impl EngineConfig {
    /// Parse config content. Missing fields take their defaults.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let config: EngineConfig = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, format)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.orchestrator.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "orchestrator.timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.runner.max_call_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "runner.max_call_depth",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.runner.max_steps == Some(0) {
            return Err(ConfigError::Invalid {
                field: "runner.max_steps",
                reason: "must be greater than zero when set".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::AbandonPolicy;
    use std::io::Write;

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[runner]
yield_interval = 250
max_steps = 100000
abandon = "abort"

[orchestrator]
timeout_ms = 1500
"#;
        let config = EngineConfig::parse(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.runner.yield_interval, 250);
        assert_eq!(config.runner.max_steps, Some(100_000));
        assert_eq!(config.runner.abandon, AbandonPolicy::Abort);
        assert_eq!(config.runner.max_call_depth, 100);
        assert_eq!(config.orchestrator.timeout_ms, 1500);
    }

    #[test]
    fn test_parse_json_defaults() {
        let config = EngineConfig::parse("{}", ConfigFormat::Json).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = EngineConfig::parse("[orchestrator]\ntimeout_ms = 0\n", ConfigFormat::Toml)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "orchestrator.timeout_ms",
                ..
            }
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"orchestrator": {{"timeout_ms": 250}}}}"#).unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.orchestrator.timeout_ms, 250);
    }

    #[test]
    fn test_unknown_extension() {
        let err = EngineConfig::load("engine.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "yaml"));
    }
}
