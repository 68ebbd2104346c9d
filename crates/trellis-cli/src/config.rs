//! CLI configuration

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use trellis_core::EntityKind;

use crate::output::OutputFormat;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Get default config file path
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trellis")
        .join("config.toml")
}

/// Configuration for the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output format: text, json, pretty
    pub output_format: String,
    /// Entity kind used by `id generate` when none is given
    pub default_kind: String,
    /// Log level used without -v/-q
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_format: "text".to_string(),
            default_kind: EntityKind::Node.to_string(),
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load from `path`, falling back to defaults when the file is missing
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn keys() -> &'static [&'static str] {
        &["output_format", "default_kind", "log_level"]
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "output_format" => Some(self.output_format.clone()),
            "default_kind" => Some(self.default_kind.clone()),
            "log_level" => Some(self.log_level.clone()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "output_format" => {
                if OutputFormat::parse(value).is_none() {
                    anyhow::bail!(
                        "Invalid output format '{}', expected one of: {}",
                        value,
                        OutputFormat::NAMES.join(", ")
                    );
                }
                self.output_format = value.to_lowercase();
            }
            "default_kind" => {
                let kind: EntityKind = value.parse().map_err(anyhow::Error::msg)?;
                self.default_kind = kind.to_string();
            }
            "log_level" => {
                let level = value.to_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    anyhow::bail!(
                        "Invalid log level '{}', expected one of: {}",
                        value,
                        LOG_LEVELS.join(", ")
                    );
                }
                self.log_level = level;
            }
            _ => anyhow::bail!(
                "Unknown config key: {} (available: {})",
                key,
                Self::keys().join(", ")
            ),
        }
        Ok(())
    }

    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::parse(&self.output_format).unwrap_or(OutputFormat::Text)
    }

    pub fn default_kind(&self) -> anyhow::Result<EntityKind> {
        self.default_kind.parse().map_err(anyhow::Error::msg)
    }
}
