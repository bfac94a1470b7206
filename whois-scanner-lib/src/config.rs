//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `WS_*`
//! environment variables and layering them onto a [`ScanConfig`]. Precedence,
//! highest first: CLI arguments, environment, config files, built-in defaults.

use crate::error::ScannerError;
use crate::types::{OutputFormat, ScanConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<InputConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// `[input]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct InputConfig {
    /// Input document path or URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Rules file for CSV domain lists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<String>,

    /// Schema overriding the embedded one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// `[rate_limit]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RateLimitConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calls: Option<u32>,

    /// Window length: whole seconds, or a string like "60s" / "2m"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<PeriodValue>,
}

/// A rate-limit period as written in TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PeriodValue {
    Seconds(u64),
    Text(String),
}

impl PeriodValue {
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            PeriodValue::Seconds(secs) => Some(Duration::from_secs(*secs)),
            PeriodValue::Text(text) => parse_duration_string(text).map(Duration::from_secs),
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    /// Report format: json, csv-summary or csv-full
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Report destination (stdout when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl FileConfig {
    /// Layer this file configuration onto `config`.
    ///
    /// Values were validated at load time; anything still unusable is skipped.
    pub fn apply(&self, mut config: ScanConfig) -> ScanConfig {
        if let Some(input) = &self.input {
            if let Some(path) = &input.path {
                config.input = path.clone();
            }
            if let Some(rules) = &input.rules {
                config.rules = Some(PathBuf::from(rules));
            }
            if let Some(schema) = &input.schema {
                config.schema = Some(PathBuf::from(schema));
            }
        }

        if let Some(rate_limit) = &self.rate_limit {
            if let Some(calls) = rate_limit.calls {
                config.rate_limit_calls = calls;
            }
            if let Some(period) = rate_limit.period.as_ref().and_then(PeriodValue::as_duration) {
                config.rate_limit_period = period;
            }
        }

        if let Some(output) = &self.output {
            if let Some(format) = output.format.as_deref().and_then(|f| f.parse().ok()) {
                config = config.with_format(format);
            }
            if let Some(path) = &output.path {
                config.output = Some(PathBuf::from(path));
            }
        }

        config
    }
}

/// Configuration discovery and loading functionality.
#[derive(Debug, Default)]
pub struct ConfigManager;

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ScannerError::InvalidSettings` when the file is missing,
    /// unreadable, not valid TOML or holds values that cannot be used.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, ScannerError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScannerError::invalid_settings(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ScannerError::invalid_settings(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            ScannerError::invalid_settings(format!(
                "Failed to parse TOML configuration {}: {}",
                path.display(),
                e
            ))
        })?;

        self.validate_config(&config)?;
        tracing::debug!("Loaded configuration from {}", path.display());

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is lowest, then the home directory file, then the working
    /// directory file. Discovered files that fail to load are reported and
    /// the error is returned.
    pub fn discover_and_load(&self) -> Result<FileConfig, ScannerError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            let config = self.load_file(&path)?;
            merged_config = self.merge_configs(merged_config, config);
            loaded_files.push(path);
        }

        if loaded_files.len() > 1 {
            tracing::info!(
                "Multiple config files found, later ones take precedence: {}",
                loaded_files
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        Ok(merged_config)
    }

    /// Local configuration file in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./whois-scanner.toml", "./.whois-scanner.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Global configuration file in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        let candidates = [".whois-scanner.toml", "whois-scanner.toml"];

        candidates
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// XDG configuration file.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("whois-scanner").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations; values from `higher` win field by field.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            input: match (lower.input, higher.input) {
                (Some(lower_input), Some(higher_input)) => Some(InputConfig {
                    path: higher_input.path.or(lower_input.path),
                    rules: higher_input.rules.or(lower_input.rules),
                    schema: higher_input.schema.or(lower_input.schema),
                }),
                (lower_input, higher_input) => higher_input.or(lower_input),
            },
            rate_limit: match (lower.rate_limit, higher.rate_limit) {
                (Some(lower_limit), Some(higher_limit)) => Some(RateLimitConfig {
                    calls: higher_limit.calls.or(lower_limit.calls),
                    period: higher_limit.period.or(lower_limit.period),
                }),
                (lower_limit, higher_limit) => higher_limit.or(lower_limit),
            },
            output: match (lower.output, higher.output) {
                (Some(lower_output), Some(higher_output)) => Some(OutputConfig {
                    format: higher_output.format.or(lower_output.format),
                    path: higher_output.path.or(lower_output.path),
                }),
                (lower_output, higher_output) => higher_output.or(lower_output),
            },
        }
    }

    /// Validate a configuration for values a run cannot use.
    fn validate_config(&self, config: &FileConfig) -> Result<(), ScannerError> {
        if let Some(rate_limit) = &config.rate_limit {
            if rate_limit.calls == Some(0) {
                return Err(ScannerError::invalid_settings(
                    "rate_limit.calls must be greater than 0",
                ));
            }

            if let Some(period) = &rate_limit.period {
                match period.as_duration() {
                    Some(duration) if !duration.is_zero() => {}
                    _ => {
                        return Err(ScannerError::invalid_settings(format!(
                            "Invalid rate_limit.period {:?}. Use seconds or a format like '60s', '2m'",
                            period
                        )));
                    }
                }
            }
        }

        if let Some(format) = config.output.as_ref().and_then(|o| o.format.as_deref()) {
            format
                .parse::<OutputFormat>()
                .map_err(ScannerError::invalid_settings)?;
        }

        if let Some(path) = config.input.as_ref().and_then(|i| i.path.as_deref()) {
            if path.trim().is_empty() {
                return Err(ScannerError::invalid_settings("input.path cannot be empty"));
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via WS_* environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub input: Option<String>,
    pub rules: Option<String>,
    pub schema: Option<String>,
    pub output: Option<String>,
    pub format: Option<OutputFormat>,
    pub rate_limit_calls: Option<u32>,
    pub rate_limit_period: Option<Duration>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Layer the environment configuration onto `config`.
    pub fn apply(&self, mut config: ScanConfig) -> ScanConfig {
        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(rules) = &self.rules {
            config.rules = Some(PathBuf::from(rules));
        }
        if let Some(schema) = &self.schema {
            config.schema = Some(PathBuf::from(schema));
        }
        if let Some(output) = &self.output {
            config.output = Some(PathBuf::from(output));
        }
        if let Some(format) = self.format {
            config = config.with_format(format);
        }
        if let Some(calls) = self.rate_limit_calls {
            config.rate_limit_calls = calls;
        }
        if let Some(period) = self.rate_limit_period {
            config.rate_limit_period = period;
        }
        config
    }
}

/// Load configuration from the process environment.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Load configuration from an arbitrary variable lookup.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    env_config.input = non_empty("WS_INPUT");
    env_config.rules = non_empty("WS_RULES");
    env_config.schema = non_empty("WS_SCHEMA");
    env_config.output = non_empty("WS_OUTPUT");
    env_config.config = non_empty("WS_CONFIG");

    // WS_FORMAT - json, csv-summary or csv-full
    if let Some(val) = non_empty("WS_FORMAT") {
        match val.parse::<OutputFormat>() {
            Ok(format) => env_config.format = Some(format),
            Err(e) => tracing::warn!("Ignoring WS_FORMAT='{}': {}", val, e),
        }
    }

    // WS_RATE_LIMIT_CALLS - lookups per window
    if let Some(val) = non_empty("WS_RATE_LIMIT_CALLS") {
        match val.trim().parse::<u32>() {
            Ok(calls) if calls > 0 => env_config.rate_limit_calls = Some(calls),
            _ => tracing::warn!(
                "Ignoring WS_RATE_LIMIT_CALLS='{}', must be a positive integer",
                val
            ),
        }
    }

    // WS_RATE_LIMIT_PERIOD - window length ("60", "60s", "2m")
    if let Some(val) = non_empty("WS_RATE_LIMIT_PERIOD") {
        match parse_duration_string(&val) {
            Some(secs) if secs > 0 => {
                env_config.rate_limit_period = Some(Duration::from_secs(secs))
            }
            _ => tracing::warn!(
                "Ignoring WS_RATE_LIMIT_PERIOD='{}', use a format like '60', '60s', '2m'",
                val
            ),
        }
    }

    env_config
}

/// Parse a duration string like "5s", "30s", "2m" into seconds.
///
/// A bare number is taken as seconds.
pub fn parse_duration_string(duration_str: &str) -> Option<u64> {
    let duration_str = duration_str.trim().to_lowercase();

    if let Some(secs) = duration_str.strip_suffix('s') {
        secs.parse::<u64>().ok()
    } else if let Some(mins) = duration_str.strip_suffix('m') {
        mins.parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        duration_str.parse::<u64>().ok()
    }
}
