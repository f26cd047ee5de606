//! Configuration parser for loading deploy files.
//!
//! This module handles loading configuration from YAML files and environment
//! variables. Precedence, lowest first: file, environment, CLI flags (the
//! last applied by the caller).

use crate::error::{CloudformError, ConfigError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::DeployConfig;

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "CLOUDFORM_";

/// Configuration parser for loading deployment configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving `.env`.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path used to find `.env`.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<DeployConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(CloudformError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            CloudformError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// An empty document yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<DeployConfig> {
        debug!("Parsing YAML configuration");

        if content.trim().is_empty() {
            return Ok(DeployConfig::default());
        }

        let config: DeployConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            CloudformError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed configuration for stack: {}",
            config.stack.name.as_deref().unwrap_or("<unset>")
        );
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Environment variables take the form `CLOUDFORM_<KEY>`, e.g.
    /// `CLOUDFORM_STACK_NAME`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an override
    /// is not a valid number.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<DeployConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric override cannot be parsed.
    pub fn apply_env_overrides(
        config: &mut DeployConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        let var = |suffix: &str| {
            let key = format!("{ENV_PREFIX}{suffix}");
            lookup(&key).inspect(|_| debug!("Overriding {key} from environment"))
        };

        if let Some(name) = var("STACK_NAME") {
            config.stack.name = Some(name);
        }
        if let Some(template) = var("TEMPLATE") {
            config.stack.template = Some(template);
        }
        if let Some(role) = var("ROLE_ARN") {
            config.stack.role_arn = Some(role);
        }
        if let Some(region) = var("REGION") {
            config.stack.region = Some(region);
        }
        if let Some(profile) = var("PROFILE") {
            config.stack.profile = Some(profile);
        }
        if let Some(interval) = var("POLL_INTERVAL_SECS") {
            config.settings.poll_interval_secs = parse_number("CLOUDFORM_POLL_INTERVAL_SECS", &interval)?;
        }
        if let Some(timeout) = var("TIMEOUT_SECS") {
            config.settings.timeout_secs = Some(parse_number("CLOUDFORM_TIMEOUT_SECS", &timeout)?);
        }

        Ok(())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                CloudformError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

fn parse_number(name: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| {
        CloudformError::Config(ConfigError::validation(
            format!("'{value}' is not a whole number of seconds"),
            name,
        ))
    })
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["cloudform.yaml", "cloudform.yml"];

/// Per-user configuration file, e.g. `~/.config/cloudform/cloudform.yaml`.
#[must_use]
pub fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cloudform").join(DEFAULT_CONFIG_FILES[0]))
}

/// Finds the configuration file in the given directory or its parents,
/// falling back to the per-user file.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    if let Some(user_file) = user_config_file().filter(|p| p.exists()) {
        info!("Using user configuration file: {}", user_file.display());
        return Ok(user_file);
    }

    Err(CloudformError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_full_config() {
        let yaml = r"
stack:
  name: payments-api
  template: templates/main.yaml
  role_arn: arn:aws:iam::123456789012:role/deployer
  region: eu-west-1
parameters:
  Env: prod
  InstanceType: t3.small
tags:
  team: payments
settings:
  poll_interval_secs: 5
  timeout_secs: 1800
";
        let config = ConfigParser::new().parse_yaml(yaml, None).unwrap();

        assert_eq!(config.stack.name.as_deref(), Some("payments-api"));
        assert_eq!(config.stack.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.parameters.len(), 2);
        assert_eq!(config.tags["team"], "payments");
        assert_eq!(config.settings.poll_interval_secs, 5);
        assert_eq!(config.settings.max_nesting_depth, 32);
        assert_eq!(config.settings.timeout_secs, Some(1800));
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = ConfigParser::new().parse_yaml("  \n", None).unwrap();
        assert_eq!(config, DeployConfig::default());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = ConfigParser::new().parse_yaml("stack:\n  nmae: typo\n", None);
        assert!(matches!(
            result,
            Err(CloudformError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CLOUDFORM_STACK_NAME", "from-env"),
            ("CLOUDFORM_POLL_INTERVAL_SECS", "7"),
        ]);
        let mut config = DeployConfig::default();

        ConfigParser::apply_env_overrides(&mut config, |key| env.get(key).map(|v| (*v).to_string()))
            .unwrap();

        assert_eq!(config.stack.name.as_deref(), Some("from-env"));
        assert_eq!(config.settings.poll_interval_secs, 7);
        assert!(config.stack.template.is_none());
    }

    #[test]
    fn test_invalid_numeric_override() {
        let mut config = DeployConfig::default();
        let result = ConfigParser::apply_env_overrides(&mut config, |key| {
            (key == "CLOUDFORM_TIMEOUT_SECS").then(|| String::from("soon"))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_and_find_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("infra").join("app");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("cloudform.yaml"), "stack:\n  name: root-stack\n").unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("cloudform.yaml"));

        let config = ConfigParser::new().load_file(&found).unwrap();
        assert_eq!(config.stack.name.as_deref(), Some("root-stack"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigParser::new().load_file(dir.path().join("cloudform.yaml"));
        assert!(matches!(
            result,
            Err(CloudformError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_load_dotenv_without_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ConfigParser::new().with_base_path(dir.path()).load_dotenv().is_ok());
    }
}
