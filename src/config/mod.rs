//! Configuration module for cloudform.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `cloudform.yaml`
//! - Environment and `.env` overrides
//! - Validation of configuration values
//! - Resolving the template argument into a body or URL

mod parser;
mod spec;
mod template;
mod validator;

pub use parser::{
    find_config_file, user_config_file, ConfigParser, DEFAULT_CONFIG_FILES, ENV_PREFIX,
};
pub use spec::{DeployConfig, SettingsConfig, StackConfig};
pub use template::resolve_template;
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
