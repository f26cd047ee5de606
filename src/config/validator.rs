//! Configuration validation for deployments.
//!
//! Checks run before any remote call so obviously malformed inputs never
//! reach the control plane.

use crate::error::{CloudformError, ConfigError, Result};
use tracing::debug;

use super::spec::{DeployConfig, SettingsConfig, StackConfig};

/// Longest stack name the control plane accepts.
pub const MAX_STACK_NAME_LEN: usize = 128;

/// Upper bound accepted for the nested change-set depth guard.
pub const MAX_NESTING_DEPTH_LIMIT: usize = 256;

/// Poll intervals above this produce a warning.
const SLOW_POLL_INTERVAL_SECS: u64 = 60;

/// Validator for deployment configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator {
    /// Whether a template must be present (deploy) or not (delete, status).
    require_template: bool,
    /// Whether the stack name may be left out (diff by change-set id).
    stack_name_optional: bool,
}

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a validator that does not require a template.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            require_template: false,
            stack_name_optional: false,
        }
    }

    /// Requires `stack.template` to be set.
    #[must_use]
    pub const fn requiring_template(mut self) -> Self {
        self.require_template = true;
        self
    }

    /// Accepts a configuration without `stack.name`.
    ///
    /// A name that is given is still checked.
    #[must_use]
    pub const fn allowing_missing_stack_name(mut self) -> Self {
        self.stack_name_optional = true;
        self
    }

    /// Validates a deployment configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any check fails.
    pub fn validate(&self, config: &DeployConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        self.validate_stack(&config.stack, &mut result);
        Self::validate_parameters(config, &mut result);
        Self::validate_settings(&config.settings, &mut result);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(CloudformError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    fn validate_stack(&self, stack: &StackConfig, result: &mut ValidationResult) {
        match stack.name.as_deref() {
            None | Some("") if self.stack_name_optional => {}
            None | Some("") => result.error("stack.name", "Stack name is required"),
            Some(name) if !is_valid_stack_name(name) => result.error(
                "stack.name",
                format!(
                    "Stack name '{name}' is invalid. Must start with a letter, contain only \
                     alphanumerics and hyphens, and be at most {MAX_STACK_NAME_LEN} characters."
                ),
            ),
            Some(_) => {}
        }

        if self.require_template && stack.template.as_deref().is_none_or(str::is_empty) {
            result.error("stack.template", "A template path, URL or body is required");
        }

        if let Some(role) = &stack.role_arn
            && !role.starts_with("arn:")
        {
            result.error(
                "stack.role_arn",
                format!("Role '{role}' is not an ARN (expected 'arn:...:role/...')"),
            );
        }
    }

    fn validate_parameters(config: &DeployConfig, result: &mut ValidationResult) {
        for key in config.parameters.keys() {
            if !is_valid_parameter_key(key) {
                result.error(
                    format!("parameters.{key}"),
                    format!("Parameter name '{key}' must be alphanumeric"),
                );
            }
        }

        for key in config.tags.keys() {
            if key.trim().is_empty() {
                result.error("tags", "Tag keys cannot be empty");
            } else if key.starts_with("aws:") {
                result.error(
                    format!("tags.{key}"),
                    "Tag keys starting with 'aws:' are reserved",
                );
            }
        }
    }

    fn validate_settings(settings: &SettingsConfig, result: &mut ValidationResult) {
        if settings.poll_interval_secs == 0 {
            result.error("settings.poll_interval_secs", "Poll interval must be at least 1 second");
        } else if settings.poll_interval_secs > SLOW_POLL_INTERVAL_SECS {
            result.warnings.push(format!(
                "settings.poll_interval_secs is {}s; progress will be slow to show",
                settings.poll_interval_secs
            ));
        }

        if settings.max_nesting_depth == 0 || settings.max_nesting_depth > MAX_NESTING_DEPTH_LIMIT {
            result.error(
                "settings.max_nesting_depth",
                format!("Nesting depth must be between 1 and {MAX_NESTING_DEPTH_LIMIT}"),
            );
        }

        if settings.timeout_secs == Some(0) {
            result.error("settings.timeout_secs", "Timeout must be at least 1 second");
        }
    }
}

/// Stack names start with a letter and contain only ASCII alphanumerics
/// and hyphens.
fn is_valid_stack_name(name: &str) -> bool {
    let mut chars = name.chars();

    let Some(first) = chars.next() else {
        return false;
    };

    first.is_ascii_alphabetic()
        && name.len() <= MAX_STACK_NAME_LEN
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_valid_parameter_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric())
}

impl ValidationResult {
    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
