//! Configuration types for a single stack deployment.
//!
//! This module defines the structs that map to `cloudform.yaml`. Every field
//! has a default so a deployment can also be described entirely by CLI flags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::cfn::Parameter;
use crate::ui::DEFAULT_MAX_NESTING_DEPTH;

/// The root configuration structure for a deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
    /// Stack target.
    #[serde(default)]
    pub stack: StackConfig,
    /// Template parameter values.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    /// Stack tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Polling and guard settings.
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// Which stack to deploy and how to reach it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    /// Stack name.
    #[serde(default)]
    pub name: Option<String>,
    /// Template path, URL or inline body.
    #[serde(default)]
    pub template: Option<String>,
    /// Execution role assumed by the control plane.
    #[serde(default)]
    pub role_arn: Option<String>,
    /// AWS region (falls back to the SDK's resolution chain).
    #[serde(default)]
    pub region: Option<String>,
    /// Named AWS profile.
    #[serde(default)]
    pub profile: Option<String>,
}

/// Polling and guard settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SettingsConfig {
    /// Seconds between two polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Deepest nested change set rendered.
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
    /// Overall deadline in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_nesting_depth: default_max_nesting_depth(),
            timeout_secs: None,
        }
    }
}

const fn default_poll_interval_secs() -> u64 {
    2
}

const fn default_max_nesting_depth() -> usize {
    DEFAULT_MAX_NESTING_DEPTH
}

impl DeployConfig {
    /// Parameters in key order.
    #[must_use]
    pub fn parameter_list(&self) -> Vec<Parameter> {
        self.parameters
            .iter()
            .map(|(k, v)| Parameter::new(k.as_str(), v.as_str()))
            .collect()
    }

    /// Merges `KEY=VALUE` pairs over the file's parameters.
    pub fn merge_parameters(&mut self, pairs: impl IntoIterator<Item = (String, String)>) {
        self.parameters.extend(pairs);
    }

    /// Merges `KEY=VALUE` pairs over the file's tags.
    pub fn merge_tags(&mut self, pairs: impl IntoIterator<Item = (String, String)>) {
        self.tags.extend(pairs);
    }
}

impl SettingsConfig {
    /// Delay between two polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Overall deadline, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
