//! Domain types for stacks, change sets and their requests.
//!
//! These are immutable snapshots of remote state. Statuses are kept as raw
//! strings because the remote set of values is open-ended; display
//! categories are always derived through the status classifier.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Message the control plane reports when a change set has no diff.
pub const NO_CHANGES_MESSAGE: &str =
    "The submitted information didn't contain changes. Submit different information to create a change set.";

/// Message returned when an update has nothing to do.
pub const NO_UPDATES_MESSAGE: &str = "No updates are to be performed.";

/// Final status reported when a deployment is skipped for lack of changes.
pub const DEPLOY_SKIPPED: &str = "DEPLOY_SKIPPED";

/// Status reported for a stack that vanished while being deleted.
pub const DELETE_COMPLETE: &str = "DELETE_COMPLETE";

/// Returns true if the message is one of the known "nothing to change" replies.
#[must_use]
pub fn is_no_changes_message(message: &str) -> bool {
    let message = message.trim();
    message == NO_CHANGES_MESSAGE || message == NO_UPDATES_MESSAGE
}

/// Returns true once a stack status is no longer transitional.
#[must_use]
pub fn is_settled(status: &str) -> bool {
    !(status.ends_with("_IN_PROGRESS") || status.ends_with("_PENDING"))
}

/// Snapshot of a remote stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    /// Stack name.
    pub name: String,
    /// Opaque stack id, present once the stack exists.
    pub id: Option<String>,
    /// Raw status string.
    pub status: String,
    /// Reason attached to the current status.
    pub status_reason: Option<String>,
}

/// A resource belonging to a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackResource {
    /// Logical id from the template.
    pub logical_id: String,
    /// Physical id assigned by the provider.
    pub physical_id: Option<String>,
    /// Resource type, e.g. `AWS::S3::Bucket`.
    pub resource_type: String,
    /// Raw status string.
    pub status: String,
    /// Reason attached to the current status.
    pub status_reason: Option<String>,
}

/// Whether a change set creates a new stack or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeSetType {
    /// The stack does not exist yet.
    Create,
    /// The stack already exists.
    Update,
}

impl fmt::Display for ChangeSetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
        };
        write!(f, "{s}")
    }
}

/// Action a change set will take on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeAction {
    /// Resource will be created.
    Add,
    /// Resource will be modified in place or replaced.
    Modify,
    /// Resource will be deleted.
    Remove,
    /// Any other action the remote reports (import, dynamic).
    Other(String),
}

impl ChangeAction {
    /// Parses the raw action string from the remote.
    #[must_use]
    pub fn from_remote(action: &str) -> Self {
        match action {
            "Add" => Self::Add,
            "Modify" => Self::Modify,
            "Remove" => Self::Remove,
            other => Self::Other(other.to_string()),
        }
    }

    /// Single-character marker shown in the diff tree.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Modify => ">",
            Self::Remove => "-",
            Self::Other(_) => "?",
        }
    }
}

/// A single resource change inside a change set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceChange {
    /// What will happen to the resource.
    pub action: ChangeAction,
    /// Resource type.
    pub resource_type: String,
    /// Logical id from the template.
    pub logical_id: String,
    /// Id of the nested stack's own change set, for nested stack resources.
    pub nested_change_set: Option<String>,
}

impl ResourceChange {
    /// Creates a change for a plain (non-stack) resource.
    #[must_use]
    pub fn new(action: ChangeAction, resource_type: &str, logical_id: &str) -> Self {
        Self {
            action,
            resource_type: resource_type.to_string(),
            logical_id: logical_id.to_string(),
            nested_change_set: None,
        }
    }

    /// Marks this change as a nested stack backed by the given change set.
    #[must_use]
    pub fn with_nested_change_set(mut self, change_set_id: &str) -> Self {
        self.nested_change_set = Some(change_set_id.to_string());
        self
    }

    /// Returns true if this change is a nested stack.
    #[must_use]
    pub const fn is_nested(&self) -> bool {
        self.nested_change_set.is_some()
    }
}

/// Snapshot of a change set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Change set name.
    pub name: String,
    /// Opaque change set id.
    pub id: Option<String>,
    /// Stack the change set targets.
    pub stack_name: String,
    /// Raw status string.
    pub status: String,
    /// Failure reason, when the remote supplies one.
    pub status_reason: Option<String>,
    /// Ordered resource changes.
    pub changes: Vec<ResourceChange>,
}

impl ChangeSet {
    /// Returns true when the change set is ready to be executed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status.ends_with("_COMPLETE")
    }

    /// Returns true when the change set failed to compute.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == "FAILED"
    }
}

/// Elevated permissions a deployment declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capability {
    /// Allows creating IAM resources with custom names.
    NamedIam,
    /// Allows macros and nested stacks to expand.
    AutoExpand,
}

impl Capability {
    /// Capabilities every deployment requests.
    pub const DEFAULT: [Self; 2] = [Self::NamedIam, Self::AutoExpand];

    /// Wire name of the capability.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NamedIam => "CAPABILITY_NAMED_IAM",
            Self::AutoExpand => "CAPABILITY_AUTO_EXPAND",
        }
    }
}

/// Where the template comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateSource {
    /// Inline template body.
    Body(String),
    /// Template hosted at a URL.
    Url(String),
}

/// A template parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub key: String,
    /// Parameter value.
    pub value: String,
}

impl Parameter {
    /// Creates a parameter.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Request to create a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateChangeSetRequest {
    /// Create or update.
    pub change_set_type: ChangeSetType,
    /// Unique change set name.
    pub change_set_name: String,
    /// Target stack.
    pub stack_name: String,
    /// Template body or URL.
    pub template: TemplateSource,
    /// Parameter values.
    pub parameters: Vec<Parameter>,
    /// Stack tags, sorted by key.
    pub tags: BTreeMap<String, String>,
    /// Declared capabilities.
    pub capabilities: Vec<Capability>,
    /// Optional execution role.
    pub role_arn: Option<String>,
    /// Whether nested stacks get their own change sets.
    pub include_nested_stacks: bool,
}
