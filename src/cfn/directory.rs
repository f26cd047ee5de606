//! Stack directory trait definition.
//!
//! This module defines the capability interface the orchestrators use to
//! talk to the remote control plane. Implementations must normalize provider
//! errors into [`StackError`](crate::error::StackError) before returning.

use async_trait::async_trait;

use crate::error::Result;

use super::types::{ChangeSet, CreateChangeSetRequest, Stack, StackResource};

/// Trait for remote stack directories.
#[async_trait]
pub trait StackDirectory: Send + Sync {
    /// Fetches a stack by name or id.
    ///
    /// A missing stack is reported as `StackError::NotFound`, whichever error
    /// shape the remote used.
    async fn describe_stack(&self, stack_name: &str) -> Result<Stack>;

    /// Fetches the resources of a stack.
    async fn describe_stack_resources(&self, stack_name: &str) -> Result<Vec<StackResource>>;

    /// Fetches a change set.
    ///
    /// With no stack name the change set is resolved by its id alone, which
    /// is how nested change sets are looked up.
    async fn describe_change_set(
        &self,
        stack_name: Option<&str>,
        change_set_name: &str,
    ) -> Result<ChangeSet>;

    /// Submits a change set for creation.
    ///
    /// A request with no detectable diff is reported as
    /// `StackError::NoChangesDetected`.
    async fn create_change_set(&self, request: &CreateChangeSetRequest) -> Result<()>;

    /// Executes a previously created change set.
    async fn execute_change_set(&self, stack_name: &str, change_set_name: &str) -> Result<()>;

    /// Deletes a stack.
    async fn delete_stack(&self, stack_name: &str, role_arn: Option<&str>) -> Result<()>;

    /// Gets the backend name, for logging.
    fn backend_type(&self) -> &'static str;
}
