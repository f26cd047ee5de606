//! Stack deployment and deletion workflows.
//!
//! A deployment always goes through a change set: decide whether the stack
//! is being created or updated, submit the change set, wait for it to be
//! computed, show it to the operator, execute it and wait for the stack to
//! settle. Deletion submits the delete and waits the same way.
//!
//! Every step is fatal on error. Nothing here retries.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cfn::{
    is_no_changes_message, Capability, ChangeSet, ChangeSetType, CreateChangeSetRequest,
    NameGenerator, Parameter, Poller, Settled, StackDirectory, StackWatcher, TemplateSource,
    TimestampNames, DEPLOY_SKIPPED,
};
use crate::error::{Result, StackError};
use crate::ui::{
    classify, format_change_set, AnsiPalette, ChangeSetFetcher, Confirm, Palette, StatusCategory,
    TerminalPrompt, DEFAULT_MAX_NESTING_DEPTH,
};

/// Inputs for a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOptions {
    /// Template body or URL.
    pub template: TemplateSource,
    /// Template parameters.
    pub parameters: Vec<Parameter>,
    /// Stack tags.
    pub tags: BTreeMap<String, String>,
    /// Target stack.
    pub stack_name: String,
    /// Optional execution role.
    pub role_arn: Option<String>,
    /// Skip the interactive confirmation.
    pub confirm: bool,
}

impl DeployOptions {
    /// Creates options with no parameters, tags or role.
    #[must_use]
    pub fn new(stack_name: impl Into<String>, template: TemplateSource) -> Self {
        Self {
            template,
            parameters: Vec::new(),
            tags: BTreeMap::new(),
            stack_name: stack_name.into(),
            role_arn: None,
            confirm: false,
        }
    }

    /// Sets the parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    /// Sets the execution role.
    #[must_use]
    pub fn with_role_arn(mut self, role_arn: Option<String>) -> Self {
        self.role_arn = role_arn;
        self
    }

    /// Skips (or requires) interactive confirmation.
    #[must_use]
    pub const fn with_confirm(mut self, confirm: bool) -> Self {
        self.confirm = confirm;
        self
    }
}

/// Outcome of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployResult {
    /// Target stack.
    pub stack_name: String,
    /// Change set that was submitted.
    pub change_set_name: String,
    /// Whether the stack was created or updated.
    pub change_set_type: ChangeSetType,
    /// Final stack status, or `DEPLOY_SKIPPED`.
    pub final_status: String,
    /// Operator-facing messages collected while settling.
    pub messages: Vec<String>,
}

impl DeployResult {
    /// Returns true if nothing was deployed because nothing changed.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.final_status == DEPLOY_SKIPPED
    }

    /// Display category of the final status.
    #[must_use]
    pub fn category(&self) -> StatusCategory {
        classify(&self.final_status).category
    }
}

/// Inputs for a deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Stack to delete.
    pub stack_name: String,
    /// Optional execution role.
    pub role_arn: Option<String>,
}

/// Outcome of a deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteResult {
    /// Deleted stack.
    pub stack_name: String,
    /// Final stack status.
    pub final_status: String,
    /// Operator-facing messages collected while settling.
    pub messages: Vec<String>,
}

/// Drives stacks through change-set deployments and deletions.
pub struct Deployer<'a, D: StackDirectory> {
    /// Remote directory.
    directory: &'a D,
    /// Polling driver and cancellation guard.
    poller: Poller,
    /// Change-set name source.
    names: Box<dyn NameGenerator>,
    /// Operator confirmation.
    confirmer: Box<dyn Confirm>,
    /// Diff colours.
    palette: Box<dyn Palette>,
    /// Nested change-set depth guard.
    max_nesting_depth: usize,
}

impl<'a, D: StackDirectory> Deployer<'a, D> {
    /// Creates a deployer with a terminal prompt, ANSI colours and
    /// timestamp-based change-set names.
    #[must_use]
    pub fn new(directory: &'a D, poller: Poller) -> Self {
        Self {
            directory,
            poller,
            names: Box::new(TimestampNames::new()),
            confirmer: Box::new(TerminalPrompt::new()),
            palette: Box::new(AnsiPalette),
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }

    /// Sets the change-set name generator.
    #[must_use]
    pub fn with_names(mut self, names: impl NameGenerator + 'static) -> Self {
        self.names = Box::new(names);
        self
    }

    /// Sets the confirmation prompt.
    #[must_use]
    pub fn with_confirmer(mut self, confirmer: impl Confirm + 'static) -> Self {
        self.confirmer = Box::new(confirmer);
        self
    }

    /// Sets the diff palette.
    #[must_use]
    pub fn with_palette(mut self, palette: impl Palette + 'static) -> Self {
        self.palette = Box::new(palette);
        self
    }

    /// Sets the nested change-set depth guard.
    #[must_use]
    pub const fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Deploys a template to a stack through a change set.
    ///
    /// A change set with no changes is not an error: the result carries the
    /// `DEPLOY_SKIPPED` status and nothing is executed.
    ///
    /// # Errors
    ///
    /// Returns an error if any remote call fails, the change set fails to
    /// compute, the operator declines, or the poller is cancelled.
    pub async fn deploy(&self, options: &DeployOptions) -> Result<DeployResult> {
        let stack_name = options.stack_name.as_str();
        debug!("Deploying {stack_name} via {}", self.directory.backend_type());

        let change_set_type = self.decide_type(stack_name).await?;
        let change_set_name = self.names.change_set_name(stack_name);

        info!("Creating {change_set_type} change set {change_set_name} for stack {stack_name}");

        let skipped = || DeployResult {
            stack_name: stack_name.to_string(),
            change_set_name: change_set_name.clone(),
            change_set_type,
            final_status: DEPLOY_SKIPPED.to_string(),
            messages: Vec::new(),
        };

        let request = CreateChangeSetRequest {
            change_set_type,
            change_set_name: change_set_name.clone(),
            stack_name: stack_name.to_string(),
            template: options.template.clone(),
            parameters: options.parameters.clone(),
            tags: options.tags.clone(),
            capabilities: Capability::DEFAULT.to_vec(),
            role_arn: options.role_arn.clone(),
            include_nested_stacks: true,
        };

        self.poller.ensure_active("creating change set")?;
        match self.directory.create_change_set(&request).await {
            Ok(()) => {}
            Err(e) if e.is_no_changes() => {
                warn!("Skipped deployment of {stack_name}: no changes in the change set");
                return Ok(skipped());
            }
            Err(e) => return Err(e),
        }

        let change_set = self.wait_for_change_set(stack_name, &change_set_name).await?;

        if change_set.is_failed() {
            let reason = change_set.status_reason.unwrap_or_default();
            if is_no_changes_message(&reason) {
                warn!("Skipped deployment of {stack_name}: no changes in the change set");
                return Ok(skipped());
            }
            return Err(StackError::RemoteOperationFailed {
                name: change_set_name,
                reason,
            }
            .into());
        }

        if !options.confirm {
            let diff = self.render_diff(stack_name, &change_set_name).await?;
            if !self.confirmer.confirm(&diff)? {
                warn!("Deployment of {stack_name} declined");
                return Err(StackError::UserCancelled.into());
            }
        }

        info!("Executing change set {change_set_name}");
        self.poller.ensure_active("executing change set")?;
        self.directory
            .execute_change_set(stack_name, &change_set_name)
            .await?;

        let settled = StackWatcher::new(self.directory, &self.poller)
            .wait_for_settle(stack_name)
            .await?;

        info!("Final stack status: {}", settled.status);

        Ok(DeployResult {
            stack_name: stack_name.to_string(),
            change_set_name,
            change_set_type,
            final_status: settled.status,
            messages: settled.messages,
        })
    }

    /// Deletes a stack and waits for it to settle.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete is rejected, polling fails, or the
    /// poller is cancelled.
    pub async fn delete(&self, options: &DeleteOptions) -> Result<DeleteResult> {
        let stack_name = options.stack_name.as_str();

        info!("Deleting stack {stack_name}");
        self.poller.ensure_active("deleting stack")?;
        self.directory
            .delete_stack(stack_name, options.role_arn.as_deref())
            .await?;

        let Settled { status, messages } = StackWatcher::new(self.directory, &self.poller)
            .wait_for_settle(stack_name)
            .await?;

        info!("Final stack status: {status}");

        Ok(DeleteResult {
            stack_name: stack_name.to_string(),
            final_status: status,
            messages,
        })
    }

    /// Chooses between creating and updating the stack.
    ///
    /// # Errors
    ///
    /// Returns any error other than "not found" from the stack lookup.
    pub async fn decide_type(&self, stack_name: &str) -> Result<ChangeSetType> {
        self.poller.ensure_active("describing stack")?;
        match self.directory.describe_stack(stack_name).await {
            Ok(stack) if stack.id.is_some() => {
                debug!("Stack {stack_name} exists, updating");
                Ok(ChangeSetType::Update)
            }
            Ok(_) => Ok(ChangeSetType::Create),
            Err(e) if e.is_not_found() => {
                debug!("Stack {stack_name} does not exist, creating");
                Ok(ChangeSetType::Create)
            }
            Err(e) => Err(e),
        }
    }

    /// Polls a change set until it is ready or has failed.
    ///
    /// # Errors
    ///
    /// Returns an error if a describe call fails or the poller is cancelled.
    pub async fn wait_for_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Result<ChangeSet> {
        let directory = self.directory;

        self.poller
            .until(
                "waiting for change set",
                move || async move {
                    directory
                        .describe_change_set(Some(stack_name), change_set_name)
                        .await
                },
                |change_set| {
                    debug!("Change set {} status: {}", change_set.name, change_set.status);
                    Ok(change_set.is_ready() || change_set.is_failed())
                },
            )
            .await
    }

    /// Renders a change set as a diff using this deployer's palette.
    ///
    /// # Errors
    ///
    /// Returns an error if any change set in the tree cannot be fetched.
    pub async fn render_diff(&self, stack_name: &str, change_set_name: &str) -> Result<String> {
        let tree = ChangeSetFetcher::new(self.directory, &self.poller)
            .with_max_depth(self.max_nesting_depth)
            .fetch(stack_name, change_set_name)
            .await?;
        Ok(format_change_set(&tree, self.palette.as_ref()))
    }
}
