//! CloudFormation-backed stack directory.
//!
//! This module implements [`StackDirectory`] on top of the AWS SDK and is the
//! only place where provider error shapes are inspected. Everything leaving
//! this module has been normalized into [`StackError`].

use async_trait::async_trait;
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::types as sdk;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{CloudformError, Result, StackError};

use super::directory::StackDirectory;
use super::types::{
    is_no_changes_message, ChangeAction, ChangeSet, ChangeSetType, CreateChangeSetRequest,
    ResourceChange, Stack, StackResource, TemplateSource,
};

/// Error code the API uses for request validation failures, including
/// lookups of stacks that do not exist.
const VALIDATION_ERROR_CODE: &str = "ValidationError";

/// Error codes that explicitly mean "not found".
const NOT_FOUND_CODES: &[&str] = &[
    "StackNotFoundException",
    "ChangeSetNotFound",
    "ChangeSetNotFoundException",
];

/// Error codes that mean the request itself was rejected.
const REJECTED_CODES: &[&str] = &[
    VALIDATION_ERROR_CODE,
    "InsufficientCapabilitiesException",
    "AlreadyExistsException",
    "InvalidChangeSetStatus",
    "TokenAlreadyExistsException",
];

/// CloudFormation client.
#[derive(Debug, Clone)]
pub struct CfnClient {
    /// SDK client.
    client: Client,
    /// Checked before every page after the first.
    cancel: CancellationToken,
}

impl CfnClient {
    /// Creates a client from the ambient AWS configuration.
    ///
    /// Credentials are resolved by the SDK's default chain; `region` and
    /// `profile` override the environment when given.
    pub async fn from_env(region: Option<&str>, profile: Option<&str>) -> Self {
        let mut loader = aws_config::from_env();

        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }

        let config = loader.load().await;
        info!(
            "Using AWS region: {}",
            config.region().map_or("default", |r| r.as_ref())
        );

        Self::with_client(Client::new(&config))
    }

    /// Creates a directory with an existing SDK client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops multi-page reads once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn ensure_active(&self, operation: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(StackError::cancelled(operation).into());
        }
        Ok(())
    }
}

/// Classifies an SDK error into the stack error taxonomy.
fn normalize<E, R>(operation: &str, subject: &str, err: &SdkError<E, R>) -> CloudformError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().unwrap_or_default();
    let message = err
        .message()
        .map_or_else(|| DisplayErrorContext(err).to_string(), str::to_string);

    debug!("{operation} failed for {subject}: code={code:?} message={message}");

    let error = if NOT_FOUND_CODES.contains(&code)
        || (code == VALIDATION_ERROR_CODE && message.contains("does not exist"))
    {
        StackError::NotFound {
            name: subject.to_string(),
        }
    } else if is_no_changes_message(&message) {
        StackError::NoChangesDetected {
            stack_name: subject.to_string(),
        }
    } else if REJECTED_CODES.contains(&code) {
        StackError::validation(operation, message)
    } else {
        StackError::transport(operation, message)
    };

    error.into()
}

fn to_resource_change(change: &sdk::ResourceChange) -> ResourceChange {
    ResourceChange {
        action: ChangeAction::from_remote(change.action().map_or("", |a| a.as_str())),
        resource_type: change.resource_type().unwrap_or_default().to_string(),
        logical_id: change.logical_resource_id().unwrap_or_default().to_string(),
        nested_change_set: change.change_set_id().map(str::to_string),
    }
}

#[async_trait]
impl StackDirectory for CfnClient {
    async fn describe_stack(&self, stack_name: &str) -> Result<Stack> {
        debug!("Describing stack: {stack_name}");

        let output = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| normalize("describing stack", stack_name, &e))?;

        let stack = output.stacks().first().ok_or_else(|| StackError::NotFound {
            name: stack_name.to_string(),
        })?;

        Ok(Stack {
            name: stack.stack_name().unwrap_or(stack_name).to_string(),
            id: stack.stack_id().map(str::to_string),
            status: stack
                .stack_status()
                .map_or_else(String::new, |s| s.as_str().to_string()),
            status_reason: stack.stack_status_reason().map(str::to_string),
        })
    }

    async fn describe_stack_resources(&self, stack_name: &str) -> Result<Vec<StackResource>> {
        debug!("Describing resources of stack: {stack_name}");

        let output = self
            .client
            .describe_stack_resources()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| normalize("describing stack resources", stack_name, &e))?;

        Ok(output
            .stack_resources()
            .iter()
            .map(|r| StackResource {
                logical_id: r.logical_resource_id().unwrap_or_default().to_string(),
                physical_id: r.physical_resource_id().map(str::to_string),
                resource_type: r.resource_type().unwrap_or_default().to_string(),
                status: r
                    .resource_status()
                    .map_or_else(String::new, |s| s.as_str().to_string()),
                status_reason: r.resource_status_reason().map(str::to_string),
            })
            .collect())
    }

    async fn describe_change_set(
        &self,
        stack_name: Option<&str>,
        change_set_name: &str,
    ) -> Result<ChangeSet> {
        debug!("Describing change set: {change_set_name}");

        let mut next_token: Option<String> = None;
        let mut snapshot: Option<ChangeSet> = None;

        // Large change sets are paginated; the header comes from the first page.
        loop {
            let output = self
                .client
                .describe_change_set()
                .change_set_name(change_set_name)
                .set_stack_name(stack_name.map(str::to_string))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| normalize("describing change set", change_set_name, &e))?;

            let page: Vec<ResourceChange> = output
                .changes()
                .iter()
                .filter_map(|c| c.resource_change())
                .map(to_resource_change)
                .collect();

            match snapshot.as_mut() {
                Some(existing) => existing.changes.extend(page),
                None => {
                    snapshot = Some(ChangeSet {
                        name: output
                            .change_set_name()
                            .unwrap_or(change_set_name)
                            .to_string(),
                        id: output.change_set_id().map(str::to_string),
                        stack_name: output
                            .stack_name()
                            .or(stack_name)
                            .unwrap_or_default()
                            .to_string(),
                        status: output
                            .status()
                            .map_or_else(String::new, |s| s.as_str().to_string()),
                        status_reason: output.status_reason().map(str::to_string),
                        changes: page,
                    });
                }
            }

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
            self.ensure_active("describing change set")?;
        }

        snapshot.ok_or_else(|| {
            StackError::NotFound {
                name: change_set_name.to_string(),
            }
            .into()
        })
    }

    async fn create_change_set(&self, request: &CreateChangeSetRequest) -> Result<()> {
        info!(
            "Creating {} change set {} for stack {}",
            request.change_set_type, request.change_set_name, request.stack_name
        );

        let tags = request
            .tags
            .iter()
            .map(|(key, value)| sdk::Tag::builder().key(key).value(value).build())
            .collect::<Vec<_>>();

        let parameters = request
            .parameters
            .iter()
            .map(|p| {
                sdk::Parameter::builder()
                    .parameter_key(&p.key)
                    .parameter_value(&p.value)
                    .build()
            })
            .collect::<Vec<_>>();

        let change_set_type = match request.change_set_type {
            ChangeSetType::Create => sdk::ChangeSetType::Create,
            ChangeSetType::Update => sdk::ChangeSetType::Update,
        };

        let mut builder = self
            .client
            .create_change_set()
            .change_set_type(change_set_type)
            .change_set_name(&request.change_set_name)
            .stack_name(&request.stack_name)
            .include_nested_stacks(request.include_nested_stacks)
            .set_tags(Some(tags))
            .set_parameters(Some(parameters))
            .set_role_arn(request.role_arn.clone());

        for capability in &request.capabilities {
            builder = builder.capabilities(sdk::Capability::from(capability.as_str()));
        }

        builder = match &request.template {
            TemplateSource::Body(body) => builder.template_body(body),
            TemplateSource::Url(url) => builder.template_url(url),
        };

        builder
            .send()
            .await
            .map_err(|e| normalize("creating change set", &request.stack_name, &e))?;

        Ok(())
    }

    async fn execute_change_set(&self, stack_name: &str, change_set_name: &str) -> Result<()> {
        info!("Executing change set {change_set_name} on stack {stack_name}");

        self.client
            .execute_change_set()
            .change_set_name(change_set_name)
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| normalize("executing change set", stack_name, &e))?;

        Ok(())
    }

    async fn delete_stack(&self, stack_name: &str, role_arn: Option<&str>) -> Result<()> {
        info!("Deleting stack: {stack_name}");

        self.client
            .delete_stack()
            .stack_name(stack_name)
            .set_role_arn(role_arn.map(str::to_string))
            .send()
            .await
            .map_err(|e| normalize("deleting stack", stack_name, &e))?;

        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "cloudformation"
    }
}
