//! Waiting for a stack to settle.
//!
//! After a change set is executed (or a delete is submitted) the stack moves
//! through transitional statuses on its own. This module polls the stack
//! until it reaches a terminal status and collects the resource-level
//! failure reasons an operator needs to see.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;

use super::directory::StackDirectory;
use super::poller::Poller;
use super::types::{is_settled, Stack, StackResource, DELETE_COMPLETE};

/// Final state of a settled stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settled {
    /// Terminal status string.
    pub status: String,
    /// Operator-facing messages, in the order they were first seen.
    pub messages: Vec<String>,
}

/// Ordered, de-duplicated failure messages.
#[derive(Debug, Default)]
struct MessageLog {
    seen: HashSet<String>,
    messages: Vec<String>,
}

impl MessageLog {
    fn push(&mut self, message: String) {
        if self.seen.insert(message.clone()) {
            debug!("Stack message: {message}");
            self.messages.push(message);
        }
    }

    fn observe(&mut self, snapshot: &StackSnapshot) {
        for resource in &snapshot.resources {
            if !resource.status.ends_with("_FAILED") {
                continue;
            }
            if let Some(reason) = resource.status_reason.as_deref().filter(|r| !r.is_empty()) {
                self.push(format!("{}: {reason}", resource.logical_id));
            }
        }

        if snapshot.stack.status.ends_with("_FAILED") || snapshot.stack.status.contains("ROLLBACK") {
            if let Some(reason) = snapshot.stack.status_reason.as_deref().filter(|r| !r.is_empty()) {
                self.push(format!("{}: {reason}", snapshot.stack.name));
            }
        }
    }
}

/// One poll's view of the stack.
#[derive(Debug)]
struct StackSnapshot {
    stack: Stack,
    resources: Vec<StackResource>,
}

/// Polls a stack until it settles.
#[derive(Debug)]
pub struct StackWatcher<'a, D: StackDirectory> {
    /// Remote directory.
    directory: &'a D,
    /// Polling driver.
    poller: &'a Poller,
}

impl<'a, D: StackDirectory> StackWatcher<'a, D> {
    /// Creates a watcher.
    #[must_use]
    pub const fn new(directory: &'a D, poller: &'a Poller) -> Self {
        Self { directory, poller }
    }

    /// Waits until the stack's own status is no longer transitional.
    ///
    /// The stack is followed by id after the first lookup, so a stack being
    /// deleted stays observable. A stack that can no longer be found is
    /// reported as `DELETE_COMPLETE`.
    ///
    /// # Errors
    ///
    /// Returns an error if a remote call fails or the poller is cancelled.
    pub async fn wait_for_settle(&self, stack_name: &str) -> Result<Settled> {
        self.poller.ensure_active("describing stack")?;

        let target = match self.directory.describe_stack(stack_name).await {
            Ok(stack) => stack.id.unwrap_or(stack.name),
            Err(e) if e.is_not_found() => {
                info!("Stack {stack_name} no longer exists");
                return Ok(Settled {
                    status: DELETE_COMPLETE.to_string(),
                    messages: Vec::new(),
                });
            }
            Err(e) => return Err(e),
        };

        let directory = self.directory;
        let poller = self.poller;
        let target = target.as_str();
        let mut log = MessageLog::default();

        let snapshot = self
            .poller
            .until(
                "waiting for stack to settle",
                move || async move { fetch_snapshot(directory, poller, stack_name, target).await },
                |snapshot| {
                    log.observe(snapshot);
                    debug!("Stack {} status: {}", snapshot.stack.name, snapshot.stack.status);
                    Ok(is_settled(&snapshot.stack.status))
                },
            )
            .await?;

        info!("Stack {stack_name} settled with status {}", snapshot.stack.status);

        Ok(Settled {
            status: snapshot.stack.status,
            messages: log.messages,
        })
    }
}

async fn fetch_snapshot<D: StackDirectory>(
    directory: &D,
    poller: &Poller,
    stack_name: &str,
    target: &str,
) -> Result<StackSnapshot> {
    let stack = match directory.describe_stack(target).await {
        Ok(stack) => stack,
        Err(e) if e.is_not_found() => {
            return Ok(StackSnapshot {
                stack: Stack {
                    name: stack_name.to_string(),
                    id: Some(target.to_string()),
                    status: DELETE_COMPLETE.to_string(),
                    status_reason: None,
                },
                resources: Vec::new(),
            });
        }
        Err(e) => return Err(e),
    };

    poller.ensure_active("describing stack resources")?;
    let resources = match directory.describe_stack_resources(target).await {
        Ok(resources) => resources,
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => return Err(e),
    };

    Ok(StackSnapshot { stack, resources })
}
