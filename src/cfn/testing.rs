//! In-memory stack directory for tests.
//!
//! Stacks and change sets are scripted up front: each one can carry a queue
//! of statuses that successive describe calls walk through, the last status
//! sticking once the queue is drained. Every call is recorded so tests can
//! assert on what was (or was never) invoked.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{CloudformError, Result, StackError};

use super::directory::StackDirectory;
use super::types::{ChangeSet, CreateChangeSetRequest, ResourceChange, Stack, StackResource};

type ErrorFactory = Box<dyn Fn() -> CloudformError + Send + Sync>;

/// Change set produced by the next successful `create_change_set`.
#[derive(Debug, Clone, Default)]
pub struct ChangeSetScript {
    pub statuses: Vec<String>,
    pub status_reason: Option<String>,
    pub changes: Vec<ResourceChange>,
}

/// What `execute_change_set` does to the target stack.
#[derive(Debug, Clone)]
struct ExecuteScript {
    stack_id: String,
    statuses: Vec<String>,
}

#[derive(Debug, Clone)]
struct StatusQueue {
    statuses: VecDeque<String>,
    vanish: bool,
}

impl StatusQueue {
    fn new(statuses: &[&str]) -> Self {
        Self {
            statuses: statuses.iter().map(|s| (*s).to_string()).collect(),
            vanish: false,
        }
    }

    /// Next status, or `None` when a vanishing queue is drained.
    fn next(&mut self) -> Option<String> {
        if self.vanish || self.statuses.len() > 1 {
            self.statuses.pop_front()
        } else {
            self.statuses.front().cloned()
        }
    }
}

#[derive(Default)]
struct State {
    stacks: HashMap<String, Stack>,
    stack_queues: HashMap<String, StatusQueue>,
    resources: HashMap<String, Vec<StackResource>>,
    change_sets: HashMap<String, ChangeSet>,
    change_set_queues: HashMap<String, StatusQueue>,
    next_change_set: Option<ChangeSetScript>,
    on_execute: Option<ExecuteScript>,
    failures: HashMap<&'static str, ErrorFactory>,
    cancel_on: HashMap<&'static str, (usize, CancellationToken)>,
    calls: Vec<&'static str>,
    created: Vec<CreateChangeSetRequest>,
    executed: Vec<(String, String)>,
    deleted: Vec<(String, Option<String>)>,
}

/// Scripted, call-recording [`StackDirectory`].
#[derive(Default)]
pub struct FakeDirectory {
    state: Mutex<State>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Registers an existing stack.
    pub fn with_stack(self, name: &str, id: &str, status: &str) -> Self {
        self.state().stacks.insert(
            name.to_string(),
            Stack {
                name: name.to_string(),
                id: Some(id.to_string()),
                status: status.to_string(),
                status_reason: None,
            },
        );
        self
    }

    /// Scripts the statuses returned when describing the stack with this id.
    pub fn with_stack_statuses(self, id: &str, statuses: &[&str]) -> Self {
        self.state()
            .stack_queues
            .insert(id.to_string(), StatusQueue::new(statuses));
        self
    }

    /// Makes the stack disappear once its scripted statuses are drained.
    pub fn vanish_after_statuses(self, id: &str) -> Self {
        if let Some(queue) = self.state().stack_queues.get_mut(id) {
            queue.vanish = true;
        }
        self
    }

    pub fn with_resources(self, id: &str, resources: Vec<StackResource>) -> Self {
        self.state().resources.insert(id.to_string(), resources);
        self
    }

    /// Registers an existing change set, reachable by name and by id.
    pub fn with_change_set(self, change_set: ChangeSet) -> Self {
        {
            let mut state = self.state();
            if let Some(id) = &change_set.id {
                state.change_sets.insert(id.clone(), change_set.clone());
            }
            state.change_sets.insert(change_set.name.clone(), change_set);
        }
        self
    }

    /// Scripts the change set the next create call produces.
    pub fn with_next_change_set(self, script: ChangeSetScript) -> Self {
        self.state().next_change_set = Some(script);
        self
    }

    /// Scripts the stack statuses observed after the change set executes.
    pub fn on_execute(self, stack_id: &str, statuses: &[&str]) -> Self {
        self.state().on_execute = Some(ExecuteScript {
            stack_id: stack_id.to_string(),
            statuses: statuses.iter().map(|s| (*s).to_string()).collect(),
        });
        self
    }

    /// Makes every call to `method` fail with the produced error.
    pub fn fail_on(
        self,
        method: &'static str,
        error: impl Fn() -> CloudformError + Send + Sync + 'static,
    ) -> Self {
        self.state().failures.insert(method, Box::new(error));
        self
    }

    /// Cancels `token` while serving the `nth` call (1-based) to `method`.
    pub fn cancel_during(self, method: &'static str, nth: usize, token: CancellationToken) -> Self {
        self.state().cancel_on.insert(method, (nth, token));
        self
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.state().calls.iter().filter(|c| **c == method).count()
    }

    pub fn created(&self) -> Vec<CreateChangeSetRequest> {
        self.state().created.clone()
    }

    pub fn executed(&self) -> Vec<(String, String)> {
        self.state().executed.clone()
    }

    pub fn deleted(&self) -> Vec<(String, Option<String>)> {
        self.state().deleted.clone()
    }

    fn record(&self, method: &'static str) -> Result<()> {
        let mut state = self.state();
        state.calls.push(method);
        let count = state.calls.iter().filter(|c| **c == method).count();
        if let Some((nth, token)) = state.cancel_on.get(method)
            && *nth == count
        {
            token.cancel();
        }
        match state.failures.get(method) {
            Some(factory) => Err(factory()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StackDirectory for FakeDirectory {
    async fn describe_stack(&self, stack_name: &str) -> Result<Stack> {
        self.record("describe_stack")?;
        let mut state = self.state();

        let stack = state
            .stacks
            .values()
            .find(|s| s.name == stack_name || s.id.as_deref() == Some(stack_name))
            .cloned()
            .ok_or_else(|| StackError::NotFound {
                name: stack_name.to_string(),
            })?;

        let key = stack.id.clone().unwrap_or_else(|| stack.name.clone());
        match state.stack_queues.get_mut(&key).map(StatusQueue::next) {
            Some(Some(status)) => Ok(Stack { status, ..stack }),
            Some(None) => Err(StackError::NotFound {
                name: stack_name.to_string(),
            }
            .into()),
            None => Ok(stack),
        }
    }

    async fn describe_stack_resources(&self, stack_name: &str) -> Result<Vec<StackResource>> {
        self.record("describe_stack_resources")?;
        Ok(self
            .state()
            .resources
            .get(stack_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn describe_change_set(
        &self,
        _stack_name: Option<&str>,
        change_set_name: &str,
    ) -> Result<ChangeSet> {
        self.record("describe_change_set")?;
        let mut state = self.state();

        let change_set = state
            .change_sets
            .get(change_set_name)
            .cloned()
            .ok_or_else(|| StackError::NotFound {
                name: change_set_name.to_string(),
            })?;

        match state
            .change_set_queues
            .get_mut(&change_set.name)
            .and_then(StatusQueue::next)
        {
            Some(status) => Ok(ChangeSet { status, ..change_set }),
            None => Ok(change_set),
        }
    }

    async fn create_change_set(&self, request: &CreateChangeSetRequest) -> Result<()> {
        let recorded = self.record("create_change_set");
        let mut state = self.state();
        state.created.push(request.clone());
        recorded?;

        let script = state.next_change_set.take().unwrap_or_default();
        let statuses: Vec<&str> = script.statuses.iter().map(String::as_str).collect();
        state
            .change_set_queues
            .insert(request.change_set_name.clone(), StatusQueue::new(&statuses));
        state.change_sets.insert(
            request.change_set_name.clone(),
            ChangeSet {
                name: request.change_set_name.clone(),
                id: None,
                stack_name: request.stack_name.clone(),
                status: String::from("CREATE_PENDING"),
                status_reason: script.status_reason,
                changes: script.changes,
            },
        );
        Ok(())
    }

    async fn execute_change_set(&self, stack_name: &str, change_set_name: &str) -> Result<()> {
        self.record("execute_change_set")?;
        let mut state = self.state();
        state
            .executed
            .push((stack_name.to_string(), change_set_name.to_string()));

        if let Some(script) = state.on_execute.take() {
            let first = script.statuses.first().cloned().unwrap_or_default();
            state.stacks.insert(
                stack_name.to_string(),
                Stack {
                    name: stack_name.to_string(),
                    id: Some(script.stack_id.clone()),
                    status: first,
                    status_reason: None,
                },
            );
            let statuses: Vec<&str> = script.statuses.iter().map(String::as_str).collect();
            state
                .stack_queues
                .insert(script.stack_id, StatusQueue::new(&statuses));
        }
        Ok(())
    }

    async fn delete_stack(&self, stack_name: &str, role_arn: Option<&str>) -> Result<()> {
        self.record("delete_stack")?;
        self.state()
            .deleted
            .push((stack_name.to_string(), role_arn.map(str::to_string)));
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "fake"
    }
}
