//! Stack directory: the boundary to the remote control plane.
//!
//! This module provides the [`StackDirectory`] capability, its CloudFormation
//! implementation, and the polling primitives built on top of it.

mod client;
mod directory;
mod naming;
mod poller;
mod settle;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::CfnClient;
pub use directory::StackDirectory;
pub use naming::{NameGenerator, TimestampNames};
pub use poller::{Poller, DEFAULT_POLL_INTERVAL};
pub use settle::{Settled, StackWatcher};
pub use types::{
    is_no_changes_message, is_settled, Capability, ChangeAction, ChangeSet, ChangeSetType,
    CreateChangeSetRequest, Parameter, ResourceChange, Stack, StackResource, TemplateSource,
    DELETE_COMPLETE, DEPLOY_SKIPPED, NO_CHANGES_MESSAGE, NO_UPDATES_MESSAGE,
};

#[cfg(test)]
pub(crate) use naming::MockNameGenerator;
