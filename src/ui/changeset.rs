//! Change-set diff rendering.
//!
//! Rendering happens in two steps. [`ChangeSetFetcher`] walks the change set
//! and every nested change set it references into a [`ChangeSetTree`];
//! [`format_change_set`] then turns that tree into text without touching the
//! network.
//!
//! Within a level, plain resources come first and nested stacks are grouped
//! at the end, whatever order the remote listed them in.

use std::fmt::Write;
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use tracing::debug;

use crate::cfn::{ChangeAction, Poller, ResourceChange, StackDirectory};
use crate::error::{CloudformError, Result, StackError};

use super::palette::{Palette, Tone};

/// Default cap on nested change-set depth.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 32;

/// A change set and its resolved nested change sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSetTree {
    /// Stack the change set belongs to.
    pub stack_name: String,
    /// Changes to non-stack resources, in remote order.
    pub changes: Vec<ResourceChange>,
    /// Nested stack changes, in remote order.
    pub nested: Vec<NestedChange>,
}

/// A nested stack change with its resolved child tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestedChange {
    /// The parent's change entry for the nested stack.
    pub change: ResourceChange,
    /// The nested stack's own change set.
    pub child: ChangeSetTree,
}

impl ChangeSetTree {
    /// Builds a tree from a flat change list whose nested entries have no
    /// resolved children yet; nested entries are attached with [`Self::with_nested`].
    #[must_use]
    pub fn new(stack_name: impl Into<String>, changes: Vec<ResourceChange>) -> Self {
        Self {
            stack_name: stack_name.into(),
            changes,
            nested: Vec::new(),
        }
    }

    /// Attaches a resolved nested change set.
    #[must_use]
    pub fn with_nested(mut self, change: ResourceChange, child: Self) -> Self {
        self.nested.push(NestedChange { change, child });
        self
    }

    /// Total number of resource changes, nested ones included.
    #[must_use]
    pub fn total_changes(&self) -> usize {
        self.changes.len()
            + self
                .nested
                .iter()
                .map(|n| 1 + n.child.total_changes())
                .sum::<usize>()
    }
}

type TreeFuture<'a> = Pin<Box<dyn Future<Output = Result<ChangeSetTree>> + Send + 'a>>;

/// Resolves a change set and its nested change sets.
#[derive(Debug)]
pub struct ChangeSetFetcher<'a, D: StackDirectory> {
    /// Remote directory.
    directory: &'a D,
    /// Cancellation guard for every fetch.
    poller: &'a Poller,
    /// Deepest nesting level accepted.
    max_depth: usize,
}

impl<'a, D: StackDirectory> ChangeSetFetcher<'a, D> {
    /// Creates a fetcher with the default depth guard.
    #[must_use]
    pub const fn new(directory: &'a D, poller: &'a Poller) -> Self {
        Self {
            directory,
            poller,
            max_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Fetches the change set tree rooted at `change_set_name`.
    ///
    /// # Errors
    ///
    /// Any failed fetch aborts the whole walk with a `StackError::Render`
    /// naming the stack and change set that could not be fetched.
    pub async fn fetch(&self, stack_name: &str, change_set_name: &str) -> Result<ChangeSetTree> {
        let stack = (!stack_name.is_empty()).then_some(stack_name);
        self.fetch_level(stack, change_set_name.to_string(), 0).await
    }

    fn fetch_level<'b>(
        &'b self,
        stack_name: Option<&'b str>,
        change_set_name: String,
        depth: usize,
    ) -> TreeFuture<'b> {
        Box::pin(async move {
            if depth > self.max_depth {
                return Err(StackError::NestingTooDeep {
                    change_set: change_set_name,
                    limit: self.max_depth,
                }
                .into());
            }

            let change_set = self
                .fetch_one(stack_name, &change_set_name)
                .await
                .map_err(|e| render_error(stack_name, &change_set_name, e))?;

            debug!(
                "Fetched change set {} ({} changes) at depth {depth}",
                change_set.name,
                change_set.changes.len()
            );

            let (nested, plain): (Vec<_>, Vec<_>) =
                change_set.changes.into_iter().partition(ResourceChange::is_nested);

            let mut tree = ChangeSetTree::new(change_set.stack_name, plain);

            for change in nested {
                let child_id = change.nested_change_set.clone().unwrap_or_default();
                let child = self.fetch_level(None, child_id, depth + 1).await?;
                tree = tree.with_nested(change, child);
            }

            Ok(tree)
        })
    }

    async fn fetch_one(
        &self,
        stack_name: Option<&str>,
        change_set_name: &str,
    ) -> Result<crate::cfn::ChangeSet> {
        self.poller.ensure_active("describing change set")?;
        self.directory
            .describe_change_set(stack_name, change_set_name)
            .await
    }
}

fn render_error(stack_name: Option<&str>, change_set: &str, source: CloudformError) -> CloudformError {
    if source.is_cancelled() {
        return source;
    }
    StackError::Render {
        stack_name: stack_name.unwrap_or_default().to_string(),
        change_set: change_set.to_string(),
        source: Box::new(source),
    }
    .into()
}

/// Colour used for a change action.
#[must_use]
pub const fn action_tone(action: &ChangeAction) -> Tone {
    match action {
        ChangeAction::Add => Tone::Green,
        ChangeAction::Modify => Tone::Blue,
        ChangeAction::Remove => Tone::Red,
        ChangeAction::Other(_) => Tone::Plain,
    }
}

fn header_text(tree: &ChangeSetTree) -> String {
    format!("Stack {}:", tree.stack_name)
}

fn body_lines(tree: &ChangeSetTree, palette: &dyn Palette) -> Vec<String> {
    let mut lines = Vec::with_capacity(tree.changes.len());

    for change in &tree.changes {
        let line = format!(
            "  {} {} {}",
            change.action.symbol(),
            change.resource_type,
            change.logical_id
        );
        lines.push(palette.paint(action_tone(&change.action), &line));
    }

    for nested in &tree.nested {
        let header = format!("  {} {}", nested.change.action.symbol(), header_text(&nested.child));
        lines.push(palette.paint(action_tone(&nested.change.action), &header));
        lines.extend(
            body_lines(&nested.child, palette)
                .into_iter()
                .map(|line| format!("  {line}")),
        );
    }

    lines
}

/// Formats a change set tree as an indented diff.
#[must_use]
pub fn format_change_set(tree: &ChangeSetTree, palette: &dyn Palette) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", palette.paint(Tone::Yellow, &header_text(tree)));
    for line in body_lines(tree, palette) {
        let _ = writeln!(out, "{line}");
    }
    out.trim_end().to_string()
}

/// Fetches and formats a change set in one call.
///
/// # Errors
///
/// Returns an error if any change set in the tree cannot be fetched.
pub async fn render_change_set<D: StackDirectory>(
    fetcher: &ChangeSetFetcher<'_, D>,
    palette: &dyn Palette,
    stack_name: &str,
    change_set_name: &str,
) -> Result<String> {
    let tree = fetcher.fetch(stack_name, change_set_name).await?;
    Ok(format_change_set(&tree, palette))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfn::testing::FakeDirectory;
    use crate::cfn::ChangeSet;
    use crate::ui::palette::PlainPalette;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn change_set(name: &str, id: Option<&str>, stack: &str, changes: Vec<ResourceChange>) -> ChangeSet {
        ChangeSet {
            name: name.to_string(),
            id: id.map(str::to_string),
            stack_name: stack.to_string(),
            status: String::from("CREATE_COMPLETE"),
            status_reason: None,
            changes,
        }
    }

    fn poller() -> Poller {
        Poller::new(Duration::ZERO, CancellationToken::new())
    }

    #[test]
    fn test_plain_changes_keep_order() {
        let tree = ChangeSetTree::new(
            "my-stack",
            vec![
                ResourceChange::new(ChangeAction::Add, "AWS::S3::Bucket", "B1"),
                ResourceChange::new(ChangeAction::Modify, "AWS::IAM::Role", "R1"),
            ],
        );

        let rendered = format_change_set(&tree, &PlainPalette);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(
            lines,
            vec!["Stack my-stack:", "  + AWS::S3::Bucket B1", "  > AWS::IAM::Role R1"]
        );
    }

    #[test]
    fn test_empty_change_set_is_header_only() {
        let tree = ChangeSetTree::new("empty", vec![]);
        assert_eq!(format_change_set(&tree, &PlainPalette), "Stack empty:");
    }

    #[test]
    fn test_nested_children_are_indented_under_recoloured_header() {
        let child = ChangeSetTree::new(
            "parent-Network-ABC",
            vec![ResourceChange::new(ChangeAction::Remove, "AWS::EC2::VPC", "Vpc")],
        );
        let tree = ChangeSetTree::new(
            "parent",
            vec![ResourceChange::new(ChangeAction::Add, "AWS::SNS::Topic", "Topic")],
        )
        .with_nested(
            ResourceChange::new(ChangeAction::Modify, "AWS::CloudFormation::Stack", "Network")
                .with_nested_change_set("arn:cs/child"),
            child,
        );

        assert_eq!(
            format_change_set(&tree, &PlainPalette),
            "Stack parent:\n  + AWS::SNS::Topic Topic\n  > Stack parent-Network-ABC:\n    - AWS::EC2::VPC Vpc"
        );
        assert_eq!(tree.total_changes(), 3);
    }

    #[test]
    fn test_header_colour_follows_parent_action() {
        struct Tagging;
        impl Palette for Tagging {
            fn paint(&self, tone: Tone, text: &str) -> String {
                format!("<{tone:?}>{text}")
            }
        }

        let tree = ChangeSetTree::new("root", vec![]).with_nested(
            ResourceChange::new(ChangeAction::Add, "AWS::CloudFormation::Stack", "Child")
                .with_nested_change_set("cs"),
            ChangeSetTree::new("child", vec![]),
        );

        assert_eq!(
            format_change_set(&tree, &Tagging),
            "<Yellow>Stack root:\n<Green>  + Stack child:"
        );
    }

    #[tokio::test]
    async fn test_nested_changes_grouped_after_plain_changes() {
        let directory = FakeDirectory::new()
            .with_change_set(change_set(
                "app-1",
                Some("arn:cs/app-1"),
                "app",
                vec![
                    ResourceChange::new(ChangeAction::Modify, "AWS::CloudFormation::Stack", "Db")
                        .with_nested_change_set("arn:cs/db"),
                    ResourceChange::new(ChangeAction::Add, "AWS::S3::Bucket", "Logs"),
                ],
            ))
            .with_change_set(change_set(
                "db-1",
                Some("arn:cs/db"),
                "app-Db-XYZ",
                vec![ResourceChange::new(ChangeAction::Modify, "AWS::RDS::DBInstance", "Primary")],
            ));
        let poller = poller();
        let fetcher = ChangeSetFetcher::new(&directory, &poller);

        let rendered = render_change_set(&fetcher, &PlainPalette, "app", "app-1")
            .await
            .expect("render should succeed");

        assert_eq!(
            rendered,
            "Stack app:\n  + AWS::S3::Bucket Logs\n  > Stack app-Db-XYZ:\n    > AWS::RDS::DBInstance Primary"
        );
    }

    #[tokio::test]
    async fn test_missing_nested_change_set_aborts_render() {
        let directory = FakeDirectory::new().with_change_set(change_set(
            "app-1",
            None,
            "app",
            vec![
                ResourceChange::new(ChangeAction::Add, "AWS::CloudFormation::Stack", "Child")
                    .with_nested_change_set("arn:cs/missing"),
            ],
        ));
        let poller = poller();
        let fetcher = ChangeSetFetcher::new(&directory, &poller);

        let err = fetcher.fetch("app", "app-1").await.expect_err("render should fail");

        assert_eq!(
            err.to_string(),
            "error getting changeset 'arn:cs/missing' for stack '': Stack does not exist: arn:cs/missing"
        );
    }

    #[tokio::test]
    async fn test_cancellation_is_not_wrapped() {
        let directory = FakeDirectory::new();
        let poller = poller();
        poller.token().cancel();

        let err = ChangeSetFetcher::new(&directory, &poller)
            .fetch("app", "app-1")
            .await
            .expect_err("fetch should be cancelled");

        assert!(err.is_cancelled());
        assert_eq!(directory.calls_to("describe_change_set"), 0);
    }

    #[tokio::test]
    async fn test_depth_guard_trips() {
        let directory = FakeDirectory::new()
            .with_change_set(change_set(
                "root",
                Some("root"),
                "a",
                vec![
                    ResourceChange::new(ChangeAction::Add, "AWS::CloudFormation::Stack", "B")
                        .with_nested_change_set("b"),
                ],
            ))
            .with_change_set(change_set(
                "b",
                Some("b"),
                "b",
                vec![
                    ResourceChange::new(ChangeAction::Add, "AWS::CloudFormation::Stack", "C")
                        .with_nested_change_set("c"),
                ],
            ))
            .with_change_set(change_set("c", Some("c"), "c", vec![]));
        let poller = poller();

        let err = ChangeSetFetcher::new(&directory, &poller)
            .with_max_depth(1)
            .fetch("a", "root")
            .await
            .expect_err("depth guard should trip");
        assert!(matches!(
            err,
            CloudformError::Stack(StackError::NestingTooDeep { limit: 1, .. })
        ));

        let tree = ChangeSetFetcher::new(&directory, &poller)
            .with_max_depth(2)
            .fetch("a", "root")
            .await
            .expect("two levels are allowed");
        assert_eq!(tree.nested[0].child.nested[0].child.stack_name, "c");
    }
}
