//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use std::fmt::Write;

use serde::Serialize;
use tabled::{Table, Tabled};

use crate::cfn::{Stack, StackResource};
use crate::deployer::{DeleteResult, DeployResult};
use crate::error::CloudformError;
use crate::ui::{
    colourise_status, format_change_set, status_symbol, AnsiPalette, ChangeSetTree, Palette,
    StatusCategory, Tone,
};

use super::commands::OutputFormat;

/// Output formatter for CLI.
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
    /// Colours for text output.
    palette: Box<dyn Palette>,
}

/// Stack resource row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "")]
    symbol: String,
    #[tabled(rename = "Logical ID")]
    logical_id: String,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl OutputFormatter {
    /// Creates a new output formatter with ANSI colours.
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            palette: Box::new(AnsiPalette),
        }
    }

    /// Sets the palette used for text output.
    #[must_use]
    pub fn with_palette(mut self, palette: impl Palette + 'static) -> Self {
        self.palette = Box::new(palette);
        self
    }

    /// Returns the palette used for text output.
    #[must_use]
    pub fn palette(&self) -> &dyn Palette {
        self.palette.as_ref()
    }

    /// Formats the outcome of a deployment.
    #[must_use]
    pub fn format_deploy(&self, result: &DeployResult) -> String {
        match self.format {
            OutputFormat::Json => to_json(&DeployJson::from(result)),
            OutputFormat::Text => {
                if result.is_skipped() {
                    return String::from(
                        "Skipped deployment (there are no changes in the change set)\n",
                    );
                }
                self.format_final(&result.final_status, &result.messages)
            }
        }
    }

    /// Formats the outcome of a deletion.
    #[must_use]
    pub fn format_delete(&self, result: &DeleteResult) -> String {
        match self.format {
            OutputFormat::Json => to_json(&DeleteJson::from(result)),
            OutputFormat::Text => self.format_final(&result.final_status, &result.messages),
        }
    }

    fn format_final(&self, status: &str, messages: &[String]) -> String {
        let mut output = format!(
            "Final stack status: {}\n",
            colourise_status(self.palette(), status)
        );

        if !messages.is_empty() {
            let _ = writeln!(output, "{}", self.palette.paint(Tone::Yellow, "Messages:"));
            for message in messages {
                let _ = writeln!(output, "  - {message}");
            }
        }

        output
    }

    /// Formats a stack and its resources.
    #[must_use]
    pub fn format_stack_status(&self, stack: &Stack, resources: &[StackResource]) -> String {
        match self.format {
            OutputFormat::Json => to_json(&StatusJson { stack, resources }),
            OutputFormat::Text => {
                let mut output = format!(
                    "{} {} {}\n",
                    status_symbol(self.palette(), &stack.status),
                    stack.name,
                    colourise_status(self.palette(), &stack.status)
                );

                if let Some(reason) = stack.status_reason.as_deref().filter(|r| !r.is_empty()) {
                    let _ = writeln!(output, "  {reason}");
                }

                if resources.is_empty() {
                    output.push_str("\n  No resources.\n");
                    return output;
                }

                let rows: Vec<ResourceRow> = resources
                    .iter()
                    .map(|r| ResourceRow {
                        symbol: status_symbol(self.palette(), &r.status),
                        logical_id: r.logical_id.clone(),
                        resource_type: r.resource_type.clone(),
                        status: colourise_status(self.palette(), &r.status),
                        reason: truncate(r.status_reason.as_deref().unwrap_or(""), 60),
                    })
                    .collect();

                let _ = writeln!(output, "\n{}", Table::new(rows));
                output
            }
        }
    }

    /// Formats a change set tree.
    #[must_use]
    pub fn format_diff(&self, tree: &ChangeSetTree) -> String {
        match self.format {
            OutputFormat::Json => to_json(tree),
            OutputFormat::Text => {
                let mut output = format_change_set(tree, self.palette());
                output.push('\n');
                output
            }
        }
    }

    /// Formats an error for the operator.
    #[must_use]
    pub fn format_error(&self, error: &CloudformError) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "status": "error",
                "message": error.to_string(),
            })),
            OutputFormat::Text => format!("{} {error}\n", self.palette.paint(Tone::Red, "Error:")),
        }
    }
}

fn to_json(value: &impl Serialize) -> String {
    let mut json = serde_json::to_string_pretty(value).unwrap_or_default();
    json.push('\n');
    json
}

/// Truncates a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct DeployJson<'a> {
    stack_name: &'a str,
    change_set_name: &'a str,
    change_set_type: String,
    final_status: &'a str,
    category: StatusCategory,
    skipped: bool,
    messages: &'a [String],
}

impl<'a> From<&'a DeployResult> for DeployJson<'a> {
    fn from(result: &'a DeployResult) -> Self {
        Self {
            stack_name: &result.stack_name,
            change_set_name: &result.change_set_name,
            change_set_type: result.change_set_type.to_string(),
            final_status: &result.final_status,
            category: result.category(),
            skipped: result.is_skipped(),
            messages: &result.messages,
        }
    }
}

#[derive(Serialize)]
struct DeleteJson<'a> {
    #[serde(flatten)]
    result: &'a DeleteResult,
    category: StatusCategory,
}

impl<'a> From<&'a DeleteResult> for DeleteJson<'a> {
    fn from(result: &'a DeleteResult) -> Self {
        Self {
            result,
            category: crate::ui::classify(&result.final_status).category,
        }
    }
}

#[derive(Serialize)]
struct StatusJson<'a> {
    stack: &'a Stack,
    resources: &'a [StackResource],
}
