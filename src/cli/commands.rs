//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// cloudform - CloudFormation deployments through reviewed change sets.
#[derive(Parser, Debug)]
#[command(name = "cloudform")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "CLOUDFORM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Log format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Disable coloured output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Give up after this many seconds.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Stack selection and AWS connection flags shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct StackArgs {
    /// Stack name (overrides `stack.name`).
    #[arg(short, long)]
    pub stack_name: Option<String>,

    /// Execution role ARN (overrides `stack.role_arn`).
    #[arg(long)]
    pub role_arn: Option<String>,

    /// AWS region (overrides `stack.region`).
    #[arg(long)]
    pub region: Option<String>,

    /// AWS profile (overrides `stack.profile`).
    #[arg(long)]
    pub profile: Option<String>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create and execute a change set for a stack.
    Deploy {
        /// Stack selection.
        #[command(flatten)]
        stack: StackArgs,

        /// Template file path, http(s) URL or inline body.
        #[arg(short, long)]
        template: Option<String>,

        /// Template parameter as KEY=VALUE (repeatable).
        #[arg(short, long = "parameter", value_parser = parse_key_val)]
        parameters: Vec<(String, String)>,

        /// Stack tag as KEY=VALUE (repeatable).
        #[arg(long = "tag", value_parser = parse_key_val)]
        tags: Vec<(String, String)>,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete a stack and wait for it to go away.
    Delete {
        /// Stack selection.
        #[command(flatten)]
        stack: StackArgs,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Show a stack's status and resources.
    Status {
        /// Stack selection.
        #[command(flatten)]
        stack: StackArgs,
    },

    /// Render an existing change set without executing it.
    Diff {
        /// Stack selection.
        #[command(flatten)]
        stack: StackArgs,

        /// Change set name, or its id when no stack is given.
        change_set: String,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable log lines.
    #[default]
    Text,
    /// One JSON object per log event.
    Json,
}

impl Commands {
    /// Stack selection flags of the command.
    #[must_use]
    pub const fn stack_args(&self) -> &StackArgs {
        match self {
            Self::Deploy { stack, .. }
            | Self::Delete { stack, .. }
            | Self::Status { stack }
            | Self::Diff { stack, .. } => stack,
        }
    }
}

/// Parses a `KEY=VALUE` pair. The value may itself contain `=`.
///
/// # Errors
///
/// Returns an error if there is no `=` or the key is empty.
pub fn parse_key_val(input: &str) -> Result<(String, String)> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(ConfigError::InvalidPair {
            input: input.to_string(),
        }
        .into()),
    }
}
