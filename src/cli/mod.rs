//! CLI module for the cloudform deployment tool.
//!
//! This module provides the command-line interface for deploying,
//! deleting and inspecting CloudFormation stacks.

mod commands;
mod exit;
mod output;

pub use commands::{parse_key_val, Cli, Commands, LogFormat, OutputFormat, StackArgs};
pub use exit::{
    delete_exit_code, deploy_exit_code, error_exit_code, EXIT_CANCELLED, EXIT_DECLINED,
    EXIT_FAILED, EXIT_OK, EXIT_UNSETTLED,
};
pub use output::OutputFormatter;
