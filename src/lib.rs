// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![warn(missing_docs)]                // All public items must be documented
#![warn(dead_code)]                   // Unused code is reported
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are reported
#![warn(unused_variables)]            // Unused variables are reported
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # cloudform
//!
//! Safe, reviewable CloudFormation deployments driven through change sets.
//!
//! ## Overview
//!
//! Every deployment goes through a change set, so the operator always sees
//! what will happen before it happens:
//!
//! - Decide whether the stack is being created or updated
//! - Submit a change set (nested stacks included) and wait until it is computed
//! - Render the change set, nested change sets and all, as a coloured tree
//! - Ask for confirmation, execute, and follow the stack until it settles
//!
//! A change set with nothing to do is reported as a skipped deployment, not
//! as an error.
//!
//! ## Modules
//!
//! - [`cfn`]: Stack directory boundary, `CloudFormation` client and polling
//! - [`ui`]: Status classification, diff rendering and confirmation
//! - [`deployer`]: Deployment and deletion workflows
//! - [`config`]: Configuration parsing and validation
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! stack:
//!   name: payments-api
//!   template: templates/main.yaml
//!   role_arn: arn:aws:iam::123456789012:role/deployer
//!
//! parameters:
//!   Env: prod
//!
//! tags:
//!   team: payments
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cfn;
pub mod cli;
pub mod config;
pub mod deployer;
pub mod error;
pub mod ui;

// ============================================================================
// Re-exports
// ============================================================================

pub use cfn::{CfnClient, Poller, StackDirectory};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, DeployConfig};
pub use deployer::{DeleteOptions, DeleteResult, DeployOptions, DeployResult, Deployer};
pub use error::{CloudformError, Result};
