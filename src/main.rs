//! cloudform CLI entrypoint.
//!
//! This is the main entrypoint for the cloudform command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use cloudform::cfn::{CfnClient, Poller, StackDirectory};
use cloudform::cli::{
    delete_exit_code, deploy_exit_code, error_exit_code, Cli, Commands, LogFormat,
    OutputFormatter, StackArgs, EXIT_OK,
};
use cloudform::config::{
    find_config_file, resolve_template, ConfigParser, ConfigValidator, DeployConfig,
};
use cloudform::deployer::{DeleteOptions, DeployOptions, Deployer};
use cloudform::error::{ConfigError, Result, StackError};
use cloudform::ui::{AnsiPalette, ChangeSetFetcher, PlainPalette};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_format);

    let mut formatter = OutputFormatter::new(cli.output);
    if cli.no_color {
        colored::control::set_override(false);
        formatter = formatter.with_palette(PlainPalette);
    }

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli, &formatter)) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprint!("{}", formatter.format_error(&e));
            ExitCode::from(error_exit_code(&e))
        }
    }
}

/// Initializes the logging system.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_logging(verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Main async entry point. Returns the process exit code.
async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<u8> {
    let (config, base_dir) = load_config(&cli, cli.command.stack_args())?;

    let token = CancellationToken::new();
    watch_ctrl_c(token.clone());
    if let Some(timeout) = cli.timeout.map(Duration::from_secs).or_else(|| config.settings.timeout()) {
        cancel_after(token.clone(), timeout);
    }

    let client = CfnClient::from_env(
        config.stack.region.as_deref(),
        config.stack.profile.as_deref(),
    )
    .await
    .with_cancellation(token.clone());
    let poller = Poller::new(config.settings.poll_interval(), token);
    let stack_name = config.stack.name.clone().unwrap_or_default();

    match cli.command {
        Commands::Deploy { yes, .. } => {
            cmd_deploy(&client, poller, &config, &base_dir, yes, cli.no_color, formatter)
                .await
        }
        Commands::Delete { yes, .. } => {
            cmd_delete(&client, poller, &stack_name, config.stack.role_arn.clone(), yes, formatter)
                .await
        }
        Commands::Status { .. } => cmd_status(&client, &poller, &stack_name, formatter).await,
        Commands::Diff { change_set, .. } => {
            let fetcher = ChangeSetFetcher::new(&client, &poller)
                .with_max_depth(config.settings.max_nesting_depth);
            let tree = fetcher.fetch(&stack_name, &change_set).await?;
            print!("{}", formatter.format_diff(&tree));
            Ok(EXIT_OK)
        }
    }
}

/// Loads the deploy file (if any), environment overrides and CLI flags.
///
/// Returns the merged configuration and the directory relative template
/// paths are resolved from.
fn load_config(cli: &Cli, stack: &StackArgs) -> Result<(DeployConfig, PathBuf)> {
    let cwd = std::env::current_dir()?;

    let config_path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => find_config_file(&cwd).ok(),
    };
    let base_dir = config_path
        .as_ref()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| cwd.clone());

    let parser = ConfigParser::new().with_base_path(&base_dir);
    parser.load_dotenv()?;

    let mut config = match &config_path {
        Some(path) => parser.load_with_env(path)?,
        None => {
            debug!("No configuration file found, using flags and environment only");
            let mut config = DeployConfig::default();
            ConfigParser::apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
            config
        }
    };

    apply_flags(&mut config, cli, stack);

    // Deploy needs a template; diff can find a change set by id alone.
    let validator = match cli.command {
        Commands::Deploy { .. } => ConfigValidator::new().requiring_template(),
        Commands::Diff { .. } => ConfigValidator::new().allowing_missing_stack_name(),
        Commands::Delete { .. } | Commands::Status { .. } => ConfigValidator::new(),
    };
    let result = validator.validate(&config)?;
    for warning in &result.warnings {
        warn!("{warning}");
    }

    Ok((config, base_dir))
}

/// Applies command-line flags over file and environment values.
fn apply_flags(config: &mut DeployConfig, cli: &Cli, stack: &StackArgs) {
    if let Some(name) = &stack.stack_name {
        config.stack.name = Some(name.clone());
    }
    if let Some(role) = &stack.role_arn {
        config.stack.role_arn = Some(role.clone());
    }
    if let Some(region) = &stack.region {
        config.stack.region = Some(region.clone());
    }
    if let Some(profile) = &stack.profile {
        config.stack.profile = Some(profile.clone());
    }

    if let Commands::Deploy {
        template,
        parameters,
        tags,
        ..
    } = &cli.command
    {
        if let Some(template) = template {
            config.stack.template = Some(template.clone());
        }
        config.merge_parameters(parameters.iter().cloned());
        config.merge_tags(tags.iter().cloned());
    }
}

/// Cancels the token on the first Ctrl-C and exits on the second.
fn watch_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling (press Ctrl-C again to exit immediately)");
            token.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

/// Cancels the token once the deadline passes.
fn cancel_after(token: CancellationToken, timeout: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            () = token.cancelled() => {}
            () = tokio::time::sleep(timeout) => {
                warn!("Timed out after {}s, cancelling", timeout.as_secs());
                token.cancel();
            }
        }
    });
}

/// Deploy a template through a change set.
async fn cmd_deploy(
    client: &CfnClient,
    poller: Poller,
    config: &DeployConfig,
    base_dir: &Path,
    auto_approve: bool,
    no_color: bool,
    formatter: &OutputFormatter,
) -> Result<u8> {
    let stack_name = config.stack.name.clone().unwrap_or_default();
    let template_arg = config
        .stack
        .template
        .as_deref()
        .ok_or_else(|| ConfigError::MissingValue {
            name: String::from("template"),
        })?;
    let template = resolve_template(template_arg, Some(base_dir))?;

    let options = DeployOptions::new(stack_name, template)
        .with_parameters(config.parameter_list())
        .with_tags(config.tags.clone())
        .with_role_arn(config.stack.role_arn.clone())
        .with_confirm(auto_approve);

    let deployer = Deployer::new(client, poller)
        .with_max_nesting_depth(config.settings.max_nesting_depth);
    let deployer = if no_color {
        deployer.with_palette(PlainPalette)
    } else {
        deployer.with_palette(AnsiPalette)
    };

    let result = deployer.deploy(&options).await?;

    print!("{}", formatter.format_deploy(&result));
    Ok(deploy_exit_code(&result.final_status))
}

/// Delete a stack.
async fn cmd_delete(
    client: &CfnClient,
    poller: Poller,
    stack_name: &str,
    role_arn: Option<String>,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<u8> {
    // Confirm
    if !auto_approve {
        eprint!("Stack {stack_name} and all its resources will be deleted. Type the stack name to confirm: ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim() != stack_name {
            eprintln!("Deletion cancelled.");
            return Err(StackError::UserCancelled.into());
        }
    }

    let deployer = Deployer::new(client, poller);
    let result = deployer
        .delete(&DeleteOptions {
            stack_name: stack_name.to_string(),
            role_arn,
        })
        .await?;

    print!("{}", formatter.format_delete(&result));
    Ok(delete_exit_code(&result.final_status))
}

/// Show a stack and its resources.
async fn cmd_status(
    client: &CfnClient,
    poller: &Poller,
    stack_name: &str,
    formatter: &OutputFormatter,
) -> Result<u8> {
    poller.ensure_active("describing stack")?;
    let stack = client.describe_stack(stack_name).await?;

    let target = stack.id.as_deref().unwrap_or(stack_name);
    poller.ensure_active("describing stack resources")?;
    let resources = client.describe_stack_resources(target).await?;

    info!("Stack {} has {} resources", stack.name, resources.len());
    print!("{}", formatter.format_stack_status(&stack, &resources));

    Ok(EXIT_OK)
}
