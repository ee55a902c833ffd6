//! Stackpilot CLI entrypoint.
//!
//! This is the main entrypoint for the stackpilot command-line tool.

use std::path::Path;
use std::process::ExitCode;

use stackpilot::config::{load_source, resolve, Overrides};
use stackpilot::error::{ConfigError, Result, StackpilotError};
use stackpilot::orchestrator::{DeployOptions, Orchestrator};
use stackpilot::provider::CloudFormationProvider;
use stackpilot::report;
use stackpilot::transfer::{build_lambda, Uploader};
use stackpilot::{CiContext, Cli, Commands, Reporter};

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report::error(&format!("Error: {e}"));
            CiContext::from_env().log_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let profile = cli.profile.as_deref();
    let region = cli.region.as_deref();

    match cli.command {
        Commands::Deploy {
            config,
            environment,
            template,
            parameter,
            parameter_use_previous,
            change_set_name,
            existing_changes,
            auto_apply,
        } => {
            let overrides = Overrides {
                template,
                parameters: parameter
                    .chunks_exact(2)
                    .map(|pair| (pair[0].clone(), pair[1].clone()))
                    .collect(),
                use_previous_parameters: parameter_use_previous,
            };
            let descriptor = resolve(&load_source(&config)?, &environment, region, &overrides)?;
            let orchestrator = build_orchestrator(profile, Some(&descriptor.region)).await;
            let options = DeployOptions {
                change_set_name,
                existing_changes,
                auto_apply,
            };
            orchestrator.deploy(&descriptor, &options).await?;
            Ok(())
        }
        Commands::Apply {
            config,
            environment,
            change_set_name,
            change_set_id,
        } => {
            let target = resolve_change_set(
                profile,
                region,
                config.as_deref(),
                environment.as_deref(),
                change_set_name,
                change_set_id,
            )
            .await?;
            target
                .orchestrator
                .apply(target.stack_name.as_deref(), &target.change_set)
                .await
        }
        Commands::Reject {
            config,
            environment,
            change_set_name,
            change_set_id,
        } => {
            let target = resolve_change_set(
                profile,
                region,
                config.as_deref(),
                environment.as_deref(),
                change_set_name,
                change_set_id,
            )
            .await?;
            target
                .orchestrator
                .reject(target.stack_name.as_deref(), &target.change_set)
                .await
        }
        Commands::Delete {
            config,
            environment,
            retain_resources,
            yes,
        } => {
            let descriptor = resolve(
                &load_source(&config)?,
                &environment,
                region,
                &Overrides::default(),
            )?;
            let orchestrator = build_orchestrator(profile, Some(&descriptor.region)).await;
            orchestrator
                .delete(&descriptor.stack_name, &retain_resources, yes)
                .await
        }
        Commands::Status {
            config,
            environment,
            event_hours,
        } => {
            let descriptor = resolve(
                &load_source(&config)?,
                &environment,
                region,
                &Overrides::default(),
            )?;
            let orchestrator = build_orchestrator(profile, Some(&descriptor.region)).await;
            let status = orchestrator.status(&descriptor.stack_name, event_hours).await?;
            println!("{status}");
            Ok(())
        }
        Commands::GetOutput {
            config,
            environment,
            output,
        } => {
            let descriptor = resolve(
                &load_source(&config)?,
                &environment,
                region,
                &Overrides::default(),
            )?;
            let orchestrator = build_orchestrator(profile, Some(&descriptor.region)).await;
            let value = orchestrator.get_output(&descriptor.stack_name, &output).await?;
            // Only the value goes to stdout so scripts can capture it.
            println!("{value}");
            Ok(())
        }
        Commands::Upload { file, bucket, key } => {
            let sdk_config = sdk_config(profile, region).await;
            Uploader::new(&sdk_config).upload(&file, &bucket, &key).await
        }
        Commands::BuildLambda {
            source_dir,
            output_dir,
            runtime,
            archive_name,
        } => {
            build_lambda(&source_dir, &output_dir, &runtime, archive_name.as_deref())?;
            Ok(())
        }
    }
}

/// A change set addressed either through the configuration or by bare id,
/// together with the orchestrator to act on it.
struct ChangeSetTarget {
    orchestrator: Orchestrator<CloudFormationProvider>,
    stack_name: Option<String>,
    change_set: String,
}

/// Resolves the apply/reject addressing modes.
async fn resolve_change_set(
    profile: Option<&str>,
    region: Option<&str>,
    config: Option<&Path>,
    environment: Option<&str>,
    change_set_name: Option<String>,
    change_set_id: Option<String>,
) -> Result<ChangeSetTarget> {
    if let Some(id) = change_set_id {
        return Ok(ChangeSetTarget {
            orchestrator: build_orchestrator(profile, region).await,
            stack_name: None,
            change_set: id,
        });
    }

    let (Some(config), Some(environment), Some(name)) = (config, environment, change_set_name)
    else {
        return Err(StackpilotError::Config(ConfigError::validation_general(
            "Provide either --change-set-id, or --config, --environment and --change-set-name",
        )));
    };

    let descriptor = resolve(
        &load_source(config)?,
        environment,
        region,
        &Overrides::default(),
    )?;
    Ok(ChangeSetTarget {
        orchestrator: build_orchestrator(profile, Some(&descriptor.region)).await,
        stack_name: Some(descriptor.stack_name),
        change_set: name,
    })
}

/// Loads shared AWS configuration with optional profile and region.
async fn sdk_config(profile: Option<&str>, region: Option<&str>) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(profile) = profile {
        loader = loader.profile_name(profile);
    }
    if let Some(region) = region {
        loader = loader.region(aws_config::Region::new(region.to_string()));
    }
    loader.load().await
}

/// Builds an orchestrator bound to a CloudFormation client.
async fn build_orchestrator(
    profile: Option<&str>,
    region: Option<&str>,
) -> Orchestrator<CloudFormationProvider> {
    let config = sdk_config(profile, region).await;
    Orchestrator::new(
        CloudFormationProvider::new(&config),
        Reporter::from_env(),
        CiContext::from_env(),
    )
}
