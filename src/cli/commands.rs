//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::orchestrator::ConflictPolicy;

/// Stackpilot - Change-set based stack deployment tool.
#[derive(Parser, Debug)]
#[command(name = "stackpilot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// AWS profile; the default credential chain is used when omitted.
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// AWS region; selects the configuration entry and the API endpoint.
    #[arg(short, long, global = true)]
    pub region: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a change set for an environment, optionally applying it.
    Deploy {
        /// YAML configuration file.
        #[arg(short, long, env = "STACKPILOT_CONFIG")]
        config: PathBuf,

        /// Environment to deploy.
        #[arg(short, long)]
        environment: String,

        /// Override the configured template.
        #[arg(short, long)]
        template: Option<String>,

        /// Override a parameter as KEY VALUE; repeatable.
        #[arg(long, num_args = 2, value_names = ["KEY", "VALUE"], action = ArgAction::Append)]
        parameter: Vec<String>,

        /// Keep the remote value for a parameter; repeatable.
        #[arg(long)]
        parameter_use_previous: Vec<String>,

        /// Custom change set name; generated when omitted.
        #[arg(long)]
        change_set_name: Option<String>,

        /// Policy for change sets already pending on the stack.
        #[arg(long, value_enum, default_value_t = ConflictPolicy::Allow)]
        existing_changes: ConflictPolicy,

        /// Execute the change set immediately after creation.
        #[arg(long)]
        auto_apply: bool,
    },

    /// Execute a previously created change set.
    Apply {
        /// YAML configuration file.
        #[arg(short, long, env = "STACKPILOT_CONFIG", requires = "environment")]
        config: Option<PathBuf>,

        /// Environment the change set belongs to.
        #[arg(short, long, requires = "config")]
        environment: Option<String>,

        /// Change set name, addressed through the configuration.
        #[arg(long, requires = "config")]
        change_set_name: Option<String>,

        /// Bare change set identifier; needs no configuration.
        #[arg(long, conflicts_with_all = ["config", "environment", "change_set_name"])]
        change_set_id: Option<String>,
    },

    /// Discard a previously created change set.
    Reject {
        /// YAML configuration file.
        #[arg(short, long, env = "STACKPILOT_CONFIG", requires = "environment")]
        config: Option<PathBuf>,

        /// Environment the change set belongs to.
        #[arg(short, long, requires = "config")]
        environment: Option<String>,

        /// Change set name, addressed through the configuration.
        #[arg(long, requires = "config")]
        change_set_name: Option<String>,

        /// Bare change set identifier; needs no configuration.
        #[arg(long, conflicts_with_all = ["config", "environment", "change_set_name"])]
        change_set_id: Option<String>,
    },

    /// Delete a stack.
    Delete {
        /// YAML configuration file.
        #[arg(short, long, env = "STACKPILOT_CONFIG")]
        config: PathBuf,

        /// Environment whose stack should be deleted.
        #[arg(short, long)]
        environment: String,

        /// Logical ids of resources to retain; repeatable.
        #[arg(long)]
        retain_resources: Vec<String>,

        /// Confirm the deletion.
        #[arg(short, long)]
        yes: bool,
    },

    /// Show stack status, pending change sets and recent events.
    Status {
        /// YAML configuration file.
        #[arg(short, long, env = "STACKPILOT_CONFIG")]
        config: PathBuf,

        /// Environment to inspect.
        #[arg(short, long)]
        environment: String,

        /// How many hours of events to include.
        #[arg(long, default_value_t = 24)]
        event_hours: i64,
    },

    /// Print a single stack output value.
    GetOutput {
        /// YAML configuration file.
        #[arg(short, long, env = "STACKPILOT_CONFIG")]
        config: PathBuf,

        /// Environment to query.
        #[arg(short, long)]
        environment: String,

        /// Output key to print.
        #[arg(short, long)]
        output: String,
    },

    /// Upload a local file to S3.
    Upload {
        /// Local file to upload.
        file: PathBuf,

        /// Target bucket.
        bucket: String,

        /// Target key.
        key: String,
    },

    /// Package a Lambda function source directory into an archive.
    BuildLambda {
        /// Function source directory.
        #[arg(short, long)]
        source_dir: PathBuf,

        /// Directory the archive is written to.
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Lambda runtime identifier.
        #[arg(long)]
        runtime: String,

        /// Archive base name; defaults to the source directory name.
        #[arg(long)]
        archive_name: Option<String>,
    },
}
