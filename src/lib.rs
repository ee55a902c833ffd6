// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
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

//! # Stackpilot
//!
//! A change-set based deployment tool for CloudFormation stacks.
//!
//! ## Overview
//!
//! Stackpilot drives stack deployments through reviewable change sets:
//!
//! - Define environments in a multi-document YAML file with shared defaults
//! - Propose a change set, review the diff, then apply or reject it
//! - Delete stacks, query outputs, and inspect status and events
//! - Upload templates and package Lambda sources for deployment
//!
//! ## Architecture
//!
//! All deployment state lives with the provider. Each invocation resolves
//! the configuration, re-reads remote state, performs exactly one lifecycle
//! step and exits; nothing is cached between runs.
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading, inheritance and resolution
//! - [`template`]: Placeholder substitution in configured values
//! - [`provider`]: CloudFormation client and data types
//! - [`orchestrator`]: Change lifecycle sequencing and waits
//! - [`report`]: Table and message formatting
//! - [`ci`]: CI annotations and output variables
//! - [`transfer`]: S3 uploads and Lambda packaging
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! Environment: all
//! Parameters:
//!   LogLevel: info
//! ---
//! Environment: dev
//! Region: us-east-1
//! StackName: '{{ Environment }}-app'
//! Template: templates/app.yaml
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod ci;
pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod report;
pub mod template;
pub mod transfer;

// ============================================================================
// Re-exports
// ============================================================================

pub use ci::CiContext;
pub use cli::{Cli, Commands};
pub use config::{load_source, resolve, DeploymentDescriptor, Overrides};
pub use error::{Result, StackpilotError};
pub use orchestrator::{ConflictPolicy, DeployOptions, DeployOutcome, Orchestrator};
pub use provider::{CloudFormationProvider, StackProvider};
pub use report::Reporter;
pub use transfer::Uploader;
