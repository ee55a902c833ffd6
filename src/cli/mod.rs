//! CLI module for the Stackpilot deployment tool.
//!
//! This module provides the command-line interface for driving the
//! change-set lifecycle.

mod commands;

pub use commands::{Cli, Commands};
