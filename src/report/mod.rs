//! Output formatting for lifecycle results.
//!
//! This module renders change sets, stack events and stack state into
//! human-readable tables and colored status lines. Formatting methods
//! return strings so the command layer decides where they go and tests can
//! assert on content.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use colored::Colorize;
use tabled::{Table, Tabled};
use tracing::warn;

use crate::provider::{PendingChange, StackEvent, StackState};

/// Environment variable naming the timezone for displayed timestamps.
const TIMEZONE_VAR: &str = "STACKPILOT_TIMEZONE";

/// Maximum width of the event reason column before wrapping.
const REASON_WIDTH: usize = 50;

/// Timestamp rendering selected once per invocation.
#[derive(Debug, Clone, Copy)]
enum TimestampFormat {
    /// Local system time, with UTC offset shown.
    Local,
    /// A named timezone, shown without offset.
    Zone(Tz),
}

impl TimestampFormat {
    /// Snapshots the timezone configuration from the environment.
    ///
    /// An unparseable timezone name falls back to local time with a
    /// warning rather than failing the command.
    fn from_env() -> Self {
        match std::env::var(TIMEZONE_VAR) {
            Ok(name) => match name.parse::<Tz>() {
                Ok(zone) => Self::Zone(zone),
                Err(_) => {
                    warn!("Ignoring invalid {TIMEZONE_VAR} value: {name}");
                    Self::Local
                }
            },
            Err(_) => Self::Local,
        }
    }

    /// Formats a UTC timestamp for display.
    fn format(self, timestamp: DateTime<Utc>) -> String {
        match self {
            Self::Local => timestamp
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S %z")
                .to_string(),
            Self::Zone(zone) => timestamp
                .with_timezone(&zone)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        }
    }
}

/// Resource change row for table display.
#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "LogicalResourceId")]
    logical_id: String,
    #[tabled(rename = "ResourceType")]
    resource_type: String,
    #[tabled(rename = "Replacement")]
    replacement: String,
}

/// Stack event row for table display.
#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "LogicalResourceId")]
    logical_id: String,
    #[tabled(rename = "ResourceType")]
    resource_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Existing change set row for table display.
#[derive(Tabled)]
struct PendingRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Created")]
    created: String,
}

/// Formatter for lifecycle output.
#[derive(Debug)]
pub struct Reporter {
    /// Timestamp rendering for event and change set tables.
    timestamps: TimestampFormat,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Reporter {
    /// Creates a reporter with the timezone taken from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            timestamps: TimestampFormat::from_env(),
        }
    }

    /// Formats the resource-level diff of a described change set.
    #[must_use]
    pub fn format_changes(&self, change: &PendingChange) -> String {
        let mut output = format!(
            "\nChange Set {} for {}:\n",
            change.name, change.stack_name
        );

        if change.changes.is_empty() {
            output.push_str("  (no resource changes reported)\n");
            return output;
        }

        let rows: Vec<ChangeRow> = change
            .changes
            .iter()
            .map(|c| ChangeRow {
                action: c.action.clone(),
                logical_id: c.logical_id.clone(),
                resource_type: c.resource_type.clone(),
                replacement: c.replacement.clone(),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');
        output
    }

    /// Formats stack events as a table, oldest first.
    ///
    /// Events arrive from the provider newest first; display order is
    /// reversed so the table reads chronologically. Long reasons wrap
    /// within their column.
    #[must_use]
    pub fn format_events(&self, events: &[StackEvent]) -> String {
        if events.is_empty() {
            return String::from("  (no events)\n");
        }

        let rows: Vec<EventRow> = events
            .iter()
            .rev()
            .map(|e| EventRow {
                timestamp: self.timestamps.format(e.timestamp),
                logical_id: e.logical_id.clone(),
                resource_type: e.resource_type.clone(),
                status: e.status.clone(),
                reason: wrap(e.reason.as_deref().unwrap_or("-"), REASON_WIDTH),
            })
            .collect();

        let mut output = Table::new(rows).to_string();
        output.push('\n');
        output
    }

    /// Formats the list of existing change sets on a stack.
    #[must_use]
    pub fn format_pending_list(&self, pending: &[PendingChange]) -> String {
        if pending.is_empty() {
            return String::from("  (no existing change sets)\n");
        }

        let rows: Vec<PendingRow> = pending
            .iter()
            .map(|c| PendingRow {
                name: c.name.clone(),
                status: c.status.to_string(),
                created: c
                    .created_at
                    .map_or_else(|| String::from("-"), |t| self.timestamps.format(t)),
            })
            .collect();

        let mut output = Table::new(rows).to_string();
        output.push('\n');
        output
    }

    /// Formats a one-line stack status summary.
    #[must_use]
    pub fn format_stack_status(&self, stack: &StackState) -> String {
        let mut output = format!("Stack: {}\nStatus: {}", stack.name, stack.status);
        if let Some(reason) = &stack.status_reason {
            let _ = write!(output, " ({reason})");
        }
        let _ = write!(
            output,
            "\nTermination protection: {}\n",
            if stack.termination_protection {
                "enabled"
            } else {
                "disabled"
            }
        );
        output
    }
}

/// Prints an informational message to stderr.
pub fn info(message: &str) {
    eprintln!("{message}");
}

/// Prints a success message to stderr.
pub fn success(message: &str) {
    eprintln!("{} {message}", "✓".green());
}

/// Prints a warning message to stderr.
pub fn warning(message: &str) {
    eprintln!("{} {message}", "⚠".yellow());
}

/// Prints an error message to stderr.
pub fn error(message: &str) {
    eprintln!("{} {message}", "✗".red());
}

/// Word-wraps `text` to lines of at most `width` characters.
///
/// Words longer than the width get a line of their own rather than being
/// split mid-word.
fn wrap(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}
