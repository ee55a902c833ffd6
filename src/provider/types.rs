//! Provider data types: stacks, change sets and events.

use chrono::{DateTime, Utc};

use crate::config::ParameterValue;

/// Current state of a remote stack.
#[derive(Debug, Clone)]
pub struct StackState {
    /// Stack name.
    pub name: String,
    /// Current lifecycle status.
    pub status: StackStatus,
    /// Provider-supplied status reason, if any.
    pub status_reason: Option<String>,
    /// Whether termination protection is enabled.
    pub termination_protection: bool,
}

/// Stack lifecycle status as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackStatus {
    /// Stack creation finished successfully.
    CreateComplete,
    /// Stack creation failed.
    CreateFailed,
    /// Stack creation is underway.
    CreateInProgress,
    /// Stack deletion finished.
    DeleteComplete,
    /// Stack deletion failed.
    DeleteFailed,
    /// Stack deletion is underway.
    DeleteInProgress,
    /// Stack exists only as a change-set review shell.
    ReviewInProgress,
    /// Failed creation rolled back completely.
    RollbackComplete,
    /// Rollback failed.
    RollbackFailed,
    /// Rollback is underway.
    RollbackInProgress,
    /// Stack update finished successfully.
    UpdateComplete,
    /// Post-update cleanup is underway.
    UpdateCompleteCleanupInProgress,
    /// Stack update is underway.
    UpdateInProgress,
    /// Failed update rolled back completely.
    UpdateRollbackComplete,
    /// Post-update-rollback cleanup is underway.
    UpdateRollbackCompleteCleanupInProgress,
    /// Update rollback failed.
    UpdateRollbackFailed,
    /// Update rollback is underway.
    UpdateRollbackInProgress,
    /// Any status this version does not recognize.
    Unknown,
}

impl StackStatus {
    /// Parses a provider status string.
    #[must_use]
    pub fn parse(status: &str) -> Self {
        match status {
            "CREATE_COMPLETE" => Self::CreateComplete,
            "CREATE_FAILED" => Self::CreateFailed,
            "CREATE_IN_PROGRESS" => Self::CreateInProgress,
            "DELETE_COMPLETE" => Self::DeleteComplete,
            "DELETE_FAILED" => Self::DeleteFailed,
            "DELETE_IN_PROGRESS" => Self::DeleteInProgress,
            "REVIEW_IN_PROGRESS" => Self::ReviewInProgress,
            "ROLLBACK_COMPLETE" => Self::RollbackComplete,
            "ROLLBACK_FAILED" => Self::RollbackFailed,
            "ROLLBACK_IN_PROGRESS" => Self::RollbackInProgress,
            "UPDATE_COMPLETE" => Self::UpdateComplete,
            "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS" => Self::UpdateCompleteCleanupInProgress,
            "UPDATE_IN_PROGRESS" => Self::UpdateInProgress,
            "UPDATE_ROLLBACK_COMPLETE" => Self::UpdateRollbackComplete,
            "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS" => {
                Self::UpdateRollbackCompleteCleanupInProgress
            }
            "UPDATE_ROLLBACK_FAILED" => Self::UpdateRollbackFailed,
            "UPDATE_ROLLBACK_IN_PROGRESS" => Self::UpdateRollbackInProgress,
            _ => Self::Unknown,
        }
    }

    /// Returns true while the provider is still transitioning the stack.
    #[must_use]
    pub const fn is_in_progress(self) -> bool {
        matches!(
            self,
            Self::CreateInProgress
                | Self::DeleteInProgress
                | Self::RollbackInProgress
                | Self::UpdateInProgress
                | Self::UpdateCompleteCleanupInProgress
                | Self::UpdateRollbackCompleteCleanupInProgress
                | Self::UpdateRollbackInProgress
        )
    }

    /// Returns true for the success terminal states of an apply.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::CreateComplete | Self::UpdateComplete)
    }
}

impl std::fmt::Display for StackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::CreateComplete => "CREATE_COMPLETE",
            Self::CreateFailed => "CREATE_FAILED",
            Self::CreateInProgress => "CREATE_IN_PROGRESS",
            Self::DeleteComplete => "DELETE_COMPLETE",
            Self::DeleteFailed => "DELETE_FAILED",
            Self::DeleteInProgress => "DELETE_IN_PROGRESS",
            Self::ReviewInProgress => "REVIEW_IN_PROGRESS",
            Self::RollbackComplete => "ROLLBACK_COMPLETE",
            Self::RollbackFailed => "ROLLBACK_FAILED",
            Self::RollbackInProgress => "ROLLBACK_IN_PROGRESS",
            Self::UpdateComplete => "UPDATE_COMPLETE",
            Self::UpdateCompleteCleanupInProgress => "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS",
            Self::UpdateInProgress => "UPDATE_IN_PROGRESS",
            Self::UpdateRollbackComplete => "UPDATE_ROLLBACK_COMPLETE",
            Self::UpdateRollbackCompleteCleanupInProgress => {
                "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS"
            }
            Self::UpdateRollbackFailed => "UPDATE_ROLLBACK_FAILED",
            Self::UpdateRollbackInProgress => "UPDATE_ROLLBACK_IN_PROGRESS",
            Self::Unknown => "UNKNOWN",
        };
        write!(f, "{status}")
    }
}

/// Returns true if a new stack may be created (no stack, or only the
/// review shell of a never-executed change set).
#[must_use]
pub fn is_creatable(stack: Option<&StackState>) -> bool {
    stack.is_none_or(|s| s.status == StackStatus::ReviewInProgress)
}

/// Returns true if the existing stack accepts update change sets.
#[must_use]
pub fn is_updatable(stack: Option<&StackState>) -> bool {
    stack.is_some_and(|s| {
        matches!(
            s.status,
            StackStatus::CreateComplete
                | StackStatus::UpdateComplete
                | StackStatus::UpdateRollbackComplete
        )
    })
}

/// Returns true if the stack exists and is not mid-transition.
#[must_use]
pub fn is_deletable(stack: Option<&StackState>) -> bool {
    stack.is_some_and(|s| !s.status.is_in_progress())
}

/// Status of a pending change (change set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSetStatus {
    /// Still being computed by the provider.
    Pending,
    /// Ready for review and execution.
    Created,
    /// Currently being executed.
    Executing,
    /// The proposal contained no changes against the stack.
    NoChanges,
    /// The provider failed the proposal.
    Failed,
    /// Any status this version does not recognize.
    Other,
}

impl ChangeSetStatus {
    /// Classifies a raw provider status plus reason.
    ///
    /// A FAILED change set whose reason says the submitted information
    /// contained no changes is the distinguished empty-diff outcome, not a
    /// failure.
    #[must_use]
    pub fn classify(status: &str, reason: Option<&str>) -> Self {
        match status {
            "CREATE_PENDING" | "CREATE_IN_PROGRESS" => Self::Pending,
            "CREATE_COMPLETE" => Self::Created,
            "EXECUTE_IN_PROGRESS" => Self::Executing,
            "FAILED" => {
                let reason = reason.unwrap_or_default();
                if reason.contains("The submitted information didn't contain changes.")
                    || reason.contains("No updates are to be performed")
                {
                    Self::NoChanges
                } else {
                    Self::Failed
                }
            }
            _ => Self::Other,
        }
    }

    /// Returns true once the proposal has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for ChangeSetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Pending => "PENDING",
            Self::Created => "CREATED",
            Self::Executing => "EXECUTING",
            Self::NoChanges => "NO_CHANGES",
            Self::Failed => "FAILED",
            Self::Other => "OTHER",
        };
        write!(f, "{status}")
    }
}

/// A proposed but not-yet-committed modification to a stack.
///
/// Owned by the remote provider; referenced here by identifier and name
/// only, never cached across invocations.
#[derive(Debug, Clone)]
pub struct PendingChange {
    /// Provider-assigned identifier.
    pub id: String,
    /// Caller-assigned or generated name.
    pub name: String,
    /// Classified status.
    pub status: ChangeSetStatus,
    /// Provider status reason, if any.
    pub status_reason: Option<String>,
    /// Name of the stack the change targets.
    pub stack_name: String,
    /// When the provider created the change set.
    pub created_at: Option<DateTime<Utc>>,
    /// Per-resource change rows (populated by describe, empty from list).
    pub changes: Vec<ResourceChange>,
}

/// One resource-level row of a described change set.
#[derive(Debug, Clone)]
pub struct ResourceChange {
    /// Add, Modify or Remove.
    pub action: String,
    /// Logical resource id within the template.
    pub logical_id: String,
    /// Provider resource type.
    pub resource_type: String,
    /// Replacement indicator, `-` when not applicable.
    pub replacement: String,
}

/// A stack event.
#[derive(Debug, Clone)]
pub struct StackEvent {
    /// Event timestamp.
    pub timestamp: DateTime<Utc>,
    /// Logical resource id.
    pub logical_id: String,
    /// Provider resource type.
    pub resource_type: String,
    /// Resource status at the time of the event.
    pub status: String,
    /// Status reason, if any.
    pub reason: Option<String>,
}

/// Whether a change set creates a new stack or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSetMode {
    /// The stack does not exist yet (or is only a review shell).
    Create,
    /// The stack exists and will be updated.
    Update,
}

/// Template source for a change set.
#[derive(Debug, Clone)]
pub enum TemplateLocation {
    /// Inline template body read from a local file.
    Body(String),
    /// Remote-storage URL.
    Url(String),
}

/// Request to create a pending change.
#[derive(Debug, Clone)]
pub struct ChangeSetRequest {
    /// Target stack name.
    pub stack_name: String,
    /// Change set name.
    pub change_set_name: String,
    /// Create-or-update mode.
    pub mode: ChangeSetMode,
    /// Template body or URL.
    pub template: TemplateLocation,
    /// Parameters, including use-previous markers.
    pub parameters: Vec<(String, ParameterValue)>,
    /// Tags.
    pub tags: Vec<(String, String)>,
    /// Capabilities.
    pub capabilities: Vec<String>,
}
