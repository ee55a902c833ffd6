//! Deployment lifecycle driver.
//!
//! The [`Orchestrator`] sequences every remote mutation: it proposes a
//! change set, waits for the provider to compute it, applies or rejects it,
//! and deletes stacks. All state lives with the provider; the orchestrator
//! re-reads it each step and never caches across invocations.

use std::cell::Cell;

use chrono::{Duration as ChronoDuration, Utc};
use tracing::{debug, info};

use crate::ci::CiContext;
use crate::config::{DeploymentDescriptor, ParameterValue};
use crate::error::{Result, StackError, StackpilotError};
use crate::provider::{
    is_creatable, is_deletable, is_updatable, ChangeSetMode, ChangeSetRequest, ChangeSetStatus,
    PendingChange, StackProvider, StackState, StackStatus, TemplateLocation,
};
use crate::report::{self, Reporter};

use super::conflict::{evaluate, ConflictDecision, ConflictPolicy};
use super::wait::{poll_until, WaitSettings};

/// Options for one deploy invocation.
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Explicit change set name; generated when absent.
    pub change_set_name: Option<String>,
    /// Policy for existing change sets on the target stack.
    pub existing_changes: ConflictPolicy,
    /// Execute the change set immediately after creation.
    pub auto_apply: bool,
}

/// Result of a deploy invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// The proposal contained no changes; nothing was modified.
    NoChanges,
    /// A change set was created and left pending for review.
    Proposed {
        /// Change set name.
        change_set_name: String,
        /// Provider-assigned identifier.
        change_set_id: String,
    },
    /// A change set was created and executed to completion.
    Applied {
        /// Stack name.
        stack_name: String,
    },
}

/// Drives the change lifecycle against a [`StackProvider`].
pub struct Orchestrator<P> {
    provider: P,
    reporter: Reporter,
    ci: CiContext,
    change_set_wait: WaitSettings,
    stack_wait: WaitSettings,
}

impl<P: StackProvider> Orchestrator<P> {
    /// Creates an orchestrator with the standard wait bounds.
    #[must_use]
    pub fn new(provider: P, reporter: Reporter, ci: CiContext) -> Self {
        Self {
            provider,
            reporter,
            ci,
            change_set_wait: WaitSettings::change_set(),
            stack_wait: WaitSettings::stack(),
        }
    }

    /// Overrides the wait bounds.
    #[must_use]
    pub const fn with_wait_settings(
        mut self,
        change_set_wait: WaitSettings,
        stack_wait: WaitSettings,
    ) -> Self {
        self.change_set_wait = change_set_wait;
        self.stack_wait = stack_wait;
        self
    }

    /// Proposes a change set for `descriptor` and, depending on options,
    /// leaves it pending or applies it.
    ///
    /// The conflict policy is checked against existing change sets before
    /// any mutation. A stack stuck in `ROLLBACK_COMPLETE` (failed initial
    /// creation) is deleted first, since the provider accepts no further
    /// change sets for it.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Conflict`] when blocked by the policy,
    /// [`StackError::NotDeployable`] when the stack's status accepts no new
    /// change sets, [`StackError::ChangeCreation`] when the provider fails
    /// the proposal, and apply errors when `auto_apply` is set.
    pub async fn deploy(
        &self,
        descriptor: &DeploymentDescriptor,
        options: &DeployOptions,
    ) -> Result<DeployOutcome> {
        let stack_name = &descriptor.stack_name;
        let mut stack = self.provider.describe_stack(stack_name).await?;

        if stack
            .as_ref()
            .is_some_and(|s| s.status == StackStatus::RollbackComplete)
        {
            report::warning(&format!(
                "Stack {stack_name} is in ROLLBACK_COMPLETE and will be re-created"
            ));
            self.remove_stack(stack_name, &[]).await?;
            stack = None;
        }

        let mode = if is_creatable(stack.as_ref()) {
            ChangeSetMode::Create
        } else if is_updatable(stack.as_ref()) {
            ChangeSetMode::Update
        } else {
            let status = stack
                .as_ref()
                .map_or_else(String::new, |s| s.status.to_string());
            return Err(StackpilotError::Stack(StackError::NotDeployable {
                stack_name: stack_name.clone(),
                status,
            }));
        };

        let existing = self.provider.list_pending_changes(stack_name).await?;
        if !existing.is_empty() {
            report::info(&format!("Existing change sets on {stack_name}:"));
            report::info(&self.reporter.format_pending_list(&existing));
        }
        if let ConflictDecision::Block { change_set, status } =
            evaluate(options.existing_changes, &existing)
        {
            return Err(StackpilotError::Stack(StackError::Conflict {
                change_set,
                status,
                policy: options.existing_changes.to_string(),
            }));
        }

        let change_set_name = options
            .change_set_name
            .clone()
            .unwrap_or_else(generate_change_set_name);
        let request = self.build_request(descriptor, mode, change_set_name).await?;

        info!(
            "Creating change set {} for stack {stack_name}",
            request.change_set_name
        );
        let change_set_id = self.provider.create_pending_change(&request).await?;
        let change = self
            .wait_for_change_set(stack_name, &request.change_set_name)
            .await?;

        match change.status {
            ChangeSetStatus::NoChanges => {
                self.provider
                    .delete_pending_change(Some(stack_name), &request.change_set_name)
                    .await?;
                if let Some(state) = &stack {
                    self.sync_termination_protection(state, descriptor.termination_protection)
                        .await?;
                }
                let message = format!("No changes to deploy for stack {stack_name}");
                report::warning(&message);
                self.ci.log_warning(&message);
                self.ci.complete_with_issues();
                Ok(DeployOutcome::NoChanges)
            }
            ChangeSetStatus::Created => {
                report::info(&self.reporter.format_changes(&change));
                if let Some(state) = &stack {
                    self.sync_termination_protection(state, descriptor.termination_protection)
                        .await?;
                }
                if options.auto_apply {
                    self.apply(Some(stack_name), &request.change_set_name)
                        .await?;
                    if mode == ChangeSetMode::Create && descriptor.termination_protection {
                        // Stacks created through a change set start unprotected.
                        self.provider
                            .update_termination_protection(stack_name, true)
                            .await?;
                    }
                    Ok(DeployOutcome::Applied {
                        stack_name: stack_name.clone(),
                    })
                } else {
                    self.ci
                        .export_pending_change(&request.change_set_name, &change_set_id);
                    report::success(&format!(
                        "Change set {} is ready for review",
                        request.change_set_name
                    ));
                    Ok(DeployOutcome::Proposed {
                        change_set_name: request.change_set_name,
                        change_set_id,
                    })
                }
            }
            status => Err(StackpilotError::Stack(StackError::ChangeCreation {
                stack_name: stack_name.clone(),
                status: status.to_string(),
                reason: change
                    .status_reason
                    .unwrap_or_else(|| String::from("(no reason reported)")),
            })),
        }
    }

    /// Executes a previously created change set and waits for the stack to
    /// settle, printing the events the execution produced.
    ///
    /// The change set is addressed by name together with `stack_name`, or by
    /// bare identifier with `stack_name` set to `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::ChangeApply`] when the stack ends in a
    /// non-success status and [`StackError::Timeout`] when the wait bound
    /// elapses first.
    pub async fn apply(&self, stack_name: Option<&str>, change_set: &str) -> Result<()> {
        let change = self
            .provider
            .describe_pending_change(stack_name, change_set)
            .await?;
        let stack_name = change.stack_name.clone();

        let cutoff = self
            .provider
            .list_events(&stack_name, None)
            .await?
            .first()
            .map(|e| e.timestamp);
        let before = self.provider.describe_stack(&stack_name).await?;
        let prior_status = before.map(|s| s.status);

        info!("Executing change set {} on {stack_name}", change.name);
        self.provider
            .execute_pending_change(&stack_name, &change.name)
            .await?;

        let saw_in_progress = Cell::new(false);
        let settled = poll_until(
            self.stack_wait,
            &stack_name,
            "change set execution",
            || async {
                self.provider
                    .describe_stack(&stack_name)
                    .await?
                    .ok_or_else(|| {
                        StackpilotError::Stack(StackError::StackNotFound {
                            stack_name: stack_name.clone(),
                        })
                    })
            },
            |state: &StackState| {
                if state.status.is_in_progress() {
                    saw_in_progress.set(true);
                    return false;
                }
                // The pre-execution status can linger briefly; wait for the
                // transition before accepting a terminal reading.
                saw_in_progress.get() || prior_status != Some(state.status)
            },
        )
        .await?;

        let events = self.provider.list_events(&stack_name, cutoff).await?;
        report::info(&self.reporter.format_events(&events));

        if settled.status.is_success() {
            report::success(&format!("Stack {stack_name} deployed successfully"));
            Ok(())
        } else {
            Err(StackpilotError::Stack(StackError::ChangeApply {
                stack_name,
                change_set: change.name,
                reason: format!("stack status {}", settled.status),
            }))
        }
    }

    /// Discards a pending change set.
    ///
    /// Rejecting a change set that no longer exists is a no-op. When the
    /// rejected change was the last one on a stack that exists only as a
    /// review shell, the empty shell is deleted as well.
    pub async fn reject(&self, stack_name: Option<&str>, change_set: &str) -> Result<()> {
        let change = match self
            .provider
            .describe_pending_change(stack_name, change_set)
            .await
        {
            Ok(change) => change,
            Err(StackpilotError::Provider(
                crate::error::ProviderError::ChangeSetNotFound { .. },
            )) => {
                report::info(&format!("Change set {change_set} does not exist"));
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        self.provider
            .delete_pending_change(Some(&change.stack_name), &change.name)
            .await?;
        report::success(&format!("Deleted change set {}", change.name));

        let stack = self.provider.describe_stack(&change.stack_name).await?;
        if stack.is_some_and(|s| s.status == StackStatus::ReviewInProgress) {
            let remaining = self
                .provider
                .list_pending_changes(&change.stack_name)
                .await?;
            if remaining.is_empty() {
                info!(
                    "Deleting empty review stack {} left by the rejected change",
                    change.stack_name
                );
                self.provider.delete_stack(&change.stack_name, &[]).await?;
            }
        }
        Ok(())
    }

    /// Deletes a stack after explicit confirmation.
    ///
    /// Termination protection is disabled first when enabled. `retain`
    /// names logical resources the provider should keep.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NotConfirmed`] before any remote contact when
    /// `confirmed` is false, and [`StackError::Deletion`] when deletion
    /// fails or does not finish within the wait bound.
    pub async fn delete(&self, stack_name: &str, retain: &[String], confirmed: bool) -> Result<()> {
        if !confirmed {
            return Err(StackpilotError::Stack(StackError::NotConfirmed {
                stack_name: stack_name.to_string(),
            }));
        }

        let stack = self.provider.describe_stack(stack_name).await?;
        if !is_deletable(stack.as_ref()) {
            let reason = stack.as_ref().map_or_else(
                || String::from("stack does not exist"),
                |s| format!("stack status {} does not allow deletion", s.status),
            );
            return Err(StackpilotError::Stack(StackError::Deletion {
                stack_name: stack_name.to_string(),
                reason,
            }));
        }

        if stack.is_some_and(|s| s.termination_protection) {
            info!("Disabling termination protection on {stack_name}");
            self.provider
                .update_termination_protection(stack_name, false)
                .await?;
        }

        self.remove_stack(stack_name, retain).await?;
        report::success(&format!("Stack {stack_name} deleted"));
        Ok(())
    }

    /// Reports current stack state, existing change sets and recent events.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::StackNotFound`] when the stack does not exist.
    pub async fn status(&self, stack_name: &str, event_hours: i64) -> Result<String> {
        let stack = self.provider.describe_stack(stack_name).await?.ok_or_else(|| {
            StackpilotError::Stack(StackError::StackNotFound {
                stack_name: stack_name.to_string(),
            })
        })?;

        let pending = self.provider.list_pending_changes(stack_name).await?;
        let since = Utc::now() - ChronoDuration::hours(event_hours);
        let events = self.provider.list_events(stack_name, Some(since)).await?;

        let mut output = self.reporter.format_stack_status(&stack);
        output.push_str("\nChange sets:\n");
        output.push_str(&self.reporter.format_pending_list(&pending));
        output.push_str(&format!("\nEvents (last {event_hours}h):\n"));
        output.push_str(&self.reporter.format_events(&events));
        Ok(output)
    }

    /// Fetches one output value from a deployed stack.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::OutputNotFound`] when the stack does not exist
    /// or exposes no output under `output_key`.
    pub async fn get_output(&self, stack_name: &str, output_key: &str) -> Result<String> {
        let outputs = self.provider.get_outputs(stack_name).await?;
        outputs
            .and_then(|mut o| o.remove(output_key))
            .ok_or_else(|| {
                StackpilotError::Stack(StackError::OutputNotFound {
                    stack_name: stack_name.to_string(),
                    output_key: output_key.to_string(),
                })
            })
    }

    /// Builds the change-set request from a resolved descriptor, reading
    /// the template body from disk unless it is a remote URL.
    async fn build_request(
        &self,
        descriptor: &DeploymentDescriptor,
        mode: ChangeSetMode,
        change_set_name: String,
    ) -> Result<ChangeSetRequest> {
        let template = if descriptor.template_is_url() {
            TemplateLocation::Url(descriptor.template.clone())
        } else {
            debug!("Reading template from {}", descriptor.template);
            TemplateLocation::Body(tokio::fs::read_to_string(&descriptor.template).await?)
        };

        let parameters: Vec<(String, ParameterValue)> = descriptor
            .parameters
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let tags: Vec<(String, String)> = descriptor
            .tags
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(ChangeSetRequest {
            stack_name: descriptor.stack_name.clone(),
            change_set_name,
            mode,
            template,
            parameters,
            tags,
            capabilities: descriptor.capabilities.clone(),
        })
    }

    /// Waits until the provider finishes computing a change set.
    async fn wait_for_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Result<PendingChange> {
        poll_until(
            self.change_set_wait,
            stack_name,
            "change set creation",
            || {
                self.provider
                    .describe_pending_change(Some(stack_name), change_set_name)
            },
            |change| change.status.is_terminal(),
        )
        .await
    }

    /// Aligns remote termination protection with the configured value.
    async fn sync_termination_protection(&self, state: &StackState, desired: bool) -> Result<()> {
        if state.termination_protection != desired {
            info!(
                "Setting termination protection on {} to {desired}",
                state.name
            );
            self.provider
                .update_termination_protection(&state.name, desired)
                .await?;
        }
        Ok(())
    }

    /// Deletes a stack and waits until it is gone.
    ///
    /// A wait timeout is reported as a deletion failure: unlike an apply,
    /// there is no pending change left to retry against.
    async fn remove_stack(&self, stack_name: &str, retain: &[String]) -> Result<()> {
        self.provider.delete_stack(stack_name, retain).await?;

        let outcome = poll_until(
            self.stack_wait,
            stack_name,
            "stack deletion",
            || self.provider.describe_stack(stack_name),
            |state: &Option<StackState>| {
                state.as_ref().is_none_or(|s| {
                    matches!(
                        s.status,
                        StackStatus::DeleteComplete | StackStatus::DeleteFailed
                    )
                })
            },
        )
        .await;

        match outcome {
            Ok(Some(state)) if state.status == StackStatus::DeleteFailed => {
                Err(StackpilotError::Stack(StackError::Deletion {
                    stack_name: stack_name.to_string(),
                    reason: state
                        .status_reason
                        .unwrap_or_else(|| String::from("DELETE_FAILED")),
                }))
            }
            Ok(_) => Ok(()),
            Err(StackpilotError::Stack(StackError::Timeout { .. })) => {
                Err(StackpilotError::Stack(StackError::Deletion {
                    stack_name: stack_name.to_string(),
                    reason: String::from("timed out waiting for deletion"),
                }))
            }
            Err(err) => Err(err),
        }
    }
}

/// Generates a unique change set name.
///
/// CloudFormation requires the name to start with a letter, so the UUID is
/// prefixed.
fn generate_change_set_name() -> String {
    format!("c{}", uuid::Uuid::new_v4().simple())
}
