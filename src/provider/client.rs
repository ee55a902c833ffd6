//! The provider trait and its CloudFormation implementation.
//!
//! [`CloudFormationProvider`] is a thin wrapper: type mapping and not-found
//! normalization only, no orchestration logic.

use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_sdk_cloudformation::error::ProvideErrorMetadata;
use aws_sdk_cloudformation::types::{Capability, ChangeSetType, Parameter, Tag};
use aws_sdk_cloudformation::Client;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::ParameterValue;
use crate::error::{ProviderError, Result, StackpilotError};

use super::types::{
    ChangeSetMode, ChangeSetRequest, ChangeSetStatus, PendingChange, ResourceChange, StackEvent,
    StackState, StackStatus, TemplateLocation,
};

/// Remote infrastructure provider interface.
///
/// All operations are thin calls: the provider owns the consistency of
/// stacks and change sets, this interface only reads and requests.
#[async_trait]
pub trait StackProvider: Send + Sync {
    /// Describes a stack, or returns `None` if it does not exist.
    async fn describe_stack(&self, stack_name: &str) -> Result<Option<StackState>>;

    /// Lists pending changes for a stack, oldest first.
    async fn list_pending_changes(&self, stack_name: &str) -> Result<Vec<PendingChange>>;

    /// Submits a new pending change and returns its identifier.
    async fn create_pending_change(&self, request: &ChangeSetRequest) -> Result<String>;

    /// Describes a pending change by name (with stack) or bare identifier.
    async fn describe_pending_change(
        &self,
        stack_name: Option<&str>,
        change_set: &str,
    ) -> Result<PendingChange>;

    /// Executes a pending change against its stack.
    async fn execute_pending_change(&self, stack_name: &str, change_set: &str) -> Result<()>;

    /// Discards a pending change.
    async fn delete_pending_change(&self, stack_name: Option<&str>, change_set: &str)
        -> Result<()>;

    /// Requests stack deletion, optionally retaining named resources.
    async fn delete_stack(&self, stack_name: &str, retain_resources: &[String]) -> Result<()>;

    /// Enables or disables termination protection.
    async fn update_termination_protection(&self, stack_name: &str, enabled: bool) -> Result<()>;

    /// Lists stack events newer than `since`, newest first.
    async fn list_events(
        &self,
        stack_name: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<StackEvent>>;

    /// Returns the stack outputs, or `None` if the stack does not exist.
    async fn get_outputs(&self, stack_name: &str) -> Result<Option<BTreeMap<String, String>>>;
}

/// CloudFormation-backed provider.
#[derive(Debug, Clone)]
pub struct CloudFormationProvider {
    /// CloudFormation client.
    client: Client,
}

impl CloudFormationProvider {
    /// Creates a provider from a loaded AWS configuration.
    #[must_use]
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

/// Converts a smithy timestamp to chrono UTC.
fn to_chrono(ts: &aws_sdk_cloudformation::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

/// Maps an SDK error into a provider error for the named operation.
fn api_error<E>(operation: &str, err: &E) -> StackpilotError
where
    E: std::fmt::Display,
{
    StackpilotError::Provider(ProviderError::api(operation, err.to_string()))
}

#[async_trait]
impl StackProvider for CloudFormationProvider {
    async fn describe_stack(&self, stack_name: &str) -> Result<Option<StackState>> {
        debug!("Describing stack: {stack_name}");

        let result = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await;

        match result {
            Ok(output) => {
                let Some(stack) = output.stacks().first() else {
                    return Ok(None);
                };
                Ok(Some(StackState {
                    name: stack.stack_name().unwrap_or(stack_name).to_string(),
                    status: stack
                        .stack_status()
                        .map_or(StackStatus::Unknown, |s| StackStatus::parse(s.as_str())),
                    status_reason: stack.stack_status_reason().map(ToString::to_string),
                    termination_protection: stack.enable_termination_protection().unwrap_or(false),
                }))
            }
            Err(sdk_err) => {
                let service_err = sdk_err.into_service_error();
                let message = service_err.message().unwrap_or_default();
                if message.contains("does not exist") {
                    Ok(None)
                } else {
                    Err(api_error("DescribeStacks", &service_err))
                }
            }
        }
    }

    async fn list_pending_changes(&self, stack_name: &str) -> Result<Vec<PendingChange>> {
        debug!("Listing change sets for stack: {stack_name}");

        let output = self
            .client
            .list_change_sets()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| api_error("ListChangeSets", &e.into_service_error()))?;

        let mut changes: Vec<PendingChange> = output
            .summaries()
            .iter()
            .map(|summary| PendingChange {
                id: summary.change_set_id().unwrap_or_default().to_string(),
                name: summary.change_set_name().unwrap_or_default().to_string(),
                status: ChangeSetStatus::classify(
                    summary.status().map_or("", |s| s.as_str()),
                    summary.status_reason(),
                ),
                status_reason: summary.status_reason().map(ToString::to_string),
                stack_name: summary.stack_name().unwrap_or(stack_name).to_string(),
                created_at: summary.creation_time().and_then(to_chrono),
                changes: Vec::new(),
            })
            .collect();

        changes.sort_by_key(|c| c.created_at);
        Ok(changes)
    }

    async fn create_pending_change(&self, request: &ChangeSetRequest) -> Result<String> {
        debug!(
            "Creating change set {} for stack {}",
            request.change_set_name, request.stack_name
        );

        let mut builder = self
            .client
            .create_change_set()
            .stack_name(&request.stack_name)
            .change_set_name(&request.change_set_name)
            .change_set_type(match request.mode {
                ChangeSetMode::Create => ChangeSetType::Create,
                ChangeSetMode::Update => ChangeSetType::Update,
            });

        builder = match &request.template {
            TemplateLocation::Body(body) => builder.template_body(body),
            TemplateLocation::Url(url) => builder.template_url(url),
        };

        for (key, value) in &request.parameters {
            let parameter = match value {
                ParameterValue::Value(v) => Parameter::builder()
                    .parameter_key(key)
                    .parameter_value(v)
                    .build(),
                ParameterValue::UsePrevious => Parameter::builder()
                    .parameter_key(key)
                    .use_previous_value(true)
                    .build(),
            };
            builder = builder.parameters(parameter);
        }

        for (key, value) in &request.tags {
            let tag = Tag::builder().key(key).value(value).build();
            builder = builder.tags(tag);
        }

        for capability in &request.capabilities {
            builder = builder.capabilities(Capability::from(capability.as_str()));
        }

        let output = builder
            .send()
            .await
            .map_err(|e| api_error("CreateChangeSet", &e.into_service_error()))?;

        Ok(output.id().unwrap_or_default().to_string())
    }

    async fn describe_pending_change(
        &self,
        stack_name: Option<&str>,
        change_set: &str,
    ) -> Result<PendingChange> {
        let mut builder = self.client.describe_change_set().change_set_name(change_set);
        if let Some(stack) = stack_name {
            builder = builder.stack_name(stack);
        }

        let output = builder.send().await.map_err(|e| {
            let service_err = e.into_service_error();
            if service_err.is_change_set_not_found_exception() {
                StackpilotError::Provider(ProviderError::ChangeSetNotFound {
                    change_set: change_set.to_string(),
                })
            } else {
                api_error("DescribeChangeSet", &service_err)
            }
        })?;

        let changes = output
            .changes()
            .iter()
            .filter_map(aws_sdk_cloudformation::types::Change::resource_change)
            .map(|rc| ResourceChange {
                action: rc.action().map_or_else(String::new, |a| a.as_str().to_string()),
                logical_id: rc.logical_resource_id().unwrap_or_default().to_string(),
                resource_type: rc.resource_type().unwrap_or_default().to_string(),
                replacement: rc
                    .replacement()
                    .map_or_else(|| String::from("-"), |r| r.as_str().to_string()),
            })
            .collect();

        Ok(PendingChange {
            id: output.change_set_id().unwrap_or_default().to_string(),
            name: output.change_set_name().unwrap_or(change_set).to_string(),
            status: ChangeSetStatus::classify(
                output.status().map_or("", |s| s.as_str()),
                output.status_reason(),
            ),
            status_reason: output.status_reason().map(ToString::to_string),
            stack_name: output
                .stack_name()
                .or(stack_name)
                .unwrap_or_default()
                .to_string(),
            created_at: output.creation_time().and_then(to_chrono),
            changes,
        })
    }

    async fn execute_pending_change(&self, stack_name: &str, change_set: &str) -> Result<()> {
        self.client
            .execute_change_set()
            .stack_name(stack_name)
            .change_set_name(change_set)
            .send()
            .await
            .map_err(|e| api_error("ExecuteChangeSet", &e.into_service_error()))?;
        Ok(())
    }

    async fn delete_pending_change(
        &self,
        stack_name: Option<&str>,
        change_set: &str,
    ) -> Result<()> {
        let mut builder = self.client.delete_change_set().change_set_name(change_set);
        if let Some(stack) = stack_name {
            builder = builder.stack_name(stack);
        }

        builder
            .send()
            .await
            .map_err(|e| api_error("DeleteChangeSet", &e.into_service_error()))?;
        Ok(())
    }

    async fn delete_stack(&self, stack_name: &str, retain_resources: &[String]) -> Result<()> {
        let mut builder = self.client.delete_stack().stack_name(stack_name);
        for logical_id in retain_resources {
            builder = builder.retain_resources(logical_id);
        }

        builder
            .send()
            .await
            .map_err(|e| api_error("DeleteStack", &e.into_service_error()))?;
        Ok(())
    }

    async fn update_termination_protection(&self, stack_name: &str, enabled: bool) -> Result<()> {
        self.client
            .update_termination_protection()
            .stack_name(stack_name)
            .enable_termination_protection(enabled)
            .send()
            .await
            .map_err(|e| api_error("UpdateTerminationProtection", &e.into_service_error()))?;
        Ok(())
    }

    async fn list_events(
        &self,
        stack_name: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<StackEvent>> {
        let mut events = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut builder = self.client.describe_stack_events().stack_name(stack_name);
            if let Some(token) = &next_token {
                builder = builder.next_token(token);
            }

            let output = builder
                .send()
                .await
                .map_err(|e| api_error("DescribeStackEvents", &e.into_service_error()))?;

            let mut page_exhausted = false;
            for event in output.stack_events() {
                let timestamp = event.timestamp().and_then(to_chrono).unwrap_or_default();
                if since.is_some_and(|cutoff| timestamp <= cutoff) {
                    // Events arrive newest first; everything beyond the
                    // cutoff is older still.
                    page_exhausted = true;
                    break;
                }
                events.push(StackEvent {
                    timestamp,
                    logical_id: event.logical_resource_id().unwrap_or_default().to_string(),
                    resource_type: event.resource_type().unwrap_or_default().to_string(),
                    status: event
                        .resource_status()
                        .map_or_else(String::new, |s| s.as_str().to_string()),
                    reason: event.resource_status_reason().map(ToString::to_string),
                });
            }

            next_token = output.next_token().map(ToString::to_string);
            if page_exhausted || next_token.is_none() {
                break;
            }
        }

        Ok(events)
    }

    async fn get_outputs(&self, stack_name: &str) -> Result<Option<BTreeMap<String, String>>> {
        let result = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await;

        match result {
            Ok(output) => {
                let Some(stack) = output.stacks().first() else {
                    return Ok(None);
                };
                let outputs = stack
                    .outputs()
                    .iter()
                    .filter_map(|o| {
                        Some((
                            o.output_key()?.to_string(),
                            o.output_value().unwrap_or_default().to_string(),
                        ))
                    })
                    .collect();
                Ok(Some(outputs))
            }
            Err(sdk_err) => {
                let service_err = sdk_err.into_service_error();
                let message = service_err.message().unwrap_or_default();
                if message.contains("does not exist") {
                    Ok(None)
                } else {
                    Err(api_error("DescribeStacks", &service_err))
                }
            }
        }
    }
}
