//! CI system integration.
//!
//! When running inside a detected CI system, failures and empty-diff
//! outcomes additionally emit log annotations and output variables that
//! downstream pipeline stages can branch on. The environment is snapshotted
//! once per invocation into an explicit [`CiContext`] rather than read
//! ambiently, so tests can inject configurations.

use tracing::debug;

/// Environment variable whose presence marks an Azure DevOps agent.
const AZURE_DEVOPS_MARKER: &str = "SYSTEM_TEAMPROJECTID";

/// Overrides the exported variable name for the change set name.
const NAME_VARIABLE_OVERRIDE: &str = "CHANGE_SET_NAME_VARIABLE";

/// Overrides the exported variable name for the change set id.
const ID_VARIABLE_OVERRIDE: &str = "CHANGE_SET_ID_VARIABLE";

/// Detected CI system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CiSystem {
    /// Not running under a recognized CI system.
    None,
    /// Azure DevOps pipelines.
    AzureDevOps,
}

/// Snapshot of the CI-relevant environment for one invocation.
#[derive(Debug, Clone)]
pub struct CiContext {
    /// Detected CI system.
    system: CiSystem,
    /// Output variable name for the change set name.
    name_variable: String,
    /// Output variable name for the change set id.
    id_variable: String,
}

impl CiContext {
    /// Snapshots the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let system = if std::env::var_os(AZURE_DEVOPS_MARKER).is_some() {
            CiSystem::AzureDevOps
        } else {
            CiSystem::None
        };

        let context = Self {
            system,
            name_variable: std::env::var(NAME_VARIABLE_OVERRIDE)
                .unwrap_or_else(|_| String::from("change_set_name")),
            id_variable: std::env::var(ID_VARIABLE_OVERRIDE)
                .unwrap_or_else(|_| String::from("change_set_id")),
        };
        debug!("CI context: {context:?}");
        context
    }

    /// A context with CI integration disabled, for tests and local runs.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            system: CiSystem::None,
            name_variable: String::from("change_set_name"),
            id_variable: String::from("change_set_id"),
        }
    }

    /// Returns true when a CI system was detected.
    #[must_use]
    pub fn is_ci(&self) -> bool {
        self.system != CiSystem::None
    }

    /// Emits an error-level log annotation.
    pub fn log_error(&self, message: &str) {
        if self.system == CiSystem::AzureDevOps {
            println!("##vso[task.logissue type=error]{message}");
        }
    }

    /// Emits a warning-level log annotation.
    pub fn log_warning(&self, message: &str) {
        if self.system == CiSystem::AzureDevOps {
            println!("##vso[task.logissue type=warning]{message}");
        }
    }

    /// Marks the task as succeeded with issues, so downstream stages can
    /// branch on an empty-diff outcome without treating it as failure.
    pub fn complete_with_issues(&self) {
        if self.system == CiSystem::AzureDevOps {
            println!("##vso[task.complete result=SucceededWithIssues]DONE");
        }
    }

    /// Exports the pending change's name and id as output variables.
    pub fn export_pending_change(&self, change_set_name: &str, change_set_id: &str) {
        if self.system == CiSystem::AzureDevOps {
            println!(
                "##vso[task.setvariable variable={};isOutput=true]{change_set_name}",
                self.name_variable
            );
            println!(
                "##vso[task.setvariable variable={};isOutput=true]{change_set_id}",
                self.id_variable
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_context_is_not_ci() {
        let context = CiContext::disabled();
        assert!(!context.is_ci());
    }

    #[test]
    fn test_disabled_context_annotations_are_noops() {
        // No panic, no output expectations; annotations must be safe to
        // call unconditionally.
        let context = CiContext::disabled();
        context.log_error("error");
        context.log_warning("warning");
        context.complete_with_issues();
        context.export_pending_change("cs-1", "arn:cs-1");
    }

    #[test]
    fn test_azure_devops_detection() {
        let context = CiContext {
            system: CiSystem::AzureDevOps,
            name_variable: String::from("custom_name"),
            id_variable: String::from("custom_id"),
        };
        assert!(context.is_ci());
        assert_eq!(context.name_variable, "custom_name");
        assert_eq!(context.id_variable, "custom_id");
    }
}
