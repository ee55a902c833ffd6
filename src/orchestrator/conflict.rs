//! Conflict evaluation for existing pending changes.
//!
//! Before a new change set is created, the existing change sets on the
//! target stack are checked against the active policy. The check is
//! advisory only: the provider's own concurrency semantics remain
//! authoritative between the check and the create call.

use clap::ValueEnum;

use crate::provider::{ChangeSetStatus, PendingChange};

/// Policy controlling whether existing pending changes block a new one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ConflictPolicy {
    /// Always proceed regardless of existing change sets.
    #[default]
    Allow,
    /// Proceed only if every existing change set has failed.
    FailedOnly,
    /// Proceed only if there are no existing change sets at all.
    Disallow,
}

impl std::fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let policy = match self {
            Self::Allow => "ALLOW",
            Self::FailedOnly => "FAILED_ONLY",
            Self::Disallow => "DISALLOW",
        };
        write!(f, "{policy}")
    }
}

/// Outcome of conflict evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictDecision {
    /// A new change set may be created.
    Proceed,
    /// Creation is blocked by an existing change set.
    Block {
        /// Name of the first blocking change set, in provider order.
        change_set: String,
        /// Status of the blocking change set.
        status: String,
    },
}

/// Evaluates `policy` against the existing pending changes.
///
/// Any status other than FAILED (including NO_CHANGES, PENDING, CREATED and
/// EXECUTING) counts as blocking under `FailedOnly` and `Disallow`. The
/// decision is deterministic: the first blocking change in input order is
/// named.
#[must_use]
pub fn evaluate(policy: ConflictPolicy, existing: &[PendingChange]) -> ConflictDecision {
    match policy {
        ConflictPolicy::Allow => ConflictDecision::Proceed,
        ConflictPolicy::FailedOnly => existing
            .iter()
            .find(|c| c.status != ChangeSetStatus::Failed)
            .map_or(ConflictDecision::Proceed, block),
        ConflictPolicy::Disallow => existing.first().map_or(ConflictDecision::Proceed, block),
    }
}

/// Builds a block decision naming the offending change set.
fn block(change: &PendingChange) -> ConflictDecision {
    ConflictDecision::Block {
        change_set: change.name.clone(),
        status: change.status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(name: &str, status: ChangeSetStatus) -> PendingChange {
        PendingChange {
            id: format!("arn:{name}"),
            name: name.to_string(),
            status,
            status_reason: None,
            stack_name: String::from("test-Stack"),
            created_at: None,
            changes: Vec::new(),
        }
    }

    #[test]
    fn test_allow_always_proceeds() {
        let existing = vec![
            change("cs-1", ChangeSetStatus::Pending),
            change("cs-2", ChangeSetStatus::Failed),
        ];
        assert_eq!(
            evaluate(ConflictPolicy::Allow, &existing),
            ConflictDecision::Proceed
        );
        assert_eq!(evaluate(ConflictPolicy::Allow, &[]), ConflictDecision::Proceed);
    }

    #[test]
    fn test_disallow_blocks_on_any_change() {
        let existing = vec![change("cs-1", ChangeSetStatus::Failed)];
        assert_eq!(
            evaluate(ConflictPolicy::Disallow, &existing),
            ConflictDecision::Block {
                change_set: String::from("cs-1"),
                status: String::from("FAILED"),
            }
        );
    }

    #[test]
    fn test_disallow_proceeds_when_empty() {
        assert_eq!(
            evaluate(ConflictPolicy::Disallow, &[]),
            ConflictDecision::Proceed
        );
    }

    #[test]
    fn test_failed_only_proceeds_when_all_failed() {
        let existing = vec![
            change("cs-1", ChangeSetStatus::Failed),
            change("cs-2", ChangeSetStatus::Failed),
        ];
        assert_eq!(
            evaluate(ConflictPolicy::FailedOnly, &existing),
            ConflictDecision::Proceed
        );
    }

    #[test]
    fn test_failed_only_blocks_on_first_non_failed() {
        let existing = vec![
            change("cs-1", ChangeSetStatus::Failed),
            change("cs-2", ChangeSetStatus::Created),
            change("cs-3", ChangeSetStatus::Pending),
        ];
        assert_eq!(
            evaluate(ConflictPolicy::FailedOnly, &existing),
            ConflictDecision::Block {
                change_set: String::from("cs-2"),
                status: String::from("CREATED"),
            }
        );
    }

    #[test]
    fn test_failed_only_treats_no_changes_as_blocking() {
        let existing = vec![change("cs-1", ChangeSetStatus::NoChanges)];
        assert!(matches!(
            evaluate(ConflictPolicy::FailedOnly, &existing),
            ConflictDecision::Block { .. }
        ));
    }

    #[test]
    fn test_decision_is_deterministic() {
        let existing = vec![
            change("cs-a", ChangeSetStatus::Pending),
            change("cs-b", ChangeSetStatus::Pending),
        ];
        let first = evaluate(ConflictPolicy::Disallow, &existing);
        let second = evaluate(ConflictPolicy::Disallow, &existing);
        assert_eq!(first, second);
    }
}
