//! Change lifecycle orchestration.
//!
//! Drives the create/wait/apply/reject/delete sequence against the remote
//! provider: conflict pre-checks, change set creation, bounded polling
//! waits, execution and deletion.

mod conflict;
mod lifecycle;
mod wait;

pub use conflict::{evaluate, ConflictDecision, ConflictPolicy};
pub use lifecycle::{DeployOptions, DeployOutcome, Orchestrator};
pub use wait::{poll_until, WaitSettings};
