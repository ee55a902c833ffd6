//! Remote infrastructure provider boundary.
//!
//! The [`StackProvider`] trait is the seam between the orchestration engine
//! and CloudFormation. [`CloudFormationProvider`] is the thin production
//! implementation; tests substitute an in-memory fake.

mod client;
mod types;

pub use client::{CloudFormationProvider, StackProvider};
pub use types::{
    is_creatable, is_deletable, is_updatable, ChangeSetMode, ChangeSetRequest, ChangeSetStatus,
    PendingChange, ResourceChange, StackEvent, StackState, StackStatus, TemplateLocation,
};
