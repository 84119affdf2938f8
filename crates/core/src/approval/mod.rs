//! Multi-level data approval for Attest.
//!
//! Data for a (workflow, period, organisation unit, attribute option combo)
//! moves through ordered approval levels. An approval at a higher level
//! covers the data of every unit below it. Acceptance is an optional
//! second step on each approval.
//!
//! # Modules
//!
//! - `types` - Approval domain types (levels, workflows, keys, statuses)
//! - `error` - Approval-specific error types
//! - `period` - Period types and periods
//! - `level` - Global approval level ordering
//! - `workflow` - Workflow registry and level remapping
//! - `remap` - Level number remapping within a workflow
//! - `services` - Hierarchy, category and security collaborator traits
//! - `user_level` - User approval levels with a cache
//! - `permissions` - Permission evaluation
//! - `status` - Status derivation from stored approvals
//! - `store` - Persistence traits
//! - `memory` - In-memory store
//! - `audit` - Audit trail entries
//! - `deletion` - Pre-delete checks
//! - `service` - Approve, unapprove, accept and unaccept orchestration
//! - `admin` - Structural edits of levels and workflows

pub mod admin;
pub mod audit;
pub mod deletion;
pub mod error;
pub mod level;
pub mod memory;
pub mod period;
pub mod permissions;
pub mod remap;
pub mod service;
pub mod services;
pub mod status;
pub mod store;
pub mod types;
pub mod user_level;
pub mod workflow;

#[cfg(test)]
mod level_props;
#[cfg(test)]
mod permissions_props;
#[cfg(test)]
mod remap_props;
#[cfg(test)]
mod testing;

pub use admin::{ApprovalAdmin, OrgUnitCascade};
pub use audit::{AuditEntry, AuditQuery};
pub use deletion::{DeletionGuard, DeletionTarget, DeletionVerdict, PreDeleteCheck};
pub use error::{ApprovalError, StoreError};
pub use level::LevelRegistry;
pub use memory::InMemoryApprovalStore;
pub use period::{Period, PeriodType};
pub use permissions::{PermissionsEvaluator, RequestContext};
pub use remap::LevelPlacement;
pub use service::ApprovalService;
pub use services::{CategoryService, Collaborators, OrgUnitHierarchy, SecurityService};
pub use status::StatusQuery;
pub use store::{ApprovalFilter, ApprovalStore, ApprovalWriter};
pub use types::{
    ApprovalAction, ApprovalItem, ApprovalKey, ApprovalLevel, ApprovalRecord, ApprovalState,
    ApprovalStatus, Authorities, DataSetRef, LevelPosition, Permissions, Workflow,
};
pub use user_level::{UserLevelCache, UserLevelResolver};
pub use workflow::WorkflowRegistry;
