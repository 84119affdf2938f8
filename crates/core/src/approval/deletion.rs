//! Pre-delete checks for approval structure.
//!
//! Each check inspects a deletion target and either allows it or vetoes it
//! with a reason. The guard runs its checks in order and stops at the first
//! veto.

use attest_shared::types::{ApprovalLevelId, WorkflowId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use super::error::ApprovalError;
use super::store::{ApprovalFilter, ApprovalStore};
use super::workflow::WorkflowRegistry;

/// Something an administrator wants to delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionTarget {
    /// An approval level.
    Level(ApprovalLevelId),
    /// A workflow.
    Workflow(WorkflowId),
}

/// A named pre-delete check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreDeleteCheck {
    /// A level may not be deleted while a workflow includes it.
    LevelUnusedByWorkflows,
    /// A level may not be deleted while approvals reference it.
    LevelHasNoApprovals,
    /// A workflow may not be deleted while approvals reference it.
    WorkflowHasNoApprovals,
}

impl PreDeleteCheck {
    /// Returns the string representation of the check.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LevelUnusedByWorkflows => "level_unused_by_workflows",
            Self::LevelHasNoApprovals => "level_has_no_approvals",
            Self::WorkflowHasNoApprovals => "workflow_has_no_approvals",
        }
    }

    /// Runs the check. Checks that do not apply to the target allow it.
    ///
    /// # Errors
    ///
    /// Returns a store error if approvals cannot be looked up.
    pub fn run<S: ApprovalStore>(
        self,
        target: DeletionTarget,
        workflows: &WorkflowRegistry,
        store: &S,
    ) -> Result<DeletionVerdict, ApprovalError> {
        let verdict = match (self, target) {
            (Self::LevelUnusedByWorkflows, DeletionTarget::Level(level)) => {
                let users: Vec<&str> = workflows
                    .using_level(level)
                    .into_iter()
                    .map(|w| w.name.as_str())
                    .collect();
                if users.is_empty() {
                    DeletionVerdict::Allow
                } else {
                    self.veto(format!("level is used by workflows: {}", users.join(", ")))
                }
            }
            (Self::LevelHasNoApprovals, DeletionTarget::Level(level)) => {
                let filter = ApprovalFilter {
                    levels: vec![level],
                    ..ApprovalFilter::default()
                };
                self.veto_if_approved(store, &filter)?
            }
            (Self::WorkflowHasNoApprovals, DeletionTarget::Workflow(workflow)) => {
                let filter = ApprovalFilter {
                    workflows: vec![workflow],
                    ..ApprovalFilter::default()
                };
                self.veto_if_approved(store, &filter)?
            }
            _ => DeletionVerdict::Allow,
        };
        Ok(verdict)
    }

    fn veto_if_approved<S: ApprovalStore>(
        self,
        store: &S,
        filter: &ApprovalFilter,
    ) -> Result<DeletionVerdict, ApprovalError> {
        let count = store.find_approvals(filter)?.len();
        Ok(if count == 0 {
            DeletionVerdict::Allow
        } else {
            self.veto(format!("{count} approvals reference it"))
        })
    }

    fn veto(self, reason: String) -> DeletionVerdict {
        DeletionVerdict::Veto {
            check: self,
            reason,
        }
    }
}

impl fmt::Display for PreDeleteCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a pre-delete check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionVerdict {
    /// The deletion may proceed.
    Allow,
    /// The deletion is refused.
    Veto {
        /// The vetoing check.
        check: PreDeleteCheck,
        /// Why the deletion was refused.
        reason: String,
    },
}

/// Ordered list of pre-delete checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionGuard {
    checks: Vec<PreDeleteCheck>,
}

impl DeletionGuard {
    /// Creates a guard with the given checks.
    #[must_use]
    pub const fn new(checks: Vec<PreDeleteCheck>) -> Self {
        Self { checks }
    }

    /// The checks this guard runs, in order.
    #[must_use]
    pub fn checks(&self) -> &[PreDeleteCheck] {
        &self.checks
    }

    /// Runs every check, returning the first veto.
    ///
    /// # Errors
    ///
    /// Returns a store error if a check cannot run.
    pub fn check<S: ApprovalStore>(
        &self,
        target: DeletionTarget,
        workflows: &WorkflowRegistry,
        store: &S,
    ) -> Result<DeletionVerdict, ApprovalError> {
        for check in &self.checks {
            let verdict = check.run(target, workflows, store)?;
            if let DeletionVerdict::Veto { check, reason } = &verdict {
                warn!(?target, %check, %reason, "Deletion vetoed");
                return Ok(verdict);
            }
        }
        Ok(DeletionVerdict::Allow)
    }

    /// Like `check`, but turns a veto into an error.
    ///
    /// # Errors
    ///
    /// Returns `DeletionVetoed` on a veto, or a store error.
    pub fn ensure_allowed<S: ApprovalStore>(
        &self,
        target: DeletionTarget,
        workflows: &WorkflowRegistry,
        store: &S,
    ) -> Result<(), ApprovalError> {
        match self.check(target, workflows, store)? {
            DeletionVerdict::Allow => Ok(()),
            DeletionVerdict::Veto { check, reason } => {
                Err(ApprovalError::DeletionVetoed { check, reason })
            }
        }
    }
}

impl Default for DeletionGuard {
    fn default() -> Self {
        Self::new(vec![
            PreDeleteCheck::LevelUnusedByWorkflows,
            PreDeleteCheck::LevelHasNoApprovals,
            PreDeleteCheck::WorkflowHasNoApprovals,
        ])
    }
}
