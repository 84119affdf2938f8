//! Approval audit trail.
//!
//! Every state change appends one immutable entry in the same transaction
//! as the change itself.

use attest_shared::types::{
    ApprovalLevelId, AttributeOptionComboId, AuditEntryId, OrgUnitId, UserId, WorkflowId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::period::Period;
use super::types::{ApprovalAction, ApprovalKey};

/// One audited approval action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry identifier.
    pub id: AuditEntryId,
    /// What happened.
    pub action: ApprovalAction,
    /// Approval level.
    pub level: ApprovalLevelId,
    /// Workflow.
    pub workflow: WorkflowId,
    /// Workflow period.
    pub period: Period,
    /// Organisational unit.
    pub org_unit: OrgUnitId,
    /// Attribute option combo.
    pub attribute_option_combo: AttributeOptionComboId,
    /// Acting user.
    pub actor: UserId,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Creates an entry for an action on an approval key.
    #[must_use]
    pub fn new(action: ApprovalAction, key: &ApprovalKey, actor: UserId, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: AuditEntryId::new(),
            action,
            level: key.level,
            workflow: key.workflow,
            period: key.period,
            org_unit: key.org_unit,
            attribute_option_combo: key.attribute_option_combo,
            actor,
            timestamp,
        }
    }
}

/// Audit query. Empty filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    /// Restrict to these workflows.
    pub workflows: Vec<WorkflowId>,
    /// Restrict to these levels.
    pub levels: Vec<ApprovalLevelId>,
    /// Restrict to these units.
    pub org_units: Vec<OrgUnitId>,
    /// Restrict to these periods.
    pub periods: Vec<Period>,
    /// Restrict to these combos.
    pub attribute_option_combos: Vec<AttributeOptionComboId>,
    /// Restrict to these actions.
    pub actions: Vec<ApprovalAction>,
}

impl AuditQuery {
    /// Returns true if the entry passes every filter.
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        allows(&self.workflows, &entry.workflow)
            && allows(&self.levels, &entry.level)
            && allows(&self.org_units, &entry.org_unit)
            && allows(&self.periods, &entry.period)
            && allows(&self.attribute_option_combos, &entry.attribute_option_combo)
            && allows(&self.actions, &entry.action)
    }
}

pub(crate) fn allows<T: PartialEq>(filter: &[T], value: &T) -> bool {
    filter.is_empty() || filter.contains(value)
}
