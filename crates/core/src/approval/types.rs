//! Approval domain types.
//!
//! Levels and workflows describe the approval structure, records are the
//! persisted approvals, and statuses are the derived per-combo view that
//! permissions are evaluated against.

use attest_shared::types::{
    ApprovalLevelId, AttributeOptionComboId, CategoryComboId, DataSetId, OptionGroupSetId,
    OrgUnitId, UserId, WorkflowId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::period::{Period, PeriodType};

/// One level in the global approval hierarchy.
///
/// Level 1 carries the highest authority. Levels are bound to an
/// organisational depth (1 = root) and may be restricted to a category
/// option group set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalLevel {
    /// Level identifier, stable across renumbering.
    pub id: ApprovalLevelId,
    /// Display name.
    pub name: String,
    /// Position in the registry, 1..N.
    pub level: u32,
    /// Organisational depth this level approves at.
    pub org_unit_depth: u32,
    /// Optional category option group set restriction.
    pub group_set: Option<OptionGroupSetId>,
}

impl ApprovalLevel {
    /// Creates an unnumbered level. The registry assigns the number.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        org_unit_depth: u32,
        group_set: Option<OptionGroupSetId>,
    ) -> Self {
        Self {
            id: ApprovalLevelId::new(),
            name: name.into(),
            level: 0,
            org_unit_depth,
            group_set,
        }
    }

    /// Returns true if the level is restricted to a group set.
    #[must_use]
    pub const fn is_restricted(&self) -> bool {
        self.group_set.is_some()
    }

    /// Sort key of the registry ordering: depth first, unrestricted first.
    #[must_use]
    pub const fn ordering_key(&self) -> (u32, bool) {
        (self.org_unit_depth, self.is_restricted())
    }
}

/// A data set attached to a workflow, with its attribute category combo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSetRef {
    /// Data set identifier.
    pub id: DataSetId,
    /// Attribute category combo of the data set.
    pub category_combo: CategoryComboId,
}

/// An approval workflow: a subset of global levels for one period type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow identifier.
    pub id: WorkflowId,
    /// Display name.
    pub name: String,
    /// Period type data is approved for.
    pub period_type: PeriodType,
    /// Member levels, kept in global level order by the registry.
    pub levels: Vec<ApprovalLevelId>,
    /// Data sets approved through this workflow.
    pub data_sets: Vec<DataSetRef>,
    /// Contiguous per-workflow level number for each member level.
    #[serde(default)]
    pub remap: BTreeMap<ApprovalLevelId, u32>,
}

impl Workflow {
    /// Creates a workflow. Remaps are filled in when it is registered.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        period_type: PeriodType,
        levels: Vec<ApprovalLevelId>,
        data_sets: Vec<DataSetRef>,
    ) -> Self {
        Self {
            id: WorkflowId::new(),
            name: name.into(),
            period_type,
            levels,
            data_sets,
            remap: BTreeMap::new(),
        }
    }

    /// Returns the remapped number of a member level.
    #[must_use]
    pub fn remapped_level(&self, level: ApprovalLevelId) -> Option<u32> {
        self.remap.get(&level).copied()
    }

    /// Returns true if the level is a member of this workflow.
    #[must_use]
    pub fn contains_level(&self, level: ApprovalLevelId) -> bool {
        self.levels.contains(&level)
    }
}

/// A workflow level resolved against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelPosition {
    /// Level identifier.
    pub id: ApprovalLevelId,
    /// Global level number.
    pub level: u32,
    /// Remapped number inside the workflow.
    pub index: u32,
    /// Organisational depth of the level.
    pub depth: u32,
    /// Option group set restricting the level, if any.
    pub group_set: Option<OptionGroupSetId>,
}

/// Unique key of a persisted approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApprovalKey {
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
}

impl fmt::Display for ApprovalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "level={} workflow={} period={} org_unit={} aoc={}",
            self.level, self.workflow, self.period, self.org_unit, self.attribute_option_combo
        )
    }
}

/// A persisted approval.
///
/// Existence means the data is approved at `key.level` and implicitly at
/// every level below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Unique key.
    pub key: ApprovalKey,
    /// Whether the approval has been accepted by the level above.
    pub accepted: bool,
    /// Approving user.
    pub created_by: UserId,
    /// Approval time.
    pub created_at: DateTime<Utc>,
    /// User of the last accept or unaccept.
    pub last_updated_by: UserId,
    /// Time of the last accept or unaccept.
    pub last_updated_at: DateTime<Utc>,
}

impl ApprovalRecord {
    /// Creates a fresh approval record.
    #[must_use]
    pub fn new(key: ApprovalKey, accepted: bool, by: UserId, at: DateTime<Utc>) -> Self {
        Self {
            key,
            accepted,
            created_by: by,
            created_at: at,
            last_updated_by: by,
            last_updated_at: at,
        }
    }
}

/// One entry of an approve/unapprove/accept/unaccept batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalItem {
    /// Workflow.
    pub workflow: WorkflowId,
    /// Period of the data.
    pub period: Period,
    /// Organisational unit.
    pub org_unit: OrgUnitId,
    /// Attribute option combo.
    pub attribute_option_combo: AttributeOptionComboId,
    /// Explicit level; defaulted from the status when absent.
    pub level: Option<ApprovalLevelId>,
}

impl ApprovalItem {
    /// Creates an item without an explicit level.
    #[must_use]
    pub const fn new(
        workflow: WorkflowId,
        period: Period,
        org_unit: OrgUnitId,
        attribute_option_combo: AttributeOptionComboId,
    ) -> Self {
        Self {
            workflow,
            period,
            org_unit,
            attribute_option_combo,
            level: None,
        }
    }

    /// Sets an explicit level.
    #[must_use]
    pub const fn at_level(mut self, level: ApprovalLevelId) -> Self {
        self.level = Some(level);
        self
    }
}

/// A state-changing approval action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    /// Data approved at a level.
    Approve,
    /// Approval removed.
    Unapprove,
    /// Approval accepted by the level above.
    Accept,
    /// Acceptance removed.
    Unaccept,
}

impl ApprovalAction {
    /// Returns the string representation of the action.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Unapprove => "unapprove",
            Self::Accept => "accept",
            Self::Unaccept => "unaccept",
        }
    }
}

impl fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived approval state of one (workflow, period, unit, combo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    /// No workflow level binds the unit's depth, or the unit is unknown.
    Unapprovable,
    /// Lower levels are not yet approved, so the action level must wait.
    UnapprovedWaiting,
    /// Ready for approval at the action level.
    Unapproved,
    /// Approved by a record on this unit.
    ApprovedHere,
    /// Approved and accepted on this unit.
    AcceptedHere,
    /// Approved by a record on an ancestor unit.
    ApprovedAbove,
}

impl ApprovalState {
    /// Returns the string representation of the state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unapprovable => "unapprovable",
            Self::UnapprovedWaiting => "unapproved_waiting",
            Self::Unapproved => "unapproved",
            Self::ApprovedHere => "approved_here",
            Self::AcceptedHere => "accepted_here",
            Self::ApprovedAbove => "approved_above",
        }
    }

    /// Returns true for any approved state.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(
            self,
            Self::ApprovedHere | Self::AcceptedHere | Self::ApprovedAbove
        )
    }

    /// Returns true if the deciding approval is on the unit itself.
    #[must_use]
    pub const fn is_here(&self) -> bool {
        matches!(self, Self::ApprovedHere | Self::AcceptedHere)
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Capabilities of the current user on one status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// May approve at the next level.
    pub may_approve: bool,
    /// May remove the current approval.
    pub may_unapprove: bool,
    /// May accept the current approval.
    pub may_accept: bool,
    /// May remove the current acceptance.
    pub may_unaccept: bool,
    /// May read the data.
    pub may_read: bool,
}

impl Permissions {
    /// Read access and nothing else.
    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            may_approve: false,
            may_unapprove: false,
            may_accept: false,
            may_unaccept: false,
            may_read: true,
        }
    }

    /// Returns true if any mutation is permitted.
    #[must_use]
    pub const fn any_mutation(&self) -> bool {
        self.may_approve || self.may_unapprove || self.may_accept || self.may_unaccept
    }
}

/// Authority flags granted to a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorities {
    /// Approve at the user's own level.
    pub approve: bool,
    /// Approve at any level below the user's own.
    pub approve_lower_levels: bool,
    /// Accept approvals one level below (or anywhere below with
    /// `approve_lower_levels`).
    pub accept_lower_levels: bool,
    /// Read data regardless of approval.
    pub view_unapproved_data: bool,
}

/// Approval status snapshot of one (workflow, period, unit, combo).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStatus {
    /// Workflow.
    pub workflow: WorkflowId,
    /// Workflow period.
    pub period: Period,
    /// Organisational unit.
    pub org_unit: OrgUnitId,
    /// Attribute option combo.
    pub attribute_option_combo: AttributeOptionComboId,
    /// Derived state.
    pub state: ApprovalState,
    /// Level of the deciding approval.
    pub approved_level: Option<LevelPosition>,
    /// Unit holding the deciding approval.
    pub approved_org_unit: Option<OrgUnitId>,
    /// Level the unit's data currently sits at.
    pub action_level: Option<LevelPosition>,
    /// Level the next approve on this unit targets.
    pub next_level: Option<LevelPosition>,
    /// Stored accepted flag of the deciding approval.
    pub accepted: bool,
    /// Approving user.
    pub approved_by: Option<UserId>,
    /// Approval time.
    pub approved_at: Option<DateTime<Utc>>,
    /// User of the last accept or unaccept.
    pub accepted_by: Option<UserId>,
    /// Time of the last accept or unaccept.
    pub accepted_at: Option<DateTime<Utc>>,
    /// Capabilities of the requesting user.
    pub permissions: Permissions,
}

impl ApprovalStatus {
    /// Workflow index the data sits at for permission purposes.
    #[must_use]
    pub fn data_index(&self) -> Option<u32> {
        match self.state {
            ApprovalState::Unapprovable => None,
            ApprovalState::Unapproved | ApprovalState::UnapprovedWaiting => {
                self.action_level.map(|l| l.index)
            }
            _ => self.approved_level.map(|l| l.index),
        }
    }

    /// Key of the deciding approval, if it is on this unit.
    #[must_use]
    pub fn approval_key(&self) -> Option<ApprovalKey> {
        if !self.state.is_here() {
            return None;
        }
        self.approved_level.map(|level| ApprovalKey {
            level: level.id,
            workflow: self.workflow,
            period: self.period,
            org_unit: self.org_unit,
            attribute_option_combo: self.attribute_option_combo,
        })
    }
}
