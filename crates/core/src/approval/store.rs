//! Approval persistence contract.
//!
//! The engine reads approvals in bulk through `ApprovalStore` and writes
//! only inside `transaction`, which either commits every write of the
//! closure or none of them. Stores enforce uniqueness of `ApprovalKey`.

use attest_shared::types::{
    ApprovalLevelId, AttributeOptionComboId, OrgUnitId, UserId, WorkflowId,
};
use chrono::{DateTime, Utc};

use super::audit::{allows, AuditEntry, AuditQuery};
use super::error::{ApprovalError, StoreError};
use super::period::Period;
use super::types::{ApprovalKey, ApprovalRecord};

/// Bulk approval lookup. Empty filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalFilter {
    /// Restrict to these levels.
    pub levels: Vec<ApprovalLevelId>,
    /// Restrict to these workflows.
    pub workflows: Vec<WorkflowId>,
    /// Restrict to these periods.
    pub periods: Vec<Period>,
    /// Restrict to these units.
    pub org_units: Vec<OrgUnitId>,
    /// Restrict to these combos.
    pub attribute_option_combos: Vec<AttributeOptionComboId>,
}

impl ApprovalFilter {
    /// Filter covering every key in `keys`.
    #[must_use]
    pub fn covering<'k>(keys: impl IntoIterator<Item = &'k ApprovalKey>) -> Self {
        let mut filter = Self::default();
        for key in keys {
            push_unique(&mut filter.levels, key.level);
            push_unique(&mut filter.workflows, key.workflow);
            push_unique(&mut filter.periods, key.period);
            push_unique(&mut filter.org_units, key.org_unit);
            push_unique(&mut filter.attribute_option_combos, key.attribute_option_combo);
        }
        filter
    }

    /// Returns true if the key passes every filter.
    #[must_use]
    pub fn matches(&self, key: &ApprovalKey) -> bool {
        allows(&self.levels, &key.level)
            && allows(&self.workflows, &key.workflow)
            && allows(&self.periods, &key.period)
            && allows(&self.org_units, &key.org_unit)
            && allows(&self.attribute_option_combos, &key.attribute_option_combo)
    }
}

fn push_unique<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Writes available inside a store transaction.
pub trait ApprovalWriter {
    /// Inserts a new approval.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the key already exists.
    fn insert_approval(&mut self, record: ApprovalRecord) -> Result<(), StoreError>;

    /// Deletes an approval.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key does not exist.
    fn delete_approval(&mut self, key: &ApprovalKey) -> Result<(), StoreError>;

    /// Sets the accepted flag and last-updated metadata.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key does not exist.
    fn set_accepted(
        &mut self,
        key: &ApprovalKey,
        accepted: bool,
        by: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Deletes every approval of a unit, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the delete fails.
    fn delete_approvals_for_org_unit(&mut self, unit: OrgUnitId) -> Result<usize, StoreError>;

    /// Appends an audit entry.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the append fails.
    fn append_audit(&mut self, entry: AuditEntry) -> Result<(), StoreError>;

    /// Deletes every audit entry of a unit, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the delete fails.
    fn delete_audits_for_org_unit(&mut self, unit: OrgUnitId) -> Result<usize, StoreError>;
}

/// Approval persistence.
pub trait ApprovalStore {
    /// Approvals matching the filter.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the lookup fails.
    fn find_approvals(&self, filter: &ApprovalFilter) -> Result<Vec<ApprovalRecord>, StoreError>;

    /// Audit entries matching the query, newest first.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the lookup fails.
    fn audit_entries(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError>;

    /// Runs `work` in one transaction.
    ///
    /// Writes commit only when `work` returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns the error of `work`, or a backend error if the transaction
    /// cannot be started or committed.
    fn transaction<T, F>(&self, work: F) -> Result<T, ApprovalError>
    where
        F: FnOnce(&mut dyn ApprovalWriter) -> Result<T, ApprovalError>;
}
