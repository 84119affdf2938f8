//! In-memory approval store.
//!
//! A transaction stages its writes on a copy of the state and swaps the
//! copy in only when the closure succeeds, so a failing batch leaves no
//! trace. The write lock is held for the whole transaction.

use attest_shared::types::{OrgUnitId, UserId};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::debug;

use super::audit::{AuditEntry, AuditQuery};
use super::error::{ApprovalError, StoreError};
use super::store::{ApprovalFilter, ApprovalStore, ApprovalWriter};
use super::types::{ApprovalKey, ApprovalRecord};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    approvals: BTreeMap<ApprovalKey, ApprovalRecord>,
    audits: Vec<AuditEntry>,
}

/// Thread-safe in-memory `ApprovalStore`.
#[derive(Debug, Default)]
pub struct InMemoryApprovalStore {
    state: RwLock<MemoryState>,
}

impl InMemoryApprovalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("approval store lock poisoned".to_string())
}

impl ApprovalStore for InMemoryApprovalStore {
    fn find_approvals(&self, filter: &ApprovalFilter) -> Result<Vec<ApprovalRecord>, StoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .approvals
            .values()
            .filter(|record| filter.matches(&record.key))
            .cloned()
            .collect())
    }

    fn audit_entries(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        let mut entries: Vec<AuditEntry> = state
            .audits
            .iter()
            .rev()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    fn transaction<T, F>(&self, work: F) -> Result<T, ApprovalError>
    where
        F: FnOnce(&mut dyn ApprovalWriter) -> Result<T, ApprovalError>,
    {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let mut staged = StagedWriter {
            state: state.clone(),
        };

        let result = work(&mut staged)?;
        *state = staged.state;
        debug!("Approval store transaction committed");
        Ok(result)
    }
}

struct StagedWriter {
    state: MemoryState,
}

impl ApprovalWriter for StagedWriter {
    fn insert_approval(&mut self, record: ApprovalRecord) -> Result<(), StoreError> {
        if self.state.approvals.contains_key(&record.key) {
            return Err(StoreError::Conflict(record.key));
        }
        self.state.approvals.insert(record.key, record);
        Ok(())
    }

    fn delete_approval(&mut self, key: &ApprovalKey) -> Result<(), StoreError> {
        self.state
            .approvals
            .remove(key)
            .map(|_| ())
            .ok_or(StoreError::NotFound(*key))
    }

    fn set_accepted(
        &mut self,
        key: &ApprovalKey,
        accepted: bool,
        by: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let record = self
            .state
            .approvals
            .get_mut(key)
            .ok_or(StoreError::NotFound(*key))?;
        record.accepted = accepted;
        record.last_updated_by = by;
        record.last_updated_at = at;
        Ok(())
    }

    fn delete_approvals_for_org_unit(&mut self, unit: OrgUnitId) -> Result<usize, StoreError> {
        let before = self.state.approvals.len();
        self.state.approvals.retain(|key, _| key.org_unit != unit);
        Ok(before - self.state.approvals.len())
    }

    fn append_audit(&mut self, entry: AuditEntry) -> Result<(), StoreError> {
        self.state.audits.push(entry);
        Ok(())
    }

    fn delete_audits_for_org_unit(&mut self, unit: OrgUnitId) -> Result<usize, StoreError> {
        let before = self.state.audits.len();
        self.state.audits.retain(|entry| entry.org_unit != unit);
        Ok(before - self.state.audits.len())
    }
}
