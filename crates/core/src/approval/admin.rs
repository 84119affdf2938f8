//! Administrative edits of the approval structure.
//!
//! Every structural edit recomputes workflow remaps and invalidates the
//! user-level cache. Deletes run the deletion guard first.

use attest_shared::types::{ApprovalLevelId, OrgUnitId, WorkflowId};
use tracing::info;

use super::deletion::{DeletionGuard, DeletionTarget};
use super::error::ApprovalError;
use super::level::LevelRegistry;
use super::store::ApprovalStore;
use super::types::{ApprovalLevel, DataSetRef, Workflow};
use super::user_level::UserLevelCache;
use super::workflow::WorkflowRegistry;

/// Approvals and audit entries removed with an organisational unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrgUnitCascade {
    /// Approvals removed.
    pub approvals: usize,
    /// Audit entries removed.
    pub audits: usize,
}

/// Mutable access to the approval structure.
pub struct ApprovalAdmin<'a, S: ApprovalStore> {
    levels: &'a mut LevelRegistry,
    workflows: &'a mut WorkflowRegistry,
    cache: &'a UserLevelCache,
    store: &'a S,
    guard: DeletionGuard,
}

impl<'a, S: ApprovalStore> ApprovalAdmin<'a, S> {
    /// Creates an admin with the default deletion guard.
    #[must_use]
    pub fn new(
        levels: &'a mut LevelRegistry,
        workflows: &'a mut WorkflowRegistry,
        cache: &'a UserLevelCache,
        store: &'a S,
    ) -> Self {
        Self {
            levels,
            workflows,
            cache,
            store,
            guard: DeletionGuard::default(),
        }
    }

    /// Replaces the deletion guard.
    #[must_use]
    pub fn with_guard(mut self, guard: DeletionGuard) -> Self {
        self.guard = guard;
        self
    }

    fn structure_changed(&mut self) {
        self.workflows.refresh_all(&*self.levels);
        self.cache.invalidate_all();
    }

    /// Adds a level at its ordered position.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateLevel` for an existing depth and group set.
    pub fn add_level(&mut self, level: ApprovalLevel) -> Result<u32, ApprovalError> {
        let number = self.levels.add_level(level)?;
        self.structure_changed();
        info!(level = number, "Approval level added");
        Ok(number)
    }

    /// Inserts a level at an explicit number.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLevelPosition` or `DuplicateLevel`.
    pub fn insert_level_at(&mut self, level: ApprovalLevel, number: u32) -> Result<u32, ApprovalError> {
        let number = self.levels.insert_level_at(level, number)?;
        self.structure_changed();
        info!(level = number, "Approval level inserted");
        Ok(number)
    }

    /// Moves a level one place up.
    ///
    /// # Errors
    ///
    /// Returns `CannotMoveLevel` if the move is not permitted.
    pub fn move_level_up(&mut self, number: u32) -> Result<(), ApprovalError> {
        self.levels.move_up(number)?;
        self.structure_changed();
        info!(level = number, "Approval level moved up");
        Ok(())
    }

    /// Moves a level one place down.
    ///
    /// # Errors
    ///
    /// Returns `CannotMoveLevel` if the move is not permitted.
    pub fn move_level_down(&mut self, number: u32) -> Result<(), ApprovalError> {
        self.levels.move_down(number)?;
        self.structure_changed();
        info!(level = number, "Approval level moved down");
        Ok(())
    }

    /// Deletes a level unless a pre-delete check vetoes it.
    ///
    /// # Errors
    ///
    /// Returns `DeletionVetoed`, `LevelNotFound`, or a store error.
    pub fn delete_level(&mut self, id: ApprovalLevelId) -> Result<ApprovalLevel, ApprovalError> {
        self.guard
            .ensure_allowed(DeletionTarget::Level(id), &*self.workflows, self.store)?;
        let removed = self.levels.delete_level(id)?;
        self.structure_changed();
        info!(name = %removed.name, "Approval level deleted");
        Ok(removed)
    }

    /// Registers a workflow.
    ///
    /// # Errors
    ///
    /// Returns `LevelNotFound` if a member level is not registered.
    pub fn add_workflow(&mut self, workflow: Workflow) -> Result<WorkflowId, ApprovalError> {
        let id = self.workflows.add(workflow, &*self.levels)?;
        self.cache.invalidate_all();
        info!(workflow = %id, "Workflow added");
        Ok(id)
    }

    /// Replaces a workflow's member levels.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowNotFound` or `LevelNotFound`.
    pub fn set_workflow_levels(
        &mut self,
        id: WorkflowId,
        levels: Vec<ApprovalLevelId>,
    ) -> Result<(), ApprovalError> {
        self.workflows.set_levels(id, levels, &*self.levels)?;
        self.structure_changed();
        info!(workflow = %id, "Workflow levels updated");
        Ok(())
    }

    /// Replaces a workflow's data sets.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowNotFound`.
    pub fn set_workflow_data_sets(
        &mut self,
        id: WorkflowId,
        data_sets: Vec<DataSetRef>,
    ) -> Result<(), ApprovalError> {
        self.workflows.set_data_sets(id, data_sets)?;
        info!(workflow = %id, "Workflow data sets updated");
        Ok(())
    }

    /// Deletes a workflow unless a pre-delete check vetoes it.
    ///
    /// # Errors
    ///
    /// Returns `DeletionVetoed`, `WorkflowNotFound`, or a store error.
    pub fn delete_workflow(&mut self, id: WorkflowId) -> Result<Workflow, ApprovalError> {
        self.guard
            .ensure_allowed(DeletionTarget::Workflow(id), &*self.workflows, self.store)?;
        let removed = self.workflows.remove(id)?;
        self.cache.invalidate_all();
        info!(workflow = %id, name = %removed.name, "Workflow deleted");
        Ok(removed)
    }

    /// Removes every approval and audit entry of a deleted unit.
    ///
    /// # Errors
    ///
    /// Returns a store error; nothing is removed in that case.
    pub fn delete_org_unit(&mut self, unit: OrgUnitId) -> Result<OrgUnitCascade, ApprovalError> {
        let cascade = self.store.transaction(|writer| {
            Ok(OrgUnitCascade {
                approvals: writer.delete_approvals_for_org_unit(unit)?,
                audits: writer.delete_audits_for_org_unit(unit)?,
            })
        })?;
        self.cache.invalidate_all();
        info!(
            org_unit = %unit,
            approvals = cascade.approvals,
            audits = cascade.audits,
            "Organisation unit approvals removed"
        );
        Ok(cascade)
    }
}
