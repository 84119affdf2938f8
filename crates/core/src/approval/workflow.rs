//! Workflow registry.
//!
//! Keeps each workflow's member levels in global level order and their
//! remapped numbers current with the level registry.

use attest_shared::types::{ApprovalLevelId, WorkflowId};
use std::collections::BTreeMap;
use tracing::debug;

use super::error::ApprovalError;
use super::level::LevelRegistry;
use super::remap::remap_level_numbers;
use super::types::{DataSetRef, LevelPosition, Workflow};

/// Registry of approval workflows.
#[derive(Debug, Clone, Default)]
pub struct WorkflowRegistry {
    workflows: BTreeMap<WorkflowId, Workflow>,
}

impl WorkflowRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a workflow, replacing any workflow with the same id.
    ///
    /// # Errors
    ///
    /// Returns `LevelNotFound` if a member level is not registered.
    pub fn add(
        &mut self,
        mut workflow: Workflow,
        levels: &LevelRegistry,
    ) -> Result<WorkflowId, ApprovalError> {
        ensure_levels_exist(&workflow.levels, levels)?;
        refresh_workflow(&mut workflow, levels);

        let id = workflow.id;
        debug!(workflow = %id, name = %workflow.name, levels = workflow.levels.len(), "Workflow registered");
        self.workflows.insert(id, workflow);
        Ok(id)
    }

    /// Replaces a workflow's member levels.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowNotFound` or `LevelNotFound`.
    pub fn set_levels(
        &mut self,
        id: WorkflowId,
        member_levels: Vec<ApprovalLevelId>,
        levels: &LevelRegistry,
    ) -> Result<(), ApprovalError> {
        ensure_levels_exist(&member_levels, levels)?;
        let workflow = self
            .workflows
            .get_mut(&id)
            .ok_or(ApprovalError::WorkflowNotFound(id))?;
        workflow.levels = member_levels;
        refresh_workflow(workflow, levels);
        Ok(())
    }

    /// Replaces a workflow's data sets.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowNotFound` if no workflow has the id.
    pub fn set_data_sets(
        &mut self,
        id: WorkflowId,
        data_sets: Vec<DataSetRef>,
    ) -> Result<(), ApprovalError> {
        let workflow = self
            .workflows
            .get_mut(&id)
            .ok_or(ApprovalError::WorkflowNotFound(id))?;
        workflow.data_sets = data_sets;
        Ok(())
    }

    /// Removes a workflow.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowNotFound` if no workflow has the id.
    pub fn remove(&mut self, id: WorkflowId) -> Result<Workflow, ApprovalError> {
        self.workflows
            .remove(&id)
            .ok_or(ApprovalError::WorkflowNotFound(id))
    }

    /// Looks up a workflow.
    #[must_use]
    pub fn get(&self, id: WorkflowId) -> Option<&Workflow> {
        self.workflows.get(&id)
    }

    /// Iterates over all workflows.
    pub fn iter(&self) -> impl Iterator<Item = &Workflow> {
        self.workflows.values()
    }

    /// Workflows that include a level.
    #[must_use]
    pub fn using_level(&self, level: ApprovalLevelId) -> Vec<&Workflow> {
        self.workflows
            .values()
            .filter(|w| w.contains_level(level))
            .collect()
    }

    /// Recomputes ordering and remaps after the level registry changed.
    pub fn refresh_all(&mut self, levels: &LevelRegistry) {
        for workflow in self.workflows.values_mut() {
            refresh_workflow(workflow, levels);
        }
    }
}

fn ensure_levels_exist(
    member_levels: &[ApprovalLevelId],
    levels: &LevelRegistry,
) -> Result<(), ApprovalError> {
    match member_levels.iter().find(|&&id| levels.get(id).is_none()) {
        Some(&missing) => Err(ApprovalError::LevelNotFound(missing)),
        None => Ok(()),
    }
}

fn refresh_workflow(workflow: &mut Workflow, levels: &LevelRegistry) {
    let mut members: Vec<(ApprovalLevelId, u32)> = workflow
        .levels
        .iter()
        .filter_map(|&id| levels.get(id).map(|l| (id, l.level)))
        .collect();
    members.sort_by_key(|&(_, number)| number);
    members.dedup_by_key(|&mut (id, _)| id);

    let numbers: Vec<u32> = members.iter().map(|&(_, n)| n).collect();
    workflow.remap = members
        .iter()
        .map(|&(id, _)| id)
        .zip(remap_level_numbers(&numbers))
        .collect();
    workflow.levels = members.into_iter().map(|(id, _)| id).collect();
}

/// Resolves a workflow's levels against the registry, highest first.
#[must_use]
pub fn positions(workflow: &Workflow, levels: &LevelRegistry) -> Vec<LevelPosition> {
    workflow
        .levels
        .iter()
        .filter_map(|&id| {
            let level = levels.get(id)?;
            Some(LevelPosition {
                id,
                level: level.level,
                index: workflow.remapped_level(id)?,
                depth: level.org_unit_depth,
                group_set: level.group_set,
            })
        })
        .collect()
}
