//! Approval status derivation.
//!
//! The status of (workflow, period, unit, combo) is decided by the approval
//! with the highest authority on the unit's ancestor chain, unit included.
//! One store lookup serves every combo of a (unit, period, workflow) group.
//!
//! Levels restricted to an option group set only apply to combos with an
//! option in one of the set's groups. Unapproved data is ready once every
//! unit at the next lower workflow depth is approved there; until then it
//! is waiting.

use attest_shared::types::{AttributeOptionComboId, OptionGroupId, OptionGroupSetId, OrgUnitId};
use std::collections::{BTreeMap, BTreeSet};

use super::error::ApprovalError;
use super::level::LevelRegistry;
use super::period::Period;
use super::services::{CategoryService, OrgUnitHierarchy};
use super::store::{ApprovalFilter, ApprovalStore};
use super::types::{
    ApprovalRecord, ApprovalState, ApprovalStatus, LevelPosition, Permissions, Workflow,
};
use super::workflow::positions;

/// Derives statuses from stored approvals.
pub struct StatusQuery<'a, S: ApprovalStore> {
    store: &'a S,
    levels: &'a LevelRegistry,
    hierarchy: &'a dyn OrgUnitHierarchy,
    categories: &'a dyn CategoryService,
    acceptance_required: bool,
}

impl<'a, S: ApprovalStore> StatusQuery<'a, S> {
    /// Creates a status query.
    #[must_use]
    pub const fn new(
        store: &'a S,
        levels: &'a LevelRegistry,
        hierarchy: &'a dyn OrgUnitHierarchy,
        categories: &'a dyn CategoryService,
    ) -> Self {
        Self {
            store,
            levels,
            hierarchy,
            categories,
            acceptance_required: false,
        }
    }

    /// Requires lower approvals to be accepted before data above is ready.
    #[must_use]
    pub fn requiring_acceptance(mut self, required: bool) -> Self {
        self.acceptance_required = required;
        self
    }

    /// Statuses of `combos` for one unit, in the order given.
    ///
    /// `period` must already be a period of the workflow's type. The
    /// returned statuses carry no permissions.
    ///
    /// # Errors
    ///
    /// Returns a store error if the lookup fails.
    pub fn statuses(
        &self,
        workflow: &Workflow,
        period: Period,
        org_unit: OrgUnitId,
        combos: &[AttributeOptionComboId],
    ) -> Result<Vec<ApprovalStatus>, ApprovalError> {
        let workflow_levels = positions(workflow, self.levels);
        let blank = |combo| blank_status(workflow, period, org_unit, combo);

        let Some(depth) = self.hierarchy.depth(org_unit) else {
            return Ok(combos.iter().map(|&c| blank(c)).collect());
        };
        if !workflow_levels.iter().any(|p| p.depth == depth) {
            return Ok(combos.iter().map(|&c| blank(c)).collect());
        }
        let applicable = self.applicable_levels(&workflow_levels, combos);

        let mut chain = vec![org_unit];
        chain.extend(self.hierarchy.ancestors(org_unit));

        let filter = ApprovalFilter {
            levels: workflow_levels.iter().map(|p| p.id).collect(),
            workflows: vec![workflow.id],
            periods: vec![period],
            org_units: chain,
            attribute_option_combos: combos.to_vec(),
        };
        let records = self.store.find_approvals(&filter)?;

        let by_id: BTreeMap<_, LevelPosition> = workflow_levels.iter().map(|p| (p.id, *p)).collect();
        let mut deciding: BTreeMap<AttributeOptionComboId, (LevelPosition, &ApprovalRecord)> =
            BTreeMap::new();
        for record in &records {
            let Some(&position) = by_id.get(&record.key.level) else {
                continue;
            };
            deciding
                .entry(record.key.attribute_option_combo)
                .and_modify(|current| {
                    if position.level < current.0.level {
                        *current = (position, record);
                    }
                })
                .or_insert((position, record));
        }

        let unapproved: Vec<AttributeOptionComboId> = combos
            .iter()
            .copied()
            .filter(|combo| !deciding.contains_key(combo))
            .collect();
        let waiting = self.waiting_combos(workflow, period, org_unit, depth, &unapproved, &applicable)?;

        let statuses = combos
            .iter()
            .map(|&combo| {
                let mut status = blank(combo);
                let at_depth: Vec<LevelPosition> = applicable
                    .get(&combo)
                    .map(|levels| levels.iter().filter(|p| p.depth == depth).copied().collect())
                    .unwrap_or_default();
                match deciding.get(&combo) {
                    None => {
                        let Some(action_level) = at_depth.iter().max_by_key(|p| p.level).copied() else {
                            return status;
                        };
                        status.state = if waiting.contains(&combo) {
                            ApprovalState::UnapprovedWaiting
                        } else {
                            ApprovalState::Unapproved
                        };
                        status.action_level = Some(action_level);
                        status.next_level = Some(action_level);
                    }
                    Some(&(level, record)) => {
                        let here = record.key.org_unit == org_unit;
                        status.state = match (here, record.accepted) {
                            (false, _) => ApprovalState::ApprovedAbove,
                            (true, false) => ApprovalState::ApprovedHere,
                            (true, true) => ApprovalState::AcceptedHere,
                        };
                        status.approved_level = Some(level);
                        status.approved_org_unit = Some(record.key.org_unit);
                        status.accepted = record.accepted;
                        status.approved_by = Some(record.created_by);
                        status.approved_at = Some(record.created_at);
                        if record.accepted {
                            status.accepted_by = Some(record.last_updated_by);
                            status.accepted_at = Some(record.last_updated_at);
                        }
                        if here {
                            status.action_level = Some(level);
                            status.next_level = at_depth
                                .iter()
                                .filter(|p| p.level < level.level)
                                .max_by_key(|p| p.level)
                                .copied();
                        }
                    }
                }
                status
            })
            .collect();

        Ok(statuses)
    }

    /// Workflow levels that apply to each combo.
    ///
    /// An unrestricted level applies to every combo. A level restricted to
    /// a group set applies when one of the combo's groups is in the set.
    fn applicable_levels(
        &self,
        workflow_levels: &[LevelPosition],
        combos: &[AttributeOptionComboId],
    ) -> BTreeMap<AttributeOptionComboId, Vec<LevelPosition>> {
        let mut set_groups: BTreeMap<OptionGroupSetId, BTreeSet<OptionGroupId>> = BTreeMap::new();
        for set in workflow_levels.iter().filter_map(|p| p.group_set) {
            set_groups
                .entry(set)
                .or_insert_with(|| self.categories.groups_in_set(set).into_iter().collect());
        }

        combos
            .iter()
            .map(|&combo| {
                let groups = if set_groups.is_empty() {
                    Vec::new()
                } else {
                    self.categories.option_combo_groups(combo)
                };
                let levels = workflow_levels
                    .iter()
                    .filter(|p| {
                        p.group_set.is_none_or(|set| {
                            set_groups
                                .get(&set)
                                .is_some_and(|members| groups.iter().any(|g| members.contains(g)))
                        })
                    })
                    .copied()
                    .collect();
                (combo, levels)
            })
            .collect()
    }

    /// Unapproved combos whose units at the next lower depth are not all
    /// approved at that depth's highest applicable level.
    ///
    /// A unit with no such descendants is ready.
    fn waiting_combos(
        &self,
        workflow: &Workflow,
        period: Period,
        org_unit: OrgUnitId,
        depth: u32,
        unapproved: &[AttributeOptionComboId],
        applicable: &BTreeMap<AttributeOptionComboId, Vec<LevelPosition>>,
    ) -> Result<BTreeSet<AttributeOptionComboId>, ApprovalError> {
        let mut below: BTreeMap<AttributeOptionComboId, LevelPosition> = BTreeMap::new();
        for &combo in unapproved {
            let level = applicable
                .get(&combo)
                .and_then(|levels| levels.iter().filter(|p| p.depth > depth).min_by_key(|p| p.level));
            if let Some(&level) = level {
                below.insert(combo, level);
            }
        }

        let mut units_at: BTreeMap<u32, Vec<OrgUnitId>> = BTreeMap::new();
        for level in below.values() {
            units_at
                .entry(level.depth)
                .or_insert_with(|| self.hierarchy.descendants_at_depth(org_unit, level.depth));
        }
        below.retain(|_, level| units_at.get(&level.depth).is_some_and(|units| !units.is_empty()));
        if below.is_empty() {
            return Ok(BTreeSet::new());
        }

        let mut filter = ApprovalFilter {
            workflows: vec![workflow.id],
            periods: vec![period],
            attribute_option_combos: below.keys().copied().collect(),
            ..ApprovalFilter::default()
        };
        for level in below.values() {
            if !filter.levels.contains(&level.id) {
                filter.levels.push(level.id);
            }
        }
        for units in units_at.values() {
            filter.org_units.extend(units.iter().copied());
        }
        let done: BTreeSet<_> = self
            .store
            .find_approvals(&filter)?
            .into_iter()
            .filter(|record| record.accepted || !self.acceptance_required)
            .map(|record| (record.key.level, record.key.org_unit, record.key.attribute_option_combo))
            .collect();

        Ok(below
            .into_iter()
            .filter(|(combo, level)| {
                units_at.get(&level.depth).is_some_and(|units| {
                    units
                        .iter()
                        .any(|&unit| !done.contains(&(level.id, unit, *combo)))
                })
            })
            .map(|(combo, _)| combo)
            .collect())
    }
}

fn blank_status(
    workflow: &Workflow,
    period: Period,
    org_unit: OrgUnitId,
    combo: AttributeOptionComboId,
) -> ApprovalStatus {
    ApprovalStatus {
        workflow: workflow.id,
        period,
        org_unit,
        attribute_option_combo: combo,
        state: ApprovalState::Unapprovable,
        approved_level: None,
        approved_org_unit: None,
        action_level: None,
        next_level: None,
        accepted: false,
        approved_by: None,
        approved_at: None,
        accepted_by: None,
        accepted_at: None,
        permissions: Permissions::default(),
    }
}
