//! Approval workflow orchestration.
//!
//! Every batch is validated in full before anything is written: statuses
//! are looked up in bulk, each item is either skipped, planned or rejected,
//! and only a fully valid batch is persisted and audited in one store
//! transaction.

use attest_shared::types::{
    ApprovalLevelId, AttributeOptionComboId, CategoryComboId, OrgUnitId, UserId, WorkflowId,
};
use attest_shared::ApprovalSettings;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use super::audit::{AuditEntry, AuditQuery};
use super::error::ApprovalError;
use super::level::LevelRegistry;
use super::period::Period;
use super::permissions::{PermissionsEvaluator, RequestContext};
use super::remap::{placement_in, LevelPlacement};
use super::services::Collaborators;
use super::status::StatusQuery;
use super::store::{ApprovalFilter, ApprovalStore};
use super::types::{
    ApprovalAction, ApprovalItem, ApprovalKey, ApprovalLevel, ApprovalRecord, ApprovalState,
    ApprovalStatus, LevelPosition, Workflow,
};
use super::user_level::{UserLevelCache, UserLevelResolver};
use super::workflow::{positions, WorkflowRegistry};

/// Outcome of planning one batch item.
type Plan = Result<Option<ApprovalKey>, String>;

/// Approval workflow entry points.
///
/// Borrows the registries, cache, store and collaborators for the duration
/// of a request.
pub struct ApprovalService<'a, S: ApprovalStore> {
    store: &'a S,
    levels: &'a LevelRegistry,
    workflows: &'a WorkflowRegistry,
    cache: &'a UserLevelCache,
    services: Collaborators<'a>,
}

impl<'a, S: ApprovalStore> ApprovalService<'a, S> {
    /// Creates a service.
    #[must_use]
    pub const fn new(
        store: &'a S,
        levels: &'a LevelRegistry,
        workflows: &'a WorkflowRegistry,
        cache: &'a UserLevelCache,
        services: Collaborators<'a>,
    ) -> Self {
        Self {
            store,
            levels,
            workflows,
            cache,
            services,
        }
    }

    /// Builds the request context of a user.
    #[must_use]
    pub fn context(&self, user: UserId, settings: ApprovalSettings) -> RequestContext {
        RequestContext::load(
            user,
            self.services.hierarchy,
            self.services.security,
            settings,
        )
    }

    // ------------------------------------------------------------------
    // State transitions
    // ------------------------------------------------------------------

    /// Approves a batch, one level per item.
    ///
    /// Returns the number of approvals persisted. Items already approved at
    /// or above the requested level are skipped.
    ///
    /// # Errors
    ///
    /// Returns `MayNotApprove` if any item fails validation, in which case
    /// nothing is written.
    pub fn approve(&self, ctx: &RequestContext, items: &[ApprovalItem]) -> Result<usize, ApprovalError> {
        let action = ApprovalAction::Approve;
        debug!(user = %ctx.user, items = items.len(), "Approve batch started");

        let mut combos_by_workflow: BTreeMap<WorkflowId, BTreeSet<AttributeOptionComboId>> =
            BTreeMap::new();
        for item in items {
            let workflow = self.workflow(item.workflow)?;
            let combos = combos_by_workflow
                .entry(workflow.id)
                .or_insert_with(|| self.workflow_option_combos(workflow).into_iter().collect());
            if !combos.contains(&item.attribute_option_combo) {
                return Err(reject(
                    action,
                    item,
                    format!(
                        "attribute option combo {} is not used by workflow {}",
                        item.attribute_option_combo, workflow.name
                    ),
                ));
            }
            if item.period.period_type != workflow.period_type {
                return Err(reject(
                    action,
                    item,
                    format!(
                        "period {} is not a {} period of workflow {}",
                        item.period, workflow.period_type, workflow.name
                    ),
                ));
            }
        }

        let keys = self.plan(ctx, items, action, |item, status, levels| {
            plan_approve(item, status, levels, self.services.hierarchy.depth(item.org_unit))
        })?;
        if keys.is_empty() {
            info!(user = %ctx.user, "Approve batch had nothing to do");
            return Ok(0);
        }

        let accepted = !ctx.settings.acceptance_required;
        let now = Utc::now();
        let count = self.store.transaction(|writer| {
            for key in &keys {
                writer.insert_approval(ApprovalRecord::new(*key, accepted, ctx.user, now))?;
                writer.append_audit(AuditEntry::new(action, key, ctx.user, now))?;
                debug!(%key, "Approval persisted");
            }
            Ok(keys.len())
        })?;

        info!(user = %ctx.user, count, "Approve batch committed");
        Ok(count)
    }

    /// Removes approvals.
    ///
    /// Items that are not approved up to the requested level are skipped.
    ///
    /// # Errors
    ///
    /// Returns `MayNotUnapprove` if any item fails validation, or
    /// `NotFound` if an approval vanished before the write.
    pub fn unapprove(&self, ctx: &RequestContext, items: &[ApprovalItem]) -> Result<usize, ApprovalError> {
        let action = ApprovalAction::Unapprove;
        debug!(user = %ctx.user, items = items.len(), "Unapprove batch started");

        let keys = self.plan(ctx, items, action, plan_unapprove)?;
        if keys.is_empty() {
            info!(user = %ctx.user, "Unapprove batch had nothing to do");
            return Ok(0);
        }
        self.ensure_present(&keys)?;

        let now = Utc::now();
        let count = self.store.transaction(|writer| {
            for key in &keys {
                writer.delete_approval(key)?;
                writer.append_audit(AuditEntry::new(action, key, ctx.user, now))?;
                debug!(%key, "Approval removed");
            }
            Ok(keys.len())
        })?;

        info!(user = %ctx.user, count, "Unapprove batch committed");
        Ok(count)
    }

    /// Accepts approvals.
    ///
    /// # Errors
    ///
    /// Returns `MayNotAccept` if any item fails validation, or `NotFound`
    /// if an approval vanished before the write.
    pub fn accept(&self, ctx: &RequestContext, items: &[ApprovalItem]) -> Result<usize, ApprovalError> {
        self.set_accepted(ctx, items, ApprovalAction::Accept)
    }

    /// Removes acceptances.
    ///
    /// # Errors
    ///
    /// Returns `MayNotUnaccept` if any item fails validation, or `NotFound`
    /// if an approval vanished before the write.
    pub fn unaccept(&self, ctx: &RequestContext, items: &[ApprovalItem]) -> Result<usize, ApprovalError> {
        self.set_accepted(ctx, items, ApprovalAction::Unaccept)
    }

    fn set_accepted(
        &self,
        ctx: &RequestContext,
        items: &[ApprovalItem],
        action: ApprovalAction,
    ) -> Result<usize, ApprovalError> {
        let accepted = action == ApprovalAction::Accept;
        debug!(user = %ctx.user, items = items.len(), %action, "Acceptance batch started");

        let keys = if accepted {
            self.plan(ctx, items, action, plan_accept)?
        } else {
            self.plan(ctx, items, action, plan_unaccept)?
        };
        if keys.is_empty() {
            info!(user = %ctx.user, %action, "Acceptance batch had nothing to do");
            return Ok(0);
        }
        self.ensure_present(&keys)?;

        let now = Utc::now();
        let count = self.store.transaction(|writer| {
            for key in &keys {
                writer.set_accepted(key, accepted, ctx.user, now)?;
                writer.append_audit(AuditEntry::new(action, key, ctx.user, now))?;
                debug!(%key, accepted, "Acceptance updated");
            }
            Ok(keys.len())
        })?;

        info!(user = %ctx.user, %action, count, "Acceptance batch committed");
        Ok(count)
    }

    /// Plans every item, deduplicating keys, or fails on the first reject.
    fn plan<F>(
        &self,
        ctx: &RequestContext,
        items: &[ApprovalItem],
        action: ApprovalAction,
        planner: F,
    ) -> Result<Vec<ApprovalKey>, ApprovalError>
    where
        F: Fn(&ApprovalItem, &ApprovalStatus, &[LevelPosition]) -> Plan,
    {
        let statuses = self.evaluated_statuses(ctx, items)?;
        let mut workflow_levels: BTreeMap<WorkflowId, Vec<LevelPosition>> = BTreeMap::new();
        for item in items {
            if !workflow_levels.contains_key(&item.workflow) {
                let resolved = positions(self.workflow(item.workflow)?, self.levels);
                workflow_levels.insert(item.workflow, resolved);
            }
        }

        let mut seen = BTreeSet::new();
        let mut keys = Vec::new();
        for (item, status) in items.iter().zip(&statuses) {
            let levels = workflow_levels
                .get(&item.workflow)
                .map_or(&[][..], Vec::as_slice);
            match planner(item, status, levels) {
                Ok(Some(key)) => {
                    if seen.insert(key) {
                        keys.push(key);
                    }
                }
                Ok(None) => debug!(%action, org_unit = %item.org_unit, state = %status.state, "Item skipped"),
                Err(reason) => return Err(reject(action, item, reason)),
            }
        }
        Ok(keys)
    }

    /// Checks in one lookup that every key is still stored.
    fn ensure_present(&self, keys: &[ApprovalKey]) -> Result<(), ApprovalError> {
        let stored: BTreeSet<ApprovalKey> = self
            .store
            .find_approvals(&ApprovalFilter::covering(keys))?
            .into_iter()
            .map(|record| record.key)
            .collect();
        match keys.iter().find(|key| !stored.contains(key)) {
            Some(&missing) => Err(ApprovalError::NotFound(missing)),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Read-only queries
    // ------------------------------------------------------------------

    /// Status and permissions of one item.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowNotFound` or a store error.
    pub fn status(&self, ctx: &RequestContext, item: &ApprovalItem) -> Result<ApprovalStatus, ApprovalError> {
        self.evaluated_statuses(ctx, std::slice::from_ref(item))?
            .pop()
            .ok_or_else(|| ApprovalError::Store("status lookup returned no result".to_string()))
    }

    /// Statuses and permissions of many items, in order.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowNotFound` or a store error.
    pub fn statuses(
        &self,
        ctx: &RequestContext,
        items: &[ApprovalItem],
    ) -> Result<Vec<ApprovalStatus>, ApprovalError> {
        self.evaluated_statuses(ctx, items)
    }

    /// Statuses of every attribute option combo of a unit.
    ///
    /// The combos come from `category_combo` when given, else from every
    /// data set of the workflow.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowNotFound` or a store error.
    pub fn unit_statuses(
        &self,
        ctx: &RequestContext,
        workflow: WorkflowId,
        period: Period,
        org_unit: OrgUnitId,
        category_combo: Option<CategoryComboId>,
    ) -> Result<Vec<ApprovalStatus>, ApprovalError> {
        let combos = match category_combo {
            Some(combo) => self.services.categories.combo_option_combos(combo),
            None => self.workflow_option_combos(self.workflow(workflow)?),
        };
        let items: Vec<ApprovalItem> = combos
            .into_iter()
            .map(|combo| ApprovalItem::new(workflow, period, org_unit, combo))
            .collect();
        self.evaluated_statuses(ctx, &items)
    }

    /// Returns true if the item is approved here or above.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowNotFound` or a store error.
    pub fn is_approved(&self, ctx: &RequestContext, item: &ApprovalItem) -> Result<bool, ApprovalError> {
        Ok(self.status(ctx, item)?.state.is_approved())
    }

    /// Level data must reach before the user may read it, per unit.
    #[must_use]
    pub fn min_read_levels(&self, ctx: &RequestContext) -> BTreeMap<OrgUnitId, u32> {
        self.resolver()
            .min_read_levels(&ctx.user_units, &ctx.data_view_units, ctx.authorities)
    }

    /// Levels the user may work with, highest first.
    #[must_use]
    pub fn user_levels(&self, ctx: &RequestContext) -> Vec<ApprovalLevel> {
        self.resolver()
            .user_levels(ctx.user, &ctx.user_units)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Audit entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the lookup fails.
    pub fn audits(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, ApprovalError> {
        Ok(self.store.audit_entries(query)?)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn workflow(&self, id: WorkflowId) -> Result<&'a Workflow, ApprovalError> {
        self.workflows
            .get(id)
            .ok_or(ApprovalError::WorkflowNotFound(id))
    }

    fn resolver(&self) -> UserLevelResolver<'a> {
        UserLevelResolver::new(self.levels, self.services, self.cache)
    }

    /// Attribute option combos of every data set of the workflow.
    fn workflow_option_combos(&self, workflow: &Workflow) -> Vec<AttributeOptionComboId> {
        if workflow.data_sets.is_empty() {
            return vec![self.services.categories.default_option_combo()];
        }
        let mut combos = Vec::new();
        for data_set in &workflow.data_sets {
            for combo in self.services.categories.combo_option_combos(data_set.category_combo) {
                if !combos.contains(&combo) {
                    combos.push(combo);
                }
            }
        }
        combos
    }

    /// The user's level placed in the workflow's index space.
    fn user_placement(
        &self,
        ctx: &RequestContext,
        workflow: &Workflow,
        data_unit: OrgUnitId,
    ) -> Option<LevelPlacement> {
        let resolver = self.resolver();
        let unit = resolver.governing_unit(&ctx.user_units, data_unit)?;
        let level = resolver.user_level(ctx.user, unit)?;
        let numbers: Vec<u32> = positions(workflow, self.levels)
            .iter()
            .map(|p| p.level)
            .collect();
        Some(placement_in(&numbers, level.level))
    }

    /// Statuses with permissions, grouped into one lookup per
    /// (unit, period, workflow).
    fn evaluated_statuses(
        &self,
        ctx: &RequestContext,
        items: &[ApprovalItem],
    ) -> Result<Vec<ApprovalStatus>, ApprovalError> {
        let evaluator = PermissionsEvaluator::new(ctx);
        let query = StatusQuery::new(
            self.store,
            self.levels,
            self.services.hierarchy,
            self.services.categories,
        )
        .requiring_acceptance(ctx.settings.acceptance_required);

        let mut groups: BTreeMap<(OrgUnitId, Period, WorkflowId), Vec<usize>> = BTreeMap::new();
        for (i, item) in items.iter().enumerate() {
            let workflow = self.workflow(item.workflow)?;
            let period = item.period.rebase(workflow.period_type);
            groups
                .entry((item.org_unit, period, item.workflow))
                .or_default()
                .push(i);
        }

        let mut statuses: Vec<Option<ApprovalStatus>> = vec![None; items.len()];
        for ((org_unit, period, workflow_id), indexes) in groups {
            let workflow = self.workflow(workflow_id)?;
            let mut combos: Vec<AttributeOptionComboId> = Vec::new();
            for &i in &indexes {
                let combo = items[i].attribute_option_combo;
                if !combos.contains(&combo) {
                    combos.push(combo);
                }
            }

            let found = query.statuses(workflow, period, org_unit, &combos)?;
            let placement = self.user_placement(ctx, workflow, org_unit);
            let by_combo: BTreeMap<AttributeOptionComboId, ApprovalStatus> =
                combos.into_iter().zip(found).collect();

            for i in indexes {
                if let Some(status) = by_combo.get(&items[i].attribute_option_combo) {
                    let mut status = status.clone();
                    evaluator.apply(&mut status, placement);
                    statuses[i] = Some(status);
                }
            }
        }

        Ok(statuses.into_iter().flatten().collect())
    }
}

fn reject(action: ApprovalAction, item: &ApprovalItem, reason: String) -> ApprovalError {
    info!(
        %action,
        workflow = %item.workflow,
        period = %item.period,
        org_unit = %item.org_unit,
        aoc = %item.attribute_option_combo,
        %reason,
        "Approval item rejected"
    );
    ApprovalError::may_not(
        action,
        format!("{reason} (org unit {}, period {})", item.org_unit, item.period),
    )
}

fn requested_level(item: &ApprovalItem, levels: &[LevelPosition]) -> Result<Option<LevelPosition>, String> {
    item.level.map_or(Ok(None), |id: ApprovalLevelId| {
        levels
            .iter()
            .find(|p| p.id == id)
            .copied()
            .map(Some)
            .ok_or_else(|| format!("approval level {id} is not part of the workflow"))
    })
}

fn approved_level(status: &ApprovalStatus) -> Result<LevelPosition, String> {
    status
        .approved_level
        .ok_or_else(|| "approved status has no approval level".to_string())
}

fn plan_approve(
    item: &ApprovalItem,
    status: &ApprovalStatus,
    levels: &[LevelPosition],
    unit_depth: Option<u32>,
) -> Plan {
    let requested = requested_level(item, levels)?;

    let target = match status.state {
        ApprovalState::Unapprovable => {
            return Err("data is not approvable for this organisation unit".to_string());
        }
        ApprovalState::UnapprovedWaiting => {
            return Err("data of lower organisation units is not yet approved".to_string());
        }
        ApprovalState::Unapproved => {
            let action = status
                .action_level
                .ok_or_else(|| "unapproved status has no action level".to_string())?;
            match requested {
                Some(r) if r.id != action.id => {
                    return Err(format!("data must first be approved at level {}", action.level));
                }
                _ => action,
            }
        }
        ApprovalState::ApprovedAbove => {
            let approved = approved_level(status)?;
            return match requested {
                Some(r) if r.level < approved.level => {
                    Err(format!("data is already approved above at level {}", approved.level))
                }
                _ => Ok(None),
            };
        }
        ApprovalState::ApprovedHere | ApprovalState::AcceptedHere => {
            let approved = approved_level(status)?;
            match requested {
                Some(r) if r.level >= approved.level => return Ok(None),
                Some(r) => {
                    if status.next_level.map(|p| p.id) != Some(r.id) {
                        return Err(format!(
                            "approval may not skip from level {} to level {}",
                            approved.level, r.level
                        ));
                    }
                    r
                }
                None => match status.next_level {
                    Some(next) => next,
                    None => return Ok(None),
                },
            }
        }
    };

    if !status.permissions.may_approve {
        return Err(format!("user may not approve at level {}", target.level));
    }
    if unit_depth != Some(target.depth) {
        return Err(format!(
            "level {} approves organisation units at depth {}",
            target.level, target.depth
        ));
    }

    Ok(Some(ApprovalKey {
        level: target.id,
        workflow: status.workflow,
        period: status.period,
        org_unit: status.org_unit,
        attribute_option_combo: status.attribute_option_combo,
    }))
}

fn plan_unapprove(item: &ApprovalItem, status: &ApprovalStatus, levels: &[LevelPosition]) -> Plan {
    if !status.state.is_approved() {
        return Ok(None);
    }
    let requested = requested_level(item, levels)?;
    let approved = approved_level(status)?;

    if requested.is_some_and(|r| r.level < approved.level) {
        return Ok(None);
    }
    if !status.permissions.may_unapprove {
        return Err(if status.state == ApprovalState::ApprovedAbove {
            format!("data is approved above at level {}", approved.level)
        } else {
            format!("user may not unapprove at level {}", approved.level)
        });
    }
    if let Some(r) = requested.filter(|r| r.id != approved.id) {
        return Err(format!(
            "data is approved at level {}, not level {}",
            approved.level, r.level
        ));
    }
    Ok(status.approval_key())
}

fn plan_accept(item: &ApprovalItem, status: &ApprovalStatus, levels: &[LevelPosition]) -> Plan {
    if !status.state.is_approved() {
        return Err("data is not approved".to_string());
    }
    let approved = approved_level(status)?;
    let requested = requested_level(item, levels)?.unwrap_or(approved);

    let already = status.state == ApprovalState::AcceptedHere && requested.id == approved.id;
    if already || requested.level > approved.level {
        return Ok(None);
    }
    if !status.permissions.may_accept {
        return Err(format!("user may not accept at level {}", approved.level));
    }
    if requested.id != approved.id {
        return Err(format!("data is not approved up to level {}", requested.level));
    }
    Ok(status.approval_key())
}

fn plan_unaccept(item: &ApprovalItem, status: &ApprovalStatus, levels: &[LevelPosition]) -> Plan {
    if !status.state.is_approved() {
        return Ok(None);
    }
    let approved = approved_level(status)?;
    let requested = requested_level(item, levels)?.unwrap_or(approved);

    let already = status.state == ApprovalState::ApprovedHere && requested.id == approved.id;
    if already || requested.level < approved.level {
        return Ok(None);
    }
    if !status.permissions.may_unaccept {
        return Err(format!("user may not unaccept at level {}", approved.level));
    }
    if requested.id != approved.id {
        return Err(format!("data is approved at level {}, not level {}", approved.level, requested.level));
    }
    Ok(status.approval_key())
}
