//! Permission evaluation for approval statuses.
//!
//! Permissions depend on where the user sits relative to the data in the
//! workflow's level index space (1 = top), on the user's authorities and on
//! the system approval settings.
//!
//! # Positioning
//!
//! With `u` the user's index and `d` the data's index:
//!
//! - a user with `approve` acts at exactly their own index;
//! - a user with `approve_lower_levels` acts at any index below their own;
//! - a user with `accept_lower_levels` accepts data one index below, or
//!   anywhere below when they may also approve at lower levels.
//!
//! A user whose level is not in the workflow sits in the gap above the
//! next lower workflow level. They hold no index of their own, so only
//! `approve_lower_levels` lets them act.

use attest_shared::ApprovalSettings;
use attest_shared::types::{OrgUnitId, UserId};

use super::remap::LevelPlacement;
use super::services::{OrgUnitHierarchy, SecurityService};
use super::types::{ApprovalState, ApprovalStatus, Authorities, Permissions};

/// Immutable snapshot of the requesting user, built once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Requesting user.
    pub user: UserId,
    /// The user's authorities.
    pub authorities: Authorities,
    /// System approval settings.
    pub settings: ApprovalSettings,
    /// Units the user is assigned to.
    pub user_units: Vec<OrgUnitId>,
    /// Units the user may view data for.
    pub data_view_units: Vec<OrgUnitId>,
}

impl RequestContext {
    /// Captures the user's authorities and units from the collaborators.
    #[must_use]
    pub fn load(
        user: UserId,
        hierarchy: &dyn OrgUnitHierarchy,
        security: &dyn SecurityService,
        settings: ApprovalSettings,
    ) -> Self {
        Self {
            user,
            authorities: security.authorities(user),
            settings,
            user_units: hierarchy.user_org_units(user),
            data_view_units: hierarchy.user_data_view_units(user),
        }
    }
}

/// Evaluates permissions for many statuses of one request.
pub struct PermissionsEvaluator<'a> {
    context: &'a RequestContext,
}

impl<'a> PermissionsEvaluator<'a> {
    /// Creates an evaluator bound to a request.
    #[must_use]
    pub const fn new(context: &'a RequestContext) -> Self {
        Self { context }
    }

    /// Permissions of the request's user on `status`.
    ///
    /// `user` is the user's level placed in the workflow's index space, or
    /// `None` when the user has no level for the data's unit.
    #[must_use]
    pub fn evaluate(&self, status: &ApprovalStatus, user: Option<LevelPlacement>) -> Permissions {
        evaluate(
            status.state,
            status.data_index(),
            user,
            self.context.authorities,
            self.context.settings,
        )
    }

    /// Collapses acceptance when it is not required and attaches permissions.
    pub fn apply(&self, status: &mut ApprovalStatus, user: Option<LevelPlacement>) {
        if !self.context.settings.acceptance_required && status.state == ApprovalState::AcceptedHere {
            status.state = ApprovalState::ApprovedHere;
        }
        status.permissions = self.evaluate(status, user);
    }
}

/// Pure permission evaluation.
#[must_use]
pub fn evaluate(
    state: ApprovalState,
    data_index: Option<u32>,
    user: Option<LevelPlacement>,
    authorities: Authorities,
    settings: ApprovalSettings,
) -> Permissions {
    let (Some(d), Some(user)) = (data_index, user) else {
        return Permissions::read_only();
    };
    if state == ApprovalState::Unapprovable {
        return Permissions::read_only();
    }

    let acceptance = settings.acceptance_required;
    let state = if !acceptance && state == ApprovalState::AcceptedHere {
        ApprovalState::ApprovedHere
    } else {
        state
    };

    // Half-step ranks: index n is 2n, the gap above it 2n - 1.
    let u = user.rank();
    let d = u64::from(d) * 2;
    let positioned = |target: u64| {
        (authorities.approve && u == target) || (authorities.approve_lower_levels && u < target)
    };
    let accept_positioned = authorities.accept_lower_levels
        && u < d
        && (d - u <= 2 || authorities.approve_lower_levels);

    let here = state.is_here();
    let accepted = state == ApprovalState::AcceptedHere;

    let approve_index = if here && d > 2 { d - 2 } else { d };
    let may_approve = state != ApprovalState::ApprovedAbove
        && positioned(approve_index)
        && (state == ApprovalState::Unapproved
            || (here && d > 2 && (accepted || !acceptance)));

    let may_accept = acceptance && state == ApprovalState::ApprovedHere && accept_positioned;
    let may_unaccept = acceptance && accepted && accept_positioned;
    let may_unapprove = here && ((positioned(d) && !accepted) || may_unaccept);

    let may_read = may_approve
        || may_unapprove
        || may_accept
        || may_unaccept
        || u <= d
        || authorities.view_unapproved_data
        || !settings.hide_unapproved;

    Permissions {
        may_approve,
        may_unapprove,
        may_accept,
        may_unaccept,
        may_read,
    }
}
