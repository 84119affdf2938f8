//! Collaborator interfaces consumed by the approval engine.
//!
//! The organisational hierarchy, category model and security checks live
//! outside this crate. Callers implement these traits over their own
//! backends.

use attest_shared::types::{
    AttributeOptionComboId, CategoryComboId, OptionGroupId, OptionGroupSetId, OrgUnitId, UserId,
};

use super::types::{ApprovalLevel, Authorities};

/// Organisational unit hierarchy.
pub trait OrgUnitHierarchy {
    /// Depth of a unit, 1 for a root. `None` for an unknown unit.
    fn depth(&self, unit: OrgUnitId) -> Option<u32>;

    /// Ancestors of a unit, nearest first, excluding the unit.
    fn ancestors(&self, unit: OrgUnitId) -> Vec<OrgUnitId>;

    /// Direct children of a unit.
    fn children(&self, unit: OrgUnitId) -> Vec<OrgUnitId>;

    /// Units below `unit` at exactly `depth`.
    fn descendants_at_depth(&self, unit: OrgUnitId, depth: u32) -> Vec<OrgUnitId> {
        let Some(start) = self.depth(unit).filter(|&start| start < depth) else {
            return Vec::new();
        };
        let mut frontier = vec![unit];
        for _ in start..depth {
            frontier = frontier.into_iter().flat_map(|u| self.children(u)).collect();
        }
        frontier
    }

    /// Returns true if `unit` is `ancestor` or lies below it.
    fn is_descendant_or_self(&self, unit: OrgUnitId, ancestor: OrgUnitId) -> bool {
        unit == ancestor || self.ancestors(unit).contains(&ancestor)
    }

    /// Units a user is assigned to for data capture and approval.
    fn user_org_units(&self, user: UserId) -> Vec<OrgUnitId>;

    /// Units a user may view data for.
    fn user_data_view_units(&self, user: UserId) -> Vec<OrgUnitId>;
}

/// Category model.
pub trait CategoryService {
    /// Attribute option combos of a category combo.
    fn combo_option_combos(&self, combo: CategoryComboId) -> Vec<AttributeOptionComboId>;

    /// Option groups in a group set.
    fn groups_in_set(&self, set: OptionGroupSetId) -> Vec<OptionGroupId>;

    /// Option groups containing any option of an attribute option combo.
    fn option_combo_groups(&self, combo: AttributeOptionComboId) -> Vec<OptionGroupId>;

    /// The default attribute option combo.
    fn default_option_combo(&self) -> AttributeOptionComboId;
}

/// Security checks.
pub trait SecurityService {
    /// Returns true if the user may read a level.
    fn can_read_level(&self, user: UserId, level: &ApprovalLevel) -> bool;

    /// Returns true if the user may read an option group.
    fn can_read_option_group(&self, user: UserId, group: OptionGroupId) -> bool;

    /// Returns true if the user is restricted on any category dimension.
    fn has_dimension_constraints(&self, user: UserId) -> bool;

    /// Approval authorities of the user.
    fn authorities(&self, user: UserId) -> Authorities;
}

/// Borrowed collaborators, bundled for constructors.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Organisational hierarchy.
    pub hierarchy: &'a dyn OrgUnitHierarchy,
    /// Category model.
    pub categories: &'a dyn CategoryService,
    /// Security checks.
    pub security: &'a dyn SecurityService,
}
