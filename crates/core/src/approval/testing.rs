//! In-memory collaborators for tests.

use attest_shared::types::{
    ApprovalLevelId, AttributeOptionComboId, CategoryComboId, OptionGroupId, OptionGroupSetId,
    OrgUnitId, UserId,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use super::services::{CategoryService, OrgUnitHierarchy, SecurityService};
use super::types::{ApprovalLevel, Authorities};

/// Tree of organisational units with user assignments.
#[derive(Default)]
pub struct TestHierarchy {
    parents: BTreeMap<OrgUnitId, Option<OrgUnitId>>,
    children: BTreeMap<OrgUnitId, Vec<OrgUnitId>>,
    assigned: BTreeMap<UserId, Vec<OrgUnitId>>,
    data_view: BTreeMap<UserId, Vec<OrgUnitId>>,
}

impl TestHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self) -> OrgUnitId {
        self.insert(None)
    }

    pub fn add_child(&mut self, parent: OrgUnitId) -> OrgUnitId {
        self.insert(Some(parent))
    }

    fn insert(&mut self, parent: Option<OrgUnitId>) -> OrgUnitId {
        let id = OrgUnitId::new();
        self.parents.insert(id, parent);
        if let Some(parent) = parent {
            self.children.entry(parent).or_default().push(id);
        }
        id
    }

    pub fn assign(&mut self, user: UserId, unit: OrgUnitId) {
        self.assigned.entry(user).or_default().push(unit);
    }

    pub fn assign_data_view(&mut self, user: UserId, unit: OrgUnitId) {
        self.data_view.entry(user).or_default().push(unit);
    }
}

impl OrgUnitHierarchy for TestHierarchy {
    fn depth(&self, unit: OrgUnitId) -> Option<u32> {
        self.parents.get(&unit)?;
        Some(u32::try_from(self.ancestors(unit).len()).unwrap() + 1)
    }

    fn ancestors(&self, unit: OrgUnitId) -> Vec<OrgUnitId> {
        let mut chain = Vec::new();
        let mut current = self.parents.get(&unit).copied().flatten();
        while let Some(parent) = current {
            chain.push(parent);
            current = self.parents.get(&parent).copied().flatten();
        }
        chain
    }

    fn children(&self, unit: OrgUnitId) -> Vec<OrgUnitId> {
        self.children.get(&unit).cloned().unwrap_or_default()
    }

    fn user_org_units(&self, user: UserId) -> Vec<OrgUnitId> {
        self.assigned.get(&user).cloned().unwrap_or_default()
    }

    fn user_data_view_units(&self, user: UserId) -> Vec<OrgUnitId> {
        self.data_view.get(&user).cloned().unwrap_or_default()
    }
}

/// Category combos and option group sets.
pub struct TestCategories {
    combos: BTreeMap<CategoryComboId, Vec<AttributeOptionComboId>>,
    groups: BTreeMap<OptionGroupSetId, Vec<OptionGroupId>>,
    members: BTreeMap<AttributeOptionComboId, Vec<OptionGroupId>>,
    default_combo: AttributeOptionComboId,
}

impl TestCategories {
    pub fn new() -> Self {
        Self {
            combos: BTreeMap::new(),
            groups: BTreeMap::new(),
            members: BTreeMap::new(),
            default_combo: AttributeOptionComboId::new(),
        }
    }

    pub fn add_combo(&mut self, option_combos: Vec<AttributeOptionComboId>) -> CategoryComboId {
        let id = CategoryComboId::new();
        self.combos.insert(id, option_combos);
        id
    }

    pub fn add_group(&mut self, set: OptionGroupSetId) -> OptionGroupId {
        let group = OptionGroupId::new();
        self.groups.entry(set).or_default().push(group);
        group
    }

    /// Records that an option of `combo` belongs to `group`.
    pub fn add_member(&mut self, group: OptionGroupId, combo: AttributeOptionComboId) {
        self.members.entry(combo).or_default().push(group);
    }
}

impl CategoryService for TestCategories {
    fn combo_option_combos(&self, combo: CategoryComboId) -> Vec<AttributeOptionComboId> {
        self.combos.get(&combo).cloned().unwrap_or_default()
    }

    fn groups_in_set(&self, set: OptionGroupSetId) -> Vec<OptionGroupId> {
        self.groups.get(&set).cloned().unwrap_or_default()
    }

    fn option_combo_groups(&self, combo: AttributeOptionComboId) -> Vec<OptionGroupId> {
        self.members.get(&combo).cloned().unwrap_or_default()
    }

    fn default_option_combo(&self) -> AttributeOptionComboId {
        self.default_combo
    }
}

/// Security with every level readable unless hidden.
#[derive(Default)]
pub struct TestSecurity {
    hidden_levels: RefCell<BTreeSet<(UserId, ApprovalLevelId)>>,
    readable_groups: RefCell<BTreeSet<(UserId, OptionGroupId)>>,
    constrained: RefCell<BTreeSet<UserId>>,
    authorities: RefCell<BTreeMap<UserId, Authorities>>,
}

impl TestSecurity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hide_level(&self, user: UserId, level: ApprovalLevelId) {
        self.hidden_levels.borrow_mut().insert((user, level));
    }

    pub fn grant_group(&self, user: UserId, group: OptionGroupId) {
        self.readable_groups.borrow_mut().insert((user, group));
    }

    pub fn constrain_dimensions(&self, user: UserId) {
        self.constrained.borrow_mut().insert(user);
    }

    pub fn set_authorities(&self, user: UserId, authorities: Authorities) {
        self.authorities.borrow_mut().insert(user, authorities);
    }
}

impl SecurityService for TestSecurity {
    fn can_read_level(&self, user: UserId, level: &ApprovalLevel) -> bool {
        !self.hidden_levels.borrow().contains(&(user, level.id))
    }

    fn can_read_option_group(&self, user: UserId, group: OptionGroupId) -> bool {
        self.readable_groups.borrow().contains(&(user, group))
    }

    fn has_dimension_constraints(&self, user: UserId) -> bool {
        self.constrained.borrow().contains(&user)
    }

    fn authorities(&self, user: UserId) -> Authorities {
        self.authorities
            .borrow()
            .get(&user)
            .copied()
            .unwrap_or_default()
    }
}

/// Approve-only authorities.
pub fn approver() -> Authorities {
    Authorities {
        approve: true,
        ..Authorities::default()
    }
}
