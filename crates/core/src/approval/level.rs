//! Global approval level registry.
//!
//! Levels are kept sorted by organisational depth, with unrestricted levels
//! before group-set restricted ones at the same depth. Level numbers are
//! always the contiguous sequence 1..N.

use attest_shared::types::{ApprovalLevelId, OptionGroupSetId};
use tracing::debug;

use super::error::ApprovalError;
use super::types::ApprovalLevel;

/// Ordered registry of approval levels.
#[derive(Debug, Clone, Default)]
pub struct LevelRegistry {
    levels: Vec<ApprovalLevel>,
}

impl LevelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a level at its ordered position and returns its number.
    ///
    /// A restricted level goes after the existing restricted levels of its
    /// depth.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateLevel` if a level with the same depth and group set
    /// exists.
    pub fn add_level(&mut self, level: ApprovalLevel) -> Result<u32, ApprovalError> {
        self.ensure_unique(&level)?;

        let key = level.ordering_key();
        let index = self.levels.partition_point(|l| l.ordering_key() <= key);
        Ok(self.insert_at_index(index, level))
    }

    /// Inserts a level at an explicit number.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLevelPosition` if the number is out of range or the
    /// level would break the ordering, and `DuplicateLevel` for an existing
    /// depth and group set.
    pub fn insert_level_at(
        &mut self,
        level: ApprovalLevel,
        number: u32,
    ) -> Result<u32, ApprovalError> {
        self.ensure_unique(&level)?;

        let index = number
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .filter(|&i| i <= self.levels.len())
            .ok_or(ApprovalError::InvalidLevelPosition { level: number })?;

        let key = level.ordering_key();
        let fits_above = index == 0 || self.levels[index - 1].ordering_key() <= key;
        let fits_below = self
            .levels
            .get(index)
            .is_none_or(|next| key <= next.ordering_key());
        if !(fits_above && fits_below) {
            return Err(ApprovalError::InvalidLevelPosition { level: number });
        }

        Ok(self.insert_at_index(index, level))
    }

    fn ensure_unique(&self, level: &ApprovalLevel) -> Result<(), ApprovalError> {
        if self.exists(level.org_unit_depth, level.group_set) {
            return Err(ApprovalError::DuplicateLevel {
                depth: level.org_unit_depth,
                group_set: level.group_set,
            });
        }
        Ok(())
    }

    fn insert_at_index(&mut self, index: usize, mut level: ApprovalLevel) -> u32 {
        // Shift the levels below first so that no two levels share a number.
        for below in self.levels[index..].iter_mut().rev() {
            below.level += 1;
        }

        let number = level_number(index);
        level.level = number;
        debug!(level = number, depth = level.org_unit_depth, name = %level.name, "Approval level added");
        self.levels.insert(index, level);
        number
    }

    /// Returns true if level `number` may swap with the level below it.
    ///
    /// Both must share a depth, and the level moving down must carry a
    /// group set restriction.
    #[must_use]
    pub fn can_move_down(&self, number: u32) -> bool {
        let Some(index) = self.index_of_number(number) else {
            return false;
        };
        match (self.levels.get(index), self.levels.get(index + 1)) {
            (Some(upper), Some(lower)) => {
                upper.org_unit_depth == lower.org_unit_depth && upper.is_restricted()
            }
            _ => false,
        }
    }

    /// Returns true if level `number` may swap with the level above it.
    #[must_use]
    pub fn can_move_up(&self, number: u32) -> bool {
        number > 1 && self.can_move_down(number - 1)
    }

    /// Swaps level `number` with the level below it.
    ///
    /// # Errors
    ///
    /// Returns `CannotMoveLevel` if the move is not permitted.
    pub fn move_down(&mut self, number: u32) -> Result<(), ApprovalError> {
        if !self.can_move_down(number) {
            return Err(ApprovalError::CannotMoveLevel { level: number });
        }
        let index = self
            .index_of_number(number)
            .ok_or(ApprovalError::CannotMoveLevel { level: number })?;
        self.levels.swap(index, index + 1);
        self.renumber();
        debug!(level = number, "Approval level moved down");
        Ok(())
    }

    /// Swaps level `number` with the level above it.
    ///
    /// # Errors
    ///
    /// Returns `CannotMoveLevel` if the move is not permitted.
    pub fn move_up(&mut self, number: u32) -> Result<(), ApprovalError> {
        if !self.can_move_up(number) {
            return Err(ApprovalError::CannotMoveLevel { level: number });
        }
        self.move_down(number - 1)
    }

    /// Deletes a level and renumbers the rest to 1..N.
    ///
    /// # Errors
    ///
    /// Returns `LevelNotFound` if no level has the id.
    pub fn delete_level(&mut self, id: ApprovalLevelId) -> Result<ApprovalLevel, ApprovalError> {
        let index = self
            .levels
            .iter()
            .position(|l| l.id == id)
            .ok_or(ApprovalError::LevelNotFound(id))?;
        let removed = self.levels.remove(index);
        self.renumber();
        debug!(level = removed.level, name = %removed.name, "Approval level deleted");
        Ok(removed)
    }

    fn renumber(&mut self) {
        for (index, level) in self.levels.iter_mut().enumerate() {
            level.level = level_number(index);
        }
    }

    fn index_of_number(&self, number: u32) -> Option<usize> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        (index < self.levels.len()).then_some(index)
    }

    /// Looks up a level by id.
    #[must_use]
    pub fn get(&self, id: ApprovalLevelId) -> Option<&ApprovalLevel> {
        self.levels.iter().find(|l| l.id == id)
    }

    /// Looks up a level by number.
    #[must_use]
    pub fn by_level(&self, number: u32) -> Option<&ApprovalLevel> {
        self.index_of_number(number).and_then(|i| self.levels.get(i))
    }

    /// Returns true if a level binds `depth` with this group set.
    #[must_use]
    pub fn exists(&self, depth: u32, group_set: Option<OptionGroupSetId>) -> bool {
        self.levels
            .iter()
            .any(|l| l.org_unit_depth == depth && l.group_set == group_set)
    }

    /// All levels, highest authority first.
    #[must_use]
    pub fn levels(&self) -> &[ApprovalLevel] {
        &self.levels
    }

    /// The level with the least authority.
    #[must_use]
    pub fn lowest(&self) -> Option<&ApprovalLevel> {
        self.levels.last()
    }

    /// Number of levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Returns true if no levels are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Checks numbering and ordering.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let numbered = self
            .levels
            .iter()
            .enumerate()
            .all(|(i, l)| l.level == level_number(i));
        let ordered = self
            .levels
            .windows(2)
            .all(|pair| pair[0].ordering_key() <= pair[1].ordering_key());
        numbered && ordered
    }
}

fn level_number(index: usize) -> u32 {
    u32::try_from(index).map_or(u32::MAX, |i| i + 1)
}
