//! Contiguous renumbering of workflow levels.
//!
//! A workflow may use a non-contiguous subset of the global levels, e.g.
//! levels {1, 2, 4, 5}. Inside the workflow they are numbered {1, 2, 3, 4}
//! so that "one level above" always means the adjacent workflow level.

use serde::{Deserialize, Serialize};

/// Where a global level falls in a workflow's index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelPlacement {
    /// The level is the workflow level with this index.
    At(u32),
    /// The level is not in the workflow and sits strictly between index
    /// `n - 1` and index `n`.
    Above(u32),
}

impl LevelPlacement {
    /// Position on a half-step scale where index `n` is `2n` and the gap
    /// just above it is `2n - 1`.
    #[must_use]
    pub fn rank(self) -> u64 {
        match self {
            Self::At(index) => u64::from(index) * 2,
            Self::Above(index) => (u64::from(index) * 2).saturating_sub(1),
        }
    }
}

/// Remaps global level numbers to contiguous workflow numbers.
///
/// Each output is `1 + count(inputs strictly less than the input)`, so the
/// relative order of `numbers` is preserved.
#[must_use]
pub fn remap_level_numbers(numbers: &[u32]) -> Vec<u32> {
    numbers
        .iter()
        .map(|&level| index_in(numbers, level))
        .collect()
}

/// Index a global level number would take among the workflow levels.
#[must_use]
pub fn index_in(workflow_numbers: &[u32], level: u32) -> u32 {
    let above = workflow_numbers.iter().filter(|&&n| n < level).count();
    u32::try_from(above).map_or(u32::MAX, |n| n + 1)
}

/// Places a global level number in a workflow's index space.
///
/// A member level sits at its own index. Any other level sits in the gap
/// just above the next lower workflow level.
#[must_use]
pub fn placement_in(workflow_numbers: &[u32], level: u32) -> LevelPlacement {
    let index = index_in(workflow_numbers, level);
    if workflow_numbers.contains(&level) {
        LevelPlacement::At(index)
    } else {
        LevelPlacement::Above(index)
    }
}
