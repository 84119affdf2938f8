//! Property-based tests for the level registry.
//!
//! Random sequences of registry edits must always leave levels numbered
//! 1..N, sorted by depth, with unrestricted levels first at each depth.

use attest_shared::types::OptionGroupSetId;
use proptest::prelude::*;
use uuid::Uuid;

use crate::approval::level::LevelRegistry;
use crate::approval::types::ApprovalLevel;

#[derive(Debug, Clone)]
enum LevelOp {
    Add { depth: u32, group_set: Option<u8> },
    Insert { depth: u32, group_set: Option<u8>, number: u32 },
    Delete { index: usize },
    MoveUp { number: u32 },
    MoveDown { number: u32 },
}

fn group_set(n: u8) -> OptionGroupSetId {
    OptionGroupSetId::from_uuid(Uuid::from_u128(u128::from(n) + 1))
}

/// Strategy for generating random registry edits.
fn arb_op() -> impl Strategy<Value = LevelOp> {
    prop_oneof![
        3 => (1u32..6, prop::option::of(0u8..3))
            .prop_map(|(depth, group_set)| LevelOp::Add { depth, group_set }),
        1 => (1u32..6, prop::option::of(0u8..3), 0u32..12)
            .prop_map(|(depth, group_set, number)| LevelOp::Insert { depth, group_set, number }),
        1 => (0usize..12).prop_map(|index| LevelOp::Delete { index }),
        1 => (0u32..12).prop_map(|number| LevelOp::MoveUp { number }),
        1 => (0u32..12).prop_map(|number| LevelOp::MoveDown { number }),
    ]
}

fn apply(registry: &mut LevelRegistry, op: &LevelOp) {
    // Rejected edits are fine; only the resulting state is checked.
    match *op {
        LevelOp::Add { depth, group_set: set } => {
            let _ = registry.add_level(ApprovalLevel::new("level", depth, set.map(group_set)));
        }
        LevelOp::Insert {
            depth,
            group_set: set,
            number,
        } => {
            let _ = registry.insert_level_at(
                ApprovalLevel::new("level", depth, set.map(group_set)),
                number,
            );
        }
        LevelOp::Delete { index } => {
            if let Some(id) = registry.levels().get(index).map(|l| l.id) {
                let _ = registry.delete_level(id);
            }
        }
        LevelOp::MoveUp { number } => {
            let _ = registry.move_up(number);
        }
        LevelOp::MoveDown { number } => {
            let _ = registry.move_down(number);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Numbering and ordering hold after every edit.
    #[test]
    fn prop_registry_stays_consistent(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut registry = LevelRegistry::new();
        for op in &ops {
            apply(&mut registry, op);
            prop_assert!(registry.is_consistent(), "inconsistent after {:?}", op);
        }
    }

    /// No two levels share a depth and group set.
    #[test]
    fn prop_depth_group_set_unique(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut registry = LevelRegistry::new();
        for op in &ops {
            apply(&mut registry, op);
        }
        let levels = registry.levels();
        for (i, a) in levels.iter().enumerate() {
            for b in &levels[i + 1..] {
                prop_assert!(
                    a.org_unit_depth != b.org_unit_depth || a.group_set != b.group_set
                );
            }
        }
    }

    /// Moving a level down and back up restores the original order.
    #[test]
    fn prop_move_down_then_up_round_trips(
        ops in prop::collection::vec(arb_op(), 1..30),
        number in 1u32..10,
    ) {
        let mut registry = LevelRegistry::new();
        for op in &ops {
            apply(&mut registry, op);
        }
        let before: Vec<_> = registry.levels().iter().map(|l| l.id).collect();
        if registry.move_down(number).is_ok() {
            prop_assert!(registry.move_up(number + 1).is_ok());
        }
        let after: Vec<_> = registry.levels().iter().map(|l| l.id).collect();
        prop_assert_eq!(before, after);
    }
}
