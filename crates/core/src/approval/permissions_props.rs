//! Property-based tests for permission evaluation.

use attest_shared::ApprovalSettings;
use proptest::prelude::*;

use crate::approval::permissions::evaluate;
use crate::approval::remap::LevelPlacement;
use crate::approval::types::{ApprovalState, Authorities};

fn arb_state() -> impl Strategy<Value = ApprovalState> {
    prop_oneof![
        Just(ApprovalState::Unapprovable),
        Just(ApprovalState::Unapproved),
        Just(ApprovalState::UnapprovedWaiting),
        Just(ApprovalState::ApprovedAbove),
        Just(ApprovalState::ApprovedHere),
        Just(ApprovalState::AcceptedHere),
    ]
}

fn arb_placement() -> impl Strategy<Value = LevelPlacement> {
    prop_oneof![
        (1u32..6).prop_map(LevelPlacement::At),
        (1u32..6).prop_map(LevelPlacement::Above),
    ]
}

fn arb_authorities() -> impl Strategy<Value = Authorities> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(approve, approve_lower_levels, accept_lower_levels, view_unapproved_data)| Authorities {
            approve,
            approve_lower_levels,
            accept_lower_levels,
            view_unapproved_data,
        },
    )
}

fn arb_settings() -> impl Strategy<Value = ApprovalSettings> {
    (any::<bool>(), any::<bool>()).prop_map(|(acceptance_required, hide_unapproved)| {
        ApprovalSettings {
            acceptance_required,
            hide_unapproved,
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Anything the user may change, they may also read.
    #[test]
    fn prop_mutation_implies_read(
        state in arb_state(),
        d in 1u32..6,
        u in arb_placement(),
        authorities in arb_authorities(),
        settings in arb_settings(),
    ) {
        let perms = evaluate(state, Some(d), Some(u), authorities, settings);
        if perms.any_mutation() {
            prop_assert!(perms.may_read);
        }
    }

    /// Data approved above this unit cannot be changed from here.
    #[test]
    fn prop_approved_above_is_immutable(
        d in 1u32..6,
        u in arb_placement(),
        authorities in arb_authorities(),
        settings in arb_settings(),
    ) {
        let perms = evaluate(ApprovalState::ApprovedAbove, Some(d), Some(u), authorities, settings);
        prop_assert!(!perms.any_mutation());
    }

    /// Acceptance operations need acceptance to be required.
    #[test]
    fn prop_acceptance_off_blocks_accept(
        state in arb_state(),
        d in 1u32..6,
        u in arb_placement(),
        authorities in arb_authorities(),
        hide_unapproved in any::<bool>(),
    ) {
        let settings = ApprovalSettings { acceptance_required: false, hide_unapproved };
        let perms = evaluate(state, Some(d), Some(u), authorities, settings);
        prop_assert!(!perms.may_accept);
        prop_assert!(!perms.may_unaccept);
    }

    /// Without any authority nothing may change.
    #[test]
    fn prop_no_authority_no_mutation(
        state in arb_state(),
        d in 1u32..6,
        u in arb_placement(),
        view_unapproved_data in any::<bool>(),
        settings in arb_settings(),
    ) {
        let authorities = Authorities { view_unapproved_data, ..Authorities::default() };
        let perms = evaluate(state, Some(d), Some(u), authorities, settings);
        prop_assert!(!perms.any_mutation());
    }

    /// Accepted data cannot be unapproved and accepted data cannot be
    /// accepted again.
    #[test]
    fn prop_accepted_data_guards(
        d in 1u32..6,
        u in arb_placement(),
        authorities in arb_authorities(),
        hide_unapproved in any::<bool>(),
    ) {
        let settings = ApprovalSettings { acceptance_required: true, hide_unapproved };
        let perms = evaluate(ApprovalState::AcceptedHere, Some(d), Some(u), authorities, settings);
        prop_assert!(!perms.may_accept);
        prop_assert_eq!(perms.may_unapprove, perms.may_unaccept);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Data waiting for lower units cannot be approved by anyone.
    #[test]
    fn prop_waiting_data_is_not_approvable(
        d in 1u32..6,
        u in arb_placement(),
        authorities in arb_authorities(),
        settings in arb_settings(),
    ) {
        let perms = evaluate(ApprovalState::UnapprovedWaiting, Some(d), Some(u), authorities, settings);
        prop_assert!(!perms.any_mutation());
    }

    /// A user whose level is outside the workflow cannot approve or
    /// unapprove with plain approve rights.
    #[test]
    fn prop_gap_user_needs_lower_rights(
        state in arb_state(),
        d in 1u32..6,
        gap in 1u32..6,
        settings in arb_settings(),
    ) {
        let approver = Authorities { approve: true, ..Authorities::default() };
        let perms = evaluate(state, Some(d), Some(LevelPlacement::Above(gap)), approver, settings);
        prop_assert!(!perms.may_approve);
        prop_assert!(!perms.may_unapprove);
    }
}
