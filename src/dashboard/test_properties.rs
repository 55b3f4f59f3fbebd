//! Property-based tests for dashboard reducer invariants.
//!
//! Arbitrary message sequences must keep the page 1-based, reset paging on
//! every filter change, never touch the backend without a session, and never
//! issue a delete or status mutation for a closed record.

use proptest::prelude::*;

use super::model::{DashboardCmd, DashboardKind, DashboardModel, DashboardMsg};
use super::update::update;
use crate::api::{ApiError, Identity, Role};
use crate::auth::session::Session;
use crate::model::record::RequestRecord;
use crate::model::status::Status;
use crate::model::timestamp::{CalendarZone, Timestamp};
use crate::view::query::SortOrder;

// ──────────────────── strategies ────────────────────

fn arb_status() -> impl Strategy<Value = Status> {
    prop::sample::select(Status::ALL.to_vec())
}

fn arb_record() -> impl Strategy<Value = RequestRecord> {
    (1u64..12, arb_status(), 1u32..28, prop::bool::ANY).prop_map(|(id, status, day, dated)| {
        RequestRecord {
            id,
            category: if id % 2 == 0 { "IT" } else { "HR" }.into(),
            description: format!("request number {id}"),
            created_by: if id % 3 == 0 { "ben" } else { "asha" }.into(),
            status,
            created_at: dated.then(|| Timestamp::parse(&format!("2025-04-{day:02}T08:00:00"))),
            updated_at: None,
        }
    })
}

fn arb_msg() -> impl Strategy<Value = DashboardMsg> {
    prop_oneof![
        Just(DashboardMsg::Mount),
        Just(DashboardMsg::Refresh),
        prop::collection::vec(arb_record(), 0..30).prop_map(|r| DashboardMsg::Fetched(Ok(r))),
        Just(DashboardMsg::Fetched(Err(ApiError::Network {
            details: "timeout".into()
        }))),
        prop::option::of(arb_status()).prop_map(DashboardMsg::SetStatusFilter),
        prop::option::of(Just("IT".to_string())).prop_map(DashboardMsg::SetCategoryFilter),
        prop::option::of(Just("ben".to_string())).prop_map(DashboardMsg::SetCreatorFilter),
        prop::bool::ANY.prop_map(|oldest| DashboardMsg::SetSortOrder(if oldest {
            SortOrder::Oldest
        } else {
            SortOrder::Newest
        })),
        (0usize..6).prop_map(DashboardMsg::GoToPage),
        Just(DashboardMsg::ClearFilters),
        Just(DashboardMsg::OpenCreateForm),
        Just(DashboardMsg::SetDraftCategory("IT".into())),
        Just(DashboardMsg::SetDraftDescription("Printer jammed".into())),
        Just(DashboardMsg::SubmitCreate),
        (1u64..12).prop_map(DashboardMsg::RequestDelete),
        (1u64..12, arb_status()).prop_map(|(id, to)| DashboardMsg::RequestStatusChange { id, to }),
        Just(DashboardMsg::Logout),
    ]
}

fn arb_kind() -> impl Strategy<Value = DashboardKind> {
    prop_oneof![Just(DashboardKind::Admin), Just(DashboardKind::User)]
}

fn new_model(kind: DashboardKind, logged_in: bool) -> DashboardModel {
    let session = logged_in.then(|| Session::established(Identity::new("asha", "pw"), Role::User));
    DashboardModel::new(kind, session, 5, CalendarZone::Utc)
}

fn is_filter_change(msg: &DashboardMsg, kind: DashboardKind) -> bool {
    match msg {
        DashboardMsg::SetStatusFilter(_)
        | DashboardMsg::SetSortOrder(_)
        | DashboardMsg::SetDateFilter(_)
        | DashboardMsg::ClearFilters => true,
        DashboardMsg::SetCategoryFilter(_) | DashboardMsg::SetCreatorFilter(_) => {
            kind == DashboardKind::Admin
        }
        _ => false,
    }
}

fn touches_backend(cmd: &DashboardCmd) -> bool {
    matches!(
        cmd,
        DashboardCmd::Fetch
            | DashboardCmd::Create { .. }
            | DashboardCmd::Delete(_)
            | DashboardCmd::SetStatus { .. }
            | DashboardCmd::Confirm { .. }
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn page_stays_one_based(
        kind in arb_kind(),
        msgs in prop::collection::vec(arb_msg(), 1..40),
    ) {
        let mut model = new_model(kind, true);
        for msg in msgs {
            let _ = update(&mut model, msg);
            prop_assert!(model.filters.page >= 1);
        }
    }

    #[test]
    fn filter_changes_return_to_first_page(
        kind in arb_kind(),
        msgs in prop::collection::vec(arb_msg(), 1..40),
    ) {
        let mut model = new_model(kind, true);
        for msg in msgs {
            let resets = is_filter_change(&msg, kind);
            let _ = update(&mut model, msg);
            if resets {
                prop_assert_eq!(model.filters.page, 1);
            }
        }
    }

    #[test]
    fn no_backend_traffic_without_session(
        kind in arb_kind(),
        msgs in prop::collection::vec(arb_msg(), 1..40),
    ) {
        let mut model = new_model(kind, false);
        for msg in msgs {
            for cmd in update(&mut model, msg).flatten() {
                prop_assert!(!touches_backend(&cmd), "unexpected {:?}", cmd);
            }
        }
    }

    #[test]
    fn closed_records_are_never_mutated(
        kind in arb_kind(),
        records in prop::collection::vec(arb_record(), 1..20),
        target in arb_status(),
    ) {
        let mut model = new_model(kind, true);
        let _ = update(&mut model, DashboardMsg::Fetched(Ok(records.clone())));
        for record in records.iter().filter(|r| r.is_closed()) {
            // Duplicate ids resolve to the first match; skip shadowed ones.
            if model.record(record.id).map(|r| r.status) != Some(record.status) {
                continue;
            }
            let msgs = [
                DashboardMsg::RequestDelete(record.id),
                DashboardMsg::RequestStatusChange { id: record.id, to: target },
            ];
            for msg in msgs {
                for cmd in update(&mut model, msg).flatten() {
                    prop_assert!(
                        !matches!(
                            cmd,
                            DashboardCmd::Confirm { .. }
                                | DashboardCmd::Delete(_)
                                | DashboardCmd::SetStatus { .. }
                        ),
                        "closed record {} produced {:?}",
                        record.id,
                        cmd
                    );
                }
            }
        }
    }

    #[test]
    fn row_actions_match_lifecycle(record in arb_record(), kind in arb_kind()) {
        let model = new_model(kind, true);
        let actions = model.row_actions(&record);
        if record.is_closed() {
            prop_assert!(actions.is_empty());
        } else {
            prop_assert!(!actions.is_empty());
        }
    }
}
