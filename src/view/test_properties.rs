//! Property-based tests for the list view-model.
//!
//! Arbitrary record collections and filter selections must always produce a
//! page that is a filtered subset of the input, correctly ordered, bounded by
//! the page size, and whose pages tile the filtered result exactly once.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use super::list::{compute_view, filter_and_sort};
use super::query::{FilterState, SortOrder};
use crate::model::record::RequestRecord;
use crate::model::status::Status;
use crate::model::timestamp::{CalendarZone, Timestamp};

const ZONE: CalendarZone = CalendarZone::Utc;

/// Reference fold: keep a value the first time it appears.
fn first_seen<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values.fold(Vec::new(), |mut acc, value| {
        if !acc.iter().any(|seen| seen == value) {
            acc.push(value.to_string());
        }
        acc
    })
}

// ──────────────────── strategies ────────────────────

fn arb_status() -> impl Strategy<Value = Status> {
    prop::sample::select(Status::ALL.to_vec())
}

/// Timestamps over three days with deliberate collisions, plus absent and
/// garbled values.
fn arb_created_at() -> impl Strategy<Value = Option<Timestamp>> {
    prop_oneof![
        8 => (0i64..3 * 24 * 4).prop_map(|quarter_hours| {
            let base = NaiveDate::from_ymd_opt(2025, 4, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();
            Some(Timestamp::Naive(base + Duration::minutes(quarter_hours * 15)))
        }),
        1 => Just(None),
        1 => Just(Some(Timestamp::parse("not-a-date"))),
    ]
}

fn arb_records() -> impl Strategy<Value = Vec<RequestRecord>> {
    prop::collection::vec(
        (
            arb_status(),
            prop::sample::select(vec!["IT", "HR", "Facilities"]),
            prop::sample::select(vec!["asha", "ben", "chen"]),
            arb_created_at(),
        ),
        0..60,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (status, category, by, created_at))| RequestRecord {
                id: i as u64,
                category: category.to_string(),
                description: format!("request {i}"),
                created_by: by.to_string(),
                status,
                created_at,
                updated_at: None,
            })
            .collect()
    })
}

fn arb_filters() -> impl Strategy<Value = FilterState> {
    (
        prop::option::of(arb_status()),
        prop::option::of(prop::sample::select(vec!["IT", "HR", "Facilities"])),
        prop::option::of(prop::sample::select(vec!["asha", "ben", "chen"])),
        prop::option::of(0u32..3),
        any::<bool>(),
        0usize..6,
    )
        .prop_map(|(status, category, by, day, newest, page)| FilterState {
            status,
            category: category.map(str::to_string),
            created_by: by.map(str::to_string),
            created_on: day.and_then(|d| NaiveDate::from_ymd_opt(2025, 4, 1 + d)),
            sort_order: if newest {
                SortOrder::Newest
            } else {
                SortOrder::Oldest
            },
            page,
        })
}

fn position(records: &[RequestRecord], id: u64) -> usize {
    records.iter().position(|r| r.id == id).unwrap()
}

// ──────────────────── property tests ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Every record on the page exists in the input and satisfies the filters.
    #[test]
    fn page_is_filtered_subset(
        records in arb_records(),
        filters in arb_filters(),
        page_size in 1usize..25,
    ) {
        let view = compute_view(&records, &filters, page_size, ZONE);
        for record in &view.page {
            prop_assert!(records.contains(record));
            prop_assert!(filters.matches(record, ZONE));
        }
    }

    /// Two calls with identical arguments agree and leave the input untouched.
    #[test]
    fn compute_view_is_idempotent(
        records in arb_records(),
        filters in arb_filters(),
        page_size in 1usize..25,
    ) {
        let before = records.clone();
        let first = compute_view(&records, &filters, page_size, ZONE);
        let second = compute_view(&records, &filters, page_size, ZONE);
        prop_assert_eq!(first, second);
        prop_assert_eq!(&records, &before);
    }

    /// Adjacent records follow the sort order; ties keep input order.
    #[test]
    fn sorted_output_is_ordered_and_stable(
        records in arb_records(),
        filters in arb_filters(),
    ) {
        let sorted = filter_and_sort(&records, &filters, ZONE);
        for pair in sorted.windows(2) {
            let a = pair[0].created_at.as_ref().and_then(|t| ZONE.instant(t));
            let b = pair[1].created_at.as_ref().and_then(|t| ZONE.instant(t));
            match (a, b) {
                (Some(a), Some(b)) => {
                    match filters.sort_order {
                        SortOrder::Newest => prop_assert!(a >= b),
                        SortOrder::Oldest => prop_assert!(a <= b),
                    }
                    if a == b {
                        prop_assert!(position(&records, pair[0].id) < position(&records, pair[1].id));
                    }
                }
                (None, Some(_)) => prop_assert!(false, "undated record sorted before a dated one"),
                (None, None) => {
                    prop_assert!(position(&records, pair[0].id) < position(&records, pair[1].id));
                }
                (Some(_), None) => {}
            }
        }
    }

    /// Pages are bounded and concatenate to the full filtered, sorted list.
    #[test]
    fn pages_tile_the_filtered_list(
        records in arb_records(),
        filters in arb_filters(),
        page_size in 1usize..25,
    ) {
        let expected = filter_and_sort(&records, &filters, ZONE);
        let first = compute_view(&records, &FilterState { page: 1, ..filters.clone() }, page_size, ZONE);
        prop_assert_eq!(first.total_pages, expected.len().div_ceil(page_size));

        let mut tiled = Vec::new();
        for page in 1..=first.total_pages {
            let view = compute_view(&records, &FilterState { page, ..filters.clone() }, page_size, ZONE);
            prop_assert!(view.page.len() <= page_size);
            prop_assert!(!view.page.is_empty());
            tiled.extend(view.page);
        }
        prop_assert_eq!(tiled, expected);

        let beyond = compute_view(
            &records,
            &FilterState { page: first.total_pages + 1, ..filters },
            page_size,
            ZONE,
        );
        prop_assert!(beyond.page.is_empty());
    }

    /// Facets list each distinct value of the unfiltered input exactly once,
    /// in first-seen order.
    #[test]
    fn facets_are_distinct_complete_and_first_seen(
        records in arb_records(),
        filters in arb_filters(),
    ) {
        let view = compute_view(&records, &filters, 10, ZONE);

        let categories: HashSet<&String> = view.facets.categories.iter().collect();
        let creators: HashSet<&String> = view.facets.created_by.iter().collect();
        prop_assert_eq!(categories.len(), view.facets.categories.len());
        prop_assert_eq!(creators.len(), view.facets.created_by.len());

        prop_assert_eq!(
            &view.facets.categories,
            &first_seen(records.iter().map(|r| r.category.as_str()))
        );
        prop_assert_eq!(
            &view.facets.created_by,
            &first_seen(records.iter().map(|r| r.created_by.as_str()))
        );
    }
}
