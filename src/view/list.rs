//! Pure list computation: filter, sort, paginate, and derive facets.
//!
//! The source slice is only ever borrowed. Sorting happens on a freshly
//! collected vector of references, so a collection reused across renders
//! keeps its fetched order.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;

use super::query::{FilterState, SortOrder};
use crate::model::record::RequestRecord;
use crate::model::timestamp::CalendarZone;

/// Distinct values for populating filter selectors, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Facets {
    /// Distinct categories across the unfiltered input.
    pub categories: Vec<String>,
    /// Distinct creators across the unfiltered input.
    pub created_by: Vec<String>,
}

impl Facets {
    /// Compute facets over the whole collection.
    #[must_use]
    pub fn collect(records: &[RequestRecord]) -> Self {
        Self {
            categories: distinct(records.iter().map(|r| r.category.as_str())),
            created_by: distinct(records.iter().map(|r| r.created_by.as_str())),
        }
    }
}

/// One rendered page plus the numbers needed to draw a pager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListView<'a> {
    /// Records on the requested page, in sort order.
    pub page: Vec<&'a RequestRecord>,
    /// `ceil(filtered_count / page_size)`; zero when nothing matched.
    pub total_pages: usize,
    /// Number of records that passed the filters.
    pub filtered_count: usize,
    /// Selector values over the unfiltered input.
    pub facets: Facets,
}

/// Compute the visible page for `filters` over `records`.
///
/// Total over every input: a page past the end (or page 0) is empty, and a
/// zero `page_size` is read as 1. Records whose `created_at` is missing or
/// unparseable sort after all dated records in either order.
#[must_use]
pub fn compute_view<'a>(
    records: &'a [RequestRecord],
    filters: &FilterState,
    page_size: usize,
    zone: CalendarZone,
) -> ListView<'a> {
    let page_size = page_size.max(1);
    let sorted = filter_and_sort(records, filters, zone);
    let filtered_count = sorted.len();
    let total_pages = filtered_count.div_ceil(page_size);

    let page = match filters.page.checked_sub(1) {
        Some(index) => sorted
            .into_iter()
            .skip(index.saturating_mul(page_size))
            .take(page_size)
            .collect(),
        None => Vec::new(),
    };

    ListView {
        page,
        total_pages,
        filtered_count,
        facets: Facets::collect(records),
    }
}

/// All records matching `filters`, sorted, without pagination.
#[must_use]
pub fn filter_and_sort<'a>(
    records: &'a [RequestRecord],
    filters: &FilterState,
    zone: CalendarZone,
) -> Vec<&'a RequestRecord> {
    let mut matched: Vec<&RequestRecord> = records
        .iter()
        .filter(|record| filters.matches(record, zone))
        .collect();
    // `sort_by` is stable: equal keys keep input order.
    matched.sort_by(|a, b| order(a, b, filters.sort_order, zone));
    matched
}

fn order(a: &RequestRecord, b: &RequestRecord, sort: SortOrder, zone: CalendarZone) -> Ordering {
    zone.compare(
        a.created_at.as_ref(),
        b.created_at.as_ref(),
        sort == SortOrder::Newest,
    )
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}
