//! Filter, sort and page selection applied to a fetched record list.

#![allow(missing_docs)]

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::record::RequestRecord;
use crate::model::status::Status;
use crate::model::timestamp::CalendarZone;

/// Ordering by creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Most recently created first.
    #[default]
    Newest,
    /// Oldest first.
    Oldest,
}

impl SortOrder {
    /// Lower-case label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
        }
    }
}

/// Current filter/sort/page selection. Every `None` filter matches all records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub status: Option<Status>,
    pub category: Option<String>,
    pub created_by: Option<String>,
    pub created_on: Option<NaiveDate>,
    pub sort_order: SortOrder,
    /// 1-based.
    pub page: usize,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            status: None,
            category: None,
            created_by: None,
            created_on: None,
            sort_order: SortOrder::Newest,
            page: 1,
        }
    }
}

impl FilterState {
    /// Whether `record` satisfies every supplied predicate.
    #[must_use]
    pub fn matches(&self, record: &RequestRecord, zone: CalendarZone) -> bool {
        if self.status.is_some_and(|s| s != record.status) {
            return false;
        }
        if self
            .category
            .as_deref()
            .is_some_and(|c| c != record.category)
        {
            return false;
        }
        if self
            .created_by
            .as_deref()
            .is_some_and(|u| u != record.created_by)
        {
            return false;
        }
        if let Some(day) = self.created_on {
            let record_day = record.created_at.as_ref().and_then(|ts| zone.day(ts));
            if record_day != Some(day) {
                return false;
            }
        }
        true
    }
}
