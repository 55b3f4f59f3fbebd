//! Elm-style state for the request dashboards.
//!
//! All display state lives in [`DashboardModel`]. Intents and backend results
//! arrive as [`DashboardMsg`] values; side-effects leave as [`DashboardCmd`]
//! values for the runtime to execute. Nothing in this module performs I/O.

#![allow(missing_docs)]

use chrono::NaiveDate;
use serde::Serialize;

use crate::api::{ApiError, Scope};
use crate::auth::session::Session;
use crate::logger::jsonl::EventType;
use crate::model::record::{RequestId, RequestRecord};
use crate::model::status::Status;
use crate::model::timestamp::CalendarZone;
use crate::model::transition::{allowed_targets, can_delete};
use crate::notify::{Notice, Severity};
use crate::view::list::{ListView, compute_view};
use crate::view::query::{FilterState, SortOrder};

// ──────────────────── kinds ────────────────────

/// Which dashboard is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardKind {
    /// Every request, all filters, per-row status control.
    Admin,
    /// Own requests, status and date filters, create form, per-row delete.
    User,
}

impl DashboardKind {
    #[must_use]
    pub const fn scope(self) -> Scope {
        match self {
            Self::Admin => Scope::Admin,
            Self::User => Scope::User,
        }
    }

    #[must_use]
    pub const fn fetch_failed_message(self) -> &'static str {
        match self {
            Self::Admin => "Failed to fetch requests",
            Self::User => "Failed to load your requests",
        }
    }

    #[must_use]
    pub const fn empty_message(self) -> &'static str {
        match self {
            Self::Admin => "No matching service requests found.",
            Self::User => "No matching requests found.",
        }
    }

    #[must_use]
    pub const fn logout_message(self) -> &'static str {
        match self {
            Self::Admin => "Logout successful!",
            Self::User => "You have been logged out successfully!",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Admin => "Admin Dashboard",
            Self::User => "My Service Requests",
        }
    }
}

pub const NOT_LOGGED_IN: &str = "You are not logged in";
pub const FIELDS_REQUIRED: &str = "All fields are required";
pub const CREATE_SUCCEEDED: &str = "Request submitted successfully";
pub const CREATE_FAILED: &str = "Failed to submit request";
pub const DELETE_SUCCEEDED: &str = "Request deleted successfully";
pub const DELETE_FAILED: &str = "Failed to delete request";
pub const STATUS_SUCCEEDED: &str = "Status updated!";
pub const STATUS_FAILED: &str = "Failed to update status";

/// Navigation target outside the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Login,
}

/// Unsubmitted create-form contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Draft {
    pub category: String,
    pub description: String,
}

impl Draft {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.category.trim().is_empty() && !self.description.trim().is_empty()
    }
}

/// Controls offered on one row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowActions {
    /// Status choices (admin only); empty for closed records.
    pub status_targets: Vec<Status>,
    /// Delete button (user only).
    pub can_delete: bool,
}

impl RowActions {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status_targets.is_empty() && !self.can_delete
    }
}

// ──────────────────── model ────────────────────

/// Complete dashboard state.
#[derive(Debug, Clone)]
pub struct DashboardModel {
    pub kind: DashboardKind,
    session: Option<Session>,
    pub filters: FilterState,
    pub page_size: usize,
    pub zone: CalendarZone,
    /// Result of the last successful fetch.
    pub records: Vec<RequestRecord>,
    pub loading: bool,
    pub form_open: bool,
    pub draft: Draft,
    /// Notices raised by the last dispatched intent (or since the last
    /// [`DashboardModel::take_notices`] when driving `update` directly).
    pub notices: Vec<Notice>,
    pub redirect: Option<Route>,
}

impl DashboardModel {
    #[must_use]
    pub fn new(
        kind: DashboardKind,
        session: Option<Session>,
        page_size: usize,
        zone: CalendarZone,
    ) -> Self {
        Self {
            kind,
            session,
            filters: FilterState::default(),
            page_size: page_size.max(1),
            zone,
            records: Vec::new(),
            loading: false,
            form_open: false,
            draft: Draft::default(),
            notices: Vec::new(),
            redirect: None,
        }
    }

    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub(crate) fn end_session(&mut self) {
        self.session = None;
    }

    /// The current page and pager numbers.
    #[must_use]
    pub fn view(&self) -> ListView<'_> {
        compute_view(&self.records, &self.filters, self.page_size, self.zone)
    }

    /// Affordances for `record` on this dashboard.
    #[must_use]
    pub fn row_actions(&self, record: &RequestRecord) -> RowActions {
        match self.kind {
            DashboardKind::Admin => RowActions {
                status_targets: allowed_targets(record.status),
                can_delete: false,
            },
            DashboardKind::User => RowActions {
                status_targets: Vec::new(),
                can_delete: can_delete(record.status),
            },
        }
    }

    #[must_use]
    pub fn record(&self, id: RequestId) -> Option<&RequestRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

// ──────────────────── messages ────────────────────

/// Intents and backend results consumed by [`super::update::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardMsg {
    /// Dashboard shown; fetch if logged in, otherwise bounce to login.
    Mount,
    /// Re-fetch on demand.
    Refresh,
    Fetched(Result<Vec<RequestRecord>, ApiError>),

    SetStatusFilter(Option<Status>),
    /// Admin only.
    SetCategoryFilter(Option<String>),
    /// Admin only.
    SetCreatorFilter(Option<String>),
    SetDateFilter(Option<NaiveDate>),
    SetSortOrder(SortOrder),
    GoToPage(usize),
    ClearFilters,

    /// User only from here to `Created`.
    OpenCreateForm,
    CloseCreateForm,
    SetDraftCategory(String),
    SetDraftDescription(String),
    SubmitCreate,
    Created(Result<RequestRecord, ApiError>),

    /// User only; asks for confirmation first.
    RequestDelete(RequestId),
    DeleteConfirmed(RequestId),
    Deleted {
        id: RequestId,
        result: Result<(), ApiError>,
    },

    /// Admin only; asks for confirmation first.
    RequestStatusChange { id: RequestId, to: Status },
    StatusChangeConfirmed {
        id: RequestId,
        from: Status,
        to: Status,
    },
    StatusChanged {
        id: RequestId,
        from: Status,
        to: Status,
        result: Result<(), ApiError>,
    },

    Logout,
}

// ──────────────────── commands ────────────────────

/// Side-effects requested by the update function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardCmd {
    None,
    Batch(Vec<Self>),
    /// List the dashboard's scope and deliver `Fetched`.
    Fetch,
    /// Deliver `Created`.
    Create {
        category: String,
        description: String,
    },
    /// Deliver `Deleted`.
    Delete(RequestId),
    /// Deliver `StatusChanged`.
    SetStatus {
        id: RequestId,
        from: Status,
        to: Status,
    },
    /// Ask the operator; dispatch `then` only when accepted.
    Confirm {
        prompt: String,
        then: Box<DashboardMsg>,
    },
    Notify(Severity, String),
    Redirect(Route),
    /// Activity-log an outcome that involved no backend call.
    Record { event: EventType, details: String },
}

impl DashboardCmd {
    /// Flatten nested batches into execution order.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::None => Vec::new(),
            Self::Batch(cmds) => cmds.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }
}
