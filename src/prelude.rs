//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use request_manager::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, RqmError};

// Records and rules
pub use crate::model::record::{RequestId, RequestRecord};
pub use crate::model::status::{Status, format_status};
pub use crate::model::timestamp::{CalendarZone, Timestamp};
pub use crate::model::transition::{allowed_targets, can_delete, can_transition};

// View-model
pub use crate::view::list::{ListView, compute_view};
pub use crate::view::query::{FilterState, SortOrder};

// API and session
pub use crate::api::{ApiError, Identity, RequestApi, Role, Scope};
pub use crate::auth::session::{Session, SessionStore};

// Dashboards
pub use crate::dashboard::model::{DashboardKind, DashboardModel, DashboardMsg};
pub use crate::dashboard::runtime::{Confirm, DashboardController};

// Notifications and activity log
pub use crate::logger::jsonl::{ActivityLog, JsonlWriter};
pub use crate::notify::{NotificationSink, Severity};
