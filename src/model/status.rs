//! Request status vocabulary and its display formatting.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a service request.
///
/// The set is fixed and ordered; `Resolved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Submitted, not yet picked up.
    Pending,
    /// Being worked on.
    InProgress,
    /// Paused, waiting on something external.
    OnHold,
    /// Done. Terminal.
    Resolved,
    /// Declined. Terminal.
    Rejected,
}

impl Status {
    /// Every status in vocabulary order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::InProgress,
        Self::OnHold,
        Self::Resolved,
        Self::Rejected,
    ];

    /// Wire name as sent to and received from the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::OnHold => "ON_HOLD",
            Self::Resolved => "RESOLVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// No further transition is permitted from a terminal status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }

    /// Human-readable label, e.g. `In Progress`.
    #[must_use]
    pub fn label(self) -> String {
        format_status_str(self.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no status in the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status {0:?} (expected one of PENDING, IN_PROGRESS, ON_HOLD, RESOLVED, REJECTED)")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Display form of an optional status; absence renders as `N/A`.
#[must_use]
pub fn format_status(status: Option<Status>) -> String {
    status.map_or_else(|| "N/A".to_string(), Status::label)
}

/// Format any underscore-delimited label: each segment lower-cased, then
/// capitalized at its first character, joined by single spaces.
#[must_use]
pub fn format_status_str(raw: &str) -> String {
    if raw.is_empty() {
        return "N/A".to_string();
    }
    raw.to_lowercase()
        .split('_')
        .map(|segment| {
            let mut chars = segment.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
