//! The service request record as returned by the API.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use super::status::Status;
use super::timestamp::Timestamp;

/// Backend-assigned request identifier.
pub type RequestId = u64;

/// One service request.
///
/// Only `status` (and with it `updated_at`) ever changes after creation, and
/// only through a status transition on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    pub id: RequestId,
    pub category: String,
    pub description: String,
    pub created_by: String,
    pub status: Status,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl RequestRecord {
    /// Whether the status is terminal.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.status.is_terminal()
    }
}
