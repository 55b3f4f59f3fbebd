//! Request API client contract and its bindings.
//!
//! [`RequestApi`] is the only path to persistence. Two bindings ship with the
//! crate: [`http::HttpApi`] talks to the REST backend, [`local::LocalApi`]
//! embeds the same rules over SQLite for offline use and tests.

#![allow(missing_docs)]

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "sqlite")]
pub mod local;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::{Backend, Config};
use crate::core::errors::{Result, RqmError};
use crate::model::record::{RequestId, RequestRecord};
use crate::model::status::Status;

// ──────────────────── identities ────────────────────

/// Account role as reported by the backend at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().trim_matches('"').to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "USER" => Ok(Self::User),
            other => Err(ApiError::Protocol {
                details: format!("unknown role {other:?}"),
            }),
        }
    }
}

/// Credentials presented with every call.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub password: String,
}

impl Identity {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Which request collection to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Every request (administrators).
    Admin,
    /// Only the caller's own requests.
    User,
}

/// New-account details sent at registration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

// ──────────────────── errors ────────────────────

/// Which registration identity already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    Username,
    Email,
}

/// Failure taxonomy for API calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Bad credentials.
    #[error("invalid username or password")]
    Unauthorized,
    /// Disallowed transition or delete, or missing capability.
    #[error("forbidden: {reason}")]
    Forbidden { reason: String },
    /// Registration identity already taken.
    #[error("{} already exists", match .0 { ConflictKind::Username => "username", ConflictKind::Email => "email" })]
    Conflict(ConflictKind),
    #[error("request {id} not found")]
    NotFound { id: RequestId },
    /// Any other client-side rejection by the backend (400-class).
    #[error("rejected by backend: {details}")]
    Rejected { details: String },
    /// Backend unreachable, timed out, or failed server-side.
    #[error("network failure: {details}")]
    Network { details: String },
    /// Response could not be understood.
    #[error("protocol failure: {details}")]
    Protocol { details: String },
    /// Embedded backend storage failure.
    #[error("storage failure: {details}")]
    Storage { details: String },
}

impl ApiError {
    /// Failures that may clear on their own (not retried automatically).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Storage { .. })
    }

    /// Short stable label for activity logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::NotFound { .. } => "not_found",
            Self::Rejected { .. } => "rejected",
            Self::Network { .. } => "network",
            Self::Protocol { .. } => "protocol",
            Self::Storage { .. } => "storage",
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

// ──────────────────── client contract ────────────────────

/// Persistence and business-rule boundary.
///
/// Every role and lifecycle rule is enforced behind this trait; callers only
/// hide affordances.
pub trait RequestApi {
    fn list_requests(&self, scope: Scope, identity: &Identity) -> ApiResult<Vec<RequestRecord>>;

    fn create_request(
        &self,
        category: &str,
        description: &str,
        identity: &Identity,
    ) -> ApiResult<RequestRecord>;

    /// Fails with `Forbidden` when the status is terminal or the caller is
    /// not the owner.
    fn delete_request(&self, id: RequestId, identity: &Identity) -> ApiResult<()>;

    /// Fails with `Forbidden` when the caller is not an administrator or the
    /// current status is terminal.
    fn set_status(&self, id: RequestId, status: Status, identity: &Identity) -> ApiResult<()>;

    /// Fails with `Unauthorized` on bad credentials.
    fn login(&self, username: &str, password: &str) -> ApiResult<Role>;

    /// Fails with `Conflict` when the username or email is taken.
    fn register(&self, profile: &Profile) -> ApiResult<()>;
}

impl<T: RequestApi + ?Sized> RequestApi for &T {
    fn list_requests(&self, scope: Scope, identity: &Identity) -> ApiResult<Vec<RequestRecord>> {
        (**self).list_requests(scope, identity)
    }

    fn create_request(
        &self,
        category: &str,
        description: &str,
        identity: &Identity,
    ) -> ApiResult<RequestRecord> {
        (**self).create_request(category, description, identity)
    }

    fn delete_request(&self, id: RequestId, identity: &Identity) -> ApiResult<()> {
        (**self).delete_request(id, identity)
    }

    fn set_status(&self, id: RequestId, status: Status, identity: &Identity) -> ApiResult<()> {
        (**self).set_status(id, status, identity)
    }

    fn login(&self, username: &str, password: &str) -> ApiResult<Role> {
        (**self).login(username, password)
    }

    fn register(&self, profile: &Profile) -> ApiResult<()> {
        (**self).register(profile)
    }
}

impl<T: RequestApi + ?Sized> RequestApi for Box<T> {
    fn list_requests(&self, scope: Scope, identity: &Identity) -> ApiResult<Vec<RequestRecord>> {
        (**self).list_requests(scope, identity)
    }

    fn create_request(
        &self,
        category: &str,
        description: &str,
        identity: &Identity,
    ) -> ApiResult<RequestRecord> {
        (**self).create_request(category, description, identity)
    }

    fn delete_request(&self, id: RequestId, identity: &Identity) -> ApiResult<()> {
        (**self).delete_request(id, identity)
    }

    fn set_status(&self, id: RequestId, status: Status, identity: &Identity) -> ApiResult<()> {
        (**self).set_status(id, status, identity)
    }

    fn login(&self, username: &str, password: &str) -> ApiResult<Role> {
        (**self).login(username, password)
    }

    fn register(&self, profile: &Profile) -> ApiResult<()> {
        (**self).register(profile)
    }
}

/// Open the binding selected by `api.backend`.
pub fn connect(config: &Config) -> Result<Box<dyn RequestApi>> {
    match config.api.backend {
        #[cfg(feature = "http")]
        Backend::Http => Ok(Box::new(http::HttpApi::new(
            &config.api.base_url,
            config.api.timeout(),
        )?)),
        #[cfg(feature = "sqlite")]
        Backend::Local => Ok(Box::new(local::LocalApi::open(&config.local.db_path)?)),
        #[allow(unreachable_patterns)]
        other => Err(RqmError::InvalidConfig {
            details: format!("backend {other:?} not compiled into this build"),
        }),
    }
}
