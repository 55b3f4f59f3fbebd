//! REST binding over `reqwest`'s blocking client.
//!
//! Every call carries HTTP Basic credentials from the caller's identity.
//! Status codes map onto [`ApiError`]: 401 unauthorized, 403 forbidden,
//! 404 not found, other 4xx rejected, 5xx and transport failures network.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Serialize;

use super::{ApiError, ApiResult, ConflictKind, Identity, Profile, RequestApi, Role, Scope};
use crate::core::errors::{Result, RqmError};
use crate::model::record::{RequestId, RequestRecord};
use crate::model::status::Status;

/// Blocking REST client rooted at `base_url`.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: String,
    client: Client,
}

#[derive(Serialize)]
struct NewRequest<'a> {
    category: &'a str,
    description: &'a str,
}

impl HttpApi {
    /// Build a client; `timeout` bounds each whole request.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = reqwest::Url::parse(base_url).map_err(|e| RqmError::InvalidConfig {
            details: format!("api.base_url {base_url:?}: {e}"),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RqmError::InvalidConfig {
                details: format!("api.base_url must be http(s), got {base_url:?}"),
            });
        }
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| RqmError::Runtime {
                details: format!("http client init: {e}"),
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authed(builder: RequestBuilder, identity: &Identity) -> RequestBuilder {
        builder.basic_auth(&identity.username, Some(&identity.password))
    }
}

impl RequestApi for HttpApi {
    fn list_requests(&self, scope: Scope, identity: &Identity) -> ApiResult<Vec<RequestRecord>> {
        let path = match scope {
            Scope::Admin => "/api/requests",
            Scope::User => "/api/user/requests",
        };
        let resp = send(Self::authed(self.client.get(self.url(path)), identity))?;
        resp.json().map_err(|e| ApiError::Protocol {
            details: format!("request list: {e}"),
        })
    }

    fn create_request(
        &self,
        category: &str,
        description: &str,
        identity: &Identity,
    ) -> ApiResult<RequestRecord> {
        let body = NewRequest {
            category,
            description,
        };
        let builder = self.client.post(self.url("/api/requests")).json(&body);
        let resp = send(Self::authed(builder, identity))?;
        resp.json().map_err(|e| ApiError::Protocol {
            details: format!("created request: {e}"),
        })
    }

    fn delete_request(&self, id: RequestId, identity: &Identity) -> ApiResult<()> {
        let builder = self.client.delete(self.url(&format!("/api/requests/{id}")));
        send_for(Self::authed(builder, identity), Some(id)).map(drop)
    }

    fn set_status(&self, id: RequestId, status: Status, identity: &Identity) -> ApiResult<()> {
        let builder = self
            .client
            .put(self.url(&format!("/api/requests/{id}/status")))
            .query(&[("status", status.as_str())]);
        send_for(Self::authed(builder, identity), Some(id)).map(drop)
    }

    fn login(&self, username: &str, password: &str) -> ApiResult<Role> {
        let identity = Identity::new(username, password);
        let resp = send(Self::authed(
            self.client.get(self.url("/api/users/login")),
            &identity,
        ))?;
        let body = resp.text().map_err(|e| ApiError::Protocol {
            details: format!("login body: {e}"),
        })?;
        body.parse()
    }

    fn register(&self, profile: &Profile) -> ApiResult<()> {
        let builder = self.client.post(self.url("/api/users/register")).json(profile);
        send(builder).map(drop)
    }
}

fn send(builder: RequestBuilder) -> ApiResult<Response> {
    send_for(builder, None)
}

fn send_for(builder: RequestBuilder, id: Option<RequestId>) -> ApiResult<Response> {
    let resp = builder.send().map_err(|e| ApiError::Network {
        details: e.to_string(),
    })?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(classify(status, &body, id))
}

/// Map a non-success response onto the error taxonomy.
fn classify(status: StatusCode, body: &str, id: Option<RequestId>) -> ApiError {
    let body = body.trim();
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::FORBIDDEN => ApiError::Forbidden {
            reason: non_empty(body, "forbidden"),
        },
        StatusCode::NOT_FOUND => match id {
            Some(id) => ApiError::NotFound { id },
            None => ApiError::Rejected {
                details: non_empty(body, "not found"),
            },
        },
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT if body.eq_ignore_ascii_case("Username already exists") => {
            ApiError::Conflict(ConflictKind::Username)
        }
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT if body.eq_ignore_ascii_case("Email already exists") => {
            ApiError::Conflict(ConflictKind::Email)
        }
        s if s.is_client_error() => ApiError::Rejected {
            details: format!("{s}: {}", non_empty(body, "no details")),
        },
        s => ApiError::Network {
            details: format!("{s}: {}", non_empty(body, "no details")),
        },
    }
}

fn non_empty(body: &str, fallback: &str) -> String {
    if body.is_empty() {
        fallback.to_string()
    } else {
        body.to_string()
    }
}
