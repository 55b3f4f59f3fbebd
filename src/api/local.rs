//! Embedded SQLite backend enforcing the same rules as the REST server.
//!
//! Used for offline operation (`api.backend = "local"`) and as the fixture
//! backend in integration tests.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use sha2::{Digest, Sha256};

use super::{ApiError, ApiResult, ConflictKind, Identity, Profile, RequestApi, Role, Scope};
use crate::core::errors::{Result, RqmError};
use crate::model::record::{RequestId, RequestRecord};
use crate::model::status::Status;
use crate::model::timestamp::Timestamp;

const CATEGORY_LEN: std::ops::RangeInclusive<usize> = 2..=100;
const DESCRIPTION_LEN: std::ops::RangeInclusive<usize> = 5..=255;

/// SQLite-backed [`RequestApi`].
pub struct LocalApi {
    conn: Connection,
    path: Option<PathBuf>,
}

impl LocalApi {
    /// Open (or create) the database at `path`, applying schema and PRAGMAs.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| RqmError::io(parent, source))?;
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        apply_pragmas(&conn)?;
        apply_schema(&conn)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Throwaway in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    /// Database file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Grant the administrator role. Returns `false` when no such account.
    pub fn promote_admin(&self, username: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE users SET role = ?1 WHERE username = ?2",
            params![Role::Admin.as_str(), username],
        )?;
        Ok(changed > 0)
    }

    // ──────────────────── helpers ────────────────────

    fn authenticate(&self, username: &str, password: &str) -> ApiResult<Role> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT password_hash, salt, role FROM users WHERE username = ?1",
                params![username],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(storage)?;
        let Some((stored, salt, role)) = row else {
            return Err(ApiError::Unauthorized);
        };
        if hash_password(&salt, password) != stored {
            return Err(ApiError::Unauthorized);
        }
        role.parse()
    }

    fn fetch_one(&self, id: RequestId) -> ApiResult<RequestRecord> {
        self.conn
            .prepare_cached(SELECT_REQUEST_BY_ID)
            .map_err(storage)?
            .query_row(params![to_sql_id(id)?], map_record)
            .optional()
            .map_err(storage)?
            .ok_or(ApiError::NotFound { id })
    }
}

impl RequestApi for LocalApi {
    fn list_requests(&self, scope: Scope, identity: &Identity) -> ApiResult<Vec<RequestRecord>> {
        let role = self.authenticate(&identity.username, &identity.password)?;
        let rows = match scope {
            Scope::Admin => {
                if role != Role::Admin {
                    return Err(ApiError::Forbidden {
                        reason: "administrator role required".to_string(),
                    });
                }
                let mut stmt = self
                    .conn
                    .prepare_cached(&format!("{SELECT_REQUESTS} ORDER BY id"))
                    .map_err(storage)?;
                stmt.query_map([], map_record)
                    .map_err(storage)?
                    .collect::<std::result::Result<Vec<_>, _>>()
            }
            Scope::User => {
                let mut stmt = self
                    .conn
                    .prepare_cached(&format!("{SELECT_REQUESTS} WHERE created_by = ?1 ORDER BY id"))
                    .map_err(storage)?;
                stmt.query_map(params![identity.username], map_record)
                    .map_err(storage)?
                    .collect::<std::result::Result<Vec<_>, _>>()
            }
        };
        rows.map_err(storage)
    }

    fn create_request(
        &self,
        category: &str,
        description: &str,
        identity: &Identity,
    ) -> ApiResult<RequestRecord> {
        self.authenticate(&identity.username, &identity.password)?;
        check_length("category", category, &CATEGORY_LEN)?;
        check_length("description", description, &DESCRIPTION_LEN)?;

        let created_at = Timestamp::now_local();
        self.conn
            .prepare_cached(
                "INSERT INTO requests (category, description, created_by, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(storage)?
            .execute(params![
                category,
                description,
                identity.username,
                Status::Pending.as_str(),
                created_at.to_wire(),
            ])
            .map_err(storage)?;
        let id = u64::try_from(self.conn.last_insert_rowid()).map_err(|_| ApiError::Storage {
            details: "negative row id".to_string(),
        })?;
        self.fetch_one(id)
    }

    fn delete_request(&self, id: RequestId, identity: &Identity) -> ApiResult<()> {
        self.authenticate(&identity.username, &identity.password)?;
        let record = self.fetch_one(id)?;
        if record.created_by != identity.username {
            return Err(ApiError::Forbidden {
                reason: "only the creator may delete a request".to_string(),
            });
        }
        if record.is_closed() {
            return Err(ApiError::Forbidden {
                reason: format!("request is {}", record.status),
            });
        }
        self.conn
            .execute("DELETE FROM requests WHERE id = ?1", params![to_sql_id(id)?])
            .map_err(storage)?;
        Ok(())
    }

    fn set_status(&self, id: RequestId, status: Status, identity: &Identity) -> ApiResult<()> {
        let role = self.authenticate(&identity.username, &identity.password)?;
        if role != Role::Admin {
            return Err(ApiError::Forbidden {
                reason: "administrator role required".to_string(),
            });
        }
        let record = self.fetch_one(id)?;
        if record.is_closed() {
            return Err(ApiError::Forbidden {
                reason: format!("request is {}", record.status),
            });
        }
        self.conn
            .execute(
                "UPDATE requests SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![
                    status.as_str(),
                    Timestamp::now_local().to_wire(),
                    to_sql_id(id)?
                ],
            )
            .map_err(storage)?;
        Ok(())
    }

    fn login(&self, username: &str, password: &str) -> ApiResult<Role> {
        self.authenticate(username, password)
    }

    fn register(&self, profile: &Profile) -> ApiResult<()> {
        let taken = |column: &str, value: &str| -> ApiResult<bool> {
            self.conn
                .query_row(
                    &format!("SELECT 1 FROM users WHERE {column} = ?1"),
                    params![value],
                    |_| Ok(()),
                )
                .optional()
                .map(|row| row.is_some())
                .map_err(storage)
        };
        if taken("username", &profile.username)? {
            return Err(ApiError::Conflict(ConflictKind::Username));
        }
        if taken("email", &profile.email)? {
            return Err(ApiError::Conflict(ConflictKind::Email));
        }

        let salt = format!("{:032x}", rand::random::<u128>());
        self.conn
            .execute(
                "INSERT INTO users (name, email, username, password_hash, salt, role)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    profile.name,
                    profile.email,
                    profile.username,
                    hash_password(&salt, &profile.password),
                    salt,
                    Role::User.as_str(),
                ],
            )
            .map_err(storage)?;
        Ok(())
    }
}

// ──────────────────── schema ────────────────────

const SELECT_REQUESTS: &str =
    "SELECT id, category, description, created_by, status, created_at, updated_at FROM requests";
const SELECT_REQUEST_BY_ID: &str = "SELECT id, category, description, created_by, status, \
     created_at, updated_at FROM requests WHERE id = ?1";

fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            salt TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'USER'
        );

        CREATE TABLE IF NOT EXISTS requests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category TEXT NOT NULL,
            description TEXT NOT NULL,
            created_by TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT,
            updated_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_requests_created_by ON requests(created_by);",
    )?;
    Ok(())
}

fn map_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RequestRecord> {
    let id: i64 = row.get(0)?;
    let status: String = row.get(4)?;
    let created_at: Option<String> = row.get(5)?;
    let updated_at: Option<String> = row.get(6)?;
    Ok(RequestRecord {
        id: u64::try_from(id).unwrap_or_default(),
        category: row.get(1)?,
        description: row.get(2)?,
        created_by: row.get(3)?,
        status: status.parse().map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(err))
        })?,
        created_at: created_at.as_deref().map(Timestamp::parse),
        updated_at: updated_at.as_deref().map(Timestamp::parse),
    })
}

fn to_sql_id(id: RequestId) -> ApiResult<i64> {
    i64::try_from(id).map_err(|_| ApiError::NotFound { id })
}

fn check_length(
    field: &str,
    value: &str,
    allowed: &std::ops::RangeInclusive<usize>,
) -> ApiResult<()> {
    let len = value.trim().chars().count();
    if allowed.contains(&len) {
        Ok(())
    } else {
        Err(ApiError::Rejected {
            details: format!(
                "{field} must be between {} and {} characters",
                allowed.start(),
                allowed.end()
            ),
        })
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();
    let mut s = String::with_capacity(digest.len() * 2);
    for b in digest {
        let _ = write!(s, "{b:02x}");
    }
    s
}

#[allow(clippy::needless_pass_by_value)]
fn storage(err: rusqlite::Error) -> ApiError {
    ApiError::Storage {
        details: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(username: &str, email: &str) -> Profile {
        Profile {
            name: format!("{username} name"),
            email: email.to_string(),
            username: username.to_string(),
            password: "Secr3t!x".to_string(),
        }
    }

    fn seeded() -> (LocalApi, Identity, Identity) {
        let api = LocalApi::in_memory().unwrap();
        api.register(&profile("root", "root@example.com")).unwrap();
        api.register(&profile("asha", "asha@example.com")).unwrap();
        assert!(api.promote_admin("root").unwrap());
        (
            api,
            Identity::new("root", "Secr3t!x"),
            Identity::new("asha", "Secr3t!x"),
        )
    }

    #[test]
    fn login_reports_role_and_rejects_bad_password() {
        let (api, _, _) = seeded();
        assert_eq!(api.login("root", "Secr3t!x"), Ok(Role::Admin));
        assert_eq!(api.login("asha", "Secr3t!x"), Ok(Role::User));
        assert_eq!(api.login("asha", "wrong"), Err(ApiError::Unauthorized));
        assert_eq!(api.login("nobody", "x"), Err(ApiError::Unauthorized));
    }

    #[test]
    fn registration_conflicts_name_the_field() {
        let (api, _, _) = seeded();
        assert_eq!(
            api.register(&profile("asha", "other@example.com")),
            Err(ApiError::Conflict(ConflictKind::Username))
        );
        assert_eq!(
            api.register(&profile("newbie", "asha@example.com")),
            Err(ApiError::Conflict(ConflictKind::Email))
        );
    }

    #[test]
    fn new_requests_start_pending_without_update_time() {
        let (api, _, user) = seeded();
        let record = api
            .create_request("Plumbing", "Leaking tap in kitchen", &user)
            .unwrap();
        assert_eq!(record.status, Status::Pending);
        assert_eq!(record.created_by, "asha");
        assert!(matches!(record.created_at, Some(Timestamp::Naive(_))));
        assert!(record.updated_at.is_none());
    }

    #[test]
    fn create_enforces_field_lengths() {
        let (api, _, user) = seeded();
        assert!(matches!(
            api.create_request("X", "Long enough text", &user),
            Err(ApiError::Rejected { .. })
        ));
        assert!(matches!(
            api.create_request("IT", "tiny", &user),
            Err(ApiError::Rejected { .. })
        ));
    }

    #[test]
    fn user_scope_lists_only_own_requests() {
        let (api, admin, user) = seeded();
        api.create_request("IT", "Laptop will not boot", &user).unwrap();
        api.create_request("HR", "Update payroll address", &admin).unwrap();

        let mine = api.list_requests(Scope::User, &user).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].created_by, "asha");

        let all = api.list_requests(Scope::Admin, &admin).unwrap();
        assert_eq!(all.len(), 2);
        assert!(matches!(
            api.list_requests(Scope::Admin, &user),
            Err(ApiError::Forbidden { .. })
        ));
    }

    #[test]
    fn only_admins_change_status_and_terminal_records_freeze() {
        let (api, admin, user) = seeded();
        let id = api.create_request("IT", "Printer jammed again", &user).unwrap().id;

        assert!(matches!(
            api.set_status(id, Status::InProgress, &user),
            Err(ApiError::Forbidden { .. })
        ));
        api.set_status(id, Status::Resolved, &admin).unwrap();
        let record = api.fetch_one(id).unwrap();
        assert_eq!(record.status, Status::Resolved);
        assert!(record.updated_at.is_some());

        assert!(matches!(
            api.set_status(id, Status::Pending, &admin),
            Err(ApiError::Forbidden { .. })
        ));
        assert!(matches!(
            api.delete_request(id, &user),
            Err(ApiError::Forbidden { .. })
        ));
    }

    #[test]
    fn only_the_owner_may_delete() {
        let (api, admin, user) = seeded();
        let id = api.create_request("IT", "Monitor flickers", &user).unwrap().id;
        assert!(matches!(
            api.delete_request(id, &admin),
            Err(ApiError::Forbidden { .. })
        ));
        api.delete_request(id, &user).unwrap();
        assert_eq!(api.delete_request(id, &user), Err(ApiError::NotFound { id }));
    }

    #[test]
    fn database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("requests.db");
        {
            let api = LocalApi::open(&path).unwrap();
            api.register(&profile("asha", "asha@example.com")).unwrap();
            api.create_request("IT", "VPN drops hourly", &Identity::new("asha", "Secr3t!x"))
                .unwrap();
        }
        let api = LocalApi::open(&path).unwrap();
        assert_eq!(api.path(), Some(path.as_path()));
        let mine = api
            .list_requests(Scope::User, &Identity::new("asha", "Secr3t!x"))
            .unwrap();
        assert_eq!(mine.len(), 1);
    }

    #[test]
    fn password_hash_depends_on_salt() {
        assert_ne!(hash_password("a", "pw"), hash_password("b", "pw"));
        assert_eq!(hash_password("a", "pw").len(), 64);
    }
}
