//! Activity log: append-only JSONL, one self-contained object per line.
//!
//! Each line is serialized in memory and handed to the file with a single
//! `write_all`, so a concurrent `tail -f` never sees half a record.
//!
//! Delivery degrades instead of failing:
//! 1. primary file
//! 2. fallback file
//! 3. stderr, prefixed `[RQM-LOG]`
//! 4. discard

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, RqmError};
use crate::model::record::RequestId;
use crate::model::status::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Login,
    Logout,
    Register,
    Fetch,
    Create,
    Delete,
    StatusChange,
    Redirect,
    ValidationFailed,
}

impl EventType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Register => "register",
            Self::Fetch => "fetch",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::StatusChange => "status_change",
            Self::Redirect => "redirect",
            Self::ValidationFailed => "validation_failed",
        }
    }
}

/// One activity record. Only `ts`, `event` and `severity` are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC, millisecond precision.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    /// `RQM-xxxx` code or API failure kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// New entry stamped with the current UTC time.
    #[must_use]
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            event,
            severity,
            user: None,
            request_id: None,
            from_status: None,
            to_status: None,
            ok: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }

    /// Successful outcome at `info`.
    #[must_use]
    pub fn succeeded(event: EventType) -> Self {
        Self {
            ok: Some(true),
            ..Self::new(event, Severity::Info)
        }
    }

    /// Failed outcome at `warning`, carrying the failure code and message.
    #[must_use]
    pub fn failed(event: EventType, code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: Some(false),
            error_code: Some(code.to_string()),
            error_message: Some(message.into()),
            ..Self::new(event, Severity::Warning)
        }
    }

    #[must_use]
    pub fn user(mut self, user: &str) -> Self {
        self.user = Some(user.to_string());
        self
    }

    #[must_use]
    pub const fn request(mut self, id: RequestId) -> Self {
        self.request_id = Some(id);
        self
    }

    #[must_use]
    pub const fn transition(mut self, from: Status, to: Status) -> Self {
        self.from_status = Some(from);
        self.to_status = Some(to);
        self
    }

    #[must_use]
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Destination for activity entries.
pub trait ActivityLog {
    fn record(&mut self, entry: &LogEntry);
}

/// Collects entries in memory.
impl ActivityLog for Vec<LogEntry> {
    fn record(&mut self, entry: &LogEntry) {
        self.push(entry.clone());
    }
}

impl<T: ActivityLog + ?Sized> ActivityLog for &mut T {
    fn record(&mut self, entry: &LogEntry) {
        (**self).record(entry);
    }
}

/// Drops every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLog;

impl ActivityLog for NullLog {
    fn record(&mut self, _entry: &LogEntry) {}
}

// ──────────────────────── writer ────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sink {
    Primary,
    Fallback,
    Stderr,
    Discard,
}

#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    /// Rotate once the current file would exceed this size.
    pub max_size_bytes: u64,
    /// Rotated generations kept (`.1` newest).
    pub max_rotated_files: u32,
}

impl JsonlConfig {
    /// Defaults for `path`: 5 MiB files, three generations, fallback in the
    /// system temp directory.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fallback_path: Some(std::env::temp_dir().join("rqm-activity.jsonl")),
            max_size_bytes: 5 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

/// Line-per-record activity writer with rotation and fallback.
#[derive(Debug)]
pub struct JsonlWriter {
    config: JsonlConfig,
    file: Option<File>,
    sink: Sink,
    bytes_written: u64,
}

impl JsonlWriter {
    /// Open the log, falling through the chain when the primary is unusable.
    #[must_use]
    pub fn open(config: JsonlConfig) -> Self {
        let mut writer = Self {
            config,
            file: None,
            sink: Sink::Discard,
            bytes_written: 0,
        };
        match open_append(&writer.config.path) {
            Ok((file, size)) => {
                writer.file = Some(file);
                writer.sink = Sink::Primary;
                writer.bytes_written = size;
            }
            Err(_) => writer.open_fallback(),
        }
        writer
    }

    pub fn write_entry(&mut self, entry: &LogEntry) {
        match serde_json::to_string(entry) {
            Ok(json) => self.write_line(&format!("{json}\n")),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[RQM-LOG] serialize error: {e}");
            }
        }
    }

    /// `primary`, `fallback`, `stderr` or `discard`.
    #[must_use]
    pub const fn state(&self) -> &'static str {
        match self.sink {
            Sink::Primary => "primary",
            Sink::Fallback => "fallback",
            Sink::Stderr => "stderr",
            Sink::Discard => "discard",
        }
    }

    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn current_path(&self) -> Option<&Path> {
        match self.sink {
            Sink::Primary => Some(&self.config.path),
            Sink::Fallback => self.config.fallback_path.as_deref(),
            Sink::Stderr | Sink::Discard => None,
        }
    }

    fn write_line(&mut self, line: &str) {
        let len = line.len() as u64;
        if self.file.is_some() && self.bytes_written + len > self.config.max_size_bytes {
            self.rotate();
        }
        match self.sink {
            Sink::Primary | Sink::Fallback => {
                let written = self
                    .file
                    .as_mut()
                    .is_some_and(|f| f.write_all(line.as_bytes()).is_ok());
                if written {
                    self.bytes_written += len;
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            Sink::Stderr => {
                if write!(io::stderr(), "[RQM-LOG] {line}").is_err() {
                    self.sink = Sink::Discard;
                }
            }
            Sink::Discard => {}
        }
    }

    fn open_fallback(&mut self) {
        self.file = None;
        let opened = self
            .config
            .fallback_path
            .as_deref()
            .and_then(|p| open_append(p).ok().map(|opened| (p.display().to_string(), opened)));
        if let Some((shown, (file, size))) = opened {
            let _ = writeln!(io::stderr(), "[RQM-LOG] activity log falling back to {shown}");
            self.file = Some(file);
            self.sink = Sink::Fallback;
            self.bytes_written = size;
        } else {
            let _ = writeln!(io::stderr(), "[RQM-LOG] activity log unwritable, using stderr");
            self.sink = Sink::Stderr;
        }
    }

    fn degrade(&mut self) {
        self.file = None;
        match self.sink {
            Sink::Primary => self.open_fallback(),
            Sink::Fallback => self.sink = Sink::Stderr,
            Sink::Stderr | Sink::Discard => self.sink = Sink::Discard,
        }
    }

    fn rotate(&mut self) {
        self.file = None;
        let Some(base) = self.current_path().map(Path::to_path_buf) else {
            return;
        };
        let keep = self.config.max_rotated_files;
        let _ = fs::remove_file(rotated_name(&base, keep));
        for i in (1..keep).rev() {
            let _ = fs::rename(rotated_name(&base, i), rotated_name(&base, i + 1));
        }
        if keep > 0 {
            let _ = fs::rename(&base, rotated_name(&base, 1));
        } else {
            let _ = fs::remove_file(&base);
        }
        match open_append(&base) {
            Ok((file, size)) => {
                self.file = Some(file);
                self.bytes_written = size;
            }
            Err(_) => self.degrade(),
        }
    }
}

impl ActivityLog for JsonlWriter {
    fn record(&mut self, entry: &LogEntry) {
        self.write_entry(entry);
    }
}

// ──────────────────────── helpers ────────────────────────

/// Open or create for append; returns the file and its current size.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| RqmError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| RqmError::io(path, source))?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

/// `activity.jsonl` → `activity.jsonl.2`.
fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

/// Read back every parseable entry from `path`, skipping damaged lines.
pub fn read_entries(path: &Path) -> Result<Vec<LogEntry>> {
    let raw = fs::read_to_string(path).map_err(|e| RqmError::io(path, e))?;
    Ok(raw
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

// ──────────────────────── tests ────────────────────────
