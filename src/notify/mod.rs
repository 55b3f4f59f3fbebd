//! Operator notifications: success and failure notices raised by the
//! dashboard and the auth flows.
//!
//! Sinks are fire-and-forget. A sink that cannot deliver drops the notice;
//! nothing here ever reports failure back to the caller.

#![allow(missing_docs)]

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// ──────────────────── severity ────────────────────

/// Notice severity, ordered for `min_level` filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A delivered notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

// ──────────────────── configuration ────────────────────

/// `[notifications]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationConfig {
    /// Terminal notices below this level are suppressed.
    pub min_level: Severity,
    /// Colorize terminal notices.
    pub color: bool,
    pub file: FileConfig,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            min_level: Severity::Info,
            color: true,
            file: FileConfig::default(),
        }
    }
}

/// Append-only JSONL copy of every notice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
        Self {
            enabled: false,
            path: home
                .join(".local")
                .join("share")
                .join("rqm")
                .join("notifications.jsonl"),
        }
    }
}

// ──────────────────── sinks ────────────────────

/// Receiver of user-visible notices. Never blocks, never fails.
pub trait NotificationSink {
    fn notify(&self, severity: Severity, message: &str);
}

impl<T: NotificationSink + ?Sized> NotificationSink for &T {
    fn notify(&self, severity: Severity, message: &str) {
        (**self).notify(severity, message);
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for Box<T> {
    fn notify(&self, severity: Severity, message: &str) {
        (**self).notify(severity, message);
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn notify(&self, severity: Severity, message: &str) {
        (**self).notify(severity, message);
    }
}

// ──── Terminal (stderr) ────

/// Prints notices to stderr, colored by severity.
#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct TerminalSink {
    min_level: Severity,
    color: bool,
}

#[cfg(feature = "cli")]
impl TerminalSink {
    #[must_use]
    pub const fn new(min_level: Severity, color: bool) -> Self {
        Self { min_level, color }
    }

    fn render(&self, severity: Severity, message: &str) -> String {
        use colored::Colorize;

        let tag = format!("[{severity}]");
        if !self.color {
            return format!("{tag} {message}");
        }
        let tag = match severity {
            Severity::Info => tag.cyan(),
            Severity::Success => tag.green().bold(),
            Severity::Warning => tag.yellow().bold(),
            Severity::Error => tag.red().bold(),
        };
        format!("{tag} {message}")
    }
}

#[cfg(feature = "cli")]
impl NotificationSink for TerminalSink {
    fn notify(&self, severity: Severity, message: &str) {
        if severity < self.min_level {
            return;
        }
        let line = self.render(severity, message);
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }
}

// ──── File (append-only JSONL) ────

#[derive(Debug, Serialize)]
struct NoticeRecord<'a> {
    ts: String,
    severity: Severity,
    message: &'a str,
}

/// Appends one JSON object per notice.
#[derive(Debug, Clone)]
pub struct JsonlFileSink {
    path: PathBuf,
}

impl JsonlFileSink {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl NotificationSink for JsonlFileSink {
    fn notify(&self, severity: Severity, message: &str) {
        let record = NoticeRecord {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            severity,
            message,
        };
        let Ok(json) = serde_json::to_string(&record) else {
            return;
        };
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let file = {
            let mut opts = OpenOptions::new();
            opts.create(true).append(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt as _;
                opts.mode(0o600);
            }
            opts.open(&self.path)
        };
        if let Ok(mut f) = file {
            let _ = writeln!(f, "{json}");
        }
    }
}

// ──── Memory ────

/// Records notices for later inspection; also backs `--json` output.
#[derive(Debug, Default)]
pub struct MemorySink {
    notices: Mutex<Vec<Notice>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, severity: Severity, message: &str) {
        self.notices.lock().push(Notice::new(severity, message));
    }
}

// ──── Fan-out ────

/// Delivers each notice to every inner sink, in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl FanoutSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Terminal sink (when built with the CLI) plus the optional JSONL file.
    #[must_use]
    pub fn from_config(config: &NotificationConfig, color: bool) -> Self {
        let mut fanout = Self::new();
        #[cfg(feature = "cli")]
        {
            fanout = fanout.with(TerminalSink::new(config.min_level, config.color && color));
        }
        #[cfg(not(feature = "cli"))]
        let _ = color;
        if config.file.enabled {
            fanout = fanout.with(JsonlFileSink::new(config.file.path.clone()));
        }
        fanout
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl NotificationSink for FanoutSink {
    fn notify(&self, severity: Severity, message: &str) {
        for sink in &self.sinks {
            sink.notify(severity, message);
        }
    }
}

impl fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanoutSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

// ──────────────────── tests ────────────────────
