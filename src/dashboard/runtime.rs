//! Command executor that drives the pure dashboard update loop.
//!
//! The controller owns the model and the four collaborators. Every message
//! runs through [`super::update::update`]; the returned commands are executed
//! in order, and backend results are fed back as follow-up messages until the
//! queue drains.

#![allow(missing_docs)]

use std::collections::VecDeque;

use super::model::{DashboardCmd, DashboardKind, DashboardModel, DashboardMsg};
use super::render;
use super::update::update;
use crate::api::{ApiError, ApiResult, Identity, RequestApi};
use crate::auth::session::Session;
use crate::logger::jsonl::{ActivityLog, EventType, LogEntry};
use crate::model::timestamp::CalendarZone;
use crate::notify::NotificationSink;

// ──────────────────── confirmation ────────────────────

/// Yes/no gate in front of destructive actions.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Accepts every prompt (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

/// Replays a fixed sequence of answers, then declines; records every prompt.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConfirm {
    answers: VecDeque<bool>,
    pub prompts: Vec<String>,
}

impl ScriptedConfirm {
    #[must_use]
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            prompts: Vec::new(),
        }
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        self.prompts.push(prompt.to_string());
        self.answers.pop_front().unwrap_or(false)
    }
}

impl<T: Confirm + ?Sized> Confirm for &mut T {
    fn confirm(&mut self, prompt: &str) -> bool {
        (**self).confirm(prompt)
    }
}

// ──────────────────── controller ────────────────────

/// Dashboard runtime over an API client, a notification sink, a
/// confirmation gate, and an activity log.
pub struct DashboardController<A, N, C, L> {
    model: DashboardModel,
    api: A,
    sink: N,
    confirm: C,
    log: L,
}

impl<A, N, C, L> DashboardController<A, N, C, L>
where
    A: RequestApi,
    N: NotificationSink,
    C: Confirm,
    L: ActivityLog,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: DashboardKind,
        session: Option<Session>,
        page_size: usize,
        zone: CalendarZone,
        api: A,
        sink: N,
        confirm: C,
        log: L,
    ) -> Self {
        Self {
            model: DashboardModel::new(kind, session, page_size, zone),
            api,
            sink,
            confirm,
            log,
        }
    }

    #[must_use]
    pub const fn model(&self) -> &DashboardModel {
        &self.model
    }

    pub const fn log_mut(&mut self) -> &mut L {
        &mut self.log
    }

    /// Text rendering of the current state.
    #[must_use]
    pub fn render(&self) -> String {
        render::render(&self.model)
    }

    /// Apply `msg` and run every command it (transitively) produces.
    pub fn dispatch(&mut self, msg: DashboardMsg) {
        // The model keeps only this intent's notices; the sink has the history.
        self.model.notices.clear();
        let mut queue = VecDeque::from([msg]);
        while let Some(msg) = queue.pop_front() {
            for cmd in update(&mut self.model, msg).flatten() {
                if let Some(next) = self.execute(cmd) {
                    queue.push_back(next);
                }
            }
        }
    }

    fn execute(&mut self, cmd: DashboardCmd) -> Option<DashboardMsg> {
        match cmd {
            DashboardCmd::None | DashboardCmd::Batch(_) => None,
            DashboardCmd::Fetch => {
                let scope = self.model.kind.scope();
                let result = self.with_identity(|api, who| api.list_requests(scope, who));
                let entry = match &result {
                    Ok(records) => LogEntry::succeeded(EventType::Fetch)
                        .details(format!("{} records", records.len())),
                    Err(err) => failure(EventType::Fetch, err),
                };
                self.record(entry);
                Some(DashboardMsg::Fetched(result))
            }
            DashboardCmd::Create {
                category,
                description,
            } => {
                let result = self
                    .with_identity(|api, who| api.create_request(&category, &description, who));
                let entry = match &result {
                    Ok(created) => LogEntry::succeeded(EventType::Create)
                        .request(created.id)
                        .details(category),
                    Err(err) => failure(EventType::Create, err),
                };
                self.record(entry);
                Some(DashboardMsg::Created(result))
            }
            DashboardCmd::Delete(id) => {
                let result = self.with_identity(|api, who| api.delete_request(id, who));
                let entry = match &result {
                    Ok(()) => LogEntry::succeeded(EventType::Delete),
                    Err(err) => failure(EventType::Delete, err),
                };
                self.record(entry.request(id));
                Some(DashboardMsg::Deleted { id, result })
            }
            DashboardCmd::SetStatus { id, from, to } => {
                let result = self.with_identity(|api, who| api.set_status(id, to, who));
                let entry = match &result {
                    Ok(()) => LogEntry::succeeded(EventType::StatusChange),
                    Err(err) => failure(EventType::StatusChange, err),
                };
                self.record(entry.request(id).transition(from, to));
                Some(DashboardMsg::StatusChanged {
                    id,
                    from,
                    to,
                    result,
                })
            }
            DashboardCmd::Confirm { prompt, then } => {
                self.confirm.confirm(&prompt).then_some(*then)
            }
            DashboardCmd::Notify(severity, message) => {
                self.sink.notify(severity, &message);
                None
            }
            DashboardCmd::Redirect(route) => {
                self.record(
                    LogEntry::succeeded(EventType::Redirect).details(format!("{route:?}")),
                );
                None
            }
            DashboardCmd::Record { event, details } => {
                let entry = match event {
                    EventType::ValidationFailed => {
                        LogEntry::failed(event, "validation", details)
                    }
                    _ => LogEntry::succeeded(event).details(details),
                };
                self.record(entry);
                None
            }
        }
    }

    fn with_identity<T>(&self, call: impl FnOnce(&A, &Identity) -> ApiResult<T>) -> ApiResult<T> {
        let identity = self
            .model
            .session()
            .map(Session::identity)
            .ok_or(ApiError::Unauthorized)?;
        call(&self.api, &identity)
    }

    fn record(&mut self, entry: LogEntry) {
        let entry = match self.model.session() {
            Some(session) => entry.user(session.username()),
            None => entry,
        };
        self.log.record(&entry);
    }
}

fn failure(event: EventType, err: &ApiError) -> LogEntry {
    LogEntry::failed(event, err.kind(), err.to_string())
}
