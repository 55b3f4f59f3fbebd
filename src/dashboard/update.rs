//! Pure update function for the request dashboards.
//!
//! `update()` takes the current model and a message, mutates the model, and
//! returns the command describing any side-effects. It performs no I/O.

use super::model::{
    CREATE_FAILED, CREATE_SUCCEEDED, DELETE_FAILED, DELETE_SUCCEEDED, DashboardCmd,
    DashboardKind, DashboardModel, DashboardMsg, Draft, FIELDS_REQUIRED, NOT_LOGGED_IN, Route,
    STATUS_FAILED, STATUS_SUCCEEDED,
};
use crate::logger::jsonl::EventType;
use crate::model::transition::{DELETE_PROMPT, can_delete, can_transition, transition_prompt};
use crate::notify::{Notice, Severity};
use crate::view::query::{FilterState, SortOrder};

/// Apply `msg` to `model` and return the next command for the runtime.
pub fn update(model: &mut DashboardModel, msg: DashboardMsg) -> DashboardCmd {
    match msg {
        DashboardMsg::Mount => {
            if model.session().is_none() {
                model.redirect = Some(Route::Login);
                return DashboardCmd::Batch(vec![
                    notify(model, Severity::Error, NOT_LOGGED_IN),
                    DashboardCmd::Redirect(Route::Login),
                ]);
            }
            fetch(model)
        }

        DashboardMsg::Refresh => fetch(model),

        DashboardMsg::Fetched(Ok(records)) => {
            model.loading = false;
            model.records = records;
            clamp_page(model);
            DashboardCmd::None
        }

        DashboardMsg::Fetched(Err(_)) => {
            // Keep the stale list visible.
            model.loading = false;
            let message = model.kind.fetch_failed_message();
            notify(model, Severity::Error, message)
        }

        // ──── filters ────
        DashboardMsg::SetStatusFilter(status) => {
            set_filter(model, |f| f.status = status);
            DashboardCmd::None
        }
        DashboardMsg::SetCategoryFilter(category) => {
            if model.kind == DashboardKind::Admin {
                set_filter(model, |f| f.category = category);
            }
            DashboardCmd::None
        }
        DashboardMsg::SetCreatorFilter(created_by) => {
            if model.kind == DashboardKind::Admin {
                set_filter(model, |f| f.created_by = created_by);
            }
            DashboardCmd::None
        }
        DashboardMsg::SetDateFilter(day) => {
            set_filter(model, |f| f.created_on = day);
            DashboardCmd::None
        }
        DashboardMsg::SetSortOrder(order) => {
            set_filter(model, |f| f.sort_order = order);
            DashboardCmd::None
        }
        DashboardMsg::GoToPage(page) => {
            model.filters.page = page.max(1);
            DashboardCmd::None
        }
        DashboardMsg::ClearFilters => {
            model.filters = FilterState::default();
            if model.kind == DashboardKind::User {
                model.draft = Draft::default();
            }
            DashboardCmd::None
        }

        // ──── create ────
        DashboardMsg::OpenCreateForm => {
            if model.kind == DashboardKind::User {
                model.form_open = true;
            }
            DashboardCmd::None
        }
        DashboardMsg::CloseCreateForm => {
            model.form_open = false;
            DashboardCmd::None
        }
        DashboardMsg::SetDraftCategory(category) => {
            model.draft.category = category;
            DashboardCmd::None
        }
        DashboardMsg::SetDraftDescription(description) => {
            model.draft.description = description;
            DashboardCmd::None
        }
        DashboardMsg::SubmitCreate => {
            if model.kind != DashboardKind::User || model.session().is_none() {
                return DashboardCmd::None;
            }
            if !model.draft.is_complete() {
                return DashboardCmd::Batch(vec![
                    notify(model, Severity::Warning, FIELDS_REQUIRED),
                    DashboardCmd::Record {
                        event: EventType::ValidationFailed,
                        details: "create: blank category or description".to_string(),
                    },
                ]);
            }
            DashboardCmd::Create {
                category: model.draft.category.trim().to_string(),
                description: model.draft.description.trim().to_string(),
            }
        }
        DashboardMsg::Created(Ok(_)) => {
            model.draft = Draft::default();
            model.filters.status = None;
            model.filters.created_on = None;
            model.filters.sort_order = SortOrder::Newest;
            model.filters.page = 1;
            model.form_open = false;
            DashboardCmd::Batch(vec![
                notify(model, Severity::Success, CREATE_SUCCEEDED),
                fetch(model),
            ])
        }
        DashboardMsg::Created(Err(_)) => notify(model, Severity::Error, CREATE_FAILED),

        // ──── delete ────
        DashboardMsg::RequestDelete(id) => {
            if model.kind != DashboardKind::User || model.session().is_none() {
                return DashboardCmd::None;
            }
            if let Some(record) = model.record(id)
                && !can_delete(record.status)
            {
                let message = format!("Request #{id} is {} and cannot be deleted", record.status.label());
                return notify(model, Severity::Warning, &message);
            }
            DashboardCmd::Confirm {
                prompt: DELETE_PROMPT.to_string(),
                then: Box::new(DashboardMsg::DeleteConfirmed(id)),
            }
        }
        DashboardMsg::DeleteConfirmed(id) => {
            if model.session().is_none() {
                return DashboardCmd::None;
            }
            DashboardCmd::Delete(id)
        }
        DashboardMsg::Deleted { result: Ok(()), .. } => DashboardCmd::Batch(vec![
            notify(model, Severity::Success, DELETE_SUCCEEDED),
            fetch(model),
        ]),
        DashboardMsg::Deleted { result: Err(_), .. } => {
            notify(model, Severity::Error, DELETE_FAILED)
        }

        // ──── status ────
        DashboardMsg::RequestStatusChange { id, to } => {
            if model.kind != DashboardKind::Admin || model.session().is_none() {
                return DashboardCmd::None;
            }
            let Some(from) = model.record(id).map(|r| r.status) else {
                let message = format!("Request #{id} is not in the current list");
                return notify(model, Severity::Warning, &message);
            };
            if !can_transition(from) {
                let message = format!("Request #{id} is {} and can no longer change", from.label());
                return notify(model, Severity::Warning, &message);
            }
            if from == to {
                return DashboardCmd::None;
            }
            DashboardCmd::Confirm {
                prompt: transition_prompt(from, to),
                then: Box::new(DashboardMsg::StatusChangeConfirmed { id, from, to }),
            }
        }
        DashboardMsg::StatusChangeConfirmed { id, from, to } => {
            if model.session().is_none() {
                return DashboardCmd::None;
            }
            DashboardCmd::SetStatus { id, from, to }
        }
        DashboardMsg::StatusChanged { result: Ok(()), .. } => DashboardCmd::Batch(vec![
            notify(model, Severity::Success, STATUS_SUCCEEDED),
            fetch(model),
        ]),
        DashboardMsg::StatusChanged { result: Err(_), .. } => {
            notify(model, Severity::Error, STATUS_FAILED)
        }

        DashboardMsg::Logout => {
            let username = model
                .session()
                .map(|s| s.username().to_string())
                .unwrap_or_default();
            model.end_session();
            model.records.clear();
            model.draft = Draft::default();
            model.form_open = false;
            model.redirect = Some(Route::Login);
            let message = model.kind.logout_message();
            DashboardCmd::Batch(vec![
                notify(model, Severity::Success, message),
                DashboardCmd::Record {
                    event: EventType::Logout,
                    details: username,
                },
                DashboardCmd::Redirect(Route::Login),
            ])
        }
    }
}

/// Logged-out dashboards never reach the backend.
fn fetch(model: &mut DashboardModel) -> DashboardCmd {
    if model.session().is_none() {
        return DashboardCmd::None;
    }
    model.loading = true;
    DashboardCmd::Fetch
}

fn notify(model: &mut DashboardModel, severity: Severity, message: &str) -> DashboardCmd {
    model.notices.push(Notice::new(severity, message));
    DashboardCmd::Notify(severity, message.to_string())
}

/// Any filter or sort change returns to the first page.
fn set_filter(model: &mut DashboardModel, apply: impl FnOnce(&mut FilterState)) {
    apply(&mut model.filters);
    model.filters.page = 1;
}

/// After a refetch the list may have shrunk under the current page.
fn clamp_page(model: &mut DashboardModel) {
    let total_pages = model.view().total_pages;
    if total_pages > 0 && model.filters.page > total_pages {
        model.filters.page = total_pages;
    }
}
