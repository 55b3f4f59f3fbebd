//! Dashboard controllers driven against the embedded backend.

use std::cmp::Ordering;

use request_manager::api::local::LocalApi;
use request_manager::api::{Identity, Profile, RequestApi, Role};
use request_manager::auth::forms::{self, Landing};
use request_manager::auth::session::{Session, SessionStore};
use request_manager::dashboard::model::{DashboardKind, DashboardMsg};
use request_manager::dashboard::runtime::{AssumeYes, DashboardController, ScriptedConfirm};
use request_manager::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, read_entries};
use request_manager::model::status::Status;
use request_manager::model::timestamp::CalendarZone;
use request_manager::notify::{MemorySink, Severity};
use request_manager::view::query::SortOrder;

const PASSWORD: &str = "Secret#123";

fn profile(username: &str) -> Profile {
    Profile {
        name: username.to_uppercase(),
        email: format!("{username}@example.com"),
        username: username.into(),
        password: PASSWORD.into(),
    }
}

fn backend(dir: &std::path::Path) -> LocalApi {
    let api = LocalApi::open(&dir.join("requests.sqlite3")).unwrap();
    for name in ["asha", "ben", "boss"] {
        api.register(&profile(name)).unwrap();
    }
    api.promote_admin("boss").unwrap();
    api
}

fn session_for(api: &LocalApi, username: &str) -> (Session, Landing) {
    forms::login(api, username, PASSWORD).unwrap()
}

#[test]
fn admin_pages_twenty_five_pending_requests() {
    let dir = tempfile::tempdir().unwrap();
    let api = backend(dir.path());
    let asha = Identity::new("asha", PASSWORD);
    for n in 0..25 {
        api.create_request("IT", &format!("ticket number {n}"), &asha)
            .unwrap();
    }

    let (session, landing) = session_for(&api, "boss");
    assert_eq!(landing, Landing::AdminDashboard);
    let sink = MemorySink::new();
    let mut ctl = DashboardController::new(
        DashboardKind::Admin,
        Some(session),
        20,
        CalendarZone::Local,
        &api,
        &sink,
        AssumeYes,
        Vec::<LogEntry>::new(),
    );
    ctl.dispatch(DashboardMsg::Mount);

    let view = ctl.model().view();
    assert_eq!(view.page.len(), 20);
    assert_eq!(view.total_pages, 2);
    assert!(view.page.windows(2).all(|w| {
        CalendarZone::Local.compare(w[0].created_at.as_ref(), w[1].created_at.as_ref(), false)
            != Ordering::Less
    }));

    ctl.dispatch(DashboardMsg::GoToPage(2));
    assert_eq!(ctl.model().view().page.len(), 5);

    ctl.dispatch(DashboardMsg::SetStatusFilter(Some(Status::Resolved)));
    let view = ctl.model().view();
    assert!(view.page.is_empty());
    assert_eq!(view.total_pages, 0);
    assert!(ctl.render().contains("No matching service requests found."));
}

#[test]
fn user_lifecycle_with_activity_log() {
    let dir = tempfile::tempdir().unwrap();
    let api = backend(dir.path());
    let log_path = dir.path().join("activity.jsonl");
    let mut log = JsonlWriter::open(JsonlConfig::at(&log_path));

    let (session, landing) = session_for(&api, "asha");
    assert_eq!(landing, Landing::UserDashboard);
    assert_eq!(session.role(), Role::User);

    let store = SessionStore::new(dir.path().join("session.json"));
    store.save(&session).unwrap();
    let restored = store.load().unwrap();

    let sink = MemorySink::new();
    let mut ctl = DashboardController::new(
        DashboardKind::User,
        restored,
        10,
        CalendarZone::Local,
        &api,
        &sink,
        ScriptedConfirm::new([true]),
        &mut log,
    );
    ctl.dispatch(DashboardMsg::Mount);
    assert!(ctl.model().records.is_empty());
    assert!(ctl.render().contains("No matching requests found."));

    ctl.dispatch(DashboardMsg::OpenCreateForm);
    ctl.dispatch(DashboardMsg::SetDraftCategory("Facilities".into()));
    ctl.dispatch(DashboardMsg::SetDraftDescription(String::new()));
    ctl.dispatch(DashboardMsg::SubmitCreate);
    let notices = sink.drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].severity, Severity::Warning);
    assert!(ctl.model().records.is_empty());

    ctl.dispatch(DashboardMsg::SetDraftDescription("Desk lamp flickers".into()));
    ctl.dispatch(DashboardMsg::SubmitCreate);
    assert_eq!(ctl.model().records.len(), 1);
    assert_eq!(ctl.model().filters.sort_order, SortOrder::Newest);
    let id = ctl.model().records[0].id;

    ctl.dispatch(DashboardMsg::RequestDelete(id));
    assert!(ctl.model().records.is_empty());
    assert_eq!(
        sink.drain()
            .into_iter()
            .map(|n| n.message)
            .collect::<Vec<_>>(),
        vec!["Request submitted successfully", "Request deleted successfully"]
    );
    drop(ctl);

    let entries = read_entries(&log_path).unwrap();
    let events: Vec<EventType> = entries.iter().map(|e| e.event).collect();
    assert!(events.contains(&EventType::ValidationFailed));
    assert!(events.contains(&EventType::Create));
    assert!(events.contains(&EventType::Delete));
    assert!(entries.iter().all(|e| e.user.as_deref() == Some("asha")));
}

#[test]
fn other_users_requests_stay_invisible_and_protected() {
    let dir = tempfile::tempdir().unwrap();
    let api = backend(dir.path());
    let ben = Identity::new("ben", PASSWORD);
    let theirs = api
        .create_request("HR", "Update my payroll address", &ben)
        .unwrap();

    let (session, _) = session_for(&api, "asha");
    let sink = MemorySink::new();
    let mut ctl = DashboardController::new(
        DashboardKind::User,
        Some(session),
        10,
        CalendarZone::Utc,
        &api,
        &sink,
        AssumeYes,
        Vec::<LogEntry>::new(),
    );
    ctl.dispatch(DashboardMsg::Mount);
    assert!(ctl.model().record(theirs.id).is_none());

    // The id is unknown locally, so the backend has the final word.
    ctl.dispatch(DashboardMsg::RequestDelete(theirs.id));
    let notices = sink.drain();
    assert_eq!(notices.last().map(|n| n.severity), Some(Severity::Error));
    assert_eq!(
        api.list_requests(request_manager::api::Scope::User, &ben)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn fetch_failure_keeps_last_good_list() {
    let dir = tempfile::tempdir().unwrap();
    let api = backend(dir.path());
    api.create_request("IT", "Monitor is blank", &Identity::new("asha", PASSWORD))
        .unwrap();

    let (session, _) = session_for(&api, "asha");
    let sink = MemorySink::new();
    let mut ctl = DashboardController::new(
        DashboardKind::User,
        Some(session),
        10,
        CalendarZone::Utc,
        &api,
        &sink,
        AssumeYes,
        Vec::<LogEntry>::new(),
    );
    ctl.dispatch(DashboardMsg::Mount);
    assert_eq!(ctl.model().records.len(), 1);

    // Deliver a failed fetch as the runtime would after a network error.
    ctl.dispatch(DashboardMsg::Fetched(Err(
        request_manager::api::ApiError::Network {
            details: "connection refused".into(),
        },
    )));
    assert_eq!(ctl.model().records.len(), 1);
    assert!(!ctl.model().loading);
    assert_eq!(sink.drain()[0].message, "Failed to load your requests");
}
