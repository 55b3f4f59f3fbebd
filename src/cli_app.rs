//! Top-level CLI definition and dispatch.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use request_manager::api::{self, RequestApi};
use request_manager::auth::forms::{
    self, LOGIN_SUCCESS, Landing, REGISTER_SUCCESS, RegistrationError, RegistrationForm,
};
use request_manager::auth::session::{Session, SessionStore};
use request_manager::core::config::Config;
use request_manager::core::errors::RqmError;
use request_manager::dashboard::model::{DashboardKind, DashboardMsg};
use request_manager::dashboard::render;
use request_manager::dashboard::runtime::{Confirm, DashboardController};
use request_manager::logger::jsonl::{
    ActivityLog, EventType, JsonlConfig, JsonlWriter, LogEntry, read_entries,
};
use request_manager::model::record::RequestId;
use request_manager::model::status::Status;
use request_manager::model::timestamp::parse_filter_date;
use request_manager::notify::{FanoutSink, JsonlFileSink, MemorySink, Notice, Severity};
use request_manager::view::query::SortOrder;

/// Request Manager: file, track and triage service requests.
#[derive(Debug, Parser)]
#[command(
    name = "rqm",
    author,
    version,
    about = "Request Manager - service request tracking client",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Answer yes to every confirmation prompt.
    #[arg(short, long, global = true)]
    yes: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Log in and remember the session.
    Login(LoginArgs),
    /// End the current session.
    Logout,
    /// Show the logged-in user and role.
    Whoami,
    /// Create a new account.
    Register(RegisterArgs),
    /// Show the dashboard list for the current session.
    List(ListArgs),
    /// Submit a new service request.
    Create(CreateArgs),
    /// Delete one of your open requests.
    Delete(IdArgs),
    /// Change a request's status (administrators).
    SetStatus(SetStatusArgs),
    /// Show recent activity log entries.
    History(HistoryArgs),
    /// View and validate configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct HistoryArgs {
    /// Number of most recent entries to show.
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

#[derive(Debug, Clone, Args)]
struct LoginArgs {
    /// Account username.
    username: String,
    /// Password (falls back to RQM_PASSWORD, then a prompt on stdin).
    #[arg(long)]
    password: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct RegisterArgs {
    /// Full name.
    #[arg(long)]
    name: String,
    /// Email address.
    #[arg(long)]
    email: String,
    /// Desired username.
    #[arg(long)]
    username: String,
    /// Password (falls back to RQM_PASSWORD, then a prompt on stdin).
    #[arg(long)]
    password: Option<String>,
    /// Password confirmation (defaults to the password).
    #[arg(long)]
    confirm_password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SortArg {
    Newest,
    Oldest,
}

impl From<SortArg> for SortOrder {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Newest => Self::Newest,
            SortArg::Oldest => Self::Oldest,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct ListArgs {
    /// Only this status (e.g. IN_PROGRESS).
    #[arg(long, value_parser = parse_status)]
    status: Option<Status>,
    /// Only this category (admin dashboard).
    #[arg(long)]
    category: Option<String>,
    /// Only requests by this user (admin dashboard).
    #[arg(long, value_name = "USERNAME")]
    created_by: Option<String>,
    /// Only requests created on this day (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    date: Option<String>,
    /// Creation-time ordering.
    #[arg(long, value_enum, default_value_t = SortArg::Newest)]
    sort: SortArg,
    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: usize,
    /// Use the admin dashboard regardless of the session's landing view.
    #[arg(long)]
    admin: bool,
}

#[derive(Debug, Clone, Args)]
struct CreateArgs {
    /// Request category, e.g. IT or Facilities.
    #[arg(long)]
    category: String,
    /// What is needed.
    #[arg(long)]
    description: String,
}

#[derive(Debug, Clone, Args)]
struct IdArgs {
    /// Request id.
    id: RequestId,
}

#[derive(Debug, Clone, Args)]
struct SetStatusArgs {
    /// Request id.
    id: RequestId,
    /// Target status (PENDING, IN_PROGRESS, ON_HOLD, RESOLVED, REJECTED).
    #[arg(value_parser = parse_status)]
    status: Status,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum ConfigCommand {
    /// Print the config file path.
    Path,
    /// Print the effective configuration.
    Show,
    /// Validate the configuration.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or a refused action.
    #[error("{0}")]
    User(String),
    /// Environment/backend failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl From<RqmError> for CliError {
    fn from(err: RqmError) -> Self {
        match err {
            RqmError::InvalidConfig { .. }
            | RqmError::MissingConfig { .. }
            | RqmError::ConfigParse { .. }
            | RqmError::Validation { .. }
            | RqmError::NotLoggedIn => Self::User(err.to_string()),
            RqmError::Api(ref api) if !api.is_transient() => Self::User(err.to_string()),
            _ if err.is_retryable() => Self::Runtime(format!("{err} (retrying may help)")),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Login(args) => run_login(cli, args),
        Command::Logout => run_logout(cli),
        Command::Whoami => run_whoami(cli),
        Command::Register(args) => run_register(cli, args),
        Command::List(args) => run_list(cli, args),
        Command::Create(args) => run_create(cli, args),
        Command::Delete(args) => run_delete(cli, args),
        Command::SetStatus(args) => run_set_status(cli, args),
        Command::History(args) => run_history(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── shared plumbing ────────────────────

/// Everything a command needs, loaded once at startup.
struct Context {
    config: Config,
    store: SessionStore,
    session: Option<Session>,
    /// The session file existed but could not be read.
    session_unreadable: bool,
    log: JsonlWriter,
    mode: OutputMode,
}

impl Context {
    fn load(cli: &Cli) -> Result<Self, CliError> {
        let config = Config::load(cli.config.as_deref())?;
        if !config.notifications.color {
            control::set_override(false);
        }
        let store = SessionStore::new(&config.paths.session_file);
        let (session, session_unreadable) = match store.load() {
            Ok(session) => (session, false),
            Err(err) => {
                eprintln!(
                    "rqm: warning: ignoring unreadable session file {}: {err}",
                    store.path().display()
                );
                (None, true)
            }
        };
        let log = JsonlWriter::open(JsonlConfig::at(&config.paths.activity_log));
        Ok(Self {
            config,
            store,
            session,
            session_unreadable,
            log,
            mode: output_mode(cli),
        })
    }

    fn api(&self) -> Result<Box<dyn RequestApi>, CliError> {
        Ok(api::connect(&self.config)?)
    }

    fn page_size(&self, kind: DashboardKind) -> usize {
        self.config.dashboard.page_size(kind.scope())
    }
}

/// Prompts on stderr and reads the answer from stdin.
struct StdinConfirm {
    assume_yes: bool,
}

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        eprint!("{prompt} [y/N] ");
        let _ = io::stderr().flush();
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        }
    }
}

type Controller<'a> =
    DashboardController<&'a dyn RequestApi, FanoutSink, StdinConfirm, &'a mut JsonlWriter>;

/// Build a dashboard over the loaded context. Notices are mirrored into the
/// returned memory sink so JSON output can report them.
fn controller<'a>(
    cli: &Cli,
    ctx: &'a mut Context,
    api: &'a dyn RequestApi,
    kind: DashboardKind,
) -> (Controller<'a>, Arc<MemorySink>) {
    let memory = Arc::new(MemorySink::new());
    let sink = match ctx.mode {
        OutputMode::Human => {
            let color = !cli.no_color && io::stderr().is_terminal();
            FanoutSink::from_config(&ctx.config.notifications, color)
        }
        OutputMode::Json => {
            let file = &ctx.config.notifications.file;
            let sink = FanoutSink::new();
            if file.enabled {
                sink.with(JsonlFileSink::new(file.path.clone()))
            } else {
                sink
            }
        }
    }
    .with(Arc::clone(&memory));
    let page_size = ctx.page_size(kind);
    let zone = ctx.config.dashboard.calendar_zone;
    let controller = DashboardController::new(
        kind,
        ctx.session.clone(),
        page_size,
        zone,
        api,
        sink,
        StdinConfirm {
            assume_yes: cli.yes,
        },
        &mut ctx.log,
    );
    (controller, memory)
}

const fn kind_for(session: Option<&Session>) -> DashboardKind {
    match session {
        Some(s) => match Landing::for_role(s.role()) {
            Landing::AdminDashboard => DashboardKind::Admin,
            Landing::UserDashboard => DashboardKind::User,
        },
        None => DashboardKind::User,
    }
}

/// Mount and bail out when the dashboard bounced to the login page.
fn mount(ctl: &mut Controller<'_>) -> Result<(), CliError> {
    ctl.dispatch(DashboardMsg::Mount);
    if ctl.model().redirect.is_some() {
        return Err(CliError::from(RqmError::NotLoggedIn));
    }
    Ok(())
}

/// The worst notice decides the exit status of a mutation.
fn outcome(notices: &[Notice]) -> Result<(), CliError> {
    let worst = notices.iter().max_by_key(|n| n.severity);
    match worst {
        Some(n) if n.severity == Severity::Error => Err(CliError::Runtime(n.message.clone())),
        Some(n) if n.severity == Severity::Warning => Err(CliError::User(n.message.clone())),
        _ => Ok(()),
    }
}

fn notices_json(notices: &[Notice]) -> Result<Value, CliError> {
    Ok(serde_json::to_value(notices)?)
}

fn read_password(explicit: Option<&str>) -> Result<String, CliError> {
    if let Some(password) = explicit {
        return Ok(password.to_string());
    }
    if let Ok(password) = std::env::var("RQM_PASSWORD") {
        return Ok(password);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn parse_status(raw: &str) -> Result<Status, String> {
    raw.parse::<Status>().map_err(|e| e.to_string())
}

// ──────────────────── auth commands ────────────────────

fn run_login(cli: &Cli, args: &LoginArgs) -> Result<(), CliError> {
    let mut ctx = Context::load(cli)?;
    let api = ctx.api()?;
    let password = read_password(args.password.as_deref())?;

    match forms::login(&*api, &args.username, &password) {
        Ok((session, landing)) => {
            ctx.store.save(&session)?;
            ctx.log.record(
                &LogEntry::succeeded(EventType::Login)
                    .user(session.username())
                    .details(session.role().as_str()),
            );
            match ctx.mode {
                OutputMode::Human => {
                    println!("{}", LOGIN_SUCCESS.green());
                    println!("  User: {} ({})", session.username(), session.role());
                    println!("  Landing: {}", landing_label(landing));
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "login",
                        "ok": true,
                        "username": session.username(),
                        "role": session.role(),
                        "landing": landing,
                    }))?;
                }
            }
            Ok(())
        }
        Err(err) => {
            let code = err.cause.as_ref().map_or("validation", |c| c.kind());
            ctx.log.record(
                &LogEntry::failed(EventType::Login, code, err.message).user(args.username.trim()),
            );
            if ctx.mode == OutputMode::Json {
                write_json_line(&json!({
                    "command": "login",
                    "ok": false,
                    "error": err.message,
                }))?;
            }
            match err.cause {
                Some(cause) if cause.is_transient() => Err(CliError::Runtime(err.message.into())),
                _ => Err(CliError::User(err.message.into())),
            }
        }
    }
}

const fn landing_label(landing: Landing) -> &'static str {
    match landing {
        Landing::AdminDashboard => DashboardKind::Admin.title(),
        Landing::UserDashboard => DashboardKind::User.title(),
    }
}

fn run_logout(cli: &Cli) -> Result<(), CliError> {
    let mut ctx = Context::load(cli)?;
    if ctx.session.is_none() {
        if !ctx.session_unreadable {
            return Err(CliError::from(RqmError::NotLoggedIn));
        }
        ctx.store.clear()?;
        match ctx.mode {
            OutputMode::Human => println!("Removed unreadable session file."),
            OutputMode::Json => write_json_line(&json!({
                "command": "logout",
                "ok": true,
                "cleared_unreadable_session": true,
                "notices": [],
            }))?,
        }
        return Ok(());
    }
    let api = ctx.api()?;
    let kind = kind_for(ctx.session.as_ref());
    let (mut ctl, memory) = controller(cli, &mut ctx, &*api, kind);
    ctl.dispatch(DashboardMsg::Logout);
    drop(ctl);
    ctx.store.clear()?;

    if ctx.mode == OutputMode::Json {
        write_json_line(&json!({
            "command": "logout",
            "ok": true,
            "notices": notices_json(&memory.drain())?,
        }))?;
    }
    Ok(())
}

fn run_whoami(cli: &Cli) -> Result<(), CliError> {
    let ctx = Context::load(cli)?;
    let Some(session) = ctx.session.as_ref() else {
        if ctx.mode == OutputMode::Json {
            write_json_line(&json!({ "command": "whoami", "logged_in": false }))?;
        }
        return Err(CliError::from(RqmError::NotLoggedIn));
    };
    match ctx.mode {
        OutputMode::Human => println!("{} ({})", session.username(), session.role()),
        OutputMode::Json => write_json_line(&json!({
            "command": "whoami",
            "logged_in": true,
            "username": session.username(),
            "role": session.role(),
        }))?,
    }
    Ok(())
}

fn run_history(cli: &Cli, args: &HistoryArgs) -> Result<(), CliError> {
    let ctx = Context::load(cli)?;
    let path = &ctx.config.paths.activity_log;
    let mut entries = if path.exists() {
        read_entries(path)?
    } else {
        Vec::new()
    };
    let skip = entries.len().saturating_sub(args.limit);
    entries.drain(..skip);

    match ctx.mode {
        OutputMode::Human => {
            if entries.is_empty() {
                println!("No activity recorded.");
            }
            for entry in &entries {
                let outcome = match entry.ok {
                    Some(true) => "ok".green().to_string(),
                    Some(false) => "failed".red().to_string(),
                    None => "-".to_string(),
                };
                println!(
                    "{}  {:<18} {:<12} {:<7} {}",
                    entry.ts,
                    entry.event.as_str(),
                    entry.user.as_deref().unwrap_or("-"),
                    outcome,
                    entry
                        .error_message
                        .as_deref()
                        .or(entry.details.as_deref())
                        .unwrap_or(""),
                );
            }
        }
        OutputMode::Json => write_json_line(&json!({
            "command": "history",
            "path": path,
            "entries": entries,
        }))?,
    }
    Ok(())
}

fn run_register(cli: &Cli, args: &RegisterArgs) -> Result<(), CliError> {
    let mut ctx = Context::load(cli)?;
    let api = ctx.api()?;
    let password = read_password(args.password.as_deref())?;
    let form = RegistrationForm {
        name: args.name.clone(),
        email: args.email.clone(),
        username: args.username.clone(),
        confirm_password: args.confirm_password.clone().unwrap_or_else(|| password.clone()),
        password,
    };
    let strength = form.strength();

    match forms::register(&*api, &form) {
        Ok(profile) => {
            ctx.log.record(
                &LogEntry::succeeded(EventType::Register).user(&profile.username),
            );
            match ctx.mode {
                OutputMode::Human => {
                    println!("{}", REGISTER_SUCCESS.green());
                    println!("  Password strength: {}", strength.label());
                }
                OutputMode::Json => write_json_line(&json!({
                    "command": "register",
                    "ok": true,
                    "username": profile.username,
                    "password_strength": strength,
                }))?,
            }
            Ok(())
        }
        Err(RegistrationError::Invalid(errors)) => {
            ctx.log.record(
                &LogEntry::failed(EventType::ValidationFailed, "validation", errors.to_string())
                    .user(form.username.trim()),
            );
            match ctx.mode {
                OutputMode::Human => {
                    for (field, message) in errors.iter() {
                        eprintln!("  {field:?}: {message}");
                    }
                }
                OutputMode::Json => {
                    let fields: Vec<Value> = errors
                        .iter()
                        .map(|(field, message)| json!({ "field": format!("{field:?}"), "message": message }))
                        .collect();
                    write_json_line(&json!({
                        "command": "register",
                        "ok": false,
                        "fields": fields,
                    }))?;
                }
            }
            Err(CliError::User(errors.to_string()))
        }
        Err(RegistrationError::Failed { message, cause }) => {
            ctx.log.record(
                &LogEntry::failed(EventType::Register, cause.kind(), cause.to_string())
                    .user(form.username.trim()),
            );
            if ctx.mode == OutputMode::Json {
                write_json_line(&json!({
                    "command": "register",
                    "ok": false,
                    "error": message,
                }))?;
            }
            if cause.is_transient() {
                Err(CliError::Runtime(message))
            } else {
                Err(CliError::User(message))
            }
        }
    }
}

// ──────────────────── dashboard commands ────────────────────

fn run_list(cli: &Cli, args: &ListArgs) -> Result<(), CliError> {
    let created_on = args
        .date
        .as_deref()
        .map(parse_filter_date)
        .transpose()
        .map_err(|e| CliError::User(format!("invalid --date (expected YYYY-MM-DD): {e}")))?;

    let mut ctx = Context::load(cli)?;
    let api = ctx.api()?;
    let kind = if args.admin {
        DashboardKind::Admin
    } else {
        kind_for(ctx.session.as_ref())
    };
    let mode = ctx.mode;
    let (mut ctl, memory) = controller(cli, &mut ctx, &*api, kind);
    mount(&mut ctl)?;

    ctl.dispatch(DashboardMsg::SetStatusFilter(args.status));
    if kind == DashboardKind::Admin {
        ctl.dispatch(DashboardMsg::SetCategoryFilter(args.category.clone()));
        ctl.dispatch(DashboardMsg::SetCreatorFilter(args.created_by.clone()));
    } else if args.category.is_some() || args.created_by.is_some() {
        return Err(CliError::User(
            "--category and --created-by need the admin dashboard".to_string(),
        ));
    }
    ctl.dispatch(DashboardMsg::SetDateFilter(created_on));
    ctl.dispatch(DashboardMsg::SetSortOrder(args.sort.into()));
    ctl.dispatch(DashboardMsg::GoToPage(args.page));

    match mode {
        OutputMode::Human => print!("{}", ctl.render()),
        OutputMode::Json => {
            let snapshot = serde_json::to_value(render::snapshot(ctl.model()))?;
            write_json_line(&json!({
                "command": "list",
                "view": snapshot,
                "notices": notices_json(&memory.notices())?,
            }))?;
        }
    }
    outcome(&memory.drain())
}

fn run_create(cli: &Cli, args: &CreateArgs) -> Result<(), CliError> {
    let mut ctx = Context::load(cli)?;
    let api = ctx.api()?;
    let mode = ctx.mode;
    let (mut ctl, memory) = controller(cli, &mut ctx, &*api, DashboardKind::User);
    mount(&mut ctl)?;
    ctl.dispatch(DashboardMsg::OpenCreateForm);
    ctl.dispatch(DashboardMsg::SetDraftCategory(args.category.clone()));
    ctl.dispatch(DashboardMsg::SetDraftDescription(args.description.clone()));
    ctl.dispatch(DashboardMsg::SubmitCreate);
    finish_mutation(ctl.model().kind, "create", &memory, mode)
}

fn run_delete(cli: &Cli, args: &IdArgs) -> Result<(), CliError> {
    let mut ctx = Context::load(cli)?;
    let api = ctx.api()?;
    let mode = ctx.mode;
    let (mut ctl, memory) = controller(cli, &mut ctx, &*api, DashboardKind::User);
    mount(&mut ctl)?;
    ctl.dispatch(DashboardMsg::RequestDelete(args.id));
    finish_mutation(ctl.model().kind, "delete", &memory, mode)
}

fn run_set_status(cli: &Cli, args: &SetStatusArgs) -> Result<(), CliError> {
    let mut ctx = Context::load(cli)?;
    let api = ctx.api()?;
    let mode = ctx.mode;
    let (mut ctl, memory) = controller(cli, &mut ctx, &*api, DashboardKind::Admin);
    mount(&mut ctl)?;
    ctl.dispatch(DashboardMsg::RequestStatusChange {
        id: args.id,
        to: args.status,
    });
    finish_mutation(ctl.model().kind, "set-status", &memory, mode)
}

/// Report a mutation: silence means the confirmation was declined or the
/// change was a no-op.
fn finish_mutation(
    kind: DashboardKind,
    command: &str,
    memory: &MemorySink,
    mode: OutputMode,
) -> Result<(), CliError> {
    let notices = memory.drain();
    match mode {
        OutputMode::Human => {
            if notices.is_empty() {
                println!("Nothing changed.");
            }
        }
        OutputMode::Json => write_json_line(&json!({
            "command": command,
            "dashboard": kind,
            "changed": notices.iter().any(|n| n.severity == Severity::Success),
            "notices": notices_json(&notices)?,
        }))?,
    }
    outcome(&notices)
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => println!("{}", config.to_toml()?),
                OutputMode::Json => {
                    let value = serde_json::to_value(&config)?;
                    let payload = json!({
                        "command": "config show",
                        "config": value,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config.stable_hash()?;

                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("Configuration is valid.");
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                            "hash": hash,
                        });
                        write_json_line(&payload)?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => {
                        eprintln!("Configuration is INVALID: {e}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": false,
                            "code": e.code(),
                            "error": e.to_string(),
                        });
                        write_json_line(&payload)?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

// ──────────────────── output ────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("RQM_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use request_manager::api::ApiError;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn list_parses_filters() {
        let cli = Cli::try_parse_from([
            "rqm",
            "list",
            "--status",
            "in_progress",
            "--sort",
            "oldest",
            "--page",
            "2",
            "--date",
            "2025-06-01",
        ])
        .unwrap();
        let Command::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.status, Some(Status::InProgress));
        assert_eq!(args.sort, SortArg::Oldest);
        assert_eq!(args.page, 2);
        assert!(!args.admin);
    }

    #[test]
    fn unknown_status_is_rejected_at_parse_time() {
        assert!(Cli::try_parse_from(["rqm", "set-status", "4", "DONE"]).is_err());
        assert!(Cli::try_parse_from(["rqm", "set-status", "4", "RESOLVED"]).is_ok());
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from(["rqm", "delete", "7", "--yes", "--json"]).unwrap();
        assert!(cli.yes);
        assert!(cli.json);
    }

    #[test]
    fn completions_support_bash_zsh_and_fish() {
        for shell in ["bash", "zsh", "fish"] {
            let parsed = Cli::try_parse_from(["rqm", "completions", shell]);
            assert!(parsed.is_ok(), "failed shell parse for {shell}");
        }
    }

    #[test]
    fn output_mode_resolution_honors_precedence() {
        assert_eq!(
            resolve_output_mode(true, Some("human"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("json"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("human"), false),
            OutputMode::Human
        );
        assert_eq!(
            resolve_output_mode(false, Some("auto"), true),
            OutputMode::Human
        );
        assert_eq!(resolve_output_mode(false, None, false), OutputMode::Json);
    }

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(CliError::User(String::new()).exit_code(), 1);
        assert_eq!(CliError::Runtime(String::new()).exit_code(), 2);
        assert_eq!(CliError::from(RqmError::NotLoggedIn).exit_code(), 1);
        assert_eq!(
            CliError::from(RqmError::Api(ApiError::Network {
                details: "refused".into()
            }))
            .exit_code(),
            2
        );
        assert_eq!(
            CliError::from(RqmError::Api(ApiError::Unauthorized)).exit_code(),
            1
        );
    }

    #[test]
    fn retryable_failures_say_so() {
        let err = CliError::from(RqmError::Api(ApiError::Network {
            details: "refused".into(),
        }));
        assert!(matches!(&err, CliError::Runtime(m) if m.ends_with("(retrying may help)")));
        let err = CliError::from(RqmError::Serialization {
            context: "session file",
            details: "eof".into(),
        });
        assert!(matches!(&err, CliError::Runtime(m) if !m.contains("retrying")));
    }

    #[test]
    fn worst_notice_decides_outcome() {
        assert!(outcome(&[Notice::new(Severity::Success, "ok")]).is_ok());
        assert!(outcome(&[]).is_ok());
        let err = outcome(&[
            Notice::new(Severity::Success, "ok"),
            Notice::new(Severity::Error, "Failed to delete request"),
        ])
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "Failed to delete request");
        assert_eq!(
            outcome(&[Notice::new(Severity::Warning, "All fields are required")])
                .unwrap_err()
                .exit_code(),
            1
        );
    }

    #[test]
    fn kind_follows_session_role() {
        use request_manager::api::{Identity, Role};
        let admin = Session::established(Identity::new("boss", "pw"), Role::Admin);
        let user = Session::established(Identity::new("asha", "pw"), Role::User);
        assert_eq!(kind_for(Some(&admin)), DashboardKind::Admin);
        assert_eq!(kind_for(Some(&user)), DashboardKind::User);
        assert_eq!(kind_for(None), DashboardKind::User);
    }
}
