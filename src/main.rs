mod app;
mod event;
mod ui;

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use courtops::agent::{AgentConsole, AgentMode, PendingRun, Submission};
use courtops::api::auth::{decode_claims, LOGIN_FAILURE_MESSAGE};
use courtops::api::models::{
    NewChangeRequest, NewTicket, ReportEntity, TicketCategory, TicketPriority, TicketStatus,
    TicketUpdate,
};
use courtops::config::Config;
use courtops::credentials::courtops_dir;
use courtops::reports::Period;
use courtops::{ApiClient, ClientError, CredentialStore, DownloadClient};

use app::App;
use event::{AppEvent, EventHandler};

#[derive(Parser)]
#[command(name = "courtops", about = "Court operations console", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token
    Login {
        #[arg(short, long)]
        username: Option<String>,

        /// Prompted for without echo when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Forget the stored session token
    Logout,

    /// Show who the stored token belongs to
    Whoami,

    /// List cases, or monthly backlog metrics
    Cases {
        #[arg(long)]
        metrics: bool,
    },

    /// Help desk tickets
    Tickets {
        #[command(subcommand)]
        action: TicketAction,
    },

    /// List inventory devices
    Inventory,

    /// List patches
    Patches,

    /// Change requests
    ChangeRequests {
        #[command(subcommand)]
        action: ChangeRequestAction,
    },

    /// Operations reports and exports
    Reports {
        #[command(subcommand)]
        action: ReportAction,
    },

    /// Analyst agent
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },

    /// Full-screen agent console (default)
    Console,
}

#[derive(Subcommand)]
enum TicketAction {
    List,
    Create {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = "application")]
        category: TicketCategory,

        #[arg(long, default_value = "medium")]
        priority: TicketPriority,
    },
    Update {
        id: i64,

        #[arg(long)]
        status: Option<TicketStatus>,

        #[arg(long)]
        priority: Option<TicketPriority>,

        #[arg(long)]
        assignee: Option<i64>,

        #[arg(long)]
        title: Option<String>,
    },
    /// SLA summary (supervisors only)
    Sla,
}

#[derive(Subcommand)]
enum ChangeRequestAction {
    List,
    Create {
        #[arg(long)]
        title: String,

        #[arg(long)]
        requested_by: String,

        #[arg(long)]
        proposed_change: String,
    },
    /// Render the document set for a change request
    GenerateDocs { id: i64 },
}

#[derive(Subcommand)]
enum ReportAction {
    /// List generated monthly bundles
    List,
    /// Generate the monthly bundle
    Generate,
    /// Download a monthly PDF
    Pdf { period: String },
    /// Download a custom query export (cases, tickets, devices)
    Csv { entity: ReportEntity },
    RevenueAtRisk {
        #[command(subcommand)]
        action: RevenueAction,
    },
}

#[derive(Subcommand)]
enum RevenueAction {
    Generate,
    /// Download the PDF, current month by default
    Pdf { period: Option<String> },
    Csv,
}

#[derive(Subcommand)]
enum AgentAction {
    /// Run the configured preset, another preset, or a custom goal
    Run {
        #[arg(long, conflicts_with = "goal")]
        preset: Option<String>,

        #[arg(long)]
        goal: Option<String>,

        /// Only custom runs take a mode; presets always run in demo mode
        #[arg(long, requires = "goal")]
        mode: Option<AgentMode>,

        #[arg(long)]
        no_dry_run: bool,
    },
    /// Show the backend's agent configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let console = matches!(cli.command, None | Some(Commands::Console));
    init_tracing(console)?;

    let config_path = cli
        .config
        .unwrap_or_else(|| Config::default_path().to_string_lossy().into_owned());
    let config = Config::load(&config_path)?;
    let credentials = CredentialStore::file(config.session.token_path());
    let api = ApiClient::from_config(&config.api, credentials).map_err(user_error)?;

    match cli.command {
        Some(Commands::Login { username, password }) => login(&api, username, password).await,
        Some(Commands::Logout) => {
            api.logout();
            println!("Logged out");
            Ok(())
        }
        Some(Commands::Whoami) => whoami(&api),
        Some(Commands::Cases { metrics }) => list_cases(&api, metrics).await,
        Some(Commands::Tickets { action }) => tickets(&api, action).await,
        Some(Commands::Inventory) => list_devices(&api).await,
        Some(Commands::Patches) => list_patches(&api).await,
        Some(Commands::ChangeRequests { action }) => change_requests(&api, action).await,
        Some(Commands::Reports { action }) => {
            let downloads = DownloadClient::to_directory(api.clone(), config.downloads.dir_path());
            reports(&api, &downloads, action).await
        }
        Some(Commands::Agent { action }) => agent(&api, &config, action).await,
        None | Some(Commands::Console) => run_console(config, api).await,
    }
}

/// Log to stderr for one-shot commands, to ~/.courtops/courtops.log under the console
fn init_tracing(to_file: bool) -> Result<()> {
    if to_file {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("courtops=info"));
        let path = courtops_dir().join("courtops.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    } else {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("courtops=warn"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
    Ok(())
}

/// Collapse a typed client error into the operator-facing message
fn user_error(err: ClientError) -> anyhow::Error {
    warn!("{}", err);
    anyhow!(err.user_message())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Read a line without echoing it
fn prompt_secret(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    enable_raw_mode()?;
    let mut secret = String::new();
    let outcome = loop {
        match crossterm::event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Enter => break Ok(()),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    break Err(anyhow!("Cancelled"))
                }
                KeyCode::Backspace => {
                    secret.pop();
                }
                KeyCode::Char(c) => secret.push(c),
                _ => {}
            },
            Ok(_) => {}
            Err(e) => break Err(e.into()),
        }
    };
    disable_raw_mode()?;
    println!();

    outcome.map(|_| secret)
}

async fn login(api: &ApiClient, username: Option<String>, password: Option<String>) -> Result<()> {
    let username = match username {
        Some(u) => u,
        None => prompt("Username: ")?,
    };
    let password = match password {
        Some(p) => p,
        None => prompt_secret("Password: ")?,
    };

    api.login(&username, &password).await.map_err(|e| {
        warn!("Login failed: {}", e);
        anyhow!(LOGIN_FAILURE_MESSAGE)
    })?;
    println!("Logged in as {}", username);
    Ok(())
}

fn whoami(api: &ApiClient) -> Result<()> {
    println!("Backend: {}", api.base_url());

    let Some(token) = api.credentials().get() else {
        println!("Not logged in");
        return Ok(());
    };

    match decode_claims(&token) {
        Some(claims) => {
            println!("User:    {}", claims.sub.as_deref().unwrap_or("-"));
            if let Some(expires) = claims.expires_at() {
                let expired = if claims.is_expired(chrono::Utc::now()) {
                    " (expired)"
                } else {
                    ""
                };
                println!("Expires: {}{}", expires.to_rfc3339(), expired);
            }
        }
        None => println!("Token present"),
    }
    Ok(())
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Cut `s` to at most `max` characters for table columns
fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut cut: String = s.chars().take(max.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}

async fn list_cases(api: &ApiClient, metrics: bool) -> Result<()> {
    if metrics {
        let rows = api.monthly_case_metrics().await.map_err(user_error)?;
        if rows.is_empty() {
            println!("No case metrics available");
            return Ok(());
        }
        println!(
            "{:<10} {:>8} {:>10} {:>8} {:>10} {:>10}",
            "MONTH", "TOTAL", "DISPOSED", "OPEN", "DISPOSED%", "AVG AGE"
        );
        println!("{}", "-".repeat(61));
        for m in rows {
            println!(
                "{:<10} {:>8} {:>10} {:>8} {:>9.1}% {:>10.1}",
                m.month,
                m.total_cases,
                m.disposed_cases,
                m.non_disposed_cases,
                m.disposed_pct,
                m.avg_case_age_days
            );
        }
        return Ok(());
    }

    let cases = api.list_cases().await.map_err(user_error)?;
    if cases.is_empty() {
        println!("No cases found");
        return Ok(());
    }
    println!(
        "{:<16} {:<24} {:<14} {:<12} {:>10} {:>12}",
        "CASE", "DEFENDANT", "STATUS", "FILED", "FINE", "OUTSTANDING"
    );
    println!("{}", "-".repeat(93));
    for case in cases {
        println!(
            "{:<16} {:<24} {:<14} {:<12} {:>10.2} {:>12.2}",
            case.case_number,
            clip(&case.defendant_name, 24),
            case.status,
            case.filing_date,
            case.fine_amount,
            case.outstanding()
        );
    }
    Ok(())
}

async fn tickets(api: &ApiClient, action: TicketAction) -> Result<()> {
    match action {
        TicketAction::List => {
            let tickets = api.list_tickets().await.map_err(user_error)?;
            if tickets.is_empty() {
                println!("No tickets found");
                return Ok(());
            }
            println!(
                "{:<6} {:<10} {:<12} {:<12} {:<20} {}",
                "ID", "PRIORITY", "STATUS", "CATEGORY", "DUE", "TITLE"
            );
            println!("{}", "-".repeat(90));
            for t in tickets {
                println!(
                    "{:<6} {:<10} {:<12} {:<12} {:<20} {}",
                    t.id,
                    t.priority,
                    t.status,
                    t.category,
                    or_dash(t.due_at.as_deref()),
                    clip(&t.title, 40)
                );
            }
        }
        TicketAction::Create {
            title,
            description,
            category,
            priority,
        } => {
            let ticket = NewTicket {
                title,
                description,
                category,
                priority,
            };
            let created = api.create_ticket(&ticket).await.map_err(user_error)?;
            println!("Created ticket #{}: {}", created.id, created.title);
        }
        TicketAction::Update {
            id,
            status,
            priority,
            assignee,
            title,
        } => {
            let update = TicketUpdate {
                title,
                status,
                priority,
                assignee_id: assignee,
                ..Default::default()
            };
            if update.is_empty() {
                bail!("Nothing to update");
            }
            let ticket = api.update_ticket(id, &update).await.map_err(user_error)?;
            println!("Updated ticket #{}: {} ({})", ticket.id, ticket.title, ticket.status);
        }
        TicketAction::Sla => {
            let sla = api.ticket_sla_summary().await.map_err(user_error)?;
            println!("Total:   {}", sla.total);
            println!("Open:    {}", sla.open);
            println!("Overdue: {}", sla.overdue);
        }
    }
    Ok(())
}

async fn list_devices(api: &ApiClient) -> Result<()> {
    let devices = api.list_devices().await.map_err(user_error)?;
    if devices.is_empty() {
        println!("No devices found");
        return Ok(());
    }
    println!(
        "{:<12} {:<12} {:<24} {:<14} {:<12}",
        "ASSET", "TYPE", "LOCATION", "STATUS", "LAST PATCH"
    );
    println!("{}", "-".repeat(78));
    for d in devices {
        println!(
            "{:<12} {:<12} {:<24} {:<14} {:<12}",
            d.asset_tag,
            d.device_type,
            clip(&d.location, 24),
            d.status,
            or_dash(d.last_patch_date)
        );
    }
    Ok(())
}

async fn list_patches(api: &ApiClient) -> Result<()> {
    let patches = api.list_patches().await.map_err(user_error)?;
    if patches.is_empty() {
        println!("No patches found");
        return Ok(());
    }
    println!(
        "{:<6} {:<10} {:<12} {:<12} {:<12} {}",
        "ID", "TYPE", "STATUS", "DEVICE", "REQUESTED", "TITLE"
    );
    println!("{}", "-".repeat(80));
    for p in patches {
        println!(
            "{:<6} {:<10} {:<12} {:<12} {:<12} {}",
            p.id,
            p.patch_type,
            p.status,
            or_dash(p.device_asset_tag.as_deref()),
            p.requested_date,
            clip(&p.title, 40)
        );
    }
    Ok(())
}

async fn change_requests(api: &ApiClient, action: ChangeRequestAction) -> Result<()> {
    match action {
        ChangeRequestAction::List => {
            let requests = api.list_change_requests().await.map_err(user_error)?;
            if requests.is_empty() {
                println!("No change requests found");
                return Ok(());
            }
            println!("{:<6} {:<12} {:<20} {}", "ID", "STATUS", "REQUESTED BY", "TITLE");
            println!("{}", "-".repeat(70));
            for cr in requests {
                println!(
                    "{:<6} {:<12} {:<20} {}",
                    cr.id,
                    cr.status,
                    clip(&cr.requested_by, 20),
                    clip(&cr.title, 40)
                );
            }
        }
        ChangeRequestAction::Create {
            title,
            requested_by,
            proposed_change,
        } => {
            let draft = NewChangeRequest::draft(title, requested_by, proposed_change);
            let created = api.create_change_request(&draft).await.map_err(user_error)?;
            println!("Created change request #{}: {}", created.id, created.title);
        }
        ChangeRequestAction::GenerateDocs { id } => {
            let docs = api
                .generate_change_request_docs(id)
                .await
                .map_err(user_error)?;
            for (name, path) in docs {
                println!("{:<20} {}", name, path);
            }
        }
    }
    Ok(())
}

fn parse_period(raw: &str) -> Result<Period> {
    Period::parse(raw).ok_or_else(|| anyhow!("Period must be YYYY-MM, got '{}'", raw))
}

fn print_saved(path: &Path) {
    println!("Saved {}", path.display());
}

async fn reports(api: &ApiClient, downloads: &DownloadClient, action: ReportAction) -> Result<()> {
    match action {
        ReportAction::List => {
            let reports = api.list_monthly_reports().await.map_err(user_error)?;
            if reports.is_empty() {
                println!("No reports generated yet");
                return Ok(());
            }
            for report in reports {
                println!("{}", report.period);
                for file in report.pdf_files {
                    println!("  {}", file);
                }
            }
        }
        ReportAction::Generate => {
            let generated = api.generate_monthly_report().await.map_err(user_error)?;
            println!("{} ({})", generated.message, generated.period);
        }
        ReportAction::Pdf { period } => {
            let period = parse_period(&period)?;
            let saved = downloads
                .monthly_report_pdf(&period)
                .await
                .map_err(user_error)?;
            print_saved(&saved);
        }
        ReportAction::Csv { entity } => {
            let saved = downloads.custom_query_csv(entity).await.map_err(user_error)?;
            print_saved(&saved);
        }
        ReportAction::RevenueAtRisk { action } => match action {
            RevenueAction::Generate => {
                let generated = api
                    .generate_revenue_at_risk_report()
                    .await
                    .map_err(user_error)?;
                println!("{} ({})", generated.message, generated.period);
                if let Some(path) = generated.path {
                    println!("  {}", path);
                }
            }
            RevenueAction::Pdf { period } => {
                let period = match period {
                    Some(raw) => parse_period(&raw)?,
                    None => Period::current(),
                };
                let saved = downloads
                    .revenue_at_risk_pdf(&period)
                    .await
                    .map_err(user_error)?;
                print_saved(&saved);
            }
            RevenueAction::Csv => {
                let saved = downloads.revenue_at_risk_csv().await.map_err(user_error)?;
                print_saved(&saved);
            }
        },
    }
    Ok(())
}

async fn agent(api: &ApiClient, config: &Config, action: AgentAction) -> Result<()> {
    match action {
        AgentAction::Run {
            preset,
            goal,
            mode,
            no_dry_run,
        } => {
            let mut console = AgentConsole::from_config(&config.agent);
            if let Some(mode) = mode {
                console.mode = mode;
            }
            if no_dry_run {
                console.dry_run = false;
            }

            let submission = match (preset, goal) {
                (Some(name), _) => Submission::Preset(name),
                (None, Some(goal)) => {
                    console.goal = goal;
                    Submission::Custom
                }
                (None, None) => Submission::Preset(console.preset.clone()),
            };

            console.run(api, submission).await;
            if let Some(message) = console.error() {
                bail!("{}", message);
            }
            if let Some(view) = console.view(&api.reports_base()) {
                for line in view.to_lines() {
                    println!("{}", line);
                }
            }
        }
        AgentAction::Status => {
            let status = api.agent_status().await.map_err(user_error)?;
            println!("Status:   {}", status.status);
            println!("Provider: {}", or_dash(status.llm_provider.as_deref()));
            println!("Model:    {}", or_dash(status.model.as_deref()));
        }
    }
    Ok(())
}

fn spawn_run(api: &ApiClient, tx: &UnboundedSender<AppEvent>, pending: PendingRun) {
    let api = api.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = api.run_agent(&pending.request).await;
        let _ = tx.send(AppEvent::RunFinished {
            seq: pending.seq,
            outcome,
        });
    });
}

fn spawn_status_refresh(api: &ApiClient, tx: &UnboundedSender<AppEvent>) {
    let api = api.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let status = api.agent_status().await;
        let _ = tx.send(AppEvent::StatusLoaded(status));
    });
}

async fn run_console(config: Config, api: ApiClient) -> Result<()> {
    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&config, api.reports_base(), api.credentials().is_present());
    if !app.signed_in {
        app.set_status("Not signed in: run `courtops login` first");
    }

    let mut events = EventHandler::new(Duration::from_millis(250));
    let tx = events.sender();
    spawn_status_refresh(&api, &tx);

    loop {
        terminal.draw(|f| ui::render(f, &app))?;

        if let Some(event) = events.next().await {
            match event {
                AppEvent::Key(key) => {
                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        app.should_quit = true;
                    } else if app.show_help {
                        app.show_help = false;
                    } else if app.editing {
                        match key.code {
                            KeyCode::Esc => app.stop_editing(),
                            KeyCode::Enter => app.push_char('\n'),
                            KeyCode::Backspace => app.pop_char(),
                            KeyCode::Char(c) => app.push_char(c),
                            _ => {}
                        }
                    } else {
                        app.clear_status();
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => {
                                app.should_quit = true;
                            }
                            KeyCode::Char('e') | KeyCode::Char('i') => app.start_editing(),
                            KeyCode::Char('m') => app.toggle_mode(),
                            KeyCode::Char('d') => app.toggle_dry_run(),
                            KeyCode::Char('p') => {
                                if let Some(pending) = app.submit_preset() {
                                    spawn_run(&api, &tx, pending);
                                }
                            }
                            KeyCode::Enter => {
                                if let Some(pending) = app.submit_custom() {
                                    spawn_run(&api, &tx, pending);
                                }
                            }
                            KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
                            KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
                            KeyCode::Char('s') => {
                                spawn_status_refresh(&api, &tx);
                                app.set_status("Refreshing backend status");
                            }
                            KeyCode::Char('?') => {
                                app.show_help = !app.show_help;
                            }
                            _ => {}
                        }
                    }
                }
                AppEvent::Tick => app.tick(),
                AppEvent::Resize(_, _) => {
                    // Terminal will handle resize automatically
                }
                AppEvent::RunFinished { seq, outcome } => app.finish_run(seq, outcome),
                AppEvent::StatusLoaded(status) => app.set_agent_status(status),
            }
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    Ok(())
}
