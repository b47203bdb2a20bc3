//! xpboard - a terminal dashboard for learn-platform profiles.
//!
//! Logs in against the platform's sign-in endpoint, keeps the session token
//! between runs, and prints profile, project, skill and xp summaries fetched
//! over GraphQL.

use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use xpboard_core::models::{DashboardData, RECENT_PROJECT_COUNT};
use xpboard_core::utils::{format_audit_ratio, format_date, format_kilobytes, format_megabytes, truncate_string};
use xpboard_core::{AuthSession, Config, Credentials, DashboardApi, QueryClient, SessionEvent, SessionStore};

// ============================================================================
// Constants
// ============================================================================

/// Log file written when XPBOARD_LOG_FILE is set
const LOG_FILE_NAME: &str = "xpboard.log";

/// Width of the skill bars in the profile summary
const SKILL_BAR_WIDTH: usize = 20;

/// Maximum width of a project path in the recent projects list
const MAX_PATH_WIDTH: usize = 48;

/// Number of xp timeline entries shown
const RECENT_XP_COUNT: usize = 5;

const USAGE: &str = "\
Usage: xpboard <command>

Commands:
  login [username]         Sign in (password from prompt or XPBOARD_PASSWORD)
  logout                   Forget the saved session
  status                   Show whether a session is saved and its claims
  profile                  Print the dashboard summary
  query <file|-> [vars]    Run a GraphQL document with optional JSON variables
";

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_writer(io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

/// Session objects shared by every command
struct Host {
    config: Config,
    auth: AuthSession,
    events: broadcast::Receiver<SessionEvent>,
}

impl Host {
    fn new(config: Config) -> Result<Self> {
        let store = Arc::new(SessionStore::new(config.token_storage()?));
        let events = store.subscribe();
        let graphql = QueryClient::new(&config, store.clone())
            .context("Failed to create GraphQL client")?;
        let auth = AuthSession::new(&config, store, graphql)
            .context("Failed to restore session")?;
        Ok(Self { config, auth, events })
    }

    fn dashboard(&self) -> DashboardApi {
        DashboardApi::new(self.auth.graphql().clone())
    }

    /// Tell the user when the server ended their session during this run
    fn report_session_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            debug!(?event, "Session event");
            if event == SessionEvent::Invalidated {
                eprintln!("Your session has expired. Run `xpboard login` to sign in again.");
            }
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let log_dir = std::env::var_os("XPBOARD_LOG_FILE")
        .and_then(|_| Config::default().cache_dir().ok());
    let _guard = init_tracing(log_dir);

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprint!("{}", USAGE);
        return Ok(());
    };

    let config = Config::load().context("Failed to load config")?;
    let mut host = Host::new(config)?;
    info!(command = %command, "xpboard starting");

    let result = match command.as_str() {
        "login" => login(&mut host, args.get(1).cloned()).await,
        "logout" => logout(&host),
        "status" => status(&host),
        "profile" => profile(&host).await,
        "query" => raw_query(&host, args.get(1), args.get(2)).await,
        "help" | "--help" | "-h" => {
            print!("{}", USAGE);
            Ok(())
        }
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    };

    host.report_session_events();
    result
}

async fn login(host: &mut Host, username: Option<String>) -> Result<()> {
    let username = match username.or_else(|| host.config.last_username.clone()) {
        Some(name) => name,
        None => prompt("Username: ")?,
    };
    let password = match std::env::var("XPBOARD_PASSWORD") {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ")?,
    };

    let credentials = Credentials::new(username.trim(), password);
    host.auth.login(&credentials).await?;

    Config::remember_username(&credentials.username).context("Failed to save config")?;
    host.config.last_username = Some(credentials.username.clone());

    println!("Logged in as {}", credentials.username);
    Ok(())
}

fn logout(host: &Host) -> Result<()> {
    host.auth.logout()?;
    println!("Logged out");
    Ok(())
}

fn status(host: &Host) -> Result<()> {
    let Some(token) = host.auth.store().current().filter(|_| host.auth.is_authenticated()) else {
        println!("Not logged in");
        return Ok(());
    };

    println!("Logged in");
    match token.claims() {
        Ok(claims) => println!("{}", serde_json::to_string_pretty(&claims)?),
        Err(e) => println!("Claims could not be decoded: {}", e),
    }
    Ok(())
}

async fn profile(host: &Host) -> Result<()> {
    if !host.auth.is_authenticated() {
        bail!("Not logged in. Run `xpboard login` first.");
    }
    let data = host.dashboard().load().await?;
    print!("{}", render_summary(&data));
    Ok(())
}

async fn raw_query(host: &Host, source: Option<&String>, variables: Option<&String>) -> Result<()> {
    let source = source.context("query needs a file path or '-' for stdin")?;
    let document = if source == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {}", source))?
    };
    let variables: Value = match variables {
        Some(text) => serde_json::from_str(text).context("Variables must be a JSON object")?,
        None => Value::Object(Default::default()),
    };

    let data = host.auth.graphql().query(&document, variables).await?;
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let line = line.trim().to_string();
    if line.is_empty() {
        bail!("A username is required");
    }
    Ok(line)
}

fn skill_bar(value: f64) -> String {
    let filled = (value * SKILL_BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(SKILL_BAR_WIDTH - filled.min(SKILL_BAR_WIDTH)))
}

fn render_summary(data: &DashboardData) -> String {
    let profile = &data.profile;
    let mut out = String::new();

    out.push_str(&format!("{}\n", profile.login_display()));
    if let Some(name) = profile.full_name() {
        out.push_str(&format!("  Name:         {}\n", name));
    }
    out.push_str(&format!("  Email:        {}\n", profile.email.as_deref().unwrap_or("N/A")));
    out.push_str(&format!(
        "  Level:        {}\n",
        data.level.map(|l| l.to_string()).unwrap_or_else(|| "N/A".to_string())
    ));
    out.push_str(&format!("  Total XP:     {}\n", format_kilobytes(data.xp())));
    out.push_str(&format!("  Audit ratio:  {}\n", format_audit_ratio(profile.audit_ratio)));

    let split = profile.audit_split();
    let (done_pct, received_pct) = split.percentages();
    out.push_str(&format!(
        "  Audits done:  {} ({}%)\n  Received:     {} ({}%)\n",
        format_megabytes(split.done),
        done_pct,
        format_megabytes(split.received),
        received_pct
    ));

    let stats = data.project_stats();
    out.push_str(&format!("\nProjects: {} total, {} completed\n", stats.total, stats.completed));
    if data.projects.is_empty() {
        out.push_str("  No projects found.\n");
    }
    for group in data.projects.iter().take(RECENT_PROJECT_COUNT) {
        let updated = group.updated_at.as_deref().map(format_date).unwrap_or_default();
        out.push_str(&format!(
            "  {:<48} {:<10} {}\n",
            truncate_string(group.path.as_deref().unwrap_or("Unknown"), MAX_PATH_WIDTH),
            group.status_display(),
            updated
        ));
    }

    out.push_str("\nSkills\n");
    if data.skills.is_empty() {
        out.push_str("  No skills data available.\n");
    } else {
        for axis in data.skill_axes() {
            out.push_str(&format!("  {:<10} {} {:>3}\n", axis.label, skill_bar(axis.value), axis.raw));
        }
    }

    let timeline = profile.xp_timeline();
    if !timeline.is_empty() {
        out.push_str("\nRecent XP\n");
        for point in timeline.iter().rev().take(RECENT_XP_COUNT) {
            out.push_str(&format!(
                "  {}  +{:<8} {:<10} {}\n",
                point.date.format("%Y-%m-%d"),
                point.amount,
                format_kilobytes(point.total),
                truncate_string(&point.path, MAX_PATH_WIDTH)
            ));
        }
    }

    out
}
