use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use jobtrack_client::api::{
    ApplicationPatch, ApplicationStatus, DashboardStats, JobApplication, ListQuery,
    NewApplication, Page,
};
use jobtrack_client::auth::{mask_token, Error, Navigation, Route};
use jobtrack_client::{AppConfig, JobTracker};
use miette::{miette, IntoDiagnostic};

#[derive(Parser, Debug)]
#[command(name = "jobtrack", version, about = "Job application tracker client")]
struct Cli {
    /// Config file (defaults to ~/.config/jobtrack/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend base URL.
    #[arg(long, global = true, env = "JOBTRACK_BASE_URL")]
    base_url: Option<String>,

    /// Print raw JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with an existing credential pair.
    Login {
        #[arg(long, env = "JOBTRACK_ACCESS_TOKEN")]
        access: String,
        #[arg(long, env = "JOBTRACK_REFRESH_TOKEN")]
        refresh: String,
    },
    /// Sign in with a Google access token.
    SocialLogin {
        #[arg(long)]
        token: String,
    },
    Logout,
    /// Show who is signed in.
    Whoami,
    Dashboard,
    List(ListArgs),
    Show {
        id: u64,
        /// Number of status changes to show.
        #[arg(long, default_value_t = 5)]
        history: usize,
    },
    Add(AddArgs),
    Edit {
        id: u64,
        #[command(flatten)]
        fields: EditArgs,
    },
    SetStatus {
        id: u64,
        status: ApplicationStatus,
    },
    Delete {
        id: u64,
    },
    /// Acknowledge a follow-up reminder.
    Ack {
        id: u64,
    },
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long)]
    status: Option<ApplicationStatus>,
    #[arg(long)]
    page_size: Option<u32>,
    #[arg(long)]
    page: Option<u32>,
    /// Walk every page.
    #[arg(long)]
    all: bool,
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(long)]
    company: String,
    #[arg(long)]
    position: String,
    #[arg(long)]
    location: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    applied_date: Option<NaiveDate>,
    #[arg(long, default_value = "applied")]
    status: ApplicationStatus,
    #[arg(long)]
    contact_name: Option<String>,
    #[arg(long)]
    contact_email: Option<String>,
}

#[derive(Args, Debug)]
struct EditArgs {
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    position: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    applied_date: Option<NaiveDate>,
    #[arg(long)]
    contact_name: Option<String>,
    #[arg(long)]
    contact_email: Option<String>,
}

impl Command {
    /// The view this command acts on, for the route guard.
    fn route(&self) -> Option<Route> {
        match self {
            Command::Login { .. }
            | Command::SocialLogin { .. }
            | Command::Logout
            | Command::Whoami => None,
            Command::Dashboard => Some(Route::Dashboard),
            Command::List(_) | Command::Add(_) => Some(Route::Applications),
            Command::Show { id, .. }
            | Command::Edit { id, .. }
            | Command::SetStatus { id, .. }
            | Command::Delete { id }
            | Command::Ack { id } => Some(Route::Application(*id)),
        }
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path.clone()),
        None => AppConfig::load(),
    };
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }

    let _log_guard = jobtrack_client::core::logging::init(&config.logging, &config.log_dir());
    tracing::debug!("{} v{} starting", jobtrack_client::NAME, jobtrack_client::VERSION);

    let tracker = JobTracker::from_config(&config).into_diagnostic()?;
    tracker.hydrate().await;

    if let Some(route) = cli.command.route() {
        if let Navigation::Redirect { .. } = tracker.guard().check(route) {
            return Err(miette!(
                help = "run `jobtrack login` or `jobtrack social-login` first",
                "not signed in"
            ));
        }
    }

    run(&tracker, cli.command, cli.json, config.api.default_page_size)
        .await
        .map_err(report)
}

async fn run(
    tracker: &JobTracker,
    command: Command,
    json: bool,
    default_page_size: Option<u32>,
) -> Result<(), Error> {
    match command {
        Command::Login { access, refresh } => {
            tracker.login(access, refresh).await?;
            println!("Signed in{}", subject_suffix(tracker));
        }
        Command::SocialLogin { token } => {
            tracker.social_login().exchange(&token).await?;
            println!("Signed in{}", subject_suffix(tracker));
        }
        Command::Logout => {
            tracker.logout().await;
            println!("Signed out");
        }
        Command::Whoami => match tracker.session().access_token() {
            Some(access) => {
                let subject = tracker
                    .session()
                    .subject()
                    .unwrap_or_else(|| "unknown user".to_string());
                println!("{subject} (access {})", mask_token(&access));
            }
            None => println!("Not signed in"),
        },
        Command::Dashboard => {
            let stats = tracker.dashboard().stats().await?;
            emit(json, &stats, print_dashboard)?;
        }
        Command::List(args) => {
            let query = ListQuery {
                status: args.status,
                page_size: args.page_size.or(default_page_size),
                page: args.page,
            };
            if args.all {
                let all = tracker.applications().list_all(&query).await?;
                emit(json, &all, |apps| apps.iter().for_each(print_row))?;
            } else {
                let page = tracker.applications().list(&query).await?;
                emit(json, &page, print_page)?;
            }
        }
        Command::Show { id, history } => {
            let app = tracker.applications().get(id).await?;
            emit(json, &app, |app| print_detail(app, history))?;
        }
        Command::Add(args) => {
            let new = NewApplication {
                company_name: args.company,
                position: args.position,
                location: args.location.unwrap_or_default(),
                applied_date: args.applied_date,
                current_status: args.status,
                contact_name: args.contact_name,
                contact_email: args.contact_email,
            };
            let app = tracker.applications().create(&new).await?;
            emit(json, &app, print_row)?;
        }
        Command::Edit { id, fields } => {
            let patch = ApplicationPatch {
                company_name: fields.company,
                position: fields.position,
                location: fields.location,
                applied_date: fields.applied_date,
                current_status: None,
                contact_name: fields.contact_name,
                contact_email: fields.contact_email,
            };
            if patch.is_empty() {
                println!("Nothing to change");
                return Ok(());
            }
            let app = tracker.applications().update(id, &patch).await?;
            emit(json, &app, print_row)?;
        }
        Command::SetStatus { id, status } => {
            let app = tracker.applications().change_status(id, status).await?;
            emit(json, &app, |app| print_detail(app, 1))?;
        }
        Command::Delete { id } => {
            tracker.applications().delete(id).await?;
            println!("Deleted application {id}");
        }
        Command::Ack { id } => {
            tracker.applications().acknowledge_followup(id).await?;
            println!("Follow-up acknowledged for application {id}");
        }
    }
    Ok(())
}

fn report(err: Error) -> miette::Report {
    match err {
        Error::Unauthorized => miette!(
            help = "your session has ended; sign in again with `jobtrack login`",
            "{}",
            Error::Unauthorized
        ),
        Error::Validation { status, body } => miette!(
            "request rejected ({status}):\n{}",
            serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string())
        ),
        other => miette::Report::msg(other.to_string()),
    }
}

fn emit<T: serde::Serialize>(json: bool, value: &T, text: impl FnOnce(&T)) -> Result<(), Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

fn subject_suffix(tracker: &JobTracker) -> String {
    tracker
        .session()
        .subject()
        .map(|s| format!(" as {s}"))
        .unwrap_or_default()
}

fn print_row(app: &JobApplication) {
    let followup = if app.needs_followup { "  [follow up]" } else { "" };
    println!(
        "{:>5}  {:<24} {:<28} {}{}",
        app.id, app.company_name, app.position, app.current_status, followup
    );
}

fn print_page(page: &Page<JobApplication>) {
    page.results.iter().for_each(print_row);
    println!(
        "-- {} shown of {}{}",
        page.results.len(),
        page.count,
        if page.next.is_some() { " (more with --page or --all)" } else { "" }
    );
}

fn print_detail(app: &JobApplication, history: usize) {
    println!("{} at {}", app.position, app.company_name);
    println!("  status:   {}", app.current_status);
    if !app.location.is_empty() {
        println!("  location: {}", app.location);
    }
    if let Some(date) = app.applied_date {
        println!("  applied:  {date}");
    }
    if let Some(name) = &app.contact_name {
        println!("  contact:  {name}");
    }
    if let Some(email) = &app.contact_email {
        println!("  email:    {email}");
    }
    if app.needs_followup {
        println!("  follow-up due");
    }
    let recent = app.recent_audits(history);
    if !recent.is_empty() {
        println!("  history:");
        for audit in recent {
            println!(
                "    {}  {} -> {}",
                audit.changed_at.format("%Y-%m-%d %H:%M"),
                audit.previous_status,
                audit.new_status
            );
        }
    }
}

fn print_dashboard(stats: &DashboardStats) {
    for status in ApplicationStatus::ALL {
        println!("{:<20} {}", status.label(), stats.count_for(status));
    }
    println!("{:<20} {}", "Total", stats.total());
}
