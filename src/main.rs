//! dealgraph CLI entry point.

use std::io::Read;
use std::path::PathBuf;

use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use dealgraph_lib::error::{DealError, ErrorPayload};
use dealgraph_lib::pty::ClaudeCliOracle;
use dealgraph_lib::services::{
    activities, dashboard, data, import, insights, stakeholders, sync, workspaces,
};
use dealgraph_lib::state::{create_or_update_config, AppState};
use dealgraph_lib::types::{
    ActivityType, DealRole, NewStakeholder, NewWorkspace, Priority, RelationshipStrength,
    StakeholderPatch,
};

#[derive(Parser)]
#[command(name = "dealgraph")]
#[command(about = "Deal stakeholder tracking and reconciliation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default ~/.dealgraph/config.json)
    #[arg(long, global = true, env = "DEALGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Workspace ID (default from config)
    #[arg(short, long, global = true)]
    workspace: Option<String>,

    /// Evaluate date-relative rules as of this date (YYYY-MM-DD)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    /// Print errors as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Workspace management
    #[command(subcommand)]
    Workspace(WorkspaceCommands),

    /// Stakeholder roster
    #[command(subcommand)]
    Stakeholder(StakeholderCommands),

    /// Activity timeline
    #[command(subcommand)]
    Activity(ActivityCommands),

    /// Deal health score and factors
    Health,

    /// P0/P1 stakeholders overdue for a meeting
    Gaps,

    /// Critical alerts
    Alerts,

    /// Health, gaps, alerts, team coverage and quick stats together
    Dashboard,

    /// AI-assisted import of a transcript or email
    #[command(subcommand)]
    Import(ImportCommands),

    /// AI deal insights
    Insights,

    /// AI meeting-prep brief
    Prep {
        /// Attendee stakeholder IDs (comma-separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        attendees: Vec<String>,

        /// What the meeting is about
        #[arg(short, long)]
        context: Option<String>,
    },

    /// Gmail and Calendar sync
    #[command(subcommand)]
    Sync(SyncCommands),

    /// JSON import/export
    #[command(subcommand)]
    Data(DataCommands),

    /// Configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum WorkspaceCommands {
    /// Create a workspace for a company
    Create {
        /// Company name
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        deal_context: String,
        #[arg(long, default_value = "")]
        deal_summary: String,
        #[arg(long, default_value = "")]
        renewal_info: String,
        /// Teams (comma-separated)
        #[arg(long, value_delimiter = ',')]
        teams: Vec<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// List workspaces
    List,
    /// Show one workspace
    Show { id: String },
}

#[derive(Args)]
struct StakeholderFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    team: Option<String>,
    #[arg(long)]
    role: Option<DealRole>,
    #[arg(long)]
    priority: Option<Priority>,
    #[arg(long)]
    strength: Option<RelationshipStrength>,
    #[arg(long)]
    last_contact: Option<NaiveDate>,
    /// Key priorities (comma-separated)
    #[arg(long, value_delimiter = ',')]
    key_priorities: Option<Vec<String>>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long)]
    email: Option<String>,
}

#[derive(Subcommand)]
enum StakeholderCommands {
    /// List stakeholders
    List,
    /// Show one stakeholder
    Show { id: String },
    /// Add a stakeholder
    Add {
        name: String,
        #[command(flatten)]
        fields: StakeholderFields,
    },
    /// Edit a stakeholder
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: StakeholderFields,
    },
    /// Delete a stakeholder and clean up their activities
    Delete { id: String },
    /// Activities involving one stakeholder
    Timeline { id: String },
}

#[derive(Subcommand)]
enum ActivityCommands {
    /// List activities, newest first
    List,
    /// Log an interaction
    Log {
        #[arg(long)]
        date: NaiveDate,
        #[arg(long = "type")]
        activity_type: ActivityType,
        /// Participant stakeholder IDs (comma-separated)
        #[arg(long, value_delimiter = ',')]
        stakeholders: Vec<String>,
        #[arg(long, default_value = "")]
        summary: String,
    },
}

#[derive(Subcommand)]
enum ImportCommands {
    /// Extract stakeholders and an activity from text (reads stdin without --file)
    Parse {
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[arg(long = "source-type", default_value = "Meeting")]
        source_type: ActivityType,
    },
    /// Apply a reviewed import payload (JSON)
    Confirm {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum SyncCommands {
    /// Sync recent Gmail threads
    Gmail,
    /// Sync the Google Calendar window
    Calendar,
    /// Last sync time and result per source
    Status,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Write stakeholders.json and activities.json
    Export { dir: PathBuf },
    /// Replace the workspace with stakeholders.json and activities.json
    Import { dir: PathBuf },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Allow auto-creation of contacts on a domain
    AddDomain { domain: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), DealError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| DealError::Config(format!("Failed to serialize output: {}", e)))?;
    println!("{}", out);
    Ok(())
}

fn read_input(file: Option<PathBuf>) -> Result<String, DealError> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn patch_from(name: Option<String>, fields: StakeholderFields) -> StakeholderPatch {
    StakeholderPatch {
        name,
        title: fields.title,
        team: fields.team,
        role: fields.role,
        priority: fields.priority,
        last_contact_date: fields.last_contact,
        relationship_strength: fields.strength,
        key_priorities: fields.key_priorities,
        notes: fields.notes,
        email: fields.email,
    }
}

fn new_stakeholder_from(name: String, fields: StakeholderFields) -> NewStakeholder {
    NewStakeholder {
        name,
        title: fields.title.unwrap_or_default(),
        team: fields.team.unwrap_or_default(),
        role: fields.role.unwrap_or(DealRole::Influencer),
        priority: fields.priority.unwrap_or(Priority::P2),
        last_contact_date: fields.last_contact,
        relationship_strength: fields.strength.unwrap_or(RelationshipStrength::Unknown),
        key_priorities: fields.key_priorities.unwrap_or_default(),
        notes: fields.notes.unwrap_or_default(),
        email: fields.email,
    }
}

async fn run(cli: Cli) -> Result<(), DealError> {
    let state = AppState::open(cli.config)?;
    let ws = state.workspace_or_default(cli.workspace.as_deref());
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());

    match cli.command {
        Commands::Workspace(cmd) => match cmd {
            WorkspaceCommands::Create {
                name,
                description,
                deal_context,
                deal_summary,
                renewal_info,
                teams,
                color,
            } => print_json(&workspaces::create_workspace(
                &state,
                NewWorkspace {
                    name,
                    description,
                    deal_context,
                    deal_summary,
                    renewal_info,
                    teams,
                    color,
                },
            )?),
            WorkspaceCommands::List => print_json(&workspaces::list_workspaces(&state)?),
            WorkspaceCommands::Show { id } => print_json(&workspaces::get_workspace(&state, &id)?),
        },
        Commands::Stakeholder(cmd) => match cmd {
            StakeholderCommands::List => print_json(&stakeholders::list_stakeholders(&state, &ws)?),
            StakeholderCommands::Show { id } => {
                print_json(&stakeholders::get_stakeholder(&state, &ws, &id)?)
            }
            StakeholderCommands::Add { name, fields } => print_json(&stakeholders::add_stakeholder(
                &state,
                &ws,
                new_stakeholder_from(name, fields),
            )?),
            StakeholderCommands::Update { id, name, fields } => print_json(
                &stakeholders::update_stakeholder(&state, &ws, &id, &patch_from(name, fields))?,
            ),
            StakeholderCommands::Delete { id } => {
                let removed = stakeholders::delete_stakeholder(&state, &ws, &id)?;
                println!(
                    "Deleted {} ({} activities removed, {} trimmed)",
                    removed.stakeholder.name,
                    removed.activities_removed.len(),
                    removed.activities_trimmed
                );
                Ok(())
            }
            StakeholderCommands::Timeline { id } => {
                print_json(&activities::stakeholder_timeline(&state, &ws, &id)?)
            }
        },
        Commands::Activity(cmd) => match cmd {
            ActivityCommands::List => print_json(&activities::list_activities(&state, &ws)?),
            ActivityCommands::Log {
                date,
                activity_type,
                stakeholders,
                summary,
            } => print_json(&activities::log_activity(
                &state,
                &ws,
                activities::NewActivity {
                    date,
                    activity_type,
                    stakeholder_ids: stakeholders,
                    summary,
                },
            )?),
        },
        Commands::Health => print_json(&dashboard::deal_health(&state, &ws, today)?),
        Commands::Gaps => print_json(&dashboard::meeting_gaps(&state, &ws, today)?),
        Commands::Alerts => print_json(&dashboard::dashboard(&state, &ws, today)?.alerts),
        Commands::Dashboard => print_json(&dashboard::dashboard(&state, &ws, today)?),
        Commands::Import(cmd) => match cmd {
            ImportCommands::Parse { file, source_type } => {
                let transcript = read_input(file)?;
                let oracle = ClaudeCliOracle::from_config(&state.config().oracle);
                print_json(&import::parse_import(
                    &state,
                    &oracle,
                    &ws,
                    &transcript,
                    source_type,
                    today,
                )?)
            }
            ImportCommands::Confirm { file } => {
                let raw = read_input(Some(file))?;
                let payload: import::ConfirmPayload = serde_json::from_str(&raw)
                    .map_err(|e| DealError::validation(format!("Invalid import payload: {}", e)))?;
                print_json(&import::confirm_import(&state, &ws, &payload)?)
            }
        },
        Commands::Insights => {
            let oracle = ClaudeCliOracle::from_config(&state.config().oracle);
            print_json(&insights::generate_insights(&state, &oracle, &ws, today)?)
        }
        Commands::Prep { attendees, context } => {
            let oracle = ClaudeCliOracle::from_config(&state.config().oracle);
            let brief =
                insights::meeting_prep(&state, &oracle, &ws, &attendees, context.as_deref(), today)?;
            println!("{}", brief);
            Ok(())
        }
        Commands::Sync(cmd) => match cmd {
            SyncCommands::Gmail => print_json(&sync::sync_gmail(&state, &ws, today).await?),
            SyncCommands::Calendar => print_json(&sync::sync_calendar(&state, &ws, today).await?),
            SyncCommands::Status => print_json(&sync::sync_status(&state, &ws, Utc::now())?),
        },
        Commands::Data(cmd) => match cmd {
            DataCommands::Export { dir } => {
                print_json(&data::export_workspace_json(&state, &ws, &dir)?)
            }
            DataCommands::Import { dir } => {
                print_json(&data::import_workspace_json(&state, &ws, &dir)?)
            }
        },
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => print_json(&state.config()),
            ConfigCommands::AddDomain { domain } => {
                let domain = domain.trim().trim_start_matches('@').to_lowercase();
                if domain.is_empty() {
                    return Err(DealError::validation("Domain is required"));
                }
                let config = create_or_update_config(&state, |c| {
                    if !c.account_domains.contains(&domain) {
                        c.account_domains.push(domain.clone());
                    }
                })?;
                print_json(&config.account_domains)
            }
        },
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        let payload = ErrorPayload::from(&err);
        if json {
            match serde_json::to_string_pretty(&payload) {
                Ok(out) => eprintln!("{}", out),
                Err(_) => eprintln!("{}", payload.message),
            }
        } else {
            eprintln!("Error: {}", payload.message);
            eprintln!("{}", payload.recovery_suggestion);
        }
        std::process::exit(if err.status_code() >= 500 { 2 } else { 1 });
    }
}
