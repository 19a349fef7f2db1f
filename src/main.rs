use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod accrual;
mod config;
mod dashboard;
mod db;
mod error;
mod import;
#[cfg(test)]
mod memory;
mod models;
mod portfolio;
mod report;
mod store;
mod week;
mod workflow;

use accrual::StatusPolicy;
use config::Config;
use portfolio::ClientFilter;
use workflow::CommitmentChange;

#[derive(Parser)]
#[command(name = "commitment-tracker")]
#[command(about = "Weekly delivery commitment tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
#[command(group(
    ArgGroup::new("scope")
        .args(["all", "contracted_only"])
        .multiple(false)
))]
struct WeekArgs {
    /// Reference date (defaults to now)
    #[arg(long)]
    today: Option<NaiveDate>,
    /// Include clients without an executed contract
    #[arg(long)]
    all: bool,
    /// Only contracted clients
    #[arg(long)]
    contracted_only: bool,
    /// Daily pace above which a client is flagged yellow
    #[arg(long, value_parser = parse_threshold_arg)]
    yellow_per_day: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo clients, commitments and completions
    Seed {
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Import clients and weekly commitments from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Show this week's KPIs and the clients with work due
    Dashboard {
        #[command(flatten)]
        week: WeekArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// List every client with its weekly status
    Clients {
        #[command(flatten)]
        week: WeekArgs,
    },
    /// Show one client's figures, commitment history and recent completions
    Client {
        id: Uuid,
        #[arg(long)]
        today: Option<NaiveDate>,
        #[arg(long, value_parser = parse_threshold_arg)]
        yellow_per_day: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Log completed work for a client
    #[command(group(
        ArgGroup::new("when")
            .args(["on", "friday"])
            .multiple(false)
    ))]
    Log {
        client: Uuid,
        qty: i64,
        #[arg(long)]
        note: Option<String>,
        /// Date the work to a specific day
        #[arg(long)]
        on: Option<NaiveDate>,
        /// Date the work to this week's Friday
        #[arg(long)]
        friday: bool,
    },
    /// Set a client's weekly commitment, retiring the previous one
    Commit {
        client: Uuid,
        qty: i64,
        /// Any date in the first effective week (defaults to this week)
        #[arg(long)]
        start: Option<NaiveDate>,
    },
    /// Delete a client together with its commitments and completions
    DeleteClient { id: Uuid },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        week: WeekArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn parse_threshold_arg(raw: &str) -> Result<f64, String> {
    config::parse_threshold(raw).map_err(|err| err.to_string())
}

fn reference_instant(today: Option<NaiveDate>) -> NaiveDateTime {
    today.map_or_else(|| Local::now().naive_local(), |d| d.and_time(NaiveTime::MIN))
}

impl WeekArgs {
    fn filter(&self, config: &Config) -> ClientFilter {
        let contracted_only = if self.all {
            false
        } else if self.contracted_only {
            true
        } else {
            config.contracted_only
        };
        ClientFilter { contracted_only }
    }
}

fn policy_with(config: &Config, override_per_day: Option<f64>) -> StatusPolicy {
    override_per_day.map_or(config.policy, |yellow_need_per_day| StatusPolicy {
        yellow_need_per_day,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = db::connect(&config.database_url, config.max_connections)
        .await
        .context("failed to connect to Postgres")?;
    let store = db::PgStore::new(pool.clone());

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed { today } => {
            let today = reference_instant(today).date();
            let clients = import::seed_demo(&store, today).await?;
            println!("Seeded {clients} clients.");
        }
        Commands::Import { csv, today } => {
            let today = reference_instant(today).date();
            let summary = import::import_csv(&store, &csv, today).await?;
            println!(
                "Imported {} clients from {}: {} commitments created, {} unchanged, {} rows skipped.",
                summary.clients_upserted,
                csv.display(),
                summary.commitments_created,
                summary.commitments_unchanged,
                summary.rows_skipped
            );
        }
        Commands::Dashboard { week, limit, json } => {
            let policy = policy_with(&config, week.yellow_per_day);
            let snapshot = dashboard::load_snapshot(
                &store,
                week.filter(&config),
                reference_instant(week.today),
                &policy,
            )
            .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
                return Ok(());
            }

            let kpis = &snapshot.kpis;
            println!(
                "Week {} to {}: required {}, completed {}, remaining {}",
                snapshot.week_start,
                snapshot.week_end,
                kpis.total_required,
                kpis.total_completed,
                kpis.total_remaining
            );
            if snapshot.due.is_empty() {
                println!("Nothing due this week.");
                return Ok(());
            }
            println!("Due this week:");
            for row in portfolio::top_remaining(&snapshot.due, limit) {
                println!("- {}", report::status_line(&row));
            }
        }
        Commands::Clients { week } => {
            let policy = policy_with(&config, week.yellow_per_day);
            let snapshot = dashboard::load_snapshot(
                &store,
                week.filter(&config),
                reference_instant(week.today),
                &policy,
            )
            .await?;
            if snapshot.roster.is_empty() {
                println!("No clients yet. Import a CSV.");
            }
            for row in snapshot.roster.iter() {
                println!("{}  {}", row.client.id, report::status_line(row));
            }
        }
        Commands::Client {
            id,
            today,
            yellow_per_day,
            json,
        } => {
            let policy = policy_with(&config, yellow_per_day);
            let detail = dashboard::load_client_detail(&store, id, reference_instant(today), &policy).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&detail)?);
                return Ok(());
            }

            let client = &detail.client;
            let figures = &detail.figures;
            println!(
                "{} ({}){}",
                client.name,
                if client.contract_executed { "contracted" } else { "not contracted" },
                client
                    .total_lives
                    .map(|l| format!(", lives {l}"))
                    .unwrap_or_default()
            );
            println!(
                "status {}: quota {} + carry-in {:+} = required {}, done {}, remaining {} ({:.1}/day)",
                figures.status,
                figures.quota_this_week,
                figures.carry_in,
                figures.required,
                figures.completed_this_week,
                figures.remaining,
                figures.need_per_day
            );
            println!("Commitments:");
            for c in detail.commitments.iter() {
                println!(
                    "- {} per week from {}{}",
                    c.weekly_qty,
                    c.start_week,
                    if c.active { " (active)" } else { "" }
                );
            }
            println!("Recent completions:");
            for c in detail.completions.iter() {
                println!(
                    "- {} on {}{}",
                    c.qty_completed,
                    c.occurred_on.format("%Y-%m-%d %H:%M"),
                    c.note.as_deref().map(|n| format!(": {n}")).unwrap_or_default()
                );
            }
        }
        Commands::Log {
            client,
            qty,
            note,
            on,
            friday,
        } => {
            let occurred_on = workflow::completion_instant(Local::now().naive_local(), on, friday);
            let event = workflow::log_completion(&store, client, qty, note, occurred_on).await?;
            println!("Logged {} for {} on {}.", event.qty_completed, client, event.occurred_on.date());
        }
        Commands::Commit { client, qty, start } => {
            let effective = start.unwrap_or_else(|| Local::now().date_naive());
            match workflow::save_commitment(&store, client, qty, effective).await? {
                CommitmentChange::Unchanged(current) => {
                    println!(
                        "Commitment unchanged: {} per week from {}.",
                        current.weekly_qty, current.start_week
                    );
                }
                CommitmentChange::Created { commitment, retired } => {
                    println!(
                        "Commitment set to {} per week from {} ({} retired).",
                        commitment.weekly_qty, commitment.start_week, retired
                    );
                }
            }
        }
        Commands::DeleteClient { id } => {
            if workflow::delete_client(&store, id).await? {
                println!("Client {id} deleted.");
            } else {
                println!("No client {id}.");
            }
        }
        Commands::Report { week, out } => {
            let policy = policy_with(&config, week.yellow_per_day);
            let snapshot = dashboard::load_snapshot(
                &store,
                week.filter(&config),
                reference_instant(week.today),
                &policy,
            )
            .await?;
            let report = report::build_report(&snapshot);
            std::fs::write(&out, report)?;
            info!(path = %out.display(), clients = snapshot.roster.len(), "report written");
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
