use anyhow::Result;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use donorflow_core::audit::{self, AuditReport};
use donorflow_core::config::AppConfig;
use donorflow_core::db::{self, PgDonorStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Donorflow administrative tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare stored donor totals against their donation history
    AuditAggregates(AuditAggregatesArgs),
}

#[derive(Args, Debug, Default)]
struct AuditAggregatesArgs {
    /// Rewrite drifted aggregates instead of only reporting them
    #[arg(long)]
    apply: bool,
    /// Skip running migrations before inspecting the database
    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::AuditAggregates(args) => handle_audit_aggregates(args).await,
    }
}

async fn handle_audit_aggregates(args: AuditAggregatesArgs) -> Result<()> {
    let config = AppConfig::from_env()?;
    let pool = db::connect(config.require_database_url()?, config.db_max_connections).await?;

    if args.skip_migrations {
        info!("Skipping migrations at user request");
    } else {
        db::run_migrations(&pool).await?;
    }

    let store = PgDonorStore::new(pool);
    let report = audit::audit_aggregates(&store).await?;

    if report.drifted.is_empty() {
        println!(
            "Checked {} donors. All aggregates match their donation history.",
            report.checked
        );
    } else {
        println!(
            "Checked {} donors; {} have drifted aggregates:",
            report.checked,
            report.drifted.len()
        );
        println!("{}", drift_table(&report));
    }

    for donor_id in &report.without_history {
        println!("  Donor {donor_id} has no donation history and was skipped");
    }

    if args.apply {
        let repaired = audit::apply_repairs(&store, &report, Utc::now()).await?;
        println!("Rewrote aggregates for {repaired} donors.");
    } else if !report.drifted.is_empty() {
        println!("Run again with --apply to rewrite the drifted aggregates.");
    }

    Ok(())
}

fn drift_table(report: &AuditReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let headers = [
        "Donor",
        "Email",
        "Stored total",
        "History total",
        "Stored last",
        "History last",
    ];
    table.set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)));

    for drift in &report.drifted {
        table.add_row(vec![
            Cell::new(drift.donor_id),
            Cell::new(&drift.email),
            Cell::new(format!("{:.2}", drift.stored_total)),
            Cell::new(format!("{:.2}", drift.expected_total)),
            Cell::new(drift.stored_last),
            Cell::new(drift.expected_last),
        ]);
    }

    table
}
