//! Storefront Dashboard — computes the back-office KPI snapshot from a JSON
//! fixture of backend tables and prints it.
//!
//! With `--follow`, the fixture file is re-read periodically and every new
//! snapshot published by live refresh is printed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use storefront_analytics::{
    AnalyticsPipeline, DashboardHandle, DateRange, KpiSnapshot, MemorySource,
};
use storefront_core::config::AppConfig;
use storefront_core::notify::log_sink;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "storefront-dashboard")]
#[command(about = "Storefront back-office analytics snapshot")]
#[command(version)]
struct Cli {
    /// JSON fixture mapping table names to rows (overrides config)
    #[arg(long, env = "STOREFRONT_DASHBOARD__SOURCE__FIXTURE_PATH")]
    fixtures: Option<PathBuf>,

    /// Range tag: today, yesterday, 7days, 30days, thisMonth or custom
    #[arg(long, env = "STOREFRONT_DASHBOARD__ANALYTICS__DEFAULT_RANGE")]
    range: Option<String>,

    /// Start of a custom range (RFC 3339)
    #[arg(long)]
    start: Option<DateTime<Utc>>,

    /// End of a custom range (RFC 3339)
    #[arg(long)]
    end: Option<DateTime<Utc>>,

    /// Pretty-print the snapshot JSON
    #[arg(long, default_value_t = false)]
    pretty: bool,

    /// Re-read the fixture every N seconds and print each new snapshot
    #[arg(long)]
    follow: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_dashboard=info,storefront_analytics=info".into()),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(path) = &cli.fixtures {
        config.source.fixture_path = Some(path.display().to_string());
    }
    if let Some(range) = &cli.range {
        config.analytics.default_range = range.clone();
    }

    let mut range: DateRange = config.analytics.default_range.parse()?;
    if cli.start.is_some() || cli.end.is_some() {
        range = DateRange::Custom {
            start: cli.start,
            end: cli.end,
        };
    }

    info!(
        range = %range,
        fixture = config.source.fixture_path.as_deref().unwrap_or("<none>"),
        debounce_ms = config.analytics.debounce_ms,
        "Configuration loaded"
    );

    let source = Arc::new(match &config.source.fixture_path {
        Some(path) => MemorySource::load_fixture(path)
            .with_context(|| format!("loading fixture {path}"))?,
        None => {
            warn!("No fixture configured, starting with an empty data source");
            MemorySource::new()
        }
    });
    info!(rows = source.total_rows(), "Data source ready");

    let pipeline = Arc::new(AnalyticsPipeline::new(source.clone(), log_sink(), &config.analytics)?);
    pipeline.set_range(range);

    match cli.follow {
        None => {
            pipeline.run_cycle().await?;
            print_snapshot(&pipeline.snapshot(), cli.pretty)?;
        }
        Some(secs) => {
            let dashboard = DashboardHandle::with_pipeline(
                pipeline,
                Duration::from_millis(config.analytics.debounce_ms),
            )?;
            follow(&dashboard, &source, config.source.fixture_path.as_deref(), secs, cli.pretty)
                .await?;
            dashboard.close();
        }
    }

    Ok(())
}

async fn follow(
    dashboard: &DashboardHandle,
    source: &MemorySource,
    fixture_path: Option<&str>,
    secs: u64,
    pretty: bool,
) -> anyhow::Result<()> {
    let mut changes = dashboard.changes();
    let mut reload = tokio::time::interval(Duration::from_secs(secs.max(1)));
    reload.tick().await;

    info!(interval_secs = secs, "Following fixture, press Ctrl-C to stop");
    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = changes.borrow_and_update().clone();
                print_snapshot(&snapshot, pretty)?;
            }
            _ = reload.tick() => {
                let Some(path) = fixture_path else { continue };
                match read_fixture(path) {
                    Ok(fixture) => {
                        if let Err(e) = source.reseed(&fixture) {
                            error!(error = %e, "Failed to reseed data source");
                        }
                    }
                    Err(e) => error!(error = %e, "Failed to re-read fixture"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }
    Ok(())
}

fn read_fixture(path: &str) -> anyhow::Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn print_snapshot(snapshot: &KpiSnapshot, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(snapshot)?
    } else {
        serde_json::to_string(snapshot)?
    };
    println!("{json}");
    Ok(())
}
