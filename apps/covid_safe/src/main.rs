mod config;
mod render;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    ControllerConfig, ControllerError, DataOrchestrator, RenderSink, SelectionController,
    SelectionState,
};
use shared::domain::SelectionPath;
use storage::{MemoryKeyValueStore, SelectionStore, SqliteKeyValueStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::{load_settings, normalize_database_url, Settings, DEFAULT_CONFIG_FILE},
    render::{format_pickers, format_report, OutputFormat, TerminalSink},
};

/// Chance that a group of people includes someone currently infectious.
#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Base URL serving `/data/...` files.
    #[arg(long)]
    data_url: Option<String>,
    /// Cache-busting token; the current time when unset.
    #[arg(long)]
    data_version: Option<String>,
    #[arg(long)]
    selection_db_url: Option<String>,
    /// Reported cases are multiplied by this to estimate true infections.
    #[arg(long)]
    multiplier: Option<f64>,
    #[arg(long)]
    target_percent: Option<f64>,
    #[arg(long)]
    group_size: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the report for a place, or for the remembered one when no
    /// country is given.
    Show {
        #[command(flatten)]
        place: Place,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Also print the chart series.
        #[arg(long)]
        charts: bool,
    },
    /// List the places that can be chosen below a selection.
    List {
        #[command(flatten)]
        place: Place,
    },
}

#[derive(Args, Debug)]
struct Place {
    #[arg(long)]
    country: Option<String>,
    #[arg(long, requires = "country")]
    province: Option<String>,
    #[arg(long, requires = "province")]
    county: Option<String>,
}

impl Place {
    fn path(&self) -> Result<SelectionPath> {
        let names = [
            self.country.as_ref(),
            self.province.as_ref(),
            self.county.as_ref(),
        ];
        Ok(SelectionPath::new(names.into_iter().flatten())?)
    }
}

impl Cli {
    fn overlay(&self, settings: &mut Settings) {
        if let Some(v) = &self.data_url {
            settings.data_url = v.clone();
        }
        if let Some(v) = &self.data_version {
            settings.data_version = Some(v.clone());
        }
        if let Some(v) = &self.selection_db_url {
            settings.selection_db_url = normalize_database_url(v);
        }
        if let Some(v) = self.multiplier {
            settings.multiplier = v;
        }
        if let Some(v) = self.target_percent {
            settings.target_percent = v;
        }
        if let Some(v) = self.group_size {
            settings.summary_group_size = v;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config)?;
    cli.overlay(&mut settings);
    settings.validate()?;
    info!(data_url = %settings.data_url, db = %settings.selection_db_url, "config: loaded");

    let orchestrator = DataOrchestrator::new(&settings.data_url)?;
    let tree = orchestrator
        .fetch_locations()
        .await
        .context("failed to load the location index")?;

    match &cli.command {
        Command::List { place } => {
            let requested = place.path()?;
            let resolved = tree.resolve(&requested).path;
            ensure_known(&requested, &resolved)?;
            print!("{}", format_pickers(&tree.pickers(&resolved))?);
        }
        Command::Show {
            place,
            format,
            charts,
        } => {
            let requested = place.path()?;
            ensure_known(&requested, &tree.resolve(&requested).path)?;

            let sink = Arc::new(TerminalSink::default());
            let controller = SelectionController::new(
                tree,
                open_selection_store(&settings.selection_db_url).await,
                orchestrator,
                Arc::clone(&sink) as Arc<dyn RenderSink>,
                ControllerConfig {
                    report: settings.report_settings(),
                    data_version: settings.data_version.clone(),
                },
            );

            let state = if requested.is_empty() {
                controller.restore().await?
            } else {
                select(&controller, place).await?
            };

            if state == SelectionState::NoSelection {
                eprintln!("No place selected; choose a country with --country.");
                if let Some(pickers) = sink.pickers() {
                    print!("{}", format_pickers(&pickers)?);
                }
                return Ok(());
            }

            let Some(report) = sink.report() else {
                bail!("no data to show for {}", controller.path());
            };
            match format {
                OutputFormat::Text => print!("{}", format_report(&report, *charts)?),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
    }

    Ok(())
}

/// Walks the cascade one level at a time. Only the last level's outcome
/// counts; earlier failures are already logged by the controller.
async fn select(
    controller: &SelectionController,
    place: &Place,
) -> Result<SelectionState, ControllerError> {
    let mut outcome = match &place.country {
        Some(country) => controller.on_country_changed(country).await,
        None => Ok(controller.state()),
    };
    if let Some(province) = &place.province {
        outcome = controller.on_province_changed(province).await;
    }
    if let Some(county) = &place.county {
        outcome = controller.on_county_changed(county).await;
    }
    outcome
}

fn ensure_known(requested: &SelectionPath, resolved: &SelectionPath) -> Result<()> {
    if let Some(unknown) = requested.segments().get(resolved.len()) {
        bail!("unknown place '{unknown}' under '{resolved}'");
    }
    Ok(())
}

async fn open_selection_store(database_url: &str) -> SelectionStore {
    match open_sqlite(database_url).await {
        Ok(backend) => SelectionStore::new(Arc::new(backend)),
        Err(err) => {
            warn!(url = database_url, error = ?err, "store: selection will not be remembered");
            SelectionStore::new(Arc::new(MemoryKeyValueStore::new()))
        }
    }
}

async fn open_sqlite(database_url: &str) -> Result<SqliteKeyValueStore> {
    let backend = SqliteKeyValueStore::new(database_url).await?;
    backend
        .health_check()
        .await
        .with_context(|| format!("selection database '{database_url}' is not usable"))?;
    Ok(backend)
}
