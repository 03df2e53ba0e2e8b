//! # sales-forecast
//!
//! Command-line front end: forecast an institution from the annual sales
//! table, or maintain the daily tracking ledger.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sales_forecast::data::{parse_date, DataLoader};
use sales_forecast::tracking::{DailyEntry, LoadStatus, TrackingLedger};
use sales_forecast::{forecast_institution, ForecastConfig, ForecastError, SeriesStore};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sales-forecast")]
#[command(about = "Shoe sales tracking and forecasting", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast next year's sales for one institution
    Forecast {
        /// Institution to forecast
        institution: String,

        /// Annual sales CSV (defaults to data.sales_file)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Moving average window in years
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=3))]
        window: Option<u8>,

        /// Write the per-size comparison to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List institutions in the annual sales table
    Institutions {
        /// Annual sales CSV (defaults to data.sales_file)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Record one day's sales for an institution
    Record {
        /// Institution the sales belong to
        institution: String,

        /// Sales date, YYYY-MM-DD (defaults to today)
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,

        /// Quantity sold for a size, as SIZE=PAIRS; repeatable
        #[arg(short = 's', long = "size", value_parser = parse_size_quantity)]
        sizes: Vec<(u32, u32)>,
    },

    /// Delete ledger entries by row index
    Delete {
        /// Zero-based row indexes
        #[arg(required = true)]
        indices: Vec<usize>,
    },

    /// Compare recorded days for an institution
    Compare {
        institution: String,

        /// Dates to compare (defaults to the last two recorded)
        #[arg(short, long, value_parser = parse_date_arg)]
        dates: Vec<NaiveDate>,
    },
}

fn parse_date_arg(raw: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(raw).map_err(|e| e.to_string())
}

fn parse_size_quantity(raw: &str) -> std::result::Result<(u32, u32), String> {
    let (size, pairs) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SIZE=PAIRS, got '{}'", raw))?;
    let size = size
        .trim()
        .parse()
        .map_err(|_| format!("invalid size '{}'", size))?;
    let pairs = pairs
        .trim()
        .parse()
        .map_err(|_| format!("invalid pair count '{}'", pairs))?;
    Ok((size, pairs))
}

fn load_config(path: Option<&Path>) -> Result<ForecastConfig> {
    match path {
        Some(path) => ForecastConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(ForecastConfig::default()),
    }
}

fn load_store(input: Option<PathBuf>, config: &ForecastConfig) -> Result<SeriesStore> {
    let path = input.unwrap_or_else(|| config.data.sales_file.clone());
    let table = DataLoader::from_csv(&path)
        .with_context(|| format!("Failed to load sales data from {}", path.display()))?;
    Ok(SeriesStore::from_table(table))
}

fn open_ledger(config: &ForecastConfig) -> Result<TrackingLedger> {
    let path = &config.tracking.data_file;
    let (ledger, status) = TrackingLedger::open(path, config.tracking.sizes())
        .with_context(|| format!("Failed to open tracking data {}", path.display()))?;
    match status {
        LoadStatus::Loaded => info!("Data loaded successfully!"),
        LoadStatus::Created => info!("New data file created!"),
    }
    Ok(ledger)
}

fn run_forecast(
    config: &mut ForecastConfig,
    institution: &str,
    input: Option<PathBuf>,
    window: Option<u8>,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    if let Some(window) = window {
        config.forecast.sma_window = usize::from(window);
    }

    let store = load_store(input, config)?;
    let report = match forecast_institution(&store, institution, config) {
        Ok(report) => report,
        Err(ForecastError::InsufficientData { found, .. }) => {
            warn!(
                institution,
                found, "Insufficient data for forecasting (need at least 2 years)"
            );
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    for diagnostic in report.diagnostics() {
        warn!("{}", diagnostic);
    }

    if json {
        println!("{}", report.to_json()?);
    } else {
        println!(
            "{} forecast for {} ({}-year SMA window)",
            report.institution(),
            report.target_date(),
            report.window()
        );
        match report.trend() {
            Some(trend) => println!("  Trend total: {}", trend.total()),
            None => println!("  Trend total: unavailable"),
        }
        println!("  SMA total:   {}", report.moving_average().total());
        print!("{}", report.to_csv_string()?);
    }

    if let Some(path) = output {
        report
            .write_csv(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Forecasts written");
    }

    Ok(())
}

fn run_record(
    config: &ForecastConfig,
    institution: String,
    date: Option<NaiveDate>,
    sizes: Vec<(u32, u32)>,
) -> Result<()> {
    if !config.tracking.institutions.contains(&institution) {
        bail!(
            "Unknown institution '{}'; expected one of {:?}",
            institution,
            config.tracking.institutions
        );
    }

    let mut ledger = open_ledger(config)?;
    let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let sizes: BTreeMap<u32, u32> = sizes.into_iter().collect();
    let entry = DailyEntry::new(date, institution, sizes)?;
    let total = entry.total;

    ledger.record(entry)?;
    ledger.save()?;
    info!(%date, total, "Data saved successfully!");
    Ok(())
}

fn run_delete(config: &ForecastConfig, indices: Vec<usize>) -> Result<()> {
    let mut ledger = open_ledger(config)?;
    let removed = ledger.delete(&indices)?;
    ledger.save()?;
    info!("Deleted {} entries", removed);
    Ok(())
}

fn run_compare(config: &ForecastConfig, institution: &str, dates: Vec<NaiveDate>) -> Result<()> {
    let ledger = open_ledger(config)?;
    if ledger.is_empty() {
        info!("No sales data recorded yet");
        return Ok(());
    }

    let dates = if dates.is_empty() {
        ledger.default_comparison_dates(institution)
    } else {
        dates
    };

    for entry in ledger.compare(institution, &dates) {
        let sizes: Vec<String> = entry
            .sizes
            .iter()
            .map(|(size, pairs)| format!("{}:{}", size, pairs))
            .collect();
        println!("{}  total {:>4}  {}", entry.date, entry.total, sizes.join(" "));
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Forecast {
            institution,
            input,
            window,
            output,
            json,
        } => run_forecast(&mut config, &institution, input, window, output, json),
        Commands::Institutions { input } => {
            let store = load_store(input, &config)?;
            for institution in store.institutions() {
                println!("{}", institution);
            }
            Ok(())
        }
        Commands::Record {
            institution,
            date,
            sizes,
        } => run_record(&config, institution, date, sizes),
        Commands::Delete { indices } => run_delete(&config, indices),
        Commands::Compare { institution, dates } => run_compare(&config, &institution, dates),
    }
}
