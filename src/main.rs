//! District Pulse: district disease-risk analytics.
//!
//! Main entry point for the command-line application.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use district_pulse::adapters::channel::{change_channel, ChangeNotifier};
use district_pulse::adapters::district_csv::CsvDistrictSource;
use district_pulse::adapters::json_store::JsonFileStore;
use district_pulse::adapters::sanitize::SanitizingMakeWriter;
use district_pulse::adapters::sqlite::SqliteRecordSource;
use district_pulse::application::{category_hotspots, render_summary, watch, QueryService, SnapshotService};
use district_pulse::domain::DiseaseCategory;
use district_pulse::ports::{ChangeKind, RecordSource, ReferenceSource};
use district_pulse::PipelineConfig;

/// Collections whose mutations trigger a rebuild.
const WATCHED_COLLECTIONS: [&str; 2] = ["patients", "disease_cases"];

/// Districts listed in the water-borne hotspot report.
const HOTSPOT_ROWS: usize = 5;

enum Command {
    Rebuild { top: Option<usize> },
    Query { district: Option<String> },
    Watch,
}

fn usage() -> String {
    "Usage: district-pulse rebuild [--top <n>] | query <district> | watch".to_string()
}

fn parse_args() -> Result<Command, String> {
    let mut args = std::env::args().skip(1);
    let command = args.next().ok_or_else(usage)?;

    match command.as_str() {
        "rebuild" => {
            let mut top = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--top" => {
                        let v = args.next().ok_or_else(usage)?;
                        let parsed = v
                            .trim()
                            .parse::<usize>()
                            .map_err(|_| "--top must be a positive integer".to_string())?;
                        top = Some(parsed);
                    }
                    _ => return Err(usage()),
                }
            }
            Ok(Command::Rebuild { top })
        }
        "query" => {
            let district = args.next();
            if args.next().is_some() {
                return Err(usage());
            }
            Ok(Command::Query { district })
        }
        "watch" => Ok(Command::Watch),
        _ => Err(usage()),
    }
}

fn init_tracing() -> Result<WorkerGuard> {
    let log_mode = std::env::var("DISTRICT_PULSE_LOG_MODE").unwrap_or_else(|_| "stdout".to_string());

    let (writer, guard) = if log_mode == "file" {
        let log_file = std::env::var("DISTRICT_PULSE_LOG_FILE")
            .unwrap_or_else(|_| "district_data/district_pulse.log".to_string());

        if let Some(parent) = PathBuf::from(&log_file).parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    Ok(guard)
}

type Pipeline = SnapshotService<SqliteRecordSource, CsvDistrictSource, JsonFileStore>;

fn open_pipeline(config: &PipelineConfig) -> Result<(Arc<SqliteRecordSource>, Arc<CsvDistrictSource>, Arc<Pipeline>)> {
    let records = Arc::new(SqliteRecordSource::new(&config.database)?);
    let reference = Arc::new(CsvDistrictSource::new(&config.districts_csv));

    let mut store = JsonFileStore::new(&config.artifact);
    if let Some(dir) = &config.model_dir {
        store = store.with_model_dir(dir);
    }

    let service = Arc::new(SnapshotService::new(
        Arc::clone(&records),
        Arc::clone(&reference),
        Arc::new(store),
        config,
    ));
    Ok((records, reference, service))
}

fn run_query(config: &PipelineConfig, district: Option<&str>) -> Result<()> {
    let service = QueryService::new(Arc::new(JsonFileStore::new(&config.artifact)));
    let diseases = service.query(district)?;
    println!("{}", serde_json::to_string_pretty(&diseases)?);
    Ok(())
}

fn run_rebuild(config: &PipelineConfig, top: Option<usize>) -> Result<()> {
    let (records, reference, service) = open_pipeline(config)?;
    let summary = service.rebuild()?;
    print!("{}", render_summary(&summary, top, config.risk_threshold));

    let cases = records.fetch_cases()?;
    let districts = reference.fetch_district_profiles()?;
    println!("\nTop {HOTSPOT_ROWS} districts for water-borne diseases:");
    for row in category_hotspots(&cases, &districts, DiseaseCategory::WaterBorne, HOTSPOT_ROWS) {
        println!("  {}: {} cases (Water Risk: {:.1})", row.district, row.cases, row.avg_water_risk);
    }
    Ok(())
}

fn run_watch(config: &PipelineConfig) -> Result<()> {
    let (_, _, service) = open_pipeline(config)?;
    if service.rebuild().is_err() {
        tracing::warn!("No fresh snapshot at startup; serving the previous one");
    }

    let mut notifiers: BTreeMap<&str, ChangeNotifier> = BTreeMap::new();
    let mut listeners = Vec::new();
    for collection in WATCHED_COLLECTIONS {
        let (notifier, feed) = change_channel(collection);
        notifiers.insert(collection, notifier);
        listeners.push(watch(Arc::clone(&service), feed));
    }

    // Each stdin line is "<collection> <operation>".
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        let Some(collection) = parts.next() else {
            continue;
        };
        let kind = ChangeKind::parse_lenient(parts.next().unwrap_or_default());
        match notifiers.get(collection) {
            Some(notifier) => {
                notifier.notify(kind);
            }
            None => tracing::warn!("Ignoring change in unwatched collection '{collection}'"),
        }
    }

    // Closing the feeds lets the listeners drain and exit.
    drop(notifiers);
    for listener in listeners {
        listener.join();
    }
    Ok(())
}

fn main() -> Result<()> {
    let command = parse_args().map_err(anyhow::Error::msg)?;
    let _guard = init_tracing()?;
    let config = PipelineConfig::from_env_or_default();

    match command {
        Command::Query { district } => run_query(&config, district.as_deref())?,
        Command::Rebuild { top } => {
            tracing::info!("Starting District Pulse rebuild...");
            run_rebuild(&config, top)?;
        }
        Command::Watch => {
            tracing::info!("Starting District Pulse watcher...");
            run_watch(&config)?;
            tracing::info!("District Pulse shutdown complete.");
        }
    }
    Ok(())
}
