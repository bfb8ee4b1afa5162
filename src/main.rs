//! CLI entry point for the street count tool.
//!
//! Provides subcommands for cleaning a raw count table, building the daily
//! crowd report (optionally uploading it to S3), and resolving streets
//! against a zone mapping.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use street_count::{
    config::ReportConfig,
    fetch::{BasicClient, HttpClient, auth::ApiKey, fetch_bytes},
    ingest::{ingest, parse_date, standardize},
    output::{
        print_json, print_pretty, write_json, write_matrix_csv, write_table_csv, write_text,
        write_zoned_csv,
    },
    parser::parse_address,
    report::{
        analyzer::{build_report, publish_report},
        text::{render_analysis, render_quality_report},
        window::ReportWindow,
    },
    table::Table,
    zones::ZoneMapper,
};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "street_count")]
#[command(about = "Cleans street count sheets and builds the daily crowd report", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Standardize addresses and periods of a count table
    Parse {
        /// Path to a CSV/XLSX file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// CSV file to write the processed records to
        #[arg(short, long, default_value = "processed.csv")]
        output: PathBuf,

        /// Optional: text file for the parsing-quality report
        #[arg(long)]
        quality_report: Option<PathBuf>,
    },
    /// Build the daily matrix, summary and analysis text
    Report {
        /// Path to a CSV/XLSX file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// First day of the window (dd/mm/yyyy or yyyy-mm-dd)
        #[arg(long, value_parser = parse_cli_date)]
        start: NaiveDate,

        /// Last day of the window (dd/mm/yyyy or yyyy-mm-dd)
        #[arg(long, value_parser = parse_cli_date)]
        end: NaiveDate,

        /// Directory to write report files to
        #[arg(short = 'd', long, default_value = "reports")]
        output_dir: PathBuf,

        /// Optional: JSON report config
        #[arg(long)]
        config: Option<String>,

        /// Optional: override the crowd threshold
        #[arg(long)]
        threshold: Option<f64>,

        /// Optional: zone mapping table for the zone-grouped matrix
        #[arg(long)]
        zones: Option<PathBuf>,

        /// Optional: S3 bucket name to upload the report to (e.g., "my-bucket")
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Optional: Gzip compress files before uploading to S3
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Resolve streets against a zone mapping table
    Zone {
        /// Mapping table (CSV or XLSX)
        #[arg(value_name = "MAPPING")]
        mapping: PathBuf,

        /// Street addresses to resolve
        #[arg(value_name = "STREET", required = true)]
        streets: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/street_count.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("street_count.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            source,
            output,
            quality_report,
        } => {
            let table = load_table(&source).await?;
            let standardized = standardize(&table)?;
            if !standardized.has_street {
                warn!("No street column found, addresses left as is");
            }
            if !standardized.has_period {
                warn!("No period column found, periods left as is");
            }

            write_table_csv(&output, &standardized.table)?;

            if let Some(path) = quality_report {
                let text = render_quality_report(
                    &standardized.stats,
                    &source_name(&source),
                    &source_name(&output.to_string_lossy()),
                    Local::now().naive_local(),
                );
                write_text(&path, &text)?;
            }

            print_json(&standardized.stats)?;
        }
        Commands::Report {
            source,
            start,
            end,
            output_dir,
            config,
            threshold,
            zones,
            s3_bucket,
            gzip,
        } => {
            let mut config = match config {
                Some(path) => ReportConfig::load(&path)?,
                None => ReportConfig::default(),
            };
            if let Some(threshold) = threshold {
                config.threshold = threshold;
            }

            let window = ReportWindow::new(start, end)?;
            let mapper = zones.as_deref().map(ZoneMapper::load).transpose()?;

            let table = load_table(&source).await?;
            let ingested = ingest(&table)?;
            let report = build_report(&ingested.records, window, &config, mapper.as_ref())?;

            print_pretty(&report.summary);
            if report.matrix.rows.is_empty() {
                warn!(start = %start, end = %end, "No counts in the report window");
            }

            let analysis = render_analysis(&report.summary, &config, Local::now().naive_local());
            let stem = format!("{}_{}", start.format("%Y%m%d"), end.format("%Y%m%d"));

            write_matrix_csv(&output_dir.join(format!("contagem_diaria_{stem}.csv")), &report.matrix)?;
            write_json(&output_dir.join(format!("resumo_{stem}.json")), &report.summary)?;
            write_text(&output_dir.join(format!("analise_{stem}.txt")), &analysis)?;
            if let Some(zoned) = &report.zoned {
                write_zoned_csv(&output_dir.join(format!("contagem_quadras_{stem}.csv")), zoned)?;
            }

            match s3_bucket {
                Some(bucket) => {
                    let aws = aws_config::load_from_env().await;
                    let s3 = aws_sdk_s3::Client::new(&aws);
                    info!(bucket = %bucket, gzip, "S3 upload enabled");
                    publish_report(&s3, &bucket, &report, Some(&analysis), gzip).await?;
                }
                None => info!("S3 bucket not specified, skipping upload"),
            }

            info!(
                output_dir = %output_dir.display(),
                average = report.summary.current_average,
                percent_change = report.summary.percent_change,
                "Report finished"
            );
        }
        Commands::Zone { mapping, streets } => {
            let mapper = ZoneMapper::load(&mapping)?;
            for street in &streets {
                let canonical = parse_address(street).canonical;
                info!(
                    street = %canonical,
                    zone = %mapper.resolve(&canonical),
                    official = mapper.official_name(&canonical).unwrap_or(""),
                    mapped = mapper.lookup(&canonical).is_some(),
                    "Zone"
                );
            }
        }
    }

    Ok(())
}

/// Loads table data from a local file path or fetches it over HTTP.
#[tracing::instrument]
async fn load_table(source: &str) -> Result<Table> {
    if source.starts_with("http") {
        let bytes = fetcher(source).await?;
        Ok(Table::from_bytes(bytes, url_file_name(source))?)
    } else {
        Table::load(Path::new(source)).with_context(|| format!("loading '{source}'"))
    }
}

/// Fetches a remote table, authenticating with `SOURCE_BEARER_TOKEN` when set.
async fn fetcher(url: &str) -> Result<Vec<u8>> {
    let client: Box<dyn HttpClient> = match std::env::var("SOURCE_BEARER_TOKEN") {
        Ok(token) if !token.is_empty() => Box::new(ApiKey::bearer(BasicClient::new(), &token)?),
        _ => Box::new(BasicClient::new()),
    };
    fetch_bytes(&client, url).await
}

/// Last path segment of a URL, without query string.
fn url_file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

fn source_name(source: &str) -> String {
    Path::new(source)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string())
}

fn parse_cli_date(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).ok_or_else(|| format!("invalid date '{raw}', expected dd/mm/yyyy or yyyy-mm-dd"))
}
