use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::config::ReportConfig;
use crate::ingest::CountRecord;
use crate::output::{matrix_csv_bytes, zoned_csv_bytes};
use crate::report::aggregate::{CountCells, build_matrix};
use crate::report::summary::summarize;
use crate::report::types::{DailyMatrix, ReportSummary};
use crate::report::window::ReportWindow;
use crate::report::writetos3::{write_file_to_s3, write_json_to_s3};
use crate::report::zoned::{ZonedMatrix, group_by_zone};
use crate::zones::ZoneMapper;

/// Everything one report run produces.
#[derive(Debug, Clone, Serialize)]
pub struct DailyReport {
    pub matrix: DailyMatrix,
    pub summary: ReportSummary,
    pub zoned: Option<ZonedMatrix>,
    /// Records in the window left out for an unknown period.
    pub skipped_period: usize,
    /// Records in the window left out for an empty street.
    pub skipped_street: usize,
}

/// Aggregates `records` over `window` and its comparison window, then
/// summarizes. The zoned matrix is built only when a mapping is given.
#[tracing::instrument(skip(records, config, zones), fields(records = records.len()))]
pub fn build_report(
    records: &[CountRecord],
    window: ReportWindow,
    config: &ReportConfig,
    zones: Option<&ZoneMapper>,
) -> Result<DailyReport> {
    let previous_window = window.previous(&config.comparison)?;

    let current = CountCells::from_records(records, &window);
    let previous = CountCells::from_records(records, &previous_window);

    let matrix = build_matrix(&current, &window, config.threshold);
    let summary = summarize(&current, &previous, &window, &previous_window, config);
    let zoned = zones.map(|mapper| group_by_zone(&matrix, mapper));

    info!(
        start = %window.start,
        end = %window.end,
        previous_start = %previous_window.start,
        streets = matrix.rows.len(),
        visible = matrix.visible_rows().count(),
        "Report built"
    );

    Ok(DailyReport {
        matrix,
        summary,
        zoned,
        skipped_period: current.skipped_period,
        skipped_street: current.skipped_street,
    })
}

/// Object key prefix for a report, e.g. `reports/2024-01-08`.
pub fn report_prefix(window: &ReportWindow) -> String {
    format!("reports/{}", window.end.format("%Y-%m-%d"))
}

/// Uploads the summary JSON, the matrix CSV and, when present, the zoned
/// matrix CSV and the analysis text.
pub async fn publish_report(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    report: &DailyReport,
    analysis: Option<&str>,
    gzip: bool,
) -> Result<()> {
    let prefix = report_prefix(&report.matrix.window);

    write_json_to_s3(s3, bucket, &format!("{prefix}/summary.json"), &report.summary).await?;

    write_file_to_s3(
        s3,
        bucket,
        &format!("{prefix}/matrix.csv"),
        matrix_csv_bytes(&report.matrix)?,
        "text/csv",
        gzip,
    )
    .await?;

    if let Some(zoned) = &report.zoned {
        write_file_to_s3(
            s3,
            bucket,
            &format!("{prefix}/matrix_quadras.csv"),
            zoned_csv_bytes(zoned)?,
            "text/csv",
            gzip,
        )
        .await?;
    }

    if let Some(text) = analysis {
        write_file_to_s3(
            s3,
            bucket,
            &format!("{prefix}/analise.txt"),
            text.as_bytes().to_vec(),
            "text/plain; charset=utf-8",
            gzip,
        )
        .await?;
    }

    info!(bucket, prefix = %prefix, "Report published");
    Ok(())
}
