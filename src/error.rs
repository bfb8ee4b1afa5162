//! Typed errors for table loading and ingestion.

/// Fatal ingestion failures. Row-level problems are never errors; they are
/// counted in [`crate::stats::IngestStats`] instead.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Required input columns are absent; no partial aggregation is attempted.
    #[error("missing required columns: {}", missing.join(", "))]
    MissingColumns {
        /// Human-readable names of the absent columns.
        missing: Vec<String>,
    },

    /// The input had no header row.
    #[error("input table is empty")]
    EmptyTable,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("spreadsheet has no worksheet")]
    NoWorksheet,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
