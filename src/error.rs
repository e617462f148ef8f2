use std::path::PathBuf;

/// Errors raised while building, repairing or exporting a computation unit map.
#[derive(Debug, thiserror::Error)]
pub enum UcmError {
    /// The working layer could not be cloned or opened.
    #[error("Load shapefile failed: {}: {reason}", path.display())]
    LayerOpen {
        path: PathBuf,
        reason: String,
    },

    /// A majority zonal statistic stage failed.
    #[error("ZonalStatisticsShape: {0}")]
    ZonalStatistic(String),

    /// A required attribute field is absent or malformed.
    #[error("Schema error: {0}")]
    Schema(String),

    /// The units sink refused the batch. The sink's text is kept as-is.
    #[error("{0}")]
    Persistence(String),

    /// A field index was resolved before the last schema change.
    #[error("Stale index for field {0:?}: layer schema changed since it was resolved")]
    StaleFieldIndex(String),

    #[error("Record {index} out of range (layer has {count} records)")]
    RecordOutOfRange {
        index: usize,
        count: usize,
    },

    #[error("Invalid cell size {0}: must be finite and positive")]
    InvalidCellSize(f64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Shapefile(#[from] shapefile::Error),
}

pub type Result<T, E = UcmError> = std::result::Result<T, E>;
