use std::path::PathBuf;
use thiserror::Error;

/// The main error type for plantcoco operations.
#[derive(Debug, Error)]
pub enum PlantcocoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse labelmap from {path}: {source}")]
    LabelmapParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse per-image JSON from {path}: {source}")]
    PerImageJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write JSON to {path}: {source}")]
    JsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write CSV to {path}: {source}")]
    CsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("No categories found under {root} (specify --categories or add labelmap.json files)")]
    NoCategories { root: PathBuf },
}
