use thiserror::Error;

/// Application error kinds.
///
/// Cell-level coercion failures are deliberately NOT represented here: a
/// cell that fails numeric parsing is replaced by 0 and counted in the
/// loader's `LoadReport` instead of aborting the load.
#[derive(Error, Debug)]
pub enum AppError {
    /// A required column is missing from a loaded table. The affected
    /// computation is halted; there is no partial result.
    #[error("required column '{column}' missing in {file}")]
    Schema { column: &'static str, file: String },

    /// Clustering was requested with fewer usable sites than groups.
    #[error("clustering needs at least k sites: got {sites} site(s) for k = {k}")]
    InsufficientData { sites: usize, k: usize },

    /// A save-to-file step failed. In-memory state is left untouched by
    /// every caller, so no work is lost.
    #[error("failed to persist {path}: {source}")]
    Persistence {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
