// crates/immoscope-core/src/error.rs

use std::path::PathBuf;

use thiserror::Error;

/// Why a load produced no table at all.
///
/// An empty table after cleaning is not an error: it comes back as `Ok` with zero records.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("data directory {} could not be read: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid source pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("no readable source files among {attempted} candidate(s)")]
    NoReadableSources { attempted: usize },

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl LoadError {
    /// Short machine-friendly label, used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::Io { .. } => "io",
            LoadError::Pattern(_) => "pattern",
            LoadError::NoReadableSources { .. } => "no_readable_sources",
            LoadError::MissingColumns(_) => "missing_columns",
            LoadError::Polars(_) => "polars",
        }
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;
