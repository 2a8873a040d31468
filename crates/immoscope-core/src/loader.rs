use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::cleaning::{self, CleaningOptions, CleaningStage, StageCount};
use crate::config::AppConfig;
use crate::discovery::SourceSet;
use crate::error::{LoadError, Result};
use crate::ingestion::{self, FileReport};
use crate::record::PropertyTable;

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub files: Vec<FileReport>,
    pub concatenated_rows: usize,
    pub stages: Vec<StageCount>,
    pub emptied_at: Option<CleaningStage>,
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// Cleaned frame, including any extra source columns.
    pub frame: DataFrame,
    pub table: PropertyTable,
    pub report: LoadReport,
}

/// Discovers, reads, concatenates and cleans the transaction sources.
#[derive(Debug, Clone)]
pub struct Loader {
    sources: SourceSet,
    filename_prefix: String,
    options: CleaningOptions,
}

impl Loader {
    pub fn new(sources: SourceSet) -> Self {
        Self {
            sources,
            filename_prefix: "dvf".to_string(),
            options: CleaningOptions::default(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            sources: config.sources(),
            filename_prefix: config.data.filename_prefix.clone(),
            options: config.cleaning_options(),
        }
    }

    pub fn with_filename_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.filename_prefix = prefix.into();
        self
    }

    pub fn with_options(mut self, options: CleaningOptions) -> Self {
        self.options = options;
        self
    }

    pub fn load(&self) -> Result<LoadOutcome> {
        let paths = self.sources.resolve()?;
        if paths.is_empty() {
            warn!("no files specified or found for loading");
            return Err(LoadError::NoReadableSources { attempted: 0 });
        }

        let batch = ingestion::ingest_files(&paths, &self.filename_prefix);
        let loaded = batch.loaded_count();
        let mut report = LoadReport {
            files: batch.reports,
            ..Default::default()
        };

        if loaded == 0 {
            error!(attempted = paths.len(), "no data successfully loaded from any files");
            return Err(LoadError::NoReadableSources {
                attempted: paths.len(),
            });
        }

        info!(
            loaded,
            attempted = paths.len(),
            "source files read"
        );
        let combined = ingestion::concat_frames(batch.frames)?;
        report.concatenated_rows = combined.height();
        info!(
            rows = combined.height(),
            columns = combined.width(),
            "concatenated source tables"
        );

        if combined.height() == 0 {
            warn!("concatenated data is empty, no further processing");
            return Ok(LoadOutcome {
                frame: combined,
                table: PropertyTable::empty(),
                report,
            });
        }

        let outcome = cleaning::clean(combined, &self.options)?;
        report.stages = outcome.stages;
        report.emptied_at = outcome.emptied_at;

        let table = PropertyTable::from_frame(&outcome.frame)?;
        if table.is_empty() {
            warn!("data is empty after all processing steps");
        } else {
            info!(rows = table.len(), "loaded and processed data");
        }

        Ok(LoadOutcome {
            frame: outcome.frame,
            table,
            report,
        })
    }

    /// Any failure is logged and reported as an empty table.
    pub fn load_or_empty(&self) -> PropertyTable {
        match self.load() {
            Ok(outcome) => outcome.table,
            Err(err) => {
                error!(kind = err.kind(), error = %err, "load failed, continuing with empty table");
                PropertyTable::empty()
            }
        }
    }
}
