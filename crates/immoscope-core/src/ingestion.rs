use std::io::Cursor;
use std::path::{Path, PathBuf};

use blake3::Hasher;
use polars::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};

pub const SOURCE_DEPARTMENT_COLUMN: &str = "source_department";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Loaded,
    Empty,
    Missing,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub hash: Option<String>,
    pub status: FileStatus,
    pub rows: usize,
    pub source_department: Option<String>,
    pub message: Option<String>,
}

impl FileReport {
    fn skipped(path: &Path, hash: Option<String>, status: FileStatus, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            hash,
            status,
            rows: 0,
            source_department: None,
            message: Some(message),
        }
    }
}

#[derive(Debug, Default)]
pub struct IngestionBatch {
    pub frames: Vec<DataFrame>,
    pub reports: Vec<FileReport>,
}

impl IngestionBatch {
    pub fn loaded_count(&self) -> usize {
        self.frames.len()
    }
}

/// Reads every source in order, tagging each table with its `source_department`.
///
/// Missing, unreadable and empty files are reported and skipped; none of them abort the batch.
pub fn ingest_files(paths: &[PathBuf], filename_prefix: &str) -> IngestionBatch {
    let mut batch = IngestionBatch::default();
    let total = paths.len();

    for (idx, path) in paths.iter().enumerate() {
        info!(path = %path.display(), file = idx + 1, total, "loading source file");

        if !path.exists() {
            warn!(path = %path.display(), "source file does not exist, skipping");
            batch.reports.push(FileReport::skipped(
                path,
                None,
                FileStatus::Missing,
                "file does not exist".to_string(),
            ));
            continue;
        }

        let contents = match std::fs::read(path) {
            Ok(contents) => contents,
            Err(err) => {
                error!(path = %path.display(), error = %err, "failed to read source file");
                batch.reports.push(FileReport::skipped(
                    path,
                    None,
                    FileStatus::Failed,
                    err.to_string(),
                ));
                continue;
            }
        };
        let hash = compute_hash(&contents);

        let df = match ParquetReader::new(Cursor::new(contents)).finish() {
            Ok(df) => df,
            Err(err) => {
                error!(path = %path.display(), error = %err, "failed to decode source file");
                batch.reports.push(FileReport::skipped(
                    path,
                    Some(hash),
                    FileStatus::Failed,
                    err.to_string(),
                ));
                continue;
            }
        };

        if df.height() == 0 {
            warn!(path = %path.display(), "source file has no rows, skipping");
            batch.reports.push(FileReport::skipped(
                path,
                Some(hash),
                FileStatus::Empty,
                "file contains no rows".to_string(),
            ));
            continue;
        }

        let department = department_tag(path, filename_prefix);
        let tagged = match tag_source_department(df, &department) {
            Ok(tagged) => tagged,
            Err(err) => {
                error!(path = %path.display(), error = %err, "failed to tag source file");
                batch.reports.push(FileReport::skipped(
                    path,
                    Some(hash),
                    FileStatus::Failed,
                    err.to_string(),
                ));
                continue;
            }
        };

        let rows = tagged.height();
        info!(
            path = %path.display(),
            rows,
            columns = tagged.width(),
            hash = %hash,
            source_department = %department,
            "read source file"
        );
        batch.reports.push(FileReport {
            path: path.clone(),
            hash: Some(hash),
            status: FileStatus::Loaded,
            rows,
            source_department: Some(department),
            message: None,
        });
        batch.frames.push(tagged);
    }

    batch
}

/// `dvf34.parquet` -> `34`, `dvf_2A.parquet` -> `2A`.
pub fn department_tag(path: &Path, filename_prefix: &str) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stripped = if filename_prefix.is_empty() {
        stem.as_str()
    } else {
        stem.strip_prefix(filename_prefix).unwrap_or(stem.as_str())
    };
    stripped.trim_start_matches(['_', '-']).to_string()
}

fn tag_source_department(df: DataFrame, department: &str) -> PolarsResult<DataFrame> {
    // A source may already carry the column; the filename wins.
    df.lazy()
        .with_column(lit(department).alias(SOURCE_DEPARTMENT_COLUMN))
        .collect()
}

/// Union of all frames by column name; columns absent from a frame are null-filled.
pub fn concat_frames(frames: Vec<DataFrame>) -> PolarsResult<DataFrame> {
    match frames.len() {
        0 => Ok(DataFrame::default()),
        1 => Ok(frames.into_iter().next().unwrap_or_default()),
        _ => {
            let lazy: Vec<LazyFrame> = frames.into_iter().map(|df| df.lazy()).collect();
            concat_lf_diagonal(
                lazy,
                UnionArgs {
                    to_supertypes: true,
                    ..Default::default()
                },
            )?
            .collect()
        }
    }
}

fn compute_hash(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    let hash = hasher.finalize();
    hash.to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn department_tag_strips_prefix_and_extension() {
        assert_eq!(department_tag(Path::new("data/dvf34.parquet"), "dvf"), "34");
        assert_eq!(department_tag(Path::new("dvf_2A.parquet"), "dvf"), "2A");
        assert_eq!(department_tag(Path::new("herault.parquet"), "dvf"), "herault");
        assert_eq!(department_tag(Path::new("dvf34.parquet"), ""), "dvf34");
    }

    #[test]
    fn concat_fills_missing_columns_with_nulls() -> PolarsResult<()> {
        let first = df!(
            "a" => &[1i64, 2],
            "b" => &["x", "y"],
        )?;
        let second = df!("a" => &[3i64])?;

        let combined = concat_frames(vec![first, second])?;

        assert_eq!(combined.height(), 3);
        assert_eq!(combined.column("b")?.null_count(), 1);
        Ok(())
    }
}
