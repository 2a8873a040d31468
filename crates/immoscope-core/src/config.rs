use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::cleaning::{CleaningOptions, DEFAULT_MAX_PRICE_PER_SQM};
use crate::discovery::SourceSet;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub cleaning: CleaningConfig,
    pub cache: CacheConfig,
    pub views: ViewsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub extension: String,
    /// Token stripped from file stems when deriving `source_department`.
    pub filename_prefix: String,
    /// Explicit source list; bypasses directory discovery when set.
    pub files: Option<Vec<PathBuf>>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            extension: "parquet".to_string(),
            filename_prefix: "dvf".to_string(),
            files: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub max_price_per_sqm: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            max_price_per_sqm: DEFAULT_MAX_PRICE_PER_SQM,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 3600 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewsConfig {
    pub sale_nature: String,
    pub min_commune_transactions: usize,
    pub top_types_per_commune: usize,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            sale_nature: "Vente".to_string(),
            min_commune_transactions: 5,
            top_types_per_commune: 3,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    pub fn sources(&self) -> SourceSet {
        match &self.data.files {
            Some(files) => SourceSet::Files(files.clone()),
            None => SourceSet::Directory {
                dir: self.data.dir.clone(),
                extension: self.data.extension.clone(),
            },
        }
    }

    pub fn cleaning_options(&self) -> CleaningOptions {
        CleaningOptions {
            max_price_per_sqm: self.cleaning.max_price_per_sqm,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_seconds)
    }
}
