pub mod cache;
pub mod choropleth;
pub mod cleaning;
pub mod config;
pub mod discovery;
pub mod error;
pub mod filters;
pub mod geo;
pub mod ingestion;
pub mod loader;
pub mod record;
pub mod search;
pub mod stats;
pub mod tabular;
pub mod views;

pub use cache::{TableCache, ViewCache};
pub use config::AppConfig;
pub use discovery::SourceSet;
pub use error::{LoadError, Result};
pub use loader::{LoadOutcome, LoadReport, Loader};
pub use record::{PropertyRecord, PropertyTable};
pub use views::ViewKind;
