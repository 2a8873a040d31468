use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::ViewsConfig;
use crate::error::Result;
use crate::record::PropertyTable;
use crate::tabular::Row;
use crate::views::ViewKind;

#[derive(Debug)]
struct CachedTable {
    loaded_at: DateTime<Utc>,
    table: Arc<PropertyTable>,
}

/// Process-wide holder of the cleaned table, reloaded once its time-to-live has passed.
///
/// Failed loads are not cached; the next call retries.
#[derive(Debug)]
pub struct TableCache {
    ttl: Duration,
    entry: Mutex<Option<CachedTable>>,
}

impl TableCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    pub fn get_or_load<F>(&self, load: F) -> Result<Arc<PropertyTable>>
    where
        F: FnOnce() -> Result<PropertyTable>,
    {
        self.get_or_load_at(Utc::now(), load)
    }

    pub fn get_or_load_at<F>(&self, now: DateTime<Utc>, load: F) -> Result<Arc<PropertyTable>>
    where
        F: FnOnce() -> Result<PropertyTable>,
    {
        let mut entry = self.lock();
        if let Some(cached) = entry.as_ref() {
            if self.is_fresh(cached, now) {
                debug!(rows = cached.table.len(), "table cache hit");
                return Ok(Arc::clone(&cached.table));
            }
            info!(loaded_at = %cached.loaded_at, "cached table expired, reloading");
        }

        let table = Arc::new(load()?);
        *entry = Some(CachedTable {
            loaded_at: now,
            table: Arc::clone(&table),
        });
        Ok(table)
    }

    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|cached| self.is_fresh(cached, now))
    }

    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    fn is_fresh(&self, cached: &CachedTable, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(cached.loaded_at);
        match age.to_std() {
            Ok(age) => age < self.ttl,
            // Clock moved backwards; keep the entry.
            Err(_) => true,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<CachedTable>> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Memoised view rows for one table, keyed by view.
#[derive(Debug)]
pub struct ViewCache {
    table: Arc<PropertyTable>,
    config: ViewsConfig,
    processed: HashMap<ViewKind, Arc<Vec<Row>>>,
}

impl ViewCache {
    pub fn new(table: Arc<PropertyTable>, config: ViewsConfig) -> Self {
        Self {
            table,
            config,
            processed: HashMap::new(),
        }
    }

    pub fn table(&self) -> &Arc<PropertyTable> {
        &self.table
    }

    pub fn get(&mut self, kind: ViewKind) -> Arc<Vec<Row>> {
        let table = &self.table;
        let config = &self.config;
        Arc::clone(
            self.processed
                .entry(kind)
                .or_insert_with(|| Arc::new(kind.compute(table, config))),
        )
    }

    pub fn is_computed(&self, kind: ViewKind) -> bool {
        self.processed.contains_key(&kind)
    }

    /// Points the cache at a new table, dropping every memoised view unless it is the same one.
    pub fn replace_table(&mut self, table: Arc<PropertyTable>) {
        if !Arc::ptr_eq(&self.table, &table) {
            self.processed.clear();
            self.table = table;
        }
    }
}
