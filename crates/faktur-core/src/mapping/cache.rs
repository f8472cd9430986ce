//! Time-bounded cache of the mapping table.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::{MappingFields, MappingSource, MappingTable};
use crate::error::MappingLoadError;

/// Default staleness window.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Result of [`MappingCache::load`].
#[derive(Debug, Clone)]
pub struct MappingLoad {
    /// Table snapshot; empty when loading failed.
    pub table: Arc<MappingTable>,
    /// Load failure, surfaced as a warning.
    pub warning: Option<Arc<MappingLoadError>>,
    /// Whether the table came from the cache without fetching.
    pub from_cache: bool,
}

struct CachedTable {
    table: Arc<MappingTable>,
    fetched_at: Instant,
}

/// Cached mapping table with an explicit lifecycle.
///
/// `load` returns the cached snapshot while it is younger than the TTL,
/// otherwise fetches and swaps in a new table. Snapshots handed out earlier
/// are never modified; a refresh only affects later `load` calls.
pub struct MappingCache<S> {
    source: S,
    fields: MappingFields,
    ttl: Duration,
    state: RwLock<Option<CachedTable>>,
}

impl<S: MappingSource> MappingCache<S> {
    /// Create a cache over `source` with the default field names and TTL.
    pub fn new(source: S) -> Self {
        Self {
            source,
            fields: MappingFields::default(),
            ttl: DEFAULT_TTL,
            state: RwLock::new(None),
        }
    }

    /// Set the record field names.
    pub fn with_fields(mut self, fields: MappingFields) -> Self {
        self.fields = fields;
        self
    }

    /// Set the staleness window.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Return the cached table, fetching when missing or stale.
    ///
    /// Never fails: on a fetch error the returned table is empty and the
    /// error is reported in [`MappingLoad::warning`]. Failed loads are not
    /// cached.
    pub async fn load(&self) -> MappingLoad {
        if let Some(table) = self.fresh() {
            debug!("Using cached mapping ({} codes)", table.len());
            return MappingLoad {
                table,
                warning: None,
                from_cache: true,
            };
        }

        match self.source.fetch().await {
            Ok(records) => {
                let table = Arc::new(MappingTable::from_records(&records, &self.fields));
                info!("Loaded mapping with {} codes", table.len());
                *self.state.write() = Some(CachedTable {
                    table: Arc::clone(&table),
                    fetched_at: Instant::now(),
                });
                MappingLoad {
                    table,
                    warning: None,
                    from_cache: false,
                }
            }
            Err(e) => {
                warn!("Failed to load mapping: {}", e);
                MappingLoad {
                    table: Arc::new(MappingTable::empty()),
                    warning: Some(Arc::new(e)),
                    from_cache: false,
                }
            }
        }
    }

    /// Force the next `load` to fetch regardless of age.
    pub fn invalidate(&self) {
        debug!("Mapping cache invalidated");
        *self.state.write() = None;
    }

    /// Invalidate and load.
    pub async fn refresh(&self) -> MappingLoad {
        self.invalidate();
        self.load().await
    }

    /// Age of the cached table, if any.
    pub fn age(&self) -> Option<Duration> {
        self.state.read().as_ref().map(|cached| cached.fetched_at.elapsed())
    }

    fn fresh(&self) -> Option<Arc<MappingTable>> {
        let state = self.state.read();
        state
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| Arc::clone(&cached.table))
    }
}
