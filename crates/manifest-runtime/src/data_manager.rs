//! TTL-cached data manager.
//!
//! Wraps a [`RecordSource`] and the normalizer with a time-to-live cache.
//! Callers use [`DataManager::get_data`] to obtain a fresh-or-cached
//! [`LoadedData`]. A fetch is attempted once per miss: failures are returned
//! to the caller and never replaced by stale data.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use manifest_core::error::Result;
use manifest_core::models::{DomainPolicy, PassengerTable};
pub use manifest_core::settings::DEFAULT_CACHE_TTL_SECS;
use manifest_data::normalizer::{normalize, Normalized};
use manifest_data::reader::RecordSource;

// ── LoadedData ────────────────────────────────────────────────────────────────

/// A normalized record set and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub normalized: Normalized,
    /// [`RecordSource::describe`] of the source that produced it.
    pub source: String,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedData {
    pub fn table(&self) -> &PassengerTable {
        &self.normalized.table
    }
}

// ── DataManager ───────────────────────────────────────────────────────────────

/// TTL-cached wrapper around fetch + normalize.
///
/// # Example
/// ```no_run
/// use manifest_data::reader::FileSource;
/// use manifest_runtime::data_manager::DataManager;
/// use manifest_core::models::DomainPolicy;
///
/// let mut mgr = DataManager::new(FileSource::new("passengers.jsonl"), 600, DomainPolicy::Coerce);
/// let data = mgr.get_data(false)?;
/// println!("rows: {}", data.table().len());
/// # Ok::<(), manifest_core::ManifestError>(())
/// ```
pub struct DataManager<S> {
    source: S,
    cache_ttl: Duration,
    policy: DomainPolicy,
    cache: Option<Arc<LoadedData>>,
    /// When the cache was populated. The entry is served while its age is
    /// below `cache_ttl`.
    cache_timestamp: Option<Instant>,
    last_error: Option<String>,
    fetch_count: usize,
}

impl<S: RecordSource> DataManager<S> {
    pub fn new(source: S, cache_ttl_secs: u64, policy: DomainPolicy) -> Self {
        Self {
            source,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            policy,
            cache: None,
            cache_timestamp: None,
            last_error: None,
            fetch_count: 0,
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Return the loaded data, using the cache while it has not expired.
    ///
    /// When `force_refresh` is `true` the cache is bypassed. On failure the
    /// cache is emptied, the error is recorded in [`last_error`] and
    /// returned.
    ///
    /// [`last_error`]: DataManager::last_error
    pub fn get_data(&mut self, force_refresh: bool) -> Result<Arc<LoadedData>> {
        if !force_refresh {
            if let Some(cached) = self.valid_cache() {
                tracing::debug!(source = %cached.source, "returning cached record set");
                return Ok(cached);
            }
        }

        match self.fetch_fresh() {
            Ok(data) => {
                let data = Arc::new(data);
                let now = Instant::now();
                tracing::debug!(
                    rows = data.table().len(),
                    dropped = data.normalized.report.dropped,
                    warnings = data.normalized.report.warnings.len(),
                    "record cache updated"
                );
                self.cache = Some(Arc::clone(&data));
                self.cache_timestamp = Some(now);
                self.last_error = None;
                Ok(data)
            }
            Err(e) => {
                tracing::warn!(source = %self.source.describe(), error = %e, "fetch failed");
                self.invalidate();
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Discard the current cache, forcing the next [`get_data`] call to fetch.
    ///
    /// [`get_data`]: DataManager::get_data
    pub fn invalidate(&mut self) {
        self.cache = None;
        self.cache_timestamp = None;
        tracing::debug!("cache invalidated");
    }

    /// Age of the current cache entry, or `None` if nothing is cached.
    pub fn cache_age(&self) -> Option<Duration> {
        self.cache_timestamp.map(|ts| ts.elapsed())
    }

    /// When the current entry expires. `None` when nothing is cached, or when
    /// the TTL is so long that the instant cannot be represented.
    pub fn expires_at(&self) -> Option<Instant> {
        self.cache_timestamp.and_then(|ts| ts.checked_add(self.cache_ttl))
    }

    /// Message of the last failed fetch; cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Number of fetches attempted so far, successful or not.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn valid_cache(&self) -> Option<Arc<LoadedData>> {
        match (self.cache.as_ref(), self.cache_timestamp) {
            (Some(data), Some(ts)) if ts.elapsed() < self.cache_ttl => Some(Arc::clone(data)),
            _ => None,
        }
    }

    fn fetch_fresh(&mut self) -> Result<LoadedData> {
        self.fetch_count += 1;
        let description = self.source.describe();
        tracing::info!(source = %description, "fetching records");

        let rows = self.source.fetch_all()?;
        let normalized = normalize(&rows, self.policy)?;

        for warning in &normalized.report.warnings {
            tracing::debug!(
                row = warning.row,
                column = warning.column,
                value = %warning.value,
                kind = ?warning.kind,
                "value coerced"
            );
        }
        if normalized.report.dropped > 0 {
            tracing::warn!(dropped = normalized.report.dropped, "rows dropped by domain check");
        }

        Ok(LoadedData {
            normalized,
            source: description,
            loaded_at: Utc::now(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
