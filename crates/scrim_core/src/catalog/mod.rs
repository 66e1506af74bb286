//! Champion catalog boundary.
//!
//! The engine only needs membership tests ("is this a real champion") plus
//! display metadata for clients. The catalog is reference data refreshed on a
//! fixed interval; staleness inside that window is acceptable, so the cache
//! is a plain check-and-refresh-if-stale snapshot with no cross-process
//! coordination. It is an injected collaborator, never a module global, so
//! tests run against `StaticCatalog` instead of the network.

mod ddragon;

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub use ddragon::DataDragonSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChampionInfo {
    pub id: String,
    pub display_name: String,
    pub image_url: String,
}

pub trait ChampionCatalog: Send + Sync {
    /// Membership test, case-insensitive on id and display name.
    fn contains(&self, name: &str) -> bool;
    /// Substring search for client pickers.
    fn lookup(&self, query: &str) -> Vec<ChampionInfo>;
}

fn matches_name(info: &ChampionInfo, name: &str) -> bool {
    info.id.eq_ignore_ascii_case(name) || info.display_name.eq_ignore_ascii_case(name)
}

/// Fixed in-memory catalog: the offline default and the test double.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Vec<ChampionInfo>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<ChampionInfo>) -> Self {
        Self { entries }
    }

    /// Build from bare names; id and display name coincide.
    pub fn of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = names
            .into_iter()
            .map(|name| {
                let name = name.into();
                ChampionInfo { id: name.clone(), display_name: name, image_url: String::new() }
            })
            .collect();
        Self { entries }
    }
}

impl ChampionCatalog for StaticCatalog {
    fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|info| matches_name(info, name))
    }

    fn lookup(&self, query: &str) -> Vec<ChampionInfo> {
        lookup_in(&self.entries, query)
    }
}

fn lookup_in(entries: &[ChampionInfo], query: &str) -> Vec<ChampionInfo> {
    let needle = query.to_ascii_lowercase();
    entries
        .iter()
        .filter(|info| {
            info.id.to_ascii_lowercase().contains(&needle)
                || info.display_name.to_ascii_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Source the cached catalog pulls from when its snapshot goes stale.
pub trait CatalogSource: Send + Sync {
    fn fetch(&self) -> anyhow::Result<Vec<ChampionInfo>>;
}

#[derive(Debug, Clone, Copy)]
pub struct CatalogConfig {
    pub refresh_interval: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { refresh_interval: Duration::from_secs(60 * 60) }
    }
}

#[derive(Debug, Default)]
struct Snapshot {
    entries: Vec<ChampionInfo>,
    refreshed_at: Option<Instant>,
}

/// Pull-based refresh cache over a `CatalogSource`.
///
/// A failed refresh keeps serving the previous snapshot; correctness never
/// depends on catalog freshness, only on eventual consistency.
pub struct CachedCatalog<S: CatalogSource> {
    source: S,
    config: CatalogConfig,
    inner: Mutex<Snapshot>,
}

impl<S: CatalogSource> CachedCatalog<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, CatalogConfig::default())
    }

    pub fn with_config(source: S, config: CatalogConfig) -> Self {
        Self { source, config, inner: Mutex::new(Snapshot::default()) }
    }

    fn snapshot(&self) -> Vec<ChampionInfo> {
        let mut inner = self.inner.lock().unwrap();
        let stale = match inner.refreshed_at {
            None => true,
            Some(at) => at.elapsed() >= self.config.refresh_interval,
        };
        if stale {
            match self.source.fetch() {
                Ok(entries) => {
                    log::debug!("champion catalog refreshed: {} entries", entries.len());
                    inner.entries = entries;
                    inner.refreshed_at = Some(Instant::now());
                }
                Err(err) => {
                    log::warn!("champion catalog refresh failed, serving stale data: {err:#}");
                    // Back off a full interval before the next attempt.
                    inner.refreshed_at = Some(Instant::now());
                }
            }
        }
        inner.entries.clone()
    }
}

impl<S: CatalogSource> ChampionCatalog for CachedCatalog<S> {
    fn contains(&self, name: &str) -> bool {
        self.snapshot().iter().any(|info| matches_name(info, name))
    }

    fn lookup(&self, query: &str) -> Vec<ChampionInfo> {
        lookup_in(&self.snapshot(), query)
    }
}
