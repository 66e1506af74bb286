//! Data Dragon catalog source: Riot's static-data CDN.
//!
//! Two requests per refresh: the version manifest, then the champion index
//! for the newest version. Blocking I/O is fine here; refreshes happen at
//! most once per interval and never on the mutation path.

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::{CatalogSource, ChampionInfo};

const DEFAULT_BASE_URL: &str = "https://ddragon.leagueoflegends.com";

pub struct DataDragonSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl DataDragonSource {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self { base_url: base_url.into(), client }
    }
}

impl Default for DataDragonSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct ChampionIndex {
    data: HashMap<String, ChampionEntry>,
}

#[derive(Debug, Deserialize)]
struct ChampionEntry {
    id: String,
    name: String,
    image: ChampionImage,
}

#[derive(Debug, Deserialize)]
struct ChampionImage {
    full: String,
}

impl CatalogSource for DataDragonSource {
    fn fetch(&self) -> anyhow::Result<Vec<ChampionInfo>> {
        let versions: Vec<String> = self
            .client
            .get(format!("{}/api/versions.json", self.base_url))
            .send()
            .context("fetching version manifest")?
            .error_for_status()?
            .json()
            .context("parsing version manifest")?;
        let version = versions.first().context("empty version manifest")?;

        let index: ChampionIndex = self
            .client
            .get(format!("{}/cdn/{}/data/en_US/champion.json", self.base_url, version))
            .send()
            .context("fetching champion index")?
            .error_for_status()?
            .json()
            .context("parsing champion index")?;

        let mut entries: Vec<ChampionInfo> = index
            .data
            .into_values()
            .map(|entry| ChampionInfo {
                image_url: format!(
                    "{}/cdn/{}/img/champion/{}",
                    self.base_url, version, entry.image.full
                ),
                id: entry.id,
                display_name: entry.name,
            })
            .collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }
}
