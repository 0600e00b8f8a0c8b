//! Client for the external reference API that cross-lists COD datasets.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;

use crate::{config::Config, error::CodSummaryError};

/// An entry as served. Keys come capitalised, lower-case or both.
#[derive(Debug, Deserialize)]
struct RawReferenceEntry {
    #[serde(rename = "DatasetTitle")]
    dataset_title: Option<String>,
    title: Option<String>,
    #[serde(rename = "Theme")]
    capitalised_theme: Option<String>,
    theme: Option<String>,
    #[serde(rename = "Location")]
    capitalised_location: Option<String>,
    location: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(from = "RawReferenceEntry")]
pub struct ReferenceEntry {
    pub title: String,
    pub theme: Option<String>,
    pub location: Option<String>,
}

impl From<RawReferenceEntry> for ReferenceEntry {
    fn from(raw: RawReferenceEntry) -> Self {
        Self {
            title: raw.dataset_title.or(raw.title).unwrap_or_default(),
            theme: raw.capitalised_theme.or(raw.theme),
            location: raw.capitalised_location.or(raw.location),
        }
    }
}

/// Titles listed by the reference API.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    titles: HashSet<String>,
}

impl ReferenceSet {
    pub fn contains_title(&self, title: &str) -> bool {
        self.titles.contains(title)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

impl FromIterator<ReferenceEntry> for ReferenceSet {
    fn from_iter<T: IntoIterator<Item = ReferenceEntry>>(iter: T) -> Self {
        Self {
            titles: iter.into_iter().map(|entry| entry.title).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReferenceClient {
    client: reqwest::Client,
    datasets_url: String,
    population_service_url: String,
}

impl ReferenceClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            datasets_url: config.itos_url.clone(),
            population_service_url: config.itos_ps_url.clone(),
        })
    }

    async fn fetch_entries(&self) -> Result<Vec<ReferenceEntry>> {
        let entries = self
            .client
            .get(&self.datasets_url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| CodSummaryError::ReferenceUnavailable(e.to_string()))?
            .json::<Vec<ReferenceEntry>>()
            .await
            .map_err(|e| CodSummaryError::ReferenceUnavailable(e.to_string()))?;
        Ok(entries)
    }

    /// Fetches the cross-listed datasets. Failure is logged and yields an empty set.
    pub async fn fetch_reference_set(&self) -> ReferenceSet {
        match self.fetch_entries().await {
            Ok(entries) => {
                debug!("Reference API lists {} datasets", entries.len());
                entries.into_iter().collect()
            }
            Err(err) => {
                warn!("Could not fetch reference datasets, continuing without them: {err}");
                ReferenceSet::default()
            }
        }
    }

    /// Whether the reference API serves population statistics for `iso`.
    pub async fn has_population_service(&self, iso: &str) -> bool {
        let url = format!("{}{iso}", self.population_service_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(err) => {
                debug!("Population service check for {iso} failed: {err}");
                false
            }
        }
    }
}
