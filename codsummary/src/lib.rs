use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};
use tempfile::TempDir;

use crate::catalog::{Catalog, Dataset, HdxCatalog};
use crate::classify::HeaderPatterns;
use crate::config::Config;
use crate::reference::ReferenceClient;

// Re-exports
pub use column_names as COL;

// Modules
pub mod catalog;
pub mod classify;
pub mod column_names;
pub mod config;
pub mod error;
pub mod geo;
pub mod reference;
pub mod report;
pub mod resolve;
pub mod sink;
pub mod tabular;

/// Audits the COD datasets of a catalog and writes the reports.
///
/// Downloads and extracted archives live in a temporary directory owned by this value, removed
/// when it is dropped at the end of a run.
pub struct CodSummary<C: Catalog> {
    pub config: Config,
    catalog: C,
    reference: ReferenceClient,
    patterns: HeaderPatterns,
    temp_dir: TempDir,
}

impl CodSummary<HdxCatalog> {
    /// Setup against the catalog with default configuration
    pub fn new() -> Result<Self> {
        Self::new_with_config(Config::default())
    }

    /// Setup against the catalog named by `config`
    pub fn new_with_config(config: Config) -> Result<Self> {
        let catalog = HdxCatalog::new(&config)?;
        Self::with_catalog(config, catalog)
    }
}

impl<C: Catalog> CodSummary<C> {
    pub fn with_catalog(config: Config, catalog: C) -> Result<Self> {
        debug!("config: {config:?}");
        let reference = ReferenceClient::new(&config)?;
        let patterns = HeaderPatterns::new(&config.language_suffixes)?;
        let temp_dir = tempfile::tempdir().context("Failed to create temporary directory")?;
        Ok(Self {
            config,
            catalog,
            reference,
            patterns,
            temp_dir,
        })
    }

    pub fn patterns(&self) -> &HeaderPatterns {
        &self.patterns
    }

    fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Reads a dataset, treating catalog failures as a miss.
    async fn lookup(&self, name: &str) -> Option<Dataset> {
        match self.catalog.read(name).await {
            Ok(Some(dataset)) => Some(dataset),
            Ok(None) => {
                warn!("Could not find dataset {name}");
                None
            }
            Err(err) => {
                warn!("Could not read dataset {name}: {err:#}");
                None
            }
        }
    }

    /// Searches the catalog, treating a failed search as no results.
    async fn search_or_empty(&self, filter_query: &str) -> Vec<Dataset> {
        self.catalog
            .search(filter_query)
            .await
            .unwrap_or_else(|err| {
                warn!("Search '{filter_query}' failed: {err:#}");
                vec![]
            })
    }
}
