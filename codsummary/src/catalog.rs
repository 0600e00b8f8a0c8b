//! Types and a client for the open-data catalog (a CKAN action API).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::{config::Config, error::CodSummaryError};

/// Accepts strings, numbers and booleans for fields the catalog is not consistent about.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

/// Catalog groups are the locations of a dataset, named by lower-case ISO3 code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub url: String,
}

impl Resource {
    /// Lower-cased format, e.g. `shp`, `geojson`, `csv`, `xlsx`.
    pub fn file_type(&self) -> String {
        self.format.trim().to_lowercase()
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    /// File name used when downloading: the last URL path segment, else the resource name.
    pub fn file_name(&self) -> String {
        let from_url = self
            .url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .filter(|segment| !segment.is_empty());
        let name = from_url.unwrap_or(self.name.as_str());
        let name: String = name
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        if name.is_empty() {
            "resource".to_string()
        } else {
            name
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub notes: Option<String>,
    #[serde(default)]
    pub organization: Option<Organization>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cod_level: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub license_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub methodology: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub methodology_other: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub caveats: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dataset_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_modified: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub data_update_frequency: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dataset_source: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub total_res_downloads: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_requestdata_type: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub archived: bool,
    #[serde(default)]
    pub resources: Vec<Resource>,
    /// Public page of the dataset. Not part of the API payload, filled in by the catalog client.
    #[serde(skip)]
    pub url: String,
}

impl Dataset {
    /// The identifier reported as `COD-UID`: the last segment of the dataset URL.
    pub fn uid(&self) -> String {
        self.url
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or(self.name.as_str())
            .to_string()
    }

    pub fn organization_title(&self) -> Option<String> {
        self.organization.as_ref().map(|org| org.title.clone())
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|tag| tag.name.clone()).collect()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.name == tag)
    }

    pub fn location_iso3s(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name.to_uppercase()).collect()
    }

    /// Methodology, substituting the free-text value when the methodology is `Other`.
    pub fn methodology(&self) -> Option<String> {
        match self.methodology.as_deref() {
            Some("Other") => self.methodology_other.clone(),
            other => other.map(str::to_string),
        }
    }

    /// Human readable label for the expected update frequency.
    pub fn update_frequency(&self) -> Option<String> {
        self.data_update_frequency
            .as_deref()
            .map(|code| transform_update_frequency(code.trim()))
    }

    pub fn file_types(&self) -> Vec<String> {
        self.resources.iter().map(Resource::file_type).collect()
    }

    /// Resources whose file type is one of `types` (lower case).
    pub fn resources_of_type(&self, types: &[&str]) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|r| types.contains(&r.file_type().as_str()))
            .collect()
    }
}

/// Maps the catalog's numeric update frequencies to their labels. Unknown codes pass through.
pub fn transform_update_frequency(code: &str) -> String {
    match code {
        "-2" => "Adhoc",
        "-1" => "Never",
        "0" => "Live",
        "1" => "Every day",
        "7" => "Every week",
        "14" => "Every two weeks",
        "30" => "Every month",
        "90" => "Every three months",
        "180" => "Every six months",
        "365" => "Every year",
        other => other,
    }
    .to_string()
}

/// The catalog operations the reports rely on.
pub trait Catalog {
    /// All datasets matching a filter query, e.g. `cod_level:"cod-standard"`.
    async fn search(&self, filter_query: &str) -> Result<Vec<Dataset>>;
    /// A dataset by name, `None` when it does not exist.
    async fn read(&self, name: &str) -> Result<Option<Dataset>>;
    /// Downloads a resource into `folder`, returning the local path.
    async fn download(&self, resource: &Resource, folder: &Path) -> Result<PathBuf>;
}

#[derive(Debug, Deserialize)]
struct ActionResponse<T> {
    success: bool,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    count: usize,
    results: Vec<Dataset>,
}

/// `Catalog` backed by the CKAN action API of an HDX site.
#[derive(Debug, Clone)]
pub struct HdxCatalog {
    client: reqwest::Client,
    base_url: String,
    rows: usize,
}

impl HdxCatalog {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("codsummary/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: config.catalog_url(),
            rows: config.search_rows.max(1),
        })
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}/api/3/action/{action}", self.base_url)
    }

    fn with_url(&self, mut dataset: Dataset) -> Dataset {
        dataset.url = format!("{}/dataset/{}", self.base_url, dataset.name);
        dataset
    }
}

impl Catalog for HdxCatalog {
    async fn search(&self, filter_query: &str) -> Result<Vec<Dataset>> {
        let mut datasets: Vec<Dataset> = vec![];
        loop {
            let response = self
                .client
                .get(self.action_url("package_search"))
                .query(&[
                    ("fq", filter_query.to_string()),
                    ("rows", self.rows.to_string()),
                    ("start", datasets.len().to_string()),
                ])
                .send()
                .await
                .map_err(|e| CodSummaryError::CatalogRequest(e.to_string()))?
                .error_for_status()
                .map_err(|e| CodSummaryError::CatalogRequest(e.to_string()))?;
            let page = response
                .json::<ActionResponse<SearchPage>>()
                .await
                .with_context(|| format!("Invalid search response for '{filter_query}'"))?;
            let page = match page {
                ActionResponse {
                    success: true,
                    result: Some(page),
                } => page,
                _ => {
                    return Err(CodSummaryError::CatalogRequest(format!(
                        "Search for '{filter_query}' was not successful"
                    ))
                    .into())
                }
            };
            let received = page.results.len();
            datasets.extend(page.results.into_iter().map(|d| self.with_url(d)));
            debug!(
                "Search '{filter_query}': {} of {} datasets",
                datasets.len(),
                page.count
            );
            if received == 0 || datasets.len() >= page.count {
                break;
            }
        }
        info!("Found {} datasets for '{filter_query}'", datasets.len());
        Ok(datasets)
    }

    async fn read(&self, name: &str) -> Result<Option<Dataset>> {
        let response = self
            .client
            .get(self.action_url("package_show"))
            .query(&[("id", name)])
            .send()
            .await
            .map_err(|e| CodSummaryError::CatalogRequest(e.to_string()))?;
        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN
        ) {
            debug!("Dataset {name} not found");
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|e| CodSummaryError::CatalogRequest(e.to_string()))?;
        let payload = response
            .json::<ActionResponse<Dataset>>()
            .await
            .with_context(|| format!("Invalid response reading dataset '{name}'"))?;
        if !payload.success {
            return Ok(None);
        }
        Ok(payload.result.map(|d| self.with_url(d)))
    }

    async fn download(&self, resource: &Resource, folder: &Path) -> Result<PathBuf> {
        let download_error = |reason: String| CodSummaryError::Download {
            url: resource.url.clone(),
            reason,
        };
        let mut response = self
            .client
            .get(&resource.url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| download_error(e.to_string()))?;
        let path = folder.join(resource.file_name());
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| download_error(e.to_string()))?;
        // Archives can be large, so write them out chunk by chunk.
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| download_error(e.to_string()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| download_error(e.to_string()))?;
        }
        file.flush()
            .await
            .map_err(|e| download_error(e.to_string()))?;
        debug!("Downloaded {} to {}", resource.url, path.display());
        Ok(path)
    }
}
