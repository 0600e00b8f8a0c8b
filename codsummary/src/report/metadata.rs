//! Catalog-wide reports built from dataset metadata alone.

use std::path::PathBuf;

use anyhow::Result;
use itertools::Itertools;
use log::info;

use super::{
    join_list, Theme, COD_TAG, METADATA_SUMMARY_FILE, RESOURCE_DESCRIPTIONS_FILE,
};
use crate::catalog::{Catalog, Dataset};
use crate::reference::ReferenceSet;
use crate::sink::{write_table, ReportRow};
use crate::{CodSummary, COL};

pub const COD_TOPIC_QUERY: &str = r#"vocab_Topics:"common operational dataset - cod""#;
/// Misspelt topic that tags datasets outside the COD process.
pub const COWBOY_TOPIC_QUERY: &str = r#"vocab_Topics:"common operational dataset-cod""#;
pub const COD_LEVEL_QUERIES: [&str; 2] = [
    r#"cod_level:"cod-standard""#,
    r#"cod_level:"cod-enhanced""#,
];

const REQUEST_ONLY: &str = "Available by request";
const VISIBLE: &str = "Visible";

/// One line of the metadata summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataRow {
    pub cod_uid: String,
    pub title: String,
    pub url: String,
    pub theme: Option<String>,
    pub in_reference: bool,
    pub resource_downloads: Option<String>,
    pub source: Option<String>,
    pub organization: Option<String>,
    pub dataset_date: Option<String>,
    pub updated: Option<String>,
    pub update_frequency: Option<String>,
    pub locations: Option<String>,
    pub visibility: &'static str,
    pub license: Option<String>,
    pub methodology: Option<String>,
    pub caveats: Option<String>,
    pub tags: Option<String>,
    pub file_formats: Option<String>,
}

impl MetadataRow {
    pub fn new(dataset: &Dataset, references: &ReferenceSet) -> Self {
        Self {
            cod_uid: dataset.uid(),
            title: dataset.title.clone(),
            url: dataset.url.clone(),
            theme: Theme::from_dataset_name(&dataset.name).map(|theme| theme.code()),
            in_reference: references.contains_title(&dataset.title),
            resource_downloads: dataset.total_res_downloads.clone(),
            source: dataset.dataset_source.clone(),
            organization: dataset.organization_title(),
            dataset_date: dataset.dataset_date.clone(),
            updated: dataset.last_modified.clone(),
            update_frequency: dataset.update_frequency(),
            locations: join_list(dataset.location_iso3s()),
            visibility: if dataset.is_requestdata_type {
                REQUEST_ONLY
            } else {
                VISIBLE
            },
            license: dataset.license_title.clone(),
            methodology: dataset.methodology(),
            caveats: dataset.caveats.clone(),
            tags: join_list(dataset.tag_names()),
            file_formats: join_list(dataset.file_types().into_iter().sorted().dedup()),
        }
    }
}

impl ReportRow for MetadataRow {
    fn cells(&self) -> Vec<Option<String>> {
        vec![
            Some(self.cod_uid.clone()),
            Some(self.title.clone()),
            Some(self.url.clone()),
            self.theme.clone(),
            Some(if self.in_reference { "Yes" } else { "No" }.to_string()),
            self.resource_downloads.clone(),
            self.source.clone(),
            self.organization.clone(),
            self.dataset_date.clone(),
            self.updated.clone(),
            self.update_frequency.clone(),
            self.locations.clone(),
            Some(self.visibility.to_string()),
            self.license.clone(),
            self.methodology.clone(),
            self.caveats.clone(),
            self.tags.clone(),
            self.file_formats.clone(),
        ]
    }
}

/// Rows of the dataset and resource descriptions report for one dataset: the dataset itself,
/// then each of its resources. Datasets outside the known themes have none.
pub fn description_rows(dataset: &Dataset) -> Vec<Vec<Option<String>>> {
    let Some(theme) = Theme::from_dataset_name(&dataset.name) else {
        return vec![];
    };
    let country = join_list(dataset.location_iso3s());
    let row = |item: &str, title: &str, description: Option<String>| {
        vec![
            country.clone(),
            Some(theme.code()),
            dataset.cod_level.clone(),
            Some(dataset.name.clone()),
            Some(item.to_string()),
            Some(title.to_string()),
            description,
        ]
    };
    let mut rows = vec![row("dataset", &dataset.title, dataset.notes.clone())];
    rows.extend(
        dataset
            .resources
            .iter()
            .map(|resource| row("resource", &resource.name, resource.description.clone())),
    );
    rows
}

/// Messages about datasets tagged with the misspelt COD topic, and those of them without a
/// COD level.
pub fn cowboy_messages(datasets: &[Dataset]) -> Vec<String> {
    if datasets.is_empty() {
        return vec![];
    }
    let names = |datasets: &[&Dataset]| datasets.iter().map(|d| d.name.as_str()).join(",");
    let tagged: Vec<&Dataset> = datasets.iter().collect();
    let mut messages = vec![format!(
        "Found {} dataset(s) with COD tags: {}",
        tagged.len(),
        names(&tagged)
    )];
    let without_level: Vec<&Dataset> = datasets
        .iter()
        .filter(|d| d.cod_level.as_deref().map_or(true, str::is_empty))
        .collect();
    if !without_level.is_empty() {
        messages.push(format!(
            "Found {} cowboy COD(s): {}",
            without_level.len(),
            names(&without_level)
        ));
    }
    messages
}

impl<C: Catalog> CodSummary<C> {
    /// Writes `datasets_tagged_cods.csv`, one row per dataset carrying the COD tag.
    pub async fn metadata_summary(&self) -> Result<PathBuf> {
        let datasets = self.search_or_empty(COD_TOPIC_QUERY).await;
        info!("Summarizing metadata for {} COD datasets", datasets.len());
        let references = self.reference.fetch_reference_set().await;
        let rows: Vec<MetadataRow> = datasets
            .iter()
            .filter(|dataset| dataset.has_tag(COD_TAG))
            .map(|dataset| MetadataRow::new(dataset, &references))
            .collect();
        let path = self.config.output_path(METADATA_SUMMARY_FILE);
        write_table(&path, &COL::METADATA_SUMMARY, &rows)?;
        info!("Wrote out metadata");
        Ok(path)
    }

    /// Writes `dataset_resource_descriptions.csv` for the standard and enhanced CODs.
    pub async fn dataset_resource_descriptions(&self) -> Result<PathBuf> {
        let mut datasets = vec![];
        for query in COD_LEVEL_QUERIES {
            datasets.extend(self.search_or_empty(query).await);
        }
        info!("Summarizing descriptions for {} COD datasets", datasets.len());
        let rows: Vec<Vec<Option<String>>> = datasets.iter().flat_map(description_rows).collect();
        let path = self.config.output_path(RESOURCE_DESCRIPTIONS_FILE);
        write_table(&path, &COL::RESOURCE_DESCRIPTIONS, &rows)?;
        info!("Wrote out descriptions");
        Ok(path)
    }

    /// Finds datasets carrying COD tags outside the COD process. Returns messages to report at
    /// the end of the run.
    pub async fn cowboy_cods(&self) -> Vec<String> {
        info!("Finding cowboy CODs");
        let datasets = self.search_or_empty(COWBOY_TOPIC_QUERY).await;
        cowboy_messages(&datasets)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::catalog::fake::{dataset, resource, FakeCatalog};
    use crate::catalog::{Group, Tag};
    use crate::config::Config;

    fn tagged(name: &str, tags: &[&str]) -> Dataset {
        Dataset {
            tags: tags.iter().map(|t| Tag { name: t.to_string() }).collect(),
            groups: vec![
                Group { name: "som".into() },
                Group { name: "eth".into() },
            ],
            ..dataset(
                name,
                "OCHA",
                vec![
                    resource("a.zip", "SHP", "https://files.test/a.zip"),
                    resource("b.xlsx", "XLSX", "https://files.test/b.xlsx"),
                    resource("c.zip", "shp", "https://files.test/c.zip"),
                ],
            )
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        csv::Reader::from_path(path)
            .unwrap()
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn metadata_row_fields() {
        let mut dataset = tagged("cod-ab-som", &[COD_TAG, "gazetteer"]);
        dataset.url = "https://catalog.test/dataset/cod-ab-som".into();
        dataset.title = "Somalia - Subnational Administrative Boundaries".into();
        dataset.is_requestdata_type = true;
        dataset.methodology = Some("Other".into());
        dataset.methodology_other = Some("Field survey".into());
        dataset.data_update_frequency = Some("-2".into());

        let row = MetadataRow::new(&dataset, &ReferenceSet::default());
        assert_eq!(row.cod_uid, "cod-ab-som");
        assert_eq!(row.theme.as_deref(), Some("AB"));
        assert!(!row.in_reference);
        assert_eq!(row.visibility, "Available by request");
        assert_eq!(row.methodology.as_deref(), Some("Field survey"));
        assert_eq!(row.update_frequency.as_deref(), Some("Adhoc"));
        assert_eq!(row.locations.as_deref(), Some("SOM | ETH"));
        assert_eq!(
            row.tags.as_deref(),
            Some("common operational dataset - cod | gazetteer")
        );
        assert_eq!(row.file_formats.as_deref(), Some("shp | xlsx"));
        assert_eq!(row.cells().len(), COL::METADATA_SUMMARY.len());
    }

    #[tokio::test]
    async fn metadata_summary_keeps_cod_tagged_datasets() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/datasets");
                then.status(200)
                    .json_body(json!([{"DatasetTitle": "COD-PS-SOM"}]));
            })
            .await;
        let catalog = FakeCatalog::default()
            .with_dataset(tagged("cod-ps-som", &[COD_TAG]))
            .with_dataset(tagged("somalia-roads", &["roads"]))
            .with_dataset(tagged("eth-health", &[COD_TAG]))
            .with_search(COD_TOPIC_QUERY, &["cod-ps-som", "somalia-roads", "eth-health"]);
        let output = tempfile::tempdir().unwrap();
        let config = Config {
            output_dir: output.path().to_path_buf(),
            itos_url: server.url("/datasets"),
            ..Default::default()
        };
        let summary = CodSummary::with_catalog(config, catalog).unwrap();
        let rows = read_rows(&summary.metadata_summary().await.unwrap());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "cod-ps-som");
        assert_eq!(rows[0][3], "PS");
        assert_eq!(rows[0][4], "Yes");
        assert_eq!(rows[1][0], "eth-health");
        assert_eq!(rows[1][3], "");
        assert_eq!(rows[1][4], "No");
        assert_eq!(rows[1][12], "Visible");
    }

    #[test]
    fn descriptions_cover_dataset_and_resources() {
        let mut dataset = tagged("cod-em-som", &[]);
        dataset.notes = Some("Edge-matched boundaries".into());
        dataset.resources[0].description = Some("Shapefile".into());
        let rows = description_rows(&dataset);
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[0],
            vec![
                Some("SOM | ETH".to_string()),
                Some("EM".to_string()),
                Some("cod-standard".to_string()),
                Some("cod-em-som".to_string()),
                Some("dataset".to_string()),
                Some("COD-EM-SOM".to_string()),
                Some("Edge-matched boundaries".to_string()),
            ]
        );
        assert_eq!(rows[1][4].as_deref(), Some("resource"));
        assert_eq!(rows[1][5].as_deref(), Some("a.zip"));
        assert_eq!(rows[1][6].as_deref(), Some("Shapefile"));
        assert!(description_rows(&tagged("som-roads", &[])).is_empty());
    }

    #[tokio::test]
    async fn descriptions_report_joins_both_levels() {
        let mut enhanced = tagged("cod-ab-som", &[]);
        enhanced.cod_level = Some("cod-enhanced".into());
        let catalog = FakeCatalog::default()
            .with_dataset(tagged("cod-ps-eth", &[]))
            .with_dataset(enhanced)
            .with_search(COD_LEVEL_QUERIES[0], &["cod-ps-eth"])
            .with_search(COD_LEVEL_QUERIES[1], &["cod-ab-som"]);
        let output = tempfile::tempdir().unwrap();
        let config = Config {
            output_dir: output.path().to_path_buf(),
            ..Default::default()
        };
        let summary = CodSummary::with_catalog(config, catalog).unwrap();
        let rows = read_rows(&summary.dataset_resource_descriptions().await.unwrap());
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0][3], "cod-ps-eth");
        assert_eq!(rows[4][2], "cod-enhanced");
    }

    #[test]
    fn cowboy_cods_are_those_without_level() {
        let mut cowboy = dataset("somalia-admin-boundaries", "Someone", vec![]);
        cowboy.cod_level = None;
        let datasets = vec![dataset("cod-ab-som", "OCHA", vec![]), cowboy];
        assert_eq!(
            cowboy_messages(&datasets),
            vec![
                "Found 2 dataset(s) with COD tags: cod-ab-som,somalia-admin-boundaries".to_string(),
                "Found 1 cowboy COD(s): somalia-admin-boundaries".to_string(),
            ]
        );
        assert!(cowboy_messages(&datasets[..1]).len() == 1);
        assert!(cowboy_messages(&[]).is_empty());
    }
}
