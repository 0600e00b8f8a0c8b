//! Per-country summaries of the COD themes: who publishes them, at what level, and how many
//! administrative units each level has.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use log::{error, info, warn};
use regex::{Regex, RegexBuilder};

use super::{Theme, COUNTRY_SUMMARY_FILE};
use crate::catalog::{Catalog, Dataset, Resource};
use crate::sink::write_table;
use crate::tabular::{gazetteer_unit_counts, CsvTable};
use crate::{CodSummary, COL};

/// Levels that have a units column.
const UNIT_LEVELS: [u8; 4] = [1, 2, 3, 4];

fn gazetteer_name_pattern() -> &'static Regex {
    static GAZETTEER: OnceLock<Regex> = OnceLock::new();
    GAZETTEER.get_or_init(|| {
        RegexBuilder::new(
            r"(adm(in)?.?boundaries.?tabular.?data)|(adm_?ga?z)|(gazetteer)|(adm)",
        )
        .case_insensitive(true)
        .build()
        .expect("valid regex")
    })
}

fn level_resource_pattern(level: u8) -> Result<Regex> {
    RegexBuilder::new(&format!("adm(in)?_?{level}"))
        .case_insensitive(true)
        .build()
        .context("Invalid admin level pattern")
}

/// Spreadsheet resources that look like gazetteers. With several spreadsheets, only those
/// described as a gazetteer or taxonomy, or named like one, are kept.
pub fn select_gazetteers(dataset: &Dataset) -> Vec<&Resource> {
    let spreadsheets = dataset.resources_of_type(&["xls", "xlsx"]);
    if spreadsheets.len() <= 1 {
        return spreadsheets;
    }
    spreadsheets
        .into_iter()
        .filter(|resource| {
            let description = resource.description().to_lowercase();
            description.contains("gazetteer")
                || description.contains("taxonomy")
                || gazetteer_name_pattern().is_match(&resource.name)
        })
        .collect()
}

/// What one theme dataset tells about a country.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThemeSummary {
    pub url: Option<String>,
    pub level: Option<String>,
    pub contributor: Option<String>,
    pub description: Option<String>,
    pub units: BTreeMap<u8, usize>,
    pub services: Option<bool>,
}

impl ThemeSummary {
    fn from_dataset(dataset: &Dataset) -> Self {
        if dataset.cod_level.is_none() {
            error!("Dataset missing level {}", dataset.name);
        }
        Self {
            url: Some(dataset.url.clone()),
            level: dataset.cod_level.clone(),
            contributor: dataset.organization_title(),
            description: dataset.notes.clone(),
            ..Default::default()
        }
    }

    fn units_cell(&self, level: u8) -> Option<String> {
        self.units.get(&level).map(|units| units.to_string())
    }

    fn services_cell(&self) -> Option<String> {
        self.services
            .map(|services| if services { "True" } else { "False" }.to_string())
    }
}

fn theme_summary_header(theme: Theme) -> Vec<String> {
    let label = theme.label();
    let mut header = vec![COL::ISO.to_string()];
    for field in [COL::URL, COL::LEVEL, COL::CONTRIBUTOR, COL::DESCRIPTION] {
        header.push(COL::theme_column(&label, field));
    }
    header.extend(UNIT_LEVELS.iter().map(|level| COL::units_column(&label, *level)));
    header
}

fn country_summary_header() -> Vec<String> {
    let ab = Theme::Ab.label();
    let ps = Theme::Ps.label();
    let em = Theme::Em.label();
    let mut header = vec![COL::ISO.to_string()];
    for field in [COL::URL, COL::LEVEL, COL::CONTRIBUTOR] {
        header.push(COL::theme_column(&ab, field));
    }
    header.extend(UNIT_LEVELS.iter().map(|level| COL::units_column(&ab, *level)));
    header.push(COL::theme_column(&ab, COL::SERVICES));
    for field in [COL::URL, COL::LEVEL, COL::CONTRIBUTOR, COL::SERVICES] {
        header.push(COL::theme_column(&ps, field));
    }
    for field in [COL::URL, COL::LEVEL, COL::SERVICES] {
        header.push(COL::theme_column(&em, field));
    }
    header
}

fn theme_row(iso: &str, summary: &ThemeSummary) -> Vec<Option<String>> {
    let mut row = vec![
        Some(iso.to_string()),
        summary.url.clone(),
        summary.level.clone(),
        summary.contributor.clone(),
        summary.description.clone(),
    ];
    row.extend(UNIT_LEVELS.iter().map(|level| summary.units_cell(*level)));
    row
}

fn country_row(
    iso: &str,
    ab: &ThemeSummary,
    ps: &ThemeSummary,
    em: &ThemeSummary,
) -> Vec<Option<String>> {
    let mut row = vec![
        Some(iso.to_string()),
        ab.url.clone(),
        ab.level.clone(),
        ab.contributor.clone(),
    ];
    row.extend(UNIT_LEVELS.iter().map(|level| ab.units_cell(*level)));
    row.extend([
        ab.services_cell(),
        ps.url.clone(),
        ps.level.clone(),
        ps.contributor.clone(),
        ps.services_cell(),
        em.url.clone(),
        em.level.clone(),
        em.services_cell(),
    ]);
    row
}

/// A row is worth writing when it says more than the ISO code.
fn has_content(row: &[Option<String>]) -> bool {
    row.iter()
        .skip(1)
        .flatten()
        .any(|cell| !cell.is_empty())
}

impl<C: Catalog> CodSummary<C> {
    /// Writes `country_{theme}_summary.csv` for the AB, PS or EM theme.
    pub async fn country_theme_summary(
        &self,
        theme: Theme,
        countries: &[String],
    ) -> Result<PathBuf> {
        info!("Summarizing {} by country", theme.label());
        let mut rows = vec![];
        for iso in self.config.resolve_countries(countries) {
            let Some(dataset) = self.lookup(&theme.dataset_name(&iso)).await else {
                continue;
            };
            if theme != Theme::Ps && dataset.archived {
                info!("{iso}: skipping archived dataset {}", dataset.name);
                continue;
            }
            let summary = ThemeSummary {
                units: self.unit_counts(theme, &iso, &dataset).await,
                ..ThemeSummary::from_dataset(&dataset)
            };
            let row = theme_row(&iso, &summary);
            if has_content(&row) {
                rows.push(row);
            }
        }
        let path = self.config.output_path(&theme.summary_file());
        write_table(&path, &theme_summary_header(theme), &rows)?;
        info!("Wrote out {} summary", theme.label());
        Ok(path)
    }

    /// Writes `country_summary.csv`, one row per country across the AB, PS and EM themes.
    pub async fn country_summary(&self, countries: &[String]) -> Result<PathBuf> {
        info!("Summarizing CODs by country");
        let mut rows = vec![];
        for iso in self.config.resolve_countries(countries) {
            let mut summaries = HashMap::new();
            for theme in Theme::SUMMARISED {
                let Some(dataset) = self.lookup(&theme.dataset_name(&iso)).await else {
                    continue;
                };
                let mut summary = ThemeSummary::from_dataset(&dataset);
                summary.services = Some(self.has_services(theme, &iso, &dataset).await);
                if theme == Theme::Ab {
                    summary.units = self.unit_counts(theme, &iso, &dataset).await;
                }
                summaries.insert(theme, summary);
            }
            let summary_for = |theme: Theme| summaries.get(&theme).cloned().unwrap_or_default();
            let row = country_row(
                &iso,
                &summary_for(Theme::Ab),
                &summary_for(Theme::Ps),
                &summary_for(Theme::Em),
            );
            if has_content(&row) {
                rows.push(row);
            }
        }
        let path = self.config.output_path(COUNTRY_SUMMARY_FILE);
        write_table(&path, &country_summary_header(), &rows)?;
        info!("Wrote out country summary");
        Ok(path)
    }

    /// A dataset has services when it publishes a geoservice, or for population statistics
    /// when the reference API serves the country.
    async fn has_services(&self, theme: Theme, iso: &str, dataset: &Dataset) -> bool {
        if dataset.file_types().iter().any(|t| t == "geoservice") {
            return true;
        }
        theme == Theme::Ps && self.reference.has_population_service(iso).await
    }

    async fn unit_counts(&self, theme: Theme, iso: &str, dataset: &Dataset) -> BTreeMap<u8, usize> {
        match theme {
            Theme::Ps => self.population_unit_counts(iso, dataset).await,
            _ => self.gazetteer_unit_counts(theme, iso, dataset).await,
        }
    }

    async fn download_to_temp(&self, resource: &Resource) -> Result<PathBuf> {
        self.catalog.download(resource, self.temp_path()).await
    }

    async fn gazetteer_unit_counts(
        &self,
        theme: Theme,
        iso: &str,
        dataset: &Dataset,
    ) -> BTreeMap<u8, usize> {
        let label = theme.label();
        let gazetteers = select_gazetteers(dataset);
        if gazetteers.is_empty() {
            warn!("Cannot find gazetteer for {label} {iso}");
        } else if gazetteers.len() > 1 {
            warn!("Found more than one gazetteer for {label} {iso}");
        }
        let mut units = BTreeMap::new();
        for gazetteer in gazetteers {
            let path = match self.download_to_temp(gazetteer).await {
                Ok(path) => path,
                Err(err) => {
                    error!("Could not download gazetteer for {label} {iso}: {err:#}");
                    continue;
                }
            };
            match gazetteer_unit_counts(&path) {
                Ok(counts) => units.extend(counts),
                Err(err) => error!("Could not open gazetteer for {label} {iso}: {err:#}"),
            }
        }
        units
    }

    async fn population_unit_counts(&self, iso: &str, dataset: &Dataset) -> BTreeMap<u8, usize> {
        let tables = dataset.resources_of_type(&["csv"]);
        if tables.is_empty() {
            warn!("No csv resources found for {}", dataset.name);
        }
        let mut units = BTreeMap::new();
        for level in UNIT_LEVELS {
            let pattern = match level_resource_pattern(level) {
                Ok(pattern) => pattern,
                Err(err) => {
                    error!("{err:#}");
                    continue;
                }
            };
            let Some(table) = tables.iter().find(|r| pattern.is_match(&r.name)) else {
                continue;
            };
            let path = match self.download_to_temp(table).await {
                Ok(path) => path,
                Err(err) => {
                    error!("Could not download adm{level} pop spreadsheet for {iso}: {err:#}");
                    continue;
                }
            };
            match count_rows(&path) {
                Ok(rows) => {
                    units.insert(level, rows);
                }
                Err(err) => {
                    error!("Could not open adm{level} pop spreadsheet for {iso}: {err:#}")
                }
            }
        }
        units
    }
}

fn count_rows(path: &Path) -> Result<usize> {
    CsvTable::open(path)?.count_non_blank_rows()
}
