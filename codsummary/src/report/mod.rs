//! The report builders. Each writes one CSV into the configured output directory.

use std::str::FromStr;

use strum_macros::{Display, EnumIter, EnumString};

use crate::catalog::Dataset;

pub mod boundary;
pub mod metadata;
pub mod population;
pub mod summary;

pub const BOUNDARY_FIELDS_FILE: &str = "boundary_dataset_headers.csv";
pub const POPULATION_HEADERS_FILE: &str = "population_dataset_headers.csv";
pub const METADATA_SUMMARY_FILE: &str = "datasets_tagged_cods.csv";
pub const RESOURCE_DESCRIPTIONS_FILE: &str = "dataset_resource_descriptions.csv";
pub const COUNTRY_SUMMARY_FILE: &str = "country_summary.csv";

/// Tag carried by every COD dataset in the catalog.
pub const COD_TAG: &str = "common operational dataset - cod";

/// Failures that end processing of one resource or file. The `Display` strings are what the
/// reports contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RowError {
    #[strum(to_string = "Could not find shp or json boundary resource")]
    NoBoundaryResource,
    #[strum(to_string = "Could not download boundary resource")]
    BoundaryDownload,
    #[strum(to_string = "Could not unzip boundary resource")]
    BoundaryUnzip,
    #[strum(to_string = "Could not find shp in zip")]
    NoShapefileInZip,
    #[strum(to_string = "Could not read file")]
    UnreadableFile,
    #[strum(to_string = "No csv resources found")]
    NoCsvResource,
    #[strum(to_string = "Could not read resource")]
    UnreadableResource,
}

/// COD themes, named by the `cod-{theme}-{iso}` convention of dataset names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum Theme {
    Ab,
    Ps,
    Hp,
    Em,
}

impl Theme {
    /// Themes that get a per-country summary.
    pub const SUMMARISED: [Theme; 3] = [Theme::Ab, Theme::Ps, Theme::Em];

    /// Upper-case code, e.g. `AB`.
    pub fn code(&self) -> String {
        self.to_string().to_uppercase()
    }

    /// Column prefix, e.g. `COD-AB`.
    pub fn label(&self) -> String {
        format!("COD-{}", self.code())
    }

    pub fn dataset_name(&self, iso: &str) -> String {
        format!("cod-{self}-{}", iso.to_lowercase())
    }

    pub fn summary_file(&self) -> String {
        format!("country_{self}_summary.csv")
    }

    /// Theme of a dataset whose name starts `cod-ab`, `cod-ps`, `cod-hp` or `cod-em`.
    pub fn from_dataset_name(name: &str) -> Option<Theme> {
        let code = name.get(..6)?.strip_prefix("cod-")?;
        Theme::from_str(code).ok()
    }
}

/// Identifying fields shared by every row written for one dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct DatasetContext {
    pub iso: String,
    pub cod_uid: Option<String>,
    pub contributor: Option<String>,
}

impl DatasetContext {
    pub fn iso_only(iso: &str) -> Self {
        Self {
            iso: iso.to_string(),
            ..Default::default()
        }
    }

    pub fn from_dataset(iso: &str, dataset: &Dataset) -> Self {
        Self {
            iso: iso.to_string(),
            cod_uid: Some(dataset.uid()),
            contributor: dataset.organization_title(),
        }
    }
}

/// Joins list values for a single report cell.
pub(crate) fn join_list<I, S>(items: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let items: Vec<String> = items
        .into_iter()
        .map(|item| item.as_ref().to_string())
        .collect();
    (!items.is_empty()).then(|| items.join(" | "))
}
