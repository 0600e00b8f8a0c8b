//! This module stores the header names of every CSV report written by the crate. Downstream
//! consumers match on these exact strings, so they must not change without coordinating with the
//! people reading the reports!

pub const ISO: &str = "ISO";
pub const COD_UID: &str = "COD-UID";
pub const CONTRIBUTOR: &str = "contributor";
pub const ERROR: &str = "error";
pub const RESOURCE_NAME: &str = "resource name";
pub const FILE_NAME: &str = "file name";
pub const PCODE_HEADERS: &str = "pcode headers";
pub const NAME_HEADERS: &str = "name headers";
pub const TOTAL_POP_HEADER: &str = "total pop header";
pub const DUPLICATES: &str = "duplicates";
pub const BLANKS: &str = "blanks";
pub const LEVEL: &str = "level";
pub const DESCRIPTION: &str = "description";
pub const SERVICES: &str = "services";

pub const DATASET_TITLE: &str = "dataset title";
pub const URL: &str = "URL";
pub const THEME: &str = "Theme";
pub const IN_ITOS_API: &str = "in ITOS API";
pub const RESOURCE_DOWNLOADS: &str = "number of resource downloads";
pub const SOURCE: &str = "source";
pub const ORGANIZATION: &str = "contributor/organization";
pub const DATASET_DATE: &str = "date of dataset";
pub const UPDATED: &str = "updated";
pub const UPDATE_FREQUENCY: &str = "expected update frequency";
pub const LOCATION: &str = "location";
pub const VISIBILITY: &str = "visibility";
pub const LICENSE: &str = "license";
pub const METHODOLOGY: &str = "methodology";
pub const CAVEATS: &str = "caveats";
pub const TAGS: &str = "tags";
pub const FILE_FORMATS: &str = "file formats";

pub const DESCRIPTION_COUNTRY: &str = "country";
pub const DESCRIPTION_THEME: &str = "theme";
pub const DESCRIPTION_LEVEL: &str = LEVEL;
pub const DESCRIPTION_DATASET_NAME: &str = "dataset name";
pub const DESCRIPTION_ITEM: &str = "item";
pub const DESCRIPTION_TITLE: &str = "title";
pub const DESCRIPTION_DESCRIPTION: &str = DESCRIPTION;

pub const BOUNDARY_FIELDS: [&str; 8] = [
    ISO,
    COD_UID,
    CONTRIBUTOR,
    ERROR,
    RESOURCE_NAME,
    FILE_NAME,
    PCODE_HEADERS,
    NAME_HEADERS,
];

pub const POPULATION_HEADERS: [&str; 10] = [
    ISO,
    COD_UID,
    CONTRIBUTOR,
    ERROR,
    RESOURCE_NAME,
    PCODE_HEADERS,
    NAME_HEADERS,
    TOTAL_POP_HEADER,
    DUPLICATES,
    BLANKS,
];

pub const METADATA_SUMMARY: [&str; 18] = [
    COD_UID,
    DATASET_TITLE,
    URL,
    THEME,
    IN_ITOS_API,
    RESOURCE_DOWNLOADS,
    SOURCE,
    ORGANIZATION,
    DATASET_DATE,
    UPDATED,
    UPDATE_FREQUENCY,
    LOCATION,
    VISIBILITY,
    LICENSE,
    METHODOLOGY,
    CAVEATS,
    TAGS,
    FILE_FORMATS,
];

pub const RESOURCE_DESCRIPTIONS: [&str; 7] = [
    DESCRIPTION_COUNTRY,
    DESCRIPTION_THEME,
    DESCRIPTION_LEVEL,
    DESCRIPTION_DATASET_NAME,
    DESCRIPTION_ITEM,
    DESCRIPTION_TITLE,
    DESCRIPTION_DESCRIPTION,
];

/// Per-theme summary columns are prefixed with the theme label, e.g. `COD-AB URL`.
pub fn theme_column(label: &str, field: &str) -> String {
    format!("{label} {field}")
}

/// Column holding the number of administrative units at `level`, e.g. `COD-PS ADM2 units`.
pub fn units_column(label: &str, level: u8) -> String {
    format!("{label} ADM{level} units")
}
