use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// The catalog deployments a run can be pointed at.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum HdxSite {
    #[default]
    Prod,
    Stage,
    Feature,
    Demo,
    Dev,
}

impl HdxSite {
    pub fn base_url(&self) -> &'static str {
        match self {
            HdxSite::Prod => "https://data.humdata.org",
            HdxSite::Stage => "https://stage.data-humdata-org.ahconu.org",
            HdxSite::Feature => "https://feature.data-humdata-org.ahconu.org",
            HdxSite::Demo => "https://demo.data-humdata-org.ahconu.org",
            HdxSite::Dev => "https://dev.data-humdata-org.ahconu.org",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub hdx_site: HdxSite,
    /// Overrides the URL derived from `hdx_site`, mostly useful for pointing at a local mirror.
    pub hdx_url: Option<String>,
    /// ISO3 codes processed when a run asks for all countries
    pub countries: Vec<String>,
    /// Boundary dataset names to use instead of `cod-ab-{iso}`, keyed by ISO3 code
    pub boundary_dataset_exceptions: HashMap<String, Vec<String>>,
    pub itos_url: String,
    pub itos_ps_url: String,
    /// Two-letter suffixes (without the underscore) that mark a name column, e.g. `ADM1_EN`
    pub language_suffixes: Vec<String>,
    pub output_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub search_rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            hdx_site: HdxSite::default(),
            hdx_url: None,
            countries: [
                "AFG", "BDI", "BFA", "CAF", "CMR", "COD", "COL", "ETH", "HTI", "IRQ", "LBY", "MLI",
                "MMR", "MOZ", "NER", "NGA", "PSE", "SDN", "SOM", "SSD", "SYR", "TCD", "UKR", "VEN",
                "YEM",
            ]
            .iter()
            .map(|iso| iso.to_string())
            .collect(),
            boundary_dataset_exceptions: HashMap::new(),
            itos_url: "https://apps.itos.uga.edu/CODV2API/api/v1/datasets".into(),
            itos_ps_url: "https://apps.itos.uga.edu/CODV2API/api/v1/themes/cod-ps/locations/"
                .into(),
            language_suffixes: ["en", "fr", "es", "ru"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_dir: PathBuf::from("."),
            request_timeout_secs: 60,
            search_rows: 1000,
        }
    }
}

impl Config {
    /// Base URL of the catalog this run talks to
    pub fn catalog_url(&self) -> String {
        self.hdx_url
            .clone()
            .unwrap_or_else(|| self.hdx_site.base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Expands a country selection: an empty list or `all` means every configured country.
    pub fn resolve_countries(&self, requested: &[String]) -> Vec<String> {
        let wants_all = requested.is_empty()
            || (requested.len() == 1 && requested[0].eq_ignore_ascii_case("all"));
        let countries = if wants_all {
            &self.countries
        } else {
            requested
        };
        countries.iter().map(|iso| iso.trim().to_uppercase()).collect()
    }

    /// Boundary dataset names for a country, honouring `boundary_dataset_exceptions`.
    pub fn boundary_dataset_names(&self, iso: &str) -> Vec<String> {
        match self.boundary_dataset_exceptions.get(iso) {
            Some(names) if !names.is_empty() => names.clone(),
            _ => vec![format!("cod-ab-{}", iso.to_lowercase())],
        }
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}
