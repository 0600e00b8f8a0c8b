//! Rule-based classification of column headers into p-code, name and total-population roles.
//!
//! The rules are heuristics tuned against the headers actually published in the catalog, and the
//! order in which they are applied matters to the people reading the reports. In particular a
//! header spelled exactly `T` or `T_TL` (case-insensitive) locks the population role: it replaces
//! any candidates seen so far and every later header is ignored for that role.

use std::fmt::Display;

use anyhow::{Context, Result};
use itertools::Itertools;
use regex::{Regex, RegexBuilder};

/// Language suffixes recognised as marking a name column when none are configured.
pub const DEFAULT_LANGUAGE_SUFFIXES: [&str; 4] = ["en", "fr", "es", "ru"];

/// Headers that are, on their own, the total population column.
const EXACT_TOTAL_HEADERS: [&str; 2] = ["t", "t_tl"];

const CODE_PATTERN: &str = "p?code";
const LEVEL_PATTERN: &str = r"(^\d\D)|(\D\d\D)|(\D\d$)";
const POPULATION_PATTERN: &str = "(^t_)|population|both|total|totl|proj|pop|ensemble";
const SEX_YEAR_PATTERN: &str = "_f|_m|m_|f_|year|female|male|trans";
const AGE_PATTERN: &str = r"^\d{1,2}\D|(\D\d{1,2}\D)|(\D\d$)";
const AGE_WORD_PATTERN: &str = "age|adult|plus";
const URBAN_RURAL_PATTERN: &str = "urban|rural";

/// An insertion-ordered, deduplicated collection of header names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet(Vec<String>);

impl HeaderSet {
    /// Adds `header` unless already present. Returns whether it was added.
    pub fn insert(&mut self, header: &str) -> bool {
        if self.contains(header) {
            return false;
        }
        self.0.push(header.to_string());
        true
    }

    pub fn contains(&self, header: &str) -> bool {
        self.0.iter().any(|h| h == header)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    fn clear(&mut self) {
        self.0.clear();
    }

    /// The report cell for this set: `None` when empty, otherwise the headers joined by `", "`.
    pub fn joined(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.0.join(", "))
    }
}

impl<S: AsRef<str>> FromIterator<S> for HeaderSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = HeaderSet::default();
        for header in iter {
            set.insert(header.as_ref());
        }
        set
    }
}

impl Display for HeaderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

/// The roles found among the headers of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub pcode_headers: HeaderSet,
    pub name_headers: HeaderSet,
    /// Candidates for the total population column, in header order
    pub population_headers: HeaderSet,
}

/// The compiled rule set. Construct once per run and share between reports.
#[derive(Debug, Clone)]
pub struct HeaderPatterns {
    code: Regex,
    name: Regex,
    level: Regex,
    population: Regex,
    sex_year: Regex,
    age: Regex,
    age_word: Regex,
    urban_rural: Regex,
}

fn case_insensitive(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("Invalid header pattern: {pattern}"))
}

/// Builds the name pattern: `name` anywhere, or one of the language suffixes at the very end.
fn name_pattern<S: AsRef<str>>(language_suffixes: &[S]) -> String {
    let suffixes = language_suffixes
        .iter()
        .map(|s| s.as_ref().trim().trim_start_matches('_'))
        .filter(|s| !s.is_empty())
        .map(regex::escape)
        .collect_vec();
    if suffixes.is_empty() {
        "name".to_string()
    } else {
        format!("name|_({})$", suffixes.join("|"))
    }
}

impl HeaderPatterns {
    pub fn new<S: AsRef<str>>(language_suffixes: &[S]) -> Result<Self> {
        Ok(Self {
            code: case_insensitive(CODE_PATTERN)?,
            name: case_insensitive(&name_pattern(language_suffixes))?,
            level: case_insensitive(LEVEL_PATTERN)?,
            population: case_insensitive(POPULATION_PATTERN)?,
            sex_year: case_insensitive(SEX_YEAR_PATTERN)?,
            age: case_insensitive(AGE_PATTERN)?,
            age_word: case_insensitive(AGE_WORD_PATTERN)?,
            urban_rural: case_insensitive(URBAN_RURAL_PATTERN)?,
        })
    }

    /// Patterns with the default language suffixes.
    pub fn with_default_languages() -> Result<Self> {
        Self::new(&DEFAULT_LANGUAGE_SUFFIXES)
    }

    fn has_level(&self, header: &str) -> bool {
        self.level.is_match(header)
    }

    /// A p-code header names a code column tied to an administrative level, e.g. `ADM1_PCODE`.
    pub fn is_pcode(&self, header: &str) -> bool {
        self.code.is_match(header) && self.has_level(header)
    }

    /// A name header is a `name` or language-suffixed column tied to a level, e.g. `ADM2_FR`.
    pub fn is_name(&self, header: &str) -> bool {
        self.name.is_match(header) && self.has_level(header)
    }

    /// Whether `header` is exactly one of the single-column totals (`T`, `T_TL`).
    pub fn is_exact_total(&self, header: &str) -> bool {
        EXACT_TOTAL_HEADERS
            .iter()
            .any(|total| header.eq_ignore_ascii_case(total))
    }

    /// Keyword match for a population column, minus anything disaggregated by sex, age or
    /// urban/rural.
    pub fn is_population(&self, header: &str) -> bool {
        self.population.is_match(header)
            && !self.sex_year.is_match(header)
            && !self.age.is_match(header)
            && !self.age_word.is_match(header)
            && !self.urban_rural.is_match(header)
    }

    /// Classifies every header into p-code, name and population roles.
    pub fn classify<S: AsRef<str>>(&self, headers: &[S]) -> Classification {
        let mut classification = self.classify_fields(headers);
        for header in headers.iter().map(|h| h.as_ref()) {
            if self.is_exact_total(header) {
                classification.population_headers.clear();
                classification.population_headers.insert(header);
                break;
            }
            if self.is_population(header) {
                classification.population_headers.insert(header);
            }
        }
        classification
    }

    /// Classifies headers into p-code and name roles only, as for boundary attribute tables.
    pub fn classify_fields<S: AsRef<str>>(&self, headers: &[S]) -> Classification {
        let mut classification = Classification::default();
        for header in headers.iter().map(|h| h.as_ref()) {
            if self.is_pcode(header) {
                classification.pcode_headers.insert(header);
            }
            if self.is_name(header) {
                classification.name_headers.insert(header);
            }
        }
        classification
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> HeaderPatterns {
        HeaderPatterns::with_default_languages().unwrap()
    }

    fn set(headers: &[&str]) -> HeaderSet {
        headers.iter().collect()
    }

    #[test]
    fn classifies_typical_population_table() {
        let result = patterns().classify(&["ADM1_PCODE", "ADM1_EN", "POP_2020", "POP_2021"]);
        assert_eq!(result.pcode_headers, set(&["ADM1_PCODE"]));
        assert_eq!(result.name_headers, set(&["ADM1_EN"]));
        assert_eq!(result.population_headers, set(&["POP_2020", "POP_2021"]));
    }

    #[test]
    fn classification_is_deterministic() {
        let headers = [
            "admin2Pcode",
            "admin2Name_en",
            "admin1Pcode",
            "T_TL",
            "F_TL",
            "M_TL",
            "Total_2019",
        ];
        let patterns = patterns();
        assert_eq!(patterns.classify(&headers), patterns.classify(&headers));
    }

    #[test]
    fn exact_total_locks_population_role() {
        let result = patterns().classify(&["T", "POP_2020"]);
        assert_eq!(result.population_headers, set(&["T"]));

        // Replaces earlier candidates too
        let result = patterns().classify(&["Population", "t_tl", "Total"]);
        assert_eq!(result.population_headers, set(&["t_tl"]));
    }

    #[test]
    fn exact_total_does_not_block_other_roles() {
        let result = patterns().classify(&["T", "ADM3_PCODE", "ADM3_FR"]);
        assert_eq!(result.population_headers, set(&["T"]));
        assert_eq!(result.pcode_headers, set(&["ADM3_PCODE"]));
        assert_eq!(result.name_headers, set(&["ADM3_FR"]));
    }

    #[test]
    fn disaggregated_columns_are_excluded() {
        let patterns = patterns();
        for header in [
            "POP_FEMALE_2020",
            "pop_male",
            "F_TL",
            "M_TL",
            "Pop_Urban",
            "rural_population",
            "pop_age_0_4",
            "Pop60plus",
            "adult_pop",
            "pop_00_04",
            "population_year",
        ] {
            assert!(
                !patterns.is_population(header),
                "{header} should not be a total population header"
            );
        }
        for header in ["Population", "Total", "T_TL_2020", "ensemble", "Proj2022", "BOTH"] {
            assert!(
                patterns.is_population(header),
                "{header} should be a total population header"
            );
        }
    }

    #[test]
    fn pcode_requires_level() {
        let patterns = patterns();
        assert!(patterns.is_pcode("ADM1_PCODE"));
        assert!(patterns.is_pcode("adm_1_code"));
        assert!(patterns.is_pcode("P_CODE2"));
        assert!(patterns.is_pcode("admin3Pcode"));
        assert!(!patterns.is_pcode("PCODE"));
        assert!(!patterns.is_pcode("postcode"));
        assert!(!patterns.is_pcode("ADM12_PCODE"));
    }

    #[test]
    fn name_requires_level() {
        let patterns = patterns();
        assert!(patterns.is_name("ADM1_EN"));
        assert!(patterns.is_name("admin2Name_en"));
        assert!(patterns.is_name("ADM0_RU"));
        assert!(!patterns.is_name("NAME"));
        assert!(!patterns.is_name("ADM1_PT"));
        assert!(!patterns.is_name("ADM1_ENGLISH"));
    }

    #[test]
    fn language_suffixes_are_configurable() {
        let patterns = HeaderPatterns::new(&["pt", "_ar"]).unwrap();
        assert!(patterns.is_name("ADM1_PT"));
        assert!(patterns.is_name("ADM1_AR"));
        assert!(!patterns.is_name("ADM1_EN"));
        assert!(patterns.is_name("ADM1_NAME"));

        let names_only = HeaderPatterns::new::<&str>(&[]).unwrap();
        assert!(!names_only.is_name("ADM1_EN"));
        assert!(names_only.is_name("adm1_name"));
    }

    #[test]
    fn header_may_hold_several_roles() {
        let result = patterns().classify_fields(&["adm1_name_code"]);
        assert_eq!(result.pcode_headers, set(&["adm1_name_code"]));
        assert_eq!(result.name_headers, set(&["adm1_name_code"]));
    }

    #[test]
    fn boundary_fields_skip_population() {
        let result = patterns().classify_fields(&["ADM2_PCODE", "ADM2_EN", "Shape_Area", "T"]);
        assert!(result.population_headers.is_empty());
        assert_eq!(result.pcode_headers.joined().as_deref(), Some("ADM2_PCODE"));
    }

    #[test]
    fn repeated_headers_are_deduplicated() {
        let result = patterns().classify(&["ADM1_PCODE", "ADM1_PCODE", "Total", "Total"]);
        assert_eq!(result.pcode_headers.len(), 1);
        assert_eq!(result.population_headers, set(&["Total"]));
    }

    #[test]
    fn joined_keeps_header_order() {
        let headers = set(&["ADM2_PCODE", "ADM1_PCODE"]);
        assert_eq!(headers.joined().as_deref(), Some("ADM2_PCODE, ADM1_PCODE"));
        assert_eq!(HeaderSet::default().joined(), None);
    }
}
