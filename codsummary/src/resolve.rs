//! Picks a single total population header out of several candidates.

use std::fmt::Display;

use log::debug;

/// Outcome of tie-breaking between total population candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No candidate at all. A valid state for files without population columns.
    NotFound,
    Resolved(String),
    /// No rule could separate the candidates. They are kept in their original order so someone
    /// can pick one by hand.
    Undecidable(Vec<String>),
}

impl Resolution {
    /// The value written to the report: the chosen header, or the candidates joined by `,`.
    pub fn cell(&self) -> Option<String> {
        match self {
            Resolution::NotFound => None,
            Resolution::Resolved(header) => Some(header.clone()),
            Resolution::Undecidable(candidates) => Some(candidates.join(",")),
        }
    }

    pub fn is_undecidable(&self) -> bool {
        matches!(self, Resolution::Undecidable(_))
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::NotFound => write!(f, "no population header"),
            Resolution::Resolved(header) => write!(f, "{header}"),
            Resolution::Undecidable(candidates) => {
                write!(f, "undecidable between {}", candidates.join(", "))
            }
        }
    }
}

fn mentions_total(header: &str) -> bool {
    let header = header.to_lowercase();
    header.contains("total") || header.contains("totl")
}

/// Standalone four digit numbers, i.e. runs of exactly four digits.
fn years(header: &str) -> impl Iterator<Item = u32> + '_ {
    header
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| run.len() == 4)
        .filter_map(|run| run.parse().ok())
}

/// Resolves the total population header:
///
/// 1. a lone candidate wins outright;
/// 2. otherwise a unique candidate mentioning `total`/`totl` wins;
/// 3. otherwise the unique candidate containing the latest year wins;
/// 4. anything else is undecidable.
pub fn resolve<S: AsRef<str>>(candidates: &[S]) -> Resolution {
    let candidates: Vec<&str> = candidates.iter().map(|c| c.as_ref()).collect();
    match candidates.as_slice() {
        [] => return Resolution::NotFound,
        [only] => return Resolution::Resolved(only.to_string()),
        _ => {}
    }

    let totals: Vec<&str> = candidates
        .iter()
        .copied()
        .filter(|c| mentions_total(c))
        .collect();
    if let [total] = totals.as_slice() {
        return Resolution::Resolved(total.to_string());
    }

    let undecidable = || Resolution::Undecidable(candidates.iter().map(|c| c.to_string()).collect());
    let Some(latest) = candidates.iter().flat_map(|c| years(c)).max() else {
        debug!("No year in population candidates {candidates:?}");
        return undecidable();
    };
    let latest = latest.to_string();
    let with_latest: Vec<&str> = candidates
        .iter()
        .copied()
        .filter(|c| c.contains(&latest))
        .collect();
    match with_latest.as_slice() {
        [header] => Resolution::Resolved(header.to_string()),
        _ => undecidable(),
    }
}
