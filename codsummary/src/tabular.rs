//! Reading tabular resources: CSV files and gazetteer spreadsheets.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use csv::StringRecord;
use log::debug;
use regex::{Regex, RegexBuilder};

use crate::classify::HeaderSet;

/// Column names synthesised by readers for header cells left empty, e.g. `field12`.
fn placeholder_pattern() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"^field\d{1,4}$").expect("valid regex"))
}

fn admin_sheet_pattern() -> &'static Regex {
    static ADMIN_SHEET: OnceLock<Regex> = OnceLock::new();
    ADMIN_SHEET.get_or_init(|| {
        RegexBuilder::new("adm(in)?.?[1-7]")
            .case_insensitive(true)
            .build()
            .expect("valid regex")
    })
}

/// Empty headers and positional placeholders carry no information about the column. A header of
/// spaces is a real, if odd, name.
pub fn is_placeholder(header: &str) -> bool {
    header.is_empty() || placeholder_pattern().is_match(header)
}

/// An open CSV file with its header row already read.
pub struct CsvTable {
    pub headers: Vec<String>,
    reader: csv::Reader<File>,
}

impl CsvTable {
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read headers of {}", path.display()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        Ok(Self { headers, reader })
    }

    /// Streams every remaining row through `f`, stopping at the first read or decode error.
    pub fn for_each_record<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&StringRecord),
    {
        let mut record = StringRecord::new();
        while self
            .reader
            .read_record(&mut record)
            .context("Failed to read row")?
        {
            f(&record);
        }
        Ok(())
    }

    /// Consumes the table, returning the columns without a single non-empty value.
    pub fn blank_columns(mut self) -> Result<HeaderSet> {
        let mut tally = FillTally::new(self.headers.len());
        self.for_each_record(|record| tally.record(record))?;
        Ok(tally.blanks(&self.headers))
    }

    /// Consumes the table, returning the number of data rows with at least one non-empty cell.
    /// Whitespace counts as a value.
    pub fn count_non_blank_rows(mut self) -> Result<usize> {
        let mut rows = 0;
        self.for_each_record(|record| {
            if record.iter().any(|cell| !cell.is_empty()) {
                rows += 1;
            }
        })?;
        Ok(rows)
    }
}

/// Headers occurring more than once, in order of first appearance. Placeholders are ignored.
pub fn duplicates<S: AsRef<str>>(headers: &[S]) -> HeaderSet {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for header in headers.iter().map(|h| h.as_ref()) {
        *counts.entry(header).or_default() += 1;
    }
    headers
        .iter()
        .map(|h| h.as_ref())
        .filter(|h| !is_placeholder(h) && counts.get(h).copied().unwrap_or_default() > 1)
        .collect()
}

/// Tracks, per column position, whether any row had a value.
#[derive(Debug, Clone)]
pub struct FillTally {
    filled: Vec<bool>,
}

impl FillTally {
    pub fn new(columns: usize) -> Self {
        Self {
            filled: vec![false; columns],
        }
    }

    pub fn record<'a, R>(&mut self, row: R)
    where
        R: IntoIterator<Item = &'a str>,
    {
        for (filled, cell) in self.filled.iter_mut().zip(row) {
            if !cell.is_empty() {
                *filled = true;
            }
        }
    }

    pub fn blanks<S: AsRef<str>>(&self, headers: &[S]) -> HeaderSet {
        headers
            .iter()
            .map(|h| h.as_ref())
            .zip(&self.filled)
            .filter(|(header, filled)| !**filled && !is_placeholder(header))
            .map(|(header, _)| header)
            .collect()
    }
}

/// The administrative level named by a gazetteer sheet, e.g. `admin2` or `ADM_3`.
pub fn admin_level(sheet_name: &str) -> Option<u8> {
    let found = admin_sheet_pattern().find(sheet_name)?;
    found
        .as_str()
        .chars()
        .last()
        .and_then(|c| c.to_digit(10))
        .and_then(|d| u8::try_from(d).ok())
}

fn is_blank_cell(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Non-blank rows of a sheet, not counting its header row.
pub fn count_units(sheet: &Range<Data>) -> usize {
    sheet
        .rows()
        .skip(1)
        .filter(|row| !row.iter().all(is_blank_cell))
        .count()
}

/// Number of units per administrative level in a gazetteer workbook. When two sheets name the
/// same level the later one wins.
pub fn gazetteer_unit_counts(path: &Path) -> Result<BTreeMap<u8, usize>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;
    let mut counts = BTreeMap::new();
    for sheet_name in workbook.sheet_names() {
        let Some(level) = admin_level(&sheet_name) else {
            continue;
        };
        let sheet = workbook
            .worksheet_range(&sheet_name)
            .with_context(|| format!("Failed to read sheet {sheet_name}"))?;
        let units = count_units(&sheet);
        debug!("Sheet {sheet_name}: {units} ADM{level} units");
        counts.insert(level, units);
    }
    Ok(counts)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
    const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    fn cell_ref(row: usize, column: usize) -> String {
        let letter = char::from(b'A' + u8::try_from(column).unwrap());
        format!("{letter}{}", row + 1)
    }

    fn sheet_xml(rows: &[&[&str]]) -> String {
        let mut xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="{MAIN_NS}"><sheetData>"#
        );
        for (r, row) in rows.iter().enumerate() {
            // Rows without cells are left out, as spreadsheet programs do.
            if row.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, cell) in row.iter().enumerate().filter(|(_, cell)| !cell.is_empty()) {
                xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{cell}</t></is></c>"#,
                    cell_ref(r, c)
                ));
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        xml
    }

    /// A minimal `.xlsx` workbook with inline string cells, one sheet per `(name, rows)` pair.
    pub fn xlsx_bytes(sheets: &[(&str, &[&[&str]])]) -> Vec<u8> {
        let mut content_types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        );
        let mut workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets>"#
        );
        let mut relationships = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (i, (name, _)) in sheets.iter().enumerate() {
            let id = i + 1;
            content_types.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{id}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            ));
            workbook.push_str(&format!(r#"<sheet name="{name}" sheetId="{id}" r:id="rId{id}"/>"#));
            relationships.push_str(&format!(
                r#"<Relationship Id="rId{id}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{id}.xml"/>"#
            ));
        }
        content_types.push_str("</Types>");
        workbook.push_str("</sheets></workbook>");
        relationships.push_str("</Relationships>");
        let package_rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
        );

        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let mut add = |name: &str, contents: &str| {
            zip.start_file(name, SimpleFileOptions::default()).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        };
        add("[Content_Types].xml", &content_types);
        add("_rels/.rels", &package_rels);
        add("xl/workbook.xml", &workbook);
        add("xl/_rels/workbook.xml.rels", &relationships);
        for (i, (_, rows)) in sheets.iter().enumerate() {
            add(&format!("xl/worksheets/sheet{}.xml", i + 1), &sheet_xml(rows));
        }
        zip.finish().unwrap().into_inner()
    }
}
