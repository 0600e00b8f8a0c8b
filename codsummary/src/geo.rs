//! Geometry files: unpacking zipped shapefiles and reading the attribute columns of a layer.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use geojson::GeoJson;
use itertools::Itertools;
use log::debug;
use walkdir::WalkDir;

use crate::{classify::HeaderSet, error::CodSummaryError};

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Extracts `archive` into a fresh, uniquely named directory below `temp_root`.
pub fn extract_archive(archive: &Path, temp_root: &Path) -> Result<PathBuf> {
    let destination = temp_root.join(uuid::Uuid::new_v4().to_string());
    std::fs::create_dir_all(&destination)
        .with_context(|| format!("Failed to create {}", destination.display()))?;
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|_| CodSummaryError::Archive(archive.to_path_buf()))?;
    zip.extract(&destination)
        .map_err(|_| CodSummaryError::Archive(archive.to_path_buf()))?;
    debug!(
        "Extracted {} to {}",
        archive.display(),
        destination.display()
    );
    Ok(destination)
}

/// Every `*.shp` file below `dir`, at any depth, in path order.
pub fn find_shapefiles(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && has_extension(entry.path(), "shp"))
        .map(|entry| entry.into_path())
        .sorted()
        .collect()
}

/// Attribute columns of a shapefile, read from the `.dbf` table next to it.
fn shapefile_headers(path: &Path) -> Result<Vec<String>> {
    let dbf = ["dbf", "DBF"]
        .iter()
        .map(|ext| path.with_extension(ext))
        .find(|candidate| candidate.exists())
        .ok_or_else(|| CodSummaryError::UnreadableFile(path.to_path_buf()))?;
    let reader = dbase::Reader::from_path(&dbf)
        .with_context(|| format!("Failed to read attribute table {}", dbf.display()))?;
    Ok(reader
        .fields()
        .iter()
        .map(|field| field.name().to_string())
        .collect())
}

/// Property names across all features of a GeoJSON file, in order of first appearance.
fn geojson_headers(path: &Path) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let geojson: GeoJson = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse GeoJSON {}", path.display()))?;
    let features = match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => vec![],
    };
    let headers: HeaderSet = features
        .iter()
        .filter_map(|feature| feature.properties.as_ref())
        .flat_map(|properties| properties.keys())
        .collect();
    Ok(headers.as_slice().to_vec())
}

/// Column headers of a shapefile or GeoJSON layer.
pub fn read_headers(path: &Path) -> Result<Vec<String>> {
    if has_extension(path, "shp") {
        shapefile_headers(path)
    } else if has_extension(path, "geojson") || has_extension(path, "json") {
        geojson_headers(path)
    } else {
        Err(CodSummaryError::UnsupportedGeometry(path.to_path_buf()).into())
    }
}
