//! Error types.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum CodSummaryError {
    #[error("Wrapped anyhow error: {0}")]
    AnyhowError(#[from] anyhow::Error),
    #[error("Catalog request failed: {0}")]
    CatalogRequest(String),
    #[error("Could not download {url}: {reason}")]
    Download { url: String, reason: String },
    #[error("Could not extract archive {0}")]
    Archive(PathBuf),
    #[error("Could not read file {0}")]
    UnreadableFile(PathBuf),
    #[error("Unsupported geometry file: {0}")]
    UnsupportedGeometry(PathBuf),
    #[error("Reference API unavailable: {0}")]
    ReferenceUnavailable(String),
}
