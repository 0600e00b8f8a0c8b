use codsummary::error::CodSummaryError;

#[derive(thiserror::Error, Debug)]
pub enum CodSummaryCliError {
    #[error("Anyhow error: {0:#}")]
    Anyhow(#[from] anyhow::Error),
    #[error("codsummary error: {0}")]
    CodSummaryError(#[from] CodSummaryError),
    #[error("Invalid TOML in config file: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("std IO error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type CliResult<T> = Result<T, CodSummaryCliError>;
