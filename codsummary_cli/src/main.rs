mod cli;
mod display;
mod error;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, RunCommand};
use codsummary::config::Config;
use error::CliResult;
use log::debug;

const DEFAULT_LOGGING_LEVEL: &str = "info";

#[tokio::main]
async fn main() -> Result<()> {
    // Set RUST_LOG to `DEFAULT_LOGGING_LEVEL` if not set
    let _ =
        std::env::var("RUST_LOG").map_err(|_| std::env::set_var("RUST_LOG", DEFAULT_LOGGING_LEVEL));
    pretty_env_logger::init_timed();
    let args = Cli::parse();
    debug!("args: {args:?}");
    let mut config = read_config_from_toml(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    debug!("config: {config:?}");

    if let Some(command) = args.command {
        command.run(config).await?;
    }
    Ok(())
}

fn default_config_path() -> Option<PathBuf> {
    // macOS: ~/Library/Application Support/codsummary/config.toml
    dirs::config_dir().map(|dir| dir.join("codsummary").join("config.toml"))
}

/// Reads the given config file, or the default one when it exists, else the defaults.
fn read_config_from_toml(path: Option<&Path>) -> CliResult<Config> {
    let (file_path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => match default_config_path() {
            Some(path) => (path, false),
            None => return Ok(Config::default()),
        },
    };
    match std::fs::read_to_string(&file_path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => Ok(Config::default()),
        Err(e) => Err(e.into()),
    }
}
