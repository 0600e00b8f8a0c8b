use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use codsummary::{
    classify::HeaderPatterns,
    config::{Config, HdxSite},
    report::Theme,
    resolve::resolve,
    CodSummary,
};
use enum_dispatch::enum_dispatch;
use itertools::Itertools;
use log::{info, warn};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::display::display_classification;
use crate::error::CliResult;

/// File collecting the messages of a run that someone needs to follow up.
pub const ERRORS_FILE: &str = "errors.txt";

/// The report generators a `run` can invoke, in the order they run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, Display, EnumIter)]
#[strum(ascii_case_insensitive, serialize_all = "snake_case")]
pub enum Scraper {
    MetadataSummary,
    CheckPopulationHeaders,
    CheckBoundaryFields,
    CowboyCods,
    CountrySummary,
    CountryAbSummary,
    CountryPsSummary,
    CountryEmSummary,
    DatasetResourceDescriptions,
}

/// Trait that defines what to run when a given subcommand is invoked.
#[enum_dispatch]
pub trait RunCommand {
    async fn run(&self, config: Config) -> CliResult<()>;
}

/// Countries to process. Empty, or `all`, means every country in the configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct CountryArgs {
    #[arg(
        short = 'c',
        long,
        value_delimiter = ',',
        help = "Comma separated ISO3 codes of the countries to check, e.g. AFG,SOM"
    )]
    countries: Vec<String>,
}

/// Writes collected messages to `errors.txt` in the output directory.
fn write_errors(config: &Config, messages: &[String]) -> CliResult<Option<PathBuf>> {
    if messages.is_empty() {
        return Ok(None);
    }
    let path = config.output_path(ERRORS_FILE);
    std::fs::write(&path, messages.join("\n"))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    warn!("{} message(s) written to {}", messages.len(), path.display());
    Ok(Some(path))
}

fn report_written(path: &Path) {
    info!("Report written to {}", path.display());
}

/// The `run` command runs a selection of report generators in one go.
#[derive(Args, Debug)]
pub struct RunReportsCommand {
    #[arg(
        short = 's',
        long,
        env = "SCRAPERS_TO_RUN",
        value_delimiter = ',',
        default_value = "metadata_summary,cowboy_cods",
        help = "Comma separated report generators to run"
    )]
    scrapers: Vec<Scraper>,
    #[command(flatten)]
    country_args: CountryArgs,
}

impl RunCommand for RunReportsCommand {
    async fn run(&self, config: Config) -> CliResult<()> {
        info!("Running only scrapers: {}", self.scrapers.iter().join(","));
        if !self.country_args.countries.is_empty() {
            info!("Running countries: {}", self.country_args.countries.join(","));
        }
        let countries = &self.country_args.countries;
        let summary = CodSummary::new_with_config(config)?;
        let mut messages = vec![];
        for scraper in Scraper::iter().filter(|s| self.scrapers.contains(s)) {
            let path = match scraper {
                Scraper::MetadataSummary => summary.metadata_summary().await?,
                Scraper::CheckPopulationHeaders => {
                    summary.check_population_headers(countries).await?
                }
                Scraper::CheckBoundaryFields => summary.check_boundary_fields(countries).await?,
                Scraper::CowboyCods => {
                    messages.extend(summary.cowboy_cods().await);
                    continue;
                }
                Scraper::CountrySummary => summary.country_summary(countries).await?,
                Scraper::CountryAbSummary => {
                    summary.country_theme_summary(Theme::Ab, countries).await?
                }
                Scraper::CountryPsSummary => {
                    summary.country_theme_summary(Theme::Ps, countries).await?
                }
                Scraper::CountryEmSummary => {
                    summary.country_theme_summary(Theme::Em, countries).await?
                }
                Scraper::DatasetResourceDescriptions => {
                    summary.dataset_resource_descriptions().await?
                }
            };
            report_written(&path);
        }
        write_errors(&summary.config, &messages)?;
        Ok(())
    }
}

/// The `boundaries` command lists the p-code and name fields of each boundary layer.
#[derive(Args, Debug)]
pub struct BoundariesCommand {
    #[command(flatten)]
    country_args: CountryArgs,
}

impl RunCommand for BoundariesCommand {
    async fn run(&self, config: Config) -> CliResult<()> {
        let summary = CodSummary::new_with_config(config)?;
        let path = summary
            .check_boundary_fields(&self.country_args.countries)
            .await?;
        report_written(&path);
        Ok(())
    }
}

/// The `population` command checks the columns of each population statistics table.
#[derive(Args, Debug)]
pub struct PopulationCommand {
    #[command(flatten)]
    country_args: CountryArgs,
}

impl RunCommand for PopulationCommand {
    async fn run(&self, config: Config) -> CliResult<()> {
        let summary = CodSummary::new_with_config(config)?;
        let path = summary
            .check_population_headers(&self.country_args.countries)
            .await?;
        report_written(&path);
        Ok(())
    }
}

/// The `countries` command summarises the COD themes per country.
#[derive(Args, Debug)]
pub struct CountriesCommand {
    #[arg(
        short = 't',
        long,
        value_name = "ab|ps|em",
        help = "Summarise a single theme in detail instead of all themes together"
    )]
    theme: Option<Theme>,
    #[command(flatten)]
    country_args: CountryArgs,
}

impl RunCommand for CountriesCommand {
    async fn run(&self, config: Config) -> CliResult<()> {
        let summary = CodSummary::new_with_config(config)?;
        let countries = &self.country_args.countries;
        let path = match self.theme {
            Some(theme) if Theme::SUMMARISED.contains(&theme) => {
                summary.country_theme_summary(theme, countries).await?
            }
            Some(theme) => {
                return Err(anyhow::anyhow!("No country summary for theme {theme}").into())
            }
            None => summary.country_summary(countries).await?,
        };
        report_written(&path);
        Ok(())
    }
}

/// The `metadata` command summarises the metadata of every COD-tagged dataset.
#[derive(Args, Debug)]
pub struct MetadataCommand {}

impl RunCommand for MetadataCommand {
    async fn run(&self, config: Config) -> CliResult<()> {
        let summary = CodSummary::new_with_config(config)?;
        report_written(&summary.metadata_summary().await?);
        Ok(())
    }
}

/// The `descriptions` command lists the descriptions of standard and enhanced CODs.
#[derive(Args, Debug)]
pub struct DescriptionsCommand {}

impl RunCommand for DescriptionsCommand {
    async fn run(&self, config: Config) -> CliResult<()> {
        let summary = CodSummary::new_with_config(config)?;
        report_written(&summary.dataset_resource_descriptions().await?);
        Ok(())
    }
}

/// The `cowboy` command finds datasets tagged as CODs outside the COD process.
#[derive(Args, Debug)]
pub struct CowboyCommand {}

impl RunCommand for CowboyCommand {
    async fn run(&self, config: Config) -> CliResult<()> {
        let summary = CodSummary::new_with_config(config)?;
        let messages = summary.cowboy_cods().await;
        for message in &messages {
            println!("{message}");
        }
        write_errors(&summary.config, &messages)?;
        Ok(())
    }
}

/// The `classify` command shows how a list of column headers is classified, without touching
/// the catalog.
#[derive(Args, Debug)]
pub struct ClassifyCommand {
    #[arg(required = true, help = "Column headers, in file order")]
    headers: Vec<String>,
}

impl RunCommand for ClassifyCommand {
    async fn run(&self, config: Config) -> CliResult<()> {
        let patterns = HeaderPatterns::new(&config.language_suffixes)?;
        let classification = patterns.classify(&self.headers);
        let resolution = resolve(classification.population_headers.as_slice());
        display_classification(&self.headers, &classification, &resolution);
        Ok(())
    }
}

/// The entrypoint for the CLI.
#[derive(Parser, Debug)]
#[command(version, about="Audits the Common Operational Datasets of an HDX catalog", long_about = None, name="codsummary")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    #[arg(long, global = true, help = "Path to a TOML config file")]
    pub config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "HDX_SITE",
        value_name = "prod|stage|feature|demo|dev",
        help = "Catalog site to query"
    )]
    pub hdx_site: Option<HdxSite>,
    #[arg(long, global = true, help = "Directory to write reports into")]
    pub output_dir: Option<PathBuf>,
}

impl Cli {
    /// Applies flags and environment variables on top of the file configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(site) = self.hdx_site {
            config.hdx_site = site;
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir.clone_from(output_dir);
        }
    }
}

/// Commands contains the list of subcommands avaliable for use in the CLI.
/// Each command should implement the RunCommand trait and specify the list
/// of required args for that command.
#[derive(Subcommand, Debug)]
#[enum_dispatch(RunCommand)]
pub enum Commands {
    /// Run a selection of reports, as a scheduled run does
    Run(RunReportsCommand),
    /// Check the p-code and name fields of boundary datasets
    Boundaries(BoundariesCommand),
    /// Check the headers of population statistics tables
    Population(PopulationCommand),
    /// Summarise COD themes per country
    Countries(CountriesCommand),
    /// Summarise the metadata of COD-tagged datasets
    Metadata(MetadataCommand),
    /// List dataset and resource descriptions of standard and enhanced CODs
    Descriptions(DescriptionsCommand),
    /// Find datasets tagged as CODs without a COD level
    Cowboy(CowboyCommand),
    /// Classify column headers into p-code, name and total population roles
    Classify(ClassifyCommand),
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn scraper_should_parse_snake_case() {
        assert_eq!(
            Scraper::from_str("check_boundary_fields").unwrap(),
            Scraper::CheckBoundaryFields
        );
        assert_eq!(
            Scraper::from_str("Country_AB_Summary").unwrap(),
            Scraper::CountryAbSummary
        );
        assert_eq!(Scraper::CowboyCods.to_string(), "cowboy_cods");
        assert!(Scraper::from_str("summarise_everything").is_err());
    }

    #[test]
    fn run_defaults_to_metadata_and_cowboys() {
        let cli = Cli::parse_from(["codsummary", "run"]);
        let Some(Commands::Run(run)) = cli.command else {
            panic!("expected run command");
        };
        if std::env::var("SCRAPERS_TO_RUN").is_err() {
            assert_eq!(
                run.scrapers,
                vec![Scraper::MetadataSummary, Scraper::CowboyCods]
            );
        }
        assert!(run.country_args.countries.is_empty());
    }

    #[test]
    fn global_flags_override_config() {
        let cli = Cli::parse_from([
            "codsummary",
            "boundaries",
            "--countries",
            "SOM,ETH",
            "--hdx-site",
            "stage",
            "--output-dir",
            "reports",
        ]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.hdx_site, HdxSite::Stage);
        assert_eq!(config.output_dir, PathBuf::from("reports"));
        let Some(Commands::Boundaries(command)) = cli.command else {
            panic!("expected boundaries command");
        };
        assert_eq!(command.country_args.countries, vec!["SOM", "ETH"]);
    }

    #[test]
    fn countries_accepts_a_theme() {
        let cli = Cli::parse_from(["codsummary", "countries", "--theme", "PS"]);
        let Some(Commands::Countries(command)) = cli.command else {
            panic!("expected countries command");
        };
        assert_eq!(command.theme, Some(Theme::Ps));
        assert!(Cli::try_parse_from(["codsummary", "countries", "--theme", "xx"]).is_err());
    }

    #[test]
    fn classify_requires_headers() {
        assert!(Cli::try_parse_from(["codsummary", "classify"]).is_err());
    }

    #[tokio::test]
    async fn classify_runs_offline() {
        let command = ClassifyCommand {
            headers: vec!["ADM1_PCODE".into(), "ADM1_EN".into(), "POP_2020".into()],
        };
        assert!(command.run(Config::default()).await.is_ok());
    }

    #[test]
    fn errors_file_only_written_with_messages() {
        let output = tempfile::tempdir().unwrap();
        let config = Config {
            output_dir: output.path().to_path_buf(),
            ..Default::default()
        };
        assert!(write_errors(&config, &[]).unwrap().is_none());
        let path = write_errors(&config, &["first".into(), "second".into()])
            .unwrap()
            .unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "first\nsecond");
    }

    #[test]
    fn cli() {
        Cli::command().debug_assert();
    }
}
