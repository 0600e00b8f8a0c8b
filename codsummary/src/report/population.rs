//! Column checks for the population statistics tables of each country.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use log::{error, info, warn};

use super::{DatasetContext, RowError, Theme, POPULATION_HEADERS_FILE};
use crate::catalog::{Catalog, Resource};
use crate::resolve::resolve;
use crate::sink::{ReportRow, ReportWriter};
use crate::tabular::{duplicates, CsvTable};
use crate::{CodSummary, COL};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationHeadersRow {
    pub iso: String,
    pub cod_uid: Option<String>,
    pub contributor: Option<String>,
    pub error: Option<RowError>,
    pub resource_name: Option<String>,
    pub pcode_headers: Option<String>,
    pub name_headers: Option<String>,
    pub total_pop_header: Option<String>,
    pub duplicates: Option<String>,
    pub blanks: Option<String>,
}

impl PopulationHeadersRow {
    fn new(context: &DatasetContext) -> Self {
        Self {
            iso: context.iso.clone(),
            cod_uid: context.cod_uid.clone(),
            contributor: context.contributor.clone(),
            ..Default::default()
        }
    }

    fn for_resource(context: &DatasetContext, resource: &Resource) -> Self {
        Self {
            resource_name: Some(resource.name.clone()),
            ..Self::new(context)
        }
    }

    fn failed(self, error: RowError) -> Self {
        Self {
            error: Some(error),
            ..self
        }
    }
}

impl ReportRow for PopulationHeadersRow {
    fn cells(&self) -> Vec<Option<String>> {
        vec![
            Some(self.iso.clone()),
            self.cod_uid.clone(),
            self.contributor.clone(),
            self.error.map(|e| e.to_string()),
            self.resource_name.clone(),
            self.pcode_headers.clone(),
            self.name_headers.clone(),
            self.total_pop_header.clone(),
            self.duplicates.clone(),
            self.blanks.clone(),
        ]
    }
}

impl<C: Catalog> CodSummary<C> {
    /// Writes `population_dataset_headers.csv`: one row per CSV resource, or per failure.
    pub async fn check_population_headers(&self, countries: &[String]) -> Result<PathBuf> {
        info!("Summarizing population headers");
        let path = self.config.output_path(POPULATION_HEADERS_FILE);
        let mut writer = ReportWriter::create(&path, &COL::POPULATION_HEADERS)?;
        for iso in self.config.resolve_countries(countries) {
            self.write_population_rows(&iso, &mut writer).await?;
        }
        info!("Wrote {} population rows to {}", writer.rows(), path.display());
        Ok(path)
    }

    async fn write_population_rows<W: Write>(
        &self,
        iso: &str,
        writer: &mut ReportWriter<W>,
    ) -> Result<()> {
        let dataset_name = Theme::Ps.dataset_name(iso);
        let Some(dataset) = self.lookup(&dataset_name).await else {
            return writer.append(&PopulationHeadersRow::new(&DatasetContext::iso_only(iso)));
        };
        let context = DatasetContext::from_dataset(iso, &dataset);

        let resources = dataset.resources_of_type(&["csv"]);
        if resources.is_empty() {
            warn!("{iso}: no csv resources found");
            return writer
                .append(&PopulationHeadersRow::new(&context).failed(RowError::NoCsvResource));
        }

        for resource in resources {
            let row = self.population_row(&context, resource).await;
            writer.append(&row)?;
        }
        Ok(())
    }

    async fn population_row(
        &self,
        context: &DatasetContext,
        resource: &Resource,
    ) -> PopulationHeadersRow {
        let iso = &context.iso;
        let row = PopulationHeadersRow::for_resource(context, resource);
        let table = match self.catalog.download(resource, self.temp_path()).await {
            Ok(path) => CsvTable::open(&path),
            Err(err) => Err(err),
        };
        let table = match table {
            Ok(table) if !table.headers.is_empty() => table,
            Ok(_) => {
                error!("{iso}: resource {} has no headers", resource.name);
                return row.failed(RowError::UnreadableResource);
            }
            Err(err) => {
                error!("{iso}: could not read resource {}: {err:#}", resource.name);
                return row.failed(RowError::UnreadableResource);
            }
        };

        let classification = self.patterns().classify(&table.headers);
        let resolution = resolve(classification.population_headers.as_slice());
        if resolution.is_undecidable() {
            info!("{iso}: not sure which header to pick - {resolution}");
        }
        let row = PopulationHeadersRow {
            pcode_headers: classification.pcode_headers.joined(),
            name_headers: classification.name_headers.joined(),
            total_pop_header: resolution.cell(),
            duplicates: duplicates(&table.headers).joined(),
            ..row
        };

        match table.blank_columns() {
            Ok(blanks) => PopulationHeadersRow {
                blanks: blanks.joined(),
                ..row
            },
            Err(err) => {
                error!("{iso}: could not read resource {}: {err:#}", resource.name);
                row.failed(RowError::UnreadableResource)
            }
        }
    }
}
