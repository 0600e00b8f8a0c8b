//! Which p-code and name columns the boundary layers of each country carry.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{error, info};

use super::{DatasetContext, RowError, BOUNDARY_FIELDS_FILE};
use crate::catalog::{Catalog, Resource};
use crate::geo::{extract_archive, find_shapefiles, read_headers};
use crate::sink::{ReportRow, ReportWriter};
use crate::{CodSummary, COL};

const BOUNDARY_FILE_TYPES: [&str; 2] = ["shp", "geojson"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryFieldsRow {
    pub iso: String,
    pub cod_uid: Option<String>,
    pub contributor: Option<String>,
    pub error: Option<RowError>,
    pub resource_name: Option<String>,
    pub file_name: Option<String>,
    pub pcode_headers: Option<String>,
    pub name_headers: Option<String>,
}

impl BoundaryFieldsRow {
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

impl ReportRow for BoundaryFieldsRow {
    fn cells(&self) -> Vec<Option<String>> {
        vec![
            Some(self.iso.clone()),
            self.cod_uid.clone(),
            self.contributor.clone(),
            self.error.map(|e| e.to_string()),
            self.resource_name.clone(),
            self.file_name.clone(),
            self.pcode_headers.clone(),
            self.name_headers.clone(),
        ]
    }
}

/// Display name of an extracted file, relative to the directory it was found in.
fn display_name(file: &Path, root: Option<&Path>) -> String {
    root.and_then(|root| file.strip_prefix(root).ok())
        .unwrap_or(file)
        .to_string_lossy()
        .to_string()
}

impl<C: Catalog> CodSummary<C> {
    /// Writes `boundary_dataset_headers.csv`: one row per boundary layer, or per failure.
    pub async fn check_boundary_fields(&self, countries: &[String]) -> Result<PathBuf> {
        let path = self.config.output_path(BOUNDARY_FIELDS_FILE);
        let mut writer = ReportWriter::create(&path, &COL::BOUNDARY_FIELDS)?;
        for iso in self.config.resolve_countries(countries) {
            info!("Processing boundaries for {iso}");
            for dataset_name in self.config.boundary_dataset_names(&iso) {
                self.write_boundary_rows(&iso, &dataset_name, &mut writer)
                    .await?;
            }
        }
        info!("Wrote {} boundary rows to {}", writer.rows(), path.display());
        Ok(path)
    }

    async fn write_boundary_rows<W: Write>(
        &self,
        iso: &str,
        dataset_name: &str,
        writer: &mut ReportWriter<W>,
    ) -> Result<()> {
        let Some(dataset) = self.lookup(dataset_name).await else {
            return writer.append(&BoundaryFieldsRow::new(&DatasetContext::iso_only(iso)));
        };
        let context = DatasetContext::from_dataset(iso, &dataset);

        let resources = dataset.resources_of_type(&BOUNDARY_FILE_TYPES);
        if resources.is_empty() {
            error!("{iso}: could not find boundary resources in {dataset_name}");
            return writer
                .append(&BoundaryFieldsRow::new(&context).failed(RowError::NoBoundaryResource));
        }

        for resource in resources {
            let row = BoundaryFieldsRow::for_resource(&context, resource);
            let downloaded = match self.catalog.download(resource, self.temp_path()).await {
                Ok(path) => path,
                Err(err) => {
                    error!("{iso}: could not download {}: {err:#}", resource.name);
                    writer.append(&row.failed(RowError::BoundaryDownload))?;
                    continue;
                }
            };

            let (root, files) = if resource.file_type() == "shp" {
                match extract_archive(&downloaded, self.temp_path()) {
                    Ok(dir) => {
                        let files = find_shapefiles(&dir);
                        (Some(dir), files)
                    }
                    Err(err) => {
                        error!("{iso}: could not unzip {}: {err:#}", resource.name);
                        writer.append(&row.failed(RowError::BoundaryUnzip))?;
                        continue;
                    }
                }
            } else {
                (downloaded.parent().map(Path::to_path_buf), vec![downloaded])
            };

            if files.is_empty() {
                error!("{iso}: no shapefile in {}", resource.name);
                writer.append(&row.failed(RowError::NoShapefileInZip))?;
                continue;
            }

            for file in files {
                let file_row = BoundaryFieldsRow {
                    file_name: Some(display_name(&file, root.as_deref())),
                    ..row.clone()
                };
                let headers = match read_headers(&file) {
                    Ok(headers) => headers,
                    Err(err) => {
                        error!("{iso}: could not open {}: {err:#}", file.display());
                        writer.append(&file_row.failed(RowError::UnreadableFile))?;
                        continue;
                    }
                };
                let classification = self.patterns().classify_fields(&headers);
                writer.append(&BoundaryFieldsRow {
                    pcode_headers: classification.pcode_headers.joined(),
                    name_headers: classification.name_headers.joined(),
                    ..file_row
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fake::{dataset, resource, FakeCatalog};
    use crate::config::Config;
    use crate::geo::fixtures::zipped_shapefiles;

    fn summary(catalog: FakeCatalog, output: &Path) -> CodSummary<FakeCatalog> {
        let config = Config {
            output_dir: output.to_path_buf(),
            ..Default::default()
        };
        CodSummary::with_catalog(config, catalog).unwrap()
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        assert_eq!(reader.headers().unwrap(), &COL::BOUNDARY_FIELDS[..]);
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[tokio::test]
    async fn missing_dataset_gives_iso_only_row() {
        let output = tempfile::tempdir().unwrap();
        let summary = summary(FakeCatalog::default(), output.path());
        let path = summary
            .check_boundary_fields(&["xyz".to_string()])
            .await
            .unwrap();
        assert_eq!(
            read_rows(&path),
            vec![vec!["XYZ", "", "", "", "", "", "", ""]]
        );
    }

    #[tokio::test]
    async fn shapefiles_and_failures_each_get_a_row() {
        let zipped = zipped_shapefiles(&[
            ("som_adm1", &["ADM1_PCODE", "ADM1_EN", "ADM1_SO", "ADM0_EN", "Shape_Leng"]),
            ("lines/som_admbndl", &["Shape_Leng", "ADM0_PCODE"]),
        ]);
        let catalog = FakeCatalog::default()
            .with_dataset(dataset(
                "cod-ab-som",
                "OCHA Somalia",
                vec![
                    resource("som_adm_shp.zip", "SHP", "https://files.test/som_adm_shp.zip"),
                    resource("som_adm.geojson", "GeoJSON", "https://files.test/missing.geojson"),
                    resource("broken.zip", "SHP", "https://files.test/broken.zip"),
                    resource("som_gazetteer.xlsx", "XLSX", "https://files.test/gaz.xlsx"),
                ],
            ))
            .with_file("https://files.test/som_adm_shp.zip", zipped)
            .with_file("https://files.test/broken.zip", "not a zip");
        let output = tempfile::tempdir().unwrap();
        let summary = summary(catalog, output.path());
        let rows = read_rows(
            &summary
                .check_boundary_fields(&["SOM".to_string()])
                .await
                .unwrap(),
        );

        let expected: Vec<Vec<&str>> = vec![
            vec![
                "SOM",
                "cod-ab-som",
                "OCHA Somalia",
                "",
                "som_adm_shp.zip",
                "lines/som_admbndl.shp",
                "ADM0_PCODE",
                "",
            ],
            vec![
                "SOM",
                "cod-ab-som",
                "OCHA Somalia",
                "",
                "som_adm_shp.zip",
                "som_adm1.shp",
                "ADM1_PCODE",
                "ADM1_EN, ADM0_EN",
            ],
            vec![
                "SOM",
                "cod-ab-som",
                "OCHA Somalia",
                "Could not download boundary resource",
                "som_adm.geojson",
                "",
                "",
                "",
            ],
            vec![
                "SOM",
                "cod-ab-som",
                "OCHA Somalia",
                "Could not unzip boundary resource",
                "broken.zip",
                "",
                "",
                "",
            ],
        ];
        assert_eq!(rows, expected);
    }

    #[tokio::test]
    async fn dataset_without_boundary_resources() {
        let catalog = FakeCatalog::default().with_dataset(dataset(
            "cod-ab-eth",
            "OCHA Ethiopia",
            vec![resource("eth_gaz.xlsx", "XLSX", "https://files.test/eth_gaz.xlsx")],
        ));
        let output = tempfile::tempdir().unwrap();
        let summary = summary(catalog, output.path());
        let rows = read_rows(
            &summary
                .check_boundary_fields(&["ETH".to_string()])
                .await
                .unwrap(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], "cod-ab-eth");
        assert_eq!(rows[0][3], "Could not find shp or json boundary resource");
    }

    #[tokio::test]
    async fn empty_zip_and_unreadable_layer() {
        let catalog = FakeCatalog::default()
            .with_dataset(dataset(
                "cod-ab-yem",
                "OCHA Yemen",
                vec![
                    resource("empty.zip", "SHP", "https://files.test/empty.zip"),
                    resource("yem.geojson", "geojson", "https://files.test/yem.geojson"),
                ],
            ))
            .with_file("https://files.test/empty.zip", zipped_shapefiles(&[]))
            .with_file("https://files.test/yem.geojson", "{ not json");
        let output = tempfile::tempdir().unwrap();
        let summary = summary(catalog, output.path());
        let rows = read_rows(
            &summary
                .check_boundary_fields(&["YEM".to_string()])
                .await
                .unwrap(),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][3], "Could not find shp in zip");
        assert_eq!(rows[0][5], "");
        assert_eq!(rows[1][3], "Could not read file");
        assert_eq!(rows[1][4], "yem.geojson");
        assert_eq!(rows[1][5], "yem.geojson");
    }

    #[tokio::test]
    async fn dataset_exceptions_replace_default_name() {
        let catalog = FakeCatalog::default().with_dataset(dataset(
            "cod-ab-ben-2019",
            "OCHA Benin",
            vec![],
        ));
        let output = tempfile::tempdir().unwrap();
        let mut config = Config {
            output_dir: output.path().to_path_buf(),
            ..Default::default()
        };
        config.boundary_dataset_exceptions.insert(
            "BEN".into(),
            vec!["cod-ab-ben-2019".into(), "cod-ab-ben-old".into()],
        );
        let summary = CodSummary::with_catalog(config, catalog).unwrap();
        let rows = read_rows(
            &summary
                .check_boundary_fields(&["BEN".to_string()])
                .await
                .unwrap(),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], "cod-ab-ben-2019");
        assert_eq!(rows[1], vec!["BEN", "", "", "", "", "", "", ""]);
    }
}
