use camino::Utf8PathBuf;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::api::{self, ApiResponse, Loa};
use crate::catalog::{self, ModelRun};
use crate::config::{Config, render_description};
use crate::dates::month_to_long_date;
use crate::error::ViewsError;
use crate::locations::{CountryMatcher, Location, resolve_locations};
use crate::resources::write_tabular;
use crate::retriever::Retriever;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimePeriod {
    pub start: String,
    pub end: String,
}

/// Where a dataset is filed in the catalog: a standard country entry or a
/// free-form location ("world", or Kosovo, which has no country entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum DatasetLocation {
    Country(String),
    Other(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceDescriptor {
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub source: ResourceSource,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResourceSource {
    Upload { format: String, path: String },
    Url { format: String, url: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetDescriptor {
    pub name: String,
    pub title: String,
    pub locations: Vec<DatasetLocation>,
    pub tags: Vec<String>,
    pub time_period: TimePeriod,
    pub resources: Vec<ResourceDescriptor>,
}

/// Assembles the full dataset set for the latest model run: one dataset
/// per resolved location, one codebook dataset, one global dataset.
pub struct Pipeline<R: Retriever, M: CountryMatcher> {
    config: Config,
    retriever: R,
    matcher: M,
    workdir: Utf8PathBuf,
}

impl<R: Retriever, M: CountryMatcher> Pipeline<R, M> {
    pub fn new(config: Config, retriever: R, matcher: M, workdir: Utf8PathBuf) -> Self {
        Self {
            config,
            retriever,
            matcher,
            workdir,
        }
    }

    fn forecast(&self, run_id: &str, loa: Loa, filter: &str) -> ApiResponse {
        api::fetch_forecast(&self.retriever, &self.config.base_url, run_id, loa, filter)
    }

    pub fn generate_datasets(&self) -> Result<Vec<DatasetDescriptor>, ViewsError> {
        let models = catalog::list_models(&self.retriever, &self.config.wiki_url)?;
        let Some(latest) = models.first() else {
            return Err(ViewsError::EmptyCatalog);
        };
        info!("latest run is {}", latest.run_id);

        let latest_cm = self.forecast(&latest.run_id, Loa::Cm, "");
        if latest_cm.is_empty() {
            return Err(ViewsError::EmptyData(format!(
                "country-month data for run {}",
                latest.run_id
            )));
        }
        let latest_pgm = self.forecast(&latest.run_id, Loa::Pgm, "");

        let locations = resolve_locations(&latest_cm.data, &self.matcher);
        let start = latest_cm.start_date.ok_or_else(|| {
            ViewsError::EmptyData("start_date missing from country-month response".to_string())
        })?;
        let end = latest_cm.end_date.ok_or_else(|| {
            ViewsError::EmptyData("end_date missing from country-month response".to_string())
        })?;
        let period = TimePeriod {
            start: month_to_long_date(start),
            end: month_to_long_date(end),
        };

        let mut datasets = Vec::new();
        for location in &locations {
            datasets.push(self.build_location_dataset(latest, location, &period)?);
        }
        datasets.push(self.build_codebook_dataset(latest, &period));
        datasets.push(self.build_global_dataset(latest, &latest_cm, &latest_pgm, &period)?);

        info!("assembled {} datasets", datasets.len());
        Ok(datasets)
    }

    fn build_location_dataset(
        &self,
        run: &ModelRun,
        location: &Location,
        period: &TimePeriod,
    ) -> Result<DatasetDescriptor, ViewsError> {
        let title = format!("{} - {}", location.name, self.config.title);
        let name = slug::slugify(format!("{} - {}", location.code, self.config.title));
        // Kosovo has no country entry in the catalog system.
        let dataset_location = if location.code == "XKX" {
            DatasetLocation::Other(location.name.clone())
        } else {
            DatasetLocation::Country(location.code.clone())
        };

        let filter = format!("?iso={}", location.code);
        let cm = self.forecast(&run.run_id, Loa::Cm, &filter);
        let Some(first_row) = cm.data.first() else {
            return Err(ViewsError::EmptyData(format!(
                "country-month data for {}",
                location.code
            )));
        };
        let headers = row_headers(first_row);
        let resource_name = format!("{name}-country-month.csv");
        let path = write_tabular(
            &self.workdir,
            &resource_name,
            &headers,
            &self.config.hxl_tags,
            &cm.data,
        )?;
        let mut resources = vec![ResourceDescriptor {
            name: resource_name,
            description: render_description(&self.config.description, "country", &run.codebook_url),
            source: ResourceSource::Upload {
                format: "CSV".to_string(),
                path: path.into_string(),
            },
        }];

        // A country legitimately absent from the gridded data gets no
        // second resource.
        let pgm = self.forecast(&run.run_id, Loa::Pgm, &filter);
        if !pgm.data.is_empty() {
            let rows = prefix_location(&pgm.data, location);
            let headers = row_headers(&rows[0]);
            let resource_name = format!("{name}-priogrid-month.csv");
            let path = write_tabular(
                &self.workdir,
                &resource_name,
                &headers,
                &self.config.hxl_tags,
                &rows,
            )?;
            resources.push(ResourceDescriptor {
                name: resource_name,
                description: render_description(
                    &self.config.description,
                    "prio-grid cell",
                    &run.codebook_url,
                ),
                source: ResourceSource::Upload {
                    format: "CSV".to_string(),
                    path: path.into_string(),
                },
            });
        }

        Ok(DatasetDescriptor {
            name,
            title,
            locations: vec![dataset_location],
            tags: self.config.tags.clone(),
            time_period: period.clone(),
            resources,
        })
    }

    fn build_codebook_dataset(&self, run: &ModelRun, period: &TimePeriod) -> DatasetDescriptor {
        let title = format!("Codebook - {}", self.config.title);
        let name = slug::slugify(&title);
        let resource = ResourceDescriptor {
            name: format!("{name}.json"),
            description: "Codebook containing information on model variables".to_string(),
            source: ResourceSource::Url {
                format: "JSON".to_string(),
                url: run.codebook_url.clone(),
            },
        };
        DatasetDescriptor {
            name,
            title,
            locations: vec![DatasetLocation::Other("world".to_string())],
            tags: self.config.tags.clone(),
            time_period: period.clone(),
            resources: vec![resource],
        }
    }

    fn build_global_dataset(
        &self,
        run: &ModelRun,
        cm: &ApiResponse,
        pgm: &ApiResponse,
        period: &TimePeriod,
    ) -> Result<DatasetDescriptor, ViewsError> {
        let title = self.config.title.clone();
        let name = slug::slugify(&title);

        let Some(first_cm_row) = cm.data.first() else {
            return Err(ViewsError::EmptyData(
                "country-month data for the global dataset".to_string(),
            ));
        };
        let cm_resource_name = format!("{name}-country-month.csv");
        let cm_path = write_tabular(
            &self.workdir,
            &cm_resource_name,
            &row_headers(first_cm_row),
            &self.config.hxl_tags,
            &cm.data,
        )?;

        let Some(first_pgm_row) = pgm.data.first() else {
            return Err(ViewsError::EmptyData(
                "prio-grid-month data for the global dataset".to_string(),
            ));
        };
        let pgm_resource_name = format!("{name}-priogrid-month.csv");
        let pgm_path = write_tabular(
            &self.workdir,
            &pgm_resource_name,
            &row_headers(first_pgm_row),
            &self.config.hxl_tags,
            &pgm.data,
        )?;

        Ok(DatasetDescriptor {
            name,
            title,
            locations: vec![DatasetLocation::Other("world".to_string())],
            tags: self.config.tags.clone(),
            time_period: period.clone(),
            resources: vec![
                ResourceDescriptor {
                    name: cm_resource_name,
                    description: render_description(
                        &self.config.description,
                        "country",
                        &run.codebook_url,
                    ),
                    source: ResourceSource::Upload {
                        format: "CSV".to_string(),
                        path: cm_path.into_string(),
                    },
                },
                ResourceDescriptor {
                    name: pgm_resource_name,
                    description: render_description(
                        &self.config.description_pgm,
                        "prio-grid cell",
                        &run.codebook_url,
                    ),
                    source: ResourceSource::Upload {
                        format: "CSV".to_string(),
                        path: pgm_path.into_string(),
                    },
                },
            ],
        })
    }
}

fn row_headers(row: &Map<String, Value>) -> Vec<String> {
    row.keys().cloned().collect()
}

/// Prepends the location's code and name to a gridded row. An existing
/// `isoab` or `name` key keeps its position but takes the location value,
/// matching how the country fields lead the published columns.
fn prefix_location(rows: &[Map<String, Value>], location: &Location) -> Vec<Map<String, Value>> {
    rows.iter()
        .map(|row| {
            let mut prefixed = Map::new();
            prefixed.insert("isoab".to_string(), Value::String(location.code.clone()));
            prefixed.insert("name".to_string(), Value::String(location.name.clone()));
            for (key, value) in row {
                if !prefixed.contains_key(key) {
                    prefixed.insert(key.clone(), value.clone());
                }
            }
            prefixed
        })
        .collect()
}
