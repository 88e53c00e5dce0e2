use std::collections::HashMap;

use scraper::{ElementRef, Html, Selector};

use crate::error::ViewsError;
use crate::retriever::Retriever;

const RUN_ID_COLUMN: &str = "Dataset";
const CODEBOOK_COLUMN: &str = "Codebook";
const MODEL_NAME_COLUMN: &str = "Model name";
const MODEL_VERSION_COLUMN: &str = "Model version";
const LAST_INPUT_COLUMN: &str = "Last input data";
const FORECAST_WINDOW_COLUMN: &str = "Forecasting window";
const RELEASE_DATE_COLUMN: &str = "Release date";

/// One published model run parsed from a catalog table row. Rows keep the
/// document order of the page, which lists the newest run first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRun {
    pub run_id: String,
    pub model_name: String,
    pub model_version: String,
    pub last_input_period: String,
    pub forecast_window: String,
    pub release_date: String,
    pub codebook_url: String,
}

/// Downloads the catalog wiki page and parses it into the run list.
pub fn list_models(
    retriever: &dyn Retriever,
    wiki_url: &str,
) -> Result<Vec<ModelRun>, ViewsError> {
    let html = retriever.download_text(wiki_url, "wiki")?;
    parse_models_table(&html)
}

/// Parses the catalog page. The page carries several `role="table"`
/// elements; the first is decorative and the second holds the run list.
pub fn parse_models_table(html: &str) -> Result<Vec<ModelRun>, ViewsError> {
    let document = Html::parse_document(html);
    let table_selector = selector("table[role=\"table\"]")?;
    let row_selector = selector("tr")?;
    let header_selector = selector("th")?;
    let cell_selector = selector("td")?;
    let link_selector = selector("a")?;

    let tables: Vec<_> = document.select(&table_selector).collect();
    if tables.len() < 2 {
        return Err(ViewsError::CatalogFormat(
            "fewer than two tables with role=\"table\" found on the page".to_string(),
        ));
    }
    let table = tables[1];

    let rows: Vec<_> = table.select(&row_selector).collect();
    let Some(header_row) = rows.first() else {
        return Err(ViewsError::CatalogFormat(
            "model run table has no rows".to_string(),
        ));
    };
    let headers: Vec<String> = header_row
        .select(&header_selector)
        .map(|th| collect_text(th))
        .collect();

    let mut models = Vec::new();
    for row in &rows[1..] {
        let mut columns = HashMap::new();
        for (index, cell) in row.select(&cell_selector).enumerate() {
            let Some(header) = headers.get(index) else {
                break;
            };
            let value = match cell
                .select(&link_selector)
                .next()
                .and_then(|a| a.value().attr("href"))
            {
                Some(href) => href.to_string(),
                None => collect_text(cell),
            };
            columns.insert(header.clone(), value);
        }
        if columns.is_empty() {
            continue;
        }
        models.push(model_from_columns(&columns)?);
    }

    Ok(models)
}

fn model_from_columns(columns: &HashMap<String, String>) -> Result<ModelRun, ViewsError> {
    Ok(ModelRun {
        run_id: required_column(columns, RUN_ID_COLUMN)?,
        model_name: optional_column(columns, MODEL_NAME_COLUMN),
        model_version: optional_column(columns, MODEL_VERSION_COLUMN),
        last_input_period: optional_column(columns, LAST_INPUT_COLUMN),
        forecast_window: optional_column(columns, FORECAST_WINDOW_COLUMN),
        release_date: optional_column(columns, RELEASE_DATE_COLUMN),
        codebook_url: required_column(columns, CODEBOOK_COLUMN)?,
    })
}

fn required_column(columns: &HashMap<String, String>, name: &str) -> Result<String, ViewsError> {
    columns
        .get(name)
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or_else(|| ViewsError::CatalogColumn(name.to_string()))
}

fn optional_column(columns: &HashMap<String, String>, name: &str) -> String {
    columns.get(name).cloned().unwrap_or_default()
}

fn collect_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn selector(css: &str) -> Result<Selector, ViewsError> {
    Selector::parse(css).map_err(|err| ViewsError::CatalogFormat(err.to_string()))
}
