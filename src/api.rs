use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::error;

use crate::retriever::Retriever;

/// Level of analysis exposed by the forecast API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loa {
    /// Country-month.
    Cm,
    /// PRIO-grid-cell-month.
    Pgm,
}

impl fmt::Display for Loa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loa::Cm => write!(f, "cm"),
            Loa::Pgm => write!(f, "pgm"),
        }
    }
}

/// One decoded API response. `start_date` and `end_date` are VIEWS month
/// indices and only present on whole-world calls; rows keep the key order
/// of the JSON body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
    #[serde(default)]
    pub start_date: Option<i64>,
    #[serde(default)]
    pub end_date: Option<i64>,
}

impl ApiResponse {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub fn forecast_url(base_url: &str, run_id: &str, loa: Loa, filter: &str) -> String {
    format!("{base_url}{run_id}/{loa}{filter}")
}

/// Fetches one forecast slice. Download or decode failures are logged and
/// degraded to the empty response; callers must treat missing rows as
/// "no data for this call".
pub fn fetch_forecast(
    retriever: &dyn Retriever,
    base_url: &str,
    run_id: &str,
    loa: Loa,
    filter: &str,
) -> ApiResponse {
    let url = forecast_url(base_url, run_id, loa, filter);
    let filename = snapshot_filename(run_id, loa, filter);
    let body = match retriever.download_json(&url, &filename) {
        Ok(body) => body,
        Err(err) => {
            error!("could not get data from {url}: {err}");
            return ApiResponse::default();
        }
    };
    match serde_json::from_value(body) {
        Ok(response) => response,
        Err(err) => {
            error!("could not decode data from {url}: {err}");
            ApiResponse::default()
        }
    }
}

fn snapshot_filename(run_id: &str, loa: Loa, filter: &str) -> String {
    let suffix = if filter.is_empty() {
        String::new()
    } else {
        format!(
            "-{}",
            filter
                .trim_start_matches('?')
                .replace(['=', '&'], "-")
                .to_lowercase()
        )
    };
    format!("{}-{loa}{suffix}.json", run_id.replace('_', "-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewsError;

    struct FailingRetriever;

    impl Retriever for FailingRetriever {
        fn download_text(&self, _url: &str, _filename: &str) -> Result<String, ViewsError> {
            Err(ViewsError::Http("connection refused".to_string()))
        }

        fn download_json(&self, _url: &str, _filename: &str) -> Result<Value, ViewsError> {
            Err(ViewsError::Http("connection refused".to_string()))
        }
    }

    struct StaticRetriever(&'static str);

    impl Retriever for StaticRetriever {
        fn download_text(&self, _url: &str, _filename: &str) -> Result<String, ViewsError> {
            Ok(self.0.to_string())
        }

        fn download_json(&self, _url: &str, _filename: &str) -> Result<Value, ViewsError> {
            serde_json::from_str(self.0).map_err(|err| ViewsError::Http(err.to_string()))
        }
    }

    #[test]
    fn url_shape() {
        assert_eq!(
            forecast_url(
                "https://api.example.org/",
                "fatalities002_2025_01_t01",
                Loa::Cm,
                "?iso=AFG"
            ),
            "https://api.example.org/fatalities002_2025_01_t01/cm?iso=AFG"
        );
    }

    #[test]
    fn snapshot_filenames_distinguish_filters() {
        let unfiltered = snapshot_filename("fatalities002_2025_01_t01", Loa::Pgm, "");
        let filtered = snapshot_filename("fatalities002_2025_01_t01", Loa::Pgm, "?iso=AFG");
        assert_eq!(unfiltered, "fatalities002-2025-01-t01-pgm.json");
        assert_eq!(filtered, "fatalities002-2025-01-t01-pgm-iso-afg.json");
    }

    #[test]
    fn fetch_failure_degrades_to_empty() {
        let response = fetch_forecast(&FailingRetriever, "https://api/", "run", Loa::Cm, "");
        assert!(response.is_empty());
        assert_eq!(response.start_date, None);
    }

    #[test]
    fn decodes_rows_and_bounds() {
        let retriever = StaticRetriever(
            r#"{"data":[{"name":"Afghanistan","month_id":542}],"start_date":542,"end_date":577}"#,
        );
        let response = fetch_forecast(&retriever, "https://api/", "run", Loa::Cm, "");
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.start_date, Some(542));
        assert_eq!(response.end_date, Some(577));
        assert_eq!(
            response.data[0].get("name").and_then(Value::as_str),
            Some("Afghanistan")
        );
    }
}
