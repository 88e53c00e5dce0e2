use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ViewsError {
    #[error("missing config file views-hdx.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("description template `{template}` is missing the {placeholder} placeholder")]
    TemplatePlaceholder {
        template: String,
        placeholder: String,
    },

    #[error("request failed: {0}")]
    Http(String),

    #[error("server returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("catalog page has unexpected structure: {0}")]
    CatalogFormat(String),

    #[error("catalog table is missing the {0} column")]
    CatalogColumn(String),

    #[error("catalog page lists no model runs")]
    EmptyCatalog,

    #[error("required data is empty: {0}")]
    EmptyData(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to write CSV resource: {0}")]
    Csv(String),
}
