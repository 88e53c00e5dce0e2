use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ViewsError;

pub const ANALYSIS_PLACEHOLDER: &str = "{analysis}";
pub const CODEBOOK_PLACEHOLDER: &str = "{codebook_url}";

/// Project configuration for one scraper run.
///
/// The description templates carry named placeholders (`{analysis}` and
/// `{codebook_url}`) that are substituted when resources are built; both
/// must be present or the config is rejected at load time.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub wiki_url: String,
    pub base_url: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub description: String,
    pub description_pgm: String,
    #[serde(default)]
    pub hxl_tags: BTreeMap<String, String>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<Config, ViewsError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("views-hdx.json"),
        };

        if path.is_none() && !config_path.exists() {
            return Err(ViewsError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ViewsError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ViewsError::ConfigParse(err.to_string()))?;

        Self::validate(config)
    }

    pub fn validate(config: Config) -> Result<Config, ViewsError> {
        validate_template("description", &config.description)?;
        validate_template("description_pgm", &config.description_pgm)?;
        Ok(config)
    }
}

fn validate_template(name: &str, template: &str) -> Result<(), ViewsError> {
    for placeholder in [ANALYSIS_PLACEHOLDER, CODEBOOK_PLACEHOLDER] {
        if !template.contains(placeholder) {
            return Err(ViewsError::TemplatePlaceholder {
                template: name.to_string(),
                placeholder: placeholder.to_string(),
            });
        }
    }
    Ok(())
}

/// Fills a description template with the level-of-analysis noun and the
/// run's codebook link.
pub fn render_description(template: &str, analysis: &str, codebook_url: &str) -> String {
    template
        .replace(ANALYSIS_PLACEHOLDER, analysis)
        .replace(CODEBOOK_PLACEHOLDER, codebook_url)
}
