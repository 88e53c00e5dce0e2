use assert_matches::assert_matches;

use views_hdx_scraper::config::ConfigLoader;
use views_hdx_scraper::error::ViewsError;

const CONFIG_JSON: &str = r##"{
    "wiki_url": "https://github.com/prio-data/views_api/wiki/Available-datasets",
    "base_url": "https://api.viewsforecasting.org/",
    "title": "VIEWS conflict forecasts",
    "tags": ["conflict-violence", "forecasting"],
    "description": "Predictions per {analysis}. See the [codebook]({codebook_url}).",
    "description_pgm": "Gridded predictions per {analysis}. See {codebook_url}.",
    "hxl_tags": {
        "name": "#country+name",
        "month_id": "#date+month"
    }
}"##;

#[test]
fn resolves_config_from_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("views-hdx.json");
    std::fs::write(&path, CONFIG_JSON).unwrap();

    let config = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap();
    assert_eq!(config.base_url, "https://api.viewsforecasting.org/");
    assert_eq!(config.tags.len(), 2);
    assert_eq!(
        config.hxl_tags.get("month_id").map(String::as_str),
        Some("#date+month")
    );
}

#[test]
fn rejects_template_without_placeholders() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("views-hdx.json");
    let broken = CONFIG_JSON.replace("{analysis}", "(analysis)");
    std::fs::write(&path, broken).unwrap();

    let err = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap_err();
    assert_matches!(err, ViewsError::TemplatePlaceholder { .. });
}

#[test]
fn missing_explicit_path_is_a_read_error() {
    let err = ConfigLoader::resolve(Some("/nonexistent/views-hdx.json")).unwrap_err();
    assert_matches!(err, ViewsError::ConfigRead(_));
}
