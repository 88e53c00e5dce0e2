use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};

use crate::error::ViewsError;

/// Writes one tabular resource as CSV: header row, HXL tag row, then data
/// rows in input order. Columns without a configured HXL tag get an empty
/// cell in the tag row. The file lands atomically at `folder/filename`.
pub fn write_tabular(
    folder: &Utf8Path,
    filename: &str,
    headers: &[String],
    hxl_tags: &BTreeMap<String, String>,
    rows: &[Map<String, Value>],
) -> Result<Utf8PathBuf, ViewsError> {
    fs::create_dir_all(folder.as_std_path())
        .map_err(|err| ViewsError::Filesystem(err.to_string()))?;
    let temp = tempfile::Builder::new()
        .prefix("views-hdx-resource")
        .tempfile_in(folder.as_std_path())
        .map_err(|err| ViewsError::Filesystem(err.to_string()))?;

    let mut writer = csv::Writer::from_writer(temp);
    writer
        .write_record(headers)
        .map_err(|err| ViewsError::Csv(err.to_string()))?;
    let tag_row: Vec<&str> = headers
        .iter()
        .map(|header| hxl_tags.get(header).map(String::as_str).unwrap_or(""))
        .collect();
    writer
        .write_record(&tag_row)
        .map_err(|err| ViewsError::Csv(err.to_string()))?;
    for row in rows {
        let record: Vec<String> = headers
            .iter()
            .map(|header| value_to_cell(row.get(header)))
            .collect();
        writer
            .write_record(&record)
            .map_err(|err| ViewsError::Csv(err.to_string()))?;
    }

    let temp = writer
        .into_inner()
        .map_err(|err| ViewsError::Csv(err.to_string()))?;
    let destination = folder.join(filename);
    temp.persist(destination.as_std_path())
        .map_err(|err| ViewsError::Filesystem(err.to_string()))?;
    Ok(destination)
}

fn value_to_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(entries: &[(&str, Value)]) -> Map<String, Value> {
        entries
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn writes_header_hxl_and_data_rows() {
        let temp = tempfile::tempdir().unwrap();
        let folder = Utf8Path::from_path(temp.path()).unwrap();
        let headers = vec![
            "name".to_string(),
            "month_id".to_string(),
            "main_mean".to_string(),
        ];
        let mut hxl_tags = BTreeMap::new();
        hxl_tags.insert("name".to_string(), "#country+name".to_string());
        hxl_tags.insert("month_id".to_string(), "#date+month".to_string());
        let rows = vec![
            row(&[
                ("name", Value::from("Afghanistan")),
                ("month_id", Value::from(542)),
                ("main_mean", Value::from(12.5)),
            ]),
            row(&[
                ("name", Value::from("Albania")),
                ("month_id", Value::from(542)),
                ("main_mean", Value::Null),
            ]),
        ];

        let path = write_tabular(folder, "out.csv", &headers, &hxl_tags, &rows).unwrap();
        let content = fs::read_to_string(path.as_std_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "name,month_id,main_mean");
        assert_eq!(lines[1], "#country+name,#date+month,");
        assert_eq!(lines[2], "Afghanistan,542,12.5");
        assert_eq!(lines[3], "Albania,542,");
    }

    #[test]
    fn missing_columns_render_as_empty_cells() {
        let temp = tempfile::tempdir().unwrap();
        let folder = Utf8Path::from_path(temp.path()).unwrap();
        let headers = vec!["a".to_string(), "b".to_string()];
        let rows = vec![row(&[("a", Value::from(1))])];

        let path = write_tabular(folder, "sparse.csv", &headers, &BTreeMap::new(), &rows).unwrap();
        let content = fs::read_to_string(path.as_std_path()).unwrap();
        assert_eq!(content.lines().nth(2).unwrap(), "1,");
    }
}
