use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::datasets::DatasetDescriptor;
use crate::error::ViewsError;

/// Catalog-publishing seam. The live HDX upload client implements this
/// outside this crate; tests and dry runs inject their own.
pub trait Publisher {
    fn publish(&self, dataset: &DatasetDescriptor) -> Result<(), ViewsError>;
}

/// Writes each descriptor as pretty-printed JSON into an output directory,
/// giving a run a concrete, diffable artifact per dataset.
pub struct JsonPublisher {
    out_dir: Utf8PathBuf,
}

impl JsonPublisher {
    pub fn new(out_dir: Utf8PathBuf) -> Self {
        Self { out_dir }
    }

    fn descriptor_path(&self, dataset: &DatasetDescriptor) -> Utf8PathBuf {
        self.out_dir.join(format!("{}.json", dataset.name))
    }
}

impl Publisher for JsonPublisher {
    fn publish(&self, dataset: &DatasetDescriptor) -> Result<(), ViewsError> {
        let path = self.descriptor_path(dataset);
        let content = serde_json::to_vec_pretty(dataset)
            .map_err(|err| ViewsError::Filesystem(err.to_string()))?;
        write_bytes_atomic(&path, &content)?;
        info!("published descriptor {}", path);
        Ok(())
    }
}

fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), ViewsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| ViewsError::Filesystem(err.to_string()))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(tmp_path.as_std_path(), content)
        .map_err(|err| ViewsError::Filesystem(err.to_string()))?;
    fs::rename(tmp_path.as_std_path(), path.as_std_path())
        .map_err(|err| ViewsError::Filesystem(err.to_string()))?;
    Ok(())
}
