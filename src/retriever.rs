use std::fs;
use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::error::ViewsError;

/// Download collaborator used by the pipeline. Implementations may serve
/// snapshots from disk instead of the network; `filename` is the snapshot
/// key for one logical response.
pub trait Retriever: Send + Sync {
    fn download_text(&self, url: &str, filename: &str) -> Result<String, ViewsError>;
    fn download_json(&self, url: &str, filename: &str) -> Result<Value, ViewsError>;
}

#[derive(Clone)]
pub struct HttpRetriever {
    client: Client,
    saved_dir: Option<Utf8PathBuf>,
    save: bool,
    use_saved: bool,
}

impl HttpRetriever {
    pub fn new(
        saved_dir: Option<Utf8PathBuf>,
        save: bool,
        use_saved: bool,
    ) -> Result<Self, ViewsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("views-hdx/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ViewsError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| ViewsError::Http(err.to_string()))?;
        Ok(Self {
            client,
            saved_dir,
            save,
            use_saved,
        })
    }

    fn saved_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        self.saved_dir.as_ref().map(|dir| dir.join(filename))
    }

    fn read_saved(&self, filename: &str) -> Option<Result<String, ViewsError>> {
        if !self.use_saved {
            return None;
        }
        let path = self.saved_path(filename)?;
        if !path.as_std_path().exists() {
            return None;
        }
        debug!("serving {filename} from saved snapshot");
        Some(
            fs::read_to_string(path.as_std_path())
                .map_err(|err| ViewsError::Filesystem(err.to_string())),
        )
    }

    fn write_saved(&self, filename: &str, content: &str) -> Result<(), ViewsError> {
        let Some(path) = self.saved_path(filename) else {
            return Ok(());
        };
        write_text_atomic(&path, content)
    }

    fn fetch_text(&self, url: &str) -> Result<String, ViewsError> {
        let response = self.send_with_retries(|| self.client.get(url))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "request failed".to_string());
            return Err(ViewsError::Status { status, message });
        }
        response.text().map_err(|err| ViewsError::Http(err.to_string()))
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, ViewsError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(ViewsError::Http(err.to_string()));
                }
            }
        }
    }
}

impl Retriever for HttpRetriever {
    fn download_text(&self, url: &str, filename: &str) -> Result<String, ViewsError> {
        if let Some(saved) = self.read_saved(filename) {
            return saved;
        }
        let text = self.fetch_text(url)?;
        if self.save {
            self.write_saved(filename, &text)?;
        }
        Ok(text)
    }

    fn download_json(&self, url: &str, filename: &str) -> Result<Value, ViewsError> {
        let text = self.download_text(url, filename)?;
        serde_json::from_str(&text).map_err(|err| ViewsError::Http(err.to_string()))
    }
}

fn write_text_atomic(path: &Utf8Path, content: &str) -> Result<(), ViewsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| ViewsError::Filesystem(err.to_string()))?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(tmp_path.as_std_path(), content)
        .map_err(|err| ViewsError::Filesystem(err.to_string()))?;
    fs::rename(tmp_path.as_std_path(), path.as_std_path())
        .map_err(|err| ViewsError::Filesystem(err.to_string()))?;
    Ok(())
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
