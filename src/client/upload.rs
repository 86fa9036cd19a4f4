use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no files to upload")]
    NoFiles,
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("network error: {0}")]
    Network(String),
    #[error("upload rejected ({0}): {1}")]
    Api(u16, String),
}

/// Client for the bulk spreadsheet upload endpoint
#[derive(Debug, Clone)]
pub struct UploadClient {
    http: Client,
    url: String,
}

impl UploadClient {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    /// Send every file as a `file` part of one multipart request.
    /// Returns the number of files sent.
    pub async fn upload(&self, paths: &[PathBuf]) -> Result<usize, UploadError> {
        if paths.is_empty() {
            return Err(UploadError::NoFiles);
        }

        let mut form = Form::new();
        for path in paths {
            form = form.part("file", file_part(path).await?);
        }

        let resp = self
            .http
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(UploadError::Api(
                resp.status().as_u16(),
                resp.text().await.unwrap_or_default(),
            ));
        }

        tracing::info!("Uploaded {} files to {}", paths.len(), self.url);
        Ok(paths.len())
    }
}

async fn file_part(path: &Path) -> Result<Part, UploadError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| UploadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("text/csv")
        .map_err(|e| UploadError::Network(e.to_string()))
}
