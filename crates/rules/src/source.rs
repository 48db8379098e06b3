//! Rule document sources: where chain bytes come from.
//!
//! The fetch transport is deliberately behind a trait so the engine core
//! never depends on a specific transport. File and HTTP sources cover the
//! deployed configurations; tests use the file source.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::SourceError;

/// Fetches the raw rule document from a configured locator.
#[async_trait]
pub trait RuleSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>, SourceError>;

    /// The source locator, for logs and errors.
    fn locator(&self) -> String;
}

/// Filesystem-backed rule source.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl RuleSource for FileSource {
    async fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })
    }

    fn locator(&self) -> String {
        self.path.display().to_string()
    }
}

/// HTTP(S)-backed rule source.
#[derive(Debug, Clone)]
pub struct HttpSource {
    uri: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RuleSource for HttpSource {
    async fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        let http_err = |source| SourceError::Http {
            uri: self.uri.clone(),
            source,
        };
        let response = self
            .client
            .get(&self.uri)
            .send()
            .await
            .map_err(http_err)?
            .error_for_status()
            .map_err(http_err)?;
        let bytes = response.bytes().await.map_err(http_err)?;
        Ok(bytes.to_vec())
    }

    fn locator(&self) -> String {
        self.uri.clone()
    }
}

/// Build a source from a locator string: `http(s)://` URIs go to the HTTP
/// source, `file://` URIs and bare paths to the file source.
pub fn source_for_locator(locator: &str) -> Box<dyn RuleSource> {
    if locator.starts_with("http://") || locator.starts_with("https://") {
        Box::new(HttpSource::new(locator))
    } else {
        let path = locator.strip_prefix("file://").unwrap_or(locator);
        Box::new(FileSource::new(path))
    }
}

// ── Tests ───────────────────────────────────────────────────────────
