//! # HTTP Blob Store
//!
//! Talks to an Azure-style blob container over plain HTTPS:
//!
//! - `GET  {base_url}/{container}/{path}` reads a blob
//! - `PUT  {base_url}/{container}/{path}` writes a block blob
//! - `HEAD {base_url}/{container}/{path}` checks existence
//! - `GET  {base_url}/{container}?restype=container&comp=list&prefix=..` lists
//!
//! Authentication is an optional pre-signed query token (SAS style)
//! appended to every URL. Credential acquisition is the caller's concern.
//! Path segments and the list prefix are percent-encoded.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode, Url};

use super::backend::{validate_path, BlobStore};
use super::errors::{BlobError, BlobResult};

/// Blob store reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    base_url: String,
    container: String,
    token: Option<String>,
    client: Client,
}

impl HttpBlobStore {
    /// Create a store for `container` under `base_url`
    pub fn new(
        base_url: impl Into<String>,
        container: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> BlobResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BlobError::Io(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            container: container.into().trim_matches('/').to_string(),
            token: token.map(|t| t.trim_start_matches('?').to_string()),
            client,
        })
    }

    fn container_url(&self) -> BlobResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| BlobError::Io(format!("invalid base URL '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| BlobError::Io(format!("base URL '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(self.container.split('/'));
        Ok(url)
    }

    fn blob_url(&self, path: &str) -> BlobResult<String> {
        validate_path(path)?;
        let mut url = self.container_url()?;
        url.path_segments_mut()
            .map_err(|_| BlobError::Io(format!("base URL '{}' cannot carry a path", self.base_url)))?
            .extend(path.trim_start_matches('/').split('/'));
        url.set_query(self.token.as_deref());
        Ok(url.into())
    }

    fn list_url(&self, prefix: &str) -> BlobResult<String> {
        let mut url = self.container_url()?;
        url.query_pairs_mut()
            .append_pair("restype", "container")
            .append_pair("comp", "list")
            .append_pair("prefix", prefix.trim_start_matches('/'));
        if let Some(token) = &self.token {
            let query = format!("{}&{}", url.query().unwrap_or_default(), token);
            url.set_query(Some(&query));
        }
        Ok(url.into())
    }
}

fn map_transport(e: reqwest::Error) -> BlobError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        BlobError::Transient(e.to_string())
    } else {
        BlobError::Io(e.to_string())
    }
}

fn check_status(status: StatusCode, path: &str) -> BlobResult<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(BlobError::from_status(status.as_u16(), path))
    }
}

fn blob_names(listing: &str) -> Vec<String> {
    static NAME: OnceLock<Regex> = OnceLock::new();
    let re = NAME.get_or_init(|| Regex::new(r"<Name>([^<]+)</Name>").expect("static regex"));
    re.captures_iter(listing)
        .map(|c| c[1].to_string())
        .collect()
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn read(&self, path: &str) -> BlobResult<Vec<u8>> {
        let response = self
            .client
            .get(self.blob_url(path)?)
            .send()
            .await
            .map_err(map_transport)?;
        check_status(response.status(), path)?;

        let body = response.bytes().await.map_err(map_transport)?;
        Ok(body.to_vec())
    }

    async fn write(&self, path: &str, data: &[u8]) -> BlobResult<()> {
        let response = self
            .client
            .put(self.blob_url(path)?)
            .header("x-ms-blob-type", "BlockBlob")
            .body(data.to_vec())
            .send()
            .await
            .map_err(map_transport)?;
        check_status(response.status(), path)
    }

    async fn exists(&self, path: &str) -> BlobResult<bool> {
        let response = self
            .client
            .head(self.blob_url(path)?)
            .send()
            .await
            .map_err(map_transport)?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status => check_status(status, path).map(|_| true),
        }
    }

    async fn list(&self, prefix: &str) -> BlobResult<Vec<String>> {
        let response = self
            .client
            .get(self.list_url(prefix)?)
            .send()
            .await
            .map_err(map_transport)?;
        check_status(response.status(), prefix)?;

        let listing = response.text().await.map_err(map_transport)?;
        let mut names = blob_names(&listing);
        names.sort();
        Ok(names)
    }
}
