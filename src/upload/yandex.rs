//! Yandex Disk REST API backend

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use url::Url;

use super::{CloudStorage, DiskInfo};
use crate::error::StorageError;

/// Yandex Disk client authenticated with an OAuth token
pub struct YandexDisk {
    http: Client,
    api_base: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct UploadLink {
    href: String,
    #[serde(default)]
    method: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DiskResponse {
    #[serde(default)]
    user: Option<DiskUser>,
    #[serde(default)]
    total_space: Option<u64>,
    #[serde(default)]
    used_space: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DiskUser {
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

impl YandexDisk {
    pub fn new(
        api_base: &str,
        token: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, StorageError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| StorageError::Transfer(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, StorageError> {
        let raw = format!("{}{}", self.api_base, path);
        let mut url = Url::parse(&raw)
            .map_err(|e| StorageError::Transfer(format!("Invalid URL '{}': {}", raw, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn authorized(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("OAuth {}", self.token))
            .header("Accept", "application/json")
    }
}

fn transfer(context: &str, error: reqwest::Error) -> StorageError {
    if error.is_timeout() {
        StorageError::Transfer(format!("{}: timed out", context))
    } else {
        StorageError::Transfer(format!("{}: {}", context, error))
    }
}

/// Map a non-success API response to the storage taxonomy
async fn rejection(context: &str, response: reqwest::Response) -> StorageError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    classify(context, status, &body)
}

/// 401 and 403 from the API mean the token is bad
fn classify(context: &str, status: StatusCode, body: &str) -> StorageError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        StorageError::Unauthorized(format!("{} (HTTP {})", context, status.as_u16()))
    } else {
        transfer_status(context, status, body)
    }
}

/// Failure of one file's transfer; the pre-signed upload href never rejects the token
fn transfer_status(context: &str, status: StatusCode, body: &str) -> StorageError {
    let body: String = body.chars().take(200).collect();
    StorageError::Transfer(format!("{}: HTTP {} {}", context, status.as_u16(), body))
}

#[async_trait]
impl CloudStorage for YandexDisk {
    fn name(&self) -> &'static str {
        "Yandex Disk"
    }

    async fn check_token(&self) -> Result<DiskInfo, StorageError> {
        let url = self.endpoint("/v1/disk", &[])?;
        let response = self
            .authorized(Method::GET, url)
            .send()
            .await
            .map_err(|e| transfer("disk info", e))?;

        if !response.status().is_success() {
            return Err(rejection("disk info", response).await);
        }

        let disk: DiskResponse = response
            .json()
            .await
            .map_err(|e| transfer("disk info", e))?;
        let user = disk.user.unwrap_or_default();
        Ok(DiskInfo {
            login: user.login.or(user.display_name),
            total_space: disk.total_space,
            used_space: disk.used_space,
        })
    }

    async fn ensure_dir(&self, remote: &str) -> Result<(), StorageError> {
        let url = self.endpoint("/v1/disk/resources", &[("path", remote)])?;
        let response = self
            .authorized(Method::PUT, url)
            .send()
            .await
            .map_err(|e| transfer(remote, e))?;

        // 409: already exists
        if response.status().is_success() || response.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        Err(rejection(remote, response).await)
    }

    async fn upload_file(&self, local: &Path, remote: &str) -> Result<(), StorageError> {
        let content = tokio::fs::read(local).await?;

        let url = self.endpoint(
            "/v1/disk/resources/upload",
            &[("path", remote), ("overwrite", "true")],
        )?;
        let response = self
            .authorized(Method::GET, url)
            .send()
            .await
            .map_err(|e| transfer(remote, e))?;
        if !response.status().is_success() {
            return Err(rejection(remote, response).await);
        }
        let link: UploadLink = response.json().await.map_err(|e| transfer(remote, e))?;

        let method = link
            .method
            .as_deref()
            .and_then(|m| Method::from_bytes(m.to_uppercase().as_bytes()).ok())
            .unwrap_or(Method::PUT);

        let response = self
            .http
            .request(method, link.href.as_str())
            .body(content)
            .send()
            .await
            .map_err(|e| transfer(remote, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(transfer_status(remote, status, &body));
        }
        Ok(())
    }
}
