//! Shared fakes for integration tests
//!
//! `FakeTransport` serves canned responses by exact URL and records every
//! request; unknown URLs answer 404. `FakeStorage` records uploads in memory.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use edqm_usp::config::Config;
use edqm_usp::error::{FetchError, StorageError};
use edqm_usp::transport::{HttpResponse, HttpTransport};
use edqm_usp::upload::{CloudStorage, DiskInfo};

// =============================================================================
// HTTP
// =============================================================================

#[derive(Default)]
pub struct FakeTransport {
    routes: HashMap<String, HttpResponse>,
    failures: HashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        self.routes
            .insert(url.to_string(), HttpResponse::new(status, Some(content_type), body));
        self
    }

    pub fn html(self, url: &str, body: &str) -> Self {
        self.route(url, 200, "text/html; charset=utf-8", body)
    }

    pub fn pdf(self, url: &str, body: &[u8]) -> Self {
        self.route(url, 200, "application/pdf", body.to_vec())
    }

    pub fn json(self, url: &str, body: serde_json::Value) -> Self {
        self.route(url, 200, "application/json", body.to_string())
    }

    /// Requests to `url` fail at the transport level
    pub fn fail(mut self, url: &str) -> Self {
        self.failures.insert(url.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested(&self, url: &str) -> bool {
        self.requests().iter().any(|u| u == url)
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        if self.failures.contains(url) {
            return Err(FetchError::Timeout {
                url: url.to_string(),
            });
        }
        Ok(self
            .routes
            .get(url)
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(404, Some("text/html"), "Not Found")))
    }
}

/// Config rooted at a temporary download directory
pub fn test_config(download_dir: &Path) -> Config {
    Config::default().with_download_dir(download_dir)
}

pub fn shared(transport: FakeTransport) -> Arc<FakeTransport> {
    Arc::new(transport)
}

// =============================================================================
// STORAGE
// =============================================================================

#[derive(Default)]
pub struct FakeStorage {
    pub reject_token: bool,
    /// Remote paths whose upload fails
    pub failing: HashSet<String>,
    dirs: Mutex<Vec<String>>,
    uploads: Mutex<Vec<(PathBuf, String)>>,
    token_checks: Mutex<usize>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject_token: true,
            ..Self::default()
        }
    }

    pub fn failing_on(remote: &str) -> Self {
        Self {
            failing: [remote.to_string()].into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn dirs(&self) -> Vec<String> {
        self.dirs.lock().unwrap().clone()
    }

    pub fn remote_paths(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(_, remote)| remote.clone())
            .collect()
    }

    pub fn token_checks(&self) -> usize {
        *self.token_checks.lock().unwrap()
    }
}

#[async_trait]
impl CloudStorage for FakeStorage {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn check_token(&self) -> Result<DiskInfo, StorageError> {
        *self.token_checks.lock().unwrap() += 1;
        if self.reject_token {
            return Err(StorageError::Unauthorized("HTTP 401".to_string()));
        }
        Ok(DiskInfo {
            login: Some("lab".to_string()),
            total_space: Some(1024),
            used_space: Some(0),
        })
    }

    async fn ensure_dir(&self, remote: &str) -> Result<(), StorageError> {
        self.dirs.lock().unwrap().push(remote.to_string());
        Ok(())
    }

    async fn upload_file(&self, local: &Path, remote: &str) -> Result<(), StorageError> {
        if self.failing.contains(remote) {
            return Err(StorageError::Transfer(format!("{}: HTTP 507", remote)));
        }
        // Read like a real backend would
        tokio::fs::read(local).await?;
        self.uploads
            .lock()
            .unwrap()
            .push((local.to_path_buf(), remote.to_string()));
        Ok(())
    }
}
