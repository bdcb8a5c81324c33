//! Cloud upload of downloaded trees
//!
//! Mirrors `<downloads>/<source>/...` to `<remote_base>/<source>/...` on a
//! [`CloudStorage`] backend. Local files are only read. Files are uploaded
//! in sorted order; one failed file does not stop the rest, but a rejected
//! token aborts the run.

mod yandex;

pub use yandex::YandexDisk;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use crate::config::Config;
use crate::error::{StorageError, UploadError};
use crate::types::{Source, UploadScope};

/// Account details returned by a token check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiskInfo {
    pub login: Option<String>,
    pub total_space: Option<u64>,
    pub used_space: Option<u64>,
}

/// Remote storage the uploader writes to
#[async_trait]
pub trait CloudStorage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Verify the credentials
    async fn check_token(&self) -> Result<DiskInfo, StorageError>;

    /// Create a remote directory; an existing one is not an error
    async fn ensure_dir(&self, remote: &str) -> Result<(), StorageError>;

    /// Upload one local file, overwriting the remote copy
    async fn upload_file(&self, local: &Path, remote: &str) -> Result<(), StorageError>;
}

// =============================================================================
// REPORT
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub local: PathBuf,
    pub remote: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedUpload {
    pub local: PathBuf,
    pub remote: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub scope: UploadScope,
    pub uploaded: Vec<UploadedFile>,
    pub failed: Vec<FailedUpload>,
    /// Sources whose local directory did not exist
    pub skipped: Vec<Source>,
}

impl UploadReport {
    fn new(scope: UploadScope) -> Self {
        Self {
            scope,
            uploaded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

// =============================================================================
// UPLOADER
// =============================================================================

pub struct Uploader<S> {
    storage: S,
    remote_base: String,
}

impl Uploader<YandexDisk> {
    /// Yandex Disk uploader; fails with `Auth` before any request when no token is set
    pub fn from_config(config: &Config, scope: UploadScope) -> Result<Self, UploadError> {
        let token = config
            .ydisk_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| UploadError::Auth {
                scope,
                message: "Yandex Disk token not configured (set YDISK_TOKEN or YDISK_TOKEN_FILE)"
                    .to_string(),
            })?;

        let storage = YandexDisk::new(
            &config.endpoints.ydisk_api_base,
            token,
            config.http_timeout,
            &config.user_agent,
        )
        .map_err(|e| UploadError::Upload {
            path: config.endpoints.ydisk_api_base.clone(),
            message: e.to_string(),
        })?;

        Ok(Self::new(storage, &config.ydisk_upload_path))
    }
}

impl<S: CloudStorage> Uploader<S> {
    pub fn new(storage: S, remote_base: &str) -> Self {
        Self {
            storage,
            remote_base: normalize_remote(remote_base),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn remote_base(&self) -> &str {
        &self.remote_base
    }

    /// Check the token against the service
    pub async fn connect(&self, scope: UploadScope) -> Result<DiskInfo, UploadError> {
        self.storage
            .check_token()
            .await
            .map_err(|e| storage_failure(scope, &self.remote_base, PathBuf::new(), e))
    }

    /// Upload the local trees selected by `scope` under `root`
    pub async fn upload(&self, root: &Path, scope: UploadScope) -> Result<UploadReport, UploadError> {
        let info = self.connect(scope).await?;
        tracing::info!(
            storage = self.storage.name(),
            login = info.login.as_deref().unwrap_or(""),
            "Token accepted"
        );

        let mut report = UploadReport::new(scope);
        let mut created: HashSet<String> = HashSet::new();

        for source in scope.sources() {
            let local_root = root.join(source.as_str());
            if !local_root.is_dir() {
                tracing::warn!(source = %source, dir = %local_root.display(), "Nothing to upload");
                report.skipped.push(source);
                continue;
            }

            let files = collect_files(&local_root).map_err(|error| UploadError::Io {
                path: local_root.clone(),
                error,
            })?;
            tracing::info!(source = %source, files = files.len(), "Uploading");

            for local in files {
                let remote = self.remote_path(source, &local_root, &local);

                if let Err(e) = self.ensure_parents(&remote, &mut created).await {
                    match storage_failure(scope, &remote, local.clone(), e) {
                        auth @ UploadError::Auth { .. } => return Err(auth),
                        other => {
                            tracing::warn!(file = %local.display(), error = %other, "Upload failed");
                            report.failed.push(FailedUpload {
                                local,
                                remote,
                                error: other.to_string(),
                            });
                            continue;
                        }
                    }
                }

                match self.storage.upload_file(&local, &remote).await {
                    Ok(()) => {
                        tracing::info!(remote = %remote, "Uploaded");
                        report.uploaded.push(UploadedFile { local, remote });
                    }
                    Err(e) => match storage_failure(scope, &remote, local.clone(), e) {
                        auth @ UploadError::Auth { .. } => return Err(auth),
                        other => {
                            tracing::warn!(file = %local.display(), error = %other, "Upload failed");
                            report.failed.push(FailedUpload {
                                local,
                                remote,
                                error: other.to_string(),
                            });
                        }
                    },
                }
            }
        }

        Ok(report)
    }

    /// `<remote_base>/<source>/<relative path with forward slashes>`
    fn remote_path(&self, source: Source, local_root: &Path, local: &Path) -> String {
        let relative = local
            .strip_prefix(local_root)
            .unwrap_or(local)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        join_remote(&join_remote(&self.remote_base, source.as_str()), &relative)
    }

    /// Create every missing ancestor directory of a remote file path
    async fn ensure_parents(
        &self,
        remote_file: &str,
        created: &mut HashSet<String>,
    ) -> Result<(), StorageError> {
        for dir in ancestors(remote_file) {
            if created.contains(&dir) {
                continue;
            }
            self.storage.ensure_dir(&dir).await?;
            created.insert(dir);
        }
        Ok(())
    }
}

fn storage_failure(scope: UploadScope, remote: &str, local: PathBuf, error: StorageError) -> UploadError {
    match error {
        StorageError::Unauthorized(message) => UploadError::Auth { scope, message },
        StorageError::Transfer(message) => UploadError::Upload {
            path: remote.to_string(),
            message,
        },
        StorageError::Io(error) => UploadError::Io { path: local, error },
    }
}

/// `/a/b`, whatever the user typed (`a/b/`, `disk:/a/b`)
fn normalize_remote(base: &str) -> String {
    let base = base.trim();
    let base = base.strip_prefix("disk:").unwrap_or(base);
    let parts: Vec<&str> = base.split('/').filter(|p| !p.is_empty()).collect();
    format!("/{}", parts.join("/"))
}

fn join_remote(base: &str, child: &str) -> String {
    if child.is_empty() {
        base.to_string()
    } else if base.ends_with('/') {
        format!("{}{}", base, child)
    } else {
        format!("{}/{}", base, child)
    }
}

/// Directories above a remote file, outermost first (`/a`, `/a/b` for `/a/b/f`)
fn ancestors(remote_file: &str) -> Vec<String> {
    let parts: Vec<&str> = remote_file.split('/').filter(|p| !p.is_empty()).collect();
    (1..parts.len())
        .map(|n| format!("/{}", parts[..n].join("/")))
        .collect()
}

/// Every regular file under `dir`, recursively, in sorted path order
pub fn collect_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    let mut files = Vec::new();
    for path in entries {
        if path.is_dir() {
            files.extend(collect_files(&path)?);
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}
