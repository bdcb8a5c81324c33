//! Runtime configuration
//!
//! `Config` is built once at the edge of the program and passed by value or
//! reference into adapters and the uploader. Only [`Config::from_env`] reads
//! process state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::detect::CountryNaming;
use crate::types::Source;

pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";
pub const DEFAULT_TOKEN_FILE: &str = "ydisk_token.txt";
pub const DEFAULT_UPLOAD_PATH: &str = "/edqmUSP";
pub const DEFAULT_YDISK_API_BASE: &str = "https://cloud-api.yandex.net";
pub const DEFAULT_EDQM_BASE_URL: &str = "https://crs.edqm.eu";
pub const DEFAULT_SIGMA_BASE_URL: &str = "https://www.sigmaaldrich.com";
pub const DEFAULT_SIGMA_BRAND: &str = "sial";
pub const DEFAULT_USP_API_BASE: &str = "https://store.usp.org";
pub const DEFAULT_USP_STATIC_BASE: &str = "https://static.usp.org";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Upstream endpoints. Overridable so tests and mirrors can point elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub edqm_base: String,
    pub sigma_base: String,
    pub sigma_brand: String,
    pub usp_api_base: String,
    pub usp_static_base: String,
    pub ydisk_api_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            edqm_base: DEFAULT_EDQM_BASE_URL.to_string(),
            sigma_base: DEFAULT_SIGMA_BASE_URL.to_string(),
            sigma_brand: DEFAULT_SIGMA_BRAND.to_string(),
            usp_api_base: DEFAULT_USP_API_BASE.to_string(),
            usp_static_base: DEFAULT_USP_STATIC_BASE.to_string(),
            ydisk_api_base: DEFAULT_YDISK_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the per-source download directories
    pub download_dir: PathBuf,
    /// Cloud storage token; `None` disables upload
    pub ydisk_token: Option<String>,
    /// Remote base folder for uploads
    pub ydisk_upload_path: String,
    pub endpoints: Endpoints,
    pub http_timeout: Duration,
    pub user_agent: String,
    pub country_naming: CountryNaming,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            ydisk_token: None,
            ydisk_upload_path: DEFAULT_UPLOAD_PATH.to_string(),
            endpoints: Endpoints::default(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            user_agent: default_user_agent(),
            country_naming: CountryNaming::default(),
        }
    }
}

impl Config {
    /// Build from environment variables (after loading `.env` if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Endpoints::default();

        let token_file = get("YDISK_TOKEN_FILE").unwrap_or_else(|| DEFAULT_TOKEN_FILE.to_string());
        let ydisk_token = match get("YDISK_TOKEN") {
            Some(token) => Some(token),
            None => read_token_file(Path::new(&token_file))?,
        };

        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(v) => {
                let secs: u64 = v
                    .parse()
                    .with_context(|| format!("HTTP_TIMEOUT_SECS must be a number of seconds, got '{}'", v))?;
                if secs == 0 {
                    return Err(anyhow!("HTTP_TIMEOUT_SECS must be greater than zero"));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        let country_naming = match get("COUNTRY_NAMING") {
            Some(v) => v.parse().map_err(|e| anyhow!("{}", e))?,
            None => CountryNaming::default(),
        };

        Ok(Self {
            download_dir: get("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR)),
            ydisk_token,
            ydisk_upload_path: get("YDISK_UPLOAD_PATH").unwrap_or_else(|| DEFAULT_UPLOAD_PATH.to_string()),
            endpoints: Endpoints {
                edqm_base: get("EDQM_BASE_URL").unwrap_or(defaults.edqm_base),
                sigma_base: get("SIGMA_BASE_URL").unwrap_or(defaults.sigma_base),
                sigma_brand: get("SIGMA_BRAND").unwrap_or(defaults.sigma_brand),
                usp_api_base: get("USP_API_BASE").unwrap_or(defaults.usp_api_base),
                usp_static_base: get("USP_STATIC_BASE").unwrap_or(defaults.usp_static_base),
                ydisk_api_base: get("YDISK_API_BASE").unwrap_or(defaults.ydisk_api_base),
            },
            http_timeout,
            user_agent: get("HTTP_USER_AGENT").unwrap_or_else(default_user_agent),
            country_naming,
        })
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.ydisk_token = Some(token.into());
        self
    }

    /// Directory holding the files of one source
    pub fn source_dir(&self, source: Source) -> PathBuf {
        self.download_dir.join(source.as_str())
    }

    /// Directory holding the archives built for one source
    pub fn archive_dir(&self, source: Source) -> PathBuf {
        self.source_dir(source).join("archives")
    }
}

fn default_user_agent() -> String {
    format!("edqm-usp/{}", env!("CARGO_PKG_VERSION"))
}

/// First non-empty, non-comment line of the token file
fn read_token_file(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read token file {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string))
}
