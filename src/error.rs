//! Error taxonomy for retrieval, bundling and upload
//!
//! Every error carries enough context to attribute it to a single
//! (source, code, document type) tuple or a single uploaded path.
//! "Document not offered" is not an error; see [`crate::types::Retrieved`].

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Source, UploadScope};

/// Transport-level failure of a single HTTP request
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

/// Failures of a source adapter
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{catalogue} code '{code}' not found")]
    NotFound { catalogue: Source, code: String },

    #[error("{catalogue} network error for '{code}': {message}")]
    Network {
        catalogue: Source,
        code: String,
        message: String,
    },

    #[error("{catalogue} could not write files for '{code}': {error}")]
    Io {
        catalogue: Source,
        code: String,
        #[source]
        error: std::io::Error,
    },
}

impl SourceError {
    pub fn not_found(catalogue: Source, code: &str) -> Self {
        SourceError::NotFound {
            catalogue,
            code: code.to_string(),
        }
    }

    pub fn network(catalogue: Source, code: &str, message: impl std::fmt::Display) -> Self {
        SourceError::Network {
            catalogue,
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    pub fn io(catalogue: Source, code: &str, error: std::io::Error) -> Self {
        SourceError::Io {
            catalogue,
            code: code.to_string(),
            error,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound { .. })
    }
}

/// Failures while building archives
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Bundle IO error at {path}: {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Failures of the cloud upload sink
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Authentication failed for upload scope '{scope}': {message}")]
    Auth { scope: UploadScope, message: String },

    #[error("Upload of {path} failed: {message}")]
    Upload { path: String, message: String },

    #[error("Cannot read {path}: {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

impl UploadError {
    pub fn is_auth(&self) -> bool {
        matches!(self, UploadError::Auth { .. })
    }
}

/// Failures reported by a cloud storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Token rejected: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Transfer(String),

    #[error("Local file error: {0}")]
    Io(#[from] std::io::Error),
}
