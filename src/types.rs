//! Core domain types
//!
//! Sources, document kinds, resolved positions and the files produced for
//! them. Everything here is plain data shared by the adapters, the pipeline,
//! the bundler and the uploader.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

/// Upstream catalogue a position was resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// EDQM Chemical Reference Substances
    Edqm,
    /// USP Reference Standards
    Usp,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Edqm, Source::Usp];

    /// Lowercase name, used as the download subdirectory and remote subfolder
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Edqm => "edqm",
            Source::Usp => "usp",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error type for parsing enums from user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError(String);

impl ParseEnumError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseEnumError {}

impl FromStr for Source {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "edqm" => Ok(Source::Edqm),
            "usp" => Ok(Source::Usp),
            other => Err(ParseEnumError(format!(
                "Unknown source '{}'. Valid values: edqm, usp",
                other
            ))),
        }
    }
}

/// Document types retrievable per position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentKind {
    /// Certificate of Analysis
    Coa,
    /// Material Safety Data Sheet
    Msds,
    /// Certificate of Origin
    Coo,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [DocumentKind::Coa, DocumentKind::Msds, DocumentKind::Coo];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Coa => "COA",
            DocumentKind::Msds => "MSDS",
            DocumentKind::Coo => "COO",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "COA" => Ok(DocumentKind::Coa),
            "MSDS" | "SDS" => Ok(DocumentKind::Msds),
            "COO" => Ok(DocumentKind::Coo),
            other => Err(ParseEnumError(format!(
                "Unknown document type '{}'. Valid values: COA, MSDS, COO",
                other
            ))),
        }
    }
}

/// Which local trees an upload covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadScope {
    #[default]
    All,
    Edqm,
    Usp,
}

impl UploadScope {
    /// Sources covered by this scope, in upload order
    pub fn sources(&self) -> Vec<Source> {
        match self {
            UploadScope::All => Source::ALL.to_vec(),
            UploadScope::Edqm => vec![Source::Edqm],
            UploadScope::Usp => vec![Source::Usp],
        }
    }
}

impl From<Source> for UploadScope {
    fn from(source: Source) -> Self {
        match source {
            Source::Edqm => UploadScope::Edqm,
            Source::Usp => UploadScope::Usp,
        }
    }
}

impl std::fmt::Display for UploadScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadScope::All => write!(f, "all"),
            UploadScope::Edqm => write!(f, "edqm"),
            UploadScope::Usp => write!(f, "usp"),
        }
    }
}

impl FromStr for UploadScope {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(UploadScope::All),
            "edqm" => Ok(UploadScope::Edqm),
            "usp" => Ok(UploadScope::Usp),
            other => Err(ParseEnumError(format!(
                "Unknown upload scope '{}'. Valid values: all, edqm, usp",
                other
            ))),
        }
    }
}

/// Resolved lookup result for one catalogue code within one source
#[derive(Debug, Clone, Serialize)]
pub struct Position {
    pub source: Source,
    /// Catalogue code as requested (trimmed)
    pub code: String,
    /// Document links found during search
    pub links: BTreeMap<DocumentKind, Url>,
    /// Source-specific metadata (product name, lot, origin hints)
    pub metadata: serde_json::Value,
}

impl Position {
    pub fn new(source: Source, code: impl Into<String>) -> Self {
        Self {
            source,
            code: code.into(),
            links: BTreeMap::new(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_link(mut self, kind: DocumentKind, url: Url) -> Self {
        self.links.insert(kind, url);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn link(&self, kind: DocumentKind) -> Option<&Url> {
        self.links.get(&kind)
    }
}

/// Where the bytes of a downloaded file came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOrigin {
    Edqm,
    Usp,
    /// Sigma-Aldrich SDS used as MSDS fallback
    Sigma,
    /// Generated locally rather than downloaded (USP COO)
    Synthesized,
}

/// A file persisted for one (source, code, document type)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadedFile {
    /// File name within the source directory
    pub name: String,
    pub path: PathBuf,
    pub kind: DocumentKind,
    pub origin: FileOrigin,
    pub len: u64,
}

/// Outcome of a single document retrieval that did not hit a transport error
#[derive(Debug, Clone)]
pub enum Retrieved {
    File(DownloadedFile),
    /// Document not offered for this position
    Missing(String),
}

impl Retrieved {
    pub fn missing(reason: impl Into<String>) -> Self {
        Retrieved::Missing(reason.into())
    }

    pub fn file(&self) -> Option<&DownloadedFile> {
        match self {
            Retrieved::File(f) => Some(f),
            Retrieved::Missing(_) => None,
        }
    }
}
