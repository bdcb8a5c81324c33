//! Per-code retrieval pipeline and run reporting
//!
//! Drives a [`CatalogueSource`] through search and the requested downloads,
//! one code at a time, and folds every outcome into a [`CodeReport`]. No
//! failure for one code or one document type aborts the others.

use serde::Serialize;

use crate::bundle::FileSet;
use crate::sources::CatalogueSource;
use crate::types::{DocumentKind, DownloadedFile, Position, Retrieved, Source};

// ---------------------------------------------------------------------------
// Document outcomes
// ---------------------------------------------------------------------------

/// Outcome of one document type for one code
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    Saved { file: DownloadedFile },
    Missing { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub kind: DocumentKind,
    #[serde(flatten)]
    pub status: DocumentStatus,
}

impl DocumentReport {
    pub fn file(&self) -> Option<&DownloadedFile> {
        match &self.status {
            DocumentStatus::Saved { file } => Some(file),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Code outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeStatus {
    /// Every requested document saved
    Complete,
    /// Resolved, some documents saved, some missing or failed
    Partial,
    /// Search failed or nothing saved
    Failed,
}

/// Everything that happened for one catalogue code
#[derive(Debug, Clone, Serialize)]
pub struct CodeReport {
    pub source: Source,
    pub code: String,
    pub status: CodeStatus,
    /// False when search itself failed
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub documents: Vec<DocumentReport>,
}

impl CodeReport {
    fn unresolved(source: Source, code: &str, error: String) -> Self {
        Self {
            source,
            code: code.to_string(),
            status: CodeStatus::Failed,
            resolved: false,
            error: Some(error),
            documents: Vec::new(),
        }
    }

    fn resolved(position: &Position, documents: Vec<DocumentReport>) -> Self {
        let saved = documents.iter().filter(|d| d.file().is_some()).count();
        let status = if saved == 0 {
            CodeStatus::Failed
        } else if saved == documents.len() {
            CodeStatus::Complete
        } else {
            CodeStatus::Partial
        };
        Self {
            source: position.source,
            code: position.code.clone(),
            status,
            resolved: true,
            error: None,
            documents,
        }
    }

    pub fn files(&self) -> Vec<DownloadedFile> {
        self.documents
            .iter()
            .filter_map(|d| d.file().cloned())
            .collect()
    }

    /// Files of this code in the shape the bundler takes
    pub fn file_set(&self) -> FileSet {
        FileSet::new(&self.code, self.files())
    }
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub source: Source,
    pub complete: usize,
    pub partial: usize,
    pub failed: usize,
    pub unresolved: usize,
    pub files: usize,
    pub codes: Vec<CodeReport>,
}

impl RunSummary {
    pub fn from_reports(source: Source, codes: Vec<CodeReport>) -> Self {
        let count = |status: CodeStatus| codes.iter().filter(|c| c.status == status).count();
        Self {
            source,
            complete: count(CodeStatus::Complete),
            partial: count(CodeStatus::Partial),
            failed: count(CodeStatus::Failed),
            unresolved: codes.iter().filter(|c| !c.resolved).count(),
            files: codes.iter().map(|c| c.files().len()).sum(),
            codes,
        }
    }

    /// Whether every requested code was found by search
    pub fn all_resolved(&self) -> bool {
        self.unresolved == 0
    }

    pub fn file_sets(&self) -> Vec<FileSet> {
        self.codes.iter().map(CodeReport::file_set).collect()
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Requested kinds in canonical order without duplicates; empty means all
pub fn canonical_kinds(kinds: &[DocumentKind]) -> Vec<DocumentKind> {
    if kinds.is_empty() {
        return DocumentKind::ALL.to_vec();
    }
    DocumentKind::ALL
        .into_iter()
        .filter(|k| kinds.contains(k))
        .collect()
}

/// Search one code and fetch each requested document type
pub async fn retrieve(
    source: &dyn CatalogueSource,
    code: &str,
    kinds: &[DocumentKind],
) -> CodeReport {
    let code = code.trim();
    let position = match source.search(code).await {
        Ok(position) => position,
        Err(e) => {
            tracing::warn!(source = %source.source(), code, error = %e, "Lookup failed");
            return CodeReport::unresolved(source.source(), code, e.to_string());
        }
    };

    let mut documents = Vec::new();
    for kind in canonical_kinds(kinds) {
        let status = match source.download(&position, kind).await {
            Ok(Retrieved::File(file)) => DocumentStatus::Saved { file },
            Ok(Retrieved::Missing(reason)) => {
                tracing::info!(code, kind = %kind, reason = %reason, "Document missing");
                DocumentStatus::Missing { reason }
            }
            Err(e) => {
                tracing::warn!(code, kind = %kind, error = %e, "Document download failed");
                DocumentStatus::Failed {
                    error: e.to_string(),
                }
            }
        };
        documents.push(DocumentReport { kind, status });
    }

    CodeReport::resolved(&position, documents)
}

/// Retrieve codes in order; blank entries are skipped
pub async fn retrieve_all(
    source: &dyn CatalogueSource,
    codes: &[String],
    kinds: &[DocumentKind],
) -> RunSummary {
    let mut reports = Vec::with_capacity(codes.len());
    for code in codes.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        tracing::info!(source = %source.source(), code, "Processing");
        reports.push(retrieve(source, code, kinds).await);
    }
    RunSummary::from_reports(source.source(), reports)
}
