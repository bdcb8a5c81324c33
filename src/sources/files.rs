//! Output file naming and persistence shared by the adapters

use std::path::{Path, PathBuf};

use url::Url;

use crate::detect::safe_filename;
use crate::types::{DocumentKind, DownloadedFile, FileOrigin};

const DEFAULT_EXTENSION: &str = "pdf";
const MAX_EXTENSION_LEN: usize = 5;

/// Extension from the URL path, then the media type, then `pdf`
pub fn extension_for(url: &Url, media_type: Option<&str>) -> String {
    let from_path = url
        .path_segments()
        .and_then(|segments| segments.last())
        .and_then(|last| last.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
                && ext.chars().any(|c| c.is_ascii_alphabetic())
        });
    if let Some(ext) = from_path {
        return ext;
    }

    match media_type {
        Some("application/pdf") | Some("application/x-pdf") => "pdf".to_string(),
        Some("text/plain") => "txt".to_string(),
        Some("text/html") => "html".to_string(),
        Some("application/zip") => "zip".to_string(),
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

/// Filesystem-safe form of a catalogue code
pub fn code_stem(code: &str) -> String {
    let stem = safe_filename(code);
    if stem.is_empty() {
        "unknown".to_string()
    } else {
        stem
    }
}

/// `<code>_<KIND>[_<tag>].<ext>`
pub fn document_filename(code: &str, kind: DocumentKind, tag: Option<&str>, ext: &str) -> String {
    match tag {
        Some(tag) => format!("{}_{}_{}.{}", code_stem(code), kind, tag, ext),
        None => format!("{}_{}.{}", code_stem(code), kind, ext),
    }
}

/// Pick the path for a country-named output
///
/// `<stem>.<ext>` unless another file with different content already holds
/// that name, in which case the code is appended.
pub async fn country_path(dir: &Path, stem: &str, code: &str, ext: &str, content: &[u8]) -> PathBuf {
    let plain = dir.join(format!("{}.{}", stem, ext));
    match tokio::fs::read(&plain).await {
        Ok(existing) if existing != content => {
            dir.join(format!("{}_{}.{}", stem, code_stem(code), ext))
        }
        _ => plain,
    }
}

/// Write bytes and describe the result
pub async fn save(
    path: PathBuf,
    kind: DocumentKind,
    origin: FileOrigin,
    content: &[u8],
) -> std::io::Result<DownloadedFile> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, content).await?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(DownloadedFile {
        name,
        path,
        kind,
        origin,
        len: content.len() as u64,
    })
}

/// Lowercase alphanumerics only, for tolerant code comparison
pub fn compact(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
