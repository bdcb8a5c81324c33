//! Archive bundling of downloaded files
//!
//! Archives are reproducible: members are sorted, and every entry carries the
//! DOS epoch timestamp, mode 0644 and Deflate compression, so bundling the
//! same files twice gives byte-identical output.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::BundleError;
use crate::sources::files::code_stem;
use crate::types::{DownloadedFile, ParseEnumError, Source};

/// How downloaded files are packaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleMode {
    /// Files are left as they are
    #[default]
    Single,
    /// One `<code>.zip` per position
    Position,
    /// One `<source>_batch.zip` holding an inner `<code>.zip` per position
    Batch,
}

impl FromStr for BundleMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" | "none" => Ok(BundleMode::Single),
            "position" | "per-position" | "per_position" => Ok(BundleMode::Position),
            "batch" => Ok(BundleMode::Batch),
            other => Err(ParseEnumError::new(format!(
                "Unknown bundle mode '{}'. Valid values: single, position, batch",
                other
            ))),
        }
    }
}

/// Files downloaded for one catalogue code
#[derive(Debug, Clone)]
pub struct FileSet {
    pub code: String,
    pub files: Vec<DownloadedFile>,
}

impl FileSet {
    pub fn new(code: impl Into<String>, files: Vec<DownloadedFile>) -> Self {
        Self {
            code: code.into(),
            files,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// What a bundling run produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "paths", rename_all = "snake_case")]
pub enum Bundle {
    Files(Vec<PathBuf>),
    Archives(Vec<PathBuf>),
    Batch(PathBuf),
    /// Nothing to bundle
    Empty,
}

impl Bundle {
    pub fn paths(&self) -> Vec<PathBuf> {
        match self {
            Bundle::Files(paths) | Bundle::Archives(paths) => paths.clone(),
            Bundle::Batch(path) => vec![path.clone()],
            Bundle::Empty => Vec::new(),
        }
    }
}

/// Package file sets according to `mode`, writing archives into `archive_dir`
pub fn bundle(
    mode: BundleMode,
    source: Source,
    sets: &[FileSet],
    archive_dir: &Path,
) -> Result<Bundle, BundleError> {
    let mut sets: Vec<&FileSet> = sets.iter().filter(|s| !s.is_empty()).collect();
    if sets.is_empty() {
        return Ok(Bundle::Empty);
    }
    sets.sort_by(|a, b| a.code.cmp(&b.code));
    let names = archive_names(&sets);

    match mode {
        BundleMode::Single => Ok(Bundle::Files(
            sets.iter()
                .flat_map(|s| s.files.iter().map(|f| f.path.clone()))
                .collect(),
        )),
        BundleMode::Position => {
            create_dir(archive_dir)?;
            let mut paths = Vec::with_capacity(sets.len());
            for (set, name) in sets.iter().zip(&names) {
                let path = archive_dir.join(name);
                write_file(&path, &position_archive(set)?)?;
                tracing::info!(code = %set.code, archive = %path.display(), "Wrote position archive");
                paths.push(path);
            }
            Ok(Bundle::Archives(paths))
        }
        BundleMode::Batch => {
            create_dir(archive_dir)?;
            let mut members = Vec::with_capacity(sets.len());
            for (set, name) in sets.iter().zip(&names) {
                members.push((name.clone(), position_archive(set)?));
            }
            let path = archive_dir.join(format!("{}_batch.zip", source));
            write_file(&path, &archive(members)?)?;
            tracing::info!(
                positions = sets.len(),
                archive = %path.display(),
                "Wrote batch archive"
            );
            Ok(Bundle::Batch(path))
        }
    }
}

/// `<code>.zip` per set in order; codes sharing a filename stem get `_2`, `_3`..
fn archive_names(sets: &[&FileSet]) -> Vec<String> {
    let mut taken = HashSet::new();
    sets.iter()
        .map(|set| {
            let stem = code_stem(&set.code);
            let mut name = format!("{}.zip", stem);
            let mut n = 2;
            while !taken.insert(name.to_lowercase()) {
                name = format!("{}_{}.zip", stem, n);
                n += 1;
            }
            name
        })
        .collect()
}

/// Zip bytes holding every file of one position
pub fn position_archive(set: &FileSet) -> Result<Vec<u8>, BundleError> {
    let mut members = Vec::with_capacity(set.files.len());
    for file in &set.files {
        let content = std::fs::read(&file.path).map_err(|error| BundleError::Io {
            path: file.path.clone(),
            error,
        })?;
        members.push((file.name.clone(), content));
    }
    archive(members)
}

/// Zip bytes from (name, content) pairs, sorted by name
///
/// A file listed twice for one position is written once.
fn archive(mut members: Vec<(String, Vec<u8>)>) -> Result<Vec<u8>, BundleError> {
    members.sort_by(|a, b| a.0.cmp(&b.0));
    members.dedup_by(|a, b| a.0 == b.0);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in members {
        writer.start_file(name, entry_options())?;
        writer
            .write_all(&content)
            .map_err(zip::result::ZipError::from)?;
    }
    Ok(writer.finish()?.into_inner())
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644)
}

fn create_dir(dir: &Path) -> Result<(), BundleError> {
    std::fs::create_dir_all(dir).map_err(|error| BundleError::Io {
        path: dir.to_path_buf(),
        error,
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), BundleError> {
    std::fs::write(path, bytes).map_err(|error| BundleError::Io {
        path: path.to_path_buf(),
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentKind, FileOrigin};

    fn file(dir: &Path, name: &str, content: &[u8]) -> DownloadedFile {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        DownloadedFile {
            name: name.to_string(),
            path,
            kind: DocumentKind::Coa,
            origin: FileOrigin::Edqm,
            len: content.len() as u64,
        }
    }

    fn names(bytes: &[u8]) -> Vec<String> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        archive.file_names().map(str::to_string).collect::<Vec<_>>()
    }

    #[test]
    fn test_bundle_mode_from_str() {
        assert_eq!("per-position".parse::<BundleMode>().unwrap(), BundleMode::Position);
        assert_eq!("BATCH".parse::<BundleMode>().unwrap(), BundleMode::Batch);
        assert!("flat".parse::<BundleMode>().is_err());
    }

    #[test]
    fn test_position_archive_members_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let set = FileSet::new(
            "Y1",
            vec![
                file(dir.path(), "Y1_MSDS.pdf", b"msds"),
                file(dir.path(), "France.pdf", b"coo"),
                file(dir.path(), "Y1_COA.pdf", b"coa"),
            ],
        );
        let bytes = position_archive(&set).unwrap();
        let mut listed = names(&bytes);
        listed.sort();
        assert_eq!(listed, vec!["France.pdf", "Y1_COA.pdf", "Y1_MSDS.pdf"]);
    }

    #[test]
    fn test_single_mode_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let sets = vec![FileSet::new("Y1", vec![file(dir.path(), "Y1_COA.pdf", b"coa")])];
        let result = bundle(BundleMode::Single, Source::Edqm, &sets, &dir.path().join("archives")).unwrap();
        assert_eq!(result, Bundle::Files(vec![dir.path().join("Y1_COA.pdf")]));
        assert!(!dir.path().join("archives").exists());
    }

    #[test]
    fn test_empty_sets() {
        let dir = tempfile::tempdir().unwrap();
        let sets = vec![FileSet::new("Y1", Vec::new())];
        let result = bundle(BundleMode::Batch, Source::Usp, &sets, dir.path()).unwrap();
        assert_eq!(result, Bundle::Empty);
    }

    #[test]
    fn test_codes_sharing_a_stem_keep_separate_archives() {
        let dir = tempfile::tempdir().unwrap();
        let sets = vec![
            FileSet::new("A_B", vec![file(dir.path(), "A_B_COA.pdf", b"underscore")]),
            FileSet::new("A/B", vec![file(dir.path(), "slash_COA.pdf", b"slash")]),
        ];
        let archives = dir.path().join("archives");

        let batch = bundle(BundleMode::Batch, Source::Edqm, &sets, &archives).unwrap();
        let Bundle::Batch(path) = batch else {
            panic!("expected a batch archive");
        };
        let mut members = names(&std::fs::read(path).unwrap());
        members.sort();
        assert_eq!(members, vec!["A_B.zip", "A_B_2.zip"]);

        let positions = bundle(BundleMode::Position, Source::Edqm, &sets, &archives).unwrap();
        assert_eq!(
            positions,
            Bundle::Archives(vec![archives.join("A_B.zip"), archives.join("A_B_2.zip")])
        );
        assert_eq!(names(&std::fs::read(archives.join("A_B_2.zip")).unwrap()), vec!["A_B_COA.pdf"]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut gone = file(dir.path(), "Y1_COA.pdf", b"coa");
        gone.path = dir.path().join("absent.pdf");
        let err = position_archive(&FileSet::new("Y1", vec![gone])).unwrap_err();
        assert!(matches!(err, BundleError::Io { .. }));
    }
}
