//! Load files or directory trees into chunked documents

use crate::chunking::{split_documents, ChunkOptions};
use crate::document::{extension_of, Document, FileKind};
use crate::error::LoadError;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Load a file or every supported file under a directory, then chunk the result.
///
/// Only the existence, permission and unsupported-extension checks are fatal.
/// Per-file parse failures are logged and skipped.
pub fn load<P: AsRef<Path>>(path: P, options: &ChunkOptions) -> Result<Vec<Document>, LoadError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let documents = if path.is_file() {
        check_readable(path, File::open(path).map(drop))?;

        let kind = FileKind::from_path(path);
        if kind == FileKind::Unsupported {
            return Err(LoadError::UnsupportedFormat(extension_of(path)));
        }

        match parse_file(kind, path) {
            Ok(documents) => documents,
            Err(e) => {
                error!("Error loading file {}: {}", path.display(), e);
                return Ok(Vec::new());
            }
        }
    } else {
        check_readable(path, fs::read_dir(path).map(drop))?;
        load_directory(path)
    };

    if documents.is_empty() {
        warn!("No documents were loaded from {}", path.display());
        return Ok(Vec::new());
    }

    let chunks = split_documents(&documents, options);
    info!(
        "Split {} documents into {} chunks",
        documents.len(),
        chunks.len()
    );

    Ok(chunks)
}

fn check_readable(path: &Path, probe: std::io::Result<()>) -> Result<(), LoadError> {
    match probe {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            Err(LoadError::PermissionDenied(path.to_path_buf()))
        }
        Err(e) => Err(LoadError::Io(e)),
    }
}

/// Parse one file, turning a parser panic into a parse error
fn parse_file(kind: FileKind, path: &Path) -> Result<Vec<Document>, LoadError> {
    match panic::catch_unwind(AssertUnwindSafe(|| kind.parse(path))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "parser panicked".to_string());
            Err(LoadError::parse(path, message))
        }
    }
}

/// Walk `root` once and bucket supported files by kind, each bucket sorted by path
fn partition_files(root: &Path) -> BTreeMap<FileKind, Vec<PathBuf>> {
    let mut groups: BTreeMap<FileKind, Vec<PathBuf>> = BTreeMap::new();

    for entry in WalkDir::new(root).into_iter() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        match FileKind::from_path(entry.path()) {
            FileKind::Unsupported => debug!("Skipping {}", entry.path().display()),
            kind => groups.entry(kind).or_default().push(entry.into_path()),
        }
    }

    for files in groups.values_mut() {
        files.sort();
    }
    groups
}

fn load_directory(root: &Path) -> Vec<Document> {
    let mut groups = partition_files(root);
    let mut documents = Vec::new();

    for kind in FileKind::SUPPORTED {
        let Some(files) = groups.remove(&kind) else {
            continue;
        };
        documents.extend(load_group(kind, &files));
    }

    documents
}

/// Parse one group of same-kind files on the rayon pool, keeping path order
fn load_group(kind: FileKind, files: &[PathBuf]) -> Vec<Document> {
    let progress = ProgressBar::new(files.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{msg:>6} [{bar:30}] {pos}/{len}") {
        progress.set_style(style.progress_chars("=> "));
    }
    progress.set_message(kind.name());

    let results: Vec<Result<Vec<Document>, LoadError>> = files
        .par_iter()
        .map(|file| {
            let result = parse_file(kind, file);
            progress.inc(1);
            result
        })
        .collect();
    progress.finish_and_clear();

    let mut documents = Vec::new();
    let mut failed = 0;
    for result in results {
        match result {
            Ok(parsed) => documents.extend(parsed),
            Err(e) => {
                failed += 1;
                error!("Error loading {} file: {}", kind, e);
            }
        }
    }

    info!(
        "Loaded {} of {} {} files ({} documents)",
        files.len() - failed,
        files.len(),
        kind,
        documents.len()
    );
    documents
}
