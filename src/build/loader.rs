//! Document discovery and loading.
//!
//! Walks the content root, picks out files whose extension is one of the
//! configured template formats, and parses each into a [`Document`].
//! Files are read in parallel on the build pool; results keep discovery order.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use super::document::{Document, display_path, parse_date, parse_front_matter};

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("content root does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("content root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed front matter in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid date '{value}' in {}", path.display())]
    InvalidDate { path: PathBuf, value: String },
}

// =============================================================================
// Loader
// =============================================================================

/// Which files under the content root are documents.
pub struct LoadOptions {
    /// Lowercase extensions without the dot
    pub template_formats: Vec<String>,
    /// Directories never descended into (layouts, output)
    pub skip_dirs: Vec<PathBuf>,
}

impl LoadOptions {
    pub fn new(template_formats: &[String]) -> Self {
        Self {
            template_formats: template_formats.iter().map(|f| f.to_lowercase()).collect(),
            skip_dirs: Vec::new(),
        }
    }

    /// Skip a directory if it exists. Paths are compared canonicalized.
    pub fn skip_dir(mut self, dir: &Path) -> Self {
        if let Ok(canonical) = dir.canonicalize() {
            self.skip_dirs.push(canonical);
        }
        self
    }

    fn is_document(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|ext| self.template_formats.contains(&ext))
    }

    fn is_skipped(&self, dir: &Path) -> bool {
        if self.skip_dirs.is_empty() {
            return false;
        }
        dir.canonicalize()
            .map(|c| self.skip_dirs.contains(&c))
            .unwrap_or(false)
    }
}

/// Documents loaded in one pass, plus the per-file errors encountered.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<Document>,
    pub errors: Vec<LoadError>,
}

/// Load every document under `content_root`.
///
/// A missing content root fails immediately. Per-file failures (unreadable
/// files, malformed front matter) are collected so a single pass reports
/// all of them.
pub fn load(
    content_root: &Path,
    options: &LoadOptions,
    pool: &rayon::ThreadPool,
) -> Result<LoadOutcome, LoadError> {
    let paths = discover(content_root, options)?;
    tracing::debug!(count = paths.len(), root = %content_root.display(), "discovered documents");

    let results: Vec<Result<Document, LoadError>> = pool.install(|| {
        paths
            .par_iter()
            .map(|relative| load_document(content_root, relative))
            .collect()
    });

    let mut outcome = LoadOutcome::default();
    for result in results {
        match result {
            Ok(doc) => outcome.documents.push(doc),
            Err(e) => outcome.errors.push(e),
        }
    }
    Ok(outcome)
}

/// List document paths (relative to the content root) in discovery order.
///
/// Directory entries are visited sorted by name so the order is stable
/// across runs and platforms.
pub fn discover(content_root: &Path, options: &LoadOptions) -> Result<Vec<PathBuf>, LoadError> {
    if !content_root.exists() {
        return Err(LoadError::NotFound(content_root.to_path_buf()));
    }
    if !content_root.is_dir() {
        return Err(LoadError::NotADirectory(content_root.to_path_buf()));
    }

    let mut paths = Vec::new();
    walk_directory(content_root, Path::new(""), options, &mut paths)?;
    Ok(paths)
}

/// Recursively walk a directory and collect document paths.
fn walk_directory(
    dir: &Path,
    relative_path: &Path,
    options: &LoadOptions,
    paths: &mut Vec<PathBuf>,
) -> Result<(), LoadError> {
    let read_dir_err = |source| LoadError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = std::fs::read_dir(dir)
        .map_err(read_dir_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_dir_err)?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let file_name = entry.file_name();
        let file_name_str = file_name.to_string_lossy();

        // Skip hidden files and directories
        if file_name_str.starts_with('.') {
            continue;
        }

        let item_relative_path = relative_path.join(&file_name);

        if path.is_dir() {
            if matches!(file_name_str.as_ref(), "node_modules" | "target")
                || options.is_skipped(&path)
            {
                continue;
            }
            walk_directory(&path, &item_relative_path, options, paths)?;
        } else if path.is_file() && options.is_document(&path) {
            paths.push(item_relative_path);
        }
    }

    Ok(())
}

/// Read and parse a single document.
pub fn load_document(content_root: &Path, relative_path: &Path) -> Result<Document, LoadError> {
    let full_path = content_root.join(relative_path);
    let raw = std::fs::read_to_string(&full_path).map_err(|source| LoadError::Read {
        path: relative_path.to_path_buf(),
        source,
    })?;

    let parsed = parse_front_matter(&raw).map_err(|source| LoadError::Parse {
        path: relative_path.to_path_buf(),
        source,
    })?;

    let date = match &parsed.front_matter.date {
        Some(value) => parse_date(value).ok_or_else(|| LoadError::InvalidDate {
            path: relative_path.to_path_buf(),
            value: value.clone(),
        })?,
        None => modified_time(&full_path),
    };

    tracing::debug!(path = %display_path(relative_path), "loaded document");

    Ok(Document::new(
        relative_path.to_path_buf(),
        parsed.front_matter,
        parsed.content,
        date,
    ))
}

/// File modification time, or the Unix epoch when unavailable.
fn modified_time(path: &Path) -> DateTime<Utc> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
