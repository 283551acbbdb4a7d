//! Passthrough copies.
//!
//! Files and directories listed under `passthrough` are copied verbatim
//! into the output root. Entries are first expanded into single files so
//! the builder can check their destinations for collisions. A failing
//! entry never stops the others; its error is collected in the report.

use std::path::{Path, PathBuf};

use super::document::display_path;
use crate::config::PassthroughEntry;

#[derive(thiserror::Error, Debug)]
pub enum CopyError {
    #[error("passthrough path does not exist: {}", src.display())]
    NotFound { src: PathBuf },

    #[error("failed to copy passthrough path {}: {source}", src.display())]
    Io {
        src: PathBuf,
        source: std::io::Error,
    },
}

impl CopyError {
    /// The configured source path this error refers to.
    pub fn src(&self) -> &Path {
        match self {
            CopyError::NotFound { src } | CopyError::Io { src, .. } => src,
        }
    }
}

/// One file a passthrough entry copies.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCopy {
    /// Resolved source file
    pub from: PathBuf,
    /// Destination relative to the output root
    pub to: PathBuf,
    /// The configured entry, as written in the config
    pub source: String,
}

/// Every file the passthrough entries will copy, expanded before writing so
/// destinations can be checked against rendered outputs.
#[derive(Debug, Default)]
pub struct CopyPlan {
    pub files: Vec<PlannedCopy>,
    /// Entries that could not be expanded
    pub errors: Vec<CopyError>,
}

/// Result of copying every passthrough entry.
#[derive(Debug, Default)]
pub struct PassthroughReport {
    /// Number of files copied
    pub files: usize,
    pub errors: Vec<CopyError>,
}

/// Expand each entry, resolved against `project_root`, into single files.
pub fn plan(entries: &[PassthroughEntry], project_root: &Path) -> CopyPlan {
    let mut plan = CopyPlan::default();

    for entry in entries {
        let src = crate::config::resolve_against(project_root, entry.src());
        if !src.exists() {
            tracing::warn!(src = %entry.src().display(), "passthrough path does not exist");
            plan.errors.push(CopyError::NotFound {
                src: entry.src().to_path_buf(),
            });
            continue;
        }

        let source = display_path(entry.src());
        let mut files = Vec::new();
        match expand(&src, &entry.dst(), &source, &mut files) {
            Ok(()) => plan.files.extend(files),
            Err(e) => plan.errors.push(CopyError::Io {
                src: entry.src().to_path_buf(),
                source: e,
            }),
        }
    }

    plan
}

/// Walk a file or directory tree in name order.
fn expand(src: &Path, dst: &Path, source: &str, files: &mut Vec<PlannedCopy>) -> std::io::Result<()> {
    if src.is_file() {
        files.push(PlannedCopy {
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
            source: source.to_string(),
        });
        return Ok(());
    }

    let mut entries = std::fs::read_dir(src)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        expand(&entry.path(), &dst.join(entry.file_name()), source, files)?;
    }
    Ok(())
}

/// Copy every planned file into `output_root`.
///
/// Expansion errors carry over into the report; a failing file never stops
/// the others.
pub fn copy(plan: CopyPlan, output_root: &Path) -> PassthroughReport {
    let mut report = PassthroughReport {
        files: 0,
        errors: plan.errors,
    };

    for file in &plan.files {
        let dst = output_root.join(&file.to);
        let result = dst
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| std::fs::copy(&file.from, &dst));
        match result {
            Ok(_) => report.files += 1,
            Err(source) => report.errors.push(CopyError::Io {
                src: PathBuf::from(&file.source),
                source,
            }),
        }
    }

    tracing::debug!(files = report.files, errors = report.errors.len(), "copied passthrough");
    report
}
