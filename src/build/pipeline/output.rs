//! Rendered output files, collision detection, pruning and writing.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use super::PipelineError;

/// A file produced by the pipeline, not yet written.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    /// Path relative to the output root
    pub path: PathBuf,
    pub contents: Vec<u8>,
    /// What produced the file (a source path or a stage name)
    pub source: String,
}

impl OutputFile {
    /// The `(path, source)` claim this file makes on the output tree.
    pub fn claim(&self) -> (&Path, &str) {
        (self.path.as_path(), self.source.as_str())
    }
}

/// Find output paths claimed by more than one source.
///
/// Claims are `(path relative to the output root, source)` pairs from every
/// writer of the build. Each duplicate is reported against the first source
/// that claimed the path.
pub fn detect_collisions<'a>(
    claims: impl IntoIterator<Item = (&'a Path, &'a str)>,
) -> Vec<PipelineError> {
    let mut claimed: BTreeMap<&Path, &str> = BTreeMap::new();
    let mut errors = Vec::new();
    for (path, source) in claims {
        if let Some(first) = claimed.get(path) {
            errors.push(PipelineError::PathCollision {
                path: path.to_path_buf(),
                first: first.to_string(),
                second: source.to_string(),
            });
        } else {
            claimed.insert(path, source);
        }
    }
    errors
}

/// Delete files under `output_root` that are not in `keep`, then any
/// directories left empty. Returns the number of files removed.
pub fn prune_stale(output_root: &Path, keep: &BTreeSet<&Path>) -> std::io::Result<usize> {
    fn walk(dir: &Path, root: &Path, keep: &BTreeSet<&Path>) -> std::io::Result<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                removed += walk(&path, root, keep)?;
                if std::fs::read_dir(&path)?.next().is_none() {
                    std::fs::remove_dir(&path)?;
                }
            } else {
                let relative = path.strip_prefix(root).unwrap_or(&path);
                if !keep.contains(relative) {
                    std::fs::remove_file(&path)?;
                    tracing::debug!(path = %relative.display(), "removed stale output");
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    if !output_root.is_dir() {
        return Ok(0);
    }
    walk(output_root, output_root, keep)
}

/// Write outputs under `output_root`, creating directories as needed.
///
/// Every file is attempted; failures are returned together.
pub fn write_outputs(
    outputs: &[OutputFile],
    output_root: &Path,
    pool: &rayon::ThreadPool,
) -> Vec<PipelineError> {
    pool.install(|| {
        outputs
            .par_iter()
            .filter_map(|output| write_output(output, output_root).err())
            .collect()
    })
}

fn write_output(output: &OutputFile, output_root: &Path) -> Result<(), PipelineError> {
    let path = output_root.join(&output.path);
    let write = |path: &Path| -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &output.contents)
    };
    write(&path).map_err(|source| PipelineError::Write { path, source })?;
    tracing::debug!(path = %output.path.display(), source = %output.source, "wrote output");
    Ok(())
}
