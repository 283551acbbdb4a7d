//! Configuration loading and types for folio.
//!
//! This module handles all aspects of configuration:
//! - Type definitions for config structures (`types`)
//! - Loading configs from files and the environment (`load`)

mod load;
mod types;

use std::path::{Component, Path, PathBuf};

pub use types::{
    CollectionConfig, Config, FeedConfig, MarkdownConfig, PassthroughEntry, SiteConfig,
    SortOrder, resolve_against,
};

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] config::ConfigError),

    #[error("failed to encode config file path as a unicode string: {}", .0.display())]
    EncodePath(std::path::PathBuf),

    #[error("failed to get current working directory: {0}")]
    CwdFailure(std::io::Error),

    #[error("config file not found: {}", .0.display())]
    NotFound(std::path::PathBuf),

    #[error("{0}")]
    Validation(String),
}

impl Config {
    /// Check invariants that serde can't express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == Some(0) {
            return Err(ConfigError::Validation(
                "invalid config: 'worker_count' must be a positive integer".to_string(),
            ));
        }
        if self.template_formats.is_empty() {
            return Err(ConfigError::Validation(
                "invalid config: 'template_formats' must list at least one extension".to_string(),
            ));
        }
        if self.site.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "invalid config: 'site.name' must not be empty".to_string(),
            ));
        }

        self.validate_output_root()?;

        let mut names = std::collections::HashSet::new();
        for collection in &self.collections {
            if collection.name == "all" {
                return Err(ConfigError::Validation(
                    "invalid config: collection name 'all' is reserved".to_string(),
                ));
            }
            if !names.insert(collection.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "invalid config: collection '{}' is defined more than once",
                    collection.name
                )));
            }
        }

        if let Some(feed) = &self.feed
            && feed.limit == 0
        {
            return Err(ConfigError::Validation(
                "invalid config: 'feed.limit' must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// The output root is pruned on every build, so it must not contain the
    /// project, the content root or the layouts.
    fn validate_output_root(&self) -> Result<(), ConfigError> {
        let output = without_cur_dir(&self.output_root);
        let escapes_project = output
            .components()
            .all(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        if escapes_project {
            return Err(ConfigError::Validation(format!(
                "invalid config: 'output_root' ({}) would contain the project",
                self.output_root.display()
            )));
        }

        for (field, path) in [("content_root", &self.content_root), ("layouts_dir", &self.layouts_dir)] {
            if without_cur_dir(path).starts_with(&output) {
                return Err(ConfigError::Validation(format!(
                    "invalid config: 'output_root' ({}) contains '{field}'",
                    self.output_root.display()
                )));
            }
        }
        Ok(())
    }
}

fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
