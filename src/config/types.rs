//! Configuration type definitions.
//!
//! This module contains all the data structures used in folio configuration files.
//! These types are pure data - no I/O or complex logic.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// =============================================================================
// Root config
// =============================================================================

/// Site configuration, usually loaded from `folio.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    /// Directory containing source documents
    #[serde(default = "default_content_root")]
    pub content_root: PathBuf,
    /// Directory the site is written to
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    /// Directory containing layout templates
    #[serde(default = "default_layouts_dir")]
    pub layouts_dir: PathBuf,
    /// Layout applied to documents that don't name one
    #[serde(default)]
    pub default_layout: Option<String>,
    /// File extensions (without dot) treated as documents
    #[serde(default = "default_template_formats")]
    pub template_formats: Vec<String>,
    /// Paths copied verbatim into the output root
    #[serde(default)]
    pub passthrough: Vec<PassthroughEntry>,
    /// Number of build workers (defaults to available parallelism)
    #[serde(default)]
    pub worker_count: Option<usize>,
    /// Remove the output root before writing
    #[serde(default)]
    pub clean: bool,
    /// Explicit collections; one collection per tag is built when empty
    #[serde(default)]
    pub collections: Vec<CollectionConfig>,
    /// Additional names for registered filters (`alias: filter`)
    #[serde(default)]
    pub filter_aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub markdown: MarkdownConfig,
    /// RSS feed generation
    #[serde(default)]
    pub feed: Option<FeedConfig>,
}

fn default_content_root() -> PathBuf {
    PathBuf::from("content")
}

fn default_output_root() -> PathBuf {
    PathBuf::from("_site")
}

fn default_layouts_dir() -> PathBuf {
    PathBuf::from("_layouts")
}

fn default_template_formats() -> Vec<String> {
    vec!["md".to_string(), "njk".to_string(), "html".to_string()]
}

impl Config {
    /// A minimal config for the given site name, with every other field defaulted.
    pub fn with_site_name(name: impl Into<String>) -> Self {
        Self {
            site: SiteConfig {
                name: name.into(),
                url: None,
                description: None,
                author: None,
            },
            content_root: default_content_root(),
            output_root: default_output_root(),
            layouts_dir: default_layouts_dir(),
            default_layout: None,
            template_formats: default_template_formats(),
            passthrough: Vec::new(),
            worker_count: None,
            clean: false,
            collections: Vec::new(),
            filter_aliases: BTreeMap::new(),
            markdown: MarkdownConfig::default(),
            feed: None,
        }
    }

    /// Worker count, falling back to the machine's available parallelism.
    pub fn effective_worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Resolve a possibly relative path against a base directory.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

// =============================================================================
// Site configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    /// Absolute base URL, used for feed links
    pub url: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
}

// =============================================================================
// Passthrough configuration
// =============================================================================

/// A path copied verbatim into the output.
///
/// YAML formats:
/// ```yaml
/// passthrough:
///   - img                 # copied to <output>/img
///   - src: static/css
///     dst: css            # copied to <output>/css
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PassthroughEntry {
    Path(PathBuf),
    Mapped {
        src: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dst: Option<PathBuf>,
    },
}

impl PassthroughEntry {
    pub fn src(&self) -> &Path {
        match self {
            PassthroughEntry::Path(src) => src,
            PassthroughEntry::Mapped { src, .. } => src,
        }
    }

    /// Destination relative to the output root.
    ///
    /// Defaults to the source path with any root or parent components dropped.
    pub fn dst(&self) -> PathBuf {
        let explicit = match self {
            PassthroughEntry::Path(_) => None,
            PassthroughEntry::Mapped { dst, .. } => dst.as_ref(),
        };
        let path = explicit.map(PathBuf::as_path).unwrap_or_else(|| self.src());
        path.components()
            .filter(|c| matches!(c, std::path::Component::Normal(_)))
            .collect()
    }
}

// =============================================================================
// Collection configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Name exposed to templates as `collections.<name>`
    pub name: String,
    /// Tag a document must carry to be included
    pub tag: String,
    #[serde(default)]
    pub sort: SortOrder,
}

/// Ordering applied after filtering. Sorting is stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Discovery order
    #[default]
    Source,
    /// Oldest first
    Date,
    /// Newest first
    DateDesc,
}

// =============================================================================
// Markdown configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// Extensions to enable for markdown processing
    #[serde(default = "default_markdown_extensions")]
    pub extensions: Vec<String>,
    /// Render single newlines as `<br>`
    #[serde(default)]
    pub hard_breaks: bool,
    /// Highlight fenced code blocks
    #[serde(default = "default_highlight")]
    pub highlight: bool,
    #[serde(default = "default_highlight_theme")]
    pub highlight_theme: String,
    /// Where to write the theme's stylesheet, relative to the output root
    #[serde(default)]
    pub highlight_css: Option<String>,
}

fn default_markdown_extensions() -> Vec<String> {
    vec![
        "definition_lists".to_string(),
        "footnotes".to_string(),
        "gfm".to_string(),
        "heading_attributes".to_string(),
        "strikethrough".to_string(),
        "tables".to_string(),
        "tasklists".to_string(),
    ]
}

fn default_highlight() -> bool {
    true
}

fn default_highlight_theme() -> String {
    "github-dark".to_string()
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            extensions: default_markdown_extensions(),
            hard_breaks: false,
            highlight: default_highlight(),
            highlight_theme: default_highlight_theme(),
            highlight_css: None,
        }
    }
}

// =============================================================================
// Feed configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Output path of the feed, relative to the output root
    #[serde(default = "default_feed_path")]
    pub path: String,
    /// Collection whose entries become feed items
    pub collection: String,
    /// Maximum number of items (newest first)
    #[serde(default = "default_feed_limit")]
    pub limit: usize,
    /// Channel title (defaults to the site name)
    pub title: Option<String>,
}

fn default_feed_path() -> String {
    "feed.xml".to_string()
}

fn default_feed_limit() -> usize {
    10
}
