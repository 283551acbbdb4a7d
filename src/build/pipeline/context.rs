//! Pipeline context for sharing state across stages.

use std::path::PathBuf;

use crate::build::collection::Collections;
use crate::build::format::{FormatContext, FormatRegistry};
use crate::build::highlight::SyntaxHighlighter;
use crate::build::nav::NavEntry;
use crate::build::render::{SiteContext, TemplateEngine};
use crate::config::MarkdownConfig;

/// Shared, read-only context for pipeline stages.
///
/// Stages run on several workers at once, so everything here is borrowed
/// immutably for the duration of the render phase.
pub struct PipelineContext<'a> {
    // === Site-level data ===
    /// Site metadata (`site.*`)
    pub site: &'a SiteContext,

    /// Collections as template data (`collections.*`)
    pub collections: &'a serde_json::Value,

    /// The collections themselves, for finalize stages
    pub collection_set: Option<&'a Collections<'a>>,

    /// Navigation tree (`nav`)
    pub nav: &'a [NavEntry],

    // === Services ===
    /// Template engine for bodies and layouts
    pub engine: &'a dyn TemplateEngine,

    /// Content format registry
    pub formats: &'a FormatRegistry,

    /// Syntax highlighter for code blocks
    pub highlighter: &'a SyntaxHighlighter,

    /// Markdown processing configuration
    pub markdown_config: &'a MarkdownConfig,

    // === Settings ===
    /// Layout for documents that don't name one
    pub default_layout: Option<&'a str>,

    pub production: bool,

    /// Maps a document URL to its file path relative to the output root
    pub output_path: fn(&str) -> PathBuf,
}

impl<'a> PipelineContext<'a> {
    pub fn format_context(&self) -> FormatContext<'a> {
        FormatContext {
            highlighter: self.highlighter,
            markdown_config: self.markdown_config,
        }
    }
}
