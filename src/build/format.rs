//! Pluggable content format system.
//!
//! Each template format (file extension) listed in the config must map to a
//! registered [`ContentFormat`]. A format turns the template-processed body
//! of a document into an HTML fragment; layouts are applied afterwards.

use std::path::Path;

use super::highlight::SyntaxHighlighter;
use super::markdown::{MarkdownError, TocEntry, render_markdown};
use crate::config::MarkdownConfig;

/// Output from rendering a content format.
#[derive(Debug, Clone)]
pub struct FormatOutput {
    /// The rendered HTML content.
    pub html: String,
    /// Table of contents extracted from headings.
    pub toc: Vec<TocEntry>,
}

/// Context available during format rendering.
pub struct FormatContext<'a> {
    pub highlighter: &'a SyntaxHighlighter,
    pub markdown_config: &'a MarkdownConfig,
}

#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("markdown error: {0}")]
    Markdown(#[from] MarkdownError),
}

/// A content format that can render document bodies to HTML.
pub trait ContentFormat: Send + Sync {
    /// The name of this format (e.g., "markdown", "html").
    fn name(&self) -> &'static str;

    /// File extensions this format handles (lowercase, without dot).
    fn extensions(&self) -> &[&'static str];

    /// Render content to HTML.
    fn render(&self, content: &str, ctx: &FormatContext) -> Result<FormatOutput, FormatError>;
}

/// Markdown, through pulldown-cmark.
pub struct MarkdownFormat;

impl ContentFormat for MarkdownFormat {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn extensions(&self) -> &[&'static str] {
        &["md", "markdown"]
    }

    fn render(&self, content: &str, ctx: &FormatContext) -> Result<FormatOutput, FormatError> {
        let output = render_markdown(content, ctx.highlighter, ctx.markdown_config)?;
        Ok(FormatOutput {
            html: output.html,
            toc: output.toc,
        })
    }
}

/// HTML documents; the body is already HTML.
pub struct HtmlFormat;

impl ContentFormat for HtmlFormat {
    fn name(&self) -> &'static str {
        "html"
    }

    fn extensions(&self) -> &[&'static str] {
        &["html", "htm"]
    }

    fn render(&self, content: &str, _ctx: &FormatContext) -> Result<FormatOutput, FormatError> {
        Ok(FormatOutput {
            html: content.to_string(),
            toc: Vec::new(),
        })
    }
}

/// Nunjucks-style template pages (`.njk`). The template-body stage already
/// expanded them, so the result is used as is.
pub struct TemplateFormat;

impl ContentFormat for TemplateFormat {
    fn name(&self) -> &'static str {
        "template"
    }

    fn extensions(&self) -> &[&'static str] {
        &["njk"]
    }

    fn render(&self, content: &str, _ctx: &FormatContext) -> Result<FormatOutput, FormatError> {
        Ok(FormatOutput {
            html: content.to_string(),
            toc: Vec::new(),
        })
    }
}

/// Registry of content formats, looked up by file extension.
pub struct FormatRegistry {
    formats: Vec<Box<dyn ContentFormat>>,
}

impl FormatRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Create a registry with the default formats (Markdown, HTML, templates).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(MarkdownFormat);
        registry.register(HtmlFormat);
        registry.register(TemplateFormat);
        registry
    }

    /// Register a new format.
    ///
    /// Later registrations take precedence for overlapping extensions.
    pub fn register<F: ContentFormat + 'static>(&mut self, format: F) {
        self.formats.push(Box::new(format));
    }

    /// Find the format for a file extension (case-insensitive).
    pub fn for_extension(&self, ext: &str) -> Option<&dyn ContentFormat> {
        let ext_lower = ext.to_lowercase();
        self.formats
            .iter()
            .rev()
            .find(|f| f.extensions().iter().any(|e| *e == ext_lower))
            .map(|f| f.as_ref())
    }

    /// Find the format for a file path based on its extension.
    pub fn for_path(&self, path: &Path) -> Option<&dyn ContentFormat> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.for_extension(ext))
    }

    /// Extensions from `requested` that no registered format handles.
    pub fn unsupported<'a>(&self, requested: &'a [String]) -> Vec<&'a str> {
        requested
            .iter()
            .filter(|ext| self.for_extension(ext).is_none())
            .map(String::as_str)
            .collect()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_default_formats() {
        let registry = FormatRegistry::with_defaults();

        assert_eq!(registry.for_extension("md").unwrap().name(), "markdown");
        assert_eq!(registry.for_extension("MD").unwrap().name(), "markdown");
        assert_eq!(registry.for_extension("html").unwrap().name(), "html");
        assert_eq!(registry.for_extension("njk").unwrap().name(), "template");
        assert!(registry.for_extension("liquid").is_none());
        assert_eq!(
            registry.for_path(Path::new("posts/a.markdown")).unwrap().name(),
            "markdown"
        );
    }

    #[test]
    fn test_unsupported_formats() {
        let registry = FormatRegistry::with_defaults();
        let requested = vec![
            "md".to_string(),
            "njk".to_string(),
            "liquid".to_string(),
            "HTM".to_string(),
        ];
        assert_eq!(registry.unsupported(&requested), vec!["liquid"]);
    }

    #[test]
    fn test_html_format_passes_through() {
        let ctx = FormatContext {
            highlighter: &SyntaxHighlighter::disabled(),
            markdown_config: &MarkdownConfig::default(),
        };
        let output = HtmlFormat.render("<p>hi</p>", &ctx).unwrap();
        assert_eq!(output.html, "<p>hi</p>");
    }

    struct MockFormat;
    impl ContentFormat for MockFormat {
        fn name(&self) -> &'static str {
            "mock"
        }
        fn extensions(&self) -> &[&'static str] {
            &["html"]
        }
        fn render(&self, _content: &str, _ctx: &FormatContext) -> Result<FormatOutput, FormatError> {
            Ok(FormatOutput {
                html: "<p>mock</p>".to_string(),
                toc: vec![],
            })
        }
    }

    #[test]
    fn test_later_registration_wins() {
        let mut registry = FormatRegistry::with_defaults();
        registry.register(MockFormat);
        assert_eq!(registry.for_extension("html").unwrap().name(), "mock");
    }
}
