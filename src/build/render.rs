use std::path::Path;

use serde::Serialize;
use tera::{Context, Tera};

use super::document::{PageSummary, display_path};
use super::filters::FilterRegistry;
use super::markdown::TocEntry;
use super::nav::NavEntry;
use crate::config::SiteConfig;

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("template error: {}", describe(.0))]
    Template(#[from] tera::Error),

    #[error("layout not found: {0}")]
    LayoutNotFound(String),

    #[error("no template registered for {0}")]
    BodyNotRegistered(String),
}

/// Tera reports the useful part of an error in its source chain.
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// The template engine used by the pipeline.
///
/// Bodies are registered up front so rendering only needs shared access
/// and can run on several workers at once.
pub trait TemplateEngine: Send + Sync {
    /// Process a document body (variables, filters, control flow).
    fn render_body(&self, source_path: &Path, context: &PageContext) -> Result<String, RenderError>;

    /// Wrap rendered content in a layout. Layouts chain through template inheritance.
    fn render_layout(&self, layout: &str, context: &PageContext) -> Result<String, RenderError>;
}

/// The template renderer, wrapping Tera.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Create a renderer loading layouts from `layouts_dir` and exposing `filters`.
    ///
    /// A missing layouts directory is not an error; documents naming a
    /// layout will fail to render instead.
    pub fn new(layouts_dir: &Path, filters: &FilterRegistry) -> Result<Self, RenderError> {
        let mut tera = if layouts_dir.is_dir() {
            let glob = layouts_dir.join("**/*");
            Tera::new(&glob.to_string_lossy())?
        } else {
            Tera::default()
        };
        filters.install(&mut tera);
        Ok(Self { tera })
    }

    /// Register a document body as a template.
    pub fn add_body(&mut self, source_path: &Path, body: &str) -> Result<(), RenderError> {
        self.tera
            .add_raw_template(&body_template_name(source_path), body)?;
        Ok(())
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Layouts may be named without their `.html` extension.
    fn resolve_layout(&self, layout: &str) -> Option<String> {
        if self.has_template(layout) {
            return Some(layout.to_string());
        }
        let with_ext = format!("{layout}.html");
        self.has_template(&with_ext).then_some(with_ext)
    }
}

impl TemplateEngine for Renderer {
    fn render_body(&self, source_path: &Path, context: &PageContext) -> Result<String, RenderError> {
        let name = body_template_name(source_path);
        if !self.has_template(&name) {
            return Err(RenderError::BodyNotRegistered(display_path(source_path)));
        }
        let context = Context::from_serialize(context)?;
        Ok(self.tera.render(&name, &context)?)
    }

    fn render_layout(&self, layout: &str, context: &PageContext) -> Result<String, RenderError> {
        let name = self
            .resolve_layout(layout)
            .ok_or_else(|| RenderError::LayoutNotFound(layout.to_string()))?;
        let context = Context::from_serialize(context)?;
        Ok(self.tera.render(&name, &context)?)
    }
}

fn body_template_name(source_path: &Path) -> String {
    format!("__body__/{}", display_path(source_path))
}

/// Site-level information (`site.*` in templates).
#[derive(Debug, Clone, Serialize)]
pub struct SiteContext {
    pub name: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
}

impl From<&SiteConfig> for SiteContext {
    fn from(site: &SiteConfig) -> Self {
        Self {
            name: site.name.clone(),
            url: site.url.clone(),
            description: site.description.clone(),
            author: site.author.clone(),
        }
    }
}

/// Everything a template sees while rendering one document.
#[derive(Debug, Serialize)]
pub struct PageContext<'a> {
    pub site: &'a SiteContext,
    pub page: &'a PageSummary,
    /// `collections.<name>`: lists of page summaries
    pub collections: &'a serde_json::Value,
    pub nav: &'a [NavEntry],
    pub toc: &'a [TocEntry],
    /// Rendered HTML; empty while the body itself is processed
    pub content: &'a str,
    pub production: bool,
}
