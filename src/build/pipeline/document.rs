//! Document state for pipeline processing.

use crate::build::document::{Document, PageSummary, display_path};
use crate::build::markdown::TocEntry;
use crate::build::render::PageContext;

use super::{OutputFile, PipelineContext};

/// A document being processed through the pipeline.
///
/// Wraps the loaded `Document` with state that evolves through the stages:
///
/// 1. Initially: `content` = raw body, `toc` = empty
/// 2. After template-body: `content` = body with template syntax expanded
/// 3. After markdown: `content` = HTML fragment, `toc` = populated
/// 4. After layout: `output` = final page HTML (when a layout applies)
#[derive(Debug)]
pub struct ProcessingDocument<'a> {
    pub doc: &'a Document,

    /// `page.*` as seen by templates
    pub page: PageSummary,

    pub content: String,

    pub toc: Vec<TocEntry>,

    pub output: Option<String>,
}

impl<'a> ProcessingDocument<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            page: doc.summary(),
            content: doc.body.clone(),
            toc: Vec::new(),
            output: None,
        }
    }

    /// Template context for this document with `content` as the page content.
    pub fn page_context<'c>(&'c self, ctx: &'c PipelineContext, content: &'c str) -> PageContext<'c> {
        PageContext {
            site: ctx.site,
            page: &self.page,
            collections: ctx.collections,
            nav: ctx.nav,
            toc: &self.toc,
            content,
            production: ctx.production,
        }
    }

    /// The file to write, or `None` for documents without a URL.
    pub fn into_output(self, ctx: &PipelineContext) -> Option<OutputFile> {
        let url = self.doc.url.as_deref()?;
        Some(OutputFile {
            path: (ctx.output_path)(url),
            contents: self.output.unwrap_or(self.content).into_bytes(),
            source: display_path(&self.doc.source_path),
        })
    }
}
