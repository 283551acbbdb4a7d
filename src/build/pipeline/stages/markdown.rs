//! Content rendering stage.
//!
//! Renders document content to HTML using the format registered for the
//! document's extension.

use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};

/// Stage that renders content to HTML using the format registry.
///
/// After this stage, `doc.content` contains HTML and `doc.toc` contains
/// the extracted headings. HTML documents pass through unchanged.
pub struct MarkdownStage;

impl Stage for MarkdownStage {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn process(
        &self,
        doc: &mut ProcessingDocument,
        ctx: &PipelineContext,
    ) -> Result<(), PipelineError> {
        let format = ctx.formats.for_path(&doc.doc.source_path).ok_or_else(|| {
            PipelineError::UnsupportedFormat(doc.doc.extension().unwrap_or_default())
        })?;

        let output = format.render(&doc.content, &ctx.format_context())?;
        doc.content = output.html;
        doc.toc = output.toc;
        Ok(())
    }
}
