//! Layout stage.

use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};

/// Stage that wraps rendered content in the document's layout.
///
/// The layout comes from front matter, falling back to the configured
/// default. Documents with neither are written as bare fragments.
/// Layouts chain through template inheritance (`{% extends %}`).
pub struct LayoutStage;

impl Stage for LayoutStage {
    fn name(&self) -> &'static str {
        "layout"
    }

    fn process(
        &self,
        doc: &mut ProcessingDocument,
        ctx: &PipelineContext,
    ) -> Result<(), PipelineError> {
        let Some(layout) = doc
            .doc
            .front_matter
            .layout
            .as_deref()
            .or(ctx.default_layout)
        else {
            return Ok(());
        };

        let html = ctx
            .engine
            .render_layout(layout, &doc.page_context(ctx, &doc.content))?;
        doc.output = Some(html);
        Ok(())
    }
}
