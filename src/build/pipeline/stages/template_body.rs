//! Template processing of document bodies.

use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};

/// Stage that runs the template engine over the raw body.
///
/// Content authors can use filters, `page`, `site`, `collections` and
/// control flow directly in a document:
///
/// ```text
/// {% for post in collections.posts | head(n=3) %}
/// - [{{ post.title }}]({{ post.url }}), {{ post.date | readableDate }}
/// {% endfor %}
/// ```
pub struct TemplateBodyStage;

impl Stage for TemplateBodyStage {
    fn name(&self) -> &'static str {
        "template-body"
    }

    fn process(
        &self,
        doc: &mut ProcessingDocument,
        ctx: &PipelineContext,
    ) -> Result<(), PipelineError> {
        let processed = ctx
            .engine
            .render_body(&doc.doc.source_path, &doc.page_context(ctx, ""))?;
        doc.content = processed;
        Ok(())
    }
}
