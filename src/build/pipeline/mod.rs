//! Build pipeline for document processing.
//!
//! Every document passes through the same sequence of stages:
//! 1. Template body (variables, filters, collections in the body)
//! 2. Markdown rendering (to HTML with TOC, for markdown formats)
//! 3. Layout (wrap the content in the document's layout template)
//!
//! Documents are independent of each other, so stages run per document on
//! the build's worker pool. Finalize stages run once afterwards, see every
//! rendered content fragment, and may add extra output files (the RSS
//! feed). Nothing is written here; outputs are
//! collected, checked for collisions and then written by the builder.

mod context;
mod document;
mod error;
mod output;
mod stages;

pub use context::PipelineContext;
pub use document::ProcessingDocument;
pub use error::PipelineError;
pub use output::{OutputFile, detect_collisions, prune_stale, write_outputs};

use std::collections::BTreeMap;

use rayon::prelude::*;

use super::document::{Document, display_path};
use stages::{LayoutStage, MarkdownStage, TemplateBodyStage};

/// A stage in the document processing pipeline.
///
/// Stages transform one document at a time and may run on several
/// workers at once, so they only get shared access to the context.
pub trait Stage: Send + Sync {
    /// Unique name for this stage (used in error reports).
    fn name(&self) -> &'static str;

    /// Transform the document in place.
    fn process(
        &self,
        doc: &mut ProcessingDocument,
        ctx: &PipelineContext,
    ) -> Result<(), PipelineError>;
}

/// Rendered content fragments (before layouts), keyed by source path.
pub type RenderedContent = BTreeMap<String, String>;

/// A stage that runs once after all documents are rendered.
pub trait FinalizeStage: Send + Sync {
    /// Unique name for this stage.
    fn name(&self) -> &'static str;

    /// Produce additional output files.
    fn finalize(
        &self,
        ctx: &PipelineContext,
        rendered: &RenderedContent,
    ) -> Result<Vec<OutputFile>, PipelineError>;
}

/// Result of rendering a set of documents.
#[derive(Debug, Default)]
pub struct RenderOutcome {
    /// Files ready to be written, in document order followed by finalize outputs
    pub outputs: Vec<OutputFile>,
    /// Every error raised by any document or finalize stage
    pub errors: Vec<PipelineError>,
    /// Documents rendered without an output file (`permalink: false`)
    pub unwritten: usize,
}

/// The document processing pipeline.
///
/// The default pipeline is: template-body → markdown → layout.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    finalize_stages: Vec<Box<dyn FinalizeStage>>,
}

impl Pipeline {
    /// Create an empty pipeline with no stages.
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            finalize_stages: Vec::new(),
        }
    }

    /// Create the default pipeline with standard stages.
    pub fn default_pipeline() -> Self {
        let mut pipeline = Self::new();
        pipeline.add_stage(TemplateBodyStage);
        pipeline.add_stage(MarkdownStage);
        pipeline.add_stage(LayoutStage);
        pipeline
    }

    /// Add a stage to the end of the pipeline.
    pub fn add_stage<S: Stage + 'static>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Add a finalize stage (runs after all documents are rendered).
    pub fn add_finalize_stage<S: FinalizeStage + 'static>(&mut self, stage: S) -> &mut Self {
        self.finalize_stages.push(Box::new(stage));
        self
    }

    /// Get the names of all stages in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    fn process<'d>(
        &self,
        doc: &'d Document,
        ctx: &PipelineContext,
    ) -> Result<ProcessingDocument<'d>, PipelineError> {
        let mut processing = ProcessingDocument::new(doc);
        for stage in &self.stages {
            stage
                .process(&mut processing, ctx)
                .map_err(|e| PipelineError::Document {
                    path: display_path(&doc.source_path),
                    stage: stage.name(),
                    source: Box::new(e),
                })?;
        }
        Ok(processing)
    }

    /// Run every stage on a single document.
    ///
    /// Returns `None` for documents that are rendered but not written.
    pub fn render_document(
        &self,
        doc: &Document,
        ctx: &PipelineContext,
    ) -> Result<Option<OutputFile>, PipelineError> {
        Ok(self.process(doc, ctx)?.into_output(ctx))
    }

    /// Render documents in parallel on `pool`, then run the finalize stages.
    ///
    /// Errors don't stop other documents; all of them are collected.
    pub fn run(
        &self,
        docs: &[&Document],
        ctx: &PipelineContext,
        pool: &rayon::ThreadPool,
    ) -> RenderOutcome {
        let results: Vec<_> = pool.install(|| {
            docs.par_iter()
                .map(|doc| {
                    self.process(doc, ctx).map(|processing| {
                        let content = processing.content.clone();
                        (content, processing.into_output(ctx))
                    })
                })
                .collect()
        });

        let mut outcome = RenderOutcome::default();
        let mut rendered = RenderedContent::new();
        for (doc, result) in docs.iter().zip(results) {
            match result {
                Ok((content, output)) => {
                    rendered.insert(display_path(&doc.source_path), content);
                    match output {
                        Some(output) => outcome.outputs.push(output),
                        None => outcome.unwritten += 1,
                    }
                }
                Err(e) => outcome.errors.push(e),
            }
        }

        for stage in &self.finalize_stages {
            match stage.finalize(ctx, &rendered) {
                Ok(outputs) => outcome.outputs.extend(outputs),
                Err(e) => outcome.errors.push(e),
            }
        }

        outcome
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::default_pipeline()
    }
}
