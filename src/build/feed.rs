//! RSS feed generation.
//!
//! Runs as a finalize stage over one collection: newest first, limited to
//! the configured number of items. The channel's build date is the newest
//! item's date, so an unchanged site produces an identical feed. Each item
//! carries the document's rendered content (without its layout).

use rss::{CategoryBuilder, ChannelBuilder, GuidBuilder, Item, ItemBuilder};

use super::document::{Document, display_path};
use super::paths::{absolute_url, url_to_relative_path};
use super::pipeline::{FinalizeStage, OutputFile, PipelineContext, PipelineError, RenderedContent};
use crate::config::FeedConfig;

pub struct FeedStage {
    config: FeedConfig,
}

impl FeedStage {
    pub fn new(config: FeedConfig) -> Self {
        Self { config }
    }

    /// Feed entries: written documents, newest first, up to the limit.
    fn entries<'a>(&self, ctx: &PipelineContext<'a>) -> Result<Vec<&'a Document>, PipelineError> {
        let collection = ctx
            .collection_set
            .and_then(|set| set.get(&self.config.collection))
            .ok_or_else(|| {
                PipelineError::stage(
                    self.name(),
                    format!("unknown collection '{}'", self.config.collection),
                )
            })?;

        if collection.is_empty() {
            tracing::warn!(collection = %collection.name, "feed collection is empty");
        }

        let mut entries: Vec<&Document> = collection.iter().filter(|doc| doc.url.is_some()).collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries.truncate(self.config.limit);
        Ok(entries)
    }
}

impl FinalizeStage for FeedStage {
    fn name(&self) -> &'static str {
        "feed"
    }

    fn finalize(
        &self,
        ctx: &PipelineContext,
        rendered: &RenderedContent,
    ) -> Result<Vec<OutputFile>, PipelineError> {
        let entries = self.entries(ctx)?;
        let base_url = ctx.site.url.as_deref();

        let items: Vec<Item> = entries
            .iter()
            .map(|doc| {
                let content = rendered.get(&display_path(&doc.source_path)).cloned();
                document_to_item(doc, content, base_url)
            })
            .collect();
        let last_build_date = entries.first().map(|doc| doc.date.to_rfc2822());

        let channel = ChannelBuilder::default()
            .title(self.config.title.clone().unwrap_or_else(|| ctx.site.name.clone()))
            .link(absolute_url(base_url, "/"))
            .description(ctx.site.description.clone().unwrap_or_default())
            .generator(Some(format!("folio {}", env!("CARGO_PKG_VERSION"))))
            .last_build_date(last_build_date)
            .items(items)
            .build();

        tracing::debug!(path = %self.config.path, items = entries.len(), "generated feed");
        Ok(vec![OutputFile {
            path: url_to_relative_path(&self.config.path),
            contents: channel.to_string().into_bytes(),
            source: self.name().to_string(),
        }])
    }
}

fn document_to_item(doc: &Document, content: Option<String>, base_url: Option<&str>) -> Item {
    let link = doc.url.as_deref().map(|url| absolute_url(base_url, url));
    let categories: Vec<_> = doc
        .tags
        .iter()
        .map(|tag| CategoryBuilder::default().name(tag.clone()).build())
        .collect();

    let mut item = ItemBuilder::default()
        .title(Some(doc.title()))
        .link(link.clone())
        .description(doc.front_matter.description.clone())
        .content(content)
        .pub_date(Some(doc.date.to_rfc2822()))
        .categories(categories)
        .build();
    if let Some(link) = link {
        item.set_guid(GuidBuilder::default().permalink(true).value(link).build());
    }
    item
}
