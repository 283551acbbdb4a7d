use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::config::{Config, ConfigError, resolve_against};

use super::collection::{CollectionError, Collections};
use super::document::{Document, display_path};
use super::feed::FeedStage;
use super::filters::{FilterError, FilterRegistry};
use super::format::FormatRegistry;
use super::highlight::{HighlightCssStage, SyntaxHighlighter};
use super::loader::{self, LoadError, LoadOptions};
use super::markdown::{MarkdownError, markdown_options};
use super::nav::build_navigation;
use super::passthrough::{self, CopyError};
use super::paths::url_to_relative_path;
use super::pipeline::{
    OutputFile, Pipeline, PipelineContext, PipelineError, detect_collisions, prune_stale,
    write_outputs,
};
use super::render::{RenderError, Renderer, SiteContext};

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("no content format handles template format(s): {}", .0.join(", "))]
    UnsupportedFormats(Vec<String>),

    #[error(transparent)]
    Markdown(#[from] MarkdownError),

    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error("feed uses collection '{0}', which does not exist")]
    FeedCollection(String),

    #[error("failed to load layouts: {0}")]
    Render(#[from] RenderError),

    #[error("build cancelled")]
    Cancelled,

    #[error("{0}")]
    Documents(BuildReport),

    #[error("failed to clean output directory {}: {source}", path.display())]
    Clean {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// An error collected while processing many documents.
#[derive(thiserror::Error, Debug)]
pub enum ReportedError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Every error from one phase of the build, reported together.
#[derive(Debug)]
pub struct BuildReport {
    pub phase: &'static str,
    pub errors: Vec<ReportedError>,
}

impl BuildReport {
    fn new<E: Into<ReportedError>>(phase: &'static str, errors: Vec<E>) -> Self {
        Self {
            phase,
            errors: errors.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s) while {}", self.errors.len(), self.phase)?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct BuildResult {
    pub output_root: PathBuf,
    /// Documents that went through the pipeline
    pub documents_rendered: usize,
    /// Files written by the pipeline (documents, feed, stylesheet)
    pub files_written: usize,
    /// Drafts left out of a production build
    pub drafts_skipped: usize,
    pub files_copied: usize,
    /// Passthrough failures; the rest of the build still completed
    pub copy_errors: Vec<CopyError>,
}

pub struct Builder {
    config: Config,
    /// Base path for resolving relative paths (typically the config file's directory)
    base_path: PathBuf,
    is_production: bool,
    cancel: Arc<AtomicBool>,
}

impl Builder {
    pub fn new(config: Config, base_path: PathBuf, is_production: bool) -> Self {
        Self {
            config,
            base_path,
            is_production,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a flag that stops the build at the next phase boundary once set.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn output_root(&self) -> PathBuf {
        resolve_against(&self.base_path, &self.config.output_root)
    }

    fn check_cancelled(&self) -> Result<(), BuildError> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(BuildError::Cancelled);
        }
        Ok(())
    }

    /// Filters and aliases, checked before anything touches the disk.
    fn filter_registry(&self) -> Result<FilterRegistry, BuildError> {
        let mut filters = FilterRegistry::with_builtins(self.config.site.url.as_deref())?;
        for (alias, target) in &self.config.filter_aliases {
            filters.alias(alias, target)?;
        }
        Ok(filters)
    }

    pub fn build(&self) -> Result<BuildResult, BuildError> {
        // Build phases, each a barrier:
        // 1. Configuration checks (filters, formats, markdown options)
        // 2. Load documents
        // 3. Collections and navigation
        // 4. Render every document, then the finalize stages
        // 5. Collision check over rendered outputs and passthrough files
        // 6. Clean or prune the output root, write outputs, copy passthrough files

        // Phase 1
        self.config.validate()?;
        let filters = self.filter_registry()?;
        let formats = FormatRegistry::with_defaults();
        let unsupported = formats.unsupported(&self.config.template_formats);
        if !unsupported.is_empty() {
            return Err(BuildError::UnsupportedFormats(
                unsupported.into_iter().map(str::to_string).collect(),
            ));
        }
        markdown_options(&self.config.markdown)?;

        let workers = self.config.effective_worker_count();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("folio-worker-{i}"))
            .build()?;
        debug!(
            workers,
            production = self.is_production,
            filters = ?filters.names().collect::<Vec<_>>(),
            "starting build"
        );

        let content_root = resolve_against(&self.base_path, &self.config.content_root);
        let layouts_dir = resolve_against(&self.base_path, &self.config.layouts_dir);
        let output_root = self.output_root();

        // Phase 2
        let options = LoadOptions::new(&self.config.template_formats)
            .skip_dir(&layouts_dir)
            .skip_dir(&output_root);
        let loaded = loader::load(&content_root, &options, &pool)?;
        if !loaded.errors.is_empty() {
            return Err(BuildError::Documents(BuildReport::new("loading documents", loaded.errors)));
        }
        let documents = loaded.documents;
        info!(count = documents.len(), root = %content_root.display(), "loaded documents");
        self.check_cancelled()?;

        // Phase 3
        let collections = Collections::assemble(&documents, &self.config.collections, self.is_production)?;
        if let Some(feed) = &self.config.feed
            && collections.get(&feed.collection).is_none()
        {
            return Err(BuildError::FeedCollection(feed.collection.clone()));
        }
        for name in collections.names() {
            if let Some(collection) = collections.get(name) {
                debug!(collection = name, items = collection.len(), "assembled collection");
            }
        }

        let published: Vec<&Document> = documents
            .iter()
            .filter(|doc| !(self.is_production && doc.is_draft()))
            .collect();
        let drafts_skipped = documents.len() - published.len();
        if drafts_skipped > 0 {
            info!(count = drafts_skipped, "skipping drafts");
        }
        let nav = build_navigation(&published);
        let collections_value = collections.to_value()?;

        // Bodies are registered up front; a body that fails to parse is
        // reported alongside render errors.
        let mut renderer = Renderer::new(&layouts_dir, &filters)?;
        let mut errors: Vec<PipelineError> = Vec::new();
        let mut renderable: Vec<&Document> = Vec::with_capacity(published.len());
        for doc in published {
            match renderer.add_body(&doc.source_path, &doc.body) {
                Ok(()) => renderable.push(doc),
                Err(e) => errors.push(PipelineError::Document {
                    path: display_path(&doc.source_path),
                    stage: "template-body",
                    source: Box::new(e.into()),
                }),
            }
        }

        // Phase 4
        let site = SiteContext::from(&self.config.site);
        let highlighter = SyntaxHighlighter::from_config(&self.config.markdown);
        let ctx = PipelineContext {
            site: &site,
            collections: &collections_value,
            collection_set: Some(&collections),
            nav: &nav,
            engine: &renderer,
            formats: &formats,
            highlighter: &highlighter,
            markdown_config: &self.config.markdown,
            default_layout: self.config.default_layout.as_deref(),
            production: self.is_production,
            output_path: url_to_relative_path,
        };

        let mut pipeline = Pipeline::default_pipeline();
        if let Some(feed) = &self.config.feed {
            pipeline.add_finalize_stage(FeedStage::new(feed.clone()));
        }
        if let Some(path) = &self.config.markdown.highlight_css {
            pipeline.add_finalize_stage(HighlightCssStage::new(path.clone()));
        }
        debug!(stages = ?pipeline.stage_names(), documents = renderable.len(), "rendering");
        let outcome = pipeline.run(&renderable, &ctx, &pool);
        if outcome.unwritten > 0 {
            debug!(count = outcome.unwritten, "rendered without writing (permalink: false)");
        }
        errors.extend(outcome.errors);
        self.check_cancelled()?;

        // Phase 5
        let copies = passthrough::plan(&self.config.passthrough, &self.base_path);
        let claims = outcome
            .outputs
            .iter()
            .map(OutputFile::claim)
            .chain(copies.files.iter().map(|file| (file.to.as_path(), file.source.as_str())));
        errors.extend(detect_collisions(claims));
        if !errors.is_empty() {
            return Err(BuildError::Documents(BuildReport::new("rendering", errors)));
        }

        // Phase 6
        let clean_error = |source| BuildError::Clean {
            path: output_root.clone(),
            source,
        };
        if self.config.clean && output_root.exists() {
            debug!(path = %output_root.display(), "cleaning output directory");
            std::fs::remove_dir_all(&output_root).map_err(clean_error)?;
        } else {
            let keep: BTreeSet<&Path> = outcome
                .outputs
                .iter()
                .map(|output| output.path.as_path())
                .chain(copies.files.iter().map(|file| file.to.as_path()))
                .collect();
            let removed = prune_stale(&output_root, &keep).map_err(clean_error)?;
            if removed > 0 {
                info!(count = removed, "removed stale output files");
            }
        }
        let (write_errors, copied) = pool.join(
            || write_outputs(&outcome.outputs, &output_root, &pool),
            || passthrough::copy(copies, &output_root),
        );
        if !write_errors.is_empty() {
            return Err(BuildError::Documents(BuildReport::new("writing", write_errors)));
        }
        for error in &copied.errors {
            warn!("{error}");
        }

        info!(
            written = outcome.outputs.len(),
            copied = copied.files,
            output = %output_root.display(),
            "build complete"
        );

        Ok(BuildResult {
            output_root,
            documents_rendered: renderable.len(),
            files_written: outcome.outputs.len(),
            drafts_skipped,
            files_copied: copied.files,
            copy_errors: copied.errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CollectionConfig, FeedConfig, PassthroughEntry, SortOrder};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, path: &str, contents: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// A small blog: two posts, a draft, an index listing posts, and a layout.
    fn site() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "_layouts/base.html",
            "<title>{{ page.title }} | {{ site.name }}</title>\n{{ content | safe }}",
        );
        write(
            root,
            "content/index.md",
            "---\ntitle: Home\n---\n{% for post in collections.post %}- [{{ post.title }}]({{ post.url }}) {{ post.date | readableDate }}\n{% endfor %}",
        );
        write(
            root,
            "content/posts/first.md",
            "---\ntitle: First\ntags: post\ndate: 2025-06-01\n---\nHello *world*.\n",
        );
        write(
            root,
            "content/posts/second.md",
            "---\ntitle: Second\ntags: [post, news]\ndate: 2025-06-06\n---\nAgain.\n",
        );
        write(
            root,
            "content/posts/wip.md",
            "---\ntitle: Work in progress\ntags: post\ndraft: true\ndate: 2025-06-07\n---\nSoon.\n",
        );
        write(root, "static/style.css", "body {}");
        dir
    }

    fn config() -> Config {
        let mut config = Config::with_site_name("Test Blog");
        config.default_layout = Some("base.html".to_string());
        config.worker_count = Some(2);
        config.markdown.highlight = false;
        config
    }

    fn read(root: &Path, path: &str) -> String {
        fs::read_to_string(root.join(path)).unwrap()
    }

    #[test]
    fn test_build_site() {
        let dir = site();
        let mut config = config();
        config.passthrough = vec![PassthroughEntry::Path(PathBuf::from("static"))];

        let result = Builder::new(config, dir.path().to_path_buf(), false)
            .build()
            .unwrap();
        assert_eq!(result.documents_rendered, 4);
        assert_eq!(result.files_copied, 1);
        assert!(result.copy_errors.is_empty());

        let out = dir.path().join("_site");
        let index = read(&out, "index.html");
        assert!(index.starts_with("<title>Home | Test Blog</title>"));
        assert!(index.contains("First"));
        assert!(index.contains("06 Jun 2025"));
        assert!(index.contains("Work in progress"));
        assert!(read(&out, "posts/first/index.html").contains("<em>world</em>"));
        assert_eq!(read(&out, "static/style.css"), "body {}");
        // Layouts are not content
        assert!(!out.join("_layouts").exists());
    }

    #[test]
    fn test_production_excludes_drafts() {
        let dir = site();
        let result = Builder::new(config(), dir.path().to_path_buf(), true)
            .build()
            .unwrap();
        assert_eq!(result.drafts_skipped, 1);

        let out = dir.path().join("_site");
        assert!(!out.join("posts/wip/index.html").exists());
        assert!(!read(&out, "index.html").contains("Work in progress"));
    }

    #[test]
    fn test_build_is_idempotent() {
        let dir = site();
        let mut config = config();
        config.feed = Some(FeedConfig {
            path: "feed.xml".to_string(),
            collection: "post".to_string(),
            limit: 10,
            title: None,
        });
        let builder = Builder::new(config, dir.path().to_path_buf(), false);
        let out = dir.path().join("_site");

        builder.build().unwrap();
        let first: Vec<(PathBuf, Vec<u8>)> = snapshot(&out);
        builder.build().unwrap();
        assert_eq!(first, snapshot(&out));
    }

    fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        fn walk(dir: &Path, root: &Path, files: &mut Vec<(PathBuf, Vec<u8>)>) {
            let mut entries: Vec<_> = fs::read_dir(dir).unwrap().map(|e| e.unwrap().path()).collect();
            entries.sort();
            for path in entries {
                if path.is_dir() {
                    walk(&path, root, files);
                } else {
                    let rel = path.strip_prefix(root).unwrap().to_path_buf();
                    files.push((rel, fs::read(&path).unwrap()));
                }
            }
        }
        let mut files = Vec::new();
        walk(root, root, &mut files);
        files
    }

    #[test]
    fn test_collision_writes_nothing() {
        let dir = site();
        write(dir.path(), "content/posts/first/index.md", "# Also first\n");

        let err = Builder::new(config(), dir.path().to_path_buf(), false)
            .build()
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("posts/first.md"), "{message}");
        assert!(message.contains("posts/first/index.md"), "{message}");
        assert!(!dir.path().join("_site").exists());
    }

    #[test]
    fn test_missing_passthrough_still_renders() {
        let dir = site();
        let mut config = config();
        config.passthrough = vec![PassthroughEntry::Path(PathBuf::from("missing"))];

        let result = Builder::new(config, dir.path().to_path_buf(), false)
            .build()
            .unwrap();
        assert_eq!(result.copy_errors.len(), 1);
        assert_eq!(result.copy_errors[0].src(), Path::new("missing"));
        assert!(dir.path().join("_site/index.html").exists());
    }

    #[test]
    fn test_feed_output() {
        let dir = site();
        let mut config = config();
        config.site.url = Some("https://blog.example".to_string());
        config.collections = vec![CollectionConfig {
            name: "post".to_string(),
            tag: "post".to_string(),
            sort: SortOrder::DateDesc,
        }];
        config.feed = Some(FeedConfig {
            path: "feed.xml".to_string(),
            collection: "post".to_string(),
            limit: 1,
            title: Some("Updates".to_string()),
        });

        Builder::new(config, dir.path().to_path_buf(), true)
            .build()
            .unwrap();
        let feed = read(&dir.path().join("_site"), "feed.xml");
        assert!(feed.contains("<title>Updates</title>"));
        assert!(feed.contains("<content:encoded><![CDATA[<p>Again.</p>"));
        assert!(feed.contains("https://blog.example/posts/second/"));
        assert!(!feed.contains("posts/first/"));
        assert!(!feed.contains("posts/wip/"));
    }

    #[test]
    fn test_parse_errors_are_reported_together() {
        let dir = site();
        write(dir.path(), "content/bad-one.md", "---\ntitle: [unclosed\n---\n");
        write(dir.path(), "content/bad-two.md", "---\ndraft: maybe\n---\n");

        let err = Builder::new(config(), dir.path().to_path_buf(), false)
            .build()
            .unwrap_err();
        match &err {
            BuildError::Documents(report) => assert_eq!(report.errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.path().join("_site").exists());
    }

    #[test]
    fn test_render_error_names_document() {
        let dir = site();
        write(dir.path(), "content/broken.md", "{{ page.title | shout }}");

        let err = Builder::new(config(), dir.path().to_path_buf(), false)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("broken.md"));
        assert!(!dir.path().join("_site").exists());
    }

    #[test]
    fn test_configuration_errors_before_io() {
        let dir = tempfile::tempdir().unwrap();

        let mut config = config();
        config.filter_aliases.insert("pretty".to_string(), "noSuchFilter".to_string());
        let err = Builder::new(config, dir.path().to_path_buf(), false)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Filter(FilterError::UnknownFilter(_))));

        let mut config = self::config();
        config.template_formats.push("liquid".to_string());
        let err = Builder::new(config, dir.path().to_path_buf(), false)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedFormats(ref f) if f == &["liquid"]));
    }

    #[test]
    fn test_unknown_collection_tag() {
        let dir = site();
        let mut config = config();
        config.collections = vec![CollectionConfig {
            name: "recipes".to_string(),
            tag: "recipe".to_string(),
            sort: SortOrder::Source,
        }];
        let err = Builder::new(config, dir.path().to_path_buf(), false)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Collection(_)));
    }

    #[test]
    fn test_cancelled_build() {
        let dir = site();
        let cancel = Arc::new(AtomicBool::new(true));
        let err = Builder::new(config(), dir.path().to_path_buf(), false)
            .with_cancel_flag(cancel)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Cancelled));
        assert!(!dir.path().join("_site").exists());
    }

    #[test]
    fn test_clean_removes_stale_files() {
        let dir = site();
        write(dir.path(), "_site/stale.html", "old");
        let mut config = config();
        config.clean = true;

        Builder::new(config, dir.path().to_path_buf(), false)
            .build()
            .unwrap();
        assert!(!dir.path().join("_site/stale.html").exists());
        assert!(dir.path().join("_site/index.html").exists());
    }

    #[test]
    fn test_passthrough_colliding_with_page_writes_nothing() {
        let dir = site();
        write(dir.path(), "static.html", "PASSTHROUGH");
        let mut config = config();
        config.passthrough = vec![PassthroughEntry::Mapped {
            src: PathBuf::from("static.html"),
            dst: Some(PathBuf::from("index.html")),
        }];

        let err = Builder::new(config, dir.path().to_path_buf(), false)
            .build()
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("index.html is produced by both index.md and static.html"), "{message}");
        assert!(!dir.path().join("_site").exists());
    }

    #[test]
    fn test_production_build_removes_earlier_draft_pages() {
        let dir = site();
        let out = dir.path().join("_site");
        write(dir.path(), "_site/leftover/index.html", "old");

        Builder::new(config(), dir.path().to_path_buf(), false)
            .build()
            .unwrap();
        assert!(out.join("posts/wip/index.html").exists());
        assert!(!out.join("leftover").exists());

        let result = Builder::new(config(), dir.path().to_path_buf(), true)
            .build()
            .unwrap();
        assert_eq!(result.drafts_skipped, 1);
        assert!(!out.join("posts/wip").exists());
        assert!(out.join("posts/first/index.html").exists());
    }

    #[test]
    fn test_template_page() {
        let dir = site();
        write(
            dir.path(),
            "content/archive.njk",
            "---\ntitle: Archive\n---\n<ul>{% for post in collections.post %}<li>{{ post.title }}</li>{% endfor %}</ul>\n",
        );
        let mut config = config();
        config.template_formats = vec!["md".to_string(), "njk".to_string(), "html".to_string()];

        Builder::new(config, dir.path().to_path_buf(), false)
            .build()
            .unwrap();
        let archive = read(&dir.path().join("_site"), "archive/index.html");
        assert!(archive.starts_with("<title>Archive | Test Blog</title>"));
        assert!(archive.contains("<ul><li>First</li><li>Second</li><li>Work in progress</li></ul>"));
    }

    #[test]
    fn test_absolute_url_filter_uses_site_url() {
        let dir = site();
        write(dir.path(), "content/links.njk", "{{ page.url | absoluteUrl }}");
        let mut config = config();
        config.site.url = Some("https://blog.example/".to_string());
        config.default_layout = None;

        Builder::new(config, dir.path().to_path_buf(), false)
            .build()
            .unwrap();
        assert_eq!(
            read(&dir.path().join("_site"), "links/index.html"),
            "https://blog.example/links/"
        );
    }
}
