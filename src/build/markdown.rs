//! Markdown rendering with syntax highlighting and TOC extraction.

use std::collections::HashSet;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};
use serde::Serialize;

use super::highlight::{SyntaxHighlighter, html_escape};
use crate::config::MarkdownConfig;

#[derive(thiserror::Error, Debug)]
pub enum MarkdownError {
    #[error("invalid markdown extension: {0}")]
    InvalidExtension(String),
}

/// A table of contents entry for the current page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TocEntry {
    /// The heading text
    pub text: String,
    /// The heading id (for anchor links)
    pub id: String,
    /// The heading level (1-6)
    pub level: u8,
}

/// Result of rendering markdown, containing both HTML and table of contents.
pub struct MarkdownOutput {
    pub html: String,
    pub toc: Vec<TocEntry>,
}

/// Translate configured extension names to pulldown-cmark options.
pub fn markdown_options(config: &MarkdownConfig) -> Result<Options, MarkdownError> {
    let mut options = Options::empty();
    for extension in &config.extensions {
        match extension.as_str() {
            "definition_lists" => options.insert(Options::ENABLE_DEFINITION_LIST),
            "footnotes" => options.insert(Options::ENABLE_FOOTNOTES),
            "gfm" => options.insert(Options::ENABLE_GFM),
            "heading_attributes" => options.insert(Options::ENABLE_HEADING_ATTRIBUTES),
            "smart_punctuation" => options.insert(Options::ENABLE_SMART_PUNCTUATION),
            "strikethrough" => options.insert(Options::ENABLE_STRIKETHROUGH),
            "tables" => options.insert(Options::ENABLE_TABLES),
            "tasklists" => options.insert(Options::ENABLE_TASKLISTS),
            other => return Err(MarkdownError::InvalidExtension(other.to_string())),
        }
    }
    Ok(options)
}

/// Levels that get a direct link after the heading text.
const ANCHOR_LEVELS: std::ops::RangeInclusive<u8> = 1..=4;

struct HeadingState<'a> {
    level: HeadingLevel,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
    /// Plain text, for the id and the table of contents
    text: String,
    /// Inline events inside the heading, rendered as its content
    inner: Vec<Event<'a>>,
}

/// Render markdown to HTML using pulldown-cmark with syntax highlighting.
pub fn render_markdown(
    markdown: &str,
    highlighter: &SyntaxHighlighter,
    config: &MarkdownConfig,
) -> Result<MarkdownOutput, MarkdownError> {
    let parser = Parser::new_ext(markdown, markdown_options(config)?);

    let mut in_code_block = false;
    let mut code_language = String::new();
    let mut code_content = String::new();

    let mut heading: Option<HeadingState<'_>> = None;
    let mut used_ids: HashSet<String> = HashSet::new();
    let mut toc: Vec<TocEntry> = Vec::new();

    let events: Vec<Event> = parser
        .flat_map(|event| match event {
            Event::Start(Tag::Heading {
                level,
                ref id,
                ref classes,
                ref attrs,
            }) => {
                // Explicit ids pass through untouched
                if let Some(existing) = id {
                    used_ids.insert(existing.to_string());
                    return vec![event];
                }
                heading = Some(HeadingState {
                    level,
                    classes: classes.iter().map(|c| c.to_string()).collect(),
                    attrs: attrs
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.as_ref().map(|v| v.to_string())))
                        .collect(),
                    text: String::new(),
                    inner: Vec::new(),
                });
                vec![]
            }
            Event::End(TagEnd::Heading(_)) if heading.is_some() => {
                let Some(state) = heading.take() else {
                    return vec![];
                };

                let base_id = slugify(&state.text);
                let mut id = base_id.clone();
                let mut suffix = 1;
                while used_ids.contains(&id) {
                    id = format!("{}-{}", base_id, suffix);
                    suffix += 1;
                }
                used_ids.insert(id.clone());

                toc.push(TocEntry {
                    text: state.text.clone(),
                    id: id.clone(),
                    level: state.level as u8,
                });

                let class_attr = if state.classes.is_empty() {
                    String::new()
                } else {
                    format!(" class=\"{}\"", state.classes.join(" "))
                };
                let extra_attrs = state
                    .attrs
                    .iter()
                    .map(|(k, v)| match v {
                        Some(val) => format!(" {}=\"{}\"", k, html_escape(val)),
                        None => format!(" {}", k),
                    })
                    .collect::<String>();

                let mut inner_html = String::new();
                html::push_html(&mut inner_html, state.inner.into_iter());
                let level = state.level as u8;
                let anchor = if ANCHOR_LEVELS.contains(&level) {
                    format!(" <a class=\"direct-link\" href=\"#{id}\" aria-hidden=\"true\">#</a>")
                } else {
                    String::new()
                };

                vec![Event::Html(
                    format!("<h{level} id=\"{id}\"{class_attr}{extra_attrs}>{inner_html}{anchor}</h{level}>\n")
                        .into(),
                )]
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                in_code_block = true;
                code_language = match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                code_content.clear();
                vec![]
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                let highlighted = highlighter.highlight(&code_content, &code_language);
                vec![Event::Html(highlighted.into())]
            }
            Event::Text(text) if in_code_block => {
                code_content.push_str(&text);
                vec![]
            }
            _ if heading.is_some() => {
                if let Some(state) = heading.as_mut() {
                    if let Event::Text(text) | Event::Code(text) = &event {
                        state.text.push_str(text);
                    }
                    state.inner.push(event);
                }
                vec![]
            }
            Event::SoftBreak if config.hard_breaks => vec![Event::HardBreak],
            _ => vec![event],
        })
        .collect();

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());

    Ok(MarkdownOutput {
        html: html_output,
        toc,
    })
}

/// Heading text as an HTML id: lowercase alphanumerics, single dashes
/// between words, punctuation dropped.
fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let mut pending_dash = false;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }
    slug
}
