use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::paths::document_url;

// =============================================================================
// Documents
// =============================================================================

/// A source document loaded from the content root.
///
/// Documents are created by the loader and never mutated afterwards.
/// Collections and pipeline stages hold shared references to them.
#[derive(Debug, Clone)]
pub struct Document {
    /// Path relative to the content root (e.g., "posts/hello.md")
    pub source_path: PathBuf,
    /// Tags declared in front matter (duplicates collapse)
    pub tags: BTreeSet<String>,
    /// Front matter metadata
    pub front_matter: FrontMatter,
    /// The document body without the front matter block
    pub body: String,
    /// Publication date, from front matter or the file's modification time
    pub date: DateTime<Utc>,
    /// The URL this document is served at, or `None` when it isn't written
    pub url: Option<String>,
}

impl Document {
    pub fn new(
        source_path: PathBuf,
        front_matter: FrontMatter,
        body: String,
        date: DateTime<Utc>,
    ) -> Self {
        let tags = front_matter.tags.to_set();
        let url = document_url(&source_path, front_matter.permalink.as_ref());
        Self {
            source_path,
            tags,
            front_matter,
            body,
            date,
            url,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.front_matter.draft
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Lowercase file extension of the source path.
    pub fn extension(&self) -> Option<String> {
        self.source_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// Get the document title, falling back to filename if not in front matter.
    pub fn title(&self) -> String {
        self.front_matter.title.clone().unwrap_or_else(|| {
            let stem = match self.source_path.file_stem().and_then(|s| s.to_str()) {
                // "posts/index.md" is titled after its directory
                Some("index") => self
                    .source_path
                    .parent()
                    .and_then(|p| p.file_name())
                    .and_then(|s| s.to_str()),
                other => other,
            };
            stem.map(title_case).unwrap_or_else(|| "Home".to_string())
        })
    }

    /// The serializable view of this document exposed to templates.
    pub fn summary(&self) -> PageSummary {
        PageSummary {
            title: self.title(),
            url: self.url.clone(),
            date: self.date.to_rfc3339(),
            tags: self.tags.iter().cloned().collect(),
            draft: self.is_draft(),
            description: self.front_matter.description.clone(),
            source_path: self.source_path.to_string_lossy().replace('\\', "/"),
            data: self
                .front_matter
                .extra
                .iter()
                .filter(|(key, _)| !PageSummary::COMPUTED_FIELDS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }
}

/// Information about a page, as seen by templates (`page.*`, `collections.*`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub title: String,
    pub url: Option<String>,
    /// RFC 3339, UTC
    pub date: String,
    pub tags: Vec<String>,
    pub draft: bool,
    pub description: Option<String>,
    pub source_path: String,
    /// Custom front matter fields (flattened to top level, e.g., `page.author`).
    /// Keys naming a computed field are left out.
    #[serde(flatten)]
    pub data: BTreeMap<String, serde_yaml::Value>,
}

impl PageSummary {
    const COMPUTED_FIELDS: &'static [&'static str] = &[
        "title",
        "url",
        "date",
        "tags",
        "draft",
        "description",
        "source_path",
    ];
}

// =============================================================================
// Front matter
// =============================================================================

/// Front matter metadata parsed from the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontMatter {
    /// Page title (can override filename-derived title)
    pub title: Option<String>,
    /// Page description for previews and feeds
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Tags,
    /// Excluded from production builds
    #[serde(default)]
    pub draft: bool,
    /// Publication date (`YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, or RFC 3339)
    pub date: Option<String>,
    /// Layout template wrapping the rendered content
    pub layout: Option<String>,
    /// Output URL override, or `false` to skip writing
    pub permalink: Option<Permalink>,
    /// Entry in the site navigation tree
    pub navigation: Option<NavigationMeta>,
    /// Additional arbitrary metadata (available in templates at top level, e.g., `page.author`)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Tags may be written as a single string or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tags {
    One(String),
    Many(Vec<String>),
}

impl Default for Tags {
    fn default() -> Self {
        Tags::Many(Vec::new())
    }
}

impl Tags {
    pub fn to_set(&self) -> BTreeSet<String> {
        match self {
            Tags::One(tag) => BTreeSet::from([tag.clone()]),
            Tags::Many(tags) => tags.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Permalink {
    /// `permalink: false` renders the document without writing it
    Enabled(bool),
    Path(String),
}

/// Navigation metadata:
///
/// ```yaml
/// navigation:
///   key: Posts
///   parent: Home
///   order: 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationMeta {
    pub key: String,
    pub parent: Option<String>,
    pub order: Option<i64>,
    /// Display title (defaults to the key)
    pub title: Option<String>,
}

/// Result of parsing front matter from document content.
#[derive(Debug)]
pub struct ParsedContent {
    /// The parsed front matter (empty if none found)
    pub front_matter: FrontMatter,
    /// The content without the front matter block
    pub content: String,
}

/// Parse front matter from document content.
///
/// Front matter is a YAML block delimited by `---` at the start of the file:
///
/// ```markdown
/// ---
/// title: My Page
/// tags: [post]
/// ---
///
/// # Content starts here
/// ```
///
/// Content without a complete front matter block is returned unchanged.
/// A block that is present but not valid YAML is an error.
pub fn parse_front_matter(content: &str) -> Result<ParsedContent, serde_yaml::Error> {
    let content = content.trim_start();

    if !content.starts_with("---") {
        return Ok(ParsedContent {
            front_matter: FrontMatter::default(),
            content: content.to_string(),
        });
    }

    let after_opening = &content[3..];
    let Some(closing_pos) = after_opening.find("\n---") else {
        return Ok(ParsedContent {
            front_matter: FrontMatter::default(),
            content: content.to_string(),
        });
    };

    let yaml_content = after_opening[..closing_pos].trim_start_matches(['\r', '\n']);

    // Skip "---", the yaml block and "\n---", then the rest of the closing line
    let markdown_start = 3 + closing_pos + 4;
    let markdown_content = if markdown_start < content.len() {
        content[markdown_start..]
            .trim_start_matches([' ', '\t', '\r'])
            .trim_start_matches('\n')
            .to_string()
    } else {
        String::new()
    };

    let front_matter = if yaml_content.trim().is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str(yaml_content)?
    };

    Ok(ParsedContent {
        front_matter,
        content: markdown_content,
    })
}

// =============================================================================
// Dates
// =============================================================================

/// Parse a front matter or template date, interpreting naive values as UTC.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Convert a filename slug to title case.
/// "getting-started" -> "Getting Started"
fn title_case(s: &str) -> String {
    s.split(['-', '_'])
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Source path with forward slashes, for error messages and sorting.
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
