//! Tag collections.
//!
//! A collection is an ordered view over loaded documents: every document
//! carrying a tag, minus drafts in production. Filtering is stable, so the
//! loader's discovery order survives unless a sort rule is configured.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::config::{CollectionConfig, SortOrder};

use super::document::{Document, PageSummary};

/// Name of the collection holding every published document.
pub const ALL: &str = "all";

#[derive(thiserror::Error, Debug)]
pub enum CollectionError {
    #[error("collection '{collection}' uses tag '{tag}', which no document declares")]
    UnknownTag { collection: String, tag: String },

    #[error("collection '{collection}' cannot be exposed to templates: {source}")]
    Serialize {
        collection: String,
        source: serde_json::Error,
    },
}

/// A named, ordered view over documents.
#[derive(Debug, Clone)]
pub struct Collection<'a> {
    pub name: String,
    pub items: Vec<&'a Document>,
}

impl<'a> Collection<'a> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Document> + '_ {
        self.items.iter().copied()
    }

    /// Apply a sort rule. Documents with equal dates keep their relative order.
    pub fn sorted(mut self, order: SortOrder) -> Self {
        match order {
            SortOrder::Source => {}
            SortOrder::Date => self.items.sort_by_key(|doc| doc.date),
            SortOrder::DateDesc => self.items.sort_by(|a, b| b.date.cmp(&a.date)),
        }
        self
    }

    pub fn summaries(&self) -> Vec<PageSummary> {
        self.items.iter().map(|doc| doc.summary()).collect()
    }
}

/// Documents tagged `tag`, excluding drafts when `is_production`.
pub fn build<'a>(tag: &str, documents: &'a [Document], is_production: bool) -> Collection<'a> {
    Collection {
        name: tag.to_string(),
        items: documents
            .iter()
            .filter(|doc| doc.has_tag(tag))
            .filter(|doc| !(is_production && doc.is_draft()))
            .collect(),
    }
}

/// Every document, excluding drafts when `is_production`.
pub fn build_all(documents: &[Document], is_production: bool) -> Collection<'_> {
    Collection {
        name: ALL.to_string(),
        items: documents
            .iter()
            .filter(|doc| !(is_production && doc.is_draft()))
            .collect(),
    }
}

/// The set of collections available to a build.
#[derive(Debug, Default)]
pub struct Collections<'a> {
    by_name: BTreeMap<String, Collection<'a>>,
}

impl<'a> Collections<'a> {
    /// Build the configured collections, or one per distinct tag when none
    /// are configured. The `all` collection is always present.
    pub fn assemble(
        documents: &'a [Document],
        configured: &[CollectionConfig],
        is_production: bool,
    ) -> Result<Self, CollectionError> {
        let mut by_name = BTreeMap::new();

        if configured.is_empty() {
            let tags: BTreeSet<&str> = documents
                .iter()
                .flat_map(|doc| doc.tags.iter().map(String::as_str))
                .collect();
            for tag in tags {
                by_name.insert(tag.to_string(), build(tag, documents, is_production));
            }
        } else {
            for entry in configured {
                if !documents.iter().any(|doc| doc.has_tag(&entry.tag)) {
                    return Err(CollectionError::UnknownTag {
                        collection: entry.name.clone(),
                        tag: entry.tag.clone(),
                    });
                }
                let mut collection = build(&entry.tag, documents, is_production).sorted(entry.sort);
                collection.name = entry.name.clone();
                by_name.insert(entry.name.clone(), collection);
            }
        }

        by_name.insert(ALL.to_string(), build_all(documents, is_production));
        Ok(Self { by_name })
    }

    pub fn get(&self, name: &str) -> Option<&Collection<'a>> {
        self.by_name.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// `{ name: [page summary, ...] }` for templates.
    pub fn to_value(&self) -> Result<Value, CollectionError> {
        let map = self
            .by_name
            .iter()
            .map(|(name, collection)| {
                serde_json::to_value(collection.summaries())
                    .map(|items| (name.clone(), items))
                    .map_err(|source| CollectionError::Serialize {
                        collection: name.clone(),
                        source,
                    })
            })
            .collect::<Result<_, _>>()?;
        Ok(Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::document::{FrontMatter, Tags};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn doc(path: &str, tags: &[&str], draft: bool, day: u32) -> Document {
        let front_matter = FrontMatter {
            tags: Tags::Many(tags.iter().map(|t| t.to_string()).collect()),
            draft,
            ..Default::default()
        };
        Document::new(
            PathBuf::from(path),
            front_matter,
            String::new(),
            Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap(),
        )
    }

    fn paths(collection: &Collection) -> Vec<String> {
        collection
            .iter()
            .map(|d| d.source_path.to_string_lossy().to_string())
            .collect()
    }

    fn fixture() -> Vec<Document> {
        vec![
            doc("c.md", &["post"], false, 3),
            doc("a.md", &["post", "rust"], true, 1),
            doc("about.md", &[], false, 9),
            doc("b.md", &["post", "post"], false, 2),
            doc("d.md", &["post"], true, 4),
        ]
    }

    #[test]
    fn test_build_preserves_order() {
        let docs = fixture();
        let posts = build("post", &docs, false);
        assert_eq!(paths(&posts), vec!["c.md", "a.md", "b.md", "d.md"]);
    }

    #[test]
    fn test_production_excludes_drafts() {
        let docs = fixture();
        let dev = build("post", &docs, false);
        let prod = build("post", &docs, true);
        assert_eq!(paths(&prod), vec!["c.md", "b.md"]);

        // Production is a subset and everything removed is a draft
        for doc in dev.iter() {
            let in_prod = prod.iter().any(|p| std::ptr::eq(p, doc));
            assert!(in_prod || doc.is_draft());
        }
    }

    #[test]
    fn test_duplicate_tags_do_not_duplicate_membership() {
        let docs = fixture();
        let posts = build("post", &docs, false);
        assert_eq!(posts.iter().filter(|d| d.source_path == PathBuf::from("b.md")).count(), 1);
    }

    #[test]
    fn test_unknown_tag_is_empty() {
        let docs = fixture();
        assert!(build("nope", &docs, false).is_empty());
    }

    #[test]
    fn test_sorted_by_date() {
        let docs = fixture();
        let asc = build("post", &docs, false).sorted(SortOrder::Date);
        assert_eq!(paths(&asc), vec!["a.md", "b.md", "c.md", "d.md"]);
        let desc = build("post", &docs, false).sorted(SortOrder::DateDesc);
        assert_eq!(paths(&desc), vec!["d.md", "c.md", "b.md", "a.md"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let docs = vec![doc("x.md", &["t"], false, 5), doc("y.md", &["t"], false, 5)];
        let sorted = build("t", &docs, false).sorted(SortOrder::DateDesc);
        assert_eq!(paths(&sorted), vec!["x.md", "y.md"]);
    }

    #[test]
    fn test_assemble_auto_collections() {
        let docs = fixture();
        let collections = Collections::assemble(&docs, &[], true).unwrap();
        assert_eq!(collections.names().collect::<Vec<_>>(), vec!["all", "post", "rust"]);
        assert_eq!(collections.get("all").unwrap().len(), 3);
        assert!(collections.get("rust").unwrap().is_empty());
    }

    #[test]
    fn test_assemble_configured() {
        let docs = fixture();
        let specs = vec![CollectionConfig {
            name: "posts".to_string(),
            tag: "post".to_string(),
            sort: SortOrder::DateDesc,
        }];
        let collections = Collections::assemble(&docs, &specs, false).unwrap();
        let posts = collections.get("posts").unwrap();
        assert_eq!(posts.name, "posts");
        assert_eq!(paths(posts), vec!["d.md", "c.md", "b.md", "a.md"]);
        assert!(collections.get("post").is_none());
    }

    #[test]
    fn test_assemble_unknown_tag() {
        let docs = fixture();
        let specs = vec![CollectionConfig {
            name: "notes".to_string(),
            tag: "note".to_string(),
            sort: SortOrder::Source,
        }];
        let err = Collections::assemble(&docs, &specs, false).unwrap_err();
        assert!(err.to_string().contains("'note'"));
    }

    #[test]
    fn test_to_value() {
        let docs = fixture();
        let collections = Collections::assemble(&docs, &[], true).unwrap();
        let value = collections.to_value().unwrap();
        assert_eq!(value["post"].as_array().unwrap().len(), 2);
        assert_eq!(value["post"][0]["url"], "/c/");
    }

    #[test]
    fn test_to_value_reports_unserializable_front_matter() {
        let mut docs = fixture();
        let mut odd = serde_yaml::Mapping::new();
        odd.insert(
            serde_yaml::Value::Sequence(vec![serde_yaml::Value::from(1)]),
            serde_yaml::Value::from("x"),
        );
        docs[0]
            .front_matter
            .extra
            .insert("odd".to_string(), serde_yaml::Value::Mapping(odd));

        let collections = Collections::assemble(&docs, &[], false).unwrap();
        let err = collections.to_value().unwrap_err();
        assert!(matches!(err, CollectionError::Serialize { .. }));
        assert!(err.to_string().contains("collection 'all'"));
    }
}
