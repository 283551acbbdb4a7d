//! Navigation tree built from `navigation` front matter.
//!
//! Documents opt in with a key and optionally name a parent key and an
//! order. Entries are nested under their parent and sorted by order;
//! entries with equal order keep discovery order. Entries whose parent
//! key does not exist are left out.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::document::Document;

/// A single navigation entry (`nav` in templates).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavEntry {
    pub key: String,
    pub title: String,
    pub url: Option<String>,
    pub children: Vec<NavEntry>,
}

/// Build the navigation tree from published documents.
pub fn build_navigation<'a>(documents: &[&'a Document]) -> Vec<NavEntry> {
    let mut by_parent: HashMap<Option<&'a str>, Vec<&'a Document>> = HashMap::new();
    for &doc in documents {
        if let Some(meta) = &doc.front_matter.navigation {
            by_parent.entry(meta.parent.as_deref()).or_default().push(doc);
        }
    }
    for children in by_parent.values_mut() {
        children.sort_by_key(|doc| nav_order(doc));
    }

    let mut visited = HashSet::new();
    build_level(None, &by_parent, &mut visited)
}

fn nav_order(doc: &Document) -> i64 {
    doc.front_matter
        .navigation
        .as_ref()
        .and_then(|meta| meta.order)
        .unwrap_or(0)
}

fn build_level<'a>(
    parent: Option<&'a str>,
    by_parent: &HashMap<Option<&'a str>, Vec<&'a Document>>,
    visited: &mut HashSet<&'a str>,
) -> Vec<NavEntry> {
    let Some(children) = by_parent.get(&parent) else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for &doc in children {
        let Some(meta) = &doc.front_matter.navigation else {
            continue;
        };
        // A key is expanded once, so parent cycles can't recurse forever
        if !visited.insert(meta.key.as_str()) {
            continue;
        }
        entries.push(NavEntry {
            key: meta.key.clone(),
            title: meta.title.clone().unwrap_or_else(|| meta.key.clone()),
            url: doc.url.clone(),
            children: build_level(Some(meta.key.as_str()), by_parent, visited),
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::document::{FrontMatter, NavigationMeta};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn doc(path: &str, key: &str, parent: Option<&str>, order: Option<i64>) -> Document {
        let front_matter = FrontMatter {
            navigation: Some(NavigationMeta {
                key: key.to_string(),
                parent: parent.map(str::to_string),
                order,
                title: None,
            }),
            ..Default::default()
        };
        Document::new(PathBuf::from(path), front_matter, String::new(), Utc::now())
    }

    fn keys(entries: &[NavEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.key.as_str()).collect()
    }

    #[test]
    fn test_tree_and_order() {
        let docs = vec![
            doc("index.md", "Home", None, Some(1)),
            doc("posts/index.md", "Posts", Some("Home"), Some(2)),
            doc("about.md", "About", Some("Home"), Some(1)),
            doc("contact.md", "Contact", None, Some(0)),
        ];
        let refs: Vec<&Document> = docs.iter().collect();
        let nav = build_navigation(&refs);

        assert_eq!(keys(&nav), vec!["Contact", "Home"]);
        assert_eq!(keys(&nav[1].children), vec!["About", "Posts"]);
        assert_eq!(nav[1].url.as_deref(), Some("/"));
        assert_eq!(nav[1].children[1].url.as_deref(), Some("/posts/"));
    }

    #[test]
    fn test_orphans_and_cycles_are_dropped() {
        let docs = vec![
            doc("a.md", "A", Some("B"), None),
            doc("b.md", "B", Some("A"), None),
            doc("c.md", "C", Some("Missing"), None),
            doc("d.md", "D", None, None),
        ];
        let refs: Vec<&Document> = docs.iter().collect();
        let nav = build_navigation(&refs);
        assert_eq!(keys(&nav), vec!["D"]);
        assert!(nav[0].children.is_empty());
    }

    #[test]
    fn test_documents_without_navigation_are_ignored() {
        let plain = Document::new(
            PathBuf::from("x.md"),
            FrontMatter::default(),
            String::new(),
            Utc::now(),
        );
        assert!(build_navigation(&[&plain]).is_empty());
    }
}
