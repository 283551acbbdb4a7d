//! Path and URL conversion utilities.
//!
//! This module handles conversions between:
//! - Source file paths (relative paths within the content root)
//! - URL paths (the URL at which content will be served)
//! - Output file paths (where files are written in the output directory)

use std::path::{Component, Path, PathBuf};

use super::document::Permalink;

/// Resolve the URL of a document from its source path and permalink.
///
/// Returns `None` for `permalink: false`.
///
/// # Examples
/// ```ignore
/// document_url("posts/hello.md", None) => Some("/posts/hello/")
/// document_url("posts/index.md", None) => Some("/posts/")
/// document_url("index.md", None) => Some("/")
/// document_url("x.md", Some(Path("/feed.xml"))) => Some("/feed.xml")
/// ```
pub fn document_url(source_path: &Path, permalink: Option<&Permalink>) -> Option<String> {
    match permalink {
        Some(Permalink::Enabled(false)) => None,
        Some(Permalink::Path(path)) => Some(normalize_url(path)),
        Some(Permalink::Enabled(true)) | None => Some(source_path_to_url(source_path)),
    }
}

/// Convert a document source path to its default URL.
pub fn source_path_to_url(path: &Path) -> String {
    let without_ext = path.with_extension("");
    let mut segments: Vec<String> = without_ext
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    // Index files become the directory URL
    if segments.last().is_some_and(|s| s == "index") {
        segments.pop();
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", segments.join("/"))
    }
}

/// Normalize a permalink: forward slashes, leading slash, no `.`/`..` segments.
fn normalize_url(permalink: &str) -> String {
    let permalink = permalink.replace('\\', "/");
    let trailing_slash = permalink.ends_with('/');
    let segments: Vec<&str> = permalink
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect();

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut url = format!("/{}", segments.join("/"));
    if trailing_slash {
        url.push('/');
    }
    url
}

/// Convert a URL path to a file path relative to the output root.
///
/// Directory URLs (trailing slash, or no extension) become `index.html`
/// inside the directory; URLs with an extension keep their path.
///
/// # Examples
/// ```ignore
/// url_to_relative_path("/posts/hello/") => "posts/hello/index.html"
/// url_to_relative_path("/") => "index.html"
/// url_to_relative_path("/feed.xml") => "feed.xml"
/// url_to_relative_path("/about") => "about/index.html"
/// ```
pub fn url_to_relative_path(url_path: &str) -> PathBuf {
    let is_directory = url_path.ends_with('/');
    let segments: Vec<&str> = url_path
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect();

    let mut path: PathBuf = segments.iter().collect();
    let has_extension = segments.last().is_some_and(|s| s.contains('.'));
    if segments.is_empty() || is_directory || !has_extension {
        path.push("index.html");
    }
    path
}

/// Join a site-relative URL onto a base URL.
///
/// URLs that already carry a scheme (or are protocol-relative) and calls
/// without a base are returned unchanged.
pub fn absolute_url(base_url: Option<&str>, url: &str) -> String {
    let is_absolute = url.starts_with("//") || url.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+.-".contains(c))
    });
    match base_url {
        Some(base) if !is_absolute => {
            format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
        }
        _ => url.to_string(),
    }
}

/// Get the base path from a config file path (its parent directory).
pub fn base_path_from_config(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_path_to_url_simple() {
        assert_eq!(source_path_to_url(Path::new("about.md")), "/about/");
        assert_eq!(source_path_to_url(Path::new("posts/hello.md")), "/posts/hello/");
        assert_eq!(source_path_to_url(Path::new("contact.html")), "/contact/");
    }

    #[test]
    fn test_source_path_to_url_index() {
        assert_eq!(source_path_to_url(Path::new("index.md")), "/");
        assert_eq!(source_path_to_url(Path::new("posts/index.md")), "/posts/");
    }

    #[test]
    fn test_document_url_permalink() {
        let source = Path::new("posts/hello.md");
        assert_eq!(
            document_url(source, Some(&Permalink::Path("/blog/hello/".to_string()))),
            Some("/blog/hello/".to_string())
        );
        assert_eq!(
            document_url(source, Some(&Permalink::Path("sitemap.xml".to_string()))),
            Some("/sitemap.xml".to_string())
        );
        assert_eq!(
            document_url(source, Some(&Permalink::Path("../../etc/passwd".to_string()))),
            Some("/etc/passwd".to_string())
        );
        assert_eq!(document_url(source, Some(&Permalink::Enabled(false))), None);
        assert_eq!(
            document_url(source, Some(&Permalink::Enabled(true))),
            Some("/posts/hello/".to_string())
        );
    }

    #[test]
    fn test_url_to_relative_path() {
        assert_eq!(url_to_relative_path("/"), PathBuf::from("index.html"));
        assert_eq!(
            url_to_relative_path("/posts/a/"),
            PathBuf::from("posts/a/index.html")
        );
        assert_eq!(url_to_relative_path("/about"), PathBuf::from("about/index.html"));
        assert_eq!(url_to_relative_path("/feed.xml"), PathBuf::from("feed.xml"));
    }

    #[test]
    fn test_colliding_sources_share_output_path() {
        let a = source_path_to_url(Path::new("posts/a.md"));
        let b = source_path_to_url(Path::new("posts/a/index.md"));
        assert_eq!(url_to_relative_path(&a), url_to_relative_path(&b));
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(absolute_url(Some("https://x.org/"), "/a/"), "https://x.org/a/");
        assert_eq!(absolute_url(Some("https://x.org"), "a/b.css"), "https://x.org/a/b.css");
        assert_eq!(absolute_url(Some("https://x.org"), "/"), "https://x.org/");
        assert_eq!(absolute_url(Some("https://x.org"), "https://y.org/z"), "https://y.org/z");
        assert_eq!(absolute_url(Some("https://x.org"), "//cdn.org/z"), "//cdn.org/z");
        assert_eq!(absolute_url(None, "/a/"), "/a/");
    }

    #[test]
    fn test_base_path_from_config() {
        assert_eq!(
            base_path_from_config(Path::new("/project/folio.yaml")),
            PathBuf::from("/project")
        );
        assert_eq!(
            base_path_from_config(Path::new("folio.yaml")),
            PathBuf::from("")
        );
    }
}
