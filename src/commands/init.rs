use std::path::Path;

use tracing::info;

use crate::{
    InitArgs,
    config::{Config, FeedConfig},
};

const INDEX_MD: &str = r#"---
title: Home
navigation:
  key: home
---
# {{ site.name }}

{% for post in collections.post | head(n=5) %}
- [{{ post.title }}]({{ post.url }}), {{ post.date | readableDate }}
{% endfor %}
"#;

const FIRST_POST_MD: &str = r#"---
title: My first post
tags: post
date: 2025-01-01
---
Welcome to your new site. Edit `content/posts/first-post.md` to get started.
"#;

const BASE_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{{ page.title }} | {{ site.name }}</title>
  <link rel="alternate" type="application/rss+xml" href="/feed.xml">
</head>
<body>
  <nav>{% for item in nav %}<a href="{{ item.url }}">{{ item.title }}</a>{% endfor %}</nav>
  <main>
    {{ content | safe }}
  </main>
</body>
</html>
"#;

/// The config written by `folio init`.
fn default_config() -> Config {
    let mut config = Config::with_site_name("My Folio Site");
    config.site.url = Some("https://example.com".into());
    config.default_layout = Some("base.html".into());
    config.feed = Some(FeedConfig {
        path: "feed.xml".into(),
        collection: "post".into(),
        limit: 10,
        title: None,
    });
    config
}

pub async fn run(args: &InitArgs) -> Result<(), anyhow::Error> {
    let path = if args.path.is_relative() {
        std::env::current_dir()?.join(&args.path)
    } else {
        args.path.clone()
    };

    if !path.exists() {
        if args.create {
            tokio::fs::create_dir_all(&path).await?;
            info!("Created directory {path}", path = path.display());
        } else {
            return Err(anyhow::anyhow!(
                "Directory does not exist: {path}",
                path = path.display()
            ));
        }
    }

    let config_file = path.join("folio.yaml");
    if config_file.exists() {
        return Err(anyhow::anyhow!(
            "Config file already exists: {config_file}",
            config_file = config_file.display()
        ));
    }

    info!("Initializing project in {}", path.display());

    let config = default_config();
    let config_text = serde_yaml::to_string(&config)?;
    tokio::fs::write(&config_file, config_text).await?;
    info!(
        "Created config file {config_file}",
        config_file = config_file.display()
    );

    let content_root = path.join(&config.content_root);
    let layouts_dir = path.join(&config.layouts_dir);
    write_starter(&content_root.join("index.md"), INDEX_MD).await?;
    write_starter(&content_root.join("posts/first-post.md"), FIRST_POST_MD).await?;
    write_starter(&layouts_dir.join("base.html"), BASE_HTML).await?;

    Ok(())
}

/// Write a starter file unless something is already there.
async fn write_starter(path: &Path, contents: &str) -> Result<(), anyhow::Error> {
    if path.exists() {
        info!("Keeping existing {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    info!("Created {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Builder;

    #[tokio::test]
    async fn test_init_creates_buildable_project() {
        let dir = tempfile::tempdir().unwrap();
        let args = InitArgs {
            path: dir.path().join("site"),
            create: true,
        };
        run(&args).await.unwrap();

        let root = dir.path().join("site");
        let config = Config::load(&root.join("folio.yaml")).unwrap();
        assert_eq!(config.site.name, "My Folio Site");

        let result = Builder::new(config, root.clone(), true).build().unwrap();
        assert_eq!(result.documents_rendered, 2);

        let index = std::fs::read_to_string(root.join("_site/index.html")).unwrap();
        assert!(index.contains("<title>Home | My Folio Site</title>"));
        assert!(index.contains("/posts/first-post/"));
        assert!(index.contains("01 Jan 2025"));
        assert!(root.join("_site/feed.xml").exists());
    }

    #[tokio::test]
    async fn test_init_refuses_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("folio.yaml"), "site:\n  name: Mine\n").unwrap();
        let args = InitArgs {
            path: dir.path().to_path_buf(),
            create: false,
        };
        assert!(run(&args).await.is_err());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("folio.yaml")).unwrap(),
            "site:\n  name: Mine\n"
        );
    }
}
