//! Configuration loading from files.
//!
//! The YAML file is layered with `FOLIO_`-prefixed environment variables,
//! so `FOLIO_WORKER_COUNT=4` overrides `worker_count` and
//! `FOLIO_SITE__URL=...` overrides `site.url`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{Config, ConfigError};

const ENV_PREFIX: &str = "FOLIO";

impl Config {
    /// Absolute path of the config file named on the command line, defaulting to `folio.yaml`
    pub fn resolve_path(config_file: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let config_file = config_file.unwrap_or(Path::new("folio.yaml"));
        if config_file.is_relative() {
            Ok(std::env::current_dir()
                .map_err(ConfigError::CwdFailure)?
                .join(config_file))
        } else {
            Ok(config_file.to_path_buf())
        }
    }

    /// Load the config from a file path, applying environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Load the config with an explicit environment instead of the process one.
    pub(crate) fn load_with_env(
        path: &Path,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        if path.to_str().is_none() {
            return Err(ConfigError::EncodePath(path.to_path_buf()));
        }

        let environment = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(env);

        let config: Config = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("folio.yaml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "site:\n  name: My Blog\ncontent_root: src\nworker_count: 2\npassthrough:\n  - img\n",
        );

        let config = Config::load_with_env(&path, Some(HashMap::new())).unwrap();
        assert_eq!(config.site.name, "My Blog");
        assert_eq!(config.content_root, PathBuf::from("src"));
        assert_eq!(config.worker_count, Some(2));
        assert_eq!(config.passthrough.len(), 1);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "site:\n  name: My Blog\nworker_count: 2\n");

        let env = HashMap::from([
            ("FOLIO_WORKER_COUNT".to_string(), "6".to_string()),
            ("FOLIO_SITE__URL".to_string(), "https://example.com".to_string()),
        ]);
        let config = Config::load_with_env(&path, Some(env)).unwrap();
        assert_eq!(config.worker_count, Some(6));
        assert_eq!(config.site.url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_with_env(&dir.path().join("nope.yaml"), Some(HashMap::new()));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_invalid_worker_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "site:\n  name: Blog\nworker_count: 0\n");
        let result = Config::load_with_env(&path, Some(HashMap::new()));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_resolve_path() {
        let absolute = Path::new("/srv/site/folio.yaml");
        assert_eq!(Config::resolve_path(Some(absolute)).unwrap(), absolute);

        let default = Config::resolve_path(None).unwrap();
        assert!(default.is_absolute());
        assert!(default.ends_with("folio.yaml"));
    }
}
