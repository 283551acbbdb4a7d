//! Named template filters.
//!
//! The registry maps names to pure functions over JSON values. It is built
//! once before a build starts and then shared read-only; the template
//! engine reaches filters through [`FilterRegistry::install`].
//!
//! Built-in filters:
//!
//! | name | usage | result |
//! |---|---|---|
//! | `readableDate` | `{{ page.date \| readableDate }}` | `06 Jun 2025` |
//! | `htmlDateString` | `{{ page.date \| htmlDateString }}` | `2025-06-06` |
//! | `head` | `{{ collections.posts \| head(n=3) }}` | first 3, or last 3 for `n=-3` |
//! | `min` | `{{ a \| min(other=b) }}` | the smaller number |
//! | `absoluteUrl` | `{{ page.url \| absoluteUrl }}` | `https://example.com/posts/a/` (`base=` overrides `site.url`) |
//! | `dateToRfc3339` | `{{ page.date \| dateToRfc3339 }}` | `2025-06-06T00:00:00Z` |
//! | `getNewestCollectionItemDate` | `{{ collections.post \| getNewestCollectionItemDate }}` | newest `date`, RFC 3339 |

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use super::document::parse_date;
use super::paths::absolute_url;

#[derive(thiserror::Error, Debug)]
pub enum FilterError {
    #[error("filter '{0}' is already registered")]
    DuplicateName(String),

    #[error("unknown filter '{0}'")]
    UnknownFilter(String),

    #[error("filter '{0}' requires at least one argument")]
    NoArguments(String),

    #[error("filter '{filter}': {message}")]
    InvalidArgument { filter: String, message: String },
}

impl FilterError {
    fn invalid(filter: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            filter: filter.to_string(),
            message: message.into(),
        }
    }
}

/// A filter function. The first argument is the piped value.
pub type FilterFn = dyn Fn(&[Value]) -> Result<Value, FilterError> + Send + Sync;

#[derive(Clone)]
struct Filter {
    func: Arc<FilterFn>,
    /// Named template arguments, appended after the piped value in this order
    params: Vec<String>,
}

/// Registry of named filters.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: BTreeMap<String, Filter>,
}

impl FilterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in filters. `site_url` is the base
    /// `absoluteUrl` joins onto when no `base` argument is given.
    pub fn with_builtins(site_url: Option<&str>) -> Result<Self, FilterError> {
        let mut registry = Self::new();
        registry.register("readableDate", readable_date)?;
        registry.register("htmlDateString", html_date_string)?;
        registry.register("dateToRfc3339", date_to_rfc3339)?;
        registry.register("getNewestCollectionItemDate", newest_collection_item_date)?;
        registry.register_with_params("head", &["n"], head)?;
        registry.register_with_params("min", &["other"], min)?;

        let site_url = site_url.map(str::to_string);
        registry.register_with_params("absoluteUrl", &["base"], move |args| {
            absolute_url_filter(args, site_url.as_deref())
        })?;
        Ok(registry)
    }

    /// Register a filter taking only the piped value.
    pub fn register<F>(&mut self, name: &str, func: F) -> Result<(), FilterError>
    where
        F: Fn(&[Value]) -> Result<Value, FilterError> + Send + Sync + 'static,
    {
        self.register_with_params(name, &[], func)
    }

    /// Register a filter with named template parameters.
    ///
    /// `{{ x | head(n=3) }}` invokes `head` with `[x, 3]`.
    pub fn register_with_params<F>(
        &mut self,
        name: &str,
        params: &[&str],
        func: F,
    ) -> Result<(), FilterError>
    where
        F: Fn(&[Value]) -> Result<Value, FilterError> + Send + Sync + 'static,
    {
        self.insert(
            name,
            Filter {
                func: Arc::new(func),
                params: params.iter().map(|p| p.to_string()).collect(),
            },
        )
    }

    /// Make an existing filter available under another name.
    pub fn alias(&mut self, alias: &str, target: &str) -> Result<(), FilterError> {
        let filter = self
            .filters
            .get(target)
            .cloned()
            .ok_or_else(|| FilterError::UnknownFilter(target.to_string()))?;
        self.insert(alias, filter)
    }

    fn insert(&mut self, name: &str, filter: Filter) -> Result<(), FilterError> {
        if self.filters.contains_key(name) {
            return Err(FilterError::DuplicateName(name.to_string()));
        }
        self.filters.insert(name.to_string(), filter);
        Ok(())
    }

    /// Look up and call a filter.
    pub fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, FilterError> {
        let filter = self
            .filters
            .get(name)
            .ok_or_else(|| FilterError::UnknownFilter(name.to_string()))?;
        (filter.func)(args)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    /// Register every filter with a Tera instance. Templates call filters
    /// through [`FilterRegistry::invoke`] on a shared copy of the registry.
    pub fn install(&self, tera: &mut tera::Tera) {
        let registry = Arc::new(self.clone());
        for (name, filter) in &self.filters {
            tera.register_filter(
                name,
                TeraFilter {
                    name: name.clone(),
                    params: filter.params.clone(),
                    registry: Arc::clone(&registry),
                },
            );
        }
    }
}

/// Adapter from a registry filter to Tera's filter interface.
struct TeraFilter {
    name: String,
    params: Vec<String>,
    registry: Arc<FilterRegistry>,
}

impl tera::Filter for TeraFilter {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        if let Some(unexpected) = args.keys().find(|k| !self.params.contains(k)) {
            return Err(tera::Error::msg(format!(
                "filter '{}' has no argument named '{}'",
                self.name, unexpected
            )));
        }

        let mut argv = Vec::with_capacity(1 + self.params.len());
        argv.push(value.clone());
        argv.extend(self.params.iter().filter_map(|p| args.get(p).cloned()));

        self.registry
            .invoke(&self.name, &argv)
            .map_err(|e| tera::Error::msg(e.to_string()))
    }
}

// =============================================================================
// Built-in filters
// =============================================================================

fn date_arg(filter: &str, args: &[Value]) -> Result<DateTime<Utc>, FilterError> {
    match args.first() {
        None => Err(FilterError::NoArguments(filter.to_string())),
        Some(Value::String(s)) => {
            parse_date(s).ok_or_else(|| FilterError::invalid(filter, format!("invalid date '{s}'")))
        }
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| FilterError::invalid(filter, format!("invalid timestamp {n}"))),
        Some(other) => Err(FilterError::invalid(
            filter,
            format!("expected a date, got {other}"),
        )),
    }
}

/// `06 Jun 2025`, in UTC.
fn readable_date(args: &[Value]) -> Result<Value, FilterError> {
    let date = date_arg("readableDate", args)?;
    Ok(Value::String(date.format("%d %b %Y").to_string()))
}

/// `2025-06-06`, in UTC.
fn html_date_string(args: &[Value]) -> Result<Value, FilterError> {
    let date = date_arg("htmlDateString", args)?;
    Ok(Value::String(date.format("%Y-%m-%d").to_string()))
}

/// `2025-06-06T00:00:00Z`, whole seconds in UTC.
fn date_to_rfc3339(args: &[Value]) -> Result<Value, FilterError> {
    let date = date_arg("dateToRfc3339", args)?;
    Ok(Value::String(date.to_rfc3339_opts(SecondsFormat::Secs, true)))
}

/// Newest `date` among a collection's page summaries, as RFC 3339.
/// An empty collection has no newest date.
fn newest_collection_item_date(args: &[Value]) -> Result<Value, FilterError> {
    const NAME: &str = "getNewestCollectionItemDate";
    let items = match args.first() {
        None => return Err(FilterError::NoArguments(NAME.to_string())),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(FilterError::invalid(NAME, format!("expected a collection, got {other}")));
        }
    };

    let mut newest: Option<DateTime<Utc>> = None;
    for item in items {
        let date = date_arg(NAME, std::slice::from_ref(&item["date"]))?;
        newest = newest.max(Some(date));
    }
    Ok(newest
        .map(|date| Value::String(date.to_rfc3339_opts(SecondsFormat::Secs, true)))
        .unwrap_or(Value::Null))
}

/// Join a URL onto `base` (or the site URL); absolute URLs pass through.
fn absolute_url_filter(args: &[Value], site_url: Option<&str>) -> Result<Value, FilterError> {
    const NAME: &str = "absoluteUrl";
    let url = match args.first() {
        None => return Err(FilterError::NoArguments(NAME.to_string())),
        Some(Value::String(url)) => url,
        Some(other) => {
            return Err(FilterError::invalid(NAME, format!("expected a URL, got {other}")));
        }
    };
    let base = match args.get(1) {
        None | Some(Value::Null) => site_url,
        Some(Value::String(base)) => Some(base.as_str()),
        Some(other) => {
            return Err(FilterError::invalid(NAME, format!("'base' must be a string, got {other}")));
        }
    };
    Ok(Value::String(absolute_url(base, url)))
}

/// First `n` elements, or the last `|n|` for negative `n`.
fn head(args: &[Value]) -> Result<Value, FilterError> {
    let Some(Value::Array(items)) = args.first() else {
        return Ok(Value::Array(Vec::new()));
    };
    if items.is_empty() {
        return Ok(Value::Array(Vec::new()));
    }

    let n = args
        .get(1)
        .and_then(Value::as_i64)
        .ok_or_else(|| FilterError::invalid("head", "'n' must be an integer"))?;

    let len = items.len();
    let slice = if n < 0 {
        let count = usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX).min(len);
        &items[len - count..]
    } else {
        let count = usize::try_from(n).unwrap_or(usize::MAX).min(len);
        &items[..count]
    };
    Ok(Value::Array(slice.to_vec()))
}

/// The smallest numeric argument.
fn min(args: &[Value]) -> Result<Value, FilterError> {
    let mut smallest: Option<(&Value, f64)> = None;
    for arg in args {
        let n = arg
            .as_f64()
            .ok_or_else(|| FilterError::invalid("min", format!("expected a number, got {arg}")))?;
        if smallest.is_none_or(|(_, current)| n < current) {
            smallest = Some((arg, n));
        }
    }
    smallest
        .map(|(value, _)| value.clone())
        .ok_or_else(|| FilterError::NoArguments("min".to_string()))
}
