mod builder;
mod collection;
mod document;
mod feed;
mod filters;
mod format;
mod highlight;
mod loader;
mod markdown;
mod nav;
mod passthrough;
mod paths;
mod pipeline;
mod render;

pub use builder::{BuildError, BuildReport, BuildResult, Builder};
pub use paths::base_path_from_config;
