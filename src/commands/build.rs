use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, info, warn};

use crate::{
    BuildArgs,
    build::{BuildError, Builder, base_path_from_config},
    config::Config,
};

/// `BUILD_ENV=production` selects a production build; any other value doesn't.
fn is_production_env(build_env: Option<&str>) -> bool {
    build_env == Some("production")
}

pub async fn run(args: &BuildArgs) -> Result<(), anyhow::Error> {
    let config_path = Config::resolve_path(args.config_file.as_deref())?;
    let config = Config::load(&config_path)?;

    // Get the base path for resolving relative paths
    let base_path = base_path_from_config(&config_path);

    let is_production =
        args.production || is_production_env(std::env::var("BUILD_ENV").ok().as_deref());
    info!(config = %config_path.display(), production = is_production, "building site");

    // Ctrl-C stops the build at the next phase boundary
    let cancel = Arc::new(AtomicBool::new(false));
    let signal_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling build");
            signal_flag.store(true, Ordering::Relaxed);
        }
    });

    let builder = Builder::new(config, base_path, is_production).with_cancel_flag(cancel);
    let result = match tokio::task::spawn_blocking(move || builder.build()).await? {
        Ok(result) => result,
        Err(BuildError::Documents(report)) => {
            for e in &report.errors {
                error!("{e}");
            }
            anyhow::bail!(
                "build failed with {} error(s) while {}; nothing was written",
                report.errors.len(),
                report.phase
            );
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        "Built site to {} ({} documents, {} files written, {} files copied)",
        result.output_root.display(),
        result.documents_rendered,
        result.files_written,
        result.files_copied
    );
    if result.drafts_skipped > 0 {
        info!("Skipped {} draft(s)", result.drafts_skipped);
    }

    if !result.copy_errors.is_empty() {
        for e in &result.copy_errors {
            error!("{e}");
        }
        anyhow::bail!(
            "{} passthrough path(s) could not be copied",
            result.copy_errors.len()
        );
    }

    Ok(())
}
