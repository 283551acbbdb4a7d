use tracing::info;

use crate::{
    CleanArgs,
    build::base_path_from_config,
    config::{Config, resolve_against},
};

pub async fn run(args: &CleanArgs) -> Result<(), anyhow::Error> {
    let config_path = Config::resolve_path(args.config_file.as_deref())?;
    let config = Config::load(&config_path)?;

    // Get the base path for resolving relative paths
    let base_path = base_path_from_config(&config_path);

    // Delete the generated site folder
    let site_path = resolve_against(&base_path, &config.output_root);
    if site_path.exists() {
        if args.dry_run {
            info!("Would delete {}", site_path.display());
        } else {
            tokio::fs::remove_dir_all(&site_path).await?;
            info!("Deleted {}", site_path.display());
        }
    } else {
        info!("Nothing to clean at {}", site_path.display());
    }

    Ok(())
}
