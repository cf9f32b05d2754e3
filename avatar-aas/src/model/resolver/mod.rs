use std::sync::Arc;

use avatar_lib::assets::AssetSource;
use tracing::info;

use crate::config::AssetsConfiguration;
use crate::error::Result;

pub mod directory;
pub mod remote;

pub use self::directory::DirectoryAssetSource;
pub use self::remote::HttpAssetSource;

/// Picks where part documents are read from.
pub fn asset_source(config: &AssetsConfiguration) -> Result<Arc<dyn AssetSource>> {
    if let Some(directory) = &config.directory {
        info!(directory = %directory.display(), "Reading parts from a local directory");

        return Ok(Arc::new(DirectoryAssetSource::new(directory)));
    }

    info!(base_url = %config.base_url, "Fetching parts over http");

    Ok(Arc::new(HttpAssetSource::new(
        &config.base_url,
        config.rate_limit_per_second,
        config.request_timeout,
    )?))
}
