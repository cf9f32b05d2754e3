use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use avatar_lib::assets::AssetSource;
use avatar_lib::errors::{FetchError, FetchResult};
use tracing::instrument;

/// Reads part documents from a local directory, e.g. a checkout of the asset templates.
pub struct DirectoryAssetSource {
    root: PathBuf,
}

impl DirectoryAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, file_ref: &str) -> FetchResult<PathBuf> {
        let relative = Path::new(file_ref);

        let stays_inside = !file_ref.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !stays_inside {
            return Err(FetchError::InvalidReference(file_ref.to_owned()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AssetSource for DirectoryAssetSource {
    #[instrument(skip(self))]
    async fn fetch(&self, file_ref: &str) -> FetchResult<String> {
        let path = self.path_for(file_ref)?;

        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| FetchError::Io {
                file_ref: file_ref.to_owned(),
                message: e.to_string(),
            })
    }
}
