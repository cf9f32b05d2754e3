use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, instrument, trace, warn};

use crate::errors::{FetchError, FetchResult};

/// Where part documents come from.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Retrieves the raw text of the document named `file_ref`.
    ///
    /// This is called at most once per `file_ref` for as long as the result stays cached.
    async fn fetch(&self, file_ref: &str) -> FetchResult<String>;
}

#[derive(Debug, Clone)]
enum CachedAsset {
    Loaded(Arc<str>),
    Failed(FetchError),
}

impl CachedAsset {
    fn to_result(&self) -> FetchResult<Arc<str>> {
        match self {
            Self::Loaded(text) => Ok(text.clone()),
            Self::Failed(err) => Err(err.clone()),
        }
    }
}

type AssetCell = Arc<OnceCell<CachedAsset>>;

/// Memoizes part documents by file reference for the lifetime of the store.
///
/// Loaded documents, including empty ones, are never evicted. Failures are cached too so a
/// single render never asks twice, but [`AssetStore::forget_failures`] makes them retryable.
/// Concurrent requests for the same reference share a single call to the source.
pub struct AssetStore {
    source: Arc<dyn AssetSource>,
    entries: RwLock<HashMap<String, AssetCell>>,
}

impl AssetStore {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            entries: RwLock::new(HashMap::new()),
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn fetch(&self, file_ref: &str) -> FetchResult<Arc<str>> {
        let cell = self.entry(file_ref).await;

        if let Some(cached) = cell.get() {
            trace!("Asset cache hit");
            return cached.to_result();
        }

        cell.get_or_init(|| async {
            debug!("Fetching asset");

            match self.source.fetch(file_ref).await {
                Ok(text) => CachedAsset::Loaded(text.into()),
                Err(err) => {
                    warn!(%err, "Unable to fetch asset");
                    CachedAsset::Failed(err)
                }
            }
        })
        .await
        .to_result()
    }

    async fn entry(&self, file_ref: &str) -> AssetCell {
        if let Some(cell) = self.entries.read().await.get(file_ref) {
            return cell.clone();
        }

        let mut entries = self.entries.write().await;

        entries.entry(file_ref.to_owned()).or_default().clone()
    }

    /// Returns the cached outcome for `file_ref` without touching the source.
    pub async fn cached(&self, file_ref: &str) -> Option<FetchResult<Arc<str>>> {
        let entries = self.entries.read().await;

        entries
            .get(file_ref)
            .and_then(|cell| cell.get())
            .map(CachedAsset::to_result)
    }

    /// Drops every cached failure so the next fetch goes back to the source.
    ///
    /// Returns how many entries were dropped.
    #[instrument(level = "debug", skip(self))]
    pub async fn forget_failures(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();

        entries.retain(|_, cell| !matches!(cell.get(), Some(CachedAsset::Failed(_))));

        let forgotten = before - entries.len();
        debug!(forgotten, "Forgot failed assets");

        forgotten
    }

    /// Number of settled entries, successful or not.
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;

        entries.values().filter(|cell| cell.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
