use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use enumset::EnumSet;
use futures::future::join_all;
use tracing::{debug, error, instrument, warn};

use super::tree::{Layer, VisualTree};
use crate::assets::{AssetStore, PartDocument};
use crate::errors::{RenderError, Result};
use crate::geometry::GeometryNormalizer;
use crate::parts::{LayoutTable, PartSpec, View};

/// How many of a view's parts have settled, successfully or not.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub settled: usize,
    pub total: usize,
}

impl LoadProgress {
    #[must_use]
    pub const fn new(settled: usize, total: usize) -> Self {
        Self { settled, total }
    }

    #[must_use]
    pub const fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }

        (self.settled * 100 / self.total) as u8
    }

    #[must_use]
    pub fn label(&self) -> String {
        format!("Loading avatar… {}/{}", self.settled, self.total)
    }

    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.settled >= self.total
    }
}

/// Fetches every part of a view and stacks the ones that loaded.
pub struct Compositor {
    store: Arc<AssetStore>,
    layout: LayoutTable,
    normalizer: GeometryNormalizer,
}

impl Compositor {
    #[must_use]
    pub const fn new(
        store: Arc<AssetStore>,
        layout: LayoutTable,
        normalizer: GeometryNormalizer,
    ) -> Self {
        Self {
            store,
            layout,
            normalizer,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<AssetStore> {
        &self.store
    }

    #[must_use]
    pub const fn layout(&self) -> &LayoutTable {
        &self.layout
    }

    #[must_use]
    pub const fn normalizer(&self) -> &GeometryNormalizer {
        &self.normalizer
    }

    /// Builds the tree for `view`.
    ///
    /// Parts that fail to load are left out. `on_progress` is called once before anything is
    /// fetched and then every time a part settles.
    #[instrument(skip(self, on_progress))]
    pub async fn compose<F>(&self, view: View, on_progress: F) -> Result<VisualTree>
    where
        F: Fn(LoadProgress) + Send + Sync,
    {
        let specs = self.layout.parts_for(view);
        let total = specs.len();
        let settled = AtomicUsize::new(0);

        on_progress(LoadProgress::new(0, total));

        let loads = specs.into_iter().map(|spec| {
            let settled = &settled;
            let on_progress = &on_progress;

            async move {
                let document = self.load(&spec).await;

                let settled = settled.fetch_add(1, Ordering::AcqRel) + 1;
                on_progress(LoadProgress::new(settled, total));

                (spec, document)
            }
        });

        let companion = async {
            if self.normalizer.needs_documents() {
                self.load_view(view.other()).await
            } else {
                Vec::new()
            }
        };

        let (loaded, companion) = futures::join!(join_all(loads), companion);

        let mut missing = EnumSet::empty();
        let mut layers = Vec::with_capacity(loaded.len());

        for (spec, document) in loaded {
            match document {
                Some(document) => {
                    layers.push(Layer::new(spec.part, spec.z_index, spec.file_ref, document));
                }
                None => {
                    missing.insert(spec.part);
                }
            }
        }

        if layers.is_empty() {
            error!(%view, "No parts could be loaded");
            return Err(RenderError::NoContentLoaded { view });
        }

        let frame = self.normalizer.frame_for(
            view,
            layers.iter().map(Layer::document).chain(companion.iter()),
        );

        let tree = VisualTree::new(view, frame, layers, missing);

        debug!(
            layers = tree.layers().len(),
            missing = tree.missing().len(),
            %frame,
            "Composed view"
        );

        Ok(tree)
    }

    /// Warms the asset store with every part of `view`, returning how many of them loaded.
    #[instrument(skip(self))]
    pub async fn preload(&self, view: View) -> usize {
        let loaded = self.load_view(view).await.len();

        debug!(loaded, "Preloaded view");

        loaded
    }

    async fn load_view(&self, view: View) -> Vec<PartDocument> {
        let specs = self.layout.parts_for(view);

        join_all(specs.iter().map(|spec| self.load(spec)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn load(&self, spec: &PartSpec) -> Option<PartDocument> {
        let text = match self.store.fetch(&spec.file_ref).await {
            Ok(text) => text,
            Err(err) => {
                debug!(part = spec.name(), %err, "Skipping part that failed to load");
                return None;
            }
        };

        let document = PartDocument::parse(text)
            .inspect_err(|err| warn!(part = spec.name(), %err, "Skipping unreadable part"))
            .ok()?;

        if document.is_blank() {
            debug!(part = spec.name(), "Skipping empty part");
            return None;
        }

        Some(document)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use strum::IntoEnumIterator;

    use super::{Compositor, LoadProgress};
    use crate::assets::AssetStore;
    use crate::errors::RenderError;
    use crate::geometry::{ComputedFrame, FrameStrategy, GeometryFrame, GeometryNormalizer};
    use crate::parts::{BodyPart, LayoutTable, View};
    use crate::test_utils::MockAssetSource;

    fn compositor(source: &Arc<MockAssetSource>, normalizer: GeometryNormalizer) -> Compositor {
        Compositor::new(
            Arc::new(AssetStore::new(source.clone())),
            LayoutTable::default(),
            normalizer,
        )
    }

    #[test]
    fn progress_labels() {
        let progress = LoadProgress::new(7, 14);

        assert_eq!(progress.percentage(), 50);
        assert_eq!(progress.label(), "Loading avatar… 7/14");
        assert!(!progress.is_done());
        assert!(LoadProgress::new(14, 14).is_done());
        assert_eq!(LoadProgress::default().percentage(), 100);
    }

    #[tokio::test]
    async fn every_part_is_layered_in_z_order() {
        let layout = LayoutTable::default();
        let source = Arc::new(MockAssetSource::new().with_view(&layout, View::Front));
        let compositor = compositor(&source, GeometryNormalizer::default());

        let seen = Mutex::new(Vec::new());
        let tree = compositor
            .compose(View::Front, |progress| seen.lock().unwrap().push(progress))
            .await
            .expect("all parts are available");

        assert!(tree.is_complete());
        assert_eq!(tree.layers().len(), 14);
        assert_eq!(tree.frame(), GeometryFrame::DEFAULT);

        for pair in tree.layers().windows(2) {
            assert!(pair[0].z_index <= pair[1].z_index);
        }

        assert_eq!(tree.draw_order().first(), Some(&BodyPart::LeftFoot));
        assert_eq!(tree.draw_order().last(), Some(&BodyPart::Head));

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.first(), Some(&LoadProgress::new(0, 14)));
        assert_eq!(seen.last(), Some(&LoadProgress::new(14, 14)));
        assert_eq!(seen.len(), 15);

        assert_eq!(source.total_calls(), 14);
    }

    #[tokio::test]
    async fn missing_and_empty_parts_are_skipped() {
        let layout = LayoutTable::default();
        let source = Arc::new(MockAssetSource::new().with_view(&layout, View::Back));

        source.set_failure(&layout.file_ref(View::Back, BodyPart::LeftHand), 500);
        source.set_document(&layout.file_ref(View::Back, BodyPart::Head), "");
        source.set_document(
            &layout.file_ref(View::Back, BodyPart::RightFoot),
            "<svg viewBox=\"0 0 1 1\"></svg>",
        );
        source.set_document(&layout.file_ref(View::Back, BodyPart::CoreBody), "<html/>");

        let tree = compositor(&source, GeometryNormalizer::default())
            .compose(View::Back, |_| {})
            .await
            .expect("most parts are available");

        let missing = BodyPart::LeftHand | BodyPart::Head | BodyPart::RightFoot | BodyPart::CoreBody;

        assert_eq!(tree.missing(), missing);
        assert_eq!(tree.included(), !missing);
        assert_eq!(tree.layers().len(), 10);
    }

    #[tokio::test]
    async fn nothing_loaded_is_an_error() {
        let source = Arc::new(MockAssetSource::new());

        let result = compositor(&source, GeometryNormalizer::default())
            .compose(View::Front, |_| {})
            .await;

        assert_eq!(result, Err(RenderError::NoContentLoaded { view: View::Front }));
    }

    #[tokio::test]
    async fn computed_frames_match_across_views() {
        let layout = LayoutTable::default();
        let source = Arc::new(
            MockAssetSource::new()
                .with_view(&layout, View::Front)
                .with_view(&layout, View::Back),
        );

        // The back head sticks out further than anything on the front.
        source.set_document(
            &layout.file_ref(View::Back, BodyPart::Head),
            r#"<svg viewBox="-60 -170 120 80"><path d="M0 0"/></svg>"#,
        );

        let compositor = compositor(
            &source,
            GeometryNormalizer::new(
                GeometryFrame::DEFAULT,
                FrameStrategy::Computed(ComputedFrame::default()),
            ),
        );

        let front = compositor.compose(View::Front, |_| {}).await.expect("front");
        let back = compositor.compose(View::Back, |_| {}).await.expect("back");

        assert_eq!(front.frame(), back.frame());
        assert!(front.frame().origin_y < -170.0);

        // Both views were fetched exactly once, thanks to the store.
        for view in View::iter() {
            for part in BodyPart::iter() {
                assert_eq!(source.calls(&layout.file_ref(view, part)), 1);
            }
        }
    }

    #[tokio::test]
    async fn preload_warms_the_store() {
        let layout = LayoutTable::default();
        let source = Arc::new(MockAssetSource::new().with_view(&layout, View::Front));
        let compositor = compositor(&source, GeometryNormalizer::default());

        assert_eq!(compositor.preload(View::Front).await, 14);
        assert_eq!(compositor.store().len().await, 14);

        compositor.compose(View::Front, |_| {}).await.expect("front");

        assert_eq!(source.total_calls(), 14);
    }
}
