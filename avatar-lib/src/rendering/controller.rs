use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{AbortHandle, Abortable};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, instrument};

use super::compositor::{Compositor, LoadProgress};
use super::customizer::{Customization, Customizer};
use super::tree::VisualTree;
use crate::errors::RenderError;
use crate::parts::View;

/// What a render container currently shows.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum RenderState {
    #[default]
    Idle,
    Loading {
        view: View,
        progress: LoadProgress,
    },
    Assembled {
        view: View,
        tree: Arc<VisualTree>,
    },
    Error {
        view: View,
        message: String,
    },
}

impl RenderState {
    #[must_use]
    pub const fn view(&self) -> Option<View> {
        match self {
            Self::Idle => None,
            Self::Loading { view, .. } | Self::Assembled { view, .. } | Self::Error { view, .. } => {
                Some(*view)
            }
        }
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    #[must_use]
    pub fn tree(&self) -> Option<&Arc<VisualTree>> {
        match self {
            Self::Assembled { tree, .. } => Some(tree),
            _ => None,
        }
    }
}

/// How a render call ended, from the caller's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Assembled(Arc<VisualTree>),
    Failed(RenderError),
    /// Another render was already loading, nothing was done.
    Dropped,
    /// The requested view is already shown or loading.
    Unchanged,
    /// The render was cancelled or superseded before it finished.
    Cancelled,
}

/// What to do with a render request that arrives while another one is loading.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ReentrancyPolicy {
    /// Ignore the new request.
    #[default]
    DropWhileLoading,
    /// Abort the stale render when a different view is requested.
    SupersedeStale,
}

/// Owns the render state of one avatar container.
///
/// At most one render is loading at any time.
pub struct RenderController {
    compositor: Arc<Compositor>,
    customizer: Customizer,
    policy: ReentrancyPolicy,
    state: watch::Sender<RenderState>,
    customization: watch::Sender<Customization>,
    generation: AtomicU64,
    in_flight: Mutex<Option<(u64, AbortHandle)>>,
}

impl RenderController {
    #[must_use]
    pub fn new(compositor: Arc<Compositor>, customizer: Customizer) -> Self {
        Self {
            compositor,
            customizer,
            policy: ReentrancyPolicy::default(),
            state: watch::Sender::new(RenderState::Idle),
            customization: watch::Sender::new(Customization::default()),
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ReentrancyPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn compositor(&self) -> &Arc<Compositor> {
        &self.compositor
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RenderState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> RenderState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn customization(&self) -> Customization {
        self.customization.borrow().clone()
    }

    /// Replaces the customization, re-applying it to the assembled tree if there is one.
    #[instrument(skip(self))]
    pub fn set_customization(&self, customization: Customization) {
        self.customization.send_replace(customization.clone());

        self.state.send_if_modified(|state| {
            let RenderState::Assembled { tree, .. } = state else {
                return false;
            };

            *tree = Arc::new(self.customizer.apply_customization(tree, &customization));
            true
        });
    }

    /// Renders `view` into this container.
    #[instrument(skip(self))]
    pub async fn render_view(&self, view: View) -> RenderOutcome {
        let total = self.compositor.layout().parts_for(view).len();

        let mut started = None;
        self.state.send_if_modified(|state| {
            if let RenderState::Loading { view: loading, .. } = state {
                let supersede =
                    self.policy == ReentrancyPolicy::SupersedeStale && *loading != view;

                if !supersede {
                    return false;
                }
            }

            started = Some(self.generation.fetch_add(1, Ordering::AcqRel) + 1);
            *state = RenderState::Loading {
                view,
                progress: LoadProgress::new(0, total),
            };

            true
        });

        let Some(generation) = started else {
            debug!("A render is already loading, dropping this one");
            return RenderOutcome::Dropped;
        };

        debug!(generation, "Started loading");

        let (handle, registration) = AbortHandle::new_pair();

        {
            let mut in_flight = self.in_flight.lock().await;

            // Cancelled or superseded before this render could register itself.
            if !self.is_current(generation) {
                debug!(generation, "Render was cancelled before it started");
                return RenderOutcome::Cancelled;
            }

            if let Some((stale, stale_handle)) = in_flight.replace((generation, handle)) {
                debug!(stale, "Aborting stale render");
                stale_handle.abort();
            }
        }

        let render = async {
            let tree = self
                .compositor
                .compose(view, |progress| self.report_progress(generation, progress))
                .await?;

            let customization = self.customization();

            Ok::<_, RenderError>(Arc::new(
                self.customizer.apply_customization(&tree, &customization),
            ))
        };

        let outcome = match Abortable::new(render, registration).await {
            Ok(Ok(tree)) => RenderOutcome::Assembled(tree),
            Ok(Err(err)) => RenderOutcome::Failed(err),
            Err(_) => RenderOutcome::Cancelled,
        };

        self.finish(generation, view, &outcome).await;

        outcome
    }

    /// Renders `view` unless it is already shown or loading.
    #[instrument(skip(self))]
    pub async fn switch_view(&self, view: View) -> RenderOutcome {
        let unchanged = matches!(
            &*self.state.borrow(),
            RenderState::Assembled { view: current, .. } | RenderState::Loading { view: current, .. }
                if *current == view
        );

        if unchanged {
            debug!("View is already shown");
            return RenderOutcome::Unchanged;
        }

        self.render_view(view).await
    }

    /// Renders the failed view again, giving previously failed parts another chance.
    #[instrument(skip(self))]
    pub async fn retry(&self) -> RenderOutcome {
        let failed = match &*self.state.borrow() {
            RenderState::Error { view, .. } => Some(*view),
            _ => None,
        };

        let Some(view) = failed else {
            debug!("Nothing to retry");
            return RenderOutcome::Unchanged;
        };

        self.compositor.store().forget_failures().await;

        self.render_view(view).await
    }

    /// Aborts the loading render, if any, and goes back to idle.
    #[instrument(skip(self))]
    pub async fn cancel(&self) -> bool {
        let cancelled = self.state.send_if_modified(|state| {
            if !state.is_loading() {
                return false;
            }

            self.generation.fetch_add(1, Ordering::AcqRel);
            *state = RenderState::Idle;

            true
        });

        if cancelled {
            if let Some((generation, handle)) = self.in_flight.lock().await.take() {
                debug!(generation, "Cancelling render");
                handle.abort();
            }
        }

        cancelled
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    fn report_progress(&self, generation: u64, new_progress: LoadProgress) {
        self.state.send_if_modified(|state| match state {
            RenderState::Loading { progress, .. } if self.is_current(generation) => {
                *progress = new_progress;
                true
            }
            _ => false,
        });
    }

    async fn finish(&self, generation: u64, view: View, outcome: &RenderOutcome) {
        {
            let mut in_flight = self.in_flight.lock().await;

            if matches!(*in_flight, Some((current, _)) if current == generation) {
                in_flight.take();
            }
        }

        self.state.send_if_modified(|state| {
            if !self.is_current(generation) {
                return false;
            }

            match outcome {
                RenderOutcome::Assembled(tree) => {
                    debug!(%view, "Assembled");
                    *state = RenderState::Assembled {
                        view,
                        tree: tree.clone(),
                    };
                }
                RenderOutcome::Failed(err) => {
                    error!(%view, %err, "Render failed");
                    *state = RenderState::Error {
                        view,
                        message: err.to_string(),
                    };
                }
                RenderOutcome::Cancelled => {
                    *state = RenderState::Idle;
                }
                RenderOutcome::Dropped | RenderOutcome::Unchanged => return false,
            }

            true
        });
    }
}
