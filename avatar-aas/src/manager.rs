use std::collections::HashMap;
use std::sync::Arc;

use avatar_lib::assets::{AssetSource, AssetStore};
use avatar_lib::parts::View;
use avatar_lib::rendering::{
    Compositor, Customization, Customizer, ReentrancyPolicy, RenderController, RenderOutcome,
    RenderState, SvgSurface,
};
use derive_more::Debug;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::config::AvatarConfiguration;
use crate::error::{AvatarServiceError, Result};
use crate::model::resolver::asset_source;
use crate::model::session::{SessionStore, UserProfile};

/// Binds avatar containers to render controllers and keeps the session in sync with them.
///
/// All containers share a single asset store.
#[derive(Debug)]
pub struct AvatarManager {
    #[debug(skip)]
    compositor: Arc<Compositor>,
    customizer: Customizer,
    policy: ReentrancyPolicy,
    surface: SvgSurface,
    #[debug(skip)]
    session: Arc<dyn SessionStore>,
    #[debug(skip)]
    containers: RwLock<HashMap<String, Arc<RenderController>>>,
}

impl AvatarManager {
    pub fn new(
        config: &AvatarConfiguration,
        source: Arc<dyn AssetSource>,
        session: Arc<dyn SessionStore>,
    ) -> Self {
        let compositor = Compositor::new(
            Arc::new(AssetStore::new(source)),
            config.layout.layout_table(),
            config.geometry.normalizer(),
        );

        Self {
            compositor: Arc::new(compositor),
            customizer: Customizer::new(config.customization.palette()),
            policy: config.rendering.policy(),
            surface: config.rendering.surface(),
            session,
            containers: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(
        config: &AvatarConfiguration,
        session: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        Ok(Self::new(config, asset_source(&config.assets)?, session))
    }

    #[must_use]
    pub const fn surface(&self) -> SvgSurface {
        self.surface
    }

    /// Binds `container` and renders the current user's saved view into it.
    #[instrument(skip(self))]
    pub async fn initialize(&self, container: &str) -> Result<RenderOutcome> {
        let user = self
            .session
            .current_user()
            .await?
            .ok_or(AvatarServiceError::NoCurrentUser)?;

        info!(username = %user.username, view = %user.avatar.view, "Initializing avatar");

        let controller = self.controller_or_create(container).await;
        controller.set_customization(user.avatar.customizations);

        Ok(controller.render_view(user.avatar.view).await)
    }

    /// Shows `view` in `container` and remembers it as the user's preferred view.
    #[instrument(skip(self))]
    pub async fn switch_view(&self, container: &str, view: View) -> Result<RenderOutcome> {
        let controller = self.controller(container).await?;

        self.persist(|user| user.avatar.view = view).await;

        Ok(controller.switch_view(view).await)
    }

    /// Renders the failed view of `container` again.
    #[instrument(skip(self))]
    pub async fn retry(&self, container: &str) -> Result<RenderOutcome> {
        Ok(self.controller(container).await?.retry().await)
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, container: &str) -> Result<bool> {
        Ok(self.controller(container).await?.cancel().await)
    }

    /// Applies a new customization to `container` and saves it to the session.
    #[instrument(skip(self))]
    pub async fn customize(&self, container: &str, customization: Customization) -> Result<()> {
        let controller = self.controller(container).await?;

        controller.set_customization(customization.clone());

        self.persist(|user| user.avatar.customizations = customization).await;

        Ok(())
    }

    /// Fetches every part of `view` ahead of time so a later render is instant.
    pub async fn preload(&self, view: View) -> usize {
        self.compositor.preload(view).await
    }

    pub async fn subscribe(&self, container: &str) -> Result<watch::Receiver<RenderState>> {
        Ok(self.controller(container).await?.subscribe())
    }

    pub async fn state(&self, container: &str) -> Result<RenderState> {
        Ok(self.controller(container).await?.state())
    }

    /// The svg currently assembled in `container`, if any.
    pub async fn render_svg(&self, container: &str) -> Result<Option<String>> {
        let state = self.state(container).await?;

        state
            .tree()
            .map(|tree| self.surface.render(tree))
            .transpose()
            .map_err(Into::into)
    }

    /// Writes a change back to the current user. Failures are logged, never returned.
    async fn persist(&self, update: impl FnOnce(&mut UserProfile) + Send) {
        let mut user = match self.session.current_user().await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!("No user to save the change for");
                return;
            }
            Err(err) => {
                warn!(%err, "Unable to read the current user");
                return;
            }
        };

        update(&mut user);

        if let Err(err) = self.session.update_current_user(user).await {
            warn!(%err, "Unable to save the current user");
        }
    }

    async fn controller(&self, container: &str) -> Result<Arc<RenderController>> {
        self.containers
            .read()
            .await
            .get(container)
            .cloned()
            .ok_or_else(|| AvatarServiceError::UnknownContainer(container.to_owned()))
    }

    async fn controller_or_create(&self, container: &str) -> Arc<RenderController> {
        let mut containers = self.containers.write().await;

        containers
            .entry(container.to_owned())
            .or_insert_with(|| {
                debug!("Binding new container");

                Arc::new(
                    RenderController::new(self.compositor.clone(), self.customizer.clone())
                        .with_policy(self.policy),
                )
            })
            .clone()
    }
}
