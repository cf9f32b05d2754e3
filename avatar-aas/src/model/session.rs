use std::path::{Path, PathBuf};

use async_trait::async_trait;
use avatar_lib::parts::View;
use avatar_lib::rendering::Customization;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::error::{ExplainableExt, Result, SessionError};

/// The logged in user, as stored by the session.
///
/// Fields this crate doesn't know about, at the top level and under `avatar`, are kept so they
/// survive a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub avatar: AvatarSettings,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AvatarSettings {
    pub view: View,
    pub customizations: Customization,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            avatar: AvatarSettings::default(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Where the current user lives. Owned by the surrounding application.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn current_user(&self) -> Result<Option<UserProfile>>;

    async fn update_current_user(&self, profile: UserProfile) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    user: RwLock<Option<UserProfile>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new(user: Option<UserProfile>) -> Self {
        Self {
            user: RwLock::new(user),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn current_user(&self) -> Result<Option<UserProfile>> {
        Ok(self.user.read().await.clone())
    }

    async fn update_current_user(&self, profile: UserProfile) -> Result<()> {
        *self.user.write().await = Some(profile);
        Ok(())
    }
}

/// Keeps the current user in a json file. A missing file means nobody is logged in.
#[derive(Debug)]
pub struct JsonFileSessionStore {
    path: PathBuf,
}

impl JsonFileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for JsonFileSessionStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn current_user(&self) -> Result<Option<UserProfile>> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session file");
                return Ok(None);
            }
            Err(e) => {
                return Err(e).explain_closure(|| {
                    format!("Unable to read session file {}", self.path.display())
                })
            }
        };

        let profile = serde_json::from_slice(&contents).map_err(SessionError::from)?;

        Ok(Some(profile))
    }

    #[instrument(skip(self, profile), fields(path = %self.path.display()))]
    async fn update_current_user(&self, profile: UserProfile) -> Result<()> {
        let contents = serde_json::to_vec_pretty(&profile).map_err(SessionError::from)?;

        tokio::fs::write(&self.path, contents)
            .await
            .explain_closure(|| format!("Unable to write session file {}", self.path.display()))
    }
}
