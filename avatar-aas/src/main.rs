use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use avatar_aas_lib::config::AvatarConfiguration;
use avatar_aas_lib::manager::AvatarManager;
use avatar_aas_lib::model::session::{JsonFileSessionStore, SessionStore};
use avatar_aas_lib::telemetry::setup_tracing;
use avatar_lib::parts::View;
use avatar_lib::rendering::RenderOutcome;
use clap::Parser;
use tracing::info;

const CONTAINER: &str = "cli";

/// Composes the logged in user's avatar into a single svg.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Json file holding the current user's profile.
    #[arg(long)]
    profile: PathBuf,

    /// Toml configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// View to render. It is saved to the profile as the preferred view.
    #[arg(long)]
    view: Option<View>,

    /// Read parts from this directory instead of the asset server.
    #[arg(long)]
    assets_dir: Option<PathBuf>,

    /// Where to write the composed svg.
    #[arg(long, short)]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = AvatarConfiguration::load(args.config.as_deref())
        .context("Unable to load configuration")?;

    if let Some(dir) = args.assets_dir {
        config.assets.directory = Some(dir);
    }

    setup_tracing(&config.tracing).context("Unable to set up tracing")?;

    let session = Arc::new(JsonFileSessionStore::new(&args.profile));

    if let Some(view) = args.view {
        let mut user = session
            .current_user()
            .await?
            .with_context(|| format!("No profile at {}", args.profile.display()))?;

        user.avatar.view = view;
        session.update_current_user(user).await?;
    }

    let manager = AvatarManager::from_config(&config, session)?;

    match manager.initialize(CONTAINER).await? {
        RenderOutcome::Assembled(tree) => {
            info!(
                view = %tree.view(),
                missing = tree.missing().len(),
                "Avatar assembled"
            );
        }
        RenderOutcome::Failed(message) => bail!("Unable to render avatar: {message}"),
        other => bail!("Render did not complete: {other:?}"),
    }

    let svg = manager
        .render_svg(CONTAINER)
        .await?
        .context("No avatar was assembled")?;

    tokio::fs::write(&args.output, svg)
        .await
        .with_context(|| format!("Unable to write {}", args.output.display()))?;

    info!(output = %args.output.display(), "Avatar written");

    Ok(())
}
