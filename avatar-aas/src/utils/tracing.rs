use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::TracingConfiguration;
use crate::error::{Result, TracingError};

/// Installs the global subscriber. `RUST_LOG` wins over the configured filter.
pub fn setup_tracing(config: &TracingConfiguration) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter).map_err(TracingError::from)?,
    };

    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(fmt::layer().json())
            .try_init()
            .map_err(TracingError::from)?;
    } else {
        registry
            .with(fmt::layer().with_target(true))
            .try_init()
            .map_err(TracingError::from)?;
    }

    Ok(())
}
