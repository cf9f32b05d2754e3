use std::path::{Path, PathBuf};
use std::time::Duration;

use avatar_lib::geometry::{ComputedFrame, FrameStrategy, GeometryFrame, GeometryNormalizer};
use avatar_lib::parts::LayoutTable;
use avatar_lib::rendering::{ReentrancyPolicy, SkinPalette, SvgSurface};
use derive_more::Debug;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use strum::{Display, EnumString};
use twelf::{config, Layer};

use crate::error::AvatarServiceError;

#[config]
#[derive(Default, Debug)]
pub struct AvatarConfiguration {
    pub assets: AssetsConfiguration,
    pub layout: LayoutConfiguration,
    pub geometry: GeometryConfiguration,
    pub customization: CustomizationConfiguration,
    pub rendering: RenderingConfiguration,
    pub tracing: TracingConfiguration,
}

impl AvatarConfiguration {
    pub const ENV_PREFIX: &'static str = "AVATAR_";

    /// Loads the configuration from the defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> crate::error::Result<Self> {
        let mut layers = vec![Layer::DefaultTrait];

        if let Some(path) = path {
            layers.push(Layer::Toml(path.to_path_buf()));
        }

        layers.push(Layer::Env(Some(Self::ENV_PREFIX.to_string())));

        let config = Self::with_layers(&layers)?;
        config.geometry.validate()?;

        Ok(config)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct AssetsConfiguration {
    /// The base url every part file name is resolved against.
    pub base_url: String,

    /// Serve the part files from this directory instead of over http.
    pub directory: Option<PathBuf>,

    /// The rate limit to use for requests to the asset server in a 1 second window.
    pub rate_limit_per_second: u64,

    /// How long a single part request may take before it is considered failed.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for AssetsConfiguration {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            directory: None,
            rate_limit_per_second: 32,
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct LayoutConfiguration {
    /// Part file names. `{view}` is replaced with `front` or `back`, `{part}` with e.g. `LeftUpperArm`.
    pub file_pattern: String,
}

impl Default for LayoutConfiguration {
    fn default() -> Self {
        Self {
            file_pattern: LayoutTable::DEFAULT_FILE_PATTERN.to_string(),
        }
    }
}

impl LayoutConfiguration {
    #[must_use]
    pub fn layout_table(&self) -> LayoutTable {
        LayoutTable::new(self.file_pattern.clone())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GeometryStrategy {
    /// Always use `frame`.
    #[default]
    Fixed,
    /// Fit the frame around the bounding boxes declared by the parts of both views.
    Computed,
}

#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct GeometryConfiguration {
    pub strategy: GeometryStrategy,

    /// The fixed frame, as an svg viewBox. Also the fallback for the computed strategy.
    #[serde_as(as = "DisplayFromStr")]
    pub frame: GeometryFrame,

    /// Padding added around the computed bounds.
    pub padding: f64,

    /// Width divided by height of the computed frame.
    pub target_aspect_ratio: f64,

    /// Decimals the computed frame is rounded to.
    pub precision: u32,
}

impl Default for GeometryConfiguration {
    fn default() -> Self {
        let computed = ComputedFrame::default();

        Self {
            strategy: GeometryStrategy::default(),
            frame: GeometryFrame::DEFAULT,
            padding: computed.padding,
            target_aspect_ratio: computed.target_aspect_ratio,
            precision: computed.precision,
        }
    }
}

impl GeometryConfiguration {
    /// Rejects values that would put `inf` or `NaN` into the computed viewBox.
    pub fn validate(&self) -> crate::error::Result<()> {
        let invalid = |message: String| -> crate::error::Result<()> {
            Err(AvatarServiceError::InvalidConfiguration(message))
        };

        if !self.target_aspect_ratio.is_finite() || self.target_aspect_ratio <= 0.0 {
            return invalid(format!(
                "geometry.target_aspect_ratio must be a positive number, got {}",
                self.target_aspect_ratio
            ));
        }

        if !self.padding.is_finite() || self.padding < 0.0 {
            return invalid(format!(
                "geometry.padding must be zero or a positive number, got {}",
                self.padding
            ));
        }

        Ok(())
    }

    #[must_use]
    pub fn normalizer(&self) -> GeometryNormalizer {
        let strategy = match self.strategy {
            GeometryStrategy::Fixed => FrameStrategy::Fixed,
            GeometryStrategy::Computed => FrameStrategy::Computed(ComputedFrame {
                padding: self.padding,
                target_aspect_ratio: self.target_aspect_ratio,
                precision: self.precision,
            }),
        };

        GeometryNormalizer::new(self.frame, strategy)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CustomizationConfiguration {
    /// Fill colour prefixes that mark a primitive as skin.
    pub skin_palette: Vec<String>,
}

impl Default for CustomizationConfiguration {
    fn default() -> Self {
        Self {
            skin_palette: SkinPalette::DEFAULT_PREFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl CustomizationConfiguration {
    #[must_use]
    pub fn palette(&self) -> SkinPalette {
        SkinPalette::new(&self.skin_palette)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
#[serde(default)]
pub struct RenderingConfiguration {
    /// Width of the rendered svg.
    pub width: u32,
    /// Height of the rendered svg.
    pub height: u32,
    /// Whether switching to another view aborts a render that is still loading.
    pub supersede_stale_renders: bool,
}

impl Default for RenderingConfiguration {
    fn default() -> Self {
        let surface = SvgSurface::default();

        Self {
            width: surface.width,
            height: surface.height,
            supersede_stale_renders: false,
        }
    }
}

impl RenderingConfiguration {
    #[must_use]
    pub const fn surface(&self) -> SvgSurface {
        SvgSurface::new(self.width, self.height)
    }

    #[must_use]
    pub const fn policy(&self) -> ReentrancyPolicy {
        if self.supersede_stale_renders {
            ReentrancyPolicy::SupersedeStale
        } else {
            ReentrancyPolicy::DropWhileLoading
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct TracingConfiguration {
    /// Filter used when `RUST_LOG` isn't set.
    pub filter: String,
    /// Log as json lines instead of human readable text.
    pub json: bool,
}

impl Default for TracingConfiguration {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

fn default_base_url() -> String {
    "https://raw.githubusercontent.com/sxdgoth/jogang/main/template/".to_string()
}
