use std::fmt::{Display, Formatter};
use std::str::FromStr;

use itertools::Itertools;
use tracing::{debug, warn};

use crate::assets::PartDocument;
use crate::errors::{GeometryError, GeometryResult};
use crate::parts::View;

/// The coordinate box every part is mapped into. Serialized as an svg `viewBox`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryFrame {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
}

impl GeometryFrame {
    pub const DEFAULT: Self = Self::new(-50.0, -150.0, 100.0, 200.0);

    #[must_use]
    pub const fn new(origin_x: f64, origin_y: f64, width: f64, height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn max_x(&self) -> f64 {
        self.origin_x + self.width
    }

    #[must_use]
    pub fn max_y(&self) -> f64 {
        self.origin_y + self.height
    }

    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let origin_x = self.origin_x.min(other.origin_x);
        let origin_y = self.origin_y.min(other.origin_y);

        Self::new(
            origin_x,
            origin_y,
            self.max_x().max(other.max_x()) - origin_x,
            self.max_y().max(other.max_y()) - origin_y,
        )
    }

    #[must_use]
    pub fn padded(&self, padding: f64) -> Self {
        Self::new(
            self.origin_x - padding,
            self.origin_y - padding,
            self.width + padding * 2.0,
            self.height + padding * 2.0,
        )
    }

    /// Grows the frame along one axis until it matches `aspect_ratio`, keeping it centred.
    #[must_use]
    pub fn fit_aspect_ratio(&self, aspect_ratio: f64) -> Self {
        let current = self.aspect_ratio();

        if current > aspect_ratio {
            let height = self.width / aspect_ratio;
            Self::new(
                self.origin_x,
                self.origin_y - (height - self.height) / 2.0,
                self.width,
                height,
            )
        } else if current < aspect_ratio {
            let width = self.height * aspect_ratio;
            Self::new(
                self.origin_x - (width - self.width) / 2.0,
                self.origin_y,
                width,
                self.height,
            )
        } else {
            *self
        }
    }

    #[must_use]
    pub fn rounded(&self, precision: u32) -> Self {
        let factor = 10f64.powi(precision as i32);
        let round = |value: f64| (value * factor).round() / factor;

        Self::new(
            round(self.origin_x),
            round(self.origin_y),
            round(self.width),
            round(self.height),
        )
    }

    pub(crate) fn bits(&self) -> [u64; 4] {
        [
            self.origin_x.to_bits(),
            self.origin_y.to_bits(),
            self.width.to_bits(),
            self.height.to_bits(),
        ]
    }
}

impl Default for GeometryFrame {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Display for GeometryFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.origin_x, self.origin_y, self.width, self.height
        )
    }
}

impl FromStr for GeometryFrame {
    type Err = GeometryError;

    fn from_str(value: &str) -> GeometryResult<Self> {
        let numbers = value
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(f64::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| GeometryError::MalformedViewBox(value.to_owned()))?;

        let Some((origin_x, origin_y, width, height)) = numbers.into_iter().collect_tuple() else {
            return Err(GeometryError::MalformedViewBox(value.to_owned()));
        };

        let frame = Self::new(origin_x, origin_y, width, height);

        if ![origin_x, origin_y, width, height]
            .iter()
            .all(|n| n.is_finite())
        {
            return Err(GeometryError::MalformedViewBox(value.to_owned()));
        }

        if width <= 0.0 || height <= 0.0 {
            return Err(GeometryError::DegenerateViewBox(value.to_owned()));
        }

        Ok(frame)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComputedFrame {
    /// Uniform padding added on every side of the union of the part boxes.
    pub padding: f64,
    /// Width divided by height of the resulting frame.
    pub target_aspect_ratio: f64,
    /// Number of decimals the frame is rounded to.
    pub precision: u32,
}

impl Default for ComputedFrame {
    fn default() -> Self {
        Self {
            padding: 15.0,
            target_aspect_ratio: 0.75,
            precision: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FrameStrategy {
    #[default]
    Fixed,
    Computed(ComputedFrame),
}

/// Picks the frame all parts of a view are drawn into.
///
/// Both strategies produce the same frame size for the front and back views, as long as
/// they are given the same documents.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeometryNormalizer {
    fixed: GeometryFrame,
    strategy: FrameStrategy,
}

impl GeometryNormalizer {
    #[must_use]
    pub const fn new(fixed: GeometryFrame, strategy: FrameStrategy) -> Self {
        Self { fixed, strategy }
    }

    #[must_use]
    pub const fn fixed(frame: GeometryFrame) -> Self {
        Self::new(frame, FrameStrategy::Fixed)
    }

    #[must_use]
    pub const fn strategy(&self) -> FrameStrategy {
        self.strategy
    }

    #[must_use]
    pub const fn fixed_frame(&self) -> GeometryFrame {
        self.fixed
    }

    /// Whether the frame depends on the loaded documents at all.
    #[must_use]
    pub const fn needs_documents(&self) -> bool {
        matches!(self.strategy, FrameStrategy::Computed(_))
    }

    pub fn frame_for<'a>(
        &self,
        view: View,
        documents: impl IntoIterator<Item = &'a PartDocument>,
    ) -> GeometryFrame {
        let FrameStrategy::Computed(computed) = self.strategy else {
            return self.fixed;
        };

        let bounds = documents
            .into_iter()
            .filter_map(|document| {
                let view_box = document.view_box()?;

                view_box
                    .parse::<GeometryFrame>()
                    .inspect_err(|err| warn!(%err, "Ignoring part bounding box"))
                    .ok()
            })
            .reduce(|a, b| a.union(&b));

        let Some(bounds) = bounds else {
            debug!(%view, "No usable bounding box, using the fixed frame");
            return self.fixed;
        };

        let frame = bounds
            .padded(computed.padding)
            .fit_aspect_ratio(computed.target_aspect_ratio)
            .rounded(computed.precision);

        debug!(%view, %frame, "Computed frame");

        frame
    }
}
