pub mod compositor;
pub mod controller;
pub mod customizer;
pub mod tree;

pub use compositor::{Compositor, LoadProgress};
pub use controller::{ReentrancyPolicy, RenderController, RenderOutcome, RenderState};
pub use customizer::{Customization, Customizer, ItemId, SkinColor, SkinPalette};
pub use tree::{Layer, SvgSurface, VisualTree};
