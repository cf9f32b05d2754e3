pub mod layout;
pub mod types;

pub use layout::{LayoutTable, PartSpec};
pub use types::{BodyPart, Side, View, UNDER_ARM};
