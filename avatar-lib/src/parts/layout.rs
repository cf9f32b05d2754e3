use strum::IntoEnumIterator;

use super::types::{BodyPart, View};

/// A single entry of the layout table: which document to fetch for a part, and where to draw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSpec {
    pub part: BodyPart,
    pub file_ref: String,
    pub z_index: i32,
}

impl PartSpec {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.part.name()
    }
}

/// Maps a view and a part to the document holding its graphics.
///
/// The file pattern may reference `{view}` (`front`/`back`) and `{part}` (`LeftUpperArm`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutTable {
    file_pattern: String,
}

impl Default for LayoutTable {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FILE_PATTERN)
    }
}

impl LayoutTable {
    pub const DEFAULT_FILE_PATTERN: &'static str = "{view}-body-flesh-{part}.svg";

    pub fn new(file_pattern: impl Into<String>) -> Self {
        Self {
            file_pattern: file_pattern.into(),
        }
    }

    #[must_use]
    pub fn file_pattern(&self) -> &str {
        &self.file_pattern
    }

    #[must_use]
    pub fn file_ref(&self, view: View, part: BodyPart) -> String {
        self.file_pattern
            .replace("{view}", &view.to_string())
            .replace("{part}", &part.file_stem())
    }

    #[must_use]
    pub fn spec_for(&self, view: View, part: BodyPart) -> PartSpec {
        PartSpec {
            part,
            file_ref: self.file_ref(view, part),
            z_index: part.z_index(),
        }
    }

    /// All the parts making up the given view, in table order.
    #[must_use]
    pub fn parts_for(&self, view: View) -> Vec<PartSpec> {
        BodyPart::iter()
            .map(|part| self.spec_for(view, part))
            .collect()
    }
}
