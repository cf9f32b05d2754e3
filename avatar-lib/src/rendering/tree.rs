use std::sync::Arc;

use derive_more::Debug;
use enumset::EnumSet;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use xxhash_rust::xxh3::Xxh3;

use crate::assets::PartDocument;
use crate::errors::{DocumentError, DocumentResult};
use crate::geometry::GeometryFrame;
use crate::parts::{BodyPart, View};

/// One body part, isolated in its own layer of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub part: BodyPart,
    pub z_index: i32,
    pub file_ref: String,
    document: PartDocument,
    #[debug(skip)]
    customized: Option<Arc<str>>,
}

impl Layer {
    pub(crate) fn new(
        part: BodyPart,
        z_index: i32,
        file_ref: String,
        document: PartDocument,
    ) -> Self {
        Self {
            part,
            z_index,
            file_ref,
            document,
            customized: None,
        }
    }

    #[must_use]
    pub const fn document(&self) -> &PartDocument {
        &self.document
    }

    /// The markup drawn for this layer, after customization.
    #[must_use]
    pub fn markup(&self) -> &str {
        self.customized
            .as_deref()
            .unwrap_or_else(|| self.document.inner_markup())
    }

    /// The markup exactly as it was fetched.
    #[must_use]
    pub fn original_markup(&self) -> &str {
        self.document.inner_markup()
    }

    #[must_use]
    pub const fn is_customized(&self) -> bool {
        self.customized.is_some()
    }

    pub(crate) fn with_markup(&self, markup: Option<String>) -> Self {
        Self {
            customized: markup.map(Into::into),
            ..self.clone()
        }
    }
}

/// The immutable result of compositing one view.
///
/// Layers are kept in draw order: first drawn, furthest back.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualTree {
    view: View,
    frame: GeometryFrame,
    layers: Vec<Layer>,
    missing: EnumSet<BodyPart>,
}

impl VisualTree {
    pub(crate) fn new(
        view: View,
        frame: GeometryFrame,
        mut layers: Vec<Layer>,
        missing: EnumSet<BodyPart>,
    ) -> Self {
        layers.sort_by_key(|layer| (layer.z_index, layer.part.table_index()));

        Self {
            view,
            frame,
            layers,
            missing,
        }
    }

    #[must_use]
    pub const fn view(&self) -> View {
        self.view
    }

    #[must_use]
    pub const fn frame(&self) -> GeometryFrame {
        self.frame
    }

    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Parts that were left out because their document could not be loaded or was empty.
    #[must_use]
    pub const fn missing(&self) -> EnumSet<BodyPart> {
        self.missing
    }

    #[must_use]
    pub fn included(&self) -> EnumSet<BodyPart> {
        self.layers.iter().map(|layer| layer.part).collect()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    #[must_use]
    pub fn draw_order(&self) -> Vec<BodyPart> {
        self.layers.iter().map(|layer| layer.part).collect()
    }

    #[must_use]
    pub fn draw_index(&self, part: BodyPart) -> Option<usize> {
        self.layers.iter().position(|layer| layer.part == part)
    }

    pub(crate) fn map_layers(&self, f: impl Fn(&Layer) -> Layer) -> Self {
        Self {
            layers: self.layers.iter().map(f).collect(),
            ..self.clone()
        }
    }

    /// A hash of everything that ends up on screen. Equal trees have equal fingerprints.
    #[must_use]
    pub fn fingerprint(&self) -> u128 {
        let mut hasher = Xxh3::new();

        hasher.update(<&'static str>::from(self.view).as_bytes());

        for bits in self.frame.bits() {
            hasher.update(&bits.to_le_bytes());
        }

        for layer in &self.layers {
            hasher.update(&(layer.part.table_index() as u64).to_le_bytes());
            hasher.update(&layer.z_index.to_le_bytes());
            hasher.update(layer.markup().as_bytes());
        }

        hasher.digest128()
    }
}

/// Binds a [`VisualTree`] to a standalone svg document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SvgSurface {
    pub width: u32,
    pub height: u32,
}

impl Default for SvgSurface {
    fn default() -> Self {
        Self {
            width: 300,
            height: 400,
        }
    }
}

impl SvgSurface {
    const SVG_NAMESPACE: &'static str = "http://www.w3.org/2000/svg";

    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn render(&self, tree: &VisualTree) -> DocumentResult<String> {
        let mut writer = Writer::new(Vec::new());

        let view_box = tree.frame().to_string();
        let width = self.width.to_string();
        let height = self.height.to_string();

        let root = BytesStart::new("svg").with_attributes([
            ("xmlns", Self::SVG_NAMESPACE),
            ("viewBox", view_box.as_str()),
            ("preserveAspectRatio", "xMidYMid meet"),
            ("width", width.as_str()),
            ("height", height.as_str()),
            ("role", "img"),
            ("aria-label", "user avatar"),
            ("data-view", <&'static str>::from(tree.view())),
        ]);

        Self::write(&mut writer, Event::Start(root))?;

        for layer in tree.layers() {
            let class = format!("body-part {}", layer.part.name());
            let z_index = layer.z_index.to_string();

            let group = BytesStart::new("g").with_attributes([
                ("class", class.as_str()),
                ("data-z-index", z_index.as_str()),
                ("pointer-events", "none"),
            ]);

            Self::write(&mut writer, Event::Start(group))?;
            Self::write(&mut writer, Event::Text(BytesText::from_escaped(layer.markup())))?;
            Self::write(&mut writer, Event::End(BytesEnd::new("g")))?;
        }

        Self::write(&mut writer, Event::End(BytesEnd::new("svg")))?;

        String::from_utf8(writer.into_inner()).map_err(|e| DocumentError::Write(e.to_string()))
    }

    fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> DocumentResult<()> {
        writer
            .write_event(event)
            .map_err(|e| DocumentError::Write(e.to_string()))
    }
}
