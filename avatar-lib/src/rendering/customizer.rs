use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::{debug, instrument, trace};

use super::tree::VisualTree;
use crate::errors::CustomizationError;

/// Identifier of a wearable item. Items are carried along but not drawn yet.
pub type ItemId = String;

/// A validated `#rrggbb` colour. `#rgb` shorthands are expanded and everything is lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serializable_parts",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct SkinColor(String);

impl SkinColor {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SkinColor {
    type Err = CustomizationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();

        let valid = trimmed
            .strip_prefix('#')
            .filter(|hex| matches!(hex.len(), 3 | 6))
            .is_some_and(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()));

        if !valid {
            return Err(CustomizationError::InvalidColor(value.to_owned()));
        }

        Ok(Self(normalize_hex(trimmed)))
    }
}

impl TryFrom<String> for SkinColor {
    type Error = CustomizationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SkinColor> for String {
    fn from(value: SkinColor) -> Self {
        value.0
    }
}

impl Display for SkinColor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the user picked for their avatar.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serializable_parts",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct Customization {
    pub skin_color: Option<SkinColor>,
    pub items: Vec<ItemId>,
}

impl Customization {
    #[must_use]
    pub const fn with_skin_color(skin_color: SkinColor) -> Self {
        Self {
            skin_color: Some(skin_color),
            items: Vec::new(),
        }
    }
}

/// The fill colours that are considered skin, as lowercase `#rrggbb` prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinPalette {
    prefixes: Vec<String>,
}

impl SkinPalette {
    pub const DEFAULT_PREFIXES: &'static [&'static str] = &[
        "#f4c", "#f5d", "#fcd", "#ffd", "#eac", "#e0a", "#d8a", "#c68", "#f1c27d", "#e0ac69",
        "#c68642", "#8d5524", "#ffdbac",
    ];

    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let prefixes = prefixes
            .into_iter()
            .map(|prefix| {
                let prefix = prefix.as_ref().trim().to_ascii_lowercase();

                if prefix.starts_with('#') {
                    prefix
                } else {
                    format!("#{prefix}")
                }
            })
            .filter(|prefix| prefix.len() > 1)
            .collect();

        Self { prefixes }
    }

    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Whether `color` (any `#hex` notation) is one of the skin tones.
    #[must_use]
    pub fn matches(&self, color: &str) -> bool {
        let color = normalize_hex(color);

        self.prefixes.iter().any(|prefix| color.starts_with(prefix.as_str()))
    }
}

impl Default for SkinPalette {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFIXES)
    }
}

/// Expands `#rgb`/`#rgba` and lowercases. Anything else is only lowercased.
fn normalize_hex(color: &str) -> String {
    let lower = color.to_ascii_lowercase();

    match lower.strip_prefix('#') {
        Some(hex) if matches!(hex.len(), 3 | 4) => {
            hex.chars().fold(String::from("#"), |mut out, c| {
                out.push(c);
                out.push(c);
                out
            })
        }
        _ => lower,
    }
}

fn fill_attribute() -> &'static Regex {
    static FILL_ATTRIBUTE: OnceLock<Regex> = OnceLock::new();

    FILL_ATTRIBUTE.get_or_init(|| {
        Regex::new(r#"(?P<lead>(?:^|\s)fill\s*=\s*["'])(?P<color>#[0-9A-Fa-f]{3,8})\b"#)
            .expect("fill attribute regex is valid")
    })
}

fn fill_declaration() -> &'static Regex {
    static FILL_DECLARATION: OnceLock<Regex> = OnceLock::new();

    FILL_DECLARATION.get_or_init(|| {
        Regex::new(r#"(?P<lead>(?:^|[\s;{"'])fill\s*:\s*)(?P<color>#[0-9A-Fa-f]{3,8})\b"#)
            .expect("fill declaration regex is valid")
    })
}

/// Recolours skin primitives of a composed tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Customizer {
    palette: SkinPalette,
}

impl Customizer {
    #[must_use]
    pub const fn new(palette: SkinPalette) -> Self {
        Self { palette }
    }

    #[must_use]
    pub const fn palette(&self) -> &SkinPalette {
        &self.palette
    }

    /// Returns a copy of `tree` with `customization` applied.
    ///
    /// Every layer is recoloured from its fetched markup, so applying this any number of times,
    /// or on a tree that was already customized, gives the same result.
    #[instrument(level = "debug", skip_all, fields(view = %tree.view()))]
    pub fn apply_customization(
        &self,
        tree: &VisualTree,
        customization: &Customization,
    ) -> VisualTree {
        if !customization.items.is_empty() {
            trace!(items = customization.items.len(), "Items are not drawn, ignoring them");
        }

        let Some(skin_color) = &customization.skin_color else {
            return tree.map_layers(|layer| layer.with_markup(None));
        };

        let customized = tree.map_layers(|layer| {
            let markup = match self.recolor(layer.original_markup(), skin_color) {
                Cow::Owned(markup) if markup != layer.original_markup() => Some(markup),
                _ => None,
            };

            layer.with_markup(markup)
        });

        debug!(
            %skin_color,
            recolored = customized.layers().iter().filter(|l| l.is_customized()).count(),
            "Applied skin color"
        );

        customized
    }

    /// Replaces every skin fill in `markup` with `skin_color`, leaving everything else as is.
    #[must_use]
    pub fn recolor<'a>(&self, markup: &'a str, skin_color: &SkinColor) -> Cow<'a, str> {
        let replace = |captures: &Captures<'_>| {
            if self.palette.matches(&captures["color"]) {
                format!("{}{}", &captures["lead"], skin_color)
            } else {
                captures[0].to_owned()
            }
        };

        match fill_attribute().replace_all(markup, replace) {
            Cow::Borrowed(markup) => fill_declaration().replace_all(markup, replace),
            Cow::Owned(markup) => {
                Cow::Owned(fill_declaration().replace_all(&markup, replace).into_owned())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use enumset::EnumSet;

    use super::{Customization, Customizer, SkinColor, SkinPalette};
    use crate::assets::PartDocument;
    use crate::errors::CustomizationError;
    use crate::geometry::GeometryFrame;
    use crate::parts::{BodyPart, View};
    use crate::rendering::tree::{Layer, VisualTree};

    const MARKUP: &str = concat!(
        r##"<defs><style>.skin{fill:#F4C7A1;stroke:#f4c7a1}.hair { fill: #1a1a1a }</style></defs>"##,
        r##"<path class="skin" d="M0 0"/>"##,
        r##"<path fill="#f4c7a1" stroke="#000" d="M1 1"/>"##,
        r##"<path fill='#FFDBAC' d="M2 2"/>"##,
        r##"<circle fill="#2e86de" r="1"/>"##,
        r##"<rect style="opacity:.5;fill:#e0ac69" stop-fill="#f4c7a1"/>"##,
        r##"<path fill="url(#grad)"/>"##,
    );

    fn tree(markup: &str) -> VisualTree {
        let document = PartDocument::parse(format!("<svg>{markup}</svg>")).expect("parses");

        VisualTree::new(
            View::Front,
            GeometryFrame::DEFAULT,
            vec![Layer::new(BodyPart::CoreBody, 4, "CoreBody.svg".into(), document)],
            EnumSet::empty(),
        )
    }

    fn color(value: &str) -> SkinColor {
        value.parse().expect("valid color")
    }

    #[test]
    fn skin_colors_are_validated() {
        assert_eq!(color("#AABBCC").as_str(), "#aabbcc");
        assert_eq!(color("#AbC").as_str(), "#aabbcc");
        assert_eq!(
            "aabbcc".parse::<SkinColor>(),
            Err(CustomizationError::InvalidColor("aabbcc".into()))
        );
        assert!("#abcd".parse::<SkinColor>().is_err());
        assert!("#ggg".parse::<SkinColor>().is_err());
    }

    #[test]
    fn palette_matches_prefixes() {
        let palette = SkinPalette::default();

        assert!(palette.matches("#f4c7a1"));
        assert!(palette.matches("#FFDBAC"));
        assert!(palette.matches("#e0ac69"));
        assert!(!palette.matches("#1a1a1a"));
        assert!(!palette.matches("#2e86de"));

        let custom = SkinPalette::new(["ABC", "#123456"]);
        assert_eq!(custom.prefixes(), ["#abc", "#123456"]);
        assert!(custom.matches("#abcdef"));
    }

    #[test]
    fn only_skin_fills_change() {
        let customizer = Customizer::default();
        let recolored = customizer.recolor(MARKUP, &color("#AABBCC"));

        assert_eq!(
            recolored,
            concat!(
                r##"<defs><style>.skin{fill:#aabbcc;stroke:#f4c7a1}.hair { fill: #1a1a1a }</style></defs>"##,
                r##"<path class="skin" d="M0 0"/>"##,
                r##"<path fill="#aabbcc" stroke="#000" d="M1 1"/>"##,
                r##"<path fill='#aabbcc' d="M2 2"/>"##,
                r##"<circle fill="#2e86de" r="1"/>"##,
                r##"<rect style="opacity:.5;fill:#aabbcc" stop-fill="#f4c7a1"/>"##,
                r##"<path fill="url(#grad)"/>"##,
            )
        );
    }

    #[test]
    fn unmatched_markup_is_borrowed() {
        let customizer = Customizer::default();
        let markup = r##"<path stroke="#f4c7a1"/><path d="M0 0"/>"##;

        assert!(matches!(
            customizer.recolor(markup, &color("#abc")),
            std::borrow::Cow::Borrowed(_)
        ));
    }

    #[test]
    fn customization_is_idempotent() {
        let customizer = Customizer::default();
        let original = tree(MARKUP);
        let customization = Customization::with_skin_color(color("#aabbcc"));

        let once = customizer.apply_customization(&original, &customization);
        let twice = customizer.apply_customization(&once, &customization);

        assert_eq!(once, twice);
        assert_eq!(once.fingerprint(), twice.fingerprint());
        assert_ne!(once.fingerprint(), original.fingerprint());

        // Switching colours starts from the fetched markup, not the previous colour.
        let other = customizer.apply_customization(
            &once,
            &Customization::with_skin_color(color("#8d5524")),
        );
        assert!(other.layers()[0].markup().contains("#8d5524"));
        assert!(!other.layers()[0].markup().contains("#aabbcc"));
    }

    #[test]
    fn unset_skin_color_restores_original_colors() {
        let customizer = Customizer::default();
        let original = tree(MARKUP);

        let recolored = customizer
            .apply_customization(&original, &Customization::with_skin_color(color("#abc")));
        let restored = customizer.apply_customization(&recolored, &Customization::default());

        assert_eq!(restored, original);
        assert_eq!(restored.layers()[0].markup(), MARKUP);
    }

    #[test]
    fn items_are_ignored() {
        let customizer = Customizer::default();
        let original = tree(MARKUP);

        let customization = Customization {
            skin_color: None,
            items: vec!["hat".into(), "scarf".into()],
        };

        assert_eq!(
            customizer.apply_customization(&original, &customization),
            original
        );
    }
}
