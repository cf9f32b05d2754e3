use std::ops::Range;
use std::sync::Arc;

use derive_more::Debug;
use quick_xml::events::Event;
use quick_xml::Reader;
use xxhash_rust::xxh3::xxh3_128;

use crate::errors::{DocumentError, DocumentResult};

/// A parsed part asset.
///
/// Only the root `<svg>` element is interpreted; its children are kept byte for byte as they
/// appeared in the fetched text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDocument {
    #[debug(skip)]
    source: Arc<str>,
    #[debug(skip)]
    inner: Range<usize>,
    view_box: Option<String>,
    hash: u128,
}

impl PartDocument {
    pub fn parse(source: impl Into<Arc<str>>) -> DocumentResult<Self> {
        let source: Arc<str> = source.into();
        let (inner, view_box) = Self::locate_root(&source)?;
        let hash = xxh3_128(source.as_bytes());

        Ok(Self {
            source,
            inner,
            view_box,
            hash,
        })
    }

    fn locate_root(source: &str) -> DocumentResult<(Range<usize>, Option<String>)> {
        let mut reader = Reader::from_str(source);

        let mut depth = 0usize;
        let mut root: Option<(usize, Option<String>)> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| DocumentError::Malformed(e.to_string()))?;

            match event {
                Event::Start(element) => {
                    if root.is_none() {
                        let view_box = Self::read_root(&element)?;
                        root = Some((reader.buffer_position() as usize, view_box));
                    }
                    depth += 1;
                }
                Event::Empty(element) if root.is_none() => {
                    let view_box = Self::read_root(&element)?;
                    let end = reader.buffer_position() as usize;

                    return Ok((end..end, view_box));
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);

                    if depth == 0 {
                        if let Some((start, view_box)) = root {
                            let after = reader.buffer_position() as usize;
                            let end = source[..after].rfind("</").unwrap_or(after);

                            return Ok((start..end.max(start), view_box));
                        }
                    }
                }
                Event::Eof => {
                    return Err(match root {
                        Some(_) => DocumentError::Malformed("unexpected end of document".into()),
                        None => DocumentError::MissingRoot,
                    });
                }
                _ => {}
            }
        }
    }

    fn read_root(element: &quick_xml::events::BytesStart) -> DocumentResult<Option<String>> {
        let name = element.local_name();

        if !name.as_ref().eq_ignore_ascii_case(b"svg") {
            return Err(DocumentError::UnexpectedRoot(
                String::from_utf8_lossy(name.as_ref()).into_owned(),
            ));
        }

        let view_box = element
            .try_get_attribute("viewBox")
            .map_err(|e| DocumentError::Malformed(e.to_string()))?;

        view_box
            .map(|attribute| {
                attribute
                    .unescape_value()
                    .map(|value| value.into_owned())
                    .map_err(|e| DocumentError::Malformed(e.to_string()))
            })
            .transpose()
    }

    /// The markup between the root start and end tags.
    #[must_use]
    pub fn inner_markup(&self) -> &str {
        &self.source[self.inner.clone()]
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn view_box(&self) -> Option<&str> {
        self.view_box.as_deref()
    }

    /// Whether the root element has no drawable content.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.inner_markup().trim().is_empty()
    }

    #[must_use]
    pub const fn content_hash(&self) -> u128 {
        self.hash
    }
}

#[cfg(test)]
mod tests {
    use super::PartDocument;
    use crate::errors::DocumentError;

    #[test]
    fn keeps_inner_markup_verbatim() {
        let source = r##"<?xml version="1.0" encoding="UTF-8"?>
<!-- exported -->
<svg xmlns="http://www.w3.org/2000/svg" viewBox="-50 -150 100 200"><defs><style>.cls-1{fill:#f4c7a1;}</style></defs>
  <path class="cls-1"   d="M0 0h10v10z" />
  <g><circle r='2' fill="#000"/></g>
</svg>"##;

        let document = PartDocument::parse(source).expect("document should parse");

        assert_eq!(document.view_box(), Some("-50 -150 100 200"));
        assert_eq!(
            document.inner_markup(),
            "<defs><style>.cls-1{fill:#f4c7a1;}</style></defs>\n  <path class=\"cls-1\"   d=\"M0 0h10v10z\" />\n  <g><circle r='2' fill=\"#000\"/></g>\n"
        );
        assert!(!document.is_blank());
    }

    #[test]
    fn empty_roots_are_blank() {
        let self_closing = PartDocument::parse(r#"<svg viewBox="0 0 1 1"/>"#).expect("parses");
        assert!(self_closing.is_blank());
        assert_eq!(self_closing.view_box(), Some("0 0 1 1"));

        let whitespace = PartDocument::parse("<svg>\n   \n</svg>").expect("parses");
        assert!(whitespace.is_blank());
        assert_eq!(whitespace.view_box(), None);
    }

    #[test]
    fn rejects_non_svg() {
        assert_eq!(
            PartDocument::parse("<html><body/></html>"),
            Err(DocumentError::UnexpectedRoot("html".into()))
        );
        assert_eq!(PartDocument::parse("   "), Err(DocumentError::MissingRoot));
        assert!(matches!(
            PartDocument::parse("<svg><g></svg>"),
            Err(DocumentError::Malformed(_))
        ));
    }

    #[test]
    fn hash_follows_content() {
        let a = PartDocument::parse("<svg><path/></svg>").expect("parses");
        let b = PartDocument::parse("<svg><path/></svg>").expect("parses");
        let c = PartDocument::parse("<svg><rect/></svg>").expect("parses");

        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
    }
}
