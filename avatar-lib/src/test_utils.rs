use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use strum::IntoEnumIterator;
use tokio::sync::watch;

use crate::assets::AssetSource;
use crate::errors::{FetchError, FetchResult};
use crate::parts::{BodyPart, LayoutTable, View};

pub(crate) const SKIN: &str = "#f4c7a1";
pub(crate) const OUTLINE: &str = "#1a1a1a";

#[derive(Debug, Clone)]
enum MockResponse {
    Document(String),
    Status(u16),
}

/// Scripted asset source. Unknown references answer with a 404.
pub(crate) struct MockAssetSource {
    responses: Mutex<HashMap<String, MockResponse>>,
    calls: Mutex<HashMap<String, usize>>,
    gate: watch::Sender<bool>,
}

impl MockAssetSource {
    pub(crate) fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            gate: watch::Sender::new(true),
        }
    }

    /// A source that holds every fetch until [`MockAssetSource::open_gate`] is called.
    pub(crate) fn gated() -> Self {
        let source = Self::new();
        source.gate.send_replace(false);
        source
    }

    pub(crate) fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    pub(crate) fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    pub(crate) fn set_document(&self, file_ref: &str, text: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(file_ref.to_owned(), MockResponse::Document(text.into()));
    }

    pub(crate) fn set_failure(&self, file_ref: &str, status: u16) {
        self.responses
            .lock()
            .unwrap()
            .insert(file_ref.to_owned(), MockResponse::Status(status));
    }

    pub(crate) fn calls(&self, file_ref: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(file_ref)
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Scripts a complete, valid set of parts for `view`.
    pub(crate) fn with_view(self, layout: &LayoutTable, view: View) -> Self {
        for part in BodyPart::iter() {
            self.set_document(&layout.file_ref(view, part), part_svg(view, part));
        }
        self
    }
}

#[async_trait]
impl AssetSource for MockAssetSource {
    async fn fetch(&self, file_ref: &str) -> FetchResult<String> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(file_ref.to_owned())
            .or_default() += 1;

        let mut gate = self.gate.subscribe();
        gate.wait_for(|open| *open)
            .await
            .expect("gate sender lives as long as the source");

        let response = self.responses.lock().unwrap().get(file_ref).cloned();

        match response {
            Some(MockResponse::Document(text)) => Ok(text),
            Some(MockResponse::Status(status)) => Err(FetchError::UnexpectedStatus {
                file_ref: file_ref.to_owned(),
                status,
            }),
            None => Err(FetchError::UnexpectedStatus {
                file_ref: file_ref.to_owned(),
                status: 404,
            }),
        }
    }
}

/// A small part asset with one skin coloured path and one outline path.
pub(crate) fn part_svg(view: View, part: BodyPart) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="-50 -150 100 200"><path id="{view}-{part}" fill="{SKIN}" d="M0 0h10v10z"/><path fill="{OUTLINE}" d="M0 0h1v1z"/></svg>"#
    )
}
