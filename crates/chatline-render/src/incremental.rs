//! Live display of a reply while it streams.
//!
//! Partial updates show escaped text plus a cursor marker; markdown is only
//! interpreted once, at [`IncrementalRenderer::finalize`].

use crate::escape::{escape_html, push_escaped};
use crate::markdown::MarkdownEngine;

pub const DEFAULT_CURSOR: &str = "▌";

/// What a surface receives on each partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialView<'a> {
    /// Accumulated raw text.
    pub text: &'a str,
    /// Escaped text followed by the cursor marker.
    pub markup: &'a str,
}

/// Display target for a reply in progress.
pub trait Surface {
    fn show_partial(&mut self, view: &PartialView<'_>);

    /// Replaces the partial display with final markup.
    fn commit(&mut self, markup: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceUpdate {
    Partial { text: String, markup: String },
    Commit(String),
}

/// Surface that records every update, for tests and headless use.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    updates: Vec<SurfaceUpdate>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> &[SurfaceUpdate] {
        &self.updates
    }

    /// Markup currently on display.
    pub fn current(&self) -> Option<&str> {
        self.updates.last().map(|update| match update {
            SurfaceUpdate::Partial { markup, .. } | SurfaceUpdate::Commit(markup) => {
                markup.as_str()
            }
        })
    }

    pub fn committed(&self) -> Option<&str> {
        self.updates.iter().rev().find_map(|update| match update {
            SurfaceUpdate::Commit(markup) => Some(markup.as_str()),
            SurfaceUpdate::Partial { .. } => None,
        })
    }

    pub fn partial_count(&self) -> usize {
        self.updates
            .iter()
            .filter(|update| matches!(update, SurfaceUpdate::Partial { .. }))
            .count()
    }
}

impl Surface for RecordingSurface {
    fn show_partial(&mut self, view: &PartialView<'_>) {
        self.updates.push(SurfaceUpdate::Partial {
            text: view.text.to_string(),
            markup: view.markup.to_string(),
        });
    }

    fn commit(&mut self, markup: &str) {
        self.updates.push(SurfaceUpdate::Commit(markup.to_string()));
    }
}

/// Feeds a [`Surface`] while deltas arrive, then commits final markup.
///
/// Dropping the renderer without calling `finalize` leaves the last partial
/// view in place and issues no further surface calls.
pub struct IncrementalRenderer<'a> {
    surface: &'a mut dyn Surface,
    engine: &'a MarkdownEngine,
    cursor: String,
    text: String,
    escaped: String,
}

impl<'a> IncrementalRenderer<'a> {
    pub fn new(surface: &'a mut dyn Surface, engine: &'a MarkdownEngine, cursor: &str) -> Self {
        Self {
            surface,
            engine,
            cursor: format!("<span class=\"cursor\">{}</span>", escape_html(cursor)),
            text: String::new(),
            escaped: String::new(),
        }
    }

    /// Shows an empty view with just the cursor.
    pub fn on_start(&mut self) {
        self.text.clear();
        self.escaped.clear();
        self.refresh();
    }

    pub fn on_delta(&mut self, delta: &str) {
        if delta.is_empty() {
            return;
        }
        self.text.push_str(delta);
        push_escaped(&mut self.escaped, delta);
        self.refresh();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn refresh(&mut self) {
        let markup = format!("{}{}", self.escaped, self.cursor);
        self.surface.show_partial(&PartialView {
            text: &self.text,
            markup: &markup,
        });
    }

    /// Renders `full_text` as markdown and commits it. Returns the markup.
    pub fn finalize(self, full_text: &str) -> String {
        let markup = self.engine.render(full_text);
        self.surface.commit(&markup);
        markup
    }
}
