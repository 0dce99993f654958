//! Markdown to HTML.
//!
//! Two implementations of [`Renderer`] exist: the pulldown-cmark backed
//! [`external::ExternalRenderer`] (behind the `external` feature) and the
//! built-in [`fallback::FallbackRenderer`]. [`MarkdownEngine`] picks one at
//! startup and falls back per call when the active one errors.

mod engine;
#[cfg(feature = "external")]
pub mod external;
pub mod fallback;

use std::fmt;

pub use engine::{MarkdownEngine, RendererPreference};

/// Options every renderer honors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Single newlines become `<br>`.
    pub line_breaks: bool,
    /// Tables, strikethrough and task lists.
    pub github_flavored: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            line_breaks: true,
            github_flavored: true,
        }
    }
}

/// A renderer failed on a particular input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderError {
    pub renderer: &'static str,
    pub message: String,
}

impl RenderError {
    pub fn new(renderer: &'static str, message: impl Into<String>) -> Self {
        Self {
            renderer,
            message: message.into(),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} renderer failed: {}", self.renderer, self.message)
    }
}

impl std::error::Error for RenderError {}

/// Converts markdown text to HTML markup.
pub trait Renderer: Send + Sync {
    fn name(&self) -> &'static str;

    /// # Errors
    /// Returns a `RenderError` when this renderer cannot handle `text`.
    fn render(&self, text: &str, options: RenderOptions) -> Result<String, RenderError>;
}
