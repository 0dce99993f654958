//! Turning assistant text into HTML markup.
//!
//! - [`markdown`]: the `Renderer` implementations and the `MarkdownEngine`
//!   that picks one of them at startup
//! - [`incremental`]: drives a display surface while a reply streams in
//! - [`escape`]: HTML escaping shared by both

pub mod escape;
pub mod incremental;
pub mod markdown;

pub use escape::escape_html;
pub use incremental::{
    DEFAULT_CURSOR, IncrementalRenderer, PartialView, RecordingSurface, Surface, SurfaceUpdate,
};
pub use markdown::{MarkdownEngine, RenderError, RenderOptions, Renderer, RendererPreference};
