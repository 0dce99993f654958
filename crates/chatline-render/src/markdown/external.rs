//! pulldown-cmark backed renderer.

use std::panic::{self, AssertUnwindSafe};

use pulldown_cmark::{Event, Options, Parser, html};

use super::{RenderError, RenderOptions, Renderer};

/// Full CommonMark renderer. Raw HTML in the input is emitted as escaped text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalRenderer;

impl Renderer for ExternalRenderer {
    fn name(&self) -> &'static str {
        "pulldown-cmark"
    }

    fn render(&self, text: &str, options: RenderOptions) -> Result<String, RenderError> {
        panic::catch_unwind(AssertUnwindSafe(|| render_cmark(text, options))).map_err(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panicked".to_string());
            RenderError::new(self.name(), message)
        })
    }
}

fn render_cmark(text: &str, options: RenderOptions) -> String {
    let mut opts = Options::empty();
    if options.github_flavored {
        opts.insert(Options::ENABLE_TABLES);
        opts.insert(Options::ENABLE_STRIKETHROUGH);
        opts.insert(Options::ENABLE_TASKLISTS);
    }

    let events = Parser::new_ext(text, opts).map(|event| match event {
        Event::SoftBreak if options.line_breaks => Event::HardBreak,
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(text.len() + text.len() / 2);
    html::push_html(&mut out, events);
    out
}
