use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::fallback::{self, FallbackRenderer};
use super::{RenderOptions, Renderer};

/// Which renderer the engine should try to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererPreference {
    /// External if it is compiled in and passes the probe, else fallback.
    #[default]
    Auto,
    External,
    Fallback,
}

impl FromStr for RendererPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "external" => Ok(Self::External),
            "fallback" => Ok(Self::Fallback),
            other => Err(format!(
                "unknown renderer '{other}' (expected auto, external or fallback)"
            )),
        }
    }
}

impl fmt::Display for RendererPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::External => "external",
            Self::Fallback => "fallback",
        })
    }
}

const PROBE_INPUT: &str = "**probe**";
const PROBE_EXPECT: &str = "<strong>probe</strong>";

/// Renders final markup with one renderer chosen at construction.
///
/// [`MarkdownEngine::render`] never fails: when the active renderer errors
/// on an input, that input is rendered by the fallback instead.
pub struct MarkdownEngine {
    active: Box<dyn Renderer>,
    options: RenderOptions,
}

impl fmt::Debug for MarkdownEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkdownEngine")
            .field("active", &self.active.name())
            .field("options", &self.options)
            .finish()
    }
}

impl Default for MarkdownEngine {
    fn default() -> Self {
        Self::detect(RendererPreference::Auto)
    }
}

impl MarkdownEngine {
    /// Picks a renderer once. The external renderer is used only if it is
    /// compiled in and renders a probe input correctly.
    pub fn detect(preference: RendererPreference) -> Self {
        let options = RenderOptions::default();
        if preference == RendererPreference::Fallback {
            return Self::fallback_only();
        }

        match external_renderer() {
            Some(renderer) if probe(renderer.as_ref(), options) => {
                tracing::debug!(renderer = renderer.name(), "markdown renderer selected");
                Self::with_renderer(renderer)
            }
            Some(renderer) => {
                tracing::warn!(
                    renderer = renderer.name(),
                    "markdown renderer failed probe; using fallback"
                );
                Self::fallback_only()
            }
            None => {
                if preference == RendererPreference::External {
                    tracing::warn!("external markdown renderer not available; using fallback");
                }
                Self::fallback_only()
            }
        }
    }

    pub fn with_renderer(active: Box<dyn Renderer>) -> Self {
        Self {
            active,
            options: RenderOptions::default(),
        }
    }

    pub fn fallback_only() -> Self {
        Self::with_renderer(Box::new(FallbackRenderer))
    }

    pub fn active_name(&self) -> &'static str {
        self.active.name()
    }

    pub fn render(&self, text: &str) -> String {
        match self.active.render(text, self.options) {
            Ok(markup) => markup,
            Err(err) => {
                tracing::warn!(error = %err, "markdown render failed; using fallback");
                fallback::parse(text)
            }
        }
    }
}

fn probe(renderer: &dyn Renderer, options: RenderOptions) -> bool {
    renderer
        .render(PROBE_INPUT, options)
        .is_ok_and(|html| html.contains(PROBE_EXPECT))
}

#[cfg(feature = "external")]
fn external_renderer() -> Option<Box<dyn Renderer>> {
    Some(Box::new(super::external::ExternalRenderer))
}

#[cfg(not(feature = "external"))]
fn external_renderer() -> Option<Box<dyn Renderer>> {
    None
}
