use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use chatline_render::{MarkdownEngine, RendererPreference};

pub fn run(file: Option<&Path>, preference: RendererPreference) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("read stdin")?;
            text
        }
    };

    let engine = MarkdownEngine::detect(preference);
    println!("{}", engine.render(&text));
    Ok(())
}
