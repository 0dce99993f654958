use anyhow::{Context, Result};
use chatline_core::Config;
use chatline_providers::HttpBackend;

pub async fn run(config: &Config, user: &str) -> Result<()> {
    let backend = HttpBackend::new(config.backend_config()?).context("create HTTP backend")?;
    backend
        .clear_conversation(user)
        .await
        .with_context(|| format!("clear conversation for '{user}'"))?;
    println!("Cleared conversation for {user}");
    Ok(())
}
