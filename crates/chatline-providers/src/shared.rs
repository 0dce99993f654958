//! Helpers shared by transports.

use anyhow::{Context, Result};
use chatline_types::ProviderError;

/// Standard User-Agent header for chatline requests.
pub const USER_AGENT: &str = concat!("chatline/", env!("CARGO_PKG_VERSION"));

/// Resolves a base URL with precedence: env > config > default.
///
/// # Errors
/// Returns an error if the chosen URL does not parse.
pub fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
) -> Result<String> {
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    if let Some(config_url) = config_base_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    Ok(default_url.to_string())
}

fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid chat endpoint base URL: {url}"))?;
    Ok(())
}

/// Classifies a reqwest error into a `ProviderError`.
pub fn classify_reqwest_error(e: &reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::timeout(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ProviderError::transport(format!("Connection failed: {e}"))
    } else if e.is_decode() {
        ProviderError::protocol(format!("Malformed response body: {e}"))
    } else if e.is_request() {
        ProviderError::transport(format!("Request error: {e}"))
    } else {
        ProviderError::transport(format!("Network error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_url_used_when_env_missing() {
        let url = resolve_base_url(
            Some("http://example.test:9000/"),
            "CHATLINE_TEST_UNSET_BASE_URL",
            "http://localhost:8000",
        )
        .unwrap();
        assert_eq!(url, "http://example.test:9000");
    }

    #[test]
    fn test_default_when_nothing_configured() {
        let url = resolve_base_url(
            Some("   "),
            "CHATLINE_TEST_UNSET_BASE_URL",
            "http://localhost:8000",
        )
        .unwrap();
        assert_eq!(url, "http://localhost:8000");
    }

    #[test]
    fn test_invalid_config_url_is_rejected() {
        let err = resolve_base_url(
            Some("not a url"),
            "CHATLINE_TEST_UNSET_BASE_URL",
            "http://localhost:8000",
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid chat endpoint base URL"));
    }
}
