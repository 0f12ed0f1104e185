//! HTTP adapters for the external reasoning and search services.
//!
//! - [`OpenAiReasoning`]: OpenAI-compatible chat completions with image input
//! - [`SerpApiSearch`]: SerpAPI web search
//!
//! Both implement the capability traits from `waterauditor-shared` and hold
//! their credentials for the lifetime of a session.

mod openai;
mod serpapi;

use std::time::Duration;

use reqwest::Client;

use waterauditor_shared::{AuditError, Result};

pub use openai::OpenAiReasoning;
pub use serpapi::SerpApiSearch;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 3;

/// Longest slice of an error body kept in error messages.
const MAX_ERROR_BODY: usize = 300;

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("WaterAuditor/", env!("CARGO_PKG_VERSION"));

/// Build a reqwest client with appropriate settings.
fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AuditError::Provider(format!("failed to build HTTP client: {e}")))
}

/// Map a transport error, calling out timeouts explicitly.
fn transport_error(url: &str, timeout_secs: u64, err: reqwest::Error) -> AuditError {
    if err.is_timeout() {
        AuditError::Provider(format!("{url}: request timed out after {timeout_secs}s"))
    } else {
        AuditError::Provider(format!("{url}: {err}"))
    }
}

/// Turn a non-success response into an error carrying a slice of its body.
async fn status_error(url: &str, response: reqwest::Response) -> AuditError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    AuditError::Provider(format!(
        "{url}: HTTP {status}: {}",
        truncate(body.trim(), MAX_ERROR_BODY)
    ))
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 100), "short");
    }

    #[test]
    fn client_builds() {
        assert!(build_client(5).is_ok());
    }
}
