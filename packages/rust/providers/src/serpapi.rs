//! SerpAPI web search adapter.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use waterauditor_shared::{
    AuditError, Result, SearchHit, SearchQuery, SearchService, SerpApiConfig,
};

use crate::{build_client, status_error, transport_error};

/// Results requested per query (the researcher caps further).
const RESULTS_PER_QUERY: u32 = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    search_metadata: Option<SearchMetadata>,
}

#[derive(Debug, Deserialize)]
struct SearchMetadata {
    #[serde(default)]
    status: Option<String>,
}

impl SearchResponse {
    /// SerpAPI reports an empty result page as an `error` on a successful search.
    fn is_empty_result(&self) -> bool {
        let succeeded = self
            .search_metadata
            .as_ref()
            .and_then(|m| m.status.as_deref())
            .is_some_and(|s| s.eq_ignore_ascii_case("success"));
        let no_results = self
            .error
            .as_deref()
            .is_some_and(|e| e.to_ascii_lowercase().contains("returned any results"));
        succeeded || no_results
    }
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: Option<String>,
}

/// Search service backed by SerpAPI's `search.json` endpoint.
#[derive(Clone)]
pub struct SerpApiSearch {
    client: Client,
    endpoint: String,
    api_key: String,
    engine: String,
    timeout_secs: u64,
}

impl SerpApiSearch {
    /// Create an adapter from config and a resolved API key.
    pub fn new(config: &SerpApiConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            endpoint: format!("{}/search.json", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            engine: config.engine.clone(),
            timeout_secs: config.timeout_secs,
        })
    }
}

impl SearchService for SerpApiSearch {
    #[instrument(skip_all, fields(category = query.category.as_str()))]
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        debug!(q = %query.text, "sending search");

        let num = RESULTS_PER_QUERY.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("engine", self.engine.as_str()),
                ("q", query.text.as_str()),
                ("num", num.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(&self.endpoint, self.timeout_secs, e.without_url()))?;

        if !response.status().is_success() {
            return Err(status_error(&self.endpoint, response).await);
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            AuditError::Provider(format!("{}: invalid response body: {e}", self.endpoint))
        })?;

        if let Some(error) = &parsed.error {
            if parsed.is_empty_result() {
                debug!(%error, "search returned no results");
                return Ok(Vec::new());
            }
            return Err(AuditError::Provider(format!("{}: {error}", self.endpoint)));
        }

        let hits: Vec<SearchHit> = parsed
            .organic_results
            .into_iter()
            .filter_map(|r| {
                r.link.map(|link| SearchHit {
                    title: r.title.trim().to_string(),
                    link,
                })
            })
            .collect();

        debug!(hits = hits.len(), "search complete");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waterauditor_shared::ResourceCategory;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter_for(server: &MockServer) -> SerpApiSearch {
        let config = SerpApiConfig {
            base_url: server.uri(),
            timeout_secs: 5,
            ..SerpApiConfig::default()
        };
        SerpApiSearch::new(&config, "serp-test").unwrap()
    }

    fn query() -> SearchQuery {
        SearchQuery {
            text: "boil water purification well".into(),
            category: ResourceCategory::DiyPurification,
        }
    }

    #[tokio::test]
    async fn search_maps_organic_results_in_order() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("engine", "google"))
            .and(query_param("q", "boil water purification well"))
            .and(query_param("api_key", "serp-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "organic_results": [
                    {"position": 1, "title": " Boiling water ", "link": "https://cdc.gov/boil"},
                    {"position": 2, "title": "No link here"},
                    {"position": 3, "title": "SODIS", "link": "https://sodis.ch"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let hits = adapter_for(&server).search(&query()).await.unwrap();
        assert_eq!(
            hits,
            vec![
                SearchHit {
                    title: "Boiling water".into(),
                    link: "https://cdc.gov/boil".into()
                },
                SearchHit {
                    title: "SODIS".into(),
                    link: "https://sodis.ch".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn missing_results_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "search_metadata": {"status": "Success"}
            })))
            .mount(&server)
            .await;

        let hits = adapter_for(&server).search(&query()).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn no_results_reply_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "search_metadata": {"status": "Success"},
                "error": "Google hasn't returned any results for this query."
            })))
            .mount(&server)
            .await;

        let hits = adapter_for(&server).search(&query()).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn no_results_message_without_metadata_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "Google hasn't returned any results for this query."
            })))
            .mount(&server)
            .await;

        let hits = adapter_for(&server).search(&query()).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn error_field_is_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "Invalid API key."
            })))
            .mount(&server)
            .await;

        let err = adapter_for(&server).search(&query()).await.unwrap_err();
        assert!(matches!(err, AuditError::Provider(_)));
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[tokio::test]
    async fn http_error_does_not_leak_key() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = adapter_for(&server).search(&query()).await.unwrap_err();
        assert!(err.to_string().contains("500"));
        assert!(!err.to_string().contains("serp-test"));
    }
}
