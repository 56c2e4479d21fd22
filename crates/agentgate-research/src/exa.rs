//! Exa web search client.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use agentgate_chat::AgentError;

pub const EXA_API_URL: &str = "https://api.exa.ai";

/// Search parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub num_results: usize,
    /// `keyword`, `neural` or `auto`.
    pub search_type: String,
    /// Only results published on or after this day (`YYYY-MM-DD`).
    pub start_published_date: Option<String>,
    /// Characters of page text to return per result.
    pub max_characters: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            num_results: 5,
            search_type: "keyword".into(),
            start_published_date: None,
            max_characters: 1000,
        }
    }
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// Client for the Exa search API.
#[derive(Clone)]
pub struct ExaClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ExaClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, EXA_API_URL, api_key)
    }

    pub fn with_base_url(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn request_body(query: &str, options: &SearchOptions) -> serde_json::Value {
        let mut body = json!({
            "query": query,
            "type": options.search_type,
            "numResults": options.num_results,
            "contents": {
                "text": { "maxCharacters": options.max_characters },
            },
        });
        if let Some(date) = &options.start_published_date {
            body["startPublishedDate"] = json!(format!("{}T00:00:00.000Z", date));
        }
        body
    }

    /// Run a search.
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, AgentError> {
        debug!("Searching Exa for {:?} ({} results)", query, options.num_results);

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&Self::request_body(query, options))
            .send()
            .await
            .map_err(|e| AgentError::Search(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Error during Exa search: {} {}", status, body);
            return Err(AgentError::Search(format!("API error {}: {}", status, body)));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Search(format!("Failed to parse response: {}", e)))?;

        Ok(parsed.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let options = SearchOptions {
            start_published_date: Some("2026-10-17".into()),
            ..SearchOptions::default()
        };
        let body = ExaClient::request_body("rust async", &options);
        assert_eq!(body["query"], "rust async");
        assert_eq!(body["type"], "keyword");
        assert_eq!(body["numResults"], 5);
        assert_eq!(body["startPublishedDate"], "2026-10-17T00:00:00.000Z");
        assert_eq!(body["contents"]["text"]["maxCharacters"], 1000);

        let body = ExaClient::request_body("q", &SearchOptions::default());
        assert!(body.get("startPublishedDate").is_none());
    }

    #[test]
    fn test_parse_results() {
        let parsed: SearchResponse = serde_json::from_value(json!({
            "requestId": "abc",
            "results": [
                {
                    "id": "1",
                    "title": "Tokio 2.0",
                    "url": "https://tokio.rs/blog",
                    "publishedDate": "2026-10-17T00:00:00.000Z",
                    "text": "Release notes",
                    "score": 0.9
                },
                { "url": "https://example.com" }
            ]
        }))
        .unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0].title.as_deref(), Some("Tokio 2.0"));
        assert_eq!(parsed.results[0].published_date.as_deref(), Some("2026-10-17T00:00:00.000Z"));
        assert!(parsed.results[1].text.is_none());
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = ExaClient::with_base_url(Client::new(), "http://localhost:9/", "k");
        assert_eq!(client.base_url, "http://localhost:9");
    }
}
