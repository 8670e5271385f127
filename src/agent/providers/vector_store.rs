//! Document search over a hosted vector store.
//!
//! One stateless `POST {base}/vector_stores/{id}/search` per collection.
//! Hits are rendered as attributed excerpts. Hits scoring below the
//! configured threshold are dropped; when nothing is left the outcome is
//! [`SearchOutcome::NotFound`], not an error.

use std::fmt::Write;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::config::AgentConfig;
use crate::agent::tool::{SearchOutcome, SearchTool};
use crate::error::AgentError;

/// Default API base when no override is configured.
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Name the planner uses to reference this tool.
pub const FILE_SEARCH_TOOL: &str = "file_search";

/// Text used when no collection has a relevant excerpt.
pub const NOT_FOUND_TEXT: &str = "The information is not available in the provided documents.";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_num_results: usize,
    ranking_options: RankingOptions,
}

#[derive(Debug, Serialize)]
struct RankingOptions {
    score_threshold: f64,
}

/// One page of vector store search results.
#[derive(Debug, Deserialize)]
pub struct SearchResultsPage {
    /// Ranked hits.
    #[serde(default)]
    pub data: Vec<SearchHit>,
}

/// A single matching file with its relevant excerpts.
#[derive(Debug, Deserialize)]
pub struct SearchHit {
    /// Source filename.
    #[serde(default)]
    pub filename: String,
    /// Similarity score.
    #[serde(default)]
    pub score: f64,
    /// Matching content blocks.
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// A content block within a hit.
#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    /// Block type; only `"text"` is rendered.
    #[serde(rename = "type")]
    pub kind: String,
    /// Block text.
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Searches one or more vector stores.
pub struct VectorStoreSearch {
    http: Client,
    api_base: String,
    vector_store_ids: Vec<String>,
    max_num_results: usize,
    score_threshold: f64,
    description: String,
}

impl VectorStoreSearch {
    /// Creates the search tool from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if no collection is configured,
    /// the API key is not a valid header value, or the HTTP client cannot
    /// be built.
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let vector_store_ids: Vec<String> = config
            .vector_store_ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        if vector_store_ids.is_empty() {
            return Err(AgentError::Configuration {
                message: "no vector store ID configured (set VECTOR_STORE_ID)".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key)).map_err(|e| {
            AgentError::Configuration {
                message: format!("invalid API key: {e}"),
            }
        })?;
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::Configuration {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        let api_base = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            http,
            api_base,
            vector_store_ids,
            max_num_results: config.max_num_results,
            score_threshold: config.score_threshold,
            description: describe(&config.subject),
        })
    }

    fn search_url(&self, vector_store_id: &str) -> String {
        format!("{}/vector_stores/{vector_store_id}/search", self.api_base)
    }

    async fn search_one(
        &self,
        vector_store_id: &str,
        query: &str,
    ) -> Result<SearchResultsPage, AgentError> {
        let response = self
            .http
            .post(self.search_url(vector_store_id))
            .json(&SearchRequest {
                query,
                max_num_results: self.max_num_results,
                ranking_options: RankingOptions {
                    score_threshold: self.score_threshold,
                },
            })
            .send()
            .await
            .map_err(|e| AgentError::Retrieval {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AgentError::Retrieval {
            message: format!("failed to read response body: {e}"),
            status: Some(status.as_u16()),
        })?;

        if !status.is_success() {
            return Err(AgentError::Retrieval {
                message: api_error_message(&body).unwrap_or_else(|| status.to_string()),
                status: Some(status.as_u16()),
            });
        }

        serde_json::from_str(&body).map_err(|e| AgentError::ResponseParse {
            message: format!("invalid search response: {e}"),
            content: body,
        })
    }
}

impl std::fmt::Debug for VectorStoreSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStoreSearch")
            .field("api_base", &self.api_base)
            .field("vector_store_ids", &self.vector_store_ids)
            .field("max_num_results", &self.max_num_results)
            .field("score_threshold", &self.score_threshold)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SearchTool for VectorStoreSearch {
    fn name(&self) -> &str {
        FILE_SEARCH_TOOL
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn query(&self, query: &str) -> Result<SearchOutcome, AgentError> {
        let mut hits = Vec::new();
        for id in &self.vector_store_ids {
            let page = self.search_one(id, query).await?;
            debug!(vector_store = %id, hits = page.data.len(), "vector store search");
            hits.extend(page.data);
        }
        Ok(render_hits(&hits, self.score_threshold))
    }
}

/// Tool description shown to the planner.
fn describe(subject: &str) -> String {
    format!(
        "Use this tool to search {subject}'s professional documents (resume, cover letter, \
         professional profile) for specific details about experience, skills, projects, \
         motivations, and qualifications. Returns the relevant excerpts."
    )
}

/// Extracts `error.message` from an API error body.
fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .map(|b| b.error.message)
}

/// Renders hits scoring at least `threshold` as attributed excerpts.
#[must_use]
pub fn render_hits(hits: &[SearchHit], threshold: f64) -> SearchOutcome {
    let mut rendered = String::new();
    for hit in hits.iter().filter(|h| h.score >= threshold) {
        let text: Vec<&str> = hit
            .content
            .iter()
            .filter(|c| c.kind == "text")
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if text.is_empty() {
            continue;
        }
        if !rendered.is_empty() {
            rendered.push_str("\n\n");
        }
        let source = if hit.filename.is_empty() {
            "the documents"
        } else {
            hit.filename.as_str()
        };
        let _ = write!(rendered, "According to {source}:\n{}", text.join("\n"));
    }

    if rendered.is_empty() {
        SearchOutcome::NotFound(NOT_FOUND_TEXT.to_string())
    } else {
        SearchOutcome::Found(rendered)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;

    fn config(ids: Vec<String>) -> AgentConfig {
        AgentConfig::builder()
            .api_key("sk-test")
            .base_url("http://localhost:9999/v1/")
            .vector_store_ids(ids)
            .subject("Minaya")
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_new_requires_collection() {
        let result = VectorStoreSearch::new(&config(Vec::new()));
        assert!(matches!(result, Err(AgentError::Configuration { .. })));
    }

    #[test]
    fn test_search_url_and_descriptor() {
        let search = VectorStoreSearch::new(&config(vec!["vs_abc".to_string()]))
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(
            search.search_url("vs_abc"),
            "http://localhost:9999/v1/vector_stores/vs_abc/search"
        );
        assert_eq!(search.name(), FILE_SEARCH_TOOL);
        assert!(search.description().contains("Minaya's professional documents"));
    }

    #[test]
    fn test_render_hits_from_page() {
        let body = r#"{
            "object": "vector_store.search_results.page",
            "search_query": "automation tools",
            "data": [
                {"file_id": "f1", "filename": "Resume.pdf", "score": 0.91, "attributes": {},
                 "content": [{"type": "text", "text": "Built workflows in Zapier and Make."}]},
                {"file_id": "f2", "filename": "Cover Letter.pdf", "score": 0.55, "attributes": {},
                 "content": [{"type": "text", "text": "  "}]}
            ],
            "has_more": false,
            "next_page": null
        }"#;
        let page: SearchResultsPage =
            serde_json::from_str(body).unwrap_or_else(|_| unreachable!());
        assert!((page.data[0].score - 0.91).abs() < f64::EPSILON);
        assert_eq!(
            render_hits(&page.data, 0.3),
            SearchOutcome::Found(
                "According to Resume.pdf:\nBuilt workflows in Zapier and Make.".to_string()
            )
        );
    }

    #[test]
    fn test_render_empty_is_not_found() {
        assert_eq!(
            render_hits(&[], 0.3),
            SearchOutcome::NotFound(NOT_FOUND_TEXT.to_string())
        );
    }

    #[test]
    fn test_render_low_scores_is_not_found() {
        let hit = |filename: &str, score: f64| SearchHit {
            filename: filename.to_string(),
            score,
            content: vec![ContentBlock {
                kind: "text".to_string(),
                text: "Enjoys hiking.".to_string(),
            }],
        };
        let hits = [hit("Resume.pdf", 0.12), hit("Profile.md", 0.29)];
        assert_eq!(
            render_hits(&hits, 0.3),
            SearchOutcome::NotFound(NOT_FOUND_TEXT.to_string())
        );
        assert!(render_hits(&hits, 0.2).is_found());
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error": {"message": "Vector store not found", "type": "invalid_request_error"}}"#;
        assert_eq!(
            api_error_message(body).as_deref(),
            Some("Vector store not found")
        );
        assert!(api_error_message("<html>").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_retrieval_error() {
        let mut cfg = config(vec!["vs_abc".to_string()]);
        cfg.base_url = Some("http://127.0.0.1:9/v1".to_string());
        cfg.timeout = std::time::Duration::from_secs(2);
        let search = VectorStoreSearch::new(&cfg).unwrap_or_else(|_| unreachable!());
        let result = search.query("skills").await;
        assert!(matches!(result, Err(AgentError::Retrieval { .. })));
    }

    /// A request as seen by the local HTTP server.
    struct Received {
        head: String,
        body: serde_json::Value,
    }

    fn content_length(head: &str) -> usize {
        head.lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Serves one canned `(status, body)` per connection, in order, and
    /// returns the base URL plus a handle yielding the requests received.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<Received>>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|_| unreachable!());
        let addr = listener.local_addr().unwrap_or_else(|_| unreachable!());

        let handle = tokio::spawn(async move {
            let mut received = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap_or_else(|_| unreachable!());
                let mut raw = Vec::new();
                let mut buf = [0_u8; 4096];
                let (head, body_start) = loop {
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    if n == 0 {
                        break (String::from_utf8_lossy(&raw).into_owned(), raw.len());
                    }
                    raw.extend_from_slice(&buf[..n]);
                    if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                        break (String::from_utf8_lossy(&raw[..pos]).into_owned(), pos + 4);
                    }
                };
                let expected = body_start + content_length(&head);
                while raw.len() < expected {
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    raw.extend_from_slice(&buf[..n]);
                }
                let request_body = raw.get(body_start..).unwrap_or_default();
                received.push(Received {
                    head,
                    body: serde_json::from_slice(request_body).unwrap_or_default(),
                });

                let response = format!(
                    "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
            received
        });

        (format!("http://{addr}/v1"), handle)
    }

    fn search_against(base_url: String, ids: &[&str]) -> VectorStoreSearch {
        let mut cfg = config(ids.iter().map(ToString::to_string).collect());
        cfg.base_url = Some(base_url);
        cfg.max_num_results = 4;
        VectorStoreSearch::new(&cfg).unwrap_or_else(|_| unreachable!())
    }

    const RESUME_PAGE: &str = r#"{"object": "vector_store.search_results.page", "data": [
        {"file_id": "f1", "filename": "Resume.pdf", "score": 0.82,
         "content": [{"type": "text", "text": "Led lifecycle campaigns."}]}
    ], "has_more": false}"#;

    const PROFILE_PAGE: &str = r#"{"data": [
        {"file_id": "f2", "filename": "Profile.md", "score": 0.64,
         "content": [{"type": "text", "text": "Automates reporting in Zapier."}]}
    ]}"#;

    #[tokio::test]
    async fn test_query_posts_search_and_renders_hits() {
        let (base, server) = serve(vec![(200, RESUME_PAGE)]).await;
        let search = search_against(base, &["vs_abc"]);

        let outcome = search
            .query("marketing experience")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(
            outcome,
            SearchOutcome::Found("According to Resume.pdf:\nLed lifecycle campaigns.".to_string())
        );

        let received = server.await.unwrap_or_else(|_| unreachable!());
        assert_eq!(received.len(), 1);
        let request = &received[0];
        assert!(request.head.starts_with("POST /v1/vector_stores/vs_abc/search HTTP/1.1"));
        assert!(
            request
                .head
                .to_lowercase()
                .contains("authorization: bearer sk-test")
        );
        assert_eq!(request.body["query"], "marketing experience");
        assert_eq!(request.body["max_num_results"], 4);
        assert!(
            (request.body["ranking_options"]["score_threshold"]
                .as_f64()
                .unwrap_or_default()
                - 0.3)
                .abs()
                < 1e-9
        );
    }

    #[tokio::test]
    async fn test_query_maps_error_status_to_retrieval() {
        let (base, server) = serve(vec![(
            404,
            r#"{"error": {"message": "No vector store found with id 'vs_gone'.", "type": "invalid_request_error"}}"#,
        )])
        .await;
        let search = search_against(base, &["vs_gone"]);

        let result = search.query("skills").await;
        assert!(matches!(
            result,
            Err(AgentError::Retrieval { ref message, status: Some(404) })
                if message == "No vector store found with id 'vs_gone'."
        ));
        let _ = server.await;
    }

    #[tokio::test]
    async fn test_query_concatenates_collections_in_order() {
        let (base, server) = serve(vec![(200, RESUME_PAGE), (200, PROFILE_PAGE)]).await;
        let search = search_against(base, &["vs_resume", "vs_profile"]);

        let outcome = search
            .query("tools")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(
            outcome,
            SearchOutcome::Found(
                "According to Resume.pdf:\nLed lifecycle campaigns.\n\n\
                 According to Profile.md:\nAutomates reporting in Zapier."
                    .to_string()
            )
        );

        let received = server.await.unwrap_or_else(|_| unreachable!());
        let paths: Vec<&str> = received
            .iter()
            .filter_map(|r| r.head.split_whitespace().nth(1))
            .collect();
        assert_eq!(
            paths,
            vec![
                "/v1/vector_stores/vs_resume/search",
                "/v1/vector_stores/vs_profile/search"
            ]
        );
    }
}
