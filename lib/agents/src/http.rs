//! HTTP dispatcher for the agent backend service.
//!
//! The backend exposes one JSON endpoint per supported agent type under a
//! single origin. Requests are plain request/response exchanges: no
//! streaming and no retries.

use crate::config::{AgentConfig, AgentSettings, WebSearcherSettings, YoutubeSummarizerSettings};
use crate::dispatcher::AgentDispatcher;
use crate::error::ExecutionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, instrument, warn};

/// Origin used when none is configured.
pub const DEFAULT_ORIGIN: &str = "http://localhost:8000";

const SEARCH_PATH: &str = "/websearch/search";
const VIDEO_SUMMARY_PATH: &str = "/youtube/analyze";
const DEFAULT_SEARCH_LANGUAGE: &str = "en";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    num_results: u32,
    languages: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct VideoSummaryRequest<'a> {
    video_url: &'a str,
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct VideoSummaryResponse {
    response: JsonValue,
}

/// Dispatches agent nodes to the backend service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: reqwest::Client,
    origin: String,
}

impl HttpDispatcher {
    /// Creates a dispatcher for the backend at `origin`.
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), origin)
    }

    /// Creates a dispatcher that reuses an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, origin: impl Into<String>) -> Self {
        Self {
            client,
            origin: origin.into().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the configured origin without a trailing slash.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    async fn search(&self, settings: &WebSearcherSettings) -> Result<JsonValue, ExecutionError> {
        if settings.query.trim().is_empty() {
            return Err(ExecutionError::InvalidInput {
                reason: "search query is empty".to_string(),
            });
        }
        let language = settings
            .filters
            .language
            .as_deref()
            .unwrap_or(DEFAULT_SEARCH_LANGUAGE);
        let request = SearchRequest {
            query: &settings.query,
            num_results: settings.max_results,
            languages: vec![language],
        };
        self.post(SEARCH_PATH, &request).await
    }

    async fn summarize_video(
        &self,
        settings: &YoutubeSummarizerSettings,
    ) -> Result<JsonValue, ExecutionError> {
        if settings.youtube_url.trim().is_empty() {
            return Err(ExecutionError::InvalidInput {
                reason: "video url is empty".to_string(),
            });
        }
        let request = VideoSummaryRequest {
            video_url: &settings.youtube_url,
            question: &settings.custom_prompt,
        };
        let body = self.post(VIDEO_SUMMARY_PATH, &request).await?;
        let parsed: VideoSummaryResponse =
            serde_json::from_value(body).map_err(|e| ExecutionError::ResponseParseFailed {
                reason: e.to_string(),
            })?;
        Ok(parsed.response)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<JsonValue, ExecutionError> {
        let url = format!("{}{path}", self.origin);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ExecutionError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%url, status = status.as_u16(), "backend rejected agent call");
            return Err(ExecutionError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        debug!(%url, status = status.as_u16(), "backend answered");
        response
            .json()
            .await
            .map_err(|e| ExecutionError::ResponseParseFailed {
                reason: e.to_string(),
            })
    }
}

impl Default for HttpDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_ORIGIN)
    }
}

#[async_trait]
impl AgentDispatcher for HttpDispatcher {
    #[instrument(skip(self, config), fields(agent_type = %config.agent_type(), origin = %self.origin))]
    async fn execute(&self, config: &AgentConfig) -> Result<JsonValue, ExecutionError> {
        match &config.settings {
            AgentSettings::WebSearcher(settings) => self.search(settings).await,
            AgentSettings::YoutubeSummarizer(settings) => self.summarize_video(settings).await,
            AgentSettings::WebScraper(_)
            | AgentSettings::CodeInterpreter(_)
            | AgentSettings::DataAnalyst(_)
            | AgentSettings::ImageGenerator(_)
            | AgentSettings::TextGenerator(_)
            | AgentSettings::Translator(_) => Err(ExecutionError::Unsupported {
                agent_type: config.agent_type(),
            }),
            AgentSettings::Result(_) => Err(ExecutionError::NotExecutable {
                agent_type: config.agent_type(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentType, create_default_config};
    use crate::model::ModelType;
    use axum::Json;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        format!("http://{addr}/")
    }

    fn search_config(query: &str, max_results: u32) -> AgentConfig {
        let mut config = create_default_config(AgentType::WebSearcher, ModelType::OpenAi);
        if let AgentSettings::WebSearcher(settings) = &mut config.settings {
            settings.query = query.to_string();
            settings.max_results = max_results;
        }
        config
    }

    #[tokio::test]
    async fn search_posts_expected_body_and_returns_payload() {
        let router = Router::new().route(
            SEARCH_PATH,
            post(|Json(body): Json<JsonValue>| async move {
                Json(json!({ "echo": body, "results": ["a", "b"] }))
            }),
        );
        let dispatcher = HttpDispatcher::new(serve(router).await);

        let output = dispatcher
            .execute(&search_config("rust ownership", 4))
            .await
            .expect("search succeeds");

        assert_eq!(output["results"], json!(["a", "b"]));
        assert_eq!(
            output["echo"],
            json!({ "query": "rust ownership", "num_results": 4, "languages": ["en"] })
        );
    }

    #[tokio::test]
    async fn video_summary_unwraps_response_field() {
        let router = Router::new().route(
            VIDEO_SUMMARY_PATH,
            post(|Json(body): Json<JsonValue>| async move {
                Json(json!({ "response": format!("summary of {}", body["video_url"].as_str().unwrap_or("")) }))
            }),
        );
        let dispatcher = HttpDispatcher::new(serve(router).await);

        let mut config = create_default_config(AgentType::YoutubeSummarizer, ModelType::Gemini);
        if let AgentSettings::YoutubeSummarizer(settings) = &mut config.settings {
            settings.youtube_url = "https://youtu.be/xyz".to_string();
            settings.custom_prompt = "what is it about?".to_string();
        }

        let output = dispatcher.execute(&config).await.expect("summary succeeds");
        assert_eq!(output, json!("summary of https://youtu.be/xyz"));
    }

    #[tokio::test]
    async fn non_success_status_becomes_execution_error() {
        let router = Router::new().route(
            SEARCH_PATH,
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "backend down") }),
        );
        let dispatcher = HttpDispatcher::new(serve(router).await);

        let err = dispatcher
            .execute(&search_config("anything", 3))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ExecutionError::BadStatus {
                status: 503,
                body: "backend down".to_string()
            }
        );
    }

    #[tokio::test]
    async fn unreachable_origin_is_request_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let dispatcher = HttpDispatcher::new(format!("http://{addr}"));
        let err = dispatcher
            .execute(&search_config("anything", 3))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::RequestFailed { .. }));
    }

    #[tokio::test]
    async fn empty_query_fails_before_any_request() {
        let dispatcher = HttpDispatcher::new("http://127.0.0.1:9");
        let err = dispatcher.execute(&search_config("  ", 3)).await.unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn unsupported_and_result_types_do_not_dispatch() {
        let dispatcher = HttpDispatcher::default();
        assert_eq!(dispatcher.origin(), DEFAULT_ORIGIN);

        let translator = create_default_config(AgentType::Translator, ModelType::OpenAi);
        assert_eq!(
            dispatcher.execute(&translator).await,
            Err(ExecutionError::Unsupported {
                agent_type: AgentType::Translator
            })
        );

        let result = create_default_config(AgentType::Result, ModelType::OpenAi);
        assert_eq!(
            dispatcher.execute(&result).await,
            Err(ExecutionError::NotExecutable {
                agent_type: AgentType::Result
            })
        );
    }
}
