//! HTTP gateway: `POST /ask` with `{"query": ...}` returns `{"response": ...}`.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use medrag_lib::{
    chat::{AnswerGenerator, Assistant},
    embed::Embedder,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub response: String,
}

/// Routes for the chatbot. CORS is open to any origin.
pub fn router<E, G>(assistant: Arc<Assistant<E, G>>) -> Router
where
    E: Embedder + 'static,
    G: AnswerGenerator + 'static,
{
    Router::new()
        .route("/ask", post(ask::<E, G>))
        .route("/health", get(health_check))
        .layer(CorsLayer::very_permissive())
        .with_state(assistant)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve<E, G>(assistant: Arc<Assistant<E, G>>, addr: &str) -> Result<()>
where
    E: Embedder + 'static,
    G: AnswerGenerator + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "serving chatbot");

    axum::serve(listener, router(assistant)).await?;
    Ok(())
}

async fn ask<E, G>(
    State(assistant): State<Arc<Assistant<E, G>>>,
    Json(request): Json<AskRequest>,
) -> Json<AskResponse>
where
    E: Embedder + 'static,
    G: AnswerGenerator + 'static,
{
    let response = assistant.ask(&request.query).await;
    Json(AskResponse { response })
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use medrag_lib::{
        chat::{APOLOGY_MESSAGE, NO_CONTEXT_MESSAGE},
        corpus::Record,
        embed::HashingEmbedder,
        search::SearchEngine,
        Error,
    };
    use tower::ServiceExt;

    use super::*;

    struct LabelGenerator {
        fail: bool,
    }

    #[async_trait]
    impl AnswerGenerator for LabelGenerator {
        async fn generate(&self, _query: &str, context: &str) -> medrag_lib::Result<String> {
            if self.fail {
                return Err(Error::Generation("rate limited".to_string()));
            }
            Ok(context.lines().next().unwrap_or_default().to_string())
        }
    }

    fn app(records: &[Record], fail: bool) -> Router {
        let engine = SearchEngine::build(HashingEmbedder::new(128).unwrap(), records, 8).unwrap();
        router(Arc::new(Assistant::new(
            Arc::new(engine),
            LabelGenerator { fail },
            3,
        )))
    }

    fn records() -> Vec<Record> {
        vec![
            Record::new("Flu", "fever, cough", "virus", "rest"),
            Record::new("Allergy", "sneezing, itchy eyes", "pollen", "antihistamines"),
        ]
    }

    async fn post_ask(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/ask")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_ask_returns_response_field() {
        let (status, json) = post_ask(app(&records(), false), r#"{"query": "fever and cough"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"], "Flu: fever, cough virus rest");
    }

    #[tokio::test]
    async fn test_generator_failure_is_plain_apology() {
        let (status, json) = post_ask(app(&records(), true), r#"{"query": "fever"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"], APOLOGY_MESSAGE);
    }

    #[tokio::test]
    async fn test_empty_index_returns_fallback() {
        let (_, json) = post_ask(app(&[], false), r#"{"query": "fever"}"#).await;
        assert_eq!(json["response"], NO_CONTEXT_MESSAGE);
    }

    #[tokio::test]
    async fn test_malformed_body_is_client_error() {
        let (status, _) = post_ask(app(&records(), false), r#"{"question": "fever"}"#).await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/ask")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = app(&records(), false).oneshot(request).await.unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app(&records(), false).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
