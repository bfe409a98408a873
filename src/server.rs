//! HTTP surface for the question-answering flow.
//!
//! # Endpoints
//!
//! - `POST /chat` - answer a question: `{"question": "..."}` →
//!   `{"answer": "...", "sources": ["...", ...]}`
//! - `GET /health` - document count and loaded models

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json,
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::CorsPolicy,
    error::{Error, Result},
    responder::{Answer, Responder},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub documents: usize,
    pub embedding_model: String,
    pub generation_model: String,
}

/// Wraps a crate error at the HTTP boundary. Client mistakes are reported
/// as 400 with their message; everything else becomes an opaque 500.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = if self.0.is_client_error() {
            (StatusCode::BAD_REQUEST, self.0.to_string())
        } else {
            tracing::error!(error = %self.0, "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to answer question".to_string(),
            )
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// POST /chat
async fn chat(
    State(responder): State<Arc<Responder>>,
    Json(request): Json<ChatRequest>,
) -> std::result::Result<Json<Answer>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(Error::EmptyQuestion.into());
    }

    // Embedding and generation are CPU-bound.
    let answer = tokio::task::spawn_blocking(move || {
        responder.respond(&request.question)
    })
    .await
    .map_err(|e| Error::Generation(format!("answer task failed: {e}")))??;

    Ok(Json(answer))
}

/// GET /health
async fn health(State(responder): State<Arc<Responder>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        documents: responder.document_count(),
        embedding_model: responder.embedding_model().to_string(),
        generation_model: responder.generation_model().to_string(),
    })
}

fn cors_layer(policy: &CorsPolicy) -> Result<Option<CorsLayer>> {
    let layer = match policy {
        CorsPolicy::Disabled => return Ok(None),
        CorsPolicy::AnyOrigin {
            allow_credentials: false,
        } => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsPolicy::AnyOrigin {
            allow_credentials: true,
        } => {
            tracing::warn!(
                "CORS allows credentialed requests from any origin"
            );
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request())
                .allow_credentials(true)
        }
        CorsPolicy::Origins {
            origins,
            allow_credentials,
        } => {
            let origins = origins
                .iter()
                .map(|o| {
                    HeaderValue::from_str(o).map_err(|e| {
                        Error::Config(format!("invalid CORS origin {o:?}: {e}"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE])
                .allow_credentials(*allow_credentials)
        }
    };
    Ok(Some(layer))
}

/// Build the router for a ready responder.
pub fn create_router(
    responder: Arc<Responder>,
    cors: &CorsPolicy,
) -> Result<Router> {
    let mut router = Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .with_state(responder);

    if let Some(cors) = cors_layer(cors)? {
        router = router.layer(cors);
    }
    Ok(router.layer(TraceLayer::new_for_http()))
}

/// Serve until Ctrl-C.
pub async fn serve(router: Router, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        index::tests::HashingEmbedder,
        records,
        responder::{
            ResponderConfig,
            tests::{FailingGenerator, test_responder},
        },
    };

    fn router(cors: &CorsPolicy) -> Router {
        let (responder, _) = test_responder(ResponderConfig::default());
        create_router(Arc::new(responder), cors).unwrap()
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body<T: serde::de::DeserializeOwned>(res: Response) -> T {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn chat_returns_answer_and_sources() {
        let res = router(&CorsPolicy::Disabled)
            .oneshot(chat_request(
                r#"{"question": "Which projects are at risk?"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let answer: Answer = json_body(res).await;
        assert!(!answer.answer.is_empty());
        assert_eq!(answer.sources.len(), 4);
    }

    #[tokio::test]
    async fn empty_question_is_bad_request() {
        let res = router(&CorsPolicy::Disabled)
            .oneshot(chat_request(r#"{"question": "   "}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body: ErrorResponse = json_body(res).await;
        assert_eq!(body.error, "question must not be empty");
    }

    #[tokio::test]
    async fn responder_failure_is_opaque_server_error() {
        let responder = Responder::build(
            records::builtin(),
            Box::new(HashingEmbedder),
            Box::new(FailingGenerator),
            ResponderConfig::default(),
        )
        .unwrap();
        let router =
            create_router(Arc::new(responder), &CorsPolicy::Disabled).unwrap();

        let res = router
            .oneshot(chat_request(r#"{"question": "Which projects?"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: ErrorResponse = json_body(res).await;
        assert_eq!(body.error, "failed to answer question");
        assert!(!body.error.contains("boom"));
    }

    #[tokio::test]
    async fn missing_question_is_client_error() {
        let res = router(&CorsPolicy::Disabled)
            .oneshot(chat_request(r#"{"prompt": "hi"}"#))
            .await
            .unwrap();
        assert!(res.status().is_client_error());
    }

    #[tokio::test]
    async fn health_reports_documents() {
        let res = router(&CorsPolicy::Disabled)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let health: HealthResponse = json_body(res).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.documents, 4);
    }

    #[tokio::test]
    async fn any_origin_without_credentials_uses_wildcard() {
        let policy = CorsPolicy::AnyOrigin {
            allow_credentials: false,
        };
        let mut req = chat_request(r#"{"question": "hi"}"#);
        req.headers_mut()
            .insert(header::ORIGIN, HeaderValue::from_static("http://a.test"));

        let res = router(&policy).oneshot(req).await.unwrap();
        assert_eq!(
            res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn credentialed_any_origin_mirrors_request_origin() {
        let policy = CorsPolicy::AnyOrigin {
            allow_credentials: true,
        };
        let mut req = chat_request(r#"{"question": "hi"}"#);
        req.headers_mut()
            .insert(header::ORIGIN, HeaderValue::from_static("http://a.test"));

        let res = router(&policy).oneshot(req).await.unwrap();
        assert_eq!(
            res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://a.test"
        );
        assert_eq!(
            res.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );
    }

    #[tokio::test]
    async fn listed_origins_reject_others() {
        let policy = CorsPolicy::Origins {
            origins: vec!["http://localhost:3000".to_string()],
            allow_credentials: false,
        };
        let mut req = chat_request(r#"{"question": "hi"}"#);
        req.headers_mut()
            .insert(
                header::ORIGIN,
                HeaderValue::from_static("http://evil.test"),
            );

        let res = router(&policy).oneshot(req).await.unwrap();
        assert!(
            !res.headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }

    #[test]
    fn invalid_origin_is_config_error() {
        let policy = CorsPolicy::Origins {
            origins: vec!["bad\norigin".to_string()],
            allow_credentials: false,
        };
        assert!(matches!(cors_layer(&policy), Err(Error::Config(_))));
    }
}
