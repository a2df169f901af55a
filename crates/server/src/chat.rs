//! Customer-facing chat API.
//!
//! Endpoints:
//! - `POST /api/session`              — create a conversation session
//! - `POST /api/chat`                 — single-shot chat turn
//! - `POST /api/chat/stream`          — streamed chat turn (SSE)
//! - `GET  /api/session/{id}/history` — ordered conversation history
//! - `GET  /api/products`             — full product catalog
//! - `GET  /api/orders/{id}`          — order details

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};
use tracing::{error, info};
use uuid::Uuid;

use concierge_agent::Orchestrator;
use concierge_core::{Message, OrchestratorError, Order, OrderId, Product, SessionId};
use concierge_db::{ConversationStore, OrderStore, ProductCatalog};

#[derive(Clone)]
pub struct ApiState {
    orchestrator: Arc<Orchestrator>,
    conversations: Arc<dyn ConversationStore>,
    catalog: Arc<dyn ProductCatalog>,
    orders: Arc<dyn OrderStore>,
}

impl ApiState {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        conversations: Arc<dyn ConversationStore>,
        catalog: Arc<dyn ProductCatalog>,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        Self { orchestrator, conversations, catalog, orders }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub response: String,
    pub agent: &'static str,
    pub thought_process: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub count: usize,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/session", post(create_session))
        .route("/api/chat", post(chat))
        .route("/api/chat/stream", post(chat_stream))
        .route("/api/session/{session_id}/history", get(history))
        .route("/api/products", get(products))
        .route("/api/orders/{order_id}", get(order))
        .with_state(state)
}

fn error_response(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (status, Json(ApiError { error: error.into() }))
}

fn map_orchestrator_error(err: &OrchestratorError) -> (StatusCode, Json<ApiError>) {
    error!(event_name = "api.chat.failed", error = %err, "chat turn failed");
    let status = match err {
        OrchestratorError::Backend(_) => StatusCode::BAD_GATEWAY,
        OrchestratorError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    error_response(status, err.user_message())
}

fn resolve_session(requested: Option<String>) -> SessionId {
    match requested.filter(|id| !id.trim().is_empty()) {
        Some(id) => SessionId(id),
        None => SessionId(Uuid::new_v4().to_string()),
    }
}

async fn create_session(
    State(state): State<ApiState>,
) -> Result<Json<SessionResponse>, (StatusCode, Json<ApiError>)> {
    let session_id = SessionId(Uuid::new_v4().to_string());
    state.conversations.create_session(&session_id).await.map_err(|e| {
        error!(event_name = "api.session.create_failed", error = %e, "session create failed");
        error_response(StatusCode::SERVICE_UNAVAILABLE, "Could not create a session")
    })?;

    info!(event_name = "api.session.created", session_id = %session_id, "session created");
    Ok(Json(SessionResponse { session_id: session_id.0 }))
}

async fn chat(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ApiError>)> {
    let session_id = resolve_session(request.session_id);

    let outcome = state
        .orchestrator
        .process(&session_id, &request.message)
        .await
        .map_err(|e| map_orchestrator_error(&e))?;

    Ok(Json(ChatResponse {
        session_id: session_id.0,
        response: outcome.response,
        agent: outcome.agent,
        thought_process: outcome.trace,
    }))
}

async fn chat_stream(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = resolve_session(request.session_id);
    let receiver = state.orchestrator.process_stream(session_id, request.message);

    let stream = ReceiverStream::new(receiver).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().data(data))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn history(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, (StatusCode, Json<ApiError>)> {
    let session = SessionId(session_id);
    let messages = state.conversations.history(&session).await.map_err(|e| {
        error!(event_name = "api.history.failed", error = %e, "history fetch failed");
        error_response(StatusCode::SERVICE_UNAVAILABLE, "Could not load the conversation")
    })?;

    Ok(Json(HistoryResponse { session_id: session.0, messages }))
}

async fn products(
    State(state): State<ApiState>,
) -> Result<Json<ProductsResponse>, (StatusCode, Json<ApiError>)> {
    let products = state.catalog.all().await.map_err(|e| {
        error!(event_name = "api.products.failed", error = %e, "catalog fetch failed");
        error_response(StatusCode::SERVICE_UNAVAILABLE, "Could not load the catalog")
    })?;

    Ok(Json(ProductsResponse { count: products.len(), products }))
}

async fn order(
    State(state): State<ApiState>,
    Path(order_id): Path<String>,
) -> Result<Json<Order>, (StatusCode, Json<ApiError>)> {
    let id = OrderId(order_id);
    let found = state.orders.find_by_id(&id).await.map_err(|e| {
        error!(event_name = "api.orders.failed", error = %e, "order fetch failed");
        error_response(StatusCode::SERVICE_UNAVAILABLE, "Could not load the order")
    })?;

    match found {
        Some(order) => Ok(Json(order)),
        None => Err(error_response(StatusCode::NOT_FOUND, format!("No order found with ID {id}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use concierge_agent::{Classifier, Orchestrator, ReplyEngine, ToolDispatcher};
    use concierge_db::{
        InMemoryConversationStore, InMemoryOrderStore, InMemoryProductCatalog,
    };

    use super::{router, ApiState};

    fn canned_state() -> ApiState {
        let conversations = Arc::new(InMemoryConversationStore::default());
        let catalog = Arc::new(InMemoryProductCatalog::default());
        let orders = Arc::new(InMemoryOrderStore::default());
        let orchestrator = Arc::new(Orchestrator::new(
            conversations.clone(),
            Classifier::offline(),
            ReplyEngine::Canned,
            ToolDispatcher::new(catalog.clone(), orders.clone()),
        ));
        ApiState::new(orchestrator, conversations, catalog, orders)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        serde_json::from_slice(&bytes).expect("body is json")
    }

    #[tokio::test]
    async fn create_session_returns_a_fresh_id() {
        let app = router(canned_state());
        let response =
            app.oneshot(post_json("/api/session", "")).await.expect("request should run");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert!(!payload["session_id"].as_str().unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn chat_turn_returns_reply_agent_and_trace() {
        let app = router(canned_state());
        let response = app
            .oneshot(post_json(
                "/api/chat",
                r#"{"session_id": "s1", "message": "track my order please"}"#,
            ))
            .await
            .expect("request should run");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["session_id"], "s1");
        assert_eq!(payload["agent"], "Order Support Specialist");
        assert!(!payload["response"].as_str().unwrap_or_default().is_empty());
        assert_eq!(payload["thought_process"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn history_reflects_a_completed_turn() {
        let app = router(canned_state());
        let _ = app
            .clone()
            .oneshot(post_json("/api/chat", r#"{"session_id": "s1", "message": "hello"}"#))
            .await
            .expect("chat should run");

        let request = Request::builder()
            .uri("/api/session/s1/history")
            .body(Body::empty())
            .expect("request builds");
        let response = app.oneshot(request).await.expect("request should run");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["messages"].as_array().map(Vec::len), Some(2));
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["messages"][1]["role"], "assistant");
    }

    #[tokio::test]
    async fn products_endpoint_lists_the_catalog() {
        let app = router(canned_state());
        let request =
            Request::builder().uri("/api/products").body(Body::empty()).expect("request builds");
        let response = app.oneshot(request).await.expect("request should run");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert!(payload["count"].as_u64().unwrap_or(0) > 0);
    }

    #[tokio::test]
    async fn known_orders_are_returned_and_unknown_orders_404() {
        let app = router(canned_state());

        let found = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/orders/ORD-001")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("request should run");
        assert_eq!(found.status(), StatusCode::OK);
        let payload = body_json(found).await;
        assert_eq!(payload["status"], "shipped");

        let missing = app
            .oneshot(
                Request::builder()
                    .uri("/api/orders/ORD-999")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("request should run");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stream_endpoint_answers_with_event_stream_content_type() {
        let app = router(canned_state());
        let response = app
            .oneshot(post_json(
                "/api/chat/stream",
                r#"{"session_id": "s1", "message": "hello"}"#,
            ))
            .await
            .expect("request should run");

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/event-stream"));
    }
}
