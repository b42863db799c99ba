//! HTTP surface: GraphQL endpoint, health check and server loop

use async_graphql::{Request, Response};
use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::dataloaders::Loaders;
use crate::schema::{build_schema, CrmSchema};
use crate::service::CrmService;

/// Shared state handed to every request
#[derive(Clone)]
pub struct AppState {
    pub schema: CrmSchema,
    pub service: CrmService,
}

impl AppState {
    pub fn new(service: CrmService, config: &Config) -> Self {
        Self {
            schema: build_schema(service.clone(), config.query_depth_limit),
            service,
        }
    }
}

/// Take the caller's `x-request-id`, or generate one
pub fn extract_request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Execute one GraphQL request with fresh per-request data loaders
pub async fn execute(state: &AppState, request: Request, request_id: &str) -> Response {
    let operation = request.operation_name.clone().unwrap_or_default();
    let span = tracing::info_span!("graphql", request_id = %request_id, operation = %operation);

    async move {
        let request = request.data(Loaders::new(state.service.store()));
        let response = state.schema.execute(request).await;
        if response.errors.is_empty() {
            tracing::debug!("request completed");
        } else {
            tracing::warn!(
                errors = response.errors.len(),
                first = %response.errors[0].message,
                "request completed with errors"
            );
        }
        response
    }
    .instrument(span)
    .await
}

/// GraphQL handler
pub async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: Json<Request>,
) -> Json<Response> {
    let request_id = extract_request_id(&headers);
    Json(execute(&state, req.0, &request_id).await)
}

async fn health() -> &'static str {
    "ok"
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/graphql", post(graphql_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl+C
pub async fn serve(config: &Config, state: AppState) -> std::io::Result<()> {
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "GraphQL endpoint listening at http://{}/graphql", addr);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::http::HeaderValue;
    use std::sync::Arc;

    fn state() -> AppState {
        let service = CrmService::new(Arc::new(MemoryStore::new()));
        AppState::new(service, &Config::default())
    }

    #[test]
    fn test_request_id_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("abc-123"));
        assert_eq!(extract_request_id(&headers), "abc-123");
    }

    #[test]
    fn test_request_id_generated() {
        let id = extract_request_id(&HeaderMap::new());
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[tokio::test]
    async fn test_handler_executes_query() {
        let Json(response) =
            graphql_handler(State(state()), HeaderMap::new(), Json(Request::new("{ hello }"))).await;
        assert!(response.errors.is_empty());
        assert_eq!(
            response.data.into_json().unwrap(),
            serde_json::json!({ "hello": "Hello, GraphQL!" })
        );
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(health().await, "ok");
    }
}
