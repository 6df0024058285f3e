//! HTTP API server: shared state, router and error mapping.

use axum::{
    extract::FromRef,
    http::{
        header::{HeaderName, CONTENT_TYPE},
        Method, StatusCode,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use parley_messaging::{MessagingError, Messenger};
use parley_realtime::{EventHub, RealtimeError};
use parley_store::{NewCustomer, SupportStore};
use parley_types::Customer;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::chat_api::chat_routes;
use crate::config::NodeConfig;
use crate::messaging_api::messaging_routes;
use crate::observability::{
    metrics_handler, metrics_middleware, request_id_middleware, MetricsState, REQUEST_ID_HEADER,
};
use crate::realtime_api::realtime_routes;
use crate::validation::ValidationErrorResponse;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Messaging façade.
    pub messenger: Arc<Messenger>,
    /// Real-time event hub for WebSocket connections.
    pub realtime: Arc<EventHub>,
    /// Resolved node configuration.
    pub config: Arc<NodeConfig>,
    /// Prometheus registry and HTTP instruments.
    pub metrics: Arc<MetricsState>,
}

impl FromRef<AppState> for Arc<MetricsState> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

impl AppState {
    /// Build an empty store, a hub sized from `config` and the façade over both.
    pub fn new(config: NodeConfig) -> Self {
        let store = Arc::new(SupportStore::new());
        let realtime = Arc::new(EventHub::with_limits(
            config.max_connections,
            config.grant_ttl(),
        ));
        let messenger = Arc::new(Messenger::new(store, realtime.clone()));
        let metrics = Arc::new(MetricsState::new(messenger.metrics()));

        Self {
            messenger,
            realtime,
            config: Arc::new(config),
            metrics,
        }
    }

    /// Register the configured seed customers. Re-seeding is a no-op.
    pub fn seed(&self) -> Result<Vec<Customer>, MessagingError> {
        self.config
            .seed
            .iter()
            .map(|seed| {
                let customer = self.messenger.register_customer(NewCustomer {
                    id: seed.id.clone(),
                    name: seed.name.clone(),
                    email: seed.email.clone(),
                    avatar: None,
                    role: seed.role,
                })?;
                info!(customer_id = %customer.id, role = %customer.role, "Seeded customer");
                Ok(customer)
            })
            .collect()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(NodeConfig::default())
    }
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{}", .0.message)]
    Invalid(ValidationErrorResponse),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<MessagingError> for ApiError {
    fn from(err: MessagingError) -> Self {
        match err {
            MessagingError::Validation(msg) => ApiError::BadRequest(msg),
            MessagingError::NotFound(msg) => ApiError::NotFound(msg),
            MessagingError::PermissionDenied(msg) => ApiError::Forbidden(msg),
            MessagingError::Transport(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<RealtimeError> for ApiError {
    fn from(err: RealtimeError) -> Self {
        match err {
            RealtimeError::InvalidToken | RealtimeError::GrantExpired => {
                ApiError::Unauthorized(err.to_string())
            }
            RealtimeError::ConnectionLimit(_) => ApiError::Unavailable(err.to_string()),
            RealtimeError::PermissionDenied(msg) => ApiError::Forbidden(msg),
            RealtimeError::InvalidTopic(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ValidationErrorResponse> for ApiError {
    fn from(err: ValidationErrorResponse) -> Self {
        ApiError::Invalid(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Invalid(response) = self {
            return response.into_response();
        }

        let status = match &self {
            ApiError::Invalid(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Creates the API router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .merge(messaging_routes())
        .merge(chat_routes())
        .merge(realtime_routes())
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
