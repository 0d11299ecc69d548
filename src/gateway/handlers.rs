use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::wire::{QueryRequestWire, QueryResponseWire, to_wire_response};
use super::AppState;
use crate::coordinator::{CoordinatorError, QueryRequest};
use crate::types::UserContext;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for CoordinatorError {
    fn into_response(self) -> Response {
        let status = match self {
            CoordinatorError::EmptyQuery | CoordinatorError::TopKOutOfRange { .. } => StatusCode::BAD_REQUEST,
            CoordinatorError::Embedding(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

pub async fn query(
    State(state): State<AppState>,
    Json(wire): Json<QueryRequestWire>,
) -> Result<Json<QueryResponseWire>, CoordinatorError> {
    let top_k = wire.top_k.unwrap_or(state.top_k_default);
    let web_mode = wire.resolved_web_mode();
    let premium_name = wire.query_embedder_type.clone();

    let request = QueryRequest {
        query: wire.query,
        top_k: Some(top_k),
        use_cache: wire.use_cache,
        premium_name: premium_name.clone(),
        web_mode,
        user_context: UserContext { fields: wire.user_context.into_iter().collect() },
        filter: None,
    };

    let result = state.coordinator.query(request).await?;
    Ok(Json(to_wire_response(result, top_k, web_mode, premium_name, &state.generation_model)))
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

pub async fn healthz() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

pub async fn ready(State(state): State<AppState>) -> Response {
    if state.ready.load(std::sync::atomic::Ordering::Relaxed) {
        Json(HealthBody { status: "ready" }).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(HealthBody { status: "not_ready" })).into_response()
    }
}

