//! HTTP front door: `POST /v1/query`, `GET /healthz`, `GET /ready`, wiring the [`QueryCoordinator`]
//! to `axum` the way the teacher wires its chat-completions gateway to its cache/scoring stack.

pub mod handlers;
pub mod wire;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::coordinator::QueryCoordinator;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<QueryCoordinator>,
    pub generation_model: Arc<str>,
    pub top_k_default: usize,
    pub ready: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(coordinator: Arc<QueryCoordinator>, generation_model: impl Into<Arc<str>>, top_k_default: usize) -> Self {
        Self { coordinator, generation_model: generation_model.into(), top_k_default, ready: Arc::new(AtomicBool::new(true)) }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/query", post(handlers::query))
        .route("/healthz", get(handlers::healthz))
        .route("/ready", get(handlers::ready))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SemanticCacheHandle;
    use crate::embedding::EmbedderRegistry;
    use crate::embedding::local::HashLocalEmbedder;
    use crate::evaluation::{EvaluatorConfig, QualityEvaluator};
    use crate::generation::AnswerGenerator;
    use crate::generation::mock::StubLanguageModel;
    use crate::index::text::Bm25TextIndex;
    use crate::index::vector::InMemoryVectorIndex;
    use crate::metrics::NoopMetricsSink;
    use crate::retrieval::two_step::TwoStepRetriever;
    use crate::retrieval::{HybridRetriever, PromotionConfig, ThreeTierOrchestrator, TierWeights};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn test_state() -> AppState {
        let local = Arc::new(HashLocalEmbedder::new(8));
        let registry = Arc::new(EmbedderRegistry::new(local, None));
        let vector_index: Arc<dyn crate::index::VectorIndex> = Arc::new(InMemoryVectorIndex::new(8));
        let text_index: Arc<dyn crate::index::TextIndex> = Arc::new(Bm25TextIndex::new());

        let two_step = TwoStepRetriever::new(Arc::clone(&registry), Arc::clone(&vector_index));
        let hybrid = Arc::new(HybridRetriever::new(two_step, Arc::clone(&text_index)));
        let orchestrator = Arc::new(ThreeTierOrchestrator::new(
            hybrid,
            None,
            vector_index,
            text_index,
            Arc::clone(&registry),
            TierWeights::default(),
            Duration::from_millis(500),
            PromotionConfig { enabled: false, ..PromotionConfig::default() },
        ));

        let llm = Arc::new(StubLanguageModel { response: "an answer".to_string() });
        let generator = Arc::new(AnswerGenerator::new(llm, "stub-model", 0.0, 256));
        let evaluator = Arc::new(QualityEvaluator::new(EvaluatorConfig::default(), Arc::new(NoopMetricsSink)));
        let coordinator = Arc::new(QueryCoordinator::new(
            registry,
            SemanticCacheHandle::new(),
            orchestrator,
            generator,
            evaluator,
            10,
            500,
            false,
            0.0,
        ));

        AppState::new(coordinator, "stub-model", 10)
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let router = build_router(test_state().await);
        let response = router
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn query_endpoint_rejects_empty_query() {
        let router = build_router(test_state().await);
        let body = Body::from(serde_json::to_vec(&serde_json::json!({ "query": "" })).unwrap());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/query")
                    .header("content-type", "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn query_endpoint_returns_answer_for_valid_query() {
        let router = build_router(test_state().await);
        let body = Body::from(serde_json::to_vec(&serde_json::json!({ "query": "what is rate limiting" })).unwrap());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/query")
                    .header("content-type", "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["answer"], "an answer");
    }
}
