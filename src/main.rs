//! triarag HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use triarag::cache::SemanticCacheHandle;
use triarag::config::Config;
use triarag::coordinator::QueryCoordinator;
use triarag::embedding::{CalibrationMatrix, CandleLocalEmbedder, EmbedderRegistry, HttpPremiumEmbedder, LocalEmbedder};
use triarag::evaluation::{EvaluatorConfig, QualityEvaluator};
use triarag::gateway::{AppState, build_router};
use triarag::generation::{AnswerGenerator, GenaiLanguageModel};
use triarag::index::vector::InMemoryVectorIndex;
use triarag::index::text::Bm25TextIndex;
use triarag::index::{TextIndex, VectorIndex};
use triarag::metrics::{MetricsSink, NoopMetricsSink, PrometheusMetricsSink};
use triarag::retrieval::two_step::TwoStepRetriever;
use triarag::retrieval::{HybridRetriever, PromotionConfig, ThreeTierOrchestrator, TierWeights};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Native dimension of the HTTP-backed premium embedder. Fixed here rather than made
/// configurable since the calibration matrix loaded for it is itself dimension-specific.
const PREMIUM_EMBEDDING_DIM: usize = 1536;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(bind_addr = %config.bind_addr, port = config.port, "triarag starting");

    let local: Arc<dyn LocalEmbedder> =
        Arc::new(CandleLocalEmbedder::load(config.local_model_path.clone(), triarag::constants::DEFAULT_LOCAL_EMBEDDING_DIM)?);

    let mut registry = EmbedderRegistry::new(local, config.default_premium_embedder.clone());

    if let Some(ref premium_name) = config.default_premium_embedder {
        let matrix_path = config.calibration_matrix_path_for(premium_name);
        if matrix_path.exists() {
            let premium = Arc::new(HttpPremiumEmbedder::new(
                premium_name.clone(),
                std::env::var("TRIARAG_PREMIUM_ENDPOINT").unwrap_or_default(),
                std::env::var("TRIARAG_PREMIUM_API_KEY").unwrap_or_default(),
                premium_name.clone(),
                PREMIUM_EMBEDDING_DIM,
            ));
            let calibration = CalibrationMatrix::load(&matrix_path)?;
            registry.register_premium(premium, calibration);
        } else {
            tracing::warn!(
                premium_name = %premium_name,
                path = %matrix_path.display(),
                "no calibration matrix found, premium embedder not registered"
            );
        }
    }
    let registry = Arc::new(registry);

    let vector_index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new(registry.local_dim()));
    let text_index: Arc<dyn TextIndex> = Arc::new(Bm25TextIndex::new());

    let two_step = TwoStepRetriever::new(Arc::clone(&registry), Arc::clone(&vector_index));
    let hybrid = Arc::new(HybridRetriever::new(two_step, Arc::clone(&text_index)));

    let web_provider: Option<Arc<dyn triarag::web::WebSearchProvider>> =
        if matches!(config.web_search_mode, triarag::types::WebSearchMode::Off) {
            None
        } else {
            let trust = triarag::web::TrustConfig {
                trusted_suffixes: config.web_search_trusted_domain_suffixes.clone(),
                blocked_suffixes: config.web_search_blocked_domains.clone(),
                enabled: true,
            };
            Some(Arc::new(triarag::web::HttpWebSearcher::new(
                std::env::var("TRIARAG_WEB_SEARCH_ENDPOINT").unwrap_or_default(),
                "default".to_string(),
                trust,
                config.web_search_max_queries_per_minute,
            )))
        };

    let orchestrator = Arc::new(ThreeTierOrchestrator::new(
        hybrid,
        web_provider,
        Arc::clone(&vector_index),
        Arc::clone(&text_index),
        Arc::clone(&registry),
        TierWeights {
            tier_1: config.tier_weights.0,
            tier_2: config.tier_weights.1,
            tier_3: config.tier_weights.2,
        },
        Duration::from_millis(config.per_tier_timeout_ms),
        PromotionConfig {
            enabled: true,
            min_trust_score: config.web_kb_min_trust_score,
            ttl: chrono::Duration::days(config.web_kb_ttl_days),
        },
    ));

    let metrics_sink: Arc<dyn MetricsSink> = match PrometheusMetricsSink::install() {
        Ok(sink) => Arc::new(sink),
        Err(err) => {
            tracing::warn!(error = %err, "failed to install prometheus recorder, falling back to a no-op sink");
            Arc::new(NoopMetricsSink)
        }
    };

    let llm = Arc::new(GenaiLanguageModel::new(config.generation_model.clone()));
    let generator = Arc::new(AnswerGenerator::new(
        llm,
        config.generation_model.clone(),
        config.generation_temperature,
        config.generation_max_response_tokens,
    ));

    let evaluator_config = EvaluatorConfig {
        relevance_threshold: config.evaluator_relevance_threshold,
        faithfulness_threshold: config.evaluator_faithfulness_threshold,
        utilization_threshold: config.evaluator_utilization_threshold,
    };
    let evaluator = Arc::new(QualityEvaluator::new(evaluator_config, Arc::clone(&metrics_sink)));

    let cache = SemanticCacheHandle::with_capacity(config.semantic_cache_capacity, config.semantic_cache_threshold);

    let coordinator = Arc::new(QueryCoordinator::new(
        registry,
        cache,
        orchestrator,
        Arc::clone(&generator),
        evaluator,
        config.top_k_default,
        config.generation_context_token_budget,
        config.evaluator_enabled,
        config.evaluator_sample_rate,
    ));

    let state = AppState::new(coordinator, generator.model().to_string(), config.top_k_default);
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("triarag shutdown complete");
    Ok(())
}

fn run_health_check() -> i32 {
    let port = std::env::var("TRIARAG_PORT").ok().and_then(|p| p.parse::<u16>().ok()).unwrap_or(8080);
    let url = format!("http://127.0.0.1:{port}/healthz");

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");

    rt.block_on(async {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .expect("failed to build client");

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, initiating graceful shutdown");
        }
    }
}
