//! Test server harness: spawns the real gateway router on a loopback port with stub
//! embedders/LLM/web provider wired in, so tests exercise actual HTTP plumbing rather than
//! calling the coordinator in-process. Grounded in the teacher's `spawn_test_server` shape.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use triarag::cache::SemanticCacheHandle;
use triarag::embedding::EmbedderRegistry;
use triarag::embedding::local::HashLocalEmbedder;
use triarag::evaluation::{EvaluatorConfig, QualityEvaluator};
use triarag::generation::AnswerGenerator;
use triarag::generation::mock::StubLanguageModel;
use triarag::index::text::Bm25TextIndex;
use triarag::index::vector::InMemoryVectorIndex;
use triarag::index::{TextIndex, VectorIndex};
use triarag::metrics::NoopMetricsSink;
use triarag::retrieval::two_step::TwoStepRetriever;
use triarag::retrieval::{HybridRetriever, PromotionConfig, ThreeTierOrchestrator, TierWeights};
use triarag::types::{ChunkBuilder, IngestChunk, TextRecord, TierOrigin, VectorRecord};
use triarag::web::WebSearchProvider;
use triarag::{AppState, QueryCoordinator, build_router};

const EMBEDDING_DIM: usize = 8;

pub struct TestServer {
    pub addr: SocketAddr,
    _handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// One curated chunk seeded into both the vector and text index so retrieval always has
/// something to fuse, plus whatever the caller passes in `llm_response`.
pub async fn spawn(llm_response: &str, web: Option<Arc<dyn WebSearchProvider>>) -> TestServer {
    spawn_with_seed(llm_response, web, "RAPTOR RAG builds a tree of summaries.", true).await
}

pub async fn spawn_with_seed(
    llm_response: &str,
    web: Option<Arc<dyn WebSearchProvider>>,
    seed_text: &str,
    seed_corpus: bool,
) -> TestServer {
    let local = Arc::new(HashLocalEmbedder::new(EMBEDDING_DIM));
    let registry = Arc::new(EmbedderRegistry::new(local, None));
    let vector_index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new(EMBEDDING_DIM));
    let text_index: Arc<dyn TextIndex> = Arc::new(Bm25TextIndex::new());

    if seed_corpus {
        let chunk = ChunkBuilder::build(
            IngestChunk {
                text: seed_text.to_string(),
                source_path: "doc-0.md".to_string(),
                document_id: "doc-0".to_string(),
                document_type: "pattern".to_string(),
                tier_origin: TierOrigin::Curated,
                source_hash: "hash".to_string(),
                source_mtime: None,
                url: None,
                trust_score: None,
                ttl: None,
            },
            chrono::Utc::now(),
        );
        let vector = registry.embed_documents(&[chunk.text.clone()]).await.unwrap();
        vector_index
            .upsert(vec![VectorRecord { chunk_id: chunk.chunk_id.clone(), local_vector: vector[0].clone(), payload: chunk.clone() }])
            .await
            .unwrap();
        text_index
            .upsert(vec![TextRecord { chunk_id: chunk.chunk_id.clone(), text: chunk.text.clone(), payload: chunk }])
            .await
            .unwrap();
    }

    let two_step = TwoStepRetriever::new(Arc::clone(&registry), Arc::clone(&vector_index));
    let hybrid = Arc::new(HybridRetriever::new(two_step, Arc::clone(&text_index)));
    let orchestrator = Arc::new(ThreeTierOrchestrator::new(
        hybrid,
        web,
        vector_index,
        text_index,
        Arc::clone(&registry),
        TierWeights::default(),
        Duration::from_millis(500),
        PromotionConfig { enabled: false, ..PromotionConfig::default() },
    ));

    let llm = Arc::new(StubLanguageModel { response: llm_response.to_string() });
    let generator = Arc::new(AnswerGenerator::new(llm, "stub-model", 0.0, 256));
    let evaluator = Arc::new(QualityEvaluator::new(EvaluatorConfig::default(), Arc::new(NoopMetricsSink)));

    let coordinator = Arc::new(QueryCoordinator::new(
        registry,
        SemanticCacheHandle::with_capacity(1000, 0.97),
        orchestrator,
        Arc::clone(&generator),
        evaluator,
        10,
        500,
        true,
        1.0,
    ));

    let state = AppState::new(coordinator, generator.model().to_string(), 10);
    let app = build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    TestServer { addr, _handle: handle, shutdown_tx: Some(shutdown_tx) }
}
