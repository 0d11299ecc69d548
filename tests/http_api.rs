//! End-to-end HTTP tests against a real spawned server, covering the scenarios the query
//! pipeline is expected to satisfy: curated-only retrieval, cache hit/miss, live-web
//! triggering and its failure modes, and hallucination detection.
//!
//! Cosine-similarity near-duplicate cache matching is exercised at the unit level in
//! `src/cache/mod.rs` instead of here: the stub local embedder this harness wires in hashes
//! whole strings, so two different phrasings of the same question do not land near each
//! other in embedding space the way a real embedder would.

mod common;

use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;

use triarag::types::WebSearchResult;
use triarag::web::{StubWebSearchProvider, WebSearchProvider};

async fn post_query(base_url: &str, body: Value) -> (reqwest::StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("{base_url}/v1/query"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    let parsed: Value = response.json().await.unwrap();
    (status, parsed)
}

#[tokio::test]
async fn pure_curated_retrieval_is_a_cache_miss() {
    let server = common::spawn("RAPTOR RAG builds a tree of summaries [1].", None).await;

    let (status, body) = post_query(
        &server.url(),
        json!({ "query": "What is RAPTOR RAG?", "top_k": 2, "enable_web_search": false }),
    )
    .await;

    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body["cache_hit"], false);
    assert!(body["retrieved_docs"].as_u64().unwrap() >= 1);
    let stats = &body["retrieval_stats"];
    assert!(stats["tier_1_results"].as_u64().unwrap() >= 1);
    assert_eq!(stats["tier_2_results"], 0);
    assert_eq!(stats["tier_3_results"], 0);
}

#[tokio::test]
async fn repeating_a_query_verbatim_hits_the_cache() {
    let server = common::spawn("RAPTOR RAG builds a tree of summaries [1].", None).await;
    let request = json!({ "query": "What is RAPTOR RAG?", "top_k": 2, "enable_web_search": false });

    let (_, first) = post_query(&server.url(), request.clone()).await;
    assert_eq!(first["cache_hit"], false);

    let (status, second) = post_query(&server.url(), request).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(second["cache_hit"], true);
    assert_eq!(second["answer"], first["answer"]);
    assert_eq!(second["sources"], first["sources"]);
}

#[tokio::test]
async fn low_confidence_mode_triggers_live_web_on_temporal_keyword() {
    let web_result = WebSearchResult {
        rank: 1,
        title: "New RAG techniques".to_string(),
        snippet_or_content: "New techniques in 2025 include ...".to_string(),
        url: "https://example.edu/rag-2025".to_string(),
        provider_id: "stub".to_string(),
        trust_score: 0.9,
        retrieved_at: Utc::now(),
        is_full_text: true,
    };
    let web: Arc<dyn WebSearchProvider> = Arc::new(StubWebSearchProvider::with_results(vec![web_result]));
    let server = common::spawn("Newer RAG patterns emerged in 2025 [1].", Some(web)).await;

    let (status, body) = post_query(
        &server.url(),
        json!({
            "query": "What are the latest RAG patterns in 2025?",
            "top_k": 5,
            "enable_web_search": true,
            "web_mode": "on_low_confidence",
        }),
    )
    .await;

    assert_eq!(status, reqwest::StatusCode::OK);
    let metrics = &body["retrieval_metrics"];
    assert!(metrics["tier_breakdown"]["tier_3_results"].as_u64().unwrap() >= 1);
    let reason = metrics["decision_path"]["web_trigger_reason"].as_str().unwrap();
    assert!(reason.contains("temporal keyword"), "unexpected trigger reason: {reason}");

    let sources = body["sources"].as_array().unwrap();
    assert!(sources.iter().any(|s| s["url"] == "https://example.edu/rag-2025" && s["trust_score"] == 0.9));
}

#[tokio::test]
async fn rate_limited_web_tier_still_returns_curated_results() {
    let web: Arc<dyn WebSearchProvider> = Arc::new(StubWebSearchProvider::rate_limited());
    let server = common::spawn("RAPTOR RAG builds a tree of summaries [1].", Some(web)).await;

    let (status, body) = post_query(
        &server.url(),
        json!({
            "query": "What are the latest RAG patterns in 2025?",
            "top_k": 5,
            "enable_web_search": true,
            "web_mode": "parallel",
        }),
    )
    .await;

    assert_eq!(status, reqwest::StatusCode::OK);
    let metrics = &body["retrieval_metrics"];
    assert_eq!(metrics["tier_breakdown"]["tier_3_results"], 0);
    assert_eq!(metrics["decision_path"]["web_live_used"], true);
    assert!(!metrics["decision_path"]["errors"].as_array().unwrap().is_empty());
    assert!(body["retrieved_docs"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn unsupported_claims_are_flagged_as_hallucinations() {
    let server = common::spawn(
        "RAPTOR RAG was invented in 2099 and requires a quantum computer [1].",
        None,
    )
    .await;

    let (status, body) = post_query(
        &server.url(),
        json!({ "query": "What is RAPTOR RAG?", "top_k": 2, "enable_web_search": false }),
    )
    .await;

    assert_eq!(status, reqwest::StatusCode::OK);
    let quality = &body["quality_metrics"]["answer"];
    assert!(quality["faithfulness"].as_f64().unwrap() < 0.5);
    assert_eq!(quality["has_hallucination"], true);
    let severity = quality["hallucination_severity"].as_str().unwrap();
    assert!(severity == "moderate" || severity == "severe", "unexpected severity: {severity}");
    assert!(!quality["unsupported_claims"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn empty_query_is_rejected_before_any_retrieval() {
    let server = common::spawn("unused", None).await;

    let (status, _) = post_query(&server.url(), json!({ "query": "" })).await;
    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn healthz_and_ready_respond_ok() {
    let server = common::spawn("unused", None).await;
    let client = reqwest::Client::new();

    let healthz = client.get(format!("{}/healthz", server.url())).send().await.unwrap();
    assert_eq!(healthz.status(), reqwest::StatusCode::OK);

    let ready = client.get(format!("{}/ready", server.url())).send().await.unwrap();
    assert_eq!(ready.status(), reqwest::StatusCode::OK);
}
