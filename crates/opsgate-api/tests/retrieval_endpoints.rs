// crates/opsgate-api/tests/retrieval_endpoints.rs
// ============================================================================
// Module: Retrieval Endpoint Tests
// Description: Limit enforcement, redaction, and tenant filtering end to end.
// Purpose: Exercise the retrieval gateway against adversarial fixtures.
// ============================================================================

//! Endpoint tests for semantic search and graph traversal routes.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers are permitted."
)]

use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use opsgate_api::routes::retrieval;
use serde_json::json;

mod common;

use common::auth_headers;
use common::bare_state;
use common::expect_problem;
use common::read_json;
use common::retrieval_state;

/// Serializes a JSON value into a request body.
fn body_of(value: &serde_json::Value) -> Bytes {
    Bytes::from(serde_json::to_vec(value).unwrap())
}

// ============================================================================
// SECTION: Gate Sequence
// ============================================================================

#[tokio::test]
async fn absent_semantic_port_is_service_unavailable() {
    let response = retrieval::semantic_search(
        State(bare_state()),
        Path("ws-1".to_string()),
        HeaderMap::new(),
        body_of(&json!({"query": "anomalies"})),
    )
    .await
    .into_response();
    expect_problem(response, StatusCode::SERVICE_UNAVAILABLE).await;
}

#[tokio::test]
async fn missing_credential_is_unauthorized() {
    let response = retrieval::semantic_search(
        State(retrieval_state()),
        Path("ws-1".to_string()),
        HeaderMap::new(),
        body_of(&json!({"query": "anomalies"})),
    )
    .await
    .into_response();
    expect_problem(response, StatusCode::UNAUTHORIZED).await;
}

#[tokio::test]
async fn cross_tenant_principal_is_forbidden() {
    let response = retrieval::graph_query(
        State(retrieval_state()),
        Path("ws-1".to_string()),
        auth_headers("tok-other"),
        body_of(&json!({"rootNodeId": "n-1"})),
    )
    .await
    .into_response();
    expect_problem(response, StatusCode::FORBIDDEN).await;
}

// ============================================================================
// SECTION: Input Limits
// ============================================================================

#[tokio::test]
async fn query_one_character_over_the_limit_names_the_maximum() {
    // The harness configures max_query_length = 64.
    let query = "q".repeat(65);
    let response = retrieval::semantic_search(
        State(retrieval_state()),
        Path("ws-1".to_string()),
        auth_headers("tok-admin"),
        body_of(&json!({"query": query})),
    )
    .await
    .into_response();
    let body = expect_problem(response, StatusCode::BAD_REQUEST).await;
    assert!(body["detail"].as_str().unwrap().contains("64"));
}

#[tokio::test]
async fn top_k_over_the_limit_is_rejected() {
    let response = retrieval::semantic_search(
        State(retrieval_state()),
        Path("ws-1".to_string()),
        auth_headers("tok-admin"),
        body_of(&json!({"query": "anomalies", "topK": 11})),
    )
    .await
    .into_response();
    let body = expect_problem(response, StatusCode::BAD_REQUEST).await;
    assert!(body["detail"].as_str().unwrap().contains("10"));
}

#[tokio::test]
async fn depth_over_the_limit_is_rejected() {
    let response = retrieval::graph_query(
        State(retrieval_state()),
        Path("ws-1".to_string()),
        auth_headers("tok-admin"),
        body_of(&json!({"rootNodeId": "n-1", "maxDepth": 4})),
    )
    .await
    .into_response();
    let body = expect_problem(response, StatusCode::BAD_REQUEST).await;
    assert!(body["detail"].as_str().unwrap().contains('3'));
}

// ============================================================================
// SECTION: Semantic Search
// ============================================================================

#[tokio::test]
async fn search_results_are_redacted_and_tenant_filtered() {
    let response = retrieval::semantic_search(
        State(retrieval_state()),
        Path("ws-1".to_string()),
        auth_headers("tok-admin"),
        body_of(&json!({"query": "anomalies"})),
    )
    .await
    .into_response();
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);

    // The fixture seeds one ws-1 hit and one ws-2 hit.
    let hits = body["hits"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["provenance"]["workspaceId"], "ws-1");
    assert_eq!(hits[0]["metadata"]["api_key"], "[REDACTED]");
    assert_eq!(hits[0]["metadata"]["source"], "ingest");
    let text = hits[0]["text"].as_str().unwrap();
    assert!(text.contains("[REDACTED]"));
    assert!(!text.contains("abcdef0123456789abcdef"));
}

#[tokio::test]
async fn auditor_may_run_searches() {
    let response = retrieval::semantic_search(
        State(retrieval_state()),
        Path("ws-1".to_string()),
        auth_headers("tok-auditor"),
        body_of(&json!({"query": "anomalies"})),
    )
    .await
    .into_response();
    let (status, _) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// SECTION: Graph Traversal
// ============================================================================

#[tokio::test]
async fn traversal_results_are_redacted_and_tenant_filtered() {
    let response = retrieval::graph_query(
        State(retrieval_state()),
        Path("ws-1".to_string()),
        auth_headers("tok-admin"),
        body_of(&json!({"rootNodeId": "n-1", "maxDepth": 2, "direction": "both"})),
    )
    .await
    .into_response();
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);

    // The fixture mixes ws-1 and ws-2 nodes and edges.
    let nodes = body["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0]["nodeId"], "n-1");
    assert_eq!(nodes[0]["properties"]["secretRef"], "[REDACTED]");
    assert_eq!(nodes[0]["properties"]["size"], 12);

    let edges = body["edges"].as_array().unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0]["edgeId"], "e-1");
}

#[tokio::test]
async fn empty_root_node_is_rejected() {
    let response = retrieval::graph_query(
        State(retrieval_state()),
        Path("ws-1".to_string()),
        auth_headers("tok-admin"),
        body_of(&json!({"rootNodeId": "  "})),
    )
    .await
    .into_response();
    let body = expect_problem(response, StatusCode::BAD_REQUEST).await;
    assert!(body["detail"].as_str().unwrap().contains("rootNodeId"));
}
