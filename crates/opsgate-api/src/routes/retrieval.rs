// crates/opsgate-api/src/routes/retrieval.rs
// ============================================================================
// Module: Retrieval Routes
// Description: Semantic search and bounded graph traversal gateway.
// Purpose: Validate, orchestrate ports, then redact and tenant-filter.
// Dependencies: crate, axum, opsgate-core, serde
// ============================================================================

//! ## Overview
//! The retrieval gateway runs a fixed pipeline: validate input limits,
//! call the embedding and index ports (or the graph port), redact the
//! results, re-filter them to the requesting tenant, serialize. A limit
//! violation short-circuits before any port is called.
//!
//! ## Invariants
//! - Port results pass through [`opsgate_core::security`] before
//!   serialization on every path; there is no unfiltered exit.
//! - Port failures surface as generic server errors, never as silently
//!   empty result sets.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::response::Response;
use opsgate_core::Action;
use opsgate_core::GraphEdge;
use opsgate_core::GraphNode;
use opsgate_core::GraphTraversalParams;
use opsgate_core::LimitViolation;
use opsgate_core::NodeId;
use opsgate_core::Principal;
use opsgate_core::RetrievalHit;
use opsgate_core::SemanticQuery;
use opsgate_core::TraversalDirection;
use opsgate_core::WorkspaceId;
use opsgate_core::security;
use serde::Deserialize;
use serde::Serialize;

use crate::AppState;
use crate::problem::ApiError;
use crate::routes::audit_denial;
use crate::routes::gate;
use crate::routes::parse_body;

// ============================================================================
// SECTION: Wire Shapes
// ============================================================================

/// Result count used when the caller does not request one.
const DEFAULT_TOP_K: usize = 10;

/// Traversal depth used when the caller does not request one.
const DEFAULT_MAX_DEPTH: usize = 1;

/// Semantic search request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest {
    /// Query text to embed and search with.
    query: String,
    /// Requested result count; bounded by the configured maximum.
    #[serde(default)]
    top_k: Option<usize>,
    /// Minimum similarity score, when the caller restricts by score.
    #[serde(default)]
    min_score: Option<f64>,
}

/// Semantic search response body.
#[derive(Debug, Serialize)]
struct SearchResponse {
    /// Redacted, tenant-filtered hits.
    hits: Vec<RetrievalHit>,
}

/// Graph traversal request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQueryRequest {
    /// Traversal root node.
    root_node_id: String,
    /// Edge expansion direction; outbound when absent.
    #[serde(default)]
    direction: Option<TraversalDirection>,
    /// Requested hop depth; bounded by the configured maximum.
    #[serde(default)]
    max_depth: Option<usize>,
    /// Restrict expansion to these relation labels, when present.
    #[serde(default)]
    relation_filter: Option<Vec<String>>,
}

/// Graph traversal response body.
#[derive(Debug, Serialize)]
struct GraphQueryResponse {
    /// Redacted, tenant-filtered nodes.
    nodes: Vec<GraphNode>,
    /// Redacted, tenant-filtered edges.
    edges: Vec<GraphEdge>,
}

// ============================================================================
// SECTION: Limit Auditing
// ============================================================================

/// Records a limit rejection and converts it to the bad-request problem.
fn reject_limit(
    state: &AppState,
    principal: &Principal,
    workspace_id: &WorkspaceId,
    violation: LimitViolation,
) -> ApiError {
    audit_denial(
        state,
        "limit_rejected",
        principal.correlation_id.as_str(),
        workspace_id,
        Some(principal.user_id.as_str()),
        Action::ReadRetrieval,
        &violation.to_string(),
    );
    violation.into()
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// `POST /v1/workspaces/{workspace_id}/retrieval/search`
pub async fn semantic_search(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let workspace_id = WorkspaceId::new(workspace_id);
    let semantic = state.semantic_port()?;
    let embedding = state.embedding_port()?;
    let principal = gate(&state, &headers, &workspace_id, Action::ReadRetrieval).await?;

    let request: SearchRequest = parse_body(&body)?;
    state
        .limits
        .validate_query_length(&request.query)
        .map_err(|violation| reject_limit(&state, &principal, &workspace_id, violation))?;
    let top_k = request.top_k.unwrap_or(DEFAULT_TOP_K);
    state
        .limits
        .validate_top_k(top_k)
        .map_err(|violation| reject_limit(&state, &principal, &workspace_id, violation))?;

    let vector = embedding.embed(&request.query).await?;
    let query = SemanticQuery {
        vector: vector.0,
        top_k,
        min_score: request.min_score,
    };
    let mut hits = semantic.search(&workspace_id, &query).await?;

    security::redact_hits(&mut hits);
    let hits = security::filter_hits_to_workspace(hits, &workspace_id);
    Ok(Json(SearchResponse { hits }).into_response())
}

/// `POST /v1/workspaces/{workspace_id}/graph/query`
pub async fn graph_query(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let workspace_id = WorkspaceId::new(workspace_id);
    let graph = state.graph_port()?;
    let principal = gate(&state, &headers, &workspace_id, Action::ReadRetrieval).await?;

    let request: GraphQueryRequest = parse_body(&body)?;
    if request.root_node_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "rootNodeId must be a non-empty string".to_string(),
        ));
    }
    let max_depth = request.max_depth.unwrap_or(DEFAULT_MAX_DEPTH);
    state
        .limits
        .validate_max_depth(max_depth)
        .map_err(|violation| reject_limit(&state, &principal, &workspace_id, violation))?;

    let params = GraphTraversalParams {
        workspace_id: workspace_id.clone(),
        root_node_id: NodeId::new(request.root_node_id),
        direction: request.direction.unwrap_or(TraversalDirection::Outbound),
        max_depth,
        relation_filter: request.relation_filter,
    };
    let traversal = graph.traverse(&params).await?;

    let mut nodes = traversal.nodes;
    let mut edges = traversal.edges;
    security::redact_nodes(&mut nodes);
    security::redact_edges(&mut edges);
    let nodes = security::filter_nodes_to_workspace(nodes, &workspace_id);
    let edges = security::filter_edges_to_workspace(edges, &workspace_id);
    Ok(Json(GraphQueryResponse { nodes, edges }).into_response())
}
