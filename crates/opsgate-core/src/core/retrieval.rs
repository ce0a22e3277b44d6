// crates/opsgate-core/src/core/retrieval.rs
// ============================================================================
// Module: Retrieval Records
// Description: Semantic-index hits, knowledge-graph nodes and edges, traversals.
// Purpose: Model retrieval results with workspace provenance on every record.
// Dependencies: crate::core::identifiers, serde, serde_json
// ============================================================================

//! ## Overview
//! Retrieval records are what the semantic-index and knowledge-graph ports
//! return. Every record carries its owning workspace so the security filter
//! can re-apply tenant scoping without trusting the backing store.
//!
//! ## Invariants
//! - [`RetrievalHit`] provenance is mandatory; a hit without a workspace
//!   cannot be tenant-filtered and never enters the system.
//! - Node and edge property maps are free-form JSON; redaction walks them
//!   recursively at the security boundary, not here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::ArtifactId;
use crate::core::identifiers::EdgeId;
use crate::core::identifiers::NodeId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::WorkspaceId;

// ============================================================================
// SECTION: Semantic Index Records
// ============================================================================

/// Origin of a retrieval hit: the workspace and run that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    /// Workspace that owns the source artifact.
    pub workspace_id: WorkspaceId,
    /// Run that produced the source artifact.
    pub run_id: RunId,
}

/// One scored hit from the semantic index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalHit {
    /// Source artifact identifier.
    pub artifact_id: ArtifactId,
    /// Similarity score, when the index reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Matched text excerpt, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Free-form metadata attached by the index.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Mandatory origin of the hit.
    pub provenance: Provenance,
}

/// Parameters for a semantic similarity query against the index port.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticQuery {
    /// Embedded query vector.
    pub vector: Vec<f32>,
    /// Maximum hits to return; already limit-validated by the caller.
    pub top_k: usize,
    /// Minimum similarity score, when the caller restricts by score.
    pub min_score: Option<f64>,
}

// ============================================================================
// SECTION: Knowledge Graph Records
// ============================================================================

/// A knowledge-graph node with its owning workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Node identifier.
    pub node_id: NodeId,
    /// Workspace that owns the node.
    pub workspace_id: WorkspaceId,
    /// Node kind label (for example `artifact` or `decision`).
    pub kind: String,
    /// Human-readable label, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Free-form node properties.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A directed knowledge-graph edge with its owning workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    /// Edge identifier.
    pub edge_id: EdgeId,
    /// Source node.
    pub from_node_id: NodeId,
    /// Destination node.
    pub to_node_id: NodeId,
    /// Workspace that owns the edge.
    pub workspace_id: WorkspaceId,
    /// Relation label (for example `produced_by`).
    pub relation: String,
    /// Free-form edge properties, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

/// Result of a graph traversal: the visited nodes and connecting edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphTraversal {
    /// Nodes reached by the traversal, root included.
    pub nodes: Vec<GraphNode>,
    /// Edges walked by the traversal.
    pub edges: Vec<GraphEdge>,
}

/// Direction of edge expansion during traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalDirection {
    /// Follow edges from source to destination.
    Outbound,
    /// Follow edges from destination to source.
    Inbound,
    /// Follow edges in both directions.
    Both,
}

/// Parameters for a bounded graph traversal against the graph port.
///
/// # Invariants
/// - `workspace_id` is the requesting tenant; backends use it for scoping
///   and the security filter re-checks every returned record against it.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphTraversalParams {
    /// Requesting tenant.
    pub workspace_id: WorkspaceId,
    /// Traversal root node.
    pub root_node_id: NodeId,
    /// Edge expansion direction.
    pub direction: TraversalDirection,
    /// Maximum hop depth; already limit-validated by the caller.
    pub max_depth: usize,
    /// Restrict expansion to these relation labels, when present.
    pub relation_filter: Option<Vec<String>>,
}
