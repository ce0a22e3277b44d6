// crates/opsgate-api/tests/common/mod.rs
// ============================================================================
// Module: API Test Harness
// Description: Shared state builders and request helpers for endpoint tests.
// Purpose: Exercise handlers directly with deterministic ports and clock.
// ============================================================================

//! Shared harness for OpsGate API endpoint tests.

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only helpers are shared across test binaries."
)]

use std::sync::Arc;

use axum::body::to_bytes;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::Response;
use opsgate_api::AppState;
use opsgate_config::OpsGateConfig;
use opsgate_core::ArtifactId;
use opsgate_core::EdgeId;
use opsgate_core::FixedClock;
use opsgate_core::FixedEmbedding;
use opsgate_core::FixtureKnowledgeGraph;
use opsgate_core::FixtureSemanticIndex;
use opsgate_core::GraphEdge;
use opsgate_core::GraphNode;
use opsgate_core::GraphTraversal;
use opsgate_core::InMemoryFleetStore;
use opsgate_core::NodeId;
use opsgate_core::Provenance;
use opsgate_core::RetrievalHit;
use opsgate_core::RunId;
use opsgate_core::WorkspaceId;
use serde_json::Value;
use serde_json::json;

/// Timestamp every heartbeat and audit event observes in tests.
pub const TEST_NOW: &str = "2026-08-28T10:00:00Z";

/// Deployment config used by the harness: three tokens, small limits.
const CONFIG: &str = r#"
[[auth.principals]]
token = "tok-admin"
workspace_id = "ws-1"
user_id = "user-admin"
roles = ["admin"]

[[auth.principals]]
token = "tok-auditor"
workspace_id = "ws-1"
user_id = "user-auditor"
roles = ["auditor"]

[[auth.principals]]
token = "tok-other"
workspace_id = "ws-2"
user_id = "user-other"
roles = ["operator"]

[limits]
max_query_length = 64
max_top_k = 10
max_depth = 3
"#;

/// Builds state with a fleet store and deterministic clock, no retrieval.
pub fn fleet_state() -> AppState {
    let config = OpsGateConfig::from_toml_str(CONFIG).unwrap();
    AppState::from_config(&config)
        .with_clock(Arc::new(FixedClock::new(TEST_NOW)))
        .with_fleet(Arc::new(InMemoryFleetStore::new()))
}

/// Builds state with retrieval ports seeded with cross-tenant fixtures.
pub fn retrieval_state() -> AppState {
    let config = OpsGateConfig::from_toml_str(CONFIG).unwrap();
    AppState::from_config(&config)
        .with_clock(Arc::new(FixedClock::new(TEST_NOW)))
        .with_semantic(
            Arc::new(FixtureSemanticIndex {
                hits: vec![seeded_hit("ws-1"), seeded_hit("ws-2")],
            }),
            Arc::new(FixedEmbedding {
                vector: vec![0.1, 0.2, 0.3],
            }),
        )
        .with_graph(Arc::new(FixtureKnowledgeGraph {
            traversal: seeded_traversal(),
        }))
}

/// Builds state with every port absent.
pub fn bare_state() -> AppState {
    let config = OpsGateConfig::from_toml_str(CONFIG).unwrap();
    AppState::from_config(&config).with_clock(Arc::new(FixedClock::new(TEST_NOW)))
}

/// One hit owned by the given workspace, carrying secret-shaped content.
fn seeded_hit(workspace: &str) -> RetrievalHit {
    RetrievalHit {
        artifact_id: ArtifactId::new(format!("art-{workspace}")),
        score: Some(0.92),
        text: Some("see bearer abcdef0123456789abcdef for access".to_string()),
        metadata: json!({"api_key": "sk-live-1234", "source": "ingest"})
            .as_object()
            .unwrap()
            .clone(),
        provenance: Provenance {
            workspace_id: WorkspaceId::new(workspace),
            run_id: RunId::new("run-1"),
        },
    }
}

/// A traversal mixing two workspaces, with sensitive node properties.
fn seeded_traversal() -> GraphTraversal {
    GraphTraversal {
        nodes: vec![
            GraphNode {
                node_id: NodeId::new("n-1"),
                workspace_id: WorkspaceId::new("ws-1"),
                kind: "artifact".to_string(),
                label: Some("ingest artifact".to_string()),
                properties: json!({"secretRef": "vault://grants/n-1", "size": 12})
                    .as_object()
                    .unwrap()
                    .clone(),
            },
            GraphNode {
                node_id: NodeId::new("n-2"),
                workspace_id: WorkspaceId::new("ws-2"),
                kind: "artifact".to_string(),
                label: None,
                properties: serde_json::Map::new(),
            },
        ],
        edges: vec![
            GraphEdge {
                edge_id: EdgeId::new("e-1"),
                from_node_id: NodeId::new("n-1"),
                to_node_id: NodeId::new("n-3"),
                workspace_id: WorkspaceId::new("ws-1"),
                relation: "produced_by".to_string(),
                properties: None,
            },
            GraphEdge {
                edge_id: EdgeId::new("e-2"),
                from_node_id: NodeId::new("n-2"),
                to_node_id: NodeId::new("n-4"),
                workspace_id: WorkspaceId::new("ws-2"),
                relation: "produced_by".to_string(),
                properties: None,
            },
        ],
    }
}

/// Headers carrying the given bearer token.
pub fn auth_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    headers
}

/// Consumes a response into its status and parsed JSON body.
pub async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Asserts the response is a problem document with the given status.
pub async fn expect_problem(response: Response, status: StatusCode) -> Value {
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let (actual, body) = read_json(response).await;
    assert_eq!(actual, status, "unexpected status, body: {body}");
    assert_eq!(content_type, opsgate_api::PROBLEM_CONTENT_TYPE);
    assert_eq!(body["status"], status.as_u16());
    body
}

/// A schema-valid machine registration body for the given workspace.
pub fn machine_body(workspace: &str, machine: &str) -> Value {
    json!({
        "machineId": machine,
        "workspaceId": workspace,
        "endpointUrl": "https://edge.example.com",
        "active": true,
        "displayName": "Edge Gateway",
        "capabilities": [{"capability": "robotics:move"}],
        "registeredAtIso": "2026-08-01T12:00:00Z",
        "executionPolicy": {
            "isolationMode": "PerTenantWorker",
            "egressAllowlist": ["https://api.example.com"],
            "workloadIdentity": "Required"
        },
        "authConfig": {"kind": "bearer", "secretRef": "vault://grants/m-1"}
    })
}

/// A schema-valid agent configuration body for the given workspace.
pub fn agent_body(workspace: &str, agent: &str, machine: Option<&str>) -> Value {
    let mut body = json!({
        "agentId": agent,
        "workspaceId": workspace,
        "displayName": "Triage Agent",
        "capabilities": [{"capability": "triage:read"}],
        "policyTier": "HumanApprove",
        "allowedTools": ["search"],
        "registeredAtIso": "2026-08-01T12:00:00Z"
    });
    if let Some(machine) = machine {
        body["machineId"] = Value::String(machine.to_string());
    }
    body
}
