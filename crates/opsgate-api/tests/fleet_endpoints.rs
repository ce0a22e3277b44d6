// crates/opsgate-api/tests/fleet_endpoints.rs
// ============================================================================
// Module: Fleet Endpoint Tests
// Description: Gate sequence, credential stripping, and heartbeat behavior.
// Purpose: Exercise fleet handlers end to end against deterministic ports.
// ============================================================================

//! Endpoint tests for machine and agent registry routes.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers are permitted."
)]

use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use opsgate_api::routes::fleet;
use serde_json::json;

mod common;

use common::TEST_NOW;
use common::agent_body;
use common::auth_headers;
use common::bare_state;
use common::expect_problem;
use common::fleet_state;
use common::machine_body;
use common::read_json;

/// Serializes a JSON value into a request body.
fn body_of(value: &serde_json::Value) -> Bytes {
    Bytes::from(serde_json::to_vec(value).unwrap())
}

/// Registers one machine as the admin principal, asserting 201.
async fn register(state: &opsgate_api::AppState, workspace: &str, machine: &str) {
    let response = fleet::register_machine(
        State(state.clone()),
        Path(workspace.to_string()),
        auth_headers("tok-admin"),
        body_of(&machine_body(workspace, machine)),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::CREATED);
}

// ============================================================================
// SECTION: Gate Sequence
// ============================================================================

#[tokio::test]
async fn absent_fleet_port_is_service_unavailable_before_auth() {
    let response = fleet::register_machine(
        State(bare_state()),
        Path("ws-1".to_string()),
        HeaderMap::new(),
        body_of(&machine_body("ws-1", "m-1")),
    )
    .await
    .into_response();
    let body = expect_problem(response, StatusCode::SERVICE_UNAVAILABLE).await;
    assert_eq!(body["title"], "Service Unavailable");
}

#[tokio::test]
async fn missing_credential_is_unauthorized() {
    let response = fleet::list_machines(
        State(fleet_state()),
        Path("ws-1".to_string()),
        Query(Default::default()),
        HeaderMap::new(),
    )
    .await
    .into_response();
    let body = expect_problem(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(body["type"], "https://opsgate.dev/problems/unauthorized");
}

#[tokio::test]
async fn cross_tenant_and_role_denials_render_identically() {
    let state = fleet_state();

    // tok-other is scoped to ws-2; the path names ws-1.
    let scope = fleet::register_machine(
        State(state.clone()),
        Path("ws-1".to_string()),
        auth_headers("tok-other"),
        body_of(&machine_body("ws-1", "m-1")),
    )
    .await
    .into_response();
    let scope_body = expect_problem(scope, StatusCode::FORBIDDEN).await;

    // tok-auditor is scoped to ws-1 but denied the mutation.
    let role = fleet::register_machine(
        State(state),
        Path("ws-1".to_string()),
        auth_headers("tok-auditor"),
        body_of(&machine_body("ws-1", "m-1")),
    )
    .await
    .into_response();
    let role_body = expect_problem(role, StatusCode::FORBIDDEN).await;

    assert_eq!(scope_body, role_body);
}

#[tokio::test]
async fn body_naming_another_workspace_is_forbidden() {
    let response = fleet::register_machine(
        State(fleet_state()),
        Path("ws-1".to_string()),
        auth_headers("tok-admin"),
        body_of(&machine_body("ws-2", "m-1")),
    )
    .await
    .into_response();
    expect_problem(response, StatusCode::FORBIDDEN).await;
}

#[tokio::test]
async fn auditor_may_read_the_fleet() {
    let state = fleet_state();
    register(&state, "ws-1", "m-1").await;

    let response = fleet::list_machines(
        State(state),
        Path("ws-1".to_string()),
        Query(Default::default()),
        auth_headers("tok-auditor"),
    )
    .await
    .into_response();
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

// ============================================================================
// SECTION: Machine Registration
// ============================================================================

#[tokio::test]
async fn registration_returns_created_with_auth_config_stripped() {
    let response = fleet::register_machine(
        State(fleet_state()),
        Path("ws-1".to_string()),
        auth_headers("tok-admin"),
        body_of(&machine_body("ws-1", "m-1")),
    )
    .await
    .into_response();
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["machineId"], "m-1");
    assert_eq!(body["workspaceId"], "ws-1");
    assert!(body.get("authConfig").is_none());
    assert!(!body.to_string().contains("vault://grants/m-1"));
}

#[tokio::test]
async fn malformed_body_is_a_bad_request_problem() {
    let response = fleet::register_machine(
        State(fleet_state()),
        Path("ws-1".to_string()),
        auth_headers("tok-admin"),
        Bytes::from_static(b"{not json"),
    )
    .await
    .into_response();
    let body = expect_problem(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["title"], "Bad Request");
}

#[tokio::test]
async fn empty_capability_list_is_rejected() {
    let mut invalid = machine_body("ws-1", "m-1");
    invalid["capabilities"] = json!([]);
    let response = fleet::register_machine(
        State(fleet_state()),
        Path("ws-1".to_string()),
        auth_headers("tok-admin"),
        body_of(&invalid),
    )
    .await
    .into_response();
    let body = expect_problem(response, StatusCode::BAD_REQUEST).await;
    assert!(
        body["detail"]
            .as_str()
            .unwrap()
            .contains("capabilities")
    );
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let state = fleet_state();
    register(&state, "ws-1", "m-1").await;

    let response = fleet::register_machine(
        State(state),
        Path("ws-1".to_string()),
        auth_headers("tok-admin"),
        body_of(&machine_body("ws-1", "m-1")),
    )
    .await
    .into_response();
    let body = expect_problem(response, StatusCode::BAD_REQUEST).await;
    assert!(body["detail"].as_str().unwrap().contains("m-1"));
}

// ============================================================================
// SECTION: Machine Reads
// ============================================================================

#[tokio::test]
async fn get_machine_strips_credentials_and_misses_with_not_found() {
    let state = fleet_state();
    register(&state, "ws-1", "m-1").await;

    let found = fleet::get_machine(
        State(state.clone()),
        Path(("ws-1".to_string(), "m-1".to_string())),
        auth_headers("tok-admin"),
    )
    .await
    .into_response();
    let (status, body) = read_json(found).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("authConfig").is_none());
    assert_eq!(body["executionPolicy"]["isolationMode"], "PerTenantWorker");

    let missing = fleet::get_machine(
        State(state),
        Path(("ws-1".to_string(), "m-9".to_string())),
        auth_headers("tok-admin"),
    )
    .await
    .into_response();
    expect_problem(missing, StatusCode::NOT_FOUND).await;
}

#[tokio::test]
async fn machine_listing_strips_every_item_and_pages() {
    let state = fleet_state();
    register(&state, "ws-1", "m-1").await;
    register(&state, "ws-1", "m-2").await;
    register(&state, "ws-1", "m-3").await;

    let mut params = std::collections::BTreeMap::new();
    params.insert("limit".to_string(), "2".to_string());
    let response = fleet::list_machines(
        State(state.clone()),
        Path("ws-1".to_string()),
        Query(params),
        auth_headers("tok-admin"),
    )
    .await
    .into_response();
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    for item in items {
        assert!(item.get("authConfig").is_none());
    }
    assert_eq!(body["nextCursor"], "m-2");

    let mut resume = std::collections::BTreeMap::new();
    resume.insert("cursor".to_string(), "m-2".to_string());
    let rest = fleet::list_machines(
        State(state),
        Path("ws-1".to_string()),
        Query(resume),
        auth_headers("tok-admin"),
    )
    .await
    .into_response();
    let (_, rest_body) = read_json(rest).await;
    assert_eq!(rest_body["items"][0]["machineId"], "m-3");
    assert!(rest_body.get("nextCursor").is_none());
}

// ============================================================================
// SECTION: Agents
// ============================================================================

#[tokio::test]
async fn agent_create_get_and_machine_filter() {
    let state = fleet_state();

    let created = fleet::create_agent(
        State(state.clone()),
        Path("ws-1".to_string()),
        auth_headers("tok-admin"),
        body_of(&agent_body("ws-1", "a-1", Some("m-1"))),
    )
    .await
    .into_response();
    let (status, body) = read_json(created).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["agentId"], "a-1");
    assert_eq!(body["policyTier"], "HumanApprove");

    let unbound = fleet::create_agent(
        State(state.clone()),
        Path("ws-1".to_string()),
        auth_headers("tok-admin"),
        body_of(&agent_body("ws-1", "a-2", None)),
    )
    .await
    .into_response();
    assert_eq!(unbound.status(), StatusCode::CREATED);

    let mut params = std::collections::BTreeMap::new();
    params.insert("machineId".to_string(), "m-1".to_string());
    let filtered = fleet::list_agents(
        State(state.clone()),
        Path("ws-1".to_string()),
        Query(params),
        auth_headers("tok-admin"),
    )
    .await
    .into_response();
    let (_, filtered_body) = read_json(filtered).await;
    let items = filtered_body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["agentId"], "a-1");

    let fetched = fleet::get_agent(
        State(state),
        Path(("ws-1".to_string(), "a-2".to_string())),
        auth_headers("tok-admin"),
    )
    .await
    .into_response();
    let (_, fetched_body) = read_json(fetched).await;
    assert_eq!(fetched_body["agentId"], "a-2");
    assert!(fetched_body.get("machineId").is_none());
}

#[tokio::test]
async fn work_items_respond_with_an_empty_list() {
    let response = fleet::agent_work_items(
        State(fleet_state()),
        Path(("ws-1".to_string(), "a-1".to_string())),
        auth_headers("tok-auditor"),
    )
    .await
    .into_response();
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agentId"], "a-1");
    assert_eq!(body["items"], json!([]));
}

// ============================================================================
// SECTION: Heartbeats
// ============================================================================

#[tokio::test]
async fn heartbeat_records_server_time_and_upserts_unknown_ids() {
    let response = fleet::machine_heartbeat(
        State(fleet_state()),
        Path(("ws-1".to_string(), "m-unseen".to_string())),
        auth_headers("tok-admin"),
        body_of(&json!({"status": "ok", "metrics": {"cpu": 0.5}})),
    )
    .await
    .into_response();
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["machineId"], "m-unseen");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["lastHeartbeatAtIso"], TEST_NOW);
}

#[tokio::test]
async fn heartbeat_status_outside_the_vocabulary_is_rejected() {
    let response = fleet::agent_heartbeat(
        State(fleet_state()),
        Path(("ws-1".to_string(), "a-1".to_string())),
        auth_headers("tok-admin"),
        body_of(&json!({"status": "offline"})),
    )
    .await
    .into_response();
    let body = expect_problem(response, StatusCode::BAD_REQUEST).await;
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("offline"));
    assert!(detail.contains("degraded"));
}

#[tokio::test]
async fn auditor_may_report_heartbeats() {
    let response = fleet::agent_heartbeat(
        State(fleet_state()),
        Path(("ws-1".to_string(), "a-1".to_string())),
        auth_headers("tok-auditor"),
        body_of(&json!({"status": "degraded"})),
    )
    .await
    .into_response();
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agentId"], "a-1");
    assert_eq!(body["status"], "degraded");
}
