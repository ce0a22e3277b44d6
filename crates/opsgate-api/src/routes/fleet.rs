// crates/opsgate-api/src/routes/fleet.rs
// ============================================================================
// Module: Fleet Routes
// Description: Machine and agent registration, listing, and heartbeats.
// Purpose: Serve the fleet registry with uniform credential stripping.
// Dependencies: crate, axum, opsgate-core, serde
// ============================================================================

//! ## Overview
//! Fleet handlers run the gate sequence, parse and validate bodies by hand,
//! and respond with the core's view projections so `authConfig` can never
//! serialize, on single-get and list paths alike.
//!
//! ## Invariants
//! - Heartbeats are upserts: liveness reporting never returns not-found,
//!   and the recorded timestamp is the server's observation time.
//! - A create body naming a workspace other than the path workspace is
//!   forbidden even when the principal's tenant matches the path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use opsgate_core::Action;
use opsgate_core::AgentConfig;
use opsgate_core::AgentFilter;
use opsgate_core::AgentId;
use opsgate_core::HeartbeatKind;
use opsgate_core::HeartbeatRecord;
use opsgate_core::HeartbeatRequest;
use opsgate_core::MachineId;
use opsgate_core::MachineRegistration;
use opsgate_core::PageRequest;
use opsgate_core::WorkspaceId;
use serde::Serialize;
use serde_json::Value;

use crate::AppState;
use crate::problem::ApiError;
use crate::routes::gate;
use crate::routes::parse_body;
use crate::scope::check_body_workspace;

// ============================================================================
// SECTION: Wire Shapes
// ============================================================================

/// Acknowledgement for a machine heartbeat.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MachineHeartbeatAck {
    /// Machine that reported.
    machine_id: MachineId,
    /// Accepted status literal.
    status: String,
    /// Server observation time, RFC 3339.
    last_heartbeat_at_iso: String,
}

/// Acknowledgement for an agent heartbeat.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AgentHeartbeatAck {
    /// Agent that reported.
    agent_id: AgentId,
    /// Accepted status literal.
    status: String,
    /// Server observation time, RFC 3339.
    last_heartbeat_at_iso: String,
}

/// An agent's assigned work; assignment itself lives outside this core, so
/// the item list is always empty here.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkItemsResponse {
    /// Agent the items belong to.
    agent_id: AgentId,
    /// Assigned work items.
    items: Vec<Value>,
}

// ============================================================================
// SECTION: Query Parsing
// ============================================================================

/// Builds a page request from raw query parameters.
///
/// # Errors
///
/// Returns [`ApiError::BadRequest`] when `limit` is not a positive integer.
fn page_request(params: &BTreeMap<String, String>) -> Result<PageRequest, ApiError> {
    let cursor = params
        .get("cursor")
        .filter(|cursor| !cursor.is_empty())
        .cloned();
    let limit = match params.get("limit") {
        Some(raw) => Some(raw.parse::<usize>().ok().filter(|limit| *limit > 0).ok_or_else(
            || ApiError::BadRequest("limit must be a positive integer".to_string()),
        )?),
        None => None,
    };
    Ok(PageRequest { cursor, limit })
}

/// Builds the agent filter from raw query parameters. An absent `machineId`
/// yields no filter at all, never a null or empty filter.
///
/// # Errors
///
/// Returns [`ApiError::BadRequest`] when `machineId` is present but empty.
fn agent_filter(params: &BTreeMap<String, String>) -> Result<AgentFilter, ApiError> {
    match params.get("machineId") {
        None => Ok(AgentFilter::default()),
        Some(raw) if raw.trim().is_empty() => Err(ApiError::BadRequest(
            "machineId must be non-empty when present".to_string(),
        )),
        Some(raw) => Ok(AgentFilter {
            machine_id: Some(MachineId::new(raw.clone())),
        }),
    }
}

// ============================================================================
// SECTION: Machine Handlers
// ============================================================================

/// `POST /v1/workspaces/{workspace_id}/machines`
pub async fn register_machine(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let workspace_id = WorkspaceId::new(workspace_id);
    let fleet = state.fleet_port()?;
    let _principal = gate(&state, &headers, &workspace_id, Action::RegisterMachine).await?;

    let registration: MachineRegistration = parse_body(&body)?;
    check_body_workspace(&workspace_id, &registration.workspace_id)?;
    registration.validate()?;

    let view = registration.to_view();
    fleet.save_machine(registration).await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

/// `GET /v1/workspaces/{workspace_id}/machines`
pub async fn list_machines(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let workspace_id = WorkspaceId::new(workspace_id);
    let fleet = state.fleet_port()?;
    let _principal = gate(&state, &headers, &workspace_id, Action::ReadFleet).await?;

    let page = page_request(&params)?;
    let machines = fleet.list_machines(&workspace_id, &page).await?;
    Ok(Json(machines.map(|machine| machine.to_view())).into_response())
}

/// `GET /v1/workspaces/{workspace_id}/machines/{machine_id}`
pub async fn get_machine(
    State(state): State<AppState>,
    Path((workspace_id, machine_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let workspace_id = WorkspaceId::new(workspace_id);
    let machine_id = MachineId::new(machine_id);
    let fleet = state.fleet_port()?;
    let _principal = gate(&state, &headers, &workspace_id, Action::ReadFleet).await?;

    let machine = fleet
        .machine(&workspace_id, &machine_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("machine not found".to_string()))?;
    Ok(Json(machine.to_view()).into_response())
}

/// `POST /v1/workspaces/{workspace_id}/machines/{machine_id}/heartbeat`
pub async fn machine_heartbeat(
    State(state): State<AppState>,
    Path((workspace_id, machine_id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let workspace_id = WorkspaceId::new(workspace_id);
    let machine_id = MachineId::new(machine_id);
    let record = record_heartbeat(
        &state,
        &headers,
        HeartbeatKind::Machine,
        &workspace_id,
        machine_id.as_str(),
        &body,
    )
    .await?;
    Ok(Json(MachineHeartbeatAck {
        machine_id,
        status: record.status,
        last_heartbeat_at_iso: record.last_heartbeat_at_iso,
    })
    .into_response())
}

// ============================================================================
// SECTION: Agent Handlers
// ============================================================================

/// `POST /v1/workspaces/{workspace_id}/agents`
pub async fn create_agent(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let workspace_id = WorkspaceId::new(workspace_id);
    let fleet = state.fleet_port()?;
    let _principal = gate(&state, &headers, &workspace_id, Action::CreateAgent).await?;

    let agent: AgentConfig = parse_body(&body)?;
    check_body_workspace(&workspace_id, &agent.workspace_id)?;
    agent.validate()?;

    let view = agent.to_view();
    fleet.save_agent(agent).await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

/// `GET /v1/workspaces/{workspace_id}/agents`
pub async fn list_agents(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let workspace_id = WorkspaceId::new(workspace_id);
    let fleet = state.fleet_port()?;
    let _principal = gate(&state, &headers, &workspace_id, Action::ReadFleet).await?;

    let filter = agent_filter(&params)?;
    let page = page_request(&params)?;
    let agents = fleet.list_agents(&workspace_id, &filter, &page).await?;
    Ok(Json(agents.map(|agent| agent.to_view())).into_response())
}

/// `GET /v1/workspaces/{workspace_id}/agents/{agent_id}`
pub async fn get_agent(
    State(state): State<AppState>,
    Path((workspace_id, agent_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let workspace_id = WorkspaceId::new(workspace_id);
    let agent_id = AgentId::new(agent_id);
    let fleet = state.fleet_port()?;
    let _principal = gate(&state, &headers, &workspace_id, Action::ReadFleet).await?;

    let agent = fleet
        .agent(&workspace_id, &agent_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("agent not found".to_string()))?;
    Ok(Json(agent.to_view()).into_response())
}

/// `POST /v1/workspaces/{workspace_id}/agents/{agent_id}/heartbeat`
pub async fn agent_heartbeat(
    State(state): State<AppState>,
    Path((workspace_id, agent_id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let workspace_id = WorkspaceId::new(workspace_id);
    let agent_id = AgentId::new(agent_id);
    let record = record_heartbeat(
        &state,
        &headers,
        HeartbeatKind::Agent,
        &workspace_id,
        agent_id.as_str(),
        &body,
    )
    .await?;
    Ok(Json(AgentHeartbeatAck {
        agent_id,
        status: record.status,
        last_heartbeat_at_iso: record.last_heartbeat_at_iso,
    })
    .into_response())
}

/// `GET /v1/workspaces/{workspace_id}/agents/{agent_id}/work-items`
pub async fn agent_work_items(
    State(state): State<AppState>,
    Path((workspace_id, agent_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let workspace_id = WorkspaceId::new(workspace_id);
    let agent_id = AgentId::new(agent_id);
    state.fleet_port()?;
    let _principal = gate(&state, &headers, &workspace_id, Action::ReadFleet).await?;

    Ok(Json(WorkItemsResponse {
        agent_id,
        items: Vec::new(),
    })
    .into_response())
}

// ============================================================================
// SECTION: Heartbeat Core
// ============================================================================

/// Gates, validates, and persists one heartbeat; shared by both kinds.
///
/// The write is an upsert: an unknown id records fresh liveness state
/// rather than returning not-found.
async fn record_heartbeat(
    state: &AppState,
    headers: &HeaderMap,
    kind: HeartbeatKind,
    workspace_id: &WorkspaceId,
    entity_id: &str,
    body: &Bytes,
) -> Result<HeartbeatRecord, ApiError> {
    let fleet = state.fleet_port()?;
    let _principal = gate(state, headers, workspace_id, Action::Heartbeat).await?;

    let request: HeartbeatRequest = parse_body(body)?;
    state.heartbeat_statuses.validate(&request.status)?;

    let record = HeartbeatRecord {
        status: request.status,
        last_heartbeat_at_iso: state.clock.now_iso(),
    };
    fleet
        .record_heartbeat(kind, workspace_id, entity_id, record.clone())
        .await?;
    Ok(record)
}
