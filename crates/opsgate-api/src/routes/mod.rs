// crates/opsgate-api/src/routes/mod.rs
// ============================================================================
// Module: Route Dispatch
// Description: Router assembly and the shared per-request gate sequence.
// Purpose: Run port, credential, scope, and role checks in one fixed order.
// Dependencies: crate, axum, opsgate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every handler runs the same gate sequence before touching a body or a
//! store: required port present, credential authenticated, path workspace
//! in scope, role allowed. The sequence is one function ([`gate`]) so no
//! endpoint can reorder or skip a step.
//!
//! ## Invariants
//! - Denials emit an audit event before returning; the response itself
//!   carries only the uniform problem document.
//! - Request bodies are parsed by hand after the gate passes, so every
//!   malformed body renders as a problem document too.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Router;
use axum::body::Bytes;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::routing::post;
use opsgate_core::Action;
use opsgate_core::Principal;
use opsgate_core::WorkspaceId;
use serde::de::DeserializeOwned;

use crate::AppState;
use crate::audit::AuditEvent;
use crate::auth::bearer_token;
use crate::auth::request_correlation;
use crate::problem::ApiError;
use crate::scope::check_scope;

pub mod fleet;
pub mod retrieval;

// ============================================================================
// SECTION: Router Assembly
// ============================================================================

/// Builds the control-plane router over the given state.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/workspaces/{workspace_id}/machines",
            get(fleet::list_machines).post(fleet::register_machine),
        )
        .route(
            "/v1/workspaces/{workspace_id}/machines/{machine_id}",
            get(fleet::get_machine),
        )
        .route(
            "/v1/workspaces/{workspace_id}/machines/{machine_id}/heartbeat",
            post(fleet::machine_heartbeat),
        )
        .route(
            "/v1/workspaces/{workspace_id}/agents",
            get(fleet::list_agents).post(fleet::create_agent),
        )
        .route(
            "/v1/workspaces/{workspace_id}/agents/{agent_id}",
            get(fleet::get_agent),
        )
        .route(
            "/v1/workspaces/{workspace_id}/agents/{agent_id}/heartbeat",
            post(fleet::agent_heartbeat),
        )
        .route(
            "/v1/workspaces/{workspace_id}/agents/{agent_id}/work-items",
            get(fleet::agent_work_items),
        )
        .route(
            "/v1/workspaces/{workspace_id}/retrieval/search",
            post(retrieval::semantic_search),
        )
        .route(
            "/v1/workspaces/{workspace_id}/graph/query",
            post(retrieval::graph_query),
        )
        .with_state(state)
}

// ============================================================================
// SECTION: Gate Sequence
// ============================================================================

/// Emits a denial event to the audit sink.
pub(crate) fn audit_denial(
    state: &AppState,
    event: &'static str,
    correlation_id: &str,
    workspace_id: &WorkspaceId,
    user_id: Option<&str>,
    action: Action,
    detail: &str,
) {
    state.audit.record(&AuditEvent {
        event,
        correlation_id: correlation_id.to_string(),
        workspace_id: Some(workspace_id.as_str().to_string()),
        user_id: user_id.map(str::to_string),
        action: Some(action.as_str()),
        detail: Some(detail.to_string()),
        at_iso: state.clock.now_iso(),
    });
}

/// Authenticates the request and enforces scope and role for the action.
///
/// The order is fixed: credential, path scope, role. Body-declared
/// workspaces are checked by the handler after parsing, via
/// [`crate::scope::check_body_workspace`].
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] for credential failures and the
/// uniform forbidden response for scope or role denial.
pub(crate) async fn gate(
    state: &AppState,
    headers: &HeaderMap,
    workspace_id: &WorkspaceId,
    action: Action,
) -> Result<Principal, ApiError> {
    let correlation = request_correlation(headers);

    let token = match bearer_token(headers) {
        Ok(token) => token,
        Err(error) => {
            audit_denial(
                state,
                "auth_denied",
                correlation.as_str(),
                workspace_id,
                None,
                action,
                "credential missing or malformed",
            );
            return Err(error);
        }
    };

    let Some(principal) = state.resolver.resolve(token, correlation.clone()).await else {
        audit_denial(
            state,
            "auth_denied",
            correlation.as_str(),
            workspace_id,
            None,
            action,
            "credential rejected",
        );
        return Err(ApiError::Unauthorized(
            "rejected bearer credential".to_string(),
        ));
    };

    if let Err(error) = check_scope(&principal, workspace_id) {
        audit_denial(
            state,
            "scope_denied",
            correlation.as_str(),
            workspace_id,
            Some(principal.user_id.as_str()),
            action,
            "workspace scope mismatch",
        );
        return Err(error);
    }

    if !principal.may(action) {
        audit_denial(
            state,
            "role_denied",
            correlation.as_str(),
            workspace_id,
            Some(principal.user_id.as_str()),
            action,
            "role does not permit action",
        );
        return Err(ApiError::access_denied());
    }

    Ok(principal)
}

// ============================================================================
// SECTION: Body Parsing
// ============================================================================

/// Parses a JSON request body into the target type.
///
/// # Errors
///
/// Returns [`ApiError::BadRequest`] describing the parse failure.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|err| ApiError::BadRequest(format!("invalid request body: {err}")))
}
