// crates/opsgate-api/src/scope.rs
// ============================================================================
// Module: Workspace Scope Guard
// Description: Tenant boundary enforcement for path and body workspace ids.
// Purpose: Fail closed before any store access when scopes disagree.
// Dependencies: opsgate-core
// ============================================================================

//! ## Overview
//! The scope guard compares the authenticated principal's tenant against
//! the workspace named in the request path, and, for create requests, the
//! workspace the body independently declares. Any disagreement fails closed
//! before any store access.
//!
//! ## Invariants
//! - The denial carries no information beyond "access denied"; why the
//!   scope failed is never leaked, and the same response covers role
//!   denial.
//! - A body naming a different workspace than the path is rejected even
//!   when the principal's tenant matches the path; a caller must not
//!   register a resource into a tenant other than the one in the URL.

// ============================================================================
// SECTION: Imports
// ============================================================================

use opsgate_core::Principal;
use opsgate_core::WorkspaceId;

use crate::problem::ApiError;


// ============================================================================
// SECTION: Scope Checks
// ============================================================================

/// Checks the principal's tenant against the path workspace.
///
/// # Errors
///
/// Returns the uniform forbidden response on any mismatch.
pub fn check_scope(principal: &Principal, path_workspace: &WorkspaceId) -> Result<(), ApiError> {
    if &principal.tenant_id == path_workspace {
        return Ok(());
    }
    Err(ApiError::access_denied())
}

/// Checks a body-declared workspace against the path workspace.
///
/// # Errors
///
/// Returns the uniform forbidden response when the body names a different
/// workspace than the URL.
pub fn check_body_workspace(
    path_workspace: &WorkspaceId,
    body_workspace: &WorkspaceId,
) -> Result<(), ApiError> {
    if body_workspace == path_workspace {
        return Ok(());
    }
    Err(ApiError::access_denied())
}
