// crates/opsgate-core/src/core/principal.rs
// ============================================================================
// Module: Principal and Role Policy
// Description: Authenticated principal, role vocabulary, and action policy table.
// Purpose: Decide allow/deny for every control-plane action by role.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! A [`Principal`] is produced per-request by the principal resolver and
//! never persisted. The role policy is an explicit table ([`role_allows`])
//! rather than ad hoc boolean checks, so it is testable in isolation from
//! HTTP plumbing.
//!
//! ## Invariants
//! - Policy decisions are deterministic for identical inputs.
//! - `auditor` is denied every mutating action.
//! - Role denial and scope mismatch render identically to callers; this
//!   module only decides, it never reports why.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::CorrelationId;
use crate::core::identifiers::UserId;
use crate::core::identifiers::WorkspaceId;

// ============================================================================
// SECTION: Roles
// ============================================================================

/// Role assigned to an authenticated principal.
///
/// # Invariants
/// - Variants are stable for configuration and audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control of workspace resources.
    Admin,
    /// Day-to-day fleet operation, including registration.
    Operator,
    /// Approval decision-making; read-only within this core.
    Approver,
    /// Read-only audit access; denied every mutating action.
    Auditor,
}

impl Role {
    /// Returns a stable label for the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Operator => "operator",
            Self::Approver => "approver",
            Self::Auditor => "auditor",
        }
    }

    /// Parses a role from its stable label.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "admin" => Some(Self::Admin),
            "operator" => Some(Self::Operator),
            "approver" => Some(Self::Approver),
            "auditor" => Some(Self::Auditor),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Control-plane action gated by the role policy.
///
/// # Invariants
/// - Variants are stable for audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Register a machine into the fleet registry.
    RegisterMachine,
    /// Create an agent configuration.
    CreateAgent,
    /// Read fleet registry records (machines, agents, work items).
    ReadFleet,
    /// Execute retrieval or graph queries.
    ReadRetrieval,
    /// Report machine or agent liveness.
    Heartbeat,
}

impl Action {
    /// Returns a stable label for the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RegisterMachine => "register-machine",
            Self::CreateAgent => "create-agent",
            Self::ReadFleet => "read-fleet",
            Self::ReadRetrieval => "read-retrieval",
            Self::Heartbeat => "heartbeat",
        }
    }
}

// ============================================================================
// SECTION: Policy Table
// ============================================================================

/// Returns whether a single role permits an action.
///
/// Heartbeats are permitted for every role: liveness reporting is not an
/// operator privilege, and the workspace scope guard has already run.
#[must_use]
pub const fn role_allows(role: Role, action: Action) -> bool {
    match action {
        Action::RegisterMachine | Action::CreateAgent => {
            matches!(role, Role::Admin | Role::Operator)
        }
        Action::ReadFleet | Action::ReadRetrieval | Action::Heartbeat => true,
    }
}

/// Returns whether any of the principal's roles permits the action.
///
/// An empty role set denies everything (fail closed).
#[must_use]
pub fn is_allowed(roles: &BTreeSet<Role>, action: Action) -> bool {
    roles.iter().any(|role| role_allows(*role, action))
}

// ============================================================================
// SECTION: Principal
// ============================================================================

/// Authenticated identity derived from a request's bearer credential.
///
/// # Invariants
/// - Produced per-request by the principal resolver; never persisted.
/// - `tenant_id` is the only workspace this principal may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Tenant (workspace) the credential is scoped to.
    pub tenant_id: WorkspaceId,
    /// User the credential identifies.
    pub user_id: UserId,
    /// Roles granted to the user.
    pub roles: BTreeSet<Role>,
    /// Correlation identifier for audit trails.
    pub correlation_id: CorrelationId,
}

impl Principal {
    /// Returns whether this principal's roles permit the action.
    #[must_use]
    pub fn may(&self, action: Action) -> bool {
        is_allowed(&self.roles, action)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
