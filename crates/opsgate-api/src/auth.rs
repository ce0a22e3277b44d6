// crates/opsgate-api/src/auth.rs
// ============================================================================
// Module: Principal Resolver
// Description: Bearer credential parsing and token-to-principal resolution.
// Purpose: Authenticate every request before any other component runs.
// Dependencies: opsgate-core, opsgate-config, async-trait, axum
// ============================================================================

//! ## Overview
//! Authentication is a single seam: extract the bearer credential from the
//! authorization header, resolve it through a [`PrincipalResolver`], and
//! hand the resulting [`Principal`] to the scope guard and role authorizer.
//! No component downstream of this module re-validates the credential.
//!
//! ## Invariants
//! - Credential parsing is strict: exactly one `Bearer ` prefix followed by
//!   a non-empty token with no surrounding whitespace.
//! - Resolution failure and absence render identically as unauthorized;
//!   the response never says which token was wrong.
//!
//! Security posture: tokens never appear in errors, audit events, or logs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::http::header;
use opsgate_config::AuthConfig;
use opsgate_core::CorrelationId;
use opsgate_core::Principal;
use opsgate_core::Role;
use opsgate_core::UserId;
use opsgate_core::WorkspaceId;

use crate::problem::ApiError;


// ============================================================================
// SECTION: Credential Parsing
// ============================================================================

/// Scheme prefix required on the authorization header.
const BEARER_PREFIX: &str = "Bearer ";

/// Header carrying a caller-supplied correlation identifier.
const CORRELATION_HEADER: &str = "x-correlation-id";

/// Extracts the bearer token from the authorization header.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] when the header is missing, is not
/// valid UTF-8, lacks the `Bearer ` prefix, or carries an empty or
/// whitespace-bearing token.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let raw = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing bearer credential".to_string()))?;
    let token = raw
        .strip_prefix(BEARER_PREFIX)
        .ok_or_else(|| ApiError::Unauthorized("malformed bearer credential".to_string()))?;
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return Err(ApiError::Unauthorized(
            "malformed bearer credential".to_string(),
        ));
    }
    Ok(token)
}

/// Returns the caller-supplied correlation id, when one is present and
/// non-empty.
#[must_use]
pub fn correlation_from_headers(headers: &HeaderMap) -> Option<CorrelationId> {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(CorrelationId::new)
}

// ============================================================================
// SECTION: Resolver Seam
// ============================================================================

/// Token-to-principal resolution seam.
///
/// # Invariants
/// - Resolution is read-only; implementations must not mutate state.
/// - `None` means the token is unknown; the caller renders unauthorized
///   without further detail.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    /// Resolves a bearer token to the principal it identifies.
    async fn resolve(&self, token: &str, correlation_id: CorrelationId) -> Option<Principal>;
}

// ============================================================================
// SECTION: Static Token Resolver
// ============================================================================

/// Identity a configured token resolves to.
#[derive(Debug, Clone)]
struct PrincipalSeed {
    /// Workspace the token is scoped to.
    workspace_id: WorkspaceId,
    /// User the token identifies.
    user_id: UserId,
    /// Roles granted to the user.
    roles: Vec<Role>,
}

/// [`PrincipalResolver`] backed by the static token table in the
/// deployment configuration.
#[derive(Debug, Default)]
pub struct StaticTokenResolver {
    /// Configured identities keyed by token.
    table: HashMap<String, PrincipalSeed>,
}

impl StaticTokenResolver {
    /// Builds the resolver from validated auth configuration.
    #[must_use]
    pub fn from_config(auth: &AuthConfig) -> Self {
        let table = auth
            .principals
            .iter()
            .map(|principal| {
                (
                    principal.token.clone(),
                    PrincipalSeed {
                        workspace_id: WorkspaceId::new(principal.workspace_id.clone()),
                        user_id: UserId::new(principal.user_id.clone()),
                        roles: principal.roles.clone(),
                    },
                )
            })
            .collect();
        Self { table }
    }
}

#[async_trait]
impl PrincipalResolver for StaticTokenResolver {
    async fn resolve(&self, token: &str, correlation_id: CorrelationId) -> Option<Principal> {
        let seed = self.table.get(token)?;
        Some(Principal {
            tenant_id: seed.workspace_id.clone(),
            user_id: seed.user_id.clone(),
            roles: seed.roles.iter().copied().collect(),
            correlation_id,
        })
    }
}

// ============================================================================
// SECTION: Correlation Ids
// ============================================================================

/// Process-wide counter backing generated correlation ids.
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Returns the caller's correlation id, or generates a fresh one.
#[must_use]
pub fn request_correlation(headers: &HeaderMap) -> CorrelationId {
    correlation_from_headers(headers).unwrap_or_else(|| {
        let serial = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed);
        CorrelationId::new(format!("req-{serial}"))
    })
}
