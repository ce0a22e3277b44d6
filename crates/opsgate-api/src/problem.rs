// crates/opsgate-api/src/problem.rs
// ============================================================================
// Module: Problem Responder
// Description: RFC 9457 problem documents for every non-2xx response.
// Purpose: Give all errors one wire shape with a dedicated content type.
// Dependencies: axum, opsgate-core, serde, thiserror
// ============================================================================

//! ## Overview
//! Every non-2xx response in the control plane renders through [`ApiError`]
//! as an `application/problem+json` document `{type, title, status, detail}`.
//! There is no ad hoc error body anywhere else.
//!
//! ## Invariants
//! - Scope mismatch and role denial render identically; callers cannot
//!   distinguish "wrong tenant" from "wrong role".
//! - Details never carry credential material or backend failure internals.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::Response;
use opsgate_core::EmbeddingError;
use opsgate_core::FleetStoreError;
use opsgate_core::FleetValidationError;
use opsgate_core::KnowledgeGraphError;
use opsgate_core::LimitViolation;
use opsgate_core::SemanticIndexError;
use serde::Serialize;
use thiserror::Error;


// ============================================================================
// SECTION: Problem Document
// ============================================================================

/// Content type distinguishing problem documents from success payloads.
pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// URI prefix identifying each problem kind.
const PROBLEM_TYPE_BASE: &str = "https://opsgate.dev/problems/";

/// Wire form of a problem document.
#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    /// Problem kind URI.
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable summary of the kind.
    pub title: String,
    /// HTTP status code, duplicated into the body.
    pub status: u16,
    /// Human-readable detail for this occurrence.
    pub detail: String,
}

// ============================================================================
// SECTION: Error Taxonomy
// ============================================================================

/// Request-boundary error taxonomy; each variant renders as one problem kind.
///
/// # Invariants
/// - Variants are stable; handlers construct them and never build responses
///   by hand.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Missing, malformed, or rejected credential.
    #[error("{0}")]
    Unauthorized(String),
    /// Scope mismatch or role denial; the two are indistinguishable here.
    #[error("{0}")]
    Forbidden(String),
    /// Entity absent in the requested workspace.
    #[error("{0}")]
    NotFound(String),
    /// Schema failure, limit violation, or invalid heartbeat status.
    #[error("{0}")]
    BadRequest(String),
    /// A required port was not configured in this deployment.
    #[error("{0}")]
    ServiceUnavailable(String),
    /// Unclassified port or store failure; never silently repaired.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Forbidden response used for scope mismatch and role denial alike.
    #[must_use]
    pub fn access_denied() -> Self {
        Self::Forbidden("access denied".to_string())
    }

    /// HTTP status for this error kind.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable slug identifying the problem kind in its type URI.
    #[must_use]
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not-found",
            Self::BadRequest(_) => "bad-request",
            Self::ServiceUnavailable(_) => "service-unavailable",
            Self::Internal(_) => "internal-error",
        }
    }

    /// Human-readable title for the problem kind.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "Unauthorized",
            Self::Forbidden(_) => "Forbidden",
            Self::NotFound(_) => "Not Found",
            Self::BadRequest(_) => "Bad Request",
            Self::ServiceUnavailable(_) => "Service Unavailable",
            Self::Internal(_) => "Internal Server Error",
        }
    }

    /// Builds the wire problem document for this error.
    #[must_use]
    pub fn to_problem(&self) -> Problem {
        Problem {
            kind: format!("{PROBLEM_TYPE_BASE}{}", self.slug()),
            title: self.title().to_string(),
            status: self.status().as_u16(),
            detail: self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(self.to_problem())).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(PROBLEM_CONTENT_TYPE),
        );
        response
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

impl From<LimitViolation> for ApiError {
    fn from(violation: LimitViolation) -> Self {
        Self::BadRequest(violation.to_string())
    }
}

impl From<FleetValidationError> for ApiError {
    fn from(error: FleetValidationError) -> Self {
        Self::BadRequest(error.to_string())
    }
}

impl From<FleetStoreError> for ApiError {
    fn from(error: FleetStoreError) -> Self {
        match error {
            // The taxonomy has no conflict kind; a duplicate registration is
            // a caller mistake and renders as a schema-level rejection.
            FleetStoreError::Conflict { .. } => Self::BadRequest(error.to_string()),
            FleetStoreError::Backend { .. } => {
                Self::Internal("fleet store failure".to_string())
            }
        }
    }
}

impl From<SemanticIndexError> for ApiError {
    fn from(_: SemanticIndexError) -> Self {
        Self::Internal("semantic index failure".to_string())
    }
}

impl From<KnowledgeGraphError> for ApiError {
    fn from(_: KnowledgeGraphError) -> Self {
        Self::Internal("knowledge graph failure".to_string())
    }
}

impl From<EmbeddingError> for ApiError {
    fn from(_: EmbeddingError) -> Self {
        Self::Internal("embedding failure".to_string())
    }
}
