// crates/opsgate-api/src/lib.rs
// ============================================================================
// Module: OpsGate API
// Description: HTTP control-plane surface over the OpsGate core and ports.
// Purpose: Gate, route, and render every tenant-scoped control-plane request.
// Dependencies: opsgate-core, opsgate-config, axum, serde_json, tokio
// ============================================================================

//! ## Overview
//! `opsgate-api` is the HTTP surface of the control plane: the principal
//! resolver, the workspace scope guard, the role authorizer, the problem
//! responder, and the fleet and retrieval routes. Handlers orchestrate the
//! injected ports from [`opsgate_core`]; an absent port renders as
//! service-unavailable, never a crash.
//!
//! ## Layer Responsibilities
//! - Run the gate sequence (port presence, authentication, scope, role)
//!   before any body parsing or store access.
//! - Render every non-2xx response through the problem responder.
//! - Strip credential material via the core's view projections.
//!
//! Security posture: requests are adversarial until the gate sequence has
//! passed; store results are adversarial even after it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod problem;
pub mod routes;
pub mod scope;
pub mod server;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use opsgate_config::OpsGateConfig;
use opsgate_core::Clock;
use opsgate_core::EmbeddingPort;
use opsgate_core::FleetStore;
use opsgate_core::HeartbeatStatusSet;
use opsgate_core::KnowledgeGraphPort;
use opsgate_core::RetrievalLimits;
use opsgate_core::SemanticIndexPort;
use opsgate_core::SystemClock;

use crate::audit::NoopAuditSink;
use crate::audit::SecurityAuditSink;
use crate::auth::PrincipalResolver;
use crate::auth::StaticTokenResolver;
use crate::problem::ApiError;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use problem::PROBLEM_CONTENT_TYPE;
pub use problem::Problem;
pub use routes::router;

// ============================================================================
// SECTION: Application State
// ============================================================================

/// Shared per-deployment state handed to every handler.
///
/// # Invariants
/// - Ports are optional by design: a deployment without a fleet store or
///   retrieval backend serves problem documents, not panics.
#[derive(Clone)]
pub struct AppState {
    /// Token-to-principal resolution seam.
    pub resolver: Arc<dyn PrincipalResolver>,
    /// Sink for security-relevant decisions.
    pub audit: Arc<dyn SecurityAuditSink>,
    /// Wall-clock seam; handlers never read system time directly.
    pub clock: Arc<dyn Clock>,
    /// Retrieval input limits enforced before any port call.
    pub limits: RetrievalLimits,
    /// Heartbeat status vocabulary accepted by this deployment.
    pub heartbeat_statuses: HeartbeatStatusSet,
    /// Fleet registry store, when configured.
    pub fleet: Option<Arc<dyn FleetStore>>,
    /// Semantic index, when configured.
    pub semantic: Option<Arc<dyn SemanticIndexPort>>,
    /// Knowledge graph, when configured.
    pub graph: Option<Arc<dyn KnowledgeGraphPort>>,
    /// Embedding model, when configured.
    pub embedding: Option<Arc<dyn EmbeddingPort>>,
}

impl AppState {
    /// Builds state from validated configuration with no ports wired.
    ///
    /// The resolver is the static token table, auditing is a no-op, and the
    /// clock is the system wall clock; ports attach via the `with_` methods.
    #[must_use]
    pub fn from_config(config: &OpsGateConfig) -> Self {
        Self {
            resolver: Arc::new(StaticTokenResolver::from_config(&config.auth)),
            audit: Arc::new(NoopAuditSink),
            clock: Arc::new(SystemClock),
            limits: config.retrieval_limits(),
            heartbeat_statuses: config.heartbeat_statuses(),
            fleet: None,
            semantic: None,
            graph: None,
            embedding: None,
        }
    }

    /// Attaches the fleet registry store.
    #[must_use]
    pub fn with_fleet(mut self, fleet: Arc<dyn FleetStore>) -> Self {
        self.fleet = Some(fleet);
        self
    }

    /// Attaches the semantic index and its embedding model.
    #[must_use]
    pub fn with_semantic(
        mut self,
        semantic: Arc<dyn SemanticIndexPort>,
        embedding: Arc<dyn EmbeddingPort>,
    ) -> Self {
        self.semantic = Some(semantic);
        self.embedding = Some(embedding);
        self
    }

    /// Attaches the knowledge graph.
    #[must_use]
    pub fn with_graph(mut self, graph: Arc<dyn KnowledgeGraphPort>) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn SecurityAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the fleet store, or the service-unavailable problem.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ServiceUnavailable`] when no store is wired.
    pub fn fleet_port(&self) -> Result<&Arc<dyn FleetStore>, ApiError> {
        self.fleet
            .as_ref()
            .ok_or_else(|| ApiError::ServiceUnavailable("fleet registry not configured".to_string()))
    }

    /// Returns the semantic index, or the service-unavailable problem.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ServiceUnavailable`] when no index is wired.
    pub fn semantic_port(&self) -> Result<&Arc<dyn SemanticIndexPort>, ApiError> {
        self.semantic
            .as_ref()
            .ok_or_else(|| ApiError::ServiceUnavailable("semantic index not configured".to_string()))
    }

    /// Returns the knowledge graph, or the service-unavailable problem.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ServiceUnavailable`] when no graph is wired.
    pub fn graph_port(&self) -> Result<&Arc<dyn KnowledgeGraphPort>, ApiError> {
        self.graph
            .as_ref()
            .ok_or_else(|| ApiError::ServiceUnavailable("knowledge graph not configured".to_string()))
    }

    /// Returns the embedding model, or the service-unavailable problem.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ServiceUnavailable`] when no model is wired.
    pub fn embedding_port(&self) -> Result<&Arc<dyn EmbeddingPort>, ApiError> {
        self.embedding
            .as_ref()
            .ok_or_else(|| ApiError::ServiceUnavailable("embedding model not configured".to_string()))
    }
}
