// crates/opsgate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Port Interfaces
// Description: Backend-agnostic traits for fleet storage, retrieval, and time.
// Purpose: Keep the control plane independent of storage and model backends.
// Dependencies: crate::core, async-trait, thiserror, time
// ============================================================================

//! ## Overview
//! Ports are the seams between the control plane and its collaborators: the
//! fleet registry store, the semantic index, the knowledge graph, the
//! embedding model, and the wall clock. Handlers depend only on these traits;
//! deployments inject implementations at assembly time, and an absent port
//! renders as service-unavailable rather than a crash.
//!
//! ## Invariants
//! - Port results are untrusted: the security filter re-applies tenant
//!   scoping to everything the retrieval ports return.
//! - Each port owns its error type; the request boundary maps all of them
//!   to generic failures without inventing fallbacks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::fleet::AgentConfig;
use crate::core::fleet::AgentFilter;
use crate::core::fleet::HeartbeatKind;
use crate::core::fleet::HeartbeatRecord;
use crate::core::fleet::MachineRegistration;
use crate::core::fleet::Page;
use crate::core::fleet::PageRequest;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::MachineId;
use crate::core::identifiers::WorkspaceId;
use crate::core::retrieval::GraphTraversal;
use crate::core::retrieval::GraphTraversalParams;
use crate::core::retrieval::RetrievalHit;
use crate::core::retrieval::SemanticQuery;

// ============================================================================
// SECTION: Fleet Store
// ============================================================================

/// Fleet store failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling at the request boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetStoreError {
    /// A record with the same identity already exists in the workspace.
    #[error("{entity} {id} is already registered in this workspace")]
    Conflict {
        /// Entity kind label (`machine` or `agent`).
        entity: &'static str,
        /// The conflicting identifier.
        id: String,
    },
    /// The backing store failed.
    #[error("fleet store failure: {detail}")]
    Backend {
        /// Backend failure detail; safe for logs, not for responses.
        detail: String,
    },
}

/// Persistence port for machine registrations, agent configurations, and
/// heartbeat liveness.
///
/// # Invariants
/// - Identity is `(workspace, id)`; implementations never return a record
///   from a different workspace than the one queried.
/// - Heartbeat writes are last-write-wins; concurrent writers race and the
///   final state is whichever write the store observes last.
#[async_trait]
pub trait FleetStore: Send + Sync {
    /// Persists a machine registration.
    ///
    /// # Errors
    ///
    /// Returns [`FleetStoreError::Conflict`] when the machine id is already
    /// registered in the workspace, [`FleetStoreError::Backend`] on store
    /// failure.
    async fn save_machine(&self, machine: MachineRegistration) -> Result<(), FleetStoreError>;

    /// Loads one machine registration from the workspace.
    ///
    /// # Errors
    ///
    /// Returns [`FleetStoreError::Backend`] on store failure.
    async fn machine(
        &self,
        workspace_id: &WorkspaceId,
        machine_id: &MachineId,
    ) -> Result<Option<MachineRegistration>, FleetStoreError>;

    /// Lists machine registrations in the workspace, cursor-paginated.
    ///
    /// # Errors
    ///
    /// Returns [`FleetStoreError::Backend`] on store failure.
    async fn list_machines(
        &self,
        workspace_id: &WorkspaceId,
        page: &PageRequest,
    ) -> Result<Page<MachineRegistration>, FleetStoreError>;

    /// Persists an agent configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FleetStoreError::Conflict`] when the agent id is already
    /// registered in the workspace, [`FleetStoreError::Backend`] on store
    /// failure.
    async fn save_agent(&self, agent: AgentConfig) -> Result<(), FleetStoreError>;

    /// Loads one agent configuration from the workspace.
    ///
    /// # Errors
    ///
    /// Returns [`FleetStoreError::Backend`] on store failure.
    async fn agent(
        &self,
        workspace_id: &WorkspaceId,
        agent_id: &AgentId,
    ) -> Result<Option<AgentConfig>, FleetStoreError>;

    /// Lists agent configurations in the workspace, cursor-paginated.
    ///
    /// A `filter.machine_id` of `None` means no machine filter at all; it is
    /// never interpreted as "agents without a machine".
    ///
    /// # Errors
    ///
    /// Returns [`FleetStoreError::Backend`] on store failure.
    async fn list_agents(
        &self,
        workspace_id: &WorkspaceId,
        filter: &AgentFilter,
        page: &PageRequest,
    ) -> Result<Page<AgentConfig>, FleetStoreError>;

    /// Upserts liveness state for a machine or agent, last write wins.
    ///
    /// # Errors
    ///
    /// Returns [`FleetStoreError::Backend`] on store failure.
    async fn record_heartbeat(
        &self,
        kind: HeartbeatKind,
        workspace_id: &WorkspaceId,
        entity_id: &str,
        record: HeartbeatRecord,
    ) -> Result<(), FleetStoreError>;

    /// Loads the last recorded liveness state for a machine or agent.
    ///
    /// # Errors
    ///
    /// Returns [`FleetStoreError::Backend`] on store failure.
    async fn heartbeat(
        &self,
        kind: HeartbeatKind,
        workspace_id: &WorkspaceId,
        entity_id: &str,
    ) -> Result<Option<HeartbeatRecord>, FleetStoreError>;
}

// ============================================================================
// SECTION: Retrieval Ports
// ============================================================================

/// Semantic index failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticIndexError {
    /// The index backend failed.
    #[error("semantic index failure: {detail}")]
    Backend {
        /// Backend failure detail; safe for logs, not for responses.
        detail: String,
    },
}

/// Similarity-search port over an external semantic index.
///
/// # Invariants
/// - Implementations are documented to filter by workspace, but callers
///   re-apply tenant filtering to every result regardless.
#[async_trait]
pub trait SemanticIndexPort: Send + Sync {
    /// Runs a similarity search scoped to the workspace.
    ///
    /// # Errors
    ///
    /// Returns [`SemanticIndexError::Backend`] on index failure.
    async fn search(
        &self,
        workspace_id: &WorkspaceId,
        query: &SemanticQuery,
    ) -> Result<Vec<RetrievalHit>, SemanticIndexError>;
}

/// Knowledge graph failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KnowledgeGraphError {
    /// The graph backend failed.
    #[error("knowledge graph failure: {detail}")]
    Backend {
        /// Backend failure detail; safe for logs, not for responses.
        detail: String,
    },
}

/// Bounded-traversal port over an external knowledge graph.
///
/// # Invariants
/// - Implementations are documented to filter by workspace, but callers
///   re-apply tenant filtering to every returned node and edge regardless.
#[async_trait]
pub trait KnowledgeGraphPort: Send + Sync {
    /// Runs a bounded traversal from the given root.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeGraphError::Backend`] on graph failure.
    async fn traverse(
        &self,
        params: &GraphTraversalParams,
    ) -> Result<GraphTraversal, KnowledgeGraphError>;
}

/// Embedding model failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbeddingError {
    /// The embedding backend failed.
    #[error("embedding failure: {detail}")]
    Backend {
        /// Backend failure detail; safe for logs, not for responses.
        detail: String,
    },
}

/// Dense query embedding produced by the embedding port.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector(pub Vec<f32>);

/// Text-embedding port over an external model.
#[async_trait]
pub trait EmbeddingPort: Send + Sync {
    /// Embeds query text into a dense vector.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::Backend`] on model failure.
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Fallback timestamp used only when RFC 3339 formatting itself fails,
/// which cannot happen for `OffsetDateTime` values but keeps the interface
/// infallible.
const UNIX_EPOCH_ISO: &str = "1970-01-01T00:00:00Z";

/// Wall-clock port; handlers never read system time directly.
pub trait Clock: Send + Sync {
    /// Returns the current instant as an RFC 3339 timestamp.
    fn now_iso(&self) -> String;
}

/// Production clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_iso(&self) -> String {
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| UNIX_EPOCH_ISO.to_string())
    }
}
