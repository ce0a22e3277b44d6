// crates/opsgate-core/src/lib.rs
// ============================================================================
// Module: OpsGate Core
// Description: Domain model, role policy, retrieval security filter, and ports.
// Purpose: Provide the tenant-isolation primitives shared by every OpsGate layer.
// Dependencies: serde, serde_json, thiserror, async-trait, time, url
// ============================================================================

//! ## Overview
//! `opsgate-core` defines the control-plane domain: workspace-scoped
//! identifiers, the per-request [`Principal`], the fleet registry records
//! (machines, agents, heartbeats), the retrieval result records, and the
//! security filter that validates input limits, redacts secrets, and
//! re-applies tenant scoping to store results.
//!
//! ## Layer Responsibilities
//! - Model every tenant-scoped entity with an explicit workspace identifier.
//! - Keep authorization decisions and redaction logic pure and testable.
//! - Define backend-agnostic port traits; never embed store specifics.
//!
//! ## Invariants
//! - No handler may return an entity whose workspace differs from the
//!   requesting principal's tenant.
//! - Machine credential material ([`MachineAuthConfig`]) is never
//!   serializable; public views omit it structurally.
//!
//! Security posture: every input crossing this crate's boundary is treated
//! as adversarial, including results returned by the injected store ports.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod memory;
pub mod security;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use self::core::fleet::AgentConfig;
pub use self::core::fleet::AgentFilter;
pub use self::core::fleet::AgentView;
pub use self::core::fleet::Capability;
pub use self::core::fleet::ExecutionPolicy;
pub use self::core::fleet::FleetValidationError;
pub use self::core::fleet::GeoPoint;
pub use self::core::fleet::HeartbeatKind;
pub use self::core::fleet::HeartbeatRecord;
pub use self::core::fleet::HeartbeatRequest;
pub use self::core::fleet::HeartbeatStatusSet;
pub use self::core::fleet::MachineAuthConfig;
pub use self::core::fleet::MachineAuthKind;
pub use self::core::fleet::MachineRegistration;
pub use self::core::fleet::MachineView;
pub use self::core::fleet::Page;
pub use self::core::fleet::PageRequest;
pub use self::core::identifiers::AgentId;
pub use self::core::identifiers::ArtifactId;
pub use self::core::identifiers::CapabilityKey;
pub use self::core::identifiers::CorrelationId;
pub use self::core::identifiers::EdgeId;
pub use self::core::identifiers::MachineId;
pub use self::core::identifiers::NodeId;
pub use self::core::identifiers::PolicyTier;
pub use self::core::identifiers::RunId;
pub use self::core::identifiers::UserId;
pub use self::core::identifiers::WorkspaceId;
pub use self::core::principal::Action;
pub use self::core::principal::Principal;
pub use self::core::principal::Role;
pub use self::core::principal::is_allowed;
pub use self::core::principal::role_allows;
pub use self::core::retrieval::GraphEdge;
pub use self::core::retrieval::GraphNode;
pub use self::core::retrieval::GraphTraversal;
pub use self::core::retrieval::GraphTraversalParams;
pub use self::core::retrieval::Provenance;
pub use self::core::retrieval::RetrievalHit;
pub use self::core::retrieval::SemanticQuery;
pub use self::core::retrieval::TraversalDirection;
pub use interfaces::Clock;
pub use interfaces::EmbeddingError;
pub use interfaces::EmbeddingPort;
pub use interfaces::EmbeddingVector;
pub use interfaces::FleetStore;
pub use interfaces::FleetStoreError;
pub use interfaces::KnowledgeGraphError;
pub use interfaces::KnowledgeGraphPort;
pub use interfaces::SemanticIndexError;
pub use interfaces::SemanticIndexPort;
pub use interfaces::SystemClock;
pub use memory::FixedClock;
pub use memory::FixedEmbedding;
pub use memory::FixtureKnowledgeGraph;
pub use memory::FixtureSemanticIndex;
pub use memory::InMemoryFleetStore;
pub use security::LimitViolation;
pub use security::REDACTION_MARKER;
pub use security::RetrievalLimits;
pub use security::filter_edges_to_workspace;
pub use security::filter_hits_to_workspace;
pub use security::filter_nodes_to_workspace;
pub use security::is_sensitive_key;
pub use security::redact_edges;
pub use security::redact_hits;
pub use security::redact_nodes;
pub use security::redact_text;
