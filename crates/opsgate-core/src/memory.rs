// crates/opsgate-core/src/memory.rs
// ============================================================================
// Module: In-Memory Port Implementations
// Description: Map-backed fleet store plus fixture retrieval and clock ports.
// Purpose: Provide deterministic port implementations for tests and demos.
// Dependencies: crate::core, crate::interfaces, async-trait
// ============================================================================

//! ## Overview
//! The in-memory fleet store is the reference [`FleetStore`] implementation:
//! correct identity, conflict, and pagination semantics over a plain map.
//! The fixture retrieval ports return pre-seeded results verbatim, with no
//! tenant scoping of their own, so callers exercising them must rely on the
//! security filter the way they would with a buggy production store.
//!
//! ## Invariants
//! - Fleet records are keyed by `(workspace, id)`; cross-workspace reads
//!   are impossible by construction.
//! - List cursors are the last returned id; resumption is strictly after.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

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
use crate::interfaces::Clock;
use crate::interfaces::EmbeddingError;
use crate::interfaces::EmbeddingPort;
use crate::interfaces::EmbeddingVector;
use crate::interfaces::FleetStore;
use crate::interfaces::FleetStoreError;
use crate::interfaces::KnowledgeGraphError;
use crate::interfaces::KnowledgeGraphPort;
use crate::interfaces::SemanticIndexError;
use crate::interfaces::SemanticIndexPort;

// ============================================================================
// SECTION: In-Memory Fleet Store
// ============================================================================

/// Items returned per page when the caller does not set a limit.
const DEFAULT_PAGE_LIMIT: usize = 50;

/// Map key scoping every record to its workspace.
type ScopedKey = (String, String);

/// Mutable store state behind one lock; operations are short and never
/// hold the lock across an await point.
#[derive(Debug, Default)]
struct FleetState {
    /// Machine registrations keyed by `(workspace, machineId)`.
    machines: BTreeMap<ScopedKey, MachineRegistration>,
    /// Agent configurations keyed by `(workspace, agentId)`.
    agents: BTreeMap<ScopedKey, AgentConfig>,
    /// Liveness records keyed by `(kind, workspace, entityId)`.
    heartbeats: BTreeMap<(HeartbeatKind, String, String), HeartbeatRecord>,
}

/// Map-backed [`FleetStore`] with last-id cursor pagination.
#[derive(Debug, Default)]
pub struct InMemoryFleetStore {
    /// All fleet state behind one short-lived lock.
    state: Mutex<FleetState>,
}

impl InMemoryFleetStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the state, mapping lock poisoning to a backend failure.
    fn locked(&self) -> Result<std::sync::MutexGuard<'_, FleetState>, FleetStoreError> {
        self.state.lock().map_err(|_| FleetStoreError::Backend {
            detail: "fleet store lock poisoned".to_string(),
        })
    }
}

/// Slices one page out of an ordered sequence of `(id, record)` pairs,
/// resuming strictly after the cursor when one is given.
fn paginate<T>(records: Vec<(String, T)>, page: &PageRequest) -> Page<T> {
    let limit = page.limit.unwrap_or(DEFAULT_PAGE_LIMIT).max(1);
    let start = match &page.cursor {
        Some(cursor) => records
            .iter()
            .position(|(id, _)| id == cursor)
            .map_or(0, |found| found + 1),
        None => 0,
    };
    let total = records.len();
    let mut items = Vec::new();
    let mut last_id = None;
    for (id, record) in records.into_iter().skip(start).take(limit) {
        last_id = Some(id);
        items.push(record);
    }
    let next_cursor = if start + items.len() < total {
        last_id
    } else {
        None
    };
    Page { items, next_cursor }
}

#[async_trait]
impl FleetStore for InMemoryFleetStore {
    async fn save_machine(&self, machine: MachineRegistration) -> Result<(), FleetStoreError> {
        let mut state = self.locked()?;
        let key = (
            machine.workspace_id.as_str().to_string(),
            machine.machine_id.as_str().to_string(),
        );
        if state.machines.contains_key(&key) {
            return Err(FleetStoreError::Conflict {
                entity: "machine",
                id: machine.machine_id.as_str().to_string(),
            });
        }
        state.machines.insert(key, machine);
        Ok(())
    }

    async fn machine(
        &self,
        workspace_id: &WorkspaceId,
        machine_id: &MachineId,
    ) -> Result<Option<MachineRegistration>, FleetStoreError> {
        let state = self.locked()?;
        let key = (
            workspace_id.as_str().to_string(),
            machine_id.as_str().to_string(),
        );
        Ok(state.machines.get(&key).cloned())
    }

    async fn list_machines(
        &self,
        workspace_id: &WorkspaceId,
        page: &PageRequest,
    ) -> Result<Page<MachineRegistration>, FleetStoreError> {
        let state = self.locked()?;
        let records: Vec<(String, MachineRegistration)> = state
            .machines
            .iter()
            .filter(|((workspace, _), _)| workspace == workspace_id.as_str())
            .map(|((_, id), record)| (id.clone(), record.clone()))
            .collect();
        Ok(paginate(records, page))
    }

    async fn save_agent(&self, agent: AgentConfig) -> Result<(), FleetStoreError> {
        let mut state = self.locked()?;
        let key = (
            agent.workspace_id.as_str().to_string(),
            agent.agent_id.as_str().to_string(),
        );
        if state.agents.contains_key(&key) {
            return Err(FleetStoreError::Conflict {
                entity: "agent",
                id: agent.agent_id.as_str().to_string(),
            });
        }
        state.agents.insert(key, agent);
        Ok(())
    }

    async fn agent(
        &self,
        workspace_id: &WorkspaceId,
        agent_id: &AgentId,
    ) -> Result<Option<AgentConfig>, FleetStoreError> {
        let state = self.locked()?;
        let key = (
            workspace_id.as_str().to_string(),
            agent_id.as_str().to_string(),
        );
        Ok(state.agents.get(&key).cloned())
    }

    async fn list_agents(
        &self,
        workspace_id: &WorkspaceId,
        filter: &AgentFilter,
        page: &PageRequest,
    ) -> Result<Page<AgentConfig>, FleetStoreError> {
        let state = self.locked()?;
        let records: Vec<(String, AgentConfig)> = state
            .agents
            .iter()
            .filter(|((workspace, _), _)| workspace == workspace_id.as_str())
            .filter(|(_, agent)| match &filter.machine_id {
                Some(machine_id) => agent.machine_id.as_ref() == Some(machine_id),
                None => true,
            })
            .map(|((_, id), record)| (id.clone(), record.clone()))
            .collect();
        Ok(paginate(records, page))
    }

    async fn record_heartbeat(
        &self,
        kind: HeartbeatKind,
        workspace_id: &WorkspaceId,
        entity_id: &str,
        record: HeartbeatRecord,
    ) -> Result<(), FleetStoreError> {
        let mut state = self.locked()?;
        let key = (
            kind,
            workspace_id.as_str().to_string(),
            entity_id.to_string(),
        );
        state.heartbeats.insert(key, record);
        Ok(())
    }

    async fn heartbeat(
        &self,
        kind: HeartbeatKind,
        workspace_id: &WorkspaceId,
        entity_id: &str,
    ) -> Result<Option<HeartbeatRecord>, FleetStoreError> {
        let state = self.locked()?;
        let key = (
            kind,
            workspace_id.as_str().to_string(),
            entity_id.to_string(),
        );
        Ok(state.heartbeats.get(&key).cloned())
    }
}

// ============================================================================
// SECTION: Fixture Retrieval Ports
// ============================================================================

/// [`SemanticIndexPort`] returning pre-seeded hits verbatim.
///
/// Deliberately applies no tenant scoping of its own, so tests exercising
/// it depend on the security filter exactly as they would with a
/// misconfigured production index.
#[derive(Debug, Default)]
pub struct FixtureSemanticIndex {
    /// Hits returned for every search.
    pub hits: Vec<RetrievalHit>,
}

#[async_trait]
impl SemanticIndexPort for FixtureSemanticIndex {
    async fn search(
        &self,
        _workspace_id: &WorkspaceId,
        query: &SemanticQuery,
    ) -> Result<Vec<RetrievalHit>, SemanticIndexError> {
        Ok(self.hits.iter().take(query.top_k).cloned().collect())
    }
}

/// [`KnowledgeGraphPort`] returning a pre-seeded traversal verbatim.
///
/// Same posture as [`FixtureSemanticIndex`]: no tenant scoping of its own.
#[derive(Debug)]
pub struct FixtureKnowledgeGraph {
    /// Traversal returned for every query.
    pub traversal: GraphTraversal,
}

#[async_trait]
impl KnowledgeGraphPort for FixtureKnowledgeGraph {
    async fn traverse(
        &self,
        _params: &GraphTraversalParams,
    ) -> Result<GraphTraversal, KnowledgeGraphError> {
        Ok(GraphTraversal {
            nodes: self.traversal.nodes.clone(),
            edges: self.traversal.edges.clone(),
        })
    }
}

/// [`EmbeddingPort`] returning a fixed vector for any text.
#[derive(Debug, Clone, Default)]
pub struct FixedEmbedding {
    /// Vector returned for every embed call.
    pub vector: Vec<f32>,
}

#[async_trait]
impl EmbeddingPort for FixedEmbedding {
    async fn embed(&self, _text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        Ok(EmbeddingVector(self.vector.clone()))
    }
}

// ============================================================================
// SECTION: Fixed Clock
// ============================================================================

/// [`Clock`] returning a fixed timestamp, for deterministic tests.
#[derive(Debug, Clone)]
pub struct FixedClock {
    /// Timestamp returned by every `now_iso` call.
    pub iso: String,
}

impl FixedClock {
    /// Creates a clock pinned to the given RFC 3339 timestamp.
    #[must_use]
    pub fn new(iso: impl Into<String>) -> Self {
        Self { iso: iso.into() }
    }
}

impl Clock for FixedClock {
    fn now_iso(&self) -> String {
        self.iso.clone()
    }
}
