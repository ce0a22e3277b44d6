// crates/opsgate-core/tests/fleet_store.rs
// ============================================================================
// Module: In-Memory Fleet Store Tests
// Description: Identity, conflict, pagination, and heartbeat semantics.
// Purpose: Pin the reference store behavior other implementations must match.
// ============================================================================

//! Integration tests for the in-memory fleet store.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers are permitted."
)]

use opsgate_core::AgentConfig;
use opsgate_core::AgentFilter;
use opsgate_core::AgentId;
use opsgate_core::Capability;
use opsgate_core::CapabilityKey;
use opsgate_core::ExecutionPolicy;
use opsgate_core::FleetStore;
use opsgate_core::FleetStoreError;
use opsgate_core::HeartbeatKind;
use opsgate_core::HeartbeatRecord;
use opsgate_core::InMemoryFleetStore;
use opsgate_core::MachineId;
use opsgate_core::MachineRegistration;
use opsgate_core::PageRequest;
use opsgate_core::PolicyTier;
use opsgate_core::WorkspaceId;

fn machine(workspace: &str, id: &str) -> MachineRegistration {
    MachineRegistration {
        machine_id: MachineId::new(id),
        workspace_id: WorkspaceId::new(workspace),
        endpoint_url: "https://edge.example.com".to_string(),
        active: true,
        display_name: format!("Machine {id}"),
        capabilities: vec![Capability {
            capability: CapabilityKey::new("robotics:move"),
        }],
        registered_at_iso: "2026-08-01T12:00:00Z".to_string(),
        execution_policy: ExecutionPolicy {
            isolation_mode: "PerTenantWorker".to_string(),
            egress_allowlist: vec![],
            workload_identity: "Required".to_string(),
        },
        auth_config: None,
    }
}

fn agent(workspace: &str, id: &str, machine: Option<&str>) -> AgentConfig {
    AgentConfig {
        agent_id: AgentId::new(id),
        workspace_id: WorkspaceId::new(workspace),
        machine_id: machine.map(MachineId::new),
        display_name: format!("Agent {id}"),
        capabilities: vec![],
        policy_tier: PolicyTier::new("Auto"),
        allowed_tools: vec![],
        registered_at_iso: "2026-08-01T12:00:00Z".to_string(),
    }
}

#[tokio::test]
async fn duplicate_machine_registration_conflicts() {
    let store = InMemoryFleetStore::new();
    store.save_machine(machine("ws-1", "m-1")).await.unwrap();
    let err = store.save_machine(machine("ws-1", "m-1")).await.unwrap_err();
    assert_eq!(
        err,
        FleetStoreError::Conflict {
            entity: "machine",
            id: "m-1".to_string(),
        }
    );
}

#[tokio::test]
async fn same_id_in_another_workspace_is_not_a_conflict() {
    let store = InMemoryFleetStore::new();
    store.save_machine(machine("ws-1", "m-1")).await.unwrap();
    store.save_machine(machine("ws-2", "m-1")).await.unwrap();

    let found = store
        .machine(&WorkspaceId::new("ws-2"), &MachineId::new("m-1"))
        .await
        .unwrap();
    assert_eq!(found.unwrap().workspace_id.as_str(), "ws-2");
}

#[tokio::test]
async fn machine_reads_are_workspace_scoped() {
    let store = InMemoryFleetStore::new();
    store.save_machine(machine("ws-1", "m-1")).await.unwrap();

    let missing = store
        .machine(&WorkspaceId::new("ws-2"), &MachineId::new("m-1"))
        .await
        .unwrap();
    assert!(missing.is_none());

    let listed = store
        .list_machines(&WorkspaceId::new("ws-2"), &PageRequest::default())
        .await
        .unwrap();
    assert!(listed.items.is_empty());
    assert!(listed.next_cursor.is_none());
}

#[tokio::test]
async fn machine_listing_pages_with_last_id_cursor() {
    let store = InMemoryFleetStore::new();
    for id in ["m-1", "m-2", "m-3", "m-4", "m-5"] {
        store.save_machine(machine("ws-1", id)).await.unwrap();
    }

    let workspace = WorkspaceId::new("ws-1");
    let first = store
        .list_machines(
            &workspace,
            &PageRequest {
                cursor: None,
                limit: Some(2),
            },
        )
        .await
        .unwrap();
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.next_cursor.as_deref(), Some("m-2"));

    let second = store
        .list_machines(
            &workspace,
            &PageRequest {
                cursor: first.next_cursor,
                limit: Some(2),
            },
        )
        .await
        .unwrap();
    assert_eq!(second.items[0].machine_id.as_str(), "m-3");
    assert_eq!(second.next_cursor.as_deref(), Some("m-4"));

    let last = store
        .list_machines(
            &workspace,
            &PageRequest {
                cursor: second.next_cursor,
                limit: Some(2),
            },
        )
        .await
        .unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].machine_id.as_str(), "m-5");
    assert!(last.next_cursor.is_none());
}

#[tokio::test]
async fn agent_listing_respects_the_machine_filter() {
    let store = InMemoryFleetStore::new();
    store
        .save_agent(agent("ws-1", "a-1", Some("m-1")))
        .await
        .unwrap();
    store
        .save_agent(agent("ws-1", "a-2", Some("m-2")))
        .await
        .unwrap();
    store.save_agent(agent("ws-1", "a-3", None)).await.unwrap();

    let workspace = WorkspaceId::new("ws-1");
    let unfiltered = store
        .list_agents(&workspace, &AgentFilter::default(), &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(unfiltered.items.len(), 3);

    let filtered = store
        .list_agents(
            &workspace,
            &AgentFilter {
                machine_id: Some(MachineId::new("m-1")),
            },
            &PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(filtered.items.len(), 1);
    assert_eq!(filtered.items[0].agent_id.as_str(), "a-1");
}

#[tokio::test]
async fn heartbeats_are_last_write_wins() {
    let store = InMemoryFleetStore::new();
    let workspace = WorkspaceId::new("ws-1");
    store
        .record_heartbeat(
            HeartbeatKind::Machine,
            &workspace,
            "m-1",
            HeartbeatRecord {
                status: "ok".to_string(),
                last_heartbeat_at_iso: "2026-08-01T12:00:00Z".to_string(),
            },
        )
        .await
        .unwrap();
    store
        .record_heartbeat(
            HeartbeatKind::Machine,
            &workspace,
            "m-1",
            HeartbeatRecord {
                status: "degraded".to_string(),
                last_heartbeat_at_iso: "2026-08-01T12:00:05Z".to_string(),
            },
        )
        .await
        .unwrap();

    let record = store
        .heartbeat(HeartbeatKind::Machine, &workspace, "m-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, "degraded");
    assert_eq!(record.last_heartbeat_at_iso, "2026-08-01T12:00:05Z");
}

#[tokio::test]
async fn machine_and_agent_heartbeats_do_not_collide() {
    let store = InMemoryFleetStore::new();
    let workspace = WorkspaceId::new("ws-1");
    store
        .record_heartbeat(
            HeartbeatKind::Machine,
            &workspace,
            "x-1",
            HeartbeatRecord {
                status: "ok".to_string(),
                last_heartbeat_at_iso: "2026-08-01T12:00:00Z".to_string(),
            },
        )
        .await
        .unwrap();

    let absent = store
        .heartbeat(HeartbeatKind::Agent, &workspace, "x-1")
        .await
        .unwrap();
    assert!(absent.is_none());
}
