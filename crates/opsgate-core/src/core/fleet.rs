// crates/opsgate-core/src/core/fleet.rs
// ============================================================================
// Module: Fleet Registry Records
// Description: Machine registrations, agent configurations, and heartbeats.
// Purpose: Model the fleet registry with credential material kept unserializable.
// Dependencies: crate::core::identifiers, serde, thiserror, time, url
// ============================================================================

//! ## Overview
//! Fleet records are the registry's unit of storage: a
//! [`MachineRegistration`] describes an execution endpoint and its isolation
//! policy, an [`AgentConfig`] binds an actor to an optional machine, and a
//! [`HeartbeatRecord`] tracks last-write-wins liveness.
//!
//! ## Invariants
//! - [`MachineAuthConfig`] does not implement `Serialize`; credential
//!   material structurally cannot reach a wire response. The public
//!   [`MachineView`] projection is the single serialization boundary for
//!   machine reads, applied uniformly to get-one and list paths.
//! - Identity is `(workspaceId, machineId)` / `(workspaceId, agentId)`.
//!
//! Security posture: registration payloads are untrusted; [`MachineRegistration::validate`]
//! and [`AgentConfig::validate`] fail closed before any store write.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use url::Url;

use crate::core::identifiers::AgentId;
use crate::core::identifiers::CapabilityKey;
use crate::core::identifiers::MachineId;
use crate::core::identifiers::PolicyTier;
use crate::core::identifiers::WorkspaceId;

// ============================================================================
// SECTION: Validation Errors
// ============================================================================

/// Schema validation failures for fleet registry payloads.
///
/// # Invariants
/// - Variants are stable for programmatic handling; messages name the
///   offending field so callers can surface them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetValidationError {
    /// A required string field is empty or whitespace.
    #[error("{field} must be a non-empty string")]
    EmptyField {
        /// Wire name of the offending field.
        field: &'static str,
    },
    /// The capability allowlist is empty.
    #[error("capabilities must contain at least one entry")]
    EmptyCapabilities,
    /// The machine endpoint URL does not parse.
    #[error("endpointUrl is not a valid URL: {detail}")]
    InvalidEndpointUrl {
        /// Parser failure detail.
        detail: String,
    },
    /// An egress allowlist entry does not parse as a URL.
    #[error("egressAllowlist entry is not a valid URL: {entry}")]
    InvalidEgressEntry {
        /// The offending entry.
        entry: String,
    },
    /// A timestamp field is not RFC 3339.
    #[error("{field} is not a valid RFC 3339 timestamp")]
    InvalidTimestamp {
        /// Wire name of the offending field.
        field: &'static str,
    },
    /// An allowed-tools entry is empty.
    #[error("allowedTools entries must be non-empty strings")]
    EmptyToolName,
    /// A heartbeat status outside the allowed vocabulary.
    #[error("status {status} is not an allowed heartbeat status (allowed: {allowed})")]
    InvalidHeartbeatStatus {
        /// The rejected literal.
        status: String,
        /// Comma-joined allowed vocabulary.
        allowed: String,
    },
}

/// Checks that a string field is non-empty after trimming.
fn require_non_empty(value: &str, field: &'static str) -> Result<(), FleetValidationError> {
    if value.trim().is_empty() {
        return Err(FleetValidationError::EmptyField { field });
    }
    Ok(())
}

/// Checks that a timestamp field parses as RFC 3339.
fn require_rfc3339(value: &str, field: &'static str) -> Result<(), FleetValidationError> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map(|_| ())
        .map_err(|_| FleetValidationError::InvalidTimestamp { field })
}

// ============================================================================
// SECTION: Capabilities
// ============================================================================

/// Capability allowlist entry; only listed capabilities may be invoked.
///
/// # Invariants
/// - The wire form is an object `{"capability": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Capability key such as `robotics:move`.
    pub capability: CapabilityKey,
}

// ============================================================================
// SECTION: Execution Policy
// ============================================================================

/// Isolation and egress policy for a machine endpoint; mandatory on registration.
///
/// # Invariants
/// - Mode and identity labels are opaque to this core; emptiness is the
///   only rejected shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPolicy {
    /// Isolation mode label (for example `PerTenantWorker`).
    pub isolation_mode: String,
    /// Outbound URLs the machine may reach.
    pub egress_allowlist: Vec<String>,
    /// Workload identity requirement label (for example `Required`).
    pub workload_identity: String,
}

impl ExecutionPolicy {
    /// Validates policy shape: non-empty labels, parseable egress entries.
    ///
    /// # Errors
    ///
    /// Returns [`FleetValidationError`] naming the first malformed field.
    pub fn validate(&self) -> Result<(), FleetValidationError> {
        require_non_empty(&self.isolation_mode, "executionPolicy.isolationMode")?;
        require_non_empty(&self.workload_identity, "executionPolicy.workloadIdentity")?;
        for entry in &self.egress_allowlist {
            if Url::parse(entry).is_err() {
                return Err(FleetValidationError::InvalidEgressEntry {
                    entry: entry.clone(),
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Machine Auth Configuration
// ============================================================================

/// How the control plane authenticates to the machine runtime endpoint.
///
/// # Invariants
/// - Variants are stable wire labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MachineAuthKind {
    /// Present a bearer token; `secretRef` points to the token material.
    Bearer,
    /// Present an API key header; `secretRef` points to the key material.
    ApiKey,
    /// Mutual TLS; `secretRef` points to a client certificate reference.
    Mtls,
    /// No authentication (development / internal trust boundary only).
    None,
}

/// Credential reference for a machine endpoint.
///
/// # Invariants
/// - Deliberately does not implement `Serialize`: credential material can
///   never be rendered into an outbound response, on any code path.
/// - `Debug` elides the secret reference.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineAuthConfig {
    /// Authentication scheme toward the machine.
    pub kind: MachineAuthKind,
    /// Opaque reference to a credential grant or vault path.
    #[serde(default)]
    pub secret_ref: Option<String>,
}

impl fmt::Debug for MachineAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineAuthConfig")
            .field("kind", &self.kind)
            .field("secret_ref", &self.secret_ref.as_ref().map(|_| "<elided>"))
            .finish()
    }
}

// ============================================================================
// SECTION: Machine Registration
// ============================================================================

/// A registered execution endpoint and its isolation policy.
///
/// # Invariants
/// - Not `Serialize`: only the [`MachineView`] projection leaves the process.
/// - `authConfig` is optional at registration; a deployment may require it
///   for active machines, but the schema does not.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineRegistration {
    /// Machine identifier, unique within the workspace.
    pub machine_id: MachineId,
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// Machine runtime endpoint URL.
    pub endpoint_url: String,
    /// Whether the machine is accepting work.
    pub active: bool,
    /// Human-readable name.
    pub display_name: String,
    /// Capability allowlist; must be non-empty.
    pub capabilities: Vec<Capability>,
    /// Registration timestamp, RFC 3339.
    pub registered_at_iso: String,
    /// Isolation and egress policy; mandatory.
    pub execution_policy: ExecutionPolicy,
    /// Credential reference toward the machine endpoint; never serialized.
    #[serde(default)]
    pub auth_config: Option<MachineAuthConfig>,
}

impl MachineRegistration {
    /// Validates the full registration shape.
    ///
    /// # Errors
    ///
    /// Returns [`FleetValidationError`] naming the first malformed field.
    pub fn validate(&self) -> Result<(), FleetValidationError> {
        require_non_empty(self.machine_id.as_str(), "machineId")?;
        require_non_empty(self.workspace_id.as_str(), "workspaceId")?;
        require_non_empty(&self.display_name, "displayName")?;
        if self.capabilities.is_empty() {
            return Err(FleetValidationError::EmptyCapabilities);
        }
        for entry in &self.capabilities {
            require_non_empty(entry.capability.as_str(), "capabilities.capability")?;
        }
        Url::parse(&self.endpoint_url).map_err(|err| {
            FleetValidationError::InvalidEndpointUrl {
                detail: err.to_string(),
            }
        })?;
        require_rfc3339(&self.registered_at_iso, "registeredAtIso")?;
        self.execution_policy.validate()
    }

    /// Projects the record to its public, credential-free view.
    #[must_use]
    pub fn to_view(&self) -> MachineView {
        MachineView {
            machine_id: self.machine_id.clone(),
            workspace_id: self.workspace_id.clone(),
            endpoint_url: self.endpoint_url.clone(),
            active: self.active,
            display_name: self.display_name.clone(),
            capabilities: self.capabilities.clone(),
            registered_at_iso: self.registered_at_iso.clone(),
            execution_policy: self.execution_policy.clone(),
        }
    }
}

/// Public projection of a machine registration.
///
/// # Invariants
/// - Structurally has no `authConfig` field; this is the only machine shape
///   that may be serialized into a response, for get-one and list alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineView {
    /// Machine identifier.
    pub machine_id: MachineId,
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// Machine runtime endpoint URL.
    pub endpoint_url: String,
    /// Whether the machine is accepting work.
    pub active: bool,
    /// Human-readable name.
    pub display_name: String,
    /// Capability allowlist.
    pub capabilities: Vec<Capability>,
    /// Registration timestamp, RFC 3339.
    pub registered_at_iso: String,
    /// Isolation and egress policy.
    pub execution_policy: ExecutionPolicy,
}

// ============================================================================
// SECTION: Agent Configuration
// ============================================================================

/// A configured actor (software or robotic), optionally bound to a machine.
///
/// # Invariants
/// - `policyTier` is carried through unchanged; its semantics belong to the
///   external policy engine.
/// - `machineId`, when present, is not validated for existence by this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Agent identifier, unique within the workspace.
    pub agent_id: AgentId,
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// Optional binding to a registered machine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<MachineId>,
    /// Human-readable name.
    pub display_name: String,
    /// Capability allowlist.
    pub capabilities: Vec<Capability>,
    /// Execution-tier label, opaque to this core.
    pub policy_tier: PolicyTier,
    /// Tool names the agent may invoke; empty means none.
    pub allowed_tools: Vec<String>,
    /// Registration timestamp, RFC 3339.
    pub registered_at_iso: String,
}

impl AgentConfig {
    /// Validates the full agent shape.
    ///
    /// # Errors
    ///
    /// Returns [`FleetValidationError`] naming the first malformed field.
    pub fn validate(&self) -> Result<(), FleetValidationError> {
        require_non_empty(self.agent_id.as_str(), "agentId")?;
        require_non_empty(self.workspace_id.as_str(), "workspaceId")?;
        require_non_empty(&self.display_name, "displayName")?;
        require_non_empty(self.policy_tier.as_str(), "policyTier")?;
        if let Some(machine_id) = &self.machine_id {
            require_non_empty(machine_id.as_str(), "machineId")?;
        }
        for entry in &self.capabilities {
            require_non_empty(entry.capability.as_str(), "capabilities.capability")?;
        }
        if self.allowed_tools.iter().any(|tool| tool.trim().is_empty()) {
            return Err(FleetValidationError::EmptyToolName);
        }
        require_rfc3339(&self.registered_at_iso, "registeredAtIso")
    }

    /// Projects the record to its public view.
    ///
    /// Agents carry no credential field today; the projection exists so any
    /// sensitive field a deployment adds later is stripped at one boundary.
    #[must_use]
    pub fn to_view(&self) -> AgentView {
        AgentView {
            agent_id: self.agent_id.clone(),
            workspace_id: self.workspace_id.clone(),
            machine_id: self.machine_id.clone(),
            display_name: self.display_name.clone(),
            capabilities: self.capabilities.clone(),
            policy_tier: self.policy_tier.clone(),
            allowed_tools: self.allowed_tools.clone(),
            registered_at_iso: self.registered_at_iso.clone(),
        }
    }
}

/// Public projection of an agent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentView {
    /// Agent identifier.
    pub agent_id: AgentId,
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// Optional binding to a registered machine; omitted when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<MachineId>,
    /// Human-readable name.
    pub display_name: String,
    /// Capability allowlist.
    pub capabilities: Vec<Capability>,
    /// Execution-tier label.
    pub policy_tier: PolicyTier,
    /// Tool names the agent may invoke.
    pub allowed_tools: Vec<String>,
    /// Registration timestamp, RFC 3339.
    pub registered_at_iso: String,
}

// ============================================================================
// SECTION: Heartbeats
// ============================================================================

/// Which fleet entity a heartbeat targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HeartbeatKind {
    /// Machine liveness.
    Machine,
    /// Agent liveness.
    Agent,
}

impl HeartbeatKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Machine => "machine",
            Self::Agent => "agent",
        }
    }
}

/// Geographic position reported with a heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// Transient heartbeat input; never persisted as-is.
///
/// # Invariants
/// - `status` is validated against a [`HeartbeatStatusSet`] before use;
///   unknown literals are rejected, never coerced.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HeartbeatRequest {
    /// Reported status literal.
    pub status: String,
    /// Optional numeric metrics snapshot.
    #[serde(default)]
    pub metrics: Option<BTreeMap<String, f64>>,
    /// Optional reported position.
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

/// Allowed heartbeat status vocabulary.
///
/// # Invariants
/// - Always contains `ok` and `degraded`; deployments may extend the set
///   via configuration but can never shrink below the base vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatStatusSet {
    /// Allowed status literals.
    allowed: BTreeSet<String>,
}

impl HeartbeatStatusSet {
    /// Base vocabulary present in every deployment.
    const BASE: [&'static str; 2] = ["ok", "degraded"];

    /// Builds the base vocabulary plus any deployment-defined extras.
    #[must_use]
    pub fn with_extras<I>(extras: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut allowed: BTreeSet<String> =
            Self::BASE.iter().map(|status| (*status).to_string()).collect();
        allowed.extend(extras);
        Self { allowed }
    }

    /// Validates a reported status literal.
    ///
    /// # Errors
    ///
    /// Returns [`FleetValidationError::InvalidHeartbeatStatus`] naming the
    /// allowed vocabulary when the literal is outside it.
    pub fn validate(&self, status: &str) -> Result<(), FleetValidationError> {
        if self.allowed.contains(status) {
            return Ok(());
        }
        Err(FleetValidationError::InvalidHeartbeatStatus {
            status: status.to_string(),
            allowed: self.allowed.iter().cloned().collect::<Vec<_>>().join(", "),
        })
    }
}

impl Default for HeartbeatStatusSet {
    fn default() -> Self {
        Self::with_extras(std::iter::empty())
    }
}

/// Stored liveness state; last write wins.
///
/// # Invariants
/// - `last_heartbeat_at_iso` is the server's observation time, never
///   caller-supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRecord {
    /// Validated status literal.
    pub status: String,
    /// Server observation time, RFC 3339.
    pub last_heartbeat_at_iso: String,
}

// ============================================================================
// SECTION: Pagination
// ============================================================================

/// Cursor-based page request; the cursor is store-defined and opaque.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Opaque resume cursor from a prior page, when continuing.
    pub cursor: Option<String>,
    /// Maximum items to return; stores apply their own default and ceiling.
    pub limit: Option<usize>,
}

/// One page of results with an optional continuation cursor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items in this page.
    pub items: Vec<T>,
    /// Cursor resuming after the last item, when more remain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Maps the page items while preserving the continuation cursor.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

/// Store-side filter for agent listings.
///
/// # Invariants
/// - `machine_id: None` means the filter key is omitted from the store
///   query entirely; it is never passed as null or empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentFilter {
    /// Restrict to agents bound to this machine, when present.
    pub machine_id: Option<MachineId>,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
