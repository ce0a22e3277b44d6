// crates/opsgate-core/src/core/identifiers.rs
// ============================================================================
// Module: OpsGate Identifiers
// Description: Canonical opaque identifiers for workspaces, fleet, and retrieval.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout OpsGate.
//! Identifiers are opaque UTF-8 strings and serialize transparently on the
//! wire. Tenant scoping is carried by [`WorkspaceId`]: every tenant-scoped
//! record embeds one, and no identifier is ever interpreted structurally.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Declares an opaque string identifier with the canonical constructor,
/// accessor, `Display`, and `From` conversions shared by all OpsGate ids.
macro_rules! opaque_string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        ///
        /// # Invariants
        /// - Opaque UTF-8 string; no normalization or validation is applied by this type.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

opaque_string_id! {
    /// Workspace (tenant) identifier; the isolation boundary for every record.
    WorkspaceId
}

opaque_string_id! {
    /// User identifier carried by an authenticated principal.
    UserId
}

opaque_string_id! {
    /// Machine identifier, unique within a workspace.
    MachineId
}

opaque_string_id! {
    /// Agent identifier, unique within a workspace.
    AgentId
}

opaque_string_id! {
    /// Run identifier carried in retrieval provenance.
    RunId
}

opaque_string_id! {
    /// Artifact identifier for semantic-index hits.
    ArtifactId
}

opaque_string_id! {
    /// Knowledge-graph node identifier.
    NodeId
}

opaque_string_id! {
    /// Knowledge-graph edge identifier.
    EdgeId
}

opaque_string_id! {
    /// Per-request correlation identifier for audit trails.
    CorrelationId
}

opaque_string_id! {
    /// Capability key such as `robotics:move`; allowlist entries only.
    CapabilityKey
}

opaque_string_id! {
    /// Execution-tier label (for example `Auto` or `HumanApprove`) carried
    /// through unchanged; its semantics belong to the external policy engine.
    PolicyTier
}
