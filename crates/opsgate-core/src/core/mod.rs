// crates/opsgate-core/src/core/mod.rs
// ============================================================================
// Module: Core Domain Model
// Description: Identifiers, principal, fleet records, and retrieval records.
// Purpose: Group the pure domain types used across OpsGate layers.
// Dependencies: serde, thiserror, time, url
// ============================================================================

//! ## Overview
//! The `core` module holds the data model: opaque identifiers, the
//! authenticated [`principal::Principal`], the fleet registry records, and
//! the retrieval result records. Everything here is pure data plus
//! validation; no I/O.

/// Fleet registry records: machines, agents, heartbeats, pagination.
pub mod fleet;
/// Canonical opaque identifiers with stable wire forms.
pub mod identifiers;
/// Authenticated principal, role vocabulary, and the role policy table.
pub mod principal;
/// Retrieval result records returned by the semantic and graph ports.
pub mod retrieval;
