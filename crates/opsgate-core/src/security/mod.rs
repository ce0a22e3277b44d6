// crates/opsgate-core/src/security/mod.rs
// ============================================================================
// Module: Retrieval Security Filter
// Description: Input-limit validation, secret redaction, tenant re-filtering.
// Purpose: Guarantee bounded queries and tenant-clean, secret-free results.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The security filter wraps every retrieval path three ways: input limits
//! bound query cost before any port is called, redaction strips credential
//! material from results, and tenant re-filtering drops any record whose
//! workspace differs from the requesting principal's tenant.
//!
//! ## Invariants
//! - Redaction is idempotent: re-redacting redacted output is a no-op. The
//!   marker contains characters outside the token charset and is shorter
//!   than the minimum token length, so it can never re-match.
//! - Tenant filtering runs even though the store ports are documented to
//!   scope by workspace; a store bug or misconfigured port must degrade to
//!   missing rows, never to cross-tenant leakage.
//!
//! Security posture: every store response is treated as possibly wrong.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::WorkspaceId;
use crate::core::retrieval::GraphEdge;
use crate::core::retrieval::GraphNode;
use crate::core::retrieval::RetrievalHit;


// ============================================================================
// SECTION: Input Limits
// ============================================================================

/// An input exceeding a configured retrieval limit.
///
/// # Invariants
/// - Messages name the configured maximum so callers can surface them
///   verbatim in a problem document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitViolation {
    /// Query text longer than the configured maximum.
    #[error("query length {length} exceeds the maximum of {max} characters")]
    QueryTooLong {
        /// Observed query length in characters.
        length: usize,
        /// Configured maximum.
        max: usize,
    },
    /// Requested result count above the configured maximum.
    #[error("topK {requested} exceeds the maximum of {max}")]
    TopKTooLarge {
        /// Requested result count.
        requested: usize,
        /// Configured maximum.
        max: usize,
    },
    /// Requested traversal depth above the configured maximum.
    #[error("maxDepth {requested} exceeds the maximum of {max}")]
    DepthTooLarge {
        /// Requested hop depth.
        requested: usize,
        /// Configured maximum.
        max: usize,
    },
}

/// Configured bounds on retrieval inputs; applied before any port call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalLimits {
    /// Maximum semantic query length in characters.
    pub max_query_length: usize,
    /// Maximum semantic result count.
    pub max_top_k: usize,
    /// Maximum graph traversal depth in hops.
    pub max_depth: usize,
}

impl RetrievalLimits {
    /// Validates semantic query text length, inclusive of the maximum.
    ///
    /// # Errors
    ///
    /// Returns [`LimitViolation::QueryTooLong`] naming the configured
    /// maximum when the text is over the bound.
    pub fn validate_query_length(&self, text: &str) -> Result<(), LimitViolation> {
        let length = text.chars().count();
        if length > self.max_query_length {
            return Err(LimitViolation::QueryTooLong {
                length,
                max: self.max_query_length,
            });
        }
        Ok(())
    }

    /// Validates a requested result count, inclusive of the maximum.
    ///
    /// # Errors
    ///
    /// Returns [`LimitViolation::TopKTooLarge`] naming the configured
    /// maximum when the count is over the bound.
    pub fn validate_top_k(&self, requested: usize) -> Result<(), LimitViolation> {
        if requested > self.max_top_k {
            return Err(LimitViolation::TopKTooLarge {
                requested,
                max: self.max_top_k,
            });
        }
        Ok(())
    }

    /// Validates a requested traversal depth, inclusive of the maximum.
    ///
    /// # Errors
    ///
    /// Returns [`LimitViolation::DepthTooLarge`] naming the configured
    /// maximum when the depth is over the bound.
    pub fn validate_max_depth(&self, requested: usize) -> Result<(), LimitViolation> {
        if requested > self.max_depth {
            return Err(LimitViolation::DepthTooLarge {
                requested,
                max: self.max_depth,
            });
        }
        Ok(())
    }
}

impl Default for RetrievalLimits {
    fn default() -> Self {
        Self {
            max_query_length: 4096,
            max_top_k: 100,
            max_depth: 5,
        }
    }
}

// ============================================================================
// SECTION: Redaction
// ============================================================================

/// Literal marker substituted for redacted values and tokens.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Shortest opaque token worth redacting after a credential-scheme prefix.
///
/// The marker is shorter than this and contains non-token characters, which
/// is what makes [`redact_text`] idempotent.
const MIN_BEARER_TOKEN_LEN: usize = 16;

/// Key fragments that mark a metadata or property value as sensitive.
/// Substring matching is deliberate: `api_key` matches via `key`,
/// `authToken` via `token`.
const SENSITIVE_KEY_FRAGMENTS: [&str; 6] = [
    "token",
    "password",
    "secret",
    "key",
    "credential",
    "auth",
];

/// Returns whether a metadata or property key names sensitive material.
#[must_use]
pub fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| lowered.contains(fragment))
}

/// Returns whether a character may appear in an opaque bearer token.
const fn is_token_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(ch, '.' | '_' | '~' | '+' | '/' | '=' | '-')
}

/// Replaces bearer-token-like substrings with [`REDACTION_MARKER`],
/// preserving surrounding text. Scheme matching is case-insensitive; only
/// tokens of at least [`MIN_BEARER_TOKEN_LEN`] characters are redacted, so
/// short words following the scheme prefix survive.
#[must_use]
pub fn redact_text(text: &str) -> String {
    const SCHEME: &str = "bearer ";
    let lowered = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut at = 0;
    while at < text.len() {
        if lowered[at..].starts_with(SCHEME) {
            let token_start = at + SCHEME.len();
            out.push_str(&text[at..token_start]);
            let token_len: usize = text[token_start..]
                .chars()
                .take_while(|ch| is_token_char(*ch))
                .map(char::len_utf8)
                .sum();
            if token_len >= MIN_BEARER_TOKEN_LEN {
                out.push_str(REDACTION_MARKER);
            } else {
                out.push_str(&text[token_start..token_start + token_len]);
            }
            at = token_start + token_len;
        } else if let Some(ch) = text[at..].chars().next() {
            out.push(ch);
            at += ch.len_utf8();
        } else {
            break;
        }
    }
    out
}

/// Replaces the value of every sensitive key with [`REDACTION_MARKER`],
/// regardless of the value's original type. Non-matching keys pass through
/// unchanged.
fn redact_map(map: &mut Map<String, Value>) {
    for (key, value) in map.iter_mut() {
        if is_sensitive_key(key) {
            *value = Value::String(REDACTION_MARKER.to_string());
        }
    }
}

/// Redacts semantic-search hits in place: hit text and metadata values.
pub fn redact_hits(hits: &mut [RetrievalHit]) {
    for hit in hits.iter_mut() {
        if let Some(text) = &hit.text {
            hit.text = Some(redact_text(text));
        }
        redact_map(&mut hit.metadata);
    }
}

/// Redacts graph nodes in place: labels and property values.
pub fn redact_nodes(nodes: &mut [GraphNode]) {
    for node in nodes.iter_mut() {
        if let Some(label) = &node.label {
            node.label = Some(redact_text(label));
        }
        redact_map(&mut node.properties);
    }
}

/// Redacts graph edges in place: property values.
pub fn redact_edges(edges: &mut [GraphEdge]) {
    for edge in edges.iter_mut() {
        if let Some(properties) = &mut edge.properties {
            redact_map(properties);
        }
    }
}

// ============================================================================
// SECTION: Tenant Re-Filtering
// ============================================================================

/// Drops every hit whose provenance names a workspace other than the
/// requesting tenant.
///
/// This runs even though the semantic-index port is documented to scope by
/// workspace: never trust a store's tenant scoping. A wrong-tenant entry is
/// removed entirely, never flagged.
#[must_use]
pub fn filter_hits_to_workspace(
    hits: Vec<RetrievalHit>,
    workspace_id: &WorkspaceId,
) -> Vec<RetrievalHit> {
    hits.into_iter()
        .filter(|hit| &hit.provenance.workspace_id == workspace_id)
        .collect()
}

/// Drops every node owned by a workspace other than the requesting tenant.
///
/// Same posture as [`filter_hits_to_workspace`]: the knowledge-graph port's
/// own scoping is not trusted.
#[must_use]
pub fn filter_nodes_to_workspace(
    nodes: Vec<GraphNode>,
    workspace_id: &WorkspaceId,
) -> Vec<GraphNode> {
    nodes
        .into_iter()
        .filter(|node| &node.workspace_id == workspace_id)
        .collect()
}

/// Drops every edge owned by a workspace other than the requesting tenant.
///
/// Same posture as [`filter_hits_to_workspace`]: the knowledge-graph port's
/// own scoping is not trusted.
#[must_use]
pub fn filter_edges_to_workspace(
    edges: Vec<GraphEdge>,
    workspace_id: &WorkspaceId,
) -> Vec<GraphEdge> {
    edges
        .into_iter()
        .filter(|edge| &edge.workspace_id == workspace_id)
        .collect()
}
