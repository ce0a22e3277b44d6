// crates/opsgate-api/src/audit.rs
// ============================================================================
// Module: Security Audit Sink
// Description: Structured security events for denials and limit rejections.
// Purpose: Provide a pluggable sink seam for security-relevant decisions.
// Dependencies: opsgate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Security-relevant decisions (credential rejections, scope and role
//! denials, limit rejections) emit an [`AuditEvent`] through the
//! [`SecurityAuditSink`] seam. Deployments wire a JSON-lines sink or their
//! own implementation; the default is a no-op.
//!
//! ## Invariants
//! - Events never carry credential material; tokens are not a field.
//! - Recording is infallible at the seam: sink failures are swallowed and
//!   never fail the request being audited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;


// ============================================================================
// SECTION: Event Shape
// ============================================================================

/// One security-relevant decision, serialized as a JSON line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Stable event label, for example `auth_denied` or `role_denied`.
    pub event: &'static str,
    /// Correlation id of the request that produced the event.
    pub correlation_id: String,
    /// Workspace named in the request path, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    /// Authenticated user, when authentication succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Action label being authorized, when one applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'static str>,
    /// Event detail safe for operator logs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Server observation time, RFC 3339.
    pub at_iso: String,
}

// ============================================================================
// SECTION: Sink Seam
// ============================================================================

/// Sink for security audit events.
pub trait SecurityAuditSink: Send + Sync {
    /// Records one event; must not fail the surrounding request.
    fn record(&self, event: &AuditEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl SecurityAuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

// ============================================================================
// SECTION: JSON-Lines Sink
// ============================================================================

/// Sink writing one JSON document per line to the wrapped writer.
#[derive(Debug)]
pub struct JsonLinesAuditSink<W: Write + Send> {
    /// Writer behind a lock; lines are written whole.
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesAuditSink<W> {
    /// Wraps a writer, for example a log file handle.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> SecurityAuditSink for JsonLinesAuditSink<W> {
    fn record(&self, event: &AuditEvent) {
        let Ok(line) = serde_json::to_string(event) else {
            return;
        };
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{line}");
            let _ = writer.flush();
        }
    }
}
