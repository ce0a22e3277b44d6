// crates/opsgate-config/src/lib.rs
// ============================================================================
// Module: OpsGate Configuration
// Description: TOML configuration model with fail-closed validation.
// Purpose: Define the deployment surface: server bind, auth, limits, statuses.
// Dependencies: opsgate-core, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Deployment configuration for the OpsGate control plane: where the server
//! binds, which static bearer tokens map to which principals, the retrieval
//! input limits, and any deployment-specific heartbeat statuses.
//!
//! ## Invariants
//! - Validation is fail-closed: a config that parses but violates any
//!   constraint is rejected before the server starts, never repaired.
//! - Bearer tokens are unique across principals; a token resolving to two
//!   principals would make authentication ambiguous.
//!
//! Security posture: config files carry credential material; errors name
//! the offending field, never the token value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::Path;

use opsgate_core::HeartbeatStatusSet;
use opsgate_core::RetrievalLimits;
use opsgate_core::Role;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constraints
// ============================================================================

/// Maximum principals a deployment may configure.
const MAX_PRINCIPALS: usize = 64;

/// Maximum bearer token length in bytes.
const MAX_TOKEN_LENGTH: usize = 256;

/// Maximum deployment-specific heartbeat statuses.
const MAX_EXTRA_STATUSES: usize = 16;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation failures.
///
/// # Invariants
/// - Messages never echo token values; they name fields and positions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {detail}")]
    Read {
        /// Path that failed to read.
        path: String,
        /// I/O failure detail.
        detail: String,
    },
    /// The config file is not valid TOML for the expected model.
    #[error("failed to parse config: {detail}")]
    Parse {
        /// Parser failure detail.
        detail: String,
    },
    /// The config parsed but violates a constraint.
    #[error("invalid config: {detail}")]
    Invalid {
        /// Constraint violation detail.
        detail: String,
    },
}

/// Shorthand for a validation failure with the given detail.
fn invalid(detail: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        detail: detail.into(),
    }
}

// ============================================================================
// SECTION: Model
// ============================================================================

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address the server binds, for example `127.0.0.1:8080`.
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

/// One static bearer token and the principal it resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrincipalConfig {
    /// Bearer token presented by the caller.
    pub token: String,
    /// Workspace the principal is scoped to.
    pub workspace_id: String,
    /// User the token identifies.
    pub user_id: String,
    /// Roles granted to the user; at least one.
    pub roles: Vec<Role>,
}

/// Authentication settings: the static token table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Configured principals; empty means every request is unauthorized.
    #[serde(default)]
    pub principals: Vec<PrincipalConfig>,
}

/// Retrieval input limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum semantic query length in characters.
    pub max_query_length: usize,
    /// Maximum semantic result count.
    pub max_top_k: usize,
    /// Maximum graph traversal depth in hops.
    pub max_depth: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let defaults = RetrievalLimits::default();
        Self {
            max_query_length: defaults.max_query_length,
            max_top_k: defaults.max_top_k,
            max_depth: defaults.max_depth,
        }
    }
}

/// Heartbeat vocabulary settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeartbeatConfig {
    /// Deployment-specific statuses accepted in addition to the base
    /// vocabulary; the base set can never be shrunk.
    #[serde(default)]
    pub extra_statuses: Vec<String>,
}

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpsGateConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Retrieval input limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Heartbeat vocabulary settings.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

// ============================================================================
// SECTION: Loading and Validation
// ============================================================================

impl OpsGateConfig {
    /// Reads, parses, and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read,
    /// [`ConfigError::Parse`] on malformed TOML, [`ConfigError::Invalid`]
    /// when any constraint is violated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.display().to_string(),
            detail: err.to_string(),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parses and validates a config document from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML,
    /// [`ConfigError::Invalid`] when any constraint is violated.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|err| ConfigError::Parse {
            detail: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every constraint; fail-closed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violated
    /// constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .bind_addr
            .parse::<SocketAddr>()
            .map_err(|_| invalid("server.bind_addr must be a socket address"))?;

        if self.auth.principals.len() > MAX_PRINCIPALS {
            return Err(invalid(format!(
                "auth.principals exceeds the maximum of {MAX_PRINCIPALS}"
            )));
        }
        let mut seen_tokens = BTreeSet::new();
        for (index, principal) in self.auth.principals.iter().enumerate() {
            validate_principal(index, principal)?;
            if !seen_tokens.insert(principal.token.as_str()) {
                return Err(invalid(format!(
                    "auth.principals[{index}].token duplicates an earlier token"
                )));
            }
        }

        if self.limits.max_query_length == 0 {
            return Err(invalid("limits.max_query_length must be positive"));
        }
        if self.limits.max_top_k == 0 {
            return Err(invalid("limits.max_top_k must be positive"));
        }
        if self.limits.max_depth == 0 {
            return Err(invalid("limits.max_depth must be positive"));
        }

        if self.heartbeat.extra_statuses.len() > MAX_EXTRA_STATUSES {
            return Err(invalid(format!(
                "heartbeat.extra_statuses exceeds the maximum of {MAX_EXTRA_STATUSES}"
            )));
        }
        for status in &self.heartbeat.extra_statuses {
            if status.trim().is_empty() {
                return Err(invalid(
                    "heartbeat.extra_statuses entries must be non-empty",
                ));
            }
        }
        Ok(())
    }

    /// Builds the retrieval limits this deployment enforces.
    #[must_use]
    pub const fn retrieval_limits(&self) -> RetrievalLimits {
        RetrievalLimits {
            max_query_length: self.limits.max_query_length,
            max_top_k: self.limits.max_top_k,
            max_depth: self.limits.max_depth,
        }
    }

    /// Builds the heartbeat status vocabulary this deployment accepts.
    #[must_use]
    pub fn heartbeat_statuses(&self) -> HeartbeatStatusSet {
        HeartbeatStatusSet::with_extras(self.heartbeat.extra_statuses.iter().cloned())
    }
}

/// Validates one principal entry.
fn validate_principal(index: usize, principal: &PrincipalConfig) -> Result<(), ConfigError> {
    if principal.token.trim().is_empty() {
        return Err(invalid(format!(
            "auth.principals[{index}].token must be non-empty"
        )));
    }
    if principal.token.chars().any(char::is_whitespace) {
        return Err(invalid(format!(
            "auth.principals[{index}].token must not contain whitespace"
        )));
    }
    if principal.token.len() > MAX_TOKEN_LENGTH {
        return Err(invalid(format!(
            "auth.principals[{index}].token exceeds {MAX_TOKEN_LENGTH} bytes"
        )));
    }
    if principal.workspace_id.trim().is_empty() {
        return Err(invalid(format!(
            "auth.principals[{index}].workspace_id must be non-empty"
        )));
    }
    if principal.user_id.trim().is_empty() {
        return Err(invalid(format!(
            "auth.principals[{index}].user_id must be non-empty"
        )));
    }
    if principal.roles.is_empty() {
        return Err(invalid(format!(
            "auth.principals[{index}].roles must not be empty"
        )));
    }
    Ok(())
}
