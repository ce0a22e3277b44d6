// crates/opsgate-api/src/server.rs
// ============================================================================
// Module: HTTP Server
// Description: Bind and serve the control-plane router.
// Purpose: Own the thin transport edge between tokio and the routes.
// Dependencies: axum, tokio, thiserror
// ============================================================================

//! ## Overview
//! The server module is the transport edge: bind a listener, hand the
//! router to axum, and surface I/O failures as typed errors. Everything
//! interesting happens in [`crate::routes`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Transport-level serving failures.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Binding the listener failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that failed to bind.
        addr: SocketAddr,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The accept loop failed.
    #[error("server I/O failure: {0}")]
    Serve(#[from] std::io::Error),
}

// ============================================================================
// SECTION: Serving
// ============================================================================

/// Binds the address and serves the router until the process stops.
///
/// # Errors
///
/// Returns [`ServeError::Bind`] when the listener cannot bind and
/// [`ServeError::Serve`] when the accept loop fails.
pub async fn serve(addr: SocketAddr, app: Router) -> Result<(), ServeError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;
    axum::serve(listener, app).await?;
    Ok(())
}
