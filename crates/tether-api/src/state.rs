//! Shared application state.

use std::sync::Arc;
use tether_handoff::{CodeIssuer, CodeRedeemer, TokenIssuer};

/// Shared state available to all handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Issues one-time handoff codes.
    pub issuer: Arc<CodeIssuer>,
    /// Consumes and validates handoff codes.
    pub redeemer: Arc<CodeRedeemer>,
    /// External token collaborator (mints pairs, resolves bearers).
    pub tokens: Arc<dyn TokenIssuer>,
}
