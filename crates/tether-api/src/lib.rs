//! HTTP boundary for the handoff core.
//!
//! Two operations: `POST /auth/desktop/initiate` (authenticated web
//! session asks for a one-time code) and `POST /auth/desktop/exchange`
//! (desktop client trades code + state for identity and tokens). The
//! three redemption failure kinds deliberately collapse to one generic
//! 401 so a caller can't learn which check failed.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;
pub mod tokens;

pub use error::{ApiError, ApiResult};
pub use router::router;
pub use state::AppState;
pub use tokens::LocalTokenIssuer;
