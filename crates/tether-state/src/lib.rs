//! Session state model and the local persisted mirror.
//!
//! Each client process owns exactly one [`SessionState`]; only serialized
//! snapshots travel over the realtime channel. Merge logic lives in the
//! sync controller, not here.

mod error;
mod session;
mod store;

pub use error::{StateError, StateResult};
pub use session::{ClientKind, SessionState};
pub use store::{FileStateStore, StateStore};
