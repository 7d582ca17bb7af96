//! One-time authentication handoff codes.
//!
//! A user authenticated in one client (web) hands their session to a
//! second client (desktop) through a short-lived, single-use code bound
//! to a caller-supplied anti-forgery `state` value:
//!
//! 1. [`CodeIssuer::issue`] stores a code in the TTL code store
//! 2. the desktop client presents code + state to [`CodeRedeemer::redeem`]
//! 3. on success it receives the bound user identity and asks the
//!    injected [`TokenIssuer`] to mint real session tokens
//!
//! Exactly-once redemption rests entirely on the store's atomic
//! fetch-and-delete; this crate adds the expiry and state checks on top.

mod code;
mod error;
mod issuer;
mod redeemer;
mod token;

pub use code::{generate_code, BridgeContext, CodeRecord, IssuedCode, DEFAULT_CODE_TTL};
pub use error::{HandoffError, HandoffResult, RedeemError};
pub use issuer::CodeIssuer;
pub use redeemer::{CodeRedeemer, Redemption};
pub use token::{TokenIssuer, TokenPair};
