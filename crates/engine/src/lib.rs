//! Stream lifecycle reconciliation engine.
//!
//! This crate contains the state machine that turns per-cycle stream
//! observations into alerts, webhook subscriptions, and record updates,
//! applying the blacklist/whitelist and time-window suppression policy.

pub mod lifecycle;
pub mod policy;
pub mod traits;

pub use lifecycle::*;
pub use policy::*;
pub use traits::*;
