// crates/summit-core/src/lib.rs
//
// summit-core: Canonical types, errors, clock capability, and keccak helpers
// for the Summit Protocol.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines addresses, elevations and totem counts, the fixed-point scale
// used by every accrual accumulator, the protocol-wide error enum, and the
// injected Clock trait that keeps the round machinery deterministic in tests.

pub mod clock;
pub mod crypto;
pub mod error;
pub mod types;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use summit_core::Elevation;`

pub use clock::{Clock, FakeClock, SystemClock};
pub use crypto::{keccak256, resolve_seed, seal_seed};
pub use error::SummitError;
pub use types::{
    Address, Elevation, PoolKey, TokenId, ACC_SCALE, BP_DENOM, LOCKOUT_WINDOW_SECS,
};
