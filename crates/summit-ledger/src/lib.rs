// crates/summit-ledger/src/lib.rs
//
// summit-ledger: Pool ledger and user position store for the Summit Protocol.
//
// All amounts are u64 micro-units; all accumulators are u128 values scaled
// by summit_core::ACC_SCALE. The pool owns supply and round accrual; the
// position owns per-user debt snapshots and lazily settled winnings. Round
// resolution never loops over users — settlement is O(1) per user at their
// next interaction.

pub mod pool;
pub mod position;

// Re-export key types for ergonomic access from downstream crates.
pub use pool::{Pool, RoundOutcome, RoundSettlement};
pub use position::UserPosition;
