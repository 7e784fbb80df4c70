// crates/summit-rounds/src/lib.rs
//
// summit-rounds: Round clock and winning-totem history for the Summit
// Protocol. One clock per elevation; rollover is strictly sequential per
// elevation and gated by the caller-supplied resolved winner.

pub mod clock;
pub mod history;

// Re-export key types for ergonomic access from downstream crates.
pub use clock::{RoundClock, RoundPhase};
pub use history::{WinHistory, HISTORY_DEPTH};
