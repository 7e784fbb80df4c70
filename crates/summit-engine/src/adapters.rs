// crates/summit-engine/src/adapters.rs
//
// Passthrough yield-source adapters.
//
// A pool's idle stake can be routed through an external vault, a
// MasterChef-style staking contract, or a yield aggregator. The engine sees
// one capability interface regardless of kind; the concrete strategy is
// chosen at registration time. Adapter failures are absorbed and surfaced
// as events, never escalated into freezing user withdrawals: the ledger is
// the source of truth and reconciles against what the adapter actually
// returns.

use serde::{Deserialize, Serialize};
use std::fmt;

use summit_core::SummitError;

/// The kind of external yield source behind an adapter. Informational tag
/// carried in registration events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdapterKind {
    /// Auto-compounding vault.
    Vault,
    /// MasterChef-style staking contract.
    Chef,
    /// Yield aggregator.
    Aggregator,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdapterKind::Vault => "vault",
            AdapterKind::Chef => "chef",
            AdapterKind::Aggregator => "aggregator",
        };
        write!(f, "{}", name)
    }
}

/// Capability interface over an external yield source.
///
/// `retire` may return less than the adapter's reported balance — funds can
/// be stuck in the external system. Callers must reconcile against the
/// returned amount rather than assuming 1:1 recovery.
pub trait PassthroughAdapter: Send + Sync {
    fn kind(&self) -> AdapterKind;

    /// Route `amount` into the external yield source.
    fn deposit(&mut self, amount: u64) -> Result<(), SummitError>;

    /// Pull `amount` back out. Returns the amount actually recovered.
    fn withdraw(&mut self, amount: u64) -> Result<u64, SummitError>;

    /// Balance the adapter currently reports holding.
    fn balance(&self) -> u64;

    /// Wind the adapter down, returning everything it can recover.
    fn retire(&mut self) -> Result<u64, SummitError>;
}

pub mod testing {
    //! Deterministic fake adapters for tests and local development.

    use super::*;

    /// In-memory adapter that honors every call exactly, optionally
    /// shorting retirement by a configured amount.
    pub struct FakeVault {
        pub held: u64,
        /// Amount that gets "stuck" when retiring.
        pub stuck_on_retire: u64,
    }

    impl FakeVault {
        pub fn new() -> Self {
            Self {
                held: 0,
                stuck_on_retire: 0,
            }
        }
    }

    impl Default for FakeVault {
        fn default() -> Self {
            Self::new()
        }
    }

    impl PassthroughAdapter for FakeVault {
        fn kind(&self) -> AdapterKind {
            AdapterKind::Vault
        }

        fn deposit(&mut self, amount: u64) -> Result<(), SummitError> {
            self.held += amount;
            Ok(())
        }

        fn withdraw(&mut self, amount: u64) -> Result<u64, SummitError> {
            let recovered = amount.min(self.held);
            self.held -= recovered;
            Ok(recovered)
        }

        fn balance(&self) -> u64 {
            self.held
        }

        fn retire(&mut self) -> Result<u64, SummitError> {
            let recovered = self.held.saturating_sub(self.stuck_on_retire);
            self.held = 0;
            Ok(recovered)
        }
    }
}
