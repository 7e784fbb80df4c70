// crates/summit-engine/src/events.rs
//
// Ledger events emitted by the Cartographer. The host drains these for
// off-chain indexing; governance follow-up on adapter shortfalls starts
// here.

use serde::{Deserialize, Serialize};

use summit_core::{Address, Elevation, PoolKey, TokenId};

use crate::adapters::AdapterKind;

/// Events emitted by engine operations, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    PoolAdded {
        pool: PoolKey,
    },
    PoolLivenessSet {
        pool: PoolKey,
        live: bool,
    },
    Deposited {
        pool: PoolKey,
        user: Address,
        amount: u64,
        /// Winnings paid out by harvest-on-touch.
        harvested: u64,
    },
    Withdrawn {
        pool: PoolKey,
        user: Address,
        net: u64,
        tax: u64,
        harvested: u64,
    },
    Harvested {
        pool: PoolKey,
        user: Address,
        amount: u64,
    },
    TotemSwitched {
        pool: PoolKey,
        user: Address,
        from: u8,
        to: u8,
    },
    CrossCompounded {
        from: PoolKey,
        to: PoolKey,
        user: Address,
        amount: u64,
    },
    RoundRolledOver {
        elevation: Elevation,
        round: u64,
        winning_totem: u8,
    },
    /// Per-pool settlement detail accompanying a rollover.
    RoundSettled {
        pool: PoolKey,
        round: u64,
        winning_totem: u8,
        distributed: u64,
        carried: u64,
    },
    SealedSeedReceived {
        marker: u64,
    },
    UnsealedSeedReceived {
        resolved_at: u64,
    },
    AllocationSet {
        token: TokenId,
        allocation: u64,
    },
    TaxScheduleSet {
        configured_bp: u16,
        base_minimum_bp: u16,
        decay_duration: u64,
    },
    SeederRotated {
        seeder: Address,
    },
    AdapterRegistered {
        token: TokenId,
        kind: AdapterKind,
    },
    /// An adapter returned less than the ledger expected. Absorbed, not
    /// escalated; governance follows up out of band.
    AdapterShortfall {
        token: TokenId,
        expected: u64,
        recovered: u64,
    },
    /// An adapter call failed outright after ledger state was committed.
    AdapterCallFailed {
        token: TokenId,
        operation: String,
    },
}
