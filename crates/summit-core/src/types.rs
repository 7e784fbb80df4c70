// crates/summit-core/src/types.rs
//
// Canonical identifiers and fixed-point constants for the Summit Protocol.
//
// All monetary amounts are u64 micro-units of their token. Accrual
// accumulators are u128 values scaled by ACC_SCALE (10^12) so that
// per-second per-share increments never lose precision to an early
// division.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte account or token address.
pub type Address = [u8; 32];

/// Token identifier — the staking asset's address.
pub type TokenId = Address;

/// Fixed-point scale for accrual accumulators: 10^12.
pub const ACC_SCALE: u128 = 1_000_000_000_000;

/// Basis points in one whole (100%).
pub const BP_DENOM: u64 = 10_000;

/// Seconds before a round's end during which deposits and totem switches
/// are rejected, preventing last-second totem snipes.
pub const LOCKOUT_WINDOW_SECS: u64 = 120;

/// A risk tier. The four farm elevations carry 1/2/5/10 totems; EXPEDITION
/// is the reserved no-lottery aggregation tier and hosts no farm pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Elevation {
    Oasis,
    Plains,
    Mesa,
    Summit,
    Expedition,
}

impl Elevation {
    /// The four farmable elevations, in unlock order.
    pub const FARM_ELEVATIONS: [Elevation; 4] = [
        Elevation::Oasis,
        Elevation::Plains,
        Elevation::Mesa,
        Elevation::Summit,
    ];

    /// Number of totems (lottery sides) at this elevation.
    pub fn totem_count(&self) -> u8 {
        match self {
            Elevation::Oasis => 1,
            Elevation::Plains => 2,
            Elevation::Mesa => 5,
            Elevation::Summit => 10,
            Elevation::Expedition => 1,
        }
    }

    /// Round duration multiplier. Rounds last
    /// `base_duration * duration_multiplier` seconds.
    pub fn duration_multiplier(&self) -> u64 {
        match self {
            Elevation::Oasis => 1,
            Elevation::Plains => 1,
            Elevation::Mesa => 2,
            Elevation::Summit => 4,
            Elevation::Expedition => 1,
        }
    }

    /// Emission risk multiplier in hundredths (100 = 1x), derived from the
    /// duration multiplier and capped to [1x, 3x]. The cap binds at SUMMIT
    /// (duration 4x, emission 3x).
    pub fn risk_multiplier_x100(&self) -> u64 {
        (self.duration_multiplier() * 100).clamp(100, 300)
    }

    /// Zero-based unlock order among the farm elevations. Elevations unlock
    /// sequentially: OASIS at genesis, each later tier one offset further out.
    pub fn unlock_index(&self) -> u64 {
        match self {
            Elevation::Oasis => 0,
            Elevation::Plains => 1,
            Elevation::Mesa => 2,
            Elevation::Summit => 3,
            Elevation::Expedition => 0,
        }
    }

    /// Whether this elevation runs a totem lottery (more than one totem).
    pub fn has_lottery(&self) -> bool {
        self.totem_count() > 1
    }
}

impl fmt::Display for Elevation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Elevation::Oasis => "OASIS",
            Elevation::Plains => "PLAINS",
            Elevation::Mesa => "MESA",
            Elevation::Summit => "SUMMIT",
            Elevation::Expedition => "EXPEDITION",
        };
        write!(f, "{}", name)
    }
}

/// Key identifying a pool: one staking token at one elevation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    pub token: TokenId,
    pub elevation: Elevation,
}

impl PoolKey {
    pub fn new(token: TokenId, elevation: Elevation) -> Self {
        Self { token, elevation }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", hex::encode(&self.token[..4]), self.elevation)
    }
}
