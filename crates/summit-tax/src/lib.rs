// crates/summit-tax/src/lib.rs
//
// summit-tax: Time-decaying withdrawal tax.
//
// Effective tax = max(base_minimum_bp, configured_bp * decay), where decay
// shrinks linearly from 1 to 0 over `decay_duration` seconds measured from
// the user's most recent deposit into that pool. Every new deposit resets
// the decay clock for the whole position, not just the increment — a
// documented policy choice preserved from the reference behavior.
//
// The base minimum must stay inside [1%, 10%] (100 to 1000 basis points).
// Tax proceeds are routed to the treasury by the engine.

use serde::{Deserialize, Serialize};

use summit_core::{SummitError, BP_DENOM};

/// Lowest permitted base minimum tax: 1%.
pub const MIN_BASE_TAX_BP: u16 = 100;

/// Highest permitted base minimum tax: 10%.
pub const MAX_BASE_TAX_BP: u16 = 1_000;

/// Withdrawal tax parameters, fixed at construction and adjustable through
/// the engine's governance setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSchedule {
    /// Tax in basis points applied to a withdrawal immediately after a
    /// deposit, before any decay.
    pub configured_bp: u16,
    /// Floor the tax decays down to, in basis points.
    pub base_minimum_bp: u16,
    /// Seconds over which the configured tax decays linearly to zero
    /// (leaving the floor in effect).
    pub decay_duration: u64,
}

impl TaxSchedule {
    /// Build a schedule, validating the base-minimum band.
    ///
    /// # Errors
    /// Returns `SummitError::InvalidFeeBounds` if `base_minimum_bp` is
    /// outside [1%, 10%], exceeds `configured_bp`, or if `configured_bp`
    /// exceeds 100%.
    pub fn new(
        configured_bp: u16,
        base_minimum_bp: u16,
        decay_duration: u64,
    ) -> Result<Self, SummitError> {
        if !(MIN_BASE_TAX_BP..=MAX_BASE_TAX_BP).contains(&base_minimum_bp) {
            return Err(SummitError::InvalidFeeBounds(format!(
                "base minimum {} bp outside [{}, {}]",
                base_minimum_bp, MIN_BASE_TAX_BP, MAX_BASE_TAX_BP
            )));
        }
        if configured_bp > BP_DENOM as u16 {
            return Err(SummitError::InvalidFeeBounds(format!(
                "configured {} bp exceeds {} bp (100%)",
                configured_bp, BP_DENOM
            )));
        }
        if configured_bp < base_minimum_bp {
            return Err(SummitError::InvalidFeeBounds(format!(
                "configured {} bp below base minimum {} bp",
                configured_bp, base_minimum_bp
            )));
        }
        Ok(Self {
            configured_bp,
            base_minimum_bp,
            decay_duration,
        })
    }

    /// Effective tax in basis points at `now` for a position whose most
    /// recent deposit landed at `last_deposit_ts`. Non-increasing in time;
    /// equals the floor at/after `decay_duration`.
    pub fn tax_bp(&self, now: u64, last_deposit_ts: u64) -> u16 {
        let elapsed = now.saturating_sub(last_deposit_ts);
        if self.decay_duration == 0 || elapsed >= self.decay_duration {
            return self.base_minimum_bp;
        }
        let remaining = self.decay_duration - elapsed;
        let decayed =
            (self.configured_bp as u64 * remaining / self.decay_duration) as u16;
        decayed.max(self.base_minimum_bp)
    }

    /// Split a withdrawal into (net, tax) at `now`.
    pub fn apply(&self, amount: u64, now: u64, last_deposit_ts: u64) -> (u64, u64) {
        let bp = self.tax_bp(now, last_deposit_ts) as u64;
        let tax = (amount as u128 * bp as u128 / BP_DENOM as u128) as u64;
        (amount - tax, tax)
    }
}
