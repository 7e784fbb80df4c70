// crates/summit-engine/src/emission.rs
//
// Emission split across tokens and elevations.
//
// Each pool's per-second rate is
//   base_per_sec * token_allocation / total_allocation * risk_multiplier
// with the risk multiplier derived from the elevation's duration multiplier
// and capped to [1x, 3x] (longer, riskier elevations emit more per unit
// stake to compensate for lottery variance). All factors multiply before
// the single final division.

use summit_core::Elevation;

/// Per-second emission rate for one pool, in reward micro-units.
///
/// Returns 0 when the token has no allocation or nothing is allocated at
/// all.
pub fn pool_rate(
    base_per_sec: u64,
    token_allocation: u64,
    total_allocation: u64,
    elevation: Elevation,
) -> u64 {
    if token_allocation == 0 || total_allocation == 0 {
        return 0;
    }
    let mult = elevation.risk_multiplier_x100() as u128;
    let numerator = base_per_sec as u128 * token_allocation as u128 * mult;
    (numerator / (total_allocation as u128 * 100)) as u64
}
