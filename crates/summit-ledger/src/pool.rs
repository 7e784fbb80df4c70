// crates/summit-ledger/src/pool.rs
//
// Per-(token, elevation) pool ledger.
//
// During a round the pool accrues emission into:
//   - `round_rewards`: the absolute reward accrued this round (the pot R).
//   - `round_acc`: a per-share accumulator (scaled by ACC_SCALE) that every
//     staked unit earns at the same rate regardless of totem, because
//     emission is apportioned across totems by current supply share.
//   - `totem_contrib[i]`: each totem's absolute contributed yield, folded
//     from `round_acc` only when the totem's supply changes (and once at
//     settlement), never per accrual step. Each fold covers the whole span
//     since the totem's `totem_acc_mark` and rounds up, so the totem total
//     is always at least the sum of its members' individually floored
//     contributions and the winner multiplier derived from it can never pay
//     out more than the pot.
//
// At rollover the full pot goes to the winning totem's participants,
// weighted by contributed yield. The per-round `RoundSettlement` record and
// the cumulative `cum_winnings` per-share series let a user who was dormant
// for any number of rounds settle in O(1) at their next interaction.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use summit_core::{PoolKey, SummitError, ACC_SCALE};

/// Closing record for one resolved round, consulted by lazy per-user
/// settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSettlement {
    /// Totem declared winning for this round.
    pub winning_totem: u8,
    /// Scaled winnings per unit of contributed yield. Zero when the round's
    /// pot was carried over (winning totem had no participants).
    pub win_mult: u128,
    /// Value of `round_acc` when the round closed.
    pub closing_acc: u128,
    /// Snapshot of `cum_winnings` immediately after this round closed.
    pub cum_after: Vec<u128>,
}

/// Result of settling one round on one pool, reported to the caller for
/// event emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOutcome {
    /// The round that was closed.
    pub round: u64,
    pub winning_totem: u8,
    /// Reward distributed to the winning totem's participants.
    pub distributed: u64,
    /// Reward carried into the next round (zero-participant winner).
    pub carried: u64,
}

/// Pool ledger for one staking token at one elevation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub key: PoolKey,
    /// Whether the pool is currently accruing emission. A pool that exists
    /// but is not live keeps its balances and settles normally.
    pub live: bool,
    /// Sum of all user stakes. Invariant: equals the sum of `totem_supplies`.
    pub total_supply: u64,
    /// Per-totem staked sums.
    pub totem_supplies: Vec<u64>,
    /// Absolute reward accrued in the current, not-yet-resolved round.
    pub round_rewards: u64,
    /// Per-totem contributed yield folded so far this round. Complete only
    /// after `fold_totem`; use `totem_round_yield` for a current view.
    pub totem_contrib: Vec<u64>,
    /// `round_acc` value at each totem's last fold.
    pub totem_acc_mark: Vec<u128>,
    /// Scaled per-share yield accumulator for the current round. Reset to
    /// zero at every rollover.
    pub round_acc: u128,
    /// Pot retained from rounds whose winning totem had no participants.
    pub carryover: u64,
    /// Cumulative winnings-per-share per totem across all closed rounds,
    /// scaled by ACC_SCALE.
    pub cum_winnings: Vec<u128>,
    /// Closing records keyed by round number. Required for lazy settlement
    /// of users who skipped interactions across rounds.
    pub settlements: HashMap<u64, RoundSettlement>,
    pub last_update_ts: u64,
    /// Round the pool is currently accruing into; advances at settlement.
    pub current_round: u64,
}

impl Pool {
    /// Create a pool at the given key, opening into `current_round`.
    pub fn new(key: PoolKey, now: u64, current_round: u64) -> Self {
        let totems = key.elevation.totem_count() as usize;
        Self {
            key,
            live: true,
            total_supply: 0,
            totem_supplies: vec![0; totems],
            round_rewards: 0,
            totem_contrib: vec![0; totems],
            totem_acc_mark: vec![0; totems],
            round_acc: 0,
            carryover: 0,
            cum_winnings: vec![0; totems],
            settlements: HashMap::new(),
            last_update_ts: now,
            current_round,
        }
    }

    /// Number of totems at this pool's elevation.
    pub fn totem_count(&self) -> u8 {
        self.key.elevation.totem_count()
    }

    /// Accrue emission from `last_update_ts` to `now` at `rate_per_sec`
    /// micro-units per second. Totem contributions are not touched here;
    /// they fold lazily per supply span so repeated accrual cannot compound
    /// truncation.
    pub fn accrue(&mut self, now: u64, rate_per_sec: u64) {
        if now <= self.last_update_ts {
            return;
        }
        let elapsed = now - self.last_update_ts;
        self.last_update_ts = now;

        if !self.live || self.total_supply == 0 || rate_per_sec == 0 {
            return;
        }

        let emitted = (rate_per_sec as u128).saturating_mul(elapsed as u128);
        let acc_inc = emitted.saturating_mul(ACC_SCALE) / self.total_supply as u128;
        self.round_acc += acc_inc;
        self.round_rewards = self.round_rewards.saturating_add(emitted.min(u64::MAX as u128) as u64);
    }

    /// Fold a totem's contributed yield over the span since its last fold
    /// and advance its mark. The fold rounds up; see the module header.
    fn fold_totem(&mut self, totem: usize) {
        let delta = self.round_acc - self.totem_acc_mark[totem];
        self.totem_acc_mark[totem] = self.round_acc;
        let supply = self.totem_supplies[totem];
        if delta == 0 || supply == 0 {
            return;
        }
        let share = (supply as u128 * delta + ACC_SCALE - 1) / ACC_SCALE;
        self.totem_contrib[totem] = self.totem_contrib[totem]
            .saturating_add(share.min(u64::MAX as u128) as u64);
    }

    /// A totem's contributed yield in the open round, including the span
    /// not yet folded. View only.
    pub fn totem_round_yield(&self, totem: u8) -> u64 {
        let t = totem as usize;
        let delta = self.round_acc - self.totem_acc_mark[t];
        let pending = (self.totem_supplies[t] as u128 * delta + ACC_SCALE - 1) / ACC_SCALE;
        self.totem_contrib[t].saturating_add(pending.min(u64::MAX as u128) as u64)
    }

    /// Close the current round with `winning_totem` and open the next one.
    ///
    /// The full pot (this round's rewards plus any carryover) is booked to
    /// the winning totem's cumulative winnings series, weighted per unit of
    /// contributed yield. If the winning totem contributed nothing, the pot
    /// carries into the next round instead of dividing by zero.
    ///
    /// # Errors
    /// Returns `SummitError::InvalidTotem` if the totem index is out of range.
    pub fn settle_round(&mut self, winning_totem: u8) -> Result<RoundOutcome, SummitError> {
        if winning_totem >= self.totem_count() {
            return Err(SummitError::InvalidTotem(format!(
                "totem {} out of range for {} (count {})",
                winning_totem,
                self.key.elevation,
                self.totem_count()
            )));
        }

        for t in 0..self.totem_supplies.len() {
            self.fold_totem(t);
        }

        let pot = self.round_rewards.saturating_add(self.carryover);
        let contrib = self.totem_contrib[winning_totem as usize];

        let (win_mult, distributed, carried) = if contrib == 0 {
            (0u128, 0u64, pot)
        } else {
            (pot as u128 * ACC_SCALE / contrib as u128, pot, 0u64)
        };

        if win_mult > 0 {
            self.cum_winnings[winning_totem as usize] +=
                self.round_acc * win_mult / ACC_SCALE;
        }

        let closed = self.current_round;
        self.settlements.insert(
            closed,
            RoundSettlement {
                winning_totem,
                win_mult,
                closing_acc: self.round_acc,
                cum_after: self.cum_winnings.clone(),
            },
        );

        self.round_acc = 0;
        self.round_rewards = 0;
        self.totem_contrib.iter_mut().for_each(|r| *r = 0);
        self.totem_acc_mark.iter_mut().for_each(|m| *m = 0);
        self.carryover = carried;
        self.current_round = closed + 1;

        Ok(RoundOutcome {
            round: closed,
            winning_totem,
            distributed,
            carried,
        })
    }

    /// Add stake to a totem column. Caller settles the position first.
    pub fn add_stake(&mut self, totem: u8, amount: u64) {
        self.fold_totem(totem as usize);
        self.totem_supplies[totem as usize] += amount;
        self.total_supply += amount;
    }

    /// Remove stake from a totem column.
    ///
    /// # Errors
    /// Returns `SummitError::InvalidState` if the totem column holds less
    /// than `amount` — the caller validates user balances before this point,
    /// so a shortfall here is a ledger inconsistency.
    pub fn remove_stake(&mut self, totem: u8, amount: u64) -> Result<(), SummitError> {
        self.fold_totem(totem as usize);
        let supply = self.totem_supplies[totem as usize];
        let remaining = supply.checked_sub(amount).ok_or_else(|| {
            SummitError::InvalidState(format!(
                "totem {} supply {} cannot cover removal of {}",
                totem, supply, amount
            ))
        })?;
        self.totem_supplies[totem as usize] = remaining;
        self.total_supply -= amount;
        Ok(())
    }

    /// Atomically move a user's full stake and current-round contributed
    /// yield between totem columns. Zero net change to `total_supply`.
    pub fn move_stake(
        &mut self,
        from: u8,
        to: u8,
        amount: u64,
        contrib: u64,
    ) -> Result<(), SummitError> {
        if from >= self.totem_count() || to >= self.totem_count() {
            return Err(SummitError::InvalidTotem(format!(
                "switch {} -> {} out of range for {}",
                from,
                to,
                self.key.elevation
            )));
        }
        self.remove_stake(from, amount)?;
        self.add_stake(to, amount);
        let src = &mut self.totem_contrib[from as usize];
        *src = src.saturating_sub(contrib);
        self.totem_contrib[to as usize] =
            self.totem_contrib[to as usize].saturating_add(contrib);
        Ok(())
    }

    /// Drop closing records below `watermark`. A record for round R is only
    /// consulted by positions whose last interaction was in round R, so any
    /// round below the oldest live anchor is unreachable. Returns the number
    /// of records removed.
    pub fn prune_settlements(&mut self, watermark: u64) -> usize {
        let before = self.settlements.len();
        self.settlements.retain(|round, _| *round >= watermark);
        before - self.settlements.len()
    }

    /// Whether `Σ totem_supplies == total_supply` holds.
    pub fn supplies_consistent(&self) -> bool {
        self.totem_supplies.iter().sum::<u64>() == self.total_supply
    }
}
