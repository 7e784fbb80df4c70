// crates/summit-ledger/src/position.rs
//
// Per-(token, elevation, user) position store with lazy settlement.
//
// A position carries the standard accrual-ledger debt snapshot plus the
// round-scoped "contributed yield" that weighs the user inside their totem
// when the round resolves. Settlement across any number of skipped rounds
// is O(1): the partially observed round is finished from its stored
// `RoundSettlement`, and every fully staked round in between is credited in
// one subtraction against the pool's cumulative winnings-per-share series.

use serde::{Deserialize, Serialize};

use summit_core::{SummitError, ACC_SCALE};

use crate::pool::Pool;

/// A user's stake and accrual state in one pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPosition {
    /// Staked amount in micro-units.
    pub staked: u64,
    /// Snapshot of the pool's `round_acc` at the last interaction.
    pub debt: u128,
    /// Yield contributed so far in the round of the last interaction.
    pub round_contrib: u64,
    /// Selected totem. Meaningless until `totem_selected`.
    pub totem: u8,
    /// A totem must be chosen before the first deposit at lottery
    /// elevations and changes only through an explicit switch.
    pub totem_selected: bool,
    /// Round of the last interaction.
    pub last_round: u64,
    /// Winnings settled from closed rounds but not yet harvested.
    pub claimable: u64,
    /// Timestamp of the most recent deposit; drives withdrawal-tax decay.
    /// Reset for the whole position on every deposit.
    pub last_deposit_ts: u64,
}

impl UserPosition {
    /// Open an empty position against the pool's current round.
    pub fn open(pool: &Pool) -> Self {
        Self {
            staked: 0,
            debt: pool.round_acc,
            round_contrib: 0,
            totem: 0,
            totem_selected: false,
            last_round: pool.current_round,
            claimable: 0,
            last_deposit_ts: 0,
        }
    }

    /// Yield contributed in the pool's current round, including the portion
    /// accrued since the last interaction. View only.
    pub fn round_yield(&self, pool: &Pool) -> u64 {
        if self.last_round != pool.current_round {
            // The open round started after the last interaction; the stake
            // has been earning since the round opened.
            return (self.staked as u128 * pool.round_acc / ACC_SCALE) as u64;
        }
        self.round_contrib
            + (self.staked as u128 * (pool.round_acc - self.debt) / ACC_SCALE) as u64
    }

    /// Winnings claimable right now plus winnings that settlement would
    /// credit from closed rounds. View only; the open round pays nothing
    /// until it resolves.
    pub fn pending(&self, pool: &Pool) -> Result<u64, SummitError> {
        let mut total = self.claimable;
        if self.last_round < pool.current_round {
            let (won, interim) = self.closed_round_credits(pool)?;
            total = total.saturating_add(won).saturating_add(interim);
        }
        Ok(total)
    }

    /// Bring the position up to the pool's current round, crediting all
    /// winnings from rounds closed since the last interaction into
    /// `claimable`. Must be called (after `Pool::accrue`) before any stake
    /// mutation — harvest-on-touch.
    ///
    /// # Errors
    /// Returns `SummitError::NotFound` if the settlement record for the
    /// user's last interacted round is missing, which would indicate ledger
    /// corruption.
    pub fn settle(&mut self, pool: &Pool) -> Result<(), SummitError> {
        if self.last_round < pool.current_round {
            let (won, interim) = self.closed_round_credits(pool)?;
            self.claimable = self.claimable.saturating_add(won).saturating_add(interim);
            // Re-anchor in the open round: the stake has been present since
            // the round opened, so its contribution so far is staked shares
            // against the full open-round accumulator.
            self.round_contrib = (self.staked as u128 * pool.round_acc / ACC_SCALE) as u64;
            self.debt = pool.round_acc;
            self.last_round = pool.current_round;
        } else {
            self.round_contrib +=
                (self.staked as u128 * (pool.round_acc - self.debt) / ACC_SCALE) as u64;
            self.debt = pool.round_acc;
        }
        Ok(())
    }

    /// Credits owed from rounds closed since `last_round`: the winnings of
    /// the partially observed round (if the user's totem won it) and the
    /// fully staked rounds after it.
    fn closed_round_credits(&self, pool: &Pool) -> Result<(u64, u64), SummitError> {
        let settlement = pool.settlements.get(&self.last_round).ok_or_else(|| {
            SummitError::NotFound(format!(
                "settlement record for round {} missing on pool {}",
                self.last_round, pool.key
            ))
        })?;

        // Finish the round the user last interacted in.
        let contrib = self.round_contrib as u128
            + self.staked as u128 * (settlement.closing_acc - self.debt) / ACC_SCALE;
        let won = if self.totem_selected && settlement.winning_totem == self.totem {
            (contrib * settlement.win_mult / ACC_SCALE) as u64
        } else {
            0
        };

        // Rounds fully staked through: one delta against the cumulative
        // winnings-per-share series for the user's totem.
        let interim = if self.totem_selected {
            let t = self.totem as usize;
            (self.staked as u128 * (pool.cum_winnings[t] - settlement.cum_after[t]) / ACC_SCALE)
                as u64
        } else {
            0
        };

        Ok((won, interim))
    }

    /// Drain settled winnings for payout.
    pub fn take_claimable(&mut self) -> u64 {
        std::mem::take(&mut self.claimable)
    }
}
