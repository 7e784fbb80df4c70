// crates/summit-rounds/src/clock.rs
//
// Per-elevation round clock.
//
// Lifecycle: Locked (before unlock_ts) -> Active(round N) -> RolloverPending
// (past end_ts) -> Active(round N+1) -> ...
//
// Elevations unlock in increasing order: OASIS at genesis, each later tier
// one fixed offset further out. A round cannot roll over before its end
// timestamp, and the final LOCKOUT_WINDOW_SECS before end_ts reject new
// deposits and totem switches so the result cannot be sniped.

use serde::{Deserialize, Serialize};

use summit_core::{Elevation, SummitError, LOCKOUT_WINDOW_SECS};

use crate::history::WinHistory;

/// Observable phase of an elevation's round clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Elevation has not reached its unlock timestamp.
    Locked,
    /// A round is in progress.
    Active,
    /// The round has ended and awaits `rollover`.
    RolloverPending,
}

/// Round clock for one elevation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundClock {
    pub elevation: Elevation,
    /// Current round number. Zero until the elevation activates; the first
    /// farmable round is 1.
    pub round_number: u64,
    pub start_ts: u64,
    pub end_ts: u64,
    /// Elevation becomes farmable at/after this timestamp.
    pub unlock_ts: u64,
    /// Seconds per round at a 1x duration multiplier.
    pub base_duration: u64,
    /// Audit trail of resolved winners.
    pub history: WinHistory,
}

impl RoundClock {
    /// Create a clock for `elevation`. `unlock_offset` is the per-tier
    /// spacing added once per unlock index on top of `genesis_ts`.
    pub fn new(elevation: Elevation, genesis_ts: u64, base_duration: u64, unlock_offset: u64) -> Self {
        Self {
            elevation,
            round_number: 0,
            start_ts: 0,
            end_ts: 0,
            unlock_ts: genesis_ts + elevation.unlock_index() * unlock_offset,
            base_duration,
            history: WinHistory::new(elevation.totem_count()),
        }
    }

    /// Round length for this elevation.
    pub fn round_duration(&self) -> u64 {
        self.base_duration * self.elevation.duration_multiplier()
    }

    /// Current phase at `now`.
    pub fn phase(&self, now: u64) -> RoundPhase {
        if self.round_number == 0 {
            return RoundPhase::Locked;
        }
        if now >= self.end_ts {
            return RoundPhase::RolloverPending;
        }
        RoundPhase::Active
    }

    /// Whether deposits and totem switches are rejected at `now`: the final
    /// lockout window of an active round, or any time past the round's end
    /// until rollover executes.
    pub fn in_lockout(&self, now: u64) -> bool {
        if self.round_number == 0 {
            return false;
        }
        now + LOCKOUT_WINDOW_SECS >= self.end_ts
    }

    /// Start round 1 if the elevation has reached its unlock timestamp.
    /// Idempotent; called lazily before any user operation.
    ///
    /// # Errors
    /// Returns `SummitError::ElevationLocked` before `unlock_ts`.
    pub fn ensure_active(&mut self, now: u64) -> Result<(), SummitError> {
        if self.round_number > 0 {
            return Ok(());
        }
        if now < self.unlock_ts {
            return Err(SummitError::ElevationLocked(format!(
                "{} unlocks at {}, now {}",
                self.elevation, self.unlock_ts, now
            )));
        }
        self.round_number = 1;
        self.start_ts = now;
        self.end_ts = now + self.round_duration();
        Ok(())
    }

    /// Close the current round with `winning_totem` and open the next one.
    /// Callable by anyone once the round has ended; the caller supplies the
    /// winner resolved by the randomness source.
    ///
    /// Returns the closed round number.
    ///
    /// # Errors
    /// Returns `SummitError::ElevationLocked` if the elevation is not yet
    /// unlocked or the round has not ended.
    pub fn rollover(&mut self, now: u64, winning_totem: u8) -> Result<u64, SummitError> {
        if self.round_number == 0 {
            return Err(SummitError::ElevationLocked(format!(
                "{} is not active",
                self.elevation
            )));
        }
        if now < self.end_ts {
            return Err(SummitError::ElevationLocked(format!(
                "{} round {} ends at {}, now {}",
                self.elevation, self.round_number, self.end_ts, now
            )));
        }

        let closed = self.round_number;
        self.history.record(closed, winning_totem);
        self.round_number = closed + 1;
        self.start_ts = self.end_ts;
        // end_ts advances strictly by whole round durations; a late rollover
        // call does not shift the schedule.
        while self.end_ts <= now {
            self.end_ts += self.round_duration();
        }
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plains_clock() -> RoundClock {
        // Genesis 10_000, 1h base rounds, 1-day unlock spacing
        RoundClock::new(Elevation::Plains, 10_000, 3_600, 86_400)
    }

    #[test]
    fn test_locked_before_unlock() {
        let mut clock = plains_clock();
        assert_eq!(clock.phase(10_000), RoundPhase::Locked);
        assert!(matches!(
            clock.ensure_active(10_000),
            Err(SummitError::ElevationLocked(_))
        ));
    }

    #[test]
    fn test_oasis_unlocks_at_genesis() {
        let mut clock = RoundClock::new(Elevation::Oasis, 10_000, 3_600, 86_400);
        assert!(clock.ensure_active(10_000).is_ok());
        assert_eq!(clock.round_number, 1);
    }

    #[test]
    fn test_activation_starts_round_one() {
        let mut clock = plains_clock();
        let unlock = clock.unlock_ts;
        clock.ensure_active(unlock).unwrap();
        assert_eq!(clock.round_number, 1);
        assert_eq!(clock.end_ts, unlock + 3_600);
        assert_eq!(clock.phase(unlock), RoundPhase::Active);
    }

    #[test]
    fn test_ensure_active_idempotent() {
        let mut clock = plains_clock();
        let unlock = clock.unlock_ts;
        clock.ensure_active(unlock).unwrap();
        let end = clock.end_ts;
        clock.ensure_active(unlock + 100).unwrap();
        assert_eq!(clock.end_ts, end);
    }

    #[test]
    fn test_rollover_rejected_before_end() {
        let mut clock = plains_clock();
        clock.ensure_active(clock.unlock_ts).unwrap();
        let result = clock.rollover(clock.end_ts - 1, 0);
        assert!(matches!(result, Err(SummitError::ElevationLocked(_))));
    }

    #[test]
    fn test_rollover_advances_round_and_schedule() {
        let mut clock = plains_clock();
        clock.ensure_active(clock.unlock_ts).unwrap();
        let end = clock.end_ts;

        let closed = clock.rollover(end, 1).unwrap();
        assert_eq!(closed, 1);
        assert_eq!(clock.round_number, 2);
        assert_eq!(clock.start_ts, end);
        assert_eq!(clock.end_ts, end + 3_600);
        assert_eq!(clock.history.winner_of(1), Some(1));
    }

    #[test]
    fn test_late_rollover_keeps_schedule_aligned() {
        let mut clock = plains_clock();
        clock.ensure_active(clock.unlock_ts).unwrap();
        let end = clock.end_ts;

        // Rollover arrives 2.5 rounds late; end_ts lands on the next future
        // boundary of the original schedule.
        clock.rollover(end + 9_000, 0).unwrap();
        assert_eq!(clock.end_ts, end + 3_600 * 3);
    }

    #[test]
    fn test_lockout_window() {
        let mut clock = plains_clock();
        clock.ensure_active(clock.unlock_ts).unwrap();
        let end = clock.end_ts;

        assert!(!clock.in_lockout(end - 121));
        assert!(clock.in_lockout(end - 120));
        assert!(clock.in_lockout(end - 1));
        // Still locked out after end until rollover runs
        assert!(clock.in_lockout(end + 50));
    }

    #[test]
    fn test_phase_rollover_pending_after_end() {
        let mut clock = plains_clock();
        clock.ensure_active(clock.unlock_ts).unwrap();
        assert_eq!(clock.phase(clock.end_ts), RoundPhase::RolloverPending);
    }

    #[test]
    fn test_summit_rounds_run_longer() {
        let clock = RoundClock::new(Elevation::Summit, 0, 3_600, 86_400);
        assert_eq!(clock.round_duration(), 4 * 3_600);
        assert_eq!(clock.unlock_ts, 3 * 86_400);
    }
}
