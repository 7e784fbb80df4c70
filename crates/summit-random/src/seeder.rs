// crates/summit-random/src/seeder.rs

use serde::{Deserialize, Serialize};

use summit_core::{keccak256, resolve_seed, seal_seed, Address, Elevation, SummitError};

/// Commit-reveal lifecycle of the current seed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedPhase {
    /// No seal pending; the seeder may commit.
    AwaitingSeal,
    /// A sealed seed is pending its reveal.
    Sealed {
        seal: [u8; 32],
        sealed_at: u64,
        /// Timestamp the reveal must wait for.
        marker: u64,
    },
}

/// A successfully revealed seed, retained for draws until superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSeed {
    pub seed: [u8; 32],
    /// When the reveal landed. A round ending at T draws only from a seed
    /// with `resolved_at >= T`.
    pub resolved_at: u64,
}

/// Commit-reveal randomness source. One instance serves every elevation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomnessSource {
    seeder: Address,
    phase: SeedPhase,
    latest: Option<ResolvedSeed>,
}

impl RandomnessSource {
    pub fn new(seeder: Address) -> Self {
        Self {
            seeder,
            phase: SeedPhase::AwaitingSeal,
            latest: None,
        }
    }

    pub fn phase(&self) -> &SeedPhase {
        &self.phase
    }

    pub fn latest(&self) -> Option<&ResolvedSeed> {
        self.latest.as_ref()
    }

    pub fn seeder(&self) -> &Address {
        &self.seeder
    }

    /// Rotate the trusted seeder. Idempotent: re-setting the current seeder
    /// is a no-op so a governance replay cannot fail.
    ///
    /// A seal pending under the old seeder is discarded: its commitment
    /// binds the old seeder's address, so it could never be revealed and
    /// would otherwise block the cycle forever.
    pub fn set_seeder(&mut self, seeder: Address) {
        if self.seeder == seeder {
            return;
        }
        self.seeder = seeder;
        self.phase = SeedPhase::AwaitingSeal;
    }

    /// Accept a sealed seed from the trusted seeder.
    ///
    /// # Errors
    /// - `Unauthorized` unless `caller` is the trusted seeder.
    /// - `AlreadySealed` if a seal is already pending.
    /// - `InvalidState` unless `marker` is strictly in the future.
    pub fn receive_sealed_seed(
        &mut self,
        caller: &Address,
        seal: [u8; 32],
        now: u64,
        marker: u64,
    ) -> Result<(), SummitError> {
        if *caller != self.seeder {
            return Err(SummitError::Unauthorized(
                "only the trusted seeder may seal".to_string(),
            ));
        }
        if !matches!(self.phase, SeedPhase::AwaitingSeal) {
            return Err(SummitError::AlreadySealed);
        }
        if marker <= now {
            return Err(SummitError::InvalidState(format!(
                "future marker {} must be past now {}",
                marker, now
            )));
        }
        self.phase = SeedPhase::Sealed {
            seal,
            sealed_at: now,
            marker,
        };
        Ok(())
    }

    /// Accept the unsealed preimage, verify it against the seal, and derive
    /// the resolved seed. On success the cycle resets so the next seal can
    /// be committed.
    ///
    /// # Errors
    /// - `Unauthorized` unless `caller` is the trusted seeder.
    /// - `InvalidState` if nothing is sealed.
    /// - `FutureMarkerNotReached` before the committed marker.
    /// - `UnsealedMismatch` if the preimage does not hash to the seal.
    pub fn receive_unsealed_seed(
        &mut self,
        caller: &Address,
        preimage: [u8; 32],
        now: u64,
    ) -> Result<ResolvedSeed, SummitError> {
        if *caller != self.seeder {
            return Err(SummitError::Unauthorized(
                "only the trusted seeder may unseal".to_string(),
            ));
        }
        let (seal, marker) = match self.phase {
            SeedPhase::Sealed { seal, marker, .. } => (seal, marker),
            SeedPhase::AwaitingSeal => {
                return Err(SummitError::InvalidState(
                    "no sealed seed pending".to_string(),
                ))
            }
        };
        if now < marker {
            return Err(SummitError::FutureMarkerNotReached(format!(
                "marker {}, now {}",
                marker, now
            )));
        }
        if seal_seed(&preimage, &self.seeder) != seal {
            return Err(SummitError::UnsealedMismatch);
        }

        let resolved = ResolvedSeed {
            seed: resolve_seed(&preimage, marker),
            resolved_at: now,
        };
        self.latest = Some(resolved);
        self.phase = SeedPhase::AwaitingSeal;
        Ok(resolved)
    }

    /// Draw the winning totem for a round that ended at `round_end`.
    ///
    /// The draw hashes the resolved seed with the elevation and round so
    /// elevations sharing a seed cycle get independent winners, then reduces
    /// modulo the totem count for a uniform result.
    ///
    /// # Errors
    /// Returns `SummitError::RoundNotSeeded` unless a seed was resolved at
    /// or after `round_end` — winners must never be drawable mid-round.
    pub fn draw(
        &self,
        elevation: Elevation,
        round: u64,
        round_end: u64,
    ) -> Result<u8, SummitError> {
        let resolved = self
            .latest
            .filter(|r| r.resolved_at >= round_end)
            .ok_or_else(|| {
                SummitError::RoundNotSeeded(format!(
                    "{} round {} (ended {}) has no seed resolved at/after end",
                    elevation, round, round_end
                ))
            })?;

        let mut buf = [0u8; 41];
        buf[..32].copy_from_slice(&resolved.seed);
        buf[32..40].copy_from_slice(&round.to_be_bytes());
        buf[40] = elevation.unlock_index() as u8;
        let digest = keccak256(&buf);
        let mut word_bytes = [0u8; 8];
        word_bytes.copy_from_slice(&digest[..8]);
        let word = u64::from_be_bytes(word_bytes);
        Ok((word % elevation.totem_count() as u64) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEEDER: Address = [7u8; 32];
    const STRANGER: Address = [9u8; 32];

    fn sealed_source(preimage: [u8; 32], now: u64, marker: u64) -> RandomnessSource {
        let mut source = RandomnessSource::new(SEEDER);
        let seal = seal_seed(&preimage, &SEEDER);
        source.receive_sealed_seed(&SEEDER, seal, now, marker).unwrap();
        source
    }

    #[test]
    fn test_full_cycle_resolves() {
        let preimage = [42u8; 32];
        let mut source = sealed_source(preimage, 100, 160);

        let resolved = source.receive_unsealed_seed(&SEEDER, preimage, 200).unwrap();
        assert_eq!(resolved.resolved_at, 200);
        assert_eq!(source.phase(), &SeedPhase::AwaitingSeal);
        assert_eq!(source.latest(), Some(&resolved));
    }

    #[test]
    fn test_seal_requires_trusted_seeder() {
        let mut source = RandomnessSource::new(SEEDER);
        let result = source.receive_sealed_seed(&STRANGER, [0u8; 32], 100, 160);
        assert!(matches!(result, Err(SummitError::Unauthorized(_))));
    }

    #[test]
    fn test_double_seal_rejected() {
        let mut source = sealed_source([1u8; 32], 100, 160);
        let result = source.receive_sealed_seed(&SEEDER, [0u8; 32], 110, 170);
        assert!(matches!(result, Err(SummitError::AlreadySealed)));
    }

    #[test]
    fn test_rotation_discards_pending_seal() {
        let mut source = sealed_source([1u8; 32], 100, 160);
        source.set_seeder(STRANGER);
        // The old seal bound the old seeder's address; the new seeder
        // starts a fresh cycle instead of being blocked by it.
        assert_eq!(source.phase(), &SeedPhase::AwaitingSeal);
        let seal = seal_seed(&[2u8; 32], &STRANGER);
        source
            .receive_sealed_seed(&STRANGER, seal, 110, 170)
            .unwrap();
    }

    #[test]
    fn test_marker_must_be_future() {
        let mut source = RandomnessSource::new(SEEDER);
        let result = source.receive_sealed_seed(&SEEDER, [0u8; 32], 100, 100);
        assert!(matches!(result, Err(SummitError::InvalidState(_))));
    }

    #[test]
    fn test_unseal_before_marker_rejected() {
        let preimage = [42u8; 32];
        let mut source = sealed_source(preimage, 100, 160);
        let result = source.receive_unsealed_seed(&SEEDER, preimage, 159);
        assert!(matches!(result, Err(SummitError::FutureMarkerNotReached(_))));
    }

    #[test]
    fn test_unseal_mismatch_rejected() {
        let mut source = sealed_source([42u8; 32], 100, 160);
        let result = source.receive_unsealed_seed(&SEEDER, [43u8; 32], 200);
        assert!(matches!(result, Err(SummitError::UnsealedMismatch)));
        // The seal stays pending so the correct preimage can still land
        assert!(matches!(source.phase(), SeedPhase::Sealed { .. }));
    }

    #[test]
    fn test_draw_requires_seed_after_round_end() {
        let preimage = [42u8; 32];
        let mut source = sealed_source(preimage, 100, 160);
        source.receive_unsealed_seed(&SEEDER, preimage, 200).unwrap();

        // Round ended before resolution: fine
        assert!(source.draw(Elevation::Plains, 1, 200).is_ok());
        // Round ends after resolution: fail closed
        assert!(matches!(
            source.draw(Elevation::Plains, 2, 201),
            Err(SummitError::RoundNotSeeded(_))
        ));
    }

    #[test]
    fn test_draw_unseeded_fails() {
        let source = RandomnessSource::new(SEEDER);
        assert!(matches!(
            source.draw(Elevation::Plains, 1, 0),
            Err(SummitError::RoundNotSeeded(_))
        ));
    }

    #[test]
    fn test_draw_in_range_and_deterministic() {
        let preimage = [42u8; 32];
        let mut source = sealed_source(preimage, 100, 160);
        source.receive_unsealed_seed(&SEEDER, preimage, 200).unwrap();

        for round in 1..50u64 {
            let winner = source.draw(Elevation::Summit, round, 150).unwrap();
            assert!(winner < 10);
            assert_eq!(winner, source.draw(Elevation::Summit, round, 150).unwrap());
        }
    }

    #[test]
    fn test_draw_varies_across_rounds() {
        let preimage = [42u8; 32];
        let mut source = sealed_source(preimage, 100, 160);
        source.receive_unsealed_seed(&SEEDER, preimage, 200).unwrap();

        let winners: Vec<u8> = (1..30u64)
            .map(|r| source.draw(Elevation::Summit, r, 150).unwrap())
            .collect();
        assert!(winners.iter().any(|w| *w != winners[0]));
    }
}
