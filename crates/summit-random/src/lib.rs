// crates/summit-random/src/lib.rs
//
// summit-random: Commit-reveal randomness source for round resolution.
//
// The trusted seeder first submits a sealed seed, keccak(preimage ‖ seeder),
// together with a future time marker at least one tick ahead. Once the
// marker passes, the seeder submits the preimage; it must hash back to the
// seal, and the resolved seed mixes the preimage with the marker so the
// seeder cannot fully control the output it committed to.
//
// Rollover is fail-closed: a round can only be closed against a seed
// resolved at or after that round's end timestamp, so nobody can predict a
// round's winner while the round is still open. If the seeder misses a
// cycle, rollover blocks until the next cycle completes.

pub mod seeder;

pub use seeder::{RandomnessSource, ResolvedSeed, SeedPhase};
