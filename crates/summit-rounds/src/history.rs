// crates/summit-rounds/src/history.rs
//
// Winning-totem history: a bounded ring of recent winners for auditability
// plus cumulative per-totem win counters that never truncate.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Number of recent winners retained in the ring buffer.
pub const HISTORY_DEPTH: usize = 10;

/// Audit trail of resolved rounds at one elevation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinHistory {
    /// Last `HISTORY_DEPTH` resolved rounds, oldest first: (round, totem).
    recent: VecDeque<(u64, u8)>,
    /// Cumulative win count per totem since genesis.
    wins: Vec<u64>,
}

impl WinHistory {
    pub fn new(totem_count: u8) -> Self {
        Self {
            recent: VecDeque::with_capacity(HISTORY_DEPTH),
            wins: vec![0; totem_count as usize],
        }
    }

    /// Record a resolved round. Evicts the oldest entry past the depth cap.
    pub fn record(&mut self, round: u64, totem: u8) {
        if self.recent.len() == HISTORY_DEPTH {
            self.recent.pop_front();
        }
        self.recent.push_back((round, totem));
        if let Some(count) = self.wins.get_mut(totem as usize) {
            *count += 1;
        }
    }

    /// Winner of a specific round, if still inside the retained window.
    pub fn winner_of(&self, round: u64) -> Option<u8> {
        self.recent
            .iter()
            .find(|(r, _)| *r == round)
            .map(|(_, t)| *t)
    }

    /// Recent winners, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = (u64, u8)> + '_ {
        self.recent.iter().copied()
    }

    /// Cumulative wins for a totem.
    pub fn wins(&self, totem: u8) -> u64 {
        self.wins.get(totem as usize).copied().unwrap_or(0)
    }
}
