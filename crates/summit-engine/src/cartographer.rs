// crates/summit-engine/src/cartographer.rs
//
// The Cartographer orchestrates every user-facing operation: deposit,
// withdraw, harvest, totem switch, cross-compound, and round rollover. It
// exclusively owns Pool and UserPosition mutation, queries the round clocks
// for gating, and consumes the randomness source's resolved draws.
//
// Discipline throughout: checks first (no state mutated on a precondition
// failure), then ledger effects, then external adapter interactions last.
// Adapter failures after the ledger is committed are absorbed and surfaced
// as events, never allowed to freeze user funds.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use summit_core::{Address, Clock, Elevation, PoolKey, SummitError, TokenId};
use summit_ledger::{Pool, UserPosition};
use summit_random::RandomnessSource;
use summit_rounds::RoundClock;
use summit_tax::TaxSchedule;

use crate::adapters::PassthroughAdapter;
use crate::emission;
use crate::events::LedgerEvent;
use crate::treasury::Treasury;

/// Engine construction parameters. All governance-adjustable values start
/// here; setters are owner-gated and idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub owner: Address,
    pub seeder: Address,
    /// Timestamp the OASIS elevation unlocks; later tiers follow at
    /// `unlock_offset` spacing.
    pub genesis_ts: u64,
    /// Seconds per round at a 1x duration multiplier.
    pub base_round_duration: u64,
    /// Spacing between consecutive elevation unlocks.
    pub unlock_offset: u64,
    /// Total emission per second before allocation and risk scaling.
    pub base_emission_per_sec: u64,
    pub tax: TaxSchedule,
}

/// Outcome of a withdrawal: the taxed split plus harvest-on-touch winnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawReceipt {
    pub net: u64,
    pub tax: u64,
    pub harvested: u64,
}

/// Outcome of one elevation rollover across all its pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolloverSummary {
    pub elevation: Elevation,
    /// The round that was closed.
    pub round: u64,
    pub winning_totem: u8,
    /// Total reward distributed across the elevation's pools.
    pub distributed: u64,
    /// Total reward carried over (pools whose winning totem was empty).
    pub carried: u64,
}

/// The redistribution engine.
pub struct Cartographer {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    pools: HashMap<PoolKey, Pool>,
    positions: HashMap<(PoolKey, Address), UserPosition>,
    round_clocks: HashMap<Elevation, RoundClock>,
    randomness: RandomnessSource,
    allocations: HashMap<TokenId, u64>,
    total_allocation: u64,
    adapters: HashMap<TokenId, Box<dyn PassthroughAdapter>>,
    treasury: Treasury,
    events: Vec<LedgerEvent>,
}

impl Cartographer {
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let mut round_clocks = HashMap::new();
        for elevation in Elevation::FARM_ELEVATIONS {
            round_clocks.insert(
                elevation,
                RoundClock::new(
                    elevation,
                    config.genesis_ts,
                    config.base_round_duration,
                    config.unlock_offset,
                ),
            );
        }
        let randomness = RandomnessSource::new(config.seeder);
        Self {
            config,
            clock,
            pools: HashMap::new(),
            positions: HashMap::new(),
            round_clocks,
            randomness,
            allocations: HashMap::new(),
            total_allocation: 0,
            adapters: HashMap::new(),
            treasury: Treasury::new(),
            events: Vec::new(),
        }
    }

    // -----------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------

    fn require_owner(&self, caller: &Address) -> Result<(), SummitError> {
        if *caller != self.config.owner {
            return Err(SummitError::Unauthorized(
                "caller is not the owner".to_string(),
            ));
        }
        Ok(())
    }

    fn rate_for(&self, key: &PoolKey) -> u64 {
        emission::pool_rate(
            self.config.base_emission_per_sec,
            self.allocations.get(&key.token).copied().unwrap_or(0),
            self.total_allocation,
            key.elevation,
        )
    }

    fn farm_key(token: TokenId, elevation: Elevation) -> Result<PoolKey, SummitError> {
        if !Elevation::FARM_ELEVATIONS.contains(&elevation) {
            return Err(SummitError::PoolUnavailable(format!(
                "{} is a reserved elevation and hosts no farm pools",
                elevation
            )));
        }
        Ok(PoolKey::new(token, elevation))
    }

    // -----------------------------------------------------------------
    // Pool maintenance
    // -----------------------------------------------------------------

    /// Recompute the pool's accumulators up to the current time. Public so
    /// read paths can refresh `round_yield` views; every mutating operation
    /// calls this internally first.
    pub fn update_pool(&mut self, token: TokenId, elevation: Elevation) -> Result<(), SummitError> {
        let key = Self::farm_key(token, elevation)?;
        let now = self.clock.now();
        let rate = self.rate_for(&key);
        let pool = self
            .pools
            .get_mut(&key)
            .ok_or_else(|| SummitError::PoolUnavailable(format!("no pool at {}", key)))?;
        pool.accrue(now, rate);
        Ok(())
    }

    // -----------------------------------------------------------------
    // User operations
    // -----------------------------------------------------------------

    /// Stake `amount` into a pool, harvesting any pending winnings first.
    ///
    /// A zero amount is a harvest-only call. At lottery elevations the
    /// first deposit must name a totem; later deposits may repeat the same
    /// totem but never name a different one — switching is its own
    /// operation.
    ///
    /// Returns the winnings paid out by harvest-on-touch.
    pub fn deposit(
        &mut self,
        caller: Address,
        token: TokenId,
        elevation: Elevation,
        amount: u64,
        totem: Option<u8>,
    ) -> Result<u64, SummitError> {
        let key = Self::farm_key(token, elevation)?;
        let now = self.clock.now();

        let clock = self
            .round_clocks
            .get_mut(&elevation)
            .ok_or_else(|| SummitError::NotFound(format!("no round clock for {}", elevation)))?;
        clock.ensure_active(now)?;
        if amount > 0 && elevation.has_lottery() && clock.in_lockout(now) {
            return Err(SummitError::ElevationLocked(format!(
                "{} is in its pre-rollover lockout window",
                elevation
            )));
        }

        let rate = self.rate_for(&key);
        let pool = self
            .pools
            .get_mut(&key)
            .ok_or_else(|| SummitError::PoolUnavailable(format!("no pool at {}", key)))?;
        if amount > 0 && !pool.live {
            return Err(SummitError::PoolUnavailable(format!(
                "pool {} is not accepting deposits",
                key
            )));
        }

        if amount == 0 && !self.positions.contains_key(&(key, caller)) {
            return Ok(0);
        }

        // Validate totem selection before any mutation.
        let existing = self.positions.get(&(key, caller));
        let selected_totem = match existing {
            Some(pos) if pos.totem_selected => {
                if let Some(t) = totem {
                    if t != pos.totem {
                        return Err(SummitError::InvalidTotem(format!(
                            "deposit names totem {} but {} is selected; use switch_totem",
                            t, pos.totem
                        )));
                    }
                }
                pos.totem
            }
            _ => {
                // First deposit: OASIS defaults to its single totem, lottery
                // elevations must choose.
                let t = match totem {
                    Some(t) => t,
                    None if !elevation.has_lottery() => 0,
                    None => {
                        return Err(SummitError::InvalidTotem(format!(
                            "a totem must be selected before the first {} deposit",
                            elevation
                        )))
                    }
                };
                if t >= elevation.totem_count() {
                    return Err(SummitError::InvalidTotem(format!(
                        "totem {} out of range for {}",
                        t, elevation
                    )));
                }
                t
            }
        };

        pool.accrue(now, rate);
        let pos = self
            .positions
            .entry((key, caller))
            .or_insert_with(|| UserPosition::open(pool));
        if !pos.totem_selected {
            pos.totem = selected_totem;
            pos.totem_selected = true;
        }
        pos.settle(pool)?;
        let harvested = pos.take_claimable();

        if amount > 0 {
            pos.staked += amount;
            pool.add_stake(pos.totem, amount);
            pos.last_deposit_ts = now;
        }
        debug_assert!(pool.supplies_consistent());

        self.events.push(LedgerEvent::Deposited {
            pool: key,
            user: caller,
            amount,
            harvested,
        });
        info!(pool = %key, amount, harvested, "deposit");

        // Ledger committed; route idle stake through the adapter last.
        if amount > 0 {
            if let Some(adapter) = self.adapters.get_mut(&token) {
                if let Err(e) = adapter.deposit(amount) {
                    warn!(pool = %key, error = %e, "adapter deposit failed");
                    self.events.push(LedgerEvent::AdapterCallFailed {
                        token,
                        operation: "deposit".to_string(),
                    });
                }
            }
        }

        Ok(harvested)
    }

    /// Withdraw `amount` of staked tokens, harvesting pending winnings and
    /// applying the decaying withdrawal tax. A zero amount is harvest-only.
    pub fn withdraw(
        &mut self,
        caller: Address,
        token: TokenId,
        elevation: Elevation,
        amount: u64,
    ) -> Result<WithdrawReceipt, SummitError> {
        let key = Self::farm_key(token, elevation)?;
        let now = self.clock.now();

        let rate = self.rate_for(&key);
        let pool = self
            .pools
            .get_mut(&key)
            .ok_or_else(|| SummitError::PoolUnavailable(format!("no pool at {}", key)))?;
        let pos = self
            .positions
            .get_mut(&(key, caller))
            .ok_or_else(|| SummitError::BadWithdrawal(format!("no position at {}", key)))?;
        if amount > pos.staked {
            return Err(SummitError::BadWithdrawal(format!(
                "requested {} but only {} staked",
                amount, pos.staked
            )));
        }

        pool.accrue(now, rate);
        pos.settle(pool)?;
        let harvested = pos.take_claimable();

        let (net, tax) = if amount > 0 {
            pool.remove_stake(pos.totem, amount)?;
            pos.staked -= amount;
            let (net, tax) = self.config.tax.apply(amount, now, pos.last_deposit_ts);
            self.treasury.deposit(tax);
            (net, tax)
        } else {
            (0, 0)
        };
        debug_assert!(pool.supplies_consistent());

        self.events.push(LedgerEvent::Withdrawn {
            pool: key,
            user: caller,
            net,
            tax,
            harvested,
        });
        info!(pool = %key, net, tax, harvested, "withdraw");

        // Pull the stake back from the adapter after the ledger is settled.
        if amount > 0 {
            if let Some(adapter) = self.adapters.get_mut(&token) {
                match adapter.withdraw(amount) {
                    Ok(recovered) if recovered < amount => {
                        warn!(pool = %key, expected = amount, recovered, "adapter shortfall");
                        self.events.push(LedgerEvent::AdapterShortfall {
                            token,
                            expected: amount,
                            recovered,
                        });
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(pool = %key, error = %e, "adapter withdraw failed");
                        self.events.push(LedgerEvent::AdapterCallFailed {
                            token,
                            operation: "withdraw".to_string(),
                        });
                    }
                }
            }
        }

        Ok(WithdrawReceipt {
            net,
            tax,
            harvested,
        })
    }

    /// Harvest pending winnings without touching the stake.
    pub fn harvest(
        &mut self,
        caller: Address,
        token: TokenId,
        elevation: Elevation,
    ) -> Result<u64, SummitError> {
        let key = Self::farm_key(token, elevation)?;
        let now = self.clock.now();

        let rate = self.rate_for(&key);
        let pool = self
            .pools
            .get_mut(&key)
            .ok_or_else(|| SummitError::PoolUnavailable(format!("no pool at {}", key)))?;
        let pos = self
            .positions
            .get_mut(&(key, caller))
            .ok_or_else(|| SummitError::NotFound(format!("no position at {}", key)))?;

        pool.accrue(now, rate);
        pos.settle(pool)?;
        let amount = pos.take_claimable();

        self.events.push(LedgerEvent::Harvested {
            pool: key,
            user: caller,
            amount,
        });
        Ok(amount)
    }

    /// Move the caller's full stake to another totem. Settles pending
    /// winnings first, then moves stake and current-round contributed yield
    /// atomically with zero net change to total supply. Rejected inside the
    /// lockout window so round results cannot be sniped.
    pub fn switch_totem(
        &mut self,
        caller: Address,
        token: TokenId,
        elevation: Elevation,
        new_totem: u8,
    ) -> Result<(), SummitError> {
        let key = Self::farm_key(token, elevation)?;
        let now = self.clock.now();

        if new_totem >= elevation.totem_count() {
            return Err(SummitError::InvalidTotem(format!(
                "totem {} out of range for {}",
                new_totem, elevation
            )));
        }
        let clock = self
            .round_clocks
            .get(&elevation)
            .ok_or_else(|| SummitError::NotFound(format!("no round clock for {}", elevation)))?;
        if elevation.has_lottery() && clock.in_lockout(now) {
            return Err(SummitError::ElevationLocked(format!(
                "{} is in its pre-rollover lockout window",
                elevation
            )));
        }

        let rate = self.rate_for(&key);
        let pool = self
            .pools
            .get_mut(&key)
            .ok_or_else(|| SummitError::PoolUnavailable(format!("no pool at {}", key)))?;
        let pos = self
            .positions
            .get_mut(&(key, caller))
            .ok_or_else(|| SummitError::NotFound(format!("no position at {}", key)))?;
        if !pos.totem_selected {
            return Err(SummitError::InvalidTotem(
                "no totem selected to switch from".to_string(),
            ));
        }
        if pos.totem == new_totem {
            return Ok(());
        }

        pool.accrue(now, rate);
        pos.settle(pool)?;
        let from = pos.totem;
        pool.move_stake(from, new_totem, pos.staked, pos.round_contrib)?;
        pos.totem = new_totem;
        debug_assert!(pool.supplies_consistent());

        self.events.push(LedgerEvent::TotemSwitched {
            pool: key,
            user: caller,
            from,
            to: new_totem,
        });
        info!(pool = %key, from, to = new_totem, "totem switch");
        Ok(())
    }

    /// Harvest one pool and restake the proceeds into a target pool.
    ///
    /// The target must not sit at the reserved aggregation elevation, and
    /// must already have its totem question answered: either an existing
    /// selection or a single-totem elevation. Compounding never implies a
    /// totem choice or switch.
    pub fn cross_compound(
        &mut self,
        caller: Address,
        from: PoolKey,
        to: PoolKey,
    ) -> Result<u64, SummitError> {
        if to.elevation == Elevation::Expedition {
            return Err(SummitError::PoolUnavailable(
                "cross-compound into the reserved aggregation elevation is not allowed".to_string(),
            ));
        }
        if to.elevation.has_lottery() {
            let target_selected = self
                .positions
                .get(&(to, caller))
                .map(|p| p.totem_selected)
                .unwrap_or(false);
            if !target_selected {
                return Err(SummitError::InvalidTotem(format!(
                    "target {} has no totem selected; compounding cannot answer the totem question",
                    to
                )));
            }
        }

        // Gate the target before touching the source so a failed restake
        // cannot drop harvested winnings.
        let to_key = Self::farm_key(to.token, to.elevation)?;
        let now = self.clock.now();
        let clock = self
            .round_clocks
            .get_mut(&to.elevation)
            .ok_or_else(|| SummitError::NotFound(format!("no round clock for {}", to.elevation)))?;
        clock.ensure_active(now)?;
        if to.elevation.has_lottery() && clock.in_lockout(now) {
            return Err(SummitError::ElevationLocked(format!(
                "{} is in its pre-rollover lockout window",
                to.elevation
            )));
        }
        let target = self
            .pools
            .get(&to_key)
            .ok_or_else(|| SummitError::PoolUnavailable(format!("no pool at {}", to_key)))?;
        if !target.live {
            return Err(SummitError::PoolUnavailable(format!(
                "pool {} is not accepting deposits",
                to_key
            )));
        }

        let amount = self.harvest(caller, from.token, from.elevation)?;
        if amount == 0 {
            return Ok(0);
        }
        self.deposit(caller, to.token, to.elevation, amount, None)?;

        self.events.push(LedgerEvent::CrossCompounded {
            from,
            to,
            user: caller,
            amount,
        });
        Ok(amount)
    }

    // -----------------------------------------------------------------
    // Round lifecycle
    // -----------------------------------------------------------------

    /// Close the elevation's current round and open the next one. Callable
    /// by anyone once the round has ended; lottery elevations additionally
    /// require a seed resolved at/after the round's end.
    pub fn rollover(&mut self, elevation: Elevation) -> Result<RolloverSummary, SummitError> {
        if !Elevation::FARM_ELEVATIONS.contains(&elevation) {
            return Err(SummitError::InvalidState(format!(
                "{} has no round clock",
                elevation
            )));
        }
        let now = self.clock.now();

        let clock = self
            .round_clocks
            .get_mut(&elevation)
            .ok_or_else(|| SummitError::NotFound(format!("no round clock for {}", elevation)))?;
        clock.ensure_active(now)?;
        if now < clock.end_ts {
            return Err(SummitError::ElevationLocked(format!(
                "{} round {} ends at {}, now {}",
                elevation, clock.round_number, clock.end_ts, now
            )));
        }

        // Resolve the winner before any state changes; fail closed without
        // a covering seed. Single-totem elevations resolve trivially.
        let winning_totem = if elevation.has_lottery() {
            self.randomness
                .draw(elevation, clock.round_number, clock.end_ts)?
        } else {
            0
        };
        let round = clock.rollover(now, winning_totem)?;

        let keys: Vec<PoolKey> = self
            .pools
            .keys()
            .filter(|k| k.elevation == elevation)
            .copied()
            .collect();

        let mut distributed = 0u64;
        let mut carried = 0u64;
        for key in keys {
            let rate = self.rate_for(&key);
            if let Some(pool) = self.pools.get_mut(&key) {
                pool.accrue(now, rate);
                let outcome = pool.settle_round(winning_totem)?;
                distributed += outcome.distributed;
                carried += outcome.carried;
                self.events.push(LedgerEvent::RoundSettled {
                    pool: key,
                    round: outcome.round,
                    winning_totem,
                    distributed: outcome.distributed,
                    carried: outcome.carried,
                });
            }
        }

        self.events.push(LedgerEvent::RoundRolledOver {
            elevation,
            round,
            winning_totem,
        });
        info!(%elevation, round, winning_totem, distributed, carried, "rollover");

        Ok(RolloverSummary {
            elevation,
            round,
            winning_totem,
            distributed,
            carried,
        })
    }

    /// Drop settlement records no position can reach anymore. A record for
    /// round R is only read by positions whose last interaction was in
    /// round R, so everything below the oldest such anchor is garbage.
    /// Callable by anyone; returns the number of records removed.
    pub fn prune_settled_rounds(
        &mut self,
        token: TokenId,
        elevation: Elevation,
    ) -> Result<usize, SummitError> {
        let key = PoolKey::new(token, elevation);
        let watermark = self
            .positions
            .iter()
            .filter(|((pos_key, _), _)| *pos_key == key)
            .map(|(_, pos)| pos.last_round)
            .min();
        let pool = self
            .pools
            .get_mut(&key)
            .ok_or_else(|| SummitError::PoolUnavailable(format!("no pool {}", key)))?;
        // With no positions at all, nothing can reference any closed round.
        let watermark = watermark.unwrap_or(pool.current_round);
        Ok(pool.prune_settlements(watermark))
    }

    // -----------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------

    /// Submit the sealed seed for the current commit-reveal cycle.
    pub fn receive_sealed_seed(
        &mut self,
        caller: Address,
        seal: [u8; 32],
        marker: u64,
    ) -> Result<(), SummitError> {
        let now = self.clock.now();
        self.randomness
            .receive_sealed_seed(&caller, seal, now, marker)?;
        self.events.push(LedgerEvent::SealedSeedReceived { marker });
        Ok(())
    }

    /// Submit the unsealed preimage, resolving the cycle's seed.
    pub fn receive_unsealed_seed(
        &mut self,
        caller: Address,
        preimage: [u8; 32],
    ) -> Result<(), SummitError> {
        let now = self.clock.now();
        let resolved = self
            .randomness
            .receive_unsealed_seed(&caller, preimage, now)?;
        self.events.push(LedgerEvent::UnsealedSeedReceived {
            resolved_at: resolved.resolved_at,
        });
        Ok(())
    }

    // -----------------------------------------------------------------
    // Governance setters (owner-gated, idempotent)
    // -----------------------------------------------------------------

    /// Create a pool for (token, elevation). Re-adding an existing pool is
    /// a no-op so a governance replay cannot fail.
    pub fn add_pool(
        &mut self,
        caller: Address,
        token: TokenId,
        elevation: Elevation,
    ) -> Result<(), SummitError> {
        self.require_owner(&caller)?;
        let key = Self::farm_key(token, elevation)?;
        if self.pools.contains_key(&key) {
            return Ok(());
        }
        let now = self.clock.now();
        let round = self
            .round_clocks
            .get(&elevation)
            .map(|c| c.round_number.max(1))
            .unwrap_or(1);
        self.pools.insert(key, Pool::new(key, now, round));
        self.events.push(LedgerEvent::PoolAdded { pool: key });
        Ok(())
    }

    /// Flip a pool's emission liveness. Idempotent.
    pub fn set_pool_live(
        &mut self,
        caller: Address,
        token: TokenId,
        elevation: Elevation,
        live: bool,
    ) -> Result<(), SummitError> {
        self.require_owner(&caller)?;
        let key = Self::farm_key(token, elevation)?;
        let now = self.clock.now();
        let rate = self.rate_for(&key);
        let pool = self
            .pools
            .get_mut(&key)
            .ok_or_else(|| SummitError::PoolUnavailable(format!("no pool at {}", key)))?;
        if pool.live == live {
            return Ok(());
        }
        // Settle emission under the old liveness before flipping.
        pool.accrue(now, rate);
        pool.live = live;
        self.events
            .push(LedgerEvent::PoolLivenessSet { pool: key, live });
        Ok(())
    }

    /// Set a token's emission allocation. Idempotent.
    pub fn set_token_allocation(
        &mut self,
        caller: Address,
        token: TokenId,
        allocation: u64,
    ) -> Result<(), SummitError> {
        self.require_owner(&caller)?;
        let old = self.allocations.get(&token).copied().unwrap_or(0);
        if old == allocation {
            return Ok(());
        }
        // Accrue every pool of this token at the old rate before the split
        // changes under it.
        let keys: Vec<PoolKey> = self
            .pools
            .keys()
            .filter(|k| k.token == token)
            .copied()
            .collect();
        let now = self.clock.now();
        for key in keys {
            let rate = self.rate_for(&key);
            if let Some(pool) = self.pools.get_mut(&key) {
                pool.accrue(now, rate);
            }
        }
        self.total_allocation = self.total_allocation - old + allocation;
        self.allocations.insert(token, allocation);
        self.events
            .push(LedgerEvent::AllocationSet { token, allocation });
        Ok(())
    }

    /// Replace the withdrawal-tax schedule. Validates the fee band;
    /// idempotent.
    pub fn set_tax_schedule(
        &mut self,
        caller: Address,
        configured_bp: u16,
        base_minimum_bp: u16,
        decay_duration: u64,
    ) -> Result<(), SummitError> {
        self.require_owner(&caller)?;
        let schedule = TaxSchedule::new(configured_bp, base_minimum_bp, decay_duration)?;
        if schedule == self.config.tax {
            return Ok(());
        }
        self.config.tax = schedule;
        self.events.push(LedgerEvent::TaxScheduleSet {
            configured_bp,
            base_minimum_bp,
            decay_duration,
        });
        Ok(())
    }

    /// Rotate the trusted seeder. Idempotent.
    pub fn set_trusted_seeder(
        &mut self,
        caller: Address,
        seeder: Address,
    ) -> Result<(), SummitError> {
        self.require_owner(&caller)?;
        if *self.randomness.seeder() == seeder {
            return Ok(());
        }
        self.randomness.set_seeder(seeder);
        self.events.push(LedgerEvent::SeederRotated { seeder });
        Ok(())
    }

    /// Register (or swap) the passthrough adapter for a token. Any previous
    /// adapter is retired first; a partial recovery is absorbed and
    /// surfaced as an `AdapterShortfall` event, and whatever was recovered
    /// is routed into the new adapter.
    pub fn register_adapter(
        &mut self,
        caller: Address,
        token: TokenId,
        mut adapter: Box<dyn PassthroughAdapter>,
    ) -> Result<(), SummitError> {
        self.require_owner(&caller)?;

        if let Some(mut old) = self.adapters.remove(&token) {
            let expected = old.balance();
            let recovered = match old.retire() {
                Ok(recovered) => recovered,
                Err(e) => {
                    warn!(error = %e, "adapter retire failed");
                    self.events.push(LedgerEvent::AdapterCallFailed {
                        token,
                        operation: "retire".to_string(),
                    });
                    0
                }
            };
            if recovered < expected {
                warn!(expected, recovered, "adapter retire shortfall");
                self.events.push(LedgerEvent::AdapterShortfall {
                    token,
                    expected,
                    recovered,
                });
            }
            if recovered > 0 {
                if let Err(e) = adapter.deposit(recovered) {
                    warn!(error = %e, "redeposit into new adapter failed");
                    self.events.push(LedgerEvent::AdapterCallFailed {
                        token,
                        operation: "deposit".to_string(),
                    });
                }
            }
        }

        let kind = adapter.kind();
        self.adapters.insert(token, adapter);
        self.events
            .push(LedgerEvent::AdapterRegistered { token, kind });
        Ok(())
    }

    // -----------------------------------------------------------------
    // Observer API
    // -----------------------------------------------------------------

    /// Current round number at an elevation; 0 before activation.
    pub fn round_number(&self, elevation: Elevation) -> u64 {
        self.round_clocks
            .get(&elevation)
            .map(|c| c.round_number)
            .unwrap_or(0)
    }

    /// End timestamp of the elevation's current round.
    pub fn round_end_timestamp(&self, elevation: Elevation) -> Option<u64> {
        self.round_clocks
            .get(&elevation)
            .filter(|c| c.round_number > 0)
            .map(|c| c.end_ts)
    }

    /// Winner of a resolved round, if still inside the retained history
    /// window.
    pub fn winning_totem(&self, elevation: Elevation, round: u64) -> Option<u8> {
        self.round_clocks
            .get(&elevation)
            .and_then(|c| c.history.winner_of(round))
    }

    /// Recent resolved winners at an elevation, oldest first.
    pub fn historical_winning_totems(&self, elevation: Elevation) -> Vec<(u64, u8)> {
        self.round_clocks
            .get(&elevation)
            .map(|c| c.history.recent().collect())
            .unwrap_or_default()
    }

    /// Cumulative wins for a totem at an elevation.
    pub fn totem_win_count(&self, elevation: Elevation, totem: u8) -> u64 {
        self.round_clocks
            .get(&elevation)
            .map(|c| c.history.wins(totem))
            .unwrap_or(0)
    }

    /// Winnings a user could harvest right now (settled plus closed-round
    /// credits). The open round pays nothing until it resolves.
    pub fn pending_reward(
        &self,
        user: Address,
        token: TokenId,
        elevation: Elevation,
    ) -> Result<u64, SummitError> {
        let key = Self::farm_key(token, elevation)?;
        let pool = self
            .pools
            .get(&key)
            .ok_or_else(|| SummitError::PoolUnavailable(format!("no pool at {}", key)))?;
        match self.positions.get(&(key, user)) {
            Some(pos) => pos.pending(pool),
            None => Ok(0),
        }
    }

    /// Yield the user has contributed to the current round, as of the last
    /// pool update (call `update_pool` first for a fresh value).
    pub fn round_yield(
        &self,
        user: Address,
        token: TokenId,
        elevation: Elevation,
    ) -> Result<u64, SummitError> {
        let key = Self::farm_key(token, elevation)?;
        let pool = self
            .pools
            .get(&key)
            .ok_or_else(|| SummitError::PoolUnavailable(format!("no pool at {}", key)))?;
        Ok(self
            .positions
            .get(&(key, user))
            .map(|pos| pos.round_yield(pool))
            .unwrap_or(0))
    }

    /// A user's staked amount in a pool.
    pub fn staked(&self, user: Address, token: TokenId, elevation: Elevation) -> u64 {
        self.positions
            .get(&(PoolKey::new(token, elevation), user))
            .map(|p| p.staked)
            .unwrap_or(0)
    }

    /// Read access to a pool's ledger state.
    pub fn pool(&self, token: TokenId, elevation: Elevation) -> Option<&Pool> {
        self.pools.get(&PoolKey::new(token, elevation))
    }

    pub fn treasury_balance(&self) -> u64 {
        self.treasury.balance()
    }

    /// Drain accumulated events for off-chain consumption.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::FakeVault;
    use summit_core::FakeClock;

    const OWNER: Address = [1u8; 32];
    const SEEDER: Address = [2u8; 32];
    const ALICE: Address = [10u8; 32];
    const TOKEN: TokenId = [100u8; 32];

    fn engine() -> (Cartographer, Arc<FakeClock>) {
        let clock = Arc::new(FakeClock::new(10_000));
        let config = EngineConfig {
            owner: OWNER,
            seeder: SEEDER,
            genesis_ts: 10_000,
            base_round_duration: 3_600,
            unlock_offset: 0,
            base_emission_per_sec: 100,
            tax: TaxSchedule::new(5_000, 100, 100_000).unwrap(),
        };
        let mut engine = Cartographer::new(config, clock.clone());
        engine.set_token_allocation(OWNER, TOKEN, 100).unwrap();
        engine.add_pool(OWNER, TOKEN, Elevation::Plains).unwrap();
        engine.add_pool(OWNER, TOKEN, Elevation::Oasis).unwrap();
        (engine, clock)
    }

    #[test]
    fn test_deposit_requires_pool() {
        let (mut engine, _clock) = engine();
        let result = engine.deposit(ALICE, [99u8; 32], Elevation::Plains, 100, Some(0));
        assert!(matches!(result, Err(SummitError::PoolUnavailable(_))));
    }

    #[test]
    fn test_first_lottery_deposit_requires_totem() {
        let (mut engine, _clock) = engine();
        let result = engine.deposit(ALICE, TOKEN, Elevation::Plains, 100, None);
        assert!(matches!(result, Err(SummitError::InvalidTotem(_))));
        assert!(engine
            .deposit(ALICE, TOKEN, Elevation::Plains, 100, Some(0))
            .is_ok());
    }

    #[test]
    fn test_oasis_deposit_defaults_totem() {
        let (mut engine, _clock) = engine();
        assert!(engine
            .deposit(ALICE, TOKEN, Elevation::Oasis, 100, None)
            .is_ok());
        assert_eq!(engine.staked(ALICE, TOKEN, Elevation::Oasis), 100);
    }

    #[test]
    fn test_deposit_cannot_imply_totem_switch() {
        let (mut engine, _clock) = engine();
        engine
            .deposit(ALICE, TOKEN, Elevation::Plains, 100, Some(0))
            .unwrap();
        let result = engine.deposit(ALICE, TOKEN, Elevation::Plains, 100, Some(1));
        assert!(matches!(result, Err(SummitError::InvalidTotem(_))));
        // Repeating the selected totem is fine
        assert!(engine
            .deposit(ALICE, TOKEN, Elevation::Plains, 100, Some(0))
            .is_ok());
    }

    #[test]
    fn test_deposit_rejected_in_lockout_window() {
        let (mut engine, clock) = engine();
        engine
            .deposit(ALICE, TOKEN, Elevation::Plains, 100, Some(0))
            .unwrap();
        clock.advance(3_600 - 60); // inside the final 2 minutes
        let result = engine.deposit(ALICE, TOKEN, Elevation::Plains, 100, None);
        assert!(matches!(result, Err(SummitError::ElevationLocked(_))));
        // Withdrawals stay open during lockout
        assert!(engine.withdraw(ALICE, TOKEN, Elevation::Plains, 50).is_ok());
    }

    #[test]
    fn test_withdraw_more_than_staked_rejected() {
        let (mut engine, _clock) = engine();
        engine
            .deposit(ALICE, TOKEN, Elevation::Plains, 100, Some(0))
            .unwrap();
        let result = engine.withdraw(ALICE, TOKEN, Elevation::Plains, 101);
        assert!(matches!(result, Err(SummitError::BadWithdrawal(_))));
        assert_eq!(engine.staked(ALICE, TOKEN, Elevation::Plains), 100);
    }

    #[test]
    fn test_withdraw_tax_routes_to_treasury() {
        let (mut engine, _clock) = engine();
        engine
            .deposit(ALICE, TOKEN, Elevation::Plains, 1_000, Some(0))
            .unwrap();
        // Immediate withdrawal pays the full configured 50% tax
        let receipt = engine.withdraw(ALICE, TOKEN, Elevation::Plains, 1_000).unwrap();
        assert_eq!(receipt.net, 500);
        assert_eq!(receipt.tax, 500);
        assert_eq!(engine.treasury_balance(), 500);
    }

    #[test]
    fn test_switch_totem_conserves_supply() {
        let (mut engine, _clock) = engine();
        engine
            .deposit(ALICE, TOKEN, Elevation::Plains, 100, Some(0))
            .unwrap();
        engine.switch_totem(ALICE, TOKEN, Elevation::Plains, 1).unwrap();

        let pool = engine.pool(TOKEN, Elevation::Plains).unwrap();
        assert_eq!(pool.totem_supplies[0], 0);
        assert_eq!(pool.totem_supplies[1], 100);
        assert_eq!(pool.total_supply, 100);
    }

    #[test]
    fn test_switch_totem_rejected_in_lockout() {
        let (mut engine, clock) = engine();
        engine
            .deposit(ALICE, TOKEN, Elevation::Plains, 100, Some(0))
            .unwrap();
        clock.advance(3_600 - 30);
        let result = engine.switch_totem(ALICE, TOKEN, Elevation::Plains, 1);
        assert!(matches!(result, Err(SummitError::ElevationLocked(_))));
    }

    #[test]
    fn test_rollover_requires_round_end() {
        let (mut engine, _clock) = engine();
        engine
            .deposit(ALICE, TOKEN, Elevation::Plains, 100, Some(0))
            .unwrap();
        let result = engine.rollover(Elevation::Plains);
        assert!(matches!(result, Err(SummitError::ElevationLocked(_))));
    }

    #[test]
    fn test_rollover_requires_seed_for_lottery() {
        let (mut engine, clock) = engine();
        engine
            .deposit(ALICE, TOKEN, Elevation::Plains, 100, Some(0))
            .unwrap();
        clock.advance(3_600);
        let result = engine.rollover(Elevation::Plains);
        assert!(matches!(result, Err(SummitError::RoundNotSeeded(_))));
    }

    #[test]
    fn test_oasis_rolls_over_without_seed() {
        let (mut engine, clock) = engine();
        engine
            .deposit(ALICE, TOKEN, Elevation::Oasis, 100, None)
            .unwrap();
        clock.advance(3_600);
        let summary = engine.rollover(Elevation::Oasis).unwrap();
        assert_eq!(summary.winning_totem, 0);
        assert_eq!(summary.round, 1);
        assert_eq!(engine.round_number(Elevation::Oasis), 2);
    }

    #[test]
    fn test_prune_drops_records_once_positions_advance() {
        let (mut engine, clock) = engine();
        engine
            .deposit(ALICE, TOKEN, Elevation::Oasis, 100, None)
            .unwrap();
        for _ in 0..3 {
            clock.advance(3_600);
            engine.rollover(Elevation::Oasis).unwrap();
        }
        // The position is still anchored in round 1, so every record stays
        assert_eq!(engine.prune_settled_rounds(TOKEN, Elevation::Oasis).unwrap(), 0);
        assert_eq!(engine.pool(TOKEN, Elevation::Oasis).unwrap().settlements.len(), 3);

        // Harvest re-anchors the position in the open round; all three
        // closed records become unreachable
        engine.harvest(ALICE, TOKEN, Elevation::Oasis).unwrap();
        assert_eq!(engine.prune_settled_rounds(TOKEN, Elevation::Oasis).unwrap(), 3);
        assert!(engine.pool(TOKEN, Elevation::Oasis).unwrap().settlements.is_empty());
    }

    #[test]
    fn test_prune_spares_dormant_anchor_and_settlement_still_works() {
        const BOB: Address = [11u8; 32];
        let (mut engine, clock) = engine();
        engine
            .deposit(ALICE, TOKEN, Elevation::Oasis, 100, None)
            .unwrap();
        engine.deposit(BOB, TOKEN, Elevation::Oasis, 100, None).unwrap();

        clock.advance(3_600);
        engine.rollover(Elevation::Oasis).unwrap();
        // Alice moves forward; Bob stays anchored in round 1
        engine.harvest(ALICE, TOKEN, Elevation::Oasis).unwrap();
        clock.advance(3_600);
        engine.rollover(Elevation::Oasis).unwrap();

        // Bob's anchor holds the watermark at round 1
        assert_eq!(engine.prune_settled_rounds(TOKEN, Elevation::Oasis).unwrap(), 0);
        assert_eq!(engine.pool(TOKEN, Elevation::Oasis).unwrap().settlements.len(), 2);

        // Bob can still settle every round he slept through; afterwards the
        // watermark moves up to Alice's round-2 anchor
        let harvested = engine.harvest(BOB, TOKEN, Elevation::Oasis).unwrap();
        assert!(harvested > 0);
        assert_eq!(engine.prune_settled_rounds(TOKEN, Elevation::Oasis).unwrap(), 1);
        assert!(engine
            .pool(TOKEN, Elevation::Oasis)
            .unwrap()
            .settlements
            .contains_key(&2));
    }

    #[test]
    fn test_locked_elevation_rejects_operations() {
        let clock = Arc::new(FakeClock::new(10_000));
        let config = EngineConfig {
            owner: OWNER,
            seeder: SEEDER,
            genesis_ts: 10_000,
            base_round_duration: 3_600,
            unlock_offset: 86_400, // later tiers unlock one day apart
            base_emission_per_sec: 100,
            tax: TaxSchedule::new(5_000, 100, 100_000).unwrap(),
        };
        let mut engine = Cartographer::new(config, clock);
        engine.set_token_allocation(OWNER, TOKEN, 100).unwrap();
        engine.add_pool(OWNER, TOKEN, Elevation::Plains).unwrap();

        let result = engine.deposit(ALICE, TOKEN, Elevation::Plains, 100, Some(0));
        assert!(matches!(result, Err(SummitError::ElevationLocked(_))));
    }

    #[test]
    fn test_setters_owner_gated() {
        let (mut engine, _clock) = engine();
        assert!(matches!(
            engine.set_token_allocation(ALICE, TOKEN, 50),
            Err(SummitError::Unauthorized(_))
        ));
        assert!(matches!(
            engine.set_trusted_seeder(ALICE, ALICE),
            Err(SummitError::Unauthorized(_))
        ));
        assert!(matches!(
            engine.add_pool(ALICE, TOKEN, Elevation::Mesa),
            Err(SummitError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_setters_idempotent() {
        let (mut engine, _clock) = engine();
        engine.drain_events();
        // Re-setting identical values emits nothing and errors nothing
        engine.set_token_allocation(OWNER, TOKEN, 100).unwrap();
        engine.add_pool(OWNER, TOKEN, Elevation::Plains).unwrap();
        engine.set_trusted_seeder(OWNER, SEEDER).unwrap();
        engine.set_tax_schedule(OWNER, 5_000, 100, 100_000).unwrap();
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn test_tax_bounds_validated_by_setter() {
        let (mut engine, _clock) = engine();
        assert!(matches!(
            engine.set_tax_schedule(OWNER, 5_000, 50, 100_000),
            Err(SummitError::InvalidFeeBounds(_))
        ));
    }

    #[test]
    fn test_cross_compound_rejects_expedition_target() {
        let (mut engine, _clock) = engine();
        let from = PoolKey::new(TOKEN, Elevation::Plains);
        let to = PoolKey::new(TOKEN, Elevation::Expedition);
        let result = engine.cross_compound(ALICE, from, to);
        assert!(matches!(result, Err(SummitError::PoolUnavailable(_))));
    }

    #[test]
    fn test_cross_compound_requires_target_totem() {
        let (mut engine, _clock) = engine();
        engine
            .deposit(ALICE, TOKEN, Elevation::Oasis, 100, None)
            .unwrap();
        let from = PoolKey::new(TOKEN, Elevation::Oasis);
        let to = PoolKey::new(TOKEN, Elevation::Plains);
        // No totem selected at PLAINS: compounding must not answer it
        let result = engine.cross_compound(ALICE, from, to);
        assert!(matches!(result, Err(SummitError::InvalidTotem(_))));
    }

    #[test]
    fn test_adapter_swap_surfaces_shortfall() {
        let (mut engine, _clock) = engine();
        let mut shorting = FakeVault::new();
        shorting.stuck_on_retire = 400;
        engine
            .register_adapter(OWNER, TOKEN, Box::new(shorting))
            .unwrap();

        engine
            .deposit(ALICE, TOKEN, Elevation::Plains, 1_000, Some(0))
            .unwrap();
        engine.drain_events();

        // Swapping in a replacement retires the old vault, which leaves
        // 400 behind
        engine
            .register_adapter(OWNER, TOKEN, Box::new(FakeVault::new()))
            .unwrap();

        let events = engine.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            LedgerEvent::AdapterShortfall {
                expected: 1_000,
                recovered: 600,
                ..
            }
        )));
    }

    #[test]
    fn test_zero_deposit_without_position_is_noop() {
        let (mut engine, _clock) = engine();
        let harvested = engine
            .deposit(ALICE, TOKEN, Elevation::Plains, 0, None)
            .unwrap();
        assert_eq!(harvested, 0);
        assert_eq!(engine.staked(ALICE, TOKEN, Elevation::Plains), 0);
    }
}
