#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Tile Defence.
//!
//! The world owns the map, the critters walking its path, the towers built
//! beside it and the player's economy. Every mutation flows through
//! [`apply`], which records its consequences as [`Event`] values. Read-only
//! access goes through the [`query`] module.

pub mod critters;
pub mod map;
mod towers;

use tile_defence_core::{
    AttackEffect, Command, CritterId, Event, GameOverReason, PlayerRequest, RejectionReason,
    TargetStrategy, TileCoord, TowerId, TowerKind, Warning, WaveState, WorldConfig, SPLASH_RANGE,
};

use crate::critters::{CritterManager, InvariantViolation};
use crate::map::{Map, TileKind};
use crate::towers::TowerRegistry;

pub use crate::towers::TowerLogEntry;

/// Represents the authoritative Tile Defence world state.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    map: Map,
    critters: CritterManager,
    towers: TowerRegistry,
    gold: u32,
    level: u32,
    wave_state: WaveState,
    wave_number: u32,
    wave_requested: bool,
    tick_index: u64,
    warning: Option<Warning>,
    game_over: Option<GameOverReason>,
}

impl World {
    /// Creates a world for `map` governed by `config`.
    ///
    /// Geometry follows the map's own tile size.
    #[must_use]
    pub fn new(map: Map, config: WorldConfig) -> Self {
        let critters = CritterManager::new(map.path().clone(), map.tile_size(), config.critter);
        Self {
            gold: config.starting_gold,
            level: config.starting_level.max(1),
            config,
            map,
            critters,
            towers: TowerRegistry::new(),
            wave_state: WaveState::Idle,
            wave_number: 0,
            wave_requested: false,
            tick_index: 0,
            warning: None,
            game_over: None,
        }
    }

    fn set_gold(&mut self, gold: u32, out_events: &mut Vec<Event>) {
        if gold != self.gold {
            self.gold = gold;
            out_events.push(Event::GoldChanged { gold });
        }
    }

    fn reject(
        &mut self,
        request: PlayerRequest,
        reason: RejectionReason,
        out_events: &mut Vec<Event>,
    ) {
        tracing::warn!(?request, %reason, "request rejected");
        self.warning = Some(Warning {
            tick: self.tick_index,
            request,
            reason,
        });
        out_events.push(Event::TowerRejected { request, reason });
    }

    fn end_game(&mut self, reason: GameOverReason, out_events: &mut Vec<Event>) {
        if self.game_over.is_some() {
            return;
        }
        tracing::info!(tick = self.tick_index, ?reason, "game over");
        self.game_over = Some(reason);
        out_events.push(Event::GameOver {
            tick: self.tick_index,
            reason,
        });
    }

    fn fail_invariant(&mut self, violation: InvariantViolation, out_events: &mut Vec<Event>) {
        tracing::error!(tick = self.tick_index, %violation, "simulation invariant violated");
        self.end_game(GameOverReason::Internal, out_events);
    }

    fn buy_tower(&mut self, kind: TowerKind, tile: TileCoord, out_events: &mut Vec<Event>) {
        let request = PlayerRequest::Buy { kind, tile };
        let rejection = match self.map.tile(tile).map(|tile| tile.kind()) {
            None => Some(RejectionReason::OutOfBounds),
            Some(TileKind::TowerSlot) if self.towers.at_tile(tile).is_some() => {
                Some(RejectionReason::SlotOccupied)
            }
            Some(TileKind::TowerSlot) => None,
            Some(_) => Some(RejectionReason::NotATowerSlot),
        };
        if let Some(reason) = rejection {
            self.reject(request, reason, out_events);
            return;
        }

        let cost = kind.cost(1);
        if cost > self.gold {
            let available = self.gold;
            self.reject(
                request,
                RejectionReason::InsufficientGold { cost, available },
                out_events,
            );
            return;
        }

        let tower = self.towers.insert(kind, tile);
        if let Some(state) = self.towers.get_mut(tower) {
            state.record(
                self.tick_index,
                format!("{} tower placed for {cost} gold", kind.name()),
            );
        }
        out_events.push(Event::TowerPlaced {
            tower,
            kind,
            tile,
            cost,
        });
        self.set_gold(self.gold - cost, out_events);
    }

    fn sell_tower(&mut self, tower: TowerId, out_events: &mut Vec<Event>) {
        let Some(state) = self.towers.remove(tower) else {
            tracing::debug!(tower = tower.get(), "sell ignored for unknown tower");
            return;
        };
        let refund = state.kind.refund(state.level);
        tracing::debug!(tower = tower.get(), refund, "tower sold");
        out_events.push(Event::TowerSold { tower, refund });
        self.set_gold(self.gold.saturating_add(refund), out_events);
    }

    fn upgrade_tower(&mut self, tower: TowerId, out_events: &mut Vec<Event>) {
        let Some(state) = self.towers.get(tower) else {
            tracing::debug!(tower = tower.get(), "upgrade ignored for unknown tower");
            return;
        };
        let cost = state.kind.cost(state.level);
        if cost > self.gold {
            let available = self.gold;
            self.reject(
                PlayerRequest::Upgrade { tower },
                RejectionReason::InsufficientGold { cost, available },
                out_events,
            );
            return;
        }

        let tick = self.tick_index;
        let Some(state) = self.towers.get_mut(tower) else {
            return;
        };
        state.level = state.level.saturating_add(1);
        let level = state.level;
        state.record(tick, format!("upgraded to level {level} for {cost} gold"));
        out_events.push(Event::TowerUpgraded { tower, level, cost });
        self.set_gold(self.gold - cost, out_events);
    }

    fn set_strategy(
        &mut self,
        tower: TowerId,
        strategy: TargetStrategy,
        out_events: &mut Vec<Event>,
    ) {
        let tick = self.tick_index;
        let Some(state) = self.towers.get_mut(tower) else {
            tracing::debug!(tower = tower.get(), "strategy ignored for unknown tower");
            return;
        };
        state.strategy = strategy;
        state.record(tick, format!("strategy set to {}", strategy.name()));
        out_events.push(Event::TowerStrategyChanged { tower, strategy });
    }

    fn set_tower_active(&mut self, tower: TowerId, active: bool, out_events: &mut Vec<Event>) {
        let tick = self.tick_index;
        let Some(state) = self.towers.get_mut(tower) else {
            tracing::debug!(tower = tower.get(), "activity ignored for unknown tower");
            return;
        };
        state.active = active;
        let message = if active { "enabled" } else { "disabled" };
        state.record(tick, message.to_owned());
        out_events.push(Event::TowerActivityChanged { tower, active });
    }

    fn request_wave(&mut self, out_events: &mut Vec<Event>) {
        if self.wave_state == WaveState::Running || self.wave_requested {
            self.reject(
                PlayerRequest::StartWave,
                RejectionReason::WaveInProgress,
                out_events,
            );
            return;
        }
        self.wave_requested = true;
        out_events.push(Event::WaveRequested {
            tick: self.tick_index,
        });
    }

    fn spawn_wave(&mut self, count: u32, out_events: &mut Vec<Event>) {
        if self.wave_state == WaveState::Running {
            tracing::debug!(count, "spawn ignored while a wave is running");
            return;
        }
        if let Err(violation) = self.critters.start_wave(count) {
            self.fail_invariant(violation, out_events);
            return;
        }
        self.wave_requested = false;
        self.wave_state = WaveState::Running;
        self.wave_number = self.wave_number.saturating_add(1);
        tracing::info!(wave = self.wave_number, count, "wave spawned");
        out_events.push(Event::WaveStarted {
            tick: self.tick_index,
            wave: self.wave_number,
            count,
        });
    }

    fn fire_tower(&mut self, tower: TowerId, target: CritterId, out_events: &mut Vec<Event>) {
        let tile_size = self.map.tile_size();
        let Some(snapshot) = self.towers.get(tower).map(|state| state.snapshot(tile_size)) else {
            tracing::debug!(tower = tower.get(), "fire ignored for unknown tower");
            return;
        };
        if !snapshot.ready_to_fire() {
            tracing::debug!(tower = tower.get(), "fire ignored for tower that is not ready");
            return;
        }
        let in_range = self
            .critters
            .critter(target)
            .map(|critter| critter.collides_with_rect(&snapshot.range_rect()));
        match in_range {
            None => {
                tracing::debug!(critter = target.get(), "fire ignored for unknown critter");
                return;
            }
            Some(false) => {
                tracing::debug!(critter = target.get(), "fire ignored for critter out of range");
                return;
            }
            Some(true) => {}
        }

        let damage = snapshot.kind.damage(snapshot.level);
        let rate = snapshot.kind.rate_of_fire(snapshot.level);
        let effect = snapshot.kind.effect();
        let splashed = match effect {
            AttackEffect::Splash => self.critters.critter_neighbours(target, SPLASH_RANGE),
            AttackEffect::Burn | AttackEffect::Freeze => Vec::new(),
        };

        if let Some(critter) = self.critters.critter_mut(target) {
            critter.take_damage(damage);
            match effect {
                AttackEffect::Burn if rate > 0.0 => critter.apply_burn(damage / (2.0 * rate), rate),
                AttackEffect::Freeze => critter.apply_freeze(rate / 2.0),
                AttackEffect::Burn | AttackEffect::Splash => {}
            }
        }
        for neighbour in &splashed {
            if let Some(critter) = self.critters.critter_mut(*neighbour) {
                critter.take_damage(0.5 * damage);
            }
        }

        let tick = self.tick_index;
        let reload = self.config.fire_cadence.reload_seconds(rate);
        let splashed_count = u32::try_from(splashed.len()).unwrap_or(u32::MAX);
        if let Some(state) = self.towers.get_mut(tower) {
            state.cooldown_remaining = reload;
            state.record(
                tick,
                match effect {
                    AttackEffect::Burn => format!("set critter {} on fire", target.get()),
                    AttackEffect::Freeze => format!("froze critter {}", target.get()),
                    AttackEffect::Splash => format!(
                        "hit critter {} and splashed {splashed_count} more",
                        target.get()
                    ),
                },
            );
        }
        out_events.push(Event::TowerFired {
            tower,
            target,
            splashed: splashed_count,
        });
    }

    fn advance_critters(&mut self, dt: f64, out_events: &mut Vec<Event>) {
        let report = match self.critters.update(dt, self.level) {
            Ok(report) => report,
            Err(violation) => {
                self.fail_invariant(violation, out_events);
                return;
            }
        };

        for &(critter, reward) in &report.killed {
            out_events.push(Event::CritterKilled { critter, reward });
        }
        for &(critter, penalty) in &report.escaped {
            out_events.push(Event::CritterEscaped { critter, penalty });
        }

        let settled = i64::from(self.gold) + report.gold_delta;
        let gold = u32::try_from(settled.max(0)).unwrap_or(u32::MAX);
        self.set_gold(gold, out_events);

        if !report.escaped.is_empty() {
            if self.critters.critters_passed() >= self.config.max_critters_passed {
                self.end_game(GameOverReason::CrittersEscaped, out_events);
                return;
            }
            if settled <= 0 {
                self.end_game(GameOverReason::Bankrupt, out_events);
                return;
            }
        }

        if self.wave_state == WaveState::Running && self.critters.is_empty() {
            self.wave_state = WaveState::Ended;
            self.level = self.level.saturating_add(1);
            tracing::info!(wave = self.wave_number, level = self.level, "wave ended");
            out_events.push(Event::WaveEnded {
                tick: self.tick_index,
            });
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Once the game is over every command is ignored.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    if world.game_over.is_some() {
        return;
    }

    match command {
        Command::BuyTower { kind, tile } => world.buy_tower(kind, tile, out_events),
        Command::SellTower { tower } => world.sell_tower(tower, out_events),
        Command::UpgradeTower { tower } => world.upgrade_tower(tower, out_events),
        Command::SetStrategy { tower, strategy } => world.set_strategy(tower, strategy, out_events),
        Command::SetTowerActive { tower, active } => {
            world.set_tower_active(tower, active, out_events);
        }
        Command::StartWave => world.request_wave(out_events),
        Command::Quit => {}
        Command::SpawnWave { count } => world.spawn_wave(count, out_events),
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            world.warning = None;
            world.towers.cool_down(dt.as_secs_f64());
            out_events.push(Event::TimeAdvanced {
                tick: world.tick_index,
                dt,
            });
        }
        Command::FireTower { tower, target } => world.fire_tower(tower, target, out_events),
        Command::AdvanceCritters { dt } => world.advance_critters(dt.as_secs_f64(), out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use tile_defence_core::{
        CritterId, CritterView, GameOverReason, RenderSnapshot, TowerId, TowerView, WaveState,
    };

    use super::{TowerLogEntry, World};
    use crate::map::Map;

    /// Provides read-only access to the loaded map.
    #[must_use]
    pub fn map(world: &World) -> &Map {
        &world.map
    }

    /// Gold available to the player.
    #[must_use]
    pub fn gold(world: &World) -> u32 {
        world.gold
    }

    /// Level applied to critter movement.
    #[must_use]
    pub fn level(world: &World) -> u32 {
        world.level
    }

    /// Index of the most recent tick.
    #[must_use]
    pub fn tick(world: &World) -> u64 {
        world.tick_index
    }

    /// Lifecycle of the current wave.
    #[must_use]
    pub fn wave_state(world: &World) -> WaveState {
        world.wave_state
    }

    /// Number of waves started so far.
    #[must_use]
    pub fn wave_number(world: &World) -> u32 {
        world.wave_number
    }

    /// Critters that reached the exit during the current wave.
    #[must_use]
    pub fn critters_passed(world: &World) -> u32 {
        world.critters.critters_passed()
    }

    /// Reason the game ended, once it has.
    #[must_use]
    pub fn game_over(world: &World) -> Option<GameOverReason> {
        world.game_over
    }

    /// Captures a read-only view of the critters on the map.
    #[must_use]
    pub fn critter_view(world: &World) -> CritterView {
        let path = world.critters.path();
        CritterView::from_snapshots(
            world
                .critters
                .critters()
                .iter()
                .map(|critter| critter.snapshot(path))
                .collect(),
        )
    }

    /// Captures a read-only view of the towers on the map.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        let tile_size = world.map.tile_size();
        TowerView::from_snapshots(
            world
                .towers
                .iter()
                .map(|tower| tower.snapshot(tile_size))
                .collect(),
        )
    }

    /// Critters the tower could shoot right now, in identifier order.
    #[must_use]
    pub fn shootable_critters(world: &World, tower: TowerId) -> Vec<CritterId> {
        let Some(snapshot) = world
            .towers
            .get(tower)
            .map(|state| state.snapshot(world.map.tile_size()))
        else {
            return Vec::new();
        };
        let range = snapshot.range_rect();
        world
            .critters
            .shootable_critters(&range)
            .map(|critter| critter.id())
            .collect()
    }

    /// Activity log of a tower from oldest to newest line.
    #[must_use]
    pub fn tower_log(world: &World, tower: TowerId) -> Vec<TowerLogEntry> {
        world
            .towers
            .get(tower)
            .map(|state| state.log().cloned().collect())
            .unwrap_or_default()
    }

    /// Captures everything a renderer needs for the current tick.
    #[must_use]
    pub fn render_snapshot(world: &World) -> RenderSnapshot {
        RenderSnapshot {
            tick: world.tick_index,
            towers: tower_view(world).into_vec(),
            critters: critter_view(world).into_vec(),
            gold: world.gold,
            health: world
                .config
                .max_critters_passed
                .saturating_sub(world.critters.critters_passed()),
            wave_state: world.wave_state,
            wave_number: world.wave_number,
            level: world.level,
            warning: world.warning,
            game_over: world.game_over,
        }
    }
}
