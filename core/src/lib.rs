#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Tile Defence engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod geometry;
mod stats;

pub use geometry::{chebyshev_within, distance, Rect, Vector2};
pub use stats::{
    AttackEffect, FireCadence, GoldLine, StatLine, TargetStrategy, TowerKind, TowerStats,
};

/// Default side length of a square tile in pixels.
pub const TILE_SIZE: f64 = 32.0;

/// Number of escaped critters that ends the game by default.
pub const MAX_CRITTERS_PASSED: u32 = 10;

/// Half-side of the square around a splash target, in pixels.
pub const SPLASH_RANGE: f64 = 96.0;

/// Inclusive lower bound of the wave size draw.
pub const SPAWN_COUNT_MIN: u32 = 30;

/// Inclusive upper bound of the wave size draw.
pub const SPAWN_COUNT_MAX: u32 = 50;

/// Number of activity lines retained per tower.
pub const TOWER_LOG_CAPACITY: usize = 16;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Requests construction of a tower on a tower slot.
    BuyTower {
        /// Type of tower to construct.
        kind: TowerKind,
        /// Tile that should host the tower.
        tile: TileCoord,
    },
    /// Requests that a tower be sold for its refund value.
    SellTower {
        /// Identifier of the tower to sell.
        tower: TowerId,
    },
    /// Requests that a tower be raised by one level.
    UpgradeTower {
        /// Identifier of the tower to upgrade.
        tower: TowerId,
    },
    /// Replaces the target-selection policy of a tower.
    SetStrategy {
        /// Identifier of the tower to reconfigure.
        tower: TowerId,
        /// Strategy the tower should use from now on.
        strategy: TargetStrategy,
    },
    /// Enables or disables a tower without selling it.
    SetTowerActive {
        /// Identifier of the tower to toggle.
        tower: TowerId,
        /// Whether the tower may fire.
        active: bool,
    },
    /// Asks the world to begin the next wave.
    StartWave,
    /// Ends the game loop. The world itself ignores this command.
    Quit,
    /// Spawns a wave of the provided size. Emitted by the spawning system.
    SpawnWave {
        /// Number of critters composing the wave.
        count: u32,
    },
    /// Advances the simulation clock and cools every tower down.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Fires a tower at its selected primary target. Emitted by the combat system.
    FireTower {
        /// Tower that fires.
        tower: TowerId,
        /// Primary target of the shot.
        target: CritterId,
    },
    /// Runs the critter update, settles the economy and checks the wave outcome.
    AdvanceCritters {
        /// Duration of simulated time to apply to critter effects.
        dt: Duration,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Index of the tick that started.
        tick: u64,
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that a new wave was requested and awaits a size.
    WaveRequested {
        /// Tick during which the request was accepted.
        tick: u64,
    },
    /// Confirms that a wave of critters was spawned.
    WaveStarted {
        /// Tick during which the wave spawned.
        tick: u64,
        /// One-based number of the wave.
        wave: u32,
        /// Number of critters spawned.
        count: u32,
    },
    /// Confirms that a tower was bought and placed.
    TowerPlaced {
        /// Identifier assigned to the tower by the world.
        tower: TowerId,
        /// Type of tower that was placed.
        kind: TowerKind,
        /// Tile hosting the tower.
        tile: TileCoord,
        /// Gold charged for the tower.
        cost: u32,
    },
    /// Confirms that a tower was sold.
    TowerSold {
        /// Identifier of the sold tower.
        tower: TowerId,
        /// Gold returned to the player.
        refund: u32,
    },
    /// Confirms that a tower gained a level.
    TowerUpgraded {
        /// Identifier of the upgraded tower.
        tower: TowerId,
        /// Level reached after the upgrade.
        level: u32,
        /// Gold charged for the upgrade.
        cost: u32,
    },
    /// Confirms that a tower switched target-selection policy.
    TowerStrategyChanged {
        /// Identifier of the tower.
        tower: TowerId,
        /// Strategy now in effect.
        strategy: TargetStrategy,
    },
    /// Confirms that a tower was enabled or disabled.
    TowerActivityChanged {
        /// Identifier of the tower.
        tower: TowerId,
        /// Whether the tower may now fire.
        active: bool,
    },
    /// Reports that a purchase or upgrade request was rejected.
    TowerRejected {
        /// Request that failed.
        request: PlayerRequest,
        /// Specific reason the request failed.
        reason: RejectionReason,
    },
    /// Confirms that a tower fired at a critter.
    TowerFired {
        /// Tower that fired.
        tower: TowerId,
        /// Primary target of the shot.
        target: CritterId,
        /// Number of additional critters hit by splash damage.
        splashed: u32,
    },
    /// Reports that a critter died and paid out its reward.
    CritterKilled {
        /// Identifier of the dead critter.
        critter: CritterId,
        /// Gold credited for the kill.
        reward: u32,
    },
    /// Reports that a critter reached the exit.
    CritterEscaped {
        /// Identifier of the escaped critter.
        critter: CritterId,
        /// Gold deducted for the escape.
        penalty: u32,
    },
    /// Reports the player's gold after a change.
    GoldChanged {
        /// Gold available after the change.
        gold: u32,
    },
    /// Announces that the running wave has no critters left.
    WaveEnded {
        /// Tick during which the wave ended.
        tick: u64,
    },
    /// Announces the end of the game. Emitted at most once per world.
    GameOver {
        /// Tick during which the game ended.
        tick: u64,
        /// Reason the game ended.
        reason: GameOverReason,
    },
}

/// Unique identifier assigned to a critter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CritterId(u32);

impl CritterId {
    /// Creates a new critter identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single map tile expressed as column and row indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    column: u32,
    row: u32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two tile coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Pixel position of the tile's top-left corner.
    #[must_use]
    pub fn origin(self, tile_size: f64) -> Vector2 {
        Vector2::new(
            f64::from(self.column) * tile_size,
            f64::from(self.row) * tile_size,
        )
    }

    /// Pixel rectangle covered by the tile.
    #[must_use]
    pub fn rect(self, tile_size: f64) -> Rect {
        Rect::new(self.origin(tile_size), tile_size, tile_size)
    }
}

/// Movement class of a critter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CritterKind {
    /// Flying critter. Every spawned wave currently consists of these.
    Air,
    /// Walking critter.
    Ground,
}

/// Lifecycle of the current wave.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveState {
    /// No wave has been started yet.
    #[default]
    Idle,
    /// Critters are on the map.
    Running,
    /// The last wave was cleared and the next one may start.
    Ended,
}

/// Reasons the game can end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOverReason {
    /// Too many critters reached the exit.
    CrittersEscaped,
    /// The player's gold dropped to zero.
    Bankrupt,
    /// The simulation detected a broken internal invariant.
    Internal,
}

/// Player request that can be refused by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerRequest {
    /// Purchase of a tower on a tile.
    Buy {
        /// Requested tower type.
        kind: TowerKind,
        /// Requested tile.
        tile: TileCoord,
    },
    /// Upgrade of an existing tower.
    Upgrade {
        /// Tower targeted by the upgrade.
        tower: TowerId,
    },
    /// Start of a new wave.
    StartWave,
}

/// Reasons a player request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum RejectionReason {
    /// The requested tile lies outside the map.
    #[error("tile is outside the map")]
    OutOfBounds,
    /// The requested tile cannot host towers.
    #[error("tile is not a tower slot")]
    NotATowerSlot,
    /// Another tower already occupies the requested slot.
    #[error("tower slot is already occupied")]
    SlotOccupied,
    /// The player cannot afford the request.
    #[error("not enough gold: {cost} needed, {available} available")]
    InsufficientGold {
        /// Gold required by the request.
        cost: u32,
        /// Gold the player had.
        available: u32,
    },
    /// A wave is already on the map.
    #[error("a wave is already running")]
    WaveInProgress,
}

/// Rejection surfaced to the player through the next render snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Tick during which the rejection happened.
    pub tick: u64,
    /// Request that failed.
    pub request: PlayerRequest,
    /// Specific reason the request failed.
    pub reason: RejectionReason,
}

/// Immutable representation of a single critter's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CritterSnapshot {
    /// Unique identifier assigned to the critter.
    pub id: CritterId,
    /// Movement class of the critter.
    pub kind: CritterKind,
    /// Pixel position of the critter's top-left corner.
    pub position: Vector2,
    /// Width of the critter's bounding box.
    pub width: f64,
    /// Height of the critter's bounding box.
    pub height: f64,
    /// Remaining health.
    pub hp: f64,
    /// Health at spawn.
    pub max_hp: f64,
    /// Base speed in pixels per tick.
    pub speed: f64,
    /// Gold paid out on death and charged on escape.
    pub gold_value: u32,
    /// Path tile the critter is walking towards.
    pub next_tile: TileCoord,
    /// Number of path tiles between the next tile and the exit.
    pub remaining_path_tiles: u32,
    /// Damage per second of the active burn.
    pub damage_per_second: f64,
    /// Seconds of burn left.
    pub burn_remaining: f64,
    /// Seconds of freeze left.
    pub frozen_remaining: f64,
}

impl CritterSnapshot {
    /// Bounding box of the critter in pixel space.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(self.position, self.width, self.height)
    }

    /// Centre of the critter's bounding box.
    #[must_use]
    pub fn centre(&self) -> Vector2 {
        self.bounds().centre()
    }
}

/// Read-only snapshot describing all critters on the map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CritterView {
    snapshots: Vec<CritterSnapshot>,
}

impl CritterView {
    /// Creates a new critter view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<CritterSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured critter snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &CritterSnapshot> {
        self.snapshots.iter()
    }

    /// Number of critters captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view captured no critters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<CritterSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single tower's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Kind of tower that was constructed.
    pub kind: TowerKind,
    /// Tile hosting the tower.
    pub tile: TileCoord,
    /// Pixel position of the tower's top-left corner.
    pub position: Vector2,
    /// Side length of the tower in pixels.
    pub size: f64,
    /// Current level, starting at one.
    pub level: u32,
    /// Whether the tower may fire.
    pub active: bool,
    /// Target-selection policy in effect.
    pub strategy: TargetStrategy,
    /// Seconds until the tower may fire again.
    pub cooldown_remaining: f64,
}

impl TowerSnapshot {
    /// Centre of the tower in pixel space.
    #[must_use]
    pub fn centre(&self) -> Vector2 {
        Rect::new(self.position, self.size, self.size).centre()
    }

    /// Square centred on the tower within which critters can be shot.
    #[must_use]
    pub fn range_rect(&self) -> Rect {
        let side = 2.0 * self.kind.range_in_tiles(self.level) * self.size;
        Rect::centered(self.centre(), side, side)
    }

    /// Reports whether the tower is active and its cooldown has elapsed.
    #[must_use]
    pub fn ready_to_fire(&self) -> bool {
        self.active && self.cooldown_remaining <= 0.0
    }
}

/// Read-only snapshot describing all towers placed on the map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of a tower by identifier.
    #[must_use]
    pub fn get(&self, tower: TowerId) -> Option<&TowerSnapshot> {
        self.snapshots
            .binary_search_by_key(&tower, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerSnapshot> {
        self.snapshots
    }
}

/// Primary target chosen for a tower during the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerTarget {
    /// Tower that would fire.
    pub tower: TowerId,
    /// Critter selected by the tower's strategy.
    pub critter: CritterId,
}

/// Immutable view of the world handed to renderers once per tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    /// Tick that produced the snapshot.
    pub tick: u64,
    /// Every placed tower, ordered by identifier.
    pub towers: Vec<TowerSnapshot>,
    /// Every critter on the map, ordered by identifier.
    pub critters: Vec<CritterSnapshot>,
    /// Gold available to the player.
    pub gold: u32,
    /// Critters that may still escape before the game ends.
    pub health: u32,
    /// Lifecycle of the current wave.
    pub wave_state: WaveState,
    /// Number of waves started so far.
    pub wave_number: u32,
    /// Level applied to critter movement.
    pub level: u32,
    /// Last rejection recorded during the tick, if any.
    pub warning: Option<Warning>,
    /// Reason the game ended, once it has.
    pub game_over: Option<GameOverReason>,
}

/// Default attributes assigned to spawned critters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CritterDefaults {
    /// Health at spawn.
    pub max_hp: f64,
    /// Pixels travelled per tick at level one.
    pub speed: f64,
    /// Gold paid out on death and charged on escape.
    pub gold_value: u32,
}

impl Default for CritterDefaults {
    fn default() -> Self {
        Self {
            max_hp: 100.0,
            speed: 1.0,
            gold_value: 10,
        }
    }
}

/// Tunable rules of the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Side length of a tile in pixels.
    pub tile_size: f64,
    /// Gold available before the first purchase.
    pub starting_gold: u32,
    /// Escaped critters that end the game.
    pub max_critters_passed: u32,
    /// Inclusive lower bound of the wave size draw.
    pub spawn_min: u32,
    /// Inclusive upper bound of the wave size draw.
    pub spawn_max: u32,
    /// Level in effect before the first wave ends.
    pub starting_level: u32,
    /// Interpretation of the towers' rate-of-fire constant.
    pub fire_cadence: FireCadence,
    /// Attributes of spawned critters.
    pub critter: CritterDefaults,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            starting_gold: 500,
            max_critters_passed: MAX_CRITTERS_PASSED,
            spawn_min: SPAWN_COUNT_MIN,
            spawn_max: SPAWN_COUNT_MAX,
            starting_level: 1,
            fire_cadence: FireCadence::default(),
            critter: CritterDefaults::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tower_snapshot(kind: TowerKind, tile: TileCoord) -> TowerSnapshot {
        TowerSnapshot {
            id: TowerId::new(1),
            kind,
            tile,
            position: tile.origin(TILE_SIZE),
            size: TILE_SIZE,
            level: 1,
            active: true,
            strategy: TargetStrategy::LowestHp,
            cooldown_remaining: 0.0,
        }
    }

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = TileCoord::new(1, 1);
        let destination = TileCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn tile_origin_scales_with_tile_size() {
        assert_eq!(
            TileCoord::new(3, 2).origin(TILE_SIZE),
            Vector2::new(96.0, 64.0)
        );
    }

    #[test]
    fn range_rect_is_centred_on_tower() {
        let tower = tower_snapshot(TowerKind::Arrow, TileCoord::new(1, 2));
        let range = tower.range_rect();
        assert_eq!(range.width(), 256.0);
        assert_eq!(range.height(), 256.0);
        assert_eq!(range.centre(), Vector2::new(48.0, 80.0));
    }

    #[test]
    fn inactive_tower_is_never_ready() {
        let mut tower = tower_snapshot(TowerKind::Frost, TileCoord::new(0, 0));
        assert!(tower.ready_to_fire());
        tower.active = false;
        assert!(!tower.ready_to_fire());
        tower.active = true;
        tower.cooldown_remaining = 0.5;
        assert!(!tower.ready_to_fire());
    }

    #[test]
    fn tower_view_orders_and_finds_by_id() {
        let mut first = tower_snapshot(TowerKind::Arrow, TileCoord::new(0, 0));
        first.id = TowerId::new(9);
        let mut second = tower_snapshot(TowerKind::Siege, TileCoord::new(1, 0));
        second.id = TowerId::new(3);
        let view = TowerView::from_snapshots(vec![first, second]);

        let ids: Vec<u32> = view.iter().map(|tower| tower.id.get()).collect();
        assert_eq!(ids, vec![3, 9]);
        assert_eq!(view.get(TowerId::new(9)).map(|tower| tower.kind), Some(TowerKind::Arrow));
        assert!(view.get(TowerId::new(4)).is_none());
    }

    #[test]
    fn render_snapshot_round_trips_through_bincode() {
        let snapshot = RenderSnapshot {
            tick: 12,
            towers: vec![tower_snapshot(TowerKind::Siege, TileCoord::new(2, 3))],
            critters: Vec::new(),
            gold: 300,
            health: 7,
            wave_state: WaveState::Running,
            wave_number: 2,
            level: 2,
            warning: Some(Warning {
                tick: 12,
                request: PlayerRequest::Buy {
                    kind: TowerKind::Arrow,
                    tile: TileCoord::new(0, 0),
                },
                reason: RejectionReason::InsufficientGold {
                    cost: 250,
                    available: 100,
                },
            }),
            game_over: None,
        };

        let bytes = bincode::serialize(&snapshot).expect("serialize");
        let restored: RenderSnapshot = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn rejection_reasons_render_for_players() {
        let reason = RejectionReason::InsufficientGold {
            cost: 250,
            available: 100,
        };
        assert_eq!(
            reason.to_string(),
            "not enough gold: 250 needed, 100 available"
        );
    }
}
