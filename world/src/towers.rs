//! Authoritative tower state management utilities.

use std::collections::{BTreeMap, VecDeque};

use tile_defence_core::{
    TargetStrategy, TileCoord, TowerId, TowerKind, TowerSnapshot, TOWER_LOG_CAPACITY,
};

/// Line recorded in a tower's activity log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TowerLogEntry {
    /// Tick during which the activity happened.
    pub tick: u64,
    /// Human readable description of the activity.
    pub message: String,
}

/// Snapshot of a tower stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct TowerState {
    /// Identifier allocated by the world for the tower.
    pub(crate) id: TowerId,
    /// Kind of tower that was constructed.
    pub(crate) kind: TowerKind,
    /// Tile hosting the tower.
    pub(crate) tile: TileCoord,
    /// Current level, starting at one.
    pub(crate) level: u32,
    /// Whether the tower may fire.
    pub(crate) active: bool,
    /// Target-selection policy in effect.
    pub(crate) strategy: TargetStrategy,
    /// Seconds until the tower may fire again.
    pub(crate) cooldown_remaining: f64,
    log: VecDeque<TowerLogEntry>,
}

impl TowerState {
    fn new(id: TowerId, kind: TowerKind, tile: TileCoord) -> Self {
        Self {
            id,
            kind,
            tile,
            level: 1,
            active: true,
            strategy: TargetStrategy::default(),
            cooldown_remaining: 0.0,
            log: VecDeque::with_capacity(TOWER_LOG_CAPACITY),
        }
    }

    /// Appends an activity line, evicting the oldest once the log is full.
    pub(crate) fn record(&mut self, tick: u64, message: String) {
        tracing::debug!(tower = self.id.get(), tick, "{message}");
        if self.log.len() == TOWER_LOG_CAPACITY {
            let _ = self.log.pop_front();
        }
        self.log.push_back(TowerLogEntry { tick, message });
    }

    /// Activity lines from oldest to newest.
    pub(crate) fn log(&self) -> impl Iterator<Item = &TowerLogEntry> {
        self.log.iter()
    }

    /// Captures an immutable view of the tower.
    pub(crate) fn snapshot(&self, tile_size: f64) -> TowerSnapshot {
        TowerSnapshot {
            id: self.id,
            kind: self.kind,
            tile: self.tile,
            position: self.tile.origin(tile_size),
            size: tile_size,
            level: self.level,
            active: self.active,
            strategy: self.strategy,
            cooldown_remaining: self.cooldown_remaining,
        }
    }
}

/// Registry that stores towers and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct TowerRegistry {
    entries: BTreeMap<TowerId, TowerState>,
    next_tower_id: TowerId,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_tower_id: TowerId::new(0),
        }
    }

    /// Stores a new level-one tower and returns its identifier.
    pub(crate) fn insert(&mut self, kind: TowerKind, tile: TileCoord) -> TowerId {
        let id = self.next_tower_id;
        self.next_tower_id = TowerId::new(id.get().saturating_add(1));
        let _ = self.entries.insert(id, TowerState::new(id, kind, tile));
        id
    }

    /// Removes a tower, returning its final state.
    pub(crate) fn remove(&mut self, id: TowerId) -> Option<TowerState> {
        self.entries.remove(&id)
    }

    pub(crate) fn get(&self, id: TowerId) -> Option<&TowerState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TowerId) -> Option<&mut TowerState> {
        self.entries.get_mut(&id)
    }

    /// Tower built on `tile`, if any.
    pub(crate) fn at_tile(&self, tile: TileCoord) -> Option<TowerId> {
        self.entries
            .values()
            .find(|tower| tower.tile == tile)
            .map(|tower| tower.id)
    }

    /// Towers in identifier order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &TowerState> {
        self.entries.values()
    }

    /// Lowers the cooldown of every active tower by `dt` seconds, stopping at
    /// zero. Disabled towers keep their remaining cooldown.
    pub(crate) fn cool_down(&mut self, dt: f64) {
        for tower in self.entries.values_mut().filter(|tower| tower.active) {
            tower.cooldown_remaining = (tower.cooldown_remaining - dt).max(0.0);
        }
    }
}
