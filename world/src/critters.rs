//! Critter state and the manager that walks waves along the path.

use tile_defence_core::{
    chebyshev_within, CritterDefaults, CritterId, CritterKind, CritterSnapshot, Rect, TileCoord,
    Vector2,
};

use crate::map::{Path, Tile, TileKind};

/// Enemy walking from the entry to the exit.
#[derive(Clone, Debug, PartialEq)]
pub struct Critter {
    id: CritterId,
    kind: CritterKind,
    position: Vector2,
    size: f64,
    max_hp: f64,
    hp: f64,
    speed: f64,
    gold_value: u32,
    next_path_index: usize,
    damage_per_second: f64,
    burn_remaining: f64,
    frozen_remaining: f64,
}

impl Critter {
    /// Creates a healthy critter heading for the first path tile.
    #[must_use]
    pub fn new(
        id: CritterId,
        kind: CritterKind,
        position: Vector2,
        size: f64,
        defaults: &CritterDefaults,
    ) -> Self {
        let max_hp = defaults.max_hp.max(0.0);
        Self {
            id,
            kind,
            position,
            size,
            max_hp,
            hp: max_hp,
            speed: defaults.speed,
            gold_value: defaults.gold_value,
            next_path_index: 0,
            damage_per_second: 0.0,
            burn_remaining: 0.0,
            frozen_remaining: 0.0,
        }
    }

    /// Identifier of the critter.
    #[must_use]
    pub const fn id(&self) -> CritterId {
        self.id
    }

    /// Movement class of the critter.
    #[must_use]
    pub const fn kind(&self) -> CritterKind {
        self.kind
    }

    /// Pixel position of the top-left corner.
    #[must_use]
    pub const fn position(&self) -> Vector2 {
        self.position
    }

    /// Moves the critter to `position`.
    pub fn set_position(&mut self, position: Vector2) {
        self.position = position;
    }

    /// Remaining health.
    #[must_use]
    pub const fn hp(&self) -> f64 {
        self.hp
    }

    /// Health at spawn.
    #[must_use]
    pub const fn max_hp(&self) -> f64 {
        self.max_hp
    }

    /// Gold paid out on death and charged on escape.
    #[must_use]
    pub const fn gold_value(&self) -> u32 {
        self.gold_value
    }

    /// Index of the path tile the critter walks towards.
    #[must_use]
    pub const fn next_path_index(&self) -> usize {
        self.next_path_index
    }

    /// Points the critter at another path tile.
    pub fn set_next_path_index(&mut self, index: usize) {
        self.next_path_index = index;
    }

    /// Damage per second of the active burn.
    #[must_use]
    pub const fn damage_per_second(&self) -> f64 {
        self.damage_per_second
    }

    /// Seconds of burn left.
    #[must_use]
    pub const fn burn_remaining(&self) -> f64 {
        self.burn_remaining
    }

    /// Seconds of freeze left.
    #[must_use]
    pub const fn frozen_remaining(&self) -> f64 {
        self.frozen_remaining
    }

    /// Bounding box in pixel space.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(self.position, self.size, self.size)
    }

    /// Centre of the bounding box.
    #[must_use]
    pub fn centre(&self) -> Vector2 {
        self.bounds().centre()
    }

    /// Reports whether the bounding box overlaps `rect`.
    #[must_use]
    pub fn collides_with_rect(&self, rect: &Rect) -> bool {
        self.bounds().intersects(rect)
    }

    /// Reports whether the bounding box contains `point`.
    #[must_use]
    pub fn collides_with_point(&self, point: Vector2) -> bool {
        self.bounds().contains(point)
    }

    /// Reports whether the critter has no health left.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.hp <= 0.0
    }

    /// Reports whether a freeze is slowing the critter down.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen_remaining > 0.0
    }

    /// Factor applied to the movement step.
    #[must_use]
    pub fn speed_factor(&self) -> f64 {
        if self.is_frozen() {
            0.5
        } else {
            1.0
        }
    }

    /// Subtracts `amount` from the health, never going below zero.
    pub fn take_damage(&mut self, amount: f64) {
        self.hp = (self.hp - amount.max(0.0)).max(0.0);
    }

    /// Replaces any active burn.
    pub fn apply_burn(&mut self, damage_per_second: f64, duration: f64) {
        self.damage_per_second = damage_per_second.max(0.0);
        self.burn_remaining = duration.max(0.0);
    }

    /// Extends the freeze to at least `duration` seconds.
    pub fn apply_freeze(&mut self, duration: f64) {
        self.frozen_remaining = self.frozen_remaining.max(duration);
    }

    /// Ticks the status effects by `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        let dt = dt.max(0.0);
        if self.burn_remaining > 0.0 {
            self.take_damage(self.damage_per_second * dt.min(self.burn_remaining));
            self.burn_remaining = (self.burn_remaining - dt).max(0.0);
        }
        if self.frozen_remaining > 0.0 {
            self.frozen_remaining = (self.frozen_remaining - dt).max(0.0);
        }
    }

    /// Captures an immutable view of the critter.
    #[must_use]
    pub fn snapshot(&self, path: &Path) -> CritterSnapshot {
        CritterSnapshot {
            id: self.id,
            kind: self.kind,
            position: self.position,
            width: self.size,
            height: self.size,
            hp: self.hp,
            max_hp: self.max_hp,
            speed: self.speed,
            gold_value: self.gold_value,
            next_tile: path
                .get(self.next_path_index)
                .or_else(|| path.last())
                .map_or(TileCoord::new(0, 0), Tile::coord),
            remaining_path_tiles: path.remaining_after(self.next_path_index),
            damage_per_second: self.damage_per_second,
            burn_remaining: self.burn_remaining,
            frozen_remaining: self.frozen_remaining,
        }
    }
}

/// Broken assumption detected while updating critters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    /// A wave was requested on a path without tiles.
    #[error("cannot spawn critters on an empty path")]
    EmptyPath,
    /// A critter points past the end of the path.
    #[error("critter {critter:?} points at path index {index} but the path has {len} tiles")]
    PathIndexOutOfRange {
        /// Offending critter.
        critter: CritterId,
        /// Index stored on the critter.
        index: usize,
        /// Number of tiles on the path.
        len: usize,
    },
    /// A critter moved to a position that is not a finite number.
    #[error("critter {critter:?} has a non-finite position")]
    NonFinitePosition {
        /// Offending critter.
        critter: CritterId,
    },
}

/// Outcome of a single critter manager update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CritterReport {
    /// Kill rewards minus escape penalties.
    pub gold_delta: i64,
    /// Critters removed because they died, with their reward.
    pub killed: Vec<(CritterId, u32)>,
    /// Critters removed because they reached the exit, with their penalty.
    pub escaped: Vec<(CritterId, u32)>,
}

/// Owner of the critters on the map and of the path they follow.
#[derive(Clone, Debug)]
pub struct CritterManager {
    path: Path,
    tile_size: f64,
    defaults: CritterDefaults,
    critters: Vec<Critter>,
    next_critter_id: CritterId,
    critters_passed: u32,
}

impl CritterManager {
    /// Creates a manager with no critters.
    #[must_use]
    pub fn new(path: Path, tile_size: f64, defaults: CritterDefaults) -> Self {
        Self {
            path,
            tile_size,
            defaults,
            critters: Vec::new(),
            next_critter_id: CritterId::new(0),
            critters_passed: 0,
        }
    }

    /// Path walked by the critters.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Critters currently on the map, ordered by identifier.
    #[must_use]
    pub fn critters(&self) -> &[Critter] {
        &self.critters
    }

    /// Critter with identifier `id`, if it is still on the map.
    #[must_use]
    pub fn critter(&self, id: CritterId) -> Option<&Critter> {
        self.index_of(id).map(|index| &self.critters[index])
    }

    /// Mutable access to the critter with identifier `id`.
    pub fn critter_mut(&mut self, id: CritterId) -> Option<&mut Critter> {
        self.index_of(id).map(|index| &mut self.critters[index])
    }

    /// Reports whether no critter is on the map.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.critters.is_empty()
    }

    /// Critters that reached the exit during the current wave.
    #[must_use]
    pub const fn critters_passed(&self) -> u32 {
        self.critters_passed
    }

    /// Places a single default critter at `position` heading for the entry.
    pub fn spawn_at(&mut self, position: Vector2, kind: CritterKind) -> CritterId {
        let id = self.allocate_id();
        self.critters.push(Critter::new(
            id,
            kind,
            position,
            self.tile_size,
            &self.defaults,
        ));
        id
    }

    /// Replaces the critters on the map with a fresh wave of `count` critters.
    ///
    /// Critters queue up one tile apart behind the entry, opposite to the
    /// direction of the first path step. The first critter stands on the entry.
    pub fn start_wave(&mut self, count: u32) -> Result<(), InvariantViolation> {
        let entry = self.path.first().ok_or(InvariantViolation::EmptyPath)?;
        let origin = entry.position();
        let first_step = self
            .path
            .get(1)
            .map_or(Vector2::ZERO, |second| second.position() - origin);
        let spacing = -Vector2::new(unit(first_step.x), unit(first_step.y)) * self.tile_size;

        self.critters.clear();
        self.critters_passed = 0;

        let mut position = origin;
        for _ in 0..count {
            let _ = self.spawn_at(position, CritterKind::Air);
            position += spacing;
        }
        Ok(())
    }

    /// Advances every critter by one tick.
    ///
    /// Dead critters are removed and credited. Survivors burn, move by
    /// `speed + (level - 1)` pixels (halved while frozen) and leave the map
    /// once they stand on the exit.
    pub fn update(&mut self, dt: f64, level: u32) -> Result<CritterReport, InvariantViolation> {
        let mut report = CritterReport::default();
        let mut removed: Vec<CritterId> = Vec::new();
        let level_bonus = f64::from(level.saturating_sub(1));
        let last_index = self.path.last_index().ok_or(InvariantViolation::EmptyPath)?;

        for critter in &mut self.critters {
            if !critter.is_dead() {
                critter.update(dt);
            }
            if critter.is_dead() {
                report.gold_delta += i64::from(critter.gold_value);
                report.killed.push((critter.id, critter.gold_value));
                removed.push(critter.id);
                continue;
            }

            let step = (critter.speed + level_bonus) * critter.speed_factor();
            move_toward_next_tile(&self.path, critter, step)?;
            let _ = advance_next_tile(&self.path, critter);

            if critter.next_path_index == last_index && exit_reached(&self.path, critter) {
                self.critters_passed = self.critters_passed.saturating_add(1);
                report.gold_delta -= i64::from(critter.gold_value);
                report.escaped.push((critter.id, critter.gold_value));
                removed.push(critter.id);
            }
        }

        if !removed.is_empty() {
            self.critters
                .retain(|critter| removed.binary_search(&critter.id).is_err());
        }
        Ok(report)
    }

    /// Critters whose bounding box overlaps the range rectangle.
    pub fn shootable_critters<'a>(&'a self, range: &'a Rect) -> impl Iterator<Item = &'a Critter> {
        self.critters
            .iter()
            .filter(move |critter| critter.collides_with_rect(range))
    }

    /// Critters other than `primary` whose centre lies within the square of
    /// half-side `range` around the primary's centre.
    #[must_use]
    pub fn critter_neighbours(&self, primary: CritterId, range: f64) -> Vec<CritterId> {
        let Some(centre) = self.critter(primary).map(Critter::centre) else {
            return Vec::new();
        };
        self.critters
            .iter()
            .filter(|critter| critter.id != primary)
            .filter(|critter| chebyshev_within(centre, critter.centre(), range))
            .map(Critter::id)
            .collect()
    }

    /// Square of side `2 * range` centred on `centre`.
    #[must_use]
    pub fn splash_rectangle(range: f64, centre: Vector2) -> Rect {
        Rect::centered(centre, 2.0 * range, 2.0 * range)
    }

    /// Path tile `critter` walks towards, advancing it first when the critter
    /// already touches the centre of its current target.
    pub fn next_tile(&self, critter: &mut Critter) -> Option<&Tile> {
        let index = advance_next_tile(&self.path, critter)?;
        self.path.get(index)
    }

    /// Reports whether `critter` touches the centre of the exit tile.
    #[must_use]
    pub fn reached_exit(&self, critter: &Critter) -> bool {
        exit_reached(&self.path, critter)
    }

    fn allocate_id(&mut self) -> CritterId {
        let id = self.next_critter_id;
        self.next_critter_id = CritterId::new(id.get().saturating_add(1));
        id
    }

    fn index_of(&self, id: CritterId) -> Option<usize> {
        self.critters
            .binary_search_by_key(&id, |critter| critter.id)
            .ok()
    }
}

fn unit(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value.signum()
    }
}

fn approach(current: f64, target: f64, step: f64) -> f64 {
    if current < target {
        (current + step).min(target)
    } else if current > target {
        (current - step).max(target)
    } else {
        current
    }
}

fn move_toward_next_tile(
    path: &Path,
    critter: &mut Critter,
    step: f64,
) -> Result<(), InvariantViolation> {
    let target = path
        .get(critter.next_path_index)
        .ok_or(InvariantViolation::PathIndexOutOfRange {
            critter: critter.id,
            index: critter.next_path_index,
            len: path.len(),
        })?;

    let current = critter.centre();
    let destination = target.centre();
    let offset = Vector2::new(
        approach(current.x, destination.x, step) - current.x,
        approach(current.y, destination.y, step) - current.y,
    );
    critter.position += offset;

    if !critter.position.is_finite() {
        return Err(InvariantViolation::NonFinitePosition {
            critter: critter.id,
        });
    }
    Ok(())
}

fn advance_next_tile(path: &Path, critter: &mut Critter) -> Option<usize> {
    let current = path.get(critter.next_path_index)?;
    let last_index = path.last_index()?;
    if critter.next_path_index < last_index && critter.collides_with_point(current.centre()) {
        critter.next_path_index += 1;
    }
    Some(critter.next_path_index)
}

fn exit_reached(path: &Path, critter: &Critter) -> bool {
    path.last()
        .filter(|tile| tile.kind() == TileKind::Exit)
        .is_some_and(|exit| critter.collides_with_point(exit.centre()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_defence_core::{SPLASH_RANGE, TILE_SIZE};

    fn tile(column: u32, row: u32, kind: TileKind) -> Tile {
        Tile::new(TileCoord::new(column, row), kind, TILE_SIZE)
    }

    fn corridor() -> Path {
        Path::from_tiles(vec![
            tile(0, 1, TileKind::Entry),
            tile(1, 1, TileKind::Path),
            tile(2, 1, TileKind::Path),
            tile(3, 1, TileKind::Exit),
        ])
    }

    fn manager(path: Path) -> CritterManager {
        CritterManager::new(path, TILE_SIZE, CritterDefaults::default())
    }

    #[test]
    fn shootable_critters_overlap_the_range() {
        let mut manager = manager(corridor());
        let inside = manager.spawn_at(Vector2::new(100.0, 100.0), CritterKind::Air);
        let _outside = manager.spawn_at(Vector2::new(1000.0, 1000.0), CritterKind::Air);
        let range = Rect::new(Vector2::new(0.0, 0.0), 200.0, 200.0);

        let hits: Vec<CritterId> = manager.shootable_critters(&range).map(Critter::id).collect();
        assert_eq!(hits, vec![inside]);
    }

    #[test]
    fn splash_rectangle_spans_twice_the_range() {
        let rect = CritterManager::splash_rectangle(SPLASH_RANGE, Vector2::new(2.0, 2.0));
        assert_eq!(rect.width(), 192.0);
        assert_eq!(rect.height(), 192.0);
        assert_eq!(rect.centre(), Vector2::new(2.0, 2.0));
    }

    #[test]
    fn next_tile_advances_once_the_current_centre_is_touched() {
        let path = Path::from_tiles(vec![tile(0, 0, TileKind::Entry), tile(1, 0, TileKind::Path)]);
        let manager = manager(path);
        let mut critter = Critter::new(
            CritterId::new(0),
            CritterKind::Air,
            Vector2::new(0.0, 0.0),
            TILE_SIZE,
            &CritterDefaults::default(),
        );

        let next = manager.next_tile(&mut critter).map(Tile::coord);
        assert_eq!(next, Some(TileCoord::new(1, 0)));
        assert_eq!(critter.next_path_index(), 1);

        let again = manager.next_tile(&mut critter).map(Tile::coord);
        assert_eq!(again, Some(TileCoord::new(1, 0)));
        assert_eq!(critter.next_path_index(), 1);
    }

    #[test]
    fn exit_is_reached_when_the_box_covers_its_centre() {
        let manager = manager(corridor());
        let defaults = CritterDefaults::default();
        let on_exit = Critter::new(
            CritterId::new(0),
            CritterKind::Air,
            Vector2::new(96.0, 32.0),
            TILE_SIZE,
            &defaults,
        );
        let short_of_exit = Critter::new(
            CritterId::new(1),
            CritterKind::Air,
            Vector2::new(64.0, 32.0),
            TILE_SIZE,
            &defaults,
        );
        assert!(manager.reached_exit(&on_exit));
        assert!(!manager.reached_exit(&short_of_exit));
    }

    #[test]
    fn burn_deals_damage_per_second_for_its_duration() {
        let mut critter = Critter::new(
            CritterId::new(0),
            CritterKind::Air,
            Vector2::ZERO,
            TILE_SIZE,
            &CritterDefaults::default(),
        );
        critter.apply_burn(50.0, 0.3);
        for _ in 0..20 {
            critter.update(1.0 / 60.0);
        }
        assert!((critter.hp() - 85.0).abs() < 1e-9);
        assert_eq!(critter.burn_remaining(), 0.0);
    }

    #[test]
    fn burn_reapplication_overwrites_instead_of_stacking() {
        let mut once = Critter::new(
            CritterId::new(0),
            CritterKind::Air,
            Vector2::ZERO,
            TILE_SIZE,
            &CritterDefaults::default(),
        );
        let mut twice = once.clone();
        once.apply_burn(50.0, 0.3);
        twice.apply_burn(50.0, 0.3);
        twice.apply_burn(50.0, 0.3);
        assert_eq!(once, twice);
    }

    #[test]
    fn freeze_keeps_the_longer_duration_and_halves_speed() {
        let mut critter = Critter::new(
            CritterId::new(0),
            CritterKind::Air,
            Vector2::ZERO,
            TILE_SIZE,
            &CritterDefaults::default(),
        );
        critter.apply_freeze(0.5);
        critter.apply_freeze(0.2);
        assert_eq!(critter.frozen_remaining(), 0.5);
        assert_eq!(critter.speed_factor(), 0.5);
        critter.update(1.0);
        assert_eq!(critter.frozen_remaining(), 0.0);
        assert_eq!(critter.speed_factor(), 1.0);
    }

    #[test]
    fn damage_never_drives_health_negative() {
        let mut critter = Critter::new(
            CritterId::new(0),
            CritterKind::Air,
            Vector2::ZERO,
            TILE_SIZE,
            &CritterDefaults::default(),
        );
        critter.take_damage(250.0);
        assert_eq!(critter.hp(), 0.0);
        assert!(critter.is_dead());
    }

    #[test]
    fn wave_queues_behind_the_entry() {
        let mut manager = manager(corridor());
        manager.start_wave(3).expect("wave spawns");
        let positions: Vec<Vector2> = manager.critters().iter().map(Critter::position).collect();
        assert_eq!(
            positions,
            vec![
                Vector2::new(0.0, 32.0),
                Vector2::new(-32.0, 32.0),
                Vector2::new(-64.0, 32.0),
            ]
        );
        assert!(manager
            .critters()
            .iter()
            .all(|critter| critter.next_path_index() == 0 && critter.kind() == CritterKind::Air));
    }

    #[test]
    fn vertical_first_step_queues_critters_vertically() {
        let path = Path::from_tiles(vec![
            tile(2, 3, TileKind::Entry),
            tile(2, 2, TileKind::Path),
            tile(2, 1, TileKind::Exit),
        ]);
        let mut manager = manager(path);
        manager.start_wave(2).expect("wave spawns");
        let positions: Vec<Vector2> = manager.critters().iter().map(Critter::position).collect();
        assert_eq!(positions, vec![Vector2::new(64.0, 96.0), Vector2::new(64.0, 128.0)]);
    }

    #[test]
    fn empty_path_cannot_spawn() {
        let mut manager = manager(Path::default());
        assert_eq!(manager.start_wave(5), Err(InvariantViolation::EmptyPath));
    }

    #[test]
    fn critter_identifiers_are_never_reused() {
        let mut manager = manager(corridor());
        manager.start_wave(2).expect("first wave");
        manager.start_wave(2).expect("second wave");
        let ids: Vec<u32> = manager.critters().iter().map(|critter| critter.id().get()).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn movement_never_overshoots_the_next_tile() {
        let path = Path::from_tiles(vec![tile(0, 0, TileKind::Entry), tile(1, 0, TileKind::Exit)]);
        let mut manager = CritterManager::new(
            path,
            TILE_SIZE,
            CritterDefaults {
                speed: 50.0,
                ..CritterDefaults::default()
            },
        );
        let id = manager.spawn_at(Vector2::ZERO, CritterKind::Ground);
        manager
            .critter_mut(id)
            .expect("spawned")
            .set_next_path_index(1);

        let report = manager.update(1.0 / 60.0, 1).expect("update");
        assert_eq!(report.escaped, vec![(id, 10)]);
        assert_eq!(report.gold_delta, -10);
        assert_eq!(manager.critters_passed(), 1);
        assert!(manager.is_empty());
    }

    #[test]
    fn level_bonus_adds_to_the_step() {
        let mut manager = manager(corridor());
        let id = manager.spawn_at(Vector2::new(0.0, 32.0), CritterKind::Air);
        manager
            .critter_mut(id)
            .expect("spawned")
            .set_next_path_index(1);

        let _ = manager.update(0.0, 3).expect("update");
        let critter = manager.critter(id).expect("still walking");
        assert_eq!(critter.position(), Vector2::new(3.0, 32.0));
    }

    #[test]
    fn dead_critters_are_credited_once() {
        let mut manager = manager(corridor());
        manager.start_wave(2).expect("wave spawns");
        let victim = CritterId::new(1);
        manager.critter_mut(victim).expect("spawned").take_damage(500.0);

        let report = manager.update(1.0 / 60.0, 1).expect("update");
        assert_eq!(report.killed, vec![(victim, 10)]);
        assert_eq!(report.gold_delta, 10);
        assert!(manager.critter(victim).is_none());

        let report = manager.update(1.0 / 60.0, 1).expect("update");
        assert!(report.killed.is_empty());
        assert_eq!(report.gold_delta, 0);
    }

    #[test]
    fn splash_neighbourhood_is_symmetric() {
        let mut manager = manager(corridor());
        let a = manager.spawn_at(Vector2::new(0.0, 0.0), CritterKind::Air);
        let b = manager.spawn_at(Vector2::new(96.0, 96.0), CritterKind::Air);
        let c = manager.spawn_at(Vector2::new(97.0, 0.0), CritterKind::Air);

        assert_eq!(manager.critter_neighbours(a, SPLASH_RANGE), vec![b]);
        assert_eq!(manager.critter_neighbours(b, SPLASH_RANGE), vec![a, c]);
        assert_eq!(manager.critter_neighbours(c, SPLASH_RANGE), vec![b]);
    }

    #[test]
    fn every_critter_targets_a_tile_on_the_path() {
        let mut manager = manager(corridor());
        manager.start_wave(5).expect("wave spawns");
        for _ in 0..600 {
            let _ = manager.update(1.0 / 60.0, 1).expect("update");
            for critter in manager.critters() {
                assert!(critter.next_path_index() < manager.path().len());
                assert!(critter.hp() >= 0.0 && critter.hp() <= critter.max_hp());
            }
        }
        assert!(manager.is_empty());
        assert_eq!(manager.critters_passed(), 5);
    }
}
