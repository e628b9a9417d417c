#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that computes deterministic tower targets from world snapshots.

use std::cmp::Ordering;

use tile_defence_core::{
    CritterId, CritterSnapshot, CritterView, TargetStrategy, TowerTarget, TowerView, Vector2,
};

/// Tower targeting system that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    critter_workspace: Vec<CritterCandidate>,
}

impl TowerTargeting {
    /// Creates a new tower targeting system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes tower targets for the provided world snapshot.
    ///
    /// The output buffer is cleared before populating it with the latest
    /// assignments. Inactive towers and towers without shootable critters
    /// receive no assignment.
    pub fn handle(
        &mut self,
        towers: &TowerView,
        critters: &CritterView,
        out: &mut Vec<TowerTarget>,
    ) {
        out.clear();

        if critters.is_empty() {
            return;
        }

        for tower in towers.iter().filter(|tower| tower.active) {
            let range = tower.range_rect();
            let centre = tower.centre();

            self.critter_workspace.clear();
            self.critter_workspace.extend(
                critters
                    .iter()
                    .filter(|critter| critter.bounds().intersects(&range))
                    .map(|critter| CritterCandidate::new(critter, centre)),
            );

            if let Some(critter) = best_of(tower.strategy, &self.critter_workspace) {
                out.push(TowerTarget {
                    tower: tower.id,
                    critter,
                });
            }
        }
    }
}

/// Picks the primary target among `candidates` for a tower centred on
/// `tower_centre`.
///
/// Ties are broken by the lowest critter identifier, so the result does not
/// depend on the order of `candidates`.
#[must_use]
pub fn select_target<'a, I>(
    strategy: TargetStrategy,
    tower_centre: Vector2,
    candidates: I,
) -> Option<CritterId>
where
    I: IntoIterator<Item = &'a CritterSnapshot>,
{
    let workspace: Vec<CritterCandidate> = candidates
        .into_iter()
        .map(|critter| CritterCandidate::new(critter, tower_centre))
        .collect();
    best_of(strategy, &workspace)
}

fn best_of(strategy: TargetStrategy, candidates: &[CritterCandidate]) -> Option<CritterId> {
    let mut best: Option<&CritterCandidate> = None;
    for candidate in candidates {
        match best {
            Some(existing) if !candidate.precedes(existing, strategy) => {}
            _ => best = Some(candidate),
        }
    }
    best.map(|candidate| candidate.id)
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct CritterCandidate {
    id: CritterId,
    hp: f64,
    max_hp: f64,
    remaining_path_tiles: u32,
    distance: f64,
}

impl CritterCandidate {
    fn new(critter: &CritterSnapshot, tower_centre: Vector2) -> Self {
        Self {
            id: critter.id,
            hp: critter.hp,
            max_hp: critter.max_hp,
            remaining_path_tiles: critter.remaining_path_tiles,
            distance: critter.centre().distance(tower_centre),
        }
    }

    fn precedes(&self, other: &Self, strategy: TargetStrategy) -> bool {
        let primary = match strategy {
            TargetStrategy::LowestHp => self.hp.total_cmp(&other.hp),
            TargetStrategy::HighestHp => other.hp.total_cmp(&self.hp),
            TargetStrategy::NearestToExit => {
                self.remaining_path_tiles.cmp(&other.remaining_path_tiles)
            }
            TargetStrategy::NearestToTower => self.distance.total_cmp(&other.distance),
            TargetStrategy::Strongest => other
                .max_hp
                .total_cmp(&self.max_hp)
                .then_with(|| other.hp.total_cmp(&self.hp)),
        };
        primary.then_with(|| self.id.cmp(&other.id)) == Ordering::Less
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_defence_core::{CritterKind, TileCoord, TowerId, TowerKind, TowerSnapshot, TILE_SIZE};

    fn critter(id: u32, position: (f64, f64), hp: f64) -> CritterSnapshot {
        CritterSnapshot {
            id: CritterId::new(id),
            kind: CritterKind::Air,
            position: Vector2::new(position.0, position.1),
            width: TILE_SIZE,
            height: TILE_SIZE,
            hp,
            max_hp: 100.0,
            speed: 1.0,
            gold_value: 10,
            next_tile: TileCoord::new(0, 0),
            remaining_path_tiles: 5,
            damage_per_second: 0.0,
            burn_remaining: 0.0,
            frozen_remaining: 0.0,
        }
    }

    fn tower(id: u32, tile: (u32, u32), strategy: TargetStrategy) -> TowerSnapshot {
        let tile = TileCoord::new(tile.0, tile.1);
        TowerSnapshot {
            id: TowerId::new(id),
            kind: TowerKind::Frost,
            tile,
            position: tile.origin(TILE_SIZE),
            size: TILE_SIZE,
            level: 1,
            active: true,
            strategy,
            cooldown_remaining: 0.0,
        }
    }

    #[test]
    fn lowest_hp_prefers_the_weakest_critter() {
        let critters = [critter(1, (0.0, 0.0), 80.0), critter(2, (0.0, 0.0), 20.0)];
        assert_eq!(
            select_target(TargetStrategy::LowestHp, Vector2::ZERO, &critters),
            Some(CritterId::new(2))
        );
        assert_eq!(
            select_target(TargetStrategy::HighestHp, Vector2::ZERO, &critters),
            Some(CritterId::new(1))
        );
    }

    #[test]
    fn nearest_to_exit_uses_remaining_path_tiles() {
        let mut ahead = critter(4, (0.0, 0.0), 100.0);
        ahead.remaining_path_tiles = 1;
        let behind = critter(3, (0.0, 0.0), 100.0);
        assert_eq!(
            select_target(TargetStrategy::NearestToExit, Vector2::ZERO, [&behind, &ahead]),
            Some(CritterId::new(4))
        );
    }

    #[test]
    fn nearest_to_tower_measures_between_centres() {
        let near = critter(7, (40.0, 0.0), 100.0);
        let far = critter(2, (200.0, 0.0), 100.0);
        assert_eq!(
            select_target(TargetStrategy::NearestToTower, Vector2::new(16.0, 16.0), [&far, &near]),
            Some(CritterId::new(7))
        );
    }

    #[test]
    fn strongest_compares_max_hp_then_hp() {
        let mut tank = critter(5, (0.0, 0.0), 10.0);
        tank.max_hp = 300.0;
        let healthy = critter(1, (0.0, 0.0), 100.0);
        let mut wounded_tank = critter(2, (0.0, 0.0), 5.0);
        wounded_tank.max_hp = 300.0;
        assert_eq!(
            select_target(
                TargetStrategy::Strongest,
                Vector2::ZERO,
                [&healthy, &wounded_tank, &tank]
            ),
            Some(CritterId::new(5))
        );
    }

    #[test]
    fn ties_resolve_to_the_lowest_identifier_in_any_order() {
        let critters = [
            critter(9, (0.0, 0.0), 50.0),
            critter(3, (0.0, 0.0), 50.0),
            critter(6, (0.0, 0.0), 50.0),
        ];
        for strategy in TargetStrategy::ALL {
            let forward = select_target(strategy, Vector2::ZERO, &critters);
            let backward = select_target(strategy, Vector2::ZERO, critters.iter().rev());
            assert_eq!(forward, Some(CritterId::new(3)), "{strategy:?}");
            assert_eq!(forward, backward);
        }
    }

    #[test]
    fn handle_skips_inactive_and_out_of_range_towers() {
        let mut system = TowerTargeting::new();
        let mut idle = tower(2, (0, 0), TargetStrategy::LowestHp);
        idle.active = false;
        let towers = TowerView::from_snapshots(vec![
            tower(1, (0, 0), TargetStrategy::LowestHp),
            idle,
            tower(3, (30, 30), TargetStrategy::LowestHp),
        ]);
        let critters = CritterView::from_snapshots(vec![
            critter(4, (32.0, 0.0), 60.0),
            critter(8, (0.0, 32.0), 40.0),
        ]);
        let mut out = Vec::new();

        system.handle(&towers, &critters, &mut out);

        assert_eq!(
            out,
            vec![TowerTarget {
                tower: TowerId::new(1),
                critter: CritterId::new(8),
            }]
        );
    }

    #[test]
    fn handle_clears_previous_assignments() {
        let mut system = TowerTargeting::new();
        let towers = TowerView::from_snapshots(vec![tower(1, (0, 0), TargetStrategy::LowestHp)]);
        let mut out = vec![TowerTarget {
            tower: TowerId::new(9),
            critter: CritterId::new(9),
        }];

        system.handle(&towers, &CritterView::default(), &mut out);

        assert!(out.is_empty());
    }
}
