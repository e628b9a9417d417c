use std::time::Duration;

use tile_defence_core::{
    Command, CritterId, Event, TargetStrategy, TileCoord, TowerId, TowerKind, TowerTarget,
    WorldConfig,
};
use tile_defence_system_tower_targeting::TowerTargeting;
use tile_defence_world::{self as world, map::Map, query, World};

const DT: Duration = Duration::from_nanos(16_666_667);

#[test]
fn deterministic_replay_assigns_identical_targets() {
    let first = replay(TargetStrategy::NearestToExit);
    let second = replay(TargetStrategy::NearestToExit);

    assert_eq!(first, second, "replay diverged between runs");
    assert!(
        first.iter().any(|targets| !targets.is_empty()),
        "the wave never entered the tower's range"
    );
}

#[test]
fn nearest_to_exit_tracks_the_leading_critter() {
    let assignments = replay(TargetStrategy::NearestToExit);
    let first_assignment = assignments
        .iter()
        .find(|targets| !targets.is_empty())
        .expect("a target was assigned");
    assert_eq!(
        first_assignment,
        &vec![TowerTarget {
            tower: TowerId::new(0),
            critter: CritterId::new(0),
        }]
    );
}

#[test]
fn disabled_towers_never_receive_targets() {
    let mut world = build_world(TargetStrategy::LowestHp);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SetTowerActive {
            tower: TowerId::new(0),
            active: false,
        },
        &mut events,
    );

    let mut targeting = TowerTargeting::new();
    let mut targets = Vec::new();
    for _ in 0..120 {
        world::apply(&mut world, Command::AdvanceCritters { dt: DT }, &mut events);
        targeting.handle(
            &query::tower_view(&world),
            &query::critter_view(&world),
            &mut targets,
        );
        assert!(targets.is_empty());
    }
}

fn build_world(strategy: TargetStrategy) -> World {
    let map = Map::parse("E######X\n..T.....\n").expect("valid map");
    let mut world = World::new(map, WorldConfig::default());
    let mut events = Vec::new();
    for command in [
        Command::BuyTower {
            kind: TowerKind::Frost,
            tile: TileCoord::new(2, 1),
        },
        Command::SetStrategy {
            tower: TowerId::new(0),
            strategy,
        },
        Command::StartWave,
        Command::SpawnWave { count: 6 },
    ] {
        world::apply(&mut world, command, &mut events);
    }
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::WaveStarted { count: 6, .. })));
    world
}

fn replay(strategy: TargetStrategy) -> Vec<Vec<TowerTarget>> {
    let mut world = build_world(strategy);
    let mut targeting = TowerTargeting::new();
    let mut current = Vec::new();
    let mut assignments = Vec::new();
    let mut events = Vec::new();

    for _ in 0..240 {
        world::apply(&mut world, Command::Tick { dt: DT }, &mut events);
        targeting.handle(
            &query::tower_view(&world),
            &query::critter_view(&world),
            &mut current,
        );
        assignments.push(current.clone());
        world::apply(&mut world, Command::AdvanceCritters { dt: DT }, &mut events);
    }

    assignments
}
