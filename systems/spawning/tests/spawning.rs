use tile_defence_core::{Command, Event, WaveState, WorldConfig};
use tile_defence_system_spawning::{Config, Spawning};
use tile_defence_world::{self as world, map::Map, query, World};

fn wave_sizes(seed: u64, waves: usize) -> Vec<u32> {
    let mut spawning = Spawning::new(Config::with_seed(seed));
    let mut commands = Vec::new();
    for tick in 0..waves {
        spawning.handle(
            &[Event::WaveRequested {
                tick: u64::try_from(tick).expect("tick fits"),
            }],
            &mut commands,
        );
    }
    commands
        .into_iter()
        .map(|command| match command {
            Command::SpawnWave { count } => count,
            other => panic!("unexpected command emitted: {other:?}"),
        })
        .collect()
}

#[test]
fn identical_seeds_replay_identical_waves() {
    assert_eq!(wave_sizes(0x1234_5678, 16), wave_sizes(0x1234_5678, 16));
}

#[test]
fn different_seeds_diverge() {
    assert_ne!(wave_sizes(1, 16), wave_sizes(2, 16));
}

#[test]
fn unrelated_events_are_ignored() {
    let mut spawning = Spawning::new(Config::with_seed(3));
    let mut commands = Vec::new();
    spawning.handle(
        &[
            Event::GoldChanged { gold: 10 },
            Event::WaveEnded { tick: 4 },
        ],
        &mut commands,
    );
    assert!(commands.is_empty());
}

#[test]
fn requested_wave_spawns_in_the_world() {
    let mut world = World::new(
        Map::parse("E###X\nTTTTT\n").expect("valid map"),
        WorldConfig::default(),
    );
    let mut spawning = Spawning::new(Config::with_seed(11));

    let mut events = Vec::new();
    world::apply(&mut world, Command::StartWave, &mut events);
    let mut commands = Vec::new();
    spawning.handle(&events, &mut commands);
    assert_eq!(commands.len(), 1);

    let mut spawned = Vec::new();
    for command in commands {
        world::apply(&mut world, command, &mut spawned);
    }

    let count = spawned
        .iter()
        .find_map(|event| match event {
            Event::WaveStarted { count, .. } => Some(*count),
            _ => None,
        })
        .expect("wave started");
    assert!((30..=50).contains(&count));
    assert_eq!(query::critter_view(&world).len(), count as usize);
    assert_eq!(query::wave_state(&world), WaveState::Running);
}
