//! Composition of the world and the pure systems into a single tick.

use std::time::Duration;

use tile_defence_core::{Command, Event, GameOverReason, RenderSnapshot, TowerTarget, WaveState};
use tile_defence_system_spawning::{Config as SpawningConfig, Spawning};
use tile_defence_system_tower_combat::TowerCombat;
use tile_defence_system_tower_targeting::TowerTargeting;
use tile_defence_world::{self as world, map::Map, query, World};

use crate::config::GameConfig;

/// Everything a tick produced.
#[derive(Clone, Debug, PartialEq)]
pub struct TickOutput {
    /// Events emitted by the world during the tick, in order.
    pub events: Vec<Event>,
    /// State of the world at the end of the tick.
    pub snapshot: RenderSnapshot,
}

/// Owns the world and drives it one tick at a time.
#[derive(Debug)]
pub struct GameManager {
    world: World,
    spawning: Spawning,
    targeting: TowerTargeting,
    combat: TowerCombat,
    dt: Duration,
    auto_wave: bool,
    targets: Vec<TowerTarget>,
    commands: Vec<Command>,
}

impl GameManager {
    /// Creates a manager for `map` configured by `config`.
    #[must_use]
    pub fn new(map: Map, config: &GameConfig) -> Self {
        Self {
            world: World::new(map, config.world),
            spawning: Spawning::new(SpawningConfig::new(
                config.world.spawn_min,
                config.world.spawn_max,
                config.seed,
            )),
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            dt: config.tick_duration(),
            auto_wave: config.auto_wave,
            targets: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Read-only access to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Simulated time covered by one tick.
    #[must_use]
    pub fn dt(&self) -> Duration {
        self.dt
    }

    /// Reason the game ended, once it has.
    #[must_use]
    pub fn game_over(&self) -> Option<GameOverReason> {
        query::game_over(&self.world)
    }

    /// Advances the game by one tick.
    ///
    /// The clock advances first and clears the previous warning. Input
    /// commands follow, then the wave draw, targeting, firing and finally the
    /// critter update.
    pub fn step<I>(&mut self, inputs: I) -> TickOutput
    where
        I: IntoIterator<Item = Command>,
    {
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Tick { dt: self.dt }, &mut events);

        for command in inputs {
            world::apply(&mut self.world, command, &mut events);
        }
        if self.auto_wave
            && matches!(
                query::wave_state(&self.world),
                WaveState::Idle | WaveState::Ended
            )
            && !events
                .iter()
                .any(|event| matches!(event, Event::WaveRequested { .. }))
        {
            world::apply(&mut self.world, Command::StartWave, &mut events);
        }

        self.commands.clear();
        self.spawning.handle(&events, &mut self.commands);
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, &mut events);
        }

        let towers = query::tower_view(&self.world);
        let critters = query::critter_view(&self.world);
        self.targeting.handle(&towers, &critters, &mut self.targets);
        self.combat.handle(&towers, &self.targets, &mut self.commands);
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, &mut events);
        }

        world::apply(
            &mut self.world,
            Command::AdvanceCritters { dt: self.dt },
            &mut events,
        );

        TickOutput {
            events,
            snapshot: query::render_snapshot(&self.world),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_defence_core::{
        CritterDefaults, RejectionReason, TileCoord, TowerId, TowerKind, WorldConfig,
    };

    fn manager(text: &str, config: GameConfig) -> GameManager {
        GameManager::new(Map::parse(text).expect("valid map"), &config)
    }

    #[test]
    fn wave_request_spawns_within_the_same_tick() {
        let mut manager = manager("E####X\nTTTTTT\n", GameConfig::default());
        let output = manager.step([Command::StartWave]);

        let started = output.events.iter().find_map(|event| match event {
            Event::WaveStarted { count, .. } => Some(*count),
            _ => None,
        });
        let count = started.expect("wave started");
        assert!((30..=50).contains(&count));
        assert_eq!(output.snapshot.critters.len(), count as usize);
        assert_eq!(output.snapshot.wave_state, WaveState::Running);
        assert_eq!(output.snapshot.tick, 1);
        assert_eq!(query::tick(manager.world()), 1);
    }

    #[test]
    fn towers_fire_at_critters_in_range() {
        let mut manager = manager("E####X\nTTTTTT\n", GameConfig::default());
        let output = manager.step([
            Command::BuyTower {
                kind: TowerKind::Arrow,
                tile: TileCoord::new(1, 1),
            },
            Command::StartWave,
        ]);

        let fired = output.events.iter().any(|event| {
            matches!(event, Event::TowerFired { tower, .. } if *tower == TowerId::new(0))
        });
        assert!(fired);
        let tower = output.snapshot.towers[0];
        assert!(tower.cooldown_remaining > 0.0);
    }

    #[test]
    fn rejections_surface_in_the_snapshot_of_their_tick_only() {
        let mut manager = manager("E#X\nTTT\n", GameConfig::default());
        let output = manager.step([Command::BuyTower {
            kind: TowerKind::Arrow,
            tile: TileCoord::new(1, 0),
        }]);
        let warning = output.snapshot.warning.expect("warning");
        assert_eq!(warning.reason, RejectionReason::NotATowerSlot);

        let output = manager.step(Vec::new());
        assert!(output.snapshot.warning.is_none());
    }

    #[test]
    fn escapes_end_the_game_exactly_once() {
        let config = GameConfig {
            world: WorldConfig {
                spawn_min: 12,
                spawn_max: 12,
                critter: CritterDefaults {
                    speed: 16.0,
                    ..CritterDefaults::default()
                },
                ..WorldConfig::default()
            },
            ..GameConfig::default()
        };
        let mut manager = manager("E#X\n", config);
        let mut game_overs = 0;
        let mut first = true;
        for _ in 0..600 {
            let inputs = if first {
                vec![Command::StartWave]
            } else {
                Vec::new()
            };
            first = false;
            let output = manager.step(inputs);
            game_overs += output
                .events
                .iter()
                .filter(|event| matches!(event, Event::GameOver { .. }))
                .count();
        }

        assert_eq!(game_overs, 1);
        assert_eq!(manager.game_over(), Some(GameOverReason::CrittersEscaped));
    }

    #[test]
    fn identical_seeds_replay_identically() {
        let config = GameConfig {
            seed: 77,
            auto_wave: true,
            ..GameConfig::default()
        };
        let run = || {
            let mut manager = manager("T.T.T\nE###X\nT.T.T\n", config.clone());
            let mut outputs = Vec::new();
            outputs.push(manager.step([
                Command::BuyTower {
                    kind: TowerKind::Frost,
                    tile: TileCoord::new(2, 0),
                },
                Command::BuyTower {
                    kind: TowerKind::Frost,
                    tile: TileCoord::new(2, 2),
                },
            ]));
            for _ in 0..400 {
                outputs.push(manager.step(Vec::new()));
            }
            outputs
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn auto_wave_starts_the_next_wave() {
        let config = GameConfig {
            auto_wave: true,
            ..GameConfig::default()
        };
        let mut manager = manager("E#X\n", config);
        let output = manager.step(Vec::new());
        assert!(output
            .events
            .iter()
            .any(|event| matches!(event, Event::WaveStarted { wave: 1, .. })));
    }
}
