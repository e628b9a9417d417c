#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Game session driver: configuration, map files and the fixed-rate tick loop
//! that composes the world with the spawning, targeting and combat systems.

mod config;
mod game_loop;
mod manager;
mod maps;

pub use config::{ConfigError, GameConfig, DEFAULT_TICK_HZ};
pub use game_loop::{GameLoop, LoopHandles, LoopOutcome};
pub use manager::{GameManager, TickOutput};
pub use maps::{load_map, save_map, MapFileError};
