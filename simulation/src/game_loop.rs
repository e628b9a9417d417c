//! Fixed-rate loop that feeds player commands into the manager and publishes
//! snapshots and events over channels.

use std::{
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use tile_defence_core::{Command, Event, GameOverReason, RenderSnapshot};

use crate::{config::GameConfig, manager::GameManager};

const INPUT_CAPACITY: usize = 256;
const COMBAT_CAPACITY: usize = 1024;

/// Channel ends handed to the front end driving a [`GameLoop`].
#[derive(Debug)]
pub struct LoopHandles {
    /// Player commands, applied at the start of the next tick.
    pub inputs: Sender<Command>,
    /// Latest snapshot. Older snapshots are replaced rather than queued.
    pub snapshots: Receiver<RenderSnapshot>,
    /// Game, wave and tower events. Never dropped, so the receiver must be
    /// drained.
    pub events: Receiver<Event>,
    /// Shots, kills and gold changes. Dropped while the queue is full.
    pub combat: Receiver<Event>,
}

/// Summary of a finished run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Number of ticks simulated.
    pub ticks: u64,
    /// Reason the game ended, if it did.
    pub game_over: Option<GameOverReason>,
    /// Whether the loop stopped on a quit request or a closed input channel.
    pub quit: bool,
}

/// Drives a [`GameManager`] at the configured tick rate.
#[derive(Debug)]
pub struct GameLoop {
    manager: GameManager,
    inputs: Receiver<Command>,
    snapshots: Sender<RenderSnapshot>,
    stale_snapshots: Receiver<RenderSnapshot>,
    events: Sender<Event>,
    combat: Sender<Event>,
    dropped_combat: u64,
    headless: bool,
    max_ticks: Option<u64>,
}

impl GameLoop {
    /// Creates a loop around `manager` together with the front end's handles.
    #[must_use]
    pub fn new(manager: GameManager, config: &GameConfig) -> (Self, LoopHandles) {
        let (input_tx, input_rx) = crossbeam_channel::bounded(INPUT_CAPACITY);
        let (snapshot_tx, snapshot_rx) = crossbeam_channel::bounded(1);
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (combat_tx, combat_rx) = crossbeam_channel::bounded(COMBAT_CAPACITY);

        let game_loop = Self {
            manager,
            inputs: input_rx,
            snapshots: snapshot_tx,
            stale_snapshots: snapshot_rx.clone(),
            events: event_tx,
            combat: combat_tx,
            dropped_combat: 0,
            headless: config.headless,
            max_ticks: config.max_ticks,
        };
        let handles = LoopHandles {
            inputs: input_tx,
            snapshots: snapshot_rx,
            events: event_rx,
            combat: combat_rx,
        };
        (game_loop, handles)
    }

    /// Runs until the game ends, a quit is requested or the tick limit is hit.
    ///
    /// Paced runs sleep until each tick's deadline and skip the deadlines they
    /// have already missed instead of bursting to catch up.
    pub fn run(mut self) -> LoopOutcome {
        let period = self.manager.dt();
        let mut deadline = Instant::now();
        let mut ticks = 0_u64;
        let mut batch = Vec::new();

        let quit = loop {
            if self.manager.game_over().is_some() {
                break false;
            }
            if self.max_ticks.is_some_and(|limit| ticks >= limit) {
                break false;
            }

            let quit = self.drain_inputs(&mut batch);
            let output = self.manager.step(batch.drain(..));
            ticks += 1;

            for event in output.events {
                self.publish_event(event);
            }
            self.publish_snapshot(output.snapshot);

            if quit {
                tracing::info!(tick = ticks, "quit requested");
                break true;
            }
            if !self.headless {
                deadline = pace(deadline, period);
            }
        };

        let outcome = LoopOutcome {
            ticks,
            game_over: self.manager.game_over(),
            quit,
        };
        if self.dropped_combat > 0 {
            tracing::warn!(
                dropped = self.dropped_combat,
                "combat queue overflowed, events were dropped"
            );
        }
        tracing::info!(
            ticks = outcome.ticks,
            game_over = ?outcome.game_over,
            quit = outcome.quit,
            "game loop stopped"
        );
        outcome
    }

    /// Moves pending commands into `batch`, reporting whether the loop should
    /// stop after this tick.
    fn drain_inputs(&self, batch: &mut Vec<Command>) -> bool {
        loop {
            match self.inputs.try_recv() {
                Ok(Command::Quit) => return true,
                Ok(command) => batch.push(command),
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => {
                    tracing::debug!("input channel closed");
                    return true;
                }
            }
        }
    }

    fn publish_event(&mut self, event: Event) {
        match event {
            Event::TimeAdvanced { .. } => {}
            Event::TowerFired { .. } | Event::CritterKilled { .. } | Event::GoldChanged { .. } => {
                if let Err(TrySendError::Full(event)) = self.combat.try_send(event) {
                    self.dropped_combat += 1;
                    tracing::debug!(?event, "combat queue full, dropping event");
                }
            }
            event => {
                // Unbounded, so this only fails once the receiver is gone.
                let _ = self.events.send(event);
            }
        }
    }

    fn publish_snapshot(&self, snapshot: RenderSnapshot) {
        let snapshot = match self.snapshots.try_send(snapshot) {
            Err(TrySendError::Full(snapshot)) => snapshot,
            Ok(()) | Err(TrySendError::Disconnected(_)) => return,
        };
        let _ = self.stale_snapshots.try_recv();
        if let Err(TrySendError::Full(_)) = self.snapshots.try_send(snapshot) {
            tracing::debug!("snapshot slot refilled concurrently");
        }
    }
}

/// Sleeps until `deadline + period` and returns the deadline of the tick that
/// just started. Missed deadlines are skipped.
fn pace(deadline: Instant, period: Duration) -> Instant {
    let mut next = deadline + period;
    let now = Instant::now();
    if next > now {
        thread::sleep(next - now);
    } else {
        while next <= now {
            next += period;
        }
        next -= period;
    }
    next
}
