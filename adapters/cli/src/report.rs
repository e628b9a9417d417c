//! Human-readable lines for the events a player cares about.

use tile_defence_core::{Event, GameOverReason, PlayerRequest, RenderSnapshot};

/// Formats `event`, or returns `None` for events too chatty to print.
pub(crate) fn describe(event: &Event) -> Option<String> {
    let line = match event {
        Event::WaveStarted { tick, wave, count } => {
            format!("[{tick}] wave {wave} started with {count} critters")
        }
        Event::WaveEnded { tick } => format!("[{tick}] wave cleared"),
        Event::TowerPlaced {
            tower,
            kind,
            tile,
            cost,
        } => format!(
            "tower {} ({}) placed at {},{} for {cost} gold",
            tower.get(),
            kind.name(),
            tile.column(),
            tile.row()
        ),
        Event::TowerSold { tower, refund } => {
            format!("tower {} sold for {refund} gold", tower.get())
        }
        Event::TowerUpgraded { tower, level, cost } => format!(
            "tower {} upgraded to level {level} for {cost} gold",
            tower.get()
        ),
        Event::TowerStrategyChanged { tower, strategy } => {
            format!("tower {} now targets {}", tower.get(), strategy.name())
        }
        Event::TowerActivityChanged { tower, active } => format!(
            "tower {} {}",
            tower.get(),
            if *active { "enabled" } else { "disabled" }
        ),
        Event::TowerRejected { request, reason } => {
            format!("{} rejected: {reason}", request_name(request))
        }
        Event::CritterEscaped { critter, penalty } => format!(
            "critter {} escaped, {penalty} gold lost",
            critter.get()
        ),
        Event::GameOver { tick, reason } => {
            format!("[{tick}] game over: {}", reason_name(*reason))
        }
        Event::TimeAdvanced { .. }
        | Event::WaveRequested { .. }
        | Event::TowerFired { .. }
        | Event::CritterKilled { .. }
        | Event::GoldChanged { .. } => return None,
    };
    Some(line)
}

/// One-line status of the final snapshot.
pub(crate) fn summary(snapshot: &RenderSnapshot) -> String {
    format!(
        "tick {}: wave {} level {} gold {} health {} towers {}",
        snapshot.tick,
        snapshot.wave_number,
        snapshot.level,
        snapshot.gold,
        snapshot.health,
        snapshot.towers.len()
    )
}

fn request_name(request: &PlayerRequest) -> String {
    match request {
        PlayerRequest::Buy { kind, tile } => {
            format!("buy {} at {},{}", kind.name(), tile.column(), tile.row())
        }
        PlayerRequest::Upgrade { tower } => format!("upgrade of tower {}", tower.get()),
        PlayerRequest::StartWave => "wave request".to_owned(),
    }
}

fn reason_name(reason: GameOverReason) -> &'static str {
    match reason {
        GameOverReason::CrittersEscaped => "too many critters escaped",
        GameOverReason::Bankrupt => "out of gold",
        GameOverReason::Internal => "internal error",
    }
}
