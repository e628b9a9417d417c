//! Terminal command parsing.

use anyhow::{anyhow, bail, Context, Result};
use tile_defence_core::{Command, TargetStrategy, TileCoord, TowerId, TowerKind};

/// One-line summary of the accepted commands.
pub(crate) const USAGE: &str = "commands: buy <arrow|frost|siege> <column> <row>, \
sell <tower>, upgrade <tower>, \
strategy <tower> <lowest-hp|highest-hp|nearest-to-exit|nearest-to-tower|strongest>, \
disable <tower>, enable <tower>, wave, quit";

/// Parses a terminal line into a command. Blank lines yield `None`.
pub(crate) fn parse_line(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let command = match verb.to_ascii_lowercase().as_str() {
        "buy" => {
            let kind = next(&mut words, "tower kind")?;
            let kind = TowerKind::from_name(kind)
                .ok_or_else(|| anyhow!("unknown tower kind `{kind}`"))?;
            let column = number(&mut words, "column")?;
            let row = number(&mut words, "row")?;
            Command::BuyTower {
                kind,
                tile: TileCoord::new(column, row),
            }
        }
        "sell" => Command::SellTower {
            tower: tower(&mut words)?,
        },
        "upgrade" => Command::UpgradeTower {
            tower: tower(&mut words)?,
        },
        "strategy" => {
            let tower = tower(&mut words)?;
            let name = next(&mut words, "strategy")?;
            let strategy = TargetStrategy::from_name(name)
                .ok_or_else(|| anyhow!("unknown strategy `{name}`"))?;
            Command::SetStrategy { tower, strategy }
        }
        "disable" => Command::SetTowerActive {
            tower: tower(&mut words)?,
            active: false,
        },
        "enable" => Command::SetTowerActive {
            tower: tower(&mut words)?,
            active: true,
        },
        "wave" => Command::StartWave,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command `{other}`"),
    };
    if let Some(extra) = words.next() {
        bail!("unexpected argument `{extra}`");
    }
    Ok(Some(command))
}

fn next<'a>(words: &mut impl Iterator<Item = &'a str>, what: &str) -> Result<&'a str> {
    words.next().with_context(|| format!("missing {what}"))
}

fn number<'a>(words: &mut impl Iterator<Item = &'a str>, what: &str) -> Result<u32> {
    let word = next(words, what)?;
    word.parse()
        .with_context(|| format!("{what} must be a non-negative integer, got `{word}`"))
}

fn tower<'a>(words: &mut impl Iterator<Item = &'a str>) -> Result<TowerId> {
    number(words, "tower id").map(TowerId::new)
}
