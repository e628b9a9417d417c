//! Tower stat table and the level formulas derived from it.

use serde::{Deserialize, Serialize};

/// Types of towers that can be constructed on a tower slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TowerKind {
    /// Long-range tower whose hits set critters on fire.
    Arrow,
    /// Short-range tower whose hits slow critters down.
    Frost,
    /// Expensive tower whose hits damage every critter around the target.
    Siege,
}

/// Secondary effect applied by a tower when it hits its primary target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackEffect {
    /// Damage over time for a short duration.
    Burn,
    /// Halves movement speed for a short duration.
    Freeze,
    /// Half damage to every critter around the primary target.
    Splash,
}

/// Base value and per-level increment of a real-valued tower stat.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    /// Value before any level is applied.
    pub base: f64,
    /// Amount added for every level.
    pub per_level: f64,
}

impl StatLine {
    /// Creates a new stat line.
    #[must_use]
    pub const fn new(base: f64, per_level: f64) -> Self {
        Self { base, per_level }
    }

    /// Effective value at `level`, computed as `base + level * per_level`.
    #[must_use]
    pub fn at_level(self, level: u32) -> f64 {
        self.base + f64::from(level) * self.per_level
    }
}

/// Base value and per-level increment of a gold-valued tower stat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldLine {
    /// Value before any level is applied.
    pub base: u32,
    /// Amount added for every level.
    pub per_level: u32,
}

impl GoldLine {
    /// Creates a new gold line.
    #[must_use]
    pub const fn new(base: u32, per_level: u32) -> Self {
        Self { base, per_level }
    }

    /// Effective value at `level`, computed as `base + level * per_level`.
    #[must_use]
    pub fn at_level(self, level: u32) -> u32 {
        self.base
            .saturating_add(level.saturating_mul(self.per_level))
    }
}

/// Complete stat block describing one tower kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerStats {
    /// Instant damage dealt to the primary target.
    pub damage: StatLine,
    /// Targeting range measured in tiles.
    pub range: StatLine,
    /// Rate-of-fire constant; see `FireCadence` for how it becomes a reload.
    pub rate_of_fire: StatLine,
    /// Gold charged to buy the tower or to upgrade it from a level.
    pub cost: GoldLine,
    /// Gold returned when the tower is sold.
    pub refund: GoldLine,
    /// Effect applied on every hit.
    pub effect: AttackEffect,
}

const ARROW_STATS: TowerStats = TowerStats {
    damage: StatLine::new(25.0, 5.0),
    range: StatLine::new(4.0, 0.0),
    rate_of_fire: StatLine::new(0.3, 0.0),
    cost: GoldLine::new(200, 50),
    refund: GoldLine::new(100, 30),
    effect: AttackEffect::Burn,
};

const FROST_STATS: TowerStats = TowerStats {
    damage: StatLine::new(10.0, 7.0),
    range: StatLine::new(2.0, 0.0),
    rate_of_fire: StatLine::new(1.0, 0.0),
    cost: GoldLine::new(200, 100),
    refund: GoldLine::new(100, 20),
    effect: AttackEffect::Freeze,
};

const SIEGE_STATS: TowerStats = TowerStats {
    damage: StatLine::new(35.0, 10.0),
    range: StatLine::new(3.0, 0.0),
    rate_of_fire: StatLine::new(1.0, 0.0),
    cost: GoldLine::new(500, 200),
    refund: GoldLine::new(200, 40),
    effect: AttackEffect::Splash,
};

impl TowerKind {
    /// Every constructible tower kind in a stable order.
    pub const ALL: [TowerKind; 3] = [TowerKind::Arrow, TowerKind::Frost, TowerKind::Siege];

    /// Stat block backing the tower kind.
    #[must_use]
    pub const fn stats(self) -> &'static TowerStats {
        match self {
            Self::Arrow => &ARROW_STATS,
            Self::Frost => &FROST_STATS,
            Self::Siege => &SIEGE_STATS,
        }
    }

    /// Effect applied by hits of this tower kind.
    #[must_use]
    pub const fn effect(self) -> AttackEffect {
        self.stats().effect
    }

    /// Instant damage at `level`.
    #[must_use]
    pub fn damage(self, level: u32) -> f64 {
        self.stats().damage.at_level(level)
    }

    /// Targeting range at `level`, measured in tiles.
    #[must_use]
    pub fn range_in_tiles(self, level: u32) -> f64 {
        self.stats().range.at_level(level)
    }

    /// Rate-of-fire constant at `level`.
    #[must_use]
    pub fn rate_of_fire(self, level: u32) -> f64 {
        self.stats().rate_of_fire.at_level(level)
    }

    /// Gold charged to buy the tower at `level` or upgrade it from `level`.
    #[must_use]
    pub fn cost(self, level: u32) -> u32 {
        self.stats().cost.at_level(level)
    }

    /// Gold refunded when a tower of `level` is sold.
    #[must_use]
    pub fn refund(self, level: u32) -> u32 {
        self.stats().refund.at_level(level)
    }

    /// Lower-case name used by textual adapters.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Arrow => "arrow",
            Self::Frost => "frost",
            Self::Siege => "siege",
        }
    }

    /// Parses a tower kind from its lower-case name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

/// Interpretation of the rate-of-fire constant when reloading a tower.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireCadence {
    /// The constant is the reload interval in seconds, so a larger value fires
    /// less often.
    #[default]
    CooldownSeconds,
    /// The constant is a frequency, so the reload interval is its reciprocal.
    ShotsPerSecond,
}

impl FireCadence {
    /// Reload interval in seconds for the provided rate-of-fire constant.
    ///
    /// Non-positive frequencies never reload.
    #[must_use]
    pub fn reload_seconds(self, rate_of_fire: f64) -> f64 {
        match self {
            Self::CooldownSeconds => rate_of_fire.max(0.0),
            Self::ShotsPerSecond => {
                if rate_of_fire > 0.0 {
                    1.0 / rate_of_fire
                } else {
                    f64::INFINITY
                }
            }
        }
    }
}

/// Target-selection policy applied by a tower.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetStrategy {
    /// Critter with the least remaining health.
    #[default]
    LowestHp,
    /// Critter with the most remaining health.
    HighestHp,
    /// Critter with the fewest path tiles left before the exit.
    NearestToExit,
    /// Critter whose centre is closest to the tower's centre.
    NearestToTower,
    /// Critter with the largest maximum health, then the most remaining health.
    Strongest,
}

impl TargetStrategy {
    /// Every strategy in a stable order.
    pub const ALL: [TargetStrategy; 5] = [
        TargetStrategy::LowestHp,
        TargetStrategy::HighestHp,
        TargetStrategy::NearestToExit,
        TargetStrategy::NearestToTower,
        TargetStrategy::Strongest,
    ];

    /// Kebab-case name used by textual adapters.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LowestHp => "lowest-hp",
            Self::HighestHp => "highest-hp",
            Self::NearestToExit => "nearest-to-exit",
            Self::NearestToTower => "nearest-to-tower",
            Self::Strongest => "strongest",
        }
    }

    /// Parses a strategy from its kebab-case name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(name))
    }
}
