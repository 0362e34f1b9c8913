use crate::host::ArenaEvent;
use serde::{Deserialize, Serialize};

/// Scalar reward attached to each outcome event, plus the survival trickle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardTable {
    pub bullet_hit: f64,
    pub hit_by_bullet: f64,
    pub bullet_missed: f64,
    pub hit_wall: f64,
    pub hit_opponent: f64,
    pub victory: f64,
    pub eliminated: f64,
    /// Credited on every tick the agent is alive.
    #[serde(default)]
    pub survival_per_tick: f64,
    /// Credited once each time a held action completes.
    #[serde(default)]
    pub survival_per_cycle: f64,
}

impl Default for RewardTable {
    fn default() -> Self {
        Self::ultra()
    }
}

impl RewardTable {
    pub fn ultra() -> Self {
        Self {
            bullet_hit: 20.0,
            hit_by_bullet: -15.0,
            bullet_missed: -2.0,
            hit_wall: -20.0,
            hit_opponent: -8.0,
            victory: 80.0,
            eliminated: -80.0,
            survival_per_tick: 0.03,
            survival_per_cycle: 0.0,
        }
    }

    pub fn melee() -> Self {
        Self {
            bullet_hit: 15.0,
            hit_by_bullet: -15.0,
            bullet_missed: -1.0,
            hit_wall: -10.0,
            hit_opponent: 0.0,
            victory: 50.0,
            eliminated: -50.0,
            survival_per_tick: 0.0,
            survival_per_cycle: 0.1,
        }
    }

    /// Reward for an outcome event, or `None` for events that carry no reward.
    pub fn delta(&self, event: &ArenaEvent) -> Option<f64> {
        match event {
            ArenaEvent::BulletHit => Some(self.bullet_hit),
            ArenaEvent::HitByBullet => Some(self.hit_by_bullet),
            ArenaEvent::BulletMissed => Some(self.bullet_missed),
            ArenaEvent::HitWall => Some(self.hit_wall),
            ArenaEvent::HitOpponent => Some(self.hit_opponent),
            ArenaEvent::Victory => Some(self.victory),
            ArenaEvent::Eliminated => Some(self.eliminated),
            ArenaEvent::Scanned(_) | ArenaEvent::OpponentEliminated { .. } | ArenaEvent::RoundEnded => None,
        }
    }
}

/// Reward gathered since the last decision.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RewardAccumulator {
    total: f64,
}

impl RewardAccumulator {
    pub fn add(&mut self, delta: f64) {
        self.total += delta;
    }

    pub fn total(&self) -> f64 {
        self.total
    }
}
