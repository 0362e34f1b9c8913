//! Discretization of the observed situation into a [`StateKey`].
//!
//! Every numeric field is bucketed with half-open intervals `[lo, hi)`:
//! a value equal to a threshold always lands in the upper tier. Tier labels
//! are joined with `-` in a fixed field order, so two keys are equal exactly
//! when every bucket matches.
//!
//! | field     | compact schema                     | extended schema                              |
//! |-----------|------------------------------------|----------------------------------------------|
//! | proximity | CLOSE <250, MID <600, FAR          | VERY_CLOSE <150, CLOSE <300, MID <600, FAR   |
//! | health    | LOW <25, MID <60, HIGH             | LOW <30, MID <70, HIGH                       |
//! | crowd     | DUEL <2, FEW <5, CROWD             | ALONE <1, DUEL <3, FEW <5, MANY              |
//! | wall      | (absent)                           | WALL <80, CENTER                             |
//!
//! With no fresh opponent the proximity input is [`NO_OPPONENT_DISTANCE`].

use crate::geometry::{ArenaBounds, Point};
use crate::tracker::EnemySnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const NO_OPPONENT_DISTANCE: f64 = 1000.0;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateKey(String);

impl StateKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StateKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for StateKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateSchema {
    Compact,
    #[default]
    Extended,
}

/// Ascending thresholds paired with the label of each resulting tier;
/// `labels.len() == bounds.len() + 1`.
#[derive(Clone, Copy, Debug)]
struct Tiers {
    bounds: &'static [f64],
    labels: &'static [&'static str],
}

impl Tiers {
    fn label(&self, value: f64) -> &'static str {
        let idx = self.bounds.iter().take_while(|b| value >= **b).count();
        self.labels[idx]
    }
}

const COMPACT_PROXIMITY: Tiers = Tiers {
    bounds: &[250.0, 600.0],
    labels: &["CLOSE", "MID", "FAR"],
};
const COMPACT_HEALTH: Tiers = Tiers {
    bounds: &[25.0, 60.0],
    labels: &["LOW", "MID", "HIGH"],
};
const COMPACT_CROWD: Tiers = Tiers {
    bounds: &[2.0, 5.0],
    labels: &["DUEL", "FEW", "CROWD"],
};

const EXTENDED_PROXIMITY: Tiers = Tiers {
    bounds: &[150.0, 300.0, 600.0],
    labels: &["VERY_CLOSE", "CLOSE", "MID", "FAR"],
};
const EXTENDED_HEALTH: Tiers = Tiers {
    bounds: &[30.0, 70.0],
    labels: &["LOW", "MID", "HIGH"],
};
const EXTENDED_CROWD: Tiers = Tiers {
    bounds: &[1.0, 3.0, 5.0],
    labels: &["ALONE", "DUEL", "FEW", "MANY"],
};
const EXTENDED_WALL: Tiers = Tiers {
    bounds: &[80.0],
    labels: &["WALL", "CENTER"],
};

/// Snapshot the encoder reads. `enemies` must already be filtered to fresh
/// entries.
#[derive(Clone, Copy, Debug)]
pub struct Observation<'a> {
    pub position: Point,
    pub energy: f64,
    pub bounds: ArenaBounds,
    pub enemies: &'a [EnemySnapshot],
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StateEncoder {
    schema: StateSchema,
}

impl StateEncoder {
    pub fn new(schema: StateSchema) -> Self {
        Self { schema }
    }

    pub fn encode(&self, obs: &Observation<'_>) -> StateKey {
        let min_dist = obs
            .enemies
            .iter()
            .map(|e| obs.position.distance(e.position))
            .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |m| m.min(d))))
            .unwrap_or(NO_OPPONENT_DISTANCE);
        let count = obs.enemies.len() as f64;

        let key = match self.schema {
            StateSchema::Compact => format!(
                "{}-{}-{}",
                COMPACT_PROXIMITY.label(min_dist),
                COMPACT_HEALTH.label(obs.energy),
                COMPACT_CROWD.label(count),
            ),
            StateSchema::Extended => format!(
                "{}-{}-{}-{}",
                EXTENDED_PROXIMITY.label(min_dist),
                EXTENDED_HEALTH.label(obs.energy),
                EXTENDED_CROWD.label(count),
                EXTENDED_WALL.label(obs.bounds.nearest_wall_distance(obs.position)),
            ),
        };
        StateKey(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enemy_at(name: &str, x: f64, y: f64) -> EnemySnapshot {
        EnemySnapshot {
            name: name.to_string(),
            position: Point::new(x, y),
            heading: 0.0,
            velocity: 0.0,
            energy: 100.0,
            last_seen: 0,
        }
    }

    fn observe<'a>(energy: f64, enemies: &'a [EnemySnapshot]) -> Observation<'a> {
        Observation {
            position: Point::new(400.0, 300.0),
            energy,
            bounds: ArenaBounds::new(800.0, 600.0),
            enemies,
        }
    }

    #[test]
    fn compact_key_matches_documented_labels() {
        let enemies = [enemy_at("a", 400.0, 500.0)];
        let key = StateEncoder::new(StateSchema::Compact).encode(&observe(20.0, &enemies));
        assert_eq!(key.as_str(), "CLOSE-LOW-DUEL");
    }

    #[test]
    fn threshold_values_resolve_to_upper_tier() {
        let encoder = StateEncoder::new(StateSchema::Compact);
        let at_250 = [enemy_at("a", 400.0, 550.0)];
        assert_eq!(encoder.encode(&observe(60.0, &at_250)).as_str(), "MID-HIGH-DUEL");
        assert_eq!(encoder.encode(&observe(59.999, &at_250)).as_str(), "MID-MID-DUEL");
        for _ in 0..3 {
            assert_eq!(encoder.encode(&observe(25.0, &at_250)).as_str(), "MID-MID-DUEL");
        }
    }

    #[test]
    fn no_opponents_uses_sentinel_distance() {
        let compact = StateEncoder::new(StateSchema::Compact).encode(&observe(100.0, &[]));
        assert_eq!(compact.as_str(), "FAR-HIGH-DUEL");
        let extended = StateEncoder::new(StateSchema::Extended).encode(&observe(100.0, &[]));
        assert_eq!(extended.as_str(), "FAR-HIGH-ALONE-CENTER");
    }

    #[test]
    fn extended_key_tracks_crowd_and_wall() {
        let enemies: Vec<_> = (0..5)
            .map(|i| enemy_at(&format!("e{i}"), 100.0 + i as f64 * 10.0, 100.0))
            .collect();
        let obs = Observation {
            position: Point::new(50.0, 120.0),
            energy: 50.0,
            bounds: ArenaBounds::new(800.0, 600.0),
            enemies: &enemies,
        };
        let encoder = StateEncoder::new(StateSchema::Extended);
        let key = encoder.encode(&obs);
        assert_eq!(key.as_str(), "VERY_CLOSE-MID-MANY-WALL");
        assert_eq!(key, encoder.encode(&obs));
    }
}
