//! Boundary with the arena host.
//!
//! The host owns physics and pacing. The core reads an [`OwnStatus`] each
//! tick, issues movement/turret/radar/fire commands through [`ArenaHost`],
//! and is told about sightings and outcomes through [`ArenaEvent`]s.

use crate::geometry::{ArenaBounds, Point};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OwnStatus {
    pub time: u64,
    pub position: Point,
    pub heading: f64,
    pub gun_heading: f64,
    pub radar_heading: f64,
    pub energy: f64,
    pub bounds: ArenaBounds,
    pub gun_heat: f64,
    /// Gun rotation still pending from the last turret command, in radians.
    pub gun_turn_remaining: f64,
    pub radar_turn_remaining: f64,
}

/// One opponent observation, relative to our own pose at `time`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    pub name: String,
    /// Bearing relative to our body heading.
    pub bearing: f64,
    pub distance: f64,
    pub heading: f64,
    pub velocity: f64,
    pub energy: f64,
    pub time: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ArenaEvent {
    Scanned(Sighting),
    OpponentEliminated { name: String },
    BulletHit,
    HitByBullet,
    BulletMissed,
    HitWall,
    HitOpponent,
    Victory,
    Eliminated,
    RoundEnded,
}

impl ArenaEvent {
    /// Victory and elimination close an episode with a learning update.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Victory | Self::Eliminated)
    }
}

/// Motion and weapon primitives. Every `set_*` call replaces the pending
/// command of the same kind; the host applies them when it advances a tick.
pub trait ArenaHost {
    fn status(&self) -> OwnStatus;
    fn set_ahead(&mut self, distance: f64);
    fn set_back(&mut self, distance: f64) {
        self.set_ahead(-distance);
    }
    fn set_turn_right(&mut self, radians: f64);
    fn set_turn_gun_right(&mut self, radians: f64);
    fn set_turn_radar_right(&mut self, radians: f64);
    fn fire(&mut self, power: f64);
    /// Whether the weapon may legally fire right now.
    fn can_fire(&self) -> bool {
        self.status().gun_heat <= 0.0
    }
}
