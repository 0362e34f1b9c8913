//! Per-opponent last-known state.
//!
//! Entries are refreshed by sightings and leave the map either on an
//! elimination notification or when a sweep finds them older than the
//! eviction age. Between the staleness window and the eviction age an entry
//! is kept but ignored by encoding and targeting.

use crate::geometry::Point;
use crate::host::{OwnStatus, Sighting};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub name: String,
    pub position: Point,
    pub heading: f64,
    pub velocity: f64,
    pub energy: f64,
    pub last_seen: u64,
}

impl EnemySnapshot {
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_seen)
    }
}

#[derive(Clone, Debug)]
pub struct EnemyTracker {
    entries: HashMap<String, EnemySnapshot>,
    staleness_ticks: u64,
    eviction_ticks: u64,
}

impl EnemyTracker {
    pub fn new(staleness_ticks: u64, eviction_ticks: u64) -> Self {
        Self {
            entries: HashMap::new(),
            staleness_ticks,
            eviction_ticks: eviction_ticks.max(staleness_ticks),
        }
    }

    /// Converts a relative sighting into an absolute snapshot.
    pub fn record(&mut self, sighting: &Sighting, own: &OwnStatus) {
        let bearing = own.heading + sighting.bearing;
        let snapshot = EnemySnapshot {
            name: sighting.name.clone(),
            position: own.position.project(bearing, sighting.distance),
            heading: sighting.heading,
            velocity: sighting.velocity,
            energy: sighting.energy,
            last_seen: sighting.time,
        };
        self.entries.insert(sighting.name.clone(), snapshot);
    }

    pub fn remove(&mut self, name: &str) -> Option<EnemySnapshot> {
        self.entries.remove(name)
    }

    /// Drops entries not seen for longer than the eviction age.
    pub fn sweep(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        let limit = self.eviction_ticks;
        self.entries.retain(|_, e| e.age(now) <= limit);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Opponents observed within the staleness window, ordered by name so
    /// downstream float sums do not depend on hash order.
    pub fn fresh(&self, now: u64) -> Vec<EnemySnapshot> {
        let mut out: Vec<EnemySnapshot> = self
            .entries
            .values()
            .filter(|e| e.age(now) <= self.staleness_ticks)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

pub fn nearest(enemies: &[EnemySnapshot], from: Point) -> Option<&EnemySnapshot> {
    enemies.iter().min_by(|a, b| {
        from.distance(a.position)
            .total_cmp(&from.distance(b.position))
    })
}
