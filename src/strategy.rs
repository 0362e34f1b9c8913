//! Tactical behaviors selectable by the brain.
//!
//! Each behavior turns the current own status and the fresh opponents into an
//! [`Intent`]: where to move and, when a target exists, where and how hard to
//! shoot. Behaviors that need a target fall back to evasive movement without
//! one.

use crate::brain::ActionId;
use crate::geometry::{normal_relative_angle, ArenaBounds, Point};
use crate::host::OwnStatus;
use crate::predictor::{adjust_power, predict_intercept_point, projectile_speed, TargetMotion};
use crate::tracker::{nearest, EnemySnapshot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Evasive,
    Aggressive,
    Ranged,
    Erratic,
}

impl Action {
    pub const ALL: [Action; 4] = [Self::Evasive, Self::Aggressive, Self::Ranged, Self::Erratic];
    pub const COUNT: usize = Self::ALL.len();

    pub fn id(self) -> ActionId {
        self as ActionId
    }

    pub fn from_id(id: ActionId) -> Option<Self> {
        Self::ALL.get(id).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Evasive => "evasive",
            Self::Aggressive => "aggressive",
            Self::Ranged => "ranged",
            Self::Erratic => "erratic",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Movement {
    /// Travel `distance` along the absolute `heading`.
    Heading { heading: f64, distance: f64 },
    /// Turn by `turn` relative to the body while travelling `distance`;
    /// a negative distance drives backwards.
    Relative { turn: f64, distance: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FireIntent {
    pub aim: Point,
    pub power: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intent {
    pub movement: Movement,
    pub fire: Option<FireIntent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub opponent_repulsion: f64,
    pub wall_repulsion: f64,
    /// Walls push as if they stood this much closer.
    pub wall_margin: f64,
    /// Lower bound on any distance fed into an inverse-square force.
    pub min_force_distance: f64,
    pub evasive_distance: f64,
    pub evasive_power: f64,
    pub aggressive_distance: f64,
    pub aggressive_offset: f64,
    pub aggressive_power: f64,
    pub ranged_min: f64,
    pub ranged_max: f64,
    pub ranged_distance: f64,
    pub ranged_jitter: f64,
    pub ranged_power: f64,
    pub erratic_flip_chance: f64,
    pub erratic_turn_deg: f64,
    pub erratic_distance: f64,
    pub erratic_power: f64,
    /// Probe length used to test whether a heading runs into a wall.
    pub wall_stick: f64,
    pub wall_probe_margin: f64,
    pub smoothing_step: f64,
    pub max_smoothing_steps: u32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            opponent_repulsion: 6000.0,
            wall_repulsion: 2000.0,
            wall_margin: 40.0,
            min_force_distance: 1.0,
            evasive_distance: 120.0,
            evasive_power: 1.8,
            aggressive_distance: 160.0,
            aggressive_offset: 0.5,
            aggressive_power: 3.0,
            ranged_min: 300.0,
            ranged_max: 600.0,
            ranged_distance: 140.0,
            ranged_jitter: 40.0,
            ranged_power: 2.0,
            erratic_flip_chance: 0.1,
            erratic_turn_deg: 45.0,
            erratic_distance: 120.0,
            erratic_power: 1.7,
            wall_stick: 120.0,
            wall_probe_margin: 18.0,
            smoothing_step: 0.05,
            max_smoothing_steps: 126,
        }
    }
}

impl StrategyConfig {
    pub fn clamp(&mut self) {
        self.opponent_repulsion = self.opponent_repulsion.clamp(0.0, 100_000.0);
        self.wall_repulsion = self.wall_repulsion.clamp(0.0, 100_000.0);
        self.wall_margin = self.wall_margin.clamp(0.0, 120.0);
        self.min_force_distance = self.min_force_distance.clamp(0.5, 50.0);
        self.evasive_distance = self.evasive_distance.clamp(20.0, 400.0);
        self.aggressive_distance = self.aggressive_distance.clamp(20.0, 400.0);
        self.aggressive_offset = self.aggressive_offset.clamp(0.0, FRAC_PI_2);
        self.ranged_min = self.ranged_min.clamp(50.0, 1000.0);
        self.ranged_max = self.ranged_max.clamp(self.ranged_min, 1500.0);
        self.ranged_distance = self.ranged_distance.clamp(20.0, 400.0);
        self.ranged_jitter = self.ranged_jitter.clamp(0.0, 200.0);
        self.erratic_flip_chance = self.erratic_flip_chance.clamp(0.0, 1.0);
        self.erratic_turn_deg = self.erratic_turn_deg.clamp(0.0, 180.0);
        self.erratic_distance = self.erratic_distance.clamp(20.0, 400.0);
        self.wall_stick = self.wall_stick.clamp(20.0, 300.0);
        self.wall_probe_margin = self.wall_probe_margin.clamp(0.0, 60.0);
        self.smoothing_step = self.smoothing_step.clamp(0.01, 0.5);
        self.max_smoothing_steps = self.max_smoothing_steps.clamp(1, 1_000);
        for power in [
            &mut self.evasive_power,
            &mut self.aggressive_power,
            &mut self.ranged_power,
            &mut self.erratic_power,
        ] {
            *power = power.clamp(0.1, 3.0);
        }
    }
}

/// Rotates `heading` in fixed steps until a probe of length `stick` stays
/// inside the arena, giving up after `max_steps` and returning the candidate
/// whose probe overshot the least.
pub fn smooth_heading(
    origin: Point,
    heading: f64,
    bounds: &ArenaBounds,
    stick: f64,
    margin: f64,
    step: f64,
    max_steps: u32,
) -> f64 {
    let mut candidate = heading;
    let mut best = heading;
    let mut best_overshoot = f64::INFINITY;
    for _ in 0..=max_steps {
        let probe = origin.project(candidate, stick);
        if bounds.contains(probe, margin) {
            return normal_relative_angle(candidate);
        }
        let overshoot = bounds.overshoot(probe, margin);
        if overshoot < best_overshoot {
            best_overshoot = overshoot;
            best = candidate;
        }
        candidate += step;
    }
    normal_relative_angle(best)
}

#[derive(Clone, Debug)]
pub struct StrategyExecutor {
    cfg: StrategyConfig,
    rng: StdRng,
    erratic_sign: f64,
}

impl StrategyExecutor {
    pub fn new(cfg: StrategyConfig, seed: u64) -> Self {
        Self {
            cfg,
            rng: StdRng::seed_from_u64(seed),
            erratic_sign: 1.0,
        }
    }

    pub fn apply(&mut self, action: Action, own: &OwnStatus, enemies: &[EnemySnapshot]) -> Intent {
        let target = nearest(enemies, own.position);
        let mut intent = match (action, target) {
            (Action::Evasive, _) | (Action::Aggressive | Action::Ranged, None) => {
                self.evasive(own, enemies, target)
            }
            (Action::Aggressive, Some(t)) => self.aggressive(own, t),
            (Action::Ranged, Some(t)) => self.ranged(own, t),
            (Action::Erratic, _) => self.erratic(own, target),
        };

        intent.movement = match intent.movement {
            Movement::Heading { heading, distance } => Movement::Heading {
                heading: self.smooth(own, heading),
                distance,
            },
            Movement::Relative { turn, distance } => {
                // Smooth the direction of travel, which is reversed when backing up.
                let flip = if distance < 0.0 { PI } else { 0.0 };
                let travel = self.smooth(own, own.heading + turn + flip);
                Movement::Relative {
                    turn: normal_relative_angle(travel - flip - own.heading),
                    distance,
                }
            }
        };
        intent
    }

    fn smooth(&self, own: &OwnStatus, heading: f64) -> f64 {
        smooth_heading(
            own.position,
            heading,
            &own.bounds,
            self.cfg.wall_stick,
            self.cfg.wall_probe_margin,
            self.cfg.smoothing_step,
            self.cfg.max_smoothing_steps,
        )
    }

    /// Sum of inverse-square pushes away from every opponent and every wall.
    pub fn repulsion(&self, own: &OwnStatus, enemies: &[EnemySnapshot]) -> (f64, f64) {
        let min_d = self.cfg.min_force_distance;
        let me = own.position;
        let mut fx = 0.0;
        let mut fy = 0.0;

        for enemy in enemies {
            let d = me.distance(enemy.position).max(min_d);
            let push = self.cfg.opponent_repulsion / (d * d);
            let away = enemy.position.bearing_to(me);
            fx += away.sin() * push;
            fy += away.cos() * push;
        }

        let wall = |gap: f64| {
            let d = (gap - self.cfg.wall_margin).max(min_d);
            self.cfg.wall_repulsion / (d * d)
        };
        fx += wall(me.x);
        fx -= wall(own.bounds.width - me.x);
        fy += wall(me.y);
        fy -= wall(own.bounds.height - me.y);
        (fx, fy)
    }

    fn fire_at(&self, own: &OwnStatus, target: &EnemySnapshot, desired: f64) -> FireIntent {
        let distance = own.position.distance(target.position);
        let power = adjust_power(desired, own.energy, distance);
        let aim = predict_intercept_point(
            own.position,
            projectile_speed(power),
            TargetMotion {
                position: target.position,
                heading: target.heading,
                velocity: target.velocity,
            },
            &own.bounds,
        );
        FireIntent { aim, power }
    }

    fn evasive(&mut self, own: &OwnStatus, enemies: &[EnemySnapshot], target: Option<&EnemySnapshot>) -> Intent {
        let (fx, fy) = self.repulsion(own, enemies);
        Intent {
            movement: Movement::Heading {
                heading: fx.atan2(fy),
                distance: self.cfg.evasive_distance,
            },
            fire: target.map(|t| self.fire_at(own, t, self.cfg.evasive_power)),
        }
    }

    fn aggressive(&mut self, own: &OwnStatus, target: &EnemySnapshot) -> Intent {
        let side = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        Intent {
            movement: Movement::Heading {
                heading: own.position.bearing_to(target.position) + side * self.cfg.aggressive_offset,
                distance: self.cfg.aggressive_distance,
            },
            fire: Some(self.fire_at(own, target, self.cfg.aggressive_power)),
        }
    }

    fn ranged(&mut self, own: &OwnStatus, target: &EnemySnapshot) -> Intent {
        let bearing = own.position.bearing_to(target.position);
        let distance = own.position.distance(target.position);
        let heading = if distance < self.cfg.ranged_min {
            bearing + PI
        } else if distance > self.cfg.ranged_max {
            bearing
        } else {
            let side = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            bearing + side * FRAC_PI_2
        };
        let travel = self.cfg.ranged_distance + self.rng.gen::<f64>() * self.cfg.ranged_jitter;
        Intent {
            movement: Movement::Heading {
                heading,
                distance: travel,
            },
            fire: Some(self.fire_at(own, target, self.cfg.ranged_power)),
        }
    }

    fn erratic(&mut self, own: &OwnStatus, target: Option<&EnemySnapshot>) -> Intent {
        if self.rng.gen::<f64>() < self.cfg.erratic_flip_chance {
            self.erratic_sign = -self.erratic_sign;
        }
        Intent {
            movement: Movement::Relative {
                turn: self.cfg.erratic_turn_deg.to_radians() * self.erratic_sign,
                distance: self.cfg.erratic_distance * self.erratic_sign,
            },
            fire: target.map(|t| self.fire_at(own, t, self.cfg.erratic_power)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn own_at(x: f64, y: f64) -> OwnStatus {
        OwnStatus {
            time: 0,
            position: Point::new(x, y),
            heading: 0.0,
            gun_heading: 0.0,
            radar_heading: 0.0,
            energy: 100.0,
            bounds: ArenaBounds::new(800.0, 600.0),
            gun_heat: 0.0,
            gun_turn_remaining: 0.0,
            radar_turn_remaining: 0.0,
        }
    }

    fn enemy_at(x: f64, y: f64) -> EnemySnapshot {
        EnemySnapshot {
            name: "target".to_string(),
            position: Point::new(x, y),
            heading: 0.0,
            velocity: 0.0,
            energy: 100.0,
            last_seen: 0,
        }
    }

    fn heading_of(intent: &Intent) -> f64 {
        match intent.movement {
            Movement::Heading { heading, .. } => heading,
            Movement::Relative { .. } => panic!("expected heading movement"),
        }
    }

    #[test]
    fn action_ids_round_trip() {
        for action in Action::ALL {
            assert_eq!(Action::from_id(action.id()), Some(action));
        }
        assert_eq!(Action::from_id(Action::COUNT), None);
    }

    #[test]
    fn evasive_moves_away_from_opponent() {
        let mut exec = StrategyExecutor::new(StrategyConfig::default(), 1);
        let own = own_at(400.0, 300.0);
        let enemies = [enemy_at(400.0, 380.0)];
        let intent = exec.apply(Action::Evasive, &own, &enemies);
        let heading = heading_of(&intent);
        assert!(heading.cos() < -0.9, "heading {heading} should point to -y");
        let fire = intent.fire.expect("target exists");
        assert_eq!(fire.aim, enemies[0].position);
    }

    #[test]
    fn repulsion_survives_zero_distance() {
        let exec = StrategyExecutor::new(StrategyConfig::default(), 1);
        let own = own_at(10.0, 10.0);
        let (fx, fy) = exec.repulsion(&own, &[enemy_at(10.0, 10.0)]);
        assert!(fx.is_finite() && fy.is_finite());
        assert!(fx > 0.0 && fy > 0.0);
    }

    #[test]
    fn target_dependent_actions_fall_back_without_target() {
        let mut exec = StrategyExecutor::new(StrategyConfig::default(), 3);
        let own = own_at(400.0, 300.0);
        for action in [Action::Aggressive, Action::Ranged] {
            let intent = exec.apply(action, &own, &[]);
            assert!(intent.fire.is_none());
            assert!(matches!(intent.movement, Movement::Heading { distance, .. } if distance == 120.0));
        }
    }

    #[test]
    fn ranged_keeps_its_band() {
        let mut exec = StrategyExecutor::new(StrategyConfig::default(), 5);
        let own = own_at(400.0, 300.0);

        let close = [enemy_at(400.0, 400.0)];
        let retreat = heading_of(&exec.apply(Action::Ranged, &own, &close));
        assert!(retreat.cos() < -0.99);

        let own = own_at(100.0, 300.0);
        let far = [enemy_at(750.0, 300.0)];
        let advance = heading_of(&exec.apply(Action::Ranged, &own, &far));
        assert!(advance.sin() > 0.99);
    }

    #[test]
    fn aggressive_fires_at_full_power_up_close() {
        let mut exec = StrategyExecutor::new(StrategyConfig::default(), 9);
        let own = own_at(400.0, 300.0);
        let intent = exec.apply(Action::Aggressive, &own, &[enemy_at(500.0, 300.0)]);
        assert_eq!(intent.fire.map(|f| f.power), Some(3.0));
    }

    #[test]
    fn erratic_ignores_opponents_and_flips_eventually() {
        let mut exec = StrategyExecutor::new(StrategyConfig::default(), 13);
        let own = own_at(400.0, 300.0);
        let mut signs = std::collections::HashSet::new();
        for _ in 0..200 {
            match exec.apply(Action::Erratic, &own, &[]).movement {
                Movement::Relative { distance, .. } => {
                    signs.insert(distance > 0.0);
                }
                Movement::Heading { .. } => panic!("erratic uses relative movement"),
            }
        }
        assert_eq!(signs.len(), 2);
    }

    #[test]
    fn erratic_travel_stays_off_the_wall() {
        let cfg = StrategyConfig::default();
        let mut exec = StrategyExecutor::new(cfg.clone(), 21);
        let own = own_at(400.0, 570.0);
        for _ in 0..100 {
            let Movement::Relative { turn, distance } = exec.apply(Action::Erratic, &own, &[]).movement
            else {
                panic!("erratic uses relative movement");
            };
            let flip = if distance < 0.0 { PI } else { 0.0 };
            let travel = own.heading + turn + flip;
            let probe = own.position.project(travel, cfg.wall_stick);
            assert!(
                own.bounds.contains(probe, cfg.wall_probe_margin),
                "turn {turn} distance {distance} heads into the wall"
            );
        }
    }

    #[test]
    fn smoothing_turns_away_from_wall() {
        let bounds = ArenaBounds::new(800.0, 600.0);
        let origin = Point::new(400.0, 550.0);
        let heading = smooth_heading(origin, 0.0, &bounds, 120.0, 18.0, 0.05, 126);
        assert!(bounds.contains(origin.project(heading, 120.0), 18.0));
        assert!(heading > 0.0);
    }

    #[test]
    fn smoothing_is_bounded_when_nothing_fits() {
        let tiny = ArenaBounds::new(60.0, 60.0);
        let heading = smooth_heading(Point::new(30.0, 30.0), 0.3, &tiny, 120.0, 18.0, 0.05, 10);
        assert!(heading.is_finite());
    }
}
