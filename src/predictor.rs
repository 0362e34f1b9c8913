//! Interception aim point by fixed-point iteration.
//!
//! Starting from the target's current position, each step measures the
//! projectile flight time to the current estimate, advances the target along
//! its last heading for that long, and clamps the result inside the arena.
//! The iteration count is fixed; residual error is not measured.

use crate::geometry::{ArenaBounds, Point};

pub const INTERCEPT_ITERATIONS: usize = 15;
/// Keeps predicted points at least a hull half-width away from the walls.
pub const INTERCEPT_WALL_MARGIN: f64 = 18.0;

pub const MIN_FIRE_POWER: f64 = 0.1;
pub const MAX_FIRE_POWER: f64 = 3.0;

pub fn projectile_speed(power: f64) -> f64 {
    20.0 - 3.0 * power.clamp(MIN_FIRE_POWER, MAX_FIRE_POWER)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetMotion {
    pub position: Point,
    pub heading: f64,
    pub velocity: f64,
}

pub fn predict_intercept_point(
    shooter: Point,
    projectile_speed: f64,
    target: TargetMotion,
    bounds: &ArenaBounds,
) -> Point {
    predict_with_iterations(shooter, projectile_speed, target, bounds, INTERCEPT_ITERATIONS)
}

pub fn predict_with_iterations(
    shooter: Point,
    projectile_speed: f64,
    target: TargetMotion,
    bounds: &ArenaBounds,
    iterations: usize,
) -> Point {
    if !(projectile_speed > f64::EPSILON) || !projectile_speed.is_finite() {
        return target.position;
    }

    let mut estimate = target.position;
    for _ in 0..iterations {
        let travel_time = shooter.distance(estimate) / projectile_speed;
        let advanced = target
            .position
            .project(target.heading, target.velocity * travel_time);
        estimate = bounds.clamp(advanced, INTERCEPT_WALL_MARGIN);
    }
    estimate
}

/// Scales the requested power down for low own energy and long shots.
pub fn adjust_power(desired: f64, own_energy: f64, distance: f64) -> f64 {
    let mut power = desired;
    if own_energy < 20.0 || distance > 500.0 {
        power = power.min(1.5);
    }
    if distance > 750.0 {
        power = power.min(1.0);
    }
    power.clamp(MIN_FIRE_POWER, MAX_FIRE_POWER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const BOUNDS: ArenaBounds = ArenaBounds::new(800.0, 600.0);

    #[test]
    fn stationary_target_is_its_own_intercept() {
        let target = TargetMotion {
            position: Point::new(612.5, 144.25),
            heading: 1.2,
            velocity: 0.0,
        };
        for iterations in [1, 2, 15, 40] {
            let aim = predict_with_iterations(Point::new(100.0, 100.0), 11.0, target, &BOUNDS, iterations);
            assert_eq!(aim, target.position);
        }
    }

    #[test]
    fn moving_target_is_led_along_heading() {
        let shooter = Point::new(100.0, 300.0);
        let target = TargetMotion {
            position: Point::new(400.0, 300.0),
            heading: 0.0,
            velocity: 8.0,
        };
        let aim = predict_intercept_point(shooter, projectile_speed(2.0), target, &BOUNDS);
        assert!((aim.x - 400.0).abs() < 1e-9);
        assert!(aim.y > 300.0);
        // Flight time to the aim point matches the target's travel time.
        let flight = shooter.distance(aim) / projectile_speed(2.0);
        assert!(((aim.y - 300.0) - 8.0 * flight).abs() < 1.0);
    }

    #[test]
    fn prediction_is_clamped_inside_arena() {
        let target = TargetMotion {
            position: Point::new(700.0, 300.0),
            heading: FRAC_PI_2,
            velocity: 8.0,
        };
        let aim = predict_intercept_point(Point::new(50.0, 300.0), projectile_speed(3.0), target, &BOUNDS);
        assert_eq!(aim.x, 800.0 - INTERCEPT_WALL_MARGIN);
    }

    #[test]
    fn degenerate_speed_falls_back_to_current_position() {
        let target = TargetMotion {
            position: Point::new(300.0, 300.0),
            heading: 0.0,
            velocity: 8.0,
        };
        assert_eq!(predict_intercept_point(Point::new(0.0, 0.0), 0.0, target, &BOUNDS), target.position);
    }

    #[test]
    fn power_policy_caps_long_and_desperate_shots() {
        assert_eq!(adjust_power(3.0, 100.0, 200.0), 3.0);
        assert_eq!(adjust_power(3.0, 10.0, 200.0), 1.5);
        assert_eq!(adjust_power(3.0, 100.0, 600.0), 1.5);
        assert_eq!(adjust_power(3.0, 100.0, 800.0), 1.0);
        assert_eq!(adjust_power(0.0, 100.0, 100.0), MIN_FIRE_POWER);
        assert_eq!(projectile_speed(3.0), 11.0);
    }
}
