//! Turns intents into host commands: hull movement, turret aim and fire,
//! radar lock.

use crate::geometry::normal_relative_angle;
use crate::host::{ArenaHost, OwnStatus};
use crate::strategy::{FireIntent, Movement};
use crate::tracker::EnemySnapshot;
use std::f64::consts::{FRAC_PI_2, PI};

/// Radar overshoot factor while locked on a target.
pub const RADAR_LOCK_FACTOR: f64 = 2.0;

pub fn steer<H: ArenaHost + ?Sized>(host: &mut H, own: &OwnStatus, movement: Movement) {
    match movement {
        Movement::Heading { heading, distance } => {
            let turn = normal_relative_angle(heading - own.heading);
            // Reversing is cheaper than turning more than a quarter circle.
            if turn.abs() > FRAC_PI_2 {
                host.set_turn_right(normal_relative_angle(turn + PI));
                host.set_back(distance);
            } else {
                host.set_turn_right(turn);
                host.set_ahead(distance);
            }
        }
        Movement::Relative { turn, distance } => {
            host.set_turn_right(turn);
            host.set_ahead(distance);
        }
    }
}

/// Points the gun at the aim point and fires once it is cool and the gun
/// turn the host still has to perform is under `tolerance` radians. Returns
/// whether a shot was requested.
pub fn aim_and_fire<H: ArenaHost + ?Sized>(
    host: &mut H,
    own: &OwnStatus,
    fire: FireIntent,
    tolerance: f64,
) -> bool {
    let bearing = own.position.bearing_to(fire.aim);
    host.set_turn_gun_right(normal_relative_angle(bearing - own.gun_heading));
    let remaining = host.status().gun_turn_remaining;
    if host.can_fire() && remaining.abs() < tolerance {
        host.fire(fire.power);
        return true;
    }
    false
}

pub fn track_radar<H: ArenaHost + ?Sized>(host: &mut H, own: &OwnStatus, target: Option<&EnemySnapshot>) {
    match target {
        Some(target) => {
            let bearing = own.position.bearing_to(target.position);
            let turn = normal_relative_angle(bearing - own.radar_heading);
            host.set_turn_radar_right(turn * RADAR_LOCK_FACTOR);
        }
        None if own.radar_turn_remaining == 0.0 => host.set_turn_radar_right(f64::INFINITY),
        None => {}
    }
}
