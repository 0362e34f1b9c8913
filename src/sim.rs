//! Deterministic reference arena.
//!
//! One agent-controlled tank against a handful of wandering drones that
//! shoot back. Physics are deliberately coarse: bounded acceleration and
//! turn rates, power-dependent projectiles, gun heat, wall and ram
//! collisions. Every opponent in range is sighted each tick.

use crate::geometry::{normal_relative_angle, ArenaBounds, Point};
use crate::host::{ArenaEvent, ArenaHost, OwnStatus, Sighting};
use crate::predictor::{projectile_speed, MAX_FIRE_POWER, MIN_FIRE_POWER};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const HULL_RADIUS: f64 = 18.0;
pub const MAX_VELOCITY: f64 = 8.0;
const ACCELERATION: f64 = 1.0;
const DECELERATION: f64 = 2.0;
const GUN_COOLING_RATE: f64 = 0.1;
const MAX_GUN_TURN_DEG: f64 = 20.0;
const MAX_RADAR_TURN_DEG: f64 = 45.0;
const SCAN_RANGE: f64 = 1200.0;
const RAM_DAMAGE: f64 = 0.6;
const START_ENERGY: f64 = 100.0;

pub fn bullet_damage(power: f64) -> f64 {
    let power = power.clamp(MIN_FIRE_POWER, MAX_FIRE_POWER);
    let bonus = if power > 1.0 { 2.0 * (power - 1.0) } else { 0.0 };
    4.0 * power + bonus
}

fn max_body_turn(velocity: f64) -> f64 {
    (10.0 - 0.75 * velocity.abs()).to_radians()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaSettings {
    pub width: f64,
    pub height: f64,
    pub opponents: usize,
    pub drone_speed: f64,
    pub drone_fire_power: f64,
    pub drone_fire_range: f64,
    /// Half-width of the uniform aim error drones add to every shot, radians.
    pub drone_aim_error: f64,
    pub drone_turn_chance: f64,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            opponents: 3,
            drone_speed: 4.0,
            drone_fire_power: 1.0,
            drone_fire_range: 500.0,
            drone_aim_error: 0.15,
            drone_turn_chance: 0.03,
        }
    }
}

#[derive(Clone, Debug)]
struct Tank {
    name: String,
    position: Point,
    heading: f64,
    velocity: f64,
    energy: f64,
    gun_heat: f64,
    alive: bool,
}

impl Tank {
    fn spawn(name: String, position: Point, heading: f64) -> Self {
        Self {
            name,
            position,
            heading,
            velocity: 0.0,
            energy: START_ENERGY,
            gun_heat: 3.0,
            alive: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Controls {
    ahead: f64,
    turn: f64,
    gun_turn: f64,
    radar_turn: f64,
    fire: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shooter {
    Agent,
    Drone(usize),
}

#[derive(Clone, Copy, Debug)]
struct Projectile {
    shooter: Shooter,
    position: Point,
    heading: f64,
    power: f64,
}

pub struct SimArena {
    settings: ArenaSettings,
    bounds: ArenaBounds,
    time: u64,
    agent: Tank,
    gun_heading: f64,
    radar_heading: f64,
    controls: Controls,
    drones: Vec<Tank>,
    projectiles: Vec<Projectile>,
    rng: StdRng,
    finished: bool,
    shots_fired: u32,
}

impl SimArena {
    pub fn new(settings: ArenaSettings, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let bounds = ArenaBounds::new(settings.width.max(200.0), settings.height.max(200.0));
        let spawn_margin = 60.0;
        let random_point = |rng: &mut StdRng| {
            Point::new(
                rng.gen_range(spawn_margin..bounds.width - spawn_margin),
                rng.gen_range(spawn_margin..bounds.height - spawn_margin),
            )
        };

        let heading = rng.gen_range(-PI..PI);
        let agent = Tank::spawn("agent".to_string(), random_point(&mut rng), heading);

        let mut drones: Vec<Tank> = Vec::with_capacity(settings.opponents);
        for i in 0..settings.opponents {
            let mut position = random_point(&mut rng);
            for _ in 0..20 {
                let crowded = position.distance(agent.position) < 150.0
                    || drones.iter().any(|d| d.position.distance(position) < 4.0 * HULL_RADIUS);
                if !crowded {
                    break;
                }
                position = random_point(&mut rng);
            }
            let heading = rng.gen_range(-PI..PI);
            drones.push(Tank::spawn(format!("drone-{}", i + 1), position, heading));
        }

        Self {
            settings,
            bounds,
            time: 0,
            gun_heading: agent.heading,
            radar_heading: agent.heading,
            agent,
            controls: Controls::default(),
            drones,
            projectiles: Vec::new(),
            rng,
            finished: false,
            shots_fired: 0,
        }
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn shots_fired(&self) -> u32 {
        self.shots_fired
    }

    pub fn agent_energy(&self) -> f64 {
        self.agent.energy
    }

    pub fn opponents_alive(&self) -> usize {
        self.drones.iter().filter(|d| d.alive).count()
    }

    /// Stops the round early; later ticks produce no events.
    pub fn conclude(&mut self) {
        self.finished = true;
    }

    /// Applies pending commands, advances one tick and reports what happened.
    pub fn tick(&mut self) -> Vec<ArenaEvent> {
        if self.finished {
            return Vec::new();
        }
        let mut events = Vec::new();

        self.fire_agent_gun();
        self.turn_agent();
        self.move_agent(&mut events);
        self.move_drones();
        self.move_projectiles(&mut events);
        self.time += 1;
        self.scan(&mut events);
        self.resolve_outcome(&mut events);
        events
    }

    fn fire_agent_gun(&mut self) {
        if let Some(power) = self.controls.fire.take() {
            let power = power.clamp(MIN_FIRE_POWER, MAX_FIRE_POWER);
            if self.agent.gun_heat <= 0.0 && self.agent.energy > power {
                self.agent.energy -= power;
                self.agent.gun_heat = 1.0 + power / 5.0;
                self.shots_fired += 1;
                self.projectiles.push(Projectile {
                    shooter: Shooter::Agent,
                    position: self.agent.position,
                    heading: self.gun_heading,
                    power,
                });
            }
        }
        self.agent.gun_heat = (self.agent.gun_heat - GUN_COOLING_RATE).max(0.0);
    }

    fn turn_agent(&mut self) {
        let step = |remaining: &mut f64, limit: f64| {
            let s = remaining.clamp(-limit, limit);
            *remaining -= s;
            if remaining.abs() < 1e-9 {
                *remaining = 0.0;
            }
            s
        };
        let body = step(&mut self.controls.turn, max_body_turn(self.agent.velocity));
        self.agent.heading = normal_relative_angle(self.agent.heading + body);
        let gun = step(&mut self.controls.gun_turn, MAX_GUN_TURN_DEG.to_radians());
        self.gun_heading = normal_relative_angle(self.gun_heading + gun);
        let radar = step(&mut self.controls.radar_turn, MAX_RADAR_TURN_DEG.to_radians());
        self.radar_heading = normal_relative_angle(self.radar_heading + radar);
    }

    fn move_agent(&mut self, events: &mut Vec<ArenaEvent>) {
        let desired = self.controls.ahead.clamp(-MAX_VELOCITY, MAX_VELOCITY);
        let v = self.agent.velocity;
        let rate = if desired * v >= 0.0 && desired.abs() > v.abs() {
            ACCELERATION
        } else {
            DECELERATION
        };
        let v = v + (desired - v).clamp(-rate, rate);
        self.agent.velocity = v;
        self.controls.ahead -= v;

        let mut next = self.agent.position.project(self.agent.heading, v);
        if !self.bounds.contains(next, HULL_RADIUS) {
            next = self.bounds.clamp(next, HULL_RADIUS);
            self.agent.energy -= (v.abs() * 0.5 - 1.0).max(0.0);
            self.halt_agent();
            events.push(ArenaEvent::HitWall);
        }

        if let Some(drone) = self
            .drones
            .iter_mut()
            .find(|d| d.alive && d.position.distance(next) < 2.0 * HULL_RADIUS)
        {
            drone.energy -= RAM_DAMAGE;
            self.agent.energy -= RAM_DAMAGE;
            next = self.agent.position;
            self.halt_agent();
            events.push(ArenaEvent::HitOpponent);
        }
        self.agent.position = next;
    }

    fn halt_agent(&mut self) {
        self.agent.velocity = 0.0;
        self.controls.ahead = 0.0;
    }

    fn move_drones(&mut self) {
        let center = Point::new(self.bounds.width / 2.0, self.bounds.height / 2.0);
        let target = self.agent.position;
        for (i, drone) in self.drones.iter_mut().enumerate() {
            if !drone.alive {
                continue;
            }
            if !self.bounds.contains(drone.position, 60.0) {
                drone.heading = drone.position.bearing_to(center) + self.rng.gen_range(-0.5..0.5);
            } else if self.rng.gen_bool(self.settings.drone_turn_chance.clamp(0.0, 1.0)) {
                drone.heading = self.rng.gen_range(-PI..PI);
            }
            drone.velocity = self.settings.drone_speed;
            let next = drone.position.project(drone.heading, drone.velocity);
            drone.position = self.bounds.clamp(next, HULL_RADIUS);

            drone.gun_heat = (drone.gun_heat - GUN_COOLING_RATE).max(0.0);
            let power = self.settings.drone_fire_power.clamp(MIN_FIRE_POWER, MAX_FIRE_POWER);
            let in_range = drone.position.distance(target) <= self.settings.drone_fire_range;
            if drone.gun_heat <= 0.0 && in_range && drone.energy > power {
                let error = self.settings.drone_aim_error.abs();
                let jitter = if error > 0.0 {
                    self.rng.gen_range(-error..error)
                } else {
                    0.0
                };
                drone.energy -= power;
                drone.gun_heat = 1.0 + power / 5.0;
                self.projectiles.push(Projectile {
                    shooter: Shooter::Drone(i),
                    position: drone.position,
                    heading: drone.position.bearing_to(target) + jitter,
                    power,
                });
            }
        }
    }

    fn move_projectiles(&mut self, events: &mut Vec<ArenaEvent>) {
        let mut in_flight = Vec::with_capacity(self.projectiles.len());
        for mut shot in std::mem::take(&mut self.projectiles) {
            shot.position = shot.position.project(shot.heading, projectile_speed(shot.power));
            let damage = bullet_damage(shot.power);
            match shot.shooter {
                Shooter::Agent => {
                    let victim = self
                        .drones
                        .iter_mut()
                        .find(|d| d.alive && d.position.distance(shot.position) < HULL_RADIUS);
                    if let Some(drone) = victim {
                        drone.energy -= damage;
                        self.agent.energy += 3.0 * shot.power;
                        events.push(ArenaEvent::BulletHit);
                        if drone.energy <= 0.0 {
                            drone.alive = false;
                            events.push(ArenaEvent::OpponentEliminated {
                                name: drone.name.clone(),
                            });
                        }
                        continue;
                    }
                }
                Shooter::Drone(owner) => {
                    if self.agent.position.distance(shot.position) < HULL_RADIUS {
                        self.agent.energy -= damage;
                        if let Some(drone) = self.drones.get_mut(owner) {
                            drone.energy += 3.0 * shot.power;
                        }
                        events.push(ArenaEvent::HitByBullet);
                        continue;
                    }
                }
            }
            if self.bounds.contains(shot.position, 0.0) {
                in_flight.push(shot);
            } else if shot.shooter == Shooter::Agent {
                events.push(ArenaEvent::BulletMissed);
            }
        }
        self.projectiles = in_flight;
    }

    fn scan(&self, events: &mut Vec<ArenaEvent>) {
        let me = &self.agent;
        for drone in self.drones.iter().filter(|d| d.alive) {
            let distance = me.position.distance(drone.position);
            if distance > SCAN_RANGE {
                continue;
            }
            events.push(ArenaEvent::Scanned(Sighting {
                name: drone.name.clone(),
                bearing: normal_relative_angle(me.position.bearing_to(drone.position) - me.heading),
                distance,
                heading: drone.heading,
                velocity: drone.velocity,
                energy: drone.energy,
                time: self.time,
            }));
        }
    }

    fn resolve_outcome(&mut self, events: &mut Vec<ArenaEvent>) {
        if self.agent.energy <= 0.0 {
            self.agent.energy = 0.0;
            self.agent.alive = false;
            events.push(ArenaEvent::Eliminated);
        } else if self.opponents_alive() == 0 {
            events.push(ArenaEvent::Victory);
        } else {
            return;
        }
        events.push(ArenaEvent::RoundEnded);
        self.finished = true;
    }
}

impl ArenaHost for SimArena {
    fn status(&self) -> OwnStatus {
        OwnStatus {
            time: self.time,
            position: self.agent.position,
            heading: self.agent.heading,
            gun_heading: self.gun_heading,
            radar_heading: self.radar_heading,
            energy: self.agent.energy,
            bounds: self.bounds,
            gun_heat: self.agent.gun_heat,
            gun_turn_remaining: self.controls.gun_turn,
            radar_turn_remaining: self.controls.radar_turn,
        }
    }

    fn set_ahead(&mut self, distance: f64) {
        self.controls.ahead = distance;
    }

    fn set_turn_right(&mut self, radians: f64) {
        self.controls.turn = radians;
    }

    fn set_turn_gun_right(&mut self, radians: f64) {
        self.controls.gun_turn = radians;
    }

    fn set_turn_radar_right(&mut self, radians: f64) {
        self.controls.radar_turn = radians;
    }

    fn fire(&mut self, power: f64) {
        self.controls.fire = Some(power);
    }

    fn can_fire(&self) -> bool {
        self.agent.alive && self.agent.gun_heat <= 0.0
    }
}
