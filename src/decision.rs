//! Tick-driven decision loop.
//!
//! The host calls [`DecisionLoop::advance`] once per tick and forwards every
//! [`ArenaEvent`] to [`DecisionLoop::on_event`]. A decision is taken every
//! `hold_ticks` ticks: encode the state, credit the previous decision with
//! the reward gathered since, pick a new action. Between decisions the held
//! action is re-applied each tick so aim keeps tracking a moving target.
//!
//! Episode cursor lifecycle:
//!
//! ```text
//! no prior ──advance──▶ prior(state, action, reward) ──advance──▶ prior(...)
//!     ▲                          │
//!     └── victory / eliminated ──┘  (terminal update, persist)
//!     └── round ended ───────────┘  (persist, no update)
//! ```

use crate::brain::{ActionId, QBrain, Successor};
use crate::config::AgentConfig;
use crate::host::{ArenaEvent, ArenaHost};
use crate::pilot;
use crate::reward::{RewardAccumulator, RewardTable};
use crate::state::{Observation, StateEncoder, StateKey};
use crate::strategy::{Action, StrategyExecutor};
use crate::tracker::{nearest, EnemyTracker};
use serde::Serialize;
use std::path::PathBuf;

/// The last decision and what it has earned so far.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeCursor {
    pub state: StateKey,
    pub action: ActionId,
    pub reward: RewardAccumulator,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EpisodeStats {
    pub decisions: u32,
    pub updates: u32,
    pub shots: u32,
    pub reward: f64,
    pub action_counts: [u32; Action::COUNT],
}

pub struct DecisionLoop {
    brain: QBrain,
    encoder: StateEncoder,
    executor: StrategyExecutor,
    tracker: EnemyTracker,
    rewards: RewardTable,
    cursor: Option<EpisodeCursor>,
    hold_ticks: u32,
    hold_remaining: u32,
    training: bool,
    learning_enabled: bool,
    fire_tolerance: f64,
    wall_bounce: f64,
    finished: bool,
    brain_path: Option<PathBuf>,
    stats: EpisodeStats,
}

impl DecisionLoop {
    pub fn new(brain: QBrain, config: &AgentConfig, seed: u64) -> Self {
        if brain.num_actions() != Action::COUNT {
            tracing::warn!(
                brain_actions = brain.num_actions(),
                behaviors = Action::COUNT,
                "brain width differs from behavior count; extra ids fall back to evasive"
            );
        }
        Self {
            brain,
            encoder: StateEncoder::new(config.schema),
            executor: StrategyExecutor::new(config.strategy.clone(), seed),
            tracker: EnemyTracker::new(config.staleness_ticks, config.eviction_ticks),
            rewards: config.rewards,
            cursor: None,
            hold_ticks: config.hold_ticks.max(1),
            hold_remaining: 0,
            training: config.training,
            learning_enabled: config.learning_enabled,
            fire_tolerance: config.fire_tolerance(),
            wall_bounce: config.wall_bounce,
            finished: false,
            brain_path: None,
            stats: EpisodeStats::default(),
        }
    }

    /// Persist the brain to `path` on terminal events, round ends and flushes.
    pub fn with_brain_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.brain_path = Some(path.into());
        self
    }

    pub fn brain(&self) -> &QBrain {
        &self.brain
    }

    pub fn into_brain(self) -> QBrain {
        self.brain
    }

    pub fn cursor(&self) -> Option<&EpisodeCursor> {
        self.cursor.as_ref()
    }

    pub fn stats(&self) -> &EpisodeStats {
        &self.stats
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Forgets everything tied to the previous round; the brain is kept.
    pub fn begin_episode(&mut self) {
        self.cursor = None;
        self.hold_remaining = 0;
        self.finished = false;
        self.tracker.clear();
        self.stats = EpisodeStats::default();
    }

    pub fn advance<H: ArenaHost + ?Sized>(&mut self, host: &mut H) {
        if self.finished {
            return;
        }
        let own = host.status();
        let evicted = self.tracker.sweep(own.time);
        if evicted > 0 {
            tracing::debug!(evicted, "dropped long-unseen opponents");
        }
        let fresh = self.tracker.fresh(own.time);

        if self.hold_remaining == 0 {
            let state = self.encoder.encode(&Observation {
                position: own.position,
                energy: own.energy,
                bounds: own.bounds,
                enemies: &fresh,
            });
            self.decide(state);
        }
        let Some(action) = self.cursor.as_ref().map(|c| c.action) else {
            return;
        };

        pilot::track_radar(host, &own, nearest(&fresh, own.position));
        let behavior = Action::from_id(action).unwrap_or(Action::Evasive);
        let intent = self.executor.apply(behavior, &own, &fresh);
        pilot::steer(host, &own, intent.movement);
        if let Some(fire) = intent.fire {
            if pilot::aim_and_fire(host, &own, fire, self.fire_tolerance) {
                self.stats.shots += 1;
            }
        }

        self.hold_remaining = self.hold_remaining.saturating_sub(1);
        self.credit(self.rewards.survival_per_tick);
        if self.hold_remaining == 0 {
            self.credit(self.rewards.survival_per_cycle);
        }
    }

    pub fn on_event<H: ArenaHost + ?Sized>(&mut self, event: &ArenaEvent, host: &mut H) {
        match event {
            ArenaEvent::Scanned(sighting) => {
                let own = host.status();
                self.tracker.record(sighting, &own);
            }
            ArenaEvent::OpponentEliminated { name } => {
                self.tracker.remove(name);
            }
            ArenaEvent::HitWall => {
                self.credit_event(event);
                host.set_back(self.wall_bounce);
            }
            ArenaEvent::RoundEnded => {
                self.cursor = None;
                self.hold_remaining = 0;
                self.finished = true;
                self.flush();
            }
            _ if event.is_terminal() => {
                self.credit_event(event);
                self.close_with_terminal();
            }
            _ => self.credit_event(event),
        }
    }

    /// Writes the brain to its configured path, if any. Failures are logged.
    pub fn flush(&self) {
        if let Some(path) = &self.brain_path {
            self.brain.save_best_effort(path);
        }
    }

    fn decide(&mut self, state: StateKey) {
        if let Some(prev) = self.cursor.take() {
            self.learn(&prev, Successor::State(&state));
        }
        let action = self.brain.select_action(&state, self.training);
        tracing::debug!(state = %state, action, "decision");
        if let Some(count) = self.stats.action_counts.get_mut(action) {
            *count += 1;
        }
        self.stats.decisions += 1;
        self.cursor = Some(EpisodeCursor {
            state,
            action,
            reward: RewardAccumulator::default(),
        });
        self.hold_remaining = self.hold_ticks;
    }

    fn learn(&mut self, prev: &EpisodeCursor, next: Successor<'_>) {
        if !self.learning_enabled {
            return;
        }
        let reward = prev.reward.total();
        if self
            .brain
            .update(Some(&prev.state), prev.action, reward, next)
            .is_some()
        {
            self.stats.updates += 1;
        }
    }

    fn close_with_terminal(&mut self) {
        if let Some(prev) = self.cursor.take() {
            self.learn(&prev, Successor::Terminal);
        }
        self.hold_remaining = 0;
        self.finished = true;
        self.flush();
    }

    fn credit_event(&mut self, event: &ArenaEvent) {
        if let Some(delta) = self.rewards.delta(event) {
            self.credit(delta);
        }
    }

    fn credit(&mut self, delta: f64) {
        // Outcomes before the first decision have no action to credit.
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.reward.add(delta);
            self.stats.reward += delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::LearningParams;
    use crate::geometry::{ArenaBounds, Point};
    use crate::host::{OwnStatus, Sighting};

    struct StillHost {
        status: OwnStatus,
        backs: Vec<f64>,
        shots: Vec<f64>,
    }

    impl StillHost {
        fn new(energy: f64) -> Self {
            Self {
                status: OwnStatus {
                    time: 0,
                    position: Point::new(400.0, 300.0),
                    heading: 0.0,
                    gun_heading: 0.0,
                    radar_heading: 0.0,
                    energy,
                    bounds: ArenaBounds::new(800.0, 600.0),
                    gun_heat: 3.0,
                    gun_turn_remaining: 0.0,
                    radar_turn_remaining: 0.0,
                },
                backs: Vec::new(),
                shots: Vec::new(),
            }
        }

        fn tick(&mut self) {
            self.status.time += 1;
        }
    }

    impl ArenaHost for StillHost {
        fn status(&self) -> OwnStatus {
            self.status
        }
        fn set_ahead(&mut self, _distance: f64) {}
        fn set_back(&mut self, distance: f64) {
            self.backs.push(distance);
        }
        fn set_turn_right(&mut self, _radians: f64) {}
        fn set_turn_gun_right(&mut self, _radians: f64) {}
        fn set_turn_radar_right(&mut self, _radians: f64) {}
        fn fire(&mut self, power: f64) {
            self.shots.push(power);
        }
    }

    fn sighting(distance: f64, time: u64) -> ArenaEvent {
        ArenaEvent::Scanned(Sighting {
            name: "drone-1".to_string(),
            bearing: 0.0,
            distance,
            heading: 0.0,
            velocity: 0.0,
            energy: 100.0,
            time,
        })
    }

    fn melee_loop() -> DecisionLoop {
        let mut config = AgentConfig::preset("melee").expect("melee preset");
        config.learning.exploration_rate = 0.0;
        let brain = QBrain::new(Action::COUNT, config.learning, 1);
        DecisionLoop::new(brain, &config, 1)
    }

    #[test]
    fn events_before_first_decision_are_dropped() {
        let mut agent = melee_loop();
        let mut host = StillHost::new(100.0);
        agent.on_event(&ArenaEvent::BulletHit, &mut host);
        assert!(agent.cursor().is_none());
        agent.on_event(&ArenaEvent::Eliminated, &mut host);
        assert!(agent.brain().is_empty());
    }

    #[test]
    fn decision_credited_with_next_state() {
        let mut config = AgentConfig::preset("melee").expect("melee preset");
        config.learning.exploration_rate = 0.0;
        let close = StateKey::from("CLOSE-LOW-DUEL");
        // A bad past outcome for evasive steers the greedy pick to aggressive.
        let mut brain = QBrain::new(Action::COUNT, config.learning, 1);
        brain.update(Some(&close), 0, -1.0, Successor::Terminal);
        let mut agent = DecisionLoop::new(brain, &config, 1);
        let mut host = StillHost::new(20.0);

        agent.on_event(&sighting(200.0, 0), &mut host);
        agent.advance(&mut host);
        assert_eq!(agent.cursor().map(|c| &c.state), Some(&close));
        assert_eq!(agent.cursor().map(|c| c.action), Some(Action::Aggressive.id()));
        agent.on_event(&ArenaEvent::BulletHit, &mut host);
        agent.on_event(&ArenaEvent::HitWall, &mut host);
        assert_eq!(host.backs, vec![50.0]);
        for _ in 1..15 {
            host.tick();
            agent.advance(&mut host);
        }
        let pending = agent.cursor().map(|c| c.reward.total()).unwrap_or_default();
        assert!((pending - 5.1).abs() < 1e-12);

        host.tick();
        agent.on_event(&sighting(300.0, host.status.time), &mut host);
        agent.advance(&mut host);

        let row = agent.brain().values(&close).expect("row exists");
        assert!((row[1] - 0.51).abs() < 1e-12, "q = {}", row[1]);
        assert!((row[0] + 0.1).abs() < 1e-12);
        assert_eq!(&row[2..], &[0.0, 0.0]);
        assert_eq!(
            agent.cursor().map(|c| c.state.as_str()),
            Some("MID-LOW-DUEL")
        );
        assert_eq!(agent.stats().decisions, 2);
        assert_eq!(agent.stats().updates, 1);
    }

    #[test]
    fn terminal_event_updates_and_resets() {
        let mut agent = melee_loop();
        let mut host = StillHost::new(100.0);
        agent.advance(&mut host);
        let state = agent.cursor().map(|c| c.state.clone()).expect("decided");
        agent.on_event(&ArenaEvent::HitByBullet, &mut host);
        agent.on_event(&ArenaEvent::Eliminated, &mut host);

        assert!(agent.cursor().is_none());
        assert!(agent.is_finished());
        let q = agent.brain().values(&state).map(|v| v[0]).unwrap_or_default();
        assert!((q - 0.1 * (-15.0 - 50.0)).abs() < 1e-12);

        // Nothing is decided until the next episode begins.
        agent.advance(&mut host);
        assert!(agent.cursor().is_none());
        agent.begin_episode();
        agent.advance(&mut host);
        assert!(agent.cursor().is_some());
    }

    #[test]
    fn round_end_closes_without_learning() {
        let mut agent = melee_loop();
        let mut host = StillHost::new(100.0);
        agent.advance(&mut host);
        agent.on_event(&ArenaEvent::BulletHit, &mut host);
        agent.on_event(&ArenaEvent::RoundEnded, &mut host);
        assert!(agent.cursor().is_none());
        assert!(agent.brain().states().all(|(_, row)| row.iter().all(|v| *v == 0.0)));
    }

    #[test]
    fn greedy_play_still_learns() {
        let mut config = AgentConfig::preset("melee").expect("melee preset");
        config.training = false;
        let brain = QBrain::new(Action::COUNT, config.learning, 3);
        let mut agent = DecisionLoop::new(brain, &config, 3);
        let mut host = StillHost::new(100.0);

        agent.advance(&mut host);
        let state = agent.cursor().map(|c| c.state.clone()).expect("decided");
        assert_eq!(agent.cursor().map(|c| c.action), Some(0));
        agent.on_event(&ArenaEvent::BulletHit, &mut host);
        agent.on_event(&ArenaEvent::Victory, &mut host);

        assert_eq!(agent.stats().updates, 1);
        let q = agent.brain().values(&state).map(|v| v[0]).unwrap_or_default();
        assert!((q - 0.1 * (15.0 + 50.0)).abs() < 1e-12, "q = {q}");
    }

    #[test]
    fn frozen_brain_is_never_updated() {
        let mut config = AgentConfig::default();
        config.training = false;
        config.learning_enabled = false;
        let brain = QBrain::new(Action::COUNT, LearningParams::default(), 3);
        let mut agent = DecisionLoop::new(brain, &config, 3);
        let mut host = StillHost::new(100.0);
        for _ in 0..50 {
            agent.advance(&mut host);
            agent.on_event(&ArenaEvent::BulletHit, &mut host);
            host.tick();
        }
        agent.on_event(&ArenaEvent::Victory, &mut host);
        assert!(agent.stats().decisions > 1);
        assert_eq!(agent.stats().updates, 0);
        assert!(agent.brain().states().all(|(_, row)| row.iter().all(|v| *v == 0.0)));
    }
}
