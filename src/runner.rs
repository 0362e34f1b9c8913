use crate::brain::QBrain;
use crate::config::AgentConfig;
use crate::decision::DecisionLoop;
use crate::host::ArenaEvent;
use crate::sim::{ArenaSettings, SimArena};
use crate::strategy::Action;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Victory,
    Eliminated,
    /// The tick limit ended the round first.
    Timeout,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Victory => "victory",
            Self::Eliminated => "eliminated",
            Self::Timeout => "timeout",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeMetrics {
    pub round: u32,
    pub seed: u64,
    pub ticks: u64,
    pub outcome: Outcome,
    pub final_energy: f64,
    pub opponents_left: usize,
    pub shots: u32,
    pub bullet_hits: u32,
    pub hits_taken: u32,
    pub misses: u32,
    pub wall_hits: u32,
    pub rams: u32,
    pub decisions: u32,
    pub updates: u32,
    pub reward: f64,
    pub action_counts: [u32; Action::COUNT],
    pub states_known: usize,
}

impl EpisodeMetrics {
    pub fn hit_rate(&self) -> f64 {
        if self.shots == 0 {
            0.0
        } else {
            self.bullet_hits as f64 / self.shots as f64
        }
    }
}

/// Plays one round to completion or until `max_ticks`.
pub fn run_episode(agent: &mut DecisionLoop, arena: &mut SimArena, max_ticks: u64) -> EpisodeMetrics {
    agent.begin_episode();
    let mut bullet_hits = 0;
    let mut hits_taken = 0;
    let mut misses = 0;
    let mut wall_hits = 0;
    let mut rams = 0;
    let mut outcome = Outcome::Timeout;

    while !arena.is_finished() && arena.time() < max_ticks {
        agent.advance(arena);
        for event in arena.tick() {
            match &event {
                ArenaEvent::BulletHit => bullet_hits += 1,
                ArenaEvent::HitByBullet => hits_taken += 1,
                ArenaEvent::BulletMissed => misses += 1,
                ArenaEvent::HitWall => wall_hits += 1,
                ArenaEvent::HitOpponent => rams += 1,
                ArenaEvent::Victory => outcome = Outcome::Victory,
                ArenaEvent::Eliminated => outcome = Outcome::Eliminated,
                ArenaEvent::Scanned(_) | ArenaEvent::OpponentEliminated { .. } | ArenaEvent::RoundEnded => {}
            }
            agent.on_event(&event, arena);
        }
    }
    if !arena.is_finished() {
        arena.conclude();
        agent.on_event(&ArenaEvent::RoundEnded, arena);
    }

    let stats = agent.stats();
    EpisodeMetrics {
        round: 0,
        seed: 0,
        ticks: arena.time(),
        outcome,
        final_energy: arena.agent_energy(),
        opponents_left: arena.opponents_alive(),
        shots: arena.shots_fired(),
        bullet_hits,
        hits_taken,
        misses,
        wall_hits,
        rams,
        decisions: stats.decisions,
        updates: stats.updates,
        reward: stats.reward,
        action_counts: stats.action_counts,
        states_known: agent.brain().len(),
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub rounds: u32,
    pub seed: u64,
    pub max_ticks: u64,
    pub arena: ArenaSettings,
    pub brain_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionReport {
    pub config_id: String,
    pub training: bool,
    pub rounds: u32,
    pub wins: u32,
    pub eliminations: u32,
    pub timeouts: u32,
    pub win_rate: f64,
    pub avg_ticks: f64,
    pub hit_rate: f64,
    pub states_known: usize,
    pub episodes: Vec<EpisodeMetrics>,
}

/// Per-round arena seed. Consecutive rounds get unrelated layouts.
pub fn round_seed(seed: u64, round: u32) -> u64 {
    seed ^ (round as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Plays `rounds` episodes with one brain, reusing it across rounds and
/// flushing it to `brain_path` at the end. Returns the report and the brain.
pub fn run_session(config: &AgentConfig, session: &SessionConfig) -> Result<(SessionReport, QBrain)> {
    if session.rounds == 0 {
        return Err(anyhow!("session requires at least one round"));
    }
    if session.max_ticks == 0 {
        return Err(anyhow!("session requires --max-ticks >= 1"));
    }

    let brain = match &session.brain_path {
        Some(path) => QBrain::load_or_empty(Action::COUNT, config.learning, session.seed, path),
        None => QBrain::new(Action::COUNT, config.learning, session.seed),
    };
    let mut agent = DecisionLoop::new(brain, config, session.seed);
    if let Some(path) = &session.brain_path {
        agent = agent.with_brain_path(path.clone());
    }

    let mut episodes = Vec::with_capacity(session.rounds as usize);
    for round in 0..session.rounds {
        let seed = round_seed(session.seed, round);
        let mut arena = SimArena::new(session.arena.clone(), seed);
        let mut metrics = run_episode(&mut agent, &mut arena, session.max_ticks);
        metrics.round = round;
        metrics.seed = seed;
        tracing::debug!(
            round,
            outcome = metrics.outcome.as_str(),
            ticks = metrics.ticks,
            reward = metrics.reward,
            states = metrics.states_known,
            "episode finished"
        );
        episodes.push(metrics);
    }
    agent.flush();

    let report = summarize(config, episodes, agent.brain().len());
    tracing::info!(
        config = %report.config_id,
        rounds = report.rounds,
        win_rate = report.win_rate,
        hit_rate = report.hit_rate,
        states = report.states_known,
        "session finished"
    );
    Ok((report, agent.into_brain()))
}

fn summarize(config: &AgentConfig, episodes: Vec<EpisodeMetrics>, states_known: usize) -> SessionReport {
    let rounds = episodes.len() as u32;
    let count = |outcome: Outcome| episodes.iter().filter(|e| e.outcome == outcome).count() as u32;
    let wins = count(Outcome::Victory);
    let eliminations = count(Outcome::Eliminated);
    let timeouts = count(Outcome::Timeout);
    let shots: u64 = episodes.iter().map(|e| e.shots as u64).sum();
    let hits: u64 = episodes.iter().map(|e| e.bullet_hits as u64).sum();
    let ticks: u64 = episodes.iter().map(|e| e.ticks).sum();
    let denom = rounds.max(1) as f64;

    SessionReport {
        config_id: config.id.clone(),
        training: config.training,
        rounds,
        wins,
        eliminations,
        timeouts,
        win_rate: wins as f64 / denom,
        avg_ticks: ticks as f64 / denom,
        hit_rate: if shots == 0 { 0.0 } else { hits as f64 / shots as f64 },
        states_known,
        episodes,
    }
}

pub fn write_report(path: &Path, report: &SessionReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed creating {}", parent.display()))?;
        }
    }
    let encoded = serde_json::to_vec_pretty(report).context("failed to serialize session report")?;
    fs::write(path, encoded).with_context(|| format!("failed writing {}", path.display()))
}
