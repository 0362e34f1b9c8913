use crate::brain::QBrain;
use crate::config::AgentConfig;
use crate::decision::DecisionLoop;
use crate::runner::{run_episode, EpisodeMetrics, Outcome};
use crate::sim::{ArenaSettings, SimArena};
use crate::util::seed_to_hex;
use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    pub agent: AgentConfig,
    pub seeds: Vec<u32>,
    pub max_ticks: u64,
    pub arena: ArenaSettings,
    pub out_dir: PathBuf,
    pub jobs: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunRecord {
    pub seed: u32,
    pub seed_hex: String,
    pub outcome: Outcome,
    pub ticks: u64,
    pub final_energy: f64,
    pub opponents_left: usize,
    pub shots: u32,
    pub bullet_hits: u32,
    pub hits_taken: u32,
    pub hit_rate: f64,
    pub reward: f64,
    pub decisions: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub generated_unix_s: u64,
    pub config_id: String,
    pub max_ticks: u64,
    pub opponents: usize,
    pub jobs: Option<usize>,
    pub seeds: Vec<u32>,
    pub brain_states: usize,
    pub run_count: usize,
    pub wins: usize,
    pub eliminations: usize,
    pub timeouts: usize,
    pub win_rate: f64,
    pub avg_ticks: f64,
    pub avg_final_energy: f64,
    pub hit_rate: f64,
    pub runs: Vec<RunRecord>,
}

/// Evaluates `brain` greedily on every seed in parallel with learning
/// frozen. Each run works on its own copy of the brain and nothing is
/// persisted.
pub fn run_benchmark(config: BenchmarkConfig, brain: &QBrain) -> Result<BenchmarkReport> {
    if config.seeds.is_empty() {
        return Err(anyhow!("benchmark requires at least one seed"));
    }
    if let Some(jobs) = config.jobs {
        if jobs == 0 {
            return Err(anyhow!("benchmark --jobs must be >= 1 when provided"));
        }
    }
    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("failed creating {}", config.out_dir.display()))?;

    let mut agent_config = config.agent.clone();
    agent_config.training = false;
    agent_config.learning_enabled = false;

    let run_one = |seed: &u32| -> (u32, EpisodeMetrics) {
        let mut agent = DecisionLoop::new(brain.clone(), &agent_config, u64::from(*seed));
        let mut arena = SimArena::new(config.arena.clone(), u64::from(*seed));
        let mut metrics = run_episode(&mut agent, &mut arena, config.max_ticks);
        metrics.seed = u64::from(*seed);
        (*seed, metrics)
    };

    let results: Vec<(u32, EpisodeMetrics)> = if let Some(jobs) = config.jobs {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("failed to build rayon threadpool")?;
        pool.install(|| config.seeds.par_iter().map(run_one).collect())
    } else {
        config.seeds.par_iter().map(run_one).collect()
    };

    let runs: Vec<RunRecord> = results
        .iter()
        .map(|(seed, m)| RunRecord {
            seed: *seed,
            seed_hex: seed_to_hex(*seed),
            outcome: m.outcome,
            ticks: m.ticks,
            final_energy: m.final_energy,
            opponents_left: m.opponents_left,
            shots: m.shots,
            bullet_hits: m.bullet_hits,
            hits_taken: m.hits_taken,
            hit_rate: m.hit_rate(),
            reward: m.reward,
            decisions: m.decisions,
        })
        .collect();

    let run_count = runs.len();
    let denom = run_count.max(1) as f64;
    let count = |outcome: Outcome| runs.iter().filter(|r| r.outcome == outcome).count();
    let wins = count(Outcome::Victory);
    let shots: u64 = runs.iter().map(|r| r.shots as u64).sum();
    let hits: u64 = runs.iter().map(|r| r.bullet_hits as u64).sum();

    write_runs_csv(&config.out_dir.join("runs.csv"), &runs)?;

    let report = BenchmarkReport {
        generated_unix_s: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
        config_id: config.agent.id.clone(),
        max_ticks: config.max_ticks,
        opponents: config.arena.opponents,
        jobs: config.jobs,
        brain_states: brain.len(),
        run_count,
        wins,
        eliminations: count(Outcome::Eliminated),
        timeouts: count(Outcome::Timeout),
        win_rate: wins as f64 / denom,
        avg_ticks: runs.iter().map(|r| r.ticks as f64).sum::<f64>() / denom,
        avg_final_energy: runs.iter().map(|r| r.final_energy).sum::<f64>() / denom,
        hit_rate: if shots == 0 { 0.0 } else { hits as f64 / shots as f64 },
        seeds: config.seeds,
        runs,
    };

    let report_path = config.out_dir.join("summary.json");
    fs::write(
        &report_path,
        serde_json::to_vec_pretty(&report).context("failed to serialize summary json")?,
    )
    .with_context(|| format!("failed writing {}", report_path.display()))?;

    tracing::info!(
        runs = report.run_count,
        win_rate = report.win_rate,
        hit_rate = report.hit_rate,
        out_dir = %config.out_dir.display(),
        "benchmark finished"
    );
    Ok(report)
}

fn write_runs_csv(path: &Path, rows: &[RunRecord]) -> Result<()> {
    let mut csv = String::from(
        "seed_hex,seed,outcome,ticks,final_energy,opponents_left,shots,bullet_hits,hits_taken,hit_rate,reward,decisions\n",
    );
    for row in rows {
        csv.push_str(&format!(
            "{},{},{},{},{:.2},{},{},{},{},{:.4},{:.3},{}\n",
            row.seed_hex,
            row.seed,
            row.outcome.as_str(),
            row.ticks,
            row.final_energy,
            row.opponents_left,
            row.shots,
            row.bullet_hits,
            row.hits_taken,
            row.hit_rate,
            row.reward,
            row.decisions
        ));
    }
    fs::write(path, csv).with_context(|| format!("failed writing {}", path.display()))
}
