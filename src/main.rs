use anyhow::{anyhow, Context, Result};
use arena_qbot::benchmark::{run_benchmark, BenchmarkConfig};
use arena_qbot::brain::QBrain;
use arena_qbot::config::{load_config, AgentConfig};
use arena_qbot::runner::{run_session, write_report, SessionConfig};
use arena_qbot::sim::ArenaSettings;
use arena_qbot::strategy::Action;
use arena_qbot::util::{parse_seed, parse_seed_csv, seed_range, seed_to_hex};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "arena-qbot")]
#[command(about = "Tabular Q-learning combat agent: train, evaluate and inspect brains")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// JSON agent config; takes precedence over --preset
    #[arg(long)]
    config: Option<PathBuf>,
    /// Named preset (ultra, melee)
    #[arg(long)]
    preset: Option<String>,
}

#[derive(Args, Debug)]
struct ArenaArgs {
    #[arg(long, default_value_t = 3)]
    opponents: usize,
    #[arg(long, default_value_t = 800.0)]
    width: f64,
    #[arg(long, default_value_t = 600.0)]
    height: f64,
    #[arg(long, default_value_t = 6_000)]
    max_ticks: u64,
}

impl ArenaArgs {
    fn settings(&self) -> ArenaSettings {
        ArenaSettings {
            width: self.width,
            height: self.height,
            opponents: self.opponents,
            ..ArenaSettings::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a brain over consecutive rounds in the reference arena
    Train {
        #[arg(long, default_value_t = 100)]
        rounds: u32,
        #[arg(long, default_value = "1")]
        seed: String,
        #[arg(long, default_value = "brains/ultra.json")]
        brain: PathBuf,
        /// Optional JSON session report
        #[arg(long)]
        report: Option<PathBuf>,
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        arena: ArenaArgs,
    },
    /// Evaluate a brain greedily across many seeds in parallel
    Evaluate {
        #[arg(long, default_value = "brains/ultra.json")]
        brain: PathBuf,
        /// Comma- or space-separated seeds (decimal or 0x-hex)
        #[arg(long)]
        seeds: Option<String>,
        #[arg(long, default_value = "1")]
        seed_start: String,
        #[arg(long, default_value_t = 32)]
        seed_count: usize,
        #[arg(long, default_value = "benchmarks/latest")]
        out_dir: PathBuf,
        #[arg(long)]
        jobs: Option<usize>,
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        arena: ArenaArgs,
    },
    /// Print the states stored in a brain image and their greedy actions
    InspectBrain {
        #[arg(long)]
        brain: PathBuf,
    },
    /// Print the effective agent config as JSON
    ShowConfig {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Commands::Train {
            rounds,
            seed,
            brain,
            report,
            config,
            arena,
        } => {
            let agent = load_config(config.config.as_deref(), config.preset.as_deref())?;
            let seed = parse_seed(&seed)?;
            let session = SessionConfig {
                rounds,
                seed: u64::from(seed),
                max_ticks: arena.max_ticks,
                arena: arena.settings(),
                brain_path: Some(brain.clone()),
            };
            let (summary, trained) = run_session(&agent, &session)?;
            if let Some(path) = report {
                write_report(&path, &summary)?;
                println!("report={}", path.display());
            }
            println!("config={}", summary.config_id);
            println!("seed={}", seed_to_hex(seed));
            println!("rounds={}", summary.rounds);
            println!("wins={}", summary.wins);
            println!("eliminations={}", summary.eliminations);
            println!("timeouts={}", summary.timeouts);
            println!("win_rate={:.4}", summary.win_rate);
            println!("hit_rate={:.4}", summary.hit_rate);
            println!("avg_ticks={:.1}", summary.avg_ticks);
            println!("states={}", trained.len());
            println!("brain={}", brain.display());
        }
        Commands::Evaluate {
            brain,
            seeds,
            seed_start,
            seed_count,
            out_dir,
            jobs,
            config,
            arena,
        } => {
            let agent = load_config(config.config.as_deref(), config.preset.as_deref())?;
            let seeds = match seeds {
                Some(csv) => parse_seed_csv(&csv)?,
                None => seed_range(parse_seed(&seed_start)?, seed_count),
            };
            let table = restore_brain(&agent, &brain)?;
            let report = run_benchmark(
                BenchmarkConfig {
                    agent,
                    seeds,
                    max_ticks: arena.max_ticks,
                    arena: arena.settings(),
                    out_dir: out_dir.clone(),
                    jobs,
                },
                &table,
            )?;
            println!("runs={}", report.run_count);
            println!("wins={}", report.wins);
            println!("win_rate={:.4}", report.win_rate);
            println!("hit_rate={:.4}", report.hit_rate);
            println!("avg_ticks={:.1}", report.avg_ticks);
            println!("avg_final_energy={:.2}", report.avg_final_energy);
            println!("summary={}", out_dir.join("summary.json").display());
        }
        Commands::InspectBrain { brain } => {
            let table = restore_brain(&AgentConfig::default(), &brain)?;
            println!("brain={}", brain.display());
            println!("states={}", table.len());
            for (state, values) in table.states() {
                let best = values
                    .iter()
                    .enumerate()
                    .fold(0, |best, (i, v)| if *v > values[best] { i } else { best });
                let action = Action::from_id(best).map_or("unknown", Action::as_str);
                let rendered: Vec<String> = values.iter().map(|v| format!("{v:.3}")).collect();
                println!("{state:32} {action:10} [{}]", rendered.join(", "));
            }
        }
        Commands::ShowConfig { config } => {
            let agent = load_config(config.config.as_deref(), config.preset.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&agent)?);
        }
    }
    Ok(())
}

/// Loads a brain image strictly: a missing or malformed image is an error
/// here, unlike during training where the agent starts empty.
fn restore_brain(agent: &AgentConfig, path: &std::path::Path) -> Result<QBrain> {
    if !path.exists() {
        return Err(anyhow!("brain image {} does not exist", path.display()));
    }
    let mut brain = QBrain::new(Action::COUNT, agent.learning, 0);
    brain
        .restore(path)
        .with_context(|| format!("failed loading brain {}", path.display()))?;
    Ok(brain)
}
