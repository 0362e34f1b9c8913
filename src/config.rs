use crate::brain::LearningParams;
use crate::reward::RewardTable;
use crate::state::StateSchema;
use crate::strategy::StrategyConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub description: String,

    /// Epsilon-greedy exploration is on only while training.
    pub training: bool,
    /// When false the brain is frozen: decisions never update it.
    #[serde(default = "default_learning_enabled")]
    pub learning_enabled: bool,
    pub hold_ticks: u32,
    pub schema: StateSchema,
    pub learning: LearningParams,
    pub rewards: RewardTable,
    #[serde(default)]
    pub strategy: StrategyConfig,

    // Opponent memory
    pub staleness_ticks: u64,
    #[serde(default = "default_eviction_ticks")]
    pub eviction_ticks: u64,

    // Reflexes
    #[serde(default = "default_fire_tolerance_deg")]
    pub fire_tolerance_deg: f64,
    #[serde(default = "default_wall_bounce")]
    pub wall_bounce: f64,
}

fn default_learning_enabled() -> bool {
    true
}

fn default_eviction_ticks() -> u64 {
    120
}

fn default_fire_tolerance_deg() -> f64 {
    8.0
}

fn default_wall_bounce() -> f64 {
    80.0
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            id: "ultra".to_string(),
            description: "Four-part state with wall proximity; hold 20 ticks, trickle survival reward.".to_string(),
            training: true,
            learning_enabled: default_learning_enabled(),
            hold_ticks: 20,
            schema: StateSchema::Extended,
            learning: LearningParams::default(),
            rewards: RewardTable::ultra(),
            strategy: StrategyConfig::default(),
            staleness_ticks: 40,
            eviction_ticks: default_eviction_ticks(),
            fire_tolerance_deg: default_fire_tolerance_deg(),
            wall_bounce: default_wall_bounce(),
        }
    }
}

impl AgentConfig {
    pub const PRESETS: [&'static str; 2] = ["ultra", "melee"];

    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "ultra" => Some(Self::default()),
            "melee" => Some(Self {
                id: "melee".to_string(),
                description: "Three-part state; hold 15 ticks, survival bonus per completed hold.".to_string(),
                hold_ticks: 15,
                schema: StateSchema::Compact,
                rewards: RewardTable::melee(),
                staleness_ticks: 60,
                wall_bounce: 50.0,
                ..Self::default()
            }),
            _ => None,
        }
    }

    pub fn clamp(&mut self) {
        self.hold_ticks = self.hold_ticks.clamp(1, 500);
        self.learning.clamp();
        self.strategy.clamp();
        self.staleness_ticks = self.staleness_ticks.clamp(1, 10_000);
        self.eviction_ticks = self.eviction_ticks.clamp(self.staleness_ticks, 100_000);
        self.fire_tolerance_deg = self.fire_tolerance_deg.clamp(0.5, 45.0);
        self.wall_bounce = self.wall_bounce.clamp(0.0, 300.0);
    }

    pub fn fire_tolerance(&self) -> f64 {
        self.fire_tolerance_deg.to_radians()
    }
}

/// Resolves a config from a JSON file, a named preset, or the default, in
/// that order of precedence, and clamps it.
pub fn load_config(path: Option<&Path>, preset: Option<&str>) -> Result<AgentConfig> {
    let mut config = match (path, preset) {
        (Some(path), _) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed reading config {}", path.display()))?;
            serde_json::from_str::<AgentConfig>(&raw)
                .with_context(|| format!("failed parsing config {}", path.display()))?
        }
        (None, Some(name)) => AgentConfig::preset(name).ok_or_else(|| {
            anyhow!(
                "unknown preset '{name}'. available: {}",
                AgentConfig::PRESETS.join(", ")
            )
        })?,
        (None, None) => AgentConfig::default(),
    };
    config.clamp();
    Ok(config)
}
