//! Engine configuration
//!
//! Everything tunable about the engine lives here: the depth schedule, node
//! budget and yield interval of the search plus the evaluation weights.
//! Loaded from JSON; missing fields fall back to the defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::eval::EvalWeights;

/// Search depth used from `from_ply` onwards
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthStage {
    pub from_ply: u32,
    pub depth: u32,
}

/// Search limits
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Depth by game ply; plies increase, depths never decrease
    pub depth_schedule: Vec<DepthStage>,
    /// Leaf evaluations per search before deeper lines are cut short
    pub node_budget: u64,
    /// Leaf evaluations between two yields to the host
    pub yield_every: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            depth_schedule: vec![
                DepthStage { from_ply: 0, depth: 2 },
                DepthStage { from_ply: 10, depth: 3 },
                DepthStage { from_ply: 40, depth: 4 },
            ],
            node_budget: 400_000,
            yield_every: 2_000,
        }
    }
}

impl SearchConfig {
    /// Same depth for the whole game
    pub fn fixed_depth(depth: u32) -> Self {
        Self {
            depth_schedule: vec![DepthStage { from_ply: 0, depth }],
            ..Default::default()
        }
    }

    /// Depth of the last stage that has started by `ply`
    pub fn depth_for_ply(&self, ply: usize) -> u32 {
        self.depth_schedule
            .iter()
            .take_while(|stage| stage.from_ply as usize <= ply)
            .last()
            .map_or(1, |stage| stage.depth)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let first = self.depth_schedule.first().ok_or(ConfigError::EmptySchedule)?;
        if first.from_ply != 0 {
            return Err(ConfigError::ScheduleStart(first.from_ply));
        }
        for pair in self.depth_schedule.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if next.from_ply <= prev.from_ply {
                return Err(ConfigError::ScheduleOrder(next.from_ply, prev.from_ply));
            }
            if next.depth < prev.depth {
                return Err(ConfigError::ScheduleDepth(next.depth, prev.depth));
            }
        }
        if self.depth_schedule.iter().any(|stage| stage.depth == 0) {
            return Err(ConfigError::ZeroDepth);
        }
        if self.node_budget == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        if self.yield_every == 0 {
            return Err(ConfigError::ZeroYieldInterval);
        }
        Ok(())
    }
}

/// Complete engine configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub search: SearchConfig,
    pub weights: EvalWeights,
}

impl EngineConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.search.validate()?;
        self.weights.validate()
    }
}
