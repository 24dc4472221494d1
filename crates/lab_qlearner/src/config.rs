//! Configuration for the lab Q-learner.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings that stay fixed for the lifetime of a learner. Per-request
/// hyperparameters live in [`Hyperparameters`](crate::learning::Hyperparameters).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Random actions performed once when the learner is created, to move the
    /// lab away from its fixed starting configuration.
    pub init_warmup_steps: usize,
    /// Random actions performed at the start of every training request.
    pub warmup_steps: usize,
    /// Random actions performed before each episode. The current state is
    /// re-read afterwards.
    pub episode_warmup_steps: usize,
    /// Pause after every environment action, in milliseconds, so the lab can
    /// settle before it is read.
    pub settle_time_ms: u64,
    /// Upper bound on steps per episode. `None` runs every episode until the
    /// goal is reached.
    pub max_steps_per_episode: Option<u64>,
    /// Exploration probability used by
    /// [`QLearner::suggest_action`](crate::learner::QLearner::suggest_action).
    pub inference_epsilon: f64,
    /// Where [`JsonFileStorage`](crate::store::JsonFileStorage) keeps the tables.
    pub store_path: PathBuf,
    /// Pretty-print the persisted store.
    pub pretty_store: bool,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            init_warmup_steps: 100,
            warmup_steps: 100,
            episode_warmup_steps: 0,
            settle_time_ms: 2,
            max_steps_per_episode: None,
            inference_epsilon: 0.9,
            store_path: PathBuf::from("qtables.json"),
            pretty_store: false,
        }
    }
}

impl LearnerConfig {
    /// Settings for simulated environments: no settling pause and no
    /// construction-time warm-up.
    pub fn simulation() -> Self {
        Self {
            init_warmup_steps: 0,
            settle_time_ms: 0,
            ..Default::default()
        }
    }

    /// The settle pause as a [`Duration`].
    pub fn settle_time(&self) -> Duration {
        Duration::from_millis(self.settle_time_ms)
    }

    /// Sets the per-request warm-up length.
    pub fn with_warmup_steps(mut self, steps: usize) -> Self {
        self.warmup_steps = steps;
        self
    }

    /// Sets the construction-time warm-up length.
    pub fn with_init_warmup_steps(mut self, steps: usize) -> Self {
        self.init_warmup_steps = steps;
        self
    }

    /// Sets the per-episode warm-up length.
    pub fn with_episode_warmup_steps(mut self, steps: usize) -> Self {
        self.episode_warmup_steps = steps;
        self
    }

    /// Sets the settle pause.
    pub fn with_settle_time(mut self, settle: Duration) -> Self {
        self.settle_time_ms = settle.as_millis() as u64;
        self
    }

    /// Caps every episode at `steps` steps.
    pub fn with_step_budget(mut self, steps: u64) -> Self {
        self.max_steps_per_episode = Some(steps);
        self
    }

    /// Sets the store location.
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.inference_epsilon) {
            return Err(Error::Config(format!(
                "inference_epsilon must be in [0, 1], got {}",
                self.inference_epsilon
            )));
        }
        if self.max_steps_per_episode == Some(0) {
            return Err(Error::Config(
                "max_steps_per_episode must be positive when set".to_string(),
            ));
        }
        if self.store_path.as_os_str().is_empty() {
            return Err(Error::Config("store_path must not be empty".to_string()));
        }
        Ok(())
    }

    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {:?}: {}", path, e)))?;
        Self::from_toml(&content)
    }

    /// Serializes to TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
