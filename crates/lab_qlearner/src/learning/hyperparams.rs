//! Typed, validated training requests.

use crate::error::{Error, Result};
use crate::goal::GoalDescription;
use serde::{Deserialize, Serialize};

/// Learning parameters for one training request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Number of episodes to run. Must be positive.
    pub episodes: usize,
    /// The learning rate, in `[0, 1]`.
    pub alpha: f64,
    /// The discount factor, in `[0, 1]`.
    pub gamma: f64,
    /// The exploration probability, in `[0, 1]`.
    pub epsilon: f64,
    /// Reward emitted when the goal is satisfied. Must be finite.
    pub reward: f64,
}

impl Hyperparameters {
    /// Creates a validated parameter set.
    pub fn new(episodes: usize, alpha: f64, gamma: f64, epsilon: f64, reward: f64) -> Result<Self> {
        let params = Self {
            episodes,
            alpha,
            gamma,
            epsilon,
            reward,
        };
        params.validate()?;
        Ok(params)
    }

    /// Rejects out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if self.episodes == 0 {
            return Err(Error::Config("episodes must be positive".to_string()));
        }
        for (name, value) in [
            ("alpha", self.alpha),
            ("gamma", self.gamma),
            ("epsilon", self.epsilon),
        ] {
            // NaN fails `contains` as well
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }
        if !self.reward.is_finite() {
            return Err(Error::Config(format!(
                "reward must be finite, got {}",
                self.reward
            )));
        }
        Ok(())
    }
}

/// A request to train the Q-table of one goal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainRequest {
    /// The goal to train for.
    pub goal: GoalDescription,
    /// Learning parameters.
    #[serde(flatten)]
    pub params: Hyperparameters,
}

impl TrainRequest {
    /// Creates a validated request.
    pub fn new(goal: GoalDescription, params: Hyperparameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { goal, params })
    }

    /// Parses and validates a JSON request such as
    /// `{"goal":{"z1":2,"z2":3},"episodes":10,"alpha":0.5,"gamma":0.9,"epsilon":0.1,"reward":100}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let request: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid train request: {}", e)))?;
        request.params.validate()?;
        Ok(request)
    }
}
