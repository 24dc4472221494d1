//! Binary sparse reward tied to goal satisfaction.

use crate::goal::GoalDescription;
use crate::types::ZoneLevels;

/// The reward emitted after one training step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardSignal {
    /// The scalar reward for this step.
    pub value: f64,
    /// Whether the observed state satisfied the goal. Ends the episode.
    pub goal_reached: bool,
}

/// Returns `reward` when `observed` matches `target` exactly, else `0.0`.
pub fn evaluate(observed: ZoneLevels, target: &GoalDescription, reward: f64) -> f64 {
    if target.is_satisfied_by(observed) {
        reward
    } else {
        0.0
    }
}

/// Evaluates observations against one fixed goal and reward.
#[derive(Debug, Clone, Copy)]
pub struct RewardEvaluator {
    target: GoalDescription,
    reward: f64,
}

impl RewardEvaluator {
    /// Creates an evaluator for `target` emitting `reward` on satisfaction.
    pub fn new(target: GoalDescription, reward: f64) -> Self {
        Self { target, reward }
    }

    /// The goal this evaluator checks against.
    pub fn target(&self) -> &GoalDescription {
        &self.target
    }

    /// Scores one observation.
    pub fn evaluate(&self, observed: ZoneLevels) -> RewardSignal {
        let goal_reached = self.target.is_satisfied_by(observed);
        if goal_reached {
            log::trace!("> Rewarded at {:?} for goal {}", observed, self.target);
        }
        RewardSignal {
            value: if goal_reached { self.reward } else { 0.0 },
            goal_reached,
        }
    }
}
