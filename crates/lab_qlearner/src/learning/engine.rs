//! The Q-learning training loop.
//!
//! One call to [`TrainingEngine::run`] moves through these phases:
//!
//! ```text
//! Warmup ──► EpisodeStep ◄──┐
//!                 │         │ next episode
//!                 ▼         │
//!            EpisodeDone ───┘
//!                 │ episodes exhausted
//!                 ▼
//!           TrainingDone
//! ```
//!
//! `Warmup` performs random applicable actions without learning. Each
//! `EpisodeStep` selects an action epsilon-greedily, performs it, reads the new
//! state and applies
//! `Q(s,a) += alpha * ((r + gamma * max_a' Q(s',a')) - Q(s,a))`, where the max
//! over the new state's applicable actions is floored at zero. An episode ends
//! when the observed state satisfies the goal, or when the optional step
//! budget runs out.

use crate::config::LearnerConfig;
use crate::environment::{checked_applicable_actions, checked_current_state, LabEnvironment};
use crate::error::{Error, Result};
use crate::goal::GoalDescription;
use crate::learning::hyperparams::Hyperparameters;
use crate::policy::ActionSelector;
use crate::qtable::QTable;
use crate::reward::{RewardEvaluator, RewardSignal};
use crate::types::StateIndex;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Where the engine currently is in a training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrainingPhase {
    /// Random exploration before the first episode.
    #[default]
    Warmup,
    /// Inside an episode, learning from each step.
    EpisodeStep,
    /// An episode has just ended.
    EpisodeDone,
    /// All episodes are done.
    TrainingDone,
}

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeOutcome {
    /// The goal was satisfied.
    GoalReached,
    /// The step budget ran out first; the episode did not converge.
    StepBudgetExhausted,
}

/// The record of one episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// 1-based episode number.
    pub episode: usize,
    /// State the episode started from.
    pub start_state: StateIndex,
    /// Learning steps taken.
    pub steps: u64,
    /// How the episode ended.
    pub outcome: EpisodeOutcome,
}

/// The record of one training run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Random actions performed before the first episode.
    pub warmup_steps: usize,
    /// Per-episode records, in order.
    pub episodes: Vec<EpisodeSummary>,
    /// Learning steps across all episodes.
    pub total_steps: u64,
}

impl TrainingSummary {
    /// Episodes that reached the goal.
    pub fn converged_episodes(&self) -> usize {
        self.episodes
            .iter()
            .filter(|e| e.outcome == EpisodeOutcome::GoalReached)
            .count()
    }

    /// Episodes cut off by the step budget.
    pub fn unconverged_episodes(&self) -> usize {
        self.episodes.len() - self.converged_episodes()
    }
}

/// Cooperative cancellation flag, checked at every episode boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an untriggered token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. The current episode still runs to completion.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives an environment to train one Q-table.
pub struct TrainingEngine<'a, E: ?Sized, R = StdRng> {
    env: &'a mut E,
    selector: &'a mut ActionSelector<R>,
    config: &'a LearnerConfig,
    cancel: Option<CancelToken>,
    phase: TrainingPhase,
}

impl<'a, E, R> TrainingEngine<'a, E, R>
where
    E: LabEnvironment + ?Sized,
    R: Rng,
{
    /// Creates an engine over borrowed collaborators.
    pub fn new(env: &'a mut E, selector: &'a mut ActionSelector<R>, config: &'a LearnerConfig) -> Self {
        Self {
            env,
            selector,
            config,
            cancel: None,
            phase: TrainingPhase::Warmup,
        }
    }

    /// Attaches a cancellation token.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The current phase.
    pub fn phase(&self) -> TrainingPhase {
        self.phase
    }

    fn enter(&mut self, phase: TrainingPhase) {
        if self.phase != phase {
            log::debug!("Training phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    fn settle(&self) {
        let settle = self.config.settle_time();
        if !settle.is_zero() {
            std::thread::sleep(settle);
        }
    }

    /// Performs `steps` uniformly random applicable actions without touching
    /// any Q-table. Returns the number of actions performed.
    pub fn warm_up(&mut self, steps: usize) -> Result<usize> {
        for _ in 0..steps {
            let state = checked_current_state(self.env)?;
            let applicable = checked_applicable_actions(self.env, state)?;
            let action = self.selector.random_action(state, &applicable)?;
            self.env.perform_action(action)?;
            self.settle();
        }
        Ok(steps)
    }

    /// Trains `table` toward `goal`. The table is updated in place.
    pub fn run(
        &mut self,
        table: &mut QTable,
        goal: &GoalDescription,
        params: &Hyperparameters,
    ) -> Result<TrainingSummary> {
        params.validate()?;
        table.ensure_shape(&goal.key(), self.env.state_count(), self.env.action_count())?;

        self.enter(TrainingPhase::Warmup);
        let mut summary = TrainingSummary {
            warmup_steps: self.warm_up(self.config.warmup_steps)?,
            ..Default::default()
        };

        let evaluator = RewardEvaluator::new(*goal, params.reward);
        for episode in 1..=params.episodes {
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                log::info!("Training for goal {} cancelled before episode {}", goal, episode);
                return Err(Error::Cancelled {
                    completed_episodes: episode - 1,
                });
            }

            log::info!("Episode {} / {}", episode, params.episodes);
            let record = self.run_episode(table, &evaluator, params, episode)?;
            summary.total_steps += record.steps;
            summary.episodes.push(record);
        }

        self.enter(TrainingPhase::TrainingDone);
        Ok(summary)
    }

    fn run_episode(
        &mut self,
        table: &mut QTable,
        evaluator: &RewardEvaluator,
        params: &Hyperparameters,
        episode: usize,
    ) -> Result<EpisodeSummary> {
        if self.config.episode_warmup_steps > 0 {
            self.warm_up(self.config.episode_warmup_steps)?;
        }

        self.enter(TrainingPhase::EpisodeStep);
        let start_state = checked_current_state(self.env)?;
        let mut state = start_state;
        let mut steps = 0u64;

        let outcome = loop {
            if let Some(budget) = self.config.max_steps_per_episode {
                if steps >= budget {
                    log::warn!(
                        "Episode {} did not reach goal {} within {} steps",
                        episode,
                        evaluator.target(),
                        budget
                    );
                    break EpisodeOutcome::StepBudgetExhausted;
                }
            }

            let (next_state, signal) = self.step(table, state, evaluator, params)?;
            steps += 1;
            state = next_state;
            if signal.goal_reached {
                break EpisodeOutcome::GoalReached;
            }
        };

        self.enter(TrainingPhase::EpisodeDone);
        log::debug!("Episode {} finished after {} steps: {:?}", episode, steps, outcome);
        Ok(EpisodeSummary {
            episode,
            start_state,
            steps,
            outcome,
        })
    }

    /// One learning step from `state`. Returns the new state and the reward
    /// observed after acting.
    pub fn step(
        &mut self,
        table: &mut QTable,
        state: StateIndex,
        evaluator: &RewardEvaluator,
        params: &Hyperparameters,
    ) -> Result<(StateIndex, RewardSignal)> {
        let applicable = checked_applicable_actions(self.env, state)?;
        let action = self
            .selector
            .select_action(table, state, &applicable, params.epsilon)?;

        self.env.perform_action(action)?;
        self.settle();

        let next_state = checked_current_state(self.env)?;
        let next_applicable = checked_applicable_actions(self.env, next_state)?;
        let max_next = table.bootstrap_value(next_state, &next_applicable)?;
        let signal = evaluator.evaluate(self.env.observed_zone_levels()?);

        let updated = table.update(state, action, signal.value, max_next, params.alpha, params.gamma)?;
        log::trace!(
            "Q({}, {}) <- {:.4} (reward {}, next state {})",
            state,
            action,
            updated,
            signal.value,
            next_state
        );
        Ok((next_state, signal))
    }
}
