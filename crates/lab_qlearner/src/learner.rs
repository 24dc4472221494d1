//! The learner facade: goal-conditioned training and inference over one
//! environment.
//!
//! ## Example
//!
//! ```rust
//! use lab_qlearner::learning::{Hyperparameters, TrainRequest};
//! use lab_qlearner::sim::SimulatedLab;
//! use lab_qlearner::{GoalDescription, LabActionResolver, LearnerConfig, MemoryStorage, QLearner};
//!
//! let config = LearnerConfig::simulation().with_step_budget(300);
//! let mut learner = QLearner::new(
//!     SimulatedLab::seeded(1),
//!     MemoryStorage::new(),
//!     LabActionResolver,
//!     config,
//! )
//! .unwrap();
//!
//! let goal = GoalDescription::new(2, 2).unwrap();
//! let request = TrainRequest::new(goal, Hyperparameters::new(2, 0.5, 0.9, 0.3, 10.0).unwrap()).unwrap();
//! let report = learner.train(&request).unwrap();
//! assert!(report.created);
//!
//! let action = learner.next_action(&goal, 0.0).unwrap();
//! assert!(action.tag.starts_with("http://example.org/was#"));
//! ```

use crate::action::{ActionDescriptor, ActionResolver, LabActionResolver};
use crate::config::LearnerConfig;
use crate::environment::{
    checked_applicable_actions, checked_current_state, LabEnvironment, LabSnapshot,
};
use crate::error::{Error, Result};
use crate::goal::{GoalDescription, GoalKey};
use crate::learning::{CancelToken, TrainRequest, TrainingEngine, TrainingSummary};
use crate::policy::ActionSelector;
use crate::qtable::QTable;
use crate::store::{load_or_empty, JsonFileStorage, PersistenceOptions, QTableStore, TableStorage};
use crate::types::{Timestamp, ZoneLevels};
use serde::{Deserialize, Serialize};

/// Result of one [`QLearner::train`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    /// Store key of the trained goal.
    pub goal_key: GoalKey,
    /// `false` when a table already existed and training was skipped.
    pub created: bool,
    /// Training details, present when training ran.
    pub summary: Option<TrainingSummary>,
    /// When the request was accepted.
    pub started_at: Timestamp,
    /// When the request finished, after persisting.
    pub finished_at: Timestamp,
}

impl TrainReport {
    /// Wall-clock duration of the request in microseconds.
    pub fn duration_micros(&self) -> u64 {
        self.finished_at.micros_since(self.started_at)
    }
}

/// Goal-conditioned Q-learner driving one environment.
///
/// Holds one Q-table per goal. Training and inference take `&mut self`; a
/// learner shared between threads must be wrapped in a lock.
pub struct QLearner<E, S, A = LabActionResolver> {
    env: E,
    storage: S,
    resolver: A,
    config: LearnerConfig,
    selector: ActionSelector,
    store: QTableStore,
    state_count: usize,
    action_count: usize,
    cancel: Option<CancelToken>,
}

impl<E: LabEnvironment> QLearner<E, JsonFileStorage, LabActionResolver> {
    /// A lab learner persisting to `config.store_path`.
    pub fn open(env: E, config: LearnerConfig) -> Result<Self> {
        let options = if config.pretty_store {
            PersistenceOptions::readable()
        } else {
            PersistenceOptions::compact()
        };
        let storage = JsonFileStorage::new(config.store_path.clone()).with_options(options);
        Self::new(env, storage, LabActionResolver, config)
    }
}

impl<E, S, A> QLearner<E, S, A>
where
    E: LabEnvironment,
    S: TableStorage,
    A: ActionResolver,
{
    /// Creates a learner with an OS-seeded selector.
    ///
    /// Loads the persisted store, then performs `config.init_warmup_steps`
    /// random actions on the environment.
    pub fn new(env: E, storage: S, resolver: A, config: LearnerConfig) -> Result<Self> {
        Self::with_selector(env, storage, resolver, config, ActionSelector::new())
    }

    /// Creates a learner drawing all randomness from `selector`.
    pub fn with_selector(
        mut env: E,
        storage: S,
        resolver: A,
        config: LearnerConfig,
        selector: ActionSelector,
    ) -> Result<Self> {
        config.validate()?;

        let state_count = env.state_count();
        let action_count = env.action_count();
        if state_count == 0 || action_count == 0 {
            return Err(Error::Config(format!(
                "environment must have states and actions, got {}x{}",
                state_count, action_count
            )));
        }
        if resolver.action_count() != action_count {
            return Err(Error::Config(format!(
                "action resolver knows {} actions, environment has {}",
                resolver.action_count(),
                action_count
            )));
        }

        // Fail early on an environment that cannot report its state
        checked_current_state(&mut env)?;

        let store = load_or_empty(&storage);
        log::info!(
            "Q-learner ready: {} states, {} actions, {} stored goals",
            state_count,
            action_count,
            store.len()
        );

        let mut learner = Self {
            env,
            storage,
            resolver,
            config,
            selector,
            store,
            state_count,
            action_count,
            cancel: None,
        };

        if learner.config.init_warmup_steps > 0 {
            let mut engine =
                TrainingEngine::new(&mut learner.env, &mut learner.selector, &learner.config);
            engine.warm_up(learner.config.init_warmup_steps)?;
            log::debug!(
                "Initial warm-up performed {} actions",
                learner.config.init_warmup_steps
            );
        }

        Ok(learner)
    }

    /// Attaches a token that cancels training at the next episode boundary.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Trains the Q-table for the requested goal, unless one already exists.
    ///
    /// The store is reloaded first. A new table is trained and the whole store
    /// persisted; if training or persisting fails the error is returned and
    /// the new table is discarded, so a retry starts from scratch.
    pub fn train(&mut self, request: &TrainRequest) -> Result<TrainReport> {
        request.params.validate()?;

        let started_at = Timestamp::now();
        let goal = request.goal;
        let key = goal.key();

        self.store = load_or_empty(&self.storage);
        if self.store.contains(&key) {
            log::info!("Goal {} already trained, nothing to do", goal);
            return Ok(TrainReport {
                goal_key: key,
                created: false,
                summary: None,
                started_at,
                finished_at: Timestamp::now(),
            });
        }

        log::info!(
            "Training goal {} ({} episodes, alpha {}, gamma {}, epsilon {}, reward {})",
            goal,
            request.params.episodes,
            request.params.alpha,
            request.params.gamma,
            request.params.epsilon,
            request.params.reward
        );

        let (table, _) = self
            .store
            .get_or_create(key.clone(), self.state_count, self.action_count);
        let mut engine = TrainingEngine::new(&mut self.env, &mut self.selector, &self.config);
        if let Some(token) = &self.cancel {
            engine = engine.with_cancel_token(token.clone());
        }

        let summary = match engine.run(table, &goal, &request.params) {
            Ok(summary) => summary,
            Err(e) => {
                self.store.remove(&key);
                log::warn!("Training goal {} failed: {}", goal, e);
                return Err(e);
            }
        };

        if let Err(e) = self.storage.save(&self.store) {
            self.store.remove(&key);
            log::warn!("Could not persist Q-table for goal {}: {}", goal, e);
            return Err(e.into());
        }

        log::info!(
            "Goal {} trained: {} episodes, {} steps, {} unconverged",
            goal,
            summary.episodes.len(),
            summary.total_steps,
            summary.unconverged_episodes()
        );

        Ok(TrainReport {
            goal_key: key,
            created: true,
            summary: Some(summary),
            started_at,
            finished_at: Timestamp::now(),
        })
    }

    /// Chooses an action for the current state under the trained policy for
    /// `goal` and resolves it to its descriptor. The environment is not
    /// acted upon.
    pub fn next_action(&mut self, goal: &GoalDescription, epsilon: f64) -> Result<ActionDescriptor> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(Error::Config(format!(
                "epsilon must be in [0, 1], got {}",
                epsilon
            )));
        }

        let key = goal.key();
        let table = self
            .store
            .get(&key)
            .ok_or_else(|| Error::UnknownGoal(goal.to_string()))?;
        table.ensure_shape(&key, self.state_count, self.action_count)?;

        let state = checked_current_state(&mut self.env)?;
        let applicable = checked_applicable_actions(&mut self.env, state)?;
        let action = self
            .selector
            .select_action(table, state, &applicable, epsilon)?;
        log::debug!("Goal {}: state {} -> action {}", goal, state, action);

        self.resolver.resolve(action)
    }

    /// [`next_action`](Self::next_action) with the configured inference
    /// epsilon.
    pub fn suggest_action(&mut self, goal: &GoalDescription) -> Result<ActionDescriptor> {
        let epsilon = self.config.inference_epsilon;
        self.next_action(goal, epsilon)
    }

    /// The observed zone levels.
    pub fn current_zone_levels(&mut self) -> Result<ZoneLevels> {
        self.env.observed_zone_levels()
    }

    /// The decoded full lab state.
    pub fn current_full_state(&mut self) -> Result<LabSnapshot> {
        LabSnapshot::from_raw(&self.env.full_state()?)
    }

    /// Re-reads the persisted store, replacing the in-memory tables.
    pub fn reload(&mut self) -> usize {
        self.store = load_or_empty(&self.storage);
        self.store.len()
    }

    /// The table trained for `goal`, if any.
    pub fn table(&self, goal: &GoalDescription) -> Option<&QTable> {
        self.store.get(&goal.key())
    }

    /// Goals with a trained table, in key order.
    pub fn trained_goals(&self) -> Vec<GoalDescription> {
        self.store.keys().filter_map(GoalKey::parse_goal).collect()
    }

    /// The in-memory store.
    pub fn store(&self) -> &QTableStore {
        &self.store
    }

    /// The learner's configuration.
    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// The driven environment.
    pub fn environment(&self) -> &E {
        &self.env
    }

    /// Mutable access to the driven environment.
    pub fn environment_mut(&mut self) -> &mut E {
        &mut self.env
    }

    /// The storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::Hyperparameters;
    use crate::sim::SimulatedLab;
    use crate::store::MemoryStorage;

    fn goal(z1: u8, z2: u8) -> GoalDescription {
        GoalDescription::new(z1, z2).unwrap()
    }

    fn learner(config: LearnerConfig) -> QLearner<SimulatedLab, MemoryStorage> {
        QLearner::with_selector(
            SimulatedLab::seeded(3),
            MemoryStorage::new(),
            LabActionResolver,
            config,
            ActionSelector::seeded(3),
        )
        .unwrap()
    }

    #[test]
    fn test_init_warmup_acts_on_environment() {
        let learner = learner(LearnerConfig::simulation().with_init_warmup_steps(12));
        assert_eq!(learner.environment().actions_performed(), 12);
    }

    #[test]
    fn test_unknown_goal() {
        let mut learner = learner(LearnerConfig::simulation());
        assert!(matches!(
            learner.next_action(&goal(1, 1), 0.0),
            Err(Error::UnknownGoal(_))
        ));
    }

    #[test]
    fn test_rejects_bad_inference_epsilon() {
        let mut learner = learner(LearnerConfig::simulation());
        assert!(matches!(
            learner.next_action(&goal(1, 1), 1.2),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_train_then_suggest() {
        let mut learner = learner(LearnerConfig::simulation().with_step_budget(400));
        let request = TrainRequest::new(
            goal(2, 2),
            Hyperparameters::new(3, 0.5, 0.9, 0.3, 10.0).unwrap(),
        )
        .unwrap();

        let report = learner.train(&request).unwrap();
        assert!(report.created);
        assert_eq!(report.goal_key.as_str(), "22");
        assert_eq!(learner.trained_goals(), vec![goal(2, 2)]);
        assert!(learner.storage().snapshot().is_some());

        let descriptor = learner.suggest_action(&goal(2, 2)).unwrap();
        assert_eq!(descriptor.payload_tags.len(), 1);
    }

    #[test]
    fn test_current_full_state_matches_zone_levels() {
        let mut learner = learner(LearnerConfig::simulation());
        let snapshot = learner.current_full_state().unwrap();
        assert_eq!(snapshot.zone_levels(), learner.current_zone_levels().unwrap());
    }
}
