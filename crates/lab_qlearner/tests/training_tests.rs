//! Integration tests for goal-conditioned training
//!
//! Drives the learner through small deterministic environments and the
//! simulated lab, covering the training lifecycle, failure handling and
//! cancellation.

use lab_qlearner::learning::{Hyperparameters, TrainRequest};
use lab_qlearner::{
    simulated_learner, ActionDescriptor, ActionIndex, ActionSelector, ActionTable, CancelToken,
    EpisodeOutcome, Error, GoalDescription, LabActionResolver, LabEnvironment, LearnerConfig,
    MemoryStorage, PersistenceError, QLearner, QTableStore, Result, StateIndex, TableStorage,
    TrainingEngine, ZoneLevels,
};
use lab_qlearner::{QTable, RewardEvaluator};

/// Four states in a ring. Action 0 advances to the next state, action 1
/// stays put. Zone levels read `(0, 0)` only in state 3.
struct Ring {
    state: StateIndex,
    performed: usize,
    fail_after: Option<usize>,
    cancel_after: Option<(usize, CancelToken)>,
}

impl Ring {
    fn new() -> Self {
        Self {
            state: 0,
            performed: 0,
            fail_after: None,
            cancel_after: None,
        }
    }
}

impl LabEnvironment for Ring {
    fn state_count(&self) -> usize {
        4
    }

    fn action_count(&self) -> usize {
        2
    }

    fn read_current_state(&mut self) -> Result<StateIndex> {
        Ok(self.state)
    }

    fn applicable_actions(&mut self, _state: StateIndex) -> Result<Vec<ActionIndex>> {
        Ok(vec![0, 1])
    }

    fn perform_action(&mut self, action: ActionIndex) -> Result<()> {
        if self.fail_after == Some(self.performed) {
            return Err(Error::Environment("actuator offline".to_string()));
        }
        self.performed += 1;
        if action == 0 {
            self.state = (self.state + 1) % 4;
        }
        if let Some((after, token)) = &self.cancel_after {
            if self.performed >= *after {
                token.cancel();
            }
        }
        Ok(())
    }

    fn observed_zone_levels(&mut self) -> Result<ZoneLevels> {
        Ok(if self.state == 3 {
            ZoneLevels::new(0, 0)
        } else {
            ZoneLevels::new(9, 9)
        })
    }

    fn full_state(&mut self) -> Result<Vec<i64>> {
        Ok(vec![self.state as i64])
    }
}

/// Storage whose saves always fail.
struct ReadOnlyStorage;

impl TableStorage for ReadOnlyStorage {
    fn load(&self) -> std::result::Result<QTableStore, PersistenceError> {
        Ok(QTableStore::new())
    }

    fn save(&self, _store: &QTableStore) -> std::result::Result<(), PersistenceError> {
        Err(std::io::Error::other("read-only file system").into())
    }
}

fn ring_actions() -> ActionTable {
    ActionTable::new(vec![
        ActionDescriptor::single("ring#Advance", "Step", true),
        ActionDescriptor::single("ring#Stay", "Step", false),
    ])
}

fn ring_learner<S: TableStorage>(env: Ring, storage: S) -> QLearner<Ring, S, ActionTable> {
    QLearner::with_selector(
        env,
        storage,
        ring_actions(),
        LearnerConfig::simulation().with_warmup_steps(0),
        ActionSelector::seeded(17),
    )
    .unwrap()
}

fn ring_goal() -> GoalDescription {
    GoalDescription::new(0, 0).unwrap()
}

fn ring_request(episodes: usize) -> TrainRequest {
    TrainRequest::new(
        ring_goal(),
        Hyperparameters::new(episodes, 0.5, 0.9, 0.1, 10.0).unwrap(),
    )
    .unwrap()
}

// ============================================================================
// End-to-End Training Tests
// ============================================================================

#[test]
fn test_ring_learns_the_final_transition() {
    let mut learner = ring_learner(Ring::new(), MemoryStorage::new());
    let report = learner.train(&ring_request(5)).unwrap();

    assert!(report.created);
    assert_eq!(report.goal_key.as_str(), "00");
    let summary = report.summary.unwrap();
    assert_eq!(summary.episodes.len(), 5);
    assert_eq!(summary.converged_episodes(), 5);
    assert!(report.finished_at >= report.started_at);

    let table = learner.table(&ring_goal()).unwrap();
    assert!(table.get(2, 0).unwrap() > 0.0);
}

#[test]
fn test_trained_ring_policy_advances() {
    let mut learner = ring_learner(Ring::new(), MemoryStorage::new());
    learner.train(&ring_request(20)).unwrap();

    // Walk the ring back to state 2, where advancing is the learned move
    while learner.environment().state != 2 {
        learner.environment_mut().perform_action(0).unwrap();
    }
    let descriptor = learner.next_action(&ring_goal(), 0.0).unwrap();
    assert_eq!(descriptor.tag, "ring#Advance");
}

#[test]
fn test_td_update_is_exact() {
    let mut ring = Ring::new();
    ring.state = 2;
    let mut selector = ActionSelector::seeded(0);
    let config = LearnerConfig::simulation();
    let mut engine = TrainingEngine::new(&mut ring, &mut selector, &config);

    let mut table = QTable::zeros(4, 2);
    table.set(2, 0, 2.0).unwrap();
    table.set(2, 1, -1.0).unwrap();
    table.set(3, 0, -4.0).unwrap();
    table.set(3, 1, 3.0).unwrap();

    let params = Hyperparameters::new(1, 0.25, 0.5, 0.0, 10.0).unwrap();
    let evaluator = RewardEvaluator::new(ring_goal(), params.reward);
    let (next, signal) = engine.step(&mut table, 2, &evaluator, &params).unwrap();

    assert_eq!(next, 3);
    assert_eq!(signal.value, 10.0);
    // 2.0 + 0.25 * ((10.0 + 0.5 * 3.0) - 2.0) = 4.375
    assert_eq!(table.get(2, 0).unwrap(), 4.375);
    assert_eq!(table.get(2, 1).unwrap(), -1.0);
}

#[test]
fn test_simulated_lab_training() {
    let mut learner = simulated_learner(11).unwrap();
    let goal = GoalDescription::new(2, 2).unwrap();
    let request =
        TrainRequest::new(goal, Hyperparameters::new(10, 0.5, 0.9, 0.3, 10.0).unwrap()).unwrap();

    let report = learner.train(&request).unwrap();
    let summary = report.summary.unwrap();
    assert_eq!(summary.episodes.len(), 10);
    assert!(summary.converged_episodes() >= 1);
    assert!(learner.table(&goal).unwrap().nonzero_count() > 0);
    assert!(learner.environment().actions_performed() >= summary.total_steps);
}

// ============================================================================
// Training Lifecycle Tests
// ============================================================================

#[test]
fn test_second_train_is_a_no_op() {
    let mut learner = ring_learner(Ring::new(), MemoryStorage::new());
    learner.train(&ring_request(3)).unwrap();

    let performed = learner.environment().performed;
    let table = learner.table(&ring_goal()).unwrap().clone();

    let report = learner.train(&ring_request(50)).unwrap();
    assert!(!report.created);
    assert!(report.summary.is_none());
    assert_eq!(learner.environment().performed, performed);
    assert_eq!(learner.table(&ring_goal()).unwrap(), &table);
}

#[test]
fn test_goals_train_independently() {
    let mut learner = ring_learner(Ring::new(), MemoryStorage::new());
    learner.train(&ring_request(2)).unwrap();

    // Never observed in the ring, so every episode runs out of steps
    let other = GoalDescription::new(1, 2).unwrap();
    let mut learner = QLearner::with_selector(
        Ring::new(),
        MemoryStorage::with_bytes(learner.storage().snapshot().unwrap()),
        ring_actions(),
        LearnerConfig::simulation()
            .with_warmup_steps(0)
            .with_step_budget(10),
        ActionSelector::seeded(4),
    )
    .unwrap();
    let report = learner
        .train(
            &TrainRequest::new(other, Hyperparameters::new(3, 0.5, 0.9, 0.1, 10.0).unwrap())
                .unwrap(),
        )
        .unwrap();

    let summary = report.summary.unwrap();
    assert_eq!(summary.unconverged_episodes(), 3);
    assert_eq!(summary.total_steps, 30);
    assert!(summary
        .episodes
        .iter()
        .all(|e| e.outcome == EpisodeOutcome::StepBudgetExhausted));

    // No reward was ever seen for this goal
    assert_eq!(learner.table(&other).unwrap().nonzero_count(), 0);
    assert_eq!(learner.trained_goals(), vec![ring_goal(), other]);
}

#[test]
fn test_warmup_runs_once_per_request() {
    let mut learner = QLearner::with_selector(
        Ring::new(),
        MemoryStorage::new(),
        ring_actions(),
        LearnerConfig::simulation()
            .with_init_warmup_steps(7)
            .with_warmup_steps(13),
        ActionSelector::seeded(2),
    )
    .unwrap();
    assert_eq!(learner.environment().performed, 7);

    let report = learner.train(&ring_request(1)).unwrap();
    let summary = report.summary.unwrap();
    assert_eq!(summary.warmup_steps, 13);
    assert_eq!(
        learner.environment().performed as u64,
        7 + 13 + summary.total_steps
    );
}

// ============================================================================
// Failure Handling Tests
// ============================================================================

#[test]
fn test_unknown_goal_for_inference() {
    let mut learner = ring_learner(Ring::new(), MemoryStorage::new());
    let result = learner.next_action(&GoalDescription::new(4, 4).unwrap(), 0.0);
    assert!(matches!(result, Err(Error::UnknownGoal(_))));
}

#[test]
fn test_environment_failure_discards_table() {
    let mut ring = Ring::new();
    ring.fail_after = Some(2);
    let mut learner = ring_learner(ring, MemoryStorage::new());

    let result = learner.train(&ring_request(5));
    assert!(matches!(result, Err(Error::Environment(_))));
    assert!(learner.table(&ring_goal()).is_none());
    assert!(learner.storage().snapshot().is_none());

    // A retry trains from scratch
    learner.environment_mut().fail_after = None;
    assert!(learner.train(&ring_request(1)).unwrap().created);
}

#[test]
fn test_failed_save_is_reported() {
    let mut learner = ring_learner(Ring::new(), ReadOnlyStorage);
    let result = learner.train(&ring_request(1));
    assert!(matches!(
        result,
        Err(Error::Persistence(PersistenceError::Io(_)))
    ));
    assert!(learner.table(&ring_goal()).is_none());
}

#[test]
fn test_resolver_must_match_environment() {
    let result = QLearner::new(
        Ring::new(),
        MemoryStorage::new(),
        LabActionResolver,
        LearnerConfig::simulation(),
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_invalid_request_touches_nothing() {
    let mut learner = ring_learner(Ring::new(), MemoryStorage::new());
    let request = TrainRequest {
        goal: ring_goal(),
        params: Hyperparameters {
            episodes: 3,
            alpha: 2.0,
            gamma: 0.9,
            epsilon: 0.1,
            reward: 10.0,
        },
    };
    assert!(matches!(learner.train(&request), Err(Error::Config(_))));
    assert_eq!(learner.environment().performed, 0);
    assert!(learner.trained_goals().is_empty());
}

#[test]
fn test_stored_table_with_wrong_shape() {
    let mut store = QTableStore::new();
    store.get_or_create(ring_goal().key(), 2, 2);
    let storage = MemoryStorage::with_bytes(serde_json::to_vec(&store).unwrap());

    let mut learner = ring_learner(Ring::new(), storage);
    assert!(matches!(
        learner.next_action(&ring_goal(), 0.0),
        Err(Error::ShapeMismatch { rows: 2, .. })
    ));
}

// ============================================================================
// Cancellation Tests
// ============================================================================

#[test]
fn test_cancel_before_training() {
    let token = CancelToken::new();
    token.cancel();
    let mut learner = ring_learner(Ring::new(), MemoryStorage::new()).with_cancel_token(token);

    assert!(matches!(
        learner.train(&ring_request(3)),
        Err(Error::Cancelled {
            completed_episodes: 0
        })
    ));
    assert!(learner.storage().snapshot().is_none());
    assert!(learner.table(&ring_goal()).is_none());
}

#[test]
fn test_cancel_between_episodes() {
    let token = CancelToken::new();
    let mut ring = Ring::new();
    ring.cancel_after = Some((1, token.clone()));
    let mut learner = ring_learner(ring, MemoryStorage::new()).with_cancel_token(token);

    // The first episode finishes, the second never starts
    assert!(matches!(
        learner.train(&ring_request(4)),
        Err(Error::Cancelled {
            completed_episodes: 1
        })
    ));
    assert!(learner.storage().snapshot().is_none());
}
