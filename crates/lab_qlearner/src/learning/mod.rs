//! Training for the lab Q-learner.
//!
//! A [`TrainRequest`] names a goal and its [`Hyperparameters`]. The
//! [`TrainingEngine`] runs the requested number of episodes against a
//! [`LabEnvironment`](crate::environment::LabEnvironment), updating one
//! [`QTable`](crate::qtable::QTable) in place.
//!
//! ## Example
//!
//! ```rust
//! use lab_qlearner::learning::{Hyperparameters, TrainingEngine};
//! use lab_qlearner::sim::SimulatedLab;
//! use lab_qlearner::{ActionSelector, GoalDescription, LabEnvironment, LearnerConfig, QTable};
//!
//! let mut lab = SimulatedLab::seeded(7);
//! let mut selector = ActionSelector::seeded(7);
//! let config = LearnerConfig::simulation().with_step_budget(200);
//!
//! let goal = GoalDescription::new(2, 2).unwrap();
//! let params = Hyperparameters::new(3, 0.5, 0.9, 0.2, 10.0).unwrap();
//! let mut table = QTable::zeros(lab.state_count(), lab.action_count());
//!
//! let mut engine = TrainingEngine::new(&mut lab, &mut selector, &config);
//! let summary = engine.run(&mut table, &goal, &params).unwrap();
//! assert_eq!(summary.episodes.len(), 3);
//! ```

pub mod engine;
pub mod hyperparams;

pub use engine::{
    CancelToken, EpisodeOutcome, EpisodeSummary, TrainingEngine, TrainingPhase, TrainingSummary,
};
pub use hyperparams::{Hyperparameters, TrainRequest};
