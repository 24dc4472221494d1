#![doc = include_str!("../README.md")]
//! # Lab Q-Learner
//!
//! Goal-conditioned tabular Q-learning for discretized lab environments.
//!
//! ## Overview
//!
//! A learner drives a [`LabEnvironment`] whose states and actions are small
//! integer indices, and keeps one Q-table per goal. A goal is a target pair
//! of zone light levels. Training for a goal runs episodes of epsilon-greedy
//! exploration until the goal is observed, updating the goal's table after
//! every step; inference picks the best applicable action for the current
//! state and resolves it to an externally dispatchable [`ActionDescriptor`].
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          QLearner                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌──────────────┐   ┌────────────────┐   ┌───────────────┐   │
//! │  │ TrainRequest │──►│ TrainingEngine │──►│ LabEnvironment│   │
//! │  │              │   │                │◄──│               │   │
//! │  │ • goal       │   │ • warm-up      │   │ • state       │   │
//! │  │ • alpha      │   │ • episodes     │   │ • actions     │   │
//! │  │ • gamma      │   │ • TD update    │   │ • zone levels │   │
//! │  └──────────────┘   └───────┬────────┘   └───────────────┘   │
//! │                             │                                │
//! │       ┌──────────────┐ ┌────▼────────┐  ┌────────────────┐   │
//! │       │ActionSelector│ │ QTableStore │─►│  TableStorage  │   │
//! │       │ ε-greedy     │ │ goal → Q    │  │  (JSON file)   │   │
//! │       └──────────────┘ └─────────────┘  └────────────────┘   │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use lab_qlearner::learning::{Hyperparameters, TrainRequest};
//! use lab_qlearner::{simulated_learner, GoalDescription};
//!
//! let mut learner = simulated_learner(42).unwrap();
//!
//! let goal = GoalDescription::new(2, 0).unwrap();
//! let params = Hyperparameters::new(5, 0.5, 0.9, 0.2, 10.0).unwrap();
//! learner.train(&TrainRequest::new(goal, params).unwrap()).unwrap();
//!
//! let descriptor = learner.next_action(&goal, 0.0).unwrap();
//! println!("{} {:?}", descriptor.tag, descriptor.payload);
//! ```
//!
//! ## Persistence
//!
//! Tables are persisted through a [`TableStorage`] backend after each
//! successful training request. [`JsonFileStorage`] writes a single JSON
//! object mapping goal keys to matrices; [`MemoryStorage`] keeps the same
//! bytes in memory.

pub mod action;
pub mod config;
pub mod environment;
pub mod error;
pub mod goal;
pub mod learner;
pub mod learning;
pub mod policy;
pub mod qtable;
pub mod reward;
pub mod sim;
pub mod store;
pub mod types;

pub use action::{ActionDescriptor, ActionResolver, ActionTable, LabAction, LabActionResolver};
pub use config::LearnerConfig;
pub use environment::{LabEnvironment, LabSnapshot};
pub use error::{Error, Result};
pub use goal::{GoalDescription, GoalKey};
pub use learner::{QLearner, TrainReport};
pub use learning::{
    CancelToken, EpisodeOutcome, EpisodeSummary, Hyperparameters, TrainRequest, TrainingEngine,
    TrainingPhase, TrainingSummary,
};
pub use policy::{greedy_action, ActionSelector};
pub use qtable::QTable;
pub use reward::{RewardEvaluator, RewardSignal};
pub use sim::SimulatedLab;
pub use store::{
    JsonFileStorage, MemoryStorage, PersistenceError, PersistenceOptions, QTableStore,
    TableStorage,
};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Creates a learner over a [`SimulatedLab`] with in-memory storage and the
/// [`simulation`](LearnerConfig::simulation) settings.
///
/// Both the lab's weather and the learner's exploration are seeded from
/// `seed`, so runs are reproducible. Episodes are capped at 1000 steps.
///
/// # Examples
///
/// ```
/// use lab_qlearner::simulated_learner;
///
/// let learner = simulated_learner(7).unwrap();
/// assert!(learner.trained_goals().is_empty());
/// ```
pub fn simulated_learner(seed: u64) -> Result<QLearner<SimulatedLab, MemoryStorage>> {
    QLearner::with_selector(
        SimulatedLab::seeded(seed).with_weather_drift(0.05),
        MemoryStorage::new(),
        LabActionResolver,
        LearnerConfig::simulation().with_step_budget(1_000),
        ActionSelector::seeded(seed),
    )
}
