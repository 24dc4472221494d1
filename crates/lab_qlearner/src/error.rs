//! Error types for the lab Q-learner.

use crate::store::PersistenceError;
use crate::types::{ActionIndex, StateIndex};
use thiserror::Error;

/// A specialized `Result` type for learner operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary error enum for all operations within the `lab_qlearner` crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid hyperparameters, goal descriptions or learner settings.
    /// Always raised before the environment is touched.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The environment driver failed to answer a query or perform an action.
    #[error("Environment error: {0}")]
    Environment(String),

    /// The environment reported an empty applicable-action set.
    #[error("Environment reported no applicable actions in state {state}")]
    NoApplicableActions {
        /// The state that was queried.
        state: StateIndex,
    },

    /// The environment reported a state outside the declared state space.
    #[error("State {state} outside state space of size {state_count}")]
    StateOutOfRange {
        /// The offending state index.
        state: StateIndex,
        /// The declared number of states.
        state_count: usize,
    },

    /// An action index fell outside the declared action space.
    #[error("Action {action} outside action space of size {action_count}")]
    ActionOutOfRange {
        /// The offending action index.
        action: ActionIndex,
        /// The declared number of actions.
        action_count: usize,
    },

    /// The action resolver has no descriptor for this index.
    #[error("Unknown action index {0}")]
    UnknownAction(ActionIndex),

    /// No Q-table has been trained for the requested goal.
    #[error("No Q-table for goal description {0}")]
    UnknownGoal(String),

    /// A stored Q-table does not match the current environment's dimensions.
    #[error(
        "Q-table for goal {goal} is {rows}x{columns}, environment is {state_count}x{action_count}"
    )]
    ShapeMismatch {
        /// The goal key of the mismatched table.
        goal: String,
        /// Rows (states) in the stored table.
        rows: usize,
        /// Columns (actions) in the stored table.
        columns: usize,
        /// States in the current environment.
        state_count: usize,
        /// Actions in the current environment.
        action_count: usize,
    },

    /// Training was cancelled at an episode boundary.
    #[error("Training cancelled after {completed_episodes} episodes")]
    Cancelled {
        /// Episodes fully completed before cancellation.
        completed_episodes: usize,
    },

    /// Reading or writing the Q-table store failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
