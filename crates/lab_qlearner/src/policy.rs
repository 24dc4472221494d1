//! Epsilon-greedy action selection over a Q-table.
//!
//! Selection is always restricted to the actions the environment reports as
//! applicable. The greedy branch scans the applicable list left to right and
//! keeps the first action reaching the maximum, so ties resolve the same way
//! for a fixed applicable ordering. Whatever branch is taken, the returned
//! value is an action index taken from the applicable list, never a position
//! within it.

use crate::error::{Error, Result};
use crate::qtable::QTable;
use crate::types::{ActionIndex, StateIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The applicable action with the largest value in `state`; the first one
/// wins on ties.
pub fn greedy_action(table: &QTable, state: StateIndex, applicable: &[ActionIndex]) -> Result<ActionIndex> {
    let (&first, rest) = applicable
        .split_first()
        .ok_or(Error::NoApplicableActions { state })?;

    let mut best = first;
    let mut best_value = table.get(state, first)?;
    for &action in rest {
        let value = table.get(state, action)?;
        if value > best_value {
            best = action;
            best_value = value;
        }
    }
    Ok(best)
}

/// Epsilon-greedy selector owning its random source.
#[derive(Debug, Clone)]
pub struct ActionSelector<R = StdRng> {
    rng: R,
}

impl ActionSelector<StdRng> {
    /// A selector seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// A reproducible selector.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for ActionSelector<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> ActionSelector<R> {
    /// A selector drawing from `rng`.
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// With probability `epsilon` picks uniformly among `applicable`,
    /// otherwise the greedy action. Fails on an empty applicable set or on
    /// an action outside the table.
    pub fn select_action(
        &mut self,
        table: &QTable,
        state: StateIndex,
        applicable: &[ActionIndex],
        epsilon: f64,
    ) -> Result<ActionIndex> {
        if self.rng.random::<f64>() < epsilon {
            let action = self.random_action(state, applicable)?;
            // Exploration must stay inside the table just like exploitation
            table.get(state, action)?;
            log::trace!("state {}: explore -> action {}", state, action);
            Ok(action)
        } else {
            let action = greedy_action(table, state, applicable)?;
            log::trace!("state {}: exploit -> action {}", state, action);
            Ok(action)
        }
    }

    /// A uniformly random member of `applicable`.
    pub fn random_action(&mut self, state: StateIndex, applicable: &[ActionIndex]) -> Result<ActionIndex> {
        if applicable.is_empty() {
            return Err(Error::NoApplicableActions { state });
        }
        Ok(applicable[self.rng.random_range(0..applicable.len())])
    }
}
