//! The environment contract consumed by the learner.
//!
//! An environment exposes a finite state space and a finite action space as
//! small non-negative integers. The learner never models dynamics: every
//! transition is obtained by performing an action and reading the state back.

use crate::error::{Error, Result};
use crate::types::{ActionIndex, StateIndex, Value, ZoneLevels};
use serde::{Deserialize, Serialize};

/// A discretized environment the learner can drive.
///
/// Implementations talk to real hardware or a simulation; all calls are
/// blocking. Errors should be reported as [`Error::Environment`].
pub trait LabEnvironment {
    /// Number of states. Queried once when a learner is created.
    fn state_count(&self) -> usize;

    /// Number of actions. Queried once when a learner is created.
    fn action_count(&self) -> usize;

    /// The current flattened state index.
    fn read_current_state(&mut self) -> Result<StateIndex>;

    /// The actions applicable in `state`. Must be non-empty and within
    /// `[0, action_count)`.
    fn applicable_actions(&mut self, state: StateIndex) -> Result<Vec<ActionIndex>>;

    /// Performs `action`, implicitly changing the environment's state.
    fn perform_action(&mut self, action: ActionIndex) -> Result<()>;

    /// The current goal-relevant measurements.
    fn observed_zone_levels(&mut self) -> Result<ZoneLevels>;

    /// The full, unflattened state, for reporting only.
    fn full_state(&mut self) -> Result<Vec<i64>>;
}

impl<E: LabEnvironment + ?Sized> LabEnvironment for &mut E {
    fn state_count(&self) -> usize {
        (**self).state_count()
    }

    fn action_count(&self) -> usize {
        (**self).action_count()
    }

    fn read_current_state(&mut self) -> Result<StateIndex> {
        (**self).read_current_state()
    }

    fn applicable_actions(&mut self, state: StateIndex) -> Result<Vec<ActionIndex>> {
        (**self).applicable_actions(state)
    }

    fn perform_action(&mut self, action: ActionIndex) -> Result<()> {
        (**self).perform_action(action)
    }

    fn observed_zone_levels(&mut self) -> Result<ZoneLevels> {
        (**self).observed_zone_levels()
    }

    fn full_state(&mut self) -> Result<Vec<i64>> {
        (**self).full_state()
    }
}

/// Reads the current state and checks it against the declared state space.
pub fn checked_current_state<E: LabEnvironment + ?Sized>(env: &mut E) -> Result<StateIndex> {
    let state = env.read_current_state()?;
    let state_count = env.state_count();
    if state >= state_count {
        return Err(Error::StateOutOfRange { state, state_count });
    }
    Ok(state)
}

/// Queries the applicable actions of `state`, failing on an empty set or an
/// out-of-range index.
pub fn checked_applicable_actions<E: LabEnvironment + ?Sized>(
    env: &mut E,
    state: StateIndex,
) -> Result<Vec<ActionIndex>> {
    let actions = env.applicable_actions(state)?;
    if actions.is_empty() {
        return Err(Error::NoApplicableActions { state });
    }
    let action_count = env.action_count();
    if let Some(&action) = actions.iter().find(|&&a| a >= action_count) {
        return Err(Error::ActionOutOfRange {
            action,
            action_count,
        });
    }
    Ok(actions)
}

/// A decoded full-state report of the lab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabSnapshot {
    /// Light level in zone 1.
    pub z1_level: i64,
    /// Light level in zone 2.
    pub z2_level: i64,
    /// Whether the zone 1 light is on.
    pub z1_light: bool,
    /// Whether the zone 2 light is on.
    pub z2_light: bool,
    /// Whether the zone 1 blinds are open.
    pub z1_blinds: bool,
    /// Whether the zone 2 blinds are open.
    pub z2_blinds: bool,
    /// Outdoor sunshine level.
    pub sunshine: i64,
}

impl LabSnapshot {
    /// Number of raw fields in a lab full-state report.
    pub const FIELDS: usize = 7;

    /// Decodes the raw report `[z1, z2, z1Light, z2Light, z1Blinds, z2Blinds,
    /// sunshine]`. Flags are on when the raw value is `1`.
    pub fn from_raw(raw: &[i64]) -> Result<Self> {
        if raw.len() < Self::FIELDS {
            return Err(Error::Environment(format!(
                "full state has {} fields, expected {}",
                raw.len(),
                Self::FIELDS
            )));
        }
        Ok(Self {
            z1_level: raw[0],
            z2_level: raw[1],
            z1_light: raw[2] == 1,
            z2_light: raw[3] == 1,
            z1_blinds: raw[4] == 1,
            z2_blinds: raw[5] == 1,
            sunshine: raw[6],
        })
    }

    /// The goal-relevant part of the snapshot.
    pub fn zone_levels(&self) -> ZoneLevels {
        ZoneLevels::new(self.z1_level, self.z2_level)
    }

    /// The snapshot as a flat value list, flags as booleans, e.g.
    /// `[2, 2, true, false, true, true, 2]`.
    pub fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Int(self.z1_level),
            Value::Int(self.z2_level),
            Value::Bool(self.z1_light),
            Value::Bool(self.z2_light),
            Value::Bool(self.z1_blinds),
            Value::Bool(self.z2_blinds),
            Value::Int(self.sunshine),
        ]
    }
}
