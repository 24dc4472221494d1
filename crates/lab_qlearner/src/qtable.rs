//! Dense tabular action-value function for one goal.

use crate::error::{Error, Result};
use crate::goal::GoalKey;
use crate::types::{ActionIndex, StateIndex};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Computes one Q-learning update:
/// `current + alpha * ((reward + gamma * max_next) - current)`.
pub fn temporal_difference(current: f64, reward: f64, max_next: f64, alpha: f64, gamma: f64) -> f64 {
    let td_target = reward + gamma * max_next;
    current + alpha * (td_target - current)
}

/// A `state_count x action_count` table of action values.
///
/// Serialized as a plain 2D JSON array; deserialization rejects ragged rows.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>")]
pub struct QTable {
    rows: Vec<Vec<f64>>,
    action_count: usize,
}

impl QTable {
    /// Allocates a table filled with `0.0`.
    pub fn zeros(state_count: usize, action_count: usize) -> Self {
        Self {
            rows: vec![vec![0.0; action_count]; state_count],
            action_count,
        }
    }

    /// Number of states (rows).
    pub fn state_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of actions (columns).
    pub fn action_count(&self) -> usize {
        self.action_count
    }

    /// `(state_count, action_count)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.state_count(), self.action_count)
    }

    /// Fails with [`Error::ShapeMismatch`] unless the table has exactly the
    /// given dimensions.
    pub fn ensure_shape(&self, goal: &GoalKey, state_count: usize, action_count: usize) -> Result<()> {
        if self.shape() == (state_count, action_count) {
            return Ok(());
        }
        Err(Error::ShapeMismatch {
            goal: goal.to_string(),
            rows: self.state_count(),
            columns: self.action_count,
            state_count,
            action_count,
        })
    }

    /// All action values for one state.
    pub fn row(&self, state: StateIndex) -> Result<&[f64]> {
        self.rows
            .get(state)
            .map(Vec::as_slice)
            .ok_or(Error::StateOutOfRange {
                state,
                state_count: self.rows.len(),
            })
    }

    /// The value of `(state, action)`.
    pub fn get(&self, state: StateIndex, action: ActionIndex) -> Result<f64> {
        self.row(state)?
            .get(action)
            .copied()
            .ok_or(Error::ActionOutOfRange {
                action,
                action_count: self.action_count,
            })
    }

    /// Overwrites the value of `(state, action)`.
    pub fn set(&mut self, state: StateIndex, action: ActionIndex, value: f64) -> Result<()> {
        let state_count = self.rows.len();
        let action_count = self.action_count;
        let cell = self
            .rows
            .get_mut(state)
            .ok_or(Error::StateOutOfRange { state, state_count })?
            .get_mut(action)
            .ok_or(Error::ActionOutOfRange {
                action,
                action_count,
            })?;
        *cell = value;
        Ok(())
    }

    /// The bootstrap value of `state`: the largest value among `applicable`
    /// actions, floored at `0.0`. Negative action values never raise the
    /// target above zero.
    pub fn bootstrap_value(&self, state: StateIndex, applicable: &[ActionIndex]) -> Result<f64> {
        let mut max = 0.0;
        for &action in applicable {
            let value = self.get(state, action)?;
            if value > max {
                max = value;
            }
        }
        Ok(max)
    }

    /// Applies one temporal-difference update to `(state, action)` and
    /// returns the new value.
    pub fn update(
        &mut self,
        state: StateIndex,
        action: ActionIndex,
        reward: f64,
        max_next: f64,
        alpha: f64,
        gamma: f64,
    ) -> Result<f64> {
        let current = self.get(state, action)?;
        let updated = temporal_difference(current, reward, max_next, alpha, gamma);
        self.set(state, action, updated)?;
        Ok(updated)
    }

    /// Number of cells holding a non-zero value.
    pub fn nonzero_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .filter(|v| **v != 0.0)
            .count()
    }
}

impl TryFrom<Vec<Vec<f64>>> for QTable {
    type Error = String;

    fn try_from(rows: Vec<Vec<f64>>) -> std::result::Result<Self, Self::Error> {
        let action_count = rows.first().map_or(0, Vec::len);
        if let Some((state, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != action_count)
        {
            return Err(format!(
                "ragged Q-table: row {} has {} columns, expected {}",
                state,
                row.len(),
                action_count
            ));
        }
        Ok(Self { rows, action_count })
    }
}

impl Serialize for QTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}

impl fmt::Display for QTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Q matrix")?;
        for (state, row) in self.rows.iter().enumerate() {
            write!(f, "From state {}:  ", state)?;
            for value in row {
                write!(f, "{:6.2} ", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_shape() {
        let table = QTable::zeros(4, 2);
        assert_eq!(table.shape(), (4, 2));
        assert_eq!(table.nonzero_count(), 0);
        assert_eq!(table.get(3, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_out_of_range_access_fails() {
        let mut table = QTable::zeros(4, 2);
        assert!(matches!(
            table.get(4, 0),
            Err(Error::StateOutOfRange { state: 4, .. })
        ));
        assert!(matches!(
            table.get(0, 2),
            Err(Error::ActionOutOfRange { action: 2, .. })
        ));
        assert!(table.set(0, 5, 1.0).is_err());
    }

    #[test]
    fn test_temporal_difference_exact() {
        let (old, reward, max_next, alpha, gamma) = (0.4, 10.0, 2.5, 0.5, 0.9);
        let expected = old + alpha * ((reward + gamma * max_next) - old);
        let got = temporal_difference(old, reward, max_next, alpha, gamma);
        assert!((got - expected).abs() < 1e-12);
        assert!((got - 6.325).abs() < 1e-12);
    }

    #[test]
    fn test_update_writes_cell() {
        let mut table = QTable::zeros(3, 2);
        table.set(1, 0, 1.0).unwrap();
        let updated = table.update(1, 0, 0.0, 4.0, 0.25, 0.5).unwrap();
        // 1.0 + 0.25 * ((0 + 0.5 * 4) - 1.0)
        assert!((updated - 1.25).abs() < 1e-12);
        assert_eq!(table.get(1, 0).unwrap(), updated);
    }

    #[test]
    fn test_bootstrap_value_has_zero_floor() {
        let mut table = QTable::zeros(2, 3);
        table.set(0, 0, -5.0).unwrap();
        table.set(0, 1, -1.0).unwrap();
        table.set(0, 2, 7.0).unwrap();
        assert_eq!(table.bootstrap_value(0, &[0, 1]).unwrap(), 0.0);
        assert_eq!(table.bootstrap_value(0, &[0, 2]).unwrap(), 7.0);
        assert_eq!(table.bootstrap_value(1, &[]).unwrap(), 0.0);
    }

    #[test]
    fn test_serializes_as_plain_matrix() {
        let mut table = QTable::zeros(2, 2);
        table.set(1, 1, 0.5).unwrap();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, "[[0.0,0.0],[0.0,0.5]]");
        let back: QTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let result: std::result::Result<QTable, _> = serde_json::from_str("[[0.0,1.0],[2.0]]");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("ragged"));
    }

    #[test]
    fn test_ensure_shape() {
        let table = QTable::zeros(4, 2);
        let key = "00".parse::<crate::goal::GoalDescription>().unwrap().key();
        assert!(table.ensure_shape(&key, 4, 2).is_ok());
        assert!(matches!(
            table.ensure_shape(&key, 1024, 8),
            Err(Error::ShapeMismatch { rows: 4, columns: 2, .. })
        ));
    }

    #[test]
    fn test_display_lists_every_state() {
        let table = QTable::zeros(3, 2);
        let printed = table.to_string();
        assert!(printed.starts_with("Q matrix"));
        assert!(printed.contains("From state 2:"));
    }
}
