//! Core data types shared by every learner component.

use serde::{Deserialize, Serialize};

/// Index of a discrete environment state, in `[0, state_count)`.
///
/// The flattening of sensor readings into this index is owned by the
/// environment driver; the learner treats it as opaque.
pub type StateIndex = usize;

/// Index of a discrete environment action, in `[0, action_count)`.
///
/// The enumeration order is a contract shared by the environment driver and
/// the [`ActionResolver`](crate::action::ActionResolver) in use.
pub type ActionIndex = usize;

/// A timestamp in microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Returns the current timestamp.
    pub fn now() -> Self {
        let now = chrono::Utc::now();
        let micros = (now.timestamp() as u64) * 1_000_000 + (now.timestamp_subsec_micros() as u64);
        Self(micros)
    }

    /// Microseconds elapsed between `earlier` and `self`, saturating at zero.
    pub fn micros_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// The observed goal-relevant measurements of the lab: the discretized light
/// level in each zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ZoneLevels {
    /// Light level in zone 1.
    pub z1: i64,
    /// Light level in zone 2.
    pub z2: i64,
}

impl ZoneLevels {
    /// Creates a zone-level pair.
    pub fn new(z1: i64, z2: i64) -> Self {
        Self { z1, z2 }
    }
}

impl From<(i64, i64)> for ZoneLevels {
    fn from((z1, z2): (i64, i64)) -> Self {
        Self { z1, z2 }
    }
}

/// A payload value attached to an action descriptor or a state report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A boolean value.
    Bool(bool),
    /// A 64-bit signed integer value.
    Int(i64),
    /// A 64-bit floating-point value.
    Float(f64),
    /// A string value.
    String(String),
}

impl Value {
    /// Attempts to convert the `Value` to a `bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    /// Attempts to convert the `Value` to an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Converts the `Value` to a `String` representation.
    pub fn as_string(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
