//! Goal descriptions and the keys that identify their Q-tables.
//!
//! A goal is a desired pair of discretized zone light levels. Its key is the
//! two decimal digits concatenated (`(2, 3)` becomes `"23"`), which is the
//! primary key of the [`QTableStore`](crate::store::QTableStore). The format
//! is only collision free for single-digit components, so construction
//! rejects anything above [`MAX_GOAL_LEVEL`].

use crate::error::{Error, Result};
use crate::types::ZoneLevels;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The largest component value a goal description may carry.
pub const MAX_GOAL_LEVEL: u8 = 9;

/// The desired zone light levels an agent should drive the lab toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GoalDescription {
    z1: u8,
    z2: u8,
}

impl GoalDescription {
    /// Creates a goal description, rejecting components above [`MAX_GOAL_LEVEL`].
    pub fn new(z1: u8, z2: u8) -> Result<Self> {
        for (zone, level) in [("z1", z1), ("z2", z2)] {
            if level > MAX_GOAL_LEVEL {
                return Err(Error::Config(format!(
                    "goal component {} = {} exceeds {}",
                    zone, level, MAX_GOAL_LEVEL
                )));
            }
        }
        Ok(Self { z1, z2 })
    }

    /// Desired level for zone 1.
    pub fn z1(&self) -> u8 {
        self.z1
    }

    /// Desired level for zone 2.
    pub fn z2(&self) -> u8 {
        self.z2
    }

    /// The store key for this goal.
    pub fn key(&self) -> GoalKey {
        GoalKey(format!("{}{}", self.z1, self.z2))
    }

    /// True when both observed zone levels equal the desired ones.
    pub fn is_satisfied_by(&self, observed: ZoneLevels) -> bool {
        observed.z1 == i64::from(self.z1) && observed.z2 == i64::from(self.z2)
    }
}

impl fmt::Display for GoalDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.z1, self.z2)
    }
}

impl TryFrom<(i64, i64)> for GoalDescription {
    type Error = Error;

    fn try_from((z1, z2): (i64, i64)) -> Result<Self> {
        let component = |zone: &str, level: i64| {
            u8::try_from(level)
                .map_err(|_| Error::Config(format!("goal component {} = {} is out of range", zone, level)))
        };
        Self::new(component("z1", z1)?, component("z2", z2)?)
    }
}

impl<'de> Deserialize<'de> for GoalDescription {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            z1: i64,
            z2: i64,
        }

        let raw = Raw::deserialize(deserializer)?;
        GoalDescription::try_from((raw.z1, raw.z2)).map_err(serde::de::Error::custom)
    }
}

/// The string key of a goal's Q-table in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalKey(String);

impl GoalKey {
    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recovers the goal description this key was built from, if the key is
    /// well formed.
    pub fn parse_goal(&self) -> Option<GoalDescription> {
        self.0.parse().ok()
    }
}

impl fmt::Display for GoalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<GoalDescription> for GoalKey {
    fn from(goal: GoalDescription) -> Self {
        goal.key()
    }
}

impl FromStr for GoalDescription {
    type Err = Error;

    /// Parses a two-digit goal key such as `"23"`.
    fn from_str(s: &str) -> Result<Self> {
        let digits: Vec<u32> = s.chars().filter_map(|c| c.to_digit(10)).collect();
        if digits.len() != 2 || s.chars().count() != 2 {
            return Err(Error::Config(format!("malformed goal key {:?}", s)));
        }
        Self::new(digits[0] as u8, digits[1] as u8)
    }
}
