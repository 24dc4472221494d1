//! A simulated two-zone lab.
//!
//! Each zone has a light and a set of blinds. The discretized light level of
//! a zone is `min(3, 2 * light + blinds_open * min(sunshine, 1))`, so a lit
//! zone reads at least 2 and daylight through open blinds adds one more.
//! Sunshine ranges over `0..=3` and drifts at random when a drift probability
//! is configured.
//!
//! States flatten the full report `[z1, z2, z1Light, z2Light, z1Blinds,
//! z2Blinds, sunshine]` in mixed radix `(4, 4, 2, 2, 2, 2, 4)`, giving
//! [`SimulatedLab::STATE_COUNT`] states. Actions follow the
//! [`LabAction`] enumeration; in any state only the four actions that change
//! a setting are applicable.

use crate::action::LabAction;
use crate::environment::{LabEnvironment, LabSnapshot};
use crate::error::{Error, Result};
use crate::types::{ActionIndex, StateIndex, ZoneLevels};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Highest discretized light level.
pub const MAX_LEVEL: i64 = 3;

/// Highest sunshine level.
pub const MAX_SUNSHINE: i64 = 3;

const RADIX: [usize; LabSnapshot::FIELDS] = [4, 4, 2, 2, 2, 2, 4];

/// The simulated lab.
#[derive(Debug, Clone)]
pub struct SimulatedLab {
    z1_light: bool,
    z2_light: bool,
    z1_blinds: bool,
    z2_blinds: bool,
    sunshine: i64,
    weather_drift: f64,
    rng: StdRng,
    actions_performed: u64,
}

impl SimulatedLab {
    /// Number of flattened states.
    pub const STATE_COUNT: usize = 4 * 4 * 2 * 2 * 2 * 2 * 4;

    /// A lab with lights off, blinds closed and moderate sunshine. The
    /// weather never changes.
    pub fn new() -> Self {
        Self::seeded(0)
    }

    /// Like [`new`](Self::new), with `seed` driving weather drift.
    pub fn seeded(seed: u64) -> Self {
        Self {
            z1_light: false,
            z2_light: false,
            z1_blinds: false,
            z2_blinds: false,
            sunshine: 2,
            weather_drift: 0.0,
            rng: StdRng::seed_from_u64(seed),
            actions_performed: 0,
        }
    }

    /// Probability that the sunshine level is redrawn after each action.
    pub fn with_weather_drift(mut self, probability: f64) -> Self {
        self.weather_drift = probability.clamp(0.0, 1.0);
        self
    }

    /// Sets the sunshine level, clamped to `0..=3`.
    pub fn with_sunshine(mut self, sunshine: i64) -> Self {
        self.sunshine = sunshine.clamp(0, MAX_SUNSHINE);
        self
    }

    /// Actions performed so far.
    pub fn actions_performed(&self) -> u64 {
        self.actions_performed
    }

    fn level(&self, light: bool, blinds: bool) -> i64 {
        let daylight = if blinds { self.sunshine.min(1) } else { 0 };
        (2 * i64::from(light) + daylight).min(MAX_LEVEL)
    }

    /// The current full report.
    pub fn snapshot(&self) -> LabSnapshot {
        LabSnapshot {
            z1_level: self.level(self.z1_light, self.z1_blinds),
            z2_level: self.level(self.z2_light, self.z2_blinds),
            z1_light: self.z1_light,
            z2_light: self.z2_light,
            z1_blinds: self.z1_blinds,
            z2_blinds: self.z2_blinds,
            sunshine: self.sunshine,
        }
    }

    /// Flattens a report into a state index.
    pub fn encode(snapshot: &LabSnapshot) -> Result<StateIndex> {
        let raw = [
            snapshot.z1_level,
            snapshot.z2_level,
            i64::from(snapshot.z1_light),
            i64::from(snapshot.z2_light),
            i64::from(snapshot.z1_blinds),
            i64::from(snapshot.z2_blinds),
            snapshot.sunshine,
        ];

        let mut state = 0usize;
        for (value, radix) in raw.into_iter().zip(RADIX) {
            let digit = usize::try_from(value)
                .ok()
                .filter(|&d| d < radix)
                .ok_or_else(|| {
                    Error::Environment(format!("state component {} outside 0..{}", value, radix))
                })?;
            state = state * radix + digit;
        }
        Ok(state)
    }

    /// Recovers the report a state index stands for.
    pub fn decode(state: StateIndex) -> Result<LabSnapshot> {
        if state >= Self::STATE_COUNT {
            return Err(Error::StateOutOfRange {
                state,
                state_count: Self::STATE_COUNT,
            });
        }

        let mut raw = [0i64; LabSnapshot::FIELDS];
        let mut rest = state;
        for (slot, radix) in raw.iter_mut().zip(RADIX).rev() {
            *slot = (rest % radix) as i64;
            rest /= radix;
        }
        LabSnapshot::from_raw(&raw)
    }

    fn drift_weather(&mut self) {
        if self.weather_drift > 0.0 && self.rng.random::<f64>() < self.weather_drift {
            self.sunshine = self.rng.random_range(0..=MAX_SUNSHINE);
            log::trace!("sunshine drifted to {}", self.sunshine);
        }
    }
}

impl Default for SimulatedLab {
    fn default() -> Self {
        Self::new()
    }
}

impl LabEnvironment for SimulatedLab {
    fn state_count(&self) -> usize {
        Self::STATE_COUNT
    }

    fn action_count(&self) -> usize {
        LabAction::COUNT
    }

    fn read_current_state(&mut self) -> Result<StateIndex> {
        Self::encode(&self.snapshot())
    }

    fn applicable_actions(&mut self, state: StateIndex) -> Result<Vec<ActionIndex>> {
        let snapshot = Self::decode(state)?;
        Ok(vec![
            LabAction::SetZ1Light(!snapshot.z1_light).index(),
            LabAction::SetZ2Light(!snapshot.z2_light).index(),
            LabAction::SetZ1Blinds(!snapshot.z1_blinds).index(),
            LabAction::SetZ2Blinds(!snapshot.z2_blinds).index(),
        ])
    }

    fn perform_action(&mut self, action: ActionIndex) -> Result<()> {
        match LabAction::from_index(action)? {
            LabAction::SetZ1Light(on) => self.z1_light = on,
            LabAction::SetZ2Light(on) => self.z2_light = on,
            LabAction::SetZ1Blinds(open) => self.z1_blinds = open,
            LabAction::SetZ2Blinds(open) => self.z2_blinds = open,
        }
        self.actions_performed += 1;
        self.drift_weather();
        Ok(())
    }

    fn observed_zone_levels(&mut self) -> Result<ZoneLevels> {
        Ok(self.snapshot().zone_levels())
    }

    fn full_state(&mut self) -> Result<Vec<i64>> {
        let s = self.snapshot();
        Ok(vec![
            s.z1_level,
            s.z2_level,
            i64::from(s.z1_light),
            i64::from(s.z2_light),
            i64::from(s.z1_blinds),
            i64::from(s.z2_blinds),
            s.sunshine,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::checked_applicable_actions;

    #[test]
    fn test_state_count() {
        assert_eq!(SimulatedLab::STATE_COUNT, 1024);
        assert_eq!(SimulatedLab::new().state_count(), 1024);
        assert_eq!(SimulatedLab::new().action_count(), 8);
    }

    #[test]
    fn test_initial_state() {
        let mut lab = SimulatedLab::new();
        assert_eq!(lab.observed_zone_levels().unwrap(), ZoneLevels::new(0, 0));
        assert_eq!(lab.full_state().unwrap(), vec![0, 0, 0, 0, 0, 0, 2]);
    }

    #[test]
    fn test_levels_follow_settings() {
        let mut lab = SimulatedLab::new();
        lab.perform_action(LabAction::SetZ1Light(true).index()).unwrap();
        assert_eq!(lab.observed_zone_levels().unwrap(), ZoneLevels::new(2, 0));

        lab.perform_action(LabAction::SetZ1Blinds(true).index()).unwrap();
        lab.perform_action(LabAction::SetZ2Blinds(true).index()).unwrap();
        assert_eq!(lab.observed_zone_levels().unwrap(), ZoneLevels::new(3, 1));

        let mut dark = SimulatedLab::new().with_sunshine(0);
        dark.perform_action(LabAction::SetZ2Blinds(true).index()).unwrap();
        assert_eq!(dark.observed_zone_levels().unwrap(), ZoneLevels::new(0, 0));
    }

    #[test]
    fn test_encode_decode_agree() {
        let mut lab = SimulatedLab::new();
        lab.perform_action(LabAction::SetZ2Light(true).index()).unwrap();
        lab.perform_action(LabAction::SetZ1Blinds(true).index()).unwrap();

        let state = lab.read_current_state().unwrap();
        assert_eq!(SimulatedLab::decode(state).unwrap(), lab.snapshot());
        assert_eq!(SimulatedLab::encode(&SimulatedLab::decode(1023).unwrap()).unwrap(), 1023);
        assert!(SimulatedLab::decode(1024).is_err());
    }

    #[test]
    fn test_applicable_actions_toggle_settings() {
        let mut lab = SimulatedLab::new();
        let state = lab.read_current_state().unwrap();
        assert_eq!(
            checked_applicable_actions(&mut lab, state).unwrap(),
            vec![1, 3, 5, 7]
        );

        lab.perform_action(1).unwrap();
        lab.perform_action(6).unwrap();
        let state = lab.read_current_state().unwrap();
        assert_eq!(lab.applicable_actions(state).unwrap(), vec![0, 3, 5, 7]);
    }

    #[test]
    fn test_unknown_action_rejected() {
        let mut lab = SimulatedLab::new();
        assert!(matches!(lab.perform_action(8), Err(Error::UnknownAction(8))));
        assert_eq!(lab.actions_performed(), 0);
    }

    #[test]
    fn test_weather_drift_is_reproducible() {
        let mut a = SimulatedLab::seeded(9).with_weather_drift(0.5);
        let mut b = SimulatedLab::seeded(9).with_weather_drift(0.5);
        for i in 0..50 {
            let action = [1, 0, 5, 4][i % 4];
            a.perform_action(action).unwrap();
            b.perform_action(action).unwrap();
            assert_eq!(a.full_state().unwrap(), b.full_state().unwrap());
        }
    }
}
