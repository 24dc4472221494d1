//! Action descriptors: what an action index means outside the learner.
//!
//! The learner only ever deals in [`ActionIndex`] values. Whatever actuates
//! the lab needs a semantic identifier and a payload instead, which an
//! [`ActionResolver`] supplies. The index order of a resolver must match the
//! environment driver's enumeration exactly. A mismatch cannot be detected
//! at runtime; [`QLearner::new`](crate::learner::QLearner::new) only checks
//! that both sides agree on the number of actions.

use crate::error::{Error, Result};
use crate::types::{ActionIndex, Value};
use serde::{Deserialize, Serialize};

/// Namespace of the lab's action identifiers.
pub const WAS_NAMESPACE: &str = "http://example.org/was#";

/// An externally dispatchable description of one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Semantic identifier of the action, e.g. `http://example.org/was#SetZ1Light`.
    pub tag: String,
    /// Semantic annotations of the payload entries, e.g. `["Z1Light"]`.
    pub payload_tags: Vec<String>,
    /// The payload itself, parallel to `payload_tags`.
    pub payload: Vec<Value>,
}

impl ActionDescriptor {
    /// Creates a descriptor with a single payload entry.
    pub fn single(tag: impl Into<String>, payload_tag: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            tag: tag.into(),
            payload_tags: vec![payload_tag.into()],
            payload: vec![value.into()],
        }
    }
}

/// The discrete actuations of the lab.
///
/// Each variant carries the target setting: `true` switches a light on or
/// opens the blinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabAction {
    /// Switch the zone 1 light.
    SetZ1Light(bool),
    /// Switch the zone 2 light.
    SetZ2Light(bool),
    /// Move the zone 1 blinds.
    SetZ1Blinds(bool),
    /// Move the zone 2 blinds.
    SetZ2Blinds(bool),
}

impl LabAction {
    /// Every lab action, in action-index order.
    pub const ALL: [LabAction; 8] = [
        LabAction::SetZ1Light(false),
        LabAction::SetZ1Light(true),
        LabAction::SetZ2Light(false),
        LabAction::SetZ2Light(true),
        LabAction::SetZ1Blinds(false),
        LabAction::SetZ1Blinds(true),
        LabAction::SetZ2Blinds(false),
        LabAction::SetZ2Blinds(true),
    ];

    /// Number of lab actions.
    pub const COUNT: usize = Self::ALL.len();

    /// The action at `index`.
    pub fn from_index(index: ActionIndex) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(Error::UnknownAction(index))
    }

    /// The action index of this action.
    pub fn index(self) -> ActionIndex {
        let (base, on) = match self {
            LabAction::SetZ1Light(on) => (0, on),
            LabAction::SetZ2Light(on) => (2, on),
            LabAction::SetZ1Blinds(on) => (4, on),
            LabAction::SetZ2Blinds(on) => (6, on),
        };
        base + usize::from(on)
    }

    /// The target setting carried by the action.
    pub fn setting(self) -> bool {
        match self {
            LabAction::SetZ1Light(on)
            | LabAction::SetZ2Light(on)
            | LabAction::SetZ1Blinds(on)
            | LabAction::SetZ2Blinds(on) => on,
        }
    }

    /// The payload annotation, e.g. `"Z1Light"`.
    pub fn payload_tag(self) -> &'static str {
        match self {
            LabAction::SetZ1Light(_) => "Z1Light",
            LabAction::SetZ2Light(_) => "Z2Light",
            LabAction::SetZ1Blinds(_) => "Z1Blinds",
            LabAction::SetZ2Blinds(_) => "Z2Blinds",
        }
    }

    /// The full semantic identifier, e.g. `http://example.org/was#SetZ1Light`.
    pub fn tag(self) -> String {
        format!("{}Set{}", WAS_NAMESPACE, self.payload_tag())
    }

    /// The external descriptor of this action.
    pub fn descriptor(self) -> ActionDescriptor {
        ActionDescriptor::single(self.tag(), self.payload_tag(), self.setting())
    }
}

/// Maps action indices to external descriptors.
pub trait ActionResolver {
    /// Number of actions the resolver knows about.
    fn action_count(&self) -> usize;

    /// The descriptor of `action`. Unknown indices are an error.
    fn resolve(&self, action: ActionIndex) -> Result<ActionDescriptor>;
}

/// Resolver for the lab's fixed eight-action enumeration.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabActionResolver;

impl ActionResolver for LabActionResolver {
    fn action_count(&self) -> usize {
        LabAction::COUNT
    }

    fn resolve(&self, action: ActionIndex) -> Result<ActionDescriptor> {
        LabAction::from_index(action).map(LabAction::descriptor)
    }
}

/// A resolver over an explicit list of descriptors, for environments other
/// than the lab. Position in the list is the action index.
#[derive(Debug, Clone, Default)]
pub struct ActionTable {
    descriptors: Vec<ActionDescriptor>,
}

impl ActionTable {
    /// Creates a table from descriptors in action-index order.
    pub fn new(descriptors: Vec<ActionDescriptor>) -> Self {
        Self { descriptors }
    }
}

impl ActionResolver for ActionTable {
    fn action_count(&self) -> usize {
        self.descriptors.len()
    }

    fn resolve(&self, action: ActionIndex) -> Result<ActionDescriptor> {
        self.descriptors
            .get(action)
            .cloned()
            .ok_or(Error::UnknownAction(action))
    }
}
