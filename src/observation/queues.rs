use std::collections::{BTreeMap, VecDeque};

use super::adapter::{ACTION_FIELD, IMAGE_FIELD, STATE_FIELD};
use super::errors::ObservationError;
use super::types::Sample;

/// Per-field history handed to the policy server, oldest sample first.
pub type Snapshot = BTreeMap<String, Vec<Sample>>;

/// Handle to one window of an [`ObservationQueueSet`].
///
/// Keys are resolved once, when the set is configured, so pushing can never
/// name a field that does not exist. A key is only meaningful for the set
/// that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldKey(usize);

#[derive(Debug, Clone)]
struct Window {
    name: String,
    capacity: usize,
    samples: VecDeque<Sample>,
}

/// Fixed-capacity sliding windows, one per observation field.
#[derive(Debug, Clone)]
pub struct ObservationQueueSet {
    windows: Vec<Window>,
}

impl ObservationQueueSet {
    pub fn new<S: AsRef<str>>(fields: &[(S, usize)]) -> Result<Self, ObservationError> {
        let mut windows: Vec<Window> = Vec::with_capacity(fields.len());
        for (name, capacity) in fields {
            let name = name.as_ref();
            if *capacity == 0 {
                return Err(ObservationError::ZeroCapacity(name.to_string()));
            }
            if windows.iter().any(|w| w.name == name) {
                return Err(ObservationError::DuplicateField(name.to_string()));
            }
            windows.push(Window {
                name: name.to_string(),
                capacity: *capacity,
                samples: VecDeque::with_capacity(*capacity),
            });
        }
        Ok(Self { windows })
    }

    /// Image and joint-state windows of `observation_horizon` samples plus an
    /// action-history window of `action_capacity` samples.
    pub fn standard(
        observation_horizon: usize,
        action_capacity: usize,
    ) -> Result<Self, ObservationError> {
        Self::new(&[
            (IMAGE_FIELD, observation_horizon),
            (STATE_FIELD, observation_horizon),
            (ACTION_FIELD, action_capacity),
        ])
    }

    pub fn key(&self, name: &str) -> Result<FieldKey, ObservationError> {
        self.windows
            .iter()
            .position(|w| w.name == name)
            .map(FieldKey)
            .ok_or_else(|| ObservationError::UnknownField(name.to_string()))
    }

    /// Appends `sample`, evicting the oldest entry when the window is full.
    ///
    /// Fails when `key` points past this set's windows, which only happens
    /// for a key issued by a different set.
    pub fn push(&mut self, key: FieldKey, sample: Sample) -> Result<(), ObservationError> {
        let window = self
            .windows
            .get_mut(key.0)
            .ok_or(ObservationError::ForeignKey(key.0))?;
        if window.samples.len() == window.capacity {
            window.samples.pop_front();
        }
        window.samples.push_back(sample);
        Ok(())
    }

    pub fn len(&self, key: FieldKey) -> usize {
        self.windows.get(key.0).map_or(0, |w| w.samples.len())
    }

    pub fn capacity(&self, key: FieldKey) -> usize {
        self.windows.get(key.0).map_or(0, |w| w.capacity)
    }

    pub fn clear(&mut self) {
        for window in &mut self.windows {
            window.samples.clear();
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.windows
            .iter()
            .map(|w| (w.name.clone(), w.samples.iter().cloned().collect()))
            .collect()
    }
}
