//! Observation space.
use serde::{Deserialize, Serialize};

/// A box-shaped observation space: every element lies in `[low, high]`.
///
/// Layers read the declared shape of the wrapped environment at construction,
/// before any step is taken, in order to allocate their buffers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    /// Lower bound of the elements.
    pub low: f32,

    /// Upper bound of the elements.
    pub high: f32,

    /// Shape of an observation.
    pub shape: Vec<usize>,
}

impl BoxSpace {
    /// Constructs a space.
    pub fn new(low: f32, high: f32, shape: impl Into<Vec<usize>>) -> Self {
        Self {
            low,
            high,
            shape: shape.into(),
        }
    }

    /// Space of canonical observations, with values in `[0, 1]`.
    pub fn unit(shape: impl Into<Vec<usize>>) -> Self {
        Self::new(0.0, 1.0, shape)
    }

    /// Returns the shape of an observation.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the number of elements of an observation.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Returns `true` if `x` lies in the bounds of the space.
    pub fn contains(&self, x: f32) -> bool {
        self.low <= x && x <= self.high
    }
}
